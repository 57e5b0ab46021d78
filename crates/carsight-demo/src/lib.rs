pub mod camera;
pub mod cli;
pub mod mock;

pub use camera::*;
pub use cli::*;
pub use mock::*;
