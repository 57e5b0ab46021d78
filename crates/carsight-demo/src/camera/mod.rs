pub mod feed;
pub mod synthetic;

pub use feed::*;
pub use synthetic::*;
