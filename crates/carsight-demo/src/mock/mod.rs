pub mod simulated_classifier;

pub use simulated_classifier::*;
