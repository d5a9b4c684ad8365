pub mod directory_runner;

pub use directory_runner::*;
