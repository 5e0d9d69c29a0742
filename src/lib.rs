pub mod cli;
pub mod runtime;

pub use runtime::{*};
