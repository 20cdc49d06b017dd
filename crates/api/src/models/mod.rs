pub mod artifact;
pub mod naming;

pub use artifact::*;
