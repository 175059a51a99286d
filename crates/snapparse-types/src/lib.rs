pub mod input;
pub mod types;

pub use input::*;
pub use types::*;
