pub mod questions;
pub mod state;
pub mod timer;

pub use questions::*;
pub use state::*;
pub use timer::*;
