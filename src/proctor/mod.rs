pub mod analyzer;
pub mod detector;
pub mod visibility;
pub mod webcam;

pub use analyzer::*;
pub use detector::*;
pub use visibility::*;
pub use webcam::*;
