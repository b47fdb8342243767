//! Domain model: the value objects and error taxonomy the recording
//! engine operates on (components D and K).

pub mod errors;
pub mod location;
pub mod region;
pub mod types;

pub use errors::OtterError;
pub use location::Location;
pub use region::{ParallelRegion, Region, RegionKind, StackEntry};
pub use types::*;
