//! Shared state types and constants for the robolab simulator.
//!
//! Everything that crosses a crate boundary lives here: the robot state
//! snapshot, user-placed arena objects, the color model used by the line
//! sensor, and the simulation error taxonomy.

pub mod color;
pub mod constants;
pub mod error;
pub mod objects;
pub mod state;

pub use color::Rgb;
pub use error::SimError;
pub use objects::{CustomObject, ObjectKind, PathShape};
pub use state::{GyroMode, LedSide, RobotState, TrailSegment};
