//! Simulation-wide constants.
//!
//! Tick timing and the velocity scale constants are shared by the
//! integrator, the script engine and the app loop, so they live here
//! rather than in any one crate.

/// Fixed tick period of the simulation clock (milliseconds).
pub const TICK_MS: u64 = 16;

/// Forward velocity per tick at full motor power and full speed (world units).
pub const BASE_VELOCITY: f64 = 0.055;

/// Heading change per tick per unit of differential power (degrees).
pub const BASE_TURN_SPEED: f64 = 0.13;

/// World units per centimeter on the script API surface.
///
/// `move(100)` targets `100 * CM_TO_WORLD` world units of travel.
pub const CM_TO_WORLD: f64 = 0.1;

/// Centimeters per world unit, used for reported distances and history.
pub const WORLD_TO_CM: f64 = 10.0;

/// Wheel circumference reported by the script API (constant by contract).
pub const WHEEL_CIRCUMFERENCE: f64 = 3.77;

/// Heading the robot faces when no challenge specifies one (degrees).
pub const DEFAULT_START_ROTATION: f64 = 180.0;

/// Velocity magnitude below which the robot reports itself as stationary.
pub const MOVING_EPSILON: f64 = 0.001;
