//! Robot state snapshot and related small types.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_START_ROTATION;

/// Which LED a `setLed` call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedSide {
    Left,
    Right,
    Both,
}

/// Gyro query mode: heading angle or pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GyroMode {
    Angle,
    Tilt,
}

/// One segment of the pen trail left on the ground plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailSegment {
    pub start: [f64; 3],
    pub end: [f64; 3],
    pub color: String,
}

/// Mutable snapshot of the simulated robot.
///
/// Owned by the simulation session. The integrator is the sole writer of
/// pose fields during a tick; the script engine writes motor intents, LEDs
/// and pen state between ticks. Everyone else reads copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Heading in degrees. Not wrapped; the gyro reading wraps, this field
    /// accumulates so total rotation stays observable.
    pub rotation: f64,
    /// Pitch in degrees (positive nose-up).
    pub tilt: f64,
    /// Roll in degrees (positive left side up).
    pub roll: f64,
    /// Global speed scalar, 0..100.
    pub speed: f64,
    /// Left motor power, -100..100.
    pub motor_left: f64,
    /// Right motor power, -100..100.
    pub motor_right: f64,
    pub led_left: String,
    pub led_right: String,
    pub is_moving: bool,
    pub is_touching: bool,
    pub pen_down: bool,
    pub pen_color: String,
    /// Ground projection of the color sensor, for rendering and debugging.
    pub sensor_x: f64,
    pub sensor_z: f64,
}

impl RobotState {
    /// Fresh state at the given start pose, motors idle, LEDs off.
    pub fn at(x: f64, z: f64, rotation: f64) -> Self {
        Self {
            x,
            y: 0.0,
            z,
            rotation,
            tilt: 0.0,
            roll: 0.0,
            speed: 100.0,
            motor_left: 0.0,
            motor_right: 0.0,
            led_left: "black".to_string(),
            led_right: "black".to_string(),
            is_moving: false,
            is_touching: false,
            pen_down: false,
            pen_color: "#000000".to_string(),
            sensor_x: x,
            sensor_z: z,
        }
    }

    pub fn set_led(&mut self, side: LedSide, color: &str) {
        match side {
            LedSide::Left => self.led_left = color.to_string(),
            LedSide::Right => self.led_right = color.to_string(),
            LedSide::Both => {
                self.led_left = color.to_string();
                self.led_right = color.to_string();
            }
        }
    }

    /// Planar distance from a point, in world units.
    pub fn distance_from(&self, x: f64, z: f64) -> f64 {
        ((self.x - x).powi(2) + (self.z - z).powi(2)).sqrt()
    }
}

impl Default for RobotState {
    fn default() -> Self {
        Self::at(0.0, 0.0, DEFAULT_START_ROTATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_faces_start_rotation() {
        let state = RobotState::default();
        assert_eq!(state.rotation, DEFAULT_START_ROTATION);
        assert!(!state.is_moving);
        assert_eq!(state.motor_left, 0.0);
    }

    #[test]
    fn test_set_led_both() {
        let mut state = RobotState::default();
        state.set_led(LedSide::Both, "orange");
        assert_eq!(state.led_left, "orange");
        assert_eq!(state.led_right, "orange");

        state.set_led(LedSide::Left, "red");
        assert_eq!(state.led_left, "red");
        assert_eq!(state.led_right, "orange");
    }

    #[test]
    fn test_distance_from() {
        let state = RobotState::at(3.0, 4.0, 0.0);
        assert!((state.distance_from(0.0, 0.0) - 5.0).abs() < 1e-12);
    }
}
