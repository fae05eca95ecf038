//! Per-run history accumulator feeding the challenge success predicate.

use arena::SensorReading;
use simcore::constants::WORLD_TO_CM;
use simcore::state::RobotState;

/// Accumulated facts about one execution run. Reset when a run starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationHistory {
    /// Farthest the robot has been from the start position, in centimeters.
    pub max_distance_moved: f64,
    /// Sticky: set once the touch sensor has ever fired this run.
    pub touched_wall: bool,
    /// Distinct sensor colors seen, in first-seen order.
    pub detected_colors: Vec<String>,
    /// Signed heading delta from the start heading, not wrapped: a full
    /// revolution reads as ±360, not 0.
    pub total_rotation: f64,
}

impl SimulationHistory {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fold in one tick's final state.
    pub fn record(
        &mut self,
        robot: &RobotState,
        reading: &SensorReading,
        start_x: f64,
        start_z: f64,
        start_rotation: f64,
    ) {
        if reading.is_touching {
            self.touched_wall = true;
        }
        let distance = robot.distance_from(start_x, start_z) * WORLD_TO_CM;
        if distance > self.max_distance_moved {
            self.max_distance_moved = distance;
        }
        if !self.detected_colors.iter().any(|c| c == &reading.color) {
            self.detected_colors.push(reading.color.clone());
        }
        self.total_rotation = robot.rotation - start_rotation;
    }

    /// How many of the given colors have been detected (case-insensitive).
    pub fn detected_count(&self, colors: &[String]) -> usize {
        self.detected_colors
            .iter()
            .filter(|seen| colors.iter().any(|c| c.eq_ignore_ascii_case(seen)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(color: &str, touching: bool) -> SensorReading {
        SensorReading {
            gyro: 0.0,
            tilt: 0.0,
            roll: 0.0,
            ground_height: 0.0,
            is_touching: touching,
            physical_hit: false,
            distance_cm: 255.0,
            color: color.to_string(),
            raw_color: 0xFFFFFF,
            sensor_x: 0.0,
            sensor_z: 0.0,
        }
    }

    #[test]
    fn test_max_distance_is_monotone_and_scaled() {
        let mut history = SimulationHistory::default();
        let mut robot = RobotState::at(0.0, -3.0, 180.0);
        history.record(&robot, &reading("white", false), 0.0, 0.0, 180.0);
        assert_eq!(history.max_distance_moved, 30.0);

        // Driving back toward the start does not shrink the record.
        robot.z = -1.0;
        history.record(&robot, &reading("white", false), 0.0, 0.0, 180.0);
        assert_eq!(history.max_distance_moved, 30.0);
    }

    #[test]
    fn test_touched_wall_is_sticky() {
        let mut history = SimulationHistory::default();
        let robot = RobotState::default();
        history.record(&robot, &reading("white", true), 0.0, 0.0, 180.0);
        history.record(&robot, &reading("white", false), 0.0, 0.0, 180.0);
        assert!(history.touched_wall);
    }

    #[test]
    fn test_detected_colors_are_distinct_in_order() {
        let mut history = SimulationHistory::default();
        let robot = RobotState::default();
        for color in ["white", "red", "white", "green", "red"] {
            history.record(&robot, &reading(color, false), 0.0, 0.0, 180.0);
        }
        assert_eq!(history.detected_colors, vec!["white", "red", "green"]);
        assert_eq!(
            history.detected_count(&["red".to_string(), "green".to_string()]),
            2
        );
    }

    #[test]
    fn test_total_rotation_is_unwrapped() {
        let mut history = SimulationHistory::default();
        let mut robot = RobotState::at(0.0, 0.0, 180.0);
        robot.rotation = 540.0;
        history.record(&robot, &reading("white", false), 0.0, 0.0, 180.0);
        assert_eq!(history.total_rotation, 360.0);

        robot.rotation = -180.0;
        history.record(&robot, &reading("white", false), 0.0, 0.0, 180.0);
        assert_eq!(history.total_rotation, -360.0);
    }
}
