//! The kinematic integrator: advances the robot pose once per tick from the
//! differential motor powers, with collision blocking and attitude
//! smoothing.
//!
//! Collision policy is atomic: a blocked candidate position is rejected
//! whole, with no sliding along the free axis. Turning is never blocked.
//! This is intended simplified physics, not an approximation to fix.

use arena::{environment, sensors, SensorReading};
use simcore::constants::{BASE_TURN_SPEED, BASE_VELOCITY, MOVING_EPSILON};
use simcore::objects::CustomObject;
use simcore::state::{RobotState, TrailSegment};

use arena::geometry::heading_vector;

/// Exponential smoothing factor for height, tilt and roll per tick. The
/// pose eases toward the terrain instead of snapping, which keeps the
/// rendered robot from popping on ramp edges.
const SMOOTHING: f64 = 0.3;

/// Minimum squared planar movement before a new pen segment is recorded;
/// filters out jitter-length segments.
const PEN_MIN_DIST_SQ: f64 = 0.001;

/// Height above the ground plane at which trail segments are drawn.
const PEN_LIFT: f64 = 0.02;

/// Per-session integrator state (pen trail anchor).
#[derive(Debug, Default)]
pub struct Integrator {
    last_pen: Option<[f64; 3]>,
}

impl Integrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_pen = None;
    }

    /// Advance one tick. Returns the authoritative sensor reading for the
    /// resolved pose; the caller feeds it to event dispatch and history.
    pub fn step(
        &mut self,
        robot: &mut RobotState,
        objects: &[CustomObject],
        challenge_id: Option<&str>,
        trail: &mut Vec<TrailSegment>,
    ) -> SensorReading {
        let forward_v = (robot.motor_left + robot.motor_right) / 200.0
            * BASE_VELOCITY
            * (robot.speed / 100.0);
        let turn_v =
            (robot.motor_right - robot.motor_left) * BASE_TURN_SPEED * 0.5 * (robot.speed / 100.0);

        // Heading is always applied; only translation can be blocked.
        let new_rotation = robot.rotation + turn_v;
        let forward = heading_vector(new_rotation);
        let candidate_x = robot.x + forward.x * forward_v;
        let candidate_z = robot.z + forward.y * forward_v;

        let env = environment::resolve(challenge_id, objects);
        let probe = sensors::compute(candidate_x, candidate_z, new_rotation, &env);
        let (final_x, final_z) = if probe.physical_hit {
            (robot.x, robot.z)
        } else {
            (candidate_x, candidate_z)
        };

        // Re-query at the resolved pose for the tick's authoritative reading.
        let reading = sensors::compute(final_x, final_z, new_rotation, &env);

        robot.x = final_x;
        robot.z = final_z;
        robot.rotation = new_rotation;
        robot.y += (reading.ground_height - robot.y) * SMOOTHING;
        robot.tilt += (reading.tilt - robot.tilt) * SMOOTHING;
        robot.roll += (reading.roll - robot.roll) * SMOOTHING;
        robot.is_touching = reading.is_touching;
        robot.is_moving = forward_v.abs() > MOVING_EPSILON || turn_v.abs() > MOVING_EPSILON;
        robot.sensor_x = reading.sensor_x;
        robot.sensor_z = reading.sensor_z;

        self.record_pen(robot, trail);
        reading
    }

    fn record_pen(&mut self, robot: &RobotState, trail: &mut Vec<TrailSegment>) {
        if !robot.pen_down {
            self.last_pen = None;
            return;
        }
        let current = [robot.x, robot.y + PEN_LIFT, robot.z];
        match self.last_pen {
            Some(last) => {
                let dist_sq =
                    (current[0] - last[0]).powi(2) + (current[2] - last[2]).powi(2);
                if dist_sq > PEN_MIN_DIST_SQ {
                    trail.push(TrailSegment {
                        start: last,
                        end: current,
                        color: robot.pen_color.clone(),
                    });
                    self.last_pen = Some(current);
                }
            }
            None => self.last_pen = Some(current),
        }
    }
}
