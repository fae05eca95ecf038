//! The simulated sensor suite: gyro, tilt/roll, bumper, ultrasonic and the
//! color/line sensor.
//!
//! [`compute`] is a pure function of a robot pose and an environment
//! snapshot; it holds no state between queries. Sensor queries are
//! infallible by type: bad input degrades to the sane defaults (white
//! color, out-of-range distance, no touch).

use nalgebra::Vector2;

use simcore::color;
use simcore::objects::PathShape;

use crate::environment::{Environment, Zone};
use crate::geometry::{heading_vector, robot_to_world};

/// Virtual wheel contact points in robot-local (lateral, longitudinal)
/// coordinates, used to sample terrain for tilt and roll.
const CONTACT_LEFT: Vector2<f64> = Vector2::new(-0.95, 0.5);
const CONTACT_RIGHT: Vector2<f64> = Vector2::new(0.95, 0.5);
const CONTACT_BACK: Vector2<f64> = Vector2::new(0.0, -0.8);

/// Longitudinal baseline between the front axle and the back contact point.
const TILT_BASELINE: f64 = 1.3;
/// Lateral baseline between the left and right contact points.
const ROLL_BASELINE: f64 = 1.9;

/// Forward distance at which the chassis hard-stops against a wall.
const PHYSICAL_STOP_DIST: f64 = 1.45;
/// Forward distance at which the touch sensor triggers. Slightly beyond the
/// hard stop so the bumper fires marginally before contact, like a real
/// bumper's pre-travel.
const TOUCH_TRIGGER_DIST: f64 = 1.55;
/// Lateral offset of the side bumper probes.
const BUMPER_LATERAL: f64 = 0.7;

/// Ultrasonic ray start offset, step granularity and range (world units).
const ULTRASONIC_START: f64 = 1.5;
const ULTRASONIC_STEP: f64 = 0.05;
const ULTRASONIC_STEPS: usize = 800;
/// Reported when no obstacle is within range (and the cap on readings).
pub const OUT_OF_RANGE_CM: f64 = 255.0;

/// Color sensor mounting: forward offset along the chassis and height above
/// the chassis plane; both feed the tilt-corrected ground projection.
const SENSOR_FORWARD: f64 = 0.9;
const SENSOR_HEIGHT: f64 = 0.1;

/// Lateral tolerance band for line/zone membership.
const LINE_TOLERANCE: f64 = 0.4;

/// One computed sensor snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Heading wrapped into [0, 360) and rounded to the nearest degree.
    pub gyro: f64,
    /// Pitch in degrees, positive nose-up.
    pub tilt: f64,
    /// Roll in degrees, positive left side up.
    pub roll: f64,
    /// Ground elevation under the chassis.
    pub ground_height: f64,
    /// Touch sensor state (fires at the trigger radius, before hard contact).
    pub is_touching: bool,
    /// Hard collision: the chassis cannot advance into this pose.
    pub physical_hit: bool,
    /// Ultrasonic distance in centimeters, 0 when physically touching,
    /// capped at [`OUT_OF_RANGE_CM`].
    pub distance_cm: f64,
    /// Named color under the sensor, or a raw `#RRGGBB` string.
    pub color: String,
    /// Packed color of the matched zone (white when none).
    pub raw_color: u32,
    /// Ground projection of the color sensor.
    pub sensor_x: f64,
    pub sensor_z: f64,
}

/// Zone membership test by shape, in the zone's local frame.
fn zone_contains(zone: &Zone, px: f64, pz: f64) -> bool {
    let local = crate::geometry::world_to_local(px, pz, zone.x, zone.z, zone.rotation);
    let (lx, lz) = (local.x, local.y);
    match zone.shape {
        PathShape::Straight => lx.abs() <= LINE_TOLERANCE && lz.abs() <= zone.length / 2.0,
        PathShape::Corner => {
            let half_w = zone.width / 2.0;
            (lx.abs() <= LINE_TOLERANCE && lz.abs() <= half_w)
                || (lz.abs() <= LINE_TOLERANCE && lx.abs() <= half_w)
        }
        PathShape::Curved => {
            // Quarter-circle arc centered one radius to the local -x side.
            let radius = zone.length / 2.0;
            let dist = ((lx + radius).powi(2) + lz.powi(2)).sqrt();
            if (dist - radius).abs() > LINE_TOLERANCE {
                return false;
            }
            let angle = lz.atan2(lx + radius);
            (0.0..=std::f64::consts::FRAC_PI_2).contains(&angle)
        }
    }
}

/// Whether any of the three bumper probe points at the given forward
/// distance is inside a wall.
fn bumper_hit(x: f64, z: f64, rotation: f64, dist: f64, env: &Environment) -> bool {
    [0.0, -BUMPER_LATERAL, BUMPER_LATERAL].iter().any(|&lat| {
        let p = robot_to_world(x, z, rotation, Vector2::new(lat, dist));
        env.hit_test(p.x, p.y)
    })
}

/// Compute the full sensor suite for a pose against an environment snapshot.
pub fn compute(x: f64, z: f64, rotation: f64, env: &Environment) -> SensorReading {
    let gyro = rotation.rem_euclid(360.0).round() % 360.0;

    // Terrain attitude from the three contact points.
    let left = robot_to_world(x, z, rotation, CONTACT_LEFT);
    let right = robot_to_world(x, z, rotation, CONTACT_RIGHT);
    let back = robot_to_world(x, z, rotation, CONTACT_BACK);
    let h_left = env.height_at(left.x, left.y);
    let h_right = env.height_at(right.x, right.y);
    let h_back = env.height_at(back.x, back.y);
    let ground_height = (h_left + h_right + h_back) / 3.0;
    let front_avg = (h_left + h_right) / 2.0;
    let tilt = (front_avg - h_back).atan2(TILT_BASELINE).to_degrees();
    let roll = (h_left - h_right).atan2(ROLL_BASELINE).to_degrees();

    // Color sensor ground projection, corrected for pitch so the reading
    // leads or lags with the nose.
    let tilt_rad = tilt.to_radians();
    let projection = SENSOR_FORWARD * tilt_rad.cos() + SENSOR_HEIGHT * tilt_rad.sin();
    let forward = heading_vector(rotation);
    let sensor_x = x + forward.x * projection;
    let sensor_z = z + forward.y * projection;

    let mut raw_color = 0xFF_FFFF;
    let mut color_name = "white".to_string();
    for zone in env.zones() {
        if zone_contains(zone, sensor_x, sensor_z) {
            raw_color = zone.color;
            color_name = color::classify(zone.color);
            break;
        }
    }

    let physical_hit = bumper_hit(x, z, rotation, PHYSICAL_STOP_DIST, env);
    let mut is_touching = bumper_hit(x, z, rotation, TOUCH_TRIGGER_DIST, env);

    // Ultrasonic ray march from the sensor face.
    let mut distance_cm = OUT_OF_RANGE_CM;
    for step in 0..ULTRASONIC_STEPS {
        let d = step as f64 * ULTRASONIC_STEP;
        let tx = x + forward.x * (ULTRASONIC_START + d);
        let tz = z + forward.y * (ULTRASONIC_START + d);
        if env.hit_test(tx, tz) {
            distance_cm = (d * 10.0).round();
            break;
        }
    }

    if physical_hit {
        distance_cm = 0.0;
        is_touching = true;
    }

    SensorReading {
        gyro,
        tilt,
        roll,
        ground_height,
        is_touching,
        physical_hit,
        distance_cm,
        color: color_name,
        raw_color,
        sensor_x,
        sensor_z,
    }
}
