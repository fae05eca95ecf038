//! Challenge definitions and their success predicates.
//!
//! Challenges are consumed as data: a JSON catalog of definitions whose
//! `check` field is a tagged condition tree, not code. A check that fails
//! to deserialize falls back to the default predicate rather than erroring,
//! so stored challenges always stay loadable.

use serde::{Deserialize, Deserializer, Serialize};

use simcore::constants::DEFAULT_START_ROTATION;
use simcore::objects::CustomObject;
use simcore::state::RobotState;

use crate::history::SimulationHistory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartPosition {
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub z: f64,
}

/// Success predicate, evaluated each tick with (start, current, history).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CheckKind {
    /// The fallback predicate: drove more than 5 cm from the start.
    #[default]
    Default,
    /// The robot's position satisfies every bound that is present.
    #[serde(rename_all = "camelCase")]
    ReachZone {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_x: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_x: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_z: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_z: Option<f64>,
    },
    /// Drove at least this far from the start (cm).
    MinDistance { cm: f64 },
    /// Accumulated at least this much rotation in either direction.
    FullRotation { degrees: f64 },
    /// Touched any wall during the run.
    TouchedWall,
    /// Saw the given color at least once.
    DetectedColor { color: String },
    /// Saw at least `count` of the listed colors.
    DetectedColors { colors: Vec<String>, count: usize },
    /// The robot is currently stationary.
    Stopped,
    /// Either LED is lit (not black).
    LedLit,
    All { of: Vec<CheckKind> },
    Any { of: Vec<CheckKind> },
    Not { check: Box<CheckKind> },
}

impl CheckKind {
    pub fn evaluate(
        &self,
        start: &RobotState,
        end: &RobotState,
        history: &SimulationHistory,
    ) -> bool {
        match self {
            CheckKind::Default => history.max_distance_moved > 5.0,
            CheckKind::ReachZone {
                min_x,
                max_x,
                min_z,
                max_z,
            } => {
                min_x.map_or(true, |v| end.x > v)
                    && max_x.map_or(true, |v| end.x < v)
                    && min_z.map_or(true, |v| end.z > v)
                    && max_z.map_or(true, |v| end.z < v)
            }
            CheckKind::MinDistance { cm } => history.max_distance_moved >= *cm,
            CheckKind::FullRotation { degrees } => history.total_rotation.abs() >= *degrees,
            CheckKind::TouchedWall => history.touched_wall,
            CheckKind::DetectedColor { color } => history.detected_count(std::slice::from_ref(color)) > 0,
            CheckKind::DetectedColors { colors, count } => history.detected_count(colors) >= *count,
            CheckKind::Stopped => !end.is_moving,
            CheckKind::LedLit => end.led_left != "black" || end.led_right != "black",
            CheckKind::All { of } => of.iter().all(|c| c.evaluate(start, end, history)),
            CheckKind::Any { of } => of.iter().any(|c| c.evaluate(start, end, history)),
            CheckKind::Not { check } => !check.evaluate(start, end, history),
        }
    }
}

/// Accept any JSON for `check`; unrecognized shapes fall back to the
/// default predicate instead of failing the whole challenge load.
fn check_or_default<'de, D>(deserializer: D) -> Result<CheckKind, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|err| {
        log::warn!("unrecognized challenge check ({err}); using default");
        CheckKind::Default
    }))
}

/// One challenge definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default, deserialize_with = "check_or_default")]
    pub check: CheckKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_position: Option<StartPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_objects: Option<Vec<CustomObject>>,
}

impl Challenge {
    /// Start pose with defaults applied.
    pub fn start_pose(&self) -> (f64, f64, f64) {
        let (x, z) = self
            .start_position
            .map(|p| (p.x, p.z))
            .unwrap_or((0.0, 0.0));
        (x, z, self.start_rotation.unwrap_or(DEFAULT_START_ROTATION))
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Load a challenge catalog, skipping malformed entries.
pub fn load_catalog(json: &str) -> Result<Vec<Challenge>, serde_json::Error> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut challenges = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<Challenge>(value) {
            Ok(challenge) => challenges.push(challenge),
            Err(err) => log::warn!("skipping malformed challenge: {err}"),
        }
    }
    Ok(challenges)
}
