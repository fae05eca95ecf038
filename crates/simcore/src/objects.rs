//! User- and challenge-authored arena objects.
//!
//! Objects are persisted as flat camelCase JSON and must round-trip
//! unchanged; ids are stable identifiers for selection and editing.

use serde::{Deserialize, Serialize};

/// Height a ramp gets when none is specified.
pub const DEFAULT_RAMP_HEIGHT: f64 = 1.2;

/// What an arena object is: collidable geometry or a ground marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Wall,
    Ramp,
    ColorLine,
    Path,
}

/// Shape of a PATH zone on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathShape {
    Straight,
    Corner,
    Curved,
}

/// One placed arena object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<PathShape>,
    pub x: f64,
    pub z: f64,
    /// Rotation around the vertical axis, radians.
    #[serde(default)]
    pub rotation: f64,
    pub width: f64,
    pub length: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Peak height, RAMP only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl CustomObject {
    /// Whether the object satisfies the footprint invariant (width/length > 0).
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.length > 0.0
    }

    /// True for objects the robot collides with (walls and ramp bodies).
    pub fn is_collidable(&self) -> bool {
        matches!(self.kind, ObjectKind::Wall | ObjectKind::Ramp)
    }

    /// True for ground markings the color sensor can see.
    pub fn is_zone(&self) -> bool {
        matches!(self.kind, ObjectKind::ColorLine | ObjectKind::Path)
    }

    /// Ramp peak height, defaulted when unset.
    pub fn ramp_height(&self) -> f64 {
        self.height.unwrap_or(DEFAULT_RAMP_HEIGHT)
    }

    /// Effective zone shape; plain color lines behave as straight strips.
    pub fn zone_shape(&self) -> PathShape {
        self.shape.unwrap_or(PathShape::Straight)
    }
}

/// Parse a JSON array of objects, skipping entries that fail to parse or
/// violate the footprint invariant. Load boundaries never propagate bad
/// entries into the simulation.
pub fn load_objects(json: &str) -> Result<Vec<CustomObject>, serde_json::Error> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut objects = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<CustomObject>(value) {
            Ok(obj) if obj.is_valid() => objects.push(obj),
            Ok(obj) => {
                log::warn!("skipping object '{}' with empty footprint", obj.id);
            }
            Err(err) => {
                log::warn!("skipping malformed object entry: {err}");
            }
        }
    }
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_round_trip_preserves_id() {
        let json = r##"{"id":"obj_1","type":"PATH","shape":"CORNER","x":0.1,"z":-3.17,"width":2.8,"length":2.8,"rotation":0.0,"color":"#FFFF00"}"##;
        let obj: CustomObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.id, "obj_1");
        assert_eq!(obj.kind, ObjectKind::Path);
        assert_eq!(obj.shape, Some(PathShape::Corner));

        let back = serde_json::to_string(&obj).unwrap();
        let again: CustomObject = serde_json::from_str(&back).unwrap();
        assert_eq!(obj, again);
    }

    #[test]
    fn test_rotation_defaults_to_zero() {
        let json = r##"{"id":"w1","type":"WALL","x":0,"z":5,"width":0.5,"length":2,"color":"#ef4444"}"##;
        let obj: CustomObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.rotation, 0.0);
        assert!(obj.is_collidable());
        assert!(!obj.is_zone());
    }

    #[test]
    fn test_load_skips_bad_entries() {
        let json = r##"[
            {"id":"good","type":"WALL","x":0,"z":0,"width":1,"length":1},
            {"id":"flat","type":"WALL","x":0,"z":0,"width":0,"length":1},
            {"id":"broken","type":"NOT_A_KIND","x":0,"z":0,"width":1,"length":1}
        ]"##;
        let objects = load_objects(json).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id, "good");
    }

    #[test]
    fn test_ramp_height_default() {
        let json = r##"{"id":"r1","type":"RAMP","x":0,"z":0,"width":4,"length":9}"##;
        let obj: CustomObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.ramp_height(), DEFAULT_RAMP_HEIGHT);
    }
}
