//! Environment resolution: the effective collidable and sensable world.
//!
//! An [`Environment`] is derived from a challenge id plus the current
//! custom-object list. It is cheap to build and is rebuilt on every sensor
//! query so it always reflects the latest object set; callers must not
//! cache one across object mutations.

use simcore::color;
use simcore::objects::{CustomObject, ObjectKind, PathShape};

use crate::geometry::object_contains;
use crate::terrain;

/// Fallback zone colors when an object carries none.
const DEFAULT_PATH_COLOR: u32 = 0xFFFF00;
const DEFAULT_LINE_COLOR: u32 = 0xFF0000;

/// An axis-aligned wall box built into a specific challenge arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl WallBox {
    pub fn contains(&self, px: f64, pz: f64) -> bool {
        px >= self.min_x && px <= self.max_x && pz >= self.min_z && pz <= self.max_z
    }
}

/// A ground marking the color sensor can detect.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub x: f64,
    pub z: f64,
    pub width: f64,
    pub length: f64,
    /// Radians around the vertical axis.
    pub rotation: f64,
    /// Packed 0xRRGGBB.
    pub color: u32,
    pub shape: PathShape,
}

/// The effective world for one sensor query: builtin walls, collidable
/// objects, color zones, and the terrain-bearing object set.
#[derive(Debug)]
pub struct Environment<'a> {
    walls: Vec<WallBox>,
    objects: &'a [CustomObject],
    zones: Vec<Zone>,
}

/// Builtin wall table keyed by challenge id.
///
/// Only the obstacle-retreat arena ships hard-coded geometry; every other
/// challenge carries its walls as environment objects.
fn builtin_walls(challenge_id: Option<&str>) -> Vec<WallBox> {
    match challenge_id {
        Some("c10") => vec![WallBox {
            min_x: -3.0,
            max_x: 3.0,
            min_z: -10.25,
            max_z: -9.75,
        }],
        _ => Vec::new(),
    }
}

/// Assemble the effective environment from a challenge id and the current
/// custom objects.
pub fn resolve<'a>(challenge_id: Option<&str>, objects: &'a [CustomObject]) -> Environment<'a> {
    let zones = objects
        .iter()
        .filter(|o| o.is_zone())
        .map(|o| {
            let default = match o.kind {
                ObjectKind::Path => DEFAULT_PATH_COLOR,
                _ => DEFAULT_LINE_COLOR,
            };
            Zone {
                x: o.x,
                z: o.z,
                width: o.width,
                length: o.length,
                rotation: o.rotation,
                color: color::pack_or(o.color.as_deref(), default),
                shape: o.zone_shape(),
            }
        })
        .collect();
    Environment {
        walls: builtin_walls(challenge_id),
        objects,
        zones,
    }
}

impl<'a> Environment<'a> {
    /// Whether a world point is inside any wall (builtin box or oriented
    /// WALL/RAMP object).
    pub fn hit_test(&self, px: f64, pz: f64) -> bool {
        if self.walls.iter().any(|w| w.contains(px, pz)) {
            return true;
        }
        self.objects
            .iter()
            .filter(|o| o.is_collidable())
            .any(|o| object_contains(o, px, pz))
    }

    /// Ground elevation at a world point.
    pub fn height_at(&self, px: f64, pz: f64) -> f64 {
        terrain::height_at(px, pz, self.objects)
    }

    /// Color zones in environment order (first match wins).
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }
}
