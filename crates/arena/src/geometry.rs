//! Planar frame transforms and the oriented-rectangle test.
//!
//! Coordinate conventions: the ground plane is (x, z), headings are degrees,
//! and the forward direction of a robot at heading `r` is
//! `(sin r, cos r)`: heading 0 faces +z, heading 180 faces -z. Object
//! rotations are radians around the vertical axis.

use nalgebra::{Point2, Rotation2, Vector2};

use simcore::objects::{CustomObject, ObjectKind, PathShape};

/// Unit forward vector for a heading in degrees.
pub fn heading_vector(rotation_deg: f64) -> Vector2<f64> {
    let rad = rotation_deg.to_radians();
    Vector2::new(rad.sin(), rad.cos())
}

/// Map a robot-local offset (lateral, longitudinal) to world coordinates.
pub fn robot_to_world(x: f64, z: f64, rotation_deg: f64, local: Vector2<f64>) -> Point2<f64> {
    let world = Rotation2::new(-rotation_deg.to_radians()) * local;
    Point2::new(x + world.x, z + world.y)
}

/// Transform a world point into an object's local frame.
pub fn world_to_local(px: f64, pz: f64, cx: f64, cz: f64, rotation_rad: f64) -> Vector2<f64> {
    Rotation2::new(-rotation_rad) * Vector2::new(px - cx, pz - cz)
}

/// Oriented point-in-rectangle test against an object's footprint.
///
/// Corner-shaped paths are square: their half-length is the half-width.
pub fn object_contains(obj: &CustomObject, px: f64, pz: f64) -> bool {
    let local = world_to_local(px, pz, obj.x, obj.z, obj.rotation);
    let half_w = obj.width / 2.0;
    let half_l = if obj.kind == ObjectKind::Path && obj.shape == Some(PathShape::Corner) {
        obj.width / 2.0
    } else {
        obj.length / 2.0
    };
    local.x.abs() <= half_w && local.y.abs() <= half_l
}
