//! Ground elevation from ramp geometry.
//!
//! A ramp's height profile along its length is three equal segments:
//! uphill from 0 to the peak, a flat plateau, then downhill back to 0.
//! Overlapping ramps do not stack; the ground is the max over all of them.

use simcore::objects::{CustomObject, ObjectKind};

use crate::geometry::world_to_local;

/// Height of a ramp surface at a longitudinal local offset.
///
/// `local_z` runs from `-length/2` (entry edge) to `+length/2` (exit edge).
fn profile(local_z: f64, length: f64, peak: f64) -> f64 {
    let half = length / 2.0;
    let section = length / 3.0;
    let uphill_end = -half + section;
    let downhill_start = half - section;
    if local_z < uphill_end {
        (local_z + half) / section * peak
    } else if local_z < downhill_start {
        peak
    } else {
        peak - (local_z - downhill_start) / section * peak
    }
}

/// Ground elevation at a world point given the current object set.
pub fn height_at(qx: f64, qz: f64, objects: &[CustomObject]) -> f64 {
    let mut max_height: f64 = 0.0;
    for ramp in objects.iter().filter(|o| o.kind == ObjectKind::Ramp) {
        let local = world_to_local(qx, qz, ramp.x, ramp.z, ramp.rotation);
        if local.x.abs() <= ramp.width / 2.0 && local.y.abs() <= ramp.length / 2.0 {
            max_height = max_height.max(profile(local.y, ramp.length, ramp.ramp_height()));
        }
    }
    max_height
}
