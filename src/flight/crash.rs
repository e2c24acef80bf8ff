use super::terrain::TerrainHeightQuery;
use bevy::math::Vec3;

/// Clearance below which the glider counts as touching the ground.
pub const GROUND_PROXIMITY_M: f32 = 20.0;

/// Ground contact for a measured surface height. An unknown surface counts as
/// contact: losing terrain data ends the flight.
pub fn is_grounded_at(altitude: f32, ground_height: Option<f32>) -> bool {
    match ground_height {
        Some(ground) => altitude - ground < GROUND_PROXIMITY_M,
        None => true,
    }
}

pub fn is_grounded(position: Vec3, terrain: &dyn TerrainHeightQuery) -> bool {
    is_grounded_at(position.y, terrain.height_below(position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proximity_threshold_is_exclusive() {
        assert!(!is_grounded_at(120.0, Some(100.0)));
        assert!(is_grounded_at(119.9, Some(100.0)));
    }

    #[test]
    fn missing_terrain_is_contact_at_any_altitude() {
        let void = |_: Vec3| -> Option<f32> { None };
        assert!(is_grounded(Vec3::new(0.0, 10_000.0, 0.0), &void));
    }

    #[test]
    fn flat_ground_far_below_is_airborne() {
        let flat = |p: Vec3| -> Option<f32> { (p.y >= 0.0).then_some(0.0) };
        assert!(!is_grounded(Vec3::new(0.0, 1_000.0, 0.0), &flat));
        assert!(is_grounded(Vec3::new(0.0, 5.0, 0.0), &flat));
    }
}
