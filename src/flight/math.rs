use bevy::math::{EulerRot, Quat, Vec3};
use std::f32::consts::PI;

/// Hermite interpolation of `x` between `min` and `max`, clamped to [0, 1].
pub fn smoothstep(x: f32, min: f32, max: f32) -> f32 {
    if x <= min {
        return 0.0;
    }
    if x >= max {
        return 1.0;
    }
    let t = (x - min) / (max - min);
    t * t * (3.0 - 2.0 * t)
}

/// Yaw radians applied per unit of rotation inertia.
///
/// Scales with time acceleration so the on-screen turn rate stays plausible:
/// `PI / 60` at real time, approaching `PI / 10` at 10x and beyond.
pub fn rotation_rate_factor(wrap_speed: f32) -> f32 {
    PI / (60.0 - 50.0 * smoothstep(wrap_speed, 1.0, 10.0))
}

/// Glider orientation: yaw about +Y, then bank about the local forward axis.
pub fn orientation(yaw: f32, roll: f32) -> Quat {
    Quat::from_euler(EulerRot::YXZ, yaw, 0.0, roll)
}

/// Local forward axis is +Z.
pub fn forward_axis(yaw: f32, roll: f32) -> Vec3 {
    orientation(yaw, roll) * Vec3::Z
}
