use super::math::rotation_rate_factor;

pub const ROTATION_INERTIA_LIMIT: f32 = 50.0;
pub const MAX_ROLL_DEGREES: f32 = 75.0;
const TURN_RATE: f32 = 15.0;
const INERTIA_GAIN: f32 = 0.08;
const RECOVERY_RATE: f32 = 5.0;
const MAX_TURN_MULTIPLIER: f32 = 0.07;
const COUNTERSTEER_GAIN: f32 = 2.0;
const ROLL_DEGREES_PER_INERTIA: f32 = 1.3;

/// Pilot inputs. The analog `direction` overrides the breaks while non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlState {
    pub left_break: bool,
    pub right_break: bool,
    direction: f32,
    pub speed_bar: bool,
    pub ears: bool,
}

impl ControlState {
    pub fn direction(&self) -> f32 {
        self.direction
    }

    /// Stores the analog input clamped to [-1, 1]; positive turns right.
    /// Returns the stored value.
    pub fn set_direction(&mut self, value: f32) -> f32 {
        self.direction = if value.is_finite() {
            value.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        self.direction
    }

    pub fn any_break(&self) -> bool {
        self.left_break || self.right_break
    }
}

/// Turning momentum, bounded to +/-[`ROTATION_INERTIA_LIMIT`]. Negative turns
/// left.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RotationInertia(f32);

impl RotationInertia {
    pub fn new(value: f32) -> Self {
        Self(value.clamp(-ROTATION_INERTIA_LIMIT, ROTATION_INERTIA_LIMIT))
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    /// Advances the turn model by one tick of simulated `dt` seconds.
    pub fn update(&mut self, controls: &ControlState, dt: f32) {
        let turn_multiplier = dt.clamp(0.0, MAX_TURN_MULTIPLIER);
        let step = turn_multiplier * TURN_RATE * INERTIA_GAIN;
        let mut inertia = self.0;

        if controls.direction() == 0.0 {
            if controls.left_break {
                inertia -= step;
            }
            if controls.right_break {
                inertia += step;
            }
            if !controls.any_break() && inertia != 0.0 {
                inertia -= RECOVERY_RATE * turn_multiplier * inertia * INERTIA_GAIN;
                if inertia.abs() < f32::EPSILON {
                    inertia = 0.0;
                }
            }
        } else {
            let direction = controls.direction();
            let countersteering = inertia != 0.0 && direction.signum() != inertia.signum();
            let gain = if countersteering {
                COUNTERSTEER_GAIN
            } else {
                1.0
            };
            inertia += direction * step * gain;
        }

        self.0 = inertia.clamp(-ROTATION_INERTIA_LIMIT, ROTATION_INERTIA_LIMIT);
    }

    /// Yaw change for this tick. Not scaled by `dt`: the rate factor already
    /// follows the wrap speed.
    pub fn yaw_increment(&self, wrap_speed: f32) -> f32 {
        -self.0 * INERTIA_GAIN * rotation_rate_factor(wrap_speed)
    }

    /// Bank angle in radians, never positive and at most
    /// [`MAX_ROLL_DEGREES`] deep.
    pub fn roll(&self) -> f32 {
        let degrees =
            (self.0 * ROLL_DEGREES_PER_INERTIA).clamp(-MAX_ROLL_DEGREES, MAX_ROLL_DEGREES);
        -degrees.to_radians().abs()
    }
}
