use super::terrain::TerrainHeightQuery;
use super::wind::Weather;
use bevy::math::bounding::{Aabb3d, Bounded3d, BoundingVolume};
use bevy::math::primitives::Cuboid;
use bevy::math::{Isometry3d, Quat, Vec3};

/// Horizontal distance from the glider to the windward terrain probe.
pub const RIDGE_PROBE_DISTANCE_M: f32 = 50.0;
/// Ridge lift per meter of ground height under the glider.
const RIDGE_LIFT_PER_GROUND_METER: f32 = 0.002;
/// Climb rate contributed by each thermal that fully contains the glider.
pub const THERMAL_LIFT_MPS: f32 = 2.0;
/// Interior super thermal radii relative to their main thermal.
pub const SUPER_THERMAL_RADIUS_RATIO: f32 = 0.5;
/// Floor applied when a thermal height is derived from the condensation level.
pub const MIN_THERMAL_HEIGHT_M: f32 = 100.0;

/// A column of rising air, shaped as a vertical frustum standing on `position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thermal {
    pub bottom_radius: f32,
    pub top_radius: f32,
    pub height: f32,
    /// Center of the base.
    pub position: Vec3,
    /// Rendering only.
    pub opacity: f32,
    pub is_main_thermal: bool,
    pub is_super_thermal: bool,
}

impl Thermal {
    /// Axis-aligned box enclosing the frustum.
    pub fn bounds(&self) -> Aabb3d {
        let radius = self.bottom_radius.max(self.top_radius);
        let half_height = self.height * 0.5;
        Aabb3d::new(
            self.position + Vec3::Y * half_height,
            Vec3::new(radius, half_height, radius),
        )
    }

    /// True when `glider` lies entirely inside this thermal's volume.
    pub fn contains(&self, glider: &Aabb3d) -> bool {
        self.bounds().contains(glider)
    }
}

/// Layout for a thermal, typically read from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalSpec {
    pub position: Vec3,
    pub bottom_radius: f32,
    pub top_radius: f32,
    /// Derived from the condensation level when absent.
    pub height: Option<f32>,
    pub opacity: f32,
    /// Adds a narrower super thermal inside the main one.
    pub with_core: bool,
}

/// Lift terms computed at one position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LiftSample {
    pub dynamic_lift: f32,
    pub thermal_lift: f32,
    pub gradient: f32,
    /// Distance to the surface below, when the surface is known.
    pub height_above_ground: Option<f32>,
}

impl LiftSample {
    pub fn total(&self) -> f32 {
        self.dynamic_lift + self.thermal_lift
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RidgeLift {
    lift: f32,
    gradient: f32,
    height_above_ground: Option<f32>,
}

/// World-space box enclosing the glider body posed at `position` with
/// `orientation`. A yawed or banked wing reaches further along world axes.
pub fn glider_bounds(position: Vec3, orientation: Quat, half_extents: Vec3) -> Aabb3d {
    Cuboid { half_size: half_extents }.aabb_3d(Isometry3d::new(position, orientation))
}

/// All thermals of one flight. Built once during environment setup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThermalField {
    thermals: Vec<Thermal>,
}

impl ThermalField {
    pub fn new(thermals: Vec<Thermal>) -> Self {
        Self { thermals }
    }

    /// Expands specs into thermals. Thermals without an explicit height top
    /// out at the condensation level.
    pub fn from_specs<'a>(
        specs: impl IntoIterator<Item = &'a ThermalSpec>,
        weather: &Weather,
    ) -> Self {
        let mut thermals = Vec::new();
        for spec in specs {
            let height = spec.height.unwrap_or_else(|| {
                (weather.lcl_level - spec.position.y).max(MIN_THERMAL_HEIGHT_M)
            });
            let main = Thermal {
                bottom_radius: spec.bottom_radius,
                top_radius: spec.top_radius,
                height,
                position: spec.position,
                opacity: spec.opacity,
                is_main_thermal: true,
                is_super_thermal: false,
            };
            thermals.push(main);

            if spec.with_core {
                thermals.push(Thermal {
                    bottom_radius: spec.bottom_radius * SUPER_THERMAL_RADIUS_RATIO,
                    top_radius: spec.top_radius * SUPER_THERMAL_RADIUS_RATIO,
                    opacity: (spec.opacity * 1.5).min(1.0),
                    is_main_thermal: false,
                    is_super_thermal: true,
                    ..main
                });
            }
        }
        Self { thermals }
    }

    pub fn thermals(&self) -> &[Thermal] {
        &self.thermals
    }

    /// 2 m/s for every thermal that fully contains the glider; overlapping
    /// thermals stack.
    pub fn thermal_lift(&self, glider: &Aabb3d) -> f32 {
        let containing = self
            .thermals
            .iter()
            .filter(|thermal| thermal.contains(glider))
            .count();
        containing as f32 * THERMAL_LIFT_MPS
    }

    /// Ridge and thermal lift at `position` for a glider of the given half
    /// extents and orientation. `ground_below` is the surface height under the
    /// glider, already queried by the caller, so only the windward probe hits
    /// the terrain.
    pub fn lift_over(
        &self,
        position: Vec3,
        orientation: Quat,
        ground_below: Option<f32>,
        glider_half_extents: Vec3,
        weather: &Weather,
        terrain: &dyn TerrainHeightQuery,
    ) -> LiftSample {
        let ridge = ridge_lift(position, ground_below, weather.wind_direction(), terrain);
        let glider = glider_bounds(position, orientation, glider_half_extents);
        LiftSample {
            dynamic_lift: ridge.lift,
            thermal_lift: self.thermal_lift(&glider),
            gradient: ridge.gradient,
            height_above_ground: ridge.height_above_ground,
        }
    }
}

/// Lift from wind deflected up a slope. The probe sits upwind of the glider;
/// downhill or flat terrain yields nothing, and the effect fades as the glider
/// climbs away from the ground.
fn ridge_lift(
    position: Vec3,
    ground_below: Option<f32>,
    wind_direction: Vec3,
    terrain: &dyn TerrainHeightQuery,
) -> RidgeLift {
    let Some(height_here) = ground_below else {
        return RidgeLift::default();
    };
    let height_above_ground = Some(position.y - height_here);

    let probe = position - wind_direction * RIDGE_PROBE_DISTANCE_M;
    let Some(height_windward) = terrain.height_below(probe) else {
        return RidgeLift {
            height_above_ground,
            ..RidgeLift::default()
        };
    };

    let gradient = ((height_here - height_windward) / RIDGE_PROBE_DISTANCE_M).max(0.0);
    if position.y <= 0.0 {
        return RidgeLift {
            lift: 0.0,
            gradient,
            height_above_ground,
        };
    }

    let ratio = (position.y - height_here) / position.y;
    let lift_component = (1.0 - ratio) * height_here * RIDGE_LIFT_PER_GROUND_METER;
    RidgeLift {
        lift: lift_component * gradient,
        gradient,
        height_above_ground,
    }
}
