use super::controls::{ControlState, RotationInertia};
use super::crash::is_grounded_at;
use super::math::{forward_axis, orientation};
use super::shared::Shared;
use super::telemetry::{FlightEvent, TelemetryBus, TelemetryListener};
use super::terrain::TerrainHeightQuery;
use super::thermal::ThermalField;
use super::trajectory::{PointType, TrajectoryRecorder};
use super::visual::{FlyableVisual, NoVisual};
use super::wind::{Weather, WindModel};
use bevy::log::{debug, info, warn};
use bevy::math::{Quat, Vec3};
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Wall-clock seconds between ticks at a wrap speed of 1.
pub const TICK_INTERVAL_SECS: f32 = 0.025;
/// Ground contact is checked and lift refreshed on every n-th tick.
pub const GROUND_CHECK_INTERVAL: u64 = 5;
/// A trajectory point is recorded on every n-th tick.
pub const TRAJECTORY_INTERVAL: u64 = 10;
pub const SPEED_BAR_SPEED_FACTOR: f32 = 1.2;
pub const SPEED_BAR_GLIDE_FACTOR: f32 = 0.8;
pub const EARS_SPEED_FACTOR: f32 = 0.8;
pub const EARS_GLIDE_FACTOR: f32 = 0.8;
pub const DEFAULT_GLIDER_HALF_EXTENTS: Vec3 = Vec3::new(5.0, 1.5, 1.5);

/// Wing performance. Live-editable; every tick reads the current values.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FlightParameters {
    pub glide_ratio: f32,
    /// Meters per second.
    pub trim_speed: f32,
    pub full_speed_bar_speed: f32,
    /// Informational. Ears act as modifiers on trim speed.
    pub big_ears_speed: f32,
}

impl Default for FlightParameters {
    fn default() -> Self {
        Self {
            glide_ratio: 9.0,
            trim_speed: 9.72,
            full_speed_bar_speed: 13.9,
            big_ears_speed: 8.3,
        }
    }
}

impl FlightParameters {
    fn validate(&self) -> Result<(), FlightError> {
        if !(self.glide_ratio > 0.0 && self.glide_ratio.is_finite()) {
            return Err(FlightError::InvalidParameter(format!(
                "glide_ratio must be > 0, got {}",
                self.glide_ratio
            )));
        }
        if !(self.trim_speed > 0.0 && self.trim_speed.is_finite()) {
            return Err(FlightError::InvalidParameter(format!(
                "trim_speed must be > 0, got {}",
                self.trim_speed
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlightError {
    MissingCollaborator(&'static str),
    InvalidParameter(String),
}

impl Display for FlightError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCollaborator(name) => {
                write!(f, "flight model requires a {name} collaborator")
            }
            Self::InvalidParameter(message) => write!(f, "invalid flight parameter: {message}"),
        }
    }
}

impl std::error::Error for FlightError {}

/// End-of-flight figures for the results screen.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlightSummary {
    pub flying_time_s: f32,
    pub meters_flown: f32,
    pub ground_touches: u32,
    pub max_altitude: f32,
    pub trajectory_points: usize,
}

pub struct FlightModelBuilder {
    parameters: Option<Shared<FlightParameters>>,
    weather: Option<Shared<Weather>>,
    thermals: Option<Arc<ThermalField>>,
    terrain: Option<Arc<dyn TerrainHeightQuery + Send + Sync>>,
    glider_half_extents: Vec3,
    start_position: Vec3,
    start_yaw: f32,
    visual: Option<Box<dyn FlyableVisual>>,
    queue_events: bool,
}

impl FlightModelBuilder {
    pub fn parameters(mut self, parameters: Shared<FlightParameters>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn weather(mut self, weather: Shared<Weather>) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn thermals(mut self, thermals: Arc<ThermalField>) -> Self {
        self.thermals = Some(thermals);
        self
    }

    pub fn terrain(mut self, terrain: Arc<dyn TerrainHeightQuery + Send + Sync>) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn glider_half_extents(mut self, half_extents: Vec3) -> Self {
        self.glider_half_extents = half_extents;
        self
    }

    /// Start position and heading in radians.
    pub fn start(mut self, position: Vec3, yaw: f32) -> Self {
        self.start_position = position;
        self.start_yaw = yaw;
        self
    }

    pub fn visual(mut self, visual: Box<dyn FlyableVisual>) -> Self {
        self.visual = Some(visual);
        self
    }

    /// Keep published events for [`FlightModel::drain_events`]. On by
    /// default; hosts that only use listeners turn it off.
    pub fn queue_events(mut self, enabled: bool) -> Self {
        self.queue_events = enabled;
        self
    }

    pub fn build(self) -> Result<FlightModel, FlightError> {
        let parameters = self
            .parameters
            .ok_or(FlightError::MissingCollaborator("parameters"))?;
        let weather = self
            .weather
            .ok_or(FlightError::MissingCollaborator("weather"))?;
        let terrain = self
            .terrain
            .ok_or(FlightError::MissingCollaborator("terrain"))?;
        parameters.read().validate()?;
        if !self.glider_half_extents.cmpgt(Vec3::ZERO).all() {
            return Err(FlightError::InvalidParameter(format!(
                "glider half extents must be positive, got {}",
                self.glider_half_extents
            )));
        }
        if !self.start_position.is_finite() || !self.start_yaw.is_finite() {
            return Err(FlightError::InvalidParameter(
                "start pose must be finite".to_string(),
            ));
        }

        let inertia = RotationInertia::default();
        Ok(FlightModel {
            parameters,
            wind: WindModel::new(weather),
            thermals: self.thermals.unwrap_or_default(),
            terrain,
            visual: self.visual.unwrap_or_else(|| Box::new(NoVisual)),
            glider_half_extents: self.glider_half_extents,
            position: self.start_position,
            yaw: self.start_yaw,
            roll: inertia.roll(),
            controls: ControlState::default(),
            inertia,
            wrap_speed: 1.0,
            running: false,
            tick_count: 0,
            cached_lift: 0.0,
            ground_touches: 0,
            crashed: false,
            flying_time: 0.0,
            meters_flown: 0.0,
            trajectory: TrajectoryRecorder::default(),
            telemetry: TelemetryBus::new(self.queue_events),
        })
    }
}

/// One glider flight: pose, inputs and the fixed-step integrator.
///
/// The model does not schedule itself. The host calls [`FlightModel::tick`]
/// every [`TICK_INTERVAL_SECS`] of wall-clock time with
/// `dt = TICK_INTERVAL_SECS * wrap_speed`; ticks on a stopped model do
/// nothing.
pub struct FlightModel {
    parameters: Shared<FlightParameters>,
    wind: WindModel,
    thermals: Arc<ThermalField>,
    terrain: Arc<dyn TerrainHeightQuery + Send + Sync>,
    visual: Box<dyn FlyableVisual>,
    glider_half_extents: Vec3,
    position: Vec3,
    yaw: f32,
    roll: f32,
    controls: ControlState,
    inertia: RotationInertia,
    wrap_speed: f32,
    running: bool,
    tick_count: u64,
    /// Total lift from the last ground check, reused in between.
    cached_lift: f32,
    ground_touches: u32,
    crashed: bool,
    flying_time: f32,
    meters_flown: f32,
    trajectory: TrajectoryRecorder,
    telemetry: TelemetryBus,
}

impl FlightModel {
    pub fn builder() -> FlightModelBuilder {
        FlightModelBuilder {
            parameters: None,
            weather: None,
            thermals: None,
            terrain: None,
            glider_half_extents: DEFAULT_GLIDER_HALF_EXTENTS,
            start_position: Vec3::ZERO,
            start_yaw: 0.0,
            visual: None,
            queue_events: true,
        }
    }

    pub fn init(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        info!(
            "Flight started at ({:.0}, {:.0}, {:.0}).",
            self.position.x, self.position.y, self.position.z
        );
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        info!(
            "Flight stopped after {:.1}s and {:.0}m.",
            self.flying_time, self.meters_flown
        );
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advances the flight by `dt` simulated seconds.
    pub fn tick(&mut self, dt: f32) {
        if !self.running {
            return;
        }
        let tick = self.tick_count;
        self.tick_count += 1;

        let parameters = self.parameters.snapshot();
        let weather = self.wind.weather().snapshot();

        if tick % GROUND_CHECK_INTERVAL == 0 {
            self.check_ground(&weather);
        }

        let air_speed = self.air_speed_for(&parameters);
        let drop = air_speed / self.glide_ratio_for(&parameters);
        let forward_velocity = forward_axis(self.yaw, self.roll) * air_speed;
        let vertical = Vec3::Y * (self.cached_lift - drop);
        let displacement = (forward_velocity + vertical) * dt + weather.wind_velocity(dt);
        let previous_altitude = self.position.y;
        self.position += displacement;

        self.inertia.update(&self.controls, dt);
        self.yaw += self.inertia.yaw_increment(self.wrap_speed);
        self.roll = self.inertia.roll();

        if tick % TRAJECTORY_INTERVAL == 0 {
            let point_type = if self.controls.speed_bar {
                PointType::SpeedBar
            } else {
                PointType::Normal
            };
            self.trajectory.record(self.position, point_type);
        }

        let delta = if dt > 0.0 {
            (self.position.y - previous_altitude) / dt
        } else {
            0.0
        };
        self.telemetry.publish(FlightEvent::Position {
            position: self.position,
        });
        self.telemetry.publish(FlightEvent::Delta { delta });
        self.telemetry.publish(FlightEvent::Drop { drop });

        self.flying_time += dt;
        self.meters_flown += dt * (forward_velocity + weather.wind_velocity(1.0)).length();
    }

    fn check_ground(&mut self, weather: &Weather) {
        let ground_below = self.terrain.height_below(self.position);
        if is_grounded_at(self.position.y, ground_below) {
            self.trajectory.record(self.position, PointType::TouchGround);
            self.ground_touches += 1;
            self.telemetry.publish(FlightEvent::TouchedGround {
                ground_touches: self.ground_touches,
            });
            if !self.crashed {
                self.crashed = true;
                match ground_below {
                    Some(ground) => info!(
                        "Ground contact at altitude {:.1} over ground at {:.1}.",
                        self.position.y, ground
                    ),
                    None => info!(
                        "Ground contact: no surface below ({:.0}, {:.0}).",
                        self.position.x, self.position.z
                    ),
                }
                self.telemetry.publish(FlightEvent::Crashed);
            }
            return;
        }

        let sample = self.thermals.lift_over(
            self.position,
            self.orientation(),
            ground_below,
            self.glider_half_extents,
            weather,
            self.terrain.as_ref(),
        );
        self.cached_lift = sample.total();
        debug!(
            "Lift refresh: dynamic {:.3} thermal {:.1} gradient {:.3}",
            sample.dynamic_lift, sample.thermal_lift, sample.gradient
        );
        self.telemetry.publish(FlightEvent::DynamicLift {
            lift: sample.dynamic_lift,
        });
        self.telemetry.publish(FlightEvent::ThermalLift {
            lift: sample.thermal_lift,
        });
        self.telemetry.publish(FlightEvent::Gradient {
            gradient: sample.gradient,
        });
        if let Some(height) = sample.height_above_ground {
            self.telemetry
                .publish(FlightEvent::HeightAboveGround { height });
        }
    }

    fn air_speed_for(&self, parameters: &FlightParameters) -> f32 {
        let mut speed = parameters.trim_speed;
        if self.controls.speed_bar {
            speed *= SPEED_BAR_SPEED_FACTOR;
        }
        if self.controls.ears {
            speed *= EARS_SPEED_FACTOR;
        }
        speed
    }

    fn glide_ratio_for(&self, parameters: &FlightParameters) -> f32 {
        let mut ratio = parameters.glide_ratio;
        if self.controls.speed_bar {
            ratio *= SPEED_BAR_GLIDE_FACTOR;
        }
        if self.controls.ears {
            ratio *= EARS_GLIDE_FACTOR;
        }
        ratio
    }

    pub fn left_break_input(&mut self) {
        self.controls.left_break = true;
        self.visual.break_left();
    }

    pub fn left_break_release(&mut self) {
        self.controls.left_break = false;
        self.refresh_pose();
    }

    pub fn right_break_input(&mut self) {
        self.controls.right_break = true;
        self.visual.break_right();
    }

    pub fn right_break_release(&mut self) {
        self.controls.right_break = false;
        self.refresh_pose();
    }

    fn refresh_pose(&mut self) {
        match (self.controls.left_break, self.controls.right_break) {
            (true, _) => self.visual.break_left(),
            (false, true) => self.visual.break_right(),
            (false, false) => self.visual.hands_up(),
        }
    }

    /// Analog steering in [-1, 1], positive to the right. `0` returns to the
    /// breaks.
    pub fn direction_input(&mut self, value: f32) {
        let stored = self.controls.set_direction(value);
        if stored != value {
            warn!("Direction input {value} clamped to {stored}.");
        }
    }

    pub fn toggle_speed_bar(&mut self) {
        self.controls.speed_bar = !self.controls.speed_bar;
    }

    pub fn toggle_ears(&mut self) {
        self.controls.ears = !self.controls.ears;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Takes effect on the next tick. Negative or non-finite values are
    /// ignored.
    pub fn update_wrap_speed(&mut self, multiplier: f32) {
        if !(multiplier >= 0.0 && multiplier.is_finite()) {
            warn!("Ignoring wrap speed {multiplier}; it must be >= 0.");
            return;
        }
        self.wrap_speed = multiplier;
    }

    pub fn wrap_speed(&self) -> f32 {
        self.wrap_speed
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn altitude(&self) -> f32 {
        self.position.y
    }

    pub fn air_speed(&self) -> f32 {
        self.air_speed_for(&self.parameters.read())
    }

    pub fn gliding_ratio(&self) -> f32 {
        self.glide_ratio_for(&self.parameters.read())
    }

    pub fn is_on_speed_bar(&self) -> bool {
        self.controls.speed_bar
    }

    pub fn is_on_ears(&self) -> bool {
        self.controls.ears
    }

    pub fn flying_time(&self) -> f32 {
        self.flying_time
    }

    pub fn meters_flown(&self) -> f32 {
        self.meters_flown
    }

    pub fn trajectory(&self) -> &TrajectoryRecorder {
        &self.trajectory
    }

    pub fn ground_touches(&self) -> u32 {
        self.ground_touches
    }

    pub fn has_crashed(&self) -> bool {
        self.crashed
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn roll(&self) -> f32 {
        self.roll
    }

    pub fn orientation(&self) -> Quat {
        orientation(self.yaw, self.roll)
    }

    pub fn rotation_inertia(&self) -> f32 {
        self.inertia.value()
    }

    pub fn controls(&self) -> &ControlState {
        &self.controls
    }

    pub fn parameters(&self) -> &Shared<FlightParameters> {
        &self.parameters
    }

    pub fn wind(&self) -> &WindModel {
        &self.wind
    }

    pub fn thermals(&self) -> &ThermalField {
        &self.thermals
    }

    pub fn glider_half_extents(&self) -> Vec3 {
        self.glider_half_extents
    }

    pub fn subscribe(&mut self, listener: TelemetryListener) {
        self.telemetry.subscribe(listener);
    }

    /// Events published since the last drain, in publication order. A model
    /// that queues events must be drained regularly.
    pub fn drain_events(&mut self) -> impl Iterator<Item = FlightEvent> + '_ {
        self.telemetry.drain()
    }

    pub fn summary(&self) -> FlightSummary {
        FlightSummary {
            flying_time_s: self.flying_time,
            meters_flown: self.meters_flown,
            ground_touches: self.ground_touches,
            max_altitude: self
                .trajectory
                .max_altitude()
                .unwrap_or(self.position.y)
                .max(self.position.y),
            trajectory_points: self.trajectory.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::thermal::Thermal;
    use crate::flight::visual::{PilotPose, SharedPilotPose};

    const DT: f32 = TICK_INTERVAL_SECS;

    fn flat_ground() -> Arc<dyn TerrainHeightQuery + Send + Sync> {
        Arc::new(|p: Vec3| -> Option<f32> { (p.y >= 0.0).then_some(0.0) })
    }

    fn parameters(trim_speed: f32, glide_ratio: f32) -> Shared<FlightParameters> {
        Shared::new(FlightParameters {
            glide_ratio,
            trim_speed,
            ..FlightParameters::default()
        })
    }

    fn model_at(start: Vec3) -> FlightModel {
        FlightModel::builder()
            .parameters(parameters(9.72, 9.0))
            .weather(Shared::new(Weather::default()))
            .terrain(flat_ground())
            .start(start, 0.0)
            .build()
            .expect("valid flight model")
    }

    fn deltas(model: &mut FlightModel) -> Vec<f32> {
        model
            .drain_events()
            .filter_map(|event| match event {
                FlightEvent::Delta { delta } => Some(delta),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn speed_bar_and_ears_compose() {
        let mut model = FlightModel::builder()
            .parameters(parameters(10.0, 8.0))
            .weather(Shared::new(Weather::default()))
            .terrain(flat_ground())
            .build()
            .expect("valid flight model");
        model.toggle_speed_bar();
        assert!((model.air_speed() - 12.0).abs() < 1e-5);
        model.toggle_ears();
        assert!(model.is_on_speed_bar() && model.is_on_ears());
        assert!((model.air_speed() - 9.6).abs() < 1e-5);
        assert!((model.gliding_ratio() - 8.0 * 0.8 * 0.8).abs() < 1e-5);
        model.toggle_speed_bar();
        model.toggle_ears();
        assert_eq!(model.air_speed(), 10.0);
    }

    #[test]
    fn missing_collaborators_fail_fast() {
        let missing_terrain = FlightModel::builder()
            .parameters(parameters(9.72, 9.0))
            .weather(Shared::new(Weather::default()))
            .build();
        assert_eq!(
            missing_terrain.err(),
            Some(FlightError::MissingCollaborator("terrain"))
        );

        let missing_weather = FlightModel::builder()
            .parameters(parameters(9.72, 9.0))
            .terrain(flat_ground())
            .build();
        assert_eq!(
            missing_weather.err(),
            Some(FlightError::MissingCollaborator("weather"))
        );

        let bad_ratio = FlightModel::builder()
            .parameters(parameters(9.72, 0.0))
            .weather(Shared::new(Weather::default()))
            .terrain(flat_ground())
            .build();
        assert!(matches!(
            bad_ratio.err(),
            Some(FlightError::InvalidParameter(_))
        ));
    }

    #[test]
    fn init_and_stop_are_idempotent() {
        let mut model = model_at(Vec3::new(0.0, 1_000.0, 0.0));
        model.tick(DT);
        assert_eq!(model.position(), Vec3::new(0.0, 1_000.0, 0.0));

        model.init();
        model.init();
        assert!(model.is_running());
        model.tick(DT);
        let moved = model.position();
        assert!(moved.z > 0.0);

        model.stop();
        model.stop();
        assert!(!model.is_running());
        model.tick(DT);
        assert_eq!(model.position(), moved);
    }

    #[test]
    fn undefined_terrain_crashes_on_first_check() {
        let mut model = FlightModel::builder()
            .parameters(parameters(9.72, 9.0))
            .weather(Shared::new(Weather::default()))
            .terrain(Arc::new(|_: Vec3| -> Option<f32> { None }))
            .start(Vec3::new(0.0, 5_000.0, 0.0), 0.0)
            .build()
            .expect("valid flight model");
        model.init();
        model.tick(DT);

        let events: Vec<_> = model.drain_events().collect();
        assert!(events.contains(&FlightEvent::TouchedGround { ground_touches: 1 }));
        assert!(events.contains(&FlightEvent::Crashed));
        assert!(model.has_crashed());
        assert_eq!(
            model.trajectory().points()[0].point_type,
            PointType::TouchGround
        );
    }

    #[test]
    fn glides_down_to_flat_ground_and_crashes_once() {
        let mut model = model_at(Vec3::new(0.0, 1_000.0, 0.0));
        let crashes = Arc::new(std::sync::Mutex::new(0_u32));
        let counter = Arc::clone(&crashes);
        model.subscribe(Box::new(move |event: &FlightEvent| {
            if *event == FlightEvent::Crashed {
                *counter.lock().expect("crash counter") += 1;
            }
        }));
        model.init();

        let expected_sink = 9.72 / 9.0;
        let mut previous = model.altitude();
        let mut crash_altitude = None;
        for _ in 0..40_000 {
            model.tick(DT);
            for delta in deltas(&mut model) {
                assert!((delta + expected_sink).abs() < 0.01, "delta {delta}");
            }
            assert!(model.altitude() < previous);
            previous = model.altitude();
            if crash_altitude.is_none() && model.has_crashed() {
                crash_altitude = Some(model.altitude());
            }
        }

        let crash_altitude = crash_altitude.expect("glider reached the ground");
        let per_check = expected_sink * DT * GROUND_CHECK_INTERVAL as f32;
        assert!(crash_altitude < 20.0);
        assert!(crash_altitude > 20.0 - per_check - 0.1);
        assert_eq!(*crashes.lock().expect("crash counter"), 1);
        assert!(model.ground_touches() > 1);

        // f32 accumulators drift over 40k ticks.
        let flying_time = model.flying_time();
        assert!((flying_time / (40_000.0 * DT) - 1.0).abs() < 1e-2);
        assert!((model.meters_flown() / (9.72 * flying_time) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn lift_is_only_refreshed_on_ground_checks() {
        let thermal = Thermal {
            bottom_radius: 100.0,
            top_radius: 100.0,
            height: 2_000.0,
            position: Vec3::ZERO,
            opacity: 0.2,
            is_main_thermal: true,
            is_super_thermal: false,
        };
        let mut model = FlightModel::builder()
            .parameters(parameters(9.72, 9.0))
            .weather(Shared::new(Weather::default()))
            .terrain(flat_ground())
            .thermals(Arc::new(ThermalField::new(vec![thermal])))
            .start(Vec3::new(0.0, 500.0, 0.0), 0.0)
            .build()
            .expect("valid flight model");
        model.init();
        let sink = 9.72 / 9.0;

        model.tick(DT);
        let first = deltas(&mut model);
        assert!((first[0] - (2.0 - sink)).abs() < 0.01);

        model.set_position(Vec3::new(1_000.0, 500.0, 0.0));
        for _ in 1..GROUND_CHECK_INTERVAL {
            model.tick(DT);
            let cached = deltas(&mut model);
            assert!((cached[0] - (2.0 - sink)).abs() < 0.01);
        }

        model.tick(DT);
        let refreshed = deltas(&mut model);
        assert!((refreshed[0] + sink).abs() < 0.01);
    }

    #[test]
    fn lift_terms_are_published_on_ground_checks_only() {
        // Ground rises toward +z; the wind blows toward +z as well.
        let slope: Arc<dyn TerrainHeightQuery + Send + Sync> =
            Arc::new(|p: Vec3| -> Option<f32> {
                let ground = (p.z * 0.5).max(0.0);
                (ground <= p.y).then_some(ground)
            });
        let thermal = Thermal {
            bottom_radius: 100.0,
            top_radius: 100.0,
            height: 2_000.0,
            position: Vec3::new(0.0, 0.0, 400.0),
            opacity: 0.2,
            is_main_thermal: true,
            is_super_thermal: false,
        };
        let mut model = FlightModel::builder()
            .parameters(parameters(9.72, 9.0))
            .weather(Shared::new(Weather {
                wind_bearing_degrees: 0.0,
                wind_speed_mps: 5.0,
                ..Weather::default()
            }))
            .terrain(slope)
            .thermals(Arc::new(ThermalField::new(vec![thermal])))
            .start(Vec3::new(0.0, 300.0, 400.0), 0.0)
            .build()
            .expect("valid flight model");
        model.init();

        model.tick(DT);
        let events: Vec<_> = model.drain_events().collect();
        let mut dynamic = None;
        let mut thermal_lift = None;
        let mut gradient = None;
        let mut height = None;
        for event in &events {
            match *event {
                FlightEvent::DynamicLift { lift } => dynamic = Some(lift),
                FlightEvent::ThermalLift { lift } => thermal_lift = Some(lift),
                FlightEvent::Gradient { gradient: g } => gradient = Some(g),
                FlightEvent::HeightAboveGround { height: h } => height = Some(h),
                _ => {}
            }
        }
        // here = 200, windward = 175
        let ratio = (300.0 - 200.0) / 300.0;
        let expected_dynamic = (1.0 - ratio) * 200.0 * 0.002 * 0.5;
        let dynamic = dynamic.expect("dynamic lift published");
        assert!((dynamic - expected_dynamic).abs() < 1e-4, "dynamic {dynamic}");
        assert_eq!(thermal_lift, Some(2.0));
        let gradient = gradient.expect("gradient published");
        assert!((gradient - 0.5).abs() < 1e-5);
        let height = height.expect("height above ground published");
        assert!((height - 100.0).abs() < 1e-3);

        for tick in 1..=10_u64 {
            model.tick(DT);
            let lift_events = model
                .drain_events()
                .filter(|event| {
                    matches!(
                        event,
                        FlightEvent::DynamicLift { .. }
                            | FlightEvent::ThermalLift { .. }
                            | FlightEvent::Gradient { .. }
                            | FlightEvent::HeightAboveGround { .. }
                    )
                })
                .count();
            let expected = if tick % GROUND_CHECK_INTERVAL == 0 { 4 } else { 0 };
            assert_eq!(lift_events, expected, "tick {tick}");
        }
        assert!(!model.has_crashed());
    }

    #[test]
    fn thermal_lift_follows_the_glider_heading() {
        let thermal_lift_at_start = |yaw: f32| {
            let column = Thermal {
                bottom_radius: 50.0,
                top_radius: 50.0,
                height: 1_000.0,
                position: Vec3::ZERO,
                opacity: 0.2,
                is_main_thermal: true,
                is_super_thermal: false,
            };
            let mut model = FlightModel::builder()
                .parameters(parameters(9.72, 9.0))
                .weather(Shared::new(Weather::default()))
                .terrain(flat_ground())
                .thermals(Arc::new(ThermalField::new(vec![column])))
                .start(Vec3::new(0.0, 500.0, 46.0), yaw)
                .build()
                .expect("valid flight model");
            model.init();
            model.tick(DT);
            model.drain_events().find_map(|event| match event {
                FlightEvent::ThermalLift { lift } => Some(lift),
                _ => None,
            })
        };

        // Wingspan across the wall fits; wingspan toward the wall pokes out.
        assert_eq!(thermal_lift_at_start(0.0), Some(2.0));
        assert_eq!(
            thermal_lift_at_start(std::f32::consts::FRAC_PI_2),
            Some(0.0)
        );
    }

    #[test]
    fn trajectory_is_sampled_every_tenth_tick() {
        let mut model = model_at(Vec3::new(0.0, 1_000.0, 0.0));
        model.init();
        for tick in 0..25 {
            if tick == 20 {
                model.toggle_speed_bar();
            }
            model.tick(DT);
        }
        let kinds: Vec<_> = model
            .trajectory()
            .points()
            .iter()
            .map(|point| point.point_type)
            .collect();
        assert_eq!(
            kinds,
            vec![PointType::Normal, PointType::Normal, PointType::SpeedBar]
        );
    }

    #[test]
    fn wind_changes_apply_on_next_tick() {
        let weather = Shared::new(Weather::default());
        let mut model = FlightModel::builder()
            .parameters(parameters(9.72, 9.0))
            .weather(weather.clone())
            .terrain(flat_ground())
            .start(Vec3::new(0.0, 1_000.0, 0.0), 0.0)
            .build()
            .expect("valid flight model");
        model.init();
        model.tick(DT);
        assert!(model.position().x.abs() < 1e-5);

        model.wind().change_direction(90.0);
        model.wind().change_speed(5.0);
        model.tick(DT);
        assert!((model.position().x - 5.0 * DT).abs() < 1e-4);
        assert_eq!(weather.read().wind_speed_mps, 5.0);
    }

    #[test]
    fn breaks_turn_the_glider_and_move_the_pilot() {
        let pose = SharedPilotPose::default();
        let mut model = FlightModel::builder()
            .parameters(parameters(9.72, 9.0))
            .weather(Shared::new(Weather::default()))
            .terrain(flat_ground())
            .start(Vec3::new(0.0, 1_000.0, 0.0), 0.0)
            .visual(Box::new(pose.clone()))
            .build()
            .expect("valid flight model");
        model.init();

        model.left_break_input();
        assert_eq!(pose.current(), PilotPose::BreakLeft);
        for _ in 0..20 {
            model.tick(DT);
        }
        assert!(model.rotation_inertia() < 0.0);
        assert!(model.yaw() > 0.0);
        assert!(model.roll() < 0.0);

        model.right_break_input();
        model.left_break_release();
        assert_eq!(pose.current(), PilotPose::BreakRight);
        model.right_break_release();
        assert_eq!(pose.current(), PilotPose::HandsUp);
    }

    #[test]
    fn invalid_wrap_speed_is_ignored() {
        let mut model = model_at(Vec3::new(0.0, 1_000.0, 0.0));
        model.update_wrap_speed(4.0);
        model.update_wrap_speed(-1.0);
        model.update_wrap_speed(f32::NAN);
        assert_eq!(model.wrap_speed(), 4.0);
        model.update_wrap_speed(0.0);
        assert_eq!(model.wrap_speed(), 0.0);
    }

    #[test]
    fn summary_reflects_flight() {
        let mut model = model_at(Vec3::new(0.0, 1_000.0, 0.0));
        model.init();
        for _ in 0..40 {
            model.tick(DT);
        }
        let summary = model.summary();
        assert_eq!(summary.trajectory_points, 4);
        assert_eq!(summary.ground_touches, 0);
        assert!(summary.max_altitude < 1_000.0 && summary.max_altitude > 999.0);
        assert!((summary.flying_time_s - 1.0).abs() < 1e-4);
    }
}
