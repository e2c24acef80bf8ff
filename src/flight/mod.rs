pub mod controls;
pub mod crash;
pub mod math;
pub mod model;
pub mod shared;
pub mod telemetry;
pub mod terrain;
pub mod thermal;
pub mod trajectory;
pub mod visual;
pub mod wind;

use crate::config::GameConfig;
use crate::states::GameState;
use bevy::prelude::*;
use model::{FlightError, FlightModel};
use shared::Shared;
use std::sync::Arc;
use std::time::Duration;
use telemetry::FlightEvent;
use terrain::HeightfieldTerrain;
use thermal::ThermalField;
use visual::SharedPilotPose;

pub const MIN_WRAP_SPEED: f32 = 0.25;
pub const MAX_WRAP_SPEED: f32 = 32.0;
/// Ticks run in one frame at most; a longer stall drops the backlog.
const MAX_TICKS_PER_FRAME: u32 = 16;

pub struct FlightPlugin;

impl Plugin for FlightPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<FlightEvent>()
            .add_systems(OnEnter(GameState::InFlight), start_or_resume_flight)
            .add_systems(OnEnter(GameState::Pause), suspend_flight)
            .add_systems(OnExit(GameState::Results), discard_flight)
            .add_systems(
                Update,
                (
                    flight_controls,
                    advance_flight,
                    forward_flight_events,
                    finish_flight_on_crash,
                )
                    .chain()
                    .run_if(in_state(GameState::InFlight))
                    .run_if(resource_exists::<FlightSim>),
            )
            .add_systems(
                Update,
                apply_config_to_live_flight
                    .run_if(resource_exists_and_changed::<GameConfig>)
                    .run_if(resource_exists::<FlightSim>),
            );
    }
}

/// The running flight and everything the host needs to drive it.
#[derive(Resource)]
pub struct FlightSim {
    pub model: FlightModel,
    pub pilot_pose: SharedPilotPose,
    pub terrain: Arc<HeightfieldTerrain>,
    clock: Timer,
    tick_interval_secs: f32,
}

impl FlightSim {
    pub fn from_config(config: &GameConfig) -> Result<Self, FlightSetupError> {
        let terrain = Arc::new(config.heightfield().map_err(FlightSetupError::Config)?);
        let weather = Shared::new(config.weather);
        let thermal_specs = config.thermal_specs();
        let thermals = Arc::new(ThermalField::from_specs(&thermal_specs, &config.weather));
        let pilot_pose = SharedPilotPose::default();

        let mut model = FlightModel::builder()
            .parameters(Shared::new(config.game.flight))
            .weather(weather)
            .thermals(thermals)
            .terrain(terrain.clone())
            .glider_half_extents(config.glider_half_extents())
            .start(config.start_position(), config.start_yaw())
            .visual(Box::new(pilot_pose.clone()))
            .queue_events(true)
            .build()
            .map_err(FlightSetupError::Model)?;
        model.update_wrap_speed(config.game.app.wrap_speed);

        let tick_interval = Duration::from_millis(config.game.app.tick_interval_ms);
        Ok(Self {
            model,
            pilot_pose,
            terrain,
            clock: Timer::new(tick_interval, TimerMode::Repeating),
            tick_interval_secs: tick_interval.as_secs_f32(),
        })
    }

    /// Simulated seconds covered by the next tick.
    pub fn tick_dt(&self) -> f32 {
        self.tick_interval_secs * self.model.wrap_speed()
    }
}

#[derive(Debug)]
pub enum FlightSetupError {
    Config(crate::config::ConfigError),
    Model(FlightError),
}

impl std::fmt::Display for FlightSetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "{error}"),
            Self::Model(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for FlightSetupError {}

fn start_or_resume_flight(
    mut commands: Commands,
    config: Option<Res<GameConfig>>,
    sim: Option<ResMut<FlightSim>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if let Some(mut sim) = sim {
        sim.model.init();
        return;
    }

    let Some(config) = config else {
        error!("Cannot start a flight before the config is loaded.");
        next_state.set(GameState::Boot);
        return;
    };

    match FlightSim::from_config(&config) {
        Ok(mut sim) => {
            sim.model.init();
            commands.insert_resource(sim);
        }
        Err(error) => {
            error!("Flight setup failed: {error}");
            next_state.set(GameState::Results);
        }
    }
}

fn suspend_flight(sim: Option<ResMut<FlightSim>>) {
    if let Some(mut sim) = sim {
        sim.model.stop();
    }
}

fn discard_flight(mut commands: Commands) {
    commands.remove_resource::<FlightSim>();
}

fn flight_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut sim: ResMut<FlightSim>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let model = &mut sim.model;
    let left = [KeyCode::KeyA, KeyCode::ArrowLeft];
    let right = [KeyCode::KeyD, KeyCode::ArrowRight];

    if keyboard.any_just_pressed(left) {
        model.left_break_input();
    }
    if keyboard.any_just_released(left) && !keyboard.any_pressed(left) {
        model.left_break_release();
    }
    if keyboard.any_just_pressed(right) {
        model.right_break_input();
    }
    if keyboard.any_just_released(right) && !keyboard.any_pressed(right) {
        model.right_break_release();
    }

    if keyboard.just_pressed(KeyCode::KeyS) {
        model.toggle_speed_bar();
        info!(
            "Speed bar {}.",
            if model.is_on_speed_bar() { "on" } else { "off" }
        );
    }
    if keyboard.just_pressed(KeyCode::KeyE) {
        model.toggle_ears();
        info!("Big ears {}.", if model.is_on_ears() { "in" } else { "out" });
    }

    if keyboard.just_pressed(KeyCode::BracketRight) {
        let wrap_speed = step_wrap_speed(model.wrap_speed(), true);
        model.update_wrap_speed(wrap_speed);
        info!("Wrap speed x{wrap_speed}.");
    }
    if keyboard.just_pressed(KeyCode::BracketLeft) {
        let wrap_speed = step_wrap_speed(model.wrap_speed(), false);
        model.update_wrap_speed(wrap_speed);
        info!("Wrap speed x{wrap_speed}.");
    }

    if keyboard.just_pressed(KeyCode::Escape) {
        next_state.set(GameState::Pause);
    }
}

/// Doubles or halves the wrap speed within [`MIN_WRAP_SPEED`, `MAX_WRAP_SPEED`].
fn step_wrap_speed(current: f32, faster: bool) -> f32 {
    let next = if faster { current * 2.0 } else { current * 0.5 };
    next.clamp(MIN_WRAP_SPEED, MAX_WRAP_SPEED)
}

fn advance_flight(time: Res<Time<Real>>, mut sim: ResMut<FlightSim>) {
    sim.clock.tick(time.delta());
    let due = sim.clock.times_finished_this_tick();
    let dt = sim.tick_dt();
    run_due_ticks(&mut sim.model, due, dt);
}

/// Runs up to `due` ticks, capped per frame, and stops early once the glider
/// has crashed. Returns the number of ticks run.
fn run_due_ticks(model: &mut FlightModel, due: u32, dt: f32) -> u32 {
    let mut ran = 0;
    while ran < due.min(MAX_TICKS_PER_FRAME) && !model.has_crashed() {
        model.tick(dt);
        ran += 1;
    }
    ran
}

fn forward_flight_events(mut sim: ResMut<FlightSim>, mut writer: MessageWriter<FlightEvent>) {
    for event in sim.model.drain_events() {
        writer.write(event);
    }
}

fn finish_flight_on_crash(
    mut events: MessageReader<FlightEvent>,
    mut sim: ResMut<FlightSim>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if !events.read().any(|event| *event == FlightEvent::Crashed) {
        return;
    }

    sim.model.stop();
    let summary = sim.model.summary();
    info!(
        "Flight over: {:.1}s airborne, {:.0}m flown, {} ground touches.",
        summary.flying_time_s, summary.meters_flown, summary.ground_touches
    );
    next_state.set(GameState::Results);
}

/// Hot-reloaded tuning reaches the running flight through its shared handles.
fn apply_config_to_live_flight(config: Res<GameConfig>, mut sim: ResMut<FlightSim>) {
    *sim.model.parameters().write() = config.game.flight;
    *sim.model.wind().weather().write() = config.weather;
    sim.model.update_wrap_speed(config.game.app.wrap_speed);
}
