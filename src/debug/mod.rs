use crate::config::GameConfig;
use crate::flight::model::FlightParameters;
use crate::flight::telemetry::FlightEvent;
use crate::flight::wind::Weather;
use crate::flight::{FlightSim, MAX_WRAP_SPEED};
use crate::states::GameState;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use std::fs;
use std::path::Path;

pub struct DebugOverlayPlugin;

impl Plugin for DebugOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FlightReadout>()
            .init_resource::<KeybindOverlayState>()
            .init_resource::<FlightTuningPanelState>()
            .add_systems(Update, spawn_debug_overlay)
            .add_systems(Update, toggle_keybind_overlay)
            .add_systems(Update, toggle_flight_tuning_panel)
            .add_systems(Update, sync_keybind_overlay_visibility)
            .add_systems(OnExit(GameState::Results), reset_readout)
            .add_systems(
                Update,
                (update_flight_readout, update_debug_overlay_text)
                    .chain()
                    .run_if(resource_exists::<FlightSim>),
            )
            .add_systems(
                EguiPrimaryContextPass,
                flight_tuning_panel_ui
                    .run_if(in_state(GameState::InFlight))
                    .run_if(resource_exists::<GameConfig>)
                    .run_if(resource_exists::<FlightSim>),
            );
    }
}

#[derive(Component)]
struct DebugOverlayText;

#[derive(Component)]
struct KeybindOverlayText;

/// Latest value of every telemetry stream.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct FlightReadout {
    pub position: Vec3,
    pub vario_mps: f32,
    pub sink_mps: f32,
    pub dynamic_lift_mps: f32,
    pub thermal_lift_mps: f32,
    pub gradient: f32,
    pub height_above_ground: Option<f32>,
    pub ground_touches: u32,
    pub crashed: bool,
}

impl FlightReadout {
    pub fn apply(&mut self, event: &FlightEvent) {
        match *event {
            FlightEvent::Position { position } => self.position = position,
            FlightEvent::Delta { delta } => self.vario_mps = delta,
            FlightEvent::Drop { drop } => self.sink_mps = drop,
            FlightEvent::DynamicLift { lift } => self.dynamic_lift_mps = lift,
            FlightEvent::ThermalLift { lift } => self.thermal_lift_mps = lift,
            FlightEvent::Gradient { gradient } => self.gradient = gradient,
            FlightEvent::HeightAboveGround { height } => self.height_above_ground = Some(height),
            FlightEvent::TouchedGround { ground_touches } => self.ground_touches = ground_touches,
            FlightEvent::Crashed => self.crashed = true,
        }
    }
}

#[derive(Resource, Debug, Clone, Default)]
struct KeybindOverlayState {
    visible: bool,
}

#[derive(Resource, Debug, Default)]
struct FlightTuningPanelState {
    visible: bool,
    status: String,
}

fn spawn_debug_overlay(
    mut commands: Commands,
    keybind_overlay: Res<KeybindOverlayState>,
    config: Option<Res<GameConfig>>,
    existing_overlay: Query<Entity, With<DebugOverlayText>>,
) {
    if !existing_overlay.is_empty() {
        return;
    }

    let Some(config) = config else {
        return;
    };

    if !config.game.app.debug_overlay {
        return;
    }

    commands.spawn((
        DebugOverlayText,
        Text::new("debug overlay initializing..."),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        TextColor(Color::srgb(0.08, 0.10, 0.14)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            top: Val::Px(12.0),
            ..default()
        },
        ZIndex(100),
    ));

    commands.spawn((
        KeybindOverlayText,
        Text::new(keybind_overlay_text()),
        TextFont {
            font_size: 15.0,
            ..default()
        },
        TextColor(Color::srgb(0.90, 0.94, 0.97)),
        BackgroundColor(Color::srgba(0.06, 0.08, 0.10, 0.82)),
        BorderColor::all(Color::srgba(0.60, 0.68, 0.74, 0.9)),
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(12.0),
            top: Val::Px(12.0),
            padding: UiRect::axes(Val::Px(10.0), Val::Px(8.0)),
            border: UiRect::all(Val::Px(1.0)),
            ..default()
        },
        if keybind_overlay.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        },
        ZIndex(100),
    ));
}

fn reset_readout(mut readout: ResMut<FlightReadout>) {
    *readout = FlightReadout::default();
}

fn update_flight_readout(
    mut events: MessageReader<FlightEvent>,
    mut readout: ResMut<FlightReadout>,
) {
    for event in events.read() {
        readout.apply(event);
    }
}

fn update_debug_overlay_text(
    diagnostics: Res<DiagnosticsStore>,
    readout: Res<FlightReadout>,
    sim: Res<FlightSim>,
    mut overlay_query: Query<&mut Text, With<DebugOverlayText>>,
) {
    let Ok(mut text) = overlay_query.single_mut() else {
        return;
    };

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|value| value.smoothed())
        .unwrap_or(0.0);

    let model = &sim.model;
    let weather = model.wind().weather().snapshot();
    let agl = readout
        .height_above_ground
        .map(|height| format!("{height:>6.0} m"))
        .unwrap_or_else(|| "   n/a".to_string());

    *text = Text::new(format!(
        "FPS: {fps:>5.1}\n\
Altitude: {altitude:>6.0} m | AGL: {agl}\n\
Vario: {vario:>+5.2} m/s | Sink: {sink:>4.2} m/s\n\
Lift: ridge {ridge:>4.2} | thermal {thermal:>3.1} | gradient {gradient:>4.2}\n\
Airspeed: {airspeed:>5.2} m/s | Glide: {glide:>4.2}\n\
Speed bar: {bar} | Ears: {ears}\n\
Turn: inertia {inertia:>+6.2} | roll {roll:>5.1} deg\n\
Wind: {bearing:>3.0} deg at {wind:>4.1} m/s\n\
Wrap: x{wrap} | Time {time:>6.1}s | Flown {flown:>6.0} m\n\
Ground touches: {touches}{crashed}",
        altitude = readout.position.y,
        vario = readout.vario_mps,
        sink = readout.sink_mps,
        ridge = readout.dynamic_lift_mps,
        thermal = readout.thermal_lift_mps,
        gradient = readout.gradient,
        airspeed = model.air_speed(),
        glide = model.gliding_ratio(),
        bar = if model.is_on_speed_bar() { "on" } else { "off" },
        ears = if model.is_on_ears() { "in" } else { "out" },
        inertia = model.rotation_inertia(),
        roll = model.roll().to_degrees(),
        bearing = weather.wind_bearing_degrees,
        wind = weather.wind_speed_mps,
        wrap = model.wrap_speed(),
        time = model.flying_time(),
        flown = model.meters_flown(),
        touches = readout.ground_touches,
        crashed = if readout.crashed { " (crashed)" } else { "" },
    ));
}

fn toggle_keybind_overlay(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut state: ResMut<KeybindOverlayState>,
    config: Option<Res<GameConfig>>,
) {
    let Some(config) = config else {
        return;
    };

    if !config.game.app.debug_overlay {
        return;
    }

    if keyboard.just_pressed(KeyCode::KeyH) {
        state.visible = !state.visible;
        info!(
            "Debug keybind panel {}.",
            if state.visible { "shown" } else { "hidden" }
        );
    }
}

fn sync_keybind_overlay_visibility(
    state: Res<KeybindOverlayState>,
    mut query: Query<&mut Visibility, With<KeybindOverlayText>>,
) {
    if !state.is_changed() {
        return;
    }

    let next_visibility = if state.visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };

    for mut visibility in &mut query {
        *visibility = next_visibility;
    }
}

fn toggle_flight_tuning_panel(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut panel_state: ResMut<FlightTuningPanelState>,
) {
    if !keyboard.just_pressed(KeyCode::KeyT) {
        return;
    }

    panel_state.visible = !panel_state.visible;
    info!(
        "Flight tuning panel {}.",
        if panel_state.visible { "shown" } else { "hidden" }
    );
}

fn flight_tuning_panel_ui(
    mut egui_contexts: EguiContexts,
    mut panel_state: ResMut<FlightTuningPanelState>,
    mut config: ResMut<GameConfig>,
    mut sim: ResMut<FlightSim>,
) {
    if !panel_state.visible {
        return;
    }

    let mut params = sim.model.parameters().snapshot();
    let mut weather = sim.model.wind().weather().snapshot();
    let mut wrap_speed = sim.model.wrap_speed();
    let mut direction = sim.model.controls().direction();

    let mut window_open = panel_state.visible;
    let mut params_changed = false;
    let mut weather_changed = false;
    let mut wrap_changed = false;
    let mut direction_changed = false;
    let mut reset_clicked = false;
    let mut save_clicked = false;
    let status = panel_state.status.clone();

    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };
    egui::Window::new("Flight Tuning")
        .open(&mut window_open)
        .resizable(true)
        .default_width(520.0)
        .show(ctx, |ui| {
            ui.label("Values apply to the running flight on the next tick.");
            ui.separator();

            ui.collapsing("Wing", |ui| {
                params_changed |=
                    tuning_slider_row(ui, "glide_ratio", &mut params.glide_ratio, 1.0..=15.0, 0.05);
                params_changed |=
                    tuning_slider_row(ui, "trim_speed", &mut params.trim_speed, 3.0..=20.0, 0.05);
                params_changed |= tuning_slider_row(
                    ui,
                    "full_speed_bar_speed",
                    &mut params.full_speed_bar_speed,
                    3.0..=25.0,
                    0.05,
                );
                params_changed |= tuning_slider_row(
                    ui,
                    "big_ears_speed",
                    &mut params.big_ears_speed,
                    3.0..=20.0,
                    0.05,
                );
            });

            ui.collapsing("Weather", |ui| {
                weather_changed |= tuning_slider_row(
                    ui,
                    "wind_bearing_degrees",
                    &mut weather.wind_bearing_degrees,
                    0.0..=359.0,
                    1.0,
                );
                weather_changed |= tuning_slider_row(
                    ui,
                    "wind_speed_mps",
                    &mut weather.wind_speed_mps,
                    0.0..=15.0,
                    0.1,
                );
            });

            ui.collapsing("Simulation", |ui| {
                wrap_changed |= tuning_slider_row(
                    ui,
                    "wrap_speed",
                    &mut wrap_speed,
                    0.0..=MAX_WRAP_SPEED,
                    0.05,
                );
                direction_changed |=
                    tuning_slider_row(ui, "direction (analog)", &mut direction, -1.0..=1.0, 0.01);
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Reset From Config").clicked() {
                    reset_clicked = true;
                }
                if ui.button("Save To game.toml + weather.toml").clicked() {
                    save_clicked = true;
                }
            });

            if !status.is_empty() {
                ui.separator();
                ui.label(status.as_str());
            }
        });

    panel_state.visible = window_open;

    if reset_clicked {
        *sim.model.parameters().write() = config.game.flight;
        *sim.model.wind().weather().write() = config.weather;
        sim.model.update_wrap_speed(config.game.app.wrap_speed);
        panel_state.status = "Reset live values from current config.".to_string();
        return;
    }

    if params_changed {
        params.glide_ratio = params.glide_ratio.max(0.1);
        params.trim_speed = params.trim_speed.max(0.1);
        *sim.model.parameters().write() = params;
        panel_state.status = "Live-tuning active (shared flight parameters updated).".to_string();
    }
    if weather_changed {
        sim.model.wind().change_direction(weather.wind_bearing_degrees);
        sim.model.wind().change_speed(weather.wind_speed_mps.max(0.0));
    }
    if wrap_changed {
        sim.model.update_wrap_speed(wrap_speed);
    }
    if direction_changed {
        sim.model.direction_input(direction);
    }

    if save_clicked {
        let params = sim.model.parameters().snapshot();
        let weather = sim.model.wind().weather().snapshot();
        match persist_tuning_and_reload(&mut config, &params, &weather) {
            Ok(message) => panel_state.status = message,
            Err(error) => panel_state.status = error,
        }
    }
}

fn tuning_slider_row(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut f32,
    slider_range: std::ops::RangeInclusive<f32>,
    drag_speed: f32,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        changed |= ui
            .add(egui::Slider::new(value, slider_range).show_value(false))
            .changed();
        changed |= ui
            .add(egui::DragValue::new(value).speed(drag_speed as f64))
            .changed();
    });
    changed
}

fn persist_tuning_and_reload(
    config: &mut GameConfig,
    params: &FlightParameters,
    weather: &Weather,
) -> Result<String, String> {
    let config_dir = Path::new("config");
    let game_path = config_dir.join("game.toml");
    let weather_path = config_dir.join("weather.toml");
    let original_game = fs::read_to_string(&game_path)
        .map_err(|error| format!("Failed reading `{}`: {error}", game_path.display()))?;
    let original_weather = fs::read_to_string(&weather_path)
        .map_err(|error| format!("Failed reading `{}`: {error}", weather_path.display()))?;

    let updated_game = rewrite_toml_floats(
        &original_game,
        Some("flight"),
        &[
            ("glide_ratio", params.glide_ratio),
            ("trim_speed", params.trim_speed),
            ("full_speed_bar_speed", params.full_speed_bar_speed),
            ("big_ears_speed", params.big_ears_speed),
        ],
    )?;
    let updated_weather = rewrite_toml_floats(
        &original_weather,
        None,
        &[
            ("wind_bearing_degrees", weather.wind_bearing_degrees),
            ("wind_speed_mps", weather.wind_speed_mps),
            ("lcl_level", weather.lcl_level),
        ],
    )?;

    fs::write(&game_path, updated_game)
        .map_err(|error| format!("Failed writing `{}`: {error}", game_path.display()))?;
    fs::write(&weather_path, updated_weather)
        .map_err(|error| format!("Failed writing `{}`: {error}", weather_path.display()))?;

    match GameConfig::load_from_dir(config_dir) {
        Ok(new_config) => {
            *config = new_config;
            Ok("Saved tuning to config files.".to_string())
        }
        Err(error) => {
            let _ = fs::write(&game_path, original_game);
            let _ = fs::write(&weather_path, original_weather);
            if let Ok(restored) = GameConfig::load_from_dir(config_dir) {
                *config = restored;
            }
            Err(format!("Save failed validation: {error}. Reverted config files."))
        }
    }
}

/// Sets float keys in `table` (or at the root) of a TOML document.
fn rewrite_toml_floats(
    raw: &str,
    table: Option<&str>,
    values: &[(&str, f32)],
) -> Result<String, String> {
    let mut root: toml::Value =
        toml::from_str(raw).map_err(|error| format!("Failed parsing TOML: {error}"))?;
    let root_table = root
        .as_table_mut()
        .ok_or_else(|| "TOML root is not a table".to_string())?;
    let target = match table {
        Some(name) => root_table
            .get_mut(name)
            .and_then(toml::Value::as_table_mut)
            .ok_or_else(|| format!("Missing `[{name}]` table"))?,
        None => root_table,
    };

    for (key, value) in values {
        set_toml_float(target, key, *value)?;
    }

    toml::to_string_pretty(&root).map_err(|error| format!("Failed serializing TOML: {error}"))
}

fn set_toml_float(
    table: &mut toml::map::Map<String, toml::Value>,
    key: &str,
    value: f32,
) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("`{key}` is not a finite number"));
    }

    table.insert(key.to_string(), toml::Value::Float(value as f64));
    Ok(())
}

fn keybind_overlay_text() -> &'static str {
    "Keybinds\n\
H - Toggle this panel\n\
T - Toggle flight tuning panel\n\
F5 - Hot-reload config\n\
A / Left - Left break\n\
D / Right - Right break\n\
S - Speed bar on/off\n\
E - Big ears in/out\n\
[ / ] - Wrap speed down/up\n\
Esc - Pause / resume\n\
Enter - Pause -> results\n\
R / Space - Results -> new flight\n\
Q - Quit from results"
}
