mod config;
mod debug;
mod flight;
mod scene;
mod states;

use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use config::ConfigPlugin;
use debug::DebugOverlayPlugin;
use flight::FlightPlugin;
use scene::FlightScenePlugin;
use states::{GameState, GameStatePlugin};

fn main() {
    let mut app = App::new();
    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Paraglide".to_string(),
            resolution: (1280, 720).into(),
            ..default()
        }),
        ..default()
    }))
    .add_plugins(EguiPlugin::default())
    .add_plugins(FrameTimeDiagnosticsPlugin::default())
    .add_plugins(ConfigPlugin)
    .add_plugins(FlightPlugin)
    .add_plugins(FlightScenePlugin)
    .add_plugins(DebugOverlayPlugin)
    .init_state::<GameState>()
    .add_plugins(GameStatePlugin);

    app.run();
}
