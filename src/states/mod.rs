use crate::config::GameConfig;
use crate::flight::model::FlightSummary;
use crate::flight::FlightSim;
use bevy::app::AppExit;
use bevy::prelude::*;

const MIN_LOADING_SCREEN_SECONDS: f64 = 0.75;

#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    #[default]
    Boot,
    Loading,
    InFlight,
    Pause,
    Results,
}

pub struct GameStatePlugin;

impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::Boot), enter_boot)
            .add_systems(Update, boot_to_loading.run_if(in_state(GameState::Boot)))
            .add_systems(OnEnter(GameState::Loading), enter_loading)
            .add_systems(OnExit(GameState::Loading), cleanup_loading_screen)
            .add_systems(
                Update,
                loading_to_in_flight.run_if(in_state(GameState::Loading)),
            )
            .add_systems(OnEnter(GameState::InFlight), enter_in_flight)
            .add_systems(OnEnter(GameState::Pause), enter_pause)
            .add_systems(Update, pause_controls.run_if(in_state(GameState::Pause)))
            .add_systems(OnEnter(GameState::Results), enter_results)
            .add_systems(OnExit(GameState::Results), cleanup_results_screen)
            .add_systems(
                Update,
                results_controls.run_if(in_state(GameState::Results)),
            );
    }
}

#[derive(Component)]
struct LoadingScreenRoot;

#[derive(Component)]
struct ResultsScreenRoot;

#[derive(Resource, Debug, Clone)]
struct LoadingScreenState {
    entered_at_s: f64,
}

fn enter_boot() {
    info!("Entered state: Boot");
}

fn boot_to_loading(mut next_state: ResMut<NextState<GameState>>) {
    next_state.set(GameState::Loading);
}

fn enter_loading(mut commands: Commands, time: Res<Time>) {
    info!("Entered state: Loading");
    commands.insert_resource(LoadingScreenState {
        entered_at_s: time.elapsed_secs_f64(),
    });

    commands.spawn((
        Name::new("LoadingText"),
        LoadingScreenRoot,
        Text::new("Preparing launch..."),
        TextFont {
            font_size: 32.0,
            ..default()
        },
        TextColor(Color::srgb(0.92, 0.95, 0.98)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Percent(40.0),
            top: Val::Percent(45.0),
            ..default()
        },
    ));
}

fn cleanup_loading_screen(
    mut commands: Commands,
    loading_query: Query<Entity, With<LoadingScreenRoot>>,
) {
    for entity in &loading_query {
        commands.entity(entity).try_despawn();
    }
    commands.remove_resource::<LoadingScreenState>();
}

fn loading_to_in_flight(
    time: Res<Time>,
    config: Option<Res<GameConfig>>,
    loading_state: Option<Res<LoadingScreenState>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(loading_state) = loading_state else {
        return;
    };

    let has_min_time =
        time.elapsed_secs_f64() - loading_state.entered_at_s >= MIN_LOADING_SCREEN_SECONDS;
    if !has_min_time || config.is_none() {
        return;
    }

    next_state.set(GameState::InFlight);
}

fn enter_in_flight() {
    info!("Entered state: InFlight");
}

fn enter_pause() {
    info!("Entered state: Pause");
}

fn pause_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        next_state.set(GameState::InFlight);
    }

    if keyboard.just_pressed(KeyCode::Enter) {
        next_state.set(GameState::Results);
    }
}

fn enter_results(mut commands: Commands, sim: Option<Res<FlightSim>>) {
    let (title, summary) = match sim.as_deref() {
        Some(sim) if sim.model.has_crashed() => ("LANDED", sim.model.summary()),
        Some(sim) => ("FLIGHT ENDED", sim.model.summary()),
        None => ("NO FLIGHT", FlightSummary::default()),
    };
    let summary_text = format!(
        "{}\n\nR / Space - New Flight\nQ - Quit",
        results_summary_text(&summary)
    );

    commands
        .spawn((
            Name::new("ResultsOverlay"),
            ResultsScreenRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.01, 0.02, 0.03, 0.80)),
            ZIndex(300),
        ))
        .with_children(|parent| {
            parent
                .spawn((
                    Node {
                        width: Val::Percent(60.0),
                        max_width: Val::Px(760.0),
                        min_width: Val::Px(420.0),
                        flex_direction: FlexDirection::Column,
                        row_gap: Val::Px(10.0),
                        padding: UiRect::all(Val::Px(16.0)),
                        border: UiRect::all(Val::Px(1.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.08, 0.10, 0.13, 0.96)),
                    BorderColor::all(Color::srgba(0.56, 0.62, 0.68, 0.92)),
                ))
                .with_children(|panel| {
                    panel.spawn((
                        Text::new(title),
                        TextFont {
                            font_size: 52.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.94, 0.97, 1.00)),
                    ));
                    panel.spawn((
                        Text::new(summary_text),
                        TextFont {
                            font_size: 22.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.90, 0.94, 0.98)),
                    ));
                });
        });

    info!("Entered state: Results");
}

fn results_summary_text(summary: &FlightSummary) -> String {
    let minutes = (summary.flying_time_s / 60.0).floor();
    let seconds = summary.flying_time_s - minutes * 60.0;
    format!(
        "Flying time: {minutes:.0}m {seconds:04.1}s\n\
Distance flown: {distance:.0} m\n\
Max altitude: {max_altitude:.0} m\n\
Ground touches: {touches}\n\
Track points: {points}",
        distance = summary.meters_flown,
        max_altitude = summary.max_altitude,
        touches = summary.ground_touches,
        points = summary.trajectory_points,
    )
}

fn cleanup_results_screen(
    mut commands: Commands,
    results_screen_query: Query<Entity, With<ResultsScreenRoot>>,
) {
    for entity in &results_screen_query {
        commands.entity(entity).try_despawn();
    }
}

fn results_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<AppExit>,
) {
    if keyboard.any_just_pressed([KeyCode::KeyR, KeyCode::Space]) {
        next_state.set(GameState::Boot);
    }

    if keyboard.just_pressed(KeyCode::KeyQ) {
        exit.write(AppExit::Success);
    }
}
