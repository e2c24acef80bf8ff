use crate::flight::model::FlightParameters;
use crate::flight::terrain::HeightfieldTerrain;
use crate::flight::thermal::ThermalSpec;
use crate::flight::wind::Weather;
use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "config";

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_game_config)
            .add_systems(Update, reload_game_config_hotkey);
    }
}

fn load_game_config(mut commands: Commands) {
    let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR)).unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    });

    log_config_summary("Loaded", &config);
    info!("Press F5 to hot-reload config files from `{CONFIG_DIR}`.");

    commands.insert_resource(config);
}

fn reload_game_config_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    game_config: Option<ResMut<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    let Some(mut current_config) = game_config else {
        warn!("Config hot-reload requested, but `GameConfig` resource is not initialized yet.");
        return;
    };

    match GameConfig::load_from_dir(Path::new(CONFIG_DIR)) {
        Ok(new_config) => {
            *current_config = new_config;
            log_config_summary("Hot-reloaded", &current_config);
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    info!(
        "{prefix} config: {} thermals, {}x{} terrain grid, wind {:.0} deg at {:.1} m/s.",
        config.thermals.thermals.len(),
        config.terrain.rows.first().map_or(0, Vec::len),
        config.terrain.rows.len(),
        config.weather.wind_bearing_degrees,
        config.weather.wind_speed_mps
    );
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub game: GameFile,
    pub weather: Weather,
    pub thermals: ThermalsFile,
    pub terrain: TerrainFile,
}

impl GameConfig {
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let config = Self {
            game: read_toml(&config_dir.join("game.toml"))?,
            weather: read_toml(&config_dir.join("weather.toml"))?,
            thermals: read_toml(&config_dir.join("thermals.toml"))?,
            terrain: read_toml(&config_dir.join("terrain.toml"))?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let app = &self.game.app;
        if app.tick_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "game.toml::app.tick_interval_ms must be > 0".to_string(),
            ));
        }
        if !(app.wrap_speed >= 0.0 && app.wrap_speed.is_finite()) {
            return Err(ConfigError::Validation(
                "game.toml::app.wrap_speed must be >= 0".to_string(),
            ));
        }

        let flight = &self.game.flight;
        if !(flight.glide_ratio > 0.0 && flight.glide_ratio.is_finite()) {
            return Err(ConfigError::Validation(
                "game.toml::flight.glide_ratio must be > 0".to_string(),
            ));
        }
        if !(flight.trim_speed > 0.0 && flight.trim_speed.is_finite()) {
            return Err(ConfigError::Validation(
                "game.toml::flight.trim_speed must be > 0".to_string(),
            ));
        }
        if flight.full_speed_bar_speed < flight.trim_speed {
            return Err(ConfigError::Validation(
                "game.toml::flight.full_speed_bar_speed must be >= trim_speed".to_string(),
            ));
        }
        if flight.big_ears_speed <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::flight.big_ears_speed must be > 0".to_string(),
            ));
        }

        let glider = &self.game.glider;
        if glider.half_extents.iter().any(|extent| !(*extent > 0.0)) {
            return Err(ConfigError::Validation(
                "game.toml::glider.half_extents must all be > 0".to_string(),
            ));
        }
        if glider.start_position.iter().any(|value| !value.is_finite())
            || !glider.start_yaw_degrees.is_finite()
        {
            return Err(ConfigError::Validation(
                "game.toml::glider start pose must be finite".to_string(),
            ));
        }

        if !self.weather.wind_bearing_degrees.is_finite() {
            return Err(ConfigError::Validation(
                "weather.toml::wind_bearing_degrees must be finite".to_string(),
            ));
        }
        if !(self.weather.wind_speed_mps >= 0.0 && self.weather.wind_speed_mps.is_finite()) {
            return Err(ConfigError::Validation(
                "weather.toml::wind_speed_mps must be >= 0".to_string(),
            ));
        }
        if !self.weather.lcl_level.is_finite() {
            return Err(ConfigError::Validation(
                "weather.toml::lcl_level must be finite".to_string(),
            ));
        }

        ensure_unique_ids("thermals.toml::thermals", &self.thermals.thermals)?;
        for (index, thermal) in self.thermals.thermals.iter().enumerate() {
            if thermal.bottom_radius <= 0.0 || thermal.top_radius <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "thermals.toml::thermals[{index}] radii must be > 0"
                )));
            }
            if thermal.height.is_some_and(|height| height <= 0.0) {
                return Err(ConfigError::Validation(format!(
                    "thermals.toml::thermals[{index}].height must be > 0 when set"
                )));
            }
            if !(0.0..=1.0).contains(&thermal.opacity) {
                return Err(ConfigError::Validation(format!(
                    "thermals.toml::thermals[{index}].opacity must be in [0, 1]"
                )));
            }
        }

        self.heightfield()?;
        Ok(())
    }

    pub fn heightfield(&self) -> Result<HeightfieldTerrain, ConfigError> {
        let terrain = &self.terrain;
        HeightfieldTerrain::from_rows(
            terrain.origin_x,
            terrain.origin_z,
            terrain.cell_size,
            &terrain.rows,
            terrain.water_level,
        )
        .ok_or_else(|| {
            ConfigError::Validation(
                "terrain.toml must have cell_size > 0 and at least 2x2 rows of equal length"
                    .to_string(),
            )
        })
    }

    pub fn thermal_specs(&self) -> Vec<ThermalSpec> {
        self.thermals
            .thermals
            .iter()
            .map(ThermalConfig::to_spec)
            .collect()
    }

    pub fn start_position(&self) -> Vec3 {
        Vec3::from_array(self.game.glider.start_position)
    }

    pub fn start_yaw(&self) -> f32 {
        self.game.glider.start_yaw_degrees.to_radians()
    }

    pub fn glider_half_extents(&self) -> Vec3 {
        Vec3::from_array(self.game.glider.half_extents)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source.as_ref()),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn ensure_unique_ids<T: HasId>(label: &str, rows: &[T]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for row in rows {
        let id = row.id();
        if id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{label} contains an empty id"
            )));
        }

        if !seen.insert(id) {
            return Err(ConfigError::Validation(format!(
                "{label} contains duplicate id `{id}`"
            )));
        }
    }

    Ok(())
}

trait HasId {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub app: AppConfig,
    pub flight: FlightParameters,
    pub glider: GliderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub tick_interval_ms: u64,
    pub wrap_speed: f32,
    pub debug_overlay: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GliderConfig {
    pub half_extents: [f32; 3],
    pub start_position: [f32; 3],
    #[serde(default)]
    pub start_yaw_degrees: f32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ThermalsFile {
    #[serde(default)]
    pub thermals: Vec<ThermalConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThermalConfig {
    pub id: String,
    pub x: f32,
    pub z: f32,
    pub base_y: f32,
    pub bottom_radius: f32,
    pub top_radius: f32,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default = "default_thermal_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub with_core: bool,
}

fn default_thermal_opacity() -> f32 {
    0.15
}

impl ThermalConfig {
    fn to_spec(&self) -> ThermalSpec {
        ThermalSpec {
            position: Vec3::new(self.x, self.base_y, self.z),
            bottom_radius: self.bottom_radius,
            top_radius: self.top_radius,
            height: self.height,
            opacity: self.opacity,
            with_core: self.with_core,
        }
    }
}

impl HasId for ThermalConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerrainFile {
    pub origin_x: f32,
    pub origin_z: f32,
    pub cell_size: f32,
    #[serde(default)]
    pub water_level: Option<f32>,
    pub rows: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> GameConfig {
        GameConfig {
            game: GameFile {
                app: AppConfig {
                    tick_interval_ms: 25,
                    wrap_speed: 1.0,
                    debug_overlay: true,
                },
                flight: FlightParameters::default(),
                glider: GliderConfig {
                    half_extents: [5.0, 1.5, 1.5],
                    start_position: [0.0, 900.0, 0.0],
                    start_yaw_degrees: 0.0,
                },
            },
            weather: Weather::default(),
            thermals: ThermalsFile {
                thermals: vec![ThermalConfig {
                    id: "house_thermal".to_string(),
                    x: 0.0,
                    z: 0.0,
                    base_y: 50.0,
                    bottom_radius: 80.0,
                    top_radius: 120.0,
                    height: None,
                    opacity: 0.2,
                    with_core: true,
                }],
            },
            terrain: TerrainFile {
                origin_x: -100.0,
                origin_z: -100.0,
                cell_size: 100.0,
                water_level: None,
                rows: vec![vec![0.0, 10.0, 20.0]; 3],
            },
        }
    }

    #[test]
    fn sample_config_is_valid() {
        let config = sample_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.thermal_specs().len(), 1);
        assert_eq!(config.start_position(), Vec3::new(0.0, 900.0, 0.0));
    }

    #[test]
    fn validation_fails_for_duplicate_thermal_id() {
        let mut config = sample_config();
        let duplicate = config.thermals.thermals[0].clone();
        config.thermals.thermals.push(duplicate);

        let error = config
            .validate()
            .expect_err("duplicate thermal id should fail validation");
        assert!(error.to_string().contains("duplicate id `house_thermal`"));
    }

    #[test]
    fn validation_fails_for_ragged_terrain() {
        let mut config = sample_config();
        config.terrain.rows[1].pop();
        let error = config
            .validate()
            .expect_err("ragged rows should fail validation");
        assert!(error.to_string().starts_with("terrain.toml"));
    }

    #[test]
    fn validation_fails_for_negative_wind_speed() {
        let mut config = sample_config();
        config.weather.wind_speed_mps = -2.0;
        let error = config
            .validate()
            .expect_err("negative wind should fail validation");
        assert!(error.to_string().contains("wind_speed_mps"));
    }

    #[test]
    fn thermal_defaults_apply_when_omitted() {
        let file: ThermalsFile = toml::from_str(
            r#"
            [[thermals]]
            id = "a"
            x = 1.0
            z = 2.0
            base_y = 3.0
            bottom_radius = 40.0
            top_radius = 60.0
            "#,
        )
        .expect("thermals parse");
        let thermal = &file.thermals[0];
        assert_eq!(thermal.height, None);
        assert_eq!(thermal.opacity, default_thermal_opacity());
        assert!(!thermal.with_core);
        assert_eq!(thermal.to_spec().position, Vec3::new(1.0, 3.0, 2.0));
    }

    #[test]
    fn shipped_config_loads() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join(CONFIG_DIR);
        let config = GameConfig::load_from_dir(&dir).expect("shipped config is valid");
        assert!(!config.thermals.thermals.is_empty());
        assert!(config.heightfield().is_ok());
    }
}
