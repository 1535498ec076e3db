use std::path::PathBuf;

use bevy::prelude::*;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{
    arcs::ArcSettings,
    error::{GlobeError, GlobeResult},
    geometry::PropertyKeys,
};

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "NEWS_GLOBE_CONFIG";
const CONFIG_FILE: &str = "globe.json";

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    /// Path or http(s) URL of the country boundary FeatureCollection.
    pub geometry_source: String,
    pub property_keys: PropertyKeys,
    /// Optional `{ "DE": { "FR": 5 } }` file the demo overlay pushes as arcs.
    pub relationships_path: Option<String>,
    pub globe_radius: f32,
    /// Pointer travel, in logical pixels, beyond which a press becomes a drag.
    pub drag_threshold_px: f32,
    pub look: LookConfig,
    pub camera: CameraConfig,
    pub arcs: ArcSettings,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            geometry_source: "assets/countries.geojson".to_string(),
            property_keys: PropertyKeys::default(),
            relationships_path: Some("assets/relationships.json".to_string()),
            globe_radius: 100.0,
            drag_threshold_px: 5.0,
            look: LookConfig::default(),
            camera: CameraConfig::default(),
            arcs: ArcSettings::default(),
        }
    }
}

/// Colours are sRGBA components in `[0, 1]`. Altitudes are fractions of the
/// globe radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookConfig {
    pub background: [f32; 4],
    pub globe: [f32; 4],
    pub polygon: [f32; 4],
    pub polygon_selected: [f32; 4],
    pub border: [f32; 4],
    pub arc: [f32; 4],
    pub polygon_altitude: f32,
    pub selected_altitude: f32,
    pub highlight_duration_ms: u64,
    pub ambient_brightness: f32,
    pub sun_illuminance: f32,
}

impl Default for LookConfig {
    fn default() -> Self {
        Self {
            background: [0.929, 0.929, 0.929, 1.0],
            globe: [1.0, 1.0, 1.0, 1.0],
            polygon: [0.522, 0.651, 0.831, 0.8],
            polygon_selected: [0.910, 0.412, 0.255, 0.95],
            border: [0.62, 0.62, 0.62, 1.0],
            arc: [0.976, 0.655, 0.157, 0.9],
            polygon_altitude: 0.01,
            selected_altitude: 0.04,
            highlight_duration_ms: 100,
            ambient_brightness: 600.0,
            sun_illuminance: 4_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub start_distance: f32,
    pub intro_start_distance: f32,
    pub intro_duration_secs: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Fraction of orbit velocity shed per 60 Hz frame.
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub focus_distance: f32,
    /// Degrees added to the focus latitude so overlays do not hide the country.
    pub focus_latitude_offset: f64,
    pub focus_duration_secs: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            start_distance: 250.0,
            intro_start_distance: 900.0,
            intro_duration_secs: 3.0,
            min_distance: 150.0,
            max_distance: 500.0,
            damping: 0.05,
            rotate_speed: 0.5,
            zoom_speed: 1.0,
            focus_distance: 220.0,
            focus_latitude_offset: -8.0,
            focus_duration_secs: 1.2,
        }
    }
}

pub fn srgba(c: [f32; 4]) -> Color {
    Color::srgba(c[0], c[1], c[2], c[3])
}

impl GlobeConfig {
    pub fn from_json(data: &str) -> GlobeResult<Self> {
        serde_json::from_str(data).map_err(GlobeError::from)
    }

    /// Candidate config files, most specific first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        if let Some(dirs) = ProjectDirs::from("", "", "news-globe") {
            paths.push(dirs.config_dir().join(CONFIG_FILE));
        }
        paths.push(PathBuf::from("assets").join(CONFIG_FILE));
        paths
    }

    /// Loads the first config file that exists. A malformed file is reported
    /// and the defaults are used instead.
    pub fn load() -> Self {
        for path in Self::search_paths() {
            let Ok(data) = std::fs::read_to_string(&path) else {
                continue;
            };
            return match Self::from_json(&data) {
                Ok(config) => {
                    info!("Using config {}", path.display());
                    config
                }
                Err(err) => {
                    warn!("Ignoring config {}: {err}", path.display());
                    Self::default()
                }
            };
        }
        info!("No config file found, using defaults");
        Self::default()
    }
}

pub struct SettingsPlugin;

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<GlobeConfig>() {
            app.insert_resource(GlobeConfig::load());
        }
    }
}
