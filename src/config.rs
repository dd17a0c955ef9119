//! Viewer settings, read from an optional JSON file. Every key is optional
//! and falls back to its default.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;
use tinyjson::JsonValue;

use crate::fetch::FetchDesc;
use crate::scene::SceneLimits;

type Object = HashMap<String, JsonValue>;

pub const DEFAULT_CONFIG_PATH: &str = "viewer.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("config key {key} should be {expected}")]
    WrongType { key: String, expected: &'static str },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Directory all asset paths are relative to.
    pub asset_root: PathBuf,
    /// The glTF file to show, relative to `asset_root`.
    pub scene_path: PathBuf,
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub vsync: bool,
    /// Radians per second the scene spins around the Y axis.
    pub rotation_speed: f32,
    pub fetch: FetchDesc,
    pub limits: SceneLimits,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            asset_root: PathBuf::from("assets"),
            scene_path: PathBuf::from("gltf/DamagedHelmet/DamagedHelmet.gltf"),
            window_title: String::from("glTF scene viewer"),
            window_width: 948,
            window_height: 533,
            vsync: true,
            rotation_speed: 0.25,
            fetch: FetchDesc::default(),
            limits: SceneLimits::default(),
        }
    }
}

impl Config {
    /// Reads the config at `path`. A missing file is not an error, the
    /// defaults are used instead.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(json) => {
                info!("Using config from {}", path.display());
                Config::parse(&json)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("{} not found, using the default config", path.display());
                Ok(Config::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(json: &str) -> Result<Config, ConfigError> {
        let root: JsonValue = json
            .parse()
            .map_err(|err: tinyjson::JsonParseError| ConfigError::Json(err.to_string()))?;
        let root = root
            .get::<Object>()
            .ok_or_else(|| wrong_type("(root)", "an object"))?;

        let mut config = Config::default();
        for (key, value) in root {
            match key.as_str() {
                "asset_root" => config.asset_root = PathBuf::from(string(key, value)?),
                "scene_path" => config.scene_path = PathBuf::from(string(key, value)?),
                "window_title" => config.window_title = string(key, value)?.to_string(),
                "window_width" => config.window_width = integer(key, value)? as u32,
                "window_height" => config.window_height = integer(key, value)? as u32,
                "vsync" => {
                    config.vsync = *value
                        .get::<bool>()
                        .ok_or_else(|| wrong_type(key, "a boolean"))?
                }
                "rotation_speed" => {
                    config.rotation_speed = *value
                        .get::<f64>()
                        .ok_or_else(|| wrong_type(key, "a number"))?
                        as f32
                }
                "fetch" => parse_fetch(value, &mut config.fetch)?,
                "limits" => parse_limits(value, &mut config.limits)?,
                _ => warn!("Ignoring unknown config key {key}"),
            }
        }
        Ok(config)
    }
}

fn wrong_type(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongType {
        key: key.to_string(),
        expected,
    }
}

fn string<'a>(key: &str, value: &'a JsonValue) -> Result<&'a str, ConfigError> {
    value
        .get::<String>()
        .map(String::as_str)
        .ok_or_else(|| wrong_type(key, "a string"))
}

fn integer(key: &str, value: &JsonValue) -> Result<usize, ConfigError> {
    match value {
        JsonValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
        _ => Err(wrong_type(key, "a non-negative integer")),
    }
}

/// Overwrites `fields` whose key appears in the `section` object.
fn parse_section(
    section: &str,
    value: &JsonValue,
    fields: &mut [(&str, &mut usize)],
) -> Result<(), ConfigError> {
    let object = value
        .get::<Object>()
        .ok_or_else(|| wrong_type(section, "an object"))?;
    for (key, value) in object {
        let full_key = format!("{section}.{key}");
        match fields.iter_mut().find(|(name, _)| *name == key.as_str()) {
            Some((_, field)) => **field = integer(&full_key, value)?,
            None => warn!("Ignoring unknown config key {full_key}"),
        }
    }
    Ok(())
}

fn parse_fetch(value: &JsonValue, fetch: &mut FetchDesc) -> Result<(), ConfigError> {
    parse_section(
        "fetch",
        value,
        &mut [
            ("max_requests", &mut fetch.max_requests),
            ("num_channels", &mut fetch.num_channels),
            ("num_lanes", &mut fetch.num_lanes),
            ("buffer_size", &mut fetch.buffer_size),
        ],
    )?;
    match fetch.zero_field() {
        Some(field) => Err(wrong_type(&format!("fetch.{field}"), "a positive integer")),
        None => Ok(()),
    }
}

fn parse_limits(value: &JsonValue, limits: &mut SceneLimits) -> Result<(), ConfigError> {
    parse_section(
        "limits",
        value,
        &mut [
            ("buffers", &mut limits.buffers),
            ("images", &mut limits.images),
            ("materials", &mut limits.materials),
            ("pipelines", &mut limits.pipelines),
            ("primitives", &mut limits.primitives),
            ("meshes", &mut limits.meshes),
            ("nodes", &mut limits.nodes),
        ],
    )
}
