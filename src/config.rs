use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RendererError;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub scene_path: String,
    pub window_width: u32,
    pub window_height: u32,
    pub frames_in_flight: usize,
    /// Directory that is polled for recompiled .spv files. When unset the
    /// shaders embedded at build time are the only ones ever used.
    pub shader_override_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scene_path: "assets/scene-local/sponza/sponza.glb".to_string(),
            window_width: 1920,
            window_height: 1080,
            frames_in_flight: 3,
            shader_override_dir: None,
        }
    }
}

pub struct ConfigFileLoader {
    pub path: PathBuf,
}

impl ConfigFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file falls back to defaults (and writes them out), a present
    /// but malformed file is a configuration error.
    pub fn load_config(&self) -> Result<Config, RendererError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                RendererError::Configuration(format!(
                    "malformed settings file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(_) => {
                let config = Config::default();
                self.save_config(&config);
                Ok(config)
            }
        }
    }

    pub fn save_config(&self, config: &Config) {
        if let Ok(content) = serde_json::to_string_pretty(config) {
            let _ = std::fs::write(&self.path, content);
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), RendererError> {
        if self.frames_in_flight == 0 {
            return Err(RendererError::Configuration(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(RendererError::Configuration(
                "window dimensions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_frames_in_flight() {
        let config = Config {
            frames_in_flight: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }
}
