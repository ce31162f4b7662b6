use crate::NativeDriverError;
use glint_input::InputConfig;
use glint_proc_macros::{EnumAll, EnumDisplay, EnumFromStr};
use glint_renderer::VideoConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumDisplay,
    EnumFromStr,
    EnumAll,
)]
pub enum VideoDriver {
    #[default]
    Wgpu,
    Software,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumDisplay,
    EnumFromStr,
    EnumAll,
)]
pub enum InputDriver {
    #[default]
    Sdl,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    pub video_driver: VideoDriver,
    pub input_driver: InputDriver,
    pub video: VideoConfig,
    pub input: InputConfig,
}

impl NativeConfig {
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the input config is invalid.
    pub fn from_toml(contents: &str) -> Result<Self, NativeDriverError> {
        let config: Self = toml::from_str(contents)?;
        config.input.validate()?;
        Ok(config)
    }

    /// Read the config from a TOML file. A missing file yields the default config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, NativeDriverError> {
        if !path.exists() {
            log::info!("No config file at '{}', using default config", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| {
            NativeDriverError::ConfigRead { path: path.display().to_string(), source }
        })?;
        Self::from_toml(&contents)
    }

    /// Select drivers by name, e.g. from command-line arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if either name does not match a known driver.
    pub fn select_drivers(
        &mut self,
        video_driver: Option<&str>,
        input_driver: Option<&str>,
    ) -> Result<(), NativeDriverError> {
        if let Some(name) = video_driver {
            self.video_driver = name.parse().map_err(|_| NativeDriverError::UnknownDriver {
                name: name.into(),
                available: VideoDriver::ALL.iter().map(VideoDriver::to_string).collect(),
            })?;
        }

        if let Some(name) = input_driver {
            self.input_driver = name.parse().map_err(|_| NativeDriverError::UnknownDriver {
                name: name.into(),
                available: InputDriver::ALL.iter().map(InputDriver::to_string).collect(),
            })?;
        }

        Ok(())
    }
}
