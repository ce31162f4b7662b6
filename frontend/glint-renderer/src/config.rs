use crate::compositor::RendererError;
use glint_common::frontend::FrameSize;
use glint_proc_macros::{EnumAll, EnumDisplay, EnumFromStr};
use std::path::PathBuf;

/// Maximum source resolution along each axis at an input scale of 1.
pub const BASE_TEXTURE_DIMENSION: u32 = 256;

/// Largest frame texture dimension, matching wgpu's default `max_texture_dimension_2d`.
pub const MAX_TEXTURE_DIMENSION: u32 = 8192;

pub const MAX_INPUT_SCALE: u32 = MAX_TEXTURE_DIMENSION / BASE_TEXTURE_DIMENSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumDisplay, EnumFromStr, EnumAll)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

impl FilterMode {
    #[must_use]
    pub fn from_smooth(smooth: bool) -> Self {
        if smooth { Self::Linear } else { Self::Nearest }
    }

    pub(crate) fn to_wgpu_filter_mode(self) -> wgpu::FilterMode {
        match self {
            Self::Nearest => wgpu::FilterMode::Nearest,
            Self::Linear => wgpu::FilterMode::Linear,
        }
    }
}

/// The two mutually exclusive post-processing shader sources. If both are set, the WGSL shader
/// wins and a warning is logged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShaderConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub wgsl_path: Option<PathBuf>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub preset_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
    pub force_aspect: bool,
    pub smooth: bool,
    pub input_scale: u32,
    pub shader: ShaderConfig,
}

impl VideoConfig {
    /// Size of the frame texture, which bounds the largest frame the core may emit.
    ///
    /// # Errors
    ///
    /// Returns an error if the input scale is not in `1..=MAX_INPUT_SCALE`.
    pub fn texture_size(&self) -> Result<FrameSize, RendererError> {
        if !(1..=MAX_INPUT_SCALE).contains(&self.input_scale) {
            return Err(RendererError::InvalidInputScale(self.input_scale));
        }

        let dimension = BASE_TEXTURE_DIMENSION * self.input_scale;
        Ok(FrameSize::new(dimension, dimension))
    }

    #[must_use]
    pub fn filter_mode(&self) -> FilterMode {
        FilterMode::from_smooth(self.smooth)
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fullscreen: false,
            vsync: true,
            force_aspect: true,
            smooth: true,
            input_scale: 1,
            shader: ShaderConfig::default(),
        }
    }
}
