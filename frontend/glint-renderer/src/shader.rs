//! Post-processing shader selection and the per-frame parameter block passed to the shader stage

use crate::compositor::RendererError;
use crate::config::{FilterMode, ShaderConfig};
use crate::viewport::{Mat4, UNIT_ORTHO_PROJECTION};
use glint_common::frontend::FrameSize;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Which post-processing stage a backend should build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSelection {
    /// Built-in passthrough stage.
    Builtin,
    Wgsl(PathBuf),
    Preset(PathBuf),
}

impl ShaderSelection {
    #[must_use]
    pub fn resolve(config: &ShaderConfig) -> Self {
        match (&config.wgsl_path, &config.preset_path) {
            (Some(wgsl_path), Some(preset_path)) => {
                log::warn!(
                    "Both a WGSL shader ({}) and a shader preset ({}) are configured; using the WGSL shader",
                    wgsl_path.display(),
                    preset_path.display()
                );
                Self::Wgsl(wgsl_path.clone())
            }
            (Some(wgsl_path), None) => Self::Wgsl(wgsl_path.clone()),
            (None, Some(preset_path)) => Self::Preset(preset_path.clone()),
            (None, None) => Self::Builtin,
        }
    }

    /// Read the shader source from disk. Returns `None` for the built-in stage.
    ///
    /// # Errors
    ///
    /// Returns an error if a shader or preset file cannot be read or parsed.
    pub fn load(&self) -> Result<Option<LoadedShader>, RendererError> {
        match self {
            Self::Builtin => Ok(None),
            Self::Wgsl(path) => {
                let source = read_shader_file(path)?;
                Ok(Some(LoadedShader { path: path.clone(), source, filter_override: None }))
            }
            Self::Preset(preset_path) => {
                let preset = ShaderPreset::read(preset_path)?;
                let filter_override = preset.filter_mode()?;

                let source_path = preset.source_path(preset_path);
                let source = read_shader_file(&source_path)?;

                log::info!(
                    "Loaded shader preset {} with source {}",
                    preset_path.display(),
                    source_path.display()
                );

                Ok(Some(LoadedShader { path: source_path, source, filter_override }))
            }
        }
    }
}

fn read_shader_file(path: &Path) -> Result<String, RendererError> {
    fs::read_to_string(path)
        .map_err(|source| RendererError::ShaderRead { path: path.to_path_buf(), source })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedShader {
    pub path: PathBuf,
    pub source: String,
    pub filter_override: Option<FilterMode>,
}

/// TOML shader preset, e.g.
///
/// ```toml
/// source = "crt.wgsl"
/// filter = "nearest"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShaderPreset {
    pub source: PathBuf,
    #[serde(default)]
    pub filter: Option<String>,
}

impl ShaderPreset {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid preset.
    pub fn read(path: &Path) -> Result<Self, RendererError> {
        let contents = read_shader_file(path)?;
        Self::parse(&contents).map_err(|source| RendererError::ShaderPresetParse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the contents are not a valid preset.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Shader source path, resolved relative to the directory containing the preset.
    #[must_use]
    pub fn source_path(&self, preset_path: &Path) -> PathBuf {
        match preset_path.parent() {
            Some(dir) => dir.join(&self.source),
            None => self.source.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the filter string is not a valid filter mode.
    pub fn filter_mode(&self) -> Result<Option<FilterMode>, RendererError> {
        self.filter
            .as_deref()
            .map(|filter| filter.parse().map_err(RendererError::InvalidShaderFilter))
            .transpose()
    }
}

/// Uniform block bound at group 0, binding 2 in every render shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShaderParams {
    pub source_size: [f32; 2],
    pub texture_size: [f32; 2],
    pub output_size: [f32; 2],
    _padding: [f32; 2],
    pub projection: Mat4,
}

impl ShaderParams {
    #[must_use]
    pub fn new(source: FrameSize, texture: FrameSize, output: FrameSize, projection: Mat4) -> Self {
        Self {
            source_size: size_to_vec(source),
            texture_size: size_to_vec(texture),
            output_size: size_to_vec(output),
            _padding: [0.0; 2],
            projection,
        }
    }
}

impl Default for ShaderParams {
    fn default() -> Self {
        Self::new(
            FrameSize::new(0, 0),
            FrameSize::new(0, 0),
            FrameSize::new(0, 0),
            UNIT_ORTHO_PROJECTION,
        )
    }
}

fn size_to_vec(size: FrameSize) -> [f32; 2] {
    [size.width as f32, size.height as f32]
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn shader_config(wgsl: Option<&str>, preset: Option<&str>) -> ShaderConfig {
        ShaderConfig { wgsl_path: wgsl.map(PathBuf::from), preset_path: preset.map(PathBuf::from) }
    }

    #[test]
    fn selection() {
        assert_eq!(ShaderSelection::resolve(&shader_config(None, None)), ShaderSelection::Builtin);
        assert_eq!(
            ShaderSelection::resolve(&shader_config(Some("a.wgsl"), None)),
            ShaderSelection::Wgsl("a.wgsl".into())
        );
        assert_eq!(
            ShaderSelection::resolve(&shader_config(None, Some("b.toml"))),
            ShaderSelection::Preset("b.toml".into())
        );
    }

    #[test]
    fn wgsl_wins_conflict() {
        assert_eq!(
            ShaderSelection::resolve(&shader_config(Some("a.wgsl"), Some("b.toml"))),
            ShaderSelection::Wgsl("a.wgsl".into())
        );
    }

    #[test]
    fn builtin_loads_nothing() {
        assert!(matches!(ShaderSelection::Builtin.load(), Ok(None)));
    }

    #[test]
    fn missing_shader_file() {
        let selection = ShaderSelection::Wgsl("/nonexistent/glint/shader.wgsl".into());
        assert!(matches!(selection.load(), Err(RendererError::ShaderRead { .. })));
    }

    #[test]
    fn preset_parsing() {
        let preset = ShaderPreset::parse("source = \"crt.wgsl\"\nfilter = \"Nearest\"").unwrap();
        assert_eq!(preset.source, PathBuf::from("crt.wgsl"));
        assert_eq!(preset.filter_mode().unwrap(), Some(FilterMode::Nearest));
        assert_eq!(
            preset.source_path(Path::new("/shaders/presets/crt.toml")),
            PathBuf::from("/shaders/presets/crt.wgsl")
        );

        let preset = ShaderPreset::parse("source = \"crt.wgsl\"").unwrap();
        assert_eq!(preset.filter_mode().unwrap(), None);

        let preset = ShaderPreset::parse("source = \"crt.wgsl\"\nfilter = \"bicubic\"").unwrap();
        assert!(matches!(preset.filter_mode(), Err(RendererError::InvalidShaderFilter(_))));

        assert!(ShaderPreset::parse("filter = \"linear\"").is_err());
    }

    #[test]
    fn preset_loads_relative_source() {
        let dir = std::env::temp_dir().join(format!("glint-shader-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("passthrough.wgsl"), "// passthrough").unwrap();
        fs::write(dir.join("preset.toml"), "source = \"passthrough.wgsl\"\nfilter = \"linear\"")
            .unwrap();

        let loaded = ShaderSelection::Preset(dir.join("preset.toml")).load().unwrap().unwrap();
        assert_eq!(loaded.source, "// passthrough");
        assert_eq!(loaded.path, dir.join("passthrough.wgsl"));
        assert_eq!(loaded.filter_override, Some(FilterMode::Linear));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn params_layout() {
        assert_eq!(size_of::<ShaderParams>(), 96);

        let params = ShaderParams::new(
            FrameSize::new(256, 224),
            FrameSize::new(512, 512),
            FrameSize::new(960, 720),
            UNIT_ORTHO_PROJECTION,
        );
        assert_eq!(params.source_size, [256.0, 224.0]);
        assert_eq!(params.texture_size, [512.0, 512.0]);
        assert_eq!(params.output_size, [960.0, 720.0]);
    }
}
