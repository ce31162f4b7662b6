pub mod compositor;
pub mod config;
mod fpscounter;
pub mod renderer;
pub mod shader;
pub mod software;
pub mod texture;
pub mod viewport;

pub use compositor::{Compositor, GraphicsDevice, RendererError};
pub use config::{FilterMode, ShaderConfig, VideoConfig};
