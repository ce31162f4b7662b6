use crate::NativeDriverError;
use crate::config::VideoDriver;
use glint_common::frontend::{Color, FrameSize, PackedFrame, StatusSink, VideoBackend};
use glint_proc_macros::MatchEachVariantMacro;
use glint_renderer::compositor::INITIAL_STATUS;
use glint_renderer::renderer::{self, WgpuDevice};
use glint_renderer::software::{self, PresentTarget, SoftwareDevice};
use glint_renderer::{Compositor, RendererError, VideoConfig};
use sdl2::VideoSubsystem;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator, TextureValueError, UpdateTextureError};
use sdl2::video::{FullscreenType, Window, WindowContext};
use thiserror::Error;

/// Shows compositor status text in the window title bar.
pub struct SdlWindowTitle {
    window: Window,
}

impl SdlWindowTitle {
    #[must_use]
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl StatusSink for SdlWindowTitle {
    fn set_status(&mut self, status: &str) {
        if let Err(err) = self.window.set_title(status) {
            log::warn!("Error changing window title to '{status}': {err}");
        }
    }
}

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("Error creating SDL2 texture: {0}")]
    CreateTexture(#[from] TextureValueError),
    #[error("Error updating SDL2 texture: {0}")]
    UpdateTexture(#[from] UpdateTextureError),
    #[error("Error copying texture to SDL2 canvas: {0}")]
    Copy(String),
}

/// Presents software-composed frames through an SDL2 canvas.
pub struct SdlCanvasTarget {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
}

impl SdlCanvasTarget {
    /// # Errors
    ///
    /// Returns an error if SDL2 cannot create an accelerated renderer for the window.
    pub fn new(window: Window, vsync: bool) -> Result<Self, NativeDriverError> {
        let mut builder = window.into_canvas().accelerated();
        if vsync {
            builder = builder.present_vsync();
        }
        let canvas = builder.build().map_err(NativeDriverError::SdlCreateCanvas)?;
        let texture_creator = canvas.texture_creator();

        Ok(Self { canvas, texture_creator })
    }

    /// # Errors
    ///
    /// Returns an error if SDL2 cannot report the renderer's output size.
    pub fn output_size(&self) -> Result<FrameSize, NativeDriverError> {
        let (width, height) =
            self.canvas.output_size().map_err(NativeDriverError::SdlCanvasSize)?;
        Ok(FrameSize::new(width, height))
    }
}

impl PresentTarget for SdlCanvasTarget {
    type Err = CanvasError;

    fn present(&mut self, pixels: &[Color], size: FrameSize) -> Result<(), Self::Err> {
        let mut texture = self.texture_creator.create_texture_streaming(
            PixelFormatEnum::RGBA32,
            size.width,
            size.height,
        )?;
        texture.update(None, bytemuck::cast_slice(pixels), 4 * size.width as usize)?;

        self.canvas.copy(&texture, None, None).map_err(CanvasError::Copy)?;
        self.canvas.present();

        Ok(())
    }

    fn set_vsync(&mut self, vsync: bool) {
        // SAFETY: The renderer pointer is owned by the canvas and valid for its lifetime
        let result = unsafe { sdl2::sys::SDL_RenderSetVSync(self.canvas.raw(), vsync.into()) };
        if result != 0 {
            log::warn!("Error setting SDL2 renderer vsync to {vsync}: {}", sdl2::get_error());
        }
    }
}

/// The video backend selected at startup.
#[derive(MatchEachVariantMacro)]
pub enum SdlVideo {
    Wgpu(Compositor<WgpuDevice<Window>>),
    Software(Compositor<SoftwareDevice<SdlCanvasTarget>>),
}

impl SdlVideo {
    /// Create the window and the video backend for `driver`.
    ///
    /// # Errors
    ///
    /// Returns an error if window creation or backend initialization fails.
    pub fn create(
        video: &VideoSubsystem,
        driver: VideoDriver,
        config: &VideoConfig,
    ) -> Result<Self, NativeDriverError> {
        let window = create_window(video, config)?;
        let status_sink = Box::new(SdlWindowTitle::new(window.clone()));

        log::info!("Creating {driver} video backend");

        let backend = match driver {
            VideoDriver::Wgpu => {
                let (width, height) = window.size();
                let compositor = pollster::block_on(renderer::create_wgpu_compositor(
                    window,
                    FrameSize::new(width, height),
                    config,
                    status_sink,
                ))?;
                Self::Wgpu(compositor)
            }
            VideoDriver::Software => {
                let target = SdlCanvasTarget::new(window, config.vsync)?;
                let output_size = target.output_size()?;
                let compositor = software::create_software_compositor(
                    target,
                    output_size,
                    config,
                    status_sink,
                )?;
                Self::Software(compositor)
            }
        };

        Ok(backend)
    }

    /// Resize the output surface after the window changed to `window_size`.
    pub fn resize(&mut self, window_size: FrameSize) {
        match self {
            Self::Wgpu(compositor) => compositor.resize(window_size.width, window_size.height),
            Self::Software(compositor) => {
                // Canvas output size is in physical pixels, which differs from the window size on
                // high-DPI displays
                let size = compositor.device().target().output_size().unwrap_or_else(|err| {
                    log::warn!("{err}; falling back to window size {window_size:?}");
                    window_size
                });
                compositor.resize(size.width, size.height);
            }
        }
    }
}

impl VideoBackend for SdlVideo {
    type Err = RendererError;

    fn frame(&mut self, frame: PackedFrame<'_>) -> Result<(), Self::Err> {
        match_each_variant!(self, compositor => compositor.frame(frame))
    }

    fn set_nonblock_state(&mut self, nonblock: bool) {
        match_each_variant!(self, compositor => compositor.set_nonblock_state(nonblock));
    }

    fn identifier(&self) -> &'static str {
        match_each_variant!(self, compositor => compositor.identifier())
    }
}

fn create_window(video: &VideoSubsystem, config: &VideoConfig) -> Result<Window, NativeDriverError> {
    let mut window =
        video.window(INITIAL_STATUS, config.width, config.height).resizable().build()?;

    if config.fullscreen {
        window
            .set_fullscreen(FullscreenType::Desktop)
            .map_err(NativeDriverError::SdlSetFullscreen)?;
    }

    Ok(window)
}
