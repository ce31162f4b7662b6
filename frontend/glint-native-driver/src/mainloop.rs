use crate::config::{InputDriver, NativeConfig};
use crate::input::SdlDevices;
use crate::video::SdlVideo;
use glint_common::frontend::EmulationCore;
use glint_common::runner::{FrameOutcome, Frontend};
use glint_common::speed::FastForwardFlag;
use glint_input::{InputError, InputResolver};
use glint_renderer::RendererError;
use sdl2::keyboard::Scancode;
use sdl2::video::WindowBuildError;
use sdl2::{EventPump, IntegerOrSdlError, JoystickSubsystem, Sdl, VideoSubsystem};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NativeDriverError {
    #[error("{0}")]
    Render(#[from] RendererError),
    #[error("{0}")]
    Input(#[from] InputError),
    #[error("Error reading config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Error parsing config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Unknown driver '{name}', expected one of {available:?}")]
    UnknownDriver { name: String, available: Vec<String> },
    #[error("Error initializing SDL2: {0}")]
    SdlInit(String),
    #[error("Error initializing SDL2 video subsystem: {0}")]
    SdlVideoInit(String),
    #[error("Error initializing SDL2 joystick subsystem: {0}")]
    SdlJoystickInit(String),
    #[error("Error initializing SDL2 event pump: {0}")]
    SdlEventPumpInit(String),
    #[error("Error creating SDL2 window: {0}")]
    SdlCreateWindow(#[from] WindowBuildError),
    #[error("Error toggling window fullscreen: {0}")]
    SdlSetFullscreen(String),
    #[error("Error creating SDL2 canvas/renderer: {0}")]
    SdlCreateCanvas(#[source] IntegerOrSdlError),
    #[error("Error querying SDL2 canvas output size: {0}")]
    SdlCanvasSize(String),
}

pub type NativeDriverResult<T> = Result<T, NativeDriverError>;

pub type NativeFrontend = Frontend<SdlVideo, InputResolver<SdlDevices>>;

/// SDL2 front-end: one window, the configured video backend, and SDL keyboard/joystick input.
pub struct NativeDriver {
    frontend: NativeFrontend,
    _video_subsystem: VideoSubsystem,
    _sdl: Sdl,
}

impl NativeDriver {
    /// Initialize SDL2 and create the video and input backends named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if SDL2 fails to initialize, if either backend fails to initialize, or if
    /// the input config references an unknown key.
    pub fn new(config: &NativeConfig) -> NativeDriverResult<Self> {
        let (sdl, video_subsystem, joystick_subsystem, event_pump) = init_sdl()?;

        let video = SdlVideo::create(&video_subsystem, config.video_driver, &config.video)?;

        let devices = match config.input_driver {
            InputDriver::Sdl => SdlDevices::new(joystick_subsystem, event_pump)?,
        };

        let exit_key = config.input.resolve_exit_key(Scancode::from_name)?;
        let bindings = config.input.to_bindings(Scancode::from_name)?;

        let fast_forward = FastForwardFlag::new();
        let resolver = InputResolver::new(
            devices,
            exit_key,
            config.input.axis_threshold,
            fast_forward.clone(),
        )?;

        let frontend = Frontend::new(video, resolver, bindings, exit_key, fast_forward);

        Ok(Self { frontend, _video_subsystem: video_subsystem, _sdl: sdl })
    }

    /// Run the core for one frame and present it, then apply any pending window resize.
    ///
    /// # Errors
    ///
    /// Propagates any error from the video backend.
    pub fn run_frame<C: EmulationCore + ?Sized>(
        &mut self,
        core: &mut C,
    ) -> NativeDriverResult<FrameOutcome> {
        let outcome = self.frontend.run_frame(core)?;

        if let Some(size) = self.frontend.input_mut().devices_mut().take_resize() {
            self.frontend.video_mut().resize(size);
        }

        Ok(outcome)
    }

    /// Run frames until the exit key is pressed or the window is closed.
    ///
    /// # Errors
    ///
    /// Propagates any error from the video backend.
    pub fn run<C: EmulationCore + ?Sized>(&mut self, core: &mut C) -> NativeDriverResult<()> {
        while self.run_frame(core)? == FrameOutcome::Continue {}

        log::info!("Exiting after {} frames", self.frontend.frame_count());

        Ok(())
    }

    pub fn frontend(&self) -> &NativeFrontend {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut NativeFrontend {
        &mut self.frontend
    }
}

fn init_sdl() -> NativeDriverResult<(Sdl, VideoSubsystem, JoystickSubsystem, EventPump)> {
    let sdl = sdl2::init().map_err(NativeDriverError::SdlInit)?;
    let video = sdl.video().map_err(NativeDriverError::SdlVideoInit)?;
    let joystick = sdl.joystick().map_err(NativeDriverError::SdlJoystickInit)?;
    let event_pump = sdl.event_pump().map_err(NativeDriverError::SdlEventPumpInit)?;

    Ok((sdl, video, joystick, event_pump))
}
