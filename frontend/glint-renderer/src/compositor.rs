use crate::config::VideoConfig;
use crate::fpscounter::FpsCounter;
use crate::shader::ShaderParams;
use crate::texture::{FrameTexture, FrameUpload, TexCoordQuad};
use crate::viewport::{self, Mat4, UNIT_ORTHO_PROJECTION, Viewport};
use glint_common::frontend::{FrameError, FrameSize, PackedFrame, StatusSink, VideoBackend};
use raw_window_handle::HandleError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub const INITIAL_STATUS: &str = "Glint";

#[derive(Debug, Error)]
pub enum RendererError {
    #[error(
        "Input scale must be between 1 and {max}, was {0}",
        max = crate::config::MAX_INPUT_SCALE
    )]
    InvalidInputScale(u32),
    #[error(
        "Frame texture of size {width}x{height} exceeds the device limit of {max_dimension}"
    )]
    TextureTooLarge { width: u32, height: u32, max_dimension: u32 },
    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),
    #[error(
        "Frame of size {width}x{height} does not fit in the {texture_width}x{texture_height} frame texture"
    )]
    FrameTooLarge { width: u32, height: u32, texture_width: u32, texture_height: u32 },
    #[error("Error reading shader file '{}': {source}", path.display())]
    ShaderRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error parsing shader preset '{}': {source}", path.display())]
    ShaderPresetParse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
    #[error("Invalid shader preset filter: {0}")]
    InvalidShaderFilter(String),
    #[error("Error compiling shader: {0}")]
    ShaderCompile(String),
    #[error("Error creating surface from window: {0}")]
    WindowHandleError(#[from] HandleError),
    #[error("Error creating wgpu surface: {0}")]
    WgpuCreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("Failed to obtain wgpu adapter: {0}")]
    NoWgpuAdapter(#[from] wgpu::RequestAdapterError),
    #[error("Error requesting wgpu device: {0}")]
    WgpuRequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("Error getting handle to wgpu output surface: {0}")]
    WgpuSurface(#[from] wgpu::SurfaceError),
    #[error("wgpu surface does not support any texture formats")]
    NoSurfaceFormat,
    #[error("Error presenting frame: {0}")]
    Present(String),
}

/// Low-level drawing operations a compositor drives once per frame.
///
/// Implementations own the frame texture allocation, which is fixed at creation time.
pub trait GraphicsDevice {
    /// Zero-fill the entire frame texture.
    fn clear_texture(&mut self);

    /// Write a frame into the top-left corner of the frame texture, honoring its row stride.
    fn write_frame(&mut self, frame: PackedFrame<'_>);

    fn set_tex_coords(&mut self, quad: TexCoordQuad);

    fn set_viewport(&mut self, viewport: Viewport, projection: Mat4);

    fn set_shader_params(&mut self, params: ShaderParams);

    /// Clear the surface, draw the output quad, and present.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be acquired or presented.
    fn draw_and_present(&mut self) -> Result<(), RendererError>;

    fn set_vsync(&mut self, vsync: bool);

    fn resize_surface(&mut self, size: FrameSize);

    fn surface_size(&self) -> FrameSize;

    fn identifier(&self) -> &'static str;
}

/// Video backend that streams emulator frames into a fixed-size texture and draws the valid
/// sub-region into an aspect-locked viewport.
pub struct Compositor<D> {
    device: D,
    texture: FrameTexture,
    surface_size: FrameSize,
    viewport: Viewport,
    force_aspect: bool,
    vsync: bool,
    fps_counter: FpsCounter,
    status_sink: Box<dyn StatusSink>,
}

impl<D: GraphicsDevice> Compositor<D> {
    /// Wrap an initialized device. The device's frame texture must be `config.texture_size()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config's input scale is out of range.
    pub fn new(
        mut device: D,
        config: &VideoConfig,
        mut status_sink: Box<dyn StatusSink>,
    ) -> Result<Self, RendererError> {
        let texture = FrameTexture::new(config.texture_size()?);
        device.clear_texture();
        device.set_tex_coords(texture.tex_coords());

        let surface_size = device.surface_size();
        let viewport = viewport::compute_viewport(surface_size, config.force_aspect);
        device.set_viewport(viewport, UNIT_ORTHO_PROJECTION);

        log::info!(
            "Initialized {} video with {}x{} frame texture, surface {}x{}, viewport {viewport:?}",
            device.identifier(),
            texture.texture_size().width,
            texture.texture_size().height,
            surface_size.width,
            surface_size.height
        );

        status_sink.set_status(INITIAL_STATUS);

        Ok(Self {
            device,
            texture,
            surface_size,
            viewport,
            force_aspect: config.force_aspect,
            vsync: config.vsync,
            fps_counter: FpsCounter::new(),
            status_sink,
        })
    }

    /// Handle a change in display surface size. Resizing to the current size does nothing.
    pub fn resize(&mut self, width: u32, height: u32) {
        let size = FrameSize::new(width, height);
        if size == self.surface_size {
            return;
        }

        self.surface_size = size;
        self.device.resize_surface(size);

        self.viewport = viewport::compute_viewport(size, self.force_aspect);
        self.device.set_viewport(self.viewport, UNIT_ORTHO_PROJECTION);

        log::debug!("Display surface resized to {width}x{height}; viewport {:?}", self.viewport);
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn texture(&self) -> &FrameTexture {
        &self.texture
    }

    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: GraphicsDevice> VideoBackend for Compositor<D> {
    type Err = RendererError;

    fn frame(&mut self, frame: PackedFrame<'_>) -> Result<(), Self::Err> {
        frame.validate()?;

        let frame_size = frame.size();
        if !self.texture.fits(frame_size) {
            let texture_size = self.texture.texture_size();
            return Err(RendererError::FrameTooLarge {
                width: frame_size.width,
                height: frame_size.height,
                texture_width: texture_size.width,
                texture_height: texture_size.height,
            });
        }

        self.device.set_shader_params(ShaderParams::new(
            frame_size,
            self.texture.texture_size(),
            self.viewport.size(),
            UNIT_ORTHO_PROJECTION,
        ));

        if let FrameUpload::Resized(tex_coords) = self.texture.prepare(frame_size) {
            self.device.clear_texture();
            self.device.set_tex_coords(tex_coords);
        }

        self.device.write_frame(frame);
        self.device.draw_and_present()?;

        if let Some(report) = self.fps_counter.record_frame() {
            self.status_sink.set_status(&report.to_string());
        }

        Ok(())
    }

    fn set_nonblock_state(&mut self, nonblock: bool) {
        if !self.vsync {
            return;
        }

        self.device.set_vsync(!nonblock);
    }

    fn identifier(&self) -> &'static str {
        self.device.identifier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use test_log::test;

    #[derive(Debug, Clone, PartialEq)]
    enum DeviceCall {
        ClearTexture,
        WriteFrame { width: u32, height: u32, row_stride: u32 },
        SetTexCoords(TexCoordQuad),
        SetViewport(Viewport),
        SetShaderParams(ShaderParams),
        DrawAndPresent,
        SetVsync(bool),
        ResizeSurface(FrameSize),
    }

    struct RecordingDevice {
        surface_size: FrameSize,
        calls: Vec<DeviceCall>,
    }

    impl RecordingDevice {
        fn new(width: u32, height: u32) -> Self {
            Self { surface_size: FrameSize::new(width, height), calls: Vec::new() }
        }

        fn take_calls(&mut self) -> Vec<DeviceCall> {
            std::mem::take(&mut self.calls)
        }
    }

    impl GraphicsDevice for RecordingDevice {
        fn clear_texture(&mut self) {
            self.calls.push(DeviceCall::ClearTexture);
        }

        fn write_frame(&mut self, frame: PackedFrame<'_>) {
            self.calls.push(DeviceCall::WriteFrame {
                width: frame.width,
                height: frame.height,
                row_stride: frame.row_stride,
            });
        }

        fn set_tex_coords(&mut self, quad: TexCoordQuad) {
            self.calls.push(DeviceCall::SetTexCoords(quad));
        }

        fn set_viewport(&mut self, viewport: Viewport, projection: Mat4) {
            assert_eq!(projection, UNIT_ORTHO_PROJECTION);
            self.calls.push(DeviceCall::SetViewport(viewport));
        }

        fn set_shader_params(&mut self, params: ShaderParams) {
            self.calls.push(DeviceCall::SetShaderParams(params));
        }

        fn draw_and_present(&mut self) -> Result<(), RendererError> {
            self.calls.push(DeviceCall::DrawAndPresent);
            Ok(())
        }

        fn set_vsync(&mut self, vsync: bool) {
            self.calls.push(DeviceCall::SetVsync(vsync));
        }

        fn resize_surface(&mut self, size: FrameSize) {
            self.surface_size = size;
            self.calls.push(DeviceCall::ResizeSurface(size));
        }

        fn surface_size(&self) -> FrameSize {
            self.surface_size
        }

        fn identifier(&self) -> &'static str {
            "recording"
        }
    }

    #[derive(Clone, Default)]
    struct SharedStatus(Rc<RefCell<Vec<String>>>);

    impl StatusSink for SharedStatus {
        fn set_status(&mut self, status: &str) {
            self.0.borrow_mut().push(status.into());
        }
    }

    fn new_compositor(
        width: u32,
        height: u32,
        config: VideoConfig,
    ) -> (Compositor<RecordingDevice>, SharedStatus) {
        let status = SharedStatus::default();
        let mut compositor =
            Compositor::new(RecordingDevice::new(width, height), &config, Box::new(status.clone()))
                .unwrap();
        compositor.device_mut().take_calls();
        status.0.borrow_mut().clear();
        (compositor, status)
    }

    fn shader_params_call(
        frame_size: FrameSize,
        texture_size: FrameSize,
        viewport: Viewport,
    ) -> DeviceCall {
        DeviceCall::SetShaderParams(ShaderParams::new(
            frame_size,
            texture_size,
            viewport.size(),
            UNIT_ORTHO_PROJECTION,
        ))
    }

    #[test]
    fn init_clears_texture_and_sets_full_viewport() {
        let status = SharedStatus::default();
        let mut compositor = Compositor::new(
            RecordingDevice::new(640, 480),
            &VideoConfig::default(),
            Box::new(status.clone()),
        )
        .unwrap();

        let full = Viewport { x: 0, y: 0, width: 640, height: 480 };
        assert_eq!(compositor.viewport(), full);
        assert_eq!(compositor.device_mut().take_calls(), vec![
            DeviceCall::ClearTexture,
            DeviceCall::SetTexCoords(TexCoordQuad::full()),
            DeviceCall::SetViewport(full),
        ]);
        assert_eq!(*status.0.borrow(), vec!["Glint".to_string()]);
    }

    #[test]
    fn zero_input_scale_rejected() {
        let config = VideoConfig { input_scale: 0, ..VideoConfig::default() };
        let status = Box::new(SharedStatus::default());
        let result = Compositor::new(RecordingDevice::new(640, 480), &config, status);
        assert!(matches!(result, Err(RendererError::InvalidInputScale(0))));
    }

    #[test]
    fn resolution_change_clears_once() {
        let (mut compositor, _) = new_compositor(320, 240, VideoConfig::default());
        let texture_size = FrameSize::new(256, 256);
        let viewport = Viewport { x: 0, y: 0, width: 320, height: 240 };
        let pixels = vec![0x7FFF; 256 * 224];

        compositor.frame(PackedFrame::new(&pixels, 256, 224, 256)).unwrap();
        let quad = TexCoordQuad::for_frame(FrameSize::new(256, 224), texture_size);
        assert_eq!(compositor.device_mut().take_calls(), vec![
            shader_params_call(FrameSize::new(256, 224), texture_size, viewport),
            DeviceCall::ClearTexture,
            DeviceCall::SetTexCoords(quad),
            DeviceCall::WriteFrame { width: 256, height: 224, row_stride: 256 },
            DeviceCall::DrawAndPresent,
        ]);

        compositor.frame(PackedFrame::new(&pixels, 256, 224, 256)).unwrap();
        assert_eq!(compositor.device_mut().take_calls(), vec![
            shader_params_call(FrameSize::new(256, 224), texture_size, viewport),
            DeviceCall::WriteFrame { width: 256, height: 224, row_stride: 256 },
            DeviceCall::DrawAndPresent,
        ]);
        assert_eq!(compositor.texture().tex_coords(), quad);
    }

    #[test]
    fn larger_frame_at_scale_two() {
        let config = VideoConfig { input_scale: 2, ..VideoConfig::default() };
        let (mut compositor, _) = new_compositor(320, 240, config);
        let small = vec![0; 256 * 224];
        let large = vec![0; 512 * 448];

        compositor.frame(PackedFrame::new(&small, 256, 224, 256)).unwrap();
        compositor.frame(PackedFrame::new(&small, 256, 224, 256)).unwrap();
        assert_eq!(compositor.texture().generation(), 1);
        compositor.device_mut().take_calls();

        compositor.frame(PackedFrame::new(&large, 512, 448, 512)).unwrap();
        let calls = compositor.device_mut().take_calls();
        assert_eq!(calls.iter().filter(|&call| *call == DeviceCall::ClearTexture).count(), 1);
        assert!(calls.contains(&DeviceCall::SetTexCoords(TexCoordQuad([
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 0.875],
            [0.0, 0.875]
        ]))));
        assert_eq!(compositor.texture().generation(), 2);
    }

    #[test]
    fn padded_rows_are_passed_through() {
        let (mut compositor, _) = new_compositor(640, 480, VideoConfig::default());
        let pixels = vec![0; 512 * 223 + 256];

        compositor.frame(PackedFrame::new(&pixels, 256, 224, 512)).unwrap();
        compositor.frame(PackedFrame::new(&pixels, 256, 224, 512)).unwrap();

        let writes: Vec<_> = compositor
            .device_mut()
            .take_calls()
            .into_iter()
            .filter(|call| matches!(call, DeviceCall::WriteFrame { .. }))
            .collect();
        assert_eq!(writes, vec![
            DeviceCall::WriteFrame { width: 256, height: 224, row_stride: 512 };
            2
        ]);
    }

    #[test]
    fn invalid_frames_rejected() {
        let (mut compositor, _) = new_compositor(640, 480, VideoConfig::default());

        let pixels = vec![0; 100];
        assert!(matches!(
            compositor.frame(PackedFrame::new(&pixels, 16, 16, 16)),
            Err(RendererError::InvalidFrame(FrameError::BufferTooSmall { .. }))
        ));
        assert!(matches!(
            compositor.frame(PackedFrame::new(&pixels, 10, 5, 8)),
            Err(RendererError::InvalidFrame(FrameError::StrideTooSmall { .. }))
        ));

        let pixels = vec![0; 300 * 224];
        assert!(matches!(
            compositor.frame(PackedFrame::new(&pixels, 300, 224, 300)),
            Err(RendererError::FrameTooLarge { width: 300, height: 224, .. })
        ));

        assert!(compositor.device_mut().take_calls().is_empty());
    }

    #[test]
    fn resize_recomputes_viewport() {
        let (mut compositor, _) = new_compositor(640, 480, VideoConfig::default());

        compositor.resize(640, 480);
        assert!(compositor.device_mut().take_calls().is_empty());

        compositor.resize(1280, 720);
        let viewport = Viewport { x: 160, y: 0, width: 960, height: 720 };
        assert_eq!(compositor.viewport(), viewport);
        assert_eq!(compositor.device_mut().take_calls(), vec![
            DeviceCall::ResizeSurface(FrameSize::new(1280, 720)),
            DeviceCall::SetViewport(viewport),
        ]);

        let pixels = vec![0; 256 * 224];
        compositor.frame(PackedFrame::new(&pixels, 256, 224, 256)).unwrap();
        let calls = compositor.device_mut().take_calls();
        assert_eq!(
            calls[0],
            shader_params_call(FrameSize::new(256, 224), FrameSize::new(256, 256), viewport)
        );
    }

    #[test]
    fn nonblock_requires_vsync() {
        let (mut compositor, _) = new_compositor(640, 480, VideoConfig::default());
        compositor.set_nonblock_state(true);
        compositor.set_nonblock_state(false);
        assert_eq!(compositor.device_mut().take_calls(), vec![
            DeviceCall::SetVsync(false),
            DeviceCall::SetVsync(true)
        ]);

        let config = VideoConfig { vsync: false, ..VideoConfig::default() };
        let (mut compositor, _) = new_compositor(640, 480, config);
        compositor.set_nonblock_state(true);
        assert!(compositor.device_mut().take_calls().is_empty());
    }

    #[test]
    fn status_reported_every_180_frames() {
        let (mut compositor, status) = new_compositor(640, 480, VideoConfig::default());
        let pixels = vec![0; 256 * 224];

        for _ in 0..180 {
            compositor.frame(PackedFrame::new(&pixels, 256, 224, 256)).unwrap();
        }
        assert!(status.0.borrow().is_empty());

        compositor.frame(PackedFrame::new(&pixels, 256, 224, 256)).unwrap();
        let statuses = status.0.borrow();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].starts_with("Glint || FPS: "), "{}", statuses[0]);
        assert!(statuses[0].ends_with(" || Frames: 180"), "{}", statuses[0]);
    }
}
