//! CPU rendering for platforms without a usable GPU adapter. The frame texture is sampled into a
//! window-sized RGBA buffer which is handed to a [`PresentTarget`] once per frame.

use crate::compositor::{Compositor, GraphicsDevice, RendererError};
use crate::config::{FilterMode, VideoConfig};
use crate::shader::{ShaderParams, ShaderSelection};
use crate::texture::TexCoordQuad;
use crate::viewport::{Mat4, Viewport};
use glint_common::frontend::{Color, FrameSize, PackedFrame, StatusSink};
use std::fmt::Display;

pub trait PresentTarget {
    type Err: Display;

    /// Display a fully composed buffer of `size.width * size.height` colors.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform fails to display the buffer.
    fn present(&mut self, pixels: &[Color], size: FrameSize) -> Result<(), Self::Err>;

    fn set_vsync(&mut self, vsync: bool);
}

pub struct SoftwareDevice<T> {
    target: T,
    filter_mode: FilterMode,
    texture: Vec<Color>,
    texture_size: FrameSize,
    tex_coords: TexCoordQuad,
    viewport: Viewport,
    surface_size: FrameSize,
    output: Vec<Color>,
}

impl<T: PresentTarget> SoftwareDevice<T> {
    /// # Errors
    ///
    /// Returns an error if the config's input scale is out of range.
    pub fn new(
        target: T,
        surface_size: FrameSize,
        config: &VideoConfig,
    ) -> Result<Self, RendererError> {
        let texture_size = config.texture_size()?;

        if ShaderSelection::resolve(&config.shader) != ShaderSelection::Builtin {
            log::warn!(
                "Post-processing shaders are not supported by the software renderer; ignoring"
            );
        }

        Ok(Self {
            target,
            filter_mode: config.filter_mode(),
            texture: vec![Color::TRANSPARENT; texture_size.len()],
            texture_size,
            tex_coords: TexCoordQuad::full(),
            viewport: Viewport::full(surface_size),
            surface_size,
            output: vec![Color::BLACK; surface_size.len()],
        })
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    fn texel(&self, x: i64, y: i64) -> Color {
        let x = x.clamp(0, i64::from(self.texture_size.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.texture_size.height) - 1) as usize;
        self.texture[y * self.texture_size.width as usize + x]
    }

    fn sample(&self, u: f32, v: f32) -> Color {
        let x = u * self.texture_size.width as f32;
        let y = v * self.texture_size.height as f32;

        match self.filter_mode {
            FilterMode::Nearest => self.texel(x.floor() as i64, y.floor() as i64),
            FilterMode::Linear => {
                let x = x - 0.5;
                let y = y - 0.5;
                let x0 = x.floor();
                let y0 = y.floor();
                let dx = x - x0;
                let dy = y - y0;

                let (x0, y0) = (x0 as i64, y0 as i64);
                let top = lerp(self.texel(x0, y0), self.texel(x0 + 1, y0), dx);
                let bottom = lerp(self.texel(x0, y0 + 1), self.texel(x0 + 1, y0 + 1), dx);
                lerp(top, bottom, dy)
            }
        }
    }

    fn compose(&mut self) {
        self.output.fill(Color::BLACK);

        let Viewport { x: vx, y: vy, width: vw, height: vh } = self.viewport;
        let FrameSize { width: sw, height: sh } = self.surface_size;
        if self.viewport.is_empty() || vx + vw > sw || vy + vh > sh {
            return;
        }

        let [u0, v0] = self.tex_coords.corner(TexCoordQuad::TOP_LEFT);
        let [u1, _] = self.tex_coords.corner(TexCoordQuad::TOP_RIGHT);
        let [_, v1] = self.tex_coords.corner(TexCoordQuad::BOTTOM_LEFT);

        for row in 0..vh {
            let v = v0 + (v1 - v0) * (row as f32 + 0.5) / vh as f32;
            let out_start = ((vy + row) * sw + vx) as usize;

            for col in 0..vw {
                let u = u0 + (u1 - u0) * (col as f32 + 0.5) / vw as f32;
                self.output[out_start + col as usize] = self.sample(u, v);
            }
        }
    }
}

fn lerp(a: Color, b: Color, t: f32) -> Color {
    let channel = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
    Color::rgba(channel(a.r, b.r), channel(a.g, b.g), channel(a.b, b.b), channel(a.a, b.a))
}

impl<T: PresentTarget> GraphicsDevice for SoftwareDevice<T> {
    fn clear_texture(&mut self) {
        self.texture.fill(Color::TRANSPARENT);
    }

    fn write_frame(&mut self, frame: PackedFrame<'_>) {
        let stride = self.texture_size.width as usize;
        glint_common::frontend::unpack_frame(&frame, &mut self.texture, stride);
    }

    fn set_tex_coords(&mut self, quad: TexCoordQuad) {
        self.tex_coords = quad;
    }

    fn set_viewport(&mut self, viewport: Viewport, _projection: Mat4) {
        self.viewport = viewport;
    }

    fn set_shader_params(&mut self, _params: ShaderParams) {}

    fn draw_and_present(&mut self) -> Result<(), RendererError> {
        if self.surface_size.is_empty() {
            return Ok(());
        }

        self.compose();
        self.target
            .present(&self.output, self.surface_size)
            .map_err(|err| RendererError::Present(err.to_string()))
    }

    fn set_vsync(&mut self, vsync: bool) {
        log::debug!("Software renderer vsync {}", if vsync { "enabled" } else { "disabled" });
        self.target.set_vsync(vsync);
    }

    fn resize_surface(&mut self, size: FrameSize) {
        self.surface_size = size;
        self.output = vec![Color::BLACK; size.len()];
    }

    fn surface_size(&self) -> FrameSize {
        self.surface_size
    }

    fn identifier(&self) -> &'static str {
        "software"
    }
}

/// Create a compositor that renders on the CPU and presents through `target`.
///
/// # Errors
///
/// Returns an error if the config's input scale is out of range.
pub fn create_software_compositor<T: PresentTarget>(
    target: T,
    surface_size: FrameSize,
    config: &VideoConfig,
    status_sink: Box<dyn StatusSink>,
) -> Result<Compositor<SoftwareDevice<T>>, RendererError> {
    let device = SoftwareDevice::new(target, surface_size, config)?;
    Compositor::new(device, config, status_sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_common::frontend::{LogStatusSink, VideoBackend};
    use std::convert::Infallible;
    use test_log::test;

    #[derive(Default)]
    struct CaptureTarget {
        last: Option<(Vec<Color>, FrameSize)>,
        vsync: Vec<bool>,
    }

    impl PresentTarget for CaptureTarget {
        type Err = Infallible;

        fn present(&mut self, pixels: &[Color], size: FrameSize) -> Result<(), Self::Err> {
            self.last = Some((pixels.to_vec(), size));
            Ok(())
        }

        fn set_vsync(&mut self, vsync: bool) {
            self.vsync.push(vsync);
        }
    }

    const WHITE: u16 = 0x7FFF;
    const RED: u16 = 0x7C00;

    fn software_compositor(
        width: u32,
        height: u32,
        smooth: bool,
    ) -> Compositor<SoftwareDevice<CaptureTarget>> {
        let config = VideoConfig { smooth, ..VideoConfig::default() };
        create_software_compositor(
            CaptureTarget::default(),
            FrameSize::new(width, height),
            &config,
            Box::new(LogStatusSink),
        )
        .unwrap()
    }

    fn presented(compositor: &Compositor<SoftwareDevice<CaptureTarget>>) -> &[Color] {
        &compositor.device().target().last.as_ref().unwrap().0
    }

    #[test]
    fn nearest_upscale() {
        // 2x2 source into a 4x3 surface at 4:3 => 2x scale horizontally, 1.5x vertically
        let mut compositor = software_compositor(4, 3, false);
        let pixels = [WHITE, RED, RED, WHITE];
        compositor.frame(PackedFrame::new(&pixels, 2, 2, 2)).unwrap();

        let white = Color::rgb(255, 255, 255);
        let red = Color::rgb(255, 0, 0);
        let out = presented(&compositor);
        assert_eq!(&out[0..4], &[white, white, red, red]);
        assert_eq!(&out[4..8], &[red, red, white, white]);
        assert_eq!(&out[8..12], &[red, red, white, white]);
    }

    #[test]
    fn linear_blends_neighbors() {
        let mut compositor = software_compositor(4, 3, true);
        let pixels = [0x0000, WHITE];
        compositor.frame(PackedFrame::new(&pixels, 2, 1, 2)).unwrap();

        let out = presented(&compositor);
        assert_eq!(out[0], Color::BLACK);
        assert_eq!(out[1], Color::rgb(64, 64, 64));
        assert_eq!(out[2], Color::rgb(191, 191, 191));
    }

    #[test]
    fn letterbox_bars_are_black() {
        // 4x4 surface letterboxes to 4x3 starting at row 0
        let mut compositor = software_compositor(4, 4, false);
        assert_eq!(compositor.viewport(), Viewport { x: 0, y: 0, width: 4, height: 3 });

        let pixels = [WHITE; 4];
        compositor.frame(PackedFrame::new(&pixels, 2, 2, 2)).unwrap();

        let out = presented(&compositor);
        assert!(out[..12].iter().all(|&color| color == Color::rgb(255, 255, 255)));
        assert!(out[12..].iter().all(|&color| color == Color::BLACK));
    }

    #[test]
    fn stale_pixels_cleared_on_resolution_change() {
        let mut compositor = software_compositor(4, 3, false);

        let large = [WHITE; 16];
        compositor.frame(PackedFrame::new(&large, 4, 4, 4)).unwrap();

        let small = [RED];
        compositor.frame(PackedFrame::new(&small, 1, 1, 1)).unwrap();

        let device = compositor.device();
        assert_eq!(device.texture[0], Color::rgb(255, 0, 0));
        assert_eq!(device.texture[1], Color::TRANSPARENT);
        assert_eq!(device.texture[256], Color::TRANSPARENT);
        assert!(presented(&compositor).iter().all(|&color| color == Color::rgb(255, 0, 0)));
    }

    #[test]
    fn row_stride_is_honored() {
        let mut compositor = software_compositor(4, 3, false);
        let pixels = [WHITE, WHITE, 0xFFFF, RED, RED];
        compositor.frame(PackedFrame::new(&pixels, 2, 2, 3)).unwrap();

        let device = compositor.device();
        assert_eq!(&device.texture[..2], &[Color::rgb(255, 255, 255); 2]);
        assert_eq!(&device.texture[256..258], &[Color::rgb(255, 0, 0); 2]);
    }

    #[test]
    fn oversized_input_scale_is_init_error() {
        for input_scale in [0, 33, 256] {
            let config = VideoConfig { input_scale, ..VideoConfig::default() };
            let result = create_software_compositor(
                CaptureTarget::default(),
                FrameSize::new(640, 480),
                &config,
                Box::new(LogStatusSink),
            );
            let Err(RendererError::InvalidInputScale(scale)) = result else {
                panic!("input scale {input_scale} accepted");
            };
            assert_eq!(scale, input_scale);
        }
    }

    #[test]
    fn resize_reallocates_output() {
        // Window is 4x3 logical but the canvas reports 8x6 physical pixels
        let mut compositor = software_compositor(4, 3, false);
        compositor.resize(8, 6);
        assert_eq!(compositor.viewport(), Viewport { x: 0, y: 0, width: 8, height: 6 });

        let pixels = [WHITE, RED, RED, WHITE];
        compositor.frame(PackedFrame::new(&pixels, 2, 2, 2)).unwrap();

        let (out, size) = compositor.device().target().last.as_ref().unwrap();
        assert_eq!(*size, FrameSize::new(8, 6));
        assert_eq!(out.len(), 48);

        let white = Color::rgb(255, 255, 255);
        let red = Color::rgb(255, 0, 0);
        assert_eq!(&out[0..8], &[white, white, white, white, red, red, red, red]);
        assert_eq!(&out[40..48], &[red, red, red, red, white, white, white, white]);
    }

    #[test]
    fn vsync_forwarded_to_target() {
        let mut compositor = software_compositor(4, 3, false);
        compositor.set_nonblock_state(true);
        compositor.set_nonblock_state(false);
        assert_eq!(compositor.device().target().vsync, vec![false, true]);
    }
}
