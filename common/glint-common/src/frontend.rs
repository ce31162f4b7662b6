use crate::input::{DeviceKind, Port};
use std::iter;
use thiserror::Error;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    #[must_use]
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[must_use]
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Decode a packed 16-bit pixel with 5-bit channels: blue in bits 0-4, green in bits 5-9, red
    /// in bits 10-14. Bit 15 is ignored and the result is always opaque.
    #[must_use]
    #[inline]
    pub const fn from_packed_1555(pixel: u16) -> Self {
        const fn expand(channel: u16) -> u8 {
            let channel = (channel & 0x1F) as u8;
            (channel << 3) | (channel >> 2)
        }

        Self::rgb(expand(pixel >> 10), expand(pixel >> 5), expand(pixel))
    }
}

impl Default for Color {
    #[inline]
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel count, computed in `usize` so that large surfaces cannot overflow.
    #[must_use]
    pub const fn len(self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("row stride {row_stride} is smaller than frame width {width}")]
    StrideTooSmall { width: u32, row_stride: u32 },
    #[error(
        "frame buffer of len {buffer_len} is too small for a {width}x{height} frame with row stride {row_stride}"
    )]
    BufferTooSmall { width: u32, height: u32, row_stride: u32, buffer_len: usize },
}

/// A borrowed frame of packed 16-bit pixels as produced by an emulation core.
///
/// Rows are `row_stride` pixels apart; only the first `width` pixels of each row are content.
#[derive(Debug, Clone, Copy)]
pub struct PackedFrame<'a> {
    pub pixels: &'a [u16],
    pub width: u32,
    pub height: u32,
    pub row_stride: u32,
}

impl<'a> PackedFrame<'a> {
    #[must_use]
    pub fn new(pixels: &'a [u16], width: u32, height: u32, row_stride: u32) -> Self {
        Self { pixels, width, height, row_stride }
    }

    #[must_use]
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// Number of pixels the buffer must contain: every full row except the last, plus the
    /// content of the last row.
    #[must_use]
    pub fn required_len(&self) -> usize {
        if self.height == 0 {
            return 0;
        }

        (self.row_stride as usize) * (self.height as usize - 1) + self.width as usize
    }

    /// # Errors
    ///
    /// Returns an error if the row stride is smaller than the width or the buffer does not
    /// cover every row.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.row_stride < self.width {
            return Err(FrameError::StrideTooSmall {
                width: self.width,
                row_stride: self.row_stride,
            });
        }

        if self.pixels.len() < self.required_len() {
            return Err(FrameError::BufferTooSmall {
                width: self.width,
                height: self.height,
                row_stride: self.row_stride,
                buffer_len: self.pixels.len(),
            });
        }

        Ok(())
    }

    /// Iterate over the content of each row, skipping row padding. Assumes the frame is valid.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u16]> + 'a {
        let pixels = self.pixels;
        let width = self.width as usize;
        let stride = self.row_stride as usize;
        (0..self.height as usize).map(move |row| &pixels[row * stride..row * stride + width])
    }
}

/// Receives short status strings, e.g. a window title showing the current framerate.
pub trait StatusSink {
    fn set_status(&mut self, status: &str);
}

/// Status sink for headless use; statuses go to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn set_status(&mut self, status: &str) {
        log::info!("{status}");
    }
}

pub trait VideoBackend {
    type Err;

    /// Stream one frame to the display and present it.
    ///
    /// # Errors
    ///
    /// This method will return an error if the frame is malformed or cannot be presented.
    fn frame(&mut self, frame: PackedFrame<'_>) -> Result<(), Self::Err>;

    /// Enable or disable non-blocking presentation. Has no effect if the backend was not created
    /// with vsync enabled.
    fn set_nonblock_state(&mut self, nonblock: bool);

    fn identifier(&self) -> &'static str;
}

pub trait InputBackend {
    type Key: Copy;
    type Bindings;

    /// Drain pending platform events.
    fn poll(&mut self);

    /// Resolve the activation level of logical button `id` for the given port and device.
    fn input_state(
        &mut self,
        bindings: &Self::Bindings,
        port: Port,
        device: DeviceKind,
        index: u32,
        id: u32,
    ) -> i16;

    fn key_pressed(&self, key: Self::Key) -> bool;

    fn identifier(&self) -> &'static str;
}

/// Query interface handed to an emulation core while it runs a frame.
pub trait InputQuery {
    fn input_state(&mut self, port: Port, device: DeviceKind, index: u32, id: u32) -> i16;
}

pub trait EmulationCore {
    /// Run the core for one frame, polling inputs through `input` as needed.
    fn run_frame(&mut self, input: &mut dyn InputQuery);

    /// The most recently produced frame.
    fn frame(&self) -> PackedFrame<'_>;
}

/// Convert a strided packed frame into RGBA colors, writing `width` colors per row into rows
/// that are `out_stride` colors apart.
pub fn unpack_frame(frame: &PackedFrame<'_>, out: &mut [Color], out_stride: usize) {
    for (row, out_row) in iter::zip(frame.rows(), out.chunks_mut(out_stride)) {
        for (&pixel, color) in iter::zip(row, out_row) {
            *color = Color::from_packed_1555(pixel);
        }
    }
}
