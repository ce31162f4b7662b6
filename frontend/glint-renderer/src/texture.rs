use glint_common::frontend::FrameSize;

/// Texture coordinates for the four corners of the output quad, in the order top-left,
/// top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexCoordQuad(pub [[f32; 2]; 4]);

impl TexCoordQuad {
    pub const TOP_LEFT: usize = 0;
    pub const TOP_RIGHT: usize = 1;
    pub const BOTTOM_RIGHT: usize = 2;
    pub const BOTTOM_LEFT: usize = 3;

    /// Quad that samples only the `frame` region in the top-left corner of a `texture`-sized
    /// texture.
    #[must_use]
    pub fn for_frame(frame: FrameSize, texture: FrameSize) -> Self {
        let u = frame.width as f32 / texture.width as f32;
        let v = frame.height as f32 / texture.height as f32;
        Self([[0.0, 0.0], [u, 0.0], [u, v], [0.0, v]])
    }

    #[must_use]
    pub fn full() -> Self {
        Self([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]])
    }

    #[must_use]
    pub fn corner(&self, index: usize) -> [f32; 2] {
        self.0[index]
    }
}

/// What must happen to the texture before a frame of a given size is uploaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameUpload {
    /// Same size as the previous frame; upload directly.
    Unchanged,
    /// New frame size; the whole texture must be cleared and the quad replaced before upload.
    Resized(TexCoordQuad),
}

/// Tracks the size of the most recently uploaded frame relative to the fixed-size frame texture.
///
/// Starts out as if a full-texture frame had been uploaded so that the first real frame of a
/// smaller size triggers a clear.
#[derive(Debug, Clone)]
pub struct FrameTexture {
    texture_size: FrameSize,
    last_frame_size: FrameSize,
    tex_coords: TexCoordQuad,
    generation: u64,
}

impl FrameTexture {
    #[must_use]
    pub fn new(texture_size: FrameSize) -> Self {
        Self {
            texture_size,
            last_frame_size: texture_size,
            tex_coords: TexCoordQuad::full(),
            generation: 0,
        }
    }

    #[must_use]
    pub fn texture_size(&self) -> FrameSize {
        self.texture_size
    }

    #[must_use]
    pub fn last_frame_size(&self) -> FrameSize {
        self.last_frame_size
    }

    #[must_use]
    pub fn tex_coords(&self) -> TexCoordQuad {
        self.tex_coords
    }

    /// Incremented every time the frame size changes.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn fits(&self, frame_size: FrameSize) -> bool {
        frame_size.width <= self.texture_size.width && frame_size.height <= self.texture_size.height
    }

    pub fn prepare(&mut self, frame_size: FrameSize) -> FrameUpload {
        if frame_size == self.last_frame_size {
            return FrameUpload::Unchanged;
        }

        log::debug!(
            "Frame size changed from {}x{} to {}x{}",
            self.last_frame_size.width,
            self.last_frame_size.height,
            frame_size.width,
            frame_size.height
        );

        self.last_frame_size = frame_size;
        self.tex_coords = TexCoordQuad::for_frame(frame_size, self.texture_size);
        self.generation += 1;

        FrameUpload::Resized(self.tex_coords)
    }
}
