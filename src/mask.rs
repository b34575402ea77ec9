use std::{
    sync::OnceLock,
    time::Instant,
};

use crate::raster::{Raster, Rgba8, over, tint};

/// Frames per atlas row; frames are laid out row-major.
pub const FRAMES_PER_ROW: i32 = 10;

/// Grid of an atlas holding `frames_count` frames: `(columns, rows)`.
pub(crate) fn atlas_grid(frames_count: i32) -> (i32, i32) {
    (
        frames_count.min(FRAMES_PER_ROW),
        (frames_count + FRAMES_PER_ROW - 1) / FRAMES_PER_ROW,
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One animation frame: the shared atlas plus the frame's source rect.
#[derive(Clone, Copy, Debug)]
pub struct MaskFrame<'a> {
    pub image: &'a Raster,
    pub source: FrameRect,
}

/// A finished, immutable noise mask: one atlas image plus its animation
/// metadata. Transformations produce new masks.
#[derive(Clone, Debug)]
pub struct CachedMask {
    image: Raster,
    frame_duration: i64,
    frames_count: i32,
    canvas_size: i32,
}

impl CachedMask {
    pub fn new(image: Raster, frames_count: i32, frame_duration: i64, canvas_size: i32) -> Self {
        assert!(frame_duration > 0, "frame_duration must be positive");
        assert!(frames_count > 0, "frames_count must be positive");
        assert!(canvas_size > 0, "canvas_size must be positive");
        let (columns, rows) = atlas_grid(frames_count);
        assert!(
            image.width() == columns * canvas_size && image.height() == rows * canvas_size,
            "atlas dimensions must match the frame grid"
        );
        Self {
            image,
            frame_duration,
            frames_count,
            canvas_size,
        }
    }

    pub fn image(&self) -> &Raster {
        &self.image
    }

    pub fn frames_count(&self) -> i32 {
        self.frames_count
    }

    pub fn frame_duration(&self) -> i64 {
        self.frame_duration
    }

    pub fn canvas_size(&self) -> i32 {
        self.canvas_size
    }

    /// Frame at `index`, wrapped modulo the frame count.
    pub fn frame(&self, index: i32) -> MaskFrame<'_> {
        let index = index.rem_euclid(self.frames_count);
        let row = index / FRAMES_PER_ROW;
        let column = index - row * FRAMES_PER_ROW;
        MaskFrame {
            image: &self.image,
            source: FrameRect {
                x: column * self.canvas_size,
                y: row * self.canvas_size,
                width: self.canvas_size,
                height: self.canvas_size,
            },
        }
    }

    /// Frame for the current time of the process-wide animation clock, so
    /// every consumer holding the same mask stays frame-accurate without
    /// per-consumer animation state.
    pub fn frame_now(&self) -> MaskFrame<'_> {
        self.frame(((now_ms() / self.frame_duration) % i64::from(self.frames_count)) as i32)
    }

    /// New mask with the atlas tinted by `color` (alpha from the mask, color
    /// from the argument). Metadata is preserved.
    pub fn colorized(&self, color: Rgba8) -> CachedMask {
        let mut image = self.image.clone();
        for px in image.pixels_mut() {
            let tinted = tint([px[0], px[1], px[2], px[3]], color);
            px.copy_from_slice(&tinted);
        }
        CachedMask::new(image, self.frames_count, self.frame_duration, self.canvas_size)
    }

    /// New mask compositing the atlas over a uniform translucent black
    /// layer. Metadata is preserved.
    pub fn darkened(&self, alpha: u8) -> CachedMask {
        let mut image = Raster::new(self.image.width(), self.image.height());
        image.fill([0, 0, 0, alpha]);
        for (dst, src) in image.pixels_mut().zip(self.image.pixels()) {
            let out = over([dst[0], dst[1], dst[2], dst[3]], src, 1.0);
            dst.copy_from_slice(&out);
        }
        CachedMask::new(image, self.frames_count, self.frame_duration, self.canvas_size)
    }
}

/// Milliseconds on a monotonic clock shared by the whole process.
fn now_ms() -> i64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as i64
}
