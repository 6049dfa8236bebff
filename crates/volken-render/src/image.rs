//! CPU render targets: dense row-major pixel grids.

use volken_core::constants::MAX_TARGET_DIMENSION;
use volken_core::VolkenError;

/// Pixel dimensions of an image or render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `round(scale · self)` per axis, never below one pixel.
    pub fn scaled(&self, scale: f32) -> Extent {
        let axis = |v: u32| ((v as f32 * scale).round() as u32).max(1);
        Extent::new(axis(self.width), axis(self.height))
    }

    /// Rejects extents the target allocator cannot back.
    pub fn check_allocatable(&self) -> Result<(), VolkenError> {
        if self.is_empty() {
            return Err(VolkenError::ResourceAllocation(format!(
                "zero-sized target {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_TARGET_DIMENSION || self.height > MAX_TARGET_DIMENSION {
            return Err(VolkenError::ResourceAllocation(format!(
                "target {}x{} exceeds the {MAX_TARGET_DIMENSION} pixel limit",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// A `width × height` grid of `T`, row-major from the top-left pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    extent: Extent,
    pixels: Vec<T>,
}

/// Linear RGBA, alpha is coverage.
pub type ColorImage = Image<[f32; 4]>;

/// Single-channel depth. Linear or raw depending on the producer.
pub type DepthImage = Image<f32>;

impl<T: Copy> Image<T> {
    pub fn new(extent: Extent, fill: T) -> Self {
        Self {
            extent,
            pixels: vec![fill; extent.pixel_count()],
        }
    }

    /// Wrap existing pixels. The length must match the extent.
    pub fn from_pixels(extent: Extent, pixels: Vec<T>) -> Result<Self, VolkenError> {
        if pixels.len() != extent.pixel_count() {
            return Err(VolkenError::ResourceAllocation(format!(
                "{} pixels supplied for a {}x{} image",
                pixels.len(),
                extent.width,
                extent.height
            )));
        }
        Ok(Self { extent, pixels })
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    fn index(&self, x: u32, y: u32) -> usize {
        x as usize + y as usize * self.extent.width as usize
    }

    pub fn get(&self, x: u32, y: u32) -> T {
        self.pixels[self.index(x, y)]
    }

    /// Read with coordinates clamped to the edge.
    pub fn get_clamped(&self, x: i64, y: i64) -> T {
        let x = x.clamp(0, i64::from(self.extent.width) - 1) as u32;
        let y = y.clamp(0, i64::from(self.extent.height) - 1) as u32;
        self.get(x, y)
    }

    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let i = self.index(x, y);
        self.pixels[i] = value;
    }

    /// Blit `source` into `self`. Matching extents copy directly, others are
    /// point-sampled.
    pub fn blit_from(&mut self, source: &Image<T>) {
        if source.extent == self.extent {
            self.pixels.copy_from_slice(&source.pixels);
            return;
        }
        if source.extent.is_empty() || self.extent.is_empty() {
            return;
        }
        let sx = source.width() as f32 / self.width() as f32;
        let sy = source.height() as f32 / self.height() as f32;
        for y in 0..self.height() {
            for x in 0..self.width() {
                let src_x = (((x as f32 + 0.5) * sx) as u32).min(source.width() - 1);
                let src_y = (((y as f32 + 0.5) * sy) as u32).min(source.height() - 1);
                let v = source.get(src_x, src_y);
                self.set(x, y, v);
            }
        }
    }
}

impl<T: Copy + Default> Image<T> {
    /// Point-resampled copy at another extent.
    pub fn resampled(&self, extent: Extent) -> Self {
        let mut out = Self::new(extent, T::default());
        out.blit_from(self);
        out
    }
}

/// Texture coordinate of the centre of pixel `(x, y)`.
pub fn pixel_uv(x: u32, y: u32, extent: Extent) -> glam::Vec2 {
    glam::Vec2::new(
        (x as f32 + 0.5) / extent.width as f32,
        (y as f32 + 0.5) / extent.height as f32,
    )
}
