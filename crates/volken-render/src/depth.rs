//! Depth capture for the near and far camera passes.
//!
//! The host renders the scene with two cameras splitting the depth range.
//! Each pass hands over its raw (non-linear, 0 = near plane, 1 = cleared)
//! depth; this stage converts both to eye distance and keeps them in
//! buffers sized to the far camera. Consumers learn about a new set of
//! buffers through [`DepthReady`], which is issued once per allocation.

use volken_core::constants::EMPTY_DEPTH;
use volken_core::VolkenError;

use crate::image::{DepthImage, Extent};

/// Eye distance for a raw depth sample. Raw depth at or beyond the far
/// plane means no geometry.
pub fn linearize_depth(raw: f32, near_clip: f32, far_clip: f32) -> f32 {
    if !raw.is_finite() || raw >= 1.0 {
        return EMPTY_DEPTH;
    }
    let raw = raw.max(0.0);
    near_clip * far_clip / (far_clip - raw * (far_clip - near_clip))
}

/// One camera's depth output for this frame.
#[derive(Debug, Clone, Copy)]
pub struct CameraDepth<'a> {
    pub raw: &'a DepthImage,
    pub near_clip: f32,
    pub far_clip: f32,
}

/// Identifies one allocation of the capture buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthHandle {
    generation: u64,
}

/// Notification that a new set of depth buffers exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthReady {
    pub handle: DepthHandle,
}

/// Linear depth for both cameras, at the far camera's extent.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBuffers {
    pub far: DepthImage,
    pub near: DepthImage,
    /// Far clip of the far camera at the last capture.
    pub far_clip: f32,
}

impl DepthBuffers {
    pub fn extent(&self) -> Extent {
        self.far.extent()
    }
}

#[derive(Debug, Default)]
pub struct DepthCapture {
    buffers: Option<DepthBuffers>,
    generation: u64,
}

impl DepthCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Linearize this frame's depth. Returns `Some` only when the buffers
    /// were (re)allocated, which happens on first use, after [`release`],
    /// and whenever the far camera's extent changes.
    ///
    /// [`release`]: DepthCapture::release
    pub fn capture(&mut self, far: &CameraDepth<'_>, near: &CameraDepth<'_>) -> Option<DepthReady> {
        let extent = far.raw.extent();
        let reallocated = match &self.buffers {
            Some(b) => b.extent() != extent,
            None => true,
        };

        if reallocated {
            self.generation += 1;
            log::info!(
                "Depth capture buffers allocated at {}x{} (generation {})",
                extent.width,
                extent.height,
                self.generation
            );
            self.buffers = Some(DepthBuffers {
                far: DepthImage::new(extent, EMPTY_DEPTH),
                near: DepthImage::new(extent, EMPTY_DEPTH),
                far_clip: far.far_clip,
            });
        }

        let buffers = self.buffers.as_mut()?;
        buffers.far_clip = far.far_clip;
        linearize_into(&mut buffers.far, far.raw, far.near_clip, far.far_clip);

        if near.raw.extent() == extent {
            linearize_into(&mut buffers.near, near.raw, near.near_clip, near.far_clip);
        } else {
            log::debug!(
                "near depth {}x{} resampled to far extent {}x{}",
                near.raw.width(),
                near.raw.height(),
                extent.width,
                extent.height
            );
            let resampled = near.raw.resampled(extent);
            linearize_into(&mut buffers.near, &resampled, near.near_clip, near.far_clip);
        }

        reallocated.then_some(DepthReady {
            handle: DepthHandle {
                generation: self.generation,
            },
        })
    }

    /// Handle of the live buffers, if any.
    pub fn current_handle(&self) -> Option<DepthHandle> {
        self.buffers.as_ref().map(|_| DepthHandle {
            generation: self.generation,
        })
    }

    /// Buffers behind `handle`. Handles from an earlier allocation resolve
    /// to `None`.
    pub fn resolve(&self, handle: DepthHandle) -> Option<&DepthBuffers> {
        if handle.generation != self.generation {
            return None;
        }
        self.buffers.as_ref()
    }

    /// Write the combined scene depth: far first, then near wherever the
    /// near camera saw geometry.
    pub fn combine_into(&self, dst: &mut DepthImage) -> Result<(), VolkenError> {
        let buffers = self
            .buffers
            .as_ref()
            .ok_or_else(|| VolkenError::MissingDependency("depth capture buffers".into()))?;
        combine(buffers, dst);
        Ok(())
    }

    /// Drop the buffers. The next capture allocates and notifies again.
    pub fn release(&mut self) {
        if self.buffers.take().is_some() {
            log::info!("Depth capture buffers released");
        }
    }
}

fn linearize_into(dst: &mut DepthImage, raw: &DepthImage, near_clip: f32, far_clip: f32) {
    for (d, &r) in dst.pixels_mut().iter_mut().zip(raw.pixels()) {
        *d = linearize_depth(r, near_clip, far_clip);
    }
}

pub(crate) fn combine(buffers: &DepthBuffers, dst: &mut DepthImage) {
    if dst.extent() == buffers.extent() {
        for ((d, &f), &n) in dst
            .pixels_mut()
            .iter_mut()
            .zip(buffers.far.pixels())
            .zip(buffers.near.pixels())
        {
            *d = if n.is_finite() { n } else { f };
        }
        return;
    }

    dst.blit_from(&buffers.far);
    let near = buffers.near.resampled(dst.extent());
    for (d, &n) in dst.pixels_mut().iter_mut().zip(near.pixels()) {
        if n.is_finite() {
            *d = n;
        }
    }
}
