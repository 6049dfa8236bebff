//! The render target set of the cloud pipeline.

use volken_core::constants::EMPTY_DEPTH;
use volken_core::VolkenError;

use crate::image::{ColorImage, DepthImage, Extent};

/// What a target set was (or would be) built for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRequest {
    pub output: Extent,
    pub scale: f32,
}

impl TargetRequest {
    pub fn cloud_extent(&self) -> Extent {
        self.output.scaled(self.scale)
    }
}

/// Every intermediate image of one pipeline configuration. All targets are
/// derived from a single [`TargetRequest`] and are replaced together.
#[derive(Debug, Clone)]
pub struct RenderTargetSet {
    request: TargetRequest,
    cloud_extent: Extent,
    /// Raymarch output at cloud resolution.
    pub cloud_color: ColorImage,
    /// Cloud color upscaled to the output resolution.
    pub upscaled: ColorImage,
    pub history_color: ColorImage,
    pub history_depth: DepthImage,
    /// Near/far combined linear depth at the output resolution.
    pub combined_depth: DepthImage,
    /// Combined depth reduced to cloud resolution.
    pub low_res_depth: DepthImage,
}

impl RenderTargetSet {
    pub fn allocate(request: TargetRequest) -> Result<Self, VolkenError> {
        if !request.scale.is_finite() || request.scale <= 0.0 {
            return Err(VolkenError::InvalidParameter {
                name: "resolution_scale",
                value: request.scale,
            });
        }
        request.output.check_allocatable()?;
        let cloud = request.cloud_extent();
        cloud.check_allocatable()?;

        log::info!(
            "Cloud render targets: output {}x{}, clouds {}x{} (scale {:.2})",
            request.output.width,
            request.output.height,
            cloud.width,
            cloud.height,
            request.scale
        );

        Ok(Self {
            request,
            cloud_extent: cloud,
            cloud_color: ColorImage::new(cloud, [0.0; 4]),
            upscaled: ColorImage::new(request.output, [0.0; 4]),
            history_color: ColorImage::new(cloud, [0.0; 4]),
            history_depth: DepthImage::new(cloud, EMPTY_DEPTH),
            combined_depth: DepthImage::new(request.output, EMPTY_DEPTH),
            low_res_depth: DepthImage::new(cloud, EMPTY_DEPTH),
        })
    }

    pub fn request(&self) -> TargetRequest {
        self.request
    }

    pub fn output_extent(&self) -> Extent {
        self.request.output
    }

    pub fn cloud_extent(&self) -> Extent {
        self.cloud_extent
    }

    pub fn matches(&self, request: &TargetRequest) -> bool {
        self.request == *request
    }

    /// Clouds are rendered at the output resolution; upscaling is a copy.
    pub fn is_native_res(&self) -> bool {
        self.cloud_extent == self.request.output
    }
}
