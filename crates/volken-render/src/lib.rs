//! Volumetric cloud rendering: depth capture, raymarch, temporal
//! accumulation, upscaling and compositing over the host's frame.

mod composite;
mod raymarch;
mod resample;

pub mod camera;
pub mod depth;
pub mod gpu;
pub mod image;
pub mod pipeline;
pub mod targets;
pub mod uniforms;

pub use camera::CameraView;
pub use depth::{linearize_depth, CameraDepth, DepthCapture, DepthHandle, DepthReady};
pub use gpu::UniformBlock;
pub use image::{ColorImage, DepthImage, Extent, Image};
pub use pipeline::{
    CloudRenderPipeline, FrameInput, FrameOutcome, PassThroughReason, PipelineState,
    TemporalState,
};
pub use targets::{RenderTargetSet, TargetRequest};
pub use uniforms::{CloudUniforms, FrameParameters};
