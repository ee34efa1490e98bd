//! Projection-view-model transform pipeline.

mod camera;
mod perspective;
mod pipeline;
mod uniform;

pub use camera::Camera;
pub use perspective::Perspective;
pub use pipeline::TransformPipeline;
pub use uniform::{PvmUniform, PVM_UNIFORM};
