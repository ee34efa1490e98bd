//! prism core: shader program lifecycle and the projection-view-model
//! transform pipeline, independent of any window or GPU.
//!
//! The native crate plugs wgpu in through [`shader::ProgramBackend`] and
//! [`frame::FrameSurface`].

pub mod command;
pub mod config;
pub mod error;
pub mod frame;
pub mod logging;
pub mod shader;
pub mod transform;

pub use command::Command;
pub use config::Settings;
pub use error::{ConfigError, ShaderError, TransformError};
pub use frame::{FrameDriver, FrameStatus, FrameSurface, OverlayView};
pub use shader::{load_and_compile_program, ProgramBackend, ProgramHandle, StageKind};
pub use transform::{Camera, Perspective, TransformPipeline};
