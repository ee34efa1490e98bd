//! Shader program lifecycle: WGSL source → validated stage → linked program.
//!
//! Compilation runs on the CPU through naga, so every failure is reported
//! with the stage that caused it before the graphics API is involved.
//! Program creation and uniform upload go through [`ProgramBackend`].

mod loader;
mod program;
mod stage;

pub use loader::{load_and_compile_program, read_source};
pub use program::{link_program, ProgramBackend, ProgramHandle, UniformInfo, UniformLocation};
pub use stage::{compile_stage, ShaderStage, StageKind};
