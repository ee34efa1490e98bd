use std::path::PathBuf;

use thiserror::Error;

use crate::shader::StageKind;

//
// ──────────────────────────────────────────────────────────────
//   Shader program lifecycle
// ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
pub enum ShaderError
{
  #[error("failed to read shader source {}", path.display())]
  Io
  {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{stage} shader source is empty")]
  EmptySource { stage: StageKind },

  #[error("failed to compile {stage} shader:\n{log}")]
  Compile { stage: StageKind, log: String },

  #[error("failed to link shader program:\n{log}")]
  Link { log: String },
}

impl ShaderError
{
  /// Stage that failed, when the failure belongs to a single stage.
  pub fn stage(&self) -> Option<StageKind>
  {
    match self
    {
      ShaderError::EmptySource { stage } | ShaderError::Compile { stage, .. } => Some(*stage),
      _ => None,
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Transform pipeline
// ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError
{
  #[error("field of view must lie in (0, pi) radians, got {0}")]
  InvalidFov(f32),

  #[error("aspect ratio must be positive and finite, got {0}")]
  InvalidAspect(f32),

  #[error("clip planes must satisfy 0 < near < far, got near={near} far={far}")]
  InvalidPlanes { near: f32, far: f32 },

  #[error("rotation axis must be non-zero and finite")]
  DegenerateAxis,

  #[error("camera eye, target and up do not define a view")]
  DegenerateCamera,

  #[error("program has no uniform named `{0}`")]
  MissingUniform(String),
}

//
// ──────────────────────────────────────────────────────────────
//   Settings
// ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
pub enum ConfigError
{
  #[error("failed to read settings file {}", path.display())]
  Io
  {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse settings file {}", path.display())]
  Parse
  {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid settings: {0}")]
  Invalid(String),
}
