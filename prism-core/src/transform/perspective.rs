use std::f32::consts::PI;

use glam::Mat4;

use crate::error::TransformError;

/// Perspective projection parameters.
///
/// Always valid: `0 < fov_y < pi`, `aspect > 0`, `0 < near < far`, all finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perspective
{
  fov_y: f32,
  aspect: f32,
  near: f32,
  far: f32,
}

impl Perspective
{
  /// `fov_y` is the vertical field of view in radians.
  pub fn new(fov_y: f32, aspect: f32, near: f32, far: f32) -> Result<Self, TransformError>
  {
    validate_fov(fov_y)?;
    validate_aspect(aspect)?;
    validate_planes(near, far)?;

    Ok(Self { fov_y, aspect, near, far })
  }

  pub fn from_degrees(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Result<Self, TransformError>
  {
    Self::new(fov_degrees.to_radians(), aspect, near, far)
  }

  pub fn fov_y(&self) -> f32
  {
    self.fov_y
  }

  pub fn aspect(&self) -> f32
  {
    self.aspect
  }

  pub fn near(&self) -> f32
  {
    self.near
  }

  pub fn far(&self) -> f32
  {
    self.far
  }

  pub fn with_aspect(self, aspect: f32) -> Result<Self, TransformError>
  {
    validate_aspect(aspect)?;
    Ok(Self { aspect, ..self })
  }

  /// Right-handed projection into wgpu clip space (depth 0..1).
  pub fn matrix(&self) -> Mat4
  {
    Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Validation
// ──────────────────────────────────────────────────────────────
//

fn validate_fov(fov_y: f32) -> Result<(), TransformError>
{
  if fov_y > 0.0 && fov_y < PI
  {
    return Ok(());
  }

  Err(TransformError::InvalidFov(fov_y))
}

fn validate_aspect(aspect: f32) -> Result<(), TransformError>
{
  if aspect > 0.0 && aspect.is_finite()
  {
    return Ok(());
  }

  Err(TransformError::InvalidAspect(aspect))
}

fn validate_planes(near: f32, far: f32) -> Result<(), TransformError>
{
  if near > 0.0 && near < far && far.is_finite()
  {
    return Ok(());
  }

  Err(TransformError::InvalidPlanes { near, far })
}
