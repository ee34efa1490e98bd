use glam::{Mat4, Vec3};

use crate::error::TransformError;

//
// ──────────────────────────────────────────────────────────────
//   Fixed look-at camera (right-handed, Y-up)
// ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera
{
  pub eye: Vec3,
  pub target: Vec3,
  pub up: Vec3,
}

impl Default for Camera
{
  fn default() -> Self
  {
    Self { eye: Vec3::new(0.0, 0.0, 3.0), target: Vec3::ZERO, up: Vec3::Y }
  }
}

impl Camera
{
  pub fn new(eye: Vec3, target: Vec3, up: Vec3) -> Self
  {
    Self { eye, target, up }
  }

  /// Rejects cameras whose view matrix would be undefined.
  pub fn validate(&self) -> Result<(), TransformError>
  {
    if !(self.eye.is_finite() && self.target.is_finite() && self.up.is_finite())
    {
      return Err(TransformError::DegenerateCamera);
    }

    let forward = (self.target - self.eye).normalize_or_zero();
    let up = self.up.normalize_or_zero();

    if forward == Vec3::ZERO || up == Vec3::ZERO || forward.cross(up).length_squared() < 1e-12
    {
      return Err(TransformError::DegenerateCamera);
    }

    Ok(())
  }

  pub fn view_matrix(&self) -> Mat4
  {
    Mat4::look_at_rh(self.eye, self.target, self.up)
  }
}

#[cfg(test)]
mod tests
{
  use super::*;

  #[test]
  fn default_camera_is_valid()
  {
    let cam = Camera::default();
    assert!(cam.validate().is_ok());
    assert!(cam.view_matrix().is_finite());
  }

  #[test]
  fn eye_on_target_is_degenerate()
  {
    let cam = Camera::new(Vec3::ONE, Vec3::ONE, Vec3::Y);
    assert_eq!(cam.validate(), Err(TransformError::DegenerateCamera));
  }

  #[test]
  fn up_along_view_direction_is_degenerate()
  {
    let cam = Camera::new(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Y);
    assert_eq!(cam.validate(), Err(TransformError::DegenerateCamera));
  }

  #[test]
  fn view_moves_eye_to_origin()
  {
    let cam = Camera::default();
    let eye_in_view = cam.view_matrix().transform_point3(cam.eye);
    assert!(eye_in_view.length() < 1e-6);
  }
}
