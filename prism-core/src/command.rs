use glam::Vec3;

/// Discrete requests fed to the frame driver by keyboard input and the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command
{
  /// Rotate the model about `axis` by `angle` radians.
  RotateModel { axis: Vec3, angle: f32 },
  ResetModel,
  SetPerspective { fov_y: f32, aspect: f32, near: f32, far: f32 },
  /// Field of view and clip planes only; the aspect stays whatever the
  /// viewport last set it to when this is applied.
  SetProjection { fov_y: f32, near: f32, far: f32 },
  ReloadShaders,
  Exit,
}
