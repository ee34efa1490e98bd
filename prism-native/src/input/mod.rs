use glam::Vec3;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use prism_core::Command;

/// Fixed keyboard bindings. Keys are matched by physical position so the
/// WASD cluster works on any layout.
#[derive(Debug, Clone, Copy)]
pub struct KeyBindings
{
  /// Radians per rotate key press.
  rotate_step: f32,
}

impl KeyBindings
{
  pub fn new(rotate_step: f32) -> Self
  {
    Self { rotate_step }
  }

  pub fn command_for_event(&self, event: &KeyEvent) -> Option<Command>
  {
    match event.physical_key
    {
      PhysicalKey::Code(code) => self.command_for_key(code, event.state),
      PhysicalKey::Unidentified(_) => None,
    }
  }

  /// Presses (including auto-repeat) map to commands; releases never do.
  pub fn command_for_key(&self, code: KeyCode, state: ElementState) -> Option<Command>
  {
    if state != ElementState::Pressed
    {
      return None;
    }

    let step = self.rotate_step;

    let command = match code
    {
      KeyCode::Escape => Command::Exit,
      KeyCode::KeyA => Command::RotateModel { axis: Vec3::Y, angle: step },
      KeyCode::KeyD => Command::RotateModel { axis: Vec3::Y, angle: -step },
      KeyCode::KeyW => Command::RotateModel { axis: Vec3::X, angle: -step },
      KeyCode::KeyS => Command::RotateModel { axis: Vec3::X, angle: step },
      KeyCode::KeyR => Command::ReloadShaders,
      KeyCode::Home => Command::ResetModel,
      _ => return None,
    };

    Some(command)
  }
}

#[cfg(test)]
mod tests
{
  use super::*;

  fn bindings() -> KeyBindings
  {
    KeyBindings::new(5.0_f32.to_radians())
  }

  #[test]
  fn escape_exits()
  {
    assert_eq!(bindings().command_for_key(KeyCode::Escape, ElementState::Pressed), Some(Command::Exit));
  }

  #[test]
  fn a_and_d_rotate_about_y_in_opposite_directions()
  {
    let step = 5.0_f32.to_radians();

    assert_eq!(
      bindings().command_for_key(KeyCode::KeyA, ElementState::Pressed),
      Some(Command::RotateModel { axis: Vec3::Y, angle: step })
    );
    assert_eq!(
      bindings().command_for_key(KeyCode::KeyD, ElementState::Pressed),
      Some(Command::RotateModel { axis: Vec3::Y, angle: -step })
    );
  }

  #[test]
  fn w_and_s_rotate_about_x()
  {
    let Some(Command::RotateModel { axis, angle }) = bindings().command_for_key(KeyCode::KeyW, ElementState::Pressed)
    else
    {
      panic!("expected a rotation");
    };

    assert_eq!(axis, Vec3::X);
    assert!(angle < 0.0);
    assert!(matches!(
      bindings().command_for_key(KeyCode::KeyS, ElementState::Pressed),
      Some(Command::RotateModel { angle, .. }) if angle > 0.0
    ));
  }

  #[test]
  fn reload_and_reset()
  {
    assert_eq!(bindings().command_for_key(KeyCode::KeyR, ElementState::Pressed), Some(Command::ReloadShaders));
    assert_eq!(bindings().command_for_key(KeyCode::Home, ElementState::Pressed), Some(Command::ResetModel));
  }

  #[test]
  fn releases_and_unbound_keys_are_ignored()
  {
    assert_eq!(bindings().command_for_key(KeyCode::Escape, ElementState::Released), None);
    assert_eq!(bindings().command_for_key(KeyCode::KeyQ, ElementState::Pressed), None);
  }
}
