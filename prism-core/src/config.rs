use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TransformError};
use crate::transform::{Camera, Perspective};

/// Settings file looked up in the working directory when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "prism.json";

//
// ──────────────────────────────────────────────────────────────
//   Settings
// ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings
{
  pub window: WindowSettings,
  pub perspective: PerspectiveSettings,
  pub camera: CameraSettings,
  pub shaders: ShaderPaths,
  /// Straight (non-premultiplied) RGBA.
  pub clear_color: [f32; 4],
  pub rotate_step_degrees: f32,
  /// `env_logger` filter; `RUST_LOG` and the built-in default apply when unset.
  pub log_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings
{
  pub width: u32,
  pub height: u32,
  pub title: String,
  pub vsync: bool,
  pub msaa_samples: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerspectiveSettings
{
  pub fov_degrees: f32,
  pub near: f32,
  pub far: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraSettings
{
  pub eye: [f32; 3],
  pub target: [f32; 3],
  pub up: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShaderPaths
{
  pub vertex: PathBuf,
  pub fragment: PathBuf,
}

//
// ──────────────────────────────────────────────────────────────
//   Defaults
// ──────────────────────────────────────────────────────────────
//

impl Default for Settings
{
  fn default() -> Self
  {
    Self {
      window: WindowSettings::default(),
      perspective: PerspectiveSettings::default(),
      camera: CameraSettings::default(),
      shaders: ShaderPaths::default(),
      clear_color: [0.45, 0.55, 0.60, 0.90],
      rotate_step_degrees: 5.0,
      log_filter: None,
    }
  }
}

impl Default for WindowSettings
{
  fn default() -> Self
  {
    Self { width: 1280, height: 720, title: "Computer Graphics".to_owned(), vsync: true, msaa_samples: 4 }
  }
}

impl Default for PerspectiveSettings
{
  fn default() -> Self
  {
    Self { fov_degrees: 45.0, near: 1.0, far: 100.0 }
  }
}

impl Default for CameraSettings
{
  fn default() -> Self
  {
    let camera = Camera::default();
    Self { eye: camera.eye.to_array(), target: camera.target.to_array(), up: camera.up.to_array() }
  }
}

impl Default for ShaderPaths
{
  fn default() -> Self
  {
    Self {
      vertex: PathBuf::from("resources/shaders/vertex.wgsl"),
      fragment: PathBuf::from("resources/shaders/fragment.wgsl"),
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Loading
// ──────────────────────────────────────────────────────────────
//

impl Settings
{
  /// Reads, parses and validates a JSON settings file.
  pub fn load(path: &Path) -> Result<Self, ConfigError>
  {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

    let settings: Settings =
      serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

    settings.validate()?;
    Ok(settings)
  }

  /// Loads `path` when given, else `prism.json` if it exists, else defaults.
  pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError>
  {
    if let Some(path) = path
    {
      return Self::load(path);
    }

    let fallback = Path::new(DEFAULT_SETTINGS_FILE);
    if fallback.is_file()
    {
      return Self::load(fallback);
    }

    Ok(Self::default())
  }

  pub fn validate(&self) -> Result<(), ConfigError>
  {
    if self.window.width == 0 || self.window.height == 0
    {
      return Err(ConfigError::Invalid("window size must be non-zero".into()));
    }

    if !matches!(self.window.msaa_samples, 1 | 4)
    {
      return Err(ConfigError::Invalid(format!("msaa_samples must be 1 or 4, got {}", self.window.msaa_samples)));
    }

    if self.clear_color.iter().any(|c| !(0.0..=1.0).contains(c))
    {
      return Err(ConfigError::Invalid("clear_color components must lie in [0, 1]".into()));
    }

    if !self.rotate_step_degrees.is_finite()
    {
      return Err(ConfigError::Invalid("rotate_step_degrees must be finite".into()));
    }

    self.perspective().map_err(invalid)?;
    self.camera().validate().map_err(invalid)?;

    Ok(())
  }

  //
  // ──────────────────────────────────────────────────────────────
  //   Derived values
  // ──────────────────────────────────────────────────────────────
  //

  /// Initial projection; the aspect comes from the configured window size.
  pub fn perspective(&self) -> Result<Perspective, TransformError>
  {
    let aspect = self.window.width as f32 / self.window.height as f32;
    Perspective::from_degrees(self.perspective.fov_degrees, aspect, self.perspective.near, self.perspective.far)
  }

  pub fn camera(&self) -> Camera
  {
    Camera::new(Vec3::from(self.camera.eye), Vec3::from(self.camera.target), Vec3::from(self.camera.up))
  }

  /// Clear colour with RGB premultiplied by alpha.
  pub fn clear_color_premultiplied(&self) -> [f64; 4]
  {
    let [r, g, b, a] = self.clear_color.map(f64::from);
    [r * a, g * a, b * a, a]
  }

  pub fn rotate_step(&self) -> f32
  {
    self.rotate_step_degrees.to_radians()
  }
}

fn invalid(err: TransformError) -> ConfigError
{
  ConfigError::Invalid(err.to_string())
}
