use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use prism_core::shader::{ShaderStage, UniformInfo, UniformLocation};
use prism_core::transform::PvmUniform;
use prism_core::{
  load_and_compile_program, Camera, Perspective, ProgramBackend, Settings, ShaderError, StageKind, TransformPipeline,
};

//
// ──────────────────────────────────────────────────────────────
//   Helpers
// ──────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct Uploads
{
  programs: u32,
  matrices: Vec<Mat4>,
}

impl ProgramBackend for Uploads
{
  type Program = u32;

  fn create_program(&mut self, _: &ShaderStage, _: &ShaderStage, _: &[UniformInfo]) -> Result<u32, String>
  {
    self.programs += 1;
    Ok(self.programs)
  }

  fn write_uniform(&mut self, _: &u32, _: UniformLocation, bytes: &[u8])
  {
    let uniform: PvmUniform = bytemuck::pod_read_unaligned(bytes);
    self.matrices.push(Mat4::from_cols_array_2d(&uniform.pvm));
  }
}

fn shader_dir() -> PathBuf
{
  Path::new(env!("CARGO_MANIFEST_DIR")).join("../resources/shaders")
}

fn scratch(name: &str, contents: &str) -> PathBuf
{
  let dir = std::env::temp_dir().join(format!("prism-it-{}", std::process::id()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join(name);
  std::fs::write(&path, contents).unwrap();
  path
}

//
// ──────────────────────────────────────────────────────────────
//   Scenarios
// ──────────────────────────────────────────────────────────────
//

#[test]
fn bundled_shaders_link_into_a_program_with_pvm()
{
  let mut backend = Uploads::default();

  let program =
    load_and_compile_program(&mut backend, &shader_dir().join("vertex.wgsl"), &shader_dir().join("fragment.wgsl"))
      .unwrap();

  assert_eq!(*program.raw(), 1);
  assert!(program.uniform_location("u_pvm").is_some());
}

#[test]
fn fragment_syntax_error_is_reported_against_the_fragment_stage()
{
  let fragment = scratch("broken.frag.wgsl", "@fragment\nfn fs_main() -> @location(0) vec4<f32> {\n  return vec4<f32>(1.0\n}\n");
  let mut backend = Uploads::default();

  let err = load_and_compile_program(&mut backend, &shader_dir().join("vertex.wgsl"), &fragment).unwrap_err();

  match &err
  {
    ShaderError::Compile { stage, log } =>
    {
      assert_eq!(*stage, StageKind::Fragment);
      assert!(!log.is_empty());
    }
    other => panic!("unexpected error: {other:?}"),
  }
  assert!(err.to_string().starts_with("failed to compile fragment shader"));
  assert_eq!(backend.programs, 0);
}

#[test]
fn default_settings_drive_a_finite_pvm()
{
  let settings = Settings::default();
  let mut backend = Uploads::default();
  let program = load_and_compile_program(
    &mut backend,
    &Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join(&settings.shaders.vertex),
    &Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join(&settings.shaders.fragment),
  )
  .unwrap();

  let mut pipeline = TransformPipeline::new(settings.perspective().unwrap(), settings.camera()).unwrap();
  pipeline.rotate_model(Vec3::Y, settings.rotate_step()).unwrap();

  assert!(pipeline.recompute_and_bind(&mut backend, &program).unwrap());
  assert_eq!(backend.matrices.len(), 1);
  assert!(backend.matrices[0].is_finite());
}

#[test]
fn projected_cube_corner_lands_inside_clip_volume()
{
  let perspective = Perspective::from_degrees(45.0, 16.0 / 9.0, 1.0, 100.0).unwrap();
  let pipeline = TransformPipeline::new(perspective, Camera::default()).unwrap();

  let clip = pipeline.compute_pvm() * Vec3::new(0.5, 0.5, 0.5).extend(1.0);
  let ndc = clip.truncate() / clip.w;

  assert!(clip.w > 0.0);
  assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
  assert!((0.0..=1.0).contains(&ndc.z));
}
