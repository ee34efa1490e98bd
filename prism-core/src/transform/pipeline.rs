use glam::{Mat4, Vec3};

use crate::error::TransformError;
use crate::shader::{ProgramBackend, ProgramHandle};

use super::camera::Camera;
use super::perspective::Perspective;
use super::uniform::{PvmUniform, PVM_UNIFORM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PvmState
{
  /// The bound PVM reflects the current inputs.
  Clean,
  /// An input changed since the last bind.
  Dirty,
}

/// Owns the projection, view and model inputs and the PVM derived from them.
///
/// Every mutation marks the pipeline dirty; only `recompute_and_bind` makes
/// it clean again. It starts dirty so the first frame always binds.
#[derive(Debug, Clone)]
pub struct TransformPipeline
{
  perspective: Perspective,
  camera: Camera,
  model: Mat4,
  pvm: Mat4,
  state: PvmState,
}

impl TransformPipeline
{
  pub fn new(perspective: Perspective, camera: Camera) -> Result<Self, TransformError>
  {
    camera.validate()?;

    Ok(Self { perspective, camera, model: Mat4::IDENTITY, pvm: Mat4::IDENTITY, state: PvmState::Dirty })
  }

  pub fn perspective(&self) -> &Perspective
  {
    &self.perspective
  }

  pub fn camera(&self) -> &Camera
  {
    &self.camera
  }

  pub fn model(&self) -> Mat4
  {
    self.model
  }

  /// The matrix most recently written to a program.
  pub fn pvm(&self) -> Mat4
  {
    self.pvm
  }

  pub fn is_dirty(&self) -> bool
  {
    self.state == PvmState::Dirty
  }

  /// Forces the next `recompute_and_bind` to upload, e.g. after the
  /// program it was bound to has been replaced.
  pub fn invalidate(&mut self)
  {
    self.state = PvmState::Dirty;
  }

  //
  // ──────────────────────────────────────────────────────────────
  //   Mutations
  // ──────────────────────────────────────────────────────────────
  //

  /// Replaces the projection. Invalid values are rejected and the previous
  /// projection is kept.
  pub fn set_perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) -> Result<(), TransformError>
  {
    self.perspective = Perspective::new(fov_y, aspect, near, far)?;
    self.state = PvmState::Dirty;
    Ok(())
  }

  /// Derives the aspect ratio from a drawable size in pixels.
  ///
  /// Returns `false` without touching anything when either side is zero.
  pub fn set_aspect_from_viewport(&mut self, width: u32, height: u32) -> bool
  {
    if width == 0 || height == 0
    {
      return false;
    }

    match self.perspective.with_aspect(width as f32 / height as f32)
    {
      Ok(perspective) =>
      {
        self.perspective = perspective;
        self.state = PvmState::Dirty;
        true
      }
      Err(_) => false,
    }
  }

  pub fn set_camera(&mut self, camera: Camera) -> Result<(), TransformError>
  {
    camera.validate()?;
    self.camera = camera;
    self.state = PvmState::Dirty;
    Ok(())
  }

  /// Rotates the model about `axis` by `angle` radians, applied in model
  /// space after any earlier rotations. Calls accumulate.
  pub fn rotate_model(&mut self, axis: Vec3, angle: f32) -> Result<(), TransformError>
  {
    if !angle.is_finite()
    {
      return Err(TransformError::DegenerateAxis);
    }

    let axis = axis.try_normalize().ok_or(TransformError::DegenerateAxis)?;

    self.model *= Mat4::from_axis_angle(axis, angle);
    self.state = PvmState::Dirty;
    Ok(())
  }

  pub fn reset_model(&mut self)
  {
    self.model = Mat4::IDENTITY;
    self.state = PvmState::Dirty;
  }

  //
  // ──────────────────────────────────────────────────────────────
  //   Recompute
  // ──────────────────────────────────────────────────────────────
  //

  /// Projection × View × Model: the model transform applies first.
  pub fn compute_pvm(&self) -> Mat4
  {
    self.perspective.matrix() * self.camera.view_matrix() * self.model
  }

  /// Recomputes the PVM and writes it to the program's `u_pvm` uniform.
  ///
  /// Returns `Ok(false)` without uploading when nothing changed since the
  /// last bind. On error the pipeline stays dirty.
  pub fn recompute_and_bind<B: ProgramBackend>(
    &mut self,
    backend: &mut B,
    program: &ProgramHandle<B::Program>,
  ) -> Result<bool, TransformError>
  {
    if self.state == PvmState::Clean
    {
      return Ok(false);
    }

    let location =
      program.uniform_location(PVM_UNIFORM).ok_or_else(|| TransformError::MissingUniform(PVM_UNIFORM.to_owned()))?;

    let pvm = self.compute_pvm();
    let uniform = PvmUniform::from_matrix(&pvm);
    backend.write_uniform(program.raw(), location, bytemuck::bytes_of(&uniform));

    self.pvm = pvm;
    self.state = PvmState::Clean;

    log::debug!("bound PVM to {} (aspect {:.3})", location, self.perspective.aspect());
    Ok(true)
  }
}

#[cfg(test)]
mod tests
{
  use std::f32::consts::FRAC_PI_4;

  use nalgebra::{Matrix4, Point3, Vector3};

  use super::*;
  use crate::shader::testing::{RecordingBackend, FRAGMENT_WGSL, VERTEX_WGSL};
  use crate::shader::{compile_stage, link_program, StageKind};

  fn program(backend: &mut RecordingBackend) -> ProgramHandle<u32>
  {
    let vertex = compile_stage(VERTEX_WGSL, StageKind::Vertex).unwrap();
    let fragment = compile_stage(FRAGMENT_WGSL, StageKind::Fragment).unwrap();
    link_program(backend, vertex, fragment).unwrap()
  }

  fn pipeline() -> TransformPipeline
  {
    let perspective = Perspective::from_degrees(45.0, 16.0 / 9.0, 1.0, 100.0).unwrap();
    TransformPipeline::new(perspective, Camera::default()).unwrap()
  }

  fn uploaded_matrix(bytes: &[u8]) -> Mat4
  {
    let uniform: PvmUniform = bytemuck::pod_read_unaligned(bytes);
    Mat4::from_cols_array_2d(&uniform.pvm)
  }

  #[test]
  fn starts_dirty_and_first_bind_uploads()
  {
    let mut backend = RecordingBackend::default();
    let program = program(&mut backend);
    let mut pipeline = pipeline();

    assert!(pipeline.is_dirty());
    assert_eq!(pipeline.recompute_and_bind(&mut backend, &program), Ok(true));
    assert!(!pipeline.is_dirty());
    assert_eq!(backend.uploads.len(), 1);
    assert_eq!(uploaded_matrix(&backend.uploads[0].2), pipeline.compute_pvm());
  }

  #[test]
  fn second_bind_without_mutation_is_a_no_op()
  {
    let mut backend = RecordingBackend::default();
    let program = program(&mut backend);
    let mut pipeline = pipeline();

    pipeline.recompute_and_bind(&mut backend, &program).unwrap();
    let first = pipeline.pvm();

    assert_eq!(pipeline.recompute_and_bind(&mut backend, &program), Ok(false));
    assert_eq!(backend.uploads.len(), 1);
    assert_eq!(pipeline.pvm().to_cols_array(), first.to_cols_array());
  }

  #[test]
  fn every_mutation_marks_dirty()
  {
    let mut backend = RecordingBackend::default();
    let program = program(&mut backend);
    let mut pipeline = pipeline();

    let mutations: [fn(&mut TransformPipeline); 5] = [
      |p| p.set_perspective(1.0, 1.0, 0.5, 50.0).unwrap(),
      |p| assert!(p.set_aspect_from_viewport(800, 600)),
      |p| p.set_camera(Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y)).unwrap(),
      |p| p.rotate_model(Vec3::X, 0.1).unwrap(),
      |p| p.reset_model(),
    ];

    for mutate in mutations
    {
      pipeline.recompute_and_bind(&mut backend, &program).unwrap();
      assert!(!pipeline.is_dirty());

      mutate(&mut pipeline);
      assert!(pipeline.is_dirty());
    }
  }

  #[test]
  fn rejected_perspective_keeps_prior_values()
  {
    let mut pipeline = pipeline();
    let before = *pipeline.perspective();

    for (near, far) in [(10.0_f32, 10.0_f32), (100.0, 1.0), (0.0, 1.0), (-3.0, -1.0)]
    {
      let err = pipeline.set_perspective(1.0, 1.5, near, far).unwrap_err();
      assert!(matches!(err, TransformError::InvalidPlanes { .. }));
      assert_eq!(*pipeline.perspective(), before);
    }
  }

  #[test]
  fn zero_viewport_is_ignored()
  {
    let mut pipeline = pipeline();
    let aspect = pipeline.perspective().aspect();

    for (w, h) in [(0, 0), (0, 720), (1280, 0)]
    {
      assert!(!pipeline.set_aspect_from_viewport(w, h));
      assert_eq!(pipeline.perspective().aspect(), aspect);
    }
  }

  #[test]
  fn resize_skips_minimised_window()
  {
    let mut pipeline = pipeline();

    assert!(pipeline.set_aspect_from_viewport(1280, 720));
    assert!(!pipeline.set_aspect_from_viewport(0, 0));
    assert!(pipeline.set_aspect_from_viewport(800, 600));

    assert!((pipeline.perspective().aspect() - 800.0 / 600.0).abs() < 1e-6);
  }

  #[test]
  fn rotations_about_one_axis_compose()
  {
    let mut stepped = pipeline();
    stepped.rotate_model(Vec3::Y, 0.3).unwrap();
    stepped.rotate_model(Vec3::Y, 0.9).unwrap();

    let mut single = pipeline();
    single.rotate_model(Vec3::Y, 1.2).unwrap();

    assert!(stepped.model().abs_diff_eq(single.model(), 1e-5));
  }

  #[test]
  fn rotation_axis_is_normalised()
  {
    let mut scaled = pipeline();
    scaled.rotate_model(Vec3::new(0.0, 10.0, 0.0), 0.5).unwrap();

    let mut unit = pipeline();
    unit.rotate_model(Vec3::Y, 0.5).unwrap();

    assert!(scaled.model().abs_diff_eq(unit.model(), 1e-6));
  }

  #[test]
  fn degenerate_rotation_is_rejected()
  {
    let mut pipeline = pipeline();
    let mut backend = RecordingBackend::default();
    let program = program(&mut backend);
    pipeline.recompute_and_bind(&mut backend, &program).unwrap();

    assert_eq!(pipeline.rotate_model(Vec3::ZERO, 1.0), Err(TransformError::DegenerateAxis));
    assert_eq!(pipeline.rotate_model(Vec3::Y, f32::NAN), Err(TransformError::DegenerateAxis));
    assert_eq!(pipeline.model(), Mat4::IDENTITY);
    assert!(!pipeline.is_dirty());
  }

  #[test]
  fn degenerate_camera_is_rejected()
  {
    let mut pipeline = pipeline();
    let before = *pipeline.camera();

    let err = pipeline.set_camera(Camera::new(Vec3::ZERO, Vec3::ZERO, Vec3::Y)).unwrap_err();

    assert_eq!(err, TransformError::DegenerateCamera);
    assert_eq!(*pipeline.camera(), before);
  }

  #[test]
  fn model_applies_before_view_and_projection()
  {
    let mut pipeline = pipeline();
    pipeline.rotate_model(Vec3::Y, FRAC_PI_4).unwrap();

    let p = pipeline.perspective().matrix();
    let v = pipeline.camera().view_matrix();
    let m = pipeline.model();

    assert_eq!(pipeline.compute_pvm(), p * v * m);
    assert!(!pipeline.compute_pvm().abs_diff_eq(m * v * p, 1e-3));
  }

  #[test]
  fn program_without_pvm_uniform_keeps_dirty()
  {
    let vertex = "@vertex\nfn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {\n  return vec4<f32>(position, 1.0);\n}\n";
    let fragment = "@fragment\nfn fs_main() -> @location(0) vec4<f32> {\n  return vec4<f32>(1.0);\n}\n";
    let mut backend = RecordingBackend::default();
    let program = link_program(
      &mut backend,
      compile_stage(vertex, StageKind::Vertex).unwrap(),
      compile_stage(fragment, StageKind::Fragment).unwrap(),
    )
    .unwrap();
    let mut pipeline = pipeline();

    let err = pipeline.recompute_and_bind(&mut backend, &program).unwrap_err();

    assert_eq!(err, TransformError::MissingUniform("u_pvm".into()));
    assert!(pipeline.is_dirty());
    assert!(backend.uploads.is_empty());
  }

  #[test]
  fn matches_reference_perspective_look_at_identity()
  {
    let mut backend = RecordingBackend::default();
    let program = program(&mut backend);
    let mut pipeline = pipeline();
    pipeline.recompute_and_bind(&mut backend, &program).unwrap();

    let projection_gl = Matrix4::new_perspective(16.0_f32 / 9.0, 45.0_f32.to_radians(), 1.0, 100.0);
    let view = Matrix4::look_at_rh(&Point3::new(0.0, 0.0, 3.0), &Point3::origin(), &Vector3::y());

    // OpenGL clip depth is -1..1, wgpu's is 0..1.
    #[rustfmt::skip]
    let depth_remap = Matrix4::new(
      1.0, 0.0, 0.0, 0.0,
      0.0, 1.0, 0.0, 0.0,
      0.0, 0.0, 0.5, 0.5,
      0.0, 0.0, 0.0, 1.0,
    );
    let reference = depth_remap * projection_gl * view;

    let bound = uploaded_matrix(&backend.uploads[0].2).to_cols_array_2d();
    for col in 0..4
    {
      for row in 0..4
      {
        let expected = reference[(row, col)];
        let actual = bound[col][row];
        assert!((expected - actual).abs() < 1e-5, "[{row}][{col}]: expected {expected}, got {actual}");
      }
    }

    assert!((bound[3][3] - 3.0).abs() < 1e-5);
  }
}
