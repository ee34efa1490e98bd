use std::fmt;

use crate::error::ShaderError;

use super::stage::{ShaderStage, StageKind};

//
// ──────────────────────────────────────────────────────────────
//   Uniform reflection
// ──────────────────────────────────────────────────────────────
//

/// Where a uniform lives on a linked program: `@group(g) @binding(b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation
{
  pub group: u32,
  pub binding: u32,
}

impl fmt::Display for UniformLocation
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
  {
    write!(f, "@group({}) @binding({})", self.group, self.binding)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformInfo
{
  pub name: String,
  pub location: UniformLocation,
  /// Byte size of the uniform's type.
  pub size: u32,
  /// Stages that declare the uniform.
  pub stages: Vec<StageKind>,
}

//
// ──────────────────────────────────────────────────────────────
//   Backend seam
// ──────────────────────────────────────────────────────────────
//

/// Graphics-API side of program creation and uniform upload.
///
/// `create_program` must either return a usable program or an error with
/// nothing left allocated.
pub trait ProgramBackend
{
  type Program;

  fn create_program(
    &mut self,
    vertex: &ShaderStage,
    fragment: &ShaderStage,
    uniforms: &[UniformInfo],
  ) -> Result<Self::Program, String>;

  fn write_uniform(&mut self, program: &Self::Program, location: UniformLocation, bytes: &[u8]);
}

//
// ──────────────────────────────────────────────────────────────
//   ProgramHandle
// ──────────────────────────────────────────────────────────────
//

/// A linked, validated program. Only `link_program` produces one.
#[derive(Debug)]
pub struct ProgramHandle<P>
{
  raw: P,
  uniforms: Vec<UniformInfo>,
}

impl<P> ProgramHandle<P>
{
  pub fn raw(&self) -> &P
  {
    &self.raw
  }

  pub fn uniforms(&self) -> &[UniformInfo]
  {
    &self.uniforms
  }

  pub fn uniform(&self, name: &str) -> Option<&UniformInfo>
  {
    self.uniforms.iter().find(|u| u.name == name)
  }

  pub fn uniform_location(&self, name: &str) -> Option<UniformLocation>
  {
    self.uniform(name).map(|u| u.location)
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Linking
// ──────────────────────────────────────────────────────────────
//

/// Links a vertex and a fragment stage into a program.
///
/// Both stages are consumed and released when this returns.
pub fn link_program<B: ProgramBackend>(
  backend: &mut B,
  vertex: ShaderStage,
  fragment: ShaderStage,
) -> Result<ProgramHandle<B::Program>, ShaderError>
{
  expect_kind(&vertex, StageKind::Vertex)?;
  expect_kind(&fragment, StageKind::Fragment)?;

  check_interface(&vertex, &fragment)?;
  let uniforms = reflect_uniforms(&vertex, &fragment)?;

  let raw = backend
    .create_program(&vertex, &fragment, &uniforms)
    .map_err(|log| ShaderError::Link { log })?;

  log::info!(
    "linked shader program `{}` + `{}` ({} uniform(s))",
    vertex.entry_point(),
    fragment.entry_point(),
    uniforms.len()
  );

  Ok(ProgramHandle { raw, uniforms })
}

fn expect_kind(stage: &ShaderStage, expected: StageKind) -> Result<(), ShaderError>
{
  if stage.kind() == expected
  {
    return Ok(());
  }

  Err(ShaderError::Link { log: format!("expected a {} stage, got a {} stage", expected, stage.kind()) })
}

//
// ──────────────────────────────────────────────────────────────
//   Stage interface check
// ──────────────────────────────────────────────────────────────
//

struct Varying
{
  binding: naga::Binding,
  ty: naga::TypeInner,
}

impl Varying
{
  fn location(&self) -> Option<u32>
  {
    match self.binding
    {
      naga::Binding::Location { location, .. } => Some(location),
      naga::Binding::BuiltIn(_) => None,
    }
  }

  fn is_position(&self) -> bool
  {
    matches!(self.binding, naga::Binding::BuiltIn(naga::BuiltIn::Position { .. }))
  }
}

fn collect_varyings(
  module: &naga::Module,
  ty: naga::Handle<naga::Type>,
  binding: Option<&naga::Binding>,
  out: &mut Vec<Varying>,
)
{
  let inner = &module.types[ty].inner;

  match binding
  {
    Some(binding) => out.push(Varying { binding: binding.clone(), ty: inner.clone() }),
    None =>
    {
      if let naga::TypeInner::Struct { members, .. } = inner
      {
        for member in members
        {
          collect_varyings(module, member.ty, member.binding.as_ref(), out);
        }
      }
    }
  }
}

fn stage_outputs(stage: &ShaderStage) -> Vec<Varying>
{
  let mut out = Vec::new();

  if let Some(result) = stage.entry().and_then(|ep| ep.function.result.as_ref())
  {
    collect_varyings(stage.module(), result.ty, result.binding.as_ref(), &mut out);
  }

  out
}

fn stage_inputs(stage: &ShaderStage) -> Vec<Varying>
{
  let mut out = Vec::new();

  if let Some(ep) = stage.entry()
  {
    for arg in &ep.function.arguments
    {
      collect_varyings(stage.module(), arg.ty, arg.binding.as_ref(), &mut out);
    }
  }

  out
}

fn check_interface(vertex: &ShaderStage, fragment: &ShaderStage) -> Result<(), ShaderError>
{
  let outputs = stage_outputs(vertex);
  let inputs = stage_inputs(fragment);
  let mut problems = Vec::new();

  if !outputs.iter().any(Varying::is_position)
  {
    problems.push("vertex stage does not write @builtin(position)".to_owned());
  }

  for input in &inputs
  {
    let Some(location) = input.location()
    else
    {
      continue;
    };

    match outputs.iter().find(|out| out.location() == Some(location))
    {
      None =>
      {
        problems.push(format!("fragment input @location({}) is not written by the vertex stage", location))
      }
      Some(out) if out.ty != input.ty => problems.push(format!(
        "@location({}) is {:?} in the vertex stage but {:?} in the fragment stage",
        location, out.ty, input.ty
      )),
      Some(_) =>
      {}
    }
  }

  if problems.is_empty()
  {
    return Ok(());
  }

  Err(ShaderError::Link { log: problems.join("\n") })
}

//
// ──────────────────────────────────────────────────────────────
//   Uniform table
// ──────────────────────────────────────────────────────────────
//

fn reflect_uniforms(vertex: &ShaderStage, fragment: &ShaderStage) -> Result<Vec<UniformInfo>, ShaderError>
{
  let mut uniforms: Vec<UniformInfo> = Vec::new();

  for stage in [vertex, fragment]
  {
    let module = stage.module();

    for (_, var) in module.global_variables.iter()
    {
      if var.space != naga::AddressSpace::Uniform
      {
        continue;
      }

      let (Some(name), Some(binding)) = (&var.name, &var.binding)
      else
      {
        continue;
      };

      let location = UniformLocation { group: binding.group, binding: binding.binding };
      let size = module.types[var.ty].inner.size(module.to_ctx());

      if let Some(existing) = uniforms.iter_mut().find(|u| u.name == *name)
      {
        if existing.location != location || existing.size != size
        {
          return Err(ShaderError::Link {
            log: format!(
              "uniform `{}` is declared as {} ({} bytes) and {} ({} bytes)",
              name, existing.location, existing.size, location, size
            ),
          });
        }

        existing.stages.push(stage.kind());
        continue;
      }

      if let Some(other) = uniforms.iter().find(|u| u.location == location)
      {
        return Err(ShaderError::Link {
          log: format!("uniforms `{}` and `{}` share {}", other.name, name, location),
        });
      }

      uniforms.push(UniformInfo { name: name.clone(), location, size, stages: vec![stage.kind()] });
    }
  }

  Ok(uniforms)
}

#[cfg(test)]
mod tests
{
  use super::*;
  use crate::shader::compile_stage;
  use crate::shader::testing::{RecordingBackend, FRAGMENT_WGSL, VERTEX_WGSL};

  fn stages(vertex: &str, fragment: &str) -> (ShaderStage, ShaderStage)
  {
    (
      compile_stage(vertex, StageKind::Vertex).unwrap(),
      compile_stage(fragment, StageKind::Fragment).unwrap(),
    )
  }

  #[test]
  fn links_matching_stages_and_reflects_pvm()
  {
    let mut backend = RecordingBackend::default();
    let (vertex, fragment) = stages(VERTEX_WGSL, FRAGMENT_WGSL);

    let program = link_program(&mut backend, vertex, fragment).unwrap();

    assert_eq!(backend.programs_created, 1);
    assert_eq!(program.uniforms().len(), 1);
    assert_eq!(program.uniforms()[0].name, "u_pvm");
    let pvm = program.uniform("u_pvm").unwrap();
    assert_eq!(pvm.location, UniformLocation { group: 0, binding: 0 });
    assert_eq!(pvm.size, 64);
    assert_eq!(pvm.stages, vec![StageKind::Vertex]);
    assert!(program.uniform_location("u_missing").is_none());
  }

  #[test]
  fn swapped_stages_fail_to_link()
  {
    let mut backend = RecordingBackend::default();
    let (vertex, fragment) = stages(VERTEX_WGSL, FRAGMENT_WGSL);

    let err = link_program(&mut backend, fragment, vertex).unwrap_err();

    assert!(matches!(err, ShaderError::Link { .. }));
    assert_eq!(backend.programs_created, 0);
  }

  #[test]
  fn fragment_input_without_vertex_output_fails()
  {
    let fragment = "@fragment\nfn fs_main(@location(3) tint: vec4<f32>) -> @location(0) vec4<f32> {\n  return tint;\n}\n";
    let mut backend = RecordingBackend::default();
    let (vertex, fragment) = stages(VERTEX_WGSL, fragment);

    let err = link_program(&mut backend, vertex, fragment).unwrap_err();

    match err
    {
      ShaderError::Link { log } => assert!(log.contains("@location(3)")),
      other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.programs_created, 0);
  }

  #[test]
  fn varying_type_mismatch_fails()
  {
    let fragment = "@fragment\nfn fs_main(@location(0) normal: vec4<f32>) -> @location(0) vec4<f32> {\n  return normal;\n}\n";
    let mut backend = RecordingBackend::default();
    let (vertex, fragment) = stages(VERTEX_WGSL, fragment);

    let err = link_program(&mut backend, vertex, fragment).unwrap_err();

    assert!(matches!(err, ShaderError::Link { .. }));
  }

  #[test]
  fn conflicting_uniform_declarations_fail()
  {
    let fragment = "@group(0) @binding(1) var<uniform> u_pvm: mat4x4<f32>;\n\n@fragment\nfn fs_main(@location(0) normal: vec3<f32>) -> @location(0) vec4<f32> {\n  return u_pvm * vec4<f32>(normal, 1.0);\n}\n";
    let mut backend = RecordingBackend::default();
    let (vertex, fragment) = stages(VERTEX_WGSL, fragment);

    let err = link_program(&mut backend, vertex, fragment).unwrap_err();

    match err
    {
      ShaderError::Link { log } => assert!(log.contains("u_pvm")),
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn backend_failure_is_a_link_error()
  {
    let mut backend = RecordingBackend { fail_with: Some("pipeline rejected".into()), ..Default::default() };
    let (vertex, fragment) = stages(VERTEX_WGSL, FRAGMENT_WGSL);

    let err = link_program(&mut backend, vertex, fragment).unwrap_err();

    match err
    {
      ShaderError::Link { log } => assert_eq!(log, "pipeline rejected"),
      other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.programs_created, 0);
  }
}
