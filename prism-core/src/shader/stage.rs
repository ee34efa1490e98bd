use std::fmt;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::ShaderError;

//
// ──────────────────────────────────────────────────────────────
//   Stage kind
// ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind
{
  Vertex,
  Fragment,
}

impl StageKind
{
  pub fn as_str(self) -> &'static str
  {
    match self
    {
      StageKind::Vertex => "vertex",
      StageKind::Fragment => "fragment",
    }
  }

  pub(crate) fn naga_stage(self) -> naga::ShaderStage
  {
    match self
    {
      StageKind::Vertex => naga::ShaderStage::Vertex,
      StageKind::Fragment => naga::ShaderStage::Fragment,
    }
  }
}

impl fmt::Display for StageKind
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
  {
    f.write_str(self.as_str())
  }
}

//
// ──────────────────────────────────────────────────────────────
//   ShaderStage
// ──────────────────────────────────────────────────────────────
//

/// A single compiled WGSL unit prior to linking.
///
/// Stages are single-use: `link_program` takes both by value and drops them
/// when the link attempt is over, whatever its outcome.
#[derive(Debug)]
pub struct ShaderStage
{
  kind: StageKind,
  source: String,
  module: naga::Module,
  entry_point: String,
}

impl ShaderStage
{
  pub fn kind(&self) -> StageKind
  {
    self.kind
  }

  /// Source text exactly as it was handed to the compiler.
  pub fn source(&self) -> &str
  {
    &self.source
  }

  pub fn module(&self) -> &naga::Module
  {
    &self.module
  }

  pub fn entry_point(&self) -> &str
  {
    &self.entry_point
  }

  pub(crate) fn entry(&self) -> Option<&naga::EntryPoint>
  {
    self.module.entry_points.iter().find(|ep| ep.name == self.entry_point)
  }
}

/// Parses and validates one stage.
///
/// On failure the error carries the stage kind and naga's rendered
/// diagnostic, unmodified.
pub fn compile_stage(source: &str, kind: StageKind) -> Result<ShaderStage, ShaderError>
{
  if source.trim().is_empty()
  {
    return Err(ShaderError::EmptySource { stage: kind });
  }

  let module = naga::front::wgsl::parse_str(source)
    .map_err(|err| ShaderError::Compile { stage: kind, log: err.emit_to_string(source) })?;

  let mut validator = Validator::new(ValidationFlags::all(), Capabilities::default());
  validator
    .validate(&module)
    .map_err(|err| ShaderError::Compile { stage: kind, log: err.emit_to_string(source) })?;

  let entry_point = find_entry_point(&module, kind).ok_or_else(|| ShaderError::Compile {
    stage: kind,
    log: format!("no @{} entry point in shader source", kind),
  })?;

  log::debug!("compiled {} stage (entry point `{}`)", kind, entry_point);

  Ok(ShaderStage { kind, source: source.to_owned(), module, entry_point })
}

fn find_entry_point(module: &naga::Module, kind: StageKind) -> Option<String>
{
  module.entry_points.iter().find(|ep| ep.stage == kind.naga_stage()).map(|ep| ep.name.clone())
}
