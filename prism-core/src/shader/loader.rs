use std::fs;
use std::io;
use std::path::Path;

use crate::error::ShaderError;

use super::program::{link_program, ProgramBackend, ProgramHandle};
use super::stage::{compile_stage, StageKind};

/// Reads a shader file in full as raw bytes.
///
/// WGSL is UTF-8 text, so undecodable bytes are reported as `InvalidData`.
pub fn read_source(path: &Path) -> Result<String, ShaderError>
{
  let bytes = fs::read(path).map_err(|source| ShaderError::Io { path: path.to_path_buf(), source })?;

  String::from_utf8(bytes).map_err(|err| ShaderError::Io {
    path: path.to_path_buf(),
    source: io::Error::new(io::ErrorKind::InvalidData, err),
  })
}

/// Reads both sources, then compiles and links them.
///
/// Both files are read before anything is compiled, so an unreadable file
/// never reaches the backend.
pub fn load_and_compile_program<B: ProgramBackend>(
  backend: &mut B,
  vertex_path: &Path,
  fragment_path: &Path,
) -> Result<ProgramHandle<B::Program>, ShaderError>
{
  let vertex_source = read_source(vertex_path)?;
  let fragment_source = read_source(fragment_path)?;

  log::info!("compiling shaders {} + {}", vertex_path.display(), fragment_path.display());

  let vertex = compile_stage(&vertex_source, StageKind::Vertex)?;
  let fragment = compile_stage(&fragment_source, StageKind::Fragment)?;

  link_program(backend, vertex, fragment)
}
