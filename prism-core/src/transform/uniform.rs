use glam::Mat4;

//
// ──────────────────────────────────────────────────────────────
//   PVM Uniform (GPU side)
//
//   WGSL layout (vertex.wgsl):
//     u_pvm : mat4x4<f32>   → 64 bytes, column-major
// ──────────────────────────────────────────────────────────────
//

/// Name of the uniform the transform pipeline writes.
pub const PVM_UNIFORM: &str = "u_pvm";

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PvmUniform
{
  pub pvm: [[f32; 4]; 4], // 64 bytes
}

// Catch CPU/GPU layout mismatches at compile time
const _: () = assert!(std::mem::size_of::<PvmUniform>() == 64);

impl PvmUniform
{
  pub fn from_matrix(pvm: &Mat4) -> Self
  {
    Self { pvm: pvm.to_cols_array_2d() }
  }
}
