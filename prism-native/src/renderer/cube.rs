use glam::Vec3;
use wgpu::util::DeviceExt;

pub const HALF_EXTENT: f32 = 0.5;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CubeVertex
{
  pub position: [f32; 3],
  pub normal: [f32; 3],
}

impl CubeVertex
{
  const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

  pub fn layout() -> wgpu::VertexBufferLayout<'static>
  {
    wgpu::VertexBufferLayout {
      array_stride: std::mem::size_of::<CubeVertex>() as u64,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &Self::ATTRIBUTES,
    }
  }
}

// Face normal plus two in-plane axes with u × v = normal, so corners listed
// (-u-v, +u-v, +u+v, -u+v) wind counter-clockwise seen from outside.
const FACES: [(Vec3, Vec3, Vec3); 6] = [
  (Vec3::X, Vec3::Y, Vec3::Z),
  (Vec3::NEG_X, Vec3::Z, Vec3::Y),
  (Vec3::Y, Vec3::Z, Vec3::X),
  (Vec3::NEG_Y, Vec3::X, Vec3::Z),
  (Vec3::Z, Vec3::X, Vec3::Y),
  (Vec3::NEG_Z, Vec3::Y, Vec3::X),
];

pub fn cube_geometry() -> (Vec<CubeVertex>, Vec<u16>)
{
  let mut vertices = Vec::with_capacity(24);
  let mut indices = Vec::with_capacity(36);

  for (normal, u, v) in FACES
  {
    let base = vertices.len() as u16;

    for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
    {
      let position = (normal + u * su + v * sv) * HALF_EXTENT;
      vertices.push(CubeVertex { position: position.to_array(), normal: normal.to_array() });
    }

    indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
  }

  (vertices, indices)
}

pub struct CubeMesh
{
  pub vertex_buffer: wgpu::Buffer,
  pub index_buffer: wgpu::Buffer,
  pub index_count: u32,
}

impl CubeMesh
{
  pub fn create(device: &wgpu::Device) -> Self
  {
    let (vertices, indices) = cube_geometry();

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Cube Vertex Buffer"),
      contents: bytemuck::cast_slice(&vertices),
      usage: wgpu::BufferUsages::VERTEX,
    });

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Cube Index Buffer"),
      contents: bytemuck::cast_slice(&indices),
      usage: wgpu::BufferUsages::INDEX,
    });

    Self { vertex_buffer, index_buffer, index_count: indices.len() as u32 }
  }
}

#[cfg(test)]
mod tests
{
  use super::*;

  #[test]
  fn has_24_vertices_and_36_indices()
  {
    let (vertices, indices) = cube_geometry();
    assert_eq!(vertices.len(), 24);
    assert_eq!(indices.len(), 36);
    assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
  }

  #[test]
  fn corners_sit_on_the_half_extent()
  {
    let (vertices, _) = cube_geometry();

    for vertex in &vertices
    {
      assert!(vertex.position.iter().all(|c| (c.abs() - HALF_EXTENT).abs() < 1e-6));

      // Every corner of a face lies in that face's plane.
      let normal = Vec3::from(vertex.normal);
      assert!((Vec3::from(vertex.position).dot(normal) - HALF_EXTENT).abs() < 1e-6);
    }
  }

  #[test]
  fn triangles_wind_outwards()
  {
    let (vertices, indices) = cube_geometry();

    for tri in indices.chunks(3)
    {
      let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(vertices[i as usize].position));
      let face_normal = (b - a).cross(c - a).normalize();
      assert!(face_normal.abs_diff_eq(Vec3::from(vertices[tri[0] as usize].normal), 1e-6));
    }
  }

  #[test]
  fn vertex_layout_matches_shader_inputs()
  {
    let layout = CubeVertex::layout();
    assert_eq!(layout.array_stride, 24);
    assert_eq!(layout.attributes[1].offset, 12);
    assert_eq!(layout.attributes[1].shader_location, 1);
  }
}
