use std::num::NonZeroU64;

use prism_core::shader::{ShaderStage, UniformInfo, UniformLocation};
use prism_core::StageKind;

use super::cube::CubeVertex;
use super::depth::DEPTH_FORMAT;

/// A linked program on the GPU: the render pipeline plus one uniform buffer
/// per reflected uniform, all bound through a single group 0 bind group.
pub struct GpuProgram
{
  pipeline: wgpu::RenderPipeline,
  bind_group: Option<wgpu::BindGroup>,
  uniform_buffers: Vec<(UniformLocation, wgpu::Buffer)>,
}

impl GpuProgram
{
  pub fn pipeline(&self) -> &wgpu::RenderPipeline
  {
    &self.pipeline
  }

  pub fn bind_group(&self) -> Option<&wgpu::BindGroup>
  {
    self.bind_group.as_ref()
  }

  pub fn uniform_buffer(&self, location: UniformLocation) -> Option<&wgpu::Buffer>
  {
    self.uniform_buffers.iter().find(|(l, _)| *l == location).map(|(_, buffer)| buffer)
  }
}

/// Output targets the pipeline is built against.
#[derive(Debug, Clone, Copy)]
pub struct PipelineTargets
{
  pub color_format: wgpu::TextureFormat,
  pub sample_count: u32,
}

//
// ──────────────────────────────────────────────────────────────
//   Creation
// ──────────────────────────────────────────────────────────────
//

/// Builds the pipeline for an already validated stage pair. wgpu reports
/// creation problems asynchronously, so everything runs inside a validation
/// error scope and any captured error becomes the returned log.
pub fn create_gpu_program(
  device: &wgpu::Device,
  targets: PipelineTargets,
  vertex: &ShaderStage,
  fragment: &ShaderStage,
  uniforms: &[UniformInfo],
) -> Result<GpuProgram, String>
{
  if let Some(uniform) = uniforms.iter().find(|u| u.location.group != 0)
  {
    return Err(format!("uniform `{}` is bound at {}; only @group(0) is supported", uniform.name, uniform.location));
  }

  device.push_error_scope(wgpu::ErrorFilter::Validation);

  let program = build(device, targets, vertex, fragment, uniforms);

  match pollster::block_on(device.pop_error_scope())
  {
    Some(err) => Err(err.to_string()),
    None => Ok(program),
  }
}

fn build(
  device: &wgpu::Device,
  targets: PipelineTargets,
  vertex: &ShaderStage,
  fragment: &ShaderStage,
  uniforms: &[UniformInfo],
) -> GpuProgram
{
  let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
    label: Some("Vertex Shader"),
    source: wgpu::ShaderSource::Wgsl(vertex.source().into()),
  });

  let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
    label: Some("Fragment Shader"),
    source: wgpu::ShaderSource::Wgsl(fragment.source().into()),
  });

  let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = uniforms
    .iter()
    .map(|uniform| wgpu::BindGroupLayoutEntry {
      binding: uniform.location.binding,
      visibility: visibility(&uniform.stages),
      ty: wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: NonZeroU64::new(u64::from(uniform.size)),
      },
      count: None,
    })
    .collect();

  let uniform_buffers: Vec<(UniformLocation, wgpu::Buffer)> = uniforms
    .iter()
    .map(|uniform| {
      let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(uniform.name.as_str()),
        size: u64::from(uniform.size).next_multiple_of(16).max(16),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
      });
      (uniform.location, buffer)
    })
    .collect();

  let (bind_group_layout, bind_group) = if uniforms.is_empty()
  {
    (None, None)
  }
  else
  {
    let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
      label: Some("Program BGL"),
      entries: &layout_entries,
    });

    let entries: Vec<wgpu::BindGroupEntry> = uniform_buffers
      .iter()
      .map(|(location, buffer)| wgpu::BindGroupEntry {
        binding: location.binding,
        resource: buffer.as_entire_binding(),
      })
      .collect();

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      label: Some("Program BG"),
      layout: &bgl,
      entries: &entries,
    });

    (Some(bgl), Some(bind_group))
  };

  let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = bind_group_layout.iter().collect();

  let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
    label: Some("Program Pipeline Layout"),
    bind_group_layouts: &bind_group_layouts,
    push_constant_ranges: &[],
  });

  let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
    label: Some("Program Pipeline"),
    layout: Some(&layout),
    vertex: wgpu::VertexState {
      module: &vertex_module,
      entry_point: Some(vertex.entry_point()),
      buffers: &[CubeVertex::layout()],
      compilation_options: wgpu::PipelineCompilationOptions::default(),
    },
    fragment: Some(wgpu::FragmentState {
      module: &fragment_module,
      entry_point: Some(fragment.entry_point()),
      targets: &[Some(wgpu::ColorTargetState {
        format: targets.color_format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
      })],
      compilation_options: wgpu::PipelineCompilationOptions::default(),
    }),
    primitive: wgpu::PrimitiveState::default(),
    depth_stencil: Some(wgpu::DepthStencilState {
      format: DEPTH_FORMAT,
      depth_write_enabled: true,
      depth_compare: wgpu::CompareFunction::Less,
      stencil: wgpu::StencilState::default(),
      bias: wgpu::DepthBiasState::default(),
    }),
    multisample: wgpu::MultisampleState { count: targets.sample_count, ..Default::default() },
    multiview: None,
    cache: None,
  });

  GpuProgram { pipeline, bind_group, uniform_buffers }
}

fn visibility(stages: &[StageKind]) -> wgpu::ShaderStages
{
  stages.iter().fold(wgpu::ShaderStages::NONE, |acc, stage| match stage
  {
    StageKind::Vertex => acc | wgpu::ShaderStages::VERTEX,
    StageKind::Fragment => acc | wgpu::ShaderStages::FRAGMENT,
  })
}
