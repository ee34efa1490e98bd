use std::sync::Arc;

use anyhow::{Context, Result};
use winit::event::WindowEvent;
use winit::window::Window;

use prism_core::shader::{ShaderStage, UniformInfo, UniformLocation};
use prism_core::{Command, FrameSurface, OverlayView, ProgramBackend, Settings};

use super::cube::CubeMesh;
use super::depth::{RenderTargets, DEPTH_FORMAT};
use super::gui::GuiRenderer;
use super::program::{create_gpu_program, GpuProgram, PipelineTargets};

pub struct Renderer
{
  window: Arc<Window>,
  surface: wgpu::Surface<'static>,
  device: wgpu::Device,
  queue: wgpu::Queue,
  config: wgpu::SurfaceConfiguration,
  /// Width and height as last reported by the window; may be zero.
  size: (u32, u32),
  sample_count: u32,
  clear_color: wgpu::Color,

  targets: RenderTargets,
  cube: CubeMesh,
  gui: GuiRenderer,
}

/// One acquired swapchain image and the commands recorded against it.
pub struct RenderFrame
{
  surface_texture: wgpu::SurfaceTexture,
  view: wgpu::TextureView,
  encoder: wgpu::CommandEncoder,
  /// Buffers that must be submitted before `encoder`.
  pre_submit: Vec<wgpu::CommandBuffer>,
}

//
// ──────────────────────────────────────────────────────────────
//   Public API
// ──────────────────────────────────────────────────────────────
//

impl Renderer
{
  pub async fn new(window: Arc<Window>, settings: &Settings) -> Result<Self>
  {
    let instance = wgpu::Instance::default();
    let surface = instance.create_surface(window.clone()).context("failed to create surface")?;

    let adapter = request_adapter(&instance, &surface).await?;
    let (device, queue) = request_device(&adapter).await?;

    let config = configure_surface(&window, &surface, &adapter, &device, settings.window.vsync)?;
    let sample_count = supported_sample_count(&adapter, config.format, settings.window.msaa_samples);

    let targets = RenderTargets::create(&device, &config, sample_count);
    let cube = CubeMesh::create(&device);
    let gui = GuiRenderer::new(&device, config.format, &window, &settings.perspective, settings.rotate_step());

    let [r, g, b, a] = settings.clear_color_premultiplied();

    Ok(Self {
      size: (config.width, config.height),
      window,
      surface,
      device,
      queue,
      config,
      sample_count,
      clear_color: wgpu::Color { r, g, b, a },
      targets,
      cube,
      gui,
    })
  }

  /// Reconfigures the surface for a new window size. A zero-sized
  /// (minimised) window only records the size; frames are skipped until it
  /// grows again.
  pub fn resize(&mut self, width: u32, height: u32)
  {
    self.size = (width, height);

    if width == 0 || height == 0
    {
      log::debug!("window minimised; rendering paused");
      return;
    }

    self.config.width = width;
    self.config.height = height;
    self.surface.configure(&self.device, &self.config);
    self.targets = RenderTargets::create(&self.device, &self.config, self.sample_count);

    log::debug!("surface resized to {}x{}", width, height);
  }

  /// Passes a window event to the overlay. Returns true when the overlay
  /// consumed it and it should not drive the scene.
  pub fn handle_overlay_event(&mut self, event: &WindowEvent) -> bool
  {
    self.gui.on_window_event(&self.window, event)
  }

  fn acquire(&mut self) -> Option<wgpu::SurfaceTexture>
  {
    match self.surface.get_current_texture()
    {
      Ok(texture) => Some(texture),
      Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) =>
      {
        log::warn!("surface lost or outdated; reconfiguring");
        self.surface.configure(&self.device, &self.config);
        None
      }
      Err(wgpu::SurfaceError::OutOfMemory) =>
      {
        log::error!("out of memory acquiring the next frame");
        None
      }
      Err(err) =>
      {
        log::warn!("skipping frame: {}", err);
        None
      }
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Backend traits
// ──────────────────────────────────────────────────────────────
//

impl ProgramBackend for Renderer
{
  type Program = GpuProgram;

  fn create_program(
    &mut self,
    vertex: &ShaderStage,
    fragment: &ShaderStage,
    uniforms: &[UniformInfo],
  ) -> Result<GpuProgram, String>
  {
    let targets = PipelineTargets { color_format: self.config.format, sample_count: self.sample_count };
    create_gpu_program(&self.device, targets, vertex, fragment, uniforms)
  }

  fn write_uniform(&mut self, program: &GpuProgram, location: UniformLocation, bytes: &[u8])
  {
    match program.uniform_buffer(location)
    {
      Some(buffer) => self.queue.write_buffer(buffer, 0, bytes),
      None => log::warn!("program has no uniform buffer at {}", location),
    }
  }
}

impl FrameSurface for Renderer
{
  type Frame = RenderFrame;

  fn begin_frame(&mut self) -> Option<RenderFrame>
  {
    if self.size.0 == 0 || self.size.1 == 0
    {
      return None;
    }

    let surface_texture = self.acquire()?;
    let view = surface_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder =
      self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Frame Encoder") });

    record_clear_pass(&mut encoder, &self.targets, &view, self.clear_color);

    Some(RenderFrame { surface_texture, view, encoder, pre_submit: Vec::new() })
  }

  fn draw(&mut self, frame: &mut RenderFrame, program: &GpuProgram)
  {
    record_draw_pass(&mut frame.encoder, &self.targets, &frame.view, program, &self.cube);
  }

  fn composite_overlay(&mut self, frame: &mut RenderFrame, view: &OverlayView<'_>) -> Vec<Command>
  {
    let (full_output, commands) = self.gui.build(&self.window, view);

    let size = [self.config.width, self.config.height];
    let buffers = self.gui.render(&self.device, &self.queue, &mut frame.encoder, size, &frame.view, full_output);
    frame.pre_submit.extend(buffers);

    commands
  }

  fn present(&mut self, frame: RenderFrame)
  {
    let RenderFrame { surface_texture, encoder, pre_submit, .. } = frame;

    self.queue.submit(pre_submit.into_iter().chain(std::iter::once(encoder.finish())));
    self.window.pre_present_notify();
    surface_texture.present();
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Initialization Helpers
// ──────────────────────────────────────────────────────────────
//

async fn request_adapter(instance: &wgpu::Instance, surface: &wgpu::Surface<'_>) -> Result<wgpu::Adapter>
{
  let adapter = instance
    .request_adapter(&wgpu::RequestAdapterOptions {
      power_preference: wgpu::PowerPreference::HighPerformance,
      compatible_surface: Some(surface),
      force_fallback_adapter: false,
    })
    .await
    .context("no suitable GPU adapter found")?;

  let info = adapter.get_info();
  log::info!("using adapter {} ({:?})", info.name, info.backend);

  Ok(adapter)
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)>
{
  adapter
    .request_device(&wgpu::DeviceDescriptor { label: Some("Prism Device"), ..Default::default() })
    .await
    .context("failed to create device")
}

fn configure_surface(
  window: &Window,
  surface: &wgpu::Surface<'_>,
  adapter: &wgpu::Adapter,
  device: &wgpu::Device,
  vsync: bool,
) -> Result<wgpu::SurfaceConfiguration>
{
  let size = window.inner_size();
  let caps = surface.get_capabilities(adapter);
  let format = *caps.formats.first().context("surface reports no supported formats")?;

  let present_mode = if vsync { wgpu::PresentMode::Fifo } else { wgpu::PresentMode::AutoNoVsync };

  let config = wgpu::SurfaceConfiguration {
    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
    format,
    width: size.width.max(1),
    height: size.height.max(1),
    present_mode,
    alpha_mode: wgpu::CompositeAlphaMode::Auto,
    view_formats: vec![],
    desired_maximum_frame_latency: 2,
  };

  surface.configure(device, &config);
  log::info!("surface format {:?}, {}x{}, {:?}", format, config.width, config.height, present_mode);

  Ok(config)
}

fn supported_sample_count(adapter: &wgpu::Adapter, format: wgpu::TextureFormat, requested: u32) -> u32
{
  if requested <= 1
  {
    return 1;
  }

  let color = adapter.get_texture_format_features(format).flags;
  let depth = adapter.get_texture_format_features(DEPTH_FORMAT).flags;

  if color.sample_count_supported(requested) && depth.sample_count_supported(requested)
  {
    requested
  }
  else
  {
    log::warn!("{}x MSAA not supported for {:?}; rendering without it", requested, format);
    1
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Render Passes
// ──────────────────────────────────────────────────────────────
//

fn record_clear_pass(
  encoder: &mut wgpu::CommandEncoder,
  targets: &RenderTargets,
  surface_view: &wgpu::TextureView,
  clear_color: wgpu::Color,
)
{
  let (view, _) = targets.color_target(surface_view);

  // No draws; the load ops clear colour and depth.
  let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
    label: Some("Clear Pass"),
    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
      view,
      resolve_target: None,
      ops: wgpu::Operations { load: wgpu::LoadOp::Clear(clear_color), store: wgpu::StoreOp::Store },
      depth_slice: None,
    })],
    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
      view: &targets.depth_view,
      depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
      stencil_ops: None,
    }),
    occlusion_query_set: None,
    timestamp_writes: None,
  });
}

fn record_draw_pass(
  encoder: &mut wgpu::CommandEncoder,
  targets: &RenderTargets,
  surface_view: &wgpu::TextureView,
  program: &GpuProgram,
  cube: &CubeMesh,
)
{
  let (view, resolve_target) = targets.color_target(surface_view);

  let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
    label: Some("Cube Pass"),
    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
      view,
      resolve_target,
      ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
      depth_slice: None,
    })],
    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
      view: &targets.depth_view,
      depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Discard }),
      stencil_ops: None,
    }),
    occlusion_query_set: None,
    timestamp_writes: None,
  });

  pass.set_pipeline(program.pipeline());
  if let Some(bind_group) = program.bind_group()
  {
    pass.set_bind_group(0, bind_group, &[]);
  }
  pass.set_vertex_buffer(0, cube.vertex_buffer.slice(..));
  pass.set_index_buffer(cube.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
  pass.draw_indexed(0..cube.index_count, 0, 0..1);
}
