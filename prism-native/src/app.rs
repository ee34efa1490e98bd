use std::sync::Arc;

use anyhow::{Context, Result};
use winit::{
  application::ApplicationHandler,
  dpi::PhysicalSize,
  event::WindowEvent,
  event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
  window::{Window, WindowId},
};

use prism_core::{load_and_compile_program, FrameDriver, FrameStatus, Settings, TransformPipeline};

use crate::input::KeyBindings;
use crate::renderer::{GpuProgram, Renderer};

/// Runs the event loop until the window closes or Escape is pressed.
/// Startup failures (window, GPU, shaders) end the loop and are returned.
pub fn run(settings: Settings) -> Result<()>
{
  let event_loop = EventLoop::new().context("failed to create event loop")?;
  let mut app = PrismApp::new(settings);

  event_loop.run_app(&mut app).context("event loop failed")?;

  match app.startup_error.take()
  {
    Some(err) => Err(err),
    None => Ok(()),
  }
}

/// Everything that exists once the window is up.
struct Running
{
  window: Arc<Window>,
  renderer: Renderer,
  driver: FrameDriver<GpuProgram>,
}

struct PrismApp
{
  settings: Settings,
  bindings: KeyBindings,
  running: Option<Running>,
  startup_error: Option<anyhow::Error>,
}

impl PrismApp
{
  fn new(settings: Settings) -> Self
  {
    let bindings = KeyBindings::new(settings.rotate_step());
    Self { settings, bindings, running: None, startup_error: None }
  }

  fn start(&self, event_loop: &ActiveEventLoop) -> Result<Running>
  {
    let window_settings = &self.settings.window;
    let attrs = Window::default_attributes()
      .with_title(window_settings.title.as_str())
      .with_inner_size(PhysicalSize::new(window_settings.width, window_settings.height));
    let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);

    let mut renderer = pollster::block_on(Renderer::new(window.clone(), &self.settings))?;

    let shaders = &self.settings.shaders;
    let program = load_and_compile_program(&mut renderer, &shaders.vertex, &shaders.fragment)
      .context("failed to build the shader program")?;
    log::info!("shader program linked from {} and {}", shaders.vertex.display(), shaders.fragment.display());

    let mut transform = TransformPipeline::new(self.settings.perspective()?, self.settings.camera())?;

    // The window manager may not have honoured the requested size.
    let size = window.inner_size();
    transform.set_aspect_from_viewport(size.width, size.height);

    let driver = FrameDriver::new(transform, program, shaders.clone())?;

    Ok(Running { window, renderer, driver })
  }

  fn handle_window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent)
  {
    let running = match &mut self.running
    {
      Some(running) if running.window.id() == window_id => running,
      _ => return,
    };

    let consumed = running.renderer.handle_overlay_event(&event);

    match event
    {
      WindowEvent::CloseRequested =>
      {
        event_loop.exit();
      }

      WindowEvent::Resized(size) =>
      {
        running.renderer.resize(size.width, size.height);
        running.driver.queue_resize(size.width, size.height);
        running.window.request_redraw();
      }

      WindowEvent::KeyboardInput { event, .. } if !consumed =>
      {
        if let Some(command) = self.bindings.command_for_event(&event)
        {
          running.driver.queue_command(command);
        }
      }

      WindowEvent::RedrawRequested =>
      {
        if running.driver.frame(&mut running.renderer) == FrameStatus::Exit
        {
          event_loop.exit();
        }
      }

      _ =>
      {}
    }
  }
}

impl ApplicationHandler for PrismApp
{
  fn resumed(&mut self, event_loop: &ActiveEventLoop)
  {
    if self.running.is_some()
    {
      return;
    }

    event_loop.set_control_flow(ControlFlow::Wait);

    match self.start(event_loop)
    {
      Ok(running) =>
      {
        running.window.request_redraw();
        self.running = Some(running);
      }
      Err(err) =>
      {
        self.startup_error = Some(err);
        event_loop.exit();
      }
    }
  }

  fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent)
  {
    self.handle_window_event(event_loop, window_id, event);
  }

  fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop)
  {
    // Continuous redraw; vsync paces it.
    if let Some(running) = &self.running
    {
      running.window.request_redraw();
    }
  }
}
