//! Per-frame sequencing between input, the transform pipeline and the surface.
//!
//! Order inside [`FrameDriver::frame`]:
//!   1. apply the queued viewport size and queued commands
//!   2. recompute + bind the PVM if anything changed
//!   3. begin frame (acquire + clear)
//!   4. draw
//!   5. composite the overlay (its commands run next frame)
//!   6. present

use std::collections::VecDeque;

use crate::command::Command;
use crate::config::ShaderPaths;
use crate::error::TransformError;
use crate::shader::{load_and_compile_program, ProgramBackend, ProgramHandle};
use crate::transform::{TransformPipeline, PVM_UNIFORM};

//
// ──────────────────────────────────────────────────────────────
//   Surface contract
// ──────────────────────────────────────────────────────────────
//

/// What the overlay gets to look at while it is being built.
pub struct OverlayView<'a>
{
  pub transform: &'a TransformPipeline,
  pub frame_index: u64,
}

/// The graphics side of a frame. Implemented by the native renderer.
pub trait FrameSurface: ProgramBackend
{
  type Frame;

  /// Acquires the next image and clears it. `None` skips this frame.
  fn begin_frame(&mut self) -> Option<Self::Frame>;

  fn draw(&mut self, frame: &mut Self::Frame, program: &Self::Program);

  /// Draws the overlay on top of the frame and returns the commands it
  /// produced.
  fn composite_overlay(&mut self, frame: &mut Self::Frame, view: &OverlayView<'_>) -> Vec<Command>;

  fn present(&mut self, frame: Self::Frame);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus
{
  Presented,
  /// The surface had no image to give (lost, outdated or zero-sized).
  Skipped,
  /// An exit command was applied; nothing was drawn.
  Exit,
}

//
// ──────────────────────────────────────────────────────────────
//   FrameDriver
// ──────────────────────────────────────────────────────────────
//

/// Render-thread context: transform state, the active program, and input
/// queued since the last frame.
pub struct FrameDriver<P>
{
  transform: TransformPipeline,
  program: ProgramHandle<P>,
  shaders: ShaderPaths,
  commands: VecDeque<Command>,
  viewport: Option<(u32, u32)>,
  frame_index: u64,
  exit_requested: bool,
}

impl<P> FrameDriver<P>
{
  /// Fails when the program has no `u_pvm` uniform to drive.
  pub fn new(transform: TransformPipeline, program: ProgramHandle<P>, shaders: ShaderPaths) -> Result<Self, TransformError>
  {
    require_pvm(&program)?;

    Ok(Self {
      transform,
      program,
      shaders,
      commands: VecDeque::new(),
      viewport: None,
      frame_index: 0,
      exit_requested: false,
    })
  }

  pub fn transform(&self) -> &TransformPipeline
  {
    &self.transform
  }

  pub fn program(&self) -> &ProgramHandle<P>
  {
    &self.program
  }

  pub fn frame_index(&self) -> u64
  {
    self.frame_index
  }

  pub fn exit_requested(&self) -> bool
  {
    self.exit_requested
  }

  pub fn queue_command(&mut self, command: Command)
  {
    self.commands.push_back(command);
  }

  /// Records the latest drawable size; applied at the start of the next frame.
  pub fn queue_resize(&mut self, width: u32, height: u32)
  {
    self.viewport = Some((width, height));
  }

  /// Runs one frame against `surface`.
  pub fn frame<S>(&mut self, surface: &mut S) -> FrameStatus
  where
    S: FrameSurface<Program = P>,
  {
    self.apply_pending(surface);

    if self.exit_requested
    {
      return FrameStatus::Exit;
    }

    if let Err(err) = self.transform.recompute_and_bind(surface, &self.program)
    {
      log::error!("failed to bind PVM: {}", err);
    }

    let Some(mut frame) = surface.begin_frame()
    else
    {
      return FrameStatus::Skipped;
    };

    surface.draw(&mut frame, self.program.raw());

    let view = OverlayView { transform: &self.transform, frame_index: self.frame_index };
    let overlay_commands = surface.composite_overlay(&mut frame, &view);
    self.commands.extend(overlay_commands);

    surface.present(frame);
    self.frame_index += 1;

    FrameStatus::Presented
  }

  //
  // ──────────────────────────────────────────────────────────────
  //   Input application
  // ──────────────────────────────────────────────────────────────
  //

  fn apply_pending<S>(&mut self, surface: &mut S)
  where
    S: FrameSurface<Program = P>,
  {
    if let Some((width, height)) = self.viewport.take()
    {
      if self.transform.set_aspect_from_viewport(width, height)
      {
        log::debug!("viewport resized to {}x{}", width, height);
      }
    }

    while let Some(command) = self.commands.pop_front()
    {
      self.apply(surface, command);
    }
  }

  fn apply<S>(&mut self, surface: &mut S, command: Command)
  where
    S: FrameSurface<Program = P>,
  {
    let result = match command
    {
      Command::RotateModel { axis, angle } => self.transform.rotate_model(axis, angle),
      Command::ResetModel =>
      {
        self.transform.reset_model();
        Ok(())
      }
      Command::SetPerspective { fov_y, aspect, near, far } => self.transform.set_perspective(fov_y, aspect, near, far),
      Command::SetProjection { fov_y, near, far } =>
      {
        let aspect = self.transform.perspective().aspect();
        self.transform.set_perspective(fov_y, aspect, near, far)
      }
      Command::ReloadShaders =>
      {
        self.reload(surface);
        Ok(())
      }
      Command::Exit =>
      {
        self.exit_requested = true;
        Ok(())
      }
    };

    if let Err(err) = result
    {
      log::warn!("rejected {:?}: {}", command, err);
    }
  }

  /// Swaps in a freshly compiled program; on any failure the current one stays.
  fn reload<S>(&mut self, surface: &mut S)
  where
    S: FrameSurface<Program = P>,
  {
    let program = match load_and_compile_program(surface, &self.shaders.vertex, &self.shaders.fragment)
    {
      Ok(program) => program,
      Err(err) =>
      {
        log::error!("shader reload failed, keeping current program: {}", err);
        return;
      }
    };

    if let Err(err) = require_pvm(&program)
    {
      log::error!("shader reload failed, keeping current program: {}", err);
      return;
    }

    self.program = program;
    self.transform.invalidate();
    log::info!("shaders reloaded");
  }
}

fn require_pvm<P>(program: &ProgramHandle<P>) -> Result<(), TransformError>
{
  match program.uniform_location(PVM_UNIFORM)
  {
    Some(_) => Ok(()),
    None => Err(TransformError::MissingUniform(PVM_UNIFORM.to_owned())),
  }
}
