use egui_wgpu::{Renderer, RendererOptions, ScreenDescriptor};
use egui_winit::State;
use glam::Vec3;
use winit::event::WindowEvent;
use winit::window::Window;

use prism_core::config::PerspectiveSettings;
use prism_core::{Command, OverlayView};

/// Values being edited in the projection panel. They only reach the
/// transform when "Apply" is pressed.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ProjectionEdit
{
  fov_degrees: f32,
  near: f32,
  far: f32,
}

pub struct GuiRenderer
{
  context: egui::Context,
  state: State,
  renderer: Renderer,
  edit: ProjectionEdit,
  rotate_step: f32,
}

impl GuiRenderer
{
  pub fn new(
    device: &wgpu::Device,
    output_format: wgpu::TextureFormat,
    window: &Window,
    perspective: &PerspectiveSettings,
    rotate_step: f32,
  ) -> Self
  {
    let context = egui::Context::default();
    let state = State::new(
      context.clone(),
      egui::viewport::ViewportId::ROOT,
      window,
      Some(window.scale_factor() as f32),
      None,
      None,
    );

    // Drawn into the resolved swapchain image, so no MSAA and no depth.
    let renderer = Renderer::new(
      device,
      output_format,
      RendererOptions {
        depth_stencil_format: None,
        msaa_samples: 1,
        predictable_texture_filtering: false,
        dithering: true,
      },
    );

    let edit = ProjectionEdit { fov_degrees: perspective.fov_degrees, near: perspective.near, far: perspective.far };

    Self { context, state, renderer, edit, rotate_step }
  }

  /// Feeds a window event to egui. Returns true when egui consumed it.
  pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool
  {
    self.state.on_window_event(window, event).consumed
  }

  /// Runs the overlay UI for this frame.
  pub fn build(&mut self, window: &Window, view: &OverlayView<'_>) -> (egui::FullOutput, Vec<Command>)
  {
    let raw_input = self.state.take_egui_input(window);
    let edit = &mut self.edit;
    let rotate_step = self.rotate_step;
    let mut commands = Vec::new();

    let mut full_output = self.context.run(raw_input, |ctx| {
      transform_window(ctx, view, edit, rotate_step, &mut commands);
    });

    self.state.handle_platform_output(window, std::mem::take(&mut full_output.platform_output));

    (full_output, commands)
  }

  /// Records the overlay pass into `encoder`. Returns command buffers egui
  /// needs submitted ahead of it.
  pub fn render(
    &mut self,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    encoder: &mut wgpu::CommandEncoder,
    size_in_pixels: [u32; 2],
    view: &wgpu::TextureView,
    full_output: egui::FullOutput,
  ) -> Vec<wgpu::CommandBuffer>
  {
    let ppp = full_output.pixels_per_point;
    let screen_descriptor = ScreenDescriptor { size_in_pixels, pixels_per_point: ppp };

    for (id, delta) in full_output.textures_delta.set
    {
      self.renderer.update_texture(device, queue, id, &delta);
    }

    let tris = self.context.tessellate(full_output.shapes, ppp);
    let user_buffers = self.renderer.update_buffers(device, queue, encoder, &tris, &screen_descriptor);

    {
      let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Overlay Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
          view,
          resolve_target: None,
          ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
          depth_slice: None,
        })],
        ..Default::default()
      });

      // The pass is dropped at the end of this block, before `encoder` is used again.
      let mut pass = pass.forget_lifetime();

      self.renderer.render(&mut pass, &tris, &screen_descriptor);
    }

    for id in full_output.textures_delta.free
    {
      self.renderer.free_texture(&id);
    }

    user_buffers
  }
}

//
// ──────────────────────────────────────────────────────────────
//   UI
// ──────────────────────────────────────────────────────────────
//

fn transform_window(
  ctx: &egui::Context,
  view: &OverlayView<'_>,
  edit: &mut ProjectionEdit,
  rotate_step: f32,
  commands: &mut Vec<Command>,
)
{
  let perspective = view.transform.perspective();

  egui::Window::new("Transform").default_pos([12.0, 12.0]).resizable(false).show(ctx, |ui| {
    let dt = ui.input(|i| i.stable_dt);
    let fps = if dt > 0.0 { 1.0 / dt } else { 0.0 };
    ui.label(format!("{:.1} fps   frame {}", fps, view.frame_index));

    ui.separator();
    ui.label(format!(
      "fov {:.1}°   aspect {:.3}   near {:.2}   far {:.1}",
      perspective.fov_y().to_degrees(),
      perspective.aspect(),
      perspective.near(),
      perspective.far()
    ));

    ui.add(egui::Slider::new(&mut edit.fov_degrees, 1.0..=179.0).text("fov"));
    ui.horizontal(|ui| {
      ui.add(egui::DragValue::new(&mut edit.near).speed(0.05).prefix("near "));
      ui.add(egui::DragValue::new(&mut edit.far).speed(1.0).prefix("far "));
    });

    ui.horizontal(|ui| {
      if ui.button("Apply").clicked()
      {
        commands.push(edit.to_command());
      }

      if ui.button("Revert").clicked()
      {
        *edit = ProjectionEdit::from_current(view);
      }
    });

    ui.separator();
    ui.horizontal(|ui| {
      let rotations = [
        ("Y+", Vec3::Y, rotate_step),
        ("Y-", Vec3::Y, -rotate_step),
        ("X+", Vec3::X, rotate_step),
        ("X-", Vec3::X, -rotate_step),
      ];

      for (label, axis, angle) in rotations
      {
        if ui.button(label).clicked()
        {
          commands.push(Command::RotateModel { axis, angle });
        }
      }
    });

    ui.horizontal(|ui| {
      if ui.button("Reset model").clicked()
      {
        commands.push(Command::ResetModel);
      }

      if ui.button("Reload shaders").clicked()
      {
        commands.push(Command::ReloadShaders);
      }
    });

    ui.separator();
    ui.label("model");
    model_grid(ui, view);
  });
}

fn model_grid(ui: &mut egui::Ui, view: &OverlayView<'_>)
{
  // Rows of the matrix, read across the columns.
  let cols = view.transform.model().to_cols_array_2d();

  egui::Grid::new("model_matrix").striped(true).show(ui, |ui| {
    for row in 0..4
    {
      for col in &cols
      {
        ui.monospace(format!("{:>7.3}", col[row]));
      }
      ui.end_row();
    }
  });
}

impl ProjectionEdit
{
  fn from_current(view: &OverlayView<'_>) -> Self
  {
    let perspective = view.transform.perspective();
    Self { fov_degrees: perspective.fov_y().to_degrees(), near: perspective.near(), far: perspective.far() }
  }

  /// Leaves the aspect to the viewport, so a resize queued before this
  /// command is applied is not undone.
  fn to_command(self) -> Command
  {
    Command::SetProjection { fov_y: self.fov_degrees.to_radians(), near: self.near, far: self.far }
  }
}
