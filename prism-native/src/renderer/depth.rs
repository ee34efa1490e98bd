use wgpu::*;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Size-dependent attachments: the depth buffer and, with MSAA, the
/// multisampled colour target that resolves into the swapchain image.
pub struct RenderTargets
{
  pub depth_view: TextureView,
  pub msaa_view: Option<TextureView>,
}

impl RenderTargets
{
  pub fn create(device: &Device, config: &SurfaceConfiguration, sample_count: u32) -> Self
  {
    let size = Extent3d { width: config.width, height: config.height, depth_or_array_layers: 1 };

    let depth = device.create_texture(&TextureDescriptor {
      label: Some("Depth Texture"),
      size,
      mip_level_count: 1,
      sample_count,
      dimension: TextureDimension::D2,
      format: DEPTH_FORMAT,
      usage: TextureUsages::RENDER_ATTACHMENT,
      view_formats: &[],
    });

    let msaa_view = (sample_count > 1).then(|| {
      device
        .create_texture(&TextureDescriptor {
          label: Some("MSAA Colour Texture"),
          size,
          mip_level_count: 1,
          sample_count,
          dimension: TextureDimension::D2,
          format: config.format,
          usage: TextureUsages::RENDER_ATTACHMENT,
          view_formats: &[],
        })
        .create_view(&TextureViewDescriptor::default())
    });

    Self { depth_view: depth.create_view(&TextureViewDescriptor::default()), msaa_view }
  }

  /// Colour attachment and resolve target for a pass that renders into
  /// `surface_view`.
  pub fn color_target<'a>(&'a self, surface_view: &'a TextureView) -> (&'a TextureView, Option<&'a TextureView>)
  {
    match &self.msaa_view
    {
      Some(msaa) => (msaa, Some(surface_view)),
      None => (surface_view, None),
    }
  }
}
