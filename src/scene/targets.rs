//! Offscreen render targets written by the world pass.

use crate::gpu::{GpuContext, GpuError};
use crate::material::DepthSpec;

/// A texture plus the view passes attach or sample it through.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(
        gpu: &GpuContext,
        label: &str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let texture = gpu.checked(label, |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self { texture, view })
    }
}

/// Offscreen color and depth sized to the surface.
///
/// The color target uses the surface format so the world pipelines can target
/// either. Both can be sampled by the screen pass.
pub struct SceneTargets {
    pub color: RenderTarget,
    pub depth: RenderTarget,
    width: u32,
    height: u32,
}

impl SceneTargets {
    pub fn new(gpu: &GpuContext) -> Result<Self, GpuError> {
        let (width, height) = (gpu.width(), gpu.height());
        Ok(Self {
            color: RenderTarget::new(gpu, "Scene Color", gpu.config.format, width, height)?,
            depth: RenderTarget::new(gpu, "Scene Depth", DepthSpec::FORMAT, width, height)?,
            width,
            height,
        })
    }

    /// Recreates both targets if the surface size changed.
    ///
    /// Returns true when the targets were recreated, so anything bound to the
    /// old views must be rebuilt.
    pub fn ensure_size(&mut self, gpu: &GpuContext) -> Result<bool, GpuError> {
        if self.width == gpu.width() && self.height == gpu.height() {
            return Ok(false);
        }
        *self = Self::new(gpu)?;
        log::debug!("scene targets resized to {}x{}", self.width, self.height);
        Ok(true)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
