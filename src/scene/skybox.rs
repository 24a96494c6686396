//! A cube-textured background drawn first in the world pass.

use crate::camera::Camera;
use crate::geometry;
use crate::gpu::GpuContext;
use crate::material::{DepthSpec, Material, PipelineSpec};
use crate::mesh::Mesh;
use crate::shader::ShaderLibrary;
use crate::uniform::CameraBinding;
use crate::vertex::{PositionVertex, VertexKind};

use super::SceneError;

const FACE_SIZE: u32 = 64;
const FACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Clear color of each cube layer (+X, -X, +Y, -Y, +Z, -Z).
pub const FACE_CLEAR_COLORS: [wgpu::Color; 6] = [
    wgpu::Color { r: 1.0, g: 0.0, b: 0.0, a: 1.0 },
    wgpu::Color { r: 0.0, g: 1.0, b: 0.0, a: 1.0 },
    wgpu::Color { r: 0.0, g: 0.0, b: 1.0, a: 1.0 },
    wgpu::Color { r: 1.0, g: 1.0, b: 0.0, a: 1.0 },
    wgpu::Color { r: 1.0, g: 0.0, b: 1.0, a: 1.0 },
    wgpu::Color { r: 0.0, g: 1.0, b: 1.0, a: 1.0 },
];

pub struct Skybox {
    material: Material,
    mesh: Mesh<PositionVertex>,
    camera: CameraBinding,
    texture_bind_group: wgpu::BindGroup,
    _texture: wgpu::Texture,
}

impl Skybox {
    pub fn new(gpu: &GpuContext, shaders: &ShaderLibrary) -> Result<Self, SceneError> {
        let texture = create_face_texture(gpu)?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Skybox Cube View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Skybox Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let texture_layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skybox Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let texture_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skybox Texture Bind Group"),
            layout: &texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let camera = CameraBinding::new(gpu, "Skybox Camera")?;
        let spec = PipelineSpec::new("Skybox", "Skybox.vert", "Skybox.frag", gpu.config.format)
            .vertex(VertexKind::Position)
            .cull_mode(None)
            .blend(None)
            .depth(DepthSpec::background());
        let material = Material::new(gpu, shaders, spec, &[&camera.layout, &texture_layout])?;
        let mesh = geometry::skybox_cube().upload(gpu, "Skybox")?;

        Ok(Self {
            material,
            mesh,
            camera,
            texture_bind_group,
            _texture: texture,
        })
    }

    /// Writes the rotation-only view-projection for this frame.
    pub fn prepare(&self, gpu: &GpuContext, camera: &Camera) {
        self.camera.write(gpu, camera.sky_view_projection(gpu.aspect()));
    }

    pub fn record(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        self.material.record(
            render_pass,
            &self.mesh,
            &[&self.camera.bind_group, &self.texture_bind_group],
        );
    }

    pub fn refresh(&mut self, gpu: &GpuContext, shaders: &ShaderLibrary) -> Result<(), SceneError> {
        Ok(self.material.refresh(gpu, shaders)?)
    }
}

/// Creates the six-layer face texture and clears each layer to its color,
/// one render pass per layer.
fn create_face_texture(gpu: &GpuContext) -> Result<wgpu::Texture, SceneError> {
    let texture = gpu.checked("Skybox Texture", |device| {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Skybox Texture"),
            size: wgpu::Extent3d {
                width: FACE_SIZE,
                height: FACE_SIZE,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FACE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
    })?;

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Skybox Clear Encoder"),
        });

    for (layer, color) in FACE_CLEAR_COLORS.iter().enumerate() {
        let layer_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Skybox Face View"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_array_layer: layer as u32,
            array_layer_count: Some(1),
            ..Default::default()
        });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Skybox Face Clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &layer_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(*color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }

    gpu.queue.submit(std::iter::once(encoder.finish()));
    Ok(texture)
}
