//! The two-pass composited view: world into offscreen targets, then a
//! full-screen quad into the swapchain that outlines depth discontinuities.

use crate::camera::Camera;
use crate::geometry;
use crate::gpu::GpuContext;
use crate::material::{DepthSpec, Material, PipelineSpec};
use crate::mesh::Mesh;
use crate::shader::ShaderLibrary;
use crate::uniform::{CameraBinding, UniformBuffer};
use crate::vertex::{PositionColorVertex, PositionUvVertex, VertexKind};

use super::passes::{PASS_ORDER, ScenePass, check_order};
use super::skybox::Skybox;
use super::targets::SceneTargets;
use super::{OutlineSettings, SceneError};

/// Fragment uniform of the screen pass. Matches `Outline` in
/// `DepthOutline.frag.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OutlineUniform {
    pub near: f32,
    pub far: f32,
    /// Linear depth difference, in world units, that counts as an edge.
    pub threshold: f32,
    /// Neighbour distance in pixels.
    pub thickness: f32,
    pub resolution: [f32; 2],
    pub _pad: [f32; 2],
    pub color: [f32; 4],
}

impl OutlineUniform {
    pub fn new(camera: &Camera, settings: &OutlineSettings, width: u32, height: u32) -> Self {
        Self {
            near: camera.near,
            far: camera.far,
            threshold: settings.threshold,
            thickness: settings.thickness,
            resolution: [width as f32, height as f32],
            _pad: [0.0; 2],
            color: settings.color,
        }
    }
}

pub struct CompositeScene {
    targets: SceneTargets,
    camera: CameraBinding,
    skybox: Skybox,
    geometry: Material,
    geometry_mesh: Mesh<PositionColorVertex>,
    screen: Material,
    quad: Mesh<PositionUvVertex>,
    outline: UniformBuffer<OutlineUniform>,
    screen_layout: wgpu::BindGroupLayout,
    screen_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    settings: OutlineSettings,
    clear: wgpu::Color,
}

impl CompositeScene {
    /// Builds every pipeline and uploads the static meshes.
    pub fn new(
        gpu: &GpuContext,
        shaders: &ShaderLibrary,
        settings: OutlineSettings,
        clear: wgpu::Color,
    ) -> Result<Self, SceneError> {
        check_order(&PASS_ORDER)?;

        let targets = SceneTargets::new(gpu)?;
        let camera = CameraBinding::new(gpu, "Scene Camera")?;
        let skybox = Skybox::new(gpu, shaders)?;

        let geometry_spec = PipelineSpec::new(
            "Scene Geometry",
            "PositionColorTransform.vert",
            "SolidColor.frag",
            gpu.config.format,
        )
        .depth(DepthSpec::test_and_write());
        let geometry = Material::new(gpu, shaders, geometry_spec, &[&camera.layout])?;
        let geometry_mesh = geometry::colored_scene().upload(gpu, "Scene Geometry")?;

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Screen Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let outline = UniformBuffer::new(
            gpu,
            "Outline Uniforms",
            &OutlineUniform::new(&Camera::default(), &settings, gpu.width(), gpu.height()),
        )?;
        let screen_layout = create_screen_layout(gpu);
        let screen_bind_group =
            create_screen_bind_group(gpu, &screen_layout, &outline, &targets, &sampler);

        let screen_spec = PipelineSpec::new(
            "Screen Outline",
            "TexturedQuad.vert",
            "DepthOutline.frag",
            gpu.config.format,
        )
        .vertex(VertexKind::PositionUv)
        .cull_mode(None);
        let screen = Material::new(gpu, shaders, screen_spec, &[&screen_layout])?;
        let quad = geometry::screen_quad().upload(gpu, "Screen Quad")?;

        Ok(Self {
            targets,
            camera,
            skybox,
            geometry,
            geometry_mesh,
            screen,
            quad,
            outline,
            screen_layout,
            screen_bind_group,
            sampler,
            settings,
            clear,
        })
    }

    /// Encodes and presents one frame.
    ///
    /// Uniforms are written first; the passes then run in [`PASS_ORDER`].
    pub fn render(&mut self, gpu: &GpuContext, camera: &Camera) -> Result<(), SceneError> {
        if self.targets.ensure_size(gpu)? {
            self.screen_bind_group = create_screen_bind_group(
                gpu,
                &self.screen_layout,
                &self.outline,
                &self.targets,
                &self.sampler,
            );
        }

        self.camera.write(gpu, camera.view_projection(gpu.aspect()));
        self.skybox.prepare(gpu, camera);
        let (width, height) = self.targets.size();
        self.outline
            .write(gpu, &OutlineUniform::new(camera, &self.settings, width, height));

        let mut frame = gpu.begin_frame("Scene Encoder")?;
        for pass in PASS_ORDER {
            match pass {
                ScenePass::World => self.encode_world(&mut frame.encoder),
                ScenePass::Screen => self.encode_screen(&mut frame.encoder, &frame.view),
            }
        }
        gpu.submit(frame);
        Ok(())
    }

    /// Rebuilds every pipeline from the shader files.
    ///
    /// Every material is attempted; the first failure is returned and the
    /// failing materials keep their previous pipelines.
    pub fn refresh(&mut self, gpu: &GpuContext, shaders: &ShaderLibrary) -> Result<(), SceneError> {
        let results = [
            self.skybox.refresh(gpu, shaders),
            self.geometry.refresh(gpu, shaders).map_err(SceneError::from),
            self.screen.refresh(gpu, shaders).map_err(SceneError::from),
        ];
        results.into_iter().collect()
    }

    fn encode_world(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(ScenePass::World.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.targets.color.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.skybox.record(&mut render_pass);
        self.geometry
            .record(&mut render_pass, &self.geometry_mesh, &[&self.camera.bind_group]);
    }

    fn encode_screen(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(ScenePass::Screen.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.screen
            .record(&mut render_pass, &self.quad, &[&self.screen_bind_group]);
    }
}

fn create_screen_layout(gpu: &GpuContext) -> wgpu::BindGroupLayout {
    gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Screen Bind Group Layout"),
        entries: &[
            UniformBuffer::<OutlineUniform>::layout_entry(0, wgpu::ShaderStages::FRAGMENT),
            // Offscreen color
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            // Offscreen depth, read with textureLoad
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
        ],
    })
}

fn create_screen_bind_group(
    gpu: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    outline: &UniformBuffer<OutlineUniform>,
    targets: &SceneTargets,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Screen Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: outline.binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&targets.color.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&targets.depth.view),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_uniform_matches_wgsl_layout() {
        // f32 x4, vec2f + padding, vec4f aligned to 16
        assert_eq!(std::mem::size_of::<OutlineUniform>(), 48);
        assert_eq!(std::mem::offset_of!(OutlineUniform, resolution), 16);
        assert_eq!(std::mem::offset_of!(OutlineUniform, color), 32);
    }

    #[test]
    fn outline_uniform_takes_camera_planes() {
        let camera = Camera::default().with_clip(0.5, 250.0);
        let settings = OutlineSettings::default();
        let uniform = OutlineUniform::new(&camera, &settings, 640, 480);
        assert_eq!((uniform.near, uniform.far), (0.5, 250.0));
        assert_eq!(uniform.resolution, [640.0, 480.0]);
        assert_eq!(uniform.color, settings.color);
    }
}
