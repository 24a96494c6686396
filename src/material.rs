//! Render pipelines built from shader files.
//!
//! A [`Material`] pairs an immutable [`PipelineSpec`] with the pipeline
//! compiled from it. The pipeline is rebuilt wholesale by
//! [`refresh`](Material::refresh), which is how shader hot reload works: if the
//! new shaders fail to compile the previous pipeline stays in place.
//!
//! ```ignore
//! let spec = PipelineSpec::new("Geometry", "PositionColorTransform.vert", "SolidColor.frag", gpu.config.format)
//!     .vertex(VertexKind::PositionColor)
//!     .depth(DepthSpec::test_and_write());
//! let material = Material::new(&gpu, &shaders, spec, &[&camera.layout])?;
//! ```

use bytemuck::Pod;
use thiserror::Error;

use crate::gpu::{FrameError, GpuContext, GpuError};
use crate::mesh::Mesh;
use crate::shader::{ENTRY_POINT, ShaderError, ShaderLibrary, ShaderStage};
use crate::vertex::VertexKind;

#[derive(Debug, Error)]
pub enum MaterialError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error("shader '{name}' is a {actual:?} shader but was used as {expected:?}")]
    StageMismatch {
        name: String,
        expected: ShaderStage,
        actual: ShaderStage,
    },
    #[error(transparent)]
    Pipeline(#[from] GpuError),
}

/// Depth attachment state for a pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthSpec {
    pub format: wgpu::TextureFormat,
    pub write: bool,
    pub compare: wgpu::CompareFunction,
}

impl DepthSpec {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Standard depth testing that also writes depth.
    pub fn test_and_write() -> Self {
        Self {
            format: Self::FORMAT,
            write: true,
            compare: wgpu::CompareFunction::Less,
        }
    }

    /// Always passes and never writes, for backgrounds drawn first.
    pub fn background() -> Self {
        Self {
            format: Self::FORMAT,
            write: false,
            compare: wgpu::CompareFunction::Always,
        }
    }

    fn state(self) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: self.format,
            depth_write_enabled: self.write,
            depth_compare: self.compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// Everything needed to build a pipeline, apart from bind group layouts.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSpec {
    pub label: String,
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub vertex: VertexKind,
    pub topology: wgpu::PrimitiveTopology,
    pub cull_mode: Option<wgpu::Face>,
    pub blend: Option<wgpu::BlendState>,
    pub depth: Option<DepthSpec>,
    pub color_format: wgpu::TextureFormat,
}

impl PipelineSpec {
    /// A triangle list of [`VertexKind::PositionColor`] with alpha blending,
    /// back-face culling and no depth.
    pub fn new(
        label: impl Into<String>,
        vertex_shader: impl Into<String>,
        fragment_shader: impl Into<String>,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label: label.into(),
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            vertex: VertexKind::PositionColor,
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: Some(wgpu::Face::Back),
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            depth: None,
            color_format,
        }
    }

    pub fn vertex(mut self, vertex: VertexKind) -> Self {
        self.vertex = vertex;
        self
    }

    pub fn cull_mode(mut self, cull_mode: Option<wgpu::Face>) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn blend(mut self, blend: Option<wgpu::BlendState>) -> Self {
        self.blend = blend;
        self
    }

    pub fn depth(mut self, depth: DepthSpec) -> Self {
        self.depth = Some(depth);
        self
    }
}

/// A compiled pipeline plus the description it was built from.
pub struct Material {
    spec: PipelineSpec,
    layout: wgpu::PipelineLayout,
    pipeline: wgpu::RenderPipeline,
}

impl Material {
    /// Compiles both shaders and builds the pipeline.
    pub fn new(
        gpu: &GpuContext,
        shaders: &ShaderLibrary,
        spec: PipelineSpec,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
    ) -> Result<Self, MaterialError> {
        let layout_label = format!("{} Layout", spec.label);
        let layout = gpu.checked(&layout_label, |device| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&layout_label),
                bind_group_layouts,
                push_constant_ranges: &[],
            })
        })?;

        let pipeline = Self::build(gpu, shaders, &spec, &layout)?;
        log::info!(
            "built pipeline '{}' ({} + {})",
            spec.label,
            spec.vertex_shader,
            spec.fragment_shader
        );

        Ok(Self {
            spec,
            layout,
            pipeline,
        })
    }

    /// Re-reads the shaders and rebuilds the pipeline.
    ///
    /// On failure the current pipeline is kept and the error is returned.
    pub fn refresh(&mut self, gpu: &GpuContext, shaders: &ShaderLibrary) -> Result<(), MaterialError> {
        self.pipeline = Self::build(gpu, shaders, &self.spec, &self.layout)?;
        log::info!("reloaded pipeline '{}'", self.spec.label);
        Ok(())
    }

    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Binds the pipeline and bind groups, then draws `mesh` into an open pass.
    pub fn record<V: Pod>(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        mesh: &Mesh<V>,
        bind_groups: &[&wgpu::BindGroup],
    ) {
        render_pass.set_pipeline(&self.pipeline);
        for (index, bind_group) in bind_groups.iter().enumerate() {
            render_pass.set_bind_group(index as u32, *bind_group, &[]);
        }
        mesh.record(render_pass);
    }

    /// Draws `mesh` alone into the next swapchain image and presents it.
    ///
    /// The material must not have a depth state.
    pub fn draw<V: Pod>(
        &self,
        gpu: &GpuContext,
        mesh: &Mesh<V>,
        bind_groups: &[&wgpu::BindGroup],
        clear: wgpu::Color,
    ) -> Result<(), FrameError> {
        let mut frame = gpu.begin_frame(&self.spec.label)?;
        {
            let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&self.spec.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.record(&mut render_pass, mesh, bind_groups);
        }
        gpu.submit(frame);
        Ok(())
    }

    fn build(
        gpu: &GpuContext,
        shaders: &ShaderLibrary,
        spec: &PipelineSpec,
        layout: &wgpu::PipelineLayout,
    ) -> Result<wgpu::RenderPipeline, MaterialError> {
        let vertex = shaders.load(gpu, &spec.vertex_shader)?;
        expect_stage(&vertex.name, ShaderStage::Vertex, vertex.stage)?;
        let fragment = shaders.load(gpu, &spec.fragment_shader)?;
        expect_stage(&fragment.name, ShaderStage::Fragment, fragment.stage)?;

        let pipeline = gpu.checked(&spec.label, |device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&spec.label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some(ENTRY_POINT),
                    buffers: &[spec.vertex.layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some(ENTRY_POINT),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: spec.color_format,
                        blend: spec.blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: spec.topology,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: spec.cull_mode,
                    ..Default::default()
                },
                depth_stencil: spec.depth.map(DepthSpec::state),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        // Shader modules are only needed while the pipeline is built.
        Ok(pipeline)
    }
}

fn expect_stage(name: &str, expected: ShaderStage, actual: ShaderStage) -> Result<(), MaterialError> {
    if expected == actual {
        Ok(())
    } else {
        Err(MaterialError::StageMismatch {
            name: name.to_string(),
            expected,
            actual,
        })
    }
}
