use crate::camera::Camera;
use crate::geometry;
use crate::gpu::GpuContext;
use crate::material::{Material, PipelineSpec};
use crate::mesh::Mesh;
use crate::shader::ShaderLibrary;
use crate::uniform::CameraBinding;
use crate::vertex::PositionColorVertex;

use super::SceneError;

/// The colored geometry drawn straight into the swapchain, with no depth
/// buffer and no outline.
pub struct DirectScene {
    camera: CameraBinding,
    material: Material,
    mesh: Mesh<PositionColorVertex>,
    clear: wgpu::Color,
}

impl DirectScene {
    pub fn new(gpu: &GpuContext, shaders: &ShaderLibrary, clear: wgpu::Color) -> Result<Self, SceneError> {
        let camera = CameraBinding::new(gpu, "Direct Camera")?;
        let spec = PipelineSpec::new(
            "Direct Geometry",
            "PositionColorTransform.vert",
            "SolidColor.frag",
            gpu.config.format,
        );
        let material = Material::new(gpu, shaders, spec, &[&camera.layout])?;
        let mesh = geometry::colored_scene().upload(gpu, "Direct Geometry")?;

        Ok(Self {
            camera,
            material,
            mesh,
            clear,
        })
    }

    pub fn render(&mut self, gpu: &GpuContext, camera: &Camera) -> Result<(), SceneError> {
        self.camera.write(gpu, camera.view_projection(gpu.aspect()));
        self.material
            .draw(gpu, &self.mesh, &[&self.camera.bind_group], self.clear)?;
        Ok(())
    }

    pub fn refresh(&mut self, gpu: &GpuContext, shaders: &ShaderLibrary) -> Result<(), SceneError> {
        Ok(self.material.refresh(gpu, shaders)?)
    }
}
