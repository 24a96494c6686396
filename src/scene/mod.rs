//! Scene rendering.
//!
//! Two ways to put the demo geometry on screen:
//!
//! - [`CompositeScene`] renders the world (skybox, then depth-tested geometry)
//!   into offscreen color and depth targets, then draws a full-screen quad into
//!   the swapchain that samples both and darkens depth edges. The passes and
//!   their order live in [`passes`].
//! - [`DirectScene`] draws the geometry straight into the swapchain.
//!
//! [`SceneView`] picks one of the two at start-up.

mod composite;
mod direct;
pub mod passes;
mod skybox;
mod targets;

use thiserror::Error;

use crate::buffer::BufferError;
use crate::camera::Camera;
use crate::gpu::{FrameError, GpuContext, GpuError};
use crate::material::MaterialError;
use crate::shader::ShaderLibrary;

pub use composite::{CompositeScene, OutlineUniform};
pub use direct::DirectScene;
pub use passes::{PASS_ORDER, PassOrderError, ScenePass, SceneTarget};
pub use skybox::Skybox;
pub use targets::{RenderTarget, SceneTargets};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("invalid pass order: {0}")]
    PassOrder(#[from] PassOrderError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Parameters of the depth outline drawn by the screen pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutlineSettings {
    /// Linear depth difference, in world units, that counts as an edge.
    pub threshold: f32,
    /// Distance to the sampled neighbours, in pixels.
    pub thickness: f32,
    /// Outline color, linear RGBA.
    pub color: [f32; 4],
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            thickness: 1.5,
            color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// The active rendering path.
pub enum SceneView {
    Composite(Box<CompositeScene>),
    Direct(DirectScene),
}

impl SceneView {
    pub fn new(
        gpu: &GpuContext,
        shaders: &ShaderLibrary,
        composite: bool,
        outline: OutlineSettings,
        clear: wgpu::Color,
    ) -> Result<Self, SceneError> {
        if composite {
            let scene = CompositeScene::new(gpu, shaders, outline, clear)?;
            Ok(SceneView::Composite(Box::new(scene)))
        } else {
            Ok(SceneView::Direct(DirectScene::new(gpu, shaders, clear)?))
        }
    }

    pub fn render(&mut self, gpu: &GpuContext, camera: &Camera) -> Result<(), SceneError> {
        match self {
            SceneView::Composite(scene) => scene.render(gpu, camera),
            SceneView::Direct(scene) => scene.render(gpu, camera),
        }
    }

    /// Reloads shaders and rebuilds every pipeline of the active view.
    pub fn refresh(&mut self, gpu: &GpuContext, shaders: &ShaderLibrary) -> Result<(), SceneError> {
        match self {
            SceneView::Composite(scene) => scene.refresh(gpu, shaders),
            SceneView::Direct(scene) => scene.refresh(gpu, shaders),
        }
    }
}
