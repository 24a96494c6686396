//! # Silhouette
//!
//! A small wgpu rendering sandbox. It uploads geometry through staging
//! buffers, builds pipelines from WGSL files on disk, and composites an
//! offscreen world pass into the swapchain with a depth-based outline.
//!
//! ```no_run
//! use silhouette::{AppConfig, init_logging, run};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_env()?;
//!     init_logging(config.logging.clone());
//!     run(config)?;
//!     Ok(())
//! }
//! ```
//!
//! Every GPU-facing type takes the [`GpuContext`] it works with as an
//! argument; there is no global device state.

mod app;
mod buffer;
mod camera;
mod config;
mod geometry;
mod gpu;
mod input;
mod logging;
mod material;
pub mod math;
mod mesh;
pub mod scene;
mod shader;
mod uniform;
mod vertex;

pub use app::{AppError, Command, run};
pub use buffer::{BufferError, BufferUsage, StagedBuffer, Transfer};
pub use camera::{Camera, CameraController, CameraMode, MOVE_KEYS};
pub use config::{AppConfig, ConfigError};
pub use geometry::{RawGeometry, colored_scene, screen_quad, skybox_cube};
pub use gpu::{FrameError, GpuContext, GpuError, GpuFrame, ShaderFormat};
pub use input::Input;
pub use logging::{LoggingConfig, init_logging};
pub use material::{DepthSpec, Material, MaterialError, PipelineSpec};
pub use mesh::Mesh;
pub use scene::{CompositeScene, DirectScene, OutlineSettings, SceneError, SceneView};
pub use shader::{ENTRY_POINT, SHADER_DIR_ENV, Shader, ShaderError, ShaderLibrary, ShaderStage};
pub use uniform::{CameraBinding, CameraUniform, UniformBuffer};
pub use vertex::{PositionColorVertex, PositionUvVertex, PositionVertex, VertexKind};

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec3, Vec4};
