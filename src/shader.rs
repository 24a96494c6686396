//! Shader sources loaded from disk.
//!
//! Shaders are WGSL files named `<name>.wgsl` inside the library directory.
//! The stage is taken from the name itself: it must contain `.vert` or `.frag`
//! (for example `PositionColorTransform.vert`). Both stages use the entry
//! point [`ENTRY_POINT`].

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::gpu::{GpuContext, GpuError};

/// Entry point every shader stage must define.
pub const ENTRY_POINT: &str = "main";

/// Environment variable that overrides the shader directory.
pub const SHADER_DIR_ENV: &str = "SILHOUETTE_SHADER_DIR";

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("cannot tell the stage of shader '{0}': name must contain .vert or .frag")]
    UnknownStage(String),
    #[error("failed to read shader {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("shader '{name}' failed to compile: {message}")]
    Compile { name: String, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Classifies a shader by its name.
    pub fn from_name(name: &str) -> Result<Self, ShaderError> {
        if name.contains(".vert") {
            Ok(ShaderStage::Vertex)
        } else if name.contains(".frag") {
            Ok(ShaderStage::Fragment)
        } else {
            Err(ShaderError::UnknownStage(name.to_string()))
        }
    }
}

/// A compiled shader module and the stage it was classified as.
pub struct Shader {
    pub name: String,
    pub stage: ShaderStage,
    pub module: wgpu::ShaderModule,
}

/// Locates and compiles shaders from one directory.
#[derive(Clone, Debug)]
pub struct ShaderLibrary {
    dir: PathBuf,
}

impl ShaderLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<executable dir>/shaders/source`, or the crate's own `shaders/source`
    /// when the executable directory has none.
    pub fn default_dir() -> PathBuf {
        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("shaders").join("source")));

        match beside_exe {
            Some(dir) if dir.is_dir() => dir,
            _ => Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("shaders")
                .join("source"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the source file for `name`.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.wgsl"))
    }

    /// Classifies `name` and reads its source.
    ///
    /// Unknown stages fail before the file system is touched.
    pub fn read(&self, name: &str) -> Result<(ShaderStage, String), ShaderError> {
        let stage = ShaderStage::from_name(name)?;
        let path = self.path_of(name);
        let source = std::fs::read_to_string(&path)
            .map_err(|source| ShaderError::Io { path, source })?;
        Ok((stage, source))
    }

    /// Reads and compiles `name`.
    pub fn load(&self, gpu: &GpuContext, name: &str) -> Result<Shader, ShaderError> {
        let (stage, source) = self.read(name)?;

        let module = gpu
            .checked(name, |device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(name),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
            })
            .map_err(|err| match err {
                GpuError::Creation { message, .. } => ShaderError::Compile {
                    name: name.to_string(),
                    message,
                },
                other => ShaderError::Compile {
                    name: name.to_string(),
                    message: other.to_string(),
                },
            })?;

        log::debug!("compiled {:?} shader '{}'", stage, name);
        Ok(Shader {
            name: name.to_string(),
            stage,
            module,
        })
    }
}
