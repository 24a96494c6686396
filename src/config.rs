use std::path::PathBuf;

use thiserror::Error;

use crate::camera::CameraMode;
use crate::logging::LoggingConfig;
use crate::scene::OutlineSettings;
use crate::shader::{SHADER_DIR_ENV, ShaderLibrary};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown argument '{0}' (expected --orbit or --direct)")]
    UnknownArgument(String),
}

/// Start-up configuration for the sandbox window.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Shader directory; [`ShaderLibrary::default_dir`] when unset.
    pub shader_dir: Option<PathBuf>,
    pub camera_mode: CameraMode,
    /// Render through the offscreen targets and outline pass.
    pub composite: bool,
    pub outline: OutlineSettings,
    pub clear_color: wgpu::Color,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Silhouette".to_string(),
            width: 640,
            height: 480,
            shader_dir: None,
            camera_mode: CameraMode::default(),
            composite: true,
            outline: OutlineSettings::default(),
            clear_color: wgpu::Color::BLACK,
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = Some(dir.into());
        self
    }

    pub fn camera_mode(mut self, mode: CameraMode) -> Self {
        self.camera_mode = mode;
        self
    }

    /// Manual mode moving `step` world units per key press.
    pub fn camera_step(mut self, step: f32) -> Self {
        self.camera_mode = CameraMode::Manual { step };
        self
    }

    pub fn composite(mut self, composite: bool) -> Self {
        self.composite = composite;
        self
    }

    pub fn outline(mut self, outline: OutlineSettings) -> Self {
        self.outline = outline;
        self
    }

    pub fn clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Applies the process arguments and environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    /// Applies command-line flags and environment lookups on top of `self`.
    ///
    /// `--orbit` switches the camera to orbit mode, `--direct` disables
    /// composition. [`SHADER_DIR_ENV`] overrides the shader directory.
    pub fn with_overrides(
        mut self,
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        for arg in args {
            match arg.as_str() {
                "--orbit" => self.camera_mode = CameraMode::default_orbit(),
                "--direct" => self.composite = false,
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        if let Some(dir) = env(SHADER_DIR_ENV).filter(|dir| !dir.is_empty()) {
            self.shader_dir = Some(PathBuf::from(dir));
        }

        Ok(self)
    }

    pub fn shader_library(&self) -> ShaderLibrary {
        match &self.shader_dir {
            Some(dir) => ShaderLibrary::new(dir),
            None => ShaderLibrary::new(ShaderLibrary::default_dir()),
        }
    }
}
