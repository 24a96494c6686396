//! The window and render loop.
//!
//! [`run`] opens the window, builds the GPU context and the scene once the
//! event loop resumes, then redraws continuously. Per frame the camera is
//! updated from the keyboard (or the orbit), the scene is rendered, and
//! per-frame input state is reset.
//!
//! | Key      | Action                                  |
//! |----------|-----------------------------------------|
//! | Escape   | Quit                                    |
//! | R        | Reload shaders and rebuild pipelines    |
//! | W / S    | Move along -Z / +Z                      |
//! | A / D    | Move along -X / +X                      |
//! | Z / X    | Move along +Y / -Y                      |

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::camera::{Camera, CameraController};
use crate::config::AppConfig;
use crate::gpu::{GpuContext, GpuError};
use crate::input::Input;
use crate::scene::{SceneError, SceneView};
use crate::shader::ShaderLibrary;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// What the main loop should do after a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    Reload,
}

impl Command {
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::Escape => Some(Command::Quit),
            KeyCode::KeyR => Some(Command::Reload),
            _ => None,
        }
    }
}

/// Opens the window and runs until it is closed or Escape is pressed.
///
/// Start-up failures are returned once the event loop has exited.
pub fn run(config: AppConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = SandboxApp::Pending { config };
    event_loop.run_app(&mut app)?;

    match app {
        SandboxApp::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

enum SandboxApp {
    Pending {
        config: AppConfig,
    },
    Running(Box<Running>),
    Failed(AppError),
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    shaders: ShaderLibrary,
    view: SceneView,
    camera: Camera,
    controller: CameraController,
    input: Input,
    last_frame: Instant,
}

impl Running {
    fn start(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self, AppError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = GpuContext::new(window.clone())?;
        let shaders = config.shader_library();
        log::info!("loading shaders from {}", shaders.dir().display());

        let view = SceneView::new(
            &gpu,
            &shaders,
            config.composite,
            config.outline,
            config.clear_color,
        )?;

        Ok(Self {
            window,
            gpu,
            shaders,
            view,
            camera: Camera::default(),
            controller: CameraController::new(config.camera_mode),
            input: Input::new(),
            last_frame: Instant::now(),
        })
    }

    fn reload(&mut self) {
        match self.view.refresh(&self.gpu, &self.shaders) {
            Ok(()) => log::info!("shaders reloaded"),
            Err(err) => log::error!("shader reload failed, keeping previous pipelines: {err}"),
        }
    }

    /// Renders one frame. Returns false if rendering cannot continue.
    fn redraw(&mut self) -> bool {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.controller.update(&mut self.camera, &self.input, dt);
        self.input.end_frame();

        match self.view.render(&self.gpu, &self.camera) {
            Ok(()) => true,
            Err(SceneError::Frame(err)) if !err.is_fatal() => {
                log::warn!("skipping frame: {err}");
                true
            }
            Err(err) => {
                log::error!("rendering stopped: {err}");
                false
            }
        }
    }
}

impl ApplicationHandler for SandboxApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let SandboxApp::Pending { config } = self else {
            return;
        };

        *self = match Running::start(event_loop, config) {
            Ok(running) => {
                running.window.request_redraw();
                SandboxApp::Running(Box::new(running))
            }
            Err(err) => {
                event_loop.exit();
                SandboxApp::Failed(err)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let SandboxApp::Running(app) = self else {
            return;
        };

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.gpu.resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match Command::from_key(key) {
                    Some(Command::Quit) => event_loop.exit(),
                    Some(Command::Reload) => app.reload(),
                    None => {}
                }
            }
            WindowEvent::RedrawRequested => {
                if app.redraw() {
                    app.window.request_redraw();
                } else {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_quits_and_r_reloads() {
        assert_eq!(Command::from_key(KeyCode::Escape), Some(Command::Quit));
        assert_eq!(Command::from_key(KeyCode::KeyR), Some(Command::Reload));
        assert_eq!(Command::from_key(KeyCode::KeyW), None);
    }
}
