//! Core GPU context and device management.
//!
//! [`GpuContext`] owns the wgpu device, queue, surface and surface configuration.
//! It is created once by the app driver and passed by reference to everything that
//! creates GPU resources or records commands; there is no global device state.
//! [`GpuContext::headless`] builds one without a window or surface.
//!
//! # Frames
//!
//! [`GpuContext::begin_frame`] acquires the next swapchain image together with a
//! command encoder. [`GpuContext::submit`] finishes the encoder, submits it and
//! presents the image. Acquisition failures come back as [`FrameError`] so the
//! caller can log and drop the frame.
//!
//! # Validated creation
//!
//! wgpu reports invalid resource descriptors through its error sink. Wrapping a
//! creation call in [`GpuContext::checked`] turns those reports into a
//! [`GpuError::Creation`] for that call instead of an uncaptured device error.

use std::sync::Arc;

use thiserror::Error;
use winit::window::Window;

/// Native shader bytecode formats the sandbox accepts, in priority order.
///
/// WGSL sources are translated by naga into whichever of these the active
/// backend consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderFormat {
    SpirV,
    Dxbc,
    Dxil,
    Msl,
}

impl ShaderFormat {
    /// Accepted formats, highest priority first.
    pub const PRIORITY: [ShaderFormat; 4] = [
        ShaderFormat::SpirV,
        ShaderFormat::Dxbc,
        ShaderFormat::Dxil,
        ShaderFormat::Msl,
    ];

    /// Formats a wgpu backend consumes natively.
    pub fn native_to(backend: wgpu::Backend) -> &'static [ShaderFormat] {
        match backend {
            wgpu::Backend::Vulkan => &[ShaderFormat::SpirV],
            wgpu::Backend::Dx12 => &[ShaderFormat::Dxil],
            wgpu::Backend::Metal => &[ShaderFormat::Msl],
            _ => &[],
        }
    }

    /// Picks the highest-priority accepted format out of `supported`.
    pub fn select(supported: &[ShaderFormat]) -> Option<ShaderFormat> {
        Self::PRIORITY
            .iter()
            .copied()
            .find(|format| supported.contains(format))
    }
}

/// Errors raised while bootstrapping the device or creating GPU resources.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported texture formats")]
    NoSurfaceFormat,
    #[error("backend {0:?} has no accepted native shader format")]
    UnsupportedBackend(wgpu::Backend),
    #[error("{what} creation failed: {message}")]
    Creation { what: String, message: String },
}

/// Why a frame could not be acquired.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The surface was lost or outdated and has been reconfigured.
    #[error("surface was reconfigured")]
    Reconfigured,
    /// Acquisition timed out; try again next frame.
    #[error("timed out acquiring the swapchain texture")]
    Timeout,
    /// The device ran out of memory.
    #[error("out of memory while acquiring the swapchain texture")]
    OutOfMemory,
    #[error("swapchain texture unavailable")]
    Other,
    /// The context has no surface to present to.
    #[error("context has no surface")]
    NoSurface,
}

impl FrameError {
    /// Returns true if rendering cannot continue.
    pub fn is_fatal(self) -> bool {
        matches!(self, FrameError::OutOfMemory | FrameError::NoSurface)
    }
}

/// A single acquired swapchain image plus the encoder recording into it.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// Core GPU context holding wgpu resources.
///
/// All fields are public to allow direct access to wgpu APIs when needed.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    ///
    /// `None` for a [headless](GpuContext::headless) context.
    pub surface: Option<wgpu::Surface<'static>>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
    /// Native shader format of the selected backend. `None` on the no-op backend.
    pub shader_format: Option<ShaderFormat>,
}

impl GpuContext {
    /// Create a new GPU context from a winit window.
    ///
    /// This performs all wgpu initialization:
    /// 1. Creates a wgpu instance with primary backends (Vulkan, Metal, DX12)
    /// 2. Creates a surface for the window
    /// 3. Requests a suitable GPU adapter and checks its shader format
    /// 4. Creates the logical device and command queue
    /// 5. Configures the surface with an sRGB format and Fifo present mode
    pub fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;
        let (adapter, device, queue, shader_format) = open_device(&instance, Some(&surface))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface: Some(surface),
            device,
            queue,
            config,
            shader_format,
        })
    }

    /// Create a context without a window on wgpu's no-op backend.
    ///
    /// Resources are created and validated as usual but no commands execute.
    /// The configuration describes a `width` x `height` sRGB target; frames
    /// cannot be acquired.
    pub fn headless(width: u32, height: u32) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::NOOP,
            backend_options: wgpu::BackendOptions {
                noop: wgpu::NoopBackendOptions { enable: true },
                ..Default::default()
            },
            ..Default::default()
        });
        let (_adapter, device, queue, shader_format) = open_device(&instance, None)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        Ok(Self {
            surface: None,
            device,
            queue,
            config,
            shader_format,
        })
    }

    /// Resize the surface to new dimensions.
    ///
    /// Ignores zero-sized dimensions (window minimize).
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            if let Some(surface) = &self.surface {
                surface.configure(&self.device, &self.config);
            }
        }
    }

    /// Returns the current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Returns the current aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    /// Runs `create` inside validation and out-of-memory error scopes.
    ///
    /// Any error the device reports while `create` runs is returned as
    /// [`GpuError::Creation`] tagged with `what`.
    pub fn checked<R>(
        &self,
        what: &str,
        create: impl FnOnce(&wgpu::Device) -> R,
    ) -> Result<R, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());

        match validation.or(oom) {
            Some(err) => Err(GpuError::Creation {
                what: what.to_string(),
                message: err.to_string(),
            }),
            None => Ok(value),
        }
    }

    /// Acquires the next swapchain image and a command encoder for it.
    ///
    /// Lost or outdated surfaces are reconfigured before the error is returned;
    /// the caller should skip this frame either way.
    pub fn begin_frame(&self, label: &str) -> Result<GpuFrame, FrameError> {
        let surface = self.surface.as_ref().ok_or(FrameError::NoSurface)?;
        let surface_texture = match surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.configure(&self.device, &self.config);
                return Err(FrameError::Reconfigured);
            }
            Err(wgpu::SurfaceError::Timeout) => return Err(FrameError::Timeout),
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(FrameError::OutOfMemory),
            Err(_) => return Err(FrameError::Other),
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the recorded commands and presents the frame.
    pub fn submit(&self, frame: GpuFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
    }
}

/// Requests an adapter and device from `instance` and checks the backend's
/// shader format. The no-op backend has no native format and is let through.
fn open_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue, Option<ShaderFormat>), GpuError> {
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: surface,
        force_fallback_adapter: false,
    }))?;

    let info = adapter.get_info();
    let shader_format = match info.backend {
        wgpu::Backend::Noop => None,
        backend => Some(
            ShaderFormat::select(ShaderFormat::native_to(backend))
                .ok_or(GpuError::UnsupportedBackend(backend))?,
        ),
    };
    log::info!(
        "using adapter '{}' ({:?}, shader format {:?})",
        info.name,
        info.backend,
        shader_format
    );

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("Silhouette Device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        memory_hints: Default::default(),
        trace: Default::default(),
        experimental_features: Default::default(),
    }))?;

    Ok((adapter, device, queue, shader_format))
}
