use std::marker::PhantomData;

use bytemuck::Pod;

use crate::gpu::{GpuContext, GpuError};

/// A uniform buffer holding one `T`, rewritten through the queue.
pub struct UniformBuffer<T: Pod> {
    buffer: wgpu::Buffer,
    _marker: PhantomData<T>,
}

impl<T: Pod> UniformBuffer<T> {
    pub fn new(gpu: &GpuContext, label: &str, initial: &T) -> Result<Self, GpuError> {
        let buffer = gpu.checked(label, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<T>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;
        gpu.queue.write_buffer(&buffer, 0, bytemuck::bytes_of(initial));

        Ok(Self {
            buffer,
            _marker: PhantomData,
        })
    }

    /// Queues a write of `value`; it lands before the next submission.
    pub fn write(&self, gpu: &GpuContext, value: &T) {
        gpu.queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }

    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    /// Layout entry for binding this buffer at `binding`.
    pub fn layout_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
            },
            count: None,
        }
    }
}

/// The combined view-projection matrix, as read by the world vertex shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new(view_proj: glam::Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
        }
    }
}

/// Bind group layout plus bind group for a single [`CameraUniform`].
pub struct CameraBinding {
    pub uniform: UniformBuffer<CameraUniform>,
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
}

impl CameraBinding {
    pub fn new(gpu: &GpuContext, label: &str) -> Result<Self, GpuError> {
        let uniform = UniformBuffer::new(gpu, label, &CameraUniform::new(glam::Mat4::IDENTITY))?;

        let layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[UniformBuffer::<CameraUniform>::layout_entry(
                0,
                wgpu::ShaderStages::VERTEX,
            )],
        });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.binding(),
            }],
        });

        Ok(Self {
            uniform,
            layout,
            bind_group,
        })
    }

    pub fn write(&self, gpu: &GpuContext, view_proj: glam::Mat4) {
        self.uniform.write(gpu, &CameraUniform::new(view_proj));
    }
}
