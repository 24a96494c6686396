//! GPU-resident buffers filled through a staging buffer.
//!
//! A [`StagedBuffer`] owns one GPU-resident buffer of fixed element count.
//! Filling it is a three-step lifecycle:
//!
//! 1. [`open`](StagedBuffer::open) allocates a staging buffer and hands back a
//!    writable region of exactly `count` elements.
//! 2. The caller writes the region.
//! 3. [`upload`](StagedBuffer::upload) copies the staged bytes into the GPU
//!    buffer with a one-shot copy command and releases the staging allocation.
//!
//! The cycle can be repeated to refresh the buffer; every `open` allocates a
//! fresh staging buffer.
//!
//! ```ignore
//! let mut vertices = StagedBuffer::<PositionColorVertex>::new(&gpu, "Cube", BufferUsage::Vertex, 24)?;
//! vertices.open(&gpu)?.copy_from_slice(&cube_vertices);
//! vertices.upload(&gpu)?;
//! ```
//!
//! The device side is abstracted behind [`Transfer`] so the lifecycle is the
//! same whether it runs against wgpu or against host memory.

use bytemuck::Pod;
use thiserror::Error;

use crate::gpu::{GpuContext, GpuError};

/// What a staged buffer is bound as when drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

impl BufferUsage {
    fn wgpu_usages(self) -> wgpu::BufferUsages {
        let bind = match self {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        };
        bind | wgpu::BufferUsages::COPY_DST
    }
}

/// Errors from the staged buffer lifecycle.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("buffer '{0}' must hold at least one element")]
    Empty(String),
    #[error("buffer '{label}' holds {expected} elements but {actual} were supplied")]
    LengthMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },
    #[error("buffer '{0}' has no open staging region to upload")]
    NotOpen(String),
    #[error(transparent)]
    Device(#[from] GpuError),
}

/// Device operations needed to move bytes from a staging buffer into a
/// GPU-resident buffer.
pub trait Transfer {
    /// A GPU-resident buffer.
    type Buffer;
    /// A CPU-writable staging allocation.
    type Staging;

    fn create_buffer(
        &self,
        label: &str,
        usage: BufferUsage,
        size: u64,
    ) -> Result<Self::Buffer, GpuError>;

    fn create_staging(&self, label: &str, size: u64) -> Result<Self::Staging, GpuError>;

    /// Writes `bytes` into `staging`, copies them to the start of `dst` and
    /// submits the copy. `staging` is released once the copy is submitted.
    fn submit_upload(
        &self,
        staging: Self::Staging,
        bytes: &[u8],
        dst: &Self::Buffer,
    ) -> Result<(), GpuError>;
}

/// A staging allocation plus the elements written into it so far.
struct OpenRegion<T, S> {
    staging: S,
    elements: Vec<T>,
}

/// A GPU-resident buffer of `count` elements of `T`, filled via staging uploads.
pub struct StagedBuffer<T: Pod, D: Transfer = GpuContext> {
    label: String,
    usage: BufferUsage,
    count: usize,
    buffer: D::Buffer,
    open: Option<OpenRegion<T, D::Staging>>,
}

impl<T: Pod, D: Transfer> StagedBuffer<T, D> {
    /// Creates the GPU-resident buffer for `count` elements.
    pub fn new(
        device: &D,
        label: impl Into<String>,
        usage: BufferUsage,
        count: usize,
    ) -> Result<Self, BufferError> {
        let label = label.into();
        if count == 0 {
            return Err(BufferError::Empty(label));
        }

        let buffer = device.create_buffer(&label, usage, Self::byte_len(count))?;
        log::debug!(
            "created {:?} buffer '{}' ({} x {} bytes)",
            usage,
            label,
            count,
            std::mem::size_of::<T>()
        );

        Ok(Self {
            label,
            usage,
            count,
            buffer,
            open: None,
        })
    }

    /// Allocates a staging buffer and returns a zeroed region of `count` elements.
    ///
    /// The region is a host-side copy; its bytes are written into the staging
    /// buffer by [`upload`](Self::upload) right before the copy command is
    /// recorded. Opening an already open buffer discards the previous staging
    /// allocation along with anything written into it.
    pub fn open(&mut self, device: &D) -> Result<&mut [T], BufferError> {
        if self.open.take().is_some() {
            log::warn!(
                "buffer '{}' reopened before upload, discarding staged data",
                self.label
            );
        }

        let staging = device.create_staging(&self.label, Self::byte_len(self.count))?;
        let region = self.open.insert(OpenRegion {
            staging,
            elements: vec![T::zeroed(); self.count],
        });
        Ok(region.elements.as_mut_slice())
    }

    /// Copies the staged region into the GPU buffer and releases the staging buffer.
    ///
    /// Fails with [`BufferError::NotOpen`] if there is no open region.
    pub fn upload(&mut self, device: &D) -> Result<(), BufferError> {
        let region = self
            .open
            .take()
            .ok_or_else(|| BufferError::NotOpen(self.label.clone()))?;

        device.submit_upload(
            region.staging,
            bytemuck::cast_slice(&region.elements),
            &self.buffer,
        )?;
        log::debug!("uploaded {} elements to '{}'", self.count, self.label);
        Ok(())
    }

    /// Runs a full open / copy / upload cycle with `data`.
    pub fn write(&mut self, device: &D, data: &[T]) -> Result<(), BufferError> {
        if data.len() != self.count {
            return Err(BufferError::LengthMismatch {
                label: self.label.clone(),
                expected: self.count,
                actual: data.len(),
            });
        }
        self.open(device)?.copy_from_slice(data);
        self.upload(device)
    }

    /// Number of elements the buffer holds.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns true between `open` and `upload`.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// The GPU-resident buffer.
    pub fn buffer(&self) -> &D::Buffer {
        &self.buffer
    }

    /// Size of the element data in bytes (without copy-alignment padding).
    pub fn data_size(&self) -> u64 {
        (std::mem::size_of::<T>() * self.count) as u64
    }

    fn byte_len(count: usize) -> u64 {
        wgpu::util::align_to(
            (std::mem::size_of::<T>() * count) as u64,
            wgpu::COPY_BUFFER_ALIGNMENT,
        )
    }
}

impl<T: Pod> StagedBuffer<T, GpuContext> {
    /// A slice over the element data, for binding in a render pass.
    pub fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..self.data_size())
    }
}

impl Transfer for GpuContext {
    type Buffer = wgpu::Buffer;
    type Staging = wgpu::Buffer;

    fn create_buffer(
        &self,
        label: &str,
        usage: BufferUsage,
        size: u64,
    ) -> Result<wgpu::Buffer, GpuError> {
        self.checked(label, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: usage.wgpu_usages(),
                mapped_at_creation: false,
            })
        })
    }

    fn create_staging(&self, label: &str, size: u64) -> Result<wgpu::Buffer, GpuError> {
        let label = format!("{label} Staging");
        self.checked(&label, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&label),
                size,
                usage: wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: true,
            })
        })
    }

    fn submit_upload(
        &self,
        staging: wgpu::Buffer,
        bytes: &[u8],
        dst: &wgpu::Buffer,
    ) -> Result<(), GpuError> {
        {
            let mut mapped = staging.slice(..).get_mapped_range_mut();
            mapped[..bytes.len()].copy_from_slice(bytes);
        }
        staging.unmap();

        self.checked("Staging Upload", |device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Staging Upload Encoder"),
            });
            encoder.copy_buffer_to_buffer(&staging, 0, dst, 0, staging.size());
            self.queue.submit(std::iter::once(encoder.finish()));
        })
    }
}

#[cfg(test)]
pub(crate) mod host {
    //! A [`Transfer`] device backed by host memory.

    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    /// A "GPU" buffer whose bytes can be read back directly.
    #[derive(Clone, Debug, Default)]
    pub struct HostBuffer {
        pub usage: Option<BufferUsage>,
        pub bytes: Rc<RefCell<Vec<u8>>>,
    }

    #[derive(Debug)]
    pub struct HostStaging {
        pub size: u64,
        live: Rc<Cell<usize>>,
    }

    impl Drop for HostStaging {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    /// Records allocations so tests can check staging lifetimes.
    #[derive(Default)]
    pub struct HostDevice {
        pub live_staging: Rc<Cell<usize>>,
        pub staging_created: Cell<usize>,
        pub uploads: Cell<usize>,
        pub fail_staging: Cell<bool>,
    }

    impl Transfer for HostDevice {
        type Buffer = HostBuffer;
        type Staging = HostStaging;

        fn create_buffer(
            &self,
            _label: &str,
            usage: BufferUsage,
            size: u64,
        ) -> Result<HostBuffer, GpuError> {
            Ok(HostBuffer {
                usage: Some(usage),
                bytes: Rc::new(RefCell::new(vec![0xAA; size as usize])),
            })
        }

        fn create_staging(&self, label: &str, size: u64) -> Result<HostStaging, GpuError> {
            if self.fail_staging.get() {
                return Err(GpuError::Creation {
                    what: label.to_string(),
                    message: "staging allocation refused".to_string(),
                });
            }
            self.staging_created.set(self.staging_created.get() + 1);
            self.live_staging.set(self.live_staging.get() + 1);
            Ok(HostStaging {
                size,
                live: Rc::clone(&self.live_staging),
            })
        }

        fn submit_upload(
            &self,
            staging: HostStaging,
            bytes: &[u8],
            dst: &HostBuffer,
        ) -> Result<(), GpuError> {
            assert!(bytes.len() as u64 <= staging.size);
            dst.bytes.borrow_mut()[..bytes.len()].copy_from_slice(bytes);
            self.uploads.set(self.uploads.get() + 1);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::host::{HostBuffer, HostDevice};
    use super::*;
    use crate::vertex::PositionColorVertex;

    fn read_back<T: Pod>(buffer: &HostBuffer, count: usize) -> Vec<T> {
        let bytes = buffer.bytes.borrow();
        bytemuck::pod_collect_to_vec(&bytes[..std::mem::size_of::<T>() * count])
    }

    #[test]
    fn open_returns_region_for_exactly_count_elements() {
        let device = HostDevice::default();
        let mut buffer =
            StagedBuffer::<PositionColorVertex, _>::new(&device, "Cube", BufferUsage::Vertex, 24)
                .unwrap();

        let region = buffer.open(&device).unwrap();
        assert_eq!(region.len(), 24);
        assert!(region.iter().all(|v| *v == PositionColorVertex::zeroed()));
        assert!(buffer.is_open());
        assert_eq!(device.live_staging.get(), 1);
    }

    #[test]
    fn upload_round_trips_elements_in_order() {
        let device = HostDevice::default();
        let mut buffer =
            StagedBuffer::<PositionColorVertex, _>::new(&device, "Cube", BufferUsage::Vertex, 24)
                .unwrap();

        let expected: Vec<PositionColorVertex> = (0..24)
            .map(|i| {
                PositionColorVertex::new([i as f32, -(i as f32), 0.5 * i as f32], [i as u8, 0, 255, 255])
            })
            .collect();

        buffer.open(&device).unwrap().copy_from_slice(&expected);
        buffer.upload(&device).unwrap();

        assert_eq!(read_back::<PositionColorVertex>(buffer.buffer(), 24), expected);
        assert!(!buffer.is_open());
        assert_eq!(device.live_staging.get(), 0);
        assert_eq!(buffer.buffer().usage, Some(BufferUsage::Vertex));
    }

    #[test]
    fn upload_without_open_is_an_error() {
        let device = HostDevice::default();
        let mut buffer =
            StagedBuffer::<u16, _>::new(&device, "Indices", BufferUsage::Index, 6).unwrap();

        assert!(matches!(
            buffer.upload(&device),
            Err(BufferError::NotOpen(label)) if label == "Indices"
        ));
        assert_eq!(device.uploads.get(), 0);
    }

    #[test]
    fn second_upload_without_reopen_fails_and_keeps_data() {
        let device = HostDevice::default();
        let mut buffer =
            StagedBuffer::<u16, _>::new(&device, "Indices", BufferUsage::Index, 6).unwrap();

        buffer.write(&device, &[0, 1, 2, 2, 3, 0]).unwrap();
        assert!(matches!(buffer.upload(&device), Err(BufferError::NotOpen(_))));
        assert_eq!(read_back::<u16>(buffer.buffer(), 6), vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(device.uploads.get(), 1);
    }

    #[test]
    fn reopening_discards_previous_staging() {
        let device = HostDevice::default();
        let mut buffer = StagedBuffer::<u32, _>::new(&device, "Data", BufferUsage::Vertex, 3).unwrap();

        buffer.open(&device).unwrap().copy_from_slice(&[7, 8, 9]);
        let region = buffer.open(&device).unwrap();
        assert_eq!(region, &[0, 0, 0]);
        region[1] = 5;

        assert_eq!(device.staging_created.get(), 2);
        assert_eq!(device.live_staging.get(), 1);

        buffer.upload(&device).unwrap();
        assert_eq!(read_back::<u32>(buffer.buffer(), 3), vec![0, 5, 0]);
    }

    #[test]
    fn buffer_can_be_refreshed_with_new_data() {
        let device = HostDevice::default();
        let mut buffer = StagedBuffer::<u32, _>::new(&device, "Data", BufferUsage::Vertex, 2).unwrap();

        buffer.write(&device, &[1, 2]).unwrap();
        buffer.write(&device, &[3, 4]).unwrap();

        assert_eq!(read_back::<u32>(buffer.buffer(), 2), vec![3, 4]);
        assert_eq!(device.staging_created.get(), 2);
        assert_eq!(device.live_staging.get(), 0);
    }

    #[test]
    fn write_rejects_wrong_length() {
        let device = HostDevice::default();
        let mut buffer = StagedBuffer::<u16, _>::new(&device, "Indices", BufferUsage::Index, 6).unwrap();

        let err = buffer.write(&device, &[0, 1, 2]).unwrap_err();
        assert!(matches!(
            err,
            BufferError::LengthMismatch { expected: 6, actual: 3, .. }
        ));
        assert!(!buffer.is_open());
        assert_eq!(device.staging_created.get(), 0);
    }

    #[test]
    fn empty_buffers_are_rejected() {
        let device = HostDevice::default();
        let result = StagedBuffer::<u16, _>::new(&device, "Nothing", BufferUsage::Index, 0);
        assert!(matches!(result, Err(BufferError::Empty(_))));
    }

    #[test]
    fn staging_failure_surfaces_from_open() {
        let device = HostDevice::default();
        let mut buffer = StagedBuffer::<u16, _>::new(&device, "Indices", BufferUsage::Index, 6).unwrap();
        device.fail_staging.set(true);

        assert!(matches!(buffer.open(&device), Err(BufferError::Device(_))));
        assert!(!buffer.is_open());
    }

    #[test]
    fn sizes_are_padded_to_copy_alignment() {
        let device = HostDevice::default();
        let buffer = StagedBuffer::<u16, _>::new(&device, "Odd", BufferUsage::Index, 3).unwrap();
        assert_eq!(buffer.data_size(), 6);
        assert_eq!(buffer.buffer().bytes.borrow().len(), 8);
    }

    #[test]
    fn wgpu_staging_path_uploads_and_rejects_stray_upload() {
        let gpu = GpuContext::headless(64, 64).unwrap();
        let mut vertices =
            StagedBuffer::<PositionColorVertex>::new(&gpu, "Cube", BufferUsage::Vertex, 24).unwrap();
        assert_eq!(vertices.buffer().size(), 24 * 16);

        let data = vec![PositionColorVertex::new([1.0, 2.0, 3.0], [255, 0, 0, 255]); 24];
        vertices.write(&gpu, &data).unwrap();
        assert!(!vertices.is_open());
        assert!(matches!(vertices.upload(&gpu), Err(BufferError::NotOpen(_))));
    }

    #[test]
    fn wgpu_index_buffer_is_padded_and_refillable() {
        let gpu = GpuContext::headless(64, 64).unwrap();
        let mut indices = StagedBuffer::<u16>::new(&gpu, "Odd", BufferUsage::Index, 3).unwrap();
        assert_eq!(indices.buffer().size(), 8);

        indices.open(&gpu).unwrap().copy_from_slice(&[0, 1, 2]);
        indices.upload(&gpu).unwrap();
        indices.write(&gpu, &[2, 1, 0]).unwrap();
    }
}
