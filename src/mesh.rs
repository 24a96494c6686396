//! Indexed meshes backed by two staged buffers.
//!
//! A [`Mesh`] pairs a vertex [`StagedBuffer`] with a `u16` index buffer. Both
//! are filled through the staging lifecycle when the mesh is created and can be
//! refilled later with [`Mesh::update`].
//!
//! ```ignore
//! let cube = Mesh::new(&gpu, "Cube", &vertices, &indices)?;
//!
//! // Inside an open render pass, after the pipeline is set:
//! cube.record(&mut render_pass);
//! ```

use bytemuck::Pod;

use crate::buffer::{BufferError, BufferUsage, StagedBuffer, Transfer};
use crate::gpu::GpuContext;

/// GPU-resident indexed geometry.
pub struct Mesh<V: Pod, D: Transfer = GpuContext> {
    vertices: StagedBuffer<V, D>,
    indices: StagedBuffer<u16, D>,
}

impl<V: Pod, D: Transfer> Mesh<V, D> {
    /// Creates the vertex and index buffers and uploads `vertices` and `indices`.
    pub fn new(
        device: &D,
        label: &str,
        vertices: &[V],
        indices: &[u16],
    ) -> Result<Self, BufferError> {
        let mut vertex_buffer = StagedBuffer::new(
            device,
            format!("{label} Vertices"),
            BufferUsage::Vertex,
            vertices.len(),
        )?;
        let mut index_buffer = StagedBuffer::new(
            device,
            format!("{label} Indices"),
            BufferUsage::Index,
            indices.len(),
        )?;

        vertex_buffer.write(device, vertices)?;
        index_buffer.write(device, indices)?;

        Ok(Self {
            vertices: vertex_buffer,
            indices: index_buffer,
        })
    }

    /// Replaces the mesh contents. Element counts must stay the same.
    pub fn update(&mut self, device: &D, vertices: &[V], indices: &[u16]) -> Result<(), BufferError> {
        self.vertices.write(device, vertices)?;
        self.indices.write(device, indices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.count()
    }

    pub fn index_count(&self) -> u32 {
        self.indices.count() as u32
    }

    pub fn vertices(&self) -> &StagedBuffer<V, D> {
        &self.vertices
    }

    pub fn indices(&self) -> &StagedBuffer<u16, D> {
        &self.indices
    }
}

impl<V: Pod> Mesh<V, GpuContext> {
    /// Binds the vertex and index buffers and issues an indexed draw.
    ///
    /// The caller must have set a pipeline whose vertex layout matches `V`.
    pub fn record(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertices.slice());
        render_pass.set_index_buffer(self.indices.slice(), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..self.index_count(), 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::host::HostDevice;
    use crate::vertex::PositionVertex;

    fn triangle() -> Vec<PositionVertex> {
        vec![
            PositionVertex::new([0.0, 1.0, 0.0]),
            PositionVertex::new([-1.0, -1.0, 0.0]),
            PositionVertex::new([1.0, -1.0, 0.0]),
        ]
    }

    #[test]
    fn new_uploads_both_buffers() {
        let device = HostDevice::default();
        let mesh = Mesh::new(&device, "Triangle", &triangle(), &[0, 1, 2]).unwrap();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(device.uploads.get(), 2);
        assert_eq!(device.live_staging.get(), 0);
        assert_eq!(mesh.indices().label(), "Triangle Indices");
        assert_eq!(mesh.vertices().usage(), BufferUsage::Vertex);

        let bytes = mesh.indices().buffer().bytes.borrow();
        let indices: Vec<u16> = bytemuck::pod_collect_to_vec(&bytes[..6]);
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn update_refills_buffers() {
        let device = HostDevice::default();
        let mut mesh = Mesh::new(&device, "Triangle", &triangle(), &[0, 1, 2]).unwrap();

        mesh.update(&device, &triangle(), &[2, 1, 0]).unwrap();

        let bytes = mesh.indices().buffer().bytes.borrow();
        let indices: Vec<u16> = bytemuck::pod_collect_to_vec(&bytes[..6]);
        assert_eq!(indices, vec![2, 1, 0]);
        assert_eq!(device.uploads.get(), 4);
    }

    #[test]
    fn update_rejects_changed_counts() {
        let device = HostDevice::default();
        let mut mesh = Mesh::new(&device, "Triangle", &triangle(), &[0, 1, 2]).unwrap();

        let err = mesh.update(&device, &triangle()[..2], &[0, 1, 2]).unwrap_err();
        assert!(matches!(err, BufferError::LengthMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn empty_geometry_is_rejected() {
        let device = HostDevice::default();
        let result = Mesh::<PositionVertex, _>::new(&device, "Nothing", &[], &[]);
        assert!(matches!(result, Err(BufferError::Empty(_))));
    }
}
