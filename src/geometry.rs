//! Static demo geometry.
//!
//! | Builder           | Vertex                  | Vertices | Indices |
//! |-------------------|-------------------------|----------|---------|
//! | [`colored_scene`] | [`PositionColorVertex`] | 28       | 42      |
//! | [`skybox_cube`]   | [`PositionVertex`]      | 24       | 36      |
//! | [`screen_quad`]   | [`PositionUvVertex`]    | 4        | 6       |
//!
//! Faces are wound counter-clockwise when seen from outside.

use bytemuck::Pod;
use glam::Vec3;

use crate::buffer::{BufferError, Transfer};
use crate::mesh::Mesh;
use crate::vertex::{PositionColorVertex, PositionUvVertex, PositionVertex};

/// Raw vertex and index data, not yet on the GPU.
#[derive(Clone, Debug, PartialEq)]
pub struct RawGeometry<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u16>,
}

impl<V: Pod> RawGeometry<V> {
    /// Upload to a new [`Mesh`].
    pub fn upload<D: Transfer>(&self, device: &D, label: &str) -> Result<Mesh<V, D>, BufferError> {
        Mesh::new(device, label, &self.vertices, &self.indices)
    }
}

impl<V> RawGeometry<V> {
    fn with_capacity(faces: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(faces * 4),
            indices: Vec::with_capacity(faces * 6),
        }
    }

    /// Appends a quad from four counter-clockwise corners.
    fn push_quad(&mut self, corners: [V; 4]) {
        let base = self.vertices.len() as u16;
        self.vertices.extend(corners);
        self.indices
            .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Cube faces as (normal, right, up), with right x up = normal.
const FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
];

/// One color per cube face, in [`FACES`] order.
pub const FACE_COLORS: [[u8; 4]; 6] = [
    [255, 0, 0, 255],
    [0, 255, 0, 255],
    [0, 0, 255, 255],
    [255, 255, 0, 255],
    [255, 0, 255, 255],
    [0, 255, 255, 255],
];

const FLOOR_COLOR: [u8; 4] = [96, 96, 104, 255];

pub const CUBE_HALF_EXTENT: f32 = 5.0;
pub const FLOOR_HALF_EXTENT: f32 = 20.0;
pub const SKYBOX_HALF_EXTENT: f32 = 10.0;

fn quad_corners(center: Vec3, right: Vec3, up: Vec3) -> [Vec3; 4] {
    [
        center - right - up,
        center + right - up,
        center + right + up,
        center - right + up,
    ]
}

fn cube_faces(half: f32) -> impl Iterator<Item = [Vec3; 4]> {
    FACES
        .iter()
        .map(move |&(normal, right, up)| quad_corners(normal * half, right * half, up * half))
}

/// A cube with a solid color per face, standing on a floor quad.
pub fn colored_scene() -> RawGeometry<PositionColorVertex> {
    let mut geometry = RawGeometry::with_capacity(7);

    // Floor first so it is painted over when drawn without a depth buffer.
    let floor = quad_corners(
        Vec3::new(0.0, -CUBE_HALF_EXTENT, 0.0),
        Vec3::X * FLOOR_HALF_EXTENT,
        Vec3::NEG_Z * FLOOR_HALF_EXTENT,
    );
    geometry.push_quad(floor.map(|p| PositionColorVertex::new(p.to_array(), FLOOR_COLOR)));

    for (corners, color) in cube_faces(CUBE_HALF_EXTENT).zip(FACE_COLORS) {
        geometry.push_quad(corners.map(|p| PositionColorVertex::new(p.to_array(), color)));
    }

    geometry
}

/// A cube centered on the origin, sampled as a cube texture from the inside.
pub fn skybox_cube() -> RawGeometry<PositionVertex> {
    let mut geometry = RawGeometry::with_capacity(6);
    for corners in cube_faces(SKYBOX_HALF_EXTENT) {
        geometry.push_quad(corners.map(|p| PositionVertex::new(p.to_array())));
    }
    geometry
}

/// A quad covering clip space, with uv (0, 0) at the top-left.
pub fn screen_quad() -> RawGeometry<PositionUvVertex> {
    let mut geometry = RawGeometry::with_capacity(1);
    geometry.push_quad([
        PositionUvVertex::new([-1.0, -1.0, 0.0], [0.0, 1.0]),
        PositionUvVertex::new([1.0, -1.0, 0.0], [1.0, 1.0]),
        PositionUvVertex::new([1.0, 1.0, 0.0], [1.0, 0.0]),
        PositionUvVertex::new([-1.0, 1.0, 0.0], [0.0, 0.0]),
    ]);
    geometry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_indices_in_range<V>(geometry: &RawGeometry<V>) {
        let len = geometry.vertices.len() as u16;
        assert!(geometry.indices.iter().all(|&i| i < len));
        assert_eq!(geometry.indices.len() % 3, 0);
    }

    #[test]
    fn faces_have_right_handed_tangents() {
        for (normal, right, up) in FACES {
            assert_eq!(right.cross(up), normal);
        }
    }

    #[test]
    fn colored_scene_counts() {
        let scene = colored_scene();
        assert_eq!(scene.vertices.len(), 28);
        assert_eq!(scene.indices.len(), 42);
        assert_indices_in_range(&scene);
    }

    #[test]
    fn skybox_cube_counts() {
        let cube = skybox_cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert_indices_in_range(&cube);
    }

    #[test]
    fn screen_quad_counts() {
        let quad = screen_quad();
        assert_eq!(quad.vertices.len(), 4);
        assert_eq!(quad.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn cube_triangles_face_outward() {
        let scene = colored_scene();
        // The floor quad comes first; the cube follows.
        for tri in scene.indices[6..].chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| Vec3::from_array(scene.vertices[i as usize].position));
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0, "inward triangle {tri:?}");
        }
    }

    #[test]
    fn floor_faces_up_below_the_cube() {
        let scene = colored_scene();
        let floor = &scene.vertices[..4];
        assert!(floor.iter().all(|v| v.position[1] == -CUBE_HALF_EXTENT));
        assert!(floor.iter().all(|v| v.color == FLOOR_COLOR));

        let [a, b, c] = [0, 1, 2].map(|i| Vec3::from_array(floor[i].position));
        assert!((b - a).cross(c - a).y > 0.0);
    }

    #[test]
    fn quad_covers_clip_space() {
        let quad = screen_quad();
        for v in &quad.vertices {
            assert_eq!(v.position[0].abs(), 1.0);
            assert_eq!(v.position[1].abs(), 1.0);
            // uv v runs opposite to clip-space y
            assert_eq!(v.uv[1], (1.0 - v.position[1]) * 0.5);
        }
    }
}
