//! Vertex formats and their GPU layouts.
//!
//! | Vertex                  | Attribute | Format    | Offset | Location |
//! |-------------------------|-----------|-----------|--------|----------|
//! | [`PositionColorVertex`] | position  | Float32x3 | 0      | 0        |
//! |                         | color     | Unorm8x4  | 12     | 1        |
//! | [`PositionVertex`]      | position  | Float32x3 | 0      | 0        |
//! | [`PositionUvVertex`]    | position  | Float32x3 | 0      | 0        |
//! |                         | uv        | Float32x2 | 12     | 1        |

/// A position with an 8-bit RGBA color, used for world geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PositionColorVertex {
    pub position: [f32; 3],
    pub color: [u8; 4],
}

impl PositionColorVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<PositionColorVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Unorm8x4,
            },
        ],
    };

    pub fn new(position: [f32; 3], color: [u8; 4]) -> Self {
        Self { position, color }
    }
}

/// A bare position, used for the skybox cube.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PositionVertex {
    pub position: [f32; 3],
}

impl PositionVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<PositionVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    };

    pub fn new(position: [f32; 3]) -> Self {
        Self { position }
    }
}

/// A position with texture coordinates, used for the screen quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PositionUvVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl PositionUvVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<PositionUvVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }
}

/// Vertex layouts a pipeline can be built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexKind {
    PositionColor,
    Position,
    PositionUv,
}

impl VertexKind {
    pub fn layout(self) -> wgpu::VertexBufferLayout<'static> {
        match self {
            VertexKind::PositionColor => PositionColorVertex::LAYOUT,
            VertexKind::Position => PositionVertex::LAYOUT,
            VertexKind::PositionUv => PositionUvVertex::LAYOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_match_struct_sizes() {
        assert_eq!(PositionColorVertex::LAYOUT.array_stride, 16);
        assert_eq!(PositionVertex::LAYOUT.array_stride, 12);
        assert_eq!(PositionUvVertex::LAYOUT.array_stride, 20);
    }

    #[test]
    fn attributes_fit_inside_stride() {
        for kind in [VertexKind::PositionColor, VertexKind::Position, VertexKind::PositionUv] {
            let layout = kind.layout();
            for attr in layout.attributes {
                assert!(attr.offset + attr.format.size() <= layout.array_stride, "{kind:?}");
            }
        }
    }
}
