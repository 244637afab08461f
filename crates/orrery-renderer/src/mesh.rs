//! The hard-coded mesh and its vertex layout.

use ash::vk;
use bytemuck::{Pod, Zeroable};

/// Interleaved vertex: 2D position + RGB color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 3],
}

impl Vertex {
    /// Vertex buffer binding description (binding 0, per-vertex rate).
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(std::mem::size_of::<Vertex>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
    }

    /// Attribute descriptions: location 0 = position, location 1 = color.
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(0)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(0),
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(1)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(std::mem::size_of::<[f32; 2]>() as u32),
        ]
    }
}

/// The quad: one vertex per corner, colored so interpolation is visible.
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex { position: [-0.5, -0.5], color: [1.0, 0.0, 0.0] },
    Vertex { position: [0.5, -0.5], color: [0.0, 1.0, 0.0] },
    Vertex { position: [0.5, 0.5], color: [0.0, 0.0, 1.0] },
    Vertex { position: [-0.5, 0.5], color: [1.0, 1.0, 1.0] },
];

/// Two counter-clockwise triangles covering the quad.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================
    // Vertex layout
    // ============================================================

    #[test]
    fn test_vertex_stride_is_packed() {
        // 2 + 3 floats, no padding.
        assert_eq!(std::mem::size_of::<Vertex>(), 20);
        assert_eq!(Vertex::binding_description().stride, 20);
    }

    #[test]
    fn test_binding_description() {
        let binding = Vertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn test_attribute_locations_and_offsets() {
        let attrs = Vertex::attribute_descriptions();
        assert_eq!(attrs[0].location, 0);
        assert_eq!(attrs[0].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[1].location, 1);
        assert_eq!(attrs[1].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[1].offset, 8);
    }

    #[test]
    fn test_vertex_is_pod() {
        let bytes = bytemuck::bytes_of(&QUAD_VERTICES[0]);
        assert_eq!(bytes.len(), 20);
        let back: &Vertex = bytemuck::from_bytes(bytes);
        assert_eq!(*back, QUAD_VERTICES[0]);
    }

    // ============================================================
    // Quad data
    // ============================================================

    #[test]
    fn test_indices_reference_valid_vertices() {
        for &index in QUAD_INDICES.iter() {
            assert!((index as usize) < QUAD_VERTICES.len());
        }
    }

    #[test]
    fn test_every_vertex_is_referenced() {
        for i in 0..QUAD_VERTICES.len() as u32 {
            assert!(QUAD_INDICES.contains(&i), "vertex {} unused", i);
        }
    }

    #[test]
    fn test_quad_is_two_triangles() {
        assert_eq!(QUAD_INDICES.len(), 6);
    }
}
