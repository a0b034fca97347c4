//! # Mesh Buffer
//!
//! Triangle mesh handed to the rendering layer: vertices, faces and one
//! scalar colour per vertex.

use crate::error::{MeshError, MeshResult};
use config::constants::MAX_VERTICES;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A triangle mesh with per-vertex scalar colours.
///
/// All geometry uses f64 internally. Export to f32 only happens at the
/// rendering boundary.
///
/// # Example
///
/// ```rust
/// use bead_mesh::MeshBuffer;
/// use glam::DVec3;
///
/// let mut mesh = MeshBuffer::new();
/// mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0), 1.0);
/// mesh.add_vertex(DVec3::new(1.0, 0.0, 0.0), 1.0);
/// mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0), 2.0);
/// mesh.add_face(0, 1, 2);
/// assert!(mesh.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffer {
    /// Vertex positions (mm)
    vertices: Vec<DVec3>,
    /// Triangle indices
    faces: Vec<[u32; 3]>,
    /// One scalar per vertex
    vertex_colors: Vec<f64>,
}

impl MeshBuffer {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            vertex_colors: Vec::with_capacity(vertex_count),
        }
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Returns true if the mesh has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Adds a coloured vertex and returns its index.
    pub fn add_vertex(&mut self, position: DVec3, color: f64) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(position);
        self.vertex_colors.push(color);
        index
    }

    /// Appends a ring of vertices sharing one colour; returns the index of
    /// its first vertex.
    pub fn add_ring(&mut self, ring: &[DVec3], color: f64) -> u32 {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(ring);
        self.vertex_colors.extend(std::iter::repeat(color).take(ring.len()));
        base
    }

    /// Adds a face by vertex indices.
    pub fn add_face(&mut self, v0: u32, v1: u32, v2: u32) {
        self.faces.push([v0, v1, v2]);
    }

    /// Returns the vertices.
    #[inline]
    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    /// Returns the faces.
    #[inline]
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Returns the per-vertex colours.
    #[inline]
    pub fn vertex_colors(&self) -> &[f64] {
        &self.vertex_colors
    }

    /// Computes the axis-aligned bounding box.
    ///
    /// Returns `None` for an empty mesh.
    pub fn bounding_box(&self) -> Option<(DVec3, DVec3)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices[1..]
                .iter()
                .fold((first, first), |(min, max), v| (min.min(*v), max.max(*v))),
        )
    }

    /// Range of the vertex colours, `None` for an empty mesh.
    pub fn color_range(&self) -> Option<(f64, f64)> {
        let first = *self.vertex_colors.first()?;
        Some(
            self.vertex_colors
                .iter()
                .fold((first, first), |(lo, hi), c| (lo.min(*c), hi.max(*c))),
        )
    }

    /// Validates the mesh.
    ///
    /// Checks:
    /// - One colour per vertex
    /// - All face indices in range
    /// - No NaN/Inf in vertices or colours
    pub fn validate(&self) -> MeshResult<()> {
        if self.vertices.len() > MAX_VERTICES {
            return Err(MeshError::TooManyVertices {
                count: self.vertices.len(),
                max: MAX_VERTICES,
            });
        }
        if self.vertex_colors.len() != self.vertices.len() {
            return Err(MeshError::validation(format!(
                "{} colors for {} vertices",
                self.vertex_colors.len(),
                self.vertices.len()
            )));
        }

        let vertex_count = self.vertices.len() as u64;
        if let Some((i, face)) = self
            .faces
            .iter()
            .enumerate()
            .find(|(_, face)| face.iter().any(|&v| u64::from(v) >= vertex_count))
        {
            return Err(MeshError::validation(format!(
                "face {} {:?} references a vertex out of range ({} vertices)",
                i, face, vertex_count
            )));
        }

        if let Some(i) = self.vertices.iter().position(|v| !v.is_finite()) {
            return Err(MeshError::validation(format!("vertex {} is not finite", i)));
        }
        if let Some(i) = self.vertex_colors.iter().position(|c| !c.is_finite()) {
            return Err(MeshError::validation(format!("color {} is not finite", i)));
        }

        Ok(())
    }

    /// Exports vertices as f32 array for the GPU.
    ///
    /// Returns flattened [x, y, z, x, y, z, ...] array.
    pub fn vertices_f32(&self) -> Vec<f32> {
        self.vertices
            .iter()
            .flat_map(|v| [v.x as f32, v.y as f32, v.z as f32])
            .collect()
    }

    /// Exports face indices as a flattened u32 array.
    pub fn indices_u32(&self) -> Vec<u32> {
        self.faces.iter().flatten().copied().collect()
    }

    /// Exports colours as f32.
    pub fn colors_f32(&self) -> Vec<f32> {
        self.vertex_colors.iter().map(|&c| c as f32).collect()
    }

    /// Serializes the mesh to JSON.
    pub fn to_json(&self) -> MeshResult<String> {
        serde_json::to_string(self).map_err(|e| MeshError::validation(e.to_string()))
    }

    /// Parses a mesh from JSON and validates it.
    pub fn from_json(json: &str) -> MeshResult<Self> {
        let mesh: Self =
            serde_json::from_str(json).map_err(|e| MeshError::validation(e.to_string()))?;
        mesh.validate()?;
        Ok(mesh)
    }
}
