//! Renderable surface data produced by meshers and installed on blocks

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Number of material slots a terrain exposes
pub const MAX_MATERIALS: usize = 8;

/// Material bound to a surface
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Linear RGB albedo
    #[serde(default = "default_albedo")]
    pub albedo: [f32; 3],
}

fn default_albedo() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl Material {
    pub fn new(name: impl Into<String>, albedo: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            albedo,
        }
    }
}

/// Vertex and index arrays of one surface
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurfaceArrays {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl SurfaceArrays {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append an axis-aligned quad given its four corners in winding order
    pub fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&corners);
        self.normals.extend(std::iter::repeat_n(normal, 4));
        self.uvs.extend_from_slice(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ]);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// One surface of a mesh
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    pub arrays: SurfaceArrays,
    pub material: Option<Material>,
}

/// Mesh installed on a block's rendering handle
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub surfaces: Vec<Surface>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_surface(&mut self, arrays: SurfaceArrays, material: Option<Material>) {
        self.surfaces.push(Surface { arrays, material });
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.arrays.triangle_count()).sum()
    }
}
