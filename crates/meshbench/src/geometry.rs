//! Tessellation of the benchmark surface.
//!
//! The surface is a closed, self-intersecting torus-like shape sampled on a
//! regular (S+1)×(S+1) grid of (theta, phi) parameters:
//!
//! ```text
//! theta = -π/2 + π·i/S      phi = 2π·j/S
//! p     = (cos θ cos φ, cos θ sin φ, sin θ cos θ)
//! ```
//!
//! Vertices are stored row-major (`index = j + i·(S+1)`). Each grid row `i < S`
//! becomes one triangle strip zig-zagging between rows `i+1` and `i`.

use crate::error::{BenchError, Result};
use glam::DVec3;
use std::f64::consts::PI;

/// Position, normal, color and texture coordinate components.
pub type Vector3 = DVec3;

/// Texture coordinates span this many checkerboard repeats across the grid.
const TEXTURE_REPEAT: f64 = 10.0;

/// Approximate face count around a pole-row vertex.
const POLE_ROW_DIVISOR: f64 = 3.0;

/// Approximate face count around an interior vertex.
const INNER_ROW_DIVISOR: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vector3,
    pub normal: Vector3,
    pub color: Vector3,
    pub texcoord: Vector3,
}

/// One row of the surface as a triangle strip of vertex indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TriangleStrip {
    pub indices: Vec<u32>,
}

impl TriangleStrip {
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of triangles the strip resolves into.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len().saturating_sub(2)
    }
}

/// Generated benchmark mesh. Regenerated wholesale, never edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    vertices: Vec<Vertex>,
    strips: Vec<TriangleStrip>,
    subdivisions: u32,
}

/// Grid resolution for a triangle target: `round(sqrt(N / 2))`.
pub fn subdivisions_for(triangles: u32) -> u32 {
    (f64::from(triangles) / 2.0).sqrt().round() as u32
}

#[inline(always)]
fn grid_index(row: u32, col: u32, subdivisions: u32) -> u32 {
    col + row * (subdivisions + 1)
}

impl Geometry {
    /// Builds the surface whose triangle count approximates `triangles`.
    pub fn generate(triangles: u32) -> Result<Self> {
        let subdivisions = subdivisions_for(triangles);
        if subdivisions < 1 {
            return Err(BenchError::InvalidConfiguration { triangles });
        }

        let mut vertices = tessellate(subdivisions);
        accumulate_face_normals(&mut vertices, subdivisions);
        merge_seam_normals(&mut vertices, subdivisions);
        average_normals(&mut vertices, subdivisions);

        let strips = (0..subdivisions)
            .map(|row| build_strip(row, subdivisions))
            .collect();

        Ok(Self {
            vertices,
            strips,
            subdivisions,
        })
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn strips(&self) -> &[TriangleStrip] {
        &self.strips
    }

    /// Grid resolution S.
    #[inline]
    pub fn subdivisions(&self) -> u32 {
        self.subdivisions
    }

    /// Triangles actually produced, `2·S²`.
    pub fn triangle_count(&self) -> usize {
        self.strips.iter().map(TriangleStrip::triangle_count).sum()
    }
}

fn tessellate(subdivisions: u32) -> Vec<Vertex> {
    let side = subdivisions as usize + 1;
    let mut vertices = Vec::with_capacity(side * side);

    for i in 0..=subdivisions {
        let ratio_i = f64::from(i) / f64::from(subdivisions);
        let color = Vector3::new(1.0 - ratio_i, ratio_i, 1.0 - ratio_i);
        let theta = -PI / 2.0 + PI * ratio_i;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for j in 0..=subdivisions {
            let ratio_j = f64::from(j) / f64::from(subdivisions);
            let phi = 2.0 * PI * ratio_j;
            let (sin_phi, cos_phi) = phi.sin_cos();

            vertices.push(Vertex {
                position: Vector3::new(
                    cos_theta * cos_phi,
                    cos_theta * sin_phi,
                    sin_theta * cos_theta,
                ),
                normal: Vector3::ZERO,
                color,
                texcoord: Vector3::new(TEXTURE_REPEAT * ratio_i, TEXTURE_REPEAT * ratio_j, 0.0),
            });
        }
    }

    vertices
}

/// Unit normal of triangle (a, b, c), or `None` when the triangle is degenerate.
///
/// Both pole rows collapse onto the origin, so half of the faces touching them
/// have zero area.
pub fn face_normal(a: Vector3, b: Vector3, c: Vector3) -> Option<Vector3> {
    (b - a).cross(c - a).try_normalize()
}

fn add_face_normal(vertices: &mut [Vertex], ids: [u32; 3]) {
    let [a, b, c] = ids.map(|id| vertices[id as usize].position);
    if let Some(normal) = face_normal(a, b, c) {
        for id in ids {
            vertices[id as usize].normal += normal;
        }
    }
}

fn accumulate_face_normals(vertices: &mut [Vertex], subdivisions: u32) {
    let s = subdivisions;
    for i in 0..s {
        for j in 0..s {
            add_face_normal(
                vertices,
                [
                    grid_index(i, j, s),
                    grid_index(i, j + 1, s),
                    grid_index(i + 1, j, s),
                ],
            );
            add_face_normal(
                vertices,
                [
                    grid_index(i + 1, j, s),
                    grid_index(i, j + 1, s),
                    grid_index(i + 1, j + 1, s),
                ],
            );
        }
    }
}

/// Columns 0 and S of a row are the same point (phi = 0 and phi = 2π); give
/// both the combined normal so the seam shades continuously.
fn merge_seam_normals(vertices: &mut [Vertex], subdivisions: u32) {
    let s = subdivisions;
    for i in 0..=s {
        let first = grid_index(i, 0, s) as usize;
        let last = grid_index(i, s, s) as usize;
        let sum = vertices[first].normal + vertices[last].normal;
        vertices[first].normal = sum;
        vertices[last].normal = sum;
    }
}

fn average_normals(vertices: &mut [Vertex], subdivisions: u32) {
    let side = subdivisions as usize + 1;
    for (row, chunk) in vertices.chunks_mut(side).enumerate() {
        let divisor = if row == 0 || row == subdivisions as usize {
            POLE_ROW_DIVISOR
        } else {
            INNER_ROW_DIVISOR
        };
        for vertex in chunk {
            vertex.normal /= divisor;
        }
    }
}

fn build_strip(row: u32, subdivisions: u32) -> TriangleStrip {
    let indices = (0..=subdivisions)
        .flat_map(|col| {
            [
                grid_index(row + 1, col, subdivisions),
                grid_index(row, col, subdivisions),
            ]
        })
        .collect();
    TriangleStrip { indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_normals(subdivisions: u32) -> Vec<Vertex> {
        let mut vertices = tessellate(subdivisions);
        accumulate_face_normals(&mut vertices, subdivisions);
        merge_seam_normals(&mut vertices, subdivisions);
        vertices
    }

    #[test]
    fn test_counts_follow_subdivisions() {
        for triangles in [5_000u32, 10_000, 20_000, 80_000, 320_000] {
            let geometry = Geometry::generate(triangles).unwrap();
            let s = subdivisions_for(triangles);
            assert_eq!(geometry.subdivisions(), s);
            assert_eq!(geometry.vertices().len(), ((s + 1) * (s + 1)) as usize);
            assert_eq!(geometry.strips().len(), s as usize);
            assert_eq!(geometry.triangle_count(), (2 * s * s) as usize);
            for strip in geometry.strips() {
                assert_eq!(strip.len(), 2 * (s as usize + 1));
            }
        }
    }

    #[test]
    fn test_minimum_triangle_target() {
        let geometry = Geometry::generate(2_500).unwrap();
        assert_eq!(geometry.subdivisions(), 35);
        assert_eq!(geometry.vertices().len(), 1296);
        assert_eq!(geometry.strips().len(), 35);
    }

    #[test]
    fn test_rejects_empty_grid() {
        assert!(matches!(
            Geometry::generate(0),
            Err(BenchError::InvalidConfiguration { triangles: 0 })
        ));
        assert_eq!(Geometry::generate(1).unwrap().subdivisions(), 1);
    }

    #[test]
    fn test_vertex_attributes() {
        let geometry = Geometry::generate(2 * 4 * 4).unwrap();
        let s = geometry.subdivisions();
        assert_eq!(s, 4);

        // Row 2 is the equator (theta = 0), column 1 is phi = π/2.
        let v = geometry.vertices()[grid_index(2, 1, s) as usize];
        assert!((v.position - Vector3::new(0.0, 1.0, 0.0)).length() < 1e-12);
        assert_eq!(v.color, Vector3::new(0.5, 0.5, 0.5));
        assert_eq!(v.texcoord, Vector3::new(5.0, 2.5, 0.0));

        // Poles collapse onto the origin.
        let pole = geometry.vertices()[grid_index(0, 3, s) as usize];
        assert!(pole.position.length() < 1e-12);
        assert_eq!(pole.color, Vector3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_strip_alternates_rows() {
        let geometry = Geometry::generate(2 * 3 * 3).unwrap();
        assert_eq!(geometry.strips()[0].indices, vec![4, 0, 5, 1, 6, 2, 7, 3]);
        assert_eq!(geometry.strips()[2].indices, vec![12, 8, 13, 9, 14, 10, 15, 11]);
    }

    #[test]
    fn test_normals_divided_per_row() {
        let geometry = Geometry::generate(5_000).unwrap();
        let s = geometry.subdivisions();
        let raw = raw_normals(s);

        for (index, (vertex, summed)) in geometry.vertices().iter().zip(&raw).enumerate() {
            let row = index as u32 / (s + 1);
            let divisor = if row == 0 || row == s { 3.0 } else { 6.0 };
            assert_eq!(vertex.normal, summed.normal / divisor, "vertex {index}");
        }
    }

    #[test]
    fn test_pole_extremal_normals_match() {
        let geometry = Geometry::generate(10_000).unwrap();
        let s = geometry.subdivisions();
        let vertices = geometry.vertices();
        for row in [0, s] {
            let first = vertices[grid_index(row, 0, s) as usize].normal;
            let last = vertices[grid_index(row, s, s) as usize].normal;
            assert_eq!(first, last);
        }
    }

    #[test]
    fn test_normals_are_finite() {
        let geometry = Geometry::generate(2_500).unwrap();
        assert!(geometry.vertices().iter().all(|v| v.normal.is_finite()));
        // Interior normals point away from the degenerate case.
        let s = geometry.subdivisions();
        let mid = geometry.vertices()[grid_index(s / 2, s / 3, s) as usize];
        assert!(mid.normal.length() > 0.1);
    }

    #[test]
    fn test_degenerate_face_has_no_normal() {
        assert!(face_normal(Vector3::ZERO, Vector3::ZERO, Vector3::X).is_none());
        assert_eq!(
            face_normal(Vector3::ZERO, Vector3::X, Vector3::Y),
            Some(Vector3::Z)
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = Geometry::generate(20_000).unwrap();
        let b = Geometry::generate(20_000).unwrap();
        assert_eq!(a, b);
    }
}
