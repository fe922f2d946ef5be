//! Strip rows to submission index sequences.
//!
//! Every backend walks the same per-row order, so the immediate path, the
//! recorded command list and the packed index buffer draw identical triangles.

use crate::config::RenderingOptions;
use crate::geometry::{Geometry, TriangleStrip};
use crate::gfx::PrimitiveMode;

/// How a strip row is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// The strip as-is.
    Strip,
    /// The strip unrolled into discrete triangles with consistent winding.
    Triangles,
}

impl Topology {
    pub fn from_options(options: &RenderingOptions) -> Self {
        if options.triangle_strip {
            Topology::Strip
        } else {
            Topology::Triangles
        }
    }

    pub fn primitive_mode(self) -> PrimitiveMode {
        match self {
            Topology::Strip => PrimitiveMode::TriangleStrip,
            Topology::Triangles => PrimitiveMode::Triangles,
        }
    }
}

/// Number of indices submitted for a strip of `strip_len` indices.
pub fn indices_per_row(strip_len: usize, topology: Topology) -> usize {
    match topology {
        Topology::Strip => strip_len,
        Topology::Triangles => strip_len.saturating_sub(2) * 3,
    }
}

/// Submission order of one row.
///
/// In triangle mode the k-th triangle of the strip is `(s[k], s[k+1], s[k+2])`
/// for even k and `(s[k+2], s[k+1], s[k])` for odd k, matching strip winding.
pub fn row_indices(strip: &TriangleStrip, topology: Topology) -> impl Iterator<Item = u32> + '_ {
    let s = &strip.indices;
    let count = indices_per_row(s.len(), topology);
    (0..count).map(move |k| match topology {
        Topology::Strip => s[k],
        Topology::Triangles => {
            let (tri, corner) = (k / 3, k % 3);
            if tri % 2 == 0 {
                s[tri + corner]
            } else {
                s[tri + 2 - corner]
            }
        }
    })
}

/// One indexed draw call into an [`IndexBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowDraw {
    pub count: u32,
    pub byte_offset: u64,
}

/// All rows concatenated into one `u32` index array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBuffer {
    indices: Vec<u32>,
    row_counts: Vec<u32>,
    topology: Topology,
}

impl IndexBuffer {
    pub fn encode(geometry: &Geometry, topology: Topology) -> Self {
        let total = geometry
            .strips()
            .iter()
            .map(|strip| indices_per_row(strip.len(), topology))
            .sum();
        let mut indices = Vec::with_capacity(total);
        let mut row_counts = Vec::with_capacity(geometry.strips().len());

        for strip in geometry.strips() {
            let before = indices.len();
            indices.extend(row_indices(strip, topology));
            row_counts.push((indices.len() - before) as u32);
        }

        Self {
            indices,
            row_counts,
            topology,
        }
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Per-row count and byte offset into [`IndexBuffer::as_bytes`].
    pub fn row_draws(&self) -> Vec<RowDraw> {
        let index_size = std::mem::size_of::<u32>() as u64;
        let mut offset = 0u64;
        self.row_counts
            .iter()
            .map(|&count| {
                let draw = RowDraw {
                    count,
                    byte_offset: offset,
                };
                offset += u64::from(count) * index_size;
                draw
            })
            .collect()
    }
}
