use super::{SubmissionBackend, WHITE};
use crate::config::{RenderingConfig, SubmissionStrategy};
use crate::error::{BenchError, Result};
use crate::geometry::{Geometry, Vector3};
use crate::gfx::{
    BufferId, BufferKind, BufferUsage, Graphics, GraphicsResult, PrimitiveMode, VertexLayout,
};
use crate::resource::ResourceSlot;
use crate::topology::{IndexBuffer, RowDraw, Topology};

/// Interleaves the vertex attributes selected by `layout` as `f32`.
pub fn pack_vertices(geometry: &Geometry, layout: VertexLayout) -> Vec<f32> {
    fn push(out: &mut Vec<f32>, v: Vector3) {
        out.extend_from_slice(&v.as_vec3().to_array());
    }

    let mut out = Vec::with_capacity(geometry.vertices().len() * layout.floats_per_vertex());
    for vertex in geometry.vertices() {
        push(&mut out, vertex.position);
        push(&mut out, vertex.normal);
        if layout.color {
            push(&mut out, vertex.color);
        }
        if layout.texcoord {
            push(&mut out, vertex.texcoord);
        }
    }
    out
}

/// GPU-resident vertex and index buffers, drawn one indexed call per row.
#[derive(Debug)]
pub struct BufferObjects {
    usage: BufferUsage,
    vertices: ResourceSlot<BufferId>,
    indices: ResourceSlot<BufferId>,
    layout: VertexLayout,
    mode: PrimitiveMode,
    rows: Vec<RowDraw>,
}

impl BufferObjects {
    fn with_usage(usage: BufferUsage) -> Self {
        Self {
            usage,
            vertices: ResourceSlot::empty("vertex buffer"),
            indices: ResourceSlot::empty("index buffer"),
            layout: VertexLayout::default(),
            mode: PrimitiveMode::TriangleStrip,
            rows: Vec::new(),
        }
    }

    pub fn new_static() -> Self {
        Self::with_usage(BufferUsage::Static)
    }

    pub fn new_dynamic() -> Self {
        Self::with_usage(BufferUsage::Dynamic)
    }

    pub fn buffers(&self) -> Option<(BufferId, BufferId)> {
        self.vertices.get().zip(self.indices.get())
    }

    fn upload<G: Graphics + ?Sized>(
        &mut self,
        gfx: &mut G,
        packed: &[f32],
        encoded: &IndexBuffer,
    ) -> GraphicsResult<()> {
        let usage = self.usage;
        self.vertices.reallocate(gfx, |g| {
            g.create_buffer(BufferKind::Vertex, usage, bytemuck::cast_slice(packed))
        })?;
        self.indices.reallocate(gfx, |g| {
            g.create_buffer(BufferKind::Index, usage, encoded.as_bytes())
        })?;
        Ok(())
    }

    fn clear<G: Graphics + ?Sized>(&mut self, gfx: &mut G) {
        self.vertices.release(gfx);
        self.indices.release(gfx);
        self.rows.clear();
    }
}

impl<G: Graphics + ?Sized> SubmissionBackend<G> for BufferObjects {
    fn strategy(&self) -> SubmissionStrategy {
        match self.usage {
            BufferUsage::Static => SubmissionStrategy::StaticBuffer,
            BufferUsage::Dynamic => SubmissionStrategy::DynamicBuffer,
        }
    }

    fn provision(&mut self, gfx: &mut G, geometry: &Geometry, config: &RenderingConfig) -> Result<()> {
        self.clear(gfx);
        if !gfx.capabilities().buffer_objects {
            return Err(BenchError::UnsupportedCapability("buffer objects"));
        }

        let layout = VertexLayout::from_options(&config.options);
        let topology = Topology::from_options(&config.options);
        let packed = pack_vertices(geometry, layout);
        let encoded = IndexBuffer::encode(geometry, topology);
        if let Err(err) = self.upload(gfx, &packed, &encoded) {
            self.clear(gfx);
            return Err(err.into());
        }

        self.layout = layout;
        self.mode = topology.primitive_mode();
        self.rows = encoded.row_draws();
        Ok(())
    }

    fn draw(&self, gfx: &mut G, _geometry: &Geometry, config: &RenderingConfig) {
        let Some((vertices, indices)) = self.buffers() else {
            return;
        };
        gfx.bind_vertex_buffer(vertices, self.layout);
        gfx.bind_index_buffer(indices);
        if !config.options.color {
            gfx.color(WHITE);
        }
        for row in &self.rows {
            gfx.draw_indexed(self.mode, row.count, row.byte_offset);
        }
    }

    fn release(&mut self, gfx: &mut G) {
        self.clear(gfx);
    }
}
