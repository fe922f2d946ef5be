//! In-memory graphics implementation for testing.
//!
//! `RecordingGraphics` keeps every live object in maps, validates handle use
//! and immediate-mode bracketing, and counts the work submitted per frame. Misuse
//! is queued as an error for [`Graphics::take_error`], like a real driver would
//! report it, and also tallied so tests can assert a clean run.
//!
//! Per-vertex calls are only counted. Set [`RecordingGraphics::trace_attributes`]
//! to also log them into [`RecordingGraphics::calls`].

use super::{
    BufferId, BufferKind, BufferUsage, Capabilities, CommandListId, Graphics, GraphicsError,
    GraphicsResult, GraphicsWarning, PrimitiveMode, RenderState, TextureId, VertexLayout,
};
use crate::geometry::Vector3;
use crate::view::ViewState;
use std::collections::{HashMap, VecDeque};

/// Logged graphics call.
#[derive(Debug, Clone, PartialEq)]
pub enum GfxCall {
    ApplyState(RenderState),
    BeginFrame,
    EndFrame,
    Begin(PrimitiveMode),
    Color(Vector3),
    TexCoord(f64, f64),
    Normal(Vector3),
    Vertex(Vector3),
    End,
    CreateCommandList(CommandListId),
    BeginRecording(CommandListId),
    EndRecording,
    Replay(CommandListId),
    DestroyCommandList(CommandListId),
    CreateBuffer(BufferId, BufferKind, BufferUsage),
    BindVertexBuffer(BufferId, VertexLayout),
    BindIndexBuffer(BufferId),
    DrawIndexed {
        mode: PrimitiveMode,
        count: u32,
        byte_offset: u64,
    },
    DestroyBuffer(BufferId),
    CreateTexture(TextureId),
    BindTexture(Option<TextureId>),
    DestroyTexture(TextureId),
}

/// Work submitted during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Vertices drawn through immediate calls, including replayed lists.
    pub vertices: u64,
    /// `begin`/`end` batches, including replayed lists.
    pub batches: u64,
    pub replays: u64,
    pub indexed_draws: u64,
    pub indices: u64,
}

impl FrameStats {
    fn absorb(&mut self, recorded: &FrameStats) {
        self.vertices += recorded.vertices;
        self.batches += recorded.batches;
        self.indexed_draws += recorded.indexed_draws;
        self.indices += recorded.indices;
    }
}

#[derive(Debug, Clone)]
struct BufferRecord {
    kind: BufferKind,
    usage: BufferUsage,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct TextureRecord {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

pub struct RecordingGraphics {
    capabilities: Capabilities,
    next_id: u32,

    textures: HashMap<u32, TextureRecord>,
    buffers: HashMap<u32, BufferRecord>,
    /// `None` until recording of the list has finished.
    command_lists: HashMap<u32, Option<FrameStats>>,

    recording: Option<(CommandListId, FrameStats)>,
    batch: Option<PrimitiveMode>,
    in_frame: bool,

    state: RenderState,
    bound_texture: Option<TextureId>,
    bound_vertex: Option<(BufferId, VertexLayout)>,
    bound_index: Option<BufferId>,

    current: FrameStats,
    last_frame: FrameStats,
    frames: u64,

    created: usize,
    destroyed: usize,
    misuse: Vec<String>,
    errors: VecDeque<GraphicsWarning>,
    allocations_before_failure: usize,
    fail_allocations: usize,

    /// Log per-vertex attribute calls as well.
    pub trace_attributes: bool,
    calls: Vec<GfxCall>,
}

impl Default for RecordingGraphics {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingGraphics {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    /// A device without GPU-resident buffer support.
    pub fn without_buffer_objects() -> Self {
        Self::with_capabilities(Capabilities {
            buffer_objects: false,
            ..Capabilities::default()
        })
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            next_id: 1,
            textures: HashMap::new(),
            buffers: HashMap::new(),
            command_lists: HashMap::new(),
            recording: None,
            batch: None,
            in_frame: false,
            state: RenderState::default(),
            bound_texture: None,
            bound_vertex: None,
            bound_index: None,
            current: FrameStats::default(),
            last_frame: FrameStats::default(),
            frames: 0,
            created: 0,
            destroyed: 0,
            misuse: Vec::new(),
            errors: VecDeque::new(),
            allocations_before_failure: 0,
            fail_allocations: 0,
            trace_attributes: false,
            calls: Vec::new(),
        }
    }

    // --- inspection ---

    pub fn calls(&self) -> &[GfxCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Work of the last completed frame.
    pub fn last_frame(&self) -> FrameStats {
        self.last_frame
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Objects currently alive (textures, lists and buffers).
    pub fn live_objects(&self) -> usize {
        self.textures.len() + self.buffers.len() + self.command_lists.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_command_lists(&self) -> usize {
        self.command_lists.len()
    }

    pub fn created(&self) -> usize {
        self.created
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed
    }

    /// Every invalid call seen so far (unknown handles, bad bracketing).
    pub fn misuse(&self) -> &[String] {
        &self.misuse
    }

    pub fn bound_texture(&self) -> Option<TextureId> {
        self.bound_texture
    }

    /// Contents and hints of a live buffer.
    pub fn buffer(&self, id: BufferId) -> Option<(BufferKind, BufferUsage, &[u8])> {
        self.buffers
            .get(&id.get())
            .map(|record| (record.kind, record.usage, record.data.as_slice()))
    }

    /// Size and pixels of a live texture.
    pub fn texture(&self, id: TextureId) -> Option<(u32, u32, &[u8])> {
        self.textures
            .get(&id.get())
            .map(|record| (record.width, record.height, record.rgba.as_slice()))
    }

    // --- fault injection ---

    /// Makes the next `count` allocations fail.
    pub fn fail_next_allocations(&mut self, count: usize) {
        self.allocations_before_failure = 0;
        self.fail_allocations = count;
    }

    /// Lets `successes` allocations through, then fails the next one.
    pub fn fail_allocation_after(&mut self, successes: usize) {
        self.allocations_before_failure = successes;
        self.fail_allocations = 1;
    }

    /// Queues an asynchronous error as a driver would.
    pub fn inject_error(&mut self, message: impl Into<String>) {
        self.errors.push_back(GraphicsWarning(message.into()));
    }

    // --- internals ---

    fn log(&mut self, call: GfxCall) {
        self.calls.push(call);
    }

    fn trace(&mut self, call: GfxCall) {
        if self.trace_attributes {
            self.calls.push(call);
        }
    }

    fn report(&mut self, message: String) {
        log::debug!("recording graphics: {message}");
        self.errors.push_back(GraphicsWarning(message.clone()));
        self.misuse.push(message);
    }

    fn allocate(&mut self, what: &str) -> GraphicsResult<u32> {
        if self.allocations_before_failure > 0 {
            self.allocations_before_failure -= 1;
        } else if self.fail_allocations > 0 {
            self.fail_allocations -= 1;
            return Err(GraphicsError::AllocationFailed(format!("injected failure for {what}")));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.created += 1;
        Ok(id)
    }

    /// Counters receiving submitted work: the list being recorded, or the frame.
    fn sink(&mut self) -> &mut FrameStats {
        match &mut self.recording {
            Some((_, stats)) => stats,
            None => &mut self.current,
        }
    }
}

impl Graphics for RecordingGraphics {
    fn backend_name(&self) -> &'static str {
        "recording"
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn apply_state(&mut self, state: &RenderState) {
        if state.wireframe && !self.capabilities.wireframe {
            self.report("wireframe requested but not supported".to_owned());
        }
        self.state = *state;
        self.log(GfxCall::ApplyState(*state));
    }

    fn begin_frame(&mut self, _view: &ViewState) {
        if self.in_frame {
            self.report("begin_frame inside a frame".to_owned());
        }
        self.in_frame = true;
        self.current = FrameStats::default();
        self.log(GfxCall::BeginFrame);
    }

    fn end_frame(&mut self) {
        if !self.in_frame {
            self.report("end_frame outside a frame".to_owned());
        }
        if self.batch.is_some() {
            self.report("end_frame inside begin/end".to_owned());
            self.batch = None;
        }
        self.in_frame = false;
        self.last_frame = self.current;
        self.frames += 1;
        self.log(GfxCall::EndFrame);
    }

    fn begin(&mut self, mode: PrimitiveMode) {
        if self.batch.is_some() {
            self.report("begin inside begin/end".to_owned());
        }
        self.batch = Some(mode);
        self.sink().batches += 1;
        self.log(GfxCall::Begin(mode));
    }

    fn color(&mut self, rgb: Vector3) {
        self.trace(GfxCall::Color(rgb));
    }

    fn tex_coord(&mut self, s: f64, t: f64) {
        self.trace(GfxCall::TexCoord(s, t));
    }

    fn normal(&mut self, normal: Vector3) {
        self.trace(GfxCall::Normal(normal));
    }

    fn vertex(&mut self, position: Vector3) {
        if self.batch.is_none() {
            self.report("vertex outside begin/end".to_owned());
            return;
        }
        self.sink().vertices += 1;
        self.trace(GfxCall::Vertex(position));
    }

    fn end(&mut self) {
        if self.batch.take().is_none() {
            self.report("end without begin".to_owned());
        }
        self.log(GfxCall::End);
    }

    fn create_command_list(&mut self) -> GraphicsResult<CommandListId> {
        let raw = self.allocate("command list")?;
        self.command_lists.insert(raw, None);
        let id = CommandListId::new(raw).ok_or(GraphicsError::UnknownHandle(raw))?;
        self.log(GfxCall::CreateCommandList(id));
        Ok(id)
    }

    fn begin_recording(&mut self, list: CommandListId) -> GraphicsResult<()> {
        if self.recording.is_some() {
            return Err(GraphicsError::RecordingActive);
        }
        if !self.command_lists.contains_key(&list.get()) {
            return Err(GraphicsError::UnknownHandle(list.get()));
        }
        self.recording = Some((list, FrameStats::default()));
        self.log(GfxCall::BeginRecording(list));
        Ok(())
    }

    fn end_recording(&mut self) -> GraphicsResult<()> {
        let (list, stats) = self.recording.take().ok_or(GraphicsError::NotRecording)?;
        if self.batch.take().is_some() {
            return Err(GraphicsError::Backend("recording ended inside begin/end".to_owned()));
        }
        match self.command_lists.get_mut(&list.get()) {
            Some(slot) => *slot = Some(stats),
            None => return Err(GraphicsError::UnknownHandle(list.get())),
        }
        self.log(GfxCall::EndRecording);
        Ok(())
    }

    fn replay(&mut self, list: CommandListId) {
        match self.command_lists.get(&list.get()).copied() {
            Some(Some(recorded)) => {
                self.current.replays += 1;
                self.current.absorb(&recorded);
            }
            Some(None) => self.report(format!("replay of unfinished {list}")),
            None => self.report(format!("replay of unknown {list}")),
        }
        self.log(GfxCall::Replay(list));
    }

    fn destroy_command_list(&mut self, list: CommandListId) {
        if self.command_lists.remove(&list.get()).is_some() {
            self.destroyed += 1;
        } else {
            self.report(format!("release of unknown {list}"));
        }
        self.log(GfxCall::DestroyCommandList(list));
    }

    fn create_buffer(
        &mut self,
        kind: BufferKind,
        usage: BufferUsage,
        data: &[u8],
    ) -> GraphicsResult<BufferId> {
        if !self.capabilities.buffer_objects {
            return Err(GraphicsError::Backend("buffer objects are not supported".to_owned()));
        }
        let raw = self.allocate("buffer")?;
        self.buffers.insert(
            raw,
            BufferRecord {
                kind,
                usage,
                data: data.to_vec(),
            },
        );
        let id = BufferId::new(raw).ok_or(GraphicsError::UnknownHandle(raw))?;
        self.log(GfxCall::CreateBuffer(id, kind, usage));
        Ok(id)
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferId, layout: VertexLayout) {
        match self.buffers.get(&buffer.get()).map(|record| record.kind) {
            Some(BufferKind::Vertex) => self.bound_vertex = Some((buffer, layout)),
            Some(BufferKind::Index) => self.report(format!("{buffer} bound as vertex buffer")),
            None => self.report(format!("bind of unknown {buffer}")),
        }
        self.log(GfxCall::BindVertexBuffer(buffer, layout));
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        match self.buffers.get(&buffer.get()).map(|record| record.kind) {
            Some(BufferKind::Index) => self.bound_index = Some(buffer),
            Some(BufferKind::Vertex) => self.report(format!("{buffer} bound as index buffer")),
            None => self.report(format!("bind of unknown {buffer}")),
        }
        self.log(GfxCall::BindIndexBuffer(buffer));
    }

    fn draw_indexed(&mut self, mode: PrimitiveMode, count: u32, byte_offset: u64) {
        self.log(GfxCall::DrawIndexed {
            mode,
            count,
            byte_offset,
        });
        if self.bound_vertex.is_none() {
            self.report("draw_indexed without a vertex buffer".to_owned());
            return;
        }
        let Some(index) = self.bound_index else {
            self.report("draw_indexed without an index buffer".to_owned());
            return;
        };
        let len = self
            .buffers
            .get(&index.get())
            .map_or(0, |record| record.data.len() as u64);
        let end = byte_offset + u64::from(count) * std::mem::size_of::<u32>() as u64;
        if end > len {
            self.report(format!("draw_indexed reads {end} bytes of a {len} byte {index}"));
            return;
        }
        let sink = self.sink();
        sink.indexed_draws += 1;
        sink.indices += u64::from(count);
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer.get()).is_some() {
            self.destroyed += 1;
            if self.bound_vertex.is_some_and(|(bound, _)| bound == buffer) {
                self.bound_vertex = None;
            }
            if self.bound_index == Some(buffer) {
                self.bound_index = None;
            }
        } else {
            self.report(format!("release of unknown {buffer}"));
        }
        self.log(GfxCall::DestroyBuffer(buffer));
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> GraphicsResult<TextureId> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(GraphicsError::Backend(format!(
                "texture data is {} bytes, expected {expected}",
                rgba.len()
            )));
        }
        let raw = self.allocate("texture")?;
        self.textures.insert(
            raw,
            TextureRecord {
                width,
                height,
                rgba: rgba.to_vec(),
            },
        );
        let id = TextureId::new(raw).ok_or(GraphicsError::UnknownHandle(raw))?;
        self.log(GfxCall::CreateTexture(id));
        Ok(id)
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        if let Some(id) = texture {
            if !self.textures.contains_key(&id.get()) {
                self.report(format!("bind of unknown {id}"));
            }
        }
        self.bound_texture = texture;
        self.log(GfxCall::BindTexture(texture));
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture.get()).is_some() {
            self.destroyed += 1;
            if self.bound_texture == Some(texture) {
                self.bound_texture = None;
            }
        } else {
            self.report(format!("release of unknown {texture}"));
        }
        self.log(GfxCall::DestroyTexture(texture));
    }

    fn take_error(&mut self) -> Option<GraphicsWarning> {
        self.errors.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_counts_recorded_work() {
        let mut gfx = RecordingGraphics::new();
        let list = gfx.create_command_list().unwrap();
        gfx.begin_recording(list).unwrap();
        gfx.begin(PrimitiveMode::TriangleStrip);
        for _ in 0..4 {
            gfx.vertex(Vector3::ZERO);
        }
        gfx.end();
        gfx.end_recording().unwrap();

        gfx.begin_frame(&ViewState::default());
        gfx.replay(list);
        gfx.replay(list);
        gfx.end_frame();

        let stats = gfx.last_frame();
        assert_eq!(stats.replays, 2);
        assert_eq!(stats.vertices, 8);
        assert_eq!(stats.batches, 2);
        assert!(gfx.misuse().is_empty());
    }

    #[test]
    fn test_nested_recording_is_rejected() {
        let mut gfx = RecordingGraphics::new();
        let a = gfx.create_command_list().unwrap();
        let b = gfx.create_command_list().unwrap();
        gfx.begin_recording(a).unwrap();
        assert_eq!(gfx.begin_recording(b), Err(GraphicsError::RecordingActive));
        gfx.end_recording().unwrap();
        assert_eq!(gfx.end_recording(), Err(GraphicsError::NotRecording));
    }

    #[test]
    fn test_double_release_is_reported() {
        let mut gfx = RecordingGraphics::new();
        let texture = gfx.create_texture(1, 1, &[255; 4]).unwrap();
        gfx.destroy_texture(texture);
        gfx.destroy_texture(texture);
        assert_eq!(gfx.misuse().len(), 1);
        assert!(gfx.take_error().is_some());
        assert!(gfx.take_error().is_none());
        assert_eq!(gfx.live_objects(), 0);
    }

    #[test]
    fn test_indexed_draw_bounds_checked() {
        let mut gfx = RecordingGraphics::new();
        let vertices = gfx
            .create_buffer(BufferKind::Vertex, BufferUsage::Static, &[0; 24])
            .unwrap();
        let indices = gfx
            .create_buffer(BufferKind::Index, BufferUsage::Static, &[0; 12])
            .unwrap();
        gfx.begin_frame(&ViewState::default());
        gfx.bind_vertex_buffer(vertices, VertexLayout::default());
        gfx.bind_index_buffer(indices);
        gfx.draw_indexed(PrimitiveMode::Triangles, 3, 0);
        gfx.draw_indexed(PrimitiveMode::Triangles, 3, 4);
        gfx.end_frame();

        assert_eq!(gfx.last_frame().indexed_draws, 1);
        assert_eq!(gfx.misuse().len(), 1);
    }

    #[test]
    fn test_buffers_need_capability() {
        let mut gfx = RecordingGraphics::without_buffer_objects();
        assert!(gfx
            .create_buffer(BufferKind::Vertex, BufferUsage::Dynamic, &[0; 4])
            .is_err());
    }

    #[test]
    fn test_injected_allocation_failure() {
        let mut gfx = RecordingGraphics::new();
        gfx.fail_next_allocations(1);
        assert!(matches!(
            gfx.create_command_list(),
            Err(GraphicsError::AllocationFailed(_))
        ));
        assert!(gfx.create_command_list().is_ok());
    }
}
