//! Graphics collaborator interface.
//!
//! The benchmark never talks to a GPU API directly. Everything it needs
//! (immediate per-vertex submission, replayable command lists, buffer objects,
//! textures and error polling) goes through [`Graphics`], so the same
//! submission strategies run on the wgpu backend of the viewer and on the
//! in-memory [`RecordingGraphics`] used by tests.

pub mod recording;

use crate::config::RenderingOptions;
use crate::geometry::Vector3;
use crate::view::ViewState;
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;

pub use recording::{FrameStats, GfxCall, RecordingGraphics};

/// Error type for graphics operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    #[error("unknown handle {0}")]
    UnknownHandle(u32),

    #[error("a command list is already being recorded")]
    RecordingActive,

    #[error("no command list is being recorded")]
    NotRecording,

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for graphics operations.
pub type GraphicsResult<T> = Result<T, GraphicsError>;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Wraps a raw id; zero is the "unallocated" sentinel and yields `None`.
            #[inline]
            pub fn new(raw: u32) -> Option<Self> {
                NonZeroU32::new(raw).map(Self)
            }

            #[inline]
            pub fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

handle!(
    /// A live texture object.
    TextureId
);
handle!(
    /// A live recorded command list.
    CommandListId
);
handle!(
    /// A live buffer object.
    BufferId
);

/// Primitive assembly mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Triangles,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Upload hint for buffer objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Uploaded once, never respecified.
    Static,
    /// May be respecified after upload.
    Dynamic,
}

/// Interleaved vertex layout of packed buffers: position and normal always,
/// then color and texture coordinate when present. Every field is three `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VertexLayout {
    pub color: bool,
    pub texcoord: bool,
}

impl VertexLayout {
    pub const COMPONENTS_PER_FIELD: usize = 3;
    const FIELD_BYTES: u64 = (Self::COMPONENTS_PER_FIELD * std::mem::size_of::<f32>()) as u64;

    pub fn from_options(options: &RenderingOptions) -> Self {
        Self {
            color: options.color,
            texcoord: options.texture,
        }
    }

    /// Number of three-component fields per vertex.
    pub fn field_count(&self) -> usize {
        2 + usize::from(self.color) + usize::from(self.texcoord)
    }

    pub fn floats_per_vertex(&self) -> usize {
        self.field_count() * Self::COMPONENTS_PER_FIELD
    }

    /// Byte distance between consecutive vertices.
    pub fn stride(&self) -> u64 {
        self.field_count() as u64 * Self::FIELD_BYTES
    }

    pub fn normal_offset(&self) -> u64 {
        Self::FIELD_BYTES
    }

    pub fn color_offset(&self) -> Option<u64> {
        self.color.then_some(2 * Self::FIELD_BYTES)
    }

    pub fn texcoord_offset(&self) -> Option<u64> {
        self.texcoord
            .then(|| (2 + u64::from(self.color)) * Self::FIELD_BYTES)
    }
}

/// Fixed-function state derived from the rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderState {
    pub wireframe: bool,
    pub cull_back_faces: bool,
    pub two_sided_lighting: bool,
    pub texturing: bool,
    pub smooth_shading: bool,
}

impl RenderState {
    pub fn from_options(options: &RenderingOptions) -> Self {
        Self {
            wireframe: options.wireframe,
            cull_back_faces: !options.back_face_painting,
            two_sided_lighting: options.back_face_painting,
            texturing: options.texture,
            smooth_shading: options.smooth_shading,
        }
    }
}

/// What the graphics collaborator can do; queried once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// GPU-resident vertex/index buffers are available.
    pub buffer_objects: bool,
    /// Polygons can be rasterized as lines.
    pub wireframe: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            buffer_objects: true,
            wireframe: true,
        }
    }
}

/// A non-fatal error reported by the graphics collaborator after a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsWarning(pub String);

impl fmt::Display for GraphicsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capabilities the benchmark consumes from the graphics API.
///
/// Immediate-mode calls made between [`Graphics::begin_recording`] and
/// [`Graphics::end_recording`] are captured into the command list instead of
/// being drawn. Destroying a bound buffer or texture unbinds it.
pub trait Graphics {
    /// Name of this backend (for logging).
    fn backend_name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    fn apply_state(&mut self, state: &RenderState);

    /// Starts a frame: clears targets and sets up the camera.
    fn begin_frame(&mut self, view: &ViewState);

    /// Finishes a frame and presents it.
    fn end_frame(&mut self);

    // --- immediate submission ---

    fn begin(&mut self, mode: PrimitiveMode);
    fn color(&mut self, rgb: Vector3);
    fn tex_coord(&mut self, s: f64, t: f64);
    fn normal(&mut self, normal: Vector3);
    /// Emits a vertex with the current normal, color and texture coordinate.
    fn vertex(&mut self, position: Vector3);
    fn end(&mut self);

    // --- command lists ---

    fn create_command_list(&mut self) -> GraphicsResult<CommandListId>;
    fn begin_recording(&mut self, list: CommandListId) -> GraphicsResult<()>;
    fn end_recording(&mut self) -> GraphicsResult<()>;
    fn replay(&mut self, list: CommandListId);
    fn destroy_command_list(&mut self, list: CommandListId);

    // --- buffer objects ---

    fn create_buffer(
        &mut self,
        kind: BufferKind,
        usage: BufferUsage,
        data: &[u8],
    ) -> GraphicsResult<BufferId>;
    fn bind_vertex_buffer(&mut self, buffer: BufferId, layout: VertexLayout);
    fn bind_index_buffer(&mut self, buffer: BufferId);
    /// Draws `count` u32 indices starting `byte_offset` bytes into the bound index buffer.
    fn draw_indexed(&mut self, mode: PrimitiveMode, count: u32, byte_offset: u64);
    fn destroy_buffer(&mut self, buffer: BufferId);

    // --- textures ---

    /// Creates a nearest-filtered, repeating RGBA8 texture.
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> GraphicsResult<TextureId>;
    fn bind_texture(&mut self, texture: Option<TextureId>);
    fn destroy_texture(&mut self, texture: TextureId);

    /// Pops the oldest pending error, if any.
    fn take_error(&mut self) -> Option<GraphicsWarning>;
}
