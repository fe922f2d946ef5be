//! meshbench: frame-throughput benchmark of a procedural surface mesh.
//!
//! - [`geometry`] tessellates a closed, torus-like parametric surface into
//!   (S+1)² vertices with averaged normals and S triangle strips.
//! - [`topology`] turns strip rows into strip or discrete-triangle index order.
//! - [`backend`] submits the mesh through four strategies: immediate calls, a
//!   replayed command list, and static or dynamic buffer objects.
//! - [`renderer`] owns the graphics collaborator and reprovisions on every
//!   configuration change.
//! - [`scheduler`] runs the interactive/sweep state machine, timing frames
//!   into a rolling [`sampling::SampleWindow`] and writing sweep reports.
//!
//! The GPU API is abstracted by [`gfx::Graphics`]. [`gfx::RecordingGraphics`]
//! implements it in memory; the `meshbench_viewer` crate implements it on wgpu.

pub mod backend;
pub mod config;
pub mod error;
pub mod geometry;
pub mod gfx;
pub mod renderer;
pub mod report;
pub mod resource;
pub mod sampling;
pub mod scheduler;
pub mod topology;
pub mod view;

pub use config::{OptionFlag, RenderingConfig, RenderingOptions, SubmissionStrategy};
pub use error::{BenchError, Result};
pub use geometry::{Geometry, TriangleStrip, Vector3, Vertex};
pub use gfx::{Capabilities, Graphics, GraphicsError, RecordingGraphics};
pub use renderer::Renderer;
pub use report::{FileReport, MemoryReport, ReportTarget};
pub use sampling::{SampleWindow, Throughput};
pub use scheduler::{BenchEvent, BenchState, Flow, Scale, Scheduler};
pub use view::ViewState;
