//! Submission strategies.
//!
//! Each strategy owns the GPU objects it allocates. `provision` releases
//! anything left from a previous configuration before allocating, `draw`
//! submits one frame's worth of geometry, and `release` empties every slot.

mod buffer_objects;
mod command_list;
mod immediate;
pub mod texture;

pub use buffer_objects::{pack_vertices, BufferObjects};
pub use command_list::CommandList;
pub use immediate::{submit_geometry, Immediate};

use crate::config::{RenderingConfig, SubmissionStrategy};
use crate::error::Result;
use crate::geometry::{Geometry, Vector3};
use crate::gfx::{Capabilities, Graphics};

/// Color used for every vertex when per-vertex color is off.
pub const WHITE: Vector3 = Vector3::ONE;

pub trait SubmissionBackend<G: Graphics + ?Sized> {
    fn strategy(&self) -> SubmissionStrategy;

    fn provision(&mut self, gfx: &mut G, geometry: &Geometry, config: &RenderingConfig)
        -> Result<()>;

    fn draw(&self, gfx: &mut G, geometry: &Geometry, config: &RenderingConfig);

    fn release(&mut self, gfx: &mut G);
}

/// Strategy actually provisioned on a device with `capabilities`.
///
/// Buffer strategies degrade to [`SubmissionStrategy::CommandList`] when the
/// device has no buffer objects.
pub fn resolve_strategy(
    requested: SubmissionStrategy,
    capabilities: &Capabilities,
) -> SubmissionStrategy {
    if requested.uses_buffer_objects() && !capabilities.buffer_objects {
        SubmissionStrategy::CommandList
    } else {
        requested
    }
}

pub fn backend_for<G: Graphics + ?Sized>(
    strategy: SubmissionStrategy,
) -> Box<dyn SubmissionBackend<G>> {
    match strategy {
        SubmissionStrategy::Immediate => Box::new(Immediate),
        SubmissionStrategy::CommandList => Box::new(CommandList::new()),
        SubmissionStrategy::StaticBuffer => Box::new(BufferObjects::new_static()),
        SubmissionStrategy::DynamicBuffer => Box::new(BufferObjects::new_dynamic()),
    }
}
