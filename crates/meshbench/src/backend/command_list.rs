use super::{submit_geometry, SubmissionBackend};
use crate::config::{RenderingConfig, SubmissionStrategy};
use crate::error::Result;
use crate::geometry::Geometry;
use crate::gfx::{CommandListId, Graphics, GraphicsResult};
use crate::resource::ResourceSlot;

/// Immediate-mode submission recorded once and replayed every frame.
#[derive(Debug)]
pub struct CommandList {
    list: ResourceSlot<CommandListId>,
}

impl CommandList {
    pub fn new() -> Self {
        Self {
            list: ResourceSlot::empty("command list"),
        }
    }

    pub fn list(&self) -> Option<CommandListId> {
        self.list.get()
    }
}

impl Default for CommandList {
    fn default() -> Self {
        Self::new()
    }
}

fn record<G: Graphics + ?Sized>(
    gfx: &mut G,
    list: CommandListId,
    geometry: &Geometry,
    config: &RenderingConfig,
) -> GraphicsResult<()> {
    gfx.begin_recording(list)?;
    submit_geometry(gfx, geometry, &config.options);
    gfx.end_recording()
}

impl<G: Graphics + ?Sized> SubmissionBackend<G> for CommandList {
    fn strategy(&self) -> SubmissionStrategy {
        SubmissionStrategy::CommandList
    }

    fn provision(&mut self, gfx: &mut G, geometry: &Geometry, config: &RenderingConfig) -> Result<()> {
        let list = self.list.reallocate(gfx, |g| g.create_command_list())?;

        if let Err(err) = record(gfx, list, geometry, config) {
            self.list.release(gfx);
            return Err(err.into());
        }
        Ok(())
    }

    fn draw(&self, gfx: &mut G, _geometry: &Geometry, _config: &RenderingConfig) {
        if let Some(list) = self.list.get() {
            gfx.replay(list);
        }
    }

    fn release(&mut self, gfx: &mut G) {
        self.list.release(gfx);
    }
}
