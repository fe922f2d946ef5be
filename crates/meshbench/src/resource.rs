//! Ownership of graphics handles.
//!
//! A [`ResourceSlot`] holds at most one live object. Replacing the content
//! releases the previous object first, and releasing an empty slot is a no-op,
//! so a release call never sees an unallocated handle.

use crate::gfx::{BufferId, CommandListId, Graphics, GraphicsResult, TextureId};
use std::fmt;

/// A handle that can be handed back to the graphics collaborator.
pub trait GpuResource: Copy + fmt::Display {
    fn release<G: Graphics + ?Sized>(self, gfx: &mut G);
}

impl GpuResource for TextureId {
    fn release<G: Graphics + ?Sized>(self, gfx: &mut G) {
        gfx.destroy_texture(self);
    }
}

impl GpuResource for CommandListId {
    fn release<G: Graphics + ?Sized>(self, gfx: &mut G) {
        gfx.destroy_command_list(self);
    }
}

impl GpuResource for BufferId {
    fn release<G: Graphics + ?Sized>(self, gfx: &mut G) {
        gfx.destroy_buffer(self);
    }
}

pub struct ResourceSlot<H: GpuResource> {
    label: &'static str,
    handle: Option<H>,
}

impl<H: GpuResource> ResourceSlot<H> {
    pub const fn empty(label: &'static str) -> Self {
        Self { label, handle: None }
    }

    #[inline]
    pub fn get(&self) -> Option<H> {
        self.handle
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.handle.is_some()
    }

    pub fn release<G: Graphics + ?Sized>(&mut self, gfx: &mut G) {
        if let Some(handle) = self.handle.take() {
            log::trace!("releasing {} {handle}", self.label);
            handle.release(gfx);
        }
    }

    /// Releases the current object, then stores the result of `allocate`.
    /// On failure the slot stays empty.
    pub fn reallocate<G, F>(&mut self, gfx: &mut G, allocate: F) -> GraphicsResult<H>
    where
        G: Graphics + ?Sized,
        F: FnOnce(&mut G) -> GraphicsResult<H>,
    {
        self.release(gfx);
        let handle = allocate(gfx)?;
        self.handle = Some(handle);
        Ok(handle)
    }
}

impl<H: GpuResource> Drop for ResourceSlot<H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("{} {handle} dropped without being released", self.label);
        }
    }
}

impl<H: GpuResource> fmt::Debug for ResourceSlot<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handle {
            Some(handle) => write!(f, "{}({handle})", self.label),
            None => write!(f, "{}(empty)", self.label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{BufferKind, BufferUsage, GraphicsError, RecordingGraphics};

    #[test]
    fn test_reallocate_releases_previous_first() {
        let mut gfx = RecordingGraphics::new();
        let mut slot = ResourceSlot::empty("vertex buffer");
        let first = slot
            .reallocate(&mut gfx, |g| {
                g.create_buffer(BufferKind::Vertex, BufferUsage::Static, &[0; 4])
            })
            .unwrap();
        let second = slot
            .reallocate(&mut gfx, |g| {
                assert_eq!(g.live_buffers(), 0);
                g.create_buffer(BufferKind::Vertex, BufferUsage::Static, &[0; 4])
            })
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(slot.get(), Some(second));

        slot.release(&mut gfx);
        slot.release(&mut gfx);
        assert!(!slot.is_allocated());
        assert_eq!(gfx.live_objects(), 0);
        assert!(gfx.misuse().is_empty());
    }

    #[test]
    fn test_failed_allocation_leaves_slot_empty() {
        let mut gfx = RecordingGraphics::new();
        let mut slot: ResourceSlot<CommandListId> = ResourceSlot::empty("command list");
        slot.reallocate(&mut gfx, |g| g.create_command_list()).unwrap();
        gfx.fail_next_allocations(1);
        let result = slot.reallocate(&mut gfx, |g| g.create_command_list());
        assert!(matches!(result, Err(GraphicsError::AllocationFailed(_))));
        assert!(!slot.is_allocated());
        assert_eq!(gfx.live_command_lists(), 0);
    }
}
