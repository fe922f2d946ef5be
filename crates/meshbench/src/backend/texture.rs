//! Checkerboard texture shared by every strategy.

use crate::config::RenderingOptions;
use crate::gfx::{Graphics, GraphicsResult, TextureId};
use crate::resource::ResourceSlot;

/// 2×2 RGBA checkerboard: white, black / black, white.
#[rustfmt::skip]
pub const CHECKERBOARD: [u8; 16] = [
    255, 255, 255, 255,   0,   0,   0, 255,
      0,   0,   0, 255, 255, 255, 255, 255,
];

pub const CHECKERBOARD_SIZE: u32 = 2;

/// Releases the previous texture and, when texturing is on, creates and binds
/// a fresh checkerboard.
pub fn provision_texture<G: Graphics + ?Sized>(
    gfx: &mut G,
    slot: &mut ResourceSlot<TextureId>,
    options: &RenderingOptions,
) -> GraphicsResult<()> {
    gfx.bind_texture(None);
    slot.release(gfx);
    if !options.texture {
        return Ok(());
    }

    let texture = slot.reallocate(gfx, |g| {
        g.create_texture(CHECKERBOARD_SIZE, CHECKERBOARD_SIZE, &CHECKERBOARD)
    })?;
    gfx.bind_texture(Some(texture));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::RecordingGraphics;

    #[test]
    fn test_texture_follows_option() {
        let mut gfx = RecordingGraphics::new();
        let mut slot = ResourceSlot::empty("texture");
        let textured = RenderingOptions {
            texture: true,
            ..RenderingOptions::default()
        };

        provision_texture(&mut gfx, &mut slot, &textured).unwrap();
        let first = slot.get().unwrap();
        assert_eq!(gfx.bound_texture(), Some(first));
        assert_eq!(gfx.texture(first), Some((2, 2, &CHECKERBOARD[..])));

        provision_texture(&mut gfx, &mut slot, &textured).unwrap();
        assert_ne!(slot.get(), Some(first));
        assert_eq!(gfx.live_textures(), 1);

        provision_texture(&mut gfx, &mut slot, &RenderingOptions::default()).unwrap();
        assert!(!slot.is_allocated());
        assert_eq!(gfx.bound_texture(), None);
        assert_eq!(gfx.live_textures(), 0);
        assert!(gfx.misuse().is_empty());
    }
}
