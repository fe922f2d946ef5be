//! Owner of the graphics collaborator and of everything provisioned on it.

use crate::backend::texture::provision_texture;
use crate::backend::{backend_for, resolve_strategy, SubmissionBackend};
use crate::config::RenderingConfig;
use crate::error::Result;
use crate::geometry::Geometry;
use crate::gfx::{Capabilities, Graphics, GraphicsWarning, RenderState, TextureId};
use crate::resource::ResourceSlot;
use crate::view::ViewState;

/// Renders the benchmark mesh with one configuration at a time.
///
/// Every configuration change goes through [`Renderer::reprovision`], which
/// releases all GPU objects before allocating the new ones. Provisioning
/// failures are logged and leave nothing to draw; they never abort the run.
pub struct Renderer<G: Graphics> {
    gfx: G,
    capabilities: Capabilities,
    geometry: Geometry,
    config: RenderingConfig,
    active: RenderingConfig,
    texture: ResourceSlot<TextureId>,
    backend: Box<dyn SubmissionBackend<G>>,
    shut_down: bool,
}

impl<G: Graphics> Renderer<G> {
    /// Queries capabilities, generates the mesh and provisions `config`.
    pub fn new(gfx: G, config: RenderingConfig) -> Result<Self> {
        let capabilities = gfx.capabilities();
        log::info!(
            "graphics backend '{}': buffer objects {}, wireframe {}",
            gfx.backend_name(),
            if capabilities.buffer_objects { "available" } else { "unavailable" },
            if capabilities.wireframe { "available" } else { "unavailable" },
        );
        if !capabilities.buffer_objects {
            log::warn!("buffer objects are not supported; buffer strategies fall back to command lists");
        }

        let geometry = Geometry::generate(config.triangles)?;
        let strategy = resolve_strategy(config.strategy, &capabilities);
        let mut renderer = Self {
            gfx,
            capabilities,
            geometry,
            config,
            active: config,
            texture: ResourceSlot::empty("texture"),
            backend: backend_for(strategy),
            shut_down: false,
        };
        renderer.reprovision(config);
        Ok(renderer)
    }

    /// Regenerates the mesh when the triangle target changed, then reprovisions.
    pub fn rebuild(&mut self, config: RenderingConfig) -> Result<()> {
        if config.triangles != self.config.triangles {
            self.release_resources();
            self.geometry = Geometry::generate(config.triangles)?;
            log::debug!(
                "generated {} vertices in {} strips for {} triangles",
                self.geometry.vertices().len(),
                self.geometry.strips().len(),
                config.triangles
            );
        }
        self.reprovision(config);
        Ok(())
    }

    /// Releases every GPU object, then provisions `config` on the current mesh.
    pub fn reprovision(&mut self, config: RenderingConfig) {
        self.release_resources();
        self.shut_down = false;

        let strategy = resolve_strategy(config.strategy, &self.capabilities);
        if strategy != config.strategy {
            log::warn!(
                "{} needs buffer objects, provisioning {} instead",
                config.strategy,
                strategy
            );
        }
        self.config = config;
        self.active = RenderingConfig { strategy, ..config };

        self.gfx.apply_state(&RenderState::from_options(&config.options));

        if let Err(err) = provision_texture(&mut self.gfx, &mut self.texture, &config.options) {
            log::warn!("texture provisioning failed: {err}");
        }

        if self.backend.strategy() != strategy {
            self.backend = backend_for(strategy);
        }
        if let Err(err) = self
            .backend
            .provision(&mut self.gfx, &self.geometry, &self.active)
        {
            log::warn!("provisioning {strategy} failed: {err}");
        }
    }

    /// Draws one frame of the active configuration and presents it.
    pub fn render_frame(&mut self, view: &ViewState) {
        self.gfx.begin_frame(view);
        self.backend.draw(&mut self.gfx, &self.geometry, &self.active);
        self.gfx.end_frame();
    }

    /// Oldest pending error reported by the graphics collaborator.
    pub fn poll_error(&mut self) -> Option<GraphicsWarning> {
        self.gfx.take_error()
    }

    /// Releases every GPU object. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.release_resources();
        self.shut_down = true;
        log::debug!("renderer released all resources");
    }

    fn release_resources(&mut self) {
        self.backend.release(&mut self.gfx);
        self.gfx.bind_texture(None);
        self.texture.release(&mut self.gfx);
    }

    /// The configuration last requested.
    pub fn config(&self) -> &RenderingConfig {
        &self.config
    }

    /// The configuration actually provisioned, after capability fallback.
    pub fn active_config(&self) -> &RenderingConfig {
        &self.active
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn gfx(&self) -> &G {
        &self.gfx
    }

    pub fn gfx_mut(&mut self) -> &mut G {
        &mut self.gfx
    }
}

impl<G: Graphics> Drop for Renderer<G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RenderingOptions, SubmissionStrategy};
    use crate::gfx::RecordingGraphics;

    fn config(strategy: SubmissionStrategy) -> RenderingConfig {
        RenderingConfig {
            strategy,
            triangles: 5_000,
            ..RenderingConfig::default()
        }
    }

    #[test]
    fn test_reprovision_releases_before_allocating() {
        let mut renderer = Renderer::new(RecordingGraphics::new(), config(SubmissionStrategy::StaticBuffer)).unwrap();
        assert_eq!(renderer.gfx().live_buffers(), 2);

        for strategy in SubmissionStrategy::ALL {
            let mut next = config(strategy);
            next.options.texture = true;
            renderer.reprovision(next);
            let expected = match strategy {
                SubmissionStrategy::Immediate => 1,
                SubmissionStrategy::CommandList => 2,
                _ => 3,
            };
            assert_eq!(renderer.gfx().live_objects(), expected, "{strategy}");
        }

        renderer.shutdown();
        renderer.shutdown();
        assert_eq!(renderer.gfx().live_objects(), 0);
        assert!(renderer.gfx().misuse().is_empty());
        assert_eq!(renderer.gfx().created(), renderer.gfx().destroyed());
    }

    #[test]
    fn test_fallback_without_buffer_objects() {
        let mut renderer = Renderer::new(
            RecordingGraphics::without_buffer_objects(),
            config(SubmissionStrategy::DynamicBuffer),
        )
        .unwrap();
        assert_eq!(renderer.config().strategy, SubmissionStrategy::DynamicBuffer);
        assert_eq!(renderer.active_config().strategy, SubmissionStrategy::CommandList);

        renderer.render_frame(&ViewState::default());
        assert_eq!(renderer.gfx().last_frame().replays, 1);
        assert_eq!(renderer.gfx().live_command_lists(), 1);
    }

    #[test]
    fn test_rebuild_regenerates_mesh() {
        let mut renderer = Renderer::new(RecordingGraphics::new(), config(SubmissionStrategy::Immediate)).unwrap();
        assert_eq!(renderer.geometry().subdivisions(), 50);

        let mut next = config(SubmissionStrategy::Immediate);
        next.triangles = 20_000;
        renderer.rebuild(next).unwrap();
        assert_eq!(renderer.geometry().subdivisions(), 100);

        renderer.render_frame(&ViewState::default());
        assert_eq!(renderer.gfx().last_frame().vertices, 100 * 202);
    }

    #[test]
    fn test_render_state_pushed_on_provision() {
        let mut renderer = Renderer::new(RecordingGraphics::new(), config(SubmissionStrategy::Immediate)).unwrap();
        let mut next = config(SubmissionStrategy::Immediate);
        next.options = RenderingOptions {
            wireframe: true,
            ..RenderingOptions::default()
        };
        renderer.reprovision(next);
        let state = renderer.gfx().state();
        assert!(state.wireframe);
        assert!(state.cull_back_faces);
        assert!(!state.smooth_shading);
    }

    #[test]
    fn test_failed_provision_draws_nothing() {
        let mut gfx = RecordingGraphics::new();
        gfx.fail_next_allocations(1);
        let mut renderer = Renderer::new(gfx, config(SubmissionStrategy::CommandList)).unwrap();

        renderer.render_frame(&ViewState::default());
        assert_eq!(renderer.gfx().last_frame().replays, 0);
        assert!(renderer.poll_error().is_none());
    }

    #[test]
    fn test_errors_are_polled_in_order() {
        let mut renderer = Renderer::new(RecordingGraphics::new(), config(SubmissionStrategy::Immediate)).unwrap();
        renderer.gfx_mut().inject_error("first");
        renderer.gfx_mut().inject_error("second");
        assert_eq!(renderer.poll_error().map(|w| w.0), Some("first".to_owned()));
        assert_eq!(renderer.poll_error().map(|w| w.0), Some("second".to_owned()));
        assert!(renderer.poll_error().is_none());
    }
}
