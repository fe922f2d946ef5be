use super::{SubmissionBackend, WHITE};
use crate::config::{RenderingConfig, RenderingOptions, SubmissionStrategy};
use crate::error::Result;
use crate::geometry::{Geometry, TriangleStrip};
use crate::gfx::{Graphics, PrimitiveMode};
use crate::topology::{row_indices, Topology};

/// Per-vertex calls every frame. Owns no GPU objects.
#[derive(Debug, Default)]
pub struct Immediate;

/// Issues the whole mesh as immediate-mode calls.
///
/// Strip topology gets one batch per row; triangle topology puts every row
/// into a single batch. Also used to record command lists.
pub fn submit_geometry<G: Graphics + ?Sized>(
    gfx: &mut G,
    geometry: &Geometry,
    options: &RenderingOptions,
) {
    let topology = Topology::from_options(options);
    if !options.color {
        gfx.color(WHITE);
    }

    match topology {
        Topology::Strip => {
            for strip in geometry.strips() {
                gfx.begin(PrimitiveMode::TriangleStrip);
                submit_row(gfx, geometry, strip, topology, options);
                gfx.end();
            }
        }
        Topology::Triangles => {
            gfx.begin(PrimitiveMode::Triangles);
            for strip in geometry.strips() {
                submit_row(gfx, geometry, strip, topology, options);
            }
            gfx.end();
        }
    }
}

fn submit_row<G: Graphics + ?Sized>(
    gfx: &mut G,
    geometry: &Geometry,
    strip: &TriangleStrip,
    topology: Topology,
    options: &RenderingOptions,
) {
    let vertices = geometry.vertices();
    for index in row_indices(strip, topology) {
        let vertex = &vertices[index as usize];
        gfx.normal(vertex.normal);
        if options.color {
            gfx.color(vertex.color);
        }
        if options.texture {
            gfx.tex_coord(vertex.texcoord.x, vertex.texcoord.y);
        }
        gfx.vertex(vertex.position);
    }
}

impl<G: Graphics + ?Sized> SubmissionBackend<G> for Immediate {
    fn strategy(&self) -> SubmissionStrategy {
        SubmissionStrategy::Immediate
    }

    fn provision(&mut self, _gfx: &mut G, _geometry: &Geometry, _config: &RenderingConfig) -> Result<()> {
        Ok(())
    }

    fn draw(&self, gfx: &mut G, geometry: &Geometry, config: &RenderingConfig) {
        submit_geometry(gfx, geometry, &config.options);
    }

    fn release(&mut self, _gfx: &mut G) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{GfxCall, RecordingGraphics};
    use crate::view::ViewState;

    fn config(options: RenderingOptions) -> RenderingConfig {
        RenderingConfig {
            strategy: SubmissionStrategy::Immediate,
            triangles: 18,
            options,
        }
    }

    #[test]
    fn test_strip_rows_get_one_batch_each() {
        let geometry = Geometry::generate(18).unwrap();
        let config = config(RenderingOptions {
            triangle_strip: true,
            ..RenderingOptions::default()
        });
        let mut gfx = RecordingGraphics::new();

        gfx.begin_frame(&ViewState::default());
        Immediate.draw(&mut gfx, &geometry, &config);
        gfx.end_frame();

        let stats = gfx.last_frame();
        assert_eq!(stats.batches, 3);
        assert_eq!(stats.vertices, 3 * 8);
    }

    #[test]
    fn test_triangle_mode_uses_one_batch() {
        let geometry = Geometry::generate(18).unwrap();
        let config = config(RenderingOptions::default());
        let mut gfx = RecordingGraphics::new();

        gfx.begin_frame(&ViewState::default());
        Immediate.draw(&mut gfx, &geometry, &config);
        gfx.end_frame();

        let stats = gfx.last_frame();
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.vertices, 3 * 18);
    }

    #[test]
    fn test_attribute_order_per_vertex() {
        let geometry = Geometry::generate(2).unwrap();
        let mut gfx = RecordingGraphics::new();
        gfx.trace_attributes = true;

        let options = RenderingOptions {
            triangle_strip: true,
            color: true,
            texture: true,
            ..RenderingOptions::default()
        };
        submit_geometry(&mut gfx, &geometry, &options);

        let first = geometry.vertices()[geometry.strips()[0].indices[0] as usize];
        assert_eq!(
            &gfx.calls()[..5],
            &[
                GfxCall::Begin(PrimitiveMode::TriangleStrip),
                GfxCall::Normal(first.normal),
                GfxCall::Color(first.color),
                GfxCall::TexCoord(first.texcoord.x, first.texcoord.y),
                GfxCall::Vertex(first.position),
            ]
        );
    }

    #[test]
    fn test_white_without_color() {
        let geometry = Geometry::generate(2).unwrap();
        let mut gfx = RecordingGraphics::new();
        gfx.trace_attributes = true;

        submit_geometry(&mut gfx, &geometry, &RenderingOptions::default());

        assert_eq!(gfx.calls()[0], GfxCall::Color(WHITE));
        let colors = gfx
            .calls()
            .iter()
            .filter(|call| matches!(call, GfxCall::Color(_)))
            .count();
        assert_eq!(colors, 1);
        assert!(!gfx.calls().iter().any(|call| matches!(call, GfxCall::TexCoord(..))));
    }
}
