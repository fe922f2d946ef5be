//! Surface pipelines, created lazily per render-state combination.

use meshbench::gfx::{PrimitiveMode, RenderState, VertexLayout};
use std::collections::HashMap;

/// Where vertex attributes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSource {
    /// Interleaved [`ImmediateVertex`](super::ImmediateVertex) stream.
    Immediate,
    /// A packed buffer; absent attributes are read from the defaults buffer.
    Packed(VertexLayout),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub mode: PrimitiveMode,
    pub source: VertexSource,
    pub wireframe: bool,
    pub cull_back: bool,
    pub smooth: bool,
}

impl PipelineKey {
    pub fn new(mode: PrimitiveMode, source: VertexSource, state: &RenderState, wireframe_supported: bool) -> Self {
        Self {
            mode,
            source,
            wireframe: state.wireframe && wireframe_supported,
            cull_back: state.cull_back_faces,
            smooth: state.smooth_shading,
        }
    }
}

const POSITION: u32 = 0;
const NORMAL: u32 = 1;
const COLOR: u32 = 2;
const TEXCOORD: u32 = 3;

const FIELD: u64 = 12;

/// Stride of the defaults buffer: color then texcoord.
pub const DEFAULTS_STRIDE: u64 = 2 * FIELD;

fn attribute(location: u32, offset: u64) -> wgpu::VertexAttribute {
    wgpu::VertexAttribute {
        shader_location: location,
        offset,
        format: wgpu::VertexFormat::Float32x3,
    }
}

pub struct PipelineCache {
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    color_fmt: wgpu::TextureFormat,
    depth_fmt: wgpu::TextureFormat,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn new(
        device: &wgpu::Device,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shaders/surface.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/surface.wgsl").into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Surface PipelineLayout"),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        Self {
            shader,
            layout,
            color_fmt,
            depth_fmt,
            pipelines: HashMap::new(),
        }
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_fmt
    }

    pub fn depth_format(&self) -> wgpu::TextureFormat {
        self.depth_fmt
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    /// Builds the pipeline for `key` unless it already exists.
    pub fn ensure(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        log::debug!("creating surface pipeline {key:?}");
        let pipeline = self.create(device, &key);
        self.pipelines.insert(key, pipeline);
    }

    fn create(&self, device: &wgpu::Device, key: &PipelineKey) -> wgpu::RenderPipeline {
        // Slot 0 carries the mesh, slot 1 (one instance) the constant fallbacks.
        let (stride, primary, fallback) = match key.source {
            VertexSource::Immediate => (
                4 * FIELD,
                vec![
                    attribute(POSITION, 0),
                    attribute(NORMAL, FIELD),
                    attribute(COLOR, 2 * FIELD),
                    attribute(TEXCOORD, 3 * FIELD),
                ],
                Vec::new(),
            ),
            VertexSource::Packed(layout) => {
                let mut primary = vec![
                    attribute(POSITION, 0),
                    attribute(NORMAL, layout.normal_offset()),
                ];
                let mut fallback = Vec::new();
                match layout.color_offset() {
                    Some(offset) => primary.push(attribute(COLOR, offset)),
                    None => fallback.push(attribute(COLOR, 0)),
                }
                match layout.texcoord_offset() {
                    Some(offset) => primary.push(attribute(TEXCOORD, offset)),
                    None => fallback.push(attribute(TEXCOORD, FIELD)),
                }
                (layout.stride(), primary, fallback)
            }
        };

        let mut buffers = vec![wgpu::VertexBufferLayout {
            array_stride: stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &primary,
        }];
        if matches!(key.source, VertexSource::Packed(_)) {
            buffers.push(wgpu::VertexBufferLayout {
                array_stride: DEFAULTS_STRIDE,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &fallback,
            });
        }

        let (topology, strip_index_format) = match (key.mode, key.source) {
            (PrimitiveMode::Triangles, _) => (wgpu::PrimitiveTopology::TriangleList, None),
            (PrimitiveMode::TriangleStrip, VertexSource::Immediate) => {
                (wgpu::PrimitiveTopology::TriangleStrip, None)
            }
            (PrimitiveMode::TriangleStrip, VertexSource::Packed(_)) => (
                wgpu::PrimitiveTopology::TriangleStrip,
                Some(wgpu::IndexFormat::Uint32),
            ),
        };

        let (vs_entry, fs_entry) = if key.smooth {
            ("vs_smooth", "fs_smooth")
        } else {
            ("vs_flat", "fs_flat")
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Surface Pipeline"),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: vs_entry,
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: key.cull_back.then_some(wgpu::Face::Back),
                polygon_mode: if key.wireframe {
                    wgpu::PolygonMode::Line
                } else {
                    wgpu::PolygonMode::Fill
                },
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: self.depth_fmt,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: fs_entry,
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_fmt,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wireframe_needs_support() {
        let state = RenderState {
            wireframe: true,
            ..RenderState::default()
        };
        let key = PipelineKey::new(PrimitiveMode::Triangles, VertexSource::Immediate, &state, false);
        assert!(!key.wireframe);
        let key = PipelineKey::new(PrimitiveMode::Triangles, VertexSource::Immediate, &state, true);
        assert!(key.wireframe);
    }

    #[test]
    fn test_layouts_get_distinct_keys() {
        let state = RenderState::default();
        let plain = VertexSource::Packed(VertexLayout::default());
        let colored = VertexSource::Packed(VertexLayout {
            color: true,
            texcoord: false,
        });
        assert_ne!(
            PipelineKey::new(PrimitiveMode::TriangleStrip, plain, &state, true),
            PipelineKey::new(PrimitiveMode::TriangleStrip, colored, &state, true)
        );
    }
}
