//! wgpu implementation of the benchmark's [`Graphics`] interface.
//!
//! Immediate-mode vertices are streamed into a per-frame vertex buffer,
//! command lists become render bundles and buffer objects map onto
//! `wgpu::Buffer`s. Draws are queued between `begin_frame` and `end_frame`
//! and encoded into a single render pass when the frame ends.

pub mod context;
pub mod pipelines;
pub mod targets;

use self::{
    context::GfxContext,
    pipelines::{PipelineCache, PipelineKey, VertexSource},
    targets::Targets,
};
use crate::camera::{CameraMatrices, LIGHT_DIR};
use bytemuck::{Pod, Zeroable};
use meshbench::geometry::Vector3;
use meshbench::gfx::{
    BufferId, BufferKind, BufferUsage, Capabilities, CommandListId, Graphics, GraphicsError,
    GraphicsResult, GraphicsWarning, PrimitiveMode, RenderState, TextureId, VertexLayout,
};
use meshbench::ViewState;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use wgpu::util::{DeviceExt, RenderEncoder};
use winit::window::Window;

/// One immediate-mode vertex as streamed to the GPU.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ImmediateVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 3],
}

impl Default for ImmediateVertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
            color: [1.0; 3],
            uv: [0.0; 3],
        }
    }
}

/// Must match `Uniforms` in surface.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SurfaceUniforms {
    model_view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 3],
    light_dir: [f32; 4],
    flags: [u32; 4],
}

impl SurfaceUniforms {
    fn new(camera: &CameraMatrices, state: &RenderState) -> Self {
        let n = camera.normal;
        Self {
            model_view: camera.model_view.to_cols_array_2d(),
            projection: camera.projection.to_cols_array_2d(),
            normal_matrix: [
                n.x_axis.extend(0.0).to_array(),
                n.y_axis.extend(0.0).to_array(),
                n.z_axis.extend(0.0).to_array(),
            ],
            light_dir: [LIGHT_DIR[0], LIGHT_DIR[1], LIGHT_DIR[2], 0.0],
            flags: [
                u32::from(state.texturing),
                u32::from(state.two_sided_lighting),
                0,
                0,
            ],
        }
    }
}

/// Color then texcoord, read by packed pipelines for absent attributes.
const ATTRIBUTE_DEFAULTS: [f32; 6] = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0];

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphicsOptions {
    /// Report no buffer-object support even when the device has it.
    pub disable_buffer_objects: bool,
}

#[derive(Debug, Clone)]
enum FrameOp {
    Draw {
        key: PipelineKey,
        vertices: Range<u32>,
        texture: Option<TextureId>,
    },
    DrawIndexed {
        key: PipelineKey,
        vertex: BufferId,
        index: BufferId,
        count: u32,
        byte_offset: u64,
        texture: Option<TextureId>,
    },
    Replay(CommandListId),
}

struct Batch {
    mode: PrimitiveMode,
    start: u32,
}

struct Recording {
    list: CommandListId,
    vertices: Vec<ImmediateVertex>,
    ops: Vec<FrameOp>,
}

struct RecordedList {
    bundle: wgpu::RenderBundle,
    _vertices: Option<wgpu::Buffer>,
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    kind: BufferKind,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct StreamBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
}

pub struct WgpuGraphics {
    gfx: GfxContext,
    targets: Targets,
    pipelines: PipelineCache,
    capabilities: Capabilities,
    state: RenderState,

    uniforms: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white: GpuTexture,
    defaults: wgpu::Buffer,

    current: ImmediateVertex,
    batch: Option<Batch>,
    stream: Vec<ImmediateVertex>,
    stream_buffer: Option<StreamBuffer>,
    ops: Vec<FrameOp>,
    frame_open: bool,
    recording: Option<Recording>,

    next_handle: u32,
    command_lists: HashMap<u32, Option<RecordedList>>,
    buffers: HashMap<u32, GpuBuffer>,
    textures: HashMap<u32, GpuTexture>,
    bound_texture: Option<TextureId>,
    bound_vertex: Option<(BufferId, VertexLayout)>,
    bound_index: Option<BufferId>,
}

impl WgpuGraphics {
    pub async fn new(window: Arc<Window>, options: GraphicsOptions) -> anyhow::Result<Self> {
        let gfx = GfxContext::new(window).await?;
        log::info!("GPU adapter: {}", gfx.adapter_name);

        let capabilities = Capabilities {
            buffer_objects: !options.disable_buffer_objects,
            wireframe: gfx.features.contains(wgpu::Features::POLYGON_MODE_LINE),
        };

        let targets = Targets::new(&gfx.device, gfx.size);
        let device = &gfx.device;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Surface Uniforms BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Surface Texture BGL"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Surface Uniforms"),
            size: std::mem::size_of::<SurfaceUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Surface Uniforms BG"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Surface Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let white = upload_texture(
            device,
            &gfx.queue,
            &texture_layout,
            &sampler,
            "White Texture",
            1,
            1,
            &[255; 4],
        );

        let defaults = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Attribute Defaults"),
            contents: bytemuck::cast_slice(&ATTRIBUTE_DEFAULTS),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let pipelines = PipelineCache::new(
            device,
            &[&uniform_layout, &texture_layout],
            gfx.config.format,
            targets.depth_fmt,
        );

        Ok(Self {
            gfx,
            targets,
            pipelines,
            capabilities,
            state: RenderState::default(),
            uniforms,
            uniform_group,
            texture_layout,
            sampler,
            white,
            defaults,
            current: ImmediateVertex::default(),
            batch: None,
            stream: Vec::new(),
            stream_buffer: None,
            ops: Vec::new(),
            frame_open: false,
            recording: None,
            next_handle: 1,
            command_lists: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            bound_texture: None,
            bound_vertex: None,
            bound_index: None,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.targets.resize(&self.gfx.device, new_size);
        }
    }

    /// Queues a non-fatal error for [`Graphics::take_error`].
    fn report(&self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("graphics misuse: {message}");
        self.gfx.errors.lock().push_back(message);
    }

    fn next_handle(&mut self) -> GraphicsResult<u32> {
        let handle = self.next_handle;
        self.next_handle = handle
            .checked_add(1)
            .ok_or_else(|| GraphicsError::Backend("handle space exhausted".into()))?;
        Ok(handle)
    }

    /// Runs `create` inside error scopes so allocation failures surface synchronously.
    fn allocate<T>(&self, what: &str, create: impl FnOnce(&wgpu::Device) -> T) -> GraphicsResult<T> {
        let device = &self.gfx.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(device);
        let validation = pollster::block_on(device.pop_error_scope());
        let oom = pollster::block_on(device.pop_error_scope());
        match oom.or(validation) {
            Some(err) => Err(GraphicsError::AllocationFailed(format!("{what}: {err}"))),
            None => Ok(value),
        }
    }

    fn push_op(&mut self, op: FrameOp) {
        match &mut self.recording {
            Some(recording) => recording.ops.push(op),
            None => self.ops.push(op),
        }
    }

    fn emitted_vertices(&self) -> u32 {
        let len = match &self.recording {
            Some(recording) => recording.vertices.len(),
            None => self.stream.len(),
        };
        len as u32
    }

    fn texture_group(&self, texture: Option<TextureId>) -> &wgpu::BindGroup {
        texture
            .and_then(|id| self.textures.get(&id.get()))
            .map_or(&self.white.bind_group, |t| &t.bind_group)
    }

    fn encode_op<'a, E: RenderEncoder<'a>>(
        &'a self,
        encoder: &mut E,
        op: &FrameOp,
        stream: Option<&'a wgpu::Buffer>,
    ) {
        match op {
            FrameOp::Draw {
                key,
                vertices,
                texture,
            } => {
                let (Some(pipeline), Some(stream)) = (self.pipelines.get(key), stream) else {
                    return;
                };
                encoder.set_pipeline(pipeline);
                encoder.set_bind_group(1, self.texture_group(*texture), &[]);
                encoder.set_vertex_buffer(0, stream.slice(..));
                encoder.draw(vertices.clone(), 0..1);
            }
            FrameOp::DrawIndexed {
                key,
                vertex,
                index,
                count,
                byte_offset,
                texture,
            } => {
                let (Some(pipeline), Some(vertex), Some(index)) = (
                    self.pipelines.get(key),
                    self.buffers.get(&vertex.get()),
                    self.buffers.get(&index.get()),
                ) else {
                    return;
                };
                encoder.set_pipeline(pipeline);
                encoder.set_bind_group(1, self.texture_group(*texture), &[]);
                encoder.set_vertex_buffer(0, vertex.buffer.slice(..));
                encoder.set_vertex_buffer(1, self.defaults.slice(..));
                encoder.set_index_buffer(index.buffer.slice(*byte_offset..), wgpu::IndexFormat::Uint32);
                encoder.draw_indexed(0..*count, 0, 0..1);
            }
            FrameOp::Replay(_) => {}
        }
    }

    fn upload_stream(&mut self) {
        if self.stream.is_empty() {
            return;
        }
        let bytes: &[u8] = bytemuck::cast_slice(&self.stream);
        let needed = bytes.len() as u64;
        if self.stream_buffer.as_ref().map_or(true, |s| s.capacity < needed) {
            let capacity = needed.next_power_of_two();
            log::debug!("growing immediate vertex stream to {capacity} bytes");
            self.stream_buffer = Some(StreamBuffer {
                buffer: self.gfx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Immediate Vertex Stream"),
                    size: capacity,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
                capacity,
            });
        }
        if let Some(stream) = &self.stream_buffer {
            self.gfx.queue.write_buffer(&stream.buffer, 0, bytes);
        }
    }

    fn encode_frame(&self, target: &wgpu::TextureView, ops: &[FrameOp]) -> wgpu::CommandBuffer {
        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Surface Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &self.uniform_group, &[]);
            let stream = self.stream_buffer.as_ref().map(|s| &s.buffer);
            for op in ops {
                match op {
                    FrameOp::Replay(list) => {
                        if let Some(Some(recorded)) = self.command_lists.get(&list.get()) {
                            pass.execute_bundles(std::iter::once(&recorded.bundle));
                            // Bundle execution resets the pass bindings.
                            pass.set_bind_group(0, &self.uniform_group, &[]);
                        }
                    }
                    op => self.encode_op(&mut pass, op, stream),
                }
            }
        }
        encoder.finish()
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    GpuTexture {
        _texture: texture,
        bind_group,
    }
}

fn to_f32(v: Vector3) -> [f32; 3] {
    v.as_vec3().to_array()
}

impl Graphics for WgpuGraphics {
    fn backend_name(&self) -> &'static str {
        "wgpu"
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn apply_state(&mut self, state: &RenderState) {
        if state.wireframe && !self.capabilities.wireframe {
            log::debug!("wireframe requested but the adapter cannot draw lines; filling");
        }
        self.state = *state;
    }

    fn begin_frame(&mut self, view: &ViewState) {
        if self.frame_open {
            self.report("begin_frame called twice");
        }
        let camera = CameraMatrices::from_view(view);
        let uniforms = SurfaceUniforms::new(&camera, &self.state);
        self.gfx
            .queue
            .write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));
        self.ops.clear();
        self.stream.clear();
        self.frame_open = true;
    }

    fn end_frame(&mut self) {
        if !self.frame_open {
            self.report("end_frame without begin_frame");
            return;
        }
        self.frame_open = false;
        self.upload_stream();

        let frame = match self.gfx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gfx.reconfigure();
                return;
            }
            Err(err) => {
                self.report(format!("surface: {err}"));
                return;
            }
        };
        let target = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let ops = std::mem::take(&mut self.ops);
        let commands = self.encode_frame(&target, &ops);
        self.ops = ops;

        self.gfx.queue.submit(std::iter::once(commands));
        frame.present();
        // Block until the GPU is done so frame time covers the whole submission.
        self.gfx.device.poll(wgpu::Maintain::Wait);
    }

    fn begin(&mut self, mode: PrimitiveMode) {
        if self.batch.is_some() {
            self.report("begin inside an open batch");
        }
        self.batch = Some(Batch {
            mode,
            start: self.emitted_vertices(),
        });
    }

    fn color(&mut self, rgb: Vector3) {
        self.current.color = to_f32(rgb);
    }

    fn tex_coord(&mut self, s: f64, t: f64) {
        self.current.uv = [s as f32, t as f32, 0.0];
    }

    fn normal(&mut self, normal: Vector3) {
        self.current.normal = to_f32(normal);
    }

    fn vertex(&mut self, position: Vector3) {
        if self.batch.is_none() {
            self.report("vertex outside begin/end");
            return;
        }
        let vertex = ImmediateVertex {
            position: to_f32(position),
            ..self.current
        };
        match &mut self.recording {
            Some(recording) => recording.vertices.push(vertex),
            None => self.stream.push(vertex),
        }
    }

    fn end(&mut self) {
        let Some(batch) = self.batch.take() else {
            self.report("end without begin");
            return;
        };
        let end = self.emitted_vertices();
        if end == batch.start {
            return;
        }
        let key = PipelineKey::new(
            batch.mode,
            VertexSource::Immediate,
            &self.state,
            self.capabilities.wireframe,
        );
        self.pipelines.ensure(&self.gfx.device, key);
        let texture = self.bound_texture;
        self.push_op(FrameOp::Draw {
            key,
            vertices: batch.start..end,
            texture,
        });
    }

    fn create_command_list(&mut self) -> GraphicsResult<CommandListId> {
        let raw = self.next_handle()?;
        let id = CommandListId::new(raw).ok_or(GraphicsError::UnknownHandle(raw))?;
        self.command_lists.insert(raw, None);
        Ok(id)
    }

    fn begin_recording(&mut self, list: CommandListId) -> GraphicsResult<()> {
        if self.recording.is_some() {
            return Err(GraphicsError::RecordingActive);
        }
        if !self.command_lists.contains_key(&list.get()) {
            return Err(GraphicsError::UnknownHandle(list.get()));
        }
        self.recording = Some(Recording {
            list,
            vertices: Vec::new(),
            ops: Vec::new(),
        });
        Ok(())
    }

    fn end_recording(&mut self) -> GraphicsResult<()> {
        let recording = self.recording.take().ok_or(GraphicsError::NotRecording)?;
        if !self.command_lists.contains_key(&recording.list.get()) {
            return Err(GraphicsError::UnknownHandle(recording.list.get()));
        }

        let vertices = if recording.vertices.is_empty() {
            None
        } else {
            let contents: &[u8] = bytemuck::cast_slice(&recording.vertices);
            Some(self.allocate("command list vertices", |device| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Command List Vertices"),
                    contents,
                    usage: wgpu::BufferUsages::VERTEX,
                })
            })?)
        };

        let bundle = {
            let mut encoder =
                self.gfx
                    .device
                    .create_render_bundle_encoder(&wgpu::RenderBundleEncoderDescriptor {
                        label: Some("Command List"),
                        color_formats: &[Some(self.pipelines.color_format())],
                        depth_stencil: Some(wgpu::RenderBundleDepthStencil {
                            format: self.pipelines.depth_format(),
                            depth_read_only: false,
                            stencil_read_only: true,
                        }),
                        sample_count: 1,
                        multiview: None,
                    });
            encoder.set_bind_group(0, &self.uniform_group, &[]);
            for op in &recording.ops {
                self.encode_op(&mut encoder, op, vertices.as_ref());
            }
            encoder.finish(&wgpu::RenderBundleDescriptor {
                label: Some("Command List"),
            })
        };

        self.command_lists.insert(
            recording.list.get(),
            Some(RecordedList {
                bundle,
                _vertices: vertices,
            }),
        );
        Ok(())
    }

    fn replay(&mut self, list: CommandListId) {
        if self.recording.is_some() {
            self.report(format!("cannot replay {list} while recording"));
            return;
        }
        match self.command_lists.get(&list.get()) {
            Some(Some(_)) => self.ops.push(FrameOp::Replay(list)),
            Some(None) => self.report(format!("{list} was never recorded")),
            None => self.report(format!("replay of unknown {list}")),
        }
    }

    fn destroy_command_list(&mut self, list: CommandListId) {
        if self.command_lists.remove(&list.get()).is_none() {
            self.report(format!("destroy of unknown {list}"));
        }
    }

    fn create_buffer(
        &mut self,
        kind: BufferKind,
        usage: BufferUsage,
        data: &[u8],
    ) -> GraphicsResult<BufferId> {
        if !self.capabilities.buffer_objects {
            return Err(GraphicsError::Backend("buffer objects are disabled".into()));
        }
        let mut usages = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        if usage == BufferUsage::Dynamic {
            usages |= wgpu::BufferUsages::COPY_DST;
        }
        let buffer = self.allocate("buffer object", |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Buffer Object"),
                contents: data,
                usage: usages,
            })
        })?;
        let raw = self.next_handle()?;
        let id = BufferId::new(raw).ok_or(GraphicsError::UnknownHandle(raw))?;
        self.buffers.insert(raw, GpuBuffer { buffer, kind });
        Ok(id)
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferId, layout: VertexLayout) {
        match self.buffers.get(&buffer.get()) {
            Some(b) if b.kind == BufferKind::Vertex => self.bound_vertex = Some((buffer, layout)),
            Some(_) => self.report(format!("{buffer} is not a vertex buffer")),
            None => self.report(format!("bind of unknown {buffer}")),
        }
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        match self.buffers.get(&buffer.get()) {
            Some(b) if b.kind == BufferKind::Index => self.bound_index = Some(buffer),
            Some(_) => self.report(format!("{buffer} is not an index buffer")),
            None => self.report(format!("bind of unknown {buffer}")),
        }
    }

    fn draw_indexed(&mut self, mode: PrimitiveMode, count: u32, byte_offset: u64) {
        let (Some((vertex, layout)), Some(index)) = (self.bound_vertex, self.bound_index) else {
            self.report("draw_indexed without bound buffers");
            return;
        };
        let index_size = self
            .buffers
            .get(&index.get())
            .map_or(0, |b| b.buffer.size());
        let end = byte_offset + u64::from(count) * std::mem::size_of::<u32>() as u64;
        if end > index_size || byte_offset % 4 != 0 {
            self.report(format!(
                "draw_indexed range {byte_offset}..{end} outside {index} ({index_size} bytes)"
            ));
            return;
        }
        if count == 0 {
            return;
        }
        let key = PipelineKey::new(
            mode,
            VertexSource::Packed(layout),
            &self.state,
            self.capabilities.wireframe,
        );
        self.pipelines.ensure(&self.gfx.device, key);
        let texture = self.bound_texture;
        self.push_op(FrameOp::DrawIndexed {
            key,
            vertex,
            index,
            count,
            byte_offset,
            texture,
        });
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        match self.buffers.remove(&buffer.get()) {
            Some(gpu) => {
                gpu.buffer.destroy();
                if self.bound_vertex.is_some_and(|(id, _)| id == buffer) {
                    self.bound_vertex = None;
                }
                if self.bound_index == Some(buffer) {
                    self.bound_index = None;
                }
            }
            None => self.report(format!("destroy of unknown {buffer}")),
        }
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> GraphicsResult<TextureId> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(GraphicsError::Backend(format!(
                "{width}x{height} texture needs {expected} bytes, got {}",
                rgba.len()
            )));
        }
        let texture = self.allocate("texture", |device| {
            upload_texture(
                device,
                &self.gfx.queue,
                &self.texture_layout,
                &self.sampler,
                "Surface Texture",
                width,
                height,
                rgba,
            )
        })?;
        let raw = self.next_handle()?;
        let id = TextureId::new(raw).ok_or(GraphicsError::UnknownHandle(raw))?;
        self.textures.insert(raw, texture);
        Ok(id)
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        match texture {
            Some(id) if !self.textures.contains_key(&id.get()) => {
                self.report(format!("bind of unknown {id}"));
            }
            _ => self.bound_texture = texture,
        }
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture.get()).is_none() {
            self.report(format!("destroy of unknown {texture}"));
            return;
        }
        if self.bound_texture == Some(texture) {
            self.bound_texture = None;
        }
    }

    fn take_error(&mut self) -> Option<GraphicsWarning> {
        self.gfx.errors.lock().pop_front().map(GraphicsWarning)
    }
}
