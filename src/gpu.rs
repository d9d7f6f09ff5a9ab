use std::collections::HashMap;
use std::thread::{self, ThreadId};

use pollster::block_on;
use uuid::Uuid;
use wgpu::util::DeviceExt;

use crate::bounds::BoundingBox;
use crate::text_layout::TextBitmap;
use crate::traits::DrawBackend;
use crate::utils::Vertex;

/// Device/queue pair pinned to the thread that created it. Every
/// GPU-resource-creating call re-checks the thread and panics instead
/// of letting the driver corrupt state silently.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    render_thread: ThreadId,
}

impl GpuContext {
    /// Headless context for tools and tests that never present to a
    /// surface.
    pub fn new_headless() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
            .ok_or_else(|| anyhow::anyhow!("no suitable GPU adapter found"))?;
        let (device, queue) = block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                ..Default::default()
            },
            None,
        ))?;
        Ok(Self::from_device(device, queue))
    }

    /// Wraps a device the surrounding application already created. The
    /// calling thread becomes the designated render thread.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            render_thread: thread::current().id(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn ensure_render_thread(&self) {
        if thread::current().id() != self.render_thread {
            panic!("GPU resources must only be created on the render thread");
        }
    }
}

struct TextTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
    revision: u64,
}

/// One submitted quad: viewport-space geometry ready for the
/// application's render pass. The pass owns projection to clip space
/// and the actual draw-call issuance.
pub struct QuadCommand {
    pub texture: Uuid,
    pub vertices: [Vertex; 4],
    pub tint: [f32; 4],
}

/// wgpu-backed [`DrawBackend`]: owns the cached text textures and
/// collects the frame's quads. Draw-call issuance stays with the
/// surrounding application, which drains `take_quads` into its pass.
pub struct WgpuBackend {
    context: GpuContext,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    text_textures: HashMap<Uuid, TextTexture>,
    quads: Vec<QuadCommand>,
}

impl WgpuBackend {
    pub fn new(context: GpuContext) -> Self {
        let texture_bind_group_layout =
            context
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("texture_bind_group_layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                multisampled: false,
                                view_dimension: wgpu::TextureViewDimension::D2,
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
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
        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            context,
            texture_bind_group_layout,
            sampler,
            text_textures: HashMap::new(),
            quads: Vec::new(),
        }
    }

    pub fn texture_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_bind_group_layout
    }

    pub fn text_texture_bind_group(&self, id: &Uuid) -> Option<&wgpu::BindGroup> {
        self.text_textures.get(id).map(|t| &t.bind_group)
    }

    /// Drains the frame's collected quads for submission.
    pub fn take_quads(&mut self) -> Vec<QuadCommand> {
        std::mem::take(&mut self.quads)
    }

    /// Vertex buffer for one quad, ready to bind in the caller's pass.
    pub fn create_quad_vertex_buffer(&self, quad: &QuadCommand) -> wgpu::Buffer {
        self.context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Quad Vertex Buffer"),
                contents: bytemuck::cast_slice(&quad.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
    }

    fn create_text_texture(&self, width: u32, height: u32) -> TextTexture {
        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Text Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[wgpu::TextureFormat::Rgba8UnormSrgb],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.texture_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
                label: Some("text_texture_bind_group"),
            });
        TextTexture {
            texture,
            bind_group,
            size: (width, height),
            revision: u64::MAX,
        }
    }

    fn write_bitmap(context: &GpuContext, texture: &wgpu::Texture, bitmap: &TextBitmap) {
        let bytes_per_pixel = 4;
        let unpadded_bytes_per_row = bitmap.width as usize * bytes_per_pixel;
        const COPY_BYTES_PER_ROW_ALIGNMENT: usize = 256;
        let padded_bytes_per_row = (unpadded_bytes_per_row + COPY_BYTES_PER_ROW_ALIGNMENT - 1)
            / COPY_BYTES_PER_ROW_ALIGNMENT
            * COPY_BYTES_PER_ROW_ALIGNMENT;

        let total_size = padded_bytes_per_row * bitmap.height as usize;
        let mut padded_buffer = vec![0u8; total_size];
        for y in 0..bitmap.height as usize {
            let dst_start = y * padded_bytes_per_row;
            let src_start = y * unpadded_bytes_per_row;
            padded_buffer[dst_start..dst_start + unpadded_bytes_per_row]
                .copy_from_slice(&bitmap.data[src_start..src_start + unpadded_bytes_per_row]);
        }

        let buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Text Pixel Buffer"),
                contents: &padded_buffer,
                usage: wgpu::BufferUsages::COPY_SRC,
            });

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Text Texture Copy Encoder"),
            });
        encoder.copy_buffer_to_texture(
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row as u32),
                    rows_per_image: Some(bitmap.height),
                },
            },
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: bitmap.width,
                height: bitmap.height,
                depth_or_array_layers: 1,
            },
        );
        context.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl DrawBackend for WgpuBackend {
    fn upload_text_texture(&mut self, id: Uuid, bitmap: &TextBitmap, revision: u64) {
        if bitmap.width == 0 || bitmap.height == 0 {
            return;
        }
        if let Some(existing) = self.text_textures.get(&id) {
            if existing.revision == revision && existing.size == (bitmap.width, bitmap.height) {
                return;
            }
        }
        self.context.ensure_render_thread();

        let needs_new = self
            .text_textures
            .get(&id)
            .map_or(true, |t| t.size != (bitmap.width, bitmap.height));
        if needs_new {
            let entry = self.create_text_texture(bitmap.width, bitmap.height);
            self.text_textures.insert(id, entry);
        }
        let entry = self
            .text_textures
            .get_mut(&id)
            .expect("entry inserted above");
        Self::write_bitmap(&self.context, &entry.texture, bitmap);
        entry.revision = revision;
    }

    fn draw_textured_quad(&mut self, texture: Uuid, quad: &BoundingBox, tint: [f32; 4]) {
        let tex_coords = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let mut vertices = [Vertex {
            position: [0.0, 0.0, 0.0],
            tex_coords: [0.0, 0.0],
        }; 4];
        for (i, corner) in quad.corners.iter().enumerate() {
            vertices[i] = Vertex {
                position: [corner.x, corner.y, 0.0],
                tex_coords: tex_coords[i],
            };
        }
        self.quads.push(QuadCommand {
            texture,
            vertices,
            tint,
        });
    }
}
