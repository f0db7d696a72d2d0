use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::bytes_of;
use glam::{Mat4, Vec3};
use log::info;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::assets::{CubemapImages, TextureImage};
use crate::config::{BILLBOARD_TEXTURE, GRASS_TEXTURE, MATERIAL_PREFIX, SKYBOX_FACES};
use crate::model::{ModelData, ModelVertex, TextureKind};
use crate::overlay::{DebugOverlay, OverlayFrame};
use crate::scene::{back_to_front, ShaderPass, VEGETATION};
use crate::state::ProgramState;

use super::common::{aspect_ratio, FrameParams};
use super::hdr::{HdrTarget, ToneMapPass};
use super::mesh::{GpuModel, Material, MeshBuffers, ObjectBinding};
use super::shared::{
    FrameUniform, ObjectUniform, SpriteVertex, BILLBOARD_SHADER, BILLBOARD_VERTICES,
    GROUND_VERTICES, MODEL_SHADER, SKYBOX_SHADER, SKYBOX_VERTICES,
};
use super::texture::GpuTexture;

const MODEL_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
const SPRITE_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];
const SKY_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

/// GPU renderer backed by wgpu that draws the scene into an HDR target and
/// resolves it onto the window.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    target: HdrTarget,
    tone_map: ToneMapPass,
    pipelines: Pipelines,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    models: Vec<GpuModel>,
    object_bindings: Vec<ObjectBinding>,
    ground: Ground,
    billboards: Billboards,
    skybox: Skybox,
}

struct Pipelines {
    lit: wgpu::RenderPipeline,
    toon: wgpu::RenderPipeline,
    cutout: wgpu::RenderPipeline,
    ground: wgpu::RenderPipeline,
    billboard: wgpu::RenderPipeline,
    skybox: wgpu::RenderPipeline,
}

struct Layouts {
    frame: wgpu::BindGroupLayout,
    object: wgpu::BindGroupLayout,
    material: wgpu::BindGroupLayout,
    sprite: wgpu::BindGroupLayout,
    cube: wgpu::BindGroupLayout,
}

struct Ground {
    mesh: MeshBuffers,
    material: Material,
    binding: ObjectBinding,
}

struct Billboards {
    mesh: MeshBuffers,
    _texture: GpuTexture,
    bind_group: wgpu::BindGroup,
    bindings: Vec<ObjectBinding>,
}

struct Skybox {
    mesh: MeshBuffers,
    _texture: GpuTexture,
    bind_group: wgpu::BindGroup,
}

impl Renderer {
    /// Initializes the GPU, loads every scene asset and builds the pipelines.
    pub async fn new(window: Arc<Window>, state: &ProgramState) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;
        info!("using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("renderer-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no usable formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let target = HdrTarget::create(&device, config.width, config.height);
        let tone_map = ToneMapPass::new(&device, surface_format, &target);
        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(&device, &layouts);

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame-uniform"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: &layouts.frame,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let mut models = Vec::with_capacity(state.objects.len());
        let mut object_bindings = Vec::with_capacity(state.objects.len());
        for entry in &state.objects {
            let data = ModelData::load_or_empty(entry.model_path, MATERIAL_PREFIX);
            models.push(GpuModel::upload(&device, &queue, &layouts.material, &data));
            object_bindings.push(ObjectBinding::new(
                &device,
                &layouts.object,
                entry.transform.model_matrix(),
                entry.name,
            ));
        }

        let ground = Ground::new(&device, &queue, &layouts);
        let billboards = Billboards::new(&device, &queue, &layouts);
        let skybox = Skybox::new(&device, &queue, &layouts);

        if let Some(err) = device.pop_error_scope().await {
            return Err(anyhow!("failed to build render pipelines: {err}"));
        }
        info!(
            "renderer ready: {}x{} {:?}, {} models",
            size.width,
            size.height,
            surface_format,
            models.len()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            target,
            tone_map,
            pipelines,
            frame_buffer,
            frame_bind_group,
            models,
            object_bindings,
            ground,
            billboards,
            skybox,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Resizes the swap chain and the size-dependent render targets.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.target = HdrTarget::create(&self.device, new_size.width, new_size.height);
        self.tone_map.rebind(&self.device, &self.target);
    }

    /// Draws one frame of `state`, with the overlay composited last.
    pub fn render(
        &mut self,
        state: &ProgramState,
        overlay: Option<(&mut DebugOverlay, OverlayFrame)>,
    ) -> Result<(), wgpu::SurfaceError> {
        let params = FrameParams::new(state, aspect_ratio(self.config.width, self.config.height));
        self.queue.write_buffer(
            &self.frame_buffer,
            0,
            bytes_of(&FrameUniform::from(&params)),
        );
        for (entry, binding) in state.objects.iter().zip(&self.object_bindings) {
            binding.update(&self.queue, entry.transform.model_matrix());
        }
        self.tone_map.update(&self.queue, &state.tone_mapping);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("renderer-encoder"),
            });

        self.encode_scene(&mut encoder, state, params.eye);
        self.tone_map.encode(&mut encoder, &view);

        let mut command_buffers = match overlay {
            Some((overlay, frame)) => overlay.paint(
                &self.device,
                &self.queue,
                &mut encoder,
                &view,
                frame,
                [self.config.width, self.config.height],
            ),
            None => Vec::new(),
        };
        command_buffers.push(encoder.finish());
        self.queue.submit(command_buffers);
        output.present();
        Ok(())
    }

    fn encode_scene(&self, encoder: &mut wgpu::CommandEncoder, state: &ProgramState, eye: Vec3) {
        let clear = state.clear_color;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(clear.x),
                        g: f64::from(clear.y),
                        b: f64::from(clear.z),
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_bind_group(0, &self.frame_bind_group, &[]);

        pass.set_pipeline(&self.pipelines.lit);
        self.draw_models(&mut pass, state, ShaderPass::Lit);
        pass.set_pipeline(&self.pipelines.toon);
        self.draw_models(&mut pass, state, ShaderPass::Toon);

        pass.set_pipeline(&self.pipelines.ground);
        pass.set_bind_group(1, &self.ground.binding.bind_group, &[]);
        pass.set_bind_group(2, &self.ground.material.bind_group, &[]);
        self.ground.mesh.draw(&mut pass);

        pass.set_pipeline(&self.pipelines.cutout);
        self.draw_models(&mut pass, state, ShaderPass::Cutout);

        pass.set_pipeline(&self.pipelines.billboard);
        pass.set_bind_group(2, &self.billboards.bind_group, &[]);
        for index in back_to_front(&VEGETATION, eye) {
            pass.set_bind_group(1, &self.billboards.bindings[index].bind_group, &[]);
            self.billboards.mesh.draw(&mut pass);
        }

        pass.set_pipeline(&self.pipelines.skybox);
        pass.set_bind_group(1, &self.skybox.bind_group, &[]);
        self.skybox.mesh.draw(&mut pass);
    }

    fn draw_models(&self, pass: &mut wgpu::RenderPass<'_>, state: &ProgramState, shader: ShaderPass) {
        let parts = state
            .objects
            .iter()
            .zip(&self.models)
            .zip(&self.object_bindings);
        for ((entry, model), binding) in parts {
            if entry.pass != shader || !entry.transform.visible {
                continue;
            }
            pass.set_bind_group(1, &binding.bind_group, &[]);
            model.draw(pass);
        }
    }
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let frame = uniform_layout::<FrameUniform>(
            device,
            "frame-bind-layout",
            wgpu::ShaderStages::VERTEX_FRAGMENT,
        );
        let object =
            uniform_layout::<ObjectUniform>(device, "object-bind-layout", wgpu::ShaderStages::VERTEX);
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material-bind-layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                texture_entry(1, wgpu::TextureViewDimension::D2),
                sampler_entry(2),
            ],
        });
        let sprite = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprite-bind-layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                sampler_entry(1),
            ],
        });
        let cube = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cube-bind-layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::Cube),
                sampler_entry(1),
            ],
        });
        Self {
            frame,
            object,
            material,
            sprite,
            cube,
        }
    }
}

fn uniform_layout<T>(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
            },
            count: None,
        }],
    })
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Fixed-function choices that differ between the scene pipelines.
struct PipelineConfig<'a> {
    label: &'a str,
    module: &'a wgpu::ShaderModule,
    layout: &'a wgpu::PipelineLayout,
    fragment: &'a str,
    vertex: wgpu::VertexBufferLayout<'a>,
    blend: Option<wgpu::BlendState>,
    cull_mode: Option<wgpu::Face>,
    depth_write: bool,
    depth_compare: wgpu::CompareFunction,
}

impl Pipelines {
    fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let model_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("model-shader"),
            source: wgpu::ShaderSource::Wgsl(MODEL_SHADER.into()),
        });
        let billboard_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("billboard-shader"),
            source: wgpu::ShaderSource::Wgsl(BILLBOARD_SHADER.into()),
        });
        let skybox_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("skybox-shader"),
            source: wgpu::ShaderSource::Wgsl(SKYBOX_SHADER.into()),
        });

        let model_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("model-pipeline-layout"),
            bind_group_layouts: &[&layouts.frame, &layouts.object, &layouts.material],
            push_constant_ranges: &[],
        });
        let billboard_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("billboard-pipeline-layout"),
            bind_group_layouts: &[&layouts.frame, &layouts.object, &layouts.sprite],
            push_constant_ranges: &[],
        });
        let skybox_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("skybox-pipeline-layout"),
            bind_group_layouts: &[&layouts.frame, &layouts.cube],
            push_constant_ranges: &[],
        });

        let model_vertex = || wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &MODEL_ATTRIBUTES,
        };
        let opaque = |label, fragment, cull_mode| PipelineConfig {
            label,
            module: &model_shader,
            layout: &model_layout,
            fragment,
            vertex: model_vertex(),
            blend: None,
            cull_mode,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
        };

        Self {
            lit: create_pipeline(device, opaque("lit-pipeline", "fs_lit", None)),
            toon: create_pipeline(device, opaque("toon-pipeline", "fs_toon", None)),
            ground: create_pipeline(
                device,
                opaque("ground-pipeline", "fs_lit", Some(wgpu::Face::Back)),
            ),
            cutout: create_pipeline(
                device,
                PipelineConfig {
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    ..opaque("cutout-pipeline", "fs_cutout", None)
                },
            ),
            billboard: create_pipeline(
                device,
                PipelineConfig {
                    label: "billboard-pipeline",
                    module: &billboard_shader,
                    layout: &billboard_layout,
                    fragment: "fs_main",
                    vertex: wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<SpriteVertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &SPRITE_ATTRIBUTES,
                    },
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    cull_mode: None,
                    depth_write: true,
                    depth_compare: wgpu::CompareFunction::Less,
                },
            ),
            skybox: create_pipeline(
                device,
                PipelineConfig {
                    label: "skybox-pipeline",
                    module: &skybox_shader,
                    layout: &skybox_layout,
                    fragment: "fs_main",
                    vertex: wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &SKY_ATTRIBUTES,
                    },
                    blend: None,
                    cull_mode: None,
                    depth_write: false,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                },
            ),
        }
    }
}

fn create_pipeline(device: &wgpu::Device, config: PipelineConfig<'_>) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(config.label),
        layout: Some(config.layout),
        vertex: wgpu::VertexState {
            module: config.module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[config.vertex],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: config.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: HdrTarget::DEPTH_FORMAT,
            depth_write_enabled: config.depth_write,
            depth_compare: config.depth_compare,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: config.module,
            entry_point: Some(config.fragment),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: HdrTarget::COLOR_FORMAT,
                blend: config.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

impl Ground {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue, layouts: &Layouts) -> Self {
        let grass = TextureImage::load_or_placeholder(GRASS_TEXTURE, true);
        let specular = TextureImage::solid(
            TextureKind::Specular.slot_name(MATERIAL_PREFIX, 1),
            [0, 0, 0, 255],
            false,
        );
        let material = Material::new(
            device,
            &layouts.material,
            GpuTexture::upload(device, queue, &grass),
            GpuTexture::upload(device, queue, &specular),
            "ground-material",
        );
        Self {
            mesh: MeshBuffers::vertices_only(device, &GROUND_VERTICES, "ground"),
            material,
            binding: ObjectBinding::new(device, &layouts.object, Mat4::IDENTITY, "ground"),
        }
    }
}

impl Billboards {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue, layouts: &Layouts) -> Self {
        let image = TextureImage::load_or_placeholder(BILLBOARD_TEXTURE, true);
        let texture = GpuTexture::upload_clamped(device, queue, &image);
        let bind_group = sampled_bind_group(device, &layouts.sprite, &texture, "sprite-bind-group");
        let bindings = VEGETATION
            .iter()
            .enumerate()
            .map(|(i, position)| {
                ObjectBinding::new(
                    device,
                    &layouts.object,
                    Mat4::from_translation(*position),
                    &format!("billboard-{i}"),
                )
            })
            .collect();
        Self {
            mesh: MeshBuffers::vertices_only(device, &BILLBOARD_VERTICES, "billboard"),
            _texture: texture,
            bind_group,
            bindings,
        }
    }
}

impl Skybox {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue, layouts: &Layouts) -> Self {
        let images = CubemapImages::load_or_placeholder(&SKYBOX_FACES, true);
        let texture = GpuTexture::cubemap(device, queue, &images);
        let bind_group = sampled_bind_group(device, &layouts.cube, &texture, "skybox-bind-group");
        Self {
            mesh: MeshBuffers::vertices_only(device, &SKYBOX_VERTICES, "skybox"),
            _texture: texture,
            bind_group,
        }
    }
}

fn sampled_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &GpuTexture,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            },
        ],
    })
}
