#![allow(dead_code)]

use ash::vk;

use vkrestore::command::{
    BeginCommandBuffer, BeginRenderPass, BindDescriptorSets, BindPipeline, BufferImageCopy,
    ClearValue, CopyBufferToImage, Draw, EndCommandBuffer, EndRenderPass, ImageBarrier,
    PipelineBarrier,
};
use vkrestore::object::binding::{DescriptorBuffer, DescriptorImage, DescriptorWrite, MemoryBinding};
use vkrestore::object::extension::{chain, DedicatedAllocation, ExtensionBody};
use vkrestore::object::*;
use vkrestore::{Binding, Command, StateTracker};

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ----- construction parameter shorthands -----

pub fn image_info(mip_levels: u32, array_layers: u32) -> ImageInfo {
    ImageInfo {
        flags: vk::ImageCreateFlags::empty(),
        image_type: vk::ImageType::TYPE_2D,
        format: vk::Format::R8G8B8A8_UNORM,
        extent: Extent3D {
            width: 256,
            height: 256,
            depth: 1,
        },
        mip_levels,
        array_layers,
        samples: vk::SampleCountFlags::TYPE_1,
        tiling: vk::ImageTiling::OPTIMAL,
        usage: vk::ImageUsageFlags::SAMPLED
            | vk::ImageUsageFlags::TRANSFER_DST
            | vk::ImageUsageFlags::COLOR_ATTACHMENT,
        sharing_mode: vk::SharingMode::EXCLUSIVE,
        queue_family_indices: vec![],
        initial_layout: vk::ImageLayout::UNDEFINED,
        swapchain: None,
        next: None,
    }
}

pub fn buffer_info(size: u64) -> BufferInfo {
    BufferInfo {
        flags: vk::BufferCreateFlags::empty(),
        size,
        usage: vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::UNIFORM_BUFFER,
        sharing_mode: vk::SharingMode::EXCLUSIVE,
        queue_family_indices: vec![],
        next: None,
    }
}

pub fn view_info(image: Identity) -> ImageViewInfo {
    ImageViewInfo {
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format: vk::Format::R8G8B8A8_UNORM,
        components: ComponentMapping::default(),
        subresource_range: SubresourceRange::whole_color(),
    }
}

pub fn sampler_info() -> SamplerInfo {
    SamplerInfo {
        mag_filter: vk::Filter::LINEAR,
        min_filter: vk::Filter::LINEAR,
        mipmap_mode: vk::SamplerMipmapMode::LINEAR,
        address_mode_u: vk::SamplerAddressMode::REPEAT,
        address_mode_v: vk::SamplerAddressMode::REPEAT,
        address_mode_w: vk::SamplerAddressMode::REPEAT,
        mip_lod_bias: 0.0,
        anisotropy_enable: false,
        max_anisotropy: 1.0,
        compare_enable: false,
        compare_op: vk::CompareOp::ALWAYS,
        min_lod: 0.0,
        max_lod: 4.0,
        border_color: vk::BorderColor::FLOAT_OPAQUE_BLACK,
        unnormalized_coordinates: false,
    }
}

pub fn color_pass() -> RenderPassInfo {
    RenderPassInfo {
        attachments: vec![AttachmentDescription {
            format: vk::Format::R8G8B8A8_UNORM,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }],
        subpasses: vec![SubpassDescription {
            pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
            input_attachments: vec![],
            color_attachments: vec![AttachmentReference {
                attachment: 0,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            }],
            resolve_attachments: vec![],
            depth_stencil_attachment: None,
            preserve_attachments: vec![],
        }],
        dependencies: vec![],
    }
}

pub fn barrier(
    image: Identity,
    old: vk::ImageLayout,
    new: vk::ImageLayout,
    range: SubresourceRange,
) -> Command {
    Command::PipelineBarrier(PipelineBarrier {
        src_stage_mask: vk::PipelineStageFlags::TOP_OF_PIPE,
        dst_stage_mask: vk::PipelineStageFlags::TRANSFER,
        dependency_flags: vk::DependencyFlags::empty(),
        memory_barriers: vec![],
        buffer_barriers: vec![],
        image_barriers: vec![ImageBarrier {
            src_access_mask: vk::AccessFlags::empty(),
            dst_access_mask: vk::AccessFlags::TRANSFER_WRITE,
            old_layout: old,
            new_layout: new,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            image,
            subresource_range: range,
        }],
    })
}

pub fn range(mip: u32, mips: u32, layer: u32, layers: u32) -> SubresourceRange {
    SubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: mip,
        level_count: mips,
        base_array_layer: layer,
        layer_count: layers,
    }
}

// ----- a small but complete frame -----

/// Identities of every object `build_scene` creates.
#[derive(Debug, Clone)]
pub struct Scene {
    pub instance: Identity,
    pub physical: Identity,
    pub device: Identity,
    pub queue: Identity,
    pub fence: Identity,
    pub semaphore: Identity,
    pub pool: Identity,
    pub cmd: Identity,
    pub memory: Identity,
    pub staging: Identity,
    pub texture: Identity,
    pub texture_view: Identity,
    pub target: Identity,
    pub target_memory: Identity,
    pub target_view: Identity,
    pub sampler: Identity,
    pub set_layout: Identity,
    pub pipeline_layout: Identity,
    pub shader: Identity,
    pub render_pass: Identity,
    pub framebuffer: Identity,
    pub pipeline: Identity,
    pub descriptor_pool: Identity,
    pub descriptor_set: Identity,
}

impl Scene {
    pub fn all(&self) -> Vec<Identity> {
        vec![
            self.instance,
            self.physical,
            self.device,
            self.queue,
            self.fence,
            self.semaphore,
            self.pool,
            self.cmd,
            self.memory,
            self.staging,
            self.texture,
            self.texture_view,
            self.target,
            self.target_memory,
            self.target_view,
            self.sampler,
            self.set_layout,
            self.pipeline_layout,
            self.shader,
            self.render_pass,
            self.framebuffer,
            self.pipeline,
            self.descriptor_pool,
            self.descriptor_set,
        ]
    }
}

/// Capture-side handles start at 0x100 and grow by one per object.
pub fn build_scene(t: &StateTracker) -> Scene {
    let mut next = 0x100u64;
    let mut h = || {
        next += 1;
        next
    };

    let instance = Identity::root(ObjectKind::Instance, h());
    t.on_create(
        None,
        instance,
        CreateInfo::Instance(InstanceInfo {
            application_name: "scene".into(),
            api_version: vk::API_VERSION_1_2,
            ..InstanceInfo::default()
        }),
    )
    .unwrap();

    let physical = Identity::child_of(ObjectKind::PhysicalDevice, h(), &instance);
    t.on_create(
        Some(instance),
        physical,
        CreateInfo::PhysicalDevice(PhysicalDeviceInfo {
            index: 0,
            vendor_id: 0x10de,
            device_id: 0x2204,
            device_name: "shadow gpu".into(),
        }),
    )
    .unwrap();

    let device = Identity::child_of(ObjectKind::Device, h(), &physical);
    t.on_create(
        Some(physical),
        device,
        CreateInfo::Device(DeviceInfo {
            queue_infos: vec![DeviceQueueInfo {
                queue_family_index: 0,
                queue_priorities: vec![1.0],
            }],
            enabled_extensions: vec!["VK_KHR_swapchain".into()],
            next: None,
        }),
    )
    .unwrap();

    let child = |kind: ObjectKind, handle: u64, info: CreateInfo| {
        let id = Identity::child_of(kind, handle, &device);
        t.on_create(Some(device), id, info).unwrap();
        id
    };

    let queue = child(
        ObjectKind::Queue,
        h(),
        CreateInfo::Queue(QueueInfo {
            queue_family_index: 0,
            queue_index: 0,
        }),
    );
    let fence = child(
        ObjectKind::Fence,
        h(),
        CreateInfo::Fence(FenceInfo {
            flags: vk::FenceCreateFlags::SIGNALED,
        }),
    );
    let semaphore = child(
        ObjectKind::Semaphore,
        h(),
        CreateInfo::Semaphore(SemaphoreInfo {
            flags: vk::SemaphoreCreateFlags::empty(),
            next: None,
        }),
    );
    let pool = child(
        ObjectKind::CommandPool,
        h(),
        CreateInfo::CommandPool(CommandPoolInfo {
            flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            queue_family_index: 0,
        }),
    );
    let cmd = child(
        ObjectKind::CommandBuffer,
        h(),
        CreateInfo::CommandBuffer(CommandBufferInfo {
            command_pool: pool,
            level: vk::CommandBufferLevel::PRIMARY,
        }),
    );
    let memory = child(
        ObjectKind::DeviceMemory,
        h(),
        CreateInfo::DeviceMemory(DeviceMemoryInfo {
            allocation_size: 1 << 20,
            memory_type_index: 1,
            next: None,
        }),
    );
    let staging = child(ObjectKind::Buffer, h(), CreateInfo::Buffer(buffer_info(64 * 1024)));
    let texture = child(ObjectKind::Image, h(), CreateInfo::Image(image_info(4, 1)));
    let texture_view = child(
        ObjectKind::ImageView,
        h(),
        CreateInfo::ImageView(view_info(texture)),
    );
    let target = child(ObjectKind::Image, h(), CreateInfo::Image(image_info(1, 1)));
    // memory dedicated to the image it is then bound to
    let target_memory = child(
        ObjectKind::DeviceMemory,
        h(),
        CreateInfo::DeviceMemory(DeviceMemoryInfo {
            allocation_size: 256 * 256 * 4,
            memory_type_index: 0,
            next: chain([ExtensionBody::DedicatedAllocation(DedicatedAllocation {
                image: Some(target),
                buffer: None,
            })]),
        }),
    );
    let target_view = child(
        ObjectKind::ImageView,
        h(),
        CreateInfo::ImageView(view_info(target)),
    );
    let sampler = child(ObjectKind::Sampler, h(), CreateInfo::Sampler(sampler_info()));
    let set_layout = child(
        ObjectKind::DescriptorSetLayout,
        h(),
        CreateInfo::DescriptorSetLayout(DescriptorSetLayoutInfo {
            flags: vk::DescriptorSetLayoutCreateFlags::empty(),
            bindings: vec![
                DescriptorSetLayoutBinding {
                    binding: 0,
                    descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    descriptor_count: 1,
                    stage_flags: vk::ShaderStageFlags::FRAGMENT,
                    immutable_samplers: vec![sampler],
                },
                DescriptorSetLayoutBinding {
                    binding: 1,
                    descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                    descriptor_count: 1,
                    stage_flags: vk::ShaderStageFlags::VERTEX,
                    immutable_samplers: vec![],
                },
            ],
        }),
    );
    let pipeline_layout = child(
        ObjectKind::PipelineLayout,
        h(),
        CreateInfo::PipelineLayout(PipelineLayoutInfo {
            set_layouts: vec![set_layout],
            push_constant_ranges: vec![PushConstantRange {
                stage_flags: vk::ShaderStageFlags::VERTEX,
                offset: 0,
                size: 64,
            }],
        }),
    );
    let shader = child(
        ObjectKind::ShaderModule,
        h(),
        CreateInfo::ShaderModule(ShaderModuleInfo {
            code: vec![0x0723_0203, 0x0001_0000, 7, 42],
        }),
    );
    let render_pass = child(
        ObjectKind::RenderPass,
        h(),
        CreateInfo::RenderPass(color_pass()),
    );
    let framebuffer = child(
        ObjectKind::Framebuffer,
        h(),
        CreateInfo::Framebuffer(FramebufferInfo {
            render_pass,
            attachments: vec![target_view],
            width: 256,
            height: 256,
            layers: 1,
        }),
    );
    let pipeline = child(
        ObjectKind::Pipeline,
        h(),
        CreateInfo::Pipeline(PipelineInfo {
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            layout: pipeline_layout,
            stages: vec![
                ShaderStage {
                    stage: vk::ShaderStageFlags::VERTEX,
                    module: shader,
                    entry_point: "vs_main".into(),
                    specialization_data: vec![],
                },
                ShaderStage {
                    stage: vk::ShaderStageFlags::FRAGMENT,
                    module: shader,
                    entry_point: "fs_main".into(),
                    specialization_data: vec![1, 0, 0, 0],
                },
            ],
            graphics: Some(GraphicsState {
                vertex_bindings: vec![],
                vertex_attributes: vec![],
                topology: vk::PrimitiveTopology::TRIANGLE_LIST,
                polygon_mode: vk::PolygonMode::FILL,
                cull_mode: vk::CullModeFlags::BACK,
                front_face: vk::FrontFace::COUNTER_CLOCKWISE,
                samples: vk::SampleCountFlags::TYPE_1,
                depth_test: false,
                depth_write: false,
                depth_compare_op: vk::CompareOp::LESS,
                color_write_masks: vec![vk::ColorComponentFlags::RGBA],
                dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
                render_pass,
                subpass: 0,
            }),
            cache: None,
            base_pipeline: None,
        }),
    );
    let descriptor_pool = child(
        ObjectKind::DescriptorPool,
        h(),
        CreateInfo::DescriptorPool(DescriptorPoolInfo {
            flags: vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET,
            max_sets: 4,
            pool_sizes: vec![DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 4,
            }],
        }),
    );
    let descriptor_set = child(
        ObjectKind::DescriptorSet,
        h(),
        CreateInfo::DescriptorSet(DescriptorSetInfo {
            descriptor_pool,
            set_layout,
        }),
    );

    // bindings
    t.on_bind(
        &staging,
        Binding::BufferMemory(MemoryBinding {
            memory,
            offset: 0,
        }),
    )
    .unwrap();
    t.on_bind(
        &texture,
        Binding::ImageMemory(MemoryBinding {
            memory,
            offset: 64 * 1024,
        }),
    )
    .unwrap();
    t.on_bind(
        &target,
        Binding::ImageMemory(MemoryBinding {
            memory: target_memory,
            offset: 0,
        }),
    )
    .unwrap();
    t.on_bind(
        &descriptor_set,
        Binding::DescriptorWrite(DescriptorWrite {
            binding: 0,
            array_element: 0,
            descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            images: vec![DescriptorImage {
                sampler: Some(sampler),
                image_view: Some(texture_view),
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            }],
            buffers: vec![],
            texel_buffer_views: vec![],
        }),
    )
    .unwrap();
    t.on_bind(
        &descriptor_set,
        Binding::DescriptorWrite(DescriptorWrite {
            binding: 1,
            array_element: 0,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            images: vec![],
            buffers: vec![DescriptorBuffer {
                buffer: staging,
                offset: 0,
                range: 256,
            }],
            texel_buffer_views: vec![],
        }),
    )
    .unwrap();

    t.on_rename(&texture, "albedo").unwrap();
    t.on_rename(&cmd, "frame 0").unwrap();

    // one frame: upload the texture, render into the target
    let ops = vec![
        Command::BeginCommandBuffer(BeginCommandBuffer {
            flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
        }),
        barrier(
            texture,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            SubresourceRange::whole_color(),
        ),
        Command::CopyBufferToImage(CopyBufferToImage {
            src_buffer: staging,
            dst_image: texture,
            dst_image_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            regions: vec![BufferImageCopy {
                buffer_offset: 0,
                buffer_row_length: 0,
                buffer_image_height: 0,
                image_subresource: SubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                image_offset: Offset3D::default(),
                image_extent: Extent3D {
                    width: 256,
                    height: 256,
                    depth: 1,
                },
            }],
        }),
        barrier(
            texture,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            SubresourceRange::whole_color(),
        ),
        Command::BeginRenderPass(BeginRenderPass {
            render_pass,
            framebuffer,
            render_area: Rect2D {
                offset: Offset2D::default(),
                extent: Extent2D {
                    width: 256,
                    height: 256,
                },
            },
            clear_values: vec![ClearValue {
                color: [0.0, 0.0, 0.0, 1.0],
                depth: 1.0,
                stencil: 0,
            }],
            contents: vk::SubpassContents::INLINE,
        }),
        Command::BindPipeline(BindPipeline {
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            pipeline,
        }),
        Command::BindDescriptorSets(BindDescriptorSets {
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            layout: pipeline_layout,
            first_set: 0,
            descriptor_sets: vec![descriptor_set],
            dynamic_offsets: vec![],
        }),
        Command::Draw(Draw {
            vertex_count: 3,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }),
        Command::EndRenderPass(EndRenderPass {}),
        Command::EndCommandBuffer(EndCommandBuffer {}),
    ];
    for op in ops {
        t.on_record(&cmd, op).unwrap();
    }

    Scene {
        instance,
        physical,
        device,
        queue,
        fence,
        semaphore,
        pool,
        cmd,
        memory,
        staging,
        texture,
        texture_view,
        target,
        target_memory,
        target_view,
        sampler,
        set_layout,
        pipeline_layout,
        shader,
        render_pass,
        framebuffer,
        pipeline,
        descriptor_pool,
        descriptor_set,
    }
}
