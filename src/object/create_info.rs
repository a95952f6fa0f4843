//! Construction parameters, one structure per object kind.
//!
//! Handles to other objects are embedded as `Identity` so that dependency discovery and
//! identity remapping can walk them uniformly. The parent context an object was created
//! against (instance, device, ...) is not repeated here; the control block keeps it.

use ash::vk;

use crate::codec::record_struct;
use crate::object::extension::Next;
use crate::object::{ComponentMapping, Extent2D, Extent3D, Identity, SubresourceRange};

// ----- Instance level -----

record_struct! {
    #[derive(Default)]
    pub struct InstanceInfo {
        pub application_name: String,
        pub application_version: u32,
        pub engine_name: String,
        pub api_version: u32,
        pub enabled_layers: Vec<String>,
        pub enabled_extensions: Vec<String>,
    }
}

record_struct! {
    #[derive(Default)]
    pub struct PhysicalDeviceInfo {
        pub index: u32,
        pub vendor_id: u32,
        pub device_id: u32,
        pub device_name: String,
    }
}

record_struct! {
    pub struct SurfaceInfo {
        pub platform: String,
        pub display: u64,
        pub window: u64,
    }
}

// ----- Device level -----

record_struct! {
    pub struct DeviceQueueInfo {
        pub queue_family_index: u32,
        pub queue_priorities: Vec<f32>,
    }
}

record_struct! {
    pub struct DeviceInfo {
        pub queue_infos: Vec<DeviceQueueInfo>,
        pub enabled_extensions: Vec<String>,
        pub next: Next,
    }
}

record_struct! {
    pub struct QueueInfo {
        pub queue_family_index: u32,
        pub queue_index: u32,
    }
}

record_struct! {
    pub struct SemaphoreInfo {
        pub flags: vk::SemaphoreCreateFlags,
        pub next: Next,
    }
}

record_struct! {
    pub struct FenceInfo {
        pub flags: vk::FenceCreateFlags,
    }
}

record_struct! {
    pub struct EventInfo {
        pub flags: vk::EventCreateFlags,
    }
}

record_struct! {
    pub struct CommandPoolInfo {
        pub flags: vk::CommandPoolCreateFlags,
        pub queue_family_index: u32,
    }
}

record_struct! {
    pub struct CommandBufferInfo {
        pub command_pool: Identity,
        pub level: vk::CommandBufferLevel,
    }
}

record_struct! {
    pub struct DeviceMemoryInfo {
        pub allocation_size: u64,
        pub memory_type_index: u32,
        pub next: Next,
    }
}

record_struct! {
    pub struct BufferInfo {
        pub flags: vk::BufferCreateFlags,
        pub size: u64,
        pub usage: vk::BufferUsageFlags,
        pub sharing_mode: vk::SharingMode,
        pub queue_family_indices: Vec<u32>,
        pub next: Next,
    }
}

record_struct! {
    pub struct BufferViewInfo {
        pub buffer: Identity,
        pub format: vk::Format,
        pub offset: u64,
        pub range: u64,
    }
}

record_struct! {
    pub struct ImageInfo {
        pub flags: vk::ImageCreateFlags,
        pub image_type: vk::ImageType,
        pub format: vk::Format,
        pub extent: Extent3D,
        pub mip_levels: u32,
        pub array_layers: u32,
        pub samples: vk::SampleCountFlags,
        pub tiling: vk::ImageTiling,
        pub usage: vk::ImageUsageFlags,
        pub sharing_mode: vk::SharingMode,
        pub queue_family_indices: Vec<u32>,
        pub initial_layout: vk::ImageLayout,
        /// Set for presentable images handed out by a swapchain.
        pub swapchain: Option<Identity>,
        pub next: Next,
    }
}

record_struct! {
    pub struct ImageViewInfo {
        pub image: Identity,
        pub view_type: vk::ImageViewType,
        pub format: vk::Format,
        pub components: ComponentMapping,
        pub subresource_range: SubresourceRange,
    }
}

record_struct! {
    pub struct SamplerInfo {
        pub mag_filter: vk::Filter,
        pub min_filter: vk::Filter,
        pub mipmap_mode: vk::SamplerMipmapMode,
        pub address_mode_u: vk::SamplerAddressMode,
        pub address_mode_v: vk::SamplerAddressMode,
        pub address_mode_w: vk::SamplerAddressMode,
        pub mip_lod_bias: f32,
        pub anisotropy_enable: bool,
        pub max_anisotropy: f32,
        pub compare_enable: bool,
        pub compare_op: vk::CompareOp,
        pub min_lod: f32,
        pub max_lod: f32,
        pub border_color: vk::BorderColor,
        pub unnormalized_coordinates: bool,
    }
}

record_struct! {
    pub struct QueryPoolInfo {
        pub query_type: vk::QueryType,
        pub query_count: u32,
        pub pipeline_statistics: vk::QueryPipelineStatisticFlags,
    }
}

// ----- Pipelines -----

record_struct! {
    pub struct ShaderModuleInfo {
        pub code: Vec<u32>,
    }
}

record_struct! {
    pub struct PipelineCacheInfo {
        pub initial_data: Vec<u8>,
    }
}

record_struct! {
    pub struct PushConstantRange {
        pub stage_flags: vk::ShaderStageFlags,
        pub offset: u32,
        pub size: u32,
    }
}

record_struct! {
    pub struct PipelineLayoutInfo {
        pub set_layouts: Vec<Identity>,
        pub push_constant_ranges: Vec<PushConstantRange>,
    }
}

record_struct! {
    pub struct ShaderStage {
        pub stage: vk::ShaderStageFlags,
        pub module: Identity,
        pub entry_point: String,
        pub specialization_data: Vec<u8>,
    }
}

record_struct! {
    pub struct VertexBinding {
        pub binding: u32,
        pub stride: u32,
        pub input_rate: vk::VertexInputRate,
    }
}

record_struct! {
    pub struct VertexAttribute {
        pub location: u32,
        pub binding: u32,
        pub format: vk::Format,
        pub offset: u32,
    }
}

record_struct! {
    /// Fixed-function state of a graphics pipeline.
    pub struct GraphicsState {
        pub vertex_bindings: Vec<VertexBinding>,
        pub vertex_attributes: Vec<VertexAttribute>,
        pub topology: vk::PrimitiveTopology,
        pub polygon_mode: vk::PolygonMode,
        pub cull_mode: vk::CullModeFlags,
        pub front_face: vk::FrontFace,
        pub samples: vk::SampleCountFlags,
        pub depth_test: bool,
        pub depth_write: bool,
        pub depth_compare_op: vk::CompareOp,
        pub color_write_masks: Vec<vk::ColorComponentFlags>,
        pub dynamic_states: Vec<vk::DynamicState>,
        pub render_pass: Identity,
        pub subpass: u32,
    }
}

record_struct! {
    pub struct PipelineInfo {
        pub bind_point: vk::PipelineBindPoint,
        pub layout: Identity,
        pub stages: Vec<ShaderStage>,
        /// Present for graphics pipelines only.
        pub graphics: Option<GraphicsState>,
        pub cache: Option<Identity>,
        pub base_pipeline: Option<Identity>,
    }
}

// ----- Render passes -----

record_struct! {
    pub struct AttachmentDescription {
        pub format: vk::Format,
        pub samples: vk::SampleCountFlags,
        pub load_op: vk::AttachmentLoadOp,
        pub store_op: vk::AttachmentStoreOp,
        pub stencil_load_op: vk::AttachmentLoadOp,
        pub stencil_store_op: vk::AttachmentStoreOp,
        pub initial_layout: vk::ImageLayout,
        pub final_layout: vk::ImageLayout,
    }
}

record_struct! {
    #[derive(Copy)]
    pub struct AttachmentReference {
        pub attachment: u32,
        pub layout: vk::ImageLayout,
    }
}

record_struct! {
    pub struct SubpassDescription {
        pub pipeline_bind_point: vk::PipelineBindPoint,
        pub input_attachments: Vec<AttachmentReference>,
        pub color_attachments: Vec<AttachmentReference>,
        pub resolve_attachments: Vec<AttachmentReference>,
        pub depth_stencil_attachment: Option<AttachmentReference>,
        pub preserve_attachments: Vec<u32>,
    }
}

impl SubpassDescription {
    /// Every attachment reference this subpass names.
    pub fn references(&self) -> impl Iterator<Item = &AttachmentReference> {
        self.input_attachments
            .iter()
            .chain(self.color_attachments.iter())
            .chain(self.resolve_attachments.iter())
            .chain(self.depth_stencil_attachment.iter())
    }
}

record_struct! {
    pub struct SubpassDependency {
        pub src_subpass: u32,
        pub dst_subpass: u32,
        pub src_stage_mask: vk::PipelineStageFlags,
        pub dst_stage_mask: vk::PipelineStageFlags,
        pub src_access_mask: vk::AccessFlags,
        pub dst_access_mask: vk::AccessFlags,
        pub dependency_flags: vk::DependencyFlags,
    }
}

record_struct! {
    pub struct RenderPassInfo {
        pub attachments: Vec<AttachmentDescription>,
        pub subpasses: Vec<SubpassDescription>,
        pub dependencies: Vec<SubpassDependency>,
    }
}

impl RenderPassInfo {
    /// Layout attachment `index` takes on when the pass begins: the layout used by the first
    /// subpass that references it, or the initial layout when no subpass does.
    pub fn entry_layout(&self, index: u32) -> Option<vk::ImageLayout> {
        let desc = self.attachments.get(index as usize)?;
        let used = self
            .subpasses
            .iter()
            .flat_map(|s| s.references())
            .find(|r| r.attachment == index)
            .map(|r| r.layout);
        Some(used.unwrap_or(desc.initial_layout))
    }

    pub fn final_layout(&self, index: u32) -> Option<vk::ImageLayout> {
        self.attachments.get(index as usize).map(|a| a.final_layout)
    }
}

record_struct! {
    pub struct FramebufferInfo {
        pub render_pass: Identity,
        pub attachments: Vec<Identity>,
        pub width: u32,
        pub height: u32,
        pub layers: u32,
    }
}

// ----- Descriptors -----

record_struct! {
    pub struct DescriptorSetLayoutBinding {
        pub binding: u32,
        pub descriptor_type: vk::DescriptorType,
        pub descriptor_count: u32,
        pub stage_flags: vk::ShaderStageFlags,
        pub immutable_samplers: Vec<Identity>,
    }
}

record_struct! {
    pub struct DescriptorSetLayoutInfo {
        pub flags: vk::DescriptorSetLayoutCreateFlags,
        pub bindings: Vec<DescriptorSetLayoutBinding>,
    }
}

record_struct! {
    pub struct DescriptorPoolSize {
        pub ty: vk::DescriptorType,
        pub descriptor_count: u32,
    }
}

record_struct! {
    pub struct DescriptorPoolInfo {
        pub flags: vk::DescriptorPoolCreateFlags,
        pub max_sets: u32,
        pub pool_sizes: Vec<DescriptorPoolSize>,
    }
}

record_struct! {
    pub struct DescriptorSetInfo {
        pub descriptor_pool: Identity,
        pub set_layout: Identity,
    }
}

// ----- Presentation -----

record_struct! {
    pub struct SwapchainInfo {
        pub surface: Identity,
        pub min_image_count: u32,
        pub image_format: vk::Format,
        pub image_color_space: vk::ColorSpaceKHR,
        pub image_extent: Extent2D,
        pub image_array_layers: u32,
        pub image_usage: vk::ImageUsageFlags,
        pub present_mode: vk::PresentModeKHR,
        pub clipped: bool,
        pub old_swapchain: Option<Identity>,
    }
}
