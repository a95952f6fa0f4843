//! The closed set of tracked object kinds, and the construction-parameter union over them.
//!
//! One row per kind: variant, native type name (also the restore-point directory name),
//! `vk::ObjectType` (whose raw value is the on-disk kind tag) and construction-parameter type.
//! Every per-kind decision in the crate is an exhaustive `match` over `ObjectKind` or
//! `CreateInfo`.

use ash::vk;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::codec::{ByteReader, ByteWriter, Decode, Describe, Encode, Handles};
use crate::error::{Error, Result};
use crate::object::create_info::*;
use crate::object::Identity;

macro_rules! object_kinds {
    ($( $kind:ident => $name:literal, $objtype:ident, $info:ty; )*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum ObjectKind {
            $( $kind ),*
        }

        impl ObjectKind {
            pub const ALL: &'static [ObjectKind] = &[$( ObjectKind::$kind ),*];

            /// Native type name, e.g. `VkImage`.
            pub fn name(self) -> &'static str {
                match self {
                    $( ObjectKind::$kind => $name ),*
                }
            }

            pub fn object_type(self) -> vk::ObjectType {
                match self {
                    $( ObjectKind::$kind => vk::ObjectType::$objtype ),*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $name => Some(ObjectKind::$kind), )*
                    _ => None,
                }
            }
        }

        /// Immutable construction snapshot, one variant per object kind.
        #[derive(Debug, Clone, PartialEq)]
        pub enum CreateInfo {
            $( $kind($info) ),*
        }

        impl CreateInfo {
            pub fn kind(&self) -> ObjectKind {
                match self {
                    $( CreateInfo::$kind(_) => ObjectKind::$kind ),*
                }
            }

            fn encode_payload(&self, w: &mut ByteWriter) {
                match self {
                    $( CreateInfo::$kind(p) => p.encode(w) ),*
                }
            }

            fn decode_payload(kind: ObjectKind, r: &mut ByteReader<'_>) -> Result<Self> {
                match kind {
                    $( ObjectKind::$kind => Ok(CreateInfo::$kind(<$info>::decode(r)?)) ),*
                }
            }

            fn describe_payload(&self) -> Value {
                match self {
                    $( CreateInfo::$kind(p) => p.describe() ),*
                }
            }

            fn payload_handles(&self) -> &dyn Handles {
                match self {
                    $( CreateInfo::$kind(p) => p ),*
                }
            }

            fn payload_handles_mut(&mut self) -> &mut dyn Handles {
                match self {
                    $( CreateInfo::$kind(p) => p ),*
                }
            }
        }
    };
}

object_kinds! {
    Instance => "VkInstance", INSTANCE, InstanceInfo;
    PhysicalDevice => "VkPhysicalDevice", PHYSICAL_DEVICE, PhysicalDeviceInfo;
    Device => "VkDevice", DEVICE, DeviceInfo;
    Queue => "VkQueue", QUEUE, QueueInfo;
    Semaphore => "VkSemaphore", SEMAPHORE, SemaphoreInfo;
    CommandBuffer => "VkCommandBuffer", COMMAND_BUFFER, CommandBufferInfo;
    Fence => "VkFence", FENCE, FenceInfo;
    DeviceMemory => "VkDeviceMemory", DEVICE_MEMORY, DeviceMemoryInfo;
    Buffer => "VkBuffer", BUFFER, BufferInfo;
    Image => "VkImage", IMAGE, ImageInfo;
    Event => "VkEvent", EVENT, EventInfo;
    QueryPool => "VkQueryPool", QUERY_POOL, QueryPoolInfo;
    BufferView => "VkBufferView", BUFFER_VIEW, BufferViewInfo;
    ImageView => "VkImageView", IMAGE_VIEW, ImageViewInfo;
    ShaderModule => "VkShaderModule", SHADER_MODULE, ShaderModuleInfo;
    PipelineCache => "VkPipelineCache", PIPELINE_CACHE, PipelineCacheInfo;
    PipelineLayout => "VkPipelineLayout", PIPELINE_LAYOUT, PipelineLayoutInfo;
    RenderPass => "VkRenderPass", RENDER_PASS, RenderPassInfo;
    Pipeline => "VkPipeline", PIPELINE, PipelineInfo;
    DescriptorSetLayout => "VkDescriptorSetLayout", DESCRIPTOR_SET_LAYOUT, DescriptorSetLayoutInfo;
    Sampler => "VkSampler", SAMPLER, SamplerInfo;
    DescriptorPool => "VkDescriptorPool", DESCRIPTOR_POOL, DescriptorPoolInfo;
    DescriptorSet => "VkDescriptorSet", DESCRIPTOR_SET, DescriptorSetInfo;
    Framebuffer => "VkFramebuffer", FRAMEBUFFER, FramebufferInfo;
    CommandPool => "VkCommandPool", COMMAND_POOL, CommandPoolInfo;
    SurfaceKHR => "VkSurfaceKHR", SURFACE_KHR, SurfaceInfo;
    SwapchainKHR => "VkSwapchainKHR", SWAPCHAIN_KHR, SwapchainInfo;
}

// Device-level kinds, i.e. children a device tracks directly.
const DEVICE_CHILDREN: &[ObjectKind] = &[
    ObjectKind::Queue,
    ObjectKind::Semaphore,
    ObjectKind::Fence,
    ObjectKind::Event,
    ObjectKind::CommandPool,
    ObjectKind::DeviceMemory,
    ObjectKind::Buffer,
    ObjectKind::BufferView,
    ObjectKind::Image,
    ObjectKind::ImageView,
    ObjectKind::Sampler,
    ObjectKind::QueryPool,
    ObjectKind::ShaderModule,
    ObjectKind::PipelineCache,
    ObjectKind::PipelineLayout,
    ObjectKind::Pipeline,
    ObjectKind::RenderPass,
    ObjectKind::Framebuffer,
    ObjectKind::DescriptorSetLayout,
    ObjectKind::DescriptorPool,
    ObjectKind::SwapchainKHR,
];

impl ObjectKind {
    /// On-disk kind tag: the raw `vk::ObjectType`.
    pub fn tag(self) -> u32 {
        self.object_type().as_raw() as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.tag() == tag)
    }

    /// Objects whose native handle is globally unique (a pointer in the native API).
    pub fn is_dispatchable(self) -> bool {
        matches!(
            self,
            ObjectKind::Instance
                | ObjectKind::PhysicalDevice
                | ObjectKind::Device
                | ObjectKind::Queue
                | ObjectKind::CommandBuffer
        )
    }

    /// Kinds of the child trackers a control block of this kind carries.
    pub fn child_kinds(self) -> &'static [ObjectKind] {
        match self {
            ObjectKind::Instance => &[ObjectKind::PhysicalDevice, ObjectKind::SurfaceKHR],
            ObjectKind::PhysicalDevice => &[ObjectKind::Device],
            ObjectKind::Device => DEVICE_CHILDREN,
            ObjectKind::CommandPool => &[ObjectKind::CommandBuffer],
            ObjectKind::DescriptorPool => &[ObjectKind::DescriptorSet],
            ObjectKind::SwapchainKHR => &[ObjectKind::Image],
            ObjectKind::Queue
            | ObjectKind::Semaphore
            | ObjectKind::CommandBuffer
            | ObjectKind::Fence
            | ObjectKind::DeviceMemory
            | ObjectKind::Buffer
            | ObjectKind::Image
            | ObjectKind::Event
            | ObjectKind::QueryPool
            | ObjectKind::BufferView
            | ObjectKind::ImageView
            | ObjectKind::ShaderModule
            | ObjectKind::PipelineCache
            | ObjectKind::PipelineLayout
            | ObjectKind::RenderPass
            | ObjectKind::Pipeline
            | ObjectKind::DescriptorSetLayout
            | ObjectKind::Sampler
            | ObjectKind::DescriptorSet
            | ObjectKind::Framebuffer
            | ObjectKind::SurfaceKHR => &[],
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl CreateInfo {
    /// Swapchain that owns this object, for presentable images.
    pub fn swapchain(&self) -> Option<Identity> {
        match self {
            CreateInfo::Image(info) => info.swapchain,
            _ => None,
        }
    }
}

// Encoded as [kind tag u32][payload]. The tag doubles as a type check when reading records.
impl Encode for CreateInfo {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_u32(self.kind().tag());
        self.encode_payload(w);
    }
}

impl Decode for CreateInfo {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let at = r.position();
        let tag = r.u32()?;
        let kind = ObjectKind::from_tag(tag).ok_or_else(|| {
            Error::corrupt(format!("unknown object kind tag {} at offset {}", tag, at))
        })?;
        Self::decode_payload(kind, r)
    }
}

impl Describe for CreateInfo {
    fn describe(&self) -> Value {
        serde_json::json!({ "kind": self.kind().name(), "info": self.describe_payload() })
    }
}

impl Handles for CreateInfo {
    fn visit_handles(&self, f: &mut dyn FnMut(&Identity)) {
        self.payload_handles().visit_handles(f)
    }

    fn remap_handles(&mut self, f: &mut dyn FnMut(&mut Identity) -> Result<()>) -> Result<()> {
        self.payload_handles_mut().remap_handles(f)
    }
}
