//! Recorded operation streams.
//!
//! Layout of a `.cmds` stream:
//!   repeat { [tag u32][payload] }
//! There is no count and no terminator: a reader consumes tag+payload pairs until the input
//! is exhausted exactly. A truncated tag, a truncated payload or an unknown tag is a
//! `CorruptStream`.
//!
//! Tags are stable on disk; never renumber an existing operation.

use ash::vk;
use serde_json::Value;

use crate::codec::{record_struct, tagged_enum, ByteReader, ByteWriter, Describe, Encode};
use crate::error::{Error, Result};
use crate::object::{
    Extent3D, Identity, Offset3D, Rect2D, SubresourceLayers, SubresourceRange,
};

// -------------------- Payloads --------------------

record_struct! {
    pub struct BeginCommandBuffer {
        pub flags: vk::CommandBufferUsageFlags,
    }
}

record_struct! {
    pub struct EndCommandBuffer {}
}

record_struct! {
    pub struct MemoryBarrier {
        pub src_access_mask: vk::AccessFlags,
        pub dst_access_mask: vk::AccessFlags,
    }
}

record_struct! {
    pub struct BufferBarrier {
        pub src_access_mask: vk::AccessFlags,
        pub dst_access_mask: vk::AccessFlags,
        pub src_queue_family_index: u32,
        pub dst_queue_family_index: u32,
        pub buffer: Identity,
        pub offset: u64,
        pub size: u64,
    }
}

record_struct! {
    pub struct ImageBarrier {
        pub src_access_mask: vk::AccessFlags,
        pub dst_access_mask: vk::AccessFlags,
        pub old_layout: vk::ImageLayout,
        pub new_layout: vk::ImageLayout,
        pub src_queue_family_index: u32,
        pub dst_queue_family_index: u32,
        pub image: Identity,
        pub subresource_range: SubresourceRange,
    }
}

record_struct! {
    pub struct PipelineBarrier {
        pub src_stage_mask: vk::PipelineStageFlags,
        pub dst_stage_mask: vk::PipelineStageFlags,
        pub dependency_flags: vk::DependencyFlags,
        pub memory_barriers: Vec<MemoryBarrier>,
        pub buffer_barriers: Vec<BufferBarrier>,
        pub image_barriers: Vec<ImageBarrier>,
    }
}

record_struct! {
    #[derive(Copy, Default)]
    pub struct ClearValue {
        pub color: [f32; 4],
        pub depth: f32,
        pub stencil: u32,
    }
}

record_struct! {
    pub struct BeginRenderPass {
        pub render_pass: Identity,
        pub framebuffer: Identity,
        pub render_area: Rect2D,
        pub clear_values: Vec<ClearValue>,
        pub contents: vk::SubpassContents,
    }
}

record_struct! {
    pub struct NextSubpass {
        pub contents: vk::SubpassContents,
    }
}

record_struct! {
    pub struct EndRenderPass {}
}

record_struct! {
    pub struct BindPipeline {
        pub bind_point: vk::PipelineBindPoint,
        pub pipeline: Identity,
    }
}

record_struct! {
    pub struct BindDescriptorSets {
        pub bind_point: vk::PipelineBindPoint,
        pub layout: Identity,
        pub first_set: u32,
        pub descriptor_sets: Vec<Identity>,
        pub dynamic_offsets: Vec<u32>,
    }
}

record_struct! {
    pub struct BindVertexBuffers {
        pub first_binding: u32,
        pub buffers: Vec<Identity>,
        pub offsets: Vec<u64>,
    }
}

record_struct! {
    pub struct BindIndexBuffer {
        pub buffer: Identity,
        pub offset: u64,
        pub index_type: vk::IndexType,
    }
}

record_struct! {
    pub struct Draw {
        pub vertex_count: u32,
        pub instance_count: u32,
        pub first_vertex: u32,
        pub first_instance: u32,
    }
}

record_struct! {
    pub struct DrawIndexed {
        pub index_count: u32,
        pub instance_count: u32,
        pub first_index: u32,
        pub vertex_offset: i32,
        pub first_instance: u32,
    }
}

record_struct! {
    pub struct Dispatch {
        pub group_count_x: u32,
        pub group_count_y: u32,
        pub group_count_z: u32,
    }
}

record_struct! {
    pub struct BufferCopy {
        pub src_offset: u64,
        pub dst_offset: u64,
        pub size: u64,
    }
}

record_struct! {
    pub struct CopyBuffer {
        pub src_buffer: Identity,
        pub dst_buffer: Identity,
        pub regions: Vec<BufferCopy>,
    }
}

record_struct! {
    pub struct BufferImageCopy {
        pub buffer_offset: u64,
        pub buffer_row_length: u32,
        pub buffer_image_height: u32,
        pub image_subresource: SubresourceLayers,
        pub image_offset: Offset3D,
        pub image_extent: Extent3D,
    }
}

record_struct! {
    pub struct CopyBufferToImage {
        pub src_buffer: Identity,
        pub dst_image: Identity,
        pub dst_image_layout: vk::ImageLayout,
        pub regions: Vec<BufferImageCopy>,
    }
}

record_struct! {
    pub struct ImageCopy {
        pub src_subresource: SubresourceLayers,
        pub src_offset: Offset3D,
        pub dst_subresource: SubresourceLayers,
        pub dst_offset: Offset3D,
        pub extent: Extent3D,
    }
}

record_struct! {
    pub struct CopyImage {
        pub src_image: Identity,
        pub src_image_layout: vk::ImageLayout,
        pub dst_image: Identity,
        pub dst_image_layout: vk::ImageLayout,
        pub regions: Vec<ImageCopy>,
    }
}

record_struct! {
    pub struct FillBuffer {
        pub dst_buffer: Identity,
        pub dst_offset: u64,
        pub size: u64,
        pub data: u32,
    }
}

record_struct! {
    pub struct PushConstants {
        pub layout: Identity,
        pub stage_flags: vk::ShaderStageFlags,
        pub offset: u32,
        pub values: Vec<u8>,
    }
}

record_struct! {
    #[derive(Copy, Default)]
    pub struct Viewport {
        pub x: f32,
        pub y: f32,
        pub width: f32,
        pub height: f32,
        pub min_depth: f32,
        pub max_depth: f32,
    }
}

record_struct! {
    pub struct SetViewport {
        pub first_viewport: u32,
        pub viewports: Vec<Viewport>,
    }
}

record_struct! {
    pub struct SetScissor {
        pub first_scissor: u32,
        pub scissors: Vec<Rect2D>,
    }
}

// -------------------- Operation union --------------------

tagged_enum! {
    /// One recorded command-buffer operation.
    pub enum Command {
        BeginCommandBuffer(BeginCommandBuffer) = 1,
        EndCommandBuffer(EndCommandBuffer) = 2,
        PipelineBarrier(PipelineBarrier) = 3,
        BeginRenderPass(BeginRenderPass) = 4,
        NextSubpass(NextSubpass) = 5,
        EndRenderPass(EndRenderPass) = 6,
        BindPipeline(BindPipeline) = 7,
        BindDescriptorSets(BindDescriptorSets) = 8,
        BindVertexBuffers(BindVertexBuffers) = 9,
        BindIndexBuffer(BindIndexBuffer) = 10,
        Draw(Draw) = 11,
        DrawIndexed(DrawIndexed) = 12,
        Dispatch(Dispatch) = 13,
        CopyBuffer(CopyBuffer) = 14,
        CopyBufferToImage(CopyBufferToImage) = 15,
        CopyImage(CopyImage) = 16,
        FillBuffer(FillBuffer) = 17,
        PushConstants(PushConstants) = 18,
        SetViewport(SetViewport) = 19,
        SetScissor(SetScissor) = 20,
    }
}

// -------------------- Stream --------------------

/// Ordered operations captured for one recording session of a command buffer.
///
/// Once decoded, a stream can be iterated any number of times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandStream {
    commands: Vec<Command>,
}

impl CommandStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Command> {
        self.commands.iter_mut()
    }

    /// Serialize as back-to-back `[tag][payload]` records.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        for cmd in &self.commands {
            cmd.encode(&mut w);
        }
        w.into_inner()
    }

    /// Parse until the input ends exactly on a record boundary.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let mut commands = Vec::new();
        while !r.is_empty() {
            let at = r.position();
            if r.remaining() < 4 {
                return Err(Error::corrupt(format!(
                    "truncated operation tag at offset {} ({} stray bytes)",
                    at,
                    r.remaining()
                )));
            }
            let tag = r.u32()?;
            match Command::decode_payload(tag, &mut r)? {
                Some(cmd) => commands.push(cmd),
                None => {
                    return Err(Error::corrupt(format!(
                        "unknown operation tag {} at offset {}",
                        tag, at
                    )))
                }
            }
        }
        Ok(Self { commands })
    }

    /// `.cmds.json` rendering: one object per operation, in order.
    pub fn describe(&self) -> Value {
        Value::Array(self.commands.iter().map(Describe::describe).collect())
    }
}

impl<'a> IntoIterator for &'a CommandStream {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

impl FromIterator<Command> for CommandStream {
    fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}
