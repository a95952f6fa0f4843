use anyhow::Result;
use ash::vk;
use std::collections::HashSet;

use vkrestore::codec::{collect_handles, Handles};
use vkrestore::command::*;
use vkrestore::object::*;
use vkrestore::{CommandStream, Error};

/// Pseudo-random but reproducible frame recording over a fixed set of objects.
fn generate(seed: u64, n: usize) -> CommandStream {
    let mut rng = oorandom::Rand32::new(seed);
    let device = Identity::root(ObjectKind::Device, 0xDE);
    let buffers: Vec<Identity> = (0..4)
        .map(|i| Identity::child_of(ObjectKind::Buffer, 0x100 + i, &device))
        .collect();
    let image = Identity::child_of(ObjectKind::Image, 0x200, &device);
    let pipeline = Identity::child_of(ObjectKind::Pipeline, 0x300, &device);
    let layout = Identity::child_of(ObjectKind::PipelineLayout, 0x301, &device);

    let mut out = CommandStream::new();
    out.push(Command::BeginCommandBuffer(BeginCommandBuffer {
        flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
    }));
    for _ in 0..n {
        let b = buffers[rng.rand_range(0..4) as usize];
        let cmd = match rng.rand_range(0..8) {
            0 => Command::Draw(Draw {
                vertex_count: rng.rand_range(1..1000),
                instance_count: 1,
                first_vertex: 0,
                first_instance: 0,
            }),
            1 => Command::DrawIndexed(DrawIndexed {
                index_count: rng.rand_range(3..3000),
                instance_count: 2,
                first_index: 0,
                vertex_offset: -(rng.rand_range(0..16) as i32),
                first_instance: 0,
            }),
            2 => Command::BindPipeline(BindPipeline {
                bind_point: vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            }),
            3 => Command::FillBuffer(FillBuffer {
                dst_buffer: b,
                dst_offset: 0,
                size: vk::WHOLE_SIZE,
                data: rng.rand_u32(),
            }),
            4 => Command::CopyBuffer(CopyBuffer {
                src_buffer: b,
                dst_buffer: buffers[0],
                regions: vec![BufferCopy {
                    src_offset: 0,
                    dst_offset: 64,
                    size: 64,
                }],
            }),
            5 => Command::PushConstants(PushConstants {
                layout,
                stage_flags: vk::ShaderStageFlags::VERTEX,
                offset: 0,
                values: (0..rng.rand_range(0..32)).map(|v| v as u8).collect(),
            }),
            6 => Command::SetViewport(SetViewport {
                first_viewport: 0,
                viewports: vec![Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: 1920.0,
                    height: 1080.0,
                    min_depth: 0.0,
                    max_depth: 1.0,
                }],
            }),
            _ => Command::PipelineBarrier(PipelineBarrier {
                src_stage_mask: vk::PipelineStageFlags::TRANSFER,
                dst_stage_mask: vk::PipelineStageFlags::FRAGMENT_SHADER,
                dependency_flags: vk::DependencyFlags::BY_REGION,
                memory_barriers: vec![],
                buffer_barriers: vec![BufferBarrier {
                    src_access_mask: vk::AccessFlags::TRANSFER_WRITE,
                    dst_access_mask: vk::AccessFlags::SHADER_READ,
                    src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                    dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                    buffer: b,
                    offset: 0,
                    size: vk::WHOLE_SIZE,
                }],
                image_barriers: vec![ImageBarrier {
                    src_access_mask: vk::AccessFlags::TRANSFER_WRITE,
                    dst_access_mask: vk::AccessFlags::SHADER_READ,
                    old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                    dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                    image,
                    subresource_range: SubresourceRange::whole_color(),
                }],
            }),
        };
        out.push(cmd);
    }
    out.push(Command::EndCommandBuffer(EndCommandBuffer {}));
    out
}

#[test]
fn long_stream_decodes_to_the_same_operations() -> Result<()> {
    let stream = generate(7, 500);
    let bytes = stream.encode();
    let back = CommandStream::decode(&bytes)?;
    assert_eq!(back.len(), 502);
    assert_eq!(back, stream);
    Ok(())
}

#[test]
fn decoded_stream_can_be_walked_repeatedly() -> Result<()> {
    let stream = CommandStream::decode(&generate(11, 64).encode())?;
    let first: Vec<&str> = stream.iter().map(|c| c.variant_name()).collect();
    let second: Vec<&str> = (&stream).into_iter().map(|c| c.variant_name()).collect();
    assert_eq!(first, second);
    assert_eq!(first.first(), Some(&"BeginCommandBuffer"));
    assert_eq!(first.last(), Some(&"EndCommandBuffer"));
    Ok(())
}

#[test]
fn every_cut_is_a_prefix_or_an_error() -> Result<()> {
    let stream = generate(3, 40);
    let bytes = stream.encode();

    // record boundaries
    let mut boundaries = HashSet::new();
    let mut partial = CommandStream::new();
    boundaries.insert(0usize);
    for cmd in stream.iter() {
        partial.push(cmd.clone());
        boundaries.insert(partial.encode().len());
    }

    for cut in 0..bytes.len() {
        match CommandStream::decode(&bytes[..cut]) {
            Ok(prefix) => {
                assert!(boundaries.contains(&cut), "cut {} decoded mid-record", cut);
                let expected: Vec<Command> = stream.iter().take(prefix.len()).cloned().collect();
                assert_eq!(prefix.iter().cloned().collect::<Vec<_>>(), expected);
            }
            Err(e) => {
                assert!(!boundaries.contains(&cut), "boundary cut {} failed: {}", cut, e);
                assert!(matches!(e, Error::CorruptStream(_)));
            }
        }
    }
    Ok(())
}

#[test]
fn unknown_tag_is_corrupt() -> Result<()> {
    let mut bytes = generate(5, 4).encode();
    let boundary = bytes.len();
    bytes.extend_from_slice(&999u32.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 16]);
    let err = CommandStream::decode(&bytes).unwrap_err();
    match err {
        Error::CorruptStream(msg) => assert!(msg.contains(&format!("offset {}", boundary))),
        other => panic!("unexpected error: {}", other),
    }
    Ok(())
}

#[test]
fn handles_can_be_rewritten_in_place() -> Result<()> {
    let mut stream = generate(13, 200);
    let before: HashSet<Identity> = stream.iter().flat_map(collect_handles).collect();
    assert!(!before.is_empty());

    for cmd in stream.iter_mut() {
        cmd.remap_handles(&mut |h| {
            h.handle += 0x1_0000;
            Ok(())
        })?;
    }
    let after: HashSet<Identity> = stream.iter().flat_map(collect_handles).collect();
    assert_eq!(before.len(), after.len());
    assert!(before.is_disjoint(&after));
    assert!(after.iter().all(|id| id.handle >= 0x1_0000));
    Ok(())
}
