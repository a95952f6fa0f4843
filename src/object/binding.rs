//! Binding records attached to a control block after construction.

use ash::vk;

use crate::codec::{record_struct, tagged_enum};
use crate::object::Identity;

record_struct! {
    pub struct MemoryBinding {
        pub memory: Identity,
        pub offset: u64,
    }
}

record_struct! {
    pub struct DescriptorImage {
        pub sampler: Option<Identity>,
        pub image_view: Option<Identity>,
        pub image_layout: vk::ImageLayout,
    }
}

record_struct! {
    pub struct DescriptorBuffer {
        pub buffer: Identity,
        pub offset: u64,
        pub range: u64,
    }
}

record_struct! {
    pub struct DescriptorWrite {
        pub binding: u32,
        pub array_element: u32,
        pub descriptor_type: vk::DescriptorType,
        pub images: Vec<DescriptorImage>,
        pub buffers: Vec<DescriptorBuffer>,
        pub texel_buffer_views: Vec<Identity>,
    }
}

tagged_enum! {
    pub enum Binding {
        BufferMemory(MemoryBinding) = 1,
        ImageMemory(MemoryBinding) = 2,
        DescriptorWrite(DescriptorWrite) = 3,
    }
}

impl Binding {
    /// Two bindings occupy the same slot when a new one replaces the old:
    /// memory bindings of the same kind, or descriptor writes to the same (binding, element).
    pub fn same_slot(&self, other: &Binding) -> bool {
        match (self, other) {
            (Binding::BufferMemory(_), Binding::BufferMemory(_)) => true,
            (Binding::ImageMemory(_), Binding::ImageMemory(_)) => true,
            (Binding::DescriptorWrite(a), Binding::DescriptorWrite(b)) => {
                a.binding == b.binding && a.array_element == b.array_element
            }
            _ => false,
        }
    }
}

/// Insert `binding`, replacing whatever held the same slot.
pub fn upsert(bindings: &mut Vec<Binding>, binding: Binding) {
    match bindings.iter_mut().find(|b| b.same_slot(&binding)) {
        Some(slot) => *slot = binding,
        None => bindings.push(binding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;

    fn write(binding: u32, element: u32, buffer: u64) -> Binding {
        Binding::DescriptorWrite(DescriptorWrite {
            binding,
            array_element: element,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            images: vec![],
            buffers: vec![DescriptorBuffer {
                buffer: Identity::new(ObjectKind::Buffer, buffer, 1),
                offset: 0,
                range: vk::WHOLE_SIZE,
            }],
            texel_buffer_views: vec![],
        })
    }

    #[test]
    fn descriptor_writes_replace_per_slot() {
        let mut v = Vec::new();
        upsert(&mut v, write(0, 0, 10));
        upsert(&mut v, write(1, 0, 11));
        upsert(&mut v, write(0, 0, 12));
        assert_eq!(v.len(), 2);
        assert_eq!(v[0], write(0, 0, 12));
    }

    #[test]
    fn rebinding_memory_replaces() {
        let mem = |h| {
            Binding::ImageMemory(MemoryBinding {
                memory: Identity::new(ObjectKind::DeviceMemory, h, 1),
                offset: 0,
            })
        };
        let mut v = vec![mem(1)];
        upsert(&mut v, mem(2));
        assert_eq!(v, vec![mem(2)]);
    }
}
