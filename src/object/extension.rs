//! Extension chains hanging off construction parameters.
//!
//! A chain is a recursive optional list: each link is `{present: bool, [tag, payload, next]}`.
//! The tag is the raw `vk::StructureType` of the extension structure it models.

use ash::vk;

use crate::codec::{record_struct, tagged_enum};
use crate::object::Identity;

pub type Next = Option<Box<Extension>>;

record_struct! {
    #[derive(Default)]
    pub struct DedicatedAllocation {
        pub image: Option<Identity>,
        pub buffer: Option<Identity>,
    }
}

record_struct! {
    pub struct ExportMemory {
        pub handle_types: vk::ExternalMemoryHandleTypeFlags,
    }
}

record_struct! {
    pub struct ImageFormatList {
        pub view_formats: Vec<vk::Format>,
    }
}

record_struct! {
    pub struct SemaphoreTypeInfo {
        pub semaphore_type: vk::SemaphoreType,
        pub initial_value: u64,
    }
}

tagged_enum! {
    pub enum ExtensionBody {
        DedicatedAllocation(DedicatedAllocation) =
            vk::StructureType::MEMORY_DEDICATED_ALLOCATE_INFO.as_raw() as u32,
        ExportMemory(ExportMemory) = vk::StructureType::EXPORT_MEMORY_ALLOCATE_INFO.as_raw() as u32,
        ImageFormatList(ImageFormatList) =
            vk::StructureType::IMAGE_FORMAT_LIST_CREATE_INFO.as_raw() as u32,
        SemaphoreType(SemaphoreTypeInfo) =
            vk::StructureType::SEMAPHORE_TYPE_CREATE_INFO.as_raw() as u32,
    }
}

record_struct! {
    pub struct Extension {
        pub body: ExtensionBody,
        pub next: Next,
    }
}

impl Extension {
    pub fn new(body: ExtensionBody) -> Self {
        Self { body, next: None }
    }
}

/// Build a chain from bodies, first element at the head.
pub fn chain<I: IntoIterator<Item = ExtensionBody>>(bodies: I) -> Next {
    let mut bodies: Vec<ExtensionBody> = bodies.into_iter().collect();
    let mut next: Next = None;
    while let Some(body) = bodies.pop() {
        next = Some(Box::new(Extension { body, next }));
    }
    next
}

/// Iterate the bodies of a chain from head to tail.
pub fn iter(next: &Next) -> ChainIter<'_> {
    ChainIter {
        cur: next.as_deref(),
    }
}

pub struct ChainIter<'a> {
    cur: Option<&'a Extension>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a ExtensionBody;

    fn next(&mut self) -> Option<Self::Item> {
        let ext = self.cur?;
        self.cur = ext.next.as_deref();
        Some(&ext.body)
    }
}
