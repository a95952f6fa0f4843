//! Small fixed-layout structures shared by construction parameters and recorded operations.

use ash::vk;

use crate::codec::record_struct;

record_struct! {
    #[derive(Copy, Default, Eq)]
    pub struct Extent2D {
        pub width: u32,
        pub height: u32,
    }
}

record_struct! {
    #[derive(Copy, Default, Eq)]
    pub struct Extent3D {
        pub width: u32,
        pub height: u32,
        pub depth: u32,
    }
}

record_struct! {
    #[derive(Copy, Default, Eq)]
    pub struct Offset2D {
        pub x: i32,
        pub y: i32,
    }
}

record_struct! {
    #[derive(Copy, Default, Eq)]
    pub struct Offset3D {
        pub x: i32,
        pub y: i32,
        pub z: i32,
    }
}

record_struct! {
    #[derive(Copy, Default, Eq)]
    pub struct Rect2D {
        pub offset: Offset2D,
        pub extent: Extent2D,
    }
}

record_struct! {
    /// Mip/layer window of an image. `level_count` and `layer_count` accept
    /// `vk::REMAINING_MIP_LEVELS` / `vk::REMAINING_ARRAY_LAYERS`.
    #[derive(Copy)]
    pub struct SubresourceRange {
        pub aspect_mask: vk::ImageAspectFlags,
        pub base_mip_level: u32,
        pub level_count: u32,
        pub base_array_layer: u32,
        pub layer_count: u32,
    }
}

impl SubresourceRange {
    /// Every mip level and array layer of the color aspect.
    pub fn whole_color() -> Self {
        Self {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: vk::REMAINING_MIP_LEVELS,
            base_array_layer: 0,
            layer_count: vk::REMAINING_ARRAY_LAYERS,
        }
    }
}

record_struct! {
    #[derive(Copy)]
    pub struct SubresourceLayers {
        pub aspect_mask: vk::ImageAspectFlags,
        pub mip_level: u32,
        pub base_array_layer: u32,
        pub layer_count: u32,
    }
}

impl SubresourceLayers {
    pub fn as_range(&self) -> SubresourceRange {
        SubresourceRange {
            aspect_mask: self.aspect_mask,
            base_mip_level: self.mip_level,
            level_count: 1,
            base_array_layer: self.base_array_layer,
            layer_count: self.layer_count,
        }
    }
}

record_struct! {
    #[derive(Copy)]
    pub struct ComponentMapping {
        pub r: vk::ComponentSwizzle,
        pub g: vk::ComponentSwizzle,
        pub b: vk::ComponentSwizzle,
        pub a: vk::ComponentSwizzle,
    }
}

impl Default for ComponentMapping {
    fn default() -> Self {
        Self {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        }
    }
}
