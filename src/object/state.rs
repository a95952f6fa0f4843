//! Observable per-object state: signaled flags, mapped ranges, per-(mip, layer) image layouts.

use ash::vk;
use serde_json::Value;
use std::ops::Range;

use crate::codec::{record_struct, ByteReader, ByteWriter, Decode, Describe, Encode, Handles};
use crate::error::{Error, Result};
use crate::object::{Identity, SubresourceRange};

/// Upper bound on (mip, layer) cells tracked per image.
pub const MAX_LAYOUT_CELLS: usize = 1 << 20;

record_struct! {
    #[derive(Copy, Default)]
    pub struct MappedRange {
        pub offset: u64,
        pub size: u64,
    }
}

/// Layout grid, row-major by mip level: cell `(mip, layer)` lives at `mip * array_layers + layer`.
///
/// `layouts.len()` must equal `mip_levels * array_layers`; decoding enforces it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayouts {
    pub mip_levels: u32,
    pub array_layers: u32,
    pub layouts: Vec<vk::ImageLayout>,
}

record_struct! {
    #[derive(Default)]
    pub struct ObjectState {
        pub signaled: Option<bool>,
        pub mapped: Option<MappedRange>,
        pub image_layouts: Option<ImageLayouts>,
    }
}

impl ObjectState {
    pub fn is_empty(&self) -> bool {
        self.signaled.is_none() && self.mapped.is_none() && self.image_layouts.is_none()
    }
}

/// State changes reported by the interception layer outside of command recording.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    Signaled(bool),
    Mapped(Option<MappedRange>),
}

/// Layouts an image may legally be in.
pub fn is_recognized_layout(layout: vk::ImageLayout) -> bool {
    matches!(
        layout,
        vk::ImageLayout::UNDEFINED
            | vk::ImageLayout::GENERAL
            | vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
            | vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
            | vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
            | vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
            | vk::ImageLayout::TRANSFER_SRC_OPTIMAL
            | vk::ImageLayout::TRANSFER_DST_OPTIMAL
            | vk::ImageLayout::PREINITIALIZED
            | vk::ImageLayout::DEPTH_READ_ONLY_STENCIL_ATTACHMENT_OPTIMAL
            | vk::ImageLayout::DEPTH_ATTACHMENT_STENCIL_READ_ONLY_OPTIMAL
            | vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL
            | vk::ImageLayout::DEPTH_READ_ONLY_OPTIMAL
            | vk::ImageLayout::STENCIL_ATTACHMENT_OPTIMAL
            | vk::ImageLayout::STENCIL_READ_ONLY_OPTIMAL
            | vk::ImageLayout::READ_ONLY_OPTIMAL
            | vk::ImageLayout::ATTACHMENT_OPTIMAL
            | vk::ImageLayout::PRESENT_SRC_KHR
            | vk::ImageLayout::SHARED_PRESENT_KHR
    )
}

impl ImageLayouts {
    /// `None` when the grid would be empty or larger than `MAX_LAYOUT_CELLS`.
    pub fn new(mip_levels: u32, array_layers: u32, initial: vk::ImageLayout) -> Option<Self> {
        let cells = Self::cell_count(mip_levels, array_layers)?;
        Some(Self {
            mip_levels,
            array_layers,
            layouts: vec![initial; cells],
        })
    }

    pub fn cell_count(mip_levels: u32, array_layers: u32) -> Option<usize> {
        (mip_levels as usize)
            .checked_mul(array_layers as usize)
            .filter(|n| (1..=MAX_LAYOUT_CELLS).contains(n))
    }

    /// Check that the grid holds exactly one layout per (mip, layer) cell.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let expected = Self::cell_count(self.mip_levels, self.array_layers).ok_or_else(|| {
            format!(
                "{} mip levels x {} array layers is not a trackable grid",
                self.mip_levels, self.array_layers
            )
        })?;
        if self.layouts.len() != expected {
            return Err(format!(
                "grid of {}x{} holds {} layouts, expected {}",
                self.mip_levels,
                self.array_layers,
                self.layouts.len(),
                expected
            ));
        }
        Ok(())
    }

    fn index(&self, mip: u32, layer: u32) -> usize {
        mip as usize * self.array_layers as usize + layer as usize
    }

    /// Layout of one cell; `None` when out of range.
    pub fn get(&self, mip: u32, layer: u32) -> Option<vk::ImageLayout> {
        if mip >= self.mip_levels || layer >= self.array_layers {
            return None;
        }
        self.layouts.get(self.index(mip, layer)).copied()
    }

    /// The single layout every cell shares, if any.
    pub fn uniform(&self) -> Option<vk::ImageLayout> {
        let first = *self.layouts.first()?;
        self.layouts.iter().all(|l| *l == first).then_some(first)
    }

    /// Concrete (mip, layer) ranges addressed by `range`, with the REMAINING sentinels expanded.
    pub fn resolve(
        &self,
        range: &SubresourceRange,
    ) -> std::result::Result<(Range<u32>, Range<u32>), String> {
        let mips = expand(
            "mip",
            range.base_mip_level,
            range.level_count,
            vk::REMAINING_MIP_LEVELS,
            self.mip_levels,
        )?;
        let layers = expand(
            "array layer",
            range.base_array_layer,
            range.layer_count,
            vk::REMAINING_ARRAY_LAYERS,
            self.array_layers,
        )?;
        Ok((mips, layers))
    }

    /// Move every cell in `range` to `new`.
    ///
    /// `old` is the layout the caller claims the cells are in (`None` or UNDEFINED: don't care).
    /// Returns how many cells disagreed with `old`; the caller decides whether to complain.
    pub fn transition(
        &mut self,
        range: &SubresourceRange,
        old: Option<vk::ImageLayout>,
        new: vk::ImageLayout,
    ) -> std::result::Result<usize, String> {
        self.validate()?;
        if !is_recognized_layout(new) {
            return Err(format!("unrecognized layout {:?}", new));
        }
        if new == vk::ImageLayout::UNDEFINED || new == vk::ImageLayout::PREINITIALIZED {
            return Err(format!("cannot transition into {:?}", new));
        }
        if let Some(old) = old {
            if !is_recognized_layout(old) {
                return Err(format!("unrecognized old layout {:?}", old));
            }
        }
        let (mips, layers) = self.resolve(range)?;
        let mut mismatched = 0usize;
        for mip in mips {
            for layer in layers.clone() {
                let i = self.index(mip, layer);
                let cell = self
                    .layouts
                    .get_mut(i)
                    .ok_or_else(|| format!("cell ({}, {}) outside the grid", mip, layer))?;
                if let Some(old) = old {
                    if old != vk::ImageLayout::UNDEFINED && old != *cell {
                        mismatched += 1;
                    }
                }
                *cell = new;
            }
        }
        Ok(mismatched)
    }
}

// ----- codec -----

impl Encode for ImageLayouts {
    fn encode(&self, w: &mut ByteWriter) {
        self.mip_levels.encode(w);
        self.array_layers.encode(w);
        self.layouts.encode(w);
    }
}

impl Decode for ImageLayouts {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let at = r.position();
        let grid = Self {
            mip_levels: u32::decode(r)?,
            array_layers: u32::decode(r)?,
            layouts: Vec::decode(r)?,
        };
        grid.validate()
            .map_err(|e| Error::corrupt(format!("layout grid at offset {}: {}", at, e)))?;
        Ok(grid)
    }
}

impl Describe for ImageLayouts {
    fn describe(&self) -> Value {
        serde_json::json!({
            "mip_levels": self.mip_levels,
            "array_layers": self.array_layers,
            "layouts": self.layouts.describe(),
        })
    }
}

impl Handles for ImageLayouts {
    fn visit_handles(&self, _f: &mut dyn FnMut(&Identity)) {}

    fn remap_handles(&mut self, _f: &mut dyn FnMut(&mut Identity) -> Result<()>) -> Result<()> {
        Ok(())
    }
}

fn expand(
    what: &str,
    base: u32,
    count: u32,
    remaining: u32,
    total: u32,
) -> std::result::Result<Range<u32>, String> {
    if base >= total {
        return Err(format!("base {} {} out of range (image has {})", what, base, total));
    }
    let count = if count == remaining { total - base } else { count };
    if count == 0 {
        return Err(format!("empty {} range at {}", what, base));
    }
    let end = base
        .checked_add(count)
        .filter(|end| *end <= total)
        .ok_or_else(|| format!("{} range {}+{} exceeds {}", what, base, count, total))?;
    Ok(base..end)
}
