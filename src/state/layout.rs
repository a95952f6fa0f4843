//! Image-layout side effects of recorded operations.
//!
//! - explicit: every image barrier of a pipeline barrier moves its sub-range from
//!   `old_layout` to `new_layout`;
//! - implicit: beginning a render pass moves each framebuffer attachment to the layout its
//!   first referencing subpass uses, ending it moves them to the attachment's final layout.
//!
//! A disagreeing `old_layout` is only a warning. An unrecognized layout or a range outside
//! the image is an `InvalidLayoutTransition`.

use ash::vk;
use log::warn;

use crate::command::{BeginRenderPass, Command, CommandStream};
use crate::error::{Error, Result};
use crate::object::{CreateInfo, Identity, RenderPassInfo, SubresourceRange};
use crate::state::StateTracker;

/// Apply the layout effects of `cmd`. `recorded` holds the operations recorded before it
/// in the same session.
pub(crate) fn apply(tracker: &StateTracker, cmd: &Command, recorded: &CommandStream) -> Result<()> {
    match cmd {
        Command::PipelineBarrier(barrier) => {
            for b in &barrier.image_barriers {
                transition(
                    tracker,
                    &b.image,
                    &b.subresource_range,
                    Some(b.old_layout),
                    b.new_layout,
                )?;
            }
            Ok(())
        }
        Command::BeginRenderPass(begin) => {
            render_pass_boundary(tracker, begin, |rp, i| rp.entry_layout(i))
        }
        Command::EndRenderPass(_) => {
            let begin = recorded.iter().rev().find_map(|c| match c {
                Command::BeginRenderPass(b) => Some(b),
                _ => None,
            });
            match begin {
                Some(begin) => render_pass_boundary(tracker, begin, |rp, i| rp.final_layout(i)),
                None => {
                    warn!("end of render pass without a matching begin");
                    Ok(())
                }
            }
        }
        _ => Ok(()),
    }
}

fn transition(
    tracker: &StateTracker,
    image: &Identity,
    range: &SubresourceRange,
    old: Option<vk::ImageLayout>,
    new: vk::ImageLayout,
) -> Result<()> {
    let r = tracker.registry().require(image)?;
    let invalid = |reason: String| Error::InvalidLayoutTransition {
        image: *image,
        reason,
    };
    let mismatched = r.with_state(|state| match state.image_layouts.as_mut() {
        Some(grid) => grid.transition(range, old, new).map_err(invalid),
        None => Err(invalid(format!("{} carries no layout state", image.kind))),
    })?;
    if mismatched > 0 {
        warn!(
            "{}: {} cell(s) were not in {:?} before moving to {:?}",
            image,
            mismatched,
            old.unwrap_or(vk::ImageLayout::UNDEFINED),
            new
        );
    }
    Ok(())
}

fn render_pass_boundary(
    tracker: &StateTracker,
    begin: &BeginRenderPass,
    layout_of: impl Fn(&RenderPassInfo, u32) -> Option<vk::ImageLayout>,
) -> Result<()> {
    let rp = tracker.registry().require(&begin.render_pass)?;
    let fb = tracker.registry().require(&begin.framebuffer)?;
    let (CreateInfo::RenderPass(rp_info), CreateInfo::Framebuffer(fb_info)) =
        (rp.create_info(), fb.create_info())
    else {
        return Err(Error::corrupt(format!(
            "render pass begin names {} and {}",
            begin.render_pass, begin.framebuffer
        )));
    };
    for (i, view_id) in fb_info.attachments.iter().enumerate() {
        let Some(layout) = layout_of(rp_info, i as u32) else {
            continue;
        };
        if layout == vk::ImageLayout::UNDEFINED {
            continue;
        }
        let view = tracker.registry().require(view_id)?;
        let CreateInfo::ImageView(view_info) = view.create_info() else {
            return Err(Error::corrupt(format!(
                "framebuffer attachment {} is {}",
                i, view_id
            )));
        };
        transition(
            tracker,
            &view_info.image,
            &view_info.subresource_range,
            None,
            layout,
        )?;
    }
    Ok(())
}
