use super::controller::{FeedController, FeedStatus};
use super::record_set::Record;

/// Default distance from the bottom, in rows, that counts as "near bottom".
pub const DEFAULT_THRESHOLD: u32 = 5;

/// Snapshot of a scrollable viewport, in rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportMetrics {
    /// First visible row.
    pub offset: u32,
    /// Number of visible rows.
    pub viewport: u32,
    /// Total rows of content.
    pub content: u32,
}

impl ViewportMetrics {
    pub fn new(offset: u32, viewport: u32, content: u32) -> Self {
        Self {
            offset,
            viewport,
            content,
        }
    }

    /// `offset + viewport >= content - threshold`
    pub fn is_near_bottom(&self, threshold: u32) -> bool {
        self.offset.saturating_add(self.viewport) >= self.content.saturating_sub(threshold)
    }
}

/// Turns viewport updates into at most one next-page request per
/// qualifying state of the feed.
///
/// After firing, the trigger stays quiet until the controller's revision
/// moves, i.e. until the feed has transitioned away from the `Idle` it fired
/// in. A refused request leaves the revision untouched, so the trigger does
/// not hammer the controller while the user keeps scrolling.
#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    threshold: u32,
    fired_at: Option<u64>,
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ScrollTrigger {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            fired_at: None,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Decide whether this viewport update should request the next page.
    pub fn should_fire<R: Record>(
        &mut self,
        metrics: ViewportMetrics,
        controller: &FeedController<R>,
    ) -> bool {
        if controller.status() != FeedStatus::Idle || !controller.has_more() {
            return false;
        }
        if controller.context().is_none() {
            return false;
        }
        if self.fired_at == Some(controller.revision()) {
            return false;
        }
        if !metrics.is_near_bottom(self.threshold) {
            return false;
        }
        self.fired_at = Some(controller.revision());
        true
    }

    /// Forget the last firing, e.g. after the feed was replaced.
    pub fn reset(&mut self) {
        self.fired_at = None;
    }
}
