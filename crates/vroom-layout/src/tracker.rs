//! Reactive layout tracking

use crate::{compute_layout_with_aspect, ContainerSize, Layout, ASPECT_RATIO};

/// Holds the current layout and recomputes it on size or count changes.
///
/// Feed it resize notifications and roster counts as they happen; it never
/// needs a timer.
#[derive(Debug, Clone)]
pub struct LayoutTracker {
    aspect: f64,
    container: ContainerSize,
    count: usize,
    layout: Layout,
    recomputes: u64,
}

impl LayoutTracker {
    pub fn new() -> Self {
        Self::with_aspect(ASPECT_RATIO)
    }

    pub fn with_aspect(aspect: f64) -> Self {
        LayoutTracker {
            aspect,
            container: ContainerSize::default(),
            count: 0,
            layout: Layout::ZERO,
            recomputes: 0,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn container(&self) -> ContainerSize {
        self.container
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// How many times the layout was actually recomputed
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }

    /// Container resized. Returns the new layout if it changed.
    pub fn resize(&mut self, container: ContainerSize) -> Option<Layout> {
        if container == self.container {
            return None;
        }
        self.container = container;
        self.recompute()
    }

    /// Tile count changed. Returns the new layout if it changed.
    pub fn set_count(&mut self, count: usize) -> Option<Layout> {
        if count == self.count {
            return None;
        }
        self.count = count;
        self.recompute()
    }

    fn recompute(&mut self) -> Option<Layout> {
        self.recomputes += 1;
        let layout = compute_layout_with_aspect(
            self.container.width,
            self.container.height,
            self.count,
            self.aspect,
        );
        tracing::trace!(
            count = self.count,
            width = self.container.width,
            height = self.container.height,
            cols = layout.cols,
            rows = layout.rows,
            "Layout recomputed"
        );

        if layout == self.layout {
            return None;
        }
        self.layout = layout;
        Some(layout)
    }
}

impl Default for LayoutTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recomputes_only_on_change() {
        let mut tracker = LayoutTracker::new();

        assert_eq!(tracker.set_count(2), Some(Layout { cols: 1, rows: 2, tile_width: 0.0, tile_height: 0.0 }));
        let layout = tracker.resize(ContainerSize::new(1920.0, 1080.0)).unwrap();
        assert!(layout.tile_width > 0.0);

        assert_eq!(tracker.resize(ContainerSize::new(1920.0, 1080.0)), None);
        assert_eq!(tracker.set_count(2), None);
        assert_eq!(tracker.recomputes(), 2);
    }

    #[test]
    fn test_count_change_regrids() {
        let mut tracker = LayoutTracker::new();
        tracker.resize(ContainerSize::new(1920.0, 1080.0));
        tracker.set_count(1);
        assert_eq!((tracker.layout().cols, tracker.layout().rows), (1, 1));

        let layout = tracker.set_count(4).unwrap();
        assert_eq!((layout.cols, layout.rows), (2, 2));
    }

    #[test]
    fn test_empty_room_has_zero_layout() {
        let mut tracker = LayoutTracker::new();
        tracker.resize(ContainerSize::new(1920.0, 1080.0));
        tracker.set_count(3);

        assert_eq!(tracker.set_count(0), Some(Layout::ZERO));
    }

    #[test]
    fn test_resize_to_same_layout_reports_nothing() {
        let mut tracker = LayoutTracker::new();
        tracker.set_count(1);
        tracker.resize(ContainerSize::new(0.0, 0.0));

        // Still undrawable: same zero-sized layout
        assert_eq!(tracker.resize(ContainerSize::new(-1.0, 0.0)), None);
        assert_eq!(tracker.recomputes(), 2);
    }
}
