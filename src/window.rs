//! The ordered set of mounted views.

use core::ops::{Range, RangeInclusive};
use std::collections::VecDeque;

use crate::error::ManagerError;
use crate::settings::Axis;
use crate::view::ViewRef;

/// A view plus the manager's bookkeeping for it.
#[derive(Clone, Debug)]
pub struct MountedView {
    view: ViewRef,
    /// Render has completed successfully.
    pub displayed: bool,
    /// Currently visually active.
    pub shown: bool,
    /// Has reported a measured size.
    pub expanded: bool,
    /// Entered the window at the front; its growth is counter-scrolled.
    pub prepended: bool,
}

impl MountedView {
    fn new(view: ViewRef, prepended: bool) -> Self {
        Self {
            view,
            displayed: false,
            shown: false,
            expanded: false,
            prepended,
        }
    }

    pub fn view(&self) -> &ViewRef {
        &self.view
    }

    pub fn section_index(&self) -> usize {
        self.view.section().index()
    }

    /// Extent along `axis`, measured now.
    pub fn extent(&self, axis: Axis) -> f32 {
        self.view.bounds().extent(axis).max(0.0)
    }
}

/// Views backing a contiguous run of sections, in document order.
#[derive(Debug, Default)]
pub struct ViewWindow {
    entries: VecDeque<MountedView>,
}

impl ViewWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_absent(&self, view: &ViewRef) -> Result<(), ManagerError> {
        let section_index = view.section().index();
        if self.index_of(section_index).is_some() {
            log::warn!(
                "refusing to mount section {} twice in the view window",
                section_index
            );
            return Err(ManagerError::DuplicateSection { section_index });
        }
        Ok(())
    }

    /// Mount `view` after the last view.
    pub fn append(&mut self, view: ViewRef) -> Result<(), ManagerError> {
        self.ensure_absent(&view)?;
        self.entries.push_back(MountedView::new(view, false));
        Ok(())
    }

    /// Mount `view` before the first view.
    pub fn prepend(&mut self, view: ViewRef) -> Result<(), ManagerError> {
        self.ensure_absent(&view)?;
        self.entries.push_front(MountedView::new(view, true));
        Ok(())
    }

    pub fn first(&self) -> Option<&MountedView> {
        self.entries.front()
    }

    pub fn last(&self) -> Option<&MountedView> {
        self.entries.back()
    }

    pub fn get(&self, position: usize) -> Option<&MountedView> {
        self.entries.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountedView> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MountedView> {
        self.entries.iter_mut()
    }

    /// Window position of the view for `section_index`.
    pub fn index_of(&self, section_index: usize) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.section_index() == section_index)
    }

    pub fn find(&self, section_index: usize) -> Option<&MountedView> {
        self.entries
            .iter()
            .find(|entry| entry.section_index() == section_index)
    }

    pub fn find_mut(&mut self, section_index: usize) -> Option<&mut MountedView> {
        self.entries
            .iter_mut()
            .find(|entry| entry.section_index() == section_index)
    }

    /// Views at window positions `range`, clamped to the window.
    pub fn slice(&self, range: Range<usize>) -> Vec<ViewRef> {
        let end = range.end.min(self.entries.len());
        let start = range.start.min(end);
        self.entries
            .range(start..end)
            .map(|entry| entry.view.clone())
            .collect()
    }

    pub fn views(&self) -> Vec<ViewRef> {
        self.slice(0..self.entries.len())
    }

    pub fn section_indices(&self) -> Vec<usize> {
        self.entries.iter().map(MountedView::section_index).collect()
    }

    /// First through last shown view, if any view is shown.
    pub fn shown_range(&self) -> Option<RangeInclusive<usize>> {
        let first = self.entries.iter().position(|entry| entry.shown)?;
        let last = self.entries.iter().rposition(|entry| entry.shown)?;
        Some(first..=last)
    }

    /// Logical `[start, end)` of every view along `axis`, laid end to end.
    pub fn spans(&self, axis: Axis) -> Vec<(f32, f32)> {
        let mut cursor = 0.0f32;
        self.entries
            .iter()
            .map(|entry| {
                let start = cursor;
                cursor += entry.extent(axis);
                (start, cursor)
            })
            .collect()
    }

    /// Unmount the view for `section_index` and release its render resources.
    pub fn remove(&mut self, section_index: usize) -> Option<MountedView> {
        let position = self.index_of(section_index)?;
        let entry = self.entries.remove(position)?;
        entry.view.destroy();
        Some(entry)
    }

    /// Unmount every view. Returns how many were destroyed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        for entry in self.entries.drain(..) {
            entry.view.destroy();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::section::{SectionRef, Spine};
    use crate::view::{RenderFuture, RenderRequest, View, ViewBounds};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct StubView {
        section: SectionRef,
        height: f32,
        destroyed: AtomicBool,
    }

    impl View for StubView {
        fn section(&self) -> &SectionRef {
            &self.section
        }

        fn display(&self, _request: &RenderRequest) -> RenderFuture {
            let index = self.section.index();
            Box::pin(async move { Err(RenderError::new(index, "stub")) })
        }

        fn show(&self) {}

        fn hide(&self) {}

        fn bounds(&self) -> ViewBounds {
            ViewBounds::new(600.0, self.height)
        }

        fn destroy(&self) {
            self.destroyed.store(true, Ordering::SeqCst);
        }
    }

    fn stub(spine: &Arc<Spine>, index: usize, height: f32) -> Arc<StubView> {
        Arc::new(StubView {
            section: spine.section(index).expect("section"),
            height,
            destroyed: AtomicBool::new(false),
        })
    }

    #[test]
    fn append_and_prepend_keep_document_order() {
        let spine = Spine::numbered(6);
        let mut window = ViewWindow::new();
        window.append(stub(&spine, 3, 100.0)).expect("append");
        window.append(stub(&spine, 4, 100.0)).expect("append");
        window.prepend(stub(&spine, 2, 100.0)).expect("prepend");
        assert_eq!(window.section_indices(), vec![2, 3, 4]);
        assert!(window.first().expect("first").prepended);
        assert!(!window.last().expect("last").prepended);
    }

    #[test]
    fn duplicate_sections_are_rejected() {
        let spine = Spine::numbered(3);
        let mut window = ViewWindow::new();
        window.append(stub(&spine, 1, 100.0)).expect("append");
        let err = window.prepend(stub(&spine, 1, 100.0)).expect_err("duplicate");
        assert_eq!(err, ManagerError::DuplicateSection { section_index: 1 });
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn remove_destroys_view() {
        let spine = Spine::numbered(3);
        let mut window = ViewWindow::new();
        let view = stub(&spine, 0, 100.0);
        window.append(view.clone()).expect("append");
        assert!(window.remove(0).is_some());
        assert!(view.destroyed.load(Ordering::SeqCst));
        assert!(window.remove(0).is_none());
    }

    #[test]
    fn spans_lay_views_end_to_end() {
        let spine = Spine::numbered(3);
        let mut window = ViewWindow::new();
        window.append(stub(&spine, 0, 100.0)).expect("append");
        window.append(stub(&spine, 1, 250.0)).expect("append");
        assert_eq!(
            window.spans(Axis::Vertical),
            vec![(0.0, 100.0), (100.0, 350.0)]
        );
        assert_eq!(
            window.spans(Axis::Horizontal),
            vec![(0.0, 600.0), (600.0, 1200.0)]
        );
    }

    #[test]
    fn shown_range_and_slice() {
        let spine = Spine::numbered(5);
        let mut window = ViewWindow::new();
        for idx in 0..5 {
            window.append(stub(&spine, idx, 100.0)).expect("append");
        }
        assert!(window.shown_range().is_none());
        for entry in window.iter_mut() {
            entry.shown = matches!(entry.section_index(), 2 | 3);
        }
        assert_eq!(window.shown_range(), Some(2..=3));
        let slice = window.slice(1..9);
        assert_eq!(slice.len(), 4);
        assert_eq!(slice[0].section().index(), 1);
    }
}
