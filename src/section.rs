//! Document sections and their spine adjacency.

use core::fmt;
use std::sync::Arc;

/// Shared handle to a section.
pub type SectionRef = Arc<dyn Section>;

/// A unit of document content with logical neighbours.
///
/// Sections outlive the manager; the manager only walks them through
/// [`Section::prev`] and [`Section::next`].
pub trait Section: Send + Sync + fmt::Debug {
    /// Position in the spine. Identifies the section inside the view window.
    fn index(&self) -> usize;

    /// Content href, OPF-relative.
    fn href(&self) -> &str;

    /// Logically preceding section, if any.
    fn prev(&self) -> Option<SectionRef>;

    /// Logically following section, if any.
    fn next(&self) -> Option<SectionRef>;
}

/// One spine entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpineItem {
    pub href: String,
    /// Non-linear items are skipped when walking prev/next.
    pub linear: bool,
}

impl SpineItem {
    pub fn linear(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            linear: true,
        }
    }

    pub fn auxiliary(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            linear: false,
        }
    }
}

/// Reading-order spine backing [`SpineSection`] handles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Spine {
    items: Vec<SpineItem>,
}

impl Spine {
    pub fn new(items: Vec<SpineItem>) -> Arc<Self> {
        Arc::new(Self { items })
    }

    /// Spine of `count` linear items named `chapter-<n>.xhtml`.
    pub fn numbered(count: usize) -> Arc<Self> {
        Self::new(
            (0..count)
                .map(|idx| SpineItem::linear(format!("chapter-{}.xhtml", idx)))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[SpineItem] {
        &self.items
    }

    /// Section handle for `index`, linear or not.
    pub fn section(self: &Arc<Self>, index: usize) -> Option<SectionRef> {
        if index >= self.items.len() {
            return None;
        }
        Some(Arc::new(SpineSection {
            spine: Arc::clone(self),
            index,
        }))
    }

    /// First linear section.
    pub fn first(self: &Arc<Self>) -> Option<SectionRef> {
        let index = self.items.iter().position(|item| item.linear)?;
        self.section(index)
    }
}

/// Section backed by a [`Spine`].
pub struct SpineSection {
    spine: Arc<Spine>,
    index: usize,
}

impl fmt::Debug for SpineSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpineSection")
            .field("index", &self.index)
            .field("href", &self.href())
            .finish()
    }
}

impl Section for SpineSection {
    fn index(&self) -> usize {
        self.index
    }

    fn href(&self) -> &str {
        self.spine
            .items
            .get(self.index)
            .map(|item| item.href.as_str())
            .unwrap_or_default()
    }

    fn prev(&self) -> Option<SectionRef> {
        let index = self
            .spine
            .items
            .get(..self.index)?
            .iter()
            .rposition(|item| item.linear)?;
        self.spine.section(index)
    }

    fn next(&self) -> Option<SectionRef> {
        let start = self.index + 1;
        let offset = self
            .spine
            .items
            .get(start..)?
            .iter()
            .position(|item| item.linear)?;
        self.spine.section(start + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_spine_walks_both_ways() {
        let spine = Spine::numbered(3);
        let first = spine.first().expect("first");
        assert_eq!(first.index(), 0);
        assert!(first.prev().is_none());

        let second = first.next().expect("second");
        assert_eq!(second.href(), "chapter-1.xhtml");
        assert_eq!(second.prev().expect("back").index(), 0);

        let last = second.next().expect("last");
        assert!(last.next().is_none());
    }

    #[test]
    fn non_linear_items_are_skipped() {
        let spine = Spine::new(vec![
            SpineItem::auxiliary("cover.xhtml"),
            SpineItem::linear("a.xhtml"),
            SpineItem::auxiliary("notes.xhtml"),
            SpineItem::linear("b.xhtml"),
        ]);
        let a = spine.first().expect("first linear");
        assert_eq!(a.index(), 1);
        assert!(a.prev().is_none());
        let b = a.next().expect("next linear");
        assert_eq!(b.index(), 3);
        assert_eq!(b.prev().expect("prev linear").index(), 1);
    }
}
