//! Click-driven multi-selection with a fixed range anchor

use std::collections::HashSet;

use super::data::MediaAsset;

/// Modifier keys held during a click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClickModifiers {
    /// Flip one item in or out of the selection (command-click)
    pub toggle: bool,
    /// Select the span from the anchor to the clicked item (shift-click)
    pub range: bool,
}

impl ClickModifiers {
    pub const PLAIN: Self = Self { toggle: false, range: false };
    pub const TOGGLE: Self = Self { toggle: true, range: false };
    pub const RANGE: Self = Self { toggle: false, range: true };
}

/// Selected ids plus the anchor used for range selection
///
/// Selected ids may refer to items that are not currently visible (the
/// filter changed after they were selected); the visible helpers intersect
/// with the visible order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionModel {
    selected: HashSet<String>,
    anchor: Option<String>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &HashSet<String> {
        &self.selected
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Apply a click on `id` given the current visible order
    pub fn click<S: AsRef<str>>(&mut self, id: &str, modifiers: ClickModifiers, order: &[S]) {
        if modifiers.toggle {
            if !self.selected.remove(id) {
                self.selected.insert(id.to_string());
            }
            self.anchor = Some(id.to_string());
            return;
        }

        if modifiers.range {
            if let Some(anchor) = self.anchor.as_deref() {
                if let Some(span) = range_between(order, anchor, id) {
                    // The anchor stays put so repeated range clicks move the far end
                    self.selected = span;
                    return;
                }
            }
        }

        self.selected.clear();
        self.selected.insert(id.to_string());
        self.anchor = Some(id.to_string());
    }

    /// Empty the selection and forget the anchor
    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    /// Select every id in `order`; the anchor is left untouched
    pub fn select_all<S: AsRef<str>>(&mut self, order: &[S]) {
        self.selected = order.iter().map(|id| id.as_ref().to_string()).collect();
    }

    /// Number of selected ids that are currently visible
    pub fn visible_selected_count(&self, visible: &[MediaAsset]) -> usize {
        visible.iter().filter(|a| self.selected.contains(&a.id)).count()
    }

    /// Visible items whose id is selected, in visible order
    pub fn visible_selected_items(&self, visible: &[MediaAsset]) -> Vec<MediaAsset> {
        visible
            .iter()
            .filter(|a| self.selected.contains(&a.id))
            .cloned()
            .collect()
    }
}

/// The ids of the inclusive index span between `a` and `b` in `order`
///
/// The span is the same whichever endpoint comes first. Returns `None` if
/// either endpoint is not in `order`.
pub fn range_between<S: AsRef<str>>(order: &[S], a: &str, b: &str) -> Option<HashSet<String>> {
    let ia = order.iter().position(|id| id.as_ref() == a)?;
    let ib = order.iter().position(|id| id.as_ref() == b)?;
    let (lo, hi) = if ia <= ib { (ia, ib) } else { (ib, ia) };

    Some(order[lo..=hi].iter().map(|id| id.as_ref().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: [&str; 5] = ["a", "b", "c", "d", "e"];

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_range_between_is_symmetric() {
        assert_eq!(range_between(&ORDER, "b", "d"), Some(set(&["b", "c", "d"])));
        assert_eq!(range_between(&ORDER, "d", "b"), Some(set(&["b", "c", "d"])));
        assert_eq!(range_between(&ORDER, "c", "c"), Some(set(&["c"])));

        for a in ORDER {
            for b in ORDER {
                assert_eq!(range_between(&ORDER, a, b), range_between(&ORDER, b, a));
            }
        }
    }

    #[test]
    fn test_range_between_missing_endpoint() {
        assert_eq!(range_between(&ORDER, "a", "z"), None);
        assert_eq!(range_between(&ORDER, "z", "a"), None);
        assert_eq!(range_between::<&str>(&[], "a", "a"), None);
    }

    #[test]
    fn test_plain_then_toggle_clicks() {
        let mut selection = SelectionModel::new();

        selection.click("x", ClickModifiers::PLAIN, &ORDER);
        assert_eq!(selection.selected(), &set(&["x"]));

        selection.click("y", ClickModifiers::TOGGLE, &ORDER);
        assert_eq!(selection.selected(), &set(&["x", "y"]));
        assert_eq!(selection.anchor(), Some("y"));

        selection.click("x", ClickModifiers::TOGGLE, &ORDER);
        assert_eq!(selection.selected(), &set(&["y"]));
        assert_eq!(selection.anchor(), Some("x"));
    }

    #[test]
    fn test_range_click_keeps_anchor() {
        let mut selection = SelectionModel::new();
        selection.click("b", ClickModifiers::PLAIN, &ORDER);

        selection.click("d", ClickModifiers::RANGE, &ORDER);
        assert_eq!(selection.selected(), &set(&["b", "c", "d"]));
        assert_eq!(selection.anchor(), Some("b"));

        // Moving the far end back across the anchor
        selection.click("a", ClickModifiers::RANGE, &ORDER);
        assert_eq!(selection.selected(), &set(&["a", "b"]));
        assert_eq!(selection.anchor(), Some("b"));
    }

    #[test]
    fn test_range_click_without_anchor_is_plain() {
        let mut selection = SelectionModel::new();
        selection.click("c", ClickModifiers::RANGE, &ORDER);

        assert_eq!(selection.selected(), &set(&["c"]));
        assert_eq!(selection.anchor(), Some("c"));
    }

    #[test]
    fn test_range_click_with_hidden_anchor_falls_back() {
        let mut selection = SelectionModel::new();
        selection.click("hidden", ClickModifiers::PLAIN, &["hidden", "a"]);

        selection.click("d", ClickModifiers::RANGE, &ORDER);
        assert_eq!(selection.selected(), &set(&["d"]));
        assert_eq!(selection.anchor(), Some("d"));
    }

    #[test]
    fn test_toggle_wins_over_range() {
        let mut selection = SelectionModel::new();
        selection.click("a", ClickModifiers::PLAIN, &ORDER);

        let both = ClickModifiers { toggle: true, range: true };
        selection.click("e", both, &ORDER);
        assert_eq!(selection.selected(), &set(&["a", "e"]));
        assert_eq!(selection.anchor(), Some("e"));
    }

    #[test]
    fn test_select_all_and_clear() {
        let mut selection = SelectionModel::new();
        selection.click("c", ClickModifiers::PLAIN, &ORDER);

        selection.select_all(&ORDER);
        assert_eq!(selection.selected().len(), 5);
        assert_eq!(selection.anchor(), Some("c"));

        selection.clear();
        assert!(selection.selected().is_empty());
        assert_eq!(selection.anchor(), None);
    }

    #[test]
    fn test_visible_selection_intersects_order() {
        let visible: Vec<MediaAsset> = ["a", "b", "c"]
            .iter()
            .map(|id| MediaAsset::photo(*id, None))
            .collect();
        let mut selection = SelectionModel::new();
        selection.click("c", ClickModifiers::PLAIN, &ORDER);
        selection.click("gone", ClickModifiers::TOGGLE, &ORDER);
        selection.click("a", ClickModifiers::TOGGLE, &ORDER);

        assert_eq!(selection.selected().len(), 3);
        assert_eq!(selection.visible_selected_count(&visible), 2);

        let ids: Vec<_> = selection
            .visible_selected_items(&visible)
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
