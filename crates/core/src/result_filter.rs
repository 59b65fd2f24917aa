use crate::results::QueryResult;

/// Something a case-insensitive substring filter can test.
pub trait Searchable {
    /// `needle` is already lowercased and non-empty.
    fn matches_filter(&self, needle: &str) -> bool;
}

impl Searchable for String {
    fn matches_filter(&self, needle: &str) -> bool {
        self.to_lowercase().contains(needle)
    }
}

impl Searchable for Vec<String> {
    fn matches_filter(&self, needle: &str) -> bool {
        self.iter().any(|cell| cell.matches_filter(needle))
    }
}

/// Rows of `result` containing `term` in any cell. An empty term returns every
/// row.
#[must_use]
pub fn filter_rows<'a>(result: &'a QueryResult, term: &str) -> Vec<&'a Vec<String>> {
    let needle = term.to_lowercase();
    result
        .rows
        .iter()
        .filter(|row| needle.is_empty() || row.matches_filter(&needle))
        .collect()
}

#[must_use]
pub fn filter_strings(items: &[String], term: &str) -> Vec<String> {
    let needle = term.to_lowercase();
    items
        .iter()
        .filter(|item| needle.is_empty() || item.matches_filter(&needle))
        .cloned()
        .collect()
}

/// Moves `cursor` by `delta` inside a list of `len` entries. An empty list
/// pins the cursor at 0.
#[must_use]
pub fn move_cursor(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    cursor.saturating_add_signed(delta).min(len - 1)
}

#[must_use]
pub fn clamp_cursor(cursor: usize, len: usize) -> usize {
    cursor.min(len.saturating_sub(1))
}

/// A list plus a substring filter and a cursor into the filtered view.
///
/// While no filter is set the view is the item list itself; a filter stores
/// only the indices of matching items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredList<T> {
    items: Vec<T>,
    filter: String,
    matches: Option<Vec<usize>>,
    cursor: usize,
}

impl<T> Default for FilteredList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            filter: String::new(),
            matches: None,
            cursor: 0,
        }
    }
}

impl<T: Searchable> FilteredList<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            filter: String::new(),
            matches: None,
            cursor: 0,
        }
    }

    /// Swaps in a fresh item list and re-applies the current filter.
    pub fn replace_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.refilter();
    }

    pub fn set_filter(&mut self, term: &str) {
        term.clone_into(&mut self.filter);
        self.refilter();
    }

    pub fn clear_filter(&mut self) {
        self.set_filter("");
    }

    fn refilter(&mut self) {
        let needle = self.filter.to_lowercase();
        self.matches = if needle.is_empty() {
            None
        } else {
            Some(
                self.items
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| item.matches_filter(&needle))
                    .map(|(index, _)| index)
                    .collect(),
            )
        };
        self.cursor = clamp_cursor(self.cursor, self.len());
    }
}

impl<T> FilteredList<T> {
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.matches.is_some()
    }

    /// Number of entries in the filtered view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches
            .as_ref()
            .map_or(self.items.len(), Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn source_index(&self, visible_index: usize) -> Option<usize> {
        match &self.matches {
            Some(matches) => matches.get(visible_index).copied(),
            None => (visible_index < self.items.len()).then_some(visible_index),
        }
    }

    #[must_use]
    pub fn get(&self, visible_index: usize) -> Option<&T> {
        self.source_index(visible_index)
            .and_then(|index| self.items.get(index))
    }

    #[must_use]
    pub fn visible(&self) -> Vec<&T> {
        match &self.matches {
            Some(matches) => matches
                .iter()
                .filter_map(|index| self.items.get(*index))
                .collect(),
            None => self.items.iter().collect(),
        }
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize) {
        self.cursor = move_cursor(self.cursor, delta, self.len());
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = clamp_cursor(cursor, self.len());
    }

    #[must_use]
    pub fn selected(&self) -> Option<&T> {
        self.get(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::{filter_rows, filter_strings, move_cursor, FilteredList};
    use crate::results::QueryResult;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn sample() -> QueryResult {
        QueryResult::new(
            row(&["id", "name"]),
            vec![
                row(&["1", "Alice"]),
                row(&["2", "Bob"]),
                row(&["3", "alicia"]),
                row(&["4", "NULL"]),
            ],
        )
    }

    #[test]
    fn filters_rows_case_insensitively_across_all_cells() {
        let result = sample();

        let matched = filter_rows(&result, "ALI");
        assert_eq!(matched.len(), 2);
        assert!(matched
            .iter()
            .all(|row| row.iter().any(|cell| cell.to_lowercase().contains("ali"))));

        assert_eq!(filter_rows(&result, "").len(), 4);
        assert_eq!(filter_rows(&result, "null").len(), 1);
    }

    #[test]
    fn filtering_a_filtered_view_is_idempotent() {
        let result = sample();
        let once: Vec<Vec<String>> = filter_rows(&result, "b").into_iter().cloned().collect();
        let filtered = QueryResult::new(result.columns.clone(), once.clone());
        let again = filter_rows(&filtered, "b");

        assert_eq!(again.into_iter().cloned().collect::<Vec<_>>(), once);
    }

    #[test]
    fn clearing_filter_restores_full_view() {
        let mut list = FilteredList::new(sample().rows);

        list.set_filter("bob");
        assert_eq!(list.len(), 1);
        assert_eq!(list.source_index(0), Some(1));

        list.clear_filter();
        assert!(!list.is_filtered());
        assert_eq!(list.len(), 4);
        assert_eq!(list.visible().len(), 4);
    }

    #[test]
    fn shrinking_view_clamps_cursor() {
        let mut list = FilteredList::new(sample().rows);
        list.set_cursor(3);
        assert_eq!(list.cursor(), 3);

        list.set_filter("ali");
        assert_eq!(list.cursor(), 1);
        assert_eq!(list.selected().map(|row| row[1].as_str()), Some("alicia"));

        list.set_filter("nothing matches");
        assert_eq!(list.cursor(), 0);
        assert!(list.selected().is_none());
    }

    #[test]
    fn replacing_items_keeps_filter_and_clamps_cursor() {
        let mut list = FilteredList::new(sample().rows);
        list.set_filter("a");
        list.set_cursor(2);

        list.replace_items(vec![row(&["9", "Ana"])]);

        assert_eq!(list.filter(), "a");
        assert_eq!(list.len(), 1);
        assert_eq!(list.cursor(), 0);
    }

    #[test]
    fn cursor_moves_are_clamped_to_bounds() {
        assert_eq!(move_cursor(0, -1, 5), 0);
        assert_eq!(move_cursor(3, 10, 5), 4);
        assert_eq!(move_cursor(2, 1, 5), 3);
        assert_eq!(move_cursor(4, 1, 0), 0);
    }

    #[test]
    fn filters_plain_strings() {
        let tables = vec![
            "orders".to_string(),
            "order_items".to_string(),
            "users".to_string(),
        ];

        assert_eq!(filter_strings(&tables, "ORDER"), vec!["orders", "order_items"]);
        assert_eq!(filter_strings(&tables, "").len(), 3);
    }
}
