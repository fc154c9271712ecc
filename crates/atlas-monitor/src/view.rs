use atlas_core::Query;
use chrono::{Local, TimeZone};
use std::fmt::Display;

pub const CACHE_PAGE_SIZE: usize = 10;
pub const HISTORY_PAGE_SIZE: usize = 5;
const DIGEST_PREFIX: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageCursor {
    pub page: usize,
    pub page_size: usize,
}

impl PageCursor {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }
}

/// `items[page * size .. page * size + size]`, clipped to the slice.
/// Pages past the end are empty.
pub fn paginate<T>(items: &[T], cursor: PageCursor) -> &[T] {
    if cursor.page_size == 0 {
        return &[];
    }
    let Some(start) = cursor.page.checked_mul(cursor.page_size) else {
        return &[];
    };
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(cursor.page_size).min(items.len());
    &items[start..end]
}

/// Number of pages needed for `len` items. An empty table still has one.
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 || len == 0 {
        return 1;
    }
    len.div_ceil(page_size)
}

pub fn shift_page(page: usize, delta: isize, len: usize, page_size: usize) -> usize {
    let last = page_count(len, page_size) - 1;
    page.saturating_add_signed(delta).min(last)
}

/// Expanded-row state for the cache table. The history sub-table page lives
/// here, so collapsing a row forgets it and reopening starts at page 0.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RowSelection {
    #[default]
    Collapsed,
    Expanded {
        key: String,
        history_page: usize,
    },
}

impl RowSelection {
    /// Returns the history request to issue, if any.
    pub fn toggle(&mut self, key: &str) -> Option<Query> {
        if self.expanded_key() == Some(key) {
            *self = RowSelection::Collapsed;
            return None;
        }
        *self = RowSelection::Expanded {
            key: key.to_string(),
            history_page: 0,
        };
        Some(Query::history(key))
    }

    pub fn expanded_key(&self) -> Option<&str> {
        match self {
            RowSelection::Collapsed => None,
            RowSelection::Expanded { key, .. } => Some(key.as_str()),
        }
    }

    pub fn history_page(&self) -> usize {
        match self {
            RowSelection::Collapsed => 0,
            RowSelection::Expanded { history_page, .. } => *history_page,
        }
    }

    pub fn shift_history_page(&mut self, delta: isize, history_len: usize) {
        if let RowSelection::Expanded { history_page, .. } = self {
            *history_page = shift_page(*history_page, delta, history_len, HISTORY_PAGE_SIZE);
        }
    }
}

/// Seconds since the epoch rendered in local time; 0 means "never".
pub fn format_timestamp(secs: u64) -> String {
    format_timestamp_in(secs, &Local)
}

pub fn format_timestamp_in<Tz>(secs: u64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if secs == 0 {
        return "N/A".to_string();
    }
    let Ok(secs) = i64::try_from(secs) else {
        return "N/A".to_string();
    };
    match tz.timestamp_opt(secs, 0).single() {
        Some(at) => at.format("%-m/%-d/%Y %H:%M:%S").to_string(),
        None => "N/A".to_string(),
    }
}

pub fn short_digest(digest: &str) -> String {
    if digest.is_empty() {
        return "-".to_string();
    }
    if digest.chars().count() <= DIGEST_PREFIX {
        return digest.to_string();
    }
    let prefix: String = digest.chars().take(DIGEST_PREFIX).collect();
    format!("{prefix}..")
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::Command;
    use chrono::Utc;

    #[test]
    fn pagination_bounds_for_23_items() {
        let items: Vec<usize> = (0..23).collect();
        assert_eq!(paginate(&items, PageCursor::new(0, 10)), &items[0..10]);
        assert_eq!(paginate(&items, PageCursor::new(2, 10)), &[20, 21, 22]);
        assert!(paginate(&items, PageCursor::new(3, 10)).is_empty());
        assert_eq!(page_count(items.len(), 10), 3);
    }

    #[test]
    fn pagination_degenerate_cursors_are_empty() {
        let items = [1, 2, 3];
        assert!(paginate(&items, PageCursor::new(0, 0)).is_empty());
        assert!(paginate(&items, PageCursor::new(usize::MAX, 2)).is_empty());
        assert!(paginate::<u8>(&[], PageCursor::new(0, 5)).is_empty());
        assert_eq!(page_count(0, 5), 1);
    }

    #[test]
    fn shift_page_clamps_to_existing_pages() {
        assert_eq!(shift_page(0, -1, 23, 10), 0);
        assert_eq!(shift_page(1, 5, 23, 10), 2);
        assert_eq!(shift_page(2, -1, 23, 10), 1);
        assert_eq!(shift_page(0, 1, 0, 10), 0);
    }

    #[test]
    fn toggle_follows_collapse_expand_switch_transitions() {
        let mut selection = RowSelection::default();
        assert_eq!(selection, RowSelection::Collapsed);

        let request = selection.toggle("A").expect("request for A");
        assert_eq!(request.data, Command::History);
        assert_eq!(request.params, Some(serde_json::json!("A")));
        assert_eq!(selection.expanded_key(), Some("A"));

        assert_eq!(selection.toggle("A"), None);
        assert_eq!(selection, RowSelection::Collapsed);

        selection.toggle("A");
        let request = selection.toggle("B").expect("request for B");
        assert_eq!(request, Query::history("B"));
        assert_eq!(selection.expanded_key(), Some("B"));
    }

    #[test]
    fn history_page_resets_when_row_is_reopened() {
        let mut selection = RowSelection::default();
        selection.toggle("A");
        selection.shift_history_page(1, 12);
        selection.shift_history_page(1, 12);
        assert_eq!(selection.history_page(), 2);
        selection.shift_history_page(1, 12);
        assert_eq!(selection.history_page(), 2);

        selection.toggle("A");
        selection.toggle("A");
        assert_eq!(selection.history_page(), 0);
    }

    #[test]
    fn collapsed_selection_ignores_history_paging() {
        let mut selection = RowSelection::default();
        selection.shift_history_page(3, 100);
        assert_eq!(selection, RowSelection::Collapsed);
    }

    #[test]
    fn timestamp_zero_is_not_available() {
        assert_eq!(format_timestamp(0), "N/A");
    }

    #[test]
    fn positive_timestamps_have_no_comma() {
        for secs in [1, 1_700_000_000, 4_102_444_800] {
            let text = format_timestamp(secs);
            assert!(!text.is_empty());
            assert!(!text.contains(','), "{text}");
        }
        assert_eq!(format_timestamp_in(1_700_000_000, &Utc), "11/14/2023 22:13:20");
        assert_eq!(format_timestamp_in(u64::MAX, &Utc), "N/A");
    }

    #[test]
    fn digests_are_shortened_for_tables() {
        assert_eq!(short_digest(""), "-");
        assert_eq!(short_digest("abcd"), "abcd");
        assert_eq!(short_digest("0123456789abcdef0123"), "0123456789ab..");
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
