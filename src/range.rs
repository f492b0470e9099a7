/// Rows kept visible above the cursor when the window scrolls.
pub const BUFFER_SIZE: usize = 3;
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Smallest page that still fits the buffer and both "+N more" markers
/// around the cursor.
pub const MIN_PAGE_SIZE: usize = 2 * BUFFER_SIZE + 2;

/// One slot of a page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Windowed<T> {
    Item(T),
    /// Count of entries hidden past this end of the window.
    More(usize),
}

impl<T> Windowed<T> {
    pub fn item(&self) -> Option<&T> {
        match self {
            Windowed::Item(item) => Some(item),
            Windowed::More(_) => None,
        }
    }
}

/// Returns the page of `items` around the entry `is_current` picks.
///
/// Lists that fit a page come back whole. Otherwise the window pins to the
/// head or tail when the cursor is within [`BUFFER_SIZE`] of either end and
/// is centered `BUFFER_SIZE` rows below the top in between. A missing cursor
/// behaves like index 0. With `include_markers`, truncated ends get a
/// [`Windowed::More`] slot and the window still spans exactly `page_size`
/// slots.
pub fn select_range<'a, T, F>(
    items: &'a [T],
    is_current: F,
    page_size: usize,
    include_markers: bool,
) -> Vec<Windowed<&'a T>>
where
    F: Fn(&T) -> bool,
{
    let page_size = page_size.max(MIN_PAGE_SIZE);
    let len = items.len();
    if len <= page_size {
        return items.iter().map(Windowed::Item).collect();
    }

    let index = items.iter().position(is_current).unwrap_or(0);
    let single_marker = if include_markers { 1 } else { 0 };

    if index <= BUFFER_SIZE {
        let visible = page_size - single_marker;
        let mut out: Vec<_> = items[..visible].iter().map(Windowed::Item).collect();
        if include_markers {
            out.push(Windowed::More(len - visible));
        }
        return out;
    }

    if index >= len - page_size + BUFFER_SIZE {
        let visible = page_size - single_marker;
        let start = len - visible;
        let mut out = Vec::with_capacity(page_size);
        if include_markers {
            out.push(Windowed::More(start));
        }
        out.extend(items[start..].iter().map(Windowed::Item));
        return out;
    }

    let visible = page_size - 2 * single_marker;
    let start = index - BUFFER_SIZE;
    let end = start + visible;
    let mut out = Vec::with_capacity(page_size);
    if include_markers {
        out.push(Windowed::More(start));
    }
    out.extend(items[start..end].iter().map(Windowed::Item));
    if include_markers {
        out.push(Windowed::More(len - end));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn items(len: usize) -> Vec<usize> {
        (0..len).collect()
    }

    fn values(window: &[Windowed<&usize>]) -> Vec<usize> {
        window.iter().filter_map(|slot| slot.item().map(|v| **v)).collect()
    }

    #[test]
    fn short_lists_are_returned_whole() {
        let list = items(5);
        let window = select_range(&list, |v| *v == 4, 20, true);
        assert_eq!(values(&window), vec![0, 1, 2, 3, 4]);
        assert!(window.iter().all(|slot| slot.item().is_some()));
    }

    #[test]
    fn cursor_near_top_pins_head() {
        let list = items(30);
        let window = select_range(&list, |v| *v == 2, 10, false);
        assert_eq!(values(&window), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn cursor_near_bottom_pins_tail() {
        let list = items(30);
        let window = select_range(&list, |v| *v == 28, 10, false);
        assert_eq!(values(&window), (20..30).collect::<Vec<_>>());
    }

    #[test]
    fn middle_window_starts_buffer_rows_above_cursor() {
        let list = items(30);
        let window = select_range(&list, |v| *v == 12, 10, false);
        assert_eq!(values(&window), (9..19).collect::<Vec<_>>());
    }

    #[test]
    fn missing_cursor_behaves_like_first_entry() {
        let list = items(30);
        let window = select_range(&list, |_| false, 10, false);
        assert_eq!(values(&window), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn markers_count_hidden_entries_per_end() {
        let list = items(30);
        let window = select_range(&list, |v| *v == 12, 10, true);
        assert_eq!(window.first(), Some(&Windowed::More(9)));
        assert_eq!(window.last(), Some(&Windowed::More(13)));
        assert_eq!(values(&window), (9..17).collect::<Vec<_>>());

        let head = select_range(&list, |v| *v == 0, 10, true);
        assert!(head.first().and_then(Windowed::item).is_some());
        assert_eq!(head.last(), Some(&Windowed::More(21)));
    }

    #[test]
    fn markers_follow_the_filtered_list_not_the_source() {
        // A filtered view of 12 out of 100 entries only reports what the
        // filtered list hides.
        let filtered = items(12);
        let window = select_range(&filtered, |v| *v == 11, 10, true);
        assert_eq!(window.first(), Some(&Windowed::More(3)));
    }

    #[test]
    fn tiny_page_sizes_are_clamped() {
        let list = items(30);
        let window = select_range(&list, |v| *v == 15, 1, true);
        assert_eq!(window.len(), MIN_PAGE_SIZE);
    }

    proptest! {
        #[test]
        fn window_has_page_size_slots_and_contains_cursor(
            page in MIN_PAGE_SIZE..40usize,
            extra in 1..60usize,
            markers in any::<bool>(),
            seed in any::<usize>(),
        ) {
            let len = page + extra;
            let list = items(len);
            let cursor = seed % len;
            let window = select_range(&list, |v| *v == cursor, page, markers);
            prop_assert_eq!(window.len(), page);
            prop_assert!(values(&window).contains(&cursor));
        }

        #[test]
        fn every_index_stays_visible(page in MIN_PAGE_SIZE..30usize, extra in 1..40usize) {
            let len = page + extra;
            let list = items(len);
            for cursor in 0..len {
                let window = select_range(&list, |v| *v == cursor, page, true);
                prop_assert!(values(&window).contains(&cursor));
            }
        }
    }
}
