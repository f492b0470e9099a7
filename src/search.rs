use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::entry::{Entry, Side, value_at_path};

/// Scores at or below this never count as a match, whatever the field.
pub const MATCH_FLOOR: i64 = -10_000;

// Subtracted from a field's raw score; the label weighs the most.
const LABEL_PENALTY: i64 = 0;
const GROUP_PENALTY: i64 = 250;
const HELP_PENALTY: i64 = 350;
const DEEP_PENALTY: i64 = 500;

const TEXT_CAP: char = ' ';
const ELLIPSIS: &str = "...";
const MIN_BOX_WIDTH: usize = 10;
pub const SEARCH_PLACEHOLDER: &str = "Type to filter";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub enabled: bool,
    pub left: bool,
    pub right: bool,
    pub label: bool,
    pub group: bool,
    pub help: bool,
    /// Dotted path into the serialized payload, searched as an extra field.
    pub deep: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            left: true,
            right: true,
            label: true,
            group: true,
            help: true,
            deep: None,
        }
    }
}

impl SearchOptions {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn side_enabled(&self, side: Side) -> bool {
        self.enabled
            && match side {
                Side::Left => self.left,
                Side::Right => self.right,
            }
    }
}

/// Character indices matched by the query, per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMatches {
    pub label: Vec<usize>,
    pub group: Vec<usize>,
    pub help: Vec<usize>,
}

/// An entry of a (possibly filtered) list, by index into its side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub index: usize,
    pub score: i64,
    pub matches: FieldMatches,
}

impl Hit {
    pub fn plain(index: usize) -> Self {
        Self {
            index,
            score: 0,
            matches: FieldMatches::default(),
        }
    }
}

pub struct FuzzySearch {
    matcher: SkimMatcherV2,
}

impl Default for FuzzySearch {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzySearch {
    pub fn new() -> Self {
        Self {
            matcher: SkimMatcherV2::default().ignore_case(),
        }
    }

    /// Filters and ranks `order` (indices into `entries`) against `query`.
    ///
    /// An empty query or disabled search passes the list through untouched.
    /// Otherwise every enabled field is scored, penalized by its weight, and
    /// the best field decides the entry's score. Entries no field matches are
    /// dropped. Ties keep their incoming order.
    pub fn filter<V: Serialize>(
        &self,
        query: &str,
        entries: &[Entry<V>],
        order: &[usize],
        options: &SearchOptions,
    ) -> Vec<Hit> {
        if !options.enabled || query.is_empty() {
            return order.iter().copied().map(Hit::plain).collect();
        }

        let mut hits: Vec<Hit> = order
            .iter()
            .filter_map(|&index| self.score_entry(query, index, &entries[index], options))
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        tracing::trace!(query, kept = hits.len(), total = order.len(), "fuzzy filter");
        hits
    }

    fn score_entry<V: Serialize>(
        &self,
        query: &str,
        index: usize,
        entry: &Entry<V>,
        options: &SearchOptions,
    ) -> Option<Hit> {
        let mut best: Option<i64> = None;
        let mut matches = FieldMatches::default();
        let mut consider = |score: i64| {
            best = Some(best.map_or(score, |current| current.max(score)));
        };

        if options.label {
            if let Some((score, indices)) = self.matcher.fuzzy_indices(&entry.plain_label(), query) {
                consider(score - LABEL_PENALTY);
                matches.label = indices;
            }
        }
        if options.group && !entry.group_name().is_empty() {
            if let Some((score, indices)) = self.matcher.fuzzy_indices(entry.group_name(), query) {
                consider(score - GROUP_PENALTY);
                matches.group = indices;
            }
        }
        if options.help {
            if let Some(help) = entry.help.as_ref().filter(|help| !help.is_empty()) {
                if let Some((score, indices)) = self.matcher.fuzzy_indices(&help.searchable(), query)
                {
                    consider(score - HELP_PENALTY);
                    matches.help = indices;
                }
            }
        }
        if let Some(path) = options.deep.as_deref() {
            if let Some(text) = deep_text(&entry.value, path) {
                if let Some(score) = self.matcher.fuzzy_match(&text, query) {
                    consider(score - DEEP_PENALTY);
                }
            }
        }

        let score = best?;
        if score <= MATCH_FLOOR {
            return None;
        }
        Some(Hit {
            index,
            score,
            matches,
        })
    }
}

fn deep_text<V: Serialize>(value: &V, path: &str) -> Option<String> {
    let json = serde_json::to_value(value).ok()?;
    match value_at_path(&json, path)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Visible slice of an editable text plus the cursor column inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SlicedText {
    chars: Vec<char>,
    cursor: usize,
}

/// Fits `text` into `width` columns keeping the char at `index` visible.
///
/// A trailing blank gives the cursor somewhere to sit at the end. Long text
/// slides so the cursor rests on the left third, and clipped ends turn into
/// `...`.
fn slice_range(text: &str, index: usize, width: usize) -> SlicedText {
    let mut chars: Vec<char> = text.chars().collect();
    chars.push(TEXT_CAP);
    let total = chars.len();
    let index = index.min(total - 1);

    if total <= width {
        chars.resize(width, ' ');
        return SlicedText {
            chars,
            cursor: index,
        };
    }

    let dots = ELLIPSIS.len();
    let inset = (width / 3).max(dots);
    let start = index.saturating_sub(inset).min(total - width);
    let mut window: Vec<char> = chars[start..start + width].to_vec();
    if start > 0 {
        window[..dots].fill('.');
    }
    if start + width < total {
        window[width - dots..].fill('.');
    }
    SlicedText {
        chars: window,
        cursor: index - start,
    }
}

/// The query box shown above filtered lists.
///
/// `cursor` is only set while the query is being edited; the character under
/// it renders inverted.
pub fn search_box(
    value: &str,
    cursor: Option<usize>,
    width: usize,
    style: Style,
    placeholder: &str,
) -> Line<'static> {
    let width = width.max(MIN_BOX_WIDTH);
    if value.is_empty() {
        let text = format!(" {placeholder} ");
        let pad = width.saturating_sub(text.width());
        return Line::from(Span::styled(format!("{text}{}", " ".repeat(pad)), style));
    }

    let inner = width - 2;
    let index = cursor.unwrap_or_else(|| value.chars().count());
    let sliced = slice_range(value, index, inner);
    let mut spans = vec![Span::styled(" ", style)];
    for (column, ch) in sliced.chars.iter().enumerate() {
        let char_style = if cursor.is_some() && column == sliced.cursor {
            style.add_modifier(Modifier::REVERSED)
        } else {
            style
        };
        spans.push(Span::styled(ch.to_string(), char_style));
    }
    spans.push(Span::styled(" ", style));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::plain_text;
    use serde_json::json;

    fn entries() -> Vec<Entry<i32>> {
        vec![
            Entry::new("Deploy production", 1).with_group("release"),
            Entry::new("Run tests", 2).with_group("dev"),
            Entry::new("Open shell", 3)
                .with_group("dev")
                .with_help("Starts an interactive terminal"),
        ]
    }

    fn order(len: usize) -> Vec<usize> {
        (0..len).collect()
    }

    #[test]
    fn empty_query_passes_through_in_order() {
        let entries = entries();
        let hits = FuzzySearch::new().filter("", &entries, &[2, 0, 1], &SearchOptions::default());
        let indices: Vec<usize> = hits.iter().map(|hit| hit.index).collect();
        assert_eq!(indices, vec![2, 0, 1]);
    }

    #[test]
    fn disabled_search_passes_through() {
        let entries = entries();
        let hits = FuzzySearch::new().filter("zzz", &entries, &order(3), &SearchOptions::disabled());
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn unrelated_query_discards_everything() {
        let entries = entries();
        let hits = FuzzySearch::new().filter("qqq", &entries, &order(3), &SearchOptions::default());
        assert!(hits.is_empty());
    }

    #[test]
    fn label_matches_record_highlight_indices() {
        let entries = entries();
        let hits = FuzzySearch::new().filter("tests", &entries, &order(3), &SearchOptions::default());
        assert_eq!(hits[0].index, 1);
        assert_eq!(hits[0].matches.label, vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn help_text_is_searched_unless_disabled() {
        let entries = entries();
        let search = FuzzySearch::new();
        let hits = search.filter("interactive", &entries, &order(3), &SearchOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 2);
        assert!(!hits[0].matches.help.is_empty());

        let options = SearchOptions {
            help: false,
            ..SearchOptions::default()
        };
        assert!(search.filter("interactive", &entries, &order(3), &options).is_empty());
    }

    #[test]
    fn label_outranks_the_same_text_in_help() {
        let entries = vec![
            Entry::new("other", 1).with_help("build"),
            Entry::new("build", 2),
        ];
        let hits = FuzzySearch::new().filter("build", &entries, &order(2), &SearchOptions::default());
        assert_eq!(hits[0].index, 1);
        assert_eq!(hits[1].index, 0);
    }

    #[test]
    fn deep_field_reads_payload_paths() {
        let entries = vec![
            Entry::new("first", json!({ "owner": { "name": "kestrel" } })),
            Entry::new("second", json!({ "owner": { "name": "heron" } })),
        ];
        let options = SearchOptions {
            deep: Some("owner.name".to_string()),
            ..SearchOptions::default()
        };
        let hits = FuzzySearch::new().filter("kestrel", &entries, &order(2), &options);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 0);
    }

    #[test]
    fn short_text_is_padded_with_cursor_in_place() {
        let sliced = slice_range("abc", 1, 10);
        assert_eq!(sliced.chars.len(), 10);
        assert_eq!(sliced.cursor, 1);
    }

    #[test]
    fn long_text_keeps_cursor_visible_with_ellipses() {
        let text = "abcdefghijklmnopqrstuvwxyz0123456789";
        let sliced = slice_range(text, 20, 12);
        let rendered: String = sliced.chars.iter().collect();
        assert_eq!(sliced.chars.len(), 12);
        assert!(rendered.starts_with("..."));
        assert!(rendered.ends_with("..."));
        assert_eq!(sliced.chars[sliced.cursor], 'u');
    }

    #[test]
    fn cursor_at_end_shows_text_tail() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let sliced = slice_range(text, text.len(), 12);
        let rendered: String = sliced.chars.iter().collect();
        assert!(rendered.starts_with("..."));
        assert!(rendered.ends_with("z "));
        assert_eq!(sliced.cursor, 11);
    }

    #[test]
    fn empty_box_shows_placeholder() {
        let line = search_box("", None, 30, Style::default(), SEARCH_PLACEHOLDER);
        let text = plain_text(&line);
        assert!(text.starts_with(" Type to filter"));
        assert_eq!(text.len(), 30);
    }

    #[test]
    fn editing_box_inverts_cursor_char() {
        let line = search_box("abc", Some(1), 20, Style::default(), SEARCH_PLACEHOLDER);
        let inverted: Vec<&str> = line
            .spans
            .iter()
            .filter(|span| span.style.add_modifier.contains(Modifier::REVERSED))
            .map(|span| span.content.as_ref())
            .collect();
        assert_eq!(inverted, vec!["b"]);
    }
}
