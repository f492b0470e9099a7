use std::fmt;

use ratatui::text::Line;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Payload bound for menu values.
///
/// Values are compared by equality to locate "the same" entry after a list
/// rebuild, and go through JSON when persisted for restore or inspected by
/// identity paths and deep search.
pub trait MenuValue: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned {}

impl<T> MenuValue for T where T: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HelpText {
    Text(String),
    Lines(Vec<String>),
    /// Structured data rendered as a "Reference Data" block.
    Reference(serde_json::Value),
}

impl HelpText {
    pub fn is_empty(&self) -> bool {
        match self {
            HelpText::Text(text) => text.is_empty(),
            HelpText::Lines(lines) => lines.iter().all(String::is_empty),
            HelpText::Reference(value) => value.is_null(),
        }
    }

    /// Flat text that fuzzy search scores against. Highlight indices refer to
    /// characters of this string.
    pub fn searchable(&self) -> String {
        match self {
            HelpText::Text(text) => text.clone(),
            HelpText::Lines(lines) => lines.join("\n"),
            HelpText::Reference(value) => value.to_string(),
        }
    }
}

impl From<&str> for HelpText {
    fn from(value: &str) -> Self {
        HelpText::Text(value.to_string())
    }
}

impl From<String> for HelpText {
    fn from(value: String) -> Self {
        HelpText::Text(value)
    }
}

impl From<Vec<String>> for HelpText {
    fn from(value: Vec<String>) -> Self {
        HelpText::Lines(value)
    }
}

impl From<serde_json::Value> for HelpText {
    fn from(value: serde_json::Value) -> Self {
        HelpText::Reference(value)
    }
}

/// One selectable item.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    pub label: Line<'static>,
    pub value: V,
    /// Group tag. Entries without one share the ungrouped bucket.
    pub group: Option<String>,
    /// Lower sorts first. Missing counts as `0`.
    pub priority: Option<i64>,
    pub help: Option<HelpText>,
    pub icon: Option<String>,
}

impl<V> Entry<V> {
    pub fn new(label: impl Into<Line<'static>>, value: V) -> Self {
        Self {
            label: label.into(),
            value,
            group: None,
            priority: None,
            help: None,
            icon: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_help(mut self, help: impl Into<HelpText>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn plain_label(&self) -> String {
        plain_text(&self.label)
    }

    pub fn group_name(&self) -> &str {
        self.group.as_deref().unwrap_or_default()
    }

    pub fn has_help(&self) -> bool {
        self.help.as_ref().is_some_and(|help| !help.is_empty())
    }
}

/// What a rendered row stands for. Only `Real` rows can hold the cursor or be
/// selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Index into the side's entry list.
    Real(usize),
    /// Blank row between two groups.
    Separator,
    /// "+N more" row standing in for hidden entries.
    MoreMarker(usize),
    /// Column header text.
    HeaderLabel,
    /// "Nothing to select" row of an empty side.
    Placeholder,
}

impl EntryKind {
    pub fn is_selectable(self) -> bool {
        matches!(self, EntryKind::Real(_))
    }
}

pub fn plain_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}

/// Looks up a dotted path (`owner.id`, `items.0.name`) inside a JSON value.
pub fn value_at_path<'a>(
    value: &'a serde_json::Value,
    path: &str,
) -> Option<&'a serde_json::Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        serde_json::Value::Object(map) => map.get(segment),
        serde_json::Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::{Color, Style};
    use ratatui::text::Span;
    use serde_json::json;

    #[test]
    fn plain_label_drops_styling() {
        let entry = Entry::new(
            Line::from(vec![
                Span::styled("Deploy", Style::default().fg(Color::Red)),
                Span::raw(" prod"),
            ]),
            1,
        );
        assert_eq!(entry.plain_label(), "Deploy prod");
    }

    #[test]
    fn ungrouped_entries_share_empty_group() {
        let entry = Entry::new("a", 1);
        assert_eq!(entry.group_name(), "");
        assert_eq!(entry.with_group("tools").group_name(), "tools");
    }

    #[test]
    fn value_path_walks_objects_and_arrays() {
        let value = json!({ "owner": { "id": 7 }, "tags": ["x", "y"] });
        assert_eq!(value_at_path(&value, "owner.id"), Some(&json!(7)));
        assert_eq!(value_at_path(&value, "tags.1"), Some(&json!("y")));
        assert_eq!(value_at_path(&value, "owner.name"), None);
        assert_eq!(value_at_path(&value, "tags.x"), None);
    }

    #[test]
    fn only_real_rows_are_selectable() {
        assert!(EntryKind::Real(0).is_selectable());
        assert!(!EntryKind::Separator.is_selectable());
        assert!(!EntryKind::MoreMarker(3).is_selectable());
        assert!(!EntryKind::HeaderLabel.is_selectable());
    }

    #[test]
    fn lines_help_is_searchable_as_one_text() {
        let help = HelpText::Lines(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(help.searchable(), "first\nsecond");
        assert!(!help.is_empty());
        assert!(HelpText::Text(String::new()).is_empty());
    }
}
