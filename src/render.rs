use std::collections::HashMap;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

use crate::entry::{Entry, EntryKind, HelpText, Side};
use crate::range::Windowed;
use crate::search::Hit;
use crate::theme::Theme;

const INDENT: &str = "  ";
const MAX_STRING_LENGTH: usize = 300;
const ELLIPSIS: &str = "...";
const NESTING: [(&str, Color); 5] = [
    (" - ", Color::Cyan),
    (" * ", Color::Magenta),
    (" # ", Color::Green),
    (" > ", Color::Yellow),
    (" ~ ", Color::Red),
];

pub fn pad_line(mut line: Line<'static>, width: usize) -> Line<'static> {
    let current = line.width();
    if current < width {
        line.spans.push(Span::raw(" ".repeat(width - current)));
    }
    line
}

pub fn pad_line_start(line: Line<'static>, width: usize) -> Line<'static> {
    let current = line.width();
    if current >= width {
        return line;
    }
    let mut spans = vec![Span::raw(" ".repeat(width - current))];
    spans.extend(line.spans);
    Line::from(spans)
}

pub fn max_width<'a, 'b: 'a>(lines: impl IntoIterator<Item = &'a Line<'b>>) -> usize {
    lines.into_iter().map(|line| line.width()).max().unwrap_or(0)
}

fn join(parts: Vec<Line<'static>>) -> Line<'static> {
    Line::from(parts.into_iter().flat_map(|line| line.spans).collect::<Vec<_>>())
}

/// `camelCase`, `snake_case` and `kebab-case` tags become `Title Case`.
pub fn title_case(text: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for ch in text.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if ch.is_uppercase() && previous_lower {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Styles `text`, patching `highlight` over the characters at `indices`.
pub fn highlight_text(
    text: &str,
    indices: &[usize],
    base: Style,
    highlight: Style,
) -> Vec<Span<'static>> {
    highlight_spans(&[Span::styled(text.to_string(), base)], indices, highlight)
}

pub fn highlight_line(line: &Line<'_>, indices: &[usize], highlight: Style) -> Line<'static> {
    let spans = line
        .spans
        .iter()
        .map(|span| Span::styled(span.content.to_string(), line.style.patch(span.style)))
        .collect::<Vec<_>>();
    Line::from(highlight_spans(&spans, indices, highlight))
}

fn highlight_spans(spans: &[Span<'_>], indices: &[usize], highlight: Style) -> Vec<Span<'static>> {
    if indices.is_empty() {
        return spans
            .iter()
            .map(|span| Span::styled(span.content.to_string(), span.style))
            .collect();
    }

    let mut out: Vec<Span<'static>> = Vec::new();
    let mut position = 0usize;
    for span in spans {
        let mut run = String::new();
        let mut run_marked = false;
        for ch in span.content.chars() {
            let marked = indices.contains(&position);
            if marked != run_marked && !run.is_empty() {
                out.push(styled_run(std::mem::take(&mut run), span.style, run_marked, highlight));
            }
            run_marked = marked;
            run.push(ch);
            position += 1;
        }
        if !run.is_empty() {
            out.push(styled_run(run, span.style, run_marked, highlight));
        }
    }
    out
}

fn styled_run(text: String, base: Style, marked: bool, highlight: Style) -> Span<'static> {
    if marked {
        Span::styled(text, base.patch(highlight))
    } else {
        Span::styled(text, base)
    }
}

/// One rendered row of a side and what it stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct SideRow {
    pub kind: EntryKind,
    pub line: Line<'static>,
}

impl SideRow {
    fn new(kind: EntryKind, line: Line<'static>) -> Self {
        Self { kind, line }
    }
}

#[derive(Debug, Clone)]
pub struct SideLayout<'a> {
    pub side: Side,
    /// The side holding the cursor gets the selected/normal styles.
    pub active: bool,
    /// Blank rows between groups. Off while a query is filtering the list.
    pub separators: bool,
    pub title_types: bool,
    pub header: Option<&'a str>,
    pub header_padding: usize,
    /// Row shown when the window is empty. `None` shows nothing.
    pub placeholder: Option<Line<'static>>,
}

/// Renders one column of a menu from an already windowed list.
///
/// Group tags print once per run of equal tags and are padded to the widest
/// visible tag; labels are padded to the widest visible label so the cursor
/// highlight spans the column.
pub fn render_side<V>(
    entries: &[Entry<V>],
    window: &[Windowed<&Hit>],
    cursor: Option<usize>,
    layout: &SideLayout<'_>,
    theme: &Theme,
) -> Vec<SideRow> {
    let tag_of = |entry: &Entry<V>| {
        if layout.title_types {
            title_case(entry.group_name())
        } else {
            entry.group_name().to_string()
        }
    };
    let visible: Vec<&Hit> = window.iter().filter_map(|slot| slot.item().copied()).collect();
    let max_type = visible
        .iter()
        .map(|hit| tag_of(&entries[hit.index]).width())
        .max()
        .unwrap_or(0);
    let max_label = visible
        .iter()
        .map(|hit| icon_label_width(&entries[hit.index]))
        .max()
        .unwrap_or(0)
        + 1;

    let mut out = Vec::new();
    if visible.is_empty() {
        if let Some(placeholder) = &layout.placeholder {
            out.push(SideRow::new(EntryKind::Placeholder, placeholder.clone()));
        }
    }

    let mut last_tag: Option<String> = None;
    for slot in window {
        let hit = match slot {
            Windowed::More(count) => {
                out.push(SideRow::new(
                    EntryKind::MoreMarker(*count),
                    Line::from(vec![
                        Span::raw(format!(" {}  ", " ".repeat(max_type))),
                        Span::styled(format!("+{count}"), theme.more_marker),
                        Span::raw(" more"),
                    ]),
                ));
                continue;
            }
            Windowed::Item(hit) => *hit,
        };
        let entry = &entries[hit.index];
        let tag = tag_of(entry);

        let prefix = if last_tag.as_deref() == Some(tag.as_str()) {
            vec![Span::raw(" ".repeat(max_type))]
        } else {
            if last_tag.is_some() && layout.separators {
                out.push(SideRow::new(EntryKind::Separator, Line::raw(" ")));
            }
            let type_style = if layout.active {
                theme.entry_type
            } else {
                theme.entry_type_other
            };
            // Title casing moves characters around, so match indices no longer apply.
            let matches: &[usize] = if layout.title_types { &[] } else { &hit.matches.group };
            let mut spans = highlight_text(&tag, matches, type_style, theme.highlight);
            spans.push(Span::raw(" ".repeat(max_type.saturating_sub(tag.width()))));
            last_tag = Some(tag);
            spans
        };

        let mut label_spans = Vec::new();
        if let Some(icon) = entry.icon.as_deref().filter(|icon| !icon.is_empty()) {
            label_spans.push(Span::raw(format!("{icon} ")));
        }
        label_spans.extend(highlight_line(&entry.label, &hit.matches.label, theme.highlight).spans);
        let padded = pad_line(Line::from(label_spans), max_label);

        let mut spans = vec![Span::raw(" ")];
        spans.extend(prefix);
        if layout.active {
            let color = if cursor == Some(hit.index) {
                theme.selected
            } else {
                theme.normal
            };
            spans.push(Span::raw(" "));
            spans.push(Span::styled(" ", color));
            spans.extend(restyle(padded, color).spans);
        } else {
            spans.push(Span::raw("  "));
            spans.extend(restyle(padded, theme.other).spans);
        }
        out.push(SideRow::new(EntryKind::Real(hit.index), Line::from(spans)));
    }

    if let Some(header) = layout.header {
        let widest = max_width(out.iter().map(|row| &row.line));
        let padding = " ".repeat(layout.header_padding);
        let text = match layout.side {
            Side::Left => format!("{header}{padding}"),
            Side::Right => format!("{padding}{header}"),
        };
        let line = Line::from(Span::styled(text, theme.header));
        let line = match layout.side {
            Side::Left => pad_line_start(line, widest),
            Side::Right => pad_line(line, widest),
        };
        out.insert(0, SideRow::new(EntryKind::HeaderLabel, line));
    }
    out
}

fn icon_label_width<V>(entry: &Entry<V>) -> usize {
    let icon = entry
        .icon
        .as_deref()
        .filter(|icon| !icon.is_empty())
        .map_or(0, |icon| icon.width() + 1);
    icon + entry.label.width()
}

/// Layers `style` under each span's own style.
fn restyle(line: Line<'static>, style: Style) -> Line<'static> {
    Line::from(
        line.spans
            .into_iter()
            .map(|span| {
                let merged = style.patch(span.style);
                Span::styled(span.content, merged)
            })
            .collect::<Vec<_>>(),
    )
}

/// Joins two columns side by side with the themed divider.
///
/// Rows past the end of the shorter right column still get the divider so
/// the separator line stays continuous.
pub fn assemble_columns(
    left: Vec<Line<'static>>,
    right: Vec<Line<'static>>,
    headers: Option<(&str, &str)>,
    theme: &Theme,
) -> Vec<Line<'static>> {
    let left_header = headers.map(|(left, _)| format!(" {left}"));
    let max_a = max_width(&left).max(left_header.as_deref().map_or(0, UnicodeWidthStr::width)) + 1;
    let max_b = max_width(&right).max(headers.map_or(0, |(_, right)| right.width()));
    let divider = || Span::styled(theme.column_divider.clone(), theme.help_divider);

    let right_len = right.len();
    let mut out = left;
    for (index, item) in right.into_iter().enumerate() {
        let current = out.get(index).cloned().unwrap_or_default();
        let row = join(vec![
            pad_line(current, max_a),
            Line::from(divider()),
            pad_line(item, max_b),
        ]);
        if index < out.len() {
            out[index] = row;
        } else {
            out.push(row);
        }
    }
    for line in out.iter_mut().skip(right_len) {
        let padded = pad_line(std::mem::take(line), max_a);
        *line = join(vec![padded, Line::from(divider())]);
    }

    if let (Some(left), Some((_, right))) = (left_header, headers) {
        let left = pad_line_start(Line::from(Span::styled(left, theme.header)), max_a - 1);
        let right = pad_line(Line::from(Span::styled(right.to_string(), theme.header)), max_b);
        out.insert(0, join(vec![left, Line::raw(" "), Line::from(divider()), right]));
    }
    out
}

/// Named, height-accounted sections of the select screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Alert,
    Header,
    ColumnHeaders,
    Body,
    HelpText,
    Divider,
    Keybindings,
    Notes,
}

impl BlockKind {
    /// Order blocks claim height in. The list body is the last to go.
    pub const PRIORITY_ORDER: [BlockKind; 8] = [
        BlockKind::Body,
        BlockKind::ColumnHeaders,
        BlockKind::Alert,
        BlockKind::HelpText,
        BlockKind::Header,
        BlockKind::Divider,
        BlockKind::Keybindings,
        BlockKind::Notes,
    ];

    /// Order surviving blocks are printed in.
    pub const DISPLAY_ORDER: [BlockKind; 8] = [
        BlockKind::Alert,
        BlockKind::Header,
        BlockKind::ColumnHeaders,
        BlockKind::Body,
        BlockKind::HelpText,
        BlockKind::Divider,
        BlockKind::Notes,
        BlockKind::Keybindings,
    ];
}

#[derive(Debug, Clone, Default)]
pub struct Construction {
    blocks: HashMap<BlockKind, Vec<Line<'static>>>,
}

impl Construction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: BlockKind, lines: Vec<Line<'static>>) {
        self.blocks.insert(kind, lines);
    }

    pub fn get(&self, kind: BlockKind) -> Option<&[Line<'static>]> {
        self.blocks.get(&kind).map(Vec::as_slice)
    }

    /// Widest line across every block.
    pub fn width(&self) -> usize {
        self.blocks
            .values()
            .map(|lines| max_width(lines))
            .max()
            .unwrap_or(0)
    }
}

/// Stacks blocks into one screen that fits `height` rows.
///
/// Blocks claim height in [`BlockKind::PRIORITY_ORDER`]. The first block that
/// would overrun the budget is dropped together with every block after it;
/// the rest print in [`BlockKind::DISPLAY_ORDER`].
pub fn assemble_message(construction: &Construction, height: usize) -> Vec<Line<'static>> {
    let mut remaining = height as i64;
    let mut kept = Vec::new();
    for kind in BlockKind::PRIORITY_ORDER {
        let Some(lines) = construction.get(kind) else {
            continue;
        };
        remaining -= lines.len() as i64;
        if remaining < 0 {
            tracing::trace!(?kind, height, "block dropped for lack of height");
            break;
        }
        kept.push(kind);
    }

    BlockKind::DISPLAY_ORDER
        .iter()
        .filter(|kind| kept.contains(kind))
        .filter_map(|kind| construction.get(*kind))
        .flat_map(|lines| lines.iter().cloned())
        .collect()
}

/// Help text as display lines, with fuzzy matches highlighted.
///
/// `matches` index characters of [`HelpText::searchable`].
pub fn help_lines(help: &HelpText, matches: &[usize], theme: &Theme) -> Vec<Line<'static>> {
    match help {
        HelpText::Text(_) | HelpText::Lines(_) => {
            let text = help.searchable();
            let mut offset = 0;
            text.split('\n')
                .map(|line| {
                    let count = line.chars().count();
                    let local: Vec<usize> = matches
                        .iter()
                        .filter(|&&index| index >= offset && index < offset + count)
                        .map(|index| index - offset)
                        .collect();
                    offset += count + 1;
                    Line::from(highlight_text(line, &local, Style::default(), theme.highlight))
                })
                .collect()
        }
        HelpText::Reference(value) => {
            let mut out = vec![Line::from(Span::styled("Reference Data", theme.reference_title))];
            out.extend(format_reference(value));
            out
        }
    }
}

/// Appends ` ? <help>` below `message`.
pub fn merge_help(
    mut message: Vec<Line<'static>>,
    help: Option<&HelpText>,
    matches: &[usize],
    theme: &Theme,
) -> Vec<Line<'static>> {
    let Some(help) = help.filter(|help| !help.is_empty()) else {
        return message;
    };
    message.push(Line::raw(" "));
    let mut lines = help_lines(help, matches, theme).into_iter();
    let mut first = vec![Span::styled("  ? ", theme.help_marker)];
    if let Some(line) = lines.next() {
        first.extend(line.spans);
    }
    message.push(Line::from(first));
    message.extend(lines);
    message
}

/// Pretty prints structured help data: sorted, title-cased keys with nested
/// bullets, strings truncated past 300 characters.
pub fn format_reference(value: &Value) -> Vec<Line<'static>> {
    typed(value, 0)
        .into_iter()
        .filter(|spans| !spans.is_empty())
        .map(Line::from)
        .collect()
}

// The first returned line continues whatever line the caller is building.
fn typed(value: &Value, nested: usize) -> Vec<Vec<Span<'static>>> {
    let gray = Style::default().fg(Color::Gray);
    match value {
        Value::Null => vec![vec![Span::styled("null", gray)]],
        Value::Bool(flag) => vec![vec![Span::styled(
            flag.to_string(),
            Style::default().fg(Color::Magenta),
        )]],
        Value::Number(number) => vec![vec![Span::styled(
            number.to_string(),
            Style::default().fg(Color::Yellow),
        )]],
        Value::String(text) if text.is_empty() => vec![vec![Span::styled("empty string", gray)]],
        Value::String(text) => {
            let blue = Style::default().fg(Color::Blue);
            if text.chars().count() <= MAX_STRING_LENGTH {
                return vec![vec![Span::styled(text.clone(), blue)]];
            }
            let trimmed: String = text.chars().take(MAX_STRING_LENGTH - ELLIPSIS.len()).collect();
            vec![vec![
                Span::styled(trimmed, blue),
                Span::styled(ELLIPSIS, Style::default().fg(Color::LightBlue)),
            ]]
        }
        Value::Array(items) if items.is_empty() => vec![vec![Span::styled("empty array", gray)]],
        Value::Array(items) => {
            let mut out = vec![Vec::new()];
            for item in items {
                let mut nested_lines = typed(item, nested + 1).into_iter();
                let mut line = vec![Span::raw(INDENT.repeat(nested)), bullet(nested)];
                line.extend(nested_lines.next().unwrap_or_default());
                out.push(line);
                out.extend(nested_lines);
            }
            out
        }
        Value::Object(map) if map.is_empty() => vec![vec![Span::styled("empty object", gray)]],
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let max_key = keys.iter().map(|key| title_case(key).width()).max().unwrap_or(0) + 1;
            let (symbol, color) = NESTING[nested.min(NESTING.len() - 1)];
            let bold = Style::default().add_modifier(Modifier::BOLD);

            let mut out = Vec::new();
            if nested > 0 {
                out.push(Vec::new());
            }
            for key in keys {
                let title = title_case(key);
                let pad = " ".repeat(max_key.saturating_sub(title.width()));
                let mut line = vec![
                    Span::raw(INDENT.repeat(nested)),
                    Span::styled(symbol, bold.fg(color)),
                    Span::styled(format!("{title}{pad}"), bold),
                    Span::raw(" "),
                ];
                let mut nested_lines = typed(&map[key], nested + 1).into_iter();
                line.extend(nested_lines.next().unwrap_or_default());
                out.push(line);
                out.extend(nested_lines);
            }
            out
        }
    }
}

fn bullet(nested: usize) -> Span<'static> {
    let (symbol, color) = NESTING[nested.min(NESTING.len() - 1)];
    Span::styled(symbol, Style::default().fg(color))
}

/// `label: value` rows with the labels padded to one column.
pub fn header_pairs(pairs: &[(String, String)]) -> Vec<Line<'static>> {
    let widest = pairs
        .iter()
        .map(|(label, _)| label.width())
        .max()
        .unwrap_or(0)
        + 1;
    pairs
        .iter()
        .map(|(label, value)| {
            let label = format!("{label}:");
            let pad = " ".repeat(widest.saturating_sub(label.width()));
            Line::from(vec![
                Span::styled(format!("{label}{pad}"), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::raw(value.clone()),
            ])
        })
        .collect()
}

/// Static frame left on screen after a menu ends.
pub fn summary<V>(entry: Option<&Entry<V>>, theme: &Theme) -> Vec<Line<'static>> {
    let mut line = vec![Span::raw(" "), Span::styled(">", Style::default().fg(Color::Cyan)), Span::raw(" ")];
    if let Some(entry) = entry {
        if let Some(icon) = entry.icon.as_deref().filter(|icon| !icon.is_empty()) {
            line.push(Span::raw(format!("{icon} ")));
        }
        if !entry.group_name().is_empty() {
            line.push(Span::styled(format!("[{}] ", entry.group_name()), theme.entry_type));
        }
        line.extend(restyle(entry.label.clone(), Style::default().fg(Color::Blue)).spans);
    }
    let help = entry.and_then(|entry| entry.help.as_ref());
    let mut out = merge_help(Vec::new(), help, &[], theme);
    out.push(Line::from(line));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::plain_text;
    use crate::range::select_range;
    use crate::search::FieldMatches;
    use serde_json::json;

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(plain_text).collect()
    }

    fn rows_text(rows: &[SideRow]) -> Vec<String> {
        rows.iter().map(|row| plain_text(&row.line)).collect()
    }

    fn layout(side: Side, active: bool) -> SideLayout<'static> {
        SideLayout {
            side,
            active,
            separators: true,
            title_types: false,
            header: None,
            header_padding: 4,
            placeholder: Some(Line::raw(" No actions to select from ")),
        }
    }

    fn hits(len: usize) -> Vec<Hit> {
        (0..len).map(Hit::plain).collect()
    }

    fn window(hits: &[Hit]) -> Vec<Windowed<&Hit>> {
        hits.iter().map(Windowed::Item).collect()
    }

    #[test]
    fn title_case_handles_common_shapes() {
        assert_eq!(title_case("entity_id"), "Entity Id");
        assert_eq!(title_case("friendlyName"), "Friendly Name");
        assert_eq!(title_case("dev-tools"), "Dev Tools");
    }

    #[test]
    fn group_tags_print_once_per_run_with_separators() {
        let entries = vec![
            Entry::new("a1", 1).with_group("alpha"),
            Entry::new("a2", 2).with_group("alpha"),
            Entry::new("b1", 3).with_group("beta"),
        ];
        let hits = hits(3);
        let rows = render_side(&entries, &window(&hits), Some(0), &layout(Side::Right, true), &Theme::plain());
        assert_eq!(
            rows_text(&rows),
            vec![" alpha  a1 ", "        a2 ", " ", " beta   b1 "]
        );
        assert_eq!(rows[2].kind, EntryKind::Separator);
        assert_eq!(rows[3].kind, EntryKind::Real(2));
    }

    #[test]
    fn filtering_suppresses_group_separators() {
        let entries = vec![
            Entry::new("a1", 1).with_group("alpha"),
            Entry::new("b1", 2).with_group("beta"),
        ];
        let hits = hits(2);
        let mut layout = layout(Side::Right, true);
        layout.separators = false;
        let rows = render_side(&entries, &window(&hits), None, &layout, &Theme::plain());
        assert!(rows.iter().all(|row| row.kind != EntryKind::Separator));
    }

    #[test]
    fn cursor_row_uses_selected_style_only_on_active_side() {
        let entries = vec![Entry::new("one", 1), Entry::new("two", 2)];
        let hits = hits(2);
        let theme = Theme::plain();
        let active = render_side(&entries, &window(&hits), Some(1), &layout(Side::Right, true), &theme);
        let reversed = |row: &SideRow| {
            row.line
                .spans
                .iter()
                .any(|span| span.style.add_modifier.contains(Modifier::REVERSED))
        };
        assert!(!reversed(&active[0]));
        assert!(reversed(&active[1]));

        let inactive = render_side(&entries, &window(&hits), Some(1), &layout(Side::Left, false), &theme);
        assert!(inactive.iter().all(|row| !reversed(row)));
    }

    #[test]
    fn empty_window_renders_placeholder_unless_suppressed() {
        let entries: Vec<Entry<i32>> = Vec::new();
        let rows = render_side(&entries, &[], None, &layout(Side::Right, true), &Theme::plain());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, EntryKind::Placeholder);

        let mut quiet = layout(Side::Right, true);
        quiet.placeholder = None;
        assert!(render_side(&entries, &[], None, &quiet, &Theme::plain()).is_empty());
    }

    #[test]
    fn more_markers_render_counts() {
        let entries: Vec<Entry<usize>> = (0..30).map(|i| Entry::new(format!("e{i}"), i)).collect();
        let hits = hits(30);
        let window = select_range(&hits, |hit| hit.index == 15, 10, true);
        let rows = render_side(&entries, &window, Some(15), &layout(Side::Right, true), &Theme::plain());
        assert_eq!(rows[0].kind, EntryKind::MoreMarker(12));
        assert!(plain_text(&rows[0].line).contains("+12 more"));
    }

    #[test]
    fn headers_align_to_their_side() {
        let entries = vec![Entry::new("something long", 1)];
        let hits = hits(1);
        let mut left = layout(Side::Left, false);
        left.header = Some("Menu");
        let rows = render_side(&entries, &window(&hits), None, &left, &Theme::plain());
        let header = plain_text(&rows[0].line);
        assert_eq!(rows[0].kind, EntryKind::HeaderLabel);
        assert!(header.ends_with("Menu    "));
        assert_eq!(header.len(), plain_text(&rows[1].line).len());

        let mut right = layout(Side::Right, true);
        right.header = Some("Menu");
        let rows = render_side(&entries, &window(&hits), None, &right, &Theme::plain());
        assert!(plain_text(&rows[0].line).starts_with("    Menu"));
    }

    #[test]
    fn label_matches_are_highlighted() {
        let entries = vec![Entry::new("deploy", 1)];
        let hit = Hit {
            index: 0,
            score: 10,
            matches: FieldMatches {
                label: vec![0, 1],
                ..FieldMatches::default()
            },
        };
        let mut theme = Theme::plain();
        theme.highlight = Style::default().add_modifier(Modifier::UNDERLINED);
        let rows = render_side(&entries, &[Windowed::Item(&hit)], None, &layout(Side::Right, true), &theme);
        let underlined: String = rows[0]
            .line
            .spans
            .iter()
            .filter(|span| span.style.add_modifier.contains(Modifier::UNDERLINED))
            .map(|span| span.content.as_ref())
            .collect();
        assert_eq!(underlined, "de");
    }

    #[test]
    fn columns_share_a_continuous_divider() {
        let left = vec![Line::raw("aa"), Line::raw("bbbb"), Line::raw("c")];
        let right = vec![Line::raw("x")];
        let out = assemble_columns(left, right, None, &Theme::plain());
        assert_eq!(text(&out), vec!["aa   |x", "bbbb |", "c    |"]);
    }

    #[test]
    fn longer_right_column_gets_blank_left_cells() {
        let left = vec![Line::raw("a")];
        let right = vec![Line::raw("x"), Line::raw("yy")];
        let out = assemble_columns(left, right, Some(("L", "R")), &Theme::plain());
        assert_eq!(text(&out), vec![" L |R ", "a  |x ", "   |yy"]);
    }

    fn construction() -> Construction {
        let mut construction = Construction::new();
        let block = |name: &str, rows: usize| (0..rows).map(|i| Line::raw(format!("{name}{i}"))).collect();
        construction.set(BlockKind::Alert, block("alert", 1));
        construction.set(BlockKind::Header, block("header", 1));
        construction.set(BlockKind::ColumnHeaders, block("columns", 1));
        construction.set(BlockKind::Body, block("body", 3));
        construction.set(BlockKind::HelpText, block("help", 1));
        construction.set(BlockKind::Divider, block("divider", 1));
        construction.set(BlockKind::Keybindings, block("keys", 2));
        construction.set(BlockKind::Notes, block("notes", 1));
        construction
    }

    #[test]
    fn roomy_screen_keeps_display_order() {
        let out = text(&assemble_message(&construction(), 100));
        assert_eq!(
            out,
            vec![
                "alert0", "header0", "columns0", "body0", "body1", "body2", "help0", "divider0",
                "notes0", "keys0", "keys1"
            ]
        );
    }

    #[test]
    fn keybindings_go_first_when_height_runs_out() {
        // body 3 + columns 1 + alert 1 + help 1 + header 1 + divider 1 = 8,
        // keybindings would need 2 more.
        let out = text(&assemble_message(&construction(), 9));
        assert!(!out.iter().any(|line| line.starts_with("keys")));
        assert!(!out.iter().any(|line| line.starts_with("notes")));
        assert!(out.contains(&"divider0".to_string()));
    }

    #[test]
    fn body_is_the_last_block_standing() {
        let out = text(&assemble_message(&construction(), 3));
        assert_eq!(out, vec!["body0", "body1", "body2"]);
        assert!(assemble_message(&construction(), 2).is_empty());
    }

    #[test]
    fn block_filling_the_height_exactly_is_kept() {
        let mut construction = Construction::new();
        let body: Vec<Line<'static>> = (0..3).map(|i| Line::raw(format!("body{i}"))).collect();
        construction.set(BlockKind::Body, body);
        construction.set(BlockKind::Keybindings, vec![Line::raw("keys")]);
        assert_eq!(
            text(&assemble_message(&construction, 3)),
            vec!["body0", "body1", "body2"]
        );
        assert_eq!(text(&assemble_message(&construction, 4)).len(), 4);
    }

    #[test]
    fn missing_blocks_do_not_consume_height() {
        let mut construction = Construction::new();
        construction.set(BlockKind::Body, vec![Line::raw("body")]);
        construction.set(BlockKind::Keybindings, vec![Line::raw("keys")]);
        assert_eq!(text(&assemble_message(&construction, 3)), vec!["body", "keys"]);
    }

    #[test]
    fn help_lines_split_and_highlight_per_line() {
        let help = HelpText::Lines(vec!["abc".to_string(), "def".to_string()]);
        let mut theme = Theme::plain();
        theme.highlight = Style::default().add_modifier(Modifier::BOLD);
        let lines = help_lines(&help, &[4], &theme);
        assert_eq!(text(&lines), vec!["abc", "def"]);
        let bold: Vec<&str> = lines[1]
            .spans
            .iter()
            .filter(|span| span.style.add_modifier.contains(Modifier::BOLD))
            .map(|span| span.content.as_ref())
            .collect();
        assert_eq!(bold, vec!["d"]);
    }

    #[test]
    fn merge_help_appends_question_marker() {
        let out = merge_help(vec![Line::raw("body")], Some(&HelpText::from("details")), &[], &Theme::plain());
        assert_eq!(text(&out), vec!["body", " ", "  ? details"]);
        let untouched = merge_help(vec![Line::raw("body")], None, &[], &Theme::plain());
        assert_eq!(text(&untouched), vec!["body"]);
    }

    #[test]
    fn reference_data_sorts_and_nests() {
        let value = json!({ "zeta": 1, "alpha_key": { "inner": true }, "list": ["x"] });
        let out = text(&format_reference(&value));
        assert_eq!(
            out,
            vec![
                " - Alpha Key  ",
                "   * Inner  true",
                " - List       ",
                "   * x",
                " - Zeta       1",
            ]
        );
    }

    #[test]
    fn long_reference_strings_are_truncated() {
        let long = "x".repeat(400);
        let out = text(&format_reference(&json!({ "text": long })));
        assert_eq!(out[0].chars().count(), " - Text  ".len() + MAX_STRING_LENGTH);
        assert!(out[0].ends_with("..."));
    }

    #[test]
    fn header_pairs_align_labels() {
        let pairs = vec![
            ("Host".to_string(), "alpha".to_string()),
            ("Region".to_string(), "eu".to_string()),
        ];
        assert_eq!(text(&header_pairs(&pairs)), vec!["Host:   alpha", "Region: eu"]);
    }

    #[test]
    fn summary_shows_group_and_label() {
        let entry = Entry::new("Deploy", 1).with_group("ops").with_icon("*");
        let out = text(&summary(Some(&entry), &Theme::plain()));
        assert_eq!(out, vec![" > * [ops] Deploy"]);
    }
}
