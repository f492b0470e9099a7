use std::time::Instant;

use ratatui::text::{Line, Span};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{RestoreCache, RestoreRecord, restore_key};
use crate::config::MenuSettings;
use crate::entry::{Entry, EntryKind, MenuValue, Side, value_at_path};
use crate::keyboard::{
    Binding, HelpItem, KeyPress, KeyboardManager, Keymap, Modifiers, divider, help_screen,
    help_sections,
};
use crate::range::select_range;
use crate::render::{
    BlockKind, Construction, SideLayout, SideRow, assemble_columns, assemble_message,
    header_pairs, help_lines, max_width, merge_help, render_side, summary,
};
use crate::screen::{RecordedFrame, Screen};
use crate::search::{FuzzySearch, Hit, SEARCH_PLACEHOLDER, SearchOptions, search_box};
use crate::sort::{should_sort, sort_side};
use crate::theme::Theme;

const DEFAULT_ITEM: &str = "actions";
const DEFAULT_NOTES: &str = "\n ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Select,
    /// Typing into the search box.
    FindInput,
    /// Moving through filtered results with the search box inactive.
    FindNavigate,
}

/// A shortcut that ends the menu (or runs the key callback) from any entry.
#[derive(Debug, Clone)]
pub struct MenuKey<V> {
    pub key: String,
    pub label: String,
    pub value: V,
    pub aliases: Vec<String>,
    /// Help line reacts to the cursor sitting on an entry with this value.
    pub highlight: bool,
}

impl<V> MenuKey<V> {
    pub fn new(key: impl Into<String>, label: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            value,
            aliases: Vec::new(),
            highlight: false,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }

    fn help_item(&self, current: Option<&V>) -> HelpItem
    where
        V: PartialEq,
    {
        let keys: Vec<&str> = std::iter::once(self.key.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .collect();
        HelpItem {
            label: keys.join(", "),
            description: self.label.clone(),
            highlight: self.highlight.then(|| current == Some(&self.value)),
        }
    }
}

/// What a key callback is told about the press.
pub struct KeyCall<'a, V> {
    pub key: &'a KeyPress,
    /// Payload of the [`MenuKey`] that fired.
    pub value: &'a V,
    /// Entry under the cursor, if any.
    pub selected: Option<&'a Entry<V>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// End the menu with the key's value.
    End,
    /// Keep the menu open and flash a status line above the list.
    Message(String),
    Stay,
}

pub type KeyCallback<V> = Box<dyn FnMut(&KeyCall<'_, V>) -> KeyOutcome>;

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderMessage {
    Text(String),
    Lines(Vec<String>),
    /// Rendered as an aligned `label: value` table.
    Pairs(Vec<(String, String)>),
}

impl HeaderMessage {
    fn lines(&self) -> Vec<Line<'static>> {
        match self {
            HeaderMessage::Text(text) => text
                .split('\n')
                .map(|line| Line::raw(line.to_string()))
                .collect(),
            HeaderMessage::Lines(lines) => {
                lines.iter().map(|line| Line::raw(line.clone())).collect()
            }
            HeaderMessage::Pairs(pairs) => header_pairs(pairs),
        }
    }
}

pub enum HelpNotes<V> {
    Text(String),
    Lines(Vec<String>),
    /// Recomputed from the cursor value on every frame.
    Dynamic(Box<dyn Fn(Option<&V>) -> String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreKind {
    Position,
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    pub id: String,
    pub kind: RestoreKind,
    /// Dotted paths compared instead of whole payloads for value restores.
    /// Any one path matching is enough.
    pub id_property: Vec<String>,
}

impl RestoreOptions {
    pub fn new(id: impl Into<String>, kind: RestoreKind) -> Self {
        Self {
            id: id.into(),
            kind,
            id_property: Vec::new(),
        }
    }
}

pub struct MenuOptions<V> {
    pub left: Vec<Entry<V>>,
    pub right: Vec<Entry<V>>,
    /// Entry to start on. Matched against both sides.
    pub value: Option<V>,
    pub keys: Vec<MenuKey<V>>,
    /// Runs when a [`MenuKey`] fires. Without one, keys end the menu.
    pub key_callback: Option<KeyCallback<V>>,
    /// Noun for the empty placeholder: "No {item} to select from".
    pub item: String,
    pub empty_message: Option<String>,
    pub show_headers: Option<bool>,
    pub left_header: Option<String>,
    pub right_header: Option<String>,
    pub header_padding: Option<usize>,
    pub header_message: Option<HeaderMessage>,
    pub help_notes: Option<HelpNotes<V>>,
    pub title_types: bool,
    pub sort: Option<bool>,
    /// Only the custom keys do anything; list navigation is unbound.
    pub key_only: bool,
    pub condensed: bool,
    pub search: SearchOptions,
    pub range_markers: bool,
    pub restore: Option<RestoreOptions>,
}

impl<V> Default for MenuOptions<V> {
    fn default() -> Self {
        Self {
            left: Vec::new(),
            right: Vec::new(),
            value: None,
            keys: Vec::new(),
            key_callback: None,
            item: DEFAULT_ITEM.to_string(),
            empty_message: None,
            show_headers: None,
            left_header: None,
            right_header: None,
            header_padding: None,
            header_message: None,
            help_notes: None,
            title_types: false,
            sort: None,
            key_only: false,
            condensed: false,
            search: SearchOptions::default(),
            range_markers: false,
            restore: None,
        }
    }
}

impl<V> MenuOptions<V> {
    pub fn new(left: Vec<Entry<V>>, right: Vec<Entry<V>>) -> Self {
        Self {
            left,
            right,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndTrigger {
    /// `enter` on the entry under the cursor.
    Entry,
    /// A custom key.
    Keyboard { key: String, modifiers: Modifiers },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub side: Side,
    /// Position within the side's sorted list.
    pub index: usize,
}

/// How a menu ended.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuOutcome<V> {
    pub value: Option<V>,
    pub trigger: EndTrigger,
    pub selection: Option<Selection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    ActivateKeymap,
    Next,
    Previous,
    Top,
    Bottom,
    Select,
    Left,
    Right,
    ToggleFind,
    SearchKey,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Next,
    Previous,
    Top,
    Bottom,
}

struct SideList<V> {
    entries: Vec<Entry<V>>,
    /// Display order, as indices into `entries`.
    order: Vec<usize>,
}

impl<V> SideList<V> {
    fn new(entries: Vec<Entry<V>>, sorted: bool) -> Self {
        let order = if sorted {
            sort_side(&entries)
        } else {
            (0..entries.len()).collect()
        };
        Self { entries, order }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn plain_hits(&self) -> Vec<Hit> {
        self.order.iter().copied().map(Hit::plain).collect()
    }

    fn position(&self, index: usize) -> Option<usize> {
        self.order.iter().position(|&candidate| candidate == index)
    }

    fn first(&self) -> Option<usize> {
        self.order.first().copied()
    }
}

#[derive(Debug, Default)]
struct SearchCache {
    current: [Vec<Hit>; 2],
    previous: Option<[Vec<Hit>; 2]>,
}

fn slot(side: Side) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}

struct RenderContext<'a> {
    settings: &'a MenuSettings,
    theme: &'a Theme,
    fuzzy: &'a FuzzySearch,
    width: usize,
    height: usize,
}

struct MenuState<V> {
    left: SideList<V>,
    right: SideList<V>,
    keys: Vec<MenuKey<V>>,
    callback: Option<KeyCallback<V>>,
    item: String,
    empty_message: Option<String>,
    show_headers: bool,
    left_header: String,
    right_header: String,
    header_padding: usize,
    header_message: Option<HeaderMessage>,
    help_notes: Option<HelpNotes<V>>,
    title_types: bool,
    key_only: bool,
    condensed: bool,
    search: SearchOptions,
    range_markers: bool,
    restore: Option<RestoreOptions>,

    active: Side,
    /// Index into the active side's entries.
    cursor: Option<usize>,
    mode: Mode,
    search_text: String,
    /// Character position of the text cursor in `search_text`.
    search_cursor: usize,
    hits: SearchCache,
    alert: Option<(String, Instant)>,
    complete: bool,
    final_entry: Option<Entry<V>>,
}

impl<V: MenuValue> MenuState<V> {
    fn new<C: RestoreCache>(options: MenuOptions<V>, settings: &MenuSettings, cache: &C) -> Self {
        let MenuOptions {
            left,
            right,
            value,
            keys,
            key_callback,
            item,
            empty_message,
            show_headers,
            left_header,
            right_header,
            header_padding,
            header_message,
            help_notes,
            title_types,
            sort,
            key_only,
            condensed,
            search,
            range_markers,
            restore,
        } = options;

        let sorted = should_sort(sort, &left, &right);
        let both = !left.is_empty() && !right.is_empty();
        let mut state = Self {
            show_headers: show_headers.unwrap_or(!left.is_empty()),
            left_header: left_header
                .filter(|header| !header.is_empty())
                .unwrap_or_else(|| if both { "Secondary" } else { "Menu" }.to_string()),
            right_header: right_header
                .filter(|header| !header.is_empty())
                .unwrap_or_else(|| "Menu".to_string()),
            header_padding: header_padding.unwrap_or(settings.header_padding),
            left: SideList::new(left, sorted),
            right: SideList::new(right, sorted),
            keys,
            callback: key_callback,
            item,
            empty_message,
            header_message,
            help_notes,
            title_types,
            key_only,
            condensed,
            search,
            range_markers,
            restore,
            active: Side::Right,
            cursor: None,
            mode: Mode::Select,
            search_text: String::new(),
            search_cursor: 0,
            hits: SearchCache::default(),
            alert: None,
            complete: false,
            final_entry: None,
        };
        state.set_value(value, cache);
        state
    }

    fn list(&self, side: Side) -> &SideList<V> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn cursor_entry(&self) -> Option<&Entry<V>> {
        let entries = &self.list(self.active).entries;
        self.cursor.and_then(|index| entries.get(index))
    }

    fn cursor_value(&self) -> Option<&V> {
        self.cursor_entry().map(|entry| &entry.value)
    }

    fn place(&mut self, side: Side, index: Option<usize>) {
        self.active = side;
        self.cursor = index;
    }

    fn search_enabled(&self) -> bool {
        self.search.enabled && (self.search.left || self.search.right)
    }

    fn set_value<C: RestoreCache>(&mut self, incoming: Option<V>, cache: &C) {
        if let Some(incoming) = incoming {
            if let Some((side, index)) = self.find_value(&incoming) {
                tracing::debug!(%side, index, "cursor placed on requested value");
                self.place(side, Some(index));
                return;
            }
            tracing::debug!(value = ?incoming, "requested value is not in the menu");
        }

        if let Some(restore) = self.restore.clone() {
            let record = cache.get(&restore_key(&restore.id));
            if let Some(record) = record {
                if self.apply_restore(&restore, record) {
                    return;
                }
            }
        }

        if let Some(first) = self.right.first() {
            self.place(Side::Right, Some(first));
        } else if let Some(first) = self.left.first() {
            self.place(Side::Left, Some(first));
        } else {
            self.place(Side::Right, None);
        }
    }

    fn apply_restore(&mut self, restore: &RestoreOptions, record: RestoreRecord) -> bool {
        match restore.kind {
            RestoreKind::Position => {
                let list = self.list(record.side);
                let Some(position) = record.index else {
                    return false;
                };
                if list.is_empty() {
                    return false;
                }
                let position = position.min(list.order.len() - 1);
                let index = list.order[position];
                tracing::debug!(side = %record.side, position, "restored cursor position");
                self.place(record.side, Some(index));
                true
            }
            RestoreKind::Value => {
                let Some(raw) = record.value else {
                    return false;
                };
                let value: V = match serde_json::from_value(raw) {
                    Ok(value) => value,
                    Err(err) => {
                        tracing::debug!(error = %err, "stored restore value does not fit this menu");
                        return false;
                    }
                };
                match self.find_value(&value) {
                    Some((side, index)) => {
                        tracing::debug!(%side, index, "restored cursor value");
                        self.place(side, Some(index));
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Locates a payload across both sides, left first.
    fn find_value(&self, needle: &V) -> Option<(Side, usize)> {
        let paths = self
            .restore
            .as_ref()
            .filter(|restore| restore.kind == RestoreKind::Value && !restore.id_property.is_empty())
            .map(|restore| restore.id_property.as_slice());
        let needle_json = paths.and_then(|_| serde_json::to_value(needle).ok());

        [Side::Left, Side::Right].into_iter().find_map(|side| {
            self.list(side)
                .entries
                .iter()
                .position(|entry| same_value(&entry.value, needle, needle_json.as_ref(), paths))
                .map(|index| (side, index))
        })
    }

    fn select_keymap(&self) -> Keymap<MenuAction> {
        let hidden = self.key_only || self.condensed;
        let mut keymap = Keymap::new().bind(
            Binding::catch_all("everything else", MenuAction::ActivateKeymap).power_user(true),
        );
        if !self.key_only {
            keymap.push(Binding::new(["down"], "next", MenuAction::Next));
            keymap.push(Binding::new(["enter"], "select entry", MenuAction::Select));
            keymap.push(Binding::new(["up"], "previous", MenuAction::Previous));
        }
        keymap.push(
            Binding::new(["end", "pagedown"], "move to bottom", MenuAction::Bottom)
                .power_user(hidden),
        );
        keymap.push(
            Binding::new(["home", "pageup"], "move to top", MenuAction::Top).power_user(hidden),
        );
        if !self.left.is_empty() && !self.right.is_empty() {
            keymap.push(Binding::new(["left"], "left", MenuAction::Left));
            keymap.push(Binding::new(["right"], "right", MenuAction::Right));
        }
        if self.search_enabled() && !self.key_only {
            keymap.push(Binding::new(["tab"], "toggle find", MenuAction::ToggleFind));
        }
        keymap
    }

    fn find_keymap() -> Keymap<MenuAction> {
        Keymap::new()
            .bind(Binding::catch_all("search", MenuAction::SearchKey).power_user(true))
            .bind(Binding::new(["enter"], "select entry", MenuAction::Select))
            .bind(Binding::new(["tab"], "toggle find", MenuAction::ToggleFind))
    }

    fn keymap(&self) -> Keymap<MenuAction> {
        match self.mode {
            Mode::Select => self.select_keymap(),
            Mode::FindInput | Mode::FindNavigate => Self::find_keymap(),
        }
    }

    fn find_key(&self, key: &str) -> Option<&MenuKey<V>> {
        self.keys
            .iter()
            .find(|entry| entry.key == key)
            .or_else(|| {
                self.keys
                    .iter()
                    .find(|entry| entry.aliases.iter().any(|alias| alias == key))
            })
    }

    /// Select-mode movement; wraps at both ends.
    fn step(&mut self, step: Step) {
        let order = &self.list(self.active).order;
        let (Some(&first), Some(&last)) = (order.first(), order.last()) else {
            return;
        };
        let position = self.cursor.and_then(|cursor| order.iter().position(|&index| index == cursor));
        let next = match (step, position) {
            (Step::Top, _) => first,
            (Step::Bottom, _) => last,
            (_, None) => first,
            (Step::Next, Some(position)) if position + 1 >= order.len() => first,
            (Step::Next, Some(position)) => order[position + 1],
            (Step::Previous, Some(0)) => last,
            (Step::Previous, Some(position)) => order[position - 1],
        };
        self.cursor = Some(next);
    }

    /// Entries a side currently offers: the filtered list in find modes,
    /// or the whole side when the filter came back empty.
    fn available(&self, side: Side) -> Vec<Hit> {
        let list = self.list(side);
        if self.mode == Mode::Select || !self.search.side_enabled(side) {
            return list.plain_hits();
        }
        let filtered = &self.hits.current[slot(side)];
        if filtered.is_empty() {
            list.plain_hits()
        } else {
            filtered.clone()
        }
    }

    fn refresh_hits(&mut self, fuzzy: &FuzzySearch) {
        let current = [Side::Left, Side::Right].map(|side| {
            let list = self.list(side);
            fuzzy.filter(&self.search_text, &list.entries, &list.order, &self.search)
        });
        self.hits.previous = Some(std::mem::replace(&mut self.hits.current, current));
    }

    /// The filtered list of `side`. With `update`, the cursor is moved onto
    /// something the new results still contain.
    fn filtered(&mut self, side: Side, update: bool) -> Vec<Hit> {
        if !self.search.side_enabled(side) {
            return self.list(side).plain_hits();
        }
        let highlighted = self.hits.current[slot(side)].clone();
        if !update {
            return highlighted;
        }

        let other_empty = self.hits.current[slot(side.other())].is_empty();
        if highlighted.is_empty() && other_empty {
            self.cursor = None;
            return highlighted;
        }
        if self.active != side {
            if !other_empty {
                return highlighted;
            }
            tracing::trace!(%side, "cursor follows the only side with results");
            self.active = side;
            self.cursor = None;
        }

        let first = highlighted.first().map(|hit| hit.index);
        if self.mode == Mode::FindInput {
            self.cursor = first;
            return highlighted;
        }
        if let Some(cursor) = self.cursor {
            if highlighted.iter().any(|hit| hit.index == cursor) {
                return highlighted;
            }
        }

        let previous_position = self.hits.previous.as_ref().and_then(|previous| {
            let cursor = self.cursor?;
            previous[slot(side)].iter().position(|hit| hit.index == cursor)
        });
        self.cursor = match previous_position {
            None => first,
            Some(position) if position >= highlighted.len() => highlighted.last().map(|hit| hit.index),
            Some(position) => Some(highlighted[position].index),
        };
        highlighted
    }

    /// Visible rows of one side with `None` for the blank row opening each
    /// group.
    fn visual_range(
        &self,
        hits: &[Hit],
        cursor: Option<usize>,
        entries: &[Entry<V>],
        page_size: usize,
    ) -> Vec<Option<usize>> {
        let window = select_range(hits, |hit| Some(hit.index) == cursor, page_size, false);
        let mut previous: Option<&str> = None;
        let mut out = Vec::with_capacity(window.len() * 2);
        for hit in window.iter().filter_map(|slot| slot.item()) {
            let group = entries[hit.index].group_name();
            if previous != Some(group) {
                out.push(None);
                previous = Some(group);
            }
            out.push(Some(hit.index));
        }
        out
    }

    /// Moves to the other side, keeping the cursor on the same screen row
    /// where possible.
    fn switch_side(&mut self, target: Side, page_size: usize) {
        if self.active == target || self.list(target).is_empty() {
            return;
        }
        let current_hits = self.available(self.active);
        let target_hits = self.available(target);
        let current = self.visual_range(
            &current_hits,
            self.cursor,
            &self.list(self.active).entries,
            page_size,
        );
        let other = self.visual_range(&target_hits, None, &self.list(target).entries, page_size);

        let row = self
            .cursor
            .and_then(|cursor| current.iter().position(|slot| *slot == Some(cursor)));
        let landed = row.and_then(|row| other.iter().take(row + 1).rev().find_map(|slot| *slot));
        let landed = landed.or_else(|| target_hits.first().map(|hit| hit.index));
        tracing::trace!(from = %self.active, to = %target, ?row, "side switched");
        self.place(target, landed);
    }

    fn toggle_find(&mut self) {
        self.mode = match self.mode {
            Mode::Select => Mode::FindInput,
            Mode::FindInput | Mode::FindNavigate => Mode::Select,
        };
        if self.mode != Mode::Select {
            self.cursor = self.list(self.active).first();
        }
        tracing::debug!(mode = ?self.mode, "find toggled");
    }

    fn clear_search(&mut self) {
        self.search_text.clear();
        self.search_cursor = 0;
    }

    /// Returns whether the filter has to be recomputed against the cursor.
    fn search_key(&mut self, press: &KeyPress, page_size: usize) -> bool {
        if press.key == "escape" {
            self.clear_search();
            return true;
        }
        if self.mode == Mode::FindInput {
            return self.find_input_key(press);
        }

        let available = self.available(self.active);
        let position = self
            .cursor
            .and_then(|cursor| available.iter().position(|hit| hit.index == cursor));
        if matches!(press.key.as_str(), "up" | "pageup") && position == Some(0) {
            self.mode = Mode::FindInput;
            return true;
        }
        match press.key.as_str() {
            "backspace" => {
                self.search_text.pop();
                self.search_cursor = self.search_text.chars().count();
                true
            }
            "up" | "down" | "home" | "pageup" | "end" | "pagedown" => {
                self.navigate_search(&press.key, &available, position);
                false
            }
            "left" => {
                self.switch_side(Side::Left, page_size);
                false
            }
            "right" => {
                self.switch_side(Side::Right, page_size);
                false
            }
            _ => match press.typed_char() {
                Some(ch) => {
                    self.search_text.push(ch);
                    self.search_cursor = self.search_text.chars().count();
                    true
                }
                None => false,
            },
        }
    }

    /// Find-navigate movement; stops at both ends.
    fn navigate_search(&mut self, key: &str, available: &[Hit], position: Option<usize>) {
        let (Some(first), Some(last)) = (available.first(), available.last()) else {
            return;
        };
        let target = match (key, position) {
            ("home" | "pageup", _) => first,
            ("end" | "pagedown", _) => last,
            (_, None) => first,
            ("up", Some(position)) => &available[position.saturating_sub(1)],
            (_, Some(position)) => &available[(position + 1).min(available.len() - 1)],
        };
        self.cursor = Some(target.index);
    }

    fn find_input_key(&mut self, press: &KeyPress) -> bool {
        let length = self.search_text.chars().count();
        match press.key.as_str() {
            "left" => self.search_cursor = self.search_cursor.saturating_sub(1),
            "right" => self.search_cursor = (self.search_cursor + 1).min(length),
            "home" => self.search_cursor = 0,
            "end" => self.search_cursor = length,
            "down" | "pagedown" => {
                self.mode = Mode::FindNavigate;
                self.cursor = self.available(self.active).first().map(|hit| hit.index);
                return false;
            }
            "backspace" => {
                if self.search_cursor == 0 {
                    return false;
                }
                self.search_cursor -= 1;
                self.remove_char(self.search_cursor);
            }
            "delete" => {
                if self.search_cursor >= length {
                    return false;
                }
                self.remove_char(self.search_cursor);
            }
            _ => {
                let Some(ch) = press.typed_char() else {
                    return false;
                };
                let offset = self.byte_offset(self.search_cursor);
                self.search_text.insert(offset, ch);
                self.search_cursor += 1;
            }
        }
        true
    }

    fn byte_offset(&self, position: usize) -> usize {
        self.search_text
            .char_indices()
            .nth(position)
            .map_or(self.search_text.len(), |(offset, _)| offset)
    }

    fn remove_char(&mut self, position: usize) {
        let offset = self.byte_offset(position);
        if offset < self.search_text.len() {
            self.search_text.remove(offset);
        }
    }

    fn notes(&self) -> String {
        match &self.help_notes {
            Some(HelpNotes::Text(text)) => text.clone(),
            Some(HelpNotes::Lines(lines)) => lines.join("\n"),
            Some(HelpNotes::Dynamic(notes)) => notes(self.cursor_value()),
            None => DEFAULT_NOTES.to_string(),
        }
    }

    fn placeholder(&self, theme: &Theme) -> Option<Line<'static>> {
        if self.key_only {
            return None;
        }
        Some(match &self.empty_message {
            Some(message) => Line::raw(message.clone()),
            None => Line::from(Span::styled(
                format!(" No {} to select from ", self.item),
                theme.placeholder,
            )),
        })
    }

    fn side_rows(
        &self,
        side: Side,
        hits: &[Hit],
        with_header: bool,
        separators: bool,
        ctx: &RenderContext<'_>,
    ) -> Vec<SideRow> {
        let active = self.active == side;
        let cursor = if active { self.cursor } else { None };
        let window = select_range(
            hits,
            |hit| Some(hit.index) == cursor,
            ctx.settings.page_size,
            self.range_markers,
        );
        let header = match side {
            Side::Left => self.left_header.as_str(),
            Side::Right => self.right_header.as_str(),
        };
        let layout = SideLayout {
            side,
            active,
            separators,
            title_types: self.title_types,
            header: with_header.then_some(header),
            header_padding: self.header_padding,
            placeholder: self.placeholder(ctx.theme),
        };
        render_side(&self.list(side).entries, &window, cursor, &layout, ctx.theme)
    }

    fn columns(&self, left: Vec<SideRow>, right: Vec<SideRow>, theme: &Theme) -> Vec<Line<'static>> {
        let right = right.into_iter().map(|row| row.line).collect();
        if self.left.is_empty() {
            return right;
        }
        let left = left.into_iter().map(|row| row.line).collect();
        assemble_columns(left, right, None, theme)
    }

    fn frame(&mut self, ctx: &RenderContext<'_>, help: &[HelpItem], update: bool) -> RecordedFrame {
        if self.complete {
            return RecordedFrame {
                primary: summary(self.final_entry.as_ref(), ctx.theme),
                secondary: None,
            };
        }
        match self.mode {
            Mode::Select => self.select_frame(ctx, help),
            Mode::FindInput | Mode::FindNavigate => self.find_frame(ctx, help, update),
        }
    }

    fn select_frame(&self, ctx: &RenderContext<'_>, help: &[HelpItem]) -> RecordedFrame {
        let theme = ctx.theme;
        let mut construction = Construction::new();

        if let Some((message, at)) = &self.alert {
            if at.elapsed() < ctx.settings.alert_duration {
                construction.set(
                    BlockKind::Alert,
                    vec![
                        Line::from(Span::styled(message.clone(), theme.alert)),
                        Line::default(),
                        Line::default(),
                    ],
                );
            }
        }

        if let Some(header) = &self.header_message {
            let mut lines = header.lines();
            lines.extend([Line::default(), Line::default()]);
            construction.set(BlockKind::Header, lines);
        }

        let left = self.side_rows(Side::Left, &self.left.plain_hits(), self.show_headers, true, ctx);
        let right = self.side_rows(Side::Right, &self.right.plain_hits(), self.show_headers, true, ctx);
        let mut body = self.columns(left, right, theme);

        let column_headers = if self.show_headers && !body.is_empty() {
            let header = body.remove(0);
            vec![Line::default(), indent(header), Line::raw(" ")]
        } else {
            vec![Line::default(), Line::raw(" "), Line::default()]
        };
        construction.set(BlockKind::ColumnHeaders, column_headers);
        construction.set(BlockKind::Body, body.into_iter().map(indent).collect());

        if let Some(help) = self.cursor_entry().and_then(|entry| entry.help.as_ref()) {
            if !help.is_empty() {
                let mut lines = help_lines(help, &[], theme).into_iter();
                let mut first = vec![Span::raw(" "), Span::styled("?", theme.help_marker), Span::raw(" ")];
                first.extend(lines.next().unwrap_or_default().spans);
                let mut block = vec![Line::default(), Line::raw(" "), Line::from(first)];
                block.extend(lines);
                construction.set(BlockKind::HelpText, block);
            }
        }

        let current = self.cursor_value();
        let custom: Vec<HelpItem> = self.keys.iter().map(|key| key.help_item(current)).collect();
        construction.set(BlockKind::Keybindings, help_sections(&[custom.as_slice(), help], theme));

        if self.help_notes.is_some() {
            let notes = self.notes();
            construction.set(
                BlockKind::Notes,
                notes.split('\n').map(|line| Line::raw(line.to_string())).collect(),
            );
        }

        let width = (construction.width() + 1).min(ctx.width);
        construction.set(BlockKind::Divider, vec![divider(width, theme.help_divider)]);

        RecordedFrame {
            primary: assemble_message(&construction, ctx.height),
            secondary: None,
        }
    }

    fn find_frame(&mut self, ctx: &RenderContext<'_>, help: &[HelpItem], update: bool) -> RecordedFrame {
        let theme = ctx.theme;
        self.refresh_hits(ctx.fuzzy);
        let left_hits = self.filtered(Side::Left, update);
        let right_hits = self.filtered(Side::Right, update);
        let left_hits = if left_hits.is_empty() { self.left.plain_hits() } else { left_hits };
        let right_hits = if right_hits.is_empty() { self.right.plain_hits() } else { right_hits };

        let separators = self.search_text.is_empty();
        let left = self.side_rows(Side::Left, &left_hits, false, separators, ctx);
        let right = self.side_rows(Side::Right, &right_hits, false, separators, ctx);

        let (active_rows, active_hits) = match self.active {
            Side::Left => (&left, &left_hits),
            Side::Right => (&right, &right_hits),
        };
        let focused = self.cursor.filter(|cursor| {
            active_rows
                .iter()
                .any(|row| row.kind == EntryKind::Real(*cursor))
        });
        let help_matches = focused
            .and_then(|cursor| active_hits.iter().find(|hit| hit.index == cursor))
            .map(|hit| hit.matches.help.clone())
            .unwrap_or_default();
        let focused_help = focused
            .and_then(|cursor| self.list(self.active).entries.get(cursor))
            .and_then(|entry| entry.help.as_ref());

        let body = self.columns(left, right, theme);

        let style = match self.mode {
            Mode::FindInput if self.search_text.is_empty() => theme.search_empty,
            Mode::FindInput => theme.search_content,
            _ => theme.search_normal,
        };
        let cursor = (self.mode == Mode::FindInput).then_some(self.search_cursor);
        let width = ctx.settings.search_box_width.min(ctx.width.max(1));
        let mut message = vec![
            search_box(&self.search_text, cursor, width, style, SEARCH_PLACEHOLDER),
            Line::raw(" "),
        ];
        message.extend(body);
        let message = merge_help(message, focused_help, &help_matches, theme);

        let divider_width = max_width(&message).min(ctx.width);
        let secondary = help_screen(help, &self.notes(), divider_width, theme);
        RecordedFrame {
            primary: message,
            secondary: Some(secondary),
        }
    }
}

fn indent(line: Line<'static>) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    spans.extend(line.spans);
    Line::from(spans)
}

fn same_value<V: MenuValue>(
    local: &V,
    needle: &V,
    needle_json: Option<&Value>,
    paths: Option<&[String]>,
) -> bool {
    if let (Some(needle_json), Some(paths)) = (needle_json, paths) {
        if needle_json.is_object() {
            if let Ok(local_json) = serde_json::to_value(local) {
                if local_json.is_object() {
                    return paths.iter().any(|path| {
                        match (value_at_path(&local_json, path), value_at_path(needle_json, path)) {
                            (Some(a), Some(b)) => a == b,
                            _ => false,
                        }
                    });
                }
            }
        }
    }
    local == needle
}

/// A two-column, fuzzy-searchable list menu.
///
/// `configure` loads entries, then every [`Menu::handle_key`] mutates the
/// state and renders once. The menu is done when `handle_key` hands back a
/// [`MenuOutcome`]; after that it only shows its final summary until it is
/// configured again.
pub struct Menu<V, S, C> {
    screen: S,
    cache: C,
    settings: MenuSettings,
    theme: Theme,
    fuzzy: FuzzySearch,
    keyboard: KeyboardManager<MenuAction>,
    state: Option<MenuState<V>>,
    last_frame: Option<RecordedFrame>,
}

impl<V: MenuValue, S: Screen, C: RestoreCache> Menu<V, S, C> {
    pub fn new(screen: S, cache: C, settings: MenuSettings, theme: Theme) -> Self {
        Self {
            screen,
            cache,
            settings,
            theme,
            fuzzy: FuzzySearch::new(),
            keyboard: KeyboardManager::new(),
            state: None,
            last_frame: None,
        }
    }

    /// Loads a fresh set of entries and options, resetting every bit of
    /// state from a previous run.
    pub fn configure(&mut self, options: MenuOptions<V>) {
        let state = MenuState::new(options, &self.settings, &self.cache);
        tracing::debug!(
            left = state.left.entries.len(),
            right = state.right.entries.len(),
            side = %state.active,
            cursor = ?state.cursor,
            "menu configured"
        );
        self.keyboard.set_keymap(state.keymap());
        self.state = Some(state);
        self.last_frame = None;
    }

    pub fn render(&mut self) {
        self.render_with(false);
    }

    /// Clears the screen and draws the current frame even if it is unchanged.
    pub fn redraw(&mut self) {
        self.screen.clear();
        self.last_frame = None;
        self.render();
    }

    /// Expires the status line. Returns whether anything was redrawn.
    pub fn tick(&mut self) -> bool {
        let duration = self.settings.alert_duration;
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        let expired = state
            .alert
            .as_ref()
            .is_some_and(|(_, at)| at.elapsed() >= duration);
        if !expired {
            return false;
        }
        state.alert = None;
        self.render();
        true
    }

    /// Runs a nested prompt while this menu's keymap is detached.
    ///
    /// Keys handed to the menu inside `run` are ignored. The keymap is put
    /// back and the menu redrawn afterwards.
    pub fn suspended<T>(&mut self, run: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.keyboard.save();
        tracing::debug!("menu keyboard suspended");
        let out = run(self);
        self.keyboard.load(saved);
        self.redraw();
        out
    }

    /// Feeds one key press through the active keymap.
    pub fn handle_key(&mut self, press: &KeyPress) -> Option<MenuOutcome<V>> {
        if self.state.as_ref().is_none_or(|state| state.complete) {
            return None;
        }
        let actions: Vec<MenuAction> = self.keyboard.dispatch(press).into_iter().copied().collect();
        tracing::trace!(key = %press, ?actions, "key dispatched");
        for action in actions {
            if let Some(outcome) = self.apply(action, press) {
                return Some(outcome);
            }
        }
        None
    }

    pub fn value(&self) -> Option<&V> {
        self.state.as_ref().and_then(MenuState::cursor_value)
    }

    pub fn side(&self) -> Option<Side> {
        self.state.as_ref().map(|state| state.active)
    }

    pub fn mode(&self) -> Option<Mode> {
        self.state.as_ref().map(|state| state.mode)
    }

    pub fn search_text(&self) -> &str {
        self.state.as_ref().map_or("", |state| state.search_text.as_str())
    }

    pub fn is_complete(&self) -> bool {
        self.state.as_ref().is_some_and(|state| state.complete)
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn into_parts(self) -> (S, C) {
        (self.screen, self.cache)
    }

    fn apply(&mut self, action: MenuAction, press: &KeyPress) -> Option<MenuOutcome<V>> {
        let page_size = self.settings.page_size;
        let state = self.state.as_mut()?;
        let mut update = false;
        match action {
            MenuAction::Next => state.step(Step::Next),
            MenuAction::Previous => state.step(Step::Previous),
            MenuAction::Top => state.step(Step::Top),
            MenuAction::Bottom => state.step(Step::Bottom),
            MenuAction::Left => state.switch_side(Side::Left, page_size),
            MenuAction::Right => state.switch_side(Side::Right, page_size),
            MenuAction::SearchKey => update = state.search_key(press, page_size),
            MenuAction::ToggleFind => {
                state.toggle_find();
                let keymap = state.keymap();
                self.keyboard.set_keymap(keymap);
            }
            MenuAction::Select => return self.end(EndTrigger::Entry, None),
            MenuAction::ActivateKeymap => return self.activate_keymap(press),
        }
        self.render_with(update);
        None
    }

    fn activate_keymap(&mut self, press: &KeyPress) -> Option<MenuOutcome<V>> {
        let state = self.state.as_mut()?;
        let key = state.find_key(&press.key)?.clone();
        let trigger = EndTrigger::Keyboard {
            key: press.key.clone(),
            modifiers: press.modifiers,
        };
        let Some(mut callback) = state.callback.take() else {
            return self.end(trigger, Some(key));
        };
        let outcome = callback(&KeyCall {
            key: press,
            value: &key.value,
            selected: state.cursor_entry(),
        });
        state.callback = Some(callback);
        tracing::debug!(key = %press, ?outcome, "key callback finished");
        match outcome {
            KeyOutcome::End => return self.end(trigger, Some(key)),
            KeyOutcome::Message(message) => state.alert = Some((message, Instant::now())),
            KeyOutcome::Stay => {}
        }
        self.render();
        None
    }

    fn end(&mut self, trigger: EndTrigger, key: Option<MenuKey<V>>) -> Option<MenuOutcome<V>> {
        let state = self.state.as_mut()?;
        if state.complete {
            return None;
        }
        let cursor_entry = state.cursor_entry().cloned();
        let (value, final_entry) = match key {
            Some(key) => (
                Some(key.value.clone()),
                Some(Entry::new(key.label, key.value)),
            ),
            None => (cursor_entry.as_ref().map(|entry| entry.value.clone()), cursor_entry.clone()),
        };
        let side = state.active;
        let index = state
            .cursor
            .and_then(|cursor| state.list(side).position(cursor));

        let record = state.restore.as_ref().map(|restore| {
            let stored = cursor_entry.as_ref().map(|entry| &entry.value).or(value.as_ref());
            let record = RestoreRecord {
                side,
                index,
                value: stored.and_then(|value| serde_json::to_value(value).ok()),
            };
            (restore_key(&restore.id), record)
        });

        state.mode = Mode::Select;
        state.alert = None;
        state.complete = true;
        state.final_entry = final_entry;
        tracing::debug!(%side, ?index, ?trigger, "menu ended");

        self.keyboard.save();
        self.render();

        if let Some((key, record)) = record {
            if let Err(err) = self.cache.set(&key, record) {
                tracing::warn!(error = %err, key = %key, "failed to persist restore record");
            }
        }

        Some(MenuOutcome {
            value,
            trigger,
            selection: index.map(|index| Selection { side, index }),
        })
    }

    fn render_with(&mut self, update: bool) {
        let (width, height) = self.screen.size();
        let Some(state) = self.state.as_mut() else {
            self.screen.print_line(Line::from(Span::styled(
                "menu rendered before it was configured",
                self.theme.alert,
            )));
            return;
        };
        let help = self
            .keyboard
            .keymap()
            .map(Keymap::help_items)
            .unwrap_or_default();
        let ctx = RenderContext {
            settings: &self.settings,
            theme: &self.theme,
            fuzzy: &self.fuzzy,
            width,
            height,
        };
        let frame = state.frame(&ctx, &help, update);
        self.emit(frame);
    }

    fn emit(&mut self, frame: RecordedFrame) {
        if self.last_frame.as_ref() == Some(&frame) {
            tracing::trace!("frame unchanged, render skipped");
            return;
        }
        self.screen.render(&frame.primary, frame.secondary.as_deref());
        self.last_frame = Some(frame);
    }
}
