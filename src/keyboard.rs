use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::theme::Theme;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        shift: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    fn active_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.ctrl {
            names.push("ctrl");
        }
        if self.meta {
            names.push("meta");
        }
        if self.shift {
            names.push("shift");
        }
        names
    }
}

/// A decoded key: a name such as `down`, `enter`, `f5`, `space` or the
/// character itself, plus modifier state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Translates a crossterm event. Keys without a name (media keys,
    /// lone modifiers) come back as `None`.
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        let mut modifiers = Modifiers {
            ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
            meta: event.modifiers.contains(KeyModifiers::ALT)
                || event.modifiers.contains(KeyModifiers::META),
            shift: event.modifiers.contains(KeyModifiers::SHIFT),
        };
        let key = match event.code {
            KeyCode::Up => "up".to_string(),
            KeyCode::Down => "down".to_string(),
            KeyCode::Left => "left".to_string(),
            KeyCode::Right => "right".to_string(),
            KeyCode::Home => "home".to_string(),
            KeyCode::End => "end".to_string(),
            KeyCode::PageUp => "pageup".to_string(),
            KeyCode::PageDown => "pagedown".to_string(),
            KeyCode::Enter => "enter".to_string(),
            KeyCode::Esc => "escape".to_string(),
            KeyCode::Tab => "tab".to_string(),
            KeyCode::BackTab => {
                modifiers.shift = true;
                "tab".to_string()
            }
            KeyCode::Backspace => "backspace".to_string(),
            KeyCode::Delete => "delete".to_string(),
            KeyCode::Insert => "insert".to_string(),
            KeyCode::F(n) => format!("f{n}"),
            KeyCode::Char(' ') => "space".to_string(),
            KeyCode::Char(ch) => {
                // Shift is already folded into the character.
                if !ch.is_ascii_alphabetic() || ch.is_ascii_uppercase() {
                    modifiers.shift = false;
                }
                ch.to_string()
            }
            _ => return None,
        };
        Some(Self { key, modifiers })
    }

    /// Text this key inserts into an input field, if any.
    pub fn typed_char(&self) -> Option<char> {
        if self.modifiers.ctrl || self.modifiers.meta {
            return None;
        }
        if self.key == "space" {
            return Some(' ');
        }
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(ch),
            _ => None,
        }
    }
}

impl fmt::Display for KeyPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in self.modifiers.active_names() {
            write!(f, "{name}+")?;
        }
        f.write_str(&self.key)
    }
}

/// Required modifier state for a binding. `None` means "don't care".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierFilter {
    pub ctrl: Option<bool>,
    pub meta: Option<bool>,
    pub shift: Option<bool>,
}

impl ModifierFilter {
    pub fn matches(&self, modifiers: &Modifiers) -> bool {
        let check = |wanted: Option<bool>, actual: bool| wanted.is_none_or(|wanted| wanted == actual);
        check(self.ctrl, modifiers.ctrl)
            && check(self.meta, modifiers.meta)
            && check(self.shift, modifiers.shift)
    }

    fn required(&self) -> Modifiers {
        Modifiers {
            ctrl: self.ctrl == Some(true),
            meta: self.meta == Some(true),
            shift: self.shift == Some(true),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding<A> {
    pub keys: Vec<String>,
    pub modifiers: ModifierFilter,
    pub catch_all: bool,
    pub description: String,
    /// Left out of the on-screen help.
    pub power_user: bool,
    pub action: A,
}

impl<A> Binding<A> {
    pub fn new<K, S>(keys: K, description: impl Into<String>, action: A) -> Self
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            modifiers: ModifierFilter::default(),
            catch_all: false,
            description: description.into(),
            power_user: false,
            action,
        }
    }

    pub fn catch_all(description: impl Into<String>, action: A) -> Self {
        Self {
            keys: Vec::new(),
            modifiers: ModifierFilter::default(),
            catch_all: true,
            description: description.into(),
            power_user: false,
            action,
        }
    }

    pub fn power_user(mut self, hidden: bool) -> Self {
        self.power_user = hidden;
        self
    }

    pub fn with_modifiers(mut self, modifiers: ModifierFilter) -> Self {
        self.modifiers = modifiers;
        self
    }

    fn matches(&self, press: &KeyPress) -> bool {
        !self.catch_all
            && self.keys.iter().any(|key| key == &press.key)
            && self.modifiers.matches(&press.modifiers)
    }

    fn help_label(&self) -> String {
        if self.catch_all {
            return "default".to_string();
        }
        let prefix = modifier_prefix(&self.modifiers.required());
        self.keys
            .iter()
            .map(|key| format!("{prefix}{key}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone)]
pub struct Keymap<A> {
    bindings: Vec<Binding<A>>,
}

impl<A> Default for Keymap<A> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }
}

impl<A> Keymap<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, binding: Binding<A>) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn push(&mut self, binding: Binding<A>) {
        self.bindings.push(binding);
    }

    pub fn bindings(&self) -> &[Binding<A>] {
        &self.bindings
    }

    /// Actions a key press fires.
    ///
    /// Bindings naming the key (with matching modifiers) win; only when none
    /// does do the catch-all bindings fire instead.
    pub fn dispatch(&self, press: &KeyPress) -> Vec<&A> {
        let direct: Vec<&A> = self
            .bindings
            .iter()
            .filter(|binding| binding.matches(press))
            .map(|binding| &binding.action)
            .collect();
        if !direct.is_empty() {
            return direct;
        }
        self.bindings
            .iter()
            .filter(|binding| binding.catch_all)
            .map(|binding| &binding.action)
            .collect()
    }

    pub fn help_items(&self) -> Vec<HelpItem> {
        self.bindings
            .iter()
            .filter(|binding| !binding.power_user)
            .map(|binding| HelpItem {
                label: binding.help_label(),
                description: binding.description.clone(),
                highlight: None,
            })
            .collect()
    }
}

fn modifier_prefix(modifiers: &Modifiers) -> String {
    let names = modifiers.active_names();
    if names.is_empty() {
        String::new()
    } else {
        format!("{}+", names.join("/"))
    }
}

/// Holds the one keymap that currently receives input.
///
/// A nested prompt `save`s the active keymap before installing its own and
/// `load`s it back when done.
#[derive(Debug)]
pub struct KeyboardManager<A> {
    active: Option<Keymap<A>>,
}

impl<A> Default for KeyboardManager<A> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<A> KeyboardManager<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_keymap(&mut self, keymap: Keymap<A>) {
        self.active = Some(keymap);
    }

    pub fn keymap(&self) -> Option<&Keymap<A>> {
        self.active.as_ref()
    }

    pub fn dispatch(&self, press: &KeyPress) -> Vec<&A> {
        self.active
            .as_ref()
            .map(|keymap| keymap.dispatch(press))
            .unwrap_or_default()
    }

    /// Detaches the active keymap, leaving nothing bound.
    pub fn save(&mut self) -> Option<Keymap<A>> {
        self.active.take()
    }

    pub fn load(&mut self, saved: Option<Keymap<A>>) {
        self.active = saved;
    }
}

/// One line of keybinding help before styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpItem {
    pub label: String,
    pub description: String,
    /// `Some(matched)` for entries that react to the current value.
    pub highlight: Option<bool>,
}

impl HelpItem {
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            highlight: None,
        }
    }
}

/// `<tick><label padded>  <description>` lines, sorted by label.
pub fn help_lines(items: &[HelpItem], theme: &Theme) -> Vec<Line<'static>> {
    help_sections(&[items], theme)
}

/// Like [`help_lines`] for several sections that share one label column.
/// Each section is sorted on its own and printed in the given order.
pub fn help_sections(sections: &[&[HelpItem]], theme: &Theme) -> Vec<Line<'static>> {
    let widest = sections
        .iter()
        .flat_map(|section| section.iter())
        .map(|item| item.label.width())
        .max()
        .unwrap_or(0);

    sections
        .iter()
        .flat_map(|section| {
            let mut items: Vec<&HelpItem> = section.iter().collect();
            items.sort_by(|a, b| a.label.cmp(&b.label));
            items
        })
        .map(|item| {
            let description_style = match item.highlight {
                Some(true) => theme.keymap_match,
                Some(false) => theme.keymap_highlight,
                None => theme.keymap_description,
            };
            let pad = widest.saturating_sub(item.label.width());
            Line::from(vec![
                Span::styled(theme.keymap_tick.clone(), theme.help_divider),
                Span::styled(item.label.clone(), theme.keymap_label),
                Span::raw(" ".repeat(pad + 2)),
                Span::styled(item.description.clone(), description_style),
            ])
        })
        .collect()
}

/// Secondary help screen: a divider, caller notes, then indented keybindings.
pub fn help_screen(
    items: &[HelpItem],
    notes: &str,
    width: usize,
    theme: &Theme,
) -> Vec<Line<'static>> {
    let mut out = vec![divider(width, theme.help_divider)];
    let notes = if notes.ends_with('\n') {
        format!("{notes} ")
    } else {
        notes.to_string()
    };
    out.extend(notes.split('\n').map(|line| Line::raw(line.to_string())));
    out.extend(help_lines(items, theme).into_iter().map(|line| {
        let mut spans = vec![Span::raw("  ")];
        spans.extend(line.spans);
        Line::from(spans)
    }));
    out
}

pub fn divider(width: usize, style: Style) -> Line<'static> {
    Line::from(Span::styled("=".repeat(width), style))
}
