use std::str::FromStr;

use anyhow::{Context, Result, bail};
use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

/// `[theme]` section of the config file.
///
/// Styles are space-separated tokens: a bare colour sets the foreground,
/// `fg:`/`bg:` pick the layer explicitly, anything else must name a modifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub entry_type: String,
    pub entry_type_other: String,
    pub selected: String,
    pub normal: String,
    pub other: String,
    pub highlight: String,
    pub search_normal: String,
    pub search_empty: String,
    pub search_content: String,
    pub help_divider: String,
    pub help_marker: String,
    pub keymap_label: String,
    pub keymap_description: String,
    pub keymap_highlight: String,
    pub keymap_match: String,
    pub header: String,
    pub alert: String,
    pub more_marker: String,
    pub placeholder: String,
    pub reference_title: String,
    pub column_divider: String,
    pub keymap_tick: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            entry_type: "magenta bold".to_string(),
            entry_type_other: "gray bold".to_string(),
            selected: "black bg:lightblue".to_string(),
            normal: "white".to_string(),
            other: "gray".to_string(),
            highlight: "red bold underlined".to_string(),
            search_normal: "black bg:magenta".to_string(),
            search_empty: "black bg:blue".to_string(),
            search_content: "black bg:cyan".to_string(),
            help_divider: "blue dim".to_string(),
            help_marker: "blue dim".to_string(),
            keymap_label: "yellow".to_string(),
            keymap_description: "gray".to_string(),
            keymap_highlight: "green".to_string(),
            keymap_match: "green bold".to_string(),
            header: "blue bold".to_string(),
            alert: "yellow bold".to_string(),
            more_marker: "yellow".to_string(),
            placeholder: "yellow bold".to_string(),
            reference_title: "cyan bold".to_string(),
            column_divider: "|".to_string(),
            keymap_tick: "> ".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub entry_type: Style,
    pub entry_type_other: Style,
    pub selected: Style,
    pub normal: Style,
    pub other: Style,
    pub highlight: Style,
    pub search_normal: Style,
    pub search_empty: Style,
    pub search_content: Style,
    pub help_divider: Style,
    pub help_marker: Style,
    pub keymap_label: Style,
    pub keymap_description: Style,
    pub keymap_highlight: Style,
    pub keymap_match: Style,
    pub header: Style,
    pub alert: Style,
    pub more_marker: Style,
    pub placeholder: Style,
    pub reference_title: Style,
    pub column_divider: String,
    pub keymap_tick: String,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::from_config(&ThemeConfig::default()).unwrap_or_else(|_| Theme::plain())
    }
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let style = |key: &str, raw: &str| {
            parse_style(raw).with_context(|| format!("invalid style for theme.{key}: `{raw}`"))
        };
        Ok(Self {
            entry_type: style("entry_type", &config.entry_type)?,
            entry_type_other: style("entry_type_other", &config.entry_type_other)?,
            selected: style("selected", &config.selected)?,
            normal: style("normal", &config.normal)?,
            other: style("other", &config.other)?,
            highlight: style("highlight", &config.highlight)?,
            search_normal: style("search_normal", &config.search_normal)?,
            search_empty: style("search_empty", &config.search_empty)?,
            search_content: style("search_content", &config.search_content)?,
            help_divider: style("help_divider", &config.help_divider)?,
            help_marker: style("help_marker", &config.help_marker)?,
            keymap_label: style("keymap_label", &config.keymap_label)?,
            keymap_description: style("keymap_description", &config.keymap_description)?,
            keymap_highlight: style("keymap_highlight", &config.keymap_highlight)?,
            keymap_match: style("keymap_match", &config.keymap_match)?,
            header: style("header", &config.header)?,
            alert: style("alert", &config.alert)?,
            more_marker: style("more_marker", &config.more_marker)?,
            placeholder: style("placeholder", &config.placeholder)?,
            reference_title: style("reference_title", &config.reference_title)?,
            column_divider: config.column_divider.clone(),
            keymap_tick: config.keymap_tick.clone(),
        })
    }

    /// No colours at all; what tests and dumb terminals render with.
    pub fn plain() -> Self {
        let none = Style::default();
        Self {
            entry_type: none,
            entry_type_other: none,
            selected: none.add_modifier(Modifier::REVERSED),
            normal: none,
            other: none,
            highlight: none,
            search_normal: none,
            search_empty: none,
            search_content: none,
            help_divider: none,
            help_marker: none,
            keymap_label: none,
            keymap_description: none,
            keymap_highlight: none,
            keymap_match: none.add_modifier(Modifier::BOLD),
            header: none,
            alert: none,
            more_marker: none,
            placeholder: none,
            reference_title: none,
            column_divider: "|".to_string(),
            keymap_tick: "> ".to_string(),
        }
    }
}

pub fn parse_style(raw: &str) -> Result<Style> {
    let mut style = Style::default();
    for token in raw.split_whitespace() {
        if let Some(color) = token.strip_prefix("bg:") {
            style = style.bg(parse_color(color)?);
        } else if let Some(color) = token.strip_prefix("fg:") {
            style = style.fg(parse_color(color)?);
        } else if let Some(modifier) = parse_modifier(token) {
            style = style.add_modifier(modifier);
        } else {
            let color =
                parse_color(token).with_context(|| format!("unknown style token `{token}`"))?;
            style = style.fg(color);
        }
    }
    Ok(style)
}

fn parse_color(input: &str) -> Result<Color> {
    let Ok(color) = Color::from_str(input.trim()) else {
        bail!("unknown colour `{input}`");
    };
    Ok(color)
}

fn parse_modifier(input: &str) -> Option<Modifier> {
    let modifier = match input.to_ascii_lowercase().as_str() {
        "bold" => Modifier::BOLD,
        "dim" => Modifier::DIM,
        "italic" => Modifier::ITALIC,
        "underline" | "underlined" => Modifier::UNDERLINED,
        "reversed" | "inverse" => Modifier::REVERSED,
        "strikethrough" => Modifier::CROSSED_OUT,
        "blink" => Modifier::SLOW_BLINK,
        "hidden" => Modifier::HIDDEN,
        _ => return None,
    };
    Some(modifier)
}
