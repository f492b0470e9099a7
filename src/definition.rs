use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::entry::{Entry, HelpText};
use crate::menu::{HeaderMessage, HelpNotes, MenuKey, MenuOptions, RestoreKind, RestoreOptions};
use crate::search::SearchOptions;

/// A menu described in TOML:
///
/// ```toml
/// header = "Deploy"
///
/// [[right]]
/// label = "Production"
/// group = "env"
/// value = { target = "prod" }
/// help = "Ships the current tag"
///
/// [[keys]]
/// key = "escape"
/// label = "cancel"
/// value = false
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MenuDefinition {
    #[serde(default)]
    pub header: Option<HeaderConfig>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub empty_message: Option<String>,
    #[serde(default)]
    pub left: Vec<EntryConfig>,
    #[serde(default)]
    pub right: Vec<EntryConfig>,
    #[serde(default)]
    pub keys: Vec<KeyConfig>,
    /// Initial cursor value.
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub show_headers: Option<bool>,
    #[serde(default)]
    pub left_header: Option<String>,
    #[serde(default)]
    pub right_header: Option<String>,
    #[serde(default)]
    pub header_padding: Option<usize>,
    #[serde(default)]
    pub help_notes: Option<NotesConfig>,
    #[serde(default)]
    pub title_types: bool,
    #[serde(default)]
    pub sort: Option<bool>,
    #[serde(default)]
    pub key_only: bool,
    #[serde(default)]
    pub condensed: bool,
    #[serde(default)]
    pub range_markers: bool,
    #[serde(default, deserialize_with = "deserialize_search")]
    pub search: SearchConfig,
    #[serde(default)]
    pub restore: Option<RestoreConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HeaderConfig {
    Text(String),
    Lines(Vec<String>),
    Pairs(Vec<(String, String)>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NotesConfig {
    Text(String),
    Lines(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HelpConfig {
    Text(String),
    Lines(Vec<String>),
    Reference(Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryConfig {
    pub label: String,
    /// Defaults to the label.
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, alias = "type")]
    pub group: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub help: Option<HelpConfig>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    pub key: String,
    pub label: String,
    /// Defaults to the key name.
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, alias = "alias")]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub highlight: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub left: bool,
    #[serde(default = "default_true")]
    pub right: bool,
    #[serde(default = "default_true")]
    pub label: bool,
    #[serde(default = "default_true")]
    pub group: bool,
    #[serde(default = "default_true")]
    pub help: bool,
    #[serde(default)]
    pub deep: Option<String>,
}

impl Default for SearchConfig {
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

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BoolOrTable<T> {
    Bool(bool),
    Table(T),
}

fn deserialize_search<'de, D>(deserializer: D) -> std::result::Result<SearchConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let input = BoolOrTable::<SearchConfig>::deserialize(deserializer)?;
    Ok(match input {
        BoolOrTable::Bool(enabled) => SearchConfig {
            enabled,
            ..SearchConfig::default()
        },
        BoolOrTable::Table(config) => config,
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdPropertyConfig {
    Single(String),
    Many(Vec<String>),
}

fn deserialize_id_property<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match IdPropertyConfig::deserialize(deserializer)? {
        IdPropertyConfig::Single(path) => vec![path],
        IdPropertyConfig::Many(paths) => paths,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestoreConfig {
    pub id: String,
    #[serde(default = "default_restore_kind", alias = "type")]
    pub kind: RestoreKind,
    #[serde(default, deserialize_with = "deserialize_id_property")]
    pub id_property: Vec<String>,
}

fn default_restore_kind() -> RestoreKind {
    RestoreKind::Position
}

pub fn load_definition(path: &Path) -> Result<MenuDefinition> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let definition: MenuDefinition = toml::from_str(&content)
        .with_context(|| format!("invalid menu definition in {}", path.display()))?;
    definition
        .validate()
        .with_context(|| format!("invalid menu definition in {}", path.display()))?;
    Ok(definition)
}

impl MenuDefinition {
    pub fn validate(&self) -> Result<()> {
        for entry in self.left.iter().chain(&self.right) {
            if entry.label.trim().is_empty() {
                bail!("entries need a non-empty label");
            }
        }
        for key in &self.keys {
            if key.key.trim().is_empty() {
                bail!("key `{}` has an empty key name", key.label);
            }
        }
        Ok(())
    }

    /// Builds menu options. `restore_id` overrides the definition's own
    /// restore id and turns on position restore when none is configured.
    pub fn into_options(self, restore_id: Option<String>) -> MenuOptions<Value> {
        let restore = match (self.restore, restore_id) {
            (Some(config), Some(id)) => Some(RestoreOptions {
                id,
                kind: config.kind,
                id_property: config.id_property,
            }),
            (Some(config), None) => Some(RestoreOptions {
                id: config.id,
                kind: config.kind,
                id_property: config.id_property,
            }),
            (None, Some(id)) => Some(RestoreOptions::new(id, RestoreKind::Position)),
            (None, None) => None,
        };

        let mut options = MenuOptions::new(
            self.left.into_iter().map(entry_from_config).collect(),
            self.right.into_iter().map(entry_from_config).collect(),
        );
        options.value = self.value;
        options.keys = self.keys.into_iter().map(key_from_config).collect();
        if let Some(item) = self.item {
            options.item = item;
        }
        options.empty_message = self.empty_message;
        options.show_headers = self.show_headers;
        options.left_header = self.left_header;
        options.right_header = self.right_header;
        options.header_padding = self.header_padding;
        options.header_message = self.header.map(|header| match header {
            HeaderConfig::Text(text) => HeaderMessage::Text(text),
            HeaderConfig::Lines(lines) => HeaderMessage::Lines(lines),
            HeaderConfig::Pairs(pairs) => HeaderMessage::Pairs(pairs),
        });
        options.help_notes = self.help_notes.map(|notes| match notes {
            NotesConfig::Text(text) => HelpNotes::Text(text),
            NotesConfig::Lines(lines) => HelpNotes::Lines(lines),
        });
        options.title_types = self.title_types;
        options.sort = self.sort;
        options.key_only = self.key_only;
        options.condensed = self.condensed;
        options.range_markers = self.range_markers;
        options.search = SearchOptions {
            enabled: self.search.enabled,
            left: self.search.left,
            right: self.search.right,
            label: self.search.label,
            group: self.search.group,
            help: self.search.help,
            deep: self.search.deep,
        };
        options.restore = restore;
        options
    }
}

fn entry_from_config(config: EntryConfig) -> Entry<Value> {
    let value = config
        .value
        .unwrap_or_else(|| Value::String(config.label.clone()));
    Entry {
        label: config.label.into(),
        value,
        group: config.group.filter(|group| !group.is_empty()),
        priority: config.priority,
        help: config.help.map(|help| match help {
            HelpConfig::Text(text) => HelpText::Text(text),
            HelpConfig::Lines(lines) => HelpText::Lines(lines),
            HelpConfig::Reference(value) => HelpText::Reference(value),
        }),
        icon: config.icon,
    }
}

fn key_from_config(config: KeyConfig) -> MenuKey<Value> {
    let value = config
        .value
        .unwrap_or_else(|| Value::String(config.key.clone()));
    MenuKey::new(config.key, config.label, value)
        .with_aliases(config.aliases)
        .with_highlight(config.highlight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
header = [["Cluster", "eu-1"], ["User", "ops"]]
item = "targets"
help_notes = ["line one", "line two"]
search = false

[[left]]
label = "Logs"
type = "tools"

[[right]]
label = "Production"
group = "env"
priority = 2
value = { target = "prod", id = 1 }
help = { region = "eu", replicas = 3 }

[[right]]
label = "Staging"
group = "env"
help = "Safe to break"
icon = "*"

[[keys]]
key = "escape"
label = "cancel"
value = false
alias = ["q"]

[restore]
id = "deploy"
type = "value"
id_property = "id"
"#;

    #[test]
    fn plain_header_string_is_kept() {
        let definition: MenuDefinition = toml::from_str(
            r#"
header = "Deploy"

[[right]]
label = "Production"
"#,
        )
        .unwrap();
        assert!(matches!(definition.header, Some(HeaderConfig::Text(ref text)) if text == "Deploy"));
    }

    #[test]
    fn sample_definition_parses() {
        let definition: MenuDefinition = toml::from_str(SAMPLE).unwrap();
        definition.validate().unwrap();
        assert_eq!(definition.left[0].group.as_deref(), Some("tools"));
        assert!(!definition.search.enabled);
        assert!(definition.search.label);
        assert!(matches!(definition.header, Some(HeaderConfig::Pairs(ref pairs)) if pairs.len() == 2));
        assert!(matches!(definition.right[0].help, Some(HelpConfig::Reference(_))));
        assert!(matches!(definition.right[1].help, Some(HelpConfig::Text(_))));

        let restore = definition.restore.as_ref().unwrap();
        assert_eq!(restore.kind, RestoreKind::Value);
        assert_eq!(restore.id_property, vec!["id".to_string()]);
    }

    #[test]
    fn options_carry_values_and_defaults() {
        let definition: MenuDefinition = toml::from_str(SAMPLE).unwrap();
        let options = definition.into_options(None);
        assert_eq!(options.item, "targets");
        assert_eq!(options.left[0].value, json!("Logs"));
        assert_eq!(options.right[0].value, json!({ "target": "prod", "id": 1 }));
        assert_eq!(options.right[1].icon.as_deref(), Some("*"));
        assert_eq!(options.keys[0].value, json!(false));
        assert_eq!(options.keys[0].aliases, vec!["q".to_string()]);
        assert!(!options.search.enabled);
        assert_eq!(options.restore.as_ref().map(|restore| restore.id.as_str()), Some("deploy"));
    }

    #[test]
    fn cli_restore_id_overrides_or_enables_restore() {
        let definition: MenuDefinition = toml::from_str(SAMPLE).unwrap();
        let restore = definition.into_options(Some("cli".to_string())).restore.unwrap();
        assert_eq!(restore.id, "cli");
        assert_eq!(restore.kind, RestoreKind::Value);

        let bare: MenuDefinition = toml::from_str("[[right]]\nlabel = \"a\"\n").unwrap();
        let restore = bare.into_options(Some("x".to_string())).restore.unwrap();
        assert_eq!(restore.kind, RestoreKind::Position);
    }

    #[test]
    fn search_table_keeps_unset_flags_on() {
        let definition: MenuDefinition =
            toml::from_str("[search]\nhelp = false\ndeep = \"meta.name\"\n").unwrap();
        assert!(definition.search.enabled);
        assert!(!definition.search.help);
        assert_eq!(definition.search.deep.as_deref(), Some("meta.name"));
    }

    #[test]
    fn load_rejects_blank_labels_with_path_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.toml");
        fs::write(&path, "[[right]]\nlabel = \"  \"\n").unwrap();
        let err = format!("{:#}", load_definition(&path).unwrap_err());
        assert!(err.contains("menu.toml"));
        assert!(err.contains("non-empty label"));
    }
}
