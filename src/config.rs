use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::range::{DEFAULT_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::theme::{Theme, ThemeConfig};

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub menu: MenuConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_header_padding() -> usize {
    4
}

fn default_alert_duration_ms() -> u64 {
    2_000
}

fn default_search_box_width() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_header_padding")]
    pub header_padding: usize,
    #[serde(default = "default_alert_duration_ms")]
    pub alert_duration_ms: u64,
    #[serde(default = "default_search_box_width")]
    pub search_box_width: usize,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            header_padding: default_header_padding(),
            alert_duration_ms: default_alert_duration_ms(),
            search_box_width: default_search_box_width(),
        }
    }
}

/// Resolved `[menu]` values a [`crate::Menu`] runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuSettings {
    pub page_size: usize,
    pub header_padding: usize,
    pub alert_duration: Duration,
    pub search_box_width: usize,
}

impl Default for MenuSettings {
    fn default() -> Self {
        MenuConfig::default().settings()
    }
}

impl MenuConfig {
    pub fn settings(&self) -> MenuSettings {
        MenuSettings {
            page_size: self.page_size.max(MIN_PAGE_SIZE),
            header_padding: self.header_padding,
            alert_duration: Duration::from_millis(self.alert_duration_ms),
            search_box_width: self.search_box_width,
        }
    }
}

impl Config {
    pub fn settings(&self) -> MenuSettings {
        self.menu.settings()
    }

    pub fn theme(&self) -> Result<Theme> {
        Theme::from_config(&self.theme)
    }
}

pub fn load(cwd: &Path, explicit_path: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit_path {
        return Ok(LoadedConfig {
            config: load_from_path(path)?,
            path: Some(path.to_path_buf()),
        });
    }

    let local_candidates = [cwd.join("menukit.toml"), cwd.join(".menukit.toml")];
    for path in &local_candidates {
        if path.exists() {
            return Ok(LoadedConfig {
                config: load_from_path(path)?,
                path: Some(path.to_path_buf()),
            });
        }
    }

    let global_path = global_config_path()?;
    if global_path.exists() {
        return Ok(LoadedConfig {
            config: load_from_path(&global_path)?,
            path: Some(global_path),
        });
    }

    Ok(LoadedConfig {
        config: Config::default(),
        path: None,
    })
}

pub fn global_config_path() -> Result<PathBuf> {
    let config_root = dirs::config_dir().context("unable to resolve OS config directory")?;
    Ok(config_root.join("menukit").join("config.toml"))
}

pub fn write_example_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn load_from_path(path: &Path) -> Result<Config> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))?;
    // Style strings are only validated here.
    config
        .theme()
        .with_context(|| format!("invalid theme in {}", path.display()))?;
    Ok(config)
}

const EXAMPLE_CONFIG: &str = r#"# menukit config
#
# Styles are space separated: a colour name or #rrggbb sets the foreground,
# `bg:<colour>` the background, plus modifiers such as bold, dim, underlined.

[menu]
# Rows per column before the list scrolls (minimum 8).
page_size = 20
# Spaces between a column header and the divider.
header_padding = 4
# How long status messages from key callbacks stay visible.
alert_duration_ms = 2000
search_box_width = 100

[theme]
entry_type = "magenta bold"
entry_type_other = "gray bold"
selected = "black bg:lightblue"
normal = "white"
other = "gray"
highlight = "red bold underlined"
search_normal = "black bg:magenta"
search_empty = "black bg:blue"
search_content = "black bg:cyan"
help_divider = "blue dim"
keymap_label = "yellow"
column_divider = "|"
keymap_tick = "> "
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.settings(), MenuSettings::default());
        assert_eq!(cfg.settings().page_size, 20);
        assert_eq!(cfg.settings().alert_duration, Duration::from_secs(2));
    }

    #[test]
    fn page_size_is_clamped_to_fit_markers() {
        let cfg: Config = toml::from_str("[menu]\npage_size = 3\n").unwrap();
        assert_eq!(cfg.settings().page_size, MIN_PAGE_SIZE);
    }

    #[test]
    fn theme_overrides_merge_with_defaults() {
        let raw = r#"
[theme]
selected = "fg:white bg:red"
column_divider = "│"
"#;
        let cfg: Config = toml::from_str(raw).unwrap();
        let theme = cfg.theme().unwrap();
        assert_eq!(theme.column_divider, "│");
        assert_eq!(cfg.theme.normal, "white");
    }

    #[test]
    fn example_config_parses() {
        let cfg: Config = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert!(cfg.theme().is_ok());
    }

    #[test]
    fn load_prefers_local_file_and_rejects_bad_styles() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("menukit.toml");
        fs::write(&local, "[menu]\nheader_padding = 1\n").unwrap();
        let loaded = load(dir.path(), None).unwrap();
        assert_eq!(loaded.path.as_deref(), Some(local.as_path()));
        assert_eq!(loaded.config.settings().header_padding, 1);

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "[theme]\nalert = \"glitter\"\n").unwrap();
        let err = format!("{:#}", load(dir.path(), Some(&broken)).unwrap_err());
        assert!(err.contains("theme.alert"));
    }

    #[test]
    fn write_example_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_example_config(&path, false).unwrap();
        assert!(write_example_config(&path, false).is_err());
        assert!(write_example_config(&path, true).is_ok());
    }
}
