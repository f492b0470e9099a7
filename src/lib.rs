//! Two-column, fuzzy-searchable terminal menus.
//!
//! A [`Menu`] owns its state explicitly: cursor value, active side, mode and
//! search text all live on the instance and are only mutated by the keymap
//! dispatch path. Output goes through a [`Screen`], restore positions through
//! a [`RestoreCache`].

pub mod cache;
pub mod config;
pub mod definition;
pub mod entry;
pub mod error;
pub mod keyboard;
pub mod menu;
pub mod range;
pub mod render;
pub mod screen;
pub mod search;
pub mod sort;
pub mod theme;
pub mod tty;

pub use cache::{FileCache, MemoryCache, RestoreCache, RestoreRecord};
pub use config::{Config, LoadedConfig, MenuSettings};
pub use entry::{Entry, EntryKind, HelpText, MenuValue, Side};
pub use error::MenuError;
pub use keyboard::{KeyPress, Keymap, Modifiers};
pub use menu::{
    EndTrigger, HeaderMessage, HelpNotes, KeyCall, KeyOutcome, Menu, MenuKey, MenuOptions,
    MenuOutcome, Mode, RestoreKind, RestoreOptions, Selection,
};
pub use screen::{BufferScreen, RecordedFrame, Screen, TerminalScreen};
pub use search::SearchOptions;
pub use theme::Theme;
