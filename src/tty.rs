use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::cache::RestoreCache;
use crate::entry::MenuValue;
use crate::keyboard::KeyPress;
use crate::menu::{Menu, MenuOutcome};
use crate::screen::TerminalScreen;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How the event loop stopped.
enum LoopExit<V> {
    Ended(MenuOutcome<V>),
    Interrupted,
}

/// Runs a configured menu in the terminal until it ends.
///
/// The terminal is restored on every path. On a normal end the final
/// summary is printed to stdout; `ctrl+c` leaves without a result.
pub fn run<V, C>(menu: &mut Menu<V, TerminalScreen, C>) -> Result<Option<MenuOutcome<V>>>
where
    V: MenuValue,
    C: RestoreCache,
{
    menu.redraw();
    match run_loop(menu) {
        Ok(exit) => {
            menu.screen_mut().restore()?;
            if let Some(err) = menu.screen_mut().take_error() {
                return Err(err).context("failed to draw menu");
            }
            match exit {
                LoopExit::Ended(outcome) => {
                    menu.screen_mut().print_final();
                    Ok(Some(outcome))
                }
                LoopExit::Interrupted => Ok(None),
            }
        }
        Err(err) => {
            let _ = menu.screen_mut().restore();
            Err(err)
        }
    }
}

fn run_loop<V, C>(menu: &mut Menu<V, TerminalScreen, C>) -> Result<LoopExit<V>>
where
    V: MenuValue,
    C: RestoreCache,
{
    loop {
        if let Some(err) = menu.screen_mut().take_error() {
            return Err(err).context("failed to draw menu");
        }

        if !event::poll(POLL_INTERVAL)? {
            menu.tick();
            continue;
        }
        match event::read()? {
            Event::Resize(_, _) => menu.redraw(),
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if is_interrupt(&key) {
                    tracing::debug!("menu interrupted");
                    return Ok(LoopExit::Interrupted);
                }
                let Some(press) = KeyPress::from_event(&key) else {
                    continue;
                };
                if let Some(outcome) = menu.handle_key(&press) {
                    return Ok(LoopExit::Ended(outcome));
                }
            }
            _ => {}
        }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_c_interrupts() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(is_interrupt(&ctrl_c));
        assert!(!is_interrupt(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_interrupt(&KeyEvent::new(KeyCode::Esc, KeyModifiers::CONTROL)));
    }
}
