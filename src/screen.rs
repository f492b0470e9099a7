use std::io::{self, Stdout};

use anyhow::{Context, Result};
use crossterm::cursor;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::text::{Line, Text};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};

use crate::entry::plain_text;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

const FALLBACK_SIZE: (usize, usize) = (80, 24);

/// Where a menu draws.
///
/// `render` replaces the whole frame: `primary` on top and the optional
/// `secondary` content (find-mode help) below it. Callers suppress identical
/// consecutive frames themselves.
pub trait Screen {
    fn render(&mut self, primary: &[Line<'static>], secondary: Option<&[Line<'static>]>);
    fn clear(&mut self);
    /// Out-of-band line, e.g. a configuration error.
    fn print_line(&mut self, line: Line<'static>);
    /// `(width, height)` in cells.
    fn size(&self) -> (usize, usize);
}

/// A frame as it was handed to a [`Screen`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub primary: Vec<Line<'static>>,
    pub secondary: Option<Vec<Line<'static>>>,
}

/// Screen that records everything it is asked to draw.
#[derive(Debug, Clone)]
pub struct BufferScreen {
    pub renders: Vec<RecordedFrame>,
    pub clears: usize,
    pub printed: Vec<Line<'static>>,
    pub width: usize,
    pub height: usize,
}

impl Default for BufferScreen {
    fn default() -> Self {
        Self::new(FALLBACK_SIZE.0, FALLBACK_SIZE.1)
    }
}

impl BufferScreen {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            renders: Vec::new(),
            clears: 0,
            printed: Vec::new(),
            width,
            height,
        }
    }

    pub fn last(&self) -> Option<&RecordedFrame> {
        self.renders.last()
    }

    /// Primary content of the latest frame as plain text.
    pub fn last_text(&self) -> Vec<String> {
        self.last()
            .map(|frame| frame.primary.iter().map(plain_text).collect())
            .unwrap_or_default()
    }

    pub fn last_secondary_text(&self) -> Vec<String> {
        self.last()
            .and_then(|frame| frame.secondary.as_ref())
            .map(|lines| lines.iter().map(plain_text).collect())
            .unwrap_or_default()
    }
}

impl Screen for BufferScreen {
    fn render(&mut self, primary: &[Line<'static>], secondary: Option<&[Line<'static>]>) {
        self.renders.push(RecordedFrame {
            primary: primary.to_vec(),
            secondary: secondary.map(<[Line<'static>]>::to_vec),
        });
    }

    fn clear(&mut self) {
        self.clears += 1;
    }

    fn print_line(&mut self, line: Line<'static>) {
        self.printed.push(line);
    }

    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// Full-screen terminal output through ratatui.
///
/// Draw failures cannot be returned through [`Screen`]; the first one is kept
/// and handed out by [`TerminalScreen::take_error`].
pub struct TerminalScreen {
    terminal: TuiTerminal,
    last: Vec<Line<'static>>,
    printed: Vec<Line<'static>>,
    error: Option<io::Error>,
}

impl TerminalScreen {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend).context("failed to create terminal")?;
        Ok(Self {
            terminal,
            last: Vec::new(),
            printed: Vec::new(),
            error: None,
        })
    }

    /// Prints out-of-band lines and the last frame to the normal screen.
    /// Only meaningful after [`TerminalScreen::restore`].
    pub fn print_final(&mut self) {
        let last = std::mem::take(&mut self.last);
        for line in self.printed.drain(..).chain(last) {
            println!("{}", plain_text(&line));
        }
    }

    /// Puts the terminal back without printing anything.
    pub fn restore(&mut self) -> Result<()> {
        disable_raw_mode().context("failed to disable raw mode")?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)
            .context("failed to leave alternate screen")?;
        self.terminal.show_cursor().context("failed to show cursor")
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn keep_error(&mut self, result: io::Result<()>) {
        if let Err(err) = result {
            tracing::warn!(error = %err, "terminal draw failed");
            self.error.get_or_insert(err);
        }
    }
}

fn draw_frame(frame: &mut Frame, primary: &[Line<'static>], secondary: Option<&[Line<'static>]>) {
    let primary_height = u16::try_from(primary.len()).unwrap_or(u16::MAX);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(primary_height), Constraint::Min(0)])
        .split(frame.area());
    frame.render_widget(Paragraph::new(Text::from(primary.to_vec())), chunks[0]);
    if let Some(secondary) = secondary {
        frame.render_widget(Paragraph::new(Text::from(secondary.to_vec())), chunks[1]);
    }
}

impl Screen for TerminalScreen {
    fn render(&mut self, primary: &[Line<'static>], secondary: Option<&[Line<'static>]>) {
        self.last = primary.to_vec();
        let result = self
            .terminal
            .draw(|frame| draw_frame(frame, primary, secondary))
            .map(|_| ());
        self.keep_error(result);
    }

    fn clear(&mut self) {
        let result = self.terminal.clear();
        self.keep_error(result);
    }

    fn print_line(&mut self, line: Line<'static>) {
        tracing::debug!(line = %plain_text(&line), "printed line");
        self.printed.push(line);
    }

    fn size(&self) -> (usize, usize) {
        match self.terminal.size() {
            Ok(size) => (usize::from(size.width), usize::from(size.height)),
            Err(_) => FALLBACK_SIZE,
        }
    }
}
