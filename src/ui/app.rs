//! Main TUI application state and logic

use crate::interpreter::engine::Session;
use crate::memory::allocator::FitStrategy;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::fs;
use std::io;
use std::time::Duration;
use tracing::info;

const HELP: [&str; 8] = [
    "Statements: declarations, assignments, casts, + - * /, *p, p[i]",
    "Built-ins: malloc(n) calloc(n, size) free(p) sizeof(x) strategy(\"best\")",
    ":fit first|next|best|worst   switch the fit strategy",
    ":set INDEX VALUE             write one heap cell directly",
    ":save PATH / :load PATH      store or restore the session",
    ":quit                        leave",
    "Tab completes names, Up/Down recall history, Shift+Tab moves focus",
    "PageUp/PageDown scroll the focused pane",
];

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Input,
    Heap,
    Variables,
    Output,
}

impl FocusedPane {
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Input => FocusedPane::Heap,
            FocusedPane::Heap => FocusedPane::Variables,
            FocusedPane::Variables => FocusedPane::Output,
            FocusedPane::Output => FocusedPane::Input,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Echo of what was submitted
    Command,
    Value,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub text: String,
    pub kind: OutputKind,
}

/// The main application state
pub struct App {
    pub session: Session,

    /// Line being typed
    pub input: String,

    /// Submitted lines, oldest first
    pub history: Vec<String>,

    /// Position while recalling history
    history_index: Option<usize>,

    pub output: Vec<OutputLine>,

    pub focused_pane: FocusedPane,

    /// Per-pane scroll offsets
    pub heap_scroll: usize,
    pub variables_scroll: usize,
    pub output_scroll: usize,

    pub should_quit: bool,

    pub status_message: String,
}

fn parse_cell_value(text: &str) -> Option<u8> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

impl App {
    pub fn new(session: Session) -> Self {
        App {
            session,
            input: String::new(),
            history: Vec::new(),
            history_index: None,
            output: Vec::new(),
            focused_pane: FocusedPane::Input,
            heap_scroll: 0,
            variables_scroll: 0,
            output_scroll: 0,
            should_quit: false,
            status_message: String::from("Ready!"),
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(main_chunks[0]);

        // Left column: Heap (top) | Output (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[0]);

        let blocks = self.session.display_blocks();
        super::panes::render_heap_pane(
            frame,
            left_rows[0],
            &blocks,
            self.focused_pane == FocusedPane::Heap,
            &mut self.heap_scroll,
        );

        super::panes::render_terminal_pane(
            frame,
            left_rows[1],
            &self.output,
            self.focused_pane == FocusedPane::Output,
            &mut self.output_scroll,
        );

        super::panes::render_variables_pane(
            frame,
            columns[1],
            self.session.scope(),
            self.focused_pane == FocusedPane::Variables,
            &mut self.variables_scroll,
        );

        super::panes::render_input_pane(
            frame,
            main_chunks[1],
            &self.input,
            self.focused_pane == FocusedPane::Input,
        );

        super::panes::render_status_bar(
            frame,
            main_chunks[2],
            &self.status_message,
            self.session.strategy(),
            &crate::memory::blocks::summarize(&blocks),
        );
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => {
                self.should_quit = true;
            }
            KeyCode::Char(c) if !ctrl => {
                self.input.push(c);
                self.history_index = None;
                self.focused_pane = FocusedPane::Input;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Esc => {
                self.input.clear();
                self.history_index = None;
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Tab => {
                self.input = self.session.predict(&self.input);
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Input => self.recall_older(),
                _ => self.scroll_focused(-1),
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Input => self.recall_newer(),
                _ => self.scroll_focused(1),
            },
            KeyCode::PageUp => self.scroll_focused(-10),
            KeyCode::PageDown => self.scroll_focused(10),
            _ => {}
        }
    }

    fn scroll_focused(&mut self, delta: isize) {
        let offset = match self.focused_pane {
            FocusedPane::Heap => &mut self.heap_scroll,
            FocusedPane::Variables => &mut self.variables_scroll,
            FocusedPane::Input | FocusedPane::Output => &mut self.output_scroll,
        };
        *offset = offset.saturating_add_signed(delta);
    }

    fn recall_older(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let index = match self.history_index {
            Some(i) => i.saturating_sub(1),
            None => self.history.len() - 1,
        };
        self.history_index = Some(index);
        self.input = self.history[index].clone();
    }

    fn recall_newer(&mut self) {
        match self.history_index {
            Some(i) if i + 1 < self.history.len() => {
                self.history_index = Some(i + 1);
                self.input = self.history[i + 1].clone();
            }
            Some(_) => {
                self.history_index = None;
                self.input.clear();
            }
            None => {}
        }
    }

    fn push_output(&mut self, kind: OutputKind, text: impl Into<String>) {
        self.output.push(OutputLine {
            text: text.into(),
            kind,
        });
        self.output_scroll = usize::MAX;
    }

    /// Evaluate or dispatch the current input line
    pub fn submit(&mut self) {
        let line = std::mem::take(&mut self.input).trim().to_string();
        self.history_index = None;
        if line.is_empty() {
            return;
        }
        self.history.push(line.clone());
        self.push_output(OutputKind::Command, format!("> {}", line));

        if let Some(command) = line.strip_prefix(':') {
            match self.run_command(command) {
                Ok(message) => self.status_message = message,
                Err(message) => {
                    self.push_output(OutputKind::Error, message.clone());
                    self.status_message = message;
                }
            }
            return;
        }

        match self.session.execute(&line) {
            Ok(outcome) => {
                self.push_output(OutputKind::Value, outcome.to_string());
                self.status_message = "Ok".to_string();
            }
            Err(err) => {
                let message = err.display_message();
                self.push_output(OutputKind::Error, message);
                self.status_message = "Statement failed".to_string();
            }
        }
    }

    /// Handle a `:command`; the `Ok` text goes to the status bar
    fn run_command(&mut self, command: &str) -> Result<String, String> {
        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match (name, args.as_slice()) {
            ("q" | "quit", []) => {
                self.should_quit = true;
                Ok("Bye".to_string())
            }
            ("help", []) => {
                for line in HELP {
                    self.push_output(OutputKind::Info, line);
                }
                Ok("Help".to_string())
            }
            ("fit", [strategy]) => {
                let strategy: FitStrategy = strategy.parse()?;
                self.session.set_strategy(strategy);
                Ok(format!("Using {}", strategy))
            }
            ("set", [index, value]) => {
                let index: usize = index
                    .parse()
                    .map_err(|_| format!("'{}' is not a cell index", index))?;
                let value = parse_cell_value(value)
                    .ok_or_else(|| format!("'{}' is not a byte value", value))?;
                self.session
                    .write_cell(index, value)
                    .map_err(|err| err.to_string())?;
                Ok(format!("Cell {} = {:#04x}", index, value))
            }
            ("save", [path]) => {
                let blob = self.session.save().map_err(|err| err.to_string())?;
                fs::write(path, blob).map_err(|err| format!("Cannot write {}: {}", path, err))?;
                info!(path, "saved");
                Ok(format!("Saved to {}", path))
            }
            ("load", [path]) => {
                let blob = fs::read(path).map_err(|err| format!("Cannot read {}: {}", path, err))?;
                let count = self
                    .session
                    .load(&blob)
                    .map_err(|err| err.to_string())?
                    .variables()
                    .len();
                Ok(format!("Loaded {} ({} variables)", path, count))
            }
            _ => Err(format!("Unknown command ':{}', try :help", command)),
        }
    }
}
