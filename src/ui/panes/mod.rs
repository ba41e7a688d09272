//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`heap`]: the reconstructed block layout, one row per block
//! - [`variables`]: user variables with their types
//! - [`terminal`]: statement results and errors
//! - [`input`]: the command line being typed
//! - [`status`]: allocator summary and keybindings
//!
//! Each pane module exports a `render_*` function that draws from borrowed
//! session data; none of them keeps state besides a scroll offset owned by
//! the [`App`](crate::ui::app::App).

pub mod heap;
pub mod input;
pub mod status;
pub mod terminal;
pub mod variables;

use crate::ui::theme::DEFAULT_THEME;
use ratatui::style::{Modifier, Style};

pub use heap::render_heap_pane;
pub use input::render_input_pane;
pub use status::render_status_bar;
pub use terminal::render_terminal_pane;
pub use variables::render_variables_pane;

fn border_style(is_focused: bool) -> Style {
    if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    }
}

/// Clamp `offset` so that a list of `total` rows fills `visible` rows
fn clamp_scroll(offset: &mut usize, total: usize, visible: usize) {
    if total > visible {
        *offset = (*offset).min(total - visible);
    } else {
        *offset = 0;
    }
}
