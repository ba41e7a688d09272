//! Output pane: echoed statements, results and errors

use super::{border_style, clamp_scroll};
use crate::ui::app::{OutputKind, OutputLine};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

fn line_style(kind: OutputKind) -> Style {
    match kind {
        OutputKind::Command => Style::default().fg(DEFAULT_THEME.comment),
        OutputKind::Value => Style::default().fg(DEFAULT_THEME.fg),
        OutputKind::Info => Style::default().fg(DEFAULT_THEME.primary),
        OutputKind::Error => Style::default()
            .fg(DEFAULT_THEME.error)
            .add_modifier(Modifier::BOLD),
    }
}

/// Render the output pane. `scroll_offset` of `usize::MAX` pins the view to
/// the newest line.
pub fn render_terminal_pane(
    frame: &mut Frame,
    area: Rect,
    lines: &[OutputLine],
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(" Output ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    if lines.is_empty() {
        let paragraph = Paragraph::new("(type a statement, :help for commands)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    clamp_scroll(scroll_offset, lines.len(), visible_height);

    let visible_items: Vec<ListItem> = lines
        .iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|line| ListItem::new(line.text.as_str()).style(line_style(line.kind)))
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}
