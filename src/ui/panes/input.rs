//! Command line pane

use super::border_style;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const PROMPT: &str = "> ";

/// Render the input line and place the terminal cursor after it
pub fn render_input_pane(frame: &mut Frame, area: Rect, input: &str, is_focused: bool) {
    let block = Block::default()
        .title(" Statement ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let inner_width = area.width.saturating_sub(2) as usize;
    let typed = input.chars().count() + PROMPT.len();
    // Keep the end of long input visible
    let skip = typed.saturating_sub(inner_width.saturating_sub(1));
    let shown: String = PROMPT.chars().chain(input.chars()).skip(skip).collect();

    let style = if input.starts_with(':') {
        Style::default().fg(DEFAULT_THEME.secondary)
    } else {
        Style::default().fg(DEFAULT_THEME.fg)
    };
    let paragraph = Paragraph::new(Line::from(Span::styled(shown, style))).block(block);
    frame.render_widget(paragraph, area);

    if is_focused {
        let column = (typed - skip) as u16;
        frame.set_cursor_position(Position::new(area.x + 1 + column, area.y + 1));
    }
}
