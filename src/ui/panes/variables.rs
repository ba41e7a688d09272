//! Variables pane: every user binding with its type and value

use super::{border_style, clamp_scroll};
use crate::interpreter::scope::Scope;
use crate::memory::value::Value;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

fn variable_line<'a>(name: &'a str, value: &Value) -> Line<'a> {
    let (type_text, literal) = match value {
        Value::Typed(tv) => (tv.ty.to_string(), Some(&tv.value)),
        Value::Untyped(literal) => (format!("({})", literal.kind()), Some(literal)),
        Value::Void => ("void".to_string(), None),
    };
    let value_text = literal.map(|l| l.render()).unwrap_or_default();

    Line::from(vec![
        Span::styled(type_text, Style::default().fg(DEFAULT_THEME.type_name)),
        Span::raw(" "),
        Span::styled(name, Style::default().fg(DEFAULT_THEME.fg)),
        Span::styled(" = ", Style::default().fg(DEFAULT_THEME.comment)),
        Span::styled(value_text, Style::default().fg(DEFAULT_THEME.number)),
    ])
}

/// Render the variables pane
pub fn render_variables_pane(
    frame: &mut Frame,
    area: Rect,
    scope: &Scope,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(" Variables ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let variables = scope.variables();
    if variables.is_empty() {
        let paragraph = Paragraph::new("(no variables)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    clamp_scroll(scroll_offset, variables.len(), visible_height);

    let items: Vec<ListItem> = variables
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|(name, value)| ListItem::new(variable_line(name, value)))
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
