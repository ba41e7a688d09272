//! Status bar rendering with the allocator summary and keybindings

use crate::memory::allocator::FitStrategy;
use crate::memory::blocks::HeapStats;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Render the status bar at the bottom
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    message: &str,
    strategy: FitStrategy,
    stats: &HeapStats,
) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let corrupt = stats.error_cells > 0;
    let bar = Style::default().bg(DEFAULT_THEME.status_bg);

    let mut left_spans = vec![
        Span::styled(
            format!(" {} ", strategy),
            Style::default()
                .bg(DEFAULT_THEME.primary)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                " used {} | free {} | largest {} ",
                stats.allocated_cells, stats.free_cells, stats.largest_free
            ),
            bar.fg(DEFAULT_THEME.fg),
        ),
    ];
    if corrupt {
        left_spans.push(Span::styled(
            format!(" {} CORRUPT ", stats.error_cells),
            Style::default()
                .bg(DEFAULT_THEME.error)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ));
    }
    left_spans.push(Span::styled(
        format!(" {} ", message),
        bar.fg(DEFAULT_THEME.comment),
    ));

    let left_paragraph = Paragraph::new(Line::from(left_spans))
        .style(bar)
        .alignment(Alignment::Left);
    frame.render_widget(left_paragraph, layout[0]);

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = bar.fg(DEFAULT_THEME.fg);
    let sep_style = bar.fg(DEFAULT_THEME.comment);

    let right_spans = vec![
        Span::styled(" ⇥ ", key_style),
        Span::styled(" complete ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ↑/↓ ", key_style),
        Span::styled(" history ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ⇧⇥ ", key_style),
        Span::styled(" focus ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" :help ", key_style),
        Span::styled(" ", desc_style),
    ];

    let right_paragraph = Paragraph::new(Line::from(right_spans))
        .style(bar)
        .alignment(Alignment::Right);
    frame.render_widget(right_paragraph, layout[1]);
}
