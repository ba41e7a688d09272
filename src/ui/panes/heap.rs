//! Heap pane rendering
//!
//! Shows the block layout produced by the reconstructor, one block per row
//! group. Each cell is printed as two hex digits, wrapped to the pane width,
//! and cells flagged as inconsistent are drawn in the error color.

use super::{border_style, clamp_scroll};
use crate::memory::blocks::{Block as HeapBlock, BlockKind, Cell};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

// "NNN KIND " ahead of the cells
const LABEL_WIDTH: usize = 9;

fn kind_label(kind: BlockKind) -> (&'static str, Color) {
    match kind {
        BlockKind::Reserved => ("rsv ", DEFAULT_THEME.reserved),
        BlockKind::Allocated => ("used", DEFAULT_THEME.allocated),
        BlockKind::Free => ("free", DEFAULT_THEME.free),
        BlockKind::Filler => ("pad ", DEFAULT_THEME.filler),
    }
}

fn cell_span(cell: &Cell, color: Color, is_header: bool) -> Span<'static> {
    let mut style = Style::default().fg(color);
    if cell.error {
        style = Style::default()
            .fg(Color::Black)
            .bg(DEFAULT_THEME.error)
            .add_modifier(Modifier::BOLD);
    } else if is_header {
        style = style.add_modifier(Modifier::BOLD);
    }
    Span::styled(format!("{:02x}", cell.value), style)
}

/// Rows for one block, wrapping its cells at `per_row`
fn block_lines(block: &HeapBlock, per_row: usize) -> Vec<Line<'static>> {
    let (label, color) = kind_label(block.kind);
    let label_style = if block.has_error() {
        Style::default().fg(DEFAULT_THEME.error)
    } else {
        Style::default().fg(color)
    };
    let has_header = matches!(block.kind, BlockKind::Allocated | BlockKind::Free);

    block
        .cells
        .chunks(per_row.max(1))
        .enumerate()
        .map(|(row, cells)| {
            let mut spans = if row == 0 {
                vec![
                    Span::styled(
                        format!("{:>3} ", block.start()),
                        Style::default().fg(DEFAULT_THEME.comment),
                    ),
                    Span::styled(format!("{} ", label), label_style),
                ]
            } else {
                vec![Span::raw(" ".repeat(LABEL_WIDTH))]
            };
            for (i, cell) in cells.iter().enumerate() {
                let is_header = has_header && row == 0 && i == 0;
                spans.push(cell_span(cell, color, is_header));
                spans.push(Span::raw(" "));
            }
            Line::from(spans)
        })
        .collect()
}

/// Render the heap pane
pub fn render_heap_pane(
    frame: &mut Frame,
    area: Rect,
    blocks: &[HeapBlock],
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(" Heap ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let content_width = area.width.saturating_sub(2) as usize;
    let per_row = content_width.saturating_sub(LABEL_WIDTH) / 3;

    let all_items: Vec<ListItem> = blocks
        .iter()
        .flat_map(|heap_block| block_lines(heap_block, per_row))
        .map(ListItem::new)
        .collect();

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    clamp_scroll(scroll_offset, all_items.len(), visible_height);

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}
