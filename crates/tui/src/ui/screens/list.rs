use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState},
};

use crate::{app::view::TableView, ui::theme::Theme};

const MAX_COLUMN: usize = 40;

pub fn render(frame: &mut Frame<'_>, area: Rect, table: &TableView, theme: &Theme) {
    let block = Block::default()
        .title(format!(" {} ", table.title))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.panel));

    if table.rows.is_empty() {
        let message = if table.loading {
            "Loading…"
        } else if table.total > 0 {
            "No records match the current filters"
        } else {
            "Nothing here yet"
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                message,
                Style::default().fg(theme.text_muted),
            )))
            .alignment(Alignment::Center)
            .block(block),
            area,
        );
        return;
    }

    let header = Row::new(
        table
            .headers
            .iter()
            .map(|header| Cell::from(*header).style(Style::default().add_modifier(Modifier::BOLD))),
    )
    .style(Style::default().fg(theme.text_muted))
    .bottom_margin(1);

    let rows = table.rows.iter().map(|row| {
        Row::new(row.iter().map(|value| Cell::from(value.as_str())))
            .style(Style::default().fg(theme.text))
    });

    let widget = Table::new(rows, column_widths(table))
        .header(header)
        .block(block)
        .column_spacing(2)
        .row_highlight_style(
            Style::default()
                .bg(theme.highlight)
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▌");

    let mut state = TableState::default().with_selected(Some(table.selected));
    frame.render_stateful_widget(widget, area, &mut state);
}

/// Each column is as wide as its widest cell on the page, capped.
fn column_widths(table: &TableView) -> Vec<Constraint> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let widest = table
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|value| value.chars().count())
                .max()
                .unwrap_or(0)
                .max(header.chars().count())
                .min(MAX_COLUMN);
            Constraint::Length(u16::try_from(widest).unwrap_or(u16::MAX))
        })
        .collect()
}
