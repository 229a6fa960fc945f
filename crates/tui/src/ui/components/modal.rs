use dashboard::ModalMode;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};

use crate::{
    app::view::ModalView,
    ui::{
        components::{
            centered_rect,
            hints::{KeyHint, common, hints_to_spans},
        },
        theme::Theme,
    },
};

/// Keys accepted by the open modal.
pub fn hints_for(modal: &ModalView) -> Vec<KeyHint> {
    match modal.mode {
        ModalMode::View => common::detail_view(modal.invoice_supported),
        ModalMode::Invoice => common::detail_view(false),
        ModalMode::Edit | ModalMode::Create => common::form_editing(),
        ModalMode::StatusEdit => common::status_picker(),
        ModalMode::DeleteConfirm => common::confirm(),
    }
}

pub fn render(frame: &mut Frame<'_>, area: Rect, modal: &ModalView, theme: &Theme) {
    let popup = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .title(format!(" {} ", modal.title))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent))
        .style(Style::default().bg(theme.panel).fg(theme.text));

    let mut lines = match modal.mode {
        ModalMode::View => detail_lines(modal, theme),
        ModalMode::Invoice => modal
            .invoice
            .iter()
            .flatten()
            .map(|line| Line::from(line.clone()))
            .collect(),
        ModalMode::Edit | ModalMode::Create => field_lines(modal, theme),
        ModalMode::StatusEdit => status_lines(modal, theme),
        ModalMode::DeleteConfirm => {
            let mut lines = vec![
                Line::from(Span::styled(
                    "Delete this record? This cannot be undone.",
                    Style::default().fg(theme.warning),
                )),
                Line::default(),
            ];
            lines.extend(detail_lines(modal, theme).into_iter().take(3));
            lines
        }
    };

    lines.push(Line::default());
    if modal.submitting {
        lines.push(Line::from(Span::styled(
            "Saving…",
            Style::default().fg(theme.text_muted),
        )));
    } else if let Some(error) = &modal.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(theme.error),
        )));
    }

    lines.push(Line::from(hints_to_spans(&hints_for(modal), theme)));

    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false }),
        popup,
    );
}

fn detail_lines(modal: &ModalView, theme: &Theme) -> Vec<Line<'static>> {
    modal
        .details
        .iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{label}: "), Style::default().fg(theme.text_muted)),
                Span::raw(value.clone()),
            ])
        })
        .collect()
}

fn field_lines(modal: &ModalView, theme: &Theme) -> Vec<Line<'static>> {
    modal
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = i == modal.focus;
            let marker = if field.required { "*" } else { "" };
            let cursor = if focused { "│" } else { "" };
            let style = if focused {
                Style::default().fg(theme.accent)
            } else {
                Style::default().fg(theme.text)
            };
            Line::from(vec![
                Span::styled(
                    format!("{}{marker}: ", field.label),
                    Style::default().fg(theme.text_muted),
                ),
                Span::styled(format!("{}{cursor}", field.value), style),
            ])
        })
        .collect()
}

fn status_lines(modal: &ModalView, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = detail_lines(modal, theme).into_iter().take(2).collect::<Vec<_>>();
    lines.push(Line::default());

    let mut spans = Vec::new();
    for (i, status) in modal.statuses.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        if modal.status.as_deref() == Some(*status) {
            spans.push(Span::styled(
                format!("[{status}]"),
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(
                status.to_string(),
                Style::default().fg(theme.text_muted),
            ));
        }
    }
    lines.push(Line::from(spans));
    lines
}
