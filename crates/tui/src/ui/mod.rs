pub mod components;
pub mod keymap;
pub mod screens;

mod terminal;
mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use crate::app::{AppState, DashboardView, FilterPrompt, Screen};
use components::hints::{self, KeyHint, common};

pub use terminal::{AppTerminal as Terminal, restore_terminal, setup_terminal};
pub use theme::Theme;

pub fn render(frame: &mut Frame<'_>, state: &AppState, view: Option<&DashboardView>) {
    let theme = Theme::default();
    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(theme.background)),
        area,
    );

    match (state.screen, view) {
        (Screen::Dashboard, Some(view)) => render_shell(frame, area, state, view, &theme),
        _ => screens::login::render(frame, area, state),
    }
    components::toast::render(frame, area, state.toast.as_ref());
}

fn render_shell(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &AppState,
    view: &DashboardView,
    theme: &Theme,
) {
    let error_height = u16::from(view.table.error.is_some());
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // info bar
            Constraint::Length(2), // tabs
            Constraint::Length(1), // page / filters
            Constraint::Length(error_height),
            Constraint::Min(0),
            Constraint::Length(1), // hints
        ])
        .split(area);

    render_info_bar(frame, layout[0], state, view, theme);
    components::tabs::render_tabs(frame, layout[1], state.section, state.unread, theme);
    render_header(frame, layout[2], state, view, theme);
    if let Some(error) = &view.table.error {
        let banner = Paragraph::new(Line::from(vec![
            Span::styled(" ! ", Style::default().fg(theme.background).bg(theme.error)),
            Span::styled(format!(" {error}"), Style::default().fg(theme.error)),
            Span::styled("  (Esc to dismiss)", Style::default().fg(theme.text_muted)),
        ]));
        frame.render_widget(banner, layout[3]);
    }
    screens::list::render(frame, layout[4], &view.table, theme);
    render_bottom_bar(frame, layout[5], state, view, theme);

    if let Some(modal) = &view.modal {
        components::modal::render(frame, area, modal, theme);
    }
}

fn render_info_bar(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &AppState,
    view: &DashboardView,
    theme: &Theme,
) {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(theme.text_muted));
    let vendor = state.vendor.as_deref().unwrap_or("-");
    let refresh = state
        .last_refresh
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut spans = vec![
        label("Vendor"),
        Span::raw(format!(": {vendor}  ")),
        label("Server"),
        Span::raw(format!(": {}  ", state.base_url)),
        label("Refresh"),
        Span::raw(format!(": {refresh}  ")),
    ];
    if state.unread > 0 {
        spans.push(Span::styled(
            format!("{} unread  ", state.unread),
            Style::default().fg(theme.warning),
        ));
    }
    if view.table.loading {
        spans.push(Span::styled("loading…", Style::default().fg(theme.accent)));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().fg(theme.text)),
        area,
    );
}

fn render_header(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &AppState,
    view: &DashboardView,
    theme: &Theme,
) {
    if let Some(prompt) = &state.filter {
        frame.render_widget(Paragraph::new(filter_prompt_line(prompt, theme)), area);
        return;
    }

    let table = &view.table;
    let mut spans = vec![
        Span::styled(
            format!(" Page {}/{}", table.page_index, table.page_count),
            Style::default().fg(theme.text),
        ),
        Span::styled(
            format!("  {} of {}", table.filtered, table.total),
            Style::default().fg(theme.text_muted),
        ),
    ];
    for (label, value) in &table.filters {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{label}: {value}"),
            Style::default().fg(theme.accent).bg(theme.panel),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn filter_prompt_line<'a>(prompt: &'a FilterPrompt, theme: &Theme) -> Line<'a> {
    let mut spans = vec![Span::styled(" Filter ", Style::default().fg(theme.text_muted))];
    for (i, (_, label)) in prompt.fields.iter().enumerate() {
        let style = if i == prompt.focus {
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_muted)
        };
        spans.push(Span::styled(format!("{label} "), style));
    }
    spans.push(Span::raw("│ "));
    spans.push(Span::styled(
        format!("{}│", prompt.buffer),
        Style::default().fg(theme.text).bg(theme.highlight),
    ));
    Line::from(spans)
}

fn render_bottom_bar(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &AppState,
    view: &DashboardView,
    theme: &Theme,
) {
    let groups: Vec<Vec<KeyHint>> = if state.filter.is_some() {
        vec![common::filter_prompt()]
    } else if let Some(modal) = &view.modal {
        vec![components::modal::hints_for(modal)]
    } else {
        vec![
            common::list_navigation(),
            common::item_actions(
                view.table.has_create,
                view.table.has_invoice,
                view.table.has_status,
            ),
            common::output(),
        ]
    };

    let mut spans = vec![Span::raw(" ")];
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            spans.push(hints::hint_separator(theme));
        }
        spans.extend(hints::hints_to_spans(group, theme));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
