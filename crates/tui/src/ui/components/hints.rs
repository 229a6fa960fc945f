use ratatui::{style::Style, text::Span};

use crate::ui::theme::Theme;

/// A keyboard hint consisting of a key and its action.
#[derive(Debug, Clone)]
pub struct KeyHint {
    pub key: &'static str,
    pub action: &'static str,
}

impl KeyHint {
    pub const fn new(key: &'static str, action: &'static str) -> Self {
        Self { key, action }
    }
}

/// Converts a list of key hints into styled spans for rendering.
pub fn hints_to_spans(hints: &[KeyHint], theme: &Theme) -> Vec<Span<'static>> {
    let mut spans = Vec::new();

    for (i, hint) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(hint.key, Style::default().fg(theme.accent)));
        spans.push(Span::raw(format!(" {}", hint.action)));
    }

    spans
}

/// Creates a separator span for dividing hint groups.
pub fn hint_separator(theme: &Theme) -> Span<'static> {
    Span::styled("  │  ", Style::default().fg(theme.border))
}

pub mod common {
    use super::KeyHint;

    pub fn list_navigation() -> Vec<KeyHint> {
        vec![
            KeyHint::new("Tab", "section"),
            KeyHint::new("↑↓", "select"),
            KeyHint::new("n/p", "page"),
            KeyHint::new("/", "filter"),
            KeyHint::new("c", "clear"),
            KeyHint::new("r", "refresh"),
        ]
    }

    pub fn item_actions(create: bool, invoice: bool, status: bool) -> Vec<KeyHint> {
        let mut hints = vec![KeyHint::new("Enter", "view")];
        if create {
            hints.push(KeyHint::new("a", "add"));
        }
        if invoice {
            hints.push(KeyHint::new("i", "invoice"));
        }
        hints.push(KeyHint::new("e", "edit"));
        if status {
            hints.push(KeyHint::new("s", "status"));
        }
        hints.push(KeyHint::new("d", "delete"));
        hints
    }

    pub fn output() -> Vec<KeyHint> {
        vec![
            KeyHint::new("x", "csv"),
            KeyHint::new("P", "print"),
            KeyHint::new("L", "logout"),
            KeyHint::new("q", "quit"),
        ]
    }

    pub fn filter_prompt() -> Vec<KeyHint> {
        vec![
            KeyHint::new("Tab", "field"),
            KeyHint::new("Enter", "apply"),
            KeyHint::new("Esc", "cancel"),
        ]
    }

    pub fn form_editing() -> Vec<KeyHint> {
        vec![
            KeyHint::new("Tab", "next"),
            KeyHint::new("Enter", "save"),
            KeyHint::new("Esc", "cancel"),
        ]
    }

    pub fn status_picker() -> Vec<KeyHint> {
        vec![
            KeyHint::new("←→", "status"),
            KeyHint::new("Enter", "save"),
            KeyHint::new("Esc", "cancel"),
        ]
    }

    pub fn confirm() -> Vec<KeyHint> {
        vec![KeyHint::new("y", "delete"), KeyHint::new("n/Esc", "keep")]
    }

    pub fn detail_view(invoice: bool) -> Vec<KeyHint> {
        let mut hints = vec![KeyHint::new("Esc", "close")];
        if invoice {
            hints.push(KeyHint::new("i", "invoice"));
        }
        hints
    }
}
