//! Render-ready snapshots of a section, so the UI never touches generic
//! controllers.

use api_types::order::Order;
use chrono_tz::Tz;
use dashboard::{
    CollectionClient, Draft, DraftField, Entity, FilterValue, ListController, ModalMode,
    ModalSession, ModalState,
};

#[derive(Debug, Clone, Default)]
pub struct TableView {
    pub title: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub selected: usize,
    pub page_index: usize,
    pub page_count: usize,
    pub filtered: usize,
    pub total: usize,
    pub loading: bool,
    pub error: Option<String>,
    /// `(label, value)` for every active filter.
    pub filters: Vec<(&'static str, String)>,
    pub has_invoice: bool,
    pub has_status: bool,
    pub has_create: bool,
}

impl TableView {
    pub fn build<T, C>(ctrl: &ListController<T, C>, selected: usize) -> Self
    where
        T: Entity,
        C: CollectionClient<T>,
    {
        let columns = T::columns();
        let rows = ctrl
            .page()
            .into_iter()
            .map(|item| columns.iter().map(|column| (column.value)(item)).collect())
            .collect::<Vec<Vec<String>>>();

        let filters = ctrl
            .filters()
            .iter()
            .map(|(name, value)| {
                let label = T::filter_field(name)
                    .map(|field| field.label)
                    .unwrap_or("?");
                (label, filter_text(value))
            })
            .collect();

        Self {
            title: T::LABEL,
            headers: columns.iter().map(|column| column.header).collect(),
            selected: selected.min(rows.len().saturating_sub(1)),
            rows,
            page_index: ctrl.page_index(),
            page_count: ctrl.page_count(),
            filtered: ctrl.filtered_count(),
            total: ctrl.items().len(),
            loading: ctrl.is_loading(),
            error: ctrl.error().map(str::to_string),
            filters,
            has_invoice: T::supports_invoice(),
            has_status: !T::STATUSES.is_empty(),
            has_create: T::supports_create() && !T::editable().is_empty(),
        }
    }
}

pub fn filter_text(value: &FilterValue) -> String {
    fn bound<V: ToString>(value: &Option<V>) -> String {
        value.as_ref().map(ToString::to_string).unwrap_or_default()
    }
    match value {
        FilterValue::Text(text) => text.clone(),
        FilterValue::Range { min, max } => format!("{}..{}", bound(min), bound(max)),
        FilterValue::Dates { from, to } => format!("{}..{}", bound(from), bound(to)),
    }
}

#[derive(Debug, Clone)]
pub struct ModalView {
    pub title: String,
    pub mode: ModalMode,
    /// Read-only `(label, value)` pairs describing the item.
    pub details: Vec<(&'static str, String)>,
    pub fields: Vec<DraftField>,
    pub focus: usize,
    pub status: Option<String>,
    pub statuses: &'static [&'static str],
    pub invoice: Option<Vec<String>>,
    pub invoice_supported: bool,
    pub error: Option<String>,
    pub submitting: bool,
}

impl ModalView {
    pub fn build<T: Entity>(modal: &ModalSession<T>) -> Option<Self> {
        let (mode, item, draft) = match modal.state() {
            ModalState::Closed => return None,
            ModalState::Open {
                mode, item, draft, ..
            }
            | ModalState::Submitting { mode, item, draft } => (*mode, item, draft),
        };

        // a blank draft has nothing to describe yet
        let details = if mode == ModalMode::Create {
            Vec::new()
        } else {
            T::columns()
                .iter()
                .map(|column| (column.header, (column.value)(item)))
                .collect()
        };
        let (fields, focus, status) = match draft {
            Draft::Fields { fields, focus } => (fields.clone(), *focus, None),
            Draft::Status(status) => (Vec::new(), 0, Some(status.clone())),
            Draft::Empty => (Vec::new(), 0, None),
        };

        Some(Self {
            title: format!("{} · {}", T::LABEL, mode.label()),
            mode,
            details,
            fields,
            focus,
            status,
            statuses: T::STATUSES,
            invoice: None,
            invoice_supported: T::supports_invoice(),
            error: modal.error().map(str::to_string),
            submitting: modal.is_submitting(),
        })
    }
}

/// Printable invoice for one order.
pub fn invoice_lines(order: &Order, tz: Tz) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Invoice {}",
            order.order_number.as_deref().unwrap_or(&order.id)
        ),
        format!(
            "Date: {}",
            order
                .created_at
                .map(|at| at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string())
        ),
        format!("Customer: {}", order.customer_name),
    ];
    if let Some(phone) = &order.customer_phone {
        lines.push(format!("Phone: {phone}"));
    }
    if let Some(address) = &order.delivery_address {
        lines.push(format!("Deliver to: {address}"));
    }
    if let Some(pharmacy) = &order.pharmacy_name {
        lines.push(format!("Pharmacy: {pharmacy}"));
    }
    lines.push(String::new());

    let width = order
        .items
        .iter()
        .map(|line| line.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);
    lines.push(format!("{:<width$}  {:>4}  {:>9}  {:>10}", "Item", "Qty", "Price", "Amount"));
    for line in &order.items {
        lines.push(format!(
            "{:<width$}  {:>4}  {:>9.2}  {:>10.2}",
            line.name,
            line.quantity,
            line.price,
            line.price * f64::from(line.quantity)
        ));
    }
    lines.push(String::new());
    lines.push(format!("Total: {:.2}", order.total_amount));
    lines.push(format!(
        "Payment: {}",
        order.payment_status.as_deref().unwrap_or("-")
    ));
    lines.push(format!("Status: {}", order.status));
    lines
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn invoice_lists_lines_and_total() {
        let order: Order = serde_json::from_value(json!({
            "_id": "o1",
            "orderNumber": "ORD-42",
            "customerName": "Ada",
            "createdAt": "2024-03-01T23:30:00Z",
            "items": [
                {"name": "Paracetamol", "quantity": 2, "price": 1.5},
                {"name": "Syrup", "quantity": 1, "price": 4.0}
            ],
            "totalAmount": 7.0,
            "status": "Delivered"
        }))
        .unwrap();

        let lines = invoice_lines(&order, chrono_tz::Europe::Rome);
        assert_eq!(lines[0], "Invoice ORD-42");
        // rendered in the configured zone
        assert_eq!(lines[1], "Date: 2024-03-02 00:30");
        assert!(lines.iter().any(|line| line.starts_with("Paracetamol") && line.ends_with("3.00")));
        assert!(lines.contains(&"Total: 7.00".to_string()));
    }

    #[test]
    fn filter_text_renders_open_ranges() {
        let value = FilterValue::Range {
            min: Some(5.0),
            max: None,
        };
        assert_eq!(filter_text(&value), "5..");
    }
}
