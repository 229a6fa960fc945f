//! [`Entity`] declarations for every collection the vendor dashboard manages.

use api_types::{
    category::Category, medicine::Medicine, notification::Notification, order::Order,
    pharmacy::Pharmacy, prescription::Prescription, user::User,
};

use crate::entity::{
    Column, EditableField, Entity, FieldKind, FieldValue, FilterField, FilterKind, Resource,
    fmt_bool, fmt_date, fmt_money,
};

pub const ORDER_STATUSES: &[&str] = &[
    "Pending",
    "Accepted",
    "Preparing",
    "Dispatched",
    "Delivered",
    "Cancelled",
];

pub const PRESCRIPTION_STATUSES: &[&str] = &["Pending", "Approved", "Rejected", "Fulfilled"];

pub const PHARMACY_STATUSES: &[&str] = &["Active", "Inactive", "Suspended"];

pub const USER_STATUSES: &[&str] = &["Active", "Blocked"];

impl Entity for Order {
    const RESOURCE: Resource = Resource {
        path: "orders",
        list_key: "orders",
        item_key: "order",
    };
    const LABEL: &'static str = "Orders";
    const STATUSES: &'static [&'static str] = ORDER_STATUSES;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(&self.status)
    }

    fn filters() -> Vec<FilterField<Self>> {
        vec![
            FilterField {
                name: "search",
                label: "Search",
                kind: FilterKind::Substring,
                value: |o: &Order| {
                    FieldValue::Text(format!(
                        "{} {} {}",
                        o.order_number.as_deref().unwrap_or(&o.id),
                        o.customer_name,
                        o.pharmacy_name.as_deref().unwrap_or("")
                    ))
                },
            },
            FilterField {
                name: "status",
                label: "Status",
                kind: FilterKind::Exact,
                value: |o: &Order| FieldValue::text(o.status.as_str()),
            },
            FilterField {
                name: "payment",
                label: "Payment",
                kind: FilterKind::Exact,
                value: |o: &Order| FieldValue::opt_text(o.payment_status.as_deref()),
            },
            FilterField {
                name: "total",
                label: "Total",
                kind: FilterKind::NumericRange,
                value: |o: &Order| FieldValue::Number(o.total_amount),
            },
            FilterField {
                name: "date",
                label: "Placed",
                kind: FilterKind::DateRange,
                value: |o: &Order| FieldValue::date(o.created_at),
            },
        ]
    }

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column {
                header: "Order",
                value: |o: &Order| o.order_number.clone().unwrap_or_else(|| o.id.clone()),
            },
            Column {
                header: "Customer",
                value: |o: &Order| o.customer_name.clone(),
            },
            Column {
                header: "Pharmacy",
                value: |o: &Order| o.pharmacy_name.clone().unwrap_or_default(),
            },
            Column {
                header: "Items",
                value: |o: &Order| o.items.iter().map(|l| l.quantity).sum::<u32>().to_string(),
            },
            Column {
                header: "Total",
                value: |o: &Order| fmt_money(o.total_amount),
            },
            Column {
                header: "Payment",
                value: |o: &Order| o.payment_status.clone().unwrap_or_default(),
            },
            Column {
                header: "Status",
                value: |o: &Order| o.status.clone(),
            },
            Column {
                header: "Placed",
                value: |o: &Order| fmt_date(o.created_at),
            },
        ]
    }

    fn editable() -> Vec<EditableField<Self>> {
        vec![
            EditableField {
                name: "deliveryAddress",
                label: "Delivery address",
                kind: FieldKind::Text,
                required: true,
                current: |o: &Order| o.delivery_address.clone().unwrap_or_default(),
            },
            EditableField {
                name: "customerPhone",
                label: "Customer phone",
                kind: FieldKind::Text,
                required: false,
                current: |o: &Order| o.customer_phone.clone().unwrap_or_default(),
            },
        ]
    }

    fn supports_invoice() -> bool {
        true
    }
}

impl Entity for Medicine {
    const RESOURCE: Resource = Resource {
        path: "medicines",
        list_key: "medicines",
        item_key: "medicine",
    };
    const LABEL: &'static str = "Medicines";

    fn id(&self) -> &str {
        &self.id
    }

    fn supports_create() -> bool {
        true
    }

    fn filters() -> Vec<FilterField<Self>> {
        vec![
            FilterField {
                name: "name",
                label: "Name",
                kind: FilterKind::Substring,
                value: |m: &Medicine| FieldValue::text(m.name.as_str()),
            },
            FilterField {
                name: "category",
                label: "Category",
                kind: FilterKind::Exact,
                value: |m: &Medicine| FieldValue::text(m.category.as_str()),
            },
            FilterField {
                name: "manufacturer",
                label: "Manufacturer",
                kind: FilterKind::Substring,
                value: |m: &Medicine| FieldValue::opt_text(m.manufacturer.as_deref()),
            },
            FilterField {
                name: "price",
                label: "Price",
                kind: FilterKind::NumericRange,
                value: |m: &Medicine| FieldValue::Number(m.price),
            },
            FilterField {
                name: "stock",
                label: "Stock",
                kind: FilterKind::NumericRange,
                value: |m: &Medicine| FieldValue::Number(m.stock as f64),
            },
            FilterField {
                name: "rx",
                label: "Prescription",
                kind: FilterKind::Exact,
                value: |m: &Medicine| FieldValue::Text(fmt_bool(m.requires_prescription)),
            },
        ]
    }

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column {
                header: "Name",
                value: |m: &Medicine| m.name.clone(),
            },
            Column {
                header: "Category",
                value: |m: &Medicine| m.category.clone(),
            },
            Column {
                header: "Manufacturer",
                value: |m: &Medicine| m.manufacturer.clone().unwrap_or_default(),
            },
            Column {
                header: "Price",
                value: |m: &Medicine| fmt_money(m.price),
            },
            Column {
                header: "Stock",
                value: |m: &Medicine| m.stock.to_string(),
            },
            Column {
                header: "Rx",
                value: |m: &Medicine| fmt_bool(m.requires_prescription),
            },
        ]
    }

    fn editable() -> Vec<EditableField<Self>> {
        vec![
            EditableField {
                name: "name",
                label: "Name",
                kind: FieldKind::Text,
                required: true,
                current: |m: &Medicine| m.name.clone(),
            },
            EditableField {
                name: "category",
                label: "Category",
                kind: FieldKind::Text,
                required: true,
                current: |m: &Medicine| m.category.clone(),
            },
            EditableField {
                name: "price",
                label: "Price",
                kind: FieldKind::Number,
                required: true,
                current: |m: &Medicine| fmt_money(m.price),
            },
            EditableField {
                name: "stock",
                label: "Stock",
                kind: FieldKind::Integer,
                required: true,
                current: |m: &Medicine| m.stock.to_string(),
            },
            EditableField {
                name: "requiresPrescription",
                label: "Prescription required",
                kind: FieldKind::Bool,
                required: true,
                current: |m: &Medicine| fmt_bool(m.requires_prescription),
            },
            EditableField {
                name: "description",
                label: "Description",
                kind: FieldKind::Text,
                required: false,
                current: |m: &Medicine| m.description.clone().unwrap_or_default(),
            },
        ]
    }
}

impl Entity for Prescription {
    const RESOURCE: Resource = Resource {
        path: "prescriptions",
        list_key: "prescriptions",
        item_key: "prescription",
    };
    const LABEL: &'static str = "Prescriptions";
    const STATUSES: &'static [&'static str] = PRESCRIPTION_STATUSES;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(&self.status)
    }

    fn filters() -> Vec<FilterField<Self>> {
        vec![
            FilterField {
                name: "patient",
                label: "Patient",
                kind: FilterKind::Substring,
                value: |p: &Prescription| FieldValue::text(p.patient_name.as_str()),
            },
            FilterField {
                name: "doctor",
                label: "Doctor",
                kind: FilterKind::Substring,
                value: |p: &Prescription| FieldValue::opt_text(p.doctor_name.as_deref()),
            },
            FilterField {
                name: "status",
                label: "Status",
                kind: FilterKind::Exact,
                value: |p: &Prescription| FieldValue::text(p.status.as_str()),
            },
            FilterField {
                name: "date",
                label: "Uploaded",
                kind: FilterKind::DateRange,
                value: |p: &Prescription| FieldValue::date(p.uploaded_at),
            },
        ]
    }

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column {
                header: "Patient",
                value: |p: &Prescription| p.patient_name.clone(),
            },
            Column {
                header: "Doctor",
                value: |p: &Prescription| p.doctor_name.clone().unwrap_or_default(),
            },
            Column {
                header: "Status",
                value: |p: &Prescription| p.status.clone(),
            },
            Column {
                header: "Uploaded",
                value: |p: &Prescription| fmt_date(p.uploaded_at),
            },
            Column {
                header: "Notes",
                value: |p: &Prescription| p.notes.clone().unwrap_or_default(),
            },
        ]
    }

    fn editable() -> Vec<EditableField<Self>> {
        vec![EditableField {
            name: "notes",
            label: "Notes",
            kind: FieldKind::Text,
            required: false,
            current: |p: &Prescription| p.notes.clone().unwrap_or_default(),
        }]
    }
}

impl Entity for Category {
    const RESOURCE: Resource = Resource {
        path: "categories",
        list_key: "categories",
        item_key: "category",
    };
    const LABEL: &'static str = "Categories";

    fn id(&self) -> &str {
        &self.id
    }

    fn supports_create() -> bool {
        true
    }

    fn filters() -> Vec<FilterField<Self>> {
        vec![FilterField {
            name: "name",
            label: "Name",
            kind: FilterKind::Substring,
            value: |c: &Category| FieldValue::text(c.name.as_str()),
        }]
    }

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column {
                header: "Name",
                value: |c: &Category| c.name.clone(),
            },
            Column {
                header: "Description",
                value: |c: &Category| c.description.clone().unwrap_or_default(),
            },
            Column {
                header: "Medicines",
                value: |c: &Category| c.medicine_count.map(|n| n.to_string()).unwrap_or_default(),
            },
        ]
    }

    fn editable() -> Vec<EditableField<Self>> {
        vec![
            EditableField {
                name: "name",
                label: "Name",
                kind: FieldKind::Text,
                required: true,
                current: |c: &Category| c.name.clone(),
            },
            EditableField {
                name: "description",
                label: "Description",
                kind: FieldKind::Text,
                required: false,
                current: |c: &Category| c.description.clone().unwrap_or_default(),
            },
        ]
    }
}

impl Entity for Pharmacy {
    const RESOURCE: Resource = Resource {
        path: "pharmacies",
        list_key: "pharmacies",
        item_key: "pharmacy",
    };
    const LABEL: &'static str = "Pharmacies";
    const STATUSES: &'static [&'static str] = PHARMACY_STATUSES;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(&self.status)
    }

    fn filters() -> Vec<FilterField<Self>> {
        vec![
            FilterField {
                name: "name",
                label: "Name",
                kind: FilterKind::Substring,
                value: |p: &Pharmacy| FieldValue::text(p.name.as_str()),
            },
            FilterField {
                name: "address",
                label: "Address",
                kind: FilterKind::Substring,
                value: |p: &Pharmacy| FieldValue::opt_text(p.address.as_deref()),
            },
            FilterField {
                name: "status",
                label: "Status",
                kind: FilterKind::Exact,
                value: |p: &Pharmacy| FieldValue::text(p.status.as_str()),
            },
        ]
    }

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column {
                header: "Name",
                value: |p: &Pharmacy| p.name.clone(),
            },
            Column {
                header: "Address",
                value: |p: &Pharmacy| p.address.clone().unwrap_or_default(),
            },
            Column {
                header: "Phone",
                value: |p: &Pharmacy| p.phone.clone().unwrap_or_default(),
            },
            Column {
                header: "License",
                value: |p: &Pharmacy| p.license_number.clone().unwrap_or_default(),
            },
            Column {
                header: "Status",
                value: |p: &Pharmacy| p.status.clone(),
            },
        ]
    }

    fn editable() -> Vec<EditableField<Self>> {
        vec![
            EditableField {
                name: "name",
                label: "Name",
                kind: FieldKind::Text,
                required: true,
                current: |p: &Pharmacy| p.name.clone(),
            },
            EditableField {
                name: "address",
                label: "Address",
                kind: FieldKind::Text,
                required: true,
                current: |p: &Pharmacy| p.address.clone().unwrap_or_default(),
            },
            EditableField {
                name: "phone",
                label: "Phone",
                kind: FieldKind::Text,
                required: false,
                current: |p: &Pharmacy| p.phone.clone().unwrap_or_default(),
            },
            EditableField {
                name: "licenseNumber",
                label: "License number",
                kind: FieldKind::Text,
                required: false,
                current: |p: &Pharmacy| p.license_number.clone().unwrap_or_default(),
            },
        ]
    }
}

impl Entity for User {
    const RESOURCE: Resource = Resource {
        path: "users",
        list_key: "users",
        item_key: "user",
    };
    const LABEL: &'static str = "Users";
    const STATUSES: &'static [&'static str] = USER_STATUSES;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(&self.status)
    }

    fn filters() -> Vec<FilterField<Self>> {
        vec![
            FilterField {
                name: "search",
                label: "Search",
                kind: FilterKind::Substring,
                value: |u: &User| FieldValue::Text(format!("{} {}", u.name, u.email)),
            },
            FilterField {
                name: "role",
                label: "Role",
                kind: FilterKind::Exact,
                value: |u: &User| FieldValue::opt_text(u.role.as_deref()),
            },
            FilterField {
                name: "status",
                label: "Status",
                kind: FilterKind::Exact,
                value: |u: &User| FieldValue::text(u.status.as_str()),
            },
            FilterField {
                name: "date",
                label: "Joined",
                kind: FilterKind::DateRange,
                value: |u: &User| FieldValue::date(u.created_at),
            },
        ]
    }

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column {
                header: "Name",
                value: |u: &User| u.name.clone(),
            },
            Column {
                header: "Email",
                value: |u: &User| u.email.clone(),
            },
            Column {
                header: "Phone",
                value: |u: &User| u.phone.clone().unwrap_or_default(),
            },
            Column {
                header: "Role",
                value: |u: &User| u.role.clone().unwrap_or_default(),
            },
            Column {
                header: "Status",
                value: |u: &User| u.status.clone(),
            },
            Column {
                header: "Joined",
                value: |u: &User| fmt_date(u.created_at),
            },
        ]
    }

    fn editable() -> Vec<EditableField<Self>> {
        vec![
            EditableField {
                name: "name",
                label: "Name",
                kind: FieldKind::Text,
                required: true,
                current: |u: &User| u.name.clone(),
            },
            EditableField {
                name: "phone",
                label: "Phone",
                kind: FieldKind::Text,
                required: false,
                current: |u: &User| u.phone.clone().unwrap_or_default(),
            },
        ]
    }
}

impl Entity for Notification {
    const RESOURCE: Resource = Resource {
        path: "notifications",
        list_key: "notifications",
        item_key: "notification",
    };
    const LABEL: &'static str = "Notifications";

    fn id(&self) -> &str {
        &self.id
    }

    fn filters() -> Vec<FilterField<Self>> {
        vec![
            FilterField {
                name: "search",
                label: "Search",
                kind: FilterKind::Substring,
                value: |n: &Notification| FieldValue::Text(format!("{} {}", n.title, n.message)),
            },
            FilterField {
                name: "state",
                label: "State",
                kind: FilterKind::Exact,
                value: |n: &Notification| {
                    FieldValue::text(if n.read { "read" } else { "unread" })
                },
            },
            FilterField {
                name: "date",
                label: "Received",
                kind: FilterKind::DateRange,
                value: |n: &Notification| FieldValue::date(n.created_at),
            },
        ]
    }

    fn editable() -> Vec<EditableField<Self>> {
        vec![EditableField {
            name: "read",
            label: "Read",
            kind: FieldKind::Bool,
            required: true,
            current: |n: &Notification| fmt_bool(n.read),
        }]
    }

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column {
                header: "Title",
                value: |n: &Notification| n.title.clone(),
            },
            Column {
                header: "Message",
                value: |n: &Notification| n.message.clone(),
            },
            Column {
                header: "Read",
                value: |n: &Notification| fmt_bool(n.read),
            },
            Column {
                header: "Received",
                value: |n: &Notification| fmt_date(n.created_at),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_and_column_names_are_unique() {
        fn check<T: Entity>() {
            let filters = T::filters();
            for (i, a) in filters.iter().enumerate() {
                assert!(
                    filters.iter().skip(i + 1).all(|b| b.name != a.name),
                    "duplicate filter {} on {}",
                    a.name,
                    T::LABEL
                );
            }
            assert!(!T::columns().is_empty());
        }

        check::<Order>();
        check::<Medicine>();
        check::<Prescription>();
        check::<Category>();
        check::<Pharmacy>();
        check::<User>();
        check::<Notification>();
    }

    #[test]
    fn order_search_covers_customer_and_pharmacy() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "_id": "o1",
            "orderNumber": "ORD-7",
            "customerName": "Ada Lovelace",
            "pharmacyName": "Central",
            "status": "Pending"
        }))
        .unwrap();

        let search = Order::filter_field("search").unwrap();
        let FieldValue::Text(text) = (search.value)(&order) else {
            panic!("search must be text");
        };
        assert!(text.contains("ORD-7"));
        assert!(text.contains("Ada Lovelace"));
        assert!(text.contains("Central"));
    }

    #[test]
    fn status_entities_expose_current_status() {
        let user: User =
            serde_json::from_value(serde_json::json!({"_id": "u1", "status": "Blocked"})).unwrap();
        assert_eq!(user.status(), Some("Blocked"));
        assert!(User::STATUSES.contains(&"Blocked"));
        assert!(Medicine::STATUSES.is_empty());
    }
}
