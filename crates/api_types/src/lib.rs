//! Wire types shared by the dashboard core and its front ends.
//!
//! The vendor API is owned by the platform backend; these types only mirror
//! the fields the dashboard reads. Every record accepts either `_id` or `id`
//! as its identifier and tolerates missing optional fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error body returned by the API on a non-success status.
///
/// Most endpoints answer with `message`; a few older ones use `error`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .map(|msg| msg.trim().to_string())
            .filter(|msg| !msg.is_empty())
    }
}

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginRequest {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct VendorRef {
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(default)]
        pub name: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LoginResponse {
        pub token: String,
        pub vendor: VendorRef,
    }
}

pub mod order {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct OrderLine {
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub quantity: u32,
        #[serde(default)]
        pub price: f64,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Order {
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(default)]
        pub order_number: Option<String>,
        #[serde(default)]
        pub customer_name: String,
        #[serde(default)]
        pub customer_phone: Option<String>,
        #[serde(default)]
        pub delivery_address: Option<String>,
        #[serde(default)]
        pub pharmacy_name: Option<String>,
        #[serde(default)]
        pub rider_name: Option<String>,
        #[serde(default)]
        pub items: Vec<OrderLine>,
        #[serde(default)]
        pub total_amount: f64,
        #[serde(default)]
        pub payment_status: Option<String>,
        #[serde(default)]
        pub status: String,
        #[serde(default)]
        pub created_at: Option<DateTime<Utc>>,
    }
}

pub mod medicine {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Medicine {
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub category: String,
        #[serde(default)]
        pub manufacturer: Option<String>,
        #[serde(default)]
        pub price: f64,
        #[serde(default)]
        pub stock: i64,
        #[serde(default)]
        pub requires_prescription: bool,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub expiry_date: Option<DateTime<Utc>>,
    }
}

pub mod prescription {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Prescription {
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(default)]
        pub patient_name: String,
        #[serde(default)]
        pub doctor_name: Option<String>,
        #[serde(default)]
        pub image_url: Option<String>,
        #[serde(default)]
        pub notes: Option<String>,
        #[serde(default)]
        pub status: String,
        #[serde(default)]
        pub uploaded_at: Option<DateTime<Utc>>,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Category {
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub medicine_count: Option<u64>,
    }
}

pub mod pharmacy {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Pharmacy {
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub address: Option<String>,
        #[serde(default)]
        pub phone: Option<String>,
        #[serde(default)]
        pub license_number: Option<String>,
        #[serde(default)]
        pub status: String,
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct User {
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub email: String,
        #[serde(default)]
        pub phone: Option<String>,
        #[serde(default)]
        pub role: Option<String>,
        #[serde(default)]
        pub status: String,
        #[serde(default)]
        pub created_at: Option<DateTime<Utc>>,
    }
}

pub mod notification {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Notification {
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(default)]
        pub title: String,
        #[serde(default)]
        pub message: String,
        #[serde(default)]
        pub read: bool,
        #[serde(default)]
        pub created_at: Option<DateTime<Utc>>,
    }
}
