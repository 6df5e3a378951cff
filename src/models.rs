use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The one order status enum. Serialized lowercase on the wire
/// (`notready` / `ready` / `payed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    NotReady,
    Ready,
    Payed,
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notready" => Ok(OrderStatus::NotReady),
            "ready" => Ok(OrderStatus::Ready),
            "payed" => Ok(OrderStatus::Payed),
            other => Err(format!(
                "status: '{other}' is not one of notready, ready, payed"
            )),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::NotReady => "notready",
            OrderStatus::Ready => "ready",
            OrderStatus::Payed => "payed",
        };
        write!(f, "{s}")
    }
}

/// One entry of an order's content. `price` is the line subtotal
/// (unit price x quantity at save time), not a per-unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub customer_phone_number: String,
    pub pickup_date: NaiveDate,
    pub pickup_time: String,
    pub status: OrderStatus,
    pub order_content: Vec<LineItem>,
    pub total_price: f64,
    pub has_advance_payment: bool,
    pub advance_amount: f64,
    pub remaining_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub available: bool,
}

/// One cumulative (date, product) counter pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRow {
    pub product_id: String,
    pub quantity_sold: i64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemPayload {
    pub product_id: String,
    pub quantity: i64,
    /// Caller-supplied line subtotal; looked up from the catalog when absent.
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone_number: String,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_time: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub order_content: Vec<LineItemPayload>,
    pub total_price: Option<f64>,
    #[serde(default)]
    pub has_advance_payment: bool,
    pub advance_amount: Option<f64>,
    pub description: Option<String>,
}

impl OrderPayload {
    /// Shape validation, checked before any write. Collects every field
    /// message instead of stopping at the first.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.customer_name.trim().is_empty() {
            errors.push("customerName: required".to_string());
        }
        if self.customer_phone_number.trim().is_empty() {
            errors.push("customerPhoneNumber: required".to_string());
        }
        if self.pickup_date.is_none() {
            errors.push("pickupDate: required".to_string());
        }
        match &self.pickup_time {
            None => errors.push("pickupTime: required".to_string()),
            Some(t) if !is_valid_time(t) => {
                errors.push(format!("pickupTime: '{t}' is not a valid HH:MM time"));
            }
            Some(_) => {}
        }
        if let Some(s) = &self.status {
            if let Err(e) = OrderStatus::from_str(s) {
                errors.push(e);
            }
        }
        if self.order_content.is_empty() {
            errors.push("orderContent: at least one line item is required".to_string());
        }
        for (index, item) in self.order_content.iter().enumerate() {
            if item.product_id.trim().is_empty() {
                errors.push(format!("orderContent[{index}].product_id: required"));
            }
            if item.quantity < 1 {
                errors.push(format!(
                    "orderContent[{index}].quantity: must be at least 1"
                ));
            }
            if item.price.is_some_and(|p| p < 0.0) {
                errors.push(format!(
                    "orderContent[{index}].price: must not be negative"
                ));
            }
        }
        if self.total_price.is_some_and(|p| p < 0.0) {
            errors.push("totalPrice: must not be negative".to_string());
        }
        if self.advance_amount.is_some_and(|a| a < 0.0) {
            errors.push("advanceAmount: must not be negative".to_string());
        }
        if self.has_advance_payment && self.advance_amount.is_none() {
            errors.push(
                "advanceAmount: required when hasAdvancePayment is true".to_string(),
            );
        }

        errors
    }
}

fn is_valid_time(s: &str) -> bool {
    let Some((hours, minutes)) = s.split_once(':') else {
        return false;
    };
    if hours.len() != 2 || minutes.len() != 2 {
        return false;
    }
    match (hours.parse::<u8>(), minutes.parse::<u8>()) {
        (Ok(h), Ok(m)) => h < 24 && m < 60,
        _ => false,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductPayload {
    #[serde(default)]
    pub name: String,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub available: Option<bool>,
}

impl ProductPayload {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("name: required".to_string());
        }
        match self.price {
            None => errors.push("price: required".to_string()),
            Some(p) if p < 0.0 => errors.push("price: must not be negative".to_string()),
            Some(_) => {}
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> OrderPayload {
        OrderPayload {
            customer_name: "Ana".to_string(),
            customer_phone_number: "0712345678".to_string(),
            pickup_date: NaiveDate::from_ymd_opt(2026, 8, 28),
            pickup_time: Some("12:30".to_string()),
            status: None,
            order_content: vec![LineItemPayload {
                product_id: "p1".to_string(),
                quantity: 2,
                price: None,
            }],
            total_price: None,
            has_advance_payment: false,
            advance_amount: None,
            description: None,
        }
    }

    #[test]
    fn valid_payload_has_no_errors() {
        assert!(payload().validate().is_empty());
    }

    #[test]
    fn every_field_error_is_collected() {
        let bad = OrderPayload {
            customer_name: "".to_string(),
            customer_phone_number: " ".to_string(),
            pickup_date: None,
            pickup_time: Some("25:99".to_string()),
            status: Some("completed".to_string()),
            order_content: vec![],
            total_price: Some(-1.0),
            has_advance_payment: true,
            advance_amount: None,
            description: None,
        };
        let errors = bad.validate();
        assert_eq!(errors.len(), 8);
        assert!(errors.iter().any(|e| e.starts_with("customerName")));
        assert!(errors.iter().any(|e| e.starts_with("pickupTime")));
        assert!(errors.iter().any(|e| e.contains("notready, ready, payed")));
        assert!(errors.iter().any(|e| e.starts_with("advanceAmount")));
    }

    #[test]
    fn quantity_below_one_is_rejected() {
        let mut bad = payload();
        bad.order_content[0].quantity = 0;
        let errors = bad.validate();
        assert_eq!(errors, vec!["orderContent[0].quantity: must be at least 1"]);
    }

    #[test]
    fn status_round_trips_through_lowercase_names() {
        for (status, name) in [
            (OrderStatus::NotReady, "notready"),
            (OrderStatus::Ready, "ready"),
            (OrderStatus::Payed, "payed"),
        ] {
            assert_eq!(status.to_string(), name);
            assert_eq!(OrderStatus::from_str(name).unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(name.to_string())
            );
        }
    }

    #[test]
    fn midnight_and_last_minute_are_valid_times() {
        assert!(is_valid_time("00:00"));
        assert!(is_valid_time("23:59"));
        assert!(!is_valid_time("24:00"));
        assert!(!is_valid_time("9:30"));
        assert!(!is_valid_time("0930"));
    }
}
