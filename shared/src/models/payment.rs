//! Payment and Receipt Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult, ErrorCode};

/// Payment method accepted by `process_payment`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Mobile,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "mobile" => Ok(Self::Mobile),
            other => {
                Err(AppError::new(ErrorCode::PaymentInvalidMethod).with_detail("method", other))
            }
        }
    }
}

/// Payment attached to a paid order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInfo {
    pub id: i64,
    pub method: String,
    #[serde(default)]
    pub method_display: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_by_name: Option<String>,
    #[serde(default)]
    pub received_amount: Option<Decimal>,
    #[serde(default)]
    pub change_amount: Option<Decimal>,
    #[serde(default)]
    pub mobile_provider: Option<String>,
}

impl PaymentInfo {
    /// `paid_at` if present, otherwise `timestamp`
    pub fn paid_time(&self) -> Option<DateTime<Utc>> {
        self.paid_at.or(self.timestamp)
    }
}

/// `process_payment` request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    /// Sent as a JSON number
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub received_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_provider: Option<String>,
}

impl PaymentRequest {
    /// Build a cashier payment
    ///
    /// Mobile payments need a provider; cash payments need a positive
    /// received amount that covers `final_price`.
    pub fn for_cashier(
        method: PaymentMethod,
        received: Option<Decimal>,
        provider: Option<&str>,
        final_price: Decimal,
    ) -> AppResult<Self> {
        match method {
            PaymentMethod::Mobile => {
                let provider = provider
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| AppError::new(ErrorCode::PaymentProviderRequired))?;
                Ok(Self {
                    method,
                    received_amount: None,
                    mobile_provider: Some(provider.to_string()),
                })
            }
            PaymentMethod::Cash => {
                let received = received
                    .filter(|r| *r > Decimal::ZERO)
                    .ok_or_else(|| {
                        AppError::required("received_amount", "Enter the cash amount received")
                    })?;
                ensure_covers(received, final_price)?;
                Ok(Self {
                    method,
                    received_amount: Some(received),
                    mobile_provider: None,
                })
            }
            PaymentMethod::Card => Ok(Self {
                method,
                received_amount: None,
                mobile_provider: None,
            }),
        }
    }

    /// Build a courier payment
    ///
    /// Only cash is checked: the received amount must cover `total`.
    pub fn for_delivery(
        method: PaymentMethod,
        received: Option<Decimal>,
        total: Decimal,
    ) -> AppResult<Self> {
        let received_amount = match method {
            PaymentMethod::Cash => {
                let received = received.ok_or_else(|| {
                    AppError::with_message(
                        ErrorCode::PaymentInsufficientAmount,
                        "Cash received is missing or does not cover the total",
                    )
                })?;
                ensure_covers(received, total)?;
                Some(received)
            }
            _ => None,
        };
        Ok(Self {
            method,
            received_amount,
            mobile_provider: None,
        })
    }
}

fn ensure_covers(received: Decimal, total: Decimal) -> AppResult<()> {
    if received < total {
        return Err(AppError::new(ErrorCode::PaymentInsufficientAmount)
            .with_detail("received", received.to_string())
            .with_detail("total", total.to_string()));
    }
    Ok(())
}

/// Change to hand back; zero when the amount does not cover the price
pub fn change_due(received: Decimal, price: Decimal) -> Decimal {
    if received < price {
        Decimal::ZERO
    } else {
        received - price
    }
}

/// Receipt line
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReceiptLine {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub total_item_price: Option<Decimal>,
}

/// Printable receipt for a paid order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    #[serde(default)]
    pub restaurant_name: Option<String>,
    #[serde(default)]
    pub restaurant_address: Option<String>,
    #[serde(default)]
    pub restaurant_phone: Option<String>,
    #[serde(default)]
    pub restaurant_inn: Option<String>,
    #[serde(default)]
    pub cashier_name: Option<String>,
    #[serde(default)]
    pub payment_time: Option<String>,
    #[serde(default)]
    pub check_number: Option<String>,
    #[serde(default)]
    pub order_type_display: Option<String>,
    #[serde(default)]
    pub items: Vec<ReceiptLine>,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub service_fee_percent: Option<Decimal>,
    #[serde(default)]
    pub service_fee_amount: Option<Decimal>,
    #[serde(default)]
    pub tax_percent: Option<Decimal>,
    #[serde(default)]
    pub tax_amount: Option<Decimal>,
    #[serde(default)]
    pub final_price: Option<Decimal>,
    #[serde(default)]
    pub payment_method_display: Option<String>,
    #[serde(default)]
    pub received_amount: Option<Decimal>,
    #[serde(default)]
    pub change_amount: Option<Decimal>,
}
