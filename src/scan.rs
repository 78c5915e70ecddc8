//! Scanned bill input.
//!
//! Receipt capture and text extraction live outside this crate. Whatever does
//! that work hands over a `BillPayload`, through the `BillScanner` trait or as
//! JSON:
//!
//! ```text
//! { "items": [ { "name", "quantity", "unitPrice", "totalPrice" } ], "tax": 0, "serviceFee": 0 }
//! ```
//!
//! A payload is validated before any of it reaches the store.

use crate::error::{Error, Result};
use crate::model::{Item, Money};
use serde::{Deserialize, Serialize};

/// Structured bill produced by a scanner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillPayload {
    pub items: Vec<Item>,
    #[serde(default)]
    pub tax: Money,
    #[serde(default)]
    pub service_fee: Money,
}

impl BillPayload {
    pub fn new(items: Vec<Item>, tax: Money, service_fee: Money) -> Self {
        BillPayload {
            items,
            tax,
            service_fee,
        }
    }

    /// Parse a JSON payload. Items without an id are numbered `item1`, `item2`, ...
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError`: malformed JSON or a payload failing `validate()`
    pub fn from_json(json: &str) -> Result<Self> {
        let mut payload: BillPayload = serde_json::from_str(json)
            .map_err(|e| Error::ValidationError(format!("unreadable bill payload: {}", e)))?;

        for (index, item) in payload.items.iter_mut().enumerate() {
            if item.id.is_empty() {
                item.id = format!("item{}", index + 1);
            }
        }

        payload.validate()?;
        Ok(payload)
    }

    /// Validity predicate: every item passes `Item::check`, tax and service
    /// fee are not negative, and the bill total fits in `Money`.
    pub fn validate(&self) -> Result<()> {
        self.checked_totals().map(|_| ())
    }

    /// `(subtotal, total)` of a valid bill.
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError`: the predicate of `validate()` fails
    pub fn checked_totals(&self) -> Result<(Money, Money)> {
        for item in &self.items {
            item.check()?;
        }
        if self.tax < 0 {
            return Err(Error::ValidationError(format!(
                "negative tax {}",
                self.tax
            )));
        }
        if self.service_fee < 0 {
            return Err(Error::ValidationError(format!(
                "negative service fee {}",
                self.service_fee
            )));
        }

        let overflow = || Error::ValidationError("bill total does not fit in an amount".to_string());
        let subtotal = self
            .items
            .iter()
            .try_fold(0 as Money, |sum, item| sum.checked_add(item.total_price))
            .ok_or_else(overflow)?;
        let total = subtotal
            .checked_add(self.tax)
            .and_then(|sum| sum.checked_add(self.service_fee))
            .ok_or_else(overflow)?;
        Ok((subtotal, total))
    }

    /// Sum of item totals, `None` on overflow.
    pub fn subtotal(&self) -> Option<Money> {
        self.items
            .iter()
            .try_fold(0 as Money, |sum, item| sum.checked_add(item.total_price))
    }
}

/// Source of scanned bills.
///
/// # Example
///
/// ```no_run
/// use split_kit::scan::{BillPayload, BillScanner};
///
/// struct ReceiptService {
///     endpoint: String,
/// }
///
/// impl BillScanner for ReceiptService {
///     async fn scan(&self) -> split_kit::Result<BillPayload> {
///         // Call the OCR service at `self.endpoint` and parse its reply.
///         BillPayload::from_json(r#"{"items": [], "tax": 0, "serviceFee": 0}"#)
///     }
/// }
/// ```
#[allow(async_fn_in_trait)]
pub trait BillScanner: Send + Sync {
    /// Produce the next bill.
    ///
    /// # Errors
    /// Returns `Err` if the scan fails or its output is malformed
    async fn scan(&self) -> Result<BillPayload>;

    /// Optional: Validate the scanned bill before use.
    fn validate(&self, payload: &BillPayload) -> Result<()> {
        payload.validate()
    }
}

/// Scanner that hands back a bill typed in by hand.
#[derive(Clone, Debug, Default)]
pub struct ManualEntry {
    pub payload: BillPayload,
}

impl ManualEntry {
    pub fn new(payload: BillPayload) -> Self {
        ManualEntry { payload }
    }
}

impl BillScanner for ManualEntry {
    async fn scan(&self) -> Result<BillPayload> {
        Ok(self.payload.clone())
    }
}
