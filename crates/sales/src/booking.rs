use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use doyashop_core::{require_email, DocumentId, DomainError, DomainResult, Entity, Price};

/// Payment status of a booking. Only ever moves unpaid → paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl From<PaymentStatus> for Value {
    fn from(value: PaymentStatus) -> Self {
        Value::String(value.as_str().to_string())
    }
}

/// A buyer's reservation of a listing, later confirmed by payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(alias = "phoneId")]
    pub listing_id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    /// Buyer email.
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_location: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub payment: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_id: Option<String>,
    pub booked_at: DateTime<Utc>,
}

impl Booking {
    pub const EMAIL: &'static str = "email";
    pub const PAYMENT: &'static str = "payment";
    pub const TRANS_ID: &'static str = "transId";

    /// Place a new unpaid booking for `buyer_email`.
    pub fn place(
        id: DocumentId,
        buyer_email: &str,
        req: NewBooking,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        require_email("email", buyer_email)?;

        Ok(Self {
            id,
            listing_id: req.listing_id,
            item_name: req.item_name,
            email: buyer_email.trim().to_string(),
            buyer_name: req.buyer_name,
            contact: req.contact,
            meeting_location: req.meeting_location,
            price: req.price,
            payment: PaymentStatus::Unpaid,
            trans_id: None,
            booked_at: now,
        })
    }

    pub fn is_paid(&self) -> bool {
        self.payment == PaymentStatus::Paid
    }

    /// Fails with `Conflict` once the booking has been paid.
    pub fn ensure_payable(&self) -> DomainResult<()> {
        if self.is_paid() {
            return Err(DomainError::conflict(format!("booking {} is already paid", self.id)));
        }
        Ok(())
    }

    /// Apply the unpaid → paid transition.
    pub fn mark_paid(&mut self, trans_id: &str) -> DomainResult<()> {
        self.ensure_payable()?;
        self.payment = PaymentStatus::Paid;
        self.trans_id = Some(trans_id.to_string());
        Ok(())
    }
}

impl Entity for Booking {
    fn id(&self) -> DocumentId {
        self.id
    }
}

/// Booking creation payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    #[serde(alias = "phoneId")]
    pub listing_id: DocumentId,
    /// Buyer email; defaults to the authenticated identity.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub meeting_location: Option<String>,
    pub price: Price,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking() -> Booking {
        let req = NewBooking {
            listing_id: DocumentId::new(),
            email: None,
            item_name: Some("Pixel 7".to_string()),
            buyer_name: None,
            contact: None,
            meeting_location: None,
            price: Price::new(320.0).unwrap(),
        };
        Booking::place(DocumentId::new(), "b@x.com", req, Utc::now()).unwrap()
    }

    #[test]
    fn new_booking_is_unpaid() {
        let b = booking();
        assert_eq!(b.payment, PaymentStatus::Unpaid);
        assert!(b.trans_id.is_none());
        assert!(b.ensure_payable().is_ok());
    }

    #[test]
    fn paid_is_terminal() {
        let mut b = booking();
        b.mark_paid("pi_123").unwrap();
        assert!(b.is_paid());
        assert_eq!(b.trans_id.as_deref(), Some("pi_123"));

        let err = b.mark_paid("pi_456").unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(b.trans_id.as_deref(), Some("pi_123"));
        assert!(b.is_paid());
    }

    #[test]
    fn legacy_phone_id_field_is_accepted() {
        let listing_id = DocumentId::new();
        let json = serde_json::json!({ "phoneId": listing_id.to_string(), "price": 99.5 });
        let req: NewBooking = serde_json::from_value(json).unwrap();
        assert_eq!(req.listing_id, listing_id);
    }

    #[test]
    fn stored_shape() {
        let mut b = booking();
        b.mark_paid("pi_1").unwrap();
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json[Booking::PAYMENT], "paid");
        assert_eq!(json[Booking::TRANS_ID], "pi_1");
        assert_eq!(json[Booking::EMAIL], "b@x.com");
    }
}
