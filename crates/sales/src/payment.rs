use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use doyashop_core::{require_non_blank, DocumentId, DomainResult, Entity, Price};

use crate::booking::{Booking, PaymentStatus};

/// Append-only payment log entry. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub booking_id: DocumentId,
    pub trans_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(id: DocumentId, req: NewPayment, now: DateTime<Utc>) -> DomainResult<Self> {
        require_non_blank("transId", &req.trans_id)?;
        Ok(Self {
            id,
            booking_id: req.booking_id,
            trans_id: req.trans_id.trim().to_string(),
            price: req.price,
            email: req.email,
            paid_at: now,
        })
    }

    /// Fields written onto the referenced booking when this payment settles it.
    pub fn settlement_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(Booking::PAYMENT.to_string(), PaymentStatus::Paid.into());
        fields.insert(Booking::TRANS_ID.to_string(), Value::String(self.trans_id.clone()));
        fields
    }
}

impl Entity for PaymentRecord {
    fn id(&self) -> DocumentId {
        self.id
    }
}

/// Payment confirmation payload sent after the client completes the charge.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub booking_id: DocumentId,
    pub trans_id: String,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_marks_paid_with_transaction() {
        let req = NewPayment {
            booking_id: DocumentId::new(),
            trans_id: " pi_42 ".to_string(),
            price: None,
            email: None,
        };
        let record = PaymentRecord::new(DocumentId::new(), req, Utc::now()).unwrap();
        let fields = record.settlement_fields();

        assert_eq!(fields[Booking::PAYMENT], "paid");
        assert_eq!(fields[Booking::TRANS_ID], "pi_42");
    }

    #[test]
    fn transaction_id_is_required() {
        let req = NewPayment {
            booking_id: DocumentId::new(),
            trans_id: "".to_string(),
            price: None,
            email: None,
        };
        assert!(PaymentRecord::new(DocumentId::new(), req, Utc::now()).is_err());
    }
}
