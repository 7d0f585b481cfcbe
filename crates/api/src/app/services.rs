use std::sync::Arc;

use chrono::{DateTime, Utc};

use doyashop_auth::{Account, Hs256Jwt};
use doyashop_catalog::{Category, Listing};
use doyashop_core::DocumentId;
use doyashop_infra::{
    Collection, DocumentStore, Filter, InsertResult, PaymentGateway, StoreError, WriteOutcome,
};
use doyashop_sales::{Booking, NewPayment, PaymentRecord, PaymentStatus};

use crate::app::errors::ApiError;

pub const USERS: &str = "users";
pub const CATEGORIES: &str = "categories";
pub const PHONES: &str = "phones";
pub const BOOKINGS: &str = "booking";
pub const PAYMENTS: &str = "payments";

/// Shared handles injected into every handler.
pub struct AppServices {
    pub accounts: Collection<Account>,
    pub categories: Collection<Category>,
    pub listings: Collection<Listing>,
    pub bookings: Collection<Booking>,
    pub payments: Collection<PaymentRecord>,
    pub jwt: Arc<Hs256Jwt>,
    pub gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn DocumentStore>,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        jwt: Hs256Jwt,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            accounts: Collection::new(store.clone(), USERS),
            categories: Collection::new(store.clone(), CATEGORIES),
            listings: Collection::new(store.clone(), PHONES),
            bookings: Collection::new(store.clone(), BOOKINGS),
            payments: Collection::new(store.clone(), PAYMENTS),
            jwt: Arc::new(jwt),
            gateway,
            store,
        }
    }

    pub async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.accounts.find_one(&Filter::all().eq(Account::EMAIL, email)).await
    }

    /// Append the payment record and mark its booking paid, atomically.
    ///
    /// An absent booking is 404 and an already paid one 409; a booking paid
    /// concurrently fails the batch precondition and nothing is written.
    pub async fn record_payment(
        &self,
        req: NewPayment,
        now: DateTime<Utc>,
    ) -> Result<InsertResult, ApiError> {
        let booking = self
            .bookings
            .get(req.booking_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("booking {} not found", req.booking_id)))?;
        booking.ensure_payable()?;

        let record = PaymentRecord::new(DocumentId::new(), req, now)?;
        let guard = Filter::by_id(booking.id).eq(Booking::PAYMENT, PaymentStatus::Unpaid);

        let outcomes = self
            .store
            .apply_batch(vec![
                self.payments.insert_op(&record)?,
                self.bookings.set_op(guard, record.settlement_fields(), true),
            ])
            .await
            .map_err(|e| match e {
                StoreError::PreconditionFailed(_) => {
                    ApiError::Conflict(format!("booking {} is already paid", booking.id))
                }
                other => ApiError::Store(other),
            })?;

        tracing::info!(booking_id = %booking.id, trans_id = %record.trans_id, "booking paid");

        match outcomes.into_iter().next() {
            Some(WriteOutcome::Inserted(result)) => Ok(result),
            _ => Err(ApiError::Internal("payment batch returned no insert result".to_string())),
        }
    }
}
