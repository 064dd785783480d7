//! Checkout pipeline: turns a user's cart into a committed, priced and
//! stock-adjusted transaction.
//!
//! The stages run strictly in order:
//! `Validating -> ResolvingFees -> ReadingCart -> Computing -> Committing -> Done`.
//! Any stage may fail; nothing is written unless `Committing` succeeds.

pub mod calculator;
pub mod cart;
pub mod committer;
pub mod fees;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    services::profile::{Profile, ProfileService},
};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

pub use calculator::{compute_totals, generate_invoice_number, CheckoutTotals, TAX_RATE};
pub use cart::{CartLine, CartSnapshotReader, LineOption};
pub use committer::{CommittedTransaction, ContactDetails, TransactionCommitter, TransactionDraft};
pub use fees::{FeeQuote, FeeResolutionError, FeeResolver};

/// Checkout input. A contact field that is absent (or null) takes the value
/// stored on the user's profile; a field that is present is used as given.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[validate(length(max = 255))]
    pub full_name: Option<String>,
    #[validate(length(max = 255))]
    pub email: Option<String>,
    #[validate(length(max = 1000))]
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(range(min = 1))]
    pub payment_method_id: i32,
    #[validate(range(min = 1))]
    pub order_method_id: i32,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutReceipt {
    pub transaction_id: i32,
    pub invoice_number: String,
    pub date_transaction: DateTime<Utc>,
    #[schema(value_type = String, example = "10.00")]
    pub delivery_fee: Decimal,
    #[schema(value_type = String, example = "2.00")]
    pub admin_fee: Decimal,
    #[schema(value_type = String, example = "15.00")]
    pub tax: Decimal,
    #[schema(value_type = String, example = "177.00")]
    pub total_transaction: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CheckoutStage {
    Validating,
    ResolvingFees,
    ReadingCart,
    Computing,
    Committing,
    Done,
}

/// Applies profile defaults to the request's contact fields.
pub fn merge_contact(
    request: &CheckoutRequest,
    profile: &Profile,
) -> Result<ContactDetails, ServiceError> {
    fn pick(given: &Option<String>, stored: &Option<String>) -> String {
        given
            .as_ref()
            .or(stored.as_ref())
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    }

    let contact = ContactDetails {
        full_name: pick(&request.full_name, &profile.full_name),
        email: pick(&request.email, &profile.email),
        address: pick(&request.address, &profile.address),
        phone: pick(&request.phone, &profile.phone),
    };

    let missing: Vec<&'static str> = [
        ("full_name", &contact.full_name),
        ("email", &contact.email),
        ("address", &contact.address),
        ("phone", &contact.phone),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(name, _)| name)
    .collect();

    if !missing.is_empty() {
        return Err(ServiceError::IncompletePaymentInfo { missing });
    }

    if !validator::validate_email(contact.email.as_str()) {
        return Err(ServiceError::ValidationError(format!(
            "'{}' is not a valid email address",
            contact.email
        )));
    }

    Ok(contact)
}

/// Sequences profile defaulting, fee lookup, cart read, pricing and commit.
#[derive(Clone)]
pub struct CheckoutService {
    profiles: ProfileService,
    fees: FeeResolver,
    carts: CartSnapshotReader,
    committer: TransactionCommitter,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        invoice_max_attempts: u32,
    ) -> Self {
        Self {
            profiles: ProfileService::new(db.clone()),
            fees: FeeResolver::new(db.clone()),
            carts: CartSnapshotReader::new(db.clone()),
            committer: TransactionCommitter::new(db, invoice_max_attempts),
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(order_method_id = request.order_method_id, payment_method_id = request.payment_method_id))]
    pub async fn checkout(
        &self,
        user_id: i32,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, ServiceError> {
        let started = Instant::now();
        let mut stage = CheckoutStage::Validating;

        let result = self.run(user_id, &request, &mut stage).await;
        histogram!("storefront_checkout.duration", started.elapsed());

        match &result {
            Ok(receipt) => {
                counter!("storefront_checkout.completed", 1);
                info!(
                    user_id,
                    transaction_id = receipt.transaction_id,
                    invoice_number = %receipt.invoice_number,
                    total = %receipt.total_transaction,
                    "checkout completed"
                );
            }
            Err(err) => {
                counter!("storefront_checkout.failed", 1, "stage" => stage.to_string(), "code" => err.code());
                warn!(user_id, stage = %stage, error = %err, "checkout failed");
            }
        }

        result
    }

    async fn run(
        &self,
        user_id: i32,
        request: &CheckoutRequest,
        stage: &mut CheckoutStage,
    ) -> Result<CheckoutReceipt, ServiceError> {
        request.validate()?;
        let profile = self.profiles.get_profile(user_id).await?;
        let contact = merge_contact(request, &profile)?;

        *stage = CheckoutStage::ResolvingFees;
        let fees = self
            .fees
            .resolve_fees(request.order_method_id, request.payment_method_id)
            .await?;

        *stage = CheckoutStage::ReadingCart;
        let lines = self.carts.read_cart(user_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        *stage = CheckoutStage::Computing;
        let now = Utc::now();
        let totals = compute_totals(&lines, &fees, now.date_naive(), &mut rand::thread_rng());

        *stage = CheckoutStage::Committing;
        let line_count = lines.len();
        let draft = TransactionDraft {
            user_id,
            contact,
            order_method_id: request.order_method_id,
            payment_method_id: request.payment_method_id,
            fees,
            tax: totals.tax,
            total: totals.total,
            invoice_number: totals.invoice_number,
            date_transaction: now,
            lines,
        };
        let committed = self.committer.commit(&draft).await?;

        *stage = CheckoutStage::Done;
        self.event_sender.send_or_log(Event::TransactionCreated {
            transaction_id: committed.id,
            user_id,
            invoice_number: committed.invoice_number.clone(),
            total: totals.total,
            line_count,
            at: committed.date_transaction,
        });

        Ok(CheckoutReceipt {
            transaction_id: committed.id,
            invoice_number: committed.invoice_number,
            date_transaction: committed.date_transaction,
            delivery_fee: fees.delivery_fee,
            admin_fee: fees.admin_fee,
            tax: totals.tax,
            total_transaction: totals.total,
        })
    }
}
