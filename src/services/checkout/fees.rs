use crate::{
    entities::{order_method, payment_method},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Delivery and admin fee resolved for one checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FeeQuote {
    pub delivery_fee: Decimal,
    pub admin_fee: Decimal,
}

impl FeeQuote {
    pub fn total(&self) -> Decimal {
        self.delivery_fee + self.admin_fee
    }
}

#[derive(Debug, Error)]
pub enum FeeResolutionError {
    #[error("unknown order method {0}")]
    UnknownOrderMethod(i32),
    #[error("unknown payment method {0}")]
    UnknownPaymentMethod(i32),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<FeeResolutionError> for ServiceError {
    fn from(err: FeeResolutionError) -> Self {
        match err {
            FeeResolutionError::Database(e) => ServiceError::DatabaseError(e),
            other => ServiceError::InvalidFeeSelection(other.to_string()),
        }
    }
}

/// Looks up the fee attached to an order method and a payment method.
#[derive(Clone)]
pub struct FeeResolver {
    db: Arc<DatabaseConnection>,
}

impl FeeResolver {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// A method row with a NULL fee is free.
    #[instrument(skip(self))]
    pub async fn resolve_fees(
        &self,
        order_method_id: i32,
        payment_method_id: i32,
    ) -> Result<FeeQuote, FeeResolutionError> {
        let order_method = order_method::Entity::find_by_id(order_method_id)
            .one(&*self.db)
            .await?
            .ok_or(FeeResolutionError::UnknownOrderMethod(order_method_id))?;

        let payment_method = payment_method::Entity::find_by_id(payment_method_id)
            .one(&*self.db)
            .await?
            .ok_or(FeeResolutionError::UnknownPaymentMethod(payment_method_id))?;

        Ok(FeeQuote {
            delivery_fee: order_method.delivery_fee.unwrap_or(Decimal::ZERO),
            admin_fee: payment_method.admin_fee.unwrap_or(Decimal::ZERO),
        })
    }
}
