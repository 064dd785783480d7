use crate::{
    entities::{
        transaction::{self, TransactionStatus},
        transaction_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionSummary {
    pub id: i32,
    pub invoice_number: String,
    pub date_transaction: DateTime<Utc>,
    pub status: TransactionStatus,
    #[schema(value_type = String)]
    pub total_transaction: Decimal,
}

impl From<transaction::Model> for TransactionSummary {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            invoice_number: model.invoice_number,
            date_transaction: model.date_transaction,
            status: model.status,
            total_transaction: model.total_transaction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionLine {
    pub product_id: i32,
    pub product_name: String,
    #[schema(value_type = String)]
    pub product_price: Decimal,
    #[schema(value_type = String)]
    pub discount_percent: Decimal,
    pub size_name: String,
    #[schema(value_type = String)]
    pub size_cost: Decimal,
    pub variant_name: String,
    #[schema(value_type = String)]
    pub variant_cost: Decimal,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
}

impl From<transaction_item::Model> for TransactionLine {
    fn from(model: transaction_item::Model) -> Self {
        Self {
            product_id: model.product_id,
            product_name: model.product_name,
            product_price: model.product_price,
            discount_percent: model.discount_percent,
            size_name: model.size_name,
            size_cost: model.size_cost,
            variant_name: model.variant_name,
            variant_cost: model.variant_cost,
            quantity: model.quantity,
            subtotal: model.subtotal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionDetail {
    pub id: i32,
    pub invoice_number: String,
    pub date_transaction: DateTime<Utc>,
    pub status: TransactionStatus,
    pub full_name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
    pub payment_method_id: i32,
    pub order_method_id: i32,
    #[schema(value_type = String)]
    pub delivery_fee: Decimal,
    #[schema(value_type = String)]
    pub admin_fee: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub total_transaction: Decimal,
    pub items: Vec<TransactionLine>,
}

impl TransactionDetail {
    fn from_parts(header: transaction::Model, items: Vec<transaction_item::Model>) -> Self {
        Self {
            id: header.id,
            invoice_number: header.invoice_number,
            date_transaction: header.date_transaction,
            status: header.status,
            full_name: header.full_name,
            email: header.email,
            address: header.address,
            phone: header.phone,
            payment_method_id: header.payment_method_id,
            order_method_id: header.order_method_id,
            delivery_fee: header.delivery_fee,
            admin_fee: header.admin_fee,
            tax: header.tax,
            total_transaction: header.total_transaction,
            items: items.into_iter().map(TransactionLine::from).collect(),
        }
    }
}

/// Read access to committed transactions plus the status lifecycle.
#[derive(Clone)]
pub struct TransactionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl TransactionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// The user's transactions, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<TransactionSummary>, ServiceError> {
        let headers = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(user_id))
            .order_by_desc(transaction::Column::DateTransaction)
            .order_by_desc(transaction::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(headers.into_iter().map(TransactionSummary::from).collect())
    }

    /// Header and lines. Another user's transaction is reported as missing.
    #[instrument(skip(self))]
    pub async fn get_detail(
        &self,
        user_id: i32,
        transaction_id: i32,
    ) -> Result<TransactionDetail, ServiceError> {
        let header = transaction::Entity::find_by_id(transaction_id)
            .filter(transaction::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        let items = transaction_item::Entity::find()
            .filter(transaction_item::Column::TransactionId.eq(header.id))
            .order_by_asc(transaction_item::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(TransactionDetail::from_parts(header, items))
    }

    /// Moves a transaction along its lifecycle.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        transaction_id: i32,
        new_status: TransactionStatus,
        actor: i32,
    ) -> Result<TransactionSummary, ServiceError> {
        let txn = self.db.begin().await?;

        let header = transaction::Entity::find_by_id(transaction_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        let old_status = header.status;
        if old_status.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "transaction {} is already {}",
                transaction_id, old_status
            )));
        }
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move transaction {} from {} to {}",
                transaction_id, old_status, new_status
            )));
        }

        let mut active: transaction::ActiveModel = header.into();
        active.status = Set(new_status);
        active.updated_at = Set(Some(Utc::now()));
        active.updated_by = Set(Some(actor));
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(transaction_id, %old_status, %new_status, actor, "transaction status updated");
        self.event_sender
            .send_or_log(Event::TransactionStatusChanged {
                transaction_id,
                old_status,
                new_status,
                actor,
            });

        Ok(updated.into())
    }
}
