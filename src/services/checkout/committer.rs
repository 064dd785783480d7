use crate::{
    entities::{
        product,
        transaction::{self, TransactionStatus},
        transaction_item,
    },
    errors::{CommitStage, ServiceError},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, Set, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::{
    calculator::generate_invoice_number,
    cart::{ensure_positive_quantity, CartLine},
    fees::FeeQuote,
};

/// Contact fields after profile defaulting; all non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDetails {
    pub full_name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
}

/// Everything needed to write one order.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub user_id: i32,
    pub contact: ContactDetails,
    pub order_method_id: i32,
    pub payment_method_id: i32,
    pub fees: FeeQuote,
    pub tax: Decimal,
    pub total: Decimal,
    pub invoice_number: String,
    pub date_transaction: DateTime<Utc>,
    pub lines: Vec<CartLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTransaction {
    pub id: i32,
    pub invoice_number: String,
    pub date_transaction: DateTime<Utc>,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Writes the header, its lines and the stock decrements as one unit of work.
#[derive(Clone)]
pub struct TransactionCommitter {
    db: Arc<DatabaseConnection>,
    max_attempts: u32,
}

impl TransactionCommitter {
    pub fn new(db: Arc<DatabaseConnection>, max_attempts: u32) -> Self {
        Self {
            db,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Commits the draft or leaves storage untouched.
    ///
    /// An invoice number that already exists is the one failure that is
    /// re-attempted: the unit of work has rolled back, so a fresh number is
    /// drawn and everything is written again, up to `max_attempts` times.
    #[instrument(skip(self, draft), fields(user_id = draft.user_id, lines = draft.lines.len()))]
    pub async fn commit(
        &self,
        draft: &TransactionDraft,
    ) -> Result<CommittedTransaction, ServiceError> {
        for line in &draft.lines {
            ensure_positive_quantity(line.product_id, line.quantity)?;
        }

        let mut invoice_number = draft.invoice_number.clone();
        let mut attempt = 1;

        loop {
            match self.commit_once(draft, &invoice_number).await {
                Ok(committed) => return Ok(committed),
                Err(ServiceError::PersistenceFailure {
                    stage: CommitStage::HeaderInsert,
                    source,
                }) if is_unique_violation(&source) && attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        invoice_number = %invoice_number,
                        "invoice number already taken, drawing a new one"
                    );
                    counter!("storefront_checkout.invoice_collisions", 1);
                    invoice_number = generate_invoice_number(
                        draft.date_transaction.date_naive(),
                        &mut rand::thread_rng(),
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn commit_once(
        &self,
        draft: &TransactionDraft,
        invoice_number: &str,
    ) -> Result<CommittedTransaction, ServiceError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(ServiceError::persistence(CommitStage::Begin))?;
        counter!("storefront_db.txn_begin", 1);

        match write_order(&txn, draft, invoice_number).await {
            Ok(header) => {
                txn.commit()
                    .await
                    .map_err(ServiceError::persistence(CommitStage::Commit))?;
                counter!("storefront_db.txn_commit", 1);
                debug!(transaction_id = header.id, "unit of work committed");

                Ok(CommittedTransaction {
                    id: header.id,
                    invoice_number: header.invoice_number,
                    date_transaction: header.date_transaction,
                })
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "explicit rollback failed; connection drop will discard the work");
                }
                counter!("storefront_db.txn_rollback", 1);
                Err(err)
            }
        }
    }
}

async fn write_order(
    txn: &DatabaseTransaction,
    draft: &TransactionDraft,
    invoice_number: &str,
) -> Result<transaction::Model, ServiceError> {
    let now = Utc::now();

    let header = transaction::ActiveModel {
        user_id: Set(draft.user_id),
        invoice_number: Set(invoice_number.to_string()),
        date_transaction: Set(draft.date_transaction),
        full_name: Set(draft.contact.full_name.clone()),
        email: Set(draft.contact.email.clone()),
        address: Set(draft.contact.address.clone()),
        phone: Set(draft.contact.phone.clone()),
        payment_method_id: Set(draft.payment_method_id),
        order_method_id: Set(draft.order_method_id),
        delivery_fee: Set(draft.fees.delivery_fee),
        admin_fee: Set(draft.fees.admin_fee),
        tax: Set(draft.tax),
        total_transaction: Set(draft.total),
        status: Set(TransactionStatus::InProgress),
        created_at: Set(now),
        created_by: Set(draft.user_id),
        updated_at: Set(None),
        updated_by: Set(None),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(ServiceError::persistence(CommitStage::HeaderInsert))?;

    for line in &draft.lines {
        transaction_item::ActiveModel {
            transaction_id: Set(header.id),
            product_id: Set(line.product_id),
            product_name: Set(line.product_name.clone()),
            product_price: Set(line.unit_price),
            discount_percent: Set(line.discount_percent),
            size_name: Set(line.size.name.clone()),
            size_cost: Set(line.size.extra_cost),
            variant_name: Set(line.variant.name.clone()),
            variant_cost: Set(line.variant.extra_cost),
            quantity: Set(line.quantity),
            subtotal: Set(line.subtotal),
            created_at: Set(now),
            created_by: Set(draft.user_id),
            updated_at: Set(None),
            updated_by: Set(None),
            ..Default::default()
        }
        .insert(txn)
        .await
        .map_err(ServiceError::persistence(CommitStage::LineInsert))?;

        decrement_stock(txn, line.product_id, line.quantity).await?;
    }

    Ok(header)
}

/// `stock = stock - qty` only where enough stock remains.
async fn decrement_stock(
    txn: &DatabaseTransaction,
    product_id: i32,
    quantity: i32,
) -> Result<(), ServiceError> {
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).sub(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Some(Utc::now())))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::Stock.gte(quantity))
        .exec(txn)
        .await
        .map_err(ServiceError::persistence(CommitStage::StockUpdate))?;

    if result.rows_affected == 0 {
        return Err(ServiceError::InsufficientStock {
            product_id,
            requested: quantity,
        });
    }

    Ok(())
}
