use crate::{
    entities::{cart, product, product_size, product_variant},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::calculator::round_money;

/// Size or variant chosen on a cart line. Absent options have an empty name
/// and cost nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineOption {
    pub name: String,
    pub extra_cost: Decimal,
}

/// Snapshot of one cart line taken when a checkout starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub cart_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub size: LineOption,
    pub variant: LineOption,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// Price of `quantity` units after the percentage discount and option adders.
pub fn line_subtotal(
    unit_price: Decimal,
    discount_percent: Decimal,
    size_cost: Decimal,
    variant_cost: Decimal,
    quantity: i32,
) -> Decimal {
    let hundred = Decimal::ONE_HUNDRED;
    let discounted = unit_price * (hundred - discount_percent) / hundred;
    round_money((discounted + size_cost + variant_cost) * Decimal::from(quantity))
}

/// Cart lines must order at least one unit.
pub fn ensure_positive_quantity(product_id: i32, quantity: i32) -> Result<(), ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::InvalidQuantity {
            product_id,
            quantity,
        });
    }
    Ok(())
}

/// Reads the caller's cart as an immutable list of priced lines.
#[derive(Clone)]
pub struct CartSnapshotReader {
    db: Arc<DatabaseConnection>,
}

impl CartSnapshotReader {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lines come back in the order they were added. An empty cart is not an
    /// error here.
    #[instrument(skip(self))]
    pub async fn read_cart(&self, user_id: i32) -> Result<Vec<CartLine>, ServiceError> {
        let rows = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .order_by_asc(cart::Column::Id)
            .all(&*self.db)
            .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: HashSet<i32> = rows.iter().map(|row| row.product_id).collect();
        let size_ids: HashSet<i32> = rows.iter().filter_map(|row| row.size_id).collect();
        let variant_ids: HashSet<i32> = rows.iter().filter_map(|row| row.variant_id).collect();

        let products: HashMap<i32, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let sizes: HashMap<i32, product_size::Model> = if size_ids.is_empty() {
            HashMap::new()
        } else {
            product_size::Entity::find()
                .filter(product_size::Column::Id.is_in(size_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|s| (s.id, s))
                .collect()
        };

        let variants: HashMap<i32, product_variant::Model> = if variant_ids.is_empty() {
            HashMap::new()
        } else {
            product_variant::Entity::find()
                .filter(product_variant::Column::Id.is_in(variant_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|v| (v.id, v))
                .collect()
        };

        let lines = rows
            .into_iter()
            .map(|row| {
                ensure_positive_quantity(row.product_id, row.quantity)?;

                let product = products.get(&row.product_id).ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Product {} referenced by cart line {} not found",
                        row.product_id, row.id
                    ))
                })?;

                let size = row
                    .size_id
                    .and_then(|id| sizes.get(&id))
                    .map(|s| LineOption {
                        name: s.name.clone(),
                        extra_cost: s.additional_price,
                    })
                    .unwrap_or_default();
                let variant = row
                    .variant_id
                    .and_then(|id| variants.get(&id))
                    .map(|v| LineOption {
                        name: v.name.clone(),
                        extra_cost: v.additional_price,
                    })
                    .unwrap_or_default();

                let subtotal = line_subtotal(
                    product.price,
                    product.discount_percent,
                    size.extra_cost,
                    variant.extra_cost,
                    row.quantity,
                );

                Ok(CartLine {
                    cart_id: row.id,
                    product_id: product.id,
                    product_name: product.name.clone(),
                    unit_price: product.price,
                    discount_percent: product.discount_percent,
                    size,
                    variant,
                    quantity: row.quantity,
                    subtotal,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        debug!(user_id, lines = lines.len(), "cart snapshot taken");
        Ok(lines)
    }
}
