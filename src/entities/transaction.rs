use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Order header created once per successful checkout.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    #[sea_orm(unique)]
    pub invoice_number: String,
    pub date_transaction: DateTime<Utc>,
    pub full_name: String,
    pub email: String,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    pub phone: String,
    pub payment_method_id: i32,
    pub order_method_id: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub delivery_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub admin_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub tax: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_transaction: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: i32,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_item::Entity")]
    TransactionItems,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::transaction_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionItems.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Transaction lifecycle status
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl TransactionStatus {
    /// Whether a header in `self` may move to `next`.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (InProgress, Processing)
                | (InProgress, Cancelled)
                | (Processing, Delivered)
                | (Processing, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Delivered | TransactionStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::TransactionStatus::{self, *};
    use rstest::rstest;

    #[rstest]
    #[case(InProgress, Processing, true)]
    #[case(InProgress, Cancelled, true)]
    #[case(InProgress, Delivered, false)]
    #[case(Processing, Delivered, true)]
    #[case(Processing, Cancelled, true)]
    #[case(Processing, InProgress, false)]
    #[case(Delivered, Cancelled, false)]
    #[case(Cancelled, Processing, false)]
    fn status_transitions(
        #[case] from: TransactionStatus,
        #[case] to: TransactionStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn display_matches_stored_value() {
        assert_eq!(InProgress.to_string(), "in_progress");
        assert_eq!(Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn terminal_states() {
        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!InProgress.is_terminal());
    }
}
