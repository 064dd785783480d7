pub mod checkout;
pub mod common;
pub mod transactions;

use crate::events::EventSender;
use crate::services::{CheckoutService, TransactionService};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<CheckoutService>,
    pub transactions: Arc<TransactionService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        invoice_max_attempts: u32,
    ) -> Self {
        Self {
            checkout: Arc::new(CheckoutService::new(
                db.clone(),
                event_sender.clone(),
                invoice_max_attempts,
            )),
            transactions: Arc::new(TransactionService::new(db, event_sender)),
        }
    }
}
