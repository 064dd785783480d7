use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::entities::transaction::TransactionStatus;

/// Domain events published after state has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    TransactionCreated {
        transaction_id: i32,
        user_id: i32,
        invoice_number: String,
        total: Decimal,
        line_count: usize,
        at: DateTime<Utc>,
    },
    TransactionStatusChanged {
        transaction_id: i32,
        old_status: TransactionStatus,
        new_status: TransactionStatus,
        actor: i32,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::TransactionCreated { .. } => "transaction_created",
            Event::TransactionStatusChanged { .. } => "transaction_status_changed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends without waiting for capacity. Delivery problems are logged and
    /// swallowed because the state the event describes is already durable.
    pub fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.sender.try_send(event) {
            warn!(event = name, error = %e, "dropping domain event");
            metrics::counter!("storefront_events.dropped", 1);
        }
    }
}

/// Background consumer; runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::TransactionCreated {
                transaction_id,
                user_id,
                invoice_number,
                total,
                line_count,
                ..
            } => info!(
                transaction_id,
                user_id,
                invoice_number = %invoice_number,
                total = %total,
                line_count,
                "transaction created"
            ),
            Event::TransactionStatusChanged {
                transaction_id,
                old_status,
                new_status,
                actor,
            } => info!(
                transaction_id,
                old_status = %old_status,
                new_status = %new_status,
                actor,
                "transaction status changed"
            ),
        }
        metrics::counter!("storefront_events.processed", 1, "event" => event.name());
    }

    info!("Event processing loop stopped");
}
