//! Event publishing boundary
//!
//! The engine never publishes anything itself. It returns the pending
//! [`TransactionCompleted`] events with its outcome, and the [`Dispatcher`]
//! hands them to an [`EventPublisher`] after the atomic unit has committed.
//! A failed delivery is logged and counted, never propagated: the transfer
//! has already happened.

use crate::types::event::TransactionCompleted;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Failure to hand an event to its delivery channel
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PublishError {
    /// The receiving side of the channel is gone
    #[error("Channel {channel} is closed")]
    Closed {
        /// Channel the event was addressed to
        channel: String,
    },

    /// The transport refused the event
    #[error("Event rejected: {message}")]
    Rejected {
        /// Transport-provided reason
        message: String,
    },
}

/// Sink for domain events
pub trait EventPublisher: Send + Sync {
    /// Deliver one event
    fn publish(&self, event: &TransactionCompleted) -> Result<(), PublishError>;
}

/// Publisher that only writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

impl EventPublisher for LogPublisher {
    fn publish(&self, event: &TransactionCompleted) -> Result<(), PublishError> {
        tracing::info!(
            channel = %event.channel(),
            transaction_id = %event.transaction.id,
            role = ?event.role,
            balance = %event.balance,
            "transaction completed"
        );
        Ok(())
    }
}

/// Publisher feeding an unbounded tokio channel
///
/// The receiving half belongs to whatever real-time transport fans events
/// out to subscribers.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: UnboundedSender<TransactionCompleted>,
}

impl ChannelPublisher {
    /// Create a publisher and the receiver for its events
    pub fn channel() -> (Self, UnboundedReceiver<TransactionCompleted>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: &TransactionCompleted) -> Result<(), PublishError> {
        self.sender
            .send(event.clone())
            .map_err(|_| PublishError::Closed {
                channel: event.channel(),
            })
    }
}

/// Counts from one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Delivers pending events outside any atomic unit
#[derive(Clone)]
pub struct Dispatcher {
    publisher: Arc<dyn EventPublisher>,
}

impl Dispatcher {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    /// Publish every event, logging failures instead of returning them
    pub fn dispatch(&self, events: &[TransactionCompleted]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for event in events {
            match self.publisher.publish(event) {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    report.failed += 1;
                    tracing::warn!(
                        channel = %event.channel(),
                        transaction_id = %event.transaction.id,
                        %error,
                        "failed to publish transaction event"
                    );
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::event::PartyRole;
    use crate::types::{AccountId, Transaction};
    use rust_decimal::Decimal;

    fn events() -> Vec<TransactionCompleted> {
        let transaction =
            Transaction::completed_transfer(AccountId(1), AccountId(2), Decimal::TEN, Decimal::ZERO);
        vec![
            TransactionCompleted {
                transaction: transaction.clone(),
                for_user: AccountId(1),
                role: PartyRole::Sender,
                balance: Decimal::ZERO,
            },
            TransactionCompleted {
                transaction,
                for_user: AccountId(2),
                role: PartyRole::Receiver,
                balance: Decimal::TEN,
            },
        ]
    }

    #[test]
    fn test_channel_publisher_delivers_in_order() {
        let (publisher, mut receiver) = ChannelPublisher::channel();
        let dispatcher = Dispatcher::new(Arc::new(publisher));

        let report = dispatcher.dispatch(&events());

        assert_eq!(report, DispatchReport { delivered: 2, failed: 0 });
        assert_eq!(receiver.try_recv().unwrap().for_user, AccountId(1));
        assert_eq!(receiver.try_recv().unwrap().for_user, AccountId(2));
    }

    #[test]
    fn test_closed_channel_is_counted_not_raised() {
        let (publisher, receiver) = ChannelPublisher::channel();
        drop(receiver);
        let dispatcher = Dispatcher::new(Arc::new(publisher));

        let report = dispatcher.dispatch(&events());

        assert_eq!(report, DispatchReport { delivered: 0, failed: 2 });
    }

    #[test]
    fn test_log_publisher_accepts_everything() {
        let dispatcher = Dispatcher::new(Arc::new(LogPublisher));
        assert_eq!(dispatcher.dispatch(&events()).delivered, 2);
    }
}
