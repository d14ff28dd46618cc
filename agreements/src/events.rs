//! Domain events for the notification collaborator
//!
//! Events are published after the owning transaction commits. Delivery is
//! fire-and-forget: a send with no subscribers (or a lagging subscriber)
//! never affects the financial transaction that produced the event.

use crate::types::DisputeDecision;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use uuid::Uuid;

/// State-change event emitted by the marketplace core
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A verified deposit was credited
    DepositCredited {
        /// Credited user
        user_id: Uuid,
        /// Amount credited
        amount: Decimal,
    },
    /// Client funds were locked into a project escrow
    EscrowFunded {
        /// Funded project
        project_id: Uuid,
        /// Amount now held
        amount: Decimal,
    },
    /// A draft agreement was created
    AgreementCreated {
        /// New agreement
        agreement_id: Uuid,
        /// Its project
        project_id: Uuid,
    },
    /// A draft was sent for signing (terms frozen)
    AgreementSentForSigning {
        /// The agreement
        agreement_id: Uuid,
    },
    /// The freelancer signed
    FreelancerSigned {
        /// The agreement
        agreement_id: Uuid,
    },
    /// The client signed; the agreement is active and escrow reconciled
    AgreementActivated {
        /// The agreement
        agreement_id: Uuid,
        /// Its project
        project_id: Uuid,
    },
    /// An agreement was cancelled
    AgreementCancelled {
        /// The agreement
        agreement_id: Uuid,
    },
    /// An active agreement was superseded by a new draft version
    AgreementAmended {
        /// Superseded version
        original_id: Uuid,
        /// New draft version
        amendment_id: Uuid,
    },
    /// Work accepted and escrow released
    AgreementCompleted {
        /// The agreement
        agreement_id: Uuid,
    },
    /// A dispute was opened on an active agreement
    DisputeOpened {
        /// The dispute
        dispute_id: Uuid,
        /// Its project
        project_id: Uuid,
    },
    /// An external decision was recorded
    DisputeResolved {
        /// The dispute
        dispute_id: Uuid,
        /// The decision
        decision: DisputeDecision,
    },
}

/// Broadcast bus for domain events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; failures (no subscribers) are ignored
    pub fn publish(&self, event: DomainEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("No subscribers for domain event");
        }
    }
}
