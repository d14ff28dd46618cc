//! GigRail Agreements
//!
//! Versioned, multi-party contract lifecycle bound to escrowed funds.
//!
//! # Architecture
//!
//! The flow for one project:
//!
//! 1. **Funding**: the client's deposit is held into a per-project escrow
//! 2. **Drafting**: an agreement is created from an accepted bid and its
//!    terms hashed for tamper detection
//! 3. **Signing**: freelancer first, then client; on the client signature
//!    the escrow amount is reconciled against the agreed amount in the
//!    same atomic unit
//! 4. **Settlement**: completion releases the escrow to the freelancer;
//!    disputes route an external decision into the ledger
//!
//! Every transition that touches money runs inside one
//! [`wallet_ledger::LedgerTxn`], so signatures, document status and balance
//! movements commit together or not at all.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod dispute;
pub mod error;
pub mod events;
pub mod hash;
pub mod reconcile;
pub mod store;
pub mod types;
pub mod workflow;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use events::{DomainEvent, EventBus};
pub use types::{
    Agreement, AgreementStatus, AmendmentRecord, Bid, BidStatus, CancellationRecord, Dispute,
    DisputeDecision, DisputeStatus, Engagement, Escrow, EscrowAdjustment, EscrowStatus, Project,
    ProjectStatus, Resolution, SignatureRecord, TermsUpdate,
};
pub use workflow::Marketplace;
