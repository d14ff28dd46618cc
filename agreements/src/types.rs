//! Document types for agreements, escrows and the entities they reference
//!
//! All documents serialize with bincode into their own column families.
//! `Agreement` rows form an amendment chain: a child holds
//! `parent_agreement_id` plus a monotonic `version`, so the chain is
//! reconstructible by following back-references, never held in memory.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wallet_ledger::Currency;

/// Agreement lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AgreementStatus {
    /// Editable draft, not yet sent for signing
    Draft = 1,
    /// Sent for signing, awaiting the freelancer (terms frozen)
    PendingFreelancer = 2,
    /// Freelancer signed, awaiting the client
    PendingClient = 3,
    /// Fully signed and in force
    Active = 4,
    /// Work delivered and settled (terminal)
    Completed = 5,
    /// Cancelled before activation (terminal)
    Cancelled = 6,
    /// Under dispute, awaiting an external decision
    Disputed = 7,
    /// Superseded by a newer version in the same chain
    Amended = 8,
}

impl AgreementStatus {
    /// True for states that permit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgreementStatus::Completed | AgreementStatus::Cancelled)
    }
}

/// Captured signature for one party
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// When the party signed
    pub signed_at: DateTime<Utc>,
    /// Signer IP address
    pub ip: String,
    /// Signer user agent
    pub user_agent: String,
    /// Digest binding this signature to the content hash at signing time
    pub signature_hash: String,
}

/// One version-to-version delta in an amendment chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmendmentRecord {
    /// Version being superseded
    pub from_version: u32,
    /// Version that supersedes it
    pub to_version: u32,
    /// Agreed amount before the amendment
    pub previous_amount: Decimal,
    /// Agreed amount after the amendment
    pub new_amount: Decimal,
    /// Why the terms changed
    pub reason: String,
    /// Party who initiated the amendment
    pub amended_by: Uuid,
    /// When the amendment was created
    pub amended_at: DateTime<Utc>,
}

/// Cancellation audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationRecord {
    /// Why the agreement was cancelled
    pub reason: String,
    /// Party who cancelled
    pub cancelled_by: Uuid,
    /// When
    pub cancelled_at: DateTime<Utc>,
}

/// One contract version for a project
///
/// Mutable only in `Draft`; immutable once sent for signing. At most one
/// `Active` agreement per project, enforced by the active-agreement
/// uniqueness key inside the signing transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agreement {
    /// Unique agreement ID
    pub agreement_id: Uuid,
    /// Human-readable agreement number
    pub agreement_number: String,
    /// Project this agreement governs
    pub project_id: Uuid,
    /// Accepted bid the terms were snapshotted from
    pub bid_id: Uuid,
    /// Previous version in the amendment chain, if this is an amendment
    pub parent_agreement_id: Option<Uuid>,
    /// Paying party
    pub client_id: Uuid,
    /// Earning party
    pub freelancer_id: Uuid,
    /// Monotonic version within the chain (1 for the original)
    pub version: u32,
    /// Amount owed to the freelancer on completion
    pub agreed_amount: Decimal,
    /// Platform fee on top of the agreed amount
    pub platform_fee: Decimal,
    /// agreed_amount + platform_fee
    pub total_amount: Decimal,
    /// Contract currency
    pub currency: Currency,
    /// Delivery deadline, if any
    pub deadline: Option<DateTime<Utc>>,
    /// Agreed deliverables
    pub deliverables: Vec<String>,
    /// Project title snapshot
    pub project_title: String,
    /// Project description snapshot
    pub project_description: String,
    /// Free-form contract terms
    pub terms: String,
    /// Freelancer signature (signs first)
    pub freelancer_signature: Option<SignatureRecord>,
    /// Client signature (signs second, activates the agreement)
    pub client_signature: Option<SignatureRecord>,
    /// Lifecycle state
    pub status: AgreementStatus,
    /// SHA-256 over all economically meaningful fields (hex)
    pub content_hash: String,
    /// Append-only log of version deltas within this chain
    pub amendment_history: Vec<AmendmentRecord>,
    /// Set when status is Cancelled
    pub cancellation: Option<CancellationRecord>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Agreement {
    /// True once both parties have signed
    pub fn is_fully_signed(&self) -> bool {
        self.freelancer_signature.is_some() && self.client_signature.is_some()
    }
}

/// Draft-only terms patch; unset fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct TermsUpdate {
    /// New agreed amount (recomputes fee and total)
    pub agreed_amount: Option<Decimal>,
    /// New deadline
    pub deadline: Option<DateTime<Utc>>,
    /// Replacement deliverables list
    pub deliverables: Option<Vec<String>>,
    /// Replacement terms text
    pub terms: Option<String>,
}

/// Escrow record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EscrowStatus {
    /// Funds held, matching the agreement (or awaiting one)
    Funded = 1,
    /// Released to the freelancer (terminal)
    Released = 2,
    /// Refunded to the client (terminal)
    Refunded = 3,
    /// Shrunk to the agreed amount with the excess refunded
    PartialRefund = 4,
    /// Held amount below the signed terms; needs manual intervention
    Adjusted = 5,
}

/// One adjustment applied to an escrow's held amount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowAdjustment {
    /// Held amount before the adjustment
    pub previous_amount: Decimal,
    /// Held amount after the adjustment
    pub new_amount: Decimal,
    /// Portion refunded to the client's spendable balance
    pub refund_amount: Decimal,
    /// Why the adjustment happened
    pub reason: String,
    /// When
    pub adjusted_at: DateTime<Utc>,
}

/// Per-project lock of client funds pending work completion
///
/// Invariant: once both parties have signed, `amount` equals the active
/// agreement's `agreed_amount` (except in the `Adjusted` warning state).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escrow {
    /// Unique escrow ID
    pub escrow_id: Uuid,
    /// Project the funds are locked for
    pub project_id: Uuid,
    /// Paying party whose wallet holds the escrow balance
    pub client_id: Uuid,
    /// Currently held amount
    pub amount: Decimal,
    /// Post-reconciliation amount, if an adjustment ran
    pub adjusted_amount: Option<Decimal>,
    /// Record status
    pub status: EscrowStatus,
    /// Agreement this escrow is synchronized with, once signed
    pub agreement_id: Option<Uuid>,
    /// Append-only adjustment log
    pub adjustment_history: Vec<EscrowAdjustment>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// Bid status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum BidStatus {
    /// Submitted, not yet decided
    Submitted = 1,
    /// Accepted (set when the agreement activates, not at creation)
    Accepted = 2,
    /// Declined by the client
    Declined = 3,
    /// Withdrawn by the freelancer
    Withdrawn = 4,
}

/// A freelancer's offer on a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    /// Unique bid ID
    pub bid_id: Uuid,
    /// Project the bid targets
    pub project_id: Uuid,
    /// Bidding freelancer
    pub freelancer_id: Uuid,
    /// Offered amount
    pub amount: Decimal,
    /// Bid status
    pub status: BidStatus,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Project status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProjectStatus {
    /// Accepting bids
    Open = 1,
    /// Agreement active, work underway
    InProgress = 2,
    /// Delivered and settled
    Completed = 3,
    /// Cancelled
    Cancelled = 4,
    /// Under dispute
    Disputed = 5,
}

/// Project record (owned externally; the core reads ids and flips status)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project ID
    pub project_id: Uuid,
    /// Owning client
    pub client_id: Uuid,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Status
    pub status: ProjectStatus,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// Dispute status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DisputeStatus {
    /// Awaiting an external decision
    Open = 1,
    /// Decision recorded (terminal; exactly one resolution per dispute)
    Resolved = 2,
}

/// Externally decided outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeDecision {
    /// Refund the client (gateway-side, recorded only)
    ClientFavor,
    /// Award escrowed funds to the freelancer
    FreelancerFavor,
    /// Award part, refund part
    Split,
    /// Dispute dismissed, work continues
    Dismissed,
}

/// Decision payload recorded on resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    /// The decision
    pub decision: DisputeDecision,
    /// Amount awarded to the freelancer from escrow
    pub awarded_amount: Decimal,
    /// Amount refunded to the client (external payment path)
    pub refund_amount: Decimal,
    /// Reviewer's reasoning
    pub reasoning: String,
    /// Administrator who resolved
    pub resolved_by: Uuid,
    /// When
    pub resolved_at: DateTime<Utc>,
}

/// Dispute over an active agreement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    /// Unique dispute ID
    pub dispute_id: Uuid,
    /// Disputed project
    pub project_id: Uuid,
    /// Disputed agreement
    pub agreement_id: Uuid,
    /// Party who raised the dispute
    pub raised_by: Uuid,
    /// Why
    pub reason: String,
    /// Status
    pub status: DisputeStatus,
    /// Recorded decision, once resolved
    pub resolution: Option<Resolution>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// "Ongoing work" read-model row, materialized when an agreement activates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engagement {
    /// Project under way
    pub project_id: Uuid,
    /// Governing agreement
    pub agreement_id: Uuid,
    /// Paying party
    pub client_id: Uuid,
    /// Earning party
    pub freelancer_id: Uuid,
    /// Amount owed on completion
    pub agreed_amount: Decimal,
    /// When work started (agreement activation)
    pub started_at: DateTime<Utc>,
}
