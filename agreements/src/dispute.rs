//! Dispute lifecycle and admin settlement
//!
//! A dispute pauses the agreement (Active -> Disputed) without touching the
//! escrow. Settlement is a single admin decision that moves money (where the
//! decision awards any) and closes out the agreement, project and dispute in
//! one atomic unit. Re-running a settlement is a state conflict, never a
//! double payout.

use crate::{
    events::DomainEvent,
    store,
    types::{
        AgreementStatus, CancellationRecord, Dispute, DisputeDecision, DisputeStatus,
        EscrowAdjustment, EscrowStatus, ProjectStatus, Resolution,
    },
    Error, Marketplace, Result,
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;
use wallet_ledger::TxnReference;

impl Marketplace {
    /// Raise a dispute against the project's active agreement
    pub fn open_dispute(&self, actor: Uuid, project_id: Uuid, reason: &str) -> Result<Dispute> {
        let mut txn = self.storage.begin();

        let agreement_id = store::active_agreement_id(&self.storage, project_id)?
            .ok_or_else(|| {
                Error::StateConflict(format!("No active agreement for project {}", project_id))
            })?;
        let mut agreement = store::get_agreement(&self.storage, agreement_id)?;
        if agreement.status != AgreementStatus::Active {
            return Err(Error::StateConflict(format!(
                "Agreement {} is not active",
                agreement.agreement_number
            )));
        }
        if actor != agreement.client_id && actor != agreement.freelancer_id {
            return Err(Error::StateConflict(
                "Only a party to the agreement may raise a dispute".to_string(),
            ));
        }

        let now = Utc::now();
        let dispute = Dispute {
            dispute_id: Uuid::new_v4(),
            project_id,
            agreement_id,
            raised_by: actor,
            reason: reason.to_string(),
            status: DisputeStatus::Open,
            resolution: None,
            created_at: now,
            updated_at: now,
        };

        agreement.status = AgreementStatus::Disputed;
        agreement.updated_at = now;
        store::put_agreement(&mut txn, &agreement)?;

        let mut project = store::get_project(&self.storage, project_id)?;
        project.status = ProjectStatus::Disputed;
        project.updated_at = now;
        store::put_project(&mut txn, &project)?;

        store::put_dispute(&mut txn, &dispute)?;
        txn.commit()?;

        tracing::warn!(
            dispute_id = %dispute.dispute_id,
            project_id = %project_id,
            agreement_id = %agreement_id,
            "Dispute opened, agreement paused"
        );
        self.events.publish(DomainEvent::DisputeOpened {
            dispute_id: dispute.dispute_id,
            project_id,
        });
        Ok(dispute)
    }

    /// Settle an open dispute with an admin decision.
    ///
    /// Freelancer-favor and split decisions release funds through the
    /// ledger inside this transaction. Client-favor refunds go back through
    /// the external payment gateway, so the ledger is untouched and only
    /// the decision is recorded.
    pub fn resolve_dispute(
        &self,
        admin_id: Uuid,
        dispute_id: Uuid,
        decision: DisputeDecision,
        awarded_amount: Decimal,
        refund_amount: Decimal,
        reasoning: &str,
    ) -> Result<Dispute> {
        let mut txn = self.storage.begin();

        let mut dispute = store::get_dispute(&self.storage, dispute_id)?;
        if dispute.status != DisputeStatus::Open {
            return Err(Error::StateConflict(format!(
                "Dispute {} is already resolved",
                dispute_id
            )));
        }

        let mut agreement = store::get_agreement(&self.storage, dispute.agreement_id)?;
        if agreement.status != AgreementStatus::Disputed {
            return Err(Error::StateConflict(format!(
                "Agreement {} is not under dispute",
                agreement.agreement_number
            )));
        }
        let mut project = store::get_project(&self.storage, dispute.project_id)?;
        let mut escrow = store::get_escrow(&self.storage, dispute.project_id)?;
        let now = Utc::now();

        if awarded_amount < Decimal::ZERO || refund_amount < Decimal::ZERO {
            return Err(Error::Ledger(wallet_ledger::Error::InvalidAmount(
                "Settlement amounts cannot be negative".to_string(),
            )));
        }
        // The wallet guard spans all of the client's escrows; bound the
        // award by this project's held amount explicitly
        if awarded_amount > escrow.amount {
            return Err(Error::StateConflict(format!(
                "Award {} exceeds the {} held in escrow",
                awarded_amount, escrow.amount
            )));
        }

        match decision {
            DisputeDecision::FreelancerFavor => {
                // A full-favor decision releases everything held; a partial
                // award is a split and must be filed as one, otherwise the
                // escrow would close Released with funds still held
                if awarded_amount != escrow.amount {
                    return Err(Error::StateConflict(format!(
                        "Freelancer-favor award {} must release the full {} held; \
                         use a split decision for partial awards",
                        awarded_amount, escrow.amount
                    )));
                }
                txn.release_escrow(
                    agreement.client_id,
                    agreement.freelancer_id,
                    awarded_amount,
                    escrow.escrow_id,
                    TxnReference::Dispute(dispute_id),
                    "Dispute settled in favor of freelancer",
                )?;
                escrow.amount = Decimal::ZERO;
                escrow.status = EscrowStatus::Released;
                agreement.status = AgreementStatus::Completed;
                project.status = ProjectStatus::Completed;
            }
            DisputeDecision::ClientFavor => {
                // Refund runs through the payment gateway, not the wallet.
                // The core records the outcome only.
                escrow.status = EscrowStatus::Refunded;
                agreement.status = AgreementStatus::Cancelled;
                agreement.cancellation = Some(CancellationRecord {
                    reason: reasoning.to_string(),
                    cancelled_by: admin_id,
                    cancelled_at: now,
                });
                project.status = ProjectStatus::Cancelled;
            }
            DisputeDecision::Split => {
                if awarded_amount > Decimal::ZERO {
                    txn.release_escrow(
                        agreement.client_id,
                        agreement.freelancer_id,
                        awarded_amount,
                        escrow.escrow_id,
                        TxnReference::Dispute(dispute_id),
                        "Dispute settled with split award",
                    )?;
                }
                escrow.adjustment_history.push(EscrowAdjustment {
                    previous_amount: escrow.amount,
                    new_amount: escrow.amount - awarded_amount,
                    refund_amount,
                    reason: reasoning.to_string(),
                    adjusted_at: now,
                });
                escrow.amount -= awarded_amount;
                escrow.status = EscrowStatus::PartialRefund;
                agreement.status = AgreementStatus::Completed;
                project.status = ProjectStatus::Completed;
            }
            DisputeDecision::Dismissed => {
                // No merit found: work resumes under the original terms
                agreement.status = AgreementStatus::Active;
                project.status = ProjectStatus::InProgress;
            }
        }

        dispute.status = DisputeStatus::Resolved;
        dispute.resolution = Some(Resolution {
            decision,
            awarded_amount,
            refund_amount,
            reasoning: reasoning.to_string(),
            resolved_by: admin_id,
            resolved_at: now,
        });
        dispute.updated_at = now;

        escrow.updated_at = now;
        agreement.updated_at = now;
        project.updated_at = now;

        if decision != DisputeDecision::Dismissed {
            store::delete_engagement(&mut txn, dispute.project_id)?;
            store::clear_active_agreement(&mut txn, dispute.project_id)?;
        }
        store::put_escrow(&mut txn, &escrow)?;
        store::put_agreement(&mut txn, &agreement)?;
        store::put_project(&mut txn, &project)?;
        store::put_dispute(&mut txn, &dispute)?;
        txn.commit()?;

        tracing::info!(
            dispute_id = %dispute_id,
            decision = ?decision,
            awarded = %awarded_amount,
            refunded = %refund_amount,
            "Dispute resolved"
        );
        self.events.publish(DomainEvent::DisputeResolved {
            dispute_id,
            decision,
        });
        Ok(dispute)
    }

    /// Dispute detail
    pub fn dispute(&self, dispute_id: Uuid) -> Result<Dispute> {
        store::get_dispute(&self.storage, dispute_id)
    }
}
