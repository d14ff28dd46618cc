//! Escrow reconciliation
//!
//! Runs exactly once, inside the same atomic unit as the client signature
//! that activates an agreement. Keeps the escrow's held amount synchronized
//! with the agreed amount:
//!
//! - equal: mark Funded and link the agreement
//! - escrow over-holds: shrink to the agreed amount, log the adjustment,
//!   refund the excess to the client's spendable balance (same transaction)
//! - escrow under-holds: warning state only; topping up funds the client
//!   never deposited is deliberately not done

use crate::{
    types::{Agreement, Escrow, EscrowAdjustment, EscrowStatus},
    Result,
};
use chrono::Utc;
use wallet_ledger::LedgerTxn;

/// Reconcile the escrow against the agreement's agreed amount, staging any
/// wallet-side refund into the supplied transaction. The caller stages the
/// returned escrow.
pub fn reconcile_escrow(
    txn: &mut LedgerTxn<'_>,
    mut escrow: Escrow,
    agreement: &Agreement,
) -> Result<Escrow> {
    escrow.agreement_id = Some(agreement.agreement_id);

    if escrow.amount == agreement.agreed_amount {
        escrow.status = EscrowStatus::Funded;
    } else if escrow.amount > agreement.agreed_amount {
        let refund_amount = escrow.amount - agreement.agreed_amount;

        txn.refund_escrow(
            escrow.client_id,
            refund_amount,
            escrow.escrow_id,
            escrow.project_id,
            "Escrow adjusted to signed agreement amount",
        )?;

        escrow.adjustment_history.push(EscrowAdjustment {
            previous_amount: escrow.amount,
            new_amount: agreement.agreed_amount,
            refund_amount,
            reason: format!(
                "Held amount reconciled to agreement {}",
                agreement.agreement_number
            ),
            adjusted_at: Utc::now(),
        });
        escrow.amount = agreement.agreed_amount;
        escrow.adjusted_amount = Some(agreement.agreed_amount);
        escrow.status = EscrowStatus::PartialRefund;

        tracing::info!(
            project_id = %escrow.project_id,
            refund = %refund_amount,
            "Excess escrow refunded at signing"
        );
    } else {
        // Under-held relative to the signed terms. No auto top-up: the
        // client never deposited the difference. Flagged for manual review.
        escrow.status = EscrowStatus::Adjusted;

        tracing::warn!(
            project_id = %escrow.project_id,
            held = %escrow.amount,
            agreed = %agreement.agreed_amount,
            "Escrow under-funded relative to signed agreement"
        );
    }

    escrow.updated_at = Utc::now();
    Ok(escrow)
}
