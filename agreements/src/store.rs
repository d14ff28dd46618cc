//! Typed document access over the shared ledger database
//!
//! The `wallet-ledger` storage registers these column families at open time
//! and leases raw access through [`wallet_ledger::LedgerTxn`], so document
//! writes commit in the same atomic batch as the wallet movements they
//! must stay consistent with.

use crate::{
    types::{Agreement, Bid, Dispute, Engagement, Escrow, Project},
    Error, Result,
};
use uuid::Uuid;
use wallet_ledger::{LedgerTxn, Storage};

/// Agreements by agreement_id
pub const CF_AGREEMENTS: &str = "agreements";
/// Escrows by project_id
pub const CF_ESCROWS: &str = "escrows";
/// Bids by bid_id
pub const CF_BIDS: &str = "bids";
/// Projects by project_id
pub const CF_PROJECTS: &str = "projects";
/// Disputes by dispute_id
pub const CF_DISPUTES: &str = "disputes";
/// Ongoing-work read model by project_id
pub const CF_ENGAGEMENTS: &str = "engagements";
/// Uniqueness backstop: project_id -> active agreement_id
pub const CF_ACTIVE_AGREEMENTS: &str = "active_agreements";
/// Secondary index: project_id || agreement_id -> empty
pub const CF_AGREEMENTS_BY_PROJECT: &str = "agreements_by_project";

/// All document column families, passed to [`Storage::open`]
pub const DOCUMENT_CFS: &[&str] = &[
    CF_AGREEMENTS,
    CF_ESCROWS,
    CF_BIDS,
    CF_PROJECTS,
    CF_DISPUTES,
    CF_ENGAGEMENTS,
    CF_ACTIVE_AGREEMENTS,
    CF_AGREEMENTS_BY_PROJECT,
];

// Committed reads

/// Get an agreement by ID
pub fn get_agreement(storage: &Storage, agreement_id: Uuid) -> Result<Agreement> {
    let value = storage
        .get_raw(CF_AGREEMENTS, agreement_id.as_bytes())?
        .ok_or_else(|| Error::AgreementNotFound(agreement_id.to_string()))?;
    Ok(bincode::deserialize(&value)?)
}

/// Get the escrow for a project
pub fn get_escrow(storage: &Storage, project_id: Uuid) -> Result<Escrow> {
    let value = storage
        .get_raw(CF_ESCROWS, project_id.as_bytes())?
        .ok_or_else(|| Error::EscrowNotFound(project_id.to_string()))?;
    Ok(bincode::deserialize(&value)?)
}

/// Get the escrow for a project, if one exists
pub fn try_get_escrow(storage: &Storage, project_id: Uuid) -> Result<Option<Escrow>> {
    match storage.get_raw(CF_ESCROWS, project_id.as_bytes())? {
        Some(value) => Ok(Some(bincode::deserialize(&value)?)),
        None => Ok(None),
    }
}

/// Get a bid by ID
pub fn get_bid(storage: &Storage, bid_id: Uuid) -> Result<Bid> {
    let value = storage
        .get_raw(CF_BIDS, bid_id.as_bytes())?
        .ok_or_else(|| Error::BidNotFound(bid_id.to_string()))?;
    Ok(bincode::deserialize(&value)?)
}

/// Get a project by ID
pub fn get_project(storage: &Storage, project_id: Uuid) -> Result<Project> {
    let value = storage
        .get_raw(CF_PROJECTS, project_id.as_bytes())?
        .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))?;
    Ok(bincode::deserialize(&value)?)
}

/// Get a dispute by ID
pub fn get_dispute(storage: &Storage, dispute_id: Uuid) -> Result<Dispute> {
    let value = storage
        .get_raw(CF_DISPUTES, dispute_id.as_bytes())?
        .ok_or_else(|| Error::DisputeNotFound(dispute_id.to_string()))?;
    Ok(bincode::deserialize(&value)?)
}

/// Get the ongoing-work row for a project, if any
pub fn get_engagement(storage: &Storage, project_id: Uuid) -> Result<Option<Engagement>> {
    match storage.get_raw(CF_ENGAGEMENTS, project_id.as_bytes())? {
        Some(value) => Ok(Some(bincode::deserialize(&value)?)),
        None => Ok(None),
    }
}

/// ID of the active agreement for a project, if one exists
pub fn active_agreement_id(storage: &Storage, project_id: Uuid) -> Result<Option<Uuid>> {
    match storage.get_raw(CF_ACTIVE_AGREEMENTS, project_id.as_bytes())? {
        Some(value) => {
            let bytes: [u8; 16] = value
                .as_slice()
                .try_into()
                .map_err(|_| Error::Other("Malformed active-agreement key".to_string()))?;
            Ok(Some(Uuid::from_bytes(bytes)))
        }
        None => Ok(None),
    }
}

/// All agreement versions recorded for a project, oldest first
pub fn agreements_for_project(storage: &Storage, project_id: Uuid) -> Result<Vec<Agreement>> {
    let entries = storage.scan_raw(CF_AGREEMENTS_BY_PROJECT, project_id.as_bytes())?;
    let mut agreements = Vec::with_capacity(entries.len());
    for (key, _) in entries {
        if key.len() >= 32 {
            let id_bytes: [u8; 16] = key[16..32]
                .try_into()
                .map_err(|_| Error::Other("Malformed project index key".to_string()))?;
            agreements.push(get_agreement(storage, Uuid::from_bytes(id_bytes))?);
        }
    }
    agreements.sort_by_key(|a| (a.version, a.created_at));
    Ok(agreements)
}

// Staged writes

/// Stage an agreement put (plus its project index entry)
pub fn put_agreement(txn: &mut LedgerTxn<'_>, agreement: &Agreement) -> Result<()> {
    let value = bincode::serialize(agreement)?;
    txn.put_raw(CF_AGREEMENTS, agreement.agreement_id.as_bytes(), &value)?;

    let mut idx = agreement.project_id.as_bytes().to_vec();
    idx.extend_from_slice(agreement.agreement_id.as_bytes());
    txn.put_raw(CF_AGREEMENTS_BY_PROJECT, &idx, &[])?;
    Ok(())
}

/// Stage an escrow put
pub fn put_escrow(txn: &mut LedgerTxn<'_>, escrow: &Escrow) -> Result<()> {
    let value = bincode::serialize(escrow)?;
    txn.put_raw(CF_ESCROWS, escrow.project_id.as_bytes(), &value)?;
    Ok(())
}

/// Stage a bid put
pub fn put_bid(txn: &mut LedgerTxn<'_>, bid: &Bid) -> Result<()> {
    let value = bincode::serialize(bid)?;
    txn.put_raw(CF_BIDS, bid.bid_id.as_bytes(), &value)?;
    Ok(())
}

/// Stage a project put
pub fn put_project(txn: &mut LedgerTxn<'_>, project: &Project) -> Result<()> {
    let value = bincode::serialize(project)?;
    txn.put_raw(CF_PROJECTS, project.project_id.as_bytes(), &value)?;
    Ok(())
}

/// Stage a dispute put
pub fn put_dispute(txn: &mut LedgerTxn<'_>, dispute: &Dispute) -> Result<()> {
    let value = bincode::serialize(dispute)?;
    txn.put_raw(CF_DISPUTES, dispute.dispute_id.as_bytes(), &value)?;
    Ok(())
}

/// Stage an engagement put
pub fn put_engagement(txn: &mut LedgerTxn<'_>, engagement: &Engagement) -> Result<()> {
    let value = bincode::serialize(engagement)?;
    txn.put_raw(CF_ENGAGEMENTS, engagement.project_id.as_bytes(), &value)?;
    Ok(())
}

/// Stage removal of an engagement row
pub fn delete_engagement(txn: &mut LedgerTxn<'_>, project_id: Uuid) -> Result<()> {
    txn.delete_raw(CF_ENGAGEMENTS, project_id.as_bytes())?;
    Ok(())
}

/// Stage the active-agreement uniqueness key for a project
pub fn set_active_agreement(
    txn: &mut LedgerTxn<'_>,
    project_id: Uuid,
    agreement_id: Uuid,
) -> Result<()> {
    txn.put_raw(
        CF_ACTIVE_AGREEMENTS,
        project_id.as_bytes(),
        agreement_id.as_bytes(),
    )?;
    Ok(())
}

/// Stage removal of the active-agreement key
pub fn clear_active_agreement(txn: &mut LedgerTxn<'_>, project_id: Uuid) -> Result<()> {
    txn.delete_raw(CF_ACTIVE_AGREEMENTS, project_id.as_bytes())?;
    Ok(())
}
