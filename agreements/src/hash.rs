//! Content-integrity hashing
//!
//! The content hash covers every economically meaningful field of an
//! agreement: amounts, parties, deadline, deliverables and terms text.
//! Lifecycle fields (status, signatures, timestamps) are deliberately
//! excluded so the hash stays stable across the signing flow and
//! `verify_integrity` detects only out-of-band tampering with the terms.

use crate::types::Agreement;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Field separator inside the canonical encoding
const SEP: &[u8] = &[0x1e];

/// Compute the content hash (hex SHA-256) over the agreement's terms
pub fn content_hash(agreement: &Agreement) -> String {
    let mut hasher = Sha256::new();

    hasher.update(agreement.project_id.as_bytes());
    hasher.update(SEP);
    hasher.update(agreement.bid_id.as_bytes());
    hasher.update(SEP);
    hasher.update(agreement.client_id.as_bytes());
    hasher.update(SEP);
    hasher.update(agreement.freelancer_id.as_bytes());
    hasher.update(SEP);
    hasher.update(agreement.version.to_be_bytes());
    hasher.update(SEP);
    hasher.update(agreement.agreed_amount.to_string().as_bytes());
    hasher.update(SEP);
    hasher.update(agreement.platform_fee.to_string().as_bytes());
    hasher.update(SEP);
    hasher.update(agreement.total_amount.to_string().as_bytes());
    hasher.update(SEP);
    hasher.update(agreement.currency.code().as_bytes());
    hasher.update(SEP);
    if let Some(deadline) = agreement.deadline {
        hasher.update(deadline.to_rfc3339().as_bytes());
    }
    hasher.update(SEP);
    for deliverable in &agreement.deliverables {
        hasher.update(deliverable.as_bytes());
        hasher.update([0x1f]);
    }
    hasher.update(SEP);
    hasher.update(agreement.project_title.as_bytes());
    hasher.update(SEP);
    hasher.update(agreement.project_description.as_bytes());
    hasher.update(SEP);
    hasher.update(agreement.terms.as_bytes());

    hex::encode(hasher.finalize())
}

/// Digest binding one party's signature to the terms they signed
pub fn signature_hash(
    content_hash: &str,
    role: &str,
    signer_id: Uuid,
    signed_at: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content_hash.as_bytes());
    hasher.update(b":");
    hasher.update(role.as_bytes());
    hasher.update(b":");
    hasher.update(signer_id.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(signed_at.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())
}
