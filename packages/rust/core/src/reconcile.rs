//! Set difference between generated and assigned addresses.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use addrsync_shared::{DocumentId, GeneratedAddress, Result, UnassignedAddress};

/// Return the generated records whose value is absent from `assigned`.
///
/// Output order follows `generated`. Values compare byte-for-byte. Every
/// emitted record gets `now` as its created/updated stamp and the source
/// creation time as `generated_at`. A record with an identifier that is not a
/// valid ObjectId fails the whole call; no partial output is returned.
pub fn reconcile(
    generated: &[GeneratedAddress],
    assigned: &[String],
    now: DateTime<Utc>,
) -> Result<Vec<UnassignedAddress>> {
    let assigned_set: HashSet<&str> = assigned.iter().map(String::as_str).collect();

    let unassigned = generated
        .iter()
        .filter(|addr| !assigned_set.contains(addr.value.as_str()))
        .map(|addr| to_unassigned(addr, now))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        generated = generated.len(),
        assigned_distinct = assigned_set.len(),
        unassigned = unassigned.len(),
        "reconciled address sets"
    );

    Ok(unassigned)
}

fn to_unassigned(addr: &GeneratedAddress, now: DateTime<Utc>) -> Result<UnassignedAddress> {
    Ok(UnassignedAddress {
        id: DocumentId::parse(&addr.id)?,
        value: addr.value.clone(),
        kind: addr.kind.clone(),
        currency_iso: addr.currency_iso.clone(),
        client: addr.client.clone(),
        generated_at: addr.created_at,
        created_at: now,
        updated_at: now,
    })
}
