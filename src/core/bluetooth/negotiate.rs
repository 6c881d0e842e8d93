//! Ordered candidate search used during GATT negotiation

use std::future::Future;

use log::debug;
use uuid::Uuid;

use crate::error::Result;

/// Probe each candidate in order and return the first hit.
///
/// A probe that errors is treated like a miss so the search can fall
/// through to the next candidate.
pub async fn first_match<T, F, Fut>(candidates: &[Uuid], mut probe: F) -> Option<(Uuid, T)>
where
    F: FnMut(Uuid) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for &uuid in candidates {
        match probe(uuid).await {
            Ok(Some(found)) => return Some((uuid, found)),
            Ok(None) => debug!("{} not present", uuid),
            Err(e) => debug!("Probe for {} failed: {}", uuid, e),
        }
    }
    None
}
