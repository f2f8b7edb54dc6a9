use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::warn;

use crate::infrastructure::storage::s3::ObjectStore;
use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::model::manifest_key;

pub const CONTENT_ID_LEN: usize = 12;

/// How many random ids we probe before giving up.
const MAX_PROBES: u32 = 3;

fn random_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CONTENT_ID_LEN)
        .map(char::from)
        .collect()
}

/// Allocates a content id no existing object in storage is keyed under.
///
/// Check-then-act, not atomic: two allocators could race between the HeadObject
/// probe and the first write. Known gap carried over from the original design;
/// the probe budget bounds how long we try.
pub async fn allocate(store: &dyn ObjectStore) -> Result<String, TranscodeError> {
    for attempt in 1..=MAX_PROBES {
        let candidate = random_id();

        if !store.exists(&manifest_key(&candidate)).await? {
            return Ok(candidate);
        }

        warn!(
            "content id collision on attempt {}/{}, re-rolling",
            attempt, MAX_PROBES
        );
    }

    Err(TranscodeError::IdentityExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::transcode::testkit::MemoryObjectStore;

    #[tokio::test]
    async fn allocates_a_fresh_id_when_storage_is_empty() {
        let store = MemoryObjectStore::new();

        let id = allocate(&store).await.unwrap();

        assert_eq!(id.len(), CONTENT_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(store.exist_probes(), 1);
    }

    #[tokio::test]
    async fn exhausts_probe_budget_against_seeded_collisions() {
        // Every candidate key reads as already present.
        let store = MemoryObjectStore::with_collisions();

        let err = allocate(&store).await.unwrap_err();

        assert!(matches!(err, TranscodeError::IdentityExhausted));
        assert_eq!(store.exist_probes(), 3);
    }
}
