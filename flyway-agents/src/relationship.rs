//! Relationship updates.

use flyway_core::{BirdId, FlywayResult, Relationship};
use flyway_storage::RecordStore;

/// Apply `delta` to both directed edges between `a` and `b`.
///
/// Missing edges are created as friendships at `delta`; existing ones are
/// reinforced and clamped at 100. Returns `(a -> b, b -> a)`.
pub async fn reinforce_pair(
    store: &dyn RecordStore,
    a: BirdId,
    b: BirdId,
    delta: u32,
) -> FlywayResult<(Relationship, Relationship)> {
    let forward = reinforce_edge(store, a, b, delta).await?;
    let backward = reinforce_edge(store, b, a, delta).await?;
    tracing::info!(
        bird_id = %a,
        related_bird_id = %b,
        delta,
        strength = forward.strength,
        "Relationship reinforced"
    );
    Ok((forward, backward))
}

async fn reinforce_edge(
    store: &dyn RecordStore,
    from: BirdId,
    to: BirdId,
    delta: u32,
) -> FlywayResult<Relationship> {
    let edge = match store.relationship_get(from, to).await? {
        Some(mut existing) => {
            existing.reinforce(delta);
            existing
        }
        None => Relationship::friendship(from, to, delta),
    };
    store.relationship_upsert(&edge).await?;
    Ok(edge)
}

/// Remove both directed edges between `a` and `b`. Encounters are untouched.
pub async fn remove_pair(store: &dyn RecordStore, a: BirdId, b: BirdId) -> FlywayResult<usize> {
    let removed = store.relationship_delete_between(a, b).await?;
    tracing::info!(bird_id = %a, related_bird_id = %b, removed, "Relationship removed");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flyway_core::entities::MAX_RELATIONSHIP_STRENGTH;
    use flyway_core::new_entity_id;
    use flyway_storage::InMemoryStore;

    #[tokio::test]
    async fn test_first_event_creates_both_edges_at_delta() -> Result<(), String> {
        let store = InMemoryStore::new();
        let (a, b) = (new_entity_id(), new_entity_id());

        let (ab, ba) = reinforce_pair(&store, a, b, 11).await.map_err(|e| e.to_string())?;
        assert_eq!(ab.strength, 11);
        assert_eq!(ba.strength, 11);
        assert_eq!(ab.bird_id, a);
        assert_eq!(ba.bird_id, b);
        Ok(())
    }

    #[tokio::test]
    async fn test_successive_events_accumulate_and_clamp() -> Result<(), String> {
        let store = InMemoryStore::new();
        let (a, b) = (new_entity_id(), new_entity_id());

        reinforce_pair(&store, a, b, 19).await.map_err(|e| e.to_string())?;
        let (ab, ba) = reinforce_pair(&store, b, a, 25).await.map_err(|e| e.to_string())?;
        assert_eq!(ab.strength, 44);
        assert_eq!(ba.strength, 44);

        for _ in 0..5 {
            reinforce_pair(&store, a, b, 25).await.map_err(|e| e.to_string())?;
        }
        let edge = store.relationship_get(a, b).await.map_err(|e| e.to_string())?.ok_or("edge")?;
        assert_eq!(edge.strength, MAX_RELATIONSHIP_STRENGTH);

        let (ab, _) = reinforce_pair(&store, a, b, 7).await.map_err(|e| e.to_string())?;
        assert_eq!(ab.strength, MAX_RELATIONSHIP_STRENGTH);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_pair_deletes_both_directions() -> Result<(), String> {
        let store = InMemoryStore::new();
        let (a, b) = (new_entity_id(), new_entity_id());
        reinforce_pair(&store, a, b, 9).await.map_err(|e| e.to_string())?;

        assert_eq!(remove_pair(&store, b, a).await.map_err(|e| e.to_string())?, 2);
        assert!(store.relationship_get(b, a).await.map_err(|e| e.to_string())?.is_none());
        Ok(())
    }
}
