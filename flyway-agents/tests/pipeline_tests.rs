//! End-to-end pipeline tests: sweep -> pending conversation -> driver run.

use flyway_agents::birds::location_for;
use flyway_agents::{DispatchMetricsSnapshot, FixedChance, Pipeline};
use flyway_core::{Bird, ConversationId, ConversationStatus, FlywayConfig, FlywayResult};
use flyway_storage::{InMemoryStore, RecordStore};
use flyway_test_utils::{fixtures, ScriptedGeneration, ScriptedRefresher};
use std::sync::Arc;
use std::time::Duration;

const RICH_TAGS: [&str; 3] = ["nature", "photography", "lakes"];

struct World {
    store: Arc<InMemoryStore>,
    generation: Arc<ScriptedGeneration>,
    pipeline: Pipeline,
}

fn world(chance: FixedChance) -> FlywayResult<World> {
    let store = Arc::new(InMemoryStore::new());
    let generation = Arc::new(ScriptedGeneration::new());
    let pipeline = Pipeline::new(
        store.clone(),
        generation.clone(),
        Arc::new(ScriptedRefresher::failing()),
        FlywayConfig::default(),
        Arc::new(chance),
    )?;
    Ok(World {
        store,
        generation,
        pipeline,
    })
}

async fn swans(world: &World) -> FlywayResult<(Bird, Bird)> {
    let at = location_for(fixtures::species("mute-swan"), None)?;
    let (_, a) = fixtures::seed_bird(world.store.as_ref(), "ada", "mute-swan", at.clone()).await?;
    let (_, b) = fixtures::seed_bird(world.store.as_ref(), "bo", "mute-swan", at).await?;
    Ok((a, b))
}

async fn wait_for_terminal(store: &InMemoryStore, id: ConversationId) -> Result<ConversationStatus, String> {
    for _ in 0..200 {
        let conversation = store
            .conversation_get(id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("conversation missing")?;
        if conversation.status.is_terminal() {
            return Ok(conversation.status);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Err("conversation never finished".to_string())
}

/// Counters move after the status write; poll until `done` holds or give up.
async fn settle(pipeline: &Pipeline, done: impl Fn(&DispatchMetricsSnapshot) -> bool) {
    for _ in 0..100 {
        if done(&pipeline.metrics.snapshot()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn sweep_then_dispatch_completes_conversation() -> Result<(), String> {
    let mut world = world(FixedChance::never()).map_err(|e| e.to_string())?;
    let (a, b) = swans(&world).await.map_err(|e| e.to_string())?;
    world.generation.set_tags("ada", RICH_TAGS);
    world.generation.set_tags("bo", RICH_TAGS);

    let report = world.pipeline.scanner.sweep_all().await.map_err(|e| e.to_string())?;
    assert_eq!(report.new_encounters.len(), 1);
    let summary = report.new_encounters[0].clone();

    // Nothing runs until the dispatcher is started.
    let pending = world
        .store
        .conversation_get(summary.conversation_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("conversation")?;
    assert_eq!(pending.status, ConversationStatus::Pending);

    let _dispatcher = world.pipeline.start_dispatcher().ok_or("dispatcher")?;
    let status = wait_for_terminal(&world.store, summary.conversation_id).await?;
    assert_eq!(status, ConversationStatus::Completed);

    let messages = world
        .store
        .message_list(summary.conversation_id)
        .await
        .map_err(|e| e.to_string())?;
    let rounds: Vec<u32> = messages.iter().map(|m| m.round).collect();
    assert_eq!(rounds, vec![1, 2, 3, 4, 5]);

    let ab = world
        .store
        .relationship_get(a.bird_id, b.bird_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("a -> b")?;
    let ba = world
        .store
        .relationship_get(b.bird_id, a.bird_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("b -> a")?;
    assert_eq!(ab.strength, ba.strength);
    assert_eq!(ab.strength, 15);

    let encounter = world
        .store
        .encounter_get(summary.encounter_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("encounter")?;
    assert!(encounter.story.ok_or("story")?.contains("swapped tales"));

    settle(&world.pipeline, |m| m.completed == 1).await;
    let metrics = world.pipeline.metrics.snapshot();
    assert_eq!(metrics.started, 1);
    assert_eq!(metrics.completed, 1);
    Ok(())
}

#[tokio::test]
async fn failed_conversation_is_contained() -> Result<(), String> {
    let mut world = world(FixedChance::never()).map_err(|e| e.to_string())?;
    swans(&world).await.map_err(|e| e.to_string())?;
    world.generation.set_tags("ada", RICH_TAGS);
    world.generation.set_tags("bo", RICH_TAGS);
    world.generation.push_reply("Hello from the lake.");
    world.generation.push_failure();

    let report = world.pipeline.scanner.sweep_all().await.map_err(|e| e.to_string())?;
    let conversation_id = report.new_encounters.first().ok_or("encounter")?.conversation_id;

    let _dispatcher = world.pipeline.start_dispatcher().ok_or("dispatcher")?;
    let status = wait_for_terminal(&world.store, conversation_id).await?;
    assert_eq!(status, ConversationStatus::Failed);

    let messages = world.store.message_list(conversation_id).await.map_err(|e| e.to_string())?;
    assert_eq!(messages.len(), 1);
    settle(&world.pipeline, |m| m.failed == 1).await;
    assert_eq!(world.pipeline.metrics.snapshot().failed, 1);
    Ok(())
}

#[tokio::test]
async fn repeat_sweep_within_a_day_finds_nothing_new() -> Result<(), String> {
    let world = world(FixedChance::always()).map_err(|e| e.to_string())?;
    swans(&world).await.map_err(|e| e.to_string())?;
    world.generation.set_tags("ada", RICH_TAGS);
    world.generation.set_tags("bo", RICH_TAGS);

    let first = world.pipeline.scanner.sweep_all().await.map_err(|e| e.to_string())?;
    let second = world.pipeline.scanner.sweep_all().await.map_err(|e| e.to_string())?;
    assert_eq!(first.new_encounters.len(), 1);
    assert_eq!(second.new_encounters.len(), 0);
    Ok(())
}
