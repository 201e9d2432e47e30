//! Save files on disk: round trips, corruption and version checks.

use std::fs;

use wildgrid_core::persistence::{self, SAVE_VERSION};
use wildgrid_core::prelude::*;
use wildgrid_logic::items::Item;
use wildgrid_logic::quests::QuestType;

fn played(seed: u64, ticks: u64) -> SimulationEngine {
    let mut engine = SimulationEngine::with_default_config(seed);
    engine.set_quest(QuestType::Hunt);
    engine.set_autopilot(true);
    engine.advance(ticks);
    engine.player.inventory.add(Item::Stone, 7);
    engine
}

#[test]
fn round_trip_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.sav");
    let engine = played(555, 240);
    engine.save_to_path(&path).unwrap();
    assert!(!path.with_extension("partial").exists());

    let mut restored = SimulationEngine::with_default_config(0);
    restored.load_from_path(&path).unwrap();

    assert_eq!(restored.seed(), 555);
    assert_eq!(restored.tick(), engine.tick());
    assert_eq!(restored.player, engine.player);
    assert_eq!(restored.inventory().count(Item::Stone), engine.inventory().count(Item::Stone));
    assert_eq!(restored.quests.active_kind(), QuestType::Hunt);
    assert_eq!(restored.scheduler.timestamps(), engine.scheduler.timestamps());
    assert_eq!(restored.creature_count(), engine.creature_count());
    let here = engine.player.zone();
    assert_eq!(restored.cell_views(here), engine.cell_views(here));
    assert_eq!(restored.entity_snapshots(here), engine.entity_snapshots(here));
}

#[test]
fn restored_world_keeps_running() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.sav");
    played(77, 90).save_to_path(&path).unwrap();

    let mut restored = SimulationEngine::with_default_config(1);
    restored.load_from_path(&path).unwrap();
    let start = restored.tick();
    restored.advance(120);
    assert_eq!(restored.tick(), start + 120);
}

#[test]
fn corrupt_file_leaves_the_engine_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.sav");
    let mut bytes = Vec::new();
    played(3, 60).save(&mut bytes).unwrap();
    bytes.truncate(bytes.len() / 3);
    fs::write(&path, &bytes).unwrap();

    let mut engine = played(8, 30);
    let before = engine.player.clone();
    let err = engine.load_from_path(&path).unwrap_err();
    assert!(matches!(err, SaveError::Bincode(_)), "{err}");
    assert_eq!(engine.seed(), 8);
    assert_eq!(engine.tick(), 30);
    assert_eq!(engine.player, before);
}

#[test]
fn huge_string_length_fails_the_load() {
    let engine = SimulationEngine::with_default_config(555);
    let data = engine.snapshot();
    let given = data
        .entities
        .iter()
        .find_map(|e| e.name.as_ref())
        .expect("seed 555 starts with a named NPC")
        .given
        .clone();
    let mut bytes = Vec::new();
    engine.save(&mut bytes).unwrap();

    let mut prefixed = (given.len() as u64).to_le_bytes().to_vec();
    prefixed.extend_from_slice(given.as_bytes());
    let at = bytes.windows(prefixed.len()).position(|w| w == prefixed).unwrap();
    bytes[at..at + 8].copy_from_slice(&(1u64 << 42).to_le_bytes());

    let mut target = played(8, 30);
    let before = target.player.clone();
    assert!(matches!(target.load(&bytes[..]), Err(SaveError::Bincode(_))));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.sav");
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(target.load_from_path(&path), Err(SaveError::Bincode(_))));
    assert_eq!(target.tick(), 30);
    assert_eq!(target.player, before);
}

#[test]
fn newer_save_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sav");
    let mut data = played(4, 30).snapshot();
    data.version = SAVE_VERSION + 1;
    persistence::save_to_path(&path, &data).unwrap();

    let mut engine = SimulationEngine::with_default_config(4);
    let err = engine.load_from_path(&path).unwrap_err();
    assert!(matches!(err, SaveError::VersionMismatch { found, .. } if found == SAVE_VERSION + 1));
    assert_eq!(engine.tick(), 0);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = SimulationEngine::with_default_config(4);
    let err = engine.load_from_path(&dir.path().join("nope.sav")).unwrap_err();
    assert!(matches!(err, SaveError::Io(_)));
}
