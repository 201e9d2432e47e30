//! Save/Load functionality for persisting simulation state
//!
//! Uses bincode for a compact binary snapshot. Entities are stored with
//! their raw handle bits and respawned at the same handles, so faction
//! rosters, enchantments and quest targets stay valid without remapping.
//! A save is fully decoded and validated before anything is built from it.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bincode::Options;
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wildgrid_logic::items::Inventory;

use crate::components::*;
use crate::systems::enchantments::{EnchantTarget, Enchantments};
use crate::systems::factions::FactionRegistry;
use crate::systems::loot::DroppedItems;
use crate::systems::quests::QuestLog;
use crate::systems::weather::WorldClock;

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 1;

/// Upper bound on bytes read while decoding a save from a stream.
pub const MAX_SAVE_BYTES: u64 = 256 * 1024 * 1024;

/// Serializable snapshot of the simulation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub world_seed: u64,
    pub clock: WorldClock,
    pub player: Player,
    pub quests: QuestLog,
    /// Zones that diverged from generation. The rest regenerate from the seed.
    pub zones: Vec<Zone>,
    /// Catch-up timestamps for every known zone, touched or not.
    pub last_updated: BTreeMap<ZoneCoord, u64>,
    pub entities: Vec<SavedEntity>,
    pub factions: FactionRegistry,
    pub enchantments: Enchantments,
    pub loot: DroppedItems,
}

/// One creature with every component it can carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedEntity {
    /// Raw `hecs` handle bits.
    pub handle: u64,
    pub creature: Creature,
    pub position: Position,
    pub vitals: Vitals,
    pub progression: Progression,
    pub brain: Brain,
    pub memory: MemoryLane,
    pub inventory: Inventory,
    pub name: Option<Name>,
    pub focus: Option<Focus>,
    pub faction: Option<FactionMember>,
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("corrupt save: {0}")]
    Corrupt(String),
}

fn corrupt(msg: impl Into<String>) -> SaveError {
    SaveError::Corrupt(msg.into())
}

/// Extract every creature from the world.
pub fn capture_entities(world: &World) -> Vec<SavedEntity> {
    let mut query = world.query::<(
        &Creature,
        &Position,
        &Vitals,
        &Progression,
        &Brain,
        &MemoryLane,
        &Inventory,
        Option<&Name>,
        Option<&Focus>,
        Option<&FactionMember>,
    )>();
    let mut entities: Vec<SavedEntity> = query
        .iter()
        .map(
            |(entity, (creature, position, vitals, progression, brain, memory, inventory, name, focus, faction))| {
                SavedEntity {
                    handle: entity.to_bits().get(),
                    creature: *creature,
                    position: *position,
                    vitals: *vitals,
                    progression: *progression,
                    brain: *brain,
                    memory: memory.clone(),
                    inventory: inventory.clone(),
                    name: name.cloned(),
                    focus: focus.cloned(),
                    faction: faction.copied(),
                }
            },
        )
        .collect();
    entities.sort_by_key(|e| e.handle);
    entities
}

/// Check everything a load depends on. Nothing is built until this passes.
pub fn validate(data: &SaveData) -> Result<(), SaveError> {
    if data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: data.version,
        });
    }

    let mut coords = BTreeSet::new();
    for zone in &data.zones {
        if !coords.insert(zone.coord) {
            return Err(corrupt(format!("zone {} saved twice", zone.coord)));
        }
        if !zone.grid.is_valid() {
            return Err(corrupt(format!("zone {} has an invalid grid", zone.coord)));
        }
    }

    let mut handles = BTreeSet::new();
    for saved in &data.entities {
        let Some(entity) = Entity::from_bits(saved.handle) else {
            return Err(corrupt(format!("invalid entity handle {}", saved.handle)));
        };
        if !handles.insert(entity) {
            return Err(corrupt(format!("duplicate entity handle {}", saved.handle)));
        }
        let max = saved.creature.max_health(saved.progression.level);
        if !vitals_ok(&saved.vitals, max) {
            return Err(corrupt(format!(
                "{} has health {} outside [0, {max}]",
                saved.creature.label(),
                saved.vitals.health
            )));
        }
        if !saved.position.cell.in_bounds() {
            return Err(corrupt(format!("{} is outside its zone grid", saved.creature.label())));
        }
    }

    if !vitals_ok(&data.player.vitals, data.player.max_health()) || !data.player.cell().in_bounds() {
        return Err(corrupt("player state out of range"));
    }
    if !data.quests.is_valid() {
        return Err(corrupt("quest log is malformed"));
    }

    for faction in data.factions.iter() {
        let dangling = faction
            .members
            .iter()
            .chain(faction.leader.iter())
            .any(|e| !handles.contains(e));
        if dangling {
            return Err(corrupt(format!("faction {} references a missing entity", faction.name)));
        }
    }
    for enchantment in data.enchantments.iter() {
        if let EnchantTarget::Entity(e) = enchantment.target {
            if !handles.contains(&e) {
                return Err(corrupt("enchantment references a missing entity"));
            }
        }
    }
    Ok(())
}

fn vitals_ok(vitals: &Vitals, max_health: f32) -> bool {
    vitals.health.is_finite()
        && (0.0..=max_health).contains(&vitals.health)
        && vitals.hunger.is_finite()
        && vitals.thirst.is_finite()
}

/// Rebuild a world from validated entities, at their original handles.
pub fn restore_world(entities: &[SavedEntity]) -> Result<World, SaveError> {
    let mut world = World::new();
    for saved in entities {
        let entity = Entity::from_bits(saved.handle)
            .ok_or_else(|| corrupt(format!("invalid entity handle {}", saved.handle)))?;
        world.spawn_at(
            entity,
            (
                saved.creature,
                saved.position,
                saved.vitals,
                saved.progression,
                saved.brain,
                saved.memory.clone(),
                saved.inventory.clone(),
            ),
        );
        if let Some(name) = &saved.name {
            let _ = world.insert_one(entity, name.clone());
        }
        if let Some(focus) = &saved.focus {
            let _ = world.insert_one(entity, focus.clone());
        }
        if let Some(member) = saved.faction {
            let _ = world.insert_one(entity, member);
        }
    }
    Ok(world)
}

/// Save the complete simulation to a writer
pub fn save_simulation<W: Write>(writer: W, data: &SaveData) -> Result<(), SaveError> {
    bincode::serialize_into(writer, data)?;
    Ok(())
}

/// Same wire format as `bincode::serialize_into`, but no length prefix
/// can make the decoder read or allocate past `limit` bytes.
fn decoder(limit: u64) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(limit)
}

/// Decode and validate a save.
pub fn load_simulation<R: Read>(reader: R) -> Result<SaveData, SaveError> {
    load_bounded(reader, MAX_SAVE_BYTES)
}

fn load_bounded<R: Read>(reader: R, limit: u64) -> Result<SaveData, SaveError> {
    let data: SaveData = decoder(limit).deserialize_from(reader)?;
    validate(&data)?;
    Ok(data)
}

/// Write a save file, replacing `path` only once the write has finished.
pub fn save_to_path(path: &Path, data: &SaveData) -> Result<(), SaveError> {
    let partial = path.with_extension("partial");
    {
        let mut writer = BufWriter::new(File::create(&partial)?);
        save_simulation(&mut writer, data)?;
        writer.flush()?;
    }
    std::fs::rename(&partial, path)?;
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<SaveData, SaveError> {
    let file = File::open(path)?;
    let limit = file.metadata()?.len().min(MAX_SAVE_BYTES);
    load_bounded(BufReader::new(file), limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use wildgrid_logic::config::SimConfig;
    use wildgrid_logic::species::{CombatRole, CreatureKind};

    use crate::generation::creatures::spawn_creature;
    use crate::zones::ZoneStore;

    fn sample() -> (SaveData, Entity) {
        let config = SimConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut zones = ZoneStore::new(4);
        zones.ensure(ZoneCoord::ORIGIN, &config.biomes);
        let mut world = World::new();
        let guard = spawn_creature(
            &mut world,
            &mut zones,
            CreatureKind::Combat(CombatRole::Guard),
            ZoneCoord::ORIGIN,
            CellPos::new(4, 4),
            2,
            &config,
            &mut rng,
        );
        let mut factions = FactionRegistry::new();
        factions.found(&mut world, guard, false, &mut rng);

        let data = SaveData {
            version: SAVE_VERSION,
            world_seed: 4,
            clock: WorldClock::new(&config.weather, &mut rng),
            player: Player::new(ZoneCoord::ORIGIN, CellPos::center()),
            quests: QuestLog::default(),
            zones: zones.iter().cloned().collect(),
            last_updated: [(ZoneCoord::ORIGIN, 0)].into_iter().collect(),
            entities: capture_entities(&world),
            factions,
            enchantments: Enchantments::new(),
            loot: DroppedItems::new(),
        };
        (data, guard)
    }

    #[test]
    fn entities_keep_their_handles() {
        let (data, guard) = sample();
        let mut bytes = Vec::new();
        save_simulation(&mut bytes, &data).unwrap();
        let loaded = load_simulation(&bytes[..]).unwrap();
        let world = restore_world(&loaded.entities).unwrap();

        assert!(world.contains(guard));
        assert_eq!(world.get::<&Progression>(guard).unwrap().level, 2);
        assert!(world.get::<&FactionMember>(guard).is_ok());
        assert!(world.get::<&Name>(guard).is_ok());
    }

    #[test]
    fn wrong_version_is_rejected() {
        let (mut data, _) = sample();
        data.version = SAVE_VERSION + 1;
        assert!(matches!(validate(&data), Err(SaveError::VersionMismatch { .. })));
    }

    #[test]
    fn out_of_range_health_is_rejected() {
        let (mut data, _) = sample();
        data.entities[0].vitals.health = f32::NAN;
        assert!(matches!(validate(&data), Err(SaveError::Corrupt(_))));
        data.entities[0].vitals.health = 1.0e6;
        assert!(matches!(validate(&data), Err(SaveError::Corrupt(_))));
    }

    #[test]
    fn duplicate_handles_are_rejected() {
        let (mut data, _) = sample();
        let copy = data.entities[0].clone();
        data.entities.push(copy);
        assert!(matches!(validate(&data), Err(SaveError::Corrupt(_))));
    }

    #[test]
    fn dangling_faction_members_are_rejected() {
        let (mut data, _) = sample();
        data.entities.clear();
        assert!(matches!(validate(&data), Err(SaveError::Corrupt(_))));
    }

    #[test]
    fn oversized_length_prefix_fails_to_decode() {
        let (data, guard) = sample();
        let mut bytes = Vec::new();
        save_simulation(&mut bytes, &data).unwrap();

        let given = data.entities.iter().find(|e| e.handle == guard.to_bits().get()).unwrap();
        let given = given.name.as_ref().unwrap().given.as_bytes();
        let mut prefixed = (given.len() as u64).to_le_bytes().to_vec();
        prefixed.extend_from_slice(given);
        let at = bytes.windows(prefixed.len()).position(|w| w == prefixed).unwrap();
        bytes[at..at + 8].copy_from_slice(&(1u64 << 42).to_le_bytes());

        assert!(matches!(load_simulation(&bytes[..]), Err(SaveError::Bincode(_))));
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let (data, _) = sample();
        let mut bytes = Vec::new();
        save_simulation(&mut bytes, &data).unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(matches!(load_simulation(&bytes[..]), Err(SaveError::Bincode(_))));
    }
}
