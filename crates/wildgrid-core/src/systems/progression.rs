//! Experience and leveling for creatures

use hecs::{Entity, World};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;
use wildgrid_logic::config::LevelingConfig;
use wildgrid_logic::health::apply_xp;
use wildgrid_logic::quests::QuestFocus;

use crate::components::{Creature, Focus, Progression, Vitals};

/// Grant XP to a creature. Returns the new level if it leveled up.
///
/// A level-up fully heals, stretches max age, and may unlock or switch
/// the creature's quest focus.
pub fn grant_xp(
    world: &mut World,
    entity: Entity,
    amount: u32,
    config: &LevelingConfig,
    rng: &mut impl Rng,
) -> Option<u32> {
    let gain = {
        let mut progression = world.get::<&mut Progression>(entity).ok()?;
        let gain = apply_xp(progression.level, progression.xp, amount, config);
        progression.level = gain.level;
        progression.xp = gain.xp;
        if gain.levels_gained > 0 {
            let growth = config.max_age_growth.powi(gain.levels_gained as i32);
            progression.max_age = (progression.max_age as f32 * growth) as u64;
        }
        gain
    };
    if gain.levels_gained == 0 {
        return None;
    }

    let max_health = world
        .get::<&Creature>(entity)
        .map(|c| c.max_health(gain.level))
        .unwrap_or(0.0);
    if let Ok(mut vitals) = world.get::<&mut Vitals>(entity) {
        vitals.health = max_health;
    }

    if let Ok(mut focus) = world.get::<&mut Focus>(entity) {
        if rng.gen::<f32>() < config.focus_unlock_chance {
            let locked: Vec<QuestFocus> = QuestFocus::ALL
                .into_iter()
                .filter(|f| !focus.unlocked.contains(f))
                .collect();
            if let Some(next) = locked.choose(rng) {
                focus.unlock(*next);
            }
        }
        if rng.gen::<f32>() < config.focus_switch_chance {
            if let Some(active) = focus.unlocked.choose(rng) {
                focus.active = *active;
            }
        }
    }

    debug!(?entity, level = gain.level, "creature leveled up");
    Some(gain.level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use wildgrid_logic::species::{CreatureKind, PeacefulRole};

    #[test]
    fn level_up_heals_and_ages() {
        let mut world = World::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let creature = Creature::new(CreatureKind::Peaceful(PeacefulRole::Miner));
        let mut vitals = Vitals::full(creature.max_health(1));
        vitals.health = 5.0;
        let e = world.spawn((creature, vitals, Progression::new(1, 1000)));

        let config = LevelingConfig::default();
        assert_eq!(grant_xp(&mut world, e, 50, &config, &mut rng), None);
        assert_eq!(grant_xp(&mut world, e, 60, &config, &mut rng), Some(2));

        let progression = *world.get::<&Progression>(e).unwrap();
        assert_eq!(progression.xp, 10);
        assert_eq!(progression.max_age, 1200);
        assert_eq!(world.get::<&Vitals>(e).unwrap().health, 220.0);
    }

    #[test]
    fn guaranteed_unlock_adds_a_focus() {
        let mut world = World::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let creature = Creature::new(CreatureKind::Peaceful(PeacefulRole::Farmer));
        let e = world.spawn((
            creature,
            Vitals::full(80.0),
            Progression::new(1, 1000),
            Focus::new(QuestFocus::Farming),
        ));
        let config = LevelingConfig {
            focus_unlock_chance: 1.0,
            ..LevelingConfig::default()
        };
        grant_xp(&mut world, e, 100, &config, &mut rng);
        assert_eq!(world.get::<&Focus>(e).unwrap().unlocked.len(), 2);
    }
}
