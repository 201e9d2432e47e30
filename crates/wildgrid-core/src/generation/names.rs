//! Name generation for NPCs and factions

use crate::components::Name;
use rand::Rng;
use wildgrid_logic::species::CreatureKind;

/// Generate a name for an NPC. The epithet comes from its kind.
pub fn generate_name(kind: CreatureKind, rng: &mut impl Rng) -> Name {
    let given = GIVEN_NAMES[rng.gen_range(0..GIVEN_NAMES.len())];
    Name::new(given, format!("the {}", title_case(kind.name())))
}

/// Generate a faction name, e.g. "Ashen Fang" or "Order of the Vale".
pub fn generate_faction_name(hostile: bool, rng: &mut impl Rng) -> String {
    if hostile {
        let adjective = CLAN_ADJECTIVES[rng.gen_range(0..CLAN_ADJECTIVES.len())];
        let noun = CLAN_NOUNS[rng.gen_range(0..CLAN_NOUNS.len())];
        format!("{adjective} {noun}")
    } else {
        let place = PLACES[rng.gen_range(0..PLACES.len())];
        format!("Order of the {place}")
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

static GIVEN_NAMES: &[&str] = &[
    "Alden", "Bram", "Cora", "Dain", "Edda", "Fenn", "Greta", "Hale", "Ilsa", "Jory",
    "Kestra", "Lorn", "Maren", "Nils", "Odra", "Pell", "Quill", "Rhosyn", "Sable", "Tamsin",
    "Ulric", "Vesna", "Wren", "Yara", "Zeke", "Ansel", "Brisa", "Corwin", "Dagny", "Eamon",
    "Fiora", "Garrick", "Hollis", "Isolde", "Joss", "Kael", "Liesel", "Mordecai", "Nessa",
    "Osric", "Perrin", "Rowena", "Soren", "Thea", "Ysolde",
];

static CLAN_ADJECTIVES: &[&str] = &[
    "Ashen", "Blood", "Crooked", "Grim", "Hollow", "Iron", "Rotting", "Black", "Red", "Howling",
];

static CLAN_NOUNS: &[&str] = &[
    "Fang", "Skulls", "Knives", "Maw", "Claws", "Horde", "Raiders", "Crows",
];

static PLACES: &[&str] = &[
    "Vale", "Oak", "Hearth", "Stone", "River", "Lantern", "Meadow", "Ridge",
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use wildgrid_logic::species::PeacefulRole;

    #[test]
    fn test_generate_name() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let name = generate_name(CreatureKind::Peaceful(PeacefulRole::Farmer), &mut rng);

        assert!(!name.given.is_empty());
        assert_eq!(name.epithet, "the Farmer");
    }

    #[test]
    fn test_name_variety() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let names: Vec<Name> = (0..100)
            .map(|_| generate_name(CreatureKind::Peaceful(PeacefulRole::Miner), &mut rng))
            .collect();

        let unique_given: std::collections::HashSet<_> = names.iter().map(|n| &n.given).collect();
        assert!(unique_given.len() > 10);
    }

    #[test]
    fn faction_names_by_hostility() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(generate_faction_name(false, &mut rng).starts_with("Order of the "));
        assert!(!generate_faction_name(true, &mut rng).starts_with("Order"));
    }
}
