//! Defensive type effectiveness for single Pokémon and whole teams.
//!
//! A Pokémon's weakness to an attacking type is the product of that type's
//! multiplier against each of its own types. Immunity wins outright: once any
//! of the defender's types takes no damage from a label, the label stays at
//! zero no matter what the other type says.

use crate::client::PokeApiClient;
use crate::pokemon::Pokemon;
use crate::types::{PokemonType, TypeRelations};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// How many team members a type label affects (or, for resistances, a weighted score).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub label: PokemonType,
    pub count: u32,
}

/// Labels whose combined multiplier exceeds 1, sorted alphabetically.
pub fn weaknesses_from_relations<'a>(
    relations: impl IntoIterator<Item = &'a TypeRelations>,
) -> Vec<PokemonType> {
    let mut multipliers: BTreeMap<PokemonType, f64> = BTreeMap::new();
    let mut immune: BTreeSet<PokemonType> = BTreeSet::new();

    for relation in relations {
        for label in &relation.double_damage_from {
            *multipliers.entry(*label).or_insert(1.0) *= 2.0;
        }
        for label in &relation.half_damage_from {
            *multipliers.entry(*label).or_insert(1.0) *= 0.5;
        }
        for label in &relation.no_damage_from {
            immune.insert(*label);
            multipliers.insert(*label, 0.0);
        }
    }

    multipliers
        .into_iter()
        .filter(|(label, multiplier)| !immune.contains(label) && *multiplier > 1.0)
        .map(|(label, _)| label)
        .collect()
}

/// Half-damage sources score 1, immunities score 2.
pub fn resistance_scores<'a>(
    relations: impl IntoIterator<Item = &'a TypeRelations>,
) -> BTreeMap<PokemonType, u32> {
    let mut scores = BTreeMap::new();
    for relation in relations {
        for label in &relation.half_damage_from {
            *scores.entry(*label).or_insert(0) += 1;
        }
        for label in &relation.no_damage_from {
            *scores.entry(*label).or_insert(0) += 2;
        }
    }
    scores
}

/// Highest count first; equal counts in label order.
pub fn rank(counts: BTreeMap<PokemonType, u32>) -> Vec<TypeCount> {
    let mut ranked: Vec<TypeCount> = counts
        .into_iter()
        .map(|(label, count)| TypeCount { label, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.label.cmp(&b.label)));
    ranked
}

/// Tallies, per label, how many of the given weakness lists contain it.
pub fn count_weaknesses<'a>(lists: impl IntoIterator<Item = &'a [PokemonType]>) -> Vec<TypeCount> {
    let mut counts = BTreeMap::new();
    for list in lists {
        for label in list {
            *counts.entry(*label).or_insert(0) += 1;
        }
    }
    rank(counts)
}

impl PokeApiClient {
    /// Fetches relations for each type, skipping any that fail to load.
    async fn relations_for(&self, types: &[PokemonType]) -> Vec<TypeRelations> {
        let mut relations = Vec::with_capacity(types.len());
        for label in types {
            match self.get_type_relations(label.api_name()).await {
                Ok(relation) => relations.push(relation),
                Err(e) => {
                    tracing::warn!("Skipping {} damage relations: {:?}", label, e);
                }
            }
        }
        relations
    }

    /// Attacking types that deal more than normal damage to a Pokémon with these types.
    pub async fn get_weaknesses(&self, types: &[PokemonType]) -> Vec<PokemonType> {
        let relations = self.relations_for(types).await;
        weaknesses_from_relations(&relations)
    }

    pub async fn team_weaknesses(&self, members: &[Arc<Pokemon>]) -> Vec<TypeCount> {
        let mut lists = Vec::with_capacity(members.len());
        for member in members {
            lists.push(self.get_weaknesses(&member.types).await);
        }
        count_weaknesses(lists.iter().map(Vec::as_slice))
    }

    pub async fn team_resistances(&self, members: &[Arc<Pokemon>]) -> Vec<TypeCount> {
        let mut relations = Vec::new();
        for member in members {
            relations.extend(self.relations_for(&member.types).await);
        }
        rank(resistance_scores(&relations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use PokemonType::*;

    fn relations(double: &[PokemonType], half: &[PokemonType], none: &[PokemonType]) -> TypeRelations {
        TypeRelations::new(
            double.iter().copied().collect(),
            half.iter().copied().collect(),
            none.iter().copied().collect(),
        )
        .unwrap()
    }

    fn water() -> TypeRelations {
        relations(&[Electric, Grass], &[Fire, Ice, Steel], &[])
    }

    fn ground() -> TypeRelations {
        relations(&[Water, Grass, Ice], &[Poison, Rock], &[Electric])
    }

    fn flying() -> TypeRelations {
        relations(&[Electric, Ice, Rock], &[Grass, Fighting, Bug], &[Ground])
    }

    #[test]
    fn test_single_type_weaknesses() {
        assert_eq!(weaknesses_from_relations([&water()]), vec![Electric, Grass]);
    }

    #[test]
    fn test_no_types_means_no_weaknesses() {
        assert_eq!(weaknesses_from_relations(std::iter::empty()), Vec::<PokemonType>::new());
    }

    #[test]
    fn test_dual_type_multipliers_combine() {
        // Water/Ground: Grass is 4x, Ice cancels to 1x, Electric hits the Ground immunity.
        assert_eq!(weaknesses_from_relations([&water(), &ground()]), vec![Grass, Water]);
    }

    #[test]
    fn test_half_and_double_cancel_out() {
        // Ground/Flying: Grass 2x * 0.5 = 1x, Ice 2x * 2x = 4x.
        assert_eq!(weaknesses_from_relations([&ground(), &flying()]), vec![Ice, Water]);
    }

    #[test]
    fn test_immunity_is_sticky_regardless_of_order() {
        let immune_first = relations(&[], &[], &[Ghost]);
        let weak_second = relations(&[Ghost, Dark], &[], &[]);

        assert_eq!(weaknesses_from_relations([&immune_first, &weak_second]), vec![Dark]);
        assert_eq!(weaknesses_from_relations([&weak_second, &immune_first]), vec![Dark]);
    }

    #[test]
    fn test_count_weaknesses_ranks_shared_first() {
        let first = vec![Electric, Grass];
        let second = vec![Fighting, Grass, Ground];
        let ranked = count_weaknesses([first.as_slice(), second.as_slice()]);
        assert_eq!(
            ranked,
            vec![
                TypeCount { label: Grass, count: 2 },
                TypeCount { label: Electric, count: 1 },
                TypeCount { label: Fighting, count: 1 },
                TypeCount { label: Ground, count: 1 },
            ]
        );
    }

    #[test]
    fn test_resistance_scores_weight_immunities() {
        let scores = resistance_scores([&ground(), &flying()]);
        assert_eq!(scores.get(&Ground), Some(&2));
        assert_eq!(scores.get(&Electric), Some(&2));
        assert_eq!(scores.get(&Poison), Some(&1));

        let ranked = rank(scores);
        assert_eq!(ranked[0], TypeCount { label: Electric, count: 2 });
        assert_eq!(ranked[1], TypeCount { label: Ground, count: 2 });
        assert!(ranked[2..].iter().all(|entry| entry.count == 1));
        let tail: Vec<PokemonType> = ranked[2..].iter().map(|entry| entry.label).collect();
        assert_eq!(tail, vec![Bug, Fighting, Grass, Poison, Rock]);
    }
}
