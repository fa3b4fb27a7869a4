use crate::client::PokeApiClient;
use crate::effectiveness::TypeCount;
use crate::error::PokeApiError;
use crate::pokemon::{BaseStats, NamedEntry, Pokemon};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::sync::Arc;

pub const MAX_TEAM_SIZE: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TeamError {
    #[error("team slot {0} is out of range, a team has six slots")]
    SlotOutOfRange(usize),
}

/// Six slots, each empty or holding a Pokémon.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Team {
    slots: [Option<Arc<Pokemon>>; MAX_TEAM_SIZE],
}

impl Team {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the first slots in order; extra members beyond six are ignored.
    pub fn from_members(members: impl IntoIterator<Item = Arc<Pokemon>>) -> Self {
        let mut team = Self::new();
        for (slot, member) in team.slots.iter_mut().zip(members) {
            *slot = Some(member);
        }
        team
    }

    /// Puts a Pokémon in a slot, returning whatever was there.
    pub fn set(&mut self, slot: usize, pokemon: Arc<Pokemon>) -> Result<Option<Arc<Pokemon>>, TeamError> {
        let entry = self.slots.get_mut(slot).ok_or(TeamError::SlotOutOfRange(slot))?;
        Ok(entry.replace(pokemon))
    }

    pub fn remove(&mut self, slot: usize) -> Result<Option<Arc<Pokemon>>, TeamError> {
        let entry = self.slots.get_mut(slot).ok_or(TeamError::SlotOutOfRange(slot))?;
        Ok(entry.take())
    }

    pub fn get(&self, slot: usize) -> Option<&Arc<Pokemon>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Occupied slots in slot order.
    pub fn members(&self) -> Vec<Arc<Pokemon>> {
        self.slots.iter().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamAnalysis {
    pub weaknesses: Vec<TypeCount>,
    pub resistances: Vec<TypeCount>,
    pub average_stats: Option<BaseStats>,
}

/// Per-stat integer mean, truncating. `None` for no members.
pub fn average_stats(members: &[Arc<Pokemon>]) -> Option<BaseStats> {
    if members.is_empty() {
        return None;
    }

    let mut totals = [0u64; 6];
    for member in members {
        for (total, value) in totals.iter_mut().zip(member.stats.as_array()) {
            *total += u64::from(value);
        }
    }

    let count = members.len() as u64;
    let mut averages = [0u32; 6];
    for (average, total) in averages.iter_mut().zip(totals) {
        *average = u32::try_from(total / count).unwrap_or(u32::MAX);
    }
    Some(BaseStats::from_array(averages))
}

/// Up to six distinct entries from the name index.
pub fn pick_random_entries<R: Rng + ?Sized>(index: &[NamedEntry], rng: &mut R) -> Vec<NamedEntry> {
    index
        .choose_multiple(rng, MAX_TEAM_SIZE.min(index.len()))
        .cloned()
        .collect()
}

impl PokeApiClient {
    pub async fn analyze_team(&self, team: &Team) -> TeamAnalysis {
        let members = team.members();
        TeamAnalysis {
            weaknesses: self.team_weaknesses(&members).await,
            resistances: self.team_resistances(&members).await,
            average_stats: average_stats(&members),
        }
    }

    /// Fetches each picked entry into consecutive slots. A network failure
    /// aborts the whole team; any other failure leaves that slot empty.
    pub async fn team_from_entries(&self, picks: &[NamedEntry]) -> Result<Team, PokeApiError> {
        let mut team = Team::new();
        for (slot, entry) in picks.iter().take(MAX_TEAM_SIZE).enumerate() {
            match self.get_entity_by_id(entry.id).await {
                Ok(pokemon) => {
                    team.slots[slot] = Some(pokemon);
                }
                Err(e @ PokeApiError::Network(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!("Leaving slot {} empty, {} failed: {:?}", slot, entry.name, e);
                }
            }
        }
        Ok(team)
    }

    pub async fn random_team<R: Rng + Send + ?Sized>(&self, rng: &mut R) -> Result<Team, PokeApiError> {
        let index = self.get_all_names().await?;
        let picks = pick_random_entries(&index, rng);
        self.team_from_entries(&picks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{client, kanto};
    use crate::pokemon::fixtures::pokemon_body;
    use crate::transport::TransportError;
    use crate::types::PokemonType;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn pokemon(id: u32, name: &str, types: Vec<PokemonType>, stats: [u32; 6]) -> Arc<Pokemon> {
        Arc::new(Pokemon {
            id,
            name: name.to_string(),
            types,
            stats: BaseStats::from_array(stats),
            abilities: Vec::new(),
            height: 1,
            weight: 1,
            sprite_url: None,
            sprite_shiny_url: None,
        })
    }

    #[test]
    fn test_slots() {
        let mut team = Team::new();
        assert!(team.is_empty());

        let pikachu = pokemon(25, "Pikachu", vec![PokemonType::Electric], [35, 55, 40, 50, 50, 90]);
        assert_eq!(team.set(3, Arc::clone(&pikachu)), Ok(None));
        assert_eq!(team.len(), 1);
        assert_eq!(team.get(3).map(|p| p.id), Some(25));
        assert_eq!(team.set(6, pikachu), Err(TeamError::SlotOutOfRange(6)));

        assert_eq!(team.remove(3).unwrap().map(|p| p.id), Some(25));
        assert!(team.is_empty());
        assert_eq!(team.remove(9), Err(TeamError::SlotOutOfRange(9)));
    }

    #[test]
    fn test_from_members_caps_at_six() {
        let members = (1..=8).map(|id| pokemon(id, "Mew", vec![PokemonType::Psychic], [100; 6]));
        let team = Team::from_members(members);
        assert_eq!(team.len(), MAX_TEAM_SIZE);
        assert_eq!(team.members().last().map(|p| p.id), Some(6));
    }

    #[test]
    fn test_average_stats_truncates() {
        let members = vec![
            pokemon(1, "A", vec![PokemonType::Normal], [10, 20, 30, 40, 50, 61]),
            pokemon(2, "B", vec![PokemonType::Normal], [11, 20, 31, 40, 50, 60]),
        ];
        assert_eq!(
            average_stats(&members),
            Some(BaseStats::from_array([10, 20, 30, 40, 50, 60]))
        );
        assert_eq!(average_stats(&[]), None);
    }

    #[test]
    fn test_pick_random_entries_is_distinct() {
        let index: Vec<NamedEntry> = (1..=20)
            .map(|id| NamedEntry {
                name: format!("mon{}", id),
                id,
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        let picks = pick_random_entries(&index, &mut rng);
        assert_eq!(picks.len(), MAX_TEAM_SIZE);
        let mut ids: Vec<u32> = picks.iter().map(|e| e.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), MAX_TEAM_SIZE);

        let short = &index[..2];
        assert_eq!(pick_random_entries(short, &mut rng).len(), 2);
    }

    #[tokio::test]
    async fn test_shared_weakness_counts_twice() {
        let stub = kanto();
        let client = client(&stub);

        // Both take super-effective Electric damage; Grass is cancelled by Gyarados' Flying half.
        let squirtle = client.get_entity("squirtle").await.unwrap();
        let gyarados = client.get_entity("gyarados").await.unwrap();
        let team = Team::from_members([squirtle, gyarados]);

        let analysis = client.analyze_team(&team).await;
        assert_eq!(
            analysis.weaknesses,
            vec![
                TypeCount { label: PokemonType::Electric, count: 2 },
                TypeCount { label: PokemonType::Grass, count: 1 },
                TypeCount { label: PokemonType::Rock, count: 1 },
            ]
        );
        assert_eq!(
            analysis.average_stats,
            Some(BaseStats::from_array([69, 86, 72, 55, 82, 62]))
        );
    }

    #[tokio::test]
    async fn test_team_resistances_weight_immunities() {
        let stub = kanto();
        let client = client(&stub);

        let gyarados = client.get_entity("gyarados").await.unwrap();
        let resistances = client.team_resistances(&[gyarados]).await;

        // Water halves Fire/Ice/Steel, Flying halves Bug/Fighting/Grass and is immune to Ground.
        assert_eq!(resistances[0], TypeCount { label: PokemonType::Ground, count: 2 });
        let ones: Vec<PokemonType> = resistances[1..].iter().map(|r| r.label).collect();
        assert_eq!(
            ones,
            vec![
                PokemonType::Bug,
                PokemonType::Fighting,
                PokemonType::Fire,
                PokemonType::Grass,
                PokemonType::Ice,
                PokemonType::Steel,
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_team_analysis() {
        let stub = kanto();
        let client = client(&stub);

        let analysis = client.analyze_team(&Team::new()).await;
        assert!(analysis.weaknesses.is_empty());
        assert!(analysis.resistances.is_empty());
        assert_eq!(analysis.average_stats, None);
        assert_eq!(stub.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_team_from_entries_skips_bad_entries() {
        let stub = kanto();
        stub.serve("pokemon/4", pokemon_body(4, "charmander", &["fire"], [39, 52, 43, 60, 50, 65]))
            .serve("pokemon/7", json!({"id": 7}));
        let client = client(&stub);

        let picks = vec![
            NamedEntry { name: "charmander".into(), id: 4 },
            NamedEntry { name: "squirtle".into(), id: 7 },
            NamedEntry { name: "missingno".into(), id: 0 },
        ];
        let team = client.team_from_entries(&picks).await.unwrap();
        assert_eq!(team.len(), 1);
        assert_eq!(team.get(0).map(|p| p.id), Some(4));
        assert!(team.get(1).is_none());
    }

    #[tokio::test]
    async fn test_team_from_entries_aborts_on_network_failure() {
        let stub = kanto();
        stub.fail("pokemon/4", TransportError::Connect("down".into()));
        let client = client(&stub);

        let picks = vec![NamedEntry { name: "charmander".into(), id: 4 }];
        let err = client.team_from_entries(&picks).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_random_team_draws_from_index() {
        let stub = kanto();
        for (id, name) in [(1, "bulbasaur"), (2, "ivysaur"), (3, "venusaur"), (4, "charmander"), (5, "charmeleon"), (6, "charizard"), (7, "squirtle")] {
            stub.serve(
                &format!("pokemon/{}", id),
                pokemon_body(id, name, &["normal"], [50; 6]),
            );
        }
        let client = client(&stub);

        let mut rng = StdRng::seed_from_u64(42);
        let team = client.random_team(&mut rng).await.unwrap();
        assert_eq!(team.len(), MAX_TEAM_SIZE);
        assert!(team.members().iter().all(|p| (1..=7).contains(&p.id)));
    }
}
