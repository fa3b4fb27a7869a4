//! Memoizing PokeAPI client.
//!
//! Every fetcher checks its cache first and only stores successful results,
//! so a failed lookup is retried against the network on the next call. One
//! client owns one set of caches; a fresh client starts cold.
//!
//! Clearing bumps a generation counter under a write lock, and every cache
//! write checks the counter under the read lock. A fetch that started before
//! a clear finishes normally but its result is not stored.

use crate::cache::{CacheTrait, InmemoryCache, normalize_key};
use crate::config::PokemonConfig;
use crate::error::PokeApiError;
use crate::evolution::{EvolutionNode, EvolutionResolution};
use crate::pokemon::{
    NamedEntry, Pokemon, description_from_json, evolution_chain_url_from_json,
    name_index_from_json,
};
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::types::{PokemonType, TypeRecord, TypeRelations};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

const NAME_INDEX_KEY: &str = "all";

pub struct PokeApiClient {
    transport: Arc<dyn Transport>,
    config: PokemonConfig,
    pokemon_cache: InmemoryCache<Arc<Pokemon>>,
    type_cache: InmemoryCache<Arc<TypeRecord>>,
    names_cache: InmemoryCache<Arc<Vec<NamedEntry>>>,
    species_cache: InmemoryCache<String>,
    evolution_cache: InmemoryCache<Arc<EvolutionResolution>>,
    generation: RwLock<u64>,
}

/// PokeAPI path segments are lowercase ASCII words and digits joined by hyphens.
fn is_resource_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl PokeApiClient {
    pub fn new(config: PokemonConfig, transport: Arc<dyn Transport>) -> Self {
        tracing::info!(
            "Creating PokeAPI client for {} ({} Pokémon)",
            config.api_url,
            config.total_pokemon
        );

        Self {
            transport,
            config,
            pokemon_cache: InmemoryCache::new("pokemon"),
            type_cache: InmemoryCache::new("type"),
            names_cache: InmemoryCache::new("names"),
            species_cache: InmemoryCache::new("species"),
            evolution_cache: InmemoryCache::new("evolution"),
            generation: RwLock::new(0),
        }
    }

    pub fn with_http(config: PokemonConfig) -> Result<Self, TransportError> {
        Ok(Self::new(config, Arc::new(HttpTransport::new()?)))
    }

    /// Empties every cache at once; the next lookups go back to the network.
    pub fn clear_caches(&self) {
        let mut generation = self.generation.write().unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        self.pokemon_cache.clear();
        self.type_cache.clear();
        self.names_cache.clear();
        self.species_cache.clear();
        self.evolution_cache.clear();
    }

    fn generation(&self) -> u64 {
        *self.generation.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` under every key unless the caches were cleared after `started`.
    fn remember<T: Clone + Send + Sync>(
        &self,
        started: u64,
        cache: &InmemoryCache<T>,
        keys: &[String],
        value: &T,
    ) {
        let generation = self.generation.read().unwrap_or_else(PoisonError::into_inner);
        if *generation != started {
            tracing::debug!("Caches cleared during fetch, not storing {} entry", cache.name());
            return;
        }
        for key in keys {
            if let Err(e) = cache.insert(key, value.clone()) {
                tracing::warn!("Failed to cache {} entry {}: {}", cache.name(), key, e);
            }
        }
    }

    /// Total entries across all caches. Aliased keys count separately.
    pub fn cached_entries(&self) -> usize {
        self.pokemon_cache.size()
            + self.type_cache.size()
            + self.names_cache.size()
            + self.species_cache.size()
            + self.evolution_cache.size()
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), resource)
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Value, TransportError> {
        self.transport.get_json(url, timeout).await
    }

    pub async fn get_entity(&self, id_or_name: &str) -> Result<Arc<Pokemon>, PokeApiError> {
        let key = normalize_key(id_or_name);
        if !is_resource_key(&key) {
            tracing::debug!("Rejecting Pokémon lookup {:?} without a request", id_or_name);
            return Err(PokeApiError::NotFound {
                query: id_or_name.trim().to_string(),
            });
        }

        if let Some(pokemon) = self.pokemon_cache.get(&key) {
            return Ok(pokemon);
        }

        let started = self.generation();
        let resource = format!("pokemon/{}", key);
        let url = self.url(&resource);
        tracing::debug!("Cache miss for Pokémon {}, fetching from API", key);

        let body = self
            .fetch(&url, self.config.request_timeout())
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch Pokémon {}: {}", key, e);
                PokeApiError::from_entity_transport(e, id_or_name.trim())
            })?;

        let pokemon = Arc::new(Pokemon::from_json(&resource, body).inspect_err(|e| {
            tracing::error!("Malformed Pokémon {}: {:?}", key, e);
        })?);

        tracing::debug!("Successfully fetched Pokémon: {} (ID: {})", pokemon.name, pokemon.id);
        self.remember(
            started,
            &self.pokemon_cache,
            &[key, pokemon.key(), pokemon.id.to_string()],
            &pokemon,
        );
        Ok(pokemon)
    }

    pub async fn get_entity_by_id(&self, id: u32) -> Result<Arc<Pokemon>, PokeApiError> {
        self.get_entity(&id.to_string()).await
    }

    /// The `/type/{name}` resource, which carries both roster and damage relations.
    async fn fetch_type(&self, type_name: &str) -> Result<Arc<TypeRecord>, PokeApiError> {
        let key = normalize_key(type_name);
        let resource = format!("type/{}", key);
        if !is_resource_key(&key) {
            return Err(PokeApiError::data(resource, format!("{:?} is not a type name", type_name)));
        }

        if let Some(record) = self.type_cache.get(&key) {
            return Ok(record);
        }

        let started = self.generation();
        let url = self.url(&resource);
        let body = self
            .fetch(&url, self.config.request_timeout())
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch type {}: {}", key, e);
                PokeApiError::from_transport(e)
            })?;

        let record = Arc::new(TypeRecord::from_json(&resource, body)?);
        self.remember(
            started,
            &self.type_cache,
            &[key, record.label.api_name().to_string(), record.id.to_string()],
            &record,
        );
        Ok(record)
    }

    /// Ids of every Pokémon (alternate forms included) that has this type.
    pub async fn get_entities_by_type(&self, type_name: &str) -> Result<Vec<u32>, PokeApiError> {
        Ok(self.fetch_type(type_name).await?.pokemon_ids.clone())
    }

    pub async fn get_type_relations(&self, type_name: &str) -> Result<TypeRelations, PokeApiError> {
        Ok(self.fetch_type(type_name).await?.relations.clone())
    }

    /// Every Pokémon name with its id, fetched in a single request.
    pub async fn get_all_names(&self) -> Result<Arc<Vec<NamedEntry>>, PokeApiError> {
        if let Some(names) = self.names_cache.get(NAME_INDEX_KEY) {
            return Ok(names);
        }

        let started = self.generation();
        let resource = format!("pokemon?limit={}", self.config.total_pokemon);
        let url = self.url(&resource);
        let body = self
            .fetch(&url, self.config.index_request_timeout())
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch name index: {}", e);
                PokeApiError::from_transport(e)
            })?;

        let names = Arc::new(name_index_from_json(&resource, body)?);
        tracing::debug!("Loaded name index with {} entries", names.len());
        self.remember(started, &self.names_cache, &[NAME_INDEX_KEY.to_string()], &names);
        Ok(names)
    }

    /// Ids whose name contains `query` anywhere, case-insensitively, in index order.
    pub async fn search_by_name(&self, query: &str) -> Result<Vec<u32>, PokeApiError> {
        let needle = normalize_key(query);
        let names = self.get_all_names().await?;
        Ok(names
            .iter()
            .filter(|entry| entry.name.to_lowercase().contains(&needle))
            .map(|entry| entry.id)
            .collect())
    }

    /// Interprets free text from a search box: blank lists everything, digits
    /// select a single id, anything else is a name search.
    pub async fn resolve_query(&self, query: &str) -> Result<Vec<u32>, PokeApiError> {
        let query = normalize_key(query);
        if query.is_empty() {
            return Ok((1..=self.config.total_pokemon).collect());
        }

        if query.chars().all(|c| c.is_ascii_digit()) {
            return Ok(match query.parse::<u32>() {
                Ok(id) if (1..=self.config.total_pokemon).contains(&id) => vec![id],
                _ => Vec::new(),
            });
        }

        self.search_by_name(&query).await
    }

    /// Union of the rosters of every selected type, limited to base forms and sorted.
    pub async fn filter_by_types(&self, types: &[PokemonType]) -> Result<Vec<u32>, PokeApiError> {
        if types.is_empty() {
            return Ok((1..=self.config.total_pokemon).collect());
        }

        let mut ids = BTreeSet::new();
        for label in types {
            let roster = self.get_entities_by_type(label.api_name()).await?;
            ids.extend(
                roster
                    .into_iter()
                    .filter(|id| (1..=self.config.total_pokemon).contains(id)),
            );
        }
        Ok(ids.into_iter().collect())
    }

    async fn fetch_species(&self, key: &str) -> Result<(String, Value), PokeApiError> {
        if !is_resource_key(key) {
            return Err(PokeApiError::NotFound {
                query: key.to_string(),
            });
        }
        let resource = format!("pokemon-species/{}", key);
        let url = self.url(&resource);
        let body = self
            .fetch(&url, self.config.request_timeout())
            .await
            .map_err(PokeApiError::from_transport)?;
        Ok((resource, body))
    }

    /// English flavor text, or an empty string when it cannot be loaded.
    pub async fn get_description(&self, id_or_name: &str) -> String {
        let key = normalize_key(id_or_name);
        if key.is_empty() {
            return String::new();
        }
        if let Some(description) = self.species_cache.get(&key) {
            return description;
        }

        let started = self.generation();
        let result = match self.fetch_species(&key).await {
            Ok((resource, body)) => description_from_json(&resource, body),
            Err(e) => Err(e),
        };

        match result {
            Ok(description) => {
                self.remember(started, &self.species_cache, &[key], &description);
                description
            }
            Err(e) => {
                tracing::warn!("No description for {}: {:?}", key, e);
                String::new()
            }
        }
    }

    /// Species -> evolution chain -> every stage resolved to a full record.
    ///
    /// Failures on the way to the chain are returned as errors; a failure
    /// resolving an individual stage is reported in the resolution. Partial
    /// chains are cached only when the missing stage does not exist upstream.
    pub async fn resolve_evolution_chain(
        &self,
        id_or_name: &str,
    ) -> Result<EvolutionResolution, PokeApiError> {
        let key = normalize_key(id_or_name);
        if !is_resource_key(&key) {
            return Err(PokeApiError::NotFound {
                query: id_or_name.trim().to_string(),
            });
        }
        if let Some(resolution) = self.evolution_cache.get(&key) {
            return Ok(resolution.as_ref().clone());
        }

        let started = self.generation();
        let (resource, species) = self.fetch_species(&key).await?;
        let chain_url = evolution_chain_url_from_json(&resource, species)?;
        let body = self
            .fetch(&chain_url, self.config.request_timeout())
            .await
            .map_err(PokeApiError::from_transport)?;
        let root = EvolutionNode::from_json(&chain_url, body)?;

        let resolution = self.resolve_evolution_tree(&root).await;
        if resolution.is_settled() {
            let mut keys = vec![key];
            for stage in &resolution.stages {
                keys.push(stage.key());
                keys.push(stage.id.to_string());
            }
            self.remember(started, &self.evolution_cache, &keys, &Arc::new(resolution.clone()));
        }
        Ok(resolution)
    }

    /// Evolution line in pre-order; empty when it cannot be loaded, partial
    /// when a later stage fails.
    pub async fn get_evolution_chain(&self, id_or_name: &str) -> Vec<Arc<Pokemon>> {
        match self.resolve_evolution_chain(id_or_name).await {
            Ok(resolution) => resolution.stages,
            Err(e) => {
                tracing::warn!("No evolution chain for {}: {:?}", id_or_name.trim(), e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::pokemon::fixtures::pokemon_body;
    use crate::transport::stub::{BASE_URL, StubTransport};
    use serde_json::json;

    pub fn config() -> PokemonConfig {
        PokemonConfig {
            api_url: BASE_URL.to_string(),
            timeout: 10,
            index_timeout: 15,
            total_pokemon: 151,
        }
    }

    pub fn client(stub: &Arc<StubTransport>) -> PokeApiClient {
        PokeApiClient::new(config(), Arc::clone(stub) as Arc<dyn Transport>)
    }

    fn names(list: &[&str]) -> Vec<serde_json::Value> {
        list.iter().map(|n| json!({"name": n})).collect()
    }

    pub fn type_body(
        id: u32,
        name: &str,
        pokemon: &[u32],
        double: &[&str],
        half: &[&str],
        none: &[&str],
    ) -> serde_json::Value {
        let pokemon: Vec<serde_json::Value> = pokemon
            .iter()
            .map(|id| json!({"pokemon": {"url": format!("https://pokeapi.co/api/v2/pokemon/{}/", id)}}))
            .collect();
        json!({
            "id": id,
            "name": name,
            "pokemon": pokemon,
            "damage_relations": {
                "double_damage_from": names(double),
                "half_damage_from": names(half),
                "no_damage_from": names(none)
            }
        })
    }

    /// A small Kanto slice: a few Pokémon, their types and two evolution lines.
    pub fn kanto() -> Arc<StubTransport> {
        let stub = Arc::new(StubTransport::new());
        stub.serve(
            "pokemon/pikachu",
            pokemon_body(25, "pikachu", &["electric"], [35, 55, 40, 50, 50, 90]),
        )
        .serve(
            "pokemon/25",
            pokemon_body(25, "pikachu", &["electric"], [35, 55, 40, 50, 50, 90]),
        )
        .serve(
            "pokemon/squirtle",
            pokemon_body(7, "squirtle", &["water"], [44, 48, 65, 50, 64, 43]),
        )
        .serve(
            "pokemon/gyarados",
            pokemon_body(130, "gyarados", &["water", "flying"], [95, 125, 79, 60, 100, 81]),
        )
        .serve(
            "pokemon/charmander",
            pokemon_body(4, "charmander", &["fire"], [39, 52, 43, 60, 50, 65]),
        )
        .serve(
            "pokemon/charmeleon",
            pokemon_body(5, "charmeleon", &["fire"], [58, 64, 58, 80, 65, 80]),
        )
        .serve(
            "pokemon/charizard",
            pokemon_body(6, "charizard", &["fire", "flying"], [78, 84, 78, 109, 85, 100]),
        )
        .serve(
            "pokemon?limit=151",
            json!({"results": names(&["bulbasaur", "ivysaur", "venusaur", "charmander", "charmeleon", "charizard", "squirtle"])}),
        )
        .serve(
            "type/water",
            type_body(11, "water", &[7, 130, 10100], &["electric", "grass"], &["fire", "ice", "steel"], &[]),
        )
        .serve(
            "type/electric",
            type_body(13, "electric", &[25, 26], &["ground"], &["electric", "flying", "steel"], &[]),
        )
        .serve(
            "type/fire",
            type_body(10, "fire", &[4, 5, 6], &["ground", "rock", "water"], &["bug", "fire", "grass", "ice", "steel", "fairy"], &[]),
        )
        .serve(
            "type/flying",
            type_body(3, "flying", &[6, 130], &["electric", "ice", "rock"], &["bug", "fighting", "grass"], &["ground"]),
        )
        .serve(
            "pokemon-species/charmander",
            json!({
                "flavor_text_entries": [
                    {"flavor_text": "Obviously prefers\nhot places.", "language": {"name": "en"}}
                ],
                "evolution_chain": {"url": format!("{}/evolution-chain/2/", BASE_URL)}
            }),
        )
        .serve(
            "evolution-chain/2/",
            json!({
                "chain": {
                    "species": {"name": "charmander"},
                    "evolves_to": [{
                        "species": {"name": "charmeleon"},
                        "evolves_to": [{"species": {"name": "charizard"}, "evolves_to": []}]
                    }]
                }
            }),
        );
        stub
    }
}
