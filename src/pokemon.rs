// pokemon.rs
// Wire formats of the PokeAPI resources this crate reads, and the
// domain records they are validated into.

use crate::error::PokeApiError;
use crate::types::PokemonType;
use serde::{Deserialize, Serialize};

/// Six base stats, in upstream order.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseStats {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub sp_attack: u32,
    pub sp_defense: u32,
    pub speed: u32,
}

impl BaseStats {
    pub fn as_array(&self) -> [u32; 6] {
        [
            self.hp,
            self.attack,
            self.defense,
            self.sp_attack,
            self.sp_defense,
            self.speed,
        ]
    }

    pub fn from_array(values: [u32; 6]) -> Self {
        let [hp, attack, defense, sp_attack, sp_defense, speed] = values;
        Self {
            hp,
            attack,
            defense,
            sp_attack,
            sp_defense,
            speed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Pokemon {
    pub id: u32,
    /// Display form, e.g. "Pikachu".
    pub name: String,
    pub types: Vec<PokemonType>,
    pub stats: BaseStats,
    pub abilities: Vec<String>,
    pub height: u32,
    pub weight: u32,
    pub sprite_url: Option<String>,
    pub sprite_shiny_url: Option<String>,
}

impl Pokemon {
    /// Lowercase name used as a cache key.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn primary_type(&self) -> Option<PokemonType> {
        self.types.first().copied()
    }
}

/// One row of the full name index.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NamedEntry {
    pub name: String,
    pub id: u32,
}

/// Uppercases the first character and lowercases the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub(crate) mod wire {
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Clone)]
    pub struct NamedAPIResource {
        pub name: String,
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct UrlResource {
        pub url: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct PokemonSprites {
        pub front_default: Option<String>,
        #[serde(default)]
        pub front_shiny: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct PokemonStat {
        pub base_stat: u32,
    }

    #[derive(Debug, Deserialize)]
    pub struct PokemonType {
        pub r#type: NamedAPIResource,
    }

    #[derive(Debug, Deserialize)]
    pub struct PokemonAbility {
        pub ability: NamedAPIResource,
    }

    #[derive(Debug, Deserialize)]
    pub struct Pokemon {
        pub id: u32,
        pub name: String,
        pub height: u32,
        pub weight: u32,
        pub sprites: PokemonSprites,
        pub types: Vec<PokemonType>,
        pub stats: Vec<PokemonStat>,
        pub abilities: Vec<PokemonAbility>,
    }

    #[derive(Debug, Deserialize)]
    pub struct PokemonList {
        pub results: Vec<NamedAPIResource>,
    }

    #[derive(Debug, Deserialize)]
    pub struct FlavorText {
        pub flavor_text: String,
        pub language: NamedAPIResource,
    }

    #[derive(Debug, Deserialize)]
    pub struct FlavorTexts {
        pub flavor_text_entries: Vec<FlavorText>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SpeciesChainLink {
        pub evolution_chain: UrlResource,
    }
}

fn parse<T: serde::de::DeserializeOwned>(
    resource: &str,
    body: serde_json::Value,
) -> Result<T, PokeApiError> {
    serde_json::from_value(body).map_err(|e| PokeApiError::data(resource, e.to_string()))
}

impl Pokemon {
    /// Validates a `/pokemon/{id}` body into a domain record.
    pub(crate) fn from_json(resource: &str, body: serde_json::Value) -> Result<Self, PokeApiError> {
        let raw: wire::Pokemon = parse(resource, body)?;

        if raw.id == 0 {
            return Err(PokeApiError::data(resource, "id: must be positive"));
        }
        if raw.types.is_empty() || raw.types.len() > 2 {
            return Err(PokeApiError::data(
                resource,
                format!("types: expected 1 or 2 entries, got {}", raw.types.len()),
            ));
        }

        let types = raw
            .types
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.r#type.name.parse::<PokemonType>().map_err(|e| {
                    PokeApiError::data(resource, format!("types[{}].type.name: {}", i, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = [0u32; 6];
        for (i, slot) in stats.iter_mut().enumerate() {
            *slot = raw
                .stats
                .get(i)
                .map(|s| s.base_stat)
                .ok_or_else(|| PokeApiError::data(resource, format!("stats[{}].base_stat", i)))?;
        }

        Ok(Self {
            id: raw.id,
            name: capitalize(&raw.name),
            types,
            stats: BaseStats::from_array(stats),
            abilities: raw
                .abilities
                .iter()
                .map(|a| capitalize(&a.ability.name))
                .collect(),
            height: raw.height,
            weight: raw.weight,
            sprite_url: raw.sprites.front_default,
            sprite_shiny_url: raw.sprites.front_shiny,
        })
    }
}

/// Ids are assigned by position in the index, starting at 1.
pub(crate) fn name_index_from_json(
    resource: &str,
    body: serde_json::Value,
) -> Result<Vec<NamedEntry>, PokeApiError> {
    let raw: wire::PokemonList = parse(resource, body)?;
    Ok(raw
        .results
        .into_iter()
        .zip(1u32..)
        .map(|(entry, id)| NamedEntry {
            name: entry.name,
            id,
        })
        .collect())
}

/// First English flavor text with line breaks and runs of whitespace collapsed.
pub(crate) fn description_from_json(
    resource: &str,
    body: serde_json::Value,
) -> Result<String, PokeApiError> {
    let raw: wire::FlavorTexts = parse(resource, body)?;
    Ok(raw
        .flavor_text_entries
        .iter()
        .find(|entry| entry.language.name == "en")
        .map(|entry| entry.flavor_text.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default())
}

pub(crate) fn evolution_chain_url_from_json(
    resource: &str,
    body: serde_json::Value,
) -> Result<String, PokeApiError> {
    let raw: wire::SpeciesChainLink = parse(resource, body)?;
    Ok(raw.evolution_chain.url)
}
