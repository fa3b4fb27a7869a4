//! Elemental type labels and their defensive damage relations.

use crate::error::PokeApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The eighteen type labels.
///
/// Variants are declared in alphabetical order, so the derived `Ord` sorts
/// labels alphabetically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PokemonType {
    Bug,
    Dark,
    Dragon,
    Electric,
    Fairy,
    Fighting,
    Fire,
    Flying,
    Ghost,
    Grass,
    Ground,
    Ice,
    Normal,
    Poison,
    Psychic,
    Rock,
    Steel,
    Water,
}

impl PokemonType {
    pub const ALL: [PokemonType; 18] = [
        PokemonType::Bug,
        PokemonType::Dark,
        PokemonType::Dragon,
        PokemonType::Electric,
        PokemonType::Fairy,
        PokemonType::Fighting,
        PokemonType::Fire,
        PokemonType::Flying,
        PokemonType::Ghost,
        PokemonType::Grass,
        PokemonType::Ground,
        PokemonType::Ice,
        PokemonType::Normal,
        PokemonType::Poison,
        PokemonType::Psychic,
        PokemonType::Rock,
        PokemonType::Steel,
        PokemonType::Water,
    ];

    /// Lowercase name as used in upstream URLs.
    pub fn api_name(self) -> &'static str {
        use PokemonType::*;
        match self {
            Bug => "bug",
            Dark => "dark",
            Dragon => "dragon",
            Electric => "electric",
            Fairy => "fairy",
            Fighting => "fighting",
            Fire => "fire",
            Flying => "flying",
            Ghost => "ghost",
            Grass => "grass",
            Ground => "ground",
            Ice => "ice",
            Normal => "normal",
            Poison => "poison",
            Psychic => "psychic",
            Rock => "rock",
            Steel => "steel",
            Water => "water",
        }
    }

    /// Upstream numeric id of the type resource.
    pub fn type_id(self) -> u32 {
        use PokemonType::*;
        match self {
            Normal => 1,
            Fighting => 2,
            Flying => 3,
            Poison => 4,
            Ground => 5,
            Rock => 6,
            Bug => 7,
            Ghost => 8,
            Steel => 9,
            Fire => 10,
            Water => 11,
            Grass => 12,
            Electric => 13,
            Psychic => 14,
            Ice => 15,
            Dragon => 16,
            Dark => 17,
            Fairy => 18,
        }
    }
}

impl fmt::Display for PokemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown type: {0}")]
pub struct UnknownType(pub String);

impl FromStr for PokemonType {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PokemonType::ALL
            .into_iter()
            .find(|t| t.api_name() == wanted)
            .ok_or_else(|| UnknownType(s.to_string()))
    }
}

/// Which attacking types hit this type for 2x, 0.5x and 0x.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeRelations {
    pub double_damage_from: BTreeSet<PokemonType>,
    pub half_damage_from: BTreeSet<PokemonType>,
    pub no_damage_from: BTreeSet<PokemonType>,
}

impl TypeRelations {
    /// Builds relations, rejecting a label that appears in more than one set.
    pub fn new(
        double_damage_from: BTreeSet<PokemonType>,
        half_damage_from: BTreeSet<PokemonType>,
        no_damage_from: BTreeSet<PokemonType>,
    ) -> Result<Self, PokemonType> {
        let overlap = double_damage_from
            .intersection(&half_damage_from)
            .chain(double_damage_from.intersection(&no_damage_from))
            .chain(half_damage_from.intersection(&no_damage_from))
            .next()
            .copied();
        match overlap {
            Some(label) => Err(label),
            None => Ok(Self {
                double_damage_from,
                half_damage_from,
                no_damage_from,
            }),
        }
    }
}

/// A parsed `/type/{name}` resource: roster plus damage relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRecord {
    pub id: u32,
    pub label: PokemonType,
    pub pokemon_ids: Vec<u32>,
    pub relations: TypeRelations,
}

mod wire {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct NamedApiResource {
        pub name: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct UrlResource {
        pub url: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct TypePokemon {
        pub pokemon: UrlResource,
    }

    #[derive(Debug, Deserialize)]
    pub struct DamageRelations {
        pub double_damage_from: Vec<NamedApiResource>,
        pub half_damage_from: Vec<NamedApiResource>,
        pub no_damage_from: Vec<NamedApiResource>,
    }

    #[derive(Debug, Deserialize)]
    pub struct TypeResponse {
        pub id: u32,
        pub name: String,
        pub pokemon: Vec<TypePokemon>,
        pub damage_relations: DamageRelations,
    }
}

/// Extracts the trailing numeric path segment, e.g. `.../pokemon/25/` -> 25.
pub(crate) fn id_from_url(url: &str) -> Option<u32> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn label_set(
    resource: &str,
    field: &str,
    entries: &[wire::NamedApiResource],
) -> Result<BTreeSet<PokemonType>, PokeApiError> {
    entries
        .iter()
        .map(|entry| {
            entry.name.parse::<PokemonType>().map_err(|e| {
                PokeApiError::data(resource, format!("damage_relations.{}: {}", field, e))
            })
        })
        .collect()
}

impl TypeRecord {
    pub(crate) fn from_json(resource: &str, body: serde_json::Value) -> Result<Self, PokeApiError> {
        let raw: wire::TypeResponse = serde_json::from_value(body)
            .map_err(|e| PokeApiError::data(resource, e.to_string()))?;

        let label = raw
            .name
            .parse::<PokemonType>()
            .map_err(|e| PokeApiError::data(resource, format!("name: {}", e)))?;

        let pokemon_ids = raw
            .pokemon
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                id_from_url(&entry.pokemon.url).ok_or_else(|| {
                    PokeApiError::data(resource, format!("pokemon[{}].pokemon.url", i))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let relations = raw.damage_relations;
        let relations = TypeRelations::new(
            label_set(resource, "double_damage_from", &relations.double_damage_from)?,
            label_set(resource, "half_damage_from", &relations.half_damage_from)?,
            label_set(resource, "no_damage_from", &relations.no_damage_from)?,
        )
        .map_err(|dup| {
            PokeApiError::data(
                resource,
                format!("damage_relations: {} appears in more than one set", dup),
            )
        })?;

        Ok(Self {
            id: raw.id,
            label,
            pokemon_ids,
            relations,
        })
    }
}
