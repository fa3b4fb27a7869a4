//! Evolution chains: the upstream tree and its pre-order flattening.

use crate::client::PokeApiClient;
use crate::error::PokeApiError;
use crate::pokemon::Pokemon;
use serde::Deserialize;
use std::sync::Arc;

/// One stage of an evolution tree, as served by `/evolution-chain/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvolutionNode {
    pub species: SpeciesRef,
    #[serde(default)]
    pub evolves_to: Vec<EvolutionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpeciesRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ChainResponse {
    chain: EvolutionNode,
}

impl EvolutionNode {
    pub(crate) fn from_json(resource: &str, body: serde_json::Value) -> Result<Self, PokeApiError> {
        serde_json::from_value::<ChainResponse>(body)
            .map(|response| response.chain)
            .map_err(|e| PokeApiError::data(resource, e.to_string()))
    }

    /// Species names in pre-order: a stage before its children, children in source order.
    pub fn flatten(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_into(&mut names);
        names
    }

    fn collect_into<'a>(&'a self, names: &mut Vec<&'a str>) {
        names.push(self.species.name.as_str());
        for child in &self.evolves_to {
            child.collect_into(names);
        }
    }
}

/// Outcome of resolving every stage of a chain to a full record.
#[derive(Debug, Clone, Default)]
pub struct EvolutionResolution {
    pub stages: Vec<Arc<Pokemon>>,
    /// The species whose lookup failed, with the failure. Stages after it were not resolved.
    pub interrupted_at: Option<(String, PokeApiError)>,
}

impl EvolutionResolution {
    pub fn is_complete(&self) -> bool {
        self.interrupted_at.is_none()
    }

    /// Complete, or stopped at a stage that does not exist upstream and so
    /// will stop there again on every retry.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.interrupted_at,
            None | Some((_, PokeApiError::NotFound { .. }))
        )
    }

    /// A single stage is not an evolution line worth showing.
    pub fn has_evolutions(&self) -> bool {
        self.stages.len() > 1
    }
}

impl PokeApiClient {
    /// Looks up every stage through the entity cache, stopping at the first failure.
    pub async fn resolve_evolution_tree(&self, root: &EvolutionNode) -> EvolutionResolution {
        let mut resolution = EvolutionResolution::default();

        for name in root.flatten() {
            match self.get_entity(name).await {
                Ok(pokemon) => resolution.stages.push(pokemon),
                Err(e) => {
                    tracing::warn!(
                        "Evolution chain interrupted at {} after {} stages: {:?}",
                        name,
                        resolution.stages.len(),
                        e
                    );
                    resolution.interrupted_at = Some((name.to_string(), e));
                    break;
                }
            }
        }

        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eevee_chain() -> serde_json::Value {
        json!({
            "id": 67,
            "chain": {
                "species": {"name": "eevee", "url": ""},
                "evolves_to": [
                    {"species": {"name": "vaporeon", "url": ""}, "evolves_to": []},
                    {"species": {"name": "jolteon", "url": ""}, "evolves_to": []},
                    {"species": {"name": "flareon", "url": ""}, "evolves_to": []}
                ]
            }
        })
    }

    #[test]
    fn test_flatten_linear_chain() {
        let body = json!({
            "chain": {
                "species": {"name": "charmander"},
                "evolves_to": [{
                    "species": {"name": "charmeleon"},
                    "evolves_to": [{"species": {"name": "charizard"}, "evolves_to": []}]
                }]
            }
        });
        let root = EvolutionNode::from_json("evolution-chain/2", body).unwrap();
        assert_eq!(root.flatten(), vec!["charmander", "charmeleon", "charizard"]);
    }

    #[test]
    fn test_flatten_branching_chain_keeps_source_order() {
        let root = EvolutionNode::from_json("evolution-chain/67", eevee_chain()).unwrap();
        assert_eq!(root.flatten(), vec!["eevee", "vaporeon", "jolteon", "flareon"]);
    }

    #[test]
    fn test_flatten_is_preorder() {
        let body = json!({
            "chain": {
                "species": {"name": "oddish"},
                "evolves_to": [
                    {
                        "species": {"name": "gloom"},
                        "evolves_to": [
                            {"species": {"name": "vileplume"}},
                            {"species": {"name": "bellossom"}}
                        ]
                    }
                ]
            }
        });
        let root = EvolutionNode::from_json("evolution-chain/18", body).unwrap();
        assert_eq!(root.flatten(), vec!["oddish", "gloom", "vileplume", "bellossom"]);
    }

    #[test]
    fn test_only_missing_stages_settle_a_partial_chain() {
        let complete = EvolutionResolution::default();
        assert!(complete.is_settled());

        let missing = EvolutionResolution {
            stages: Vec::new(),
            interrupted_at: Some((
                "deoxys".to_string(),
                PokeApiError::NotFound {
                    query: "deoxys".to_string(),
                },
            )),
        };
        assert!(missing.is_settled());

        let offline = EvolutionResolution {
            stages: Vec::new(),
            interrupted_at: Some((
                "deoxys".to_string(),
                PokeApiError::Network(crate::error::NetworkFailure::Timeout),
            )),
        };
        assert!(!offline.is_settled());
    }

    #[test]
    fn test_missing_chain_is_a_data_error() {
        let err = EvolutionNode::from_json("evolution-chain/1", json!({"id": 1})).unwrap_err();
        assert!(matches!(err, PokeApiError::Data { .. }));
    }
}
