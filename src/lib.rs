pub mod cache;
pub mod client;
pub mod config;
pub mod effectiveness;
pub mod error;
pub mod evolution;
pub mod pokemon;
pub mod server;
pub mod team;
pub mod transport;
pub mod types;

pub use cache::*;
pub use client::PokeApiClient;
pub use config::*;
pub use effectiveness::TypeCount;
pub use error::*;
pub use evolution::{EvolutionNode, EvolutionResolution};
pub use pokemon::{BaseStats, NamedEntry, Pokemon};
pub use team::{MAX_TEAM_SIZE, Team, TeamAnalysis, TeamError};
pub use transport::{HttpTransport, Transport, TransportError};
pub use types::{PokemonType, TypeRelations};
