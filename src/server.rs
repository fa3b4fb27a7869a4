// JSON routes over the client, for UI front-ends that run in another process.

use crate::client::PokeApiClient;
use crate::error::{NetworkFailure, PokeApiError};
use crate::evolution::EvolutionResolution;
use crate::pokemon::{NamedEntry, Pokemon};
use crate::team::{MAX_TEAM_SIZE, Team, TeamAnalysis};
use crate::types::PokemonType;
use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub client: PokeApiClient,
}

#[derive(Debug)]
pub enum ApiError {
    Upstream(PokeApiError),
    BadRequest(String),
    UnknownType(String),
}

impl From<PokeApiError> for ApiError {
    fn from(err: PokeApiError) -> Self {
        ApiError::Upstream(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    retryable: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, retryable) = match self {
            ApiError::Upstream(e) => {
                let status = match &e {
                    PokeApiError::NotFound { .. } => StatusCode::NOT_FOUND,
                    PokeApiError::Network(NetworkFailure::Unreachable | NetworkFailure::Timeout) => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    PokeApiError::Network(_) | PokeApiError::Data { .. } => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string(), e.is_retryable())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, false),
            ApiError::UnknownType(name) => {
                (StatusCode::NOT_FOUND, format!("Unknown type '{}'", name), false)
            }
        };
        (status, Json(ErrorBody { error, retryable })).into_response()
    }
}

fn parse_type(name: &str) -> Result<PokemonType, ApiError> {
    name.parse::<PokemonType>()
        .map_err(|_| ApiError::UnknownType(name.to_string()))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/pokemon/{id_or_name}", get(get_pokemon_handler))
        .route("/pokemon/{id_or_name}/description", get(get_description_handler))
        .route("/pokemon/{id_or_name}/evolution", get(get_evolution_handler))
        .route("/pokemon/{id_or_name}/weaknesses", get(get_weaknesses_handler))
        .route("/names", get(get_names_handler))
        .route("/search", get(search_handler))
        .route("/type/{name}", get(get_type_handler))
        .route("/filter", get(filter_handler))
        .route("/team/analysis", post(analyze_team_handler))
        .route("/team/random", get(random_team_handler))
        .route("/cache/clear", post(clear_cache_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[debug_handler]
async fn get_pokemon_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id_or_name): Path<String>,
) -> Result<Json<Arc<Pokemon>>, ApiError> {
    Ok(Json(app_state.client.get_entity(&id_or_name).await?))
}

#[derive(Serialize)]
struct DescriptionBody {
    description: String,
}

#[debug_handler]
async fn get_description_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id_or_name): Path<String>,
) -> Json<DescriptionBody> {
    let description = app_state.client.get_description(&id_or_name).await;
    Json(DescriptionBody { description })
}

#[derive(Serialize)]
struct EvolutionBody {
    stages: Vec<Arc<Pokemon>>,
    complete: bool,
}

impl From<EvolutionResolution> for EvolutionBody {
    fn from(resolution: EvolutionResolution) -> Self {
        Self {
            complete: resolution.is_complete(),
            stages: resolution.stages,
        }
    }
}

#[debug_handler]
async fn get_evolution_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id_or_name): Path<String>,
) -> Json<EvolutionBody> {
    match app_state.client.resolve_evolution_chain(&id_or_name).await {
        Ok(resolution) => Json(resolution.into()),
        Err(e) => {
            tracing::warn!("No evolution chain for {}: {:?}", id_or_name, e);
            Json(EvolutionBody {
                stages: Vec::new(),
                complete: false,
            })
        }
    }
}

#[debug_handler]
async fn get_weaknesses_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id_or_name): Path<String>,
) -> Result<Json<Vec<PokemonType>>, ApiError> {
    let pokemon = app_state.client.get_entity(&id_or_name).await?;
    Ok(Json(app_state.client.get_weaknesses(&pokemon.types).await))
}

#[debug_handler]
async fn get_names_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Arc<Vec<NamedEntry>>>, ApiError> {
    Ok(Json(app_state.client.get_all_names().await?))
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[debug_handler]
async fn search_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<u32>>, ApiError> {
    Ok(Json(app_state.client.resolve_query(&params.q).await?))
}

#[debug_handler]
async fn get_type_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<u32>>, ApiError> {
    let label = parse_type(&name)?;
    Ok(Json(app_state.client.get_entities_by_type(label.api_name()).await?))
}

#[derive(Deserialize)]
struct FilterParams {
    #[serde(default)]
    types: String,
}

#[debug_handler]
async fn filter_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<u32>>, ApiError> {
    let types = params
        .types
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(parse_type)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(app_state.client.filter_by_types(&types).await?))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MemberRef {
    Id(u32),
    Name(String),
}

impl MemberRef {
    fn key(&self) -> String {
        match self {
            MemberRef::Id(id) => id.to_string(),
            MemberRef::Name(name) => name.clone(),
        }
    }
}

#[derive(Deserialize)]
struct TeamRequest {
    members: Vec<MemberRef>,
}

#[derive(Serialize)]
struct TeamReport {
    members: Vec<Arc<Pokemon>>,
    analysis: TeamAnalysis,
}

#[debug_handler]
async fn analyze_team_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<TeamRequest>,
) -> Result<Json<TeamReport>, ApiError> {
    if request.members.len() > MAX_TEAM_SIZE {
        return Err(ApiError::BadRequest(format!(
            "A team holds at most {} Pokémon, got {}",
            MAX_TEAM_SIZE,
            request.members.len()
        )));
    }

    let mut members = Vec::with_capacity(request.members.len());
    for member in &request.members {
        members.push(app_state.client.get_entity(&member.key()).await?);
    }

    let team = Team::from_members(members.iter().cloned());
    let analysis = app_state.client.analyze_team(&team).await;
    Ok(Json(TeamReport { members, analysis }))
}

#[debug_handler]
async fn random_team_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Team>, ApiError> {
    let mut rng = StdRng::from_os_rng();
    Ok(Json(app_state.client.random_team(&mut rng).await?))
}

#[debug_handler]
async fn clear_cache_handler(State(app_state): State<Arc<AppState>>) -> StatusCode {
    app_state.client.clear_caches();
    tracing::info!("Cleared all caches on request");
    StatusCode::NO_CONTENT
}
