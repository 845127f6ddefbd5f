use crate::config::{ApiConfig, OccupancyConfig};
use crate::db::models::location_models::{AuditoriumResponse, BuildingResponse, CityResponse};
use crate::db::models::{HourlyLoad, OccupancyReading};
use crate::db::repositories::{LocationsRepository, OccupancyRepository};
use crate::db::DatabaseService;
use crate::error::Error;
use crate::freshness;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<DatabaseService>,
    pub db_pool: Arc<PgPool>,
    pub freshness_max_minutes: i64,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
    pub status: u16,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(_) | Error::CameraUnknown(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::NOT_FOUND.as_u16(),
            },
            Error::Validation(_) | Error::Config(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::BAD_REQUEST.as_u16(),
            },
            _ => ApiError {
                message: err.to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            },
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = err.downcast_ref::<Error>() {
            return err.clone().into();
        }

        ApiError {
            message: err.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    }
}

/// Implement IntoResponse for ApiError
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self);
        (status, body).into_response()
    }
}

/// Latest occupancy for an auditorium plus a freshness verdict.
#[derive(Debug, Serialize)]
pub struct AuditoriumOccupancyResponse {
    pub auditorium_id: i64,
    pub person_count: i64,
    pub actual_timestamp: DateTime<Utc>,
    pub is_fresh: bool,
    pub time_diff_minutes: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl AuditoriumOccupancyResponse {
    fn from_reading(reading: OccupancyReading, as_of: DateTime<Utc>, max_minutes: i64) -> Self {
        let verdict = freshness::evaluate(reading.timestamp, as_of, max_minutes);
        Self {
            auditorium_id: reading.auditorium_id,
            person_count: reading.person_count,
            actual_timestamp: reading.timestamp,
            is_fresh: verdict.is_fresh,
            time_diff_minutes: verdict.elapsed_minutes,
            warning: verdict.warning,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OccupancyQuery {
    /// Query instant; defaults to now.
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// UTC day to report; defaults to today.
    pub day: Option<NaiveDate>,
}

/// Hourly load for one auditorium and day. `no_data` is set when the day has
/// no observations at all; an all-zero `hours` list with `no_data` false
/// means people were counted and there were none.
#[derive(Debug, Serialize)]
pub struct AuditoriumStatsResponse {
    pub auditorium_id: i64,
    pub day: NaiveDate,
    pub no_data: bool,
    pub hours: Vec<HourlyLoad>,
}

pub struct RestApi {
    config: ApiConfig,
    state: AppState,
}

impl RestApi {
    pub fn new(
        config: &ApiConfig,
        occupancy: &OccupancyConfig,
        database: Arc<DatabaseService>,
    ) -> Result<Self> {
        let db_pool = Arc::clone(&database.pool);
        Ok(Self {
            config: config.clone(),
            state: AppState {
                database,
                db_pool,
                freshness_max_minutes: occupancy.freshness_max_minutes,
            },
        })
    }

    pub async fn run(&self) -> Result<()> {
        // Allow cross-origin requests (useful for remote frontend testing)
        use std::time::Duration;
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600));

        let app = Router::new()
            .route("/health", get(health))
            .route("/v1/cities", get(get_cities))
            .route("/v1/cities/:city_id/buildings", get(get_buildings_by_city))
            .route(
                "/v1/cities/:city_id/buildings/:building_id/auditoriums",
                get(get_auditoriums_by_building),
            )
            .route(
                "/v1/auditoriums/:auditorium_id/occupancy",
                get(get_occupancy_by_auditorium),
            )
            .route(
                "/v1/buildings/:building_id/occupancy",
                get(get_occupancy_by_building),
            )
            .route(
                "/v1/auditoriums/:auditorium_id/stats",
                get(get_auditorium_stats),
            )
            .with_state(self.state.clone())
            .layer(cors);

        let addr = self.config.address.clone() + ":" + &self.config.port.to_string();
        let addr: SocketAddr = addr.parse()?;

        info!("API server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::Server::from_tcp(listener.into_std()?)?
            .serve(app.into_make_service())
            .await?;

        Ok(())
    }
}

async fn health(State(state): State<AppState>) -> Response {
    if state.database.health_check().await {
        (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "degraded" })),
        )
            .into_response()
    }
}

async fn get_cities(State(state): State<AppState>) -> ApiResult<Json<Vec<CityResponse>>> {
    let repo = LocationsRepository::new(Arc::clone(&state.db_pool));
    let cities = repo.get_cities().await?;
    Ok(Json(cities.into_iter().map(CityResponse::from).collect()))
}

async fn get_buildings_by_city(
    State(state): State<AppState>,
    Path(city_id): Path<i64>,
) -> ApiResult<Json<Vec<BuildingResponse>>> {
    let repo = LocationsRepository::new(Arc::clone(&state.db_pool));
    let buildings = repo.get_buildings_by_city(city_id).await?;
    Ok(Json(
        buildings.into_iter().map(BuildingResponse::from).collect(),
    ))
}

async fn get_auditoriums_by_building(
    State(state): State<AppState>,
    Path((_city_id, building_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Vec<AuditoriumResponse>>> {
    let repo = LocationsRepository::new(Arc::clone(&state.db_pool));
    let auditoriums = repo.get_auditoriums_by_building(building_id).await?;
    Ok(Json(
        auditoriums
            .into_iter()
            .map(AuditoriumResponse::from)
            .collect(),
    ))
}

async fn get_occupancy_by_auditorium(
    State(state): State<AppState>,
    Path(auditorium_id): Path<i64>,
    Query(query): Query<OccupancyQuery>,
) -> ApiResult<Json<AuditoriumOccupancyResponse>> {
    let repo = OccupancyRepository::new(Arc::clone(&state.db_pool));
    let as_of = query.at.unwrap_or_else(Utc::now);

    let reading = repo
        .latest_for_auditorium(auditorium_id, as_of)
        .await?
        .ok_or_else(|| ApiError {
            message: format!(
                "no occupancy records found for auditorium {} before {}",
                auditorium_id,
                as_of.to_rfc3339()
            ),
            status: StatusCode::NOT_FOUND.as_u16(),
        })?;

    Ok(Json(AuditoriumOccupancyResponse::from_reading(
        reading,
        as_of,
        state.freshness_max_minutes,
    )))
}

async fn get_occupancy_by_building(
    State(state): State<AppState>,
    Path(building_id): Path<i64>,
    Query(query): Query<OccupancyQuery>,
) -> ApiResult<Json<Vec<AuditoriumOccupancyResponse>>> {
    let repo = OccupancyRepository::new(Arc::clone(&state.db_pool));
    let as_of = query.at.unwrap_or_else(Utc::now);

    let readings = repo.latest_by_building(building_id, as_of).await?;

    Ok(Json(
        readings
            .into_iter()
            .map(|r| {
                AuditoriumOccupancyResponse::from_reading(r, as_of, state.freshness_max_minutes)
            })
            .collect(),
    ))
}

async fn get_auditorium_stats(
    State(state): State<AppState>,
    Path(auditorium_id): Path<i64>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<AuditoriumStatsResponse>> {
    let repo = OccupancyRepository::new(Arc::clone(&state.db_pool));
    let day = query.day.unwrap_or_else(|| Utc::now().date_naive());

    let (no_data, hours) = match repo.hourly_stats(auditorium_id, day).await? {
        Some(hours) => (false, hours),
        None => (true, Vec::new()),
    };

    Ok(Json(AuditoriumStatsResponse {
        auditorium_id,
        day,
        no_data,
        hours,
    }))
}
