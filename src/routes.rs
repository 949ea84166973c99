use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState, db,
    error::{AppError, AppResult},
    models::{GetAllMoviesOptions, Movie, SortOrder},
};

pub const USER_ID_HEADER: &str = "x-user-id";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/movies", get(list_movies).post(create_movie))
        .route("/api/movies/{id}", get(get_movie).put(update_movie).delete(delete_movie))
        .route(
            "/api/movies/{id}/ratings",
            get(get_movie_rating).put(rate_movie).delete(delete_rating),
        )
        .route("/api/ratings/me", get(my_ratings))
        .route("/_health", get(health))
        .with_state(state)
}

/// The caller's user id, read from the `x-user-id` header.
pub struct CurrentUser(pub Option<Uuid>);

impl CurrentUser {
    fn require(self) -> AppResult<Uuid> {
        self.0.ok_or(AppError::Unauthorized)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(CurrentUser(None));
        };
        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or(AppError::Unauthorized)?;
        Ok(CurrentUser(Some(id)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRequest {
    pub title: String,
    pub year_of_release: i32,
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RateMovieRequest {
    pub rating: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMoviesQuery {
    title: Option<String>,
    year: Option<i32>,
    sort_by: Option<String>,
    page: Option<u64>,
    page_size: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub year_of_release: i32,
    pub rating: Option<f64>,
    pub user_rating: Option<i32>,
    pub genres: Vec<String>,
}

impl From<Movie> for MovieResponse {
    fn from(movie: Movie) -> Self {
        Self {
            slug: movie.slug(),
            id: movie.id,
            title: movie.title,
            year_of_release: movie.year_of_release,
            rating: movie.rating,
            user_rating: movie.user_rating,
            genres: movie.genres,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviesResponse {
    pub items: Vec<MovieResponse>,
    pub page: u64,
    pub page_size: u64,
}

impl ListMoviesQuery {
    fn into_options(self, user_id: Option<Uuid>) -> GetAllMoviesOptions {
        let defaults = GetAllMoviesOptions::default();
        let (sort_field, sort_order) = parse_sort_by(self.sort_by.as_deref());
        GetAllMoviesOptions {
            title: self.title,
            year_of_release: self.year,
            sort_field,
            sort_order,
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            user_id: None,
        }
        .with_user(user_id)
    }
}

/// `-field` sorts descending, `field` or `+field` ascending.
fn parse_sort_by(sort_by: Option<&str>) -> (Option<String>, SortOrder) {
    match sort_by.map(str::trim).filter(|s| !s.is_empty()) {
        None => (None, SortOrder::Unsorted),
        Some(s) => match s.strip_prefix('-') {
            Some(field) => (Some(field.to_string()), SortOrder::Descending),
            None => (Some(s.trim_start_matches('+').to_string()), SortOrder::Ascending),
        },
    }
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MovieRequest>,
) -> AppResult<Response> {
    let movie = Movie::new(Uuid::new_v4(), req.title, req.year_of_release, req.genres);
    if !state.catalog.create_movie(&movie, &state.request_token()).await? {
        return Ok(StatusCode::CONFLICT.into_response());
    }

    let location = format!("/api/movies/{}", movie.id);
    let mut resp = (StatusCode::CREATED, Json(MovieResponse::from(movie))).into_response();
    if let Ok(value) = HeaderValue::from_str(&location) {
        resp.headers_mut().insert(header::LOCATION, value);
    }
    Ok(resp)
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id_or_slug): Path<String>,
) -> AppResult<Json<MovieResponse>> {
    let movie = state
        .catalog
        .get_movie(&id_or_slug, user_id, &state.request_token())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(movie.into()))
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ListMoviesQuery>,
) -> AppResult<Json<MoviesResponse>> {
    let options = query.into_options(user_id);
    let movies = state.catalog.list_movies(&options, &state.request_token()).await?;
    Ok(Json(MoviesResponse {
        items: movies.into_iter().map(MovieResponse::from).collect(),
        page: options.page,
        page_size: options.page_size,
    }))
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<MovieRequest>,
) -> AppResult<Json<MovieResponse>> {
    let cancel = state.request_token();
    let movie = Movie::new(id, req.title, req.year_of_release, req.genres);
    if !state.catalog.update_movie(&movie, &cancel).await? {
        return Err(AppError::NotFound);
    }

    let updated =
        state.catalog.get_movie_by_id(id, user_id, &cancel).await?.ok_or(AppError::NotFound)?;
    Ok(Json(updated.into()))
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.catalog.delete_movie(id, &state.request_token()).await? {
        Ok(StatusCode::OK)
    } else {
        Err(AppError::NotFound)
    }
}

pub async fn get_movie_rating(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let summary = state
        .catalog
        .get_movie_rating(id, user_id, &state.request_token())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(summary).into_response())
}

pub async fn rate_movie(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RateMovieRequest>,
) -> AppResult<StatusCode> {
    let user_id = user.require()?;
    if state.catalog.rate_movie(id, user_id, req.rating, &state.request_token()).await? {
        Ok(StatusCode::OK)
    } else {
        Err(AppError::NotFound)
    }
}

pub async fn delete_rating(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let user_id = user.require()?;
    if state.catalog.delete_rating(id, user_id, &state.request_token()).await? {
        Ok(StatusCode::OK)
    } else {
        Err(AppError::NotFound)
    }
}

pub async fn my_ratings(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> AppResult<Response> {
    let user_id = user.require()?;
    let ratings = state.catalog.get_user_ratings(user_id, &state.request_token()).await?;
    Ok(Json(ratings).into_response())
}

pub async fn health(State(state): State<Arc<AppState>>) -> StatusCode {
    match db::ping(&state.db).await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "database health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        },
    }
}
