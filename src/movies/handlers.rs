use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::extract::CurrentUser;
use crate::error::ApiError;
use crate::movies::dto::{
    total_pages, ListParams, MovieDeleted, MovieEnvelope, MovieListResponse, MovieMutated,
    MovieUpsert,
};
use crate::movies::repo::{Movie, MovieFilter};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route(
            "/movies/:id",
            get(get_movie).put(update_movie).delete(delete_movie),
        )
}

#[instrument(skip(state, params))]
pub async fn list_movies(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<MovieListResponse>, ApiError> {
    let window = params.window();
    let filter = MovieFilter {
        owner_id: user.id,
        title_substring: params.search_fragment(),
    };

    let movies = Movie::list_page(&state.db, filter, window.limit, window.offset).await?;
    let total = Movie::count(&state.db, filter).await?;

    Ok(Json(MovieListResponse {
        movies: movies.into_iter().map(Into::into).collect(),
        total,
        page: window.page,
        limit: window.limit,
        total_pages: total_pages(total, window.limit),
    }))
}

#[instrument(skip(state))]
pub async fn get_movie(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MovieEnvelope>, ApiError> {
    let movie = Movie::find_by_id(&state.db, user.id, id)
        .await?
        .ok_or(ApiError::NotFound("Movie"))?;
    Ok(Json(MovieEnvelope {
        movie: movie.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_movie(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<MovieUpsert>,
) -> Result<Json<MovieMutated>, ApiError> {
    let valid = payload.validate()?;
    let movie = Movie::create(
        &state.db,
        user.id,
        &valid.title,
        valid.publishing_year,
        valid.poster.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, movie_id = %movie.id, "movie created");
    Ok(Json(MovieMutated {
        message: "Movie created successfully",
        movie: movie.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_movie(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MovieUpsert>,
) -> Result<Json<MovieMutated>, ApiError> {
    let valid = payload.validate()?;
    let movie = Movie::update(
        &state.db,
        user.id,
        id,
        &valid.title,
        valid.publishing_year,
        valid.poster.as_deref(),
    )
    .await?
    .ok_or(ApiError::NotFound("Movie"))?;

    info!(user_id = %user.id, movie_id = %movie.id, "movie updated");
    Ok(Json(MovieMutated {
        message: "Movie updated successfully",
        movie: movie.into(),
    }))
}

#[instrument(skip(state))]
pub async fn delete_movie(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MovieDeleted>, ApiError> {
    if !Movie::delete(&state.db, user.id, id).await? {
        return Err(ApiError::NotFound("Movie"));
    }
    info!(user_id = %user.id, movie_id = %id, "movie deleted");
    Ok(Json(MovieDeleted {
        message: "Movie deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use crate::app::build_app;
    use crate::auth::jwt::{Claims, JwtKeys};
    use crate::config::AppConfig;
    use crate::state::AppState;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use jsonwebtoken::{encode, Header};
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn get_with_auth(auth: Option<(&str, &str)>) -> (StatusCode, serde_json::Value) {
        let app = build_app(AppState::for_tests());
        let mut builder = Request::builder().uri("/api/v1/movies");
        if let Some((name, value)) = auth {
            builder = builder.header(name, value);
        }
        let res = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn list_without_token_is_unauthorized() {
        let (status, body) = get_with_auth(None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn list_with_garbage_token_is_unauthorized() {
        let (status, body) =
            get_with_auth(Some((header::AUTHORIZATION.as_str(), "Bearer nonsense"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn list_with_expired_token_is_unauthorized() {
        let keys = JwtKeys::from_config(&AppConfig::for_tests().jwt);
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: (now - Duration::days(8)).unix_timestamp() as usize,
            exp: (now - Duration::days(1)).unix_timestamp() as usize,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();

        let (status, body) = get_with_auth(Some((
            header::AUTHORIZATION.as_str(),
            &format!("Bearer {token}"),
        )))
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        // Expired reads the same as forged.
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn expired_cookie_token_is_also_unauthorized() {
        let keys = JwtKeys::from_config(&AppConfig::for_tests().jwt);
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: (now - Duration::days(8)).unix_timestamp() as usize,
            exp: (now - Duration::days(1)).unix_timestamp() as usize,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();

        let (status, _) = get_with_auth(Some((
            header::COOKIE.as_str(),
            &format!("auth_token={token}"),
        )))
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
