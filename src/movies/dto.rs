use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::movies::repo::Movie;

const DEFAULT_LIMIT: i64 = 8;
const MAX_LIMIT: i64 = 100;

/// Query parameters for the list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

impl ListParams {
    pub fn window(&self) -> PageWindow {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        PageWindow {
            page,
            limit,
            offset: (page - 1) * limit,
        }
    }

    pub fn search_fragment(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}

/// Body for create and update. Fields are optional so that missing ones
/// reject with 400 instead of a body-deserialization error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieUpsert {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub publishing_year: Option<i32>,
    #[serde(default)]
    pub poster: Option<String>,
}

pub struct ValidMovie {
    pub title: String,
    pub publishing_year: i32,
    pub poster: Option<String>,
}

impl MovieUpsert {
    pub fn validate(self) -> Result<ValidMovie, ApiError> {
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::validation("Title and publishing year are required"))?;
        let publishing_year = self
            .publishing_year
            .ok_or_else(|| ApiError::validation("Title and publishing year are required"))?;
        Ok(ValidMovie {
            title,
            publishing_year,
            poster: self.poster,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieResponse {
    pub id: Uuid,
    pub title: String,
    pub publishing_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Movie> for MovieResponse {
    fn from(m: Movie) -> Self {
        Self {
            id: m.id,
            title: m.title,
            publishing_year: m.publishing_year,
            poster: m.poster,
            user_id: m.user_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieListResponse {
    pub movies: Vec<MovieResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct MovieEnvelope {
    pub movie: MovieResponse,
}

#[derive(Debug, Serialize)]
pub struct MovieMutated {
    pub message: &'static str,
    pub movie: MovieResponse,
}

#[derive(Debug, Serialize)]
pub struct MovieDeleted {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<i64>, limit: Option<i64>, search: Option<&str>) -> ListParams {
        ListParams {
            page,
            limit,
            search: search.map(String::from),
        }
    }

    #[test]
    fn window_defaults_to_first_page_of_eight() {
        let w = params(None, None, None).window();
        assert_eq!(
            w,
            PageWindow {
                page: 1,
                limit: 8,
                offset: 0
            }
        );
    }

    #[test]
    fn window_clamps_out_of_range_values() {
        let w = params(Some(0), Some(0), None).window();
        assert_eq!(w.page, 1);
        assert_eq!(w.limit, 1);

        let w = params(Some(-3), Some(1000), None).window();
        assert_eq!(w.page, 1);
        assert_eq!(w.limit, 100);
    }

    #[test]
    fn window_computes_the_offset() {
        let w = params(Some(3), Some(10), None).window();
        assert_eq!(w.offset, 20);
    }

    #[test]
    fn search_fragment_drops_blank_input() {
        assert_eq!(params(None, None, Some("  arr ")).search_fragment(), Some("arr"));
        assert_eq!(params(None, None, Some("   ")).search_fragment(), None);
        assert_eq!(params(None, None, None).search_fragment(), None);
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 8), 0);
        assert_eq!(total_pages(1, 8), 1);
        assert_eq!(total_pages(8, 8), 1);
        assert_eq!(total_pages(9, 8), 2);
        assert_eq!(total_pages(2, 8), 1);
    }

    #[test]
    fn upsert_requires_title_and_year() {
        let missing: MovieUpsert = serde_json::from_str("{}").unwrap();
        assert!(missing.validate().is_err());

        let blank_title: MovieUpsert =
            serde_json::from_str(r#"{"title":"   ","publishingYear":2016}"#).unwrap();
        assert!(blank_title.validate().is_err());

        let no_year: MovieUpsert = serde_json::from_str(r#"{"title":"Arrival"}"#).unwrap();
        assert!(no_year.validate().is_err());

        let ok: MovieUpsert =
            serde_json::from_str(r#"{"title":" Arrival ","publishingYear":2016}"#).unwrap();
        let valid = ok.validate().unwrap();
        assert_eq!(valid.title, "Arrival");
        assert_eq!(valid.publishing_year, 2016);
        assert!(valid.poster.is_none());
    }

    #[test]
    fn movie_response_uses_camel_case_and_omits_missing_poster() {
        let movie = Movie {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Arrival".into(),
            publishing_year: 2016,
            poster: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(MovieResponse::from(movie)).unwrap();
        assert_eq!(json["publishingYear"], 2016);
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
        assert!(json.get("poster").is_none());
        assert!(json.get("userId").is_some());
    }

    #[test]
    fn list_response_field_names() {
        let body = MovieListResponse {
            movies: vec![],
            total: 2,
            page: 1,
            limit: 8,
            total_pages: 1,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["totalPages"], 1);
        assert!(json.get("movies").is_some());
    }
}
