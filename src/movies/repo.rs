use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Movie record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Movie {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub publishing_year: i32,
    pub poster: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// The closed set of list filters: always the owner, optionally a title
/// substring. No other field ever reaches the query.
#[derive(Debug, Clone, Copy)]
pub struct MovieFilter<'a> {
    pub owner_id: Uuid,
    pub title_substring: Option<&'a str>,
}

/// Wrap a raw fragment into a case-insensitive containment pattern,
/// escaping LIKE metacharacters so user input cannot widen the match.
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{escaped}%")
}

impl Movie {
    pub async fn list_page(
        db: &PgPool,
        filter: MovieFilter<'_>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Movie>> {
        let pattern = filter.title_substring.map(like_pattern);
        let rows = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, user_id, title, publishing_year, poster, created_at, updated_at
            FROM movies
            WHERE user_id = $1 AND ($2::text IS NULL OR title ILIKE $2)
            ORDER BY title ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.owner_id)
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count(db: &PgPool, filter: MovieFilter<'_>) -> anyhow::Result<i64> {
        let pattern = filter.title_substring.map(like_pattern);
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM movies
            WHERE user_id = $1 AND ($2::text IS NULL OR title ILIKE $2)
            "#,
        )
        .bind(filter.owner_id)
        .bind(pattern)
        .fetch_one(db)
        .await?;
        Ok(total)
    }

    /// Absent and not-owned are indistinguishable: both come back `None`.
    pub async fn find_by_id(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, user_id, title, publishing_year, poster, created_at, updated_at
            FROM movies
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
        Ok(movie)
    }

    pub async fn create(
        db: &PgPool,
        owner_id: Uuid,
        title: &str,
        publishing_year: i32,
        poster: Option<&str>,
    ) -> anyhow::Result<Movie> {
        let movie = sqlx::query_as::<_, Movie>(
            r#"
            INSERT INTO movies (user_id, title, publishing_year, poster)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, publishing_year, poster, created_at, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(title)
        .bind(publishing_year)
        .bind(poster)
        .fetch_one(db)
        .await?;
        Ok(movie)
    }

    /// Replaces the mutable fields and refreshes `updated_at`; `id` and
    /// `user_id` never change. `None` when nothing owned matched.
    pub async fn update(
        db: &PgPool,
        owner_id: Uuid,
        id: Uuid,
        title: &str,
        publishing_year: i32,
        poster: Option<&str>,
    ) -> anyhow::Result<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            r#"
            UPDATE movies
            SET title = $3, publishing_year = $4, poster = $5, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, publishing_year, poster, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(title)
        .bind(publishing_year)
        .bind(poster)
        .fetch_optional(db)
        .await?;
        Ok(movie)
    }

    /// True when a row was removed. A repeat delete finds nothing, which
    /// callers report as not-found.
    pub async fn delete(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            DELETE FROM movies
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("arr"), "%arr%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
        assert_eq!(like_pattern(""), "%%");
    }
}
