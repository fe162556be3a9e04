//! Repository for the `news_articles` table.

use newsart_core::DbId;
use sqlx::PgPool;

use crate::models::Article;

/// Column list for `news_articles` queries.
const COLUMNS: &str = "id, title, created_at, image_url, error_message";

/// Query operations for article image tracking.
pub struct ArticleRepo;

impl ArticleRepo {
    /// Pick the next article still waiting for an image.
    ///
    /// Rows already carrying an `image_url` are never selected again;
    /// this `IS NULL` guard is the only re-processing protection.
    pub async fn next_without_image(pool: &PgPool) -> Result<Option<Article>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM news_articles \
             WHERE image_url IS NULL \
             ORDER BY id LIMIT 1"
        );
        sqlx::query_as::<_, Article>(&query).fetch_optional(pool).await
    }

    /// Record the delivered artifact location.
    pub async fn set_image_url(
        pool: &PgPool,
        id: DbId,
        image_url: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE news_articles SET image_url = $2 WHERE id = $1")
            .bind(id)
            .bind(image_url)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record a terminal failure message.
    pub async fn set_error_message(
        pool: &PgPool,
        id: DbId,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE news_articles SET error_message = $2 WHERE id = $1")
            .bind(id)
            .bind(message)
            .execute(pool)
            .await?;
        Ok(())
    }
}
