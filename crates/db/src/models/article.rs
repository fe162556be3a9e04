//! News article entity model.

use newsart_core::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A news article row tracked for illustration.
///
/// `image_url` stays null until an artifact has been delivered; rows
/// are selected for processing only while it is null. Exactly one of
/// `image_url` / `error_message` is written per processing run.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Article {
    pub id: DbId,
    pub title: String,
    pub created_at: Timestamp,
    pub image_url: Option<String>,
    pub error_message: Option<String>,
}
