use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::data_formats::{PageQueryParams, PageWindow};
use crate::errors::RequestError;
use crate::models::MediaItem;

use super::count_rows;

const MEDIA_COLUMNS: &str = "id, filename, original_name, mimetype, size, url, alt, \
                             description, uploaded_by, created_at, updated_at";

/// Metadata for a file that has already been written to the upload directory.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: i64,
    pub url: String,
    pub alt: Option<String>,
    pub description: Option<String>,
    pub uploaded_by: Option<String>,
}

pub async fn list_media_in_db(
    pool: &SqlitePool,
    PageQueryParams { page, limit }: PageQueryParams,
) -> Result<(Vec<MediaItem>, i64, PageWindow), RequestError> {
    let window = PageWindow::new(page, limit);
    let total = count_rows(pool, "media", "", Vec::new()).await?;
    let query = format!(
        "SELECT {MEDIA_COLUMNS} FROM media ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let items = sqlx::query_as::<Sqlite, MediaItem>(&query)
        .bind(window.limit as i64)
        .bind(window.offset())
        .fetch_all(pool)
        .await?;
    Ok((items, total, window))
}

pub async fn insert_media_in_db(
    pool: &SqlitePool,
    media: NewMedia,
) -> Result<MediaItem, RequestError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let query = format!(
        r#"
        INSERT INTO media (filename, original_name, mimetype, size, url, alt, description, uploaded_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {MEDIA_COLUMNS}
        "#
    );
    let item = sqlx::query_as::<Sqlite, MediaItem>(&query)
        .bind(media.filename)
        .bind(media.original_name)
        .bind(media.mimetype)
        .bind(media.size)
        .bind(media.url)
        .bind(media.alt)
        .bind(media.description)
        .bind(media.uploaded_by)
        .bind(now)
        .bind(now)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(item)
}

/// Deletes the row and returns it so the caller can remove the stored file.
pub async fn delete_media_in_db(pool: &SqlitePool, id: i64) -> Result<MediaItem, RequestError> {
    let mut tx = pool.begin().await?;
    let query = format!("DELETE FROM media WHERE id = ? RETURNING {MEDIA_COLUMNS}");
    let item = sqlx::query_as::<Sqlite, MediaItem>(&query)
        .bind(id)
        .fetch_optional(&mut tx)
        .await?;
    tx.commit().await?;
    match item {
        Some(item) => Ok(item),
        None => Err(RequestError::NotFound("Media not found")),
    }
}
