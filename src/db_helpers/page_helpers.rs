use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::data_formats::{CreatePageRequest, PageQueryParams, PageWindow, UpdatePageRequest};
use crate::errors::RequestError;
use crate::models::{Page, PageRow};
use crate::slugify;

use super::{bind_params, count_rows, QueryBuilder};

const PAGE_COLUMNS: &str =
    "id, title, slug, content, published, template, author, created_at, updated_at";

pub async fn list_pages_in_db(
    pool: &SqlitePool,
    PageQueryParams { page, limit }: PageQueryParams,
) -> Result<(Vec<Page>, i64, PageWindow), RequestError> {
    let window = PageWindow::new(page, limit);
    let total = count_rows(pool, "pages", "", Vec::new()).await?;
    let query = format!(
        "SELECT {PAGE_COLUMNS} FROM pages ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query_as::<Sqlite, PageRow>(&query)
        .bind(window.limit as i64)
        .bind(window.offset())
        .fetch_all(pool)
        .await?;
    Ok((rows.into_iter().map(Page::from).collect(), total, window))
}

pub async fn get_page_by_id_in_db(pool: &SqlitePool, id: i64) -> Result<Page, RequestError> {
    let query = format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = ?");
    let row = sqlx::query_as::<Sqlite, PageRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => Ok(row.into()),
        None => Err(RequestError::NotFound("Page not found")),
    }
}

pub async fn create_page_in_db(
    pool: &SqlitePool,
    CreatePageRequest {
        title,
        slug,
        content,
        published,
        template,
        author,
    }: CreatePageRequest,
) -> Result<Page, RequestError> {
    let mut tx = pool.begin().await?;
    let title = title.trim().to_owned();
    let slug = slug
        .map(|s| slugify(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| slugify(&title));
    if slug.is_empty() {
        return Err(RequestError::Validation(
            "Slug could not be derived from the title".to_string(),
        ));
    }
    let now = Utc::now();

    let query = format!(
        r#"
        INSERT INTO pages (title, slug, content, published, template, author, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {PAGE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<Sqlite, PageRow>(&query)
        .bind(title)
        .bind(slug)
        .bind(content)
        .bind(published)
        .bind(template.as_str())
        .bind(author)
        .bind(now)
        .bind(now)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(row.into())
}

pub async fn update_page_in_db(
    pool: &SqlitePool,
    id: i64,
    UpdatePageRequest {
        title,
        slug,
        content,
        published,
        template,
        author,
    }: UpdatePageRequest,
) -> Result<Page, RequestError> {
    let mut tx = pool.begin().await?;
    let (sets, mut params) = QueryBuilder::new(" SET ", ", ")
        .add_param("title = ?", title.map(|t| t.trim().to_owned()))
        .add_param("slug = ?", slug.map(|s| slugify(&s)).filter(|s| !s.is_empty()))
        .add_param("content = ?", content)
        .add_param("published = ?", published)
        .add_param("template = ?", template.map(|t| t.as_str().to_owned()))
        .add_param("author = ?", author)
        .add_param("updated_at = ?", Some(Utc::now().to_rfc3339()))
        .build();
    params.push(id.into());

    let query = format!("UPDATE pages{sets} WHERE id = ? RETURNING {PAGE_COLUMNS}");
    let row = bind_params!(sqlx::query_as::<Sqlite, PageRow>(&query), params)
        .fetch_optional(&mut tx)
        .await?;
    tx.commit().await?;
    match row {
        Some(row) => Ok(row.into()),
        None => Err(RequestError::NotFound("Page not found")),
    }
}

pub async fn delete_page_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM pages WHERE id = ?")
        .bind(id)
        .execute(&mut tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Page not found"));
    }
    tx.commit().await?;
    Ok(())
}
