use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::data_formats::{CreatePostRequest, PageWindow, PostQueryParams, UpdatePostRequest};
use crate::errors::RequestError;
use crate::models::{Post, PostRow, TagCount};
use crate::reading::estimate_reading_time;
use crate::{slugify, tags};

use super::{bind_params, count_rows, like_escape, QueryBuilder};

const POST_COLUMNS: &str = "id, slug, title, content, excerpt, tags, published, views, \
                            reading_time, author, cover_image, created_at, updated_at";

pub async fn list_posts_in_db(
    pool: &SqlitePool,
    PostQueryParams {
        page,
        limit,
        published,
        tag,
        search,
    }: PostQueryParams,
) -> Result<(Vec<Post>, i64, PageWindow), RequestError> {
    let window = PageWindow::new(page, limit);
    // Tags are stored as a JSON array, so match the quoted, encoded form
    let tag_pattern = tag
        .map(|tag| serde_json::Value::String(tag).to_string())
        .map(|quoted| format!("%{}%", like_escape(&quoted)));
    let search_pattern = search
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!("%{}%", like_escape(s.trim())));

    let (filters, params) = QueryBuilder::new(" WHERE ", " AND ")
        .add_param("published = ?", published)
        .add_param("tags LIKE ? ESCAPE '\\'", tag_pattern)
        .add_param(
            "(title LIKE ? ESCAPE '\\' OR content LIKE ? ESCAPE '\\')",
            search_pattern,
        )
        .build();

    let total = count_rows(pool, "posts", &filters, params.clone()).await?;

    let query = format!(
        "SELECT {POST_COLUMNS} FROM posts{filters} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let rows = bind_params!(sqlx::query_as::<Sqlite, PostRow>(&query), params)
        .bind(window.limit as i64)
        .bind(window.offset())
        .fetch_all(pool)
        .await?;

    Ok((rows.into_iter().map(Post::from).collect(), total, window))
}

/// Every published post, used as the candidate pool for related posts.
pub async fn list_published_posts_in_db(pool: &SqlitePool) -> Result<Vec<Post>, RequestError> {
    let query = format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE published = TRUE ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<Sqlite, PostRow>(&query)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Post::from).collect())
}

pub async fn get_post_by_id_in_db(pool: &SqlitePool, id: i64) -> Result<Post, RequestError> {
    let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?");
    let row = sqlx::query_as::<Sqlite, PostRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => Ok(row.into()),
        None => Err(RequestError::NotFound("Post not found")),
    }
}

/// Loads a published post for its public page and counts the view.
pub async fn view_published_post_in_db(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Post, RequestError> {
    let query = format!(
        "UPDATE posts SET views = views + 1 WHERE slug = ? AND published = TRUE RETURNING {POST_COLUMNS}"
    );
    let mut tx = pool.begin().await?;
    let row = sqlx::query_as::<Sqlite, PostRow>(&query)
        .bind(slug)
        .fetch_optional(&mut tx)
        .await?;
    tx.commit().await?;
    match row {
        Some(row) => Ok(row.into()),
        None => Err(RequestError::NotFound("Post not found")),
    }
}

pub async fn create_post_in_db(
    pool: &SqlitePool,
    CreatePostRequest {
        title,
        slug,
        content,
        excerpt,
        tags: tag_list,
        published,
        author,
        cover_image,
    }: CreatePostRequest,
    reading_speed: u32,
) -> Result<Post, RequestError> {
    let mut tx = pool.begin().await?;

    let title = title.trim().to_owned();
    let slug = match slug.map(|s| slugify(&s)).filter(|s| !s.is_empty()) {
        Some(slug) => slug,
        None => slug_or_fallback(&title),
    };
    let reading_time = estimate_reading_time(content.as_deref().unwrap_or_default(), reading_speed);
    let encoded_tags = tags::encode(&tags::dedupe(tag_list));
    let now = Utc::now();

    let query = format!(
        r#"
        INSERT INTO posts (slug, title, content, excerpt, tags, published, views, reading_time, author, cover_image, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)
        RETURNING {POST_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<Sqlite, PostRow>(&query)
        .bind(slug)
        .bind(title)
        .bind(content)
        .bind(excerpt)
        .bind(encoded_tags)
        .bind(published)
        .bind(reading_time as i64)
        .bind(author)
        .bind(cover_image)
        .bind(now)
        .bind(now)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;

    tracing::info!(id = row.id, slug = %row.slug, "created post");
    Ok(row.into())
}

pub async fn update_post_in_db(
    pool: &SqlitePool,
    id: i64,
    UpdatePostRequest {
        title,
        slug,
        content,
        excerpt,
        tags: tag_list,
        published,
        author,
        cover_image,
    }: UpdatePostRequest,
    reading_speed: u32,
) -> Result<Post, RequestError> {
    let mut tx = pool.begin().await?;

    let reading_time = content
        .as_deref()
        .map(|content| estimate_reading_time(content, reading_speed) as i64);
    let slug = slug.map(|s| slugify(&s)).filter(|s| !s.is_empty());
    let title = title.map(|t| t.trim().to_owned());
    let encoded_tags = tag_list.map(|list| tags::encode(&tags::dedupe(list)));

    let (sets, mut params) = QueryBuilder::new(" SET ", ", ")
        .add_param("title = ?", title)
        .add_param("slug = ?", slug)
        .add_param("content = ?", content)
        .add_param("excerpt = ?", excerpt)
        .add_param("tags = ?", encoded_tags)
        .add_param("published = ?", published)
        .add_param("reading_time = ?", reading_time)
        .add_param("author = ?", author)
        .add_param("cover_image = ?", cover_image)
        .add_param("updated_at = ?", Some(Utc::now().to_rfc3339()))
        .build();
    params.push(id.into());

    let query = format!("UPDATE posts{sets} WHERE id = ? RETURNING {POST_COLUMNS}");
    let row = bind_params!(sqlx::query_as::<Sqlite, PostRow>(&query), params)
        .fetch_optional(&mut tx)
        .await?;
    tx.commit().await?;

    match row {
        Some(row) => Ok(row.into()),
        None => Err(RequestError::NotFound("Post not found")),
    }
}

pub async fn delete_post_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&mut tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Post not found"));
    }
    tx.commit().await?;
    tracing::info!(id, "deleted post");
    Ok(())
}

/// Distinct tags over published posts, most used first.
pub async fn get_tag_counts_in_db(pool: &SqlitePool) -> Result<Vec<TagCount>, RequestError> {
    let stored: Vec<Option<String>> =
        sqlx::query_scalar::<Sqlite, Option<String>>("SELECT tags FROM posts WHERE published = TRUE")
            .fetch_all(pool)
            .await?;

    let mut counts: Vec<TagCount> = Vec::new();
    for raw in stored {
        for tag in tags::decode(raw.as_deref()) {
            match counts.iter_mut().find(|c| c.tag == tag) {
                Some(entry) => entry.count += 1,
                None => counts.push(TagCount { tag, count: 1 }),
            }
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    Ok(counts)
}

fn slug_or_fallback(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        format!("post-{}", Utc::now().timestamp_millis())
    } else {
        slug
    }
}
