use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::data_formats::{CommentQueryParams, CreateCommentRequest, PageWindow};
use crate::errors::RequestError;
use crate::models::Comment;

use super::{bind_params, count_rows, QueryBuilder};

const COMMENT_COLUMNS: &str =
    "id, content, author, email, website, post_id, published, created_at, updated_at";

pub async fn list_comments_in_db(
    pool: &SqlitePool,
    CommentQueryParams {
        page,
        limit,
        post_id,
        published,
    }: CommentQueryParams,
) -> Result<(Vec<Comment>, i64, PageWindow), RequestError> {
    let window = PageWindow::new(page, limit);
    let (filters, params) = QueryBuilder::new(" WHERE ", " AND ")
        .add_param("post_id = ?", post_id)
        .add_param("published = ?", published)
        .build();

    let total = count_rows(pool, "comments", &filters, params.clone()).await?;
    let query = format!(
        "SELECT {COMMENT_COLUMNS} FROM comments{filters} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let comments = bind_params!(sqlx::query_as::<Sqlite, Comment>(&query), params)
        .bind(window.limit as i64)
        .bind(window.offset())
        .fetch_all(pool)
        .await?;
    Ok((comments, total, window))
}

/// Stores a visitor comment. New comments wait for moderation.
pub async fn add_comment_in_db(
    pool: &SqlitePool,
    CreateCommentRequest {
        content,
        author,
        email,
        website,
        post_id,
    }: CreateCommentRequest,
) -> Result<Comment, RequestError> {
    let mut tx = pool.begin().await?;

    let post = sqlx::query_scalar::<Sqlite, i64>("SELECT id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&mut tx)
        .await?;
    if post.is_none() {
        return Err(RequestError::NotFound("Post not found"));
    }

    let now = Utc::now();
    let query = format!(
        r#"
        INSERT INTO comments (content, author, email, website, post_id, published, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, FALSE, ?, ?)
        RETURNING {COMMENT_COLUMNS}
        "#
    );
    let comment = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(content.trim().to_owned())
        .bind(author.trim().to_owned())
        .bind(email.trim().to_owned())
        .bind(website.filter(|w| !w.trim().is_empty()))
        .bind(post_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(comment)
}

pub async fn set_comment_published_in_db(
    pool: &SqlitePool,
    id: i64,
    published: bool,
) -> Result<Comment, RequestError> {
    let mut tx = pool.begin().await?;
    let query = format!(
        "UPDATE comments SET published = ?, updated_at = ? WHERE id = ? RETURNING {COMMENT_COLUMNS}"
    );
    let comment = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(published)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut tx)
        .await?;
    tx.commit().await?;
    match comment {
        Some(comment) => Ok(comment),
        None => Err(RequestError::NotFound("Comment not found")),
    }
}

pub async fn delete_comment_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(&mut tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Comment not found"));
    }
    tx.commit().await?;
    Ok(())
}
