use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart},
    http::{StatusCode, Uri},
    Extension, Json,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    analytics::{Analytics, AnalyticsEvent, AnalyticsStats, EventStorage},
    data_formats::*,
    db_helpers::*,
    errors::{ErrorBody, RequestError},
    extractors::{ApiJson, ApiPath, ApiQuery},
    models::{Comment, MediaItem, Page, Post, UserAccount},
    related, Config, JsonResponse, SharedAnalytics,
};

type JsonResult<T> = Result<Json<T>, RequestError>;
type CreatedResult<T> = Result<JsonResponse<T>, RequestError>;

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> JsonResponse<ErrorBody> {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new(&format!("URL {} provided was not found", uri))),
    )
}

fn require(value: &str, message: &str) -> Result<(), RequestError> {
    if value.trim().is_empty() {
        return Err(RequestError::Validation(message.to_string()));
    }
    Ok(())
}

// ----------------- Post Handlers -----------------
pub async fn list_posts(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiQuery(params): ApiQuery<PostQueryParams>,
) -> JsonResult<ListWrapper<Post>> {
    let (posts, total, window) = list_posts_in_db(&pool, params).await?;
    Ok(Json(ListWrapper::new(posts, window, total)))
}

pub async fn create_post(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    ApiJson(request): ApiJson<CreatePostRequest>,
) -> CreatedResult<Post> {
    require(&request.title, "Title is required")?;
    let post = create_post_in_db(&pool, request, config.reading_speed).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiPath(id): ApiPath<i64>,
) -> JsonResult<Post> {
    Ok(Json(get_post_by_id_in_db(&pool, id).await?))
}

pub async fn update_post(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdatePostRequest>,
) -> JsonResult<Post> {
    if let Some(title) = &request.title {
        require(title, "Title is required")?;
    }
    let post = update_post_in_db(&pool, id, request, config.reading_speed).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiPath(id): ApiPath<i64>,
) -> JsonResult<DeletedResponse> {
    delete_post_in_db(&pool, id).await?;
    Ok(Json(DeletedResponse::new(id)))
}

pub async fn view_post(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiPath(slug): ApiPath<String>,
) -> JsonResult<Post> {
    Ok(Json(view_published_post_in_db(&pool, &slug).await?))
}

pub async fn related_posts(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(RelatedQueryParams { limit }): ApiQuery<RelatedQueryParams>,
) -> JsonResult<RelatedPostsResponse> {
    let post = get_post_by_id_in_db(&pool, id).await?;
    let candidates = list_published_posts_in_db(&pool).await?;
    let items = related::rank(post.id, &post.tags, &candidates, limit.min(MAX_LIMIT as usize));
    Ok(Json(RelatedPostsResponse { items }))
}

pub async fn list_tags(Extension(pool): Extension<Arc<SqlitePool>>) -> JsonResult<TagsResponse> {
    let tags = get_tag_counts_in_db(&pool).await?;
    Ok(Json(TagsResponse { tags }))
}

// ----------------- Page Handlers -----------------
pub async fn list_pages(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiQuery(params): ApiQuery<PageQueryParams>,
) -> JsonResult<ListWrapper<Page>> {
    let (pages, total, window) = list_pages_in_db(&pool, params).await?;
    Ok(Json(ListWrapper::new(pages, window, total)))
}

pub async fn create_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiJson(request): ApiJson<CreatePageRequest>,
) -> CreatedResult<Page> {
    require(&request.title, "Title is required")?;
    let page = create_page_in_db(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

pub async fn get_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiPath(id): ApiPath<i64>,
) -> JsonResult<Page> {
    Ok(Json(get_page_by_id_in_db(&pool, id).await?))
}

pub async fn update_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdatePageRequest>,
) -> JsonResult<Page> {
    if let Some(title) = &request.title {
        require(title, "Title is required")?;
    }
    Ok(Json(update_page_in_db(&pool, id, request).await?))
}

pub async fn delete_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiPath(id): ApiPath<i64>,
) -> JsonResult<DeletedResponse> {
    delete_page_in_db(&pool, id).await?;
    Ok(Json(DeletedResponse::new(id)))
}

// ----------------- Comment Handlers -----------------
pub async fn list_comments(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiQuery(params): ApiQuery<CommentQueryParams>,
) -> JsonResult<ListWrapper<Comment>> {
    let (comments, total, window) = list_comments_in_db(&pool, params).await?;
    Ok(Json(ListWrapper::new(comments, window, total)))
}

pub async fn create_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiJson(request): ApiJson<CreateCommentRequest>,
) -> CreatedResult<Comment> {
    require(&request.content, "Comment content is required")?;
    require(&request.author, "Name is required")?;
    require(&request.email, "Email is required")?;
    if !request.email.contains('@') {
        return Err(RequestError::Validation("Email is not valid".to_string()));
    }
    let comment = add_comment_in_db(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn moderate_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(UpdateCommentRequest { published }): ApiJson<UpdateCommentRequest>,
) -> JsonResult<Comment> {
    Ok(Json(set_comment_published_in_db(&pool, id, published).await?))
}

pub async fn delete_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiPath(id): ApiPath<i64>,
) -> JsonResult<DeletedResponse> {
    delete_comment_in_db(&pool, id).await?;
    Ok(Json(DeletedResponse::new(id)))
}

// ----------------- Media Handlers -----------------
pub async fn list_media(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiQuery(params): ApiQuery<PageQueryParams>,
) -> JsonResult<ListWrapper<MediaItem>> {
    let (items, total, window) = list_media_in_db(&pool, params).await?;
    Ok(Json(ListWrapper::new(items, window, total)))
}

struct UploadedFile {
    original_name: String,
    content_type: Option<String>,
    data: Bytes,
}

pub async fn upload_media(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> CreatedResult<MediaItem> {
    let mut multipart = multipart?;
    let bad_request = |e: axum::extract::multipart::MultipartError| {
        RequestError::BadRequest(format!("Invalid upload: {e}"))
    };

    let mut file = None;
    let (mut alt, mut description, mut uploaded_by) = (None, None, None);
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let data = field.bytes().await.map_err(bad_request)?;
                file = Some(UploadedFile {
                    original_name,
                    content_type,
                    data,
                });
            }
            "alt" => alt = Some(field.text().await.map_err(bad_request)?),
            "description" => description = Some(field.text().await.map_err(bad_request)?),
            "uploadedBy" => uploaded_by = Some(field.text().await.map_err(bad_request)?),
            _ => {}
        }
    }

    let file = match file {
        Some(file) if !file.data.is_empty() => file,
        _ => return Err(RequestError::BadRequest("No file uploaded".to_string())),
    };

    let filename = stored_filename(&file.original_name);
    let mimetype = match file.content_type {
        Some(content_type) if content_type != "application/octet-stream" => content_type,
        _ => mime_guess::from_path(&file.original_name)
            .first_or_octet_stream()
            .to_string(),
    };
    let path = config.upload_dir.join(&filename);
    tokio::fs::write(&path, &file.data).await.map_err(|e| {
        tracing::error!("failed to write upload {}: {}", path.display(), e);
        RequestError::ServerError
    })?;

    let media = NewMedia {
        url: format!("{}/{}", config.public_upload_prefix, filename),
        filename,
        original_name: file.original_name,
        mimetype,
        size: file.data.len() as i64,
        alt: alt.filter(|s: &String| !s.is_empty()),
        description: description.filter(|s: &String| !s.is_empty()),
        uploaded_by: uploaded_by.filter(|s: &String| !s.is_empty()),
    };
    let item = insert_media_in_db(&pool, media).await?;
    tracing::info!(id = item.id, filename = %item.filename, size = item.size, "stored upload");
    Ok((StatusCode::CREATED, Json(item)))
}

/// `<millis>-<random>.<ext>`, keeping only a plain extension from the original name.
fn stored_filename(original_name: &str) -> String {
    let extension = std::path::Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();
    format!(
        "{}-{:08x}{}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>(),
        extension
    )
}

pub async fn delete_media(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    ApiPath(id): ApiPath<i64>,
) -> JsonResult<DeletedResponse> {
    let item = delete_media_in_db(&pool, id).await?;
    let path = config.upload_dir.join(&item.filename);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!("could not remove {}: {}", path.display(), e);
    }
    Ok(Json(DeletedResponse::new(id)))
}

// ----------------- User Handlers -----------------
pub async fn list_users(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiQuery(params): ApiQuery<PageQueryParams>,
) -> JsonResult<ListWrapper<UserAccount>> {
    let (users, total, window) = list_users_in_db(&pool, params).await?;
    Ok(Json(ListWrapper::new(users, window, total)))
}

pub async fn create_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> CreatedResult<UserAccount> {
    require(&request.email, "Email is required")?;
    if !request.email.contains('@') {
        return Err(RequestError::Validation("Email is not valid".to_string()));
    }
    let user = insert_user(&pool, request).await.map_err(|e| match e {
        RequestError::Conflict(_) => RequestError::Conflict("Email already exists"),
        e => e,
    })?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn delete_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    ApiPath(id): ApiPath<i64>,
) -> JsonResult<DeletedResponse> {
    delete_user_in_db(&pool, id).await?;
    Ok(Json(DeletedResponse::new(id)))
}

// ----------------- Analytics Handlers -----------------
pub async fn track_event(
    Extension(analytics): Extension<SharedAnalytics>,
    ApiJson(TrackEventRequest {
        session_id,
        timestamp,
        kind,
    }): ApiJson<TrackEventRequest>,
) -> CreatedResult<AnalyticsEvent> {
    require(&session_id, "sessionId is required")?;
    let event = AnalyticsEvent {
        session_id,
        timestamp: timestamp.unwrap_or_else(|| Utc::now().timestamp_millis()),
        kind,
    };
    let stored = event.clone();
    with_analytics(analytics, move |analytics| analytics.append(stored)).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn analytics_stats(
    Extension(analytics): Extension<SharedAnalytics>,
) -> JsonResult<AnalyticsStats> {
    let stats = with_analytics(analytics, |analytics| analytics.stats()).await?;
    Ok(Json(stats))
}

/// Storage backends may touch the filesystem, so the service is used off the async workers.
async fn with_analytics<R, F>(analytics: SharedAnalytics, f: F) -> Result<R, RequestError>
where
    F: FnOnce(&Analytics<Box<dyn EventStorage>>) -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&analytics.blocking_lock()))
        .await
        .map_err(|e| {
            tracing::error!("analytics task failed: {}", e);
            RequestError::ServerError
        })
}
