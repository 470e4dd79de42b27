use reqwest::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::analytics::{AnalyticsEvent, AnalyticsStats};
use crate::data_formats::*;
use crate::errors::ErrorBody;
use crate::models::{Comment, MediaItem, Page, Post, UserAccount};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Could not reach the server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message} ({status})")]
    Api { status: u16, message: String },
}

/// HTTP client for the admin screens.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: String,
}

impl AdminClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        AdminClient { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };
        tracing::debug!(status = status.as_u16(), %message, "api request failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // ----------------- Posts -----------------
    pub async fn list_posts(&self, params: &PostQueryParams) -> Result<ListWrapper<Post>, ClientError> {
        self.send(self.http.get(self.url("/posts")).query(params)).await
    }

    pub async fn get_post(&self, id: i64) -> Result<Post, ClientError> {
        self.send(self.http.get(self.url(&format!("/posts/{id}")))).await
    }

    pub async fn create_post(&self, request: &CreatePostRequest) -> Result<Post, ClientError> {
        self.send(self.http.post(self.url("/posts")).json(request)).await
    }

    pub async fn update_post(
        &self,
        id: i64,
        request: &UpdatePostRequest,
    ) -> Result<Post, ClientError> {
        self.send(self.http.put(self.url(&format!("/posts/{id}"))).json(request))
            .await
    }

    pub async fn delete_post(&self, id: i64) -> Result<DeletedResponse, ClientError> {
        self.send(self.http.delete(self.url(&format!("/posts/{id}")))).await
    }

    pub async fn related_posts(&self, id: i64, limit: usize) -> Result<Vec<Post>, ClientError> {
        let response: RelatedPostsResponse = self
            .send(
                self.http
                    .get(self.url(&format!("/posts/{id}/related")))
                    .query(&[("limit", limit)]),
            )
            .await?;
        Ok(response.items)
    }

    pub async fn view_post(&self, slug: &str) -> Result<Post, ClientError> {
        self.send(self.http.get(self.url(&format!("/public/posts/{slug}"))))
            .await
    }

    pub async fn list_tags(&self) -> Result<TagsResponse, ClientError> {
        self.send(self.http.get(self.url("/tags"))).await
    }

    // ----------------- Pages -----------------
    pub async fn list_pages(&self, params: &PageQueryParams) -> Result<ListWrapper<Page>, ClientError> {
        self.send(self.http.get(self.url("/pages")).query(params)).await
    }

    pub async fn create_page(&self, request: &CreatePageRequest) -> Result<Page, ClientError> {
        self.send(self.http.post(self.url("/pages")).json(request)).await
    }

    pub async fn update_page(
        &self,
        id: i64,
        request: &UpdatePageRequest,
    ) -> Result<Page, ClientError> {
        self.send(self.http.put(self.url(&format!("/pages/{id}"))).json(request))
            .await
    }

    pub async fn delete_page(&self, id: i64) -> Result<DeletedResponse, ClientError> {
        self.send(self.http.delete(self.url(&format!("/pages/{id}")))).await
    }

    // ----------------- Comments -----------------
    pub async fn list_comments(
        &self,
        params: &CommentQueryParams,
    ) -> Result<ListWrapper<Comment>, ClientError> {
        self.send(self.http.get(self.url("/comments")).query(params)).await
    }

    pub async fn create_comment(&self, request: &CreateCommentRequest) -> Result<Comment, ClientError> {
        self.send(self.http.post(self.url("/comments")).json(request)).await
    }

    pub async fn set_comment_published(&self, id: i64, published: bool) -> Result<Comment, ClientError> {
        self.send(
            self.http
                .put(self.url(&format!("/comments/{id}")))
                .json(&UpdateCommentRequest { published }),
        )
        .await
    }

    pub async fn delete_comment(&self, id: i64) -> Result<DeletedResponse, ClientError> {
        self.send(self.http.delete(self.url(&format!("/comments/{id}")))).await
    }

    // ----------------- Media -----------------
    pub async fn list_media(&self, params: &PageQueryParams) -> Result<ListWrapper<MediaItem>, ClientError> {
        self.send(self.http.get(self.url("/media")).query(params)).await
    }

    pub async fn upload_media(
        &self,
        file_name: &str,
        mimetype: &str,
        data: Vec<u8>,
        alt: Option<&str>,
    ) -> Result<MediaItem, ClientError> {
        let part = multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(mimetype)?;
        let mut form = multipart::Form::new().part("file", part);
        if let Some(alt) = alt {
            form = form.text("alt", alt.to_string());
        }
        self.send(self.http.post(self.url("/media")).multipart(form)).await
    }

    pub async fn delete_media(&self, id: i64) -> Result<DeletedResponse, ClientError> {
        self.send(self.http.delete(self.url(&format!("/media/{id}")))).await
    }

    // ----------------- Users -----------------
    pub async fn list_users(&self, params: &PageQueryParams) -> Result<ListWrapper<UserAccount>, ClientError> {
        self.send(self.http.get(self.url("/users")).query(params)).await
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<UserAccount, ClientError> {
        self.send(self.http.post(self.url("/users")).json(request)).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<DeletedResponse, ClientError> {
        self.send(self.http.delete(self.url(&format!("/users/{id}")))).await
    }

    // ----------------- Analytics -----------------
    pub async fn track_event(&self, request: &TrackEventRequest) -> Result<AnalyticsEvent, ClientError> {
        self.send(self.http.post(self.url("/analytics/events")).json(request))
            .await
    }

    pub async fn analytics_stats(&self) -> Result<AnalyticsStats, ClientError> {
        self.send(self.http.get(self.url("/analytics/stats"))).await
    }
}
