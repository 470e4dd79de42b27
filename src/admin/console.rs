use std::sync::Arc;

use futures_util::future::join_all;

use crate::data_formats::{DeletedResponse, UpdatePostRequest};
use crate::dialogs::{AlertKind, Dialogs};
use crate::models::{Comment, Post};

use super::{AdminClient, ClientError, PostEditor};

/// Admin actions that talk to the API and report back through dialogs.
///
/// Failures are shown as error notices and the action resolves to `None`
/// (or `false`), so callers only need the result when they want to refresh.
pub struct AdminConsole {
    client: AdminClient,
    dialogs: Arc<Dialogs>,
}

impl AdminConsole {
    pub fn new(client: AdminClient, dialogs: Arc<Dialogs>) -> Self {
        AdminConsole { client, dialogs }
    }

    pub fn client(&self) -> &AdminClient {
        &self.client
    }

    pub fn dialogs(&self) -> &Arc<Dialogs> {
        &self.dialogs
    }

    fn report(&self, action: &str, error: &ClientError) {
        tracing::warn!("{} failed: {}", action, error);
        self.dialogs
            .notify(format!("{action} failed"), error.to_string(), AlertKind::Error);
    }

    /// Creates or updates the post held by the editor.
    pub async fn save_post(&self, editor: &mut PostEditor) -> Option<Post> {
        if let Err(e) = editor.validate() {
            self.dialogs
                .notify("Cannot save post", e.to_string(), AlertKind::Warning);
            return None;
        }
        let result = match editor.id() {
            Some(id) => self.client.update_post(id, &editor.to_update_request()).await,
            None => self.client.create_post(&editor.to_create_request()).await,
        };
        match result {
            Ok(post) => {
                editor.saved_as(&post);
                self.dialogs
                    .notify("Saved", format!("\"{}\" was saved", post.title), AlertKind::Success);
                Some(post)
            }
            Err(e) => {
                self.report("Save", &e);
                None
            }
        }
    }

    /// Returns true only when the user confirmed and the post was deleted.
    pub async fn delete_post(&self, id: i64) -> bool {
        let confirmed = self
            .dialogs
            .confirm("This post will be permanently deleted.", "Delete post?")
            .await;
        if !confirmed {
            return false;
        }
        match self.client.delete_post(id).await {
            Ok(_) => {
                self.dialogs
                    .notify("Deleted", "The post was deleted", AlertKind::Success);
                true
            }
            Err(e) => {
                self.report("Delete", &e);
                false
            }
        }
    }

    /// Deletes every selected post concurrently after one confirmation.
    ///
    /// Success is reported once all requests have settled, whatever their
    /// outcome; the individual results are returned in `ids` order. Returns an
    /// empty list when nothing was selected or the user cancelled.
    pub async fn delete_selected(&self, ids: &[i64]) -> Vec<Result<DeletedResponse, ClientError>> {
        if ids.is_empty() {
            return Vec::new();
        }
        let confirmed = self
            .dialogs
            .confirm(
                format!("{} posts will be permanently deleted.", ids.len()),
                "Delete selected posts?",
            )
            .await;
        if !confirmed {
            return Vec::new();
        }

        let outcomes = join_all(ids.iter().map(|id| self.client.delete_post(*id))).await;
        let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
        if failed > 0 {
            tracing::warn!(failed, total = ids.len(), "bulk delete had failures");
        }
        self.dialogs.notify(
            "Deleted",
            "The selected posts were deleted",
            AlertKind::Success,
        );
        outcomes
    }

    pub async fn toggle_comment(&self, id: i64, published: bool) -> Option<Comment> {
        match self.client.set_comment_published(id, published).await {
            Ok(comment) => Some(comment),
            Err(e) => {
                self.report("Comment update", &e);
                None
            }
        }
    }

    /// Asks for a new slug, prefilled with the current one. Cancelling leaves the post alone.
    pub async fn change_slug(&self, id: i64) -> Option<Post> {
        let post = match self.client.get_post(id).await {
            Ok(post) => post,
            Err(e) => {
                self.report("Loading post", &e);
                return None;
            }
        };
        let slug = self
            .dialogs
            .prompt(
                "Enter the new URL slug for this post",
                "Change slug",
                Some(String::from("my-post-slug")),
                Some(post.slug.clone()),
            )
            .await?;
        let slug = slug.trim().to_string();
        if slug.is_empty() || slug == post.slug {
            return None;
        }

        let request = UpdatePostRequest {
            slug: Some(slug),
            ..UpdatePostRequest::default()
        };
        match self.client.update_post(id, &request).await {
            Ok(post) => Some(post),
            Err(e) => {
                self.report("Slug change", &e);
                None
            }
        }
    }
}
