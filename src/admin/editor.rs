use thiserror::Error;

use crate::data_formats::{CreatePostRequest, UpdatePostRequest};
use crate::models::Post;
use crate::reading::{estimate_reading_time, DEFAULT_READING_SPEED};
use crate::tags;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,
}

type ChangeCallback = Box<dyn Fn(&str) + Send + Sync>;
type EditorCallback = Box<dyn Fn(&PostEditor) + Send + Sync>;

/// Form state of the post being edited in the admin screens.
#[derive(Default)]
pub struct PostEditor {
    id: Option<i64>,
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub published: bool,
    pub author: Option<String>,
    pub cover_image: Option<String>,
    content: String,
    tags: Vec<String>,
    on_change: Option<ChangeCallback>,
    on_save: Option<EditorCallback>,
    on_preview: Option<EditorCallback>,
}

impl PostEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_post(post: &Post) -> Self {
        PostEditor {
            id: Some(post.id),
            title: post.title.clone(),
            slug: Some(post.slug.clone()),
            excerpt: post.excerpt.clone(),
            published: post.published,
            author: post.author.clone(),
            cover_image: post.cover_image.clone(),
            content: post.content.clone().unwrap_or_default(),
            tags: post.tags.clone(),
            ..Self::default()
        }
    }

    /// `None` until the post has been saved once.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn on_change(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn on_save(mut self, callback: impl Fn(&PostEditor) + Send + Sync + 'static) -> Self {
        self.on_save = Some(Box::new(callback));
        self
    }

    pub fn on_preview(mut self, callback: impl Fn(&PostEditor) + Send + Sync + 'static) -> Self {
        self.on_preview = Some(Box::new(callback));
        self
    }

    pub fn set_content(&mut self, html: impl Into<String>) {
        self.content = html.into();
        if let Some(callback) = &self.on_change {
            callback(&self.content);
        }
    }

    /// Adds comma separated tags from the input box, skipping ones already present.
    pub fn add_tags(&mut self, input: &str) {
        let mut merged = std::mem::take(&mut self.tags);
        merged.extend(tags::parse_input(input));
        self.tags = tags::dedupe(merged);
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    pub fn reading_time(&self) -> u32 {
        estimate_reading_time(&self.content, DEFAULT_READING_SPEED)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        Ok(())
    }

    /// Runs the save callback, if any. Returns whether one was registered.
    pub fn save(&self) -> bool {
        match &self.on_save {
            Some(callback) => {
                callback(self);
                true
            }
            None => false,
        }
    }

    pub fn preview(&self) -> bool {
        match &self.on_preview {
            Some(callback) => {
                callback(self);
                true
            }
            None => false,
        }
    }

    pub(crate) fn saved_as(&mut self, post: &Post) {
        self.id = Some(post.id);
        self.slug = Some(post.slug.clone());
    }

    pub fn to_create_request(&self) -> CreatePostRequest {
        CreatePostRequest {
            title: self.title.trim().to_string(),
            slug: self.slug.clone(),
            content: Some(self.content.clone()),
            excerpt: self.excerpt.clone(),
            tags: self.tags.clone(),
            published: self.published,
            author: self.author.clone(),
            cover_image: self.cover_image.clone(),
        }
    }

    pub fn to_update_request(&self) -> UpdatePostRequest {
        UpdatePostRequest {
            title: Some(self.title.trim().to_string()),
            slug: self.slug.clone(),
            content: Some(self.content.clone()),
            excerpt: self.excerpt.clone(),
            tags: Some(self.tags.clone()),
            published: Some(self.published),
            author: self.author.clone(),
            cover_image: self.cover_image.clone(),
        }
    }
}
