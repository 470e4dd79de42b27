use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::related::Rankable;
use crate::tags;

// ----------------- Posts -----------------

/// A `posts` row as stored. `tags` is the encoded JSON string.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Option<String>,
    pub published: bool,
    pub views: i64,
    pub reading_time: i64,
    pub author: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
    pub published: bool,
    pub views: i64,
    pub reading_time: i64,
    pub author: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            tags: tags::decode(row.tags.as_deref()),
            id: row.id,
            slug: row.slug,
            title: row.title,
            content: row.content,
            excerpt: row.excerpt,
            published: row.published,
            views: row.views,
            reading_time: row.reading_time,
            author: row.author,
            cover_image: row.cover_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Rankable for Post {
    fn id(&self) -> i64 {
        self.id
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
    fn views(&self) -> i64 {
        self.views
    }
}

// ----------------- Pages -----------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageTemplate {
    #[default]
    Default,
    FullWidth,
    Sidebar,
    Landing,
}

impl PageTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageTemplate::Default => "default",
            PageTemplate::FullWidth => "full-width",
            PageTemplate::Sidebar => "sidebar",
            PageTemplate::Landing => "landing",
        }
    }
}

impl From<&str> for PageTemplate {
    fn from(value: &str) -> Self {
        match value {
            "full-width" => PageTemplate::FullWidth,
            "sidebar" => PageTemplate::Sidebar,
            "landing" => PageTemplate::Landing,
            _ => PageTemplate::Default,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PageRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub published: bool,
    pub template: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub published: bool,
    pub template: PageTemplate,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PageRow> for Page {
    fn from(row: PageRow) -> Self {
        Page {
            template: PageTemplate::from(row.template.as_str()),
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            published: row.published,
            author: row.author,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ----------------- Comments, media, users -----------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub author: String,
    pub email: String,
    pub website: Option<String>,
    pub post_id: i64,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: i64,
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: i64,
    pub url: String,
    pub alt: Option<String>,
    pub description: Option<String>,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    /// None until the address has been verified.
    pub email_verified: Option<DateTime<Utc>>,
    pub accounts_count: i64,
    pub sessions_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}
