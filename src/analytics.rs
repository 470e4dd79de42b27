//! Best-effort visitor analytics.
//!
//! Events are appended to a single JSON log kept in an [`EventStorage`] (the
//! browser's local storage in the original front end; memory or a file here).
//! Statistics are recomputed from the whole log on every call. Nothing in here
//! returns an error to the caller: a broken log reads as an empty one.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STORAGE_KEY: &str = "blog_analytics";
pub const MAX_EVENTS: usize = 1000;
pub const RETENTION_DAYS: i64 = 30;
const TOP_N: usize = 10;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("analytics storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("analytics log is not valid json: {0}")]
    Parse(#[from] serde_json::Error),
}

// ----------------- Storage -----------------

pub trait EventStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl EventStorage for Box<dyn EventStorage> {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).load(key)
    }
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).save(key, value)
    }
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl EventStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

// ----------------- Events -----------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    PageView {
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    ArticleView {
        article: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Search {
        query: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        results: Option<u32>,
    },
    Share {
        article: String,
        platform: String,
    },
    Bookmark {
        article: String,
    },
    Comment {
        article: String,
    },
}

impl EventKind {
    fn is_view(&self) -> bool {
        matches!(self, EventKind::PageView { .. } | EventKind::ArticleView { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub session_id: String,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl AnalyticsEvent {
    fn date(&self) -> Option<NaiveDate> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .map(|at| at.date_naive())
    }
}

// ----------------- Stats -----------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: NaiveDate,
    pub views: usize,
    pub unique_sessions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsStats {
    pub total_views: usize,
    pub unique_sessions: usize,
    pub top_pages: Vec<RankedEntry>,
    pub top_articles: Vec<RankedEntry>,
    pub top_searches: Vec<RankedEntry>,
    pub daily: Vec<DailyStat>,
}

/// Counts keys, keeping first-seen order for equal counts.
#[derive(Default)]
struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<RankedEntry>,
}

impl Tally {
    fn add(&mut self, name: &str) {
        match self.index.get(name) {
            Some(&i) => self.entries[i].count += 1,
            None => {
                self.index.insert(name.to_owned(), self.entries.len());
                self.entries.push(RankedEntry {
                    name: name.to_owned(),
                    count: 1,
                });
            }
        }
    }

    fn top(mut self, n: usize) -> Vec<RankedEntry> {
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.entries.truncate(n);
        self.entries
    }
}

// ----------------- Service -----------------

pub struct Analytics<S: EventStorage> {
    storage: S,
    session_id: String,
}

impl<S: EventStorage> Analytics<S> {
    pub fn new(storage: S) -> Self {
        Self::with_session(storage, new_session_id())
    }

    pub fn with_session(storage: S, session_id: impl Into<String>) -> Self {
        Self {
            storage,
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn load(&self) -> Result<Vec<AnalyticsEvent>, StorageError> {
        match self.storage.load(STORAGE_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn store(&self, events: &[AnalyticsEvent]) {
        let result = serde_json::to_string(events)
            .map_err(StorageError::from)
            .and_then(|raw| self.storage.save(STORAGE_KEY, &raw));
        if let Err(e) = result {
            tracing::warn!("failed to store analytics events: {}", e);
        }
    }

    /// The stored log, oldest first. Empty when the log cannot be read.
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.load().unwrap_or_else(|e| {
            tracing::warn!("failed to read analytics events: {}", e);
            Vec::new()
        })
    }

    /// Records an event for this service's session at the current time.
    pub fn track(&self, kind: EventKind) -> AnalyticsEvent {
        let event = AnalyticsEvent {
            session_id: self.session_id.clone(),
            timestamp: Utc::now().timestamp_millis(),
            kind,
        };
        self.append(event.clone());
        event
    }

    /// Appends an already stamped event, dropping the oldest ones past the cap.
    pub fn append(&self, event: AnalyticsEvent) {
        let mut events = self.events();
        events.push(event);
        if events.len() > MAX_EVENTS {
            let overflow = events.len() - MAX_EVENTS;
            events.drain(..overflow);
        }
        self.store(&events);
    }

    /// Drops events older than the retention window. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now())
    }

    pub fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = (now - Duration::days(RETENTION_DAYS)).timestamp_millis();
        let mut events = self.events();
        let before = events.len();
        events.retain(|event| event.timestamp >= cutoff);
        let removed = before - events.len();
        if removed > 0 {
            tracing::debug!(removed, "pruned expired analytics events");
            self.store(&events);
        }
        removed
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(STORAGE_KEY) {
            tracing::warn!("failed to clear analytics events: {}", e);
        }
    }

    pub fn stats(&self) -> AnalyticsStats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> AnalyticsStats {
        match self.load() {
            Ok(events) => aggregate(&events, now.date_naive()),
            Err(e) => {
                tracing::warn!("analytics stats unavailable: {}", e);
                AnalyticsStats::default()
            }
        }
    }
}

fn aggregate(events: &[AnalyticsEvent], today: NaiveDate) -> AnalyticsStats {
    let mut pages = Tally::default();
    let mut articles = Tally::default();
    let mut searches = Tally::default();
    let mut sessions = HashSet::new();
    let mut total_views = 0;

    for event in events {
        sessions.insert(event.session_id.as_str());
        match &event.kind {
            EventKind::PageView { path, .. } => pages.add(path),
            EventKind::ArticleView { article, .. } => articles.add(article),
            EventKind::Search { query, .. } => searches.add(query),
            _ => {}
        }
        if event.kind.is_view() {
            total_views += 1;
        }
    }

    let daily = (0..RETENTION_DAYS)
        .rev()
        .map(|days_ago| today - Duration::days(days_ago))
        .map(|date| {
            let on_date = events.iter().filter(|e| e.date() == Some(date));
            let mut views = 0;
            let mut day_sessions = HashSet::new();
            for event in on_date {
                day_sessions.insert(event.session_id.as_str());
                if event.kind.is_view() {
                    views += 1;
                }
            }
            DailyStat {
                date,
                views,
                unique_sessions: day_sessions.len(),
            }
        })
        .collect();

    AnalyticsStats {
        total_views,
        unique_sessions: sessions.len(),
        top_pages: pages.top(TOP_N),
        top_articles: articles.top(TOP_N),
        top_searches: searches.top(TOP_N),
        daily,
    }
}

fn new_session_id() -> String {
    format!(
        "session_{}_{:08x}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}
