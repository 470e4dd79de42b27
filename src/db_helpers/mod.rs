use sqlx::{Sqlite, SqlitePool};

use crate::errors::RequestError;

mod comment_helpers;
mod media_helpers;
mod page_helpers;
mod post_helpers;
mod user_helpers;

pub use comment_helpers::*;
pub use media_helpers::*;
pub use page_helpers::*;
pub use post_helpers::*;
pub use user_helpers::*;

/// A value bound to a `?` placeholder in a dynamically built query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        SqlParam::Bool(value)
    }
}

/// Binds every `SqlParam` in order. Works for `query`, `query_as` and `query_scalar`.
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for param in $params {
            query = match param {
                $crate::db_helpers::SqlParam::Text(value) => query.bind(value),
                $crate::db_helpers::SqlParam::Int(value) => query.bind(value),
                $crate::db_helpers::SqlParam::Bool(value) => query.bind(value),
            };
        }
        query
    }};
}
pub(crate) use bind_params;

/// Joins optional clauses with a separator. Clauses whose value is `None` are skipped;
/// every `?` in a clause is bound to the same value.
pub(crate) struct QueryBuilder {
    query: String,
    params: Vec<SqlParam>,
    seperator: &'static str,
    counter: usize,
}

impl QueryBuilder {
    pub(crate) fn new(initial: &str, seperator: &'static str) -> Self {
        Self {
            query: initial.to_owned(),
            params: Vec::new(),
            seperator,
            counter: 0,
        }
    }

    pub(crate) fn add_param<P: Into<SqlParam>>(mut self, clause: &str, param: Option<P>) -> Self {
        if let Some(value) = param {
            if self.counter > 0 {
                self.query.push_str(self.seperator);
            }
            self.query.push_str(clause);
            let value = value.into();
            for _ in 0..clause.matches('?').count() {
                self.params.push(value.clone());
            }
            self.counter += 1;
        }
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.counter == 0
    }

    /// Returns an empty query when no clause was added.
    pub(crate) fn build(self) -> (String, Vec<SqlParam>) {
        if self.counter == 0 {
            (String::new(), Vec::new())
        } else {
            (self.query, self.params)
        }
    }
}

/// Escapes `%`, `_` and `\` for use in `LIKE ? ESCAPE '\'`.
pub(crate) fn like_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) async fn count_rows(
    pool: &SqlitePool,
    table: &str,
    filters: &str,
    params: Vec<SqlParam>,
) -> Result<i64, RequestError> {
    let query = format!("SELECT COUNT(*) FROM {table}{filters}");
    let total = bind_params!(sqlx::query_scalar::<Sqlite, i64>(&query), params)
        .fetch_one(pool)
        .await?;
    Ok(total)
}
