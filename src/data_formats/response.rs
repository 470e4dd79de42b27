use serde::{Deserialize, Serialize};

use crate::models::{Post, TagCount};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DeletedResponse {
    pub success: bool,
    pub id: i64,
}

impl DeletedResponse {
    pub fn new(id: i64) -> Self {
        DeletedResponse { success: true, id }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TagsResponse {
    pub tags: Vec<TagCount>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RelatedPostsResponse {
    pub items: Vec<Post>,
}
