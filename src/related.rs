//! "Related posts" for the article page.
//!
//! Scoring is a fixed heuristic: shared tags weigh 3, tag keywords found in the
//! candidate title weigh 1, and popular posts get up to 2 extra points. Output
//! order must stay reproducible for the same input.

use std::collections::HashSet;

const SHARED_TAG_POINTS: i64 = 3;
const KEYWORD_POINTS: i64 = 1;
const POPULAR_VIEWS: i64 = 100;
const VERY_POPULAR_VIEWS: i64 = 500;

pub trait Rankable {
    fn id(&self) -> i64;
    fn title(&self) -> &str;
    fn tags(&self) -> &[String];
    fn views(&self) -> i64;
}

pub fn score<T: Rankable>(current_tags: &[String], candidate: &T) -> i64 {
    let current: HashSet<&str> = current_tags.iter().map(String::as_str).collect();
    let candidate_tags: HashSet<&str> = candidate.tags().iter().map(String::as_str).collect();
    let shared = current.intersection(&candidate_tags).count() as i64;

    let mut score = shared * SHARED_TAG_POINTS;
    score += keyword_matches(current_tags, candidate.title()) * KEYWORD_POINTS;
    if candidate.views() > POPULAR_VIEWS {
        score += 1;
    }
    if candidate.views() > VERY_POPULAR_VIEWS {
        score += 1;
    }
    score
}

// Keywords come from the current post's tags, not its title.
fn keyword_matches(current_tags: &[String], title: &str) -> i64 {
    let tag_string = current_tags.join(" ").to_lowercase();
    let title = title.to_lowercase();
    let title_tokens: Vec<&str> = title.split_whitespace().collect();
    tag_string
        .split_whitespace()
        .filter(|keyword| keyword.chars().count() > 2)
        .filter(|keyword| title_tokens.iter().any(|token| token.contains(keyword)))
        .count() as i64
}

/// Ranks `candidates` against the current post and returns at most `limit` of them,
/// best first. Equal scores fall back to view count.
pub fn rank<T: Rankable + Clone>(
    current_id: i64,
    current_tags: &[String],
    candidates: &[T],
    limit: usize,
) -> Vec<T> {
    let mut scored: Vec<(i64, &T)> = candidates
        .iter()
        .filter(|candidate| candidate.id() != current_id)
        .map(|candidate| (score(current_tags, candidate), candidate))
        .collect();
    scored.sort_by(|(a_score, a), (b_score, b)| {
        b_score.cmp(a_score).then_with(|| b.views().cmp(&a.views()))
    });
    scored
        .into_iter()
        .take(limit)
        .map(|(_, candidate)| candidate.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        title: String,
        tags: Vec<String>,
        views: i64,
    }

    impl Rankable for Item {
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

    fn item(id: i64, title: &str, tags: &[&str], views: i64) -> Item {
        Item {
            id,
            title: title.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            views,
        }
    }

    fn tags(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn shared_tags_and_popularity() {
        let current = tags(&["A", "B"]);
        let x = item(2, "Post X", &["A", "B"], 600);
        let y = item(3, "Post Y", &["A"], 50);
        assert_eq!(score(&current, &x), 8);
        assert_eq!(score(&current, &y), 3);

        let ranked = rank(1, &current, &[y.clone(), x.clone()], 5);
        assert_eq!(ranked, vec![x, y]);
    }

    #[test]
    fn popularity_thresholds_are_exclusive() {
        let current = tags(&[]);
        assert_eq!(score(&current, &item(2, "t", &[], 100)), 0);
        assert_eq!(score(&current, &item(2, "t", &[], 101)), 1);
        assert_eq!(score(&current, &item(2, "t", &[], 500)), 1);
        assert_eq!(score(&current, &item(2, "t", &[], 501)), 2);
    }

    #[test]
    fn tag_keywords_match_inside_title_tokens() {
        let current = tags(&["Rust Async", "db"]);
        // "rust" and "async" are keywords, "db" is too short
        let candidate = item(2, "Rustacean async-std notes about db", &[], 0);
        assert_eq!(score(&current, &candidate), 2);
    }

    #[test]
    fn current_post_is_excluded_and_limit_applies() {
        let current = tags(&["A"]);
        let pool = vec![
            item(1, "self", &["A"], 1000),
            item(2, "two", &["A"], 10),
            item(3, "three", &["A"], 20),
            item(4, "four", &[], 0),
        ];
        let ranked = rank(1, &current, &pool, 2);
        let ids: Vec<i64> = ranked.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn equal_scores_order_by_views() {
        let current = tags(&["A"]);
        let pool = vec![
            item(2, "a", &["A"], 30),
            item(3, "b", &["A"], 90),
            item(4, "c", &["A"], 60),
        ];
        let ids: Vec<i64> = rank(1, &current, &pool, 10).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 4, 2]);
    }
}
