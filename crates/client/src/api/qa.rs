//! Canned-question catalogue and the suggestion logic over it.
//!
//! The catalogue is fetched once per client. The matching itself is plain
//! functions over a slice so it can be used (and tested) without a backend.

use parkwatch_core::types::QaItem;
use std::collections::HashSet;

use crate::auth::AuthClient;
use crate::error::Result;

/// Shortest input that produces suggestions.
pub const MIN_INPUT_CHARS: usize = 2;
/// Most suggestions returned.
pub const MAX_SUGGESTIONS: usize = 6;
/// Most follow-up questions returned.
pub const MAX_FOLLOW_UPS: usize = 3;

/// Topic words that widen a partial input to related questions.
pub const TOPIC_KEYWORDS: &[&str] = &[
    "occupancy",
    "revenue",
    "turnover",
    "duration",
    "peak",
    "hours",
    "violations",
    "enforcement",
    "utilization",
    "technology",
    "systems",
    "payment",
    "parking",
    "vehicles",
    "spaces",
    "zones",
    "levels",
    "time",
    "rate",
    "average",
    "total",
    "daily",
    "weekly",
    "monthly",
    "trend",
    "correlation",
    "comparison",
    "percentage",
];

/// Keywords whose questions make good follow-ups for a keyword.
pub fn related_keywords(keyword: &str) -> &'static [&'static str] {
    match keyword {
        "occupancy" => &["revenue", "peak hours", "utilization"],
        "revenue" => &["occupancy", "turnover rate", "peak hours"],
        "turnover rate" => &["revenue", "parking duration", "occupancy"],
        "parking duration" => &["turnover rate", "overstay", "violations"],
        "peak hours" => &["occupancy", "revenue", "utilization"],
        "violations" => &["enforcement", "parking duration", "revenue"],
        "utilization" => &["occupancy", "peak hours", "spaces"],
        "technology" => &["systems", "payment", "accuracy"],
        _ => &[],
    }
}

/// Items matching a partially typed question.
pub fn suggest(items: &[QaItem], input: &str) -> Vec<QaItem> {
    let needle = input.trim().to_lowercase();
    if needle.chars().count() < MIN_INPUT_CHARS {
        return Vec::new();
    }
    let topics: Vec<&str> = TOPIC_KEYWORDS
        .iter()
        .copied()
        .filter(|topic| topic.contains(needle.as_str()))
        .collect();

    items
        .iter()
        .filter(|item| {
            let keyword = item.keyword.to_lowercase();
            let question = item.question.to_lowercase();
            keyword.contains(&needle)
                || question.contains(&needle)
                || topics
                    .iter()
                    .any(|topic| keyword.contains(topic) || question.contains(topic))
        })
        .take(MAX_SUGGESTIONS)
        .cloned()
        .collect()
}

/// Questions to offer after `current` was asked.
pub fn follow_ups(items: &[QaItem], current: &str) -> Vec<QaItem> {
    let current = current.to_lowercase();
    let Some(keyword) = items
        .iter()
        .find(|item| item.question.to_lowercase() == current)
        .map(|item| item.keyword.to_lowercase())
    else {
        return Vec::new();
    };
    let related = related_keywords(&keyword);

    items
        .iter()
        .filter(|item| item.question.to_lowercase() != current)
        .filter(|item| {
            let candidate = item.keyword.to_lowercase();
            candidate == keyword || related.contains(&candidate.as_str())
        })
        .take(MAX_FOLLOW_UPS)
        .cloned()
        .collect()
}

/// Distinct keywords, first-seen order.
pub fn keywords(items: &[QaItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.keyword.as_str()))
        .map(|item| item.keyword.clone())
        .collect()
}

pub fn by_keyword(items: &[QaItem], keyword: &str) -> Vec<QaItem> {
    let keyword = keyword.to_lowercase();
    items
        .iter()
        .filter(|item| item.keyword.to_lowercase() == keyword)
        .cloned()
        .collect()
}

pub struct QaApi<'a> {
    client: &'a AuthClient,
}

impl<'a> QaApi<'a> {
    pub(crate) fn new(client: &'a AuthClient) -> Self {
        Self { client }
    }

    /// Whole catalogue.
    pub async fn all(&self) -> Result<Vec<QaItem>> {
        Ok(self.client.qa_catalogue().await?.as_ref().clone())
    }

    pub async fn suggestions(&self, input: &str) -> Result<Vec<QaItem>> {
        if input.trim().chars().count() < MIN_INPUT_CHARS {
            return Ok(Vec::new());
        }
        Ok(suggest(&self.client.qa_catalogue().await?, input))
    }

    pub async fn follow_ups(&self, question: &str) -> Result<Vec<QaItem>> {
        Ok(follow_ups(&self.client.qa_catalogue().await?, question))
    }

    pub async fn keywords(&self) -> Result<Vec<String>> {
        Ok(keywords(&self.client.qa_catalogue().await?))
    }

    pub async fn by_keyword(&self, keyword: &str) -> Result<Vec<QaItem>> {
        Ok(by_keyword(&self.client.qa_catalogue().await?, keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(keyword: &str, question: &str) -> QaItem {
        QaItem {
            keyword: keyword.to_string(),
            question: question.to_string(),
        }
    }

    fn catalogue() -> Vec<QaItem> {
        vec![
            item("occupancy", "What is the average occupancy on weekdays?"),
            item("occupancy", "Which hour has the highest occupancy?"),
            item("revenue", "How much revenue did we make last month?"),
            item("peak hours", "When are the peak hours?"),
            item("turnover rate", "What is the turnover rate per space?"),
            item("technology", "Which payment systems are supported?"),
            item("violations", "How many overstay violations happened?"),
        ]
    }

    #[test]
    fn short_input_gives_nothing() {
        assert!(suggest(&catalogue(), "o").is_empty());
        assert!(suggest(&catalogue(), "  r  ").is_empty());
    }

    #[test]
    fn suggestions_match_keyword_question_or_topic() {
        let items = catalogue();

        let direct = suggest(&items, "REVENUE");
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].keyword, "revenue");

        // "turn" only matches the "turnover" topic word.
        let topical = suggest(&items, "turn");
        assert_eq!(topical, vec![items[4].clone()]);

        // Broad input is capped.
        let many: Vec<QaItem> = (0..10)
            .map(|i| item("parking", &format!("parking question {}", i)))
            .collect();
        assert_eq!(suggest(&many, "park").len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn follow_ups_use_same_and_related_keywords() {
        let items = catalogue();
        let next = follow_ups(&items, "what is the average occupancy on weekdays?");
        let keywords: Vec<&str> = next.iter().map(|q| q.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["occupancy", "revenue", "peak hours"]);
        assert!(next.iter().all(|q| !q.question.contains("weekdays")));

        assert!(follow_ups(&items, "not in the catalogue").is_empty());
    }

    #[test]
    fn keywords_are_distinct_in_first_seen_order() {
        let kws = keywords(&catalogue());
        assert_eq!(kws[0], "occupancy");
        assert_eq!(kws[1], "revenue");
        assert_eq!(kws.len(), 6);
    }

    #[test]
    fn keyword_lookup_ignores_case() {
        assert_eq!(by_keyword(&catalogue(), "Peak Hours").len(), 1);
        assert!(by_keyword(&catalogue(), "accuracy").is_empty());
    }
}
