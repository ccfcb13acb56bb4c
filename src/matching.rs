//! Product and FAQ matching over the remote tables.
//!
//! Both matchers fetch fresh rows on every call (no local cache) and degrade
//! remote failures to empty results; errors never reach the conversation
//! layer.

use tracing::{debug, error};

use crate::appsheet::{Backend, FaqEntry, Product};
use crate::text_processing::{normalize, overlap_score, query_tokens, question_tokens};

/// Fuzzy product lookup: returns every product whose normalized name
/// contains the normalized query as a substring.
pub async fn find_products(backend: &dyn Backend, query: &str) -> Vec<Product> {
    let needle = normalize(query.trim());
    if needle.is_empty() {
        return Vec::new();
    }

    let all = match backend.products().await {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "Product lookup failed");
            return Vec::new();
        }
    };

    let matches: Vec<Product> = all
        .into_iter()
        .filter(|product| normalize(&product.name).contains(&needle))
        .collect();

    debug!(query = %query, matches = matches.len(), "Product search finished");
    matches
}

/// Best-effort FAQ lookup by keyword overlap.
///
/// The query is tokenized with the stop-word and short-token filters; if
/// nothing remains, no lookup is attempted. Each row is scored by how many
/// query tokens appear in its question; the strictly highest score wins,
/// ties resolve to the first row in remote order, and an all-zero round
/// yields `None`.
pub async fn find_faq_answer(backend: &dyn Backend, question: &str) -> Option<String> {
    let query = query_tokens(question);
    if query.is_empty() {
        debug!("FAQ query reduced to no content tokens; skipping lookup");
        return None;
    }

    let entries = match backend.faq_entries().await {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "FAQ lookup failed");
            return None;
        }
    };

    let mut best: Option<(usize, &FaqEntry)> = None;
    for entry in &entries {
        let score = overlap_score(&query, &question_tokens(&entry.question));
        // Strictly-greater keeps the earliest row on ties.
        if score > 0 && best.map_or(true, |(top, _)| score > top) {
            best = Some((score, entry));
        }
    }

    best.map(|(score, entry)| {
        debug!(score, question = %entry.question, "FAQ match selected");
        entry.answer.clone()
    })
}
