// src/exec/builtin/summarize.rs

//! Extractive summarisation: score sentences, keep a few non-adjacent ones.

use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::exec::backend::{BoxFuture, CANCELLED_MESSAGE, ExecutionContext, Executor};
use crate::task::TaskKind;

const STEPS: u32 = 10;
const MAX_SUMMARY_SENTENCES: usize = 5;

const KEYWORDS: &[&str] = &[
    "important",
    "significant",
    "key",
    "main",
    "critical",
    "essential",
    "primary",
    "major",
    "crucial",
    "vital",
    "central",
    "core",
    "fundamental",
];

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence regex is valid"));

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub summary: String,
    pub original_word_count: usize,
    pub summary_word_count: usize,
    pub compression_ratio: u32,
    pub original_sentence_count: usize,
    pub summary_sentence_count: usize,
}

#[derive(Debug, Clone)]
pub struct SummarizeExecutor {
    step_delay: Duration,
}

impl SummarizeExecutor {
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

impl Executor for SummarizeExecutor {
    fn kind(&self) -> TaskKind {
        TaskKind::TextSummarization
    }

    fn execute(&self, mut ctx: ExecutionContext) -> BoxFuture<()> {
        let delay = self.step_delay;

        Box::pin(async move {
            let text = match ctx.input() {
                Value::String(s) => s.clone(),
                Value::Object(map) => match map.get("text").and_then(Value::as_str) {
                    Some(s) => s.to_string(),
                    None => {
                        ctx.fail("text-summarization input needs a \"text\" field").await;
                        return;
                    }
                },
                _ => {
                    ctx.fail("text-summarization input must be a string").await;
                    return;
                }
            };

            ctx.progress(20.0).await;
            for step in 0..STEPS {
                if ctx.pause(delay).await {
                    ctx.fail(CANCELLED_MESSAGE).await;
                    return;
                }
                ctx.progress(20.0 + f64::from(step + 1) * 60.0 / f64::from(STEPS)).await;
            }

            let summary = summarize(&text);
            ctx.progress(100.0).await;

            match serde_json::to_value(summary) {
                Ok(result) => ctx.succeed(result).await,
                Err(err) => ctx.fail(format!("encoding summary failed: {err}")).await,
            }
        })
    }
}

pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_END
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .collect()
}

pub fn summarize(text: &str) -> Summary {
    let sentences = split_sentences(text);
    let wanted = MAX_SUMMARY_SENTENCES.min(sentences.len().div_ceil(3));
    let selected = select_diverse(&sentences, wanted);

    let summary = if selected.is_empty() {
        String::new()
    } else {
        let picked: Vec<&str> = selected
            .iter()
            .map(|&i| sentences[i].trim().trim_end_matches(['.', '!', '?']))
            .collect();
        format!("{}.", picked.join(". "))
    };

    let original_word_count = word_count(text);
    let summary_word_count = word_count(&summary);
    let compression_ratio = if original_word_count == 0 {
        0
    } else {
        ((summary_word_count as f64 / original_word_count as f64) * 100.0).round() as u32
    };

    Summary {
        summary,
        original_word_count,
        summary_word_count,
        compression_ratio,
        original_sentence_count: sentences.len(),
        summary_sentence_count: selected.len(),
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn sentence_score(sentence: &str, index: usize, total: usize) -> f64 {
    let words = word_count(sentence) as f64;
    let position = index as f64 / total as f64;
    let position_score = if position < 0.2 || position > 0.8 { 1.5 } else { 1.0 };
    let length_score = (words / 10.0).min(2.0);
    let lower = sentence.to_lowercase();
    let keyword_score = if KEYWORDS.iter().any(|k| lower.contains(k)) { 1.5 } else { 1.0 };

    words * position_score * length_score * keyword_score
}

/// Indices of the best-scoring sentences, skipping neighbours of already
/// selected ones, in original order.
fn select_diverse(sentences: &[&str], max: usize) -> Vec<usize> {
    let total = sentences.len();
    let mut scored: Vec<(usize, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| (i, sentence_score(s, i, total)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut selected = BTreeSet::new();
    for (index, _) in scored {
        if selected.len() >= max {
            break;
        }
        let near = selected.contains(&index)
            || index.checked_sub(1).is_some_and(|prev| selected.contains(&prev))
            || selected.contains(&(index + 1));
        if !near {
            selected.insert(index);
        }
    }

    selected.into_iter().collect()
}
