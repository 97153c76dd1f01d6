// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text enrichment: entities, relations, key phrases, heading candidates,
// relevance, and language, attached to each text block.

use std::sync::Arc;

use textwerk_core::config::NlpSettings;
use textwerk_core::error::Result;
use textwerk_core::extraction::{Enrichment, Entity, Relation, TextBlock};
use tracing::{debug, instrument, warn};

use super::nlp::{Analysis, NlpAnalyzer, resolve_analyzer};
use crate::pool::BlockingPool;

/// Entity pairs closer than this many tokens are related.
const PROXIMITY_TOKENS: usize = 50;
const MAX_KEY_PHRASES: usize = 5;
const MAX_HEADING_WORDS: usize = 10;
const IMPORTANT_LABELS: &[&str] = &["PERSON", "ORG", "MONEY", "DATE", "LOC"];

#[derive(Clone)]
pub struct TextEnricher {
    analyzer: Arc<dyn NlpAnalyzer>,
}

impl std::fmt::Debug for TextEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEnricher")
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

impl TextEnricher {
    pub fn new(analyzer: Arc<dyn NlpAnalyzer>) -> Self {
        Self { analyzer }
    }

    pub fn from_settings(settings: &NlpSettings) -> Result<Self> {
        resolve_analyzer(settings).map(Self::new)
    }

    /// Enrich one block. Blocking. An analyzer failure leaves the block as it was.
    pub fn enrich(&self, mut block: TextBlock) -> TextBlock {
        if block.content.trim().is_empty() {
            return block;
        }
        match self.analyzer.analyze(&block.content) {
            Ok(analysis) => {
                block.metadata.language = Some(analysis.language.clone());
                block.enrichment = Some(build_enrichment(&block.content, analysis));
            }
            Err(err) => {
                warn!(order = block.metadata.order, error = %err, "text enrichment skipped");
            }
        }
        block
    }

    /// Enrich every block on the pool. Output order matches input order.
    #[instrument(skip_all, fields(blocks = blocks.len()))]
    pub async fn enrich_batch(&self, pool: &BlockingPool, blocks: Vec<TextBlock>) -> Vec<TextBlock> {
        let handles: Vec<_> = blocks
            .into_iter()
            .map(|block| {
                let enricher = self.clone();
                let original = block.clone();
                (original, pool.submit(move || enricher.enrich(block)))
            })
            .collect();

        let mut enriched = Vec::with_capacity(handles.len());
        for (original, handle) in handles {
            match handle.await {
                Ok(Ok(block)) => enriched.push(block),
                Ok(Err(err)) => {
                    warn!(error = %err, "text enrichment job failed");
                    enriched.push(original);
                }
                Err(err) => {
                    warn!(error = %err, "text enrichment job was lost");
                    enriched.push(original);
                }
            }
        }
        debug!(blocks = enriched.len(), "text enrichment done");
        enriched
    }
}

fn build_enrichment(text: &str, analysis: Analysis) -> Enrichment {
    let token_count = text.split_whitespace().count();
    let Analysis {
        entities,
        sentences,
        ..
    } = analysis;

    let sentence_texts: Vec<&str> = sentences.iter().map(|&(s, e)| &text[s..e]).collect();
    let key_phrases = sentences
        .iter()
        .zip(&sentence_texts)
        .filter(|((start, end), _)| {
            entities
                .iter()
                .any(|entity| entity.start < *end && entity.end > *start)
        })
        .map(|(_, sentence)| (*sentence).to_owned())
        .take(MAX_KEY_PHRASES)
        .collect();
    let heading_candidates = sentence_texts
        .iter()
        .filter(|sentence| looks_like_heading(sentence))
        .map(|sentence| (*sentence).to_owned())
        .collect();

    Enrichment {
        relations: relations(text, &entities),
        key_phrases,
        heading_candidates,
        relevance_score: relevance(&entities, token_count),
        token_count,
        sentence_count: sentences.len(),
        entities,
    }
}

/// Pairwise `proximity` relations between entities fewer than
/// [`PROXIMITY_TOKENS`] tokens apart.
pub fn relations(text: &str, entities: &[Entity]) -> Vec<Relation> {
    let positions: Vec<usize> = entities
        .iter()
        .map(|entity| {
            text.get(..entity.start)
                .map(|prefix| prefix.split_whitespace().count())
                .unwrap_or(0)
        })
        .collect();

    let mut relations = Vec::new();
    for source in 0..entities.len() {
        for target in source + 1..entities.len() {
            let distance = positions[source].abs_diff(positions[target]);
            if distance < PROXIMITY_TOKENS {
                relations.push(Relation {
                    source,
                    target,
                    kind: "proximity".to_owned(),
                    distance,
                });
            }
        }
    }
    relations
}

/// Half entity density, half share of important labels, capped at 1.
pub fn relevance(entities: &[Entity], token_count: usize) -> f32 {
    if token_count == 0 || entities.is_empty() {
        return 0.0;
    }
    let density = entities.len() as f32 / token_count as f32;
    let important = entities
        .iter()
        .filter(|e| IMPORTANT_LABELS.contains(&e.label.as_str()))
        .count() as f32
        / entities.len() as f32;
    (0.5 * density + 0.5 * important).min(1.0)
}

fn looks_like_heading(sentence: &str) -> bool {
    let words = sentence.split_whitespace().count();
    words > 0
        && words <= MAX_HEADING_WORDS
        && sentence.chars().any(char::is_alphabetic)
        && !sentence.chars().any(char::is_lowercase)
}
