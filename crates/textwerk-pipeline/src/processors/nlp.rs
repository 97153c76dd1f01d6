// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// NLP capability contract and the built-in analyzers.
//
//   minimal   no entities, punctuation sentence split, stop-word language guess
//   patterns  minimal + a regex tagger for DATE, MONEY, PERCENT, EMAIL, URL

use std::sync::Arc;

use regex::Regex;
use textwerk_core::config::{NlpFallback, NlpSettings};
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::extraction::Entity;
use tracing::{info, warn};

/// What an analyzer reports for one text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Analysis {
    /// Sorted by start offset, non-overlapping.
    pub entities: Vec<Entity>,
    /// Byte ranges of sentences.
    pub sentences: Vec<(usize, usize)>,
    pub language: String,
}

/// An entity tagger. Implementations block.
pub trait NlpAnalyzer: Send + Sync {
    fn name(&self) -> &str;
    fn analyze(&self, text: &str) -> Result<Analysis>;
}

/// Resolve `settings.model`, following the configured fallback for unknown ids.
pub fn resolve_analyzer(settings: &NlpSettings) -> Result<Arc<dyn NlpAnalyzer>> {
    let language = settings.default_language.clone();
    let analyzer: Arc<dyn NlpAnalyzer> = match settings.model.as_str() {
        "minimal" => Arc::new(MinimalAnalyzer::new(language)),
        "patterns" => Arc::new(PatternAnalyzer::new(language)?),
        other => match settings.fallback {
            NlpFallback::Minimal => {
                warn!(model = other, "unknown NLP model, using the minimal analyzer");
                Arc::new(MinimalAnalyzer::new(language))
            }
            NlpFallback::Fail => {
                return Err(TextwerkError::Enrichment(format!(
                    "NLP model {other} is not available"
                )));
            }
        },
    };
    info!(analyzer = analyzer.name(), "NLP analyzer ready");
    Ok(analyzer)
}

// -- Minimal ------------------------------------------------------------------

const FRENCH_STOP_WORDS: &[&str] = &[
    "le", "la", "les", "de", "des", "du", "un", "une", "et", "est", "dans", "pour", "que", "qui",
    "sur", "au", "aux", "avec", "par", "pas", "ce", "cette", "sont",
];
const ENGLISH_STOP_WORDS: &[&str] = &[
    "the", "of", "and", "to", "in", "is", "that", "for", "it", "with", "as", "was", "on", "are",
    "by", "this", "be", "from", "or", "an",
];

#[derive(Debug, Clone)]
pub struct MinimalAnalyzer {
    default_language: String,
}

impl MinimalAnalyzer {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
        }
    }

    /// `fr` or `en` by stop-word counts, the default language on a tie.
    pub fn guess_language(&self, text: &str) -> String {
        let (mut french, mut english) = (0usize, 0usize);
        for word in text.split(|c: char| !c.is_alphabetic()) {
            let word = word.to_lowercase();
            if FRENCH_STOP_WORDS.contains(&word.as_str()) {
                french += 1;
            }
            if ENGLISH_STOP_WORDS.contains(&word.as_str()) {
                english += 1;
            }
        }
        match french.cmp(&english) {
            std::cmp::Ordering::Greater => "fr".to_owned(),
            std::cmp::Ordering::Less => "en".to_owned(),
            std::cmp::Ordering::Equal => self.default_language.clone(),
        }
    }
}

impl NlpAnalyzer for MinimalAnalyzer {
    fn name(&self) -> &str {
        "minimal"
    }

    fn analyze(&self, text: &str) -> Result<Analysis> {
        Ok(Analysis {
            entities: Vec::new(),
            sentences: split_sentences(text),
            language: self.guess_language(text),
        })
    }
}

/// Sentences end at `.`, `!`, `?` or `…` followed by whitespace, and at line
/// breaks. Ranges are trimmed and never empty.
pub fn split_sentences(text: &str) -> Vec<(usize, usize)> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => Some(i),
            '.' | '!' | '?' | '…' => match chars.peek() {
                None => Some(i + c.len_utf8()),
                Some((_, next)) if next.is_whitespace() => Some(i + c.len_utf8()),
                _ => None,
            },
            _ => None,
        };
        if let Some(end) = boundary {
            push_trimmed(text, start, end, &mut sentences);
            start = end;
        }
    }
    push_trimmed(text, start, text.len(), &mut sentences);
    sentences
}

fn push_trimmed(text: &str, start: usize, end: usize, out: &mut Vec<(usize, usize)>) {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if !trimmed.is_empty() {
        let from = start + leading;
        out.push((from, from + trimmed.len()));
    }
}

// -- Patterns -----------------------------------------------------------------

const MONTHS: &str = "janvier|février|fevrier|mars|avril|mai|juin|juillet|août|aout|septembre|octobre|novembre|décembre|decembre|january|february|march|april|may|june|july|august|september|october|november|december";

/// Regex tagger layered over the minimal analyzer.
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    base: MinimalAnalyzer,
    /// In priority order; earlier labels win overlaps starting at the same offset.
    patterns: Vec<(&'static str, Regex)>,
}

impl PatternAnalyzer {
    pub fn new(default_language: impl Into<String>) -> Result<Self> {
        let specs: Vec<(&'static str, String)> = vec![
            ("EMAIL", r"\b[\w.+-]+@[\w-]+(?:\.[\w-]+)+\b".into()),
            ("URL", r#"\bhttps?://[^\s<>"]+[^\s<>".,;:!?)]"#.into()),
            (
                "DATE",
                format!(
                    r"(?i)\b(?:\d{{4}}-\d{{2}}-\d{{2}}|\d{{1,2}}[/.-]\d{{1,2}}[/.-]\d{{2,4}}|\d{{1,2}}(?:er)?\s+(?:{MONTHS})\s+\d{{4}})\b"
                ),
            ),
            (
                "MONEY",
                r"(?i)(?:[$€£]\s?\d[\d\s.,]*\d|\b\d[\d\s.,]*\d\s?(?:€|\$|£|eur\b|euros?\b|usd\b|fc\b|cdf\b)|\b\d\s?(?:€|\$|£))".into(),
            ),
            ("PERCENT", r"\b\d+(?:[.,]\d+)?\s?%".into()),
        ];
        let patterns = specs
            .into_iter()
            .map(|(label, pattern)| {
                Regex::new(&pattern)
                    .map(|regex| (label, regex))
                    .map_err(|err| TextwerkError::Nlp(format!("invalid {label} pattern: {err}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            base: MinimalAnalyzer::new(default_language),
            patterns,
        })
    }

    pub fn entities(&self, text: &str) -> Vec<Entity> {
        let mut found: Vec<(usize, usize, usize)> = Vec::new();
        for (priority, (_, regex)) in self.patterns.iter().enumerate() {
            for m in regex.find_iter(text) {
                found.push((m.start(), m.end(), priority));
            }
        }
        // Earliest first, then longest, then label priority.
        found.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

        let mut entities: Vec<Entity> = Vec::new();
        let mut covered_until = 0;
        for (start, end, priority) in found {
            if start < covered_until {
                continue;
            }
            entities.push(Entity {
                text: text[start..end].trim_end().to_owned(),
                label: self.patterns[priority].0.to_owned(),
                start,
                end,
                confidence: 1.0,
            });
            covered_until = end;
        }
        entities
    }
}

impl NlpAnalyzer for PatternAnalyzer {
    fn name(&self) -> &str {
        "patterns"
    }

    fn analyze(&self, text: &str) -> Result<Analysis> {
        let mut analysis = self.base.analyze(text)?;
        analysis.entities = self.entities(text);
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(analysis: &Analysis) -> Vec<&str> {
        analysis.entities.iter().map(|e| e.label.as_str()).collect()
    }

    #[test]
    fn splits_on_punctuation_and_lines() {
        let text = "Première phrase. Deuxième ?\nTITRE\n\n3.5 reste";
        let sentences: Vec<&str> = split_sentences(text)
            .into_iter()
            .map(|(s, e)| &text[s..e])
            .collect();
        assert_eq!(sentences, vec!["Première phrase.", "Deuxième ?", "TITRE", "3.5 reste"]);
    }

    #[test]
    fn guesses_language_from_stop_words() {
        let analyzer = MinimalAnalyzer::new("fr");
        assert_eq!(analyzer.guess_language("the report of the year and the results"), "en");
        assert_eq!(analyzer.guess_language("le rapport de la commission pour les élus"), "fr");
        assert_eq!(analyzer.guess_language("12345"), "fr");
    }

    #[test]
    fn tags_common_patterns() {
        let analyzer = PatternAnalyzer::new("fr").unwrap();
        let analysis = analyzer
            .analyze("Versé le 12 décembre 2025 : 1 500 € (soit 12,5 %). Contact: info@example.org, https://example.org/avis.")
            .unwrap();
        assert_eq!(labels(&analysis), vec!["DATE", "MONEY", "PERCENT", "EMAIL", "URL"]);
        assert_eq!(analysis.entities[0].text, "12 décembre 2025");
        assert_eq!(analysis.entities[1].text, "1 500 €");
        assert_eq!(analysis.entities[4].text, "https://example.org/avis");
    }

    #[test]
    fn entity_offsets_index_the_text() {
        let analyzer = PatternAnalyzer::new("fr").unwrap();
        let text = "Échéance 2025-01-31.";
        let entity = &analyzer.analyze(text).unwrap().entities[0];
        assert_eq!(&text[entity.start..entity.end], "2025-01-31");
    }

    #[test]
    fn unknown_model_follows_the_fallback() {
        let mut settings = NlpSettings {
            model: "fr_core_news_md".into(),
            ..NlpSettings::default()
        };
        assert_eq!(resolve_analyzer(&settings).unwrap().name(), "minimal");

        settings.fallback = NlpFallback::Fail;
        assert!(matches!(
            resolve_analyzer(&settings),
            Err(TextwerkError::Enrichment(_))
        ));
        assert_eq!(resolve_analyzer(&NlpSettings::default()).unwrap().name(), "patterns");
    }
}
