// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rule-based post-OCR correction for French administrative text.
//
// Three passes in a fixed order: pattern repairs, whole-word dictionary
// substitutions, then whitespace normalization. The shipped rules are
// idempotent: correcting corrected text changes nothing.

use regex::{NoExpand, Regex};
use textwerk_core::error::{Result, TextwerkError};
use tracing::debug;

/// Share of changed words above which confidence is lowered.
const WORD_DRIFT_LIMIT: f32 = 0.2;
const DRIFT_PENALTY: f32 = 0.9;
const STABLE_BONUS: f32 = 1.05;

const MONTHS: &str = "JANVIER|FÉVRIER|FEVRIER|MARS|AVRIL|MAI|JUIN|JUILLET|AOÛT|AOUT|SEPTEMBRE|OCTOBRE|NOVEMBRE|DÉCEMBRE|DECEMBRE";

/// Pattern repairs, applied in order.
fn pattern_rules() -> Vec<(String, &'static str)> {
    vec![
        // Spaced years: "2 0 2 5".
        (
            r"\b([12])[ \t]+(\d)[ \t]+(\d)[ \t]+(\d)\b".into(),
            "${1}${2}${3}${4}",
        ),
        // Truncated month: "12 mbre". Must run before the "ou <day> <month>" rule.
        (
            r"(?i)\b(\d{1,2})[ \t]+mbre\b".into(),
            "${1} décembre",
        ),
        (r"(?i)\b(?:cudi|cudl|eudi)\b".into(), "Jeudi"),
        (r"(?i)\blus[ \t]+d['’](?:infos|fos)\b".into(), "plus d'infos"),
        (r"(?i)\bd['’]fos\b".into(), "d'infos"),
        (r"(?i)\btol[ \t]+N°".into(), "LOI N°"),
        (
            format!(r"(?i)\bou[ \t]+(\d{{1,2}})[ \t]+({MONTHS})\b"),
            "DU ${1} ${2}",
        ),
        (r"(?i)\bPérode\b".into(), "Période"),
        (r"(?i)\b[BM][ \t]+Période\b".into(), "BB Période"),
    ]
}

/// Whole-word substitutions, matched case-insensitively.
const DICTIONARY: &[(&str, &str)] = &[
    ("cudi", "Jeudi"),
    ("cudl", "Jeudi"),
    ("eudi", "Jeudi"),
    ("mbre", "décembre"),
    ("d'fos", "d'infos"),
    ("lus d'infos", "plus d'infos"),
    ("Pérode", "Période"),
];

/// Compiled correction rules.
#[derive(Debug, Clone)]
pub struct OcrCorrector {
    patterns: Vec<(Regex, &'static str)>,
    dictionary: Vec<(Regex, &'static str)>,
}

impl OcrCorrector {
    pub fn new() -> Result<Self> {
        let patterns = pattern_rules()
            .into_iter()
            .map(|(pattern, replacement)| Ok((compile(&pattern)?, replacement)))
            .collect::<Result<Vec<_>>>()?;
        let dictionary = DICTIONARY
            .iter()
            .map(|(wrong, right)| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(wrong));
                Ok((compile(&pattern)?, *right))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns,
            dictionary,
        })
    }

    /// Apply every rule to `text`.
    pub fn correct(&self, text: &str) -> String {
        let mut corrected = text.to_owned();
        for (pattern, replacement) in &self.patterns {
            corrected = pattern.replace_all(&corrected, *replacement).into_owned();
        }
        for (pattern, replacement) in &self.dictionary {
            corrected = pattern
                .replace_all(&corrected, NoExpand(replacement))
                .into_owned();
        }
        normalize_whitespace(&corrected)
    }

    /// Correct `text` and adjust the recognition confidence to the amount of
    /// change.
    pub fn correct_with_confidence(&self, text: &str, confidence: f32) -> (String, f32) {
        let corrected = self.correct(text);
        let adjusted = adjust_confidence(text, &corrected, confidence);
        debug!(
            before = text.len(),
            after = corrected.len(),
            confidence,
            adjusted,
            "ocr text corrected"
        );
        (corrected, adjusted)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|err| TextwerkError::OcrError(format!("invalid correction rule {pattern}: {err}")))
}

/// Lower confidence when the word count drifted by more than a fifth,
/// otherwise nudge it up, never past 1.
pub fn adjust_confidence(original: &str, corrected: &str, confidence: f32) -> f32 {
    let before = original.split_whitespace().count();
    let after = corrected.split_whitespace().count();
    let drift = before.abs_diff(after) as f32;
    if drift > before as f32 * WORD_DRIFT_LIMIT {
        confidence * DRIFT_PENALTY
    } else {
        (confidence * STABLE_BONUS).min(1.0)
    }
}

/// CRLF to LF, runs of spaces and tabs to one space, trimmed lines, at most
/// one blank line in a row, trimmed overall.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = false;
    for line in text.split('\n') {
        let collapsed = line
            .split([' ', '\t'])
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let collapsed = collapsed.trim();
        if collapsed.is_empty() {
            if previous_blank {
                continue;
            }
            previous_blank = true;
        } else {
            previous_blank = false;
        }
        lines.push(collapsed.to_owned());
    }
    lines.join("\n").trim().to_owned()
}
