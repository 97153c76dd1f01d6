// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract engine: drives the binary with the image on stdin and reads
// word-level TSV output.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use textwerk_core::error::{Result, TextwerkError};
use tracing::{debug, instrument};

use super::engine::{OcrEngine, RecognitionRequest, RecognizedText};

/// TSV row level of a single word.
const WORD_LEVEL: u32 = 5;

#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: PathBuf,
}

impl TesseractEngine {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &Path {
        &self.command
    }
}

impl OcrEngine for TesseractEngine {
    fn version(&self) -> Result<String> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .map_err(|err| {
                TextwerkError::OcrError(format!(
                    "cannot run {}: {}",
                    self.command.display(),
                    err
                ))
            })?;
        if !output.status.success() {
            return Err(TextwerkError::OcrError(format!(
                "{} --version exited with {}",
                self.command.display(),
                output.status
            )));
        }
        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .map(|line| line.trim().to_owned())
            .filter(|line| !line.is_empty())
            .ok_or_else(|| TextwerkError::OcrError("empty version banner".into()))
    }

    #[instrument(skip(self, png), fields(bytes = png.len(), psm = request.mode.psm()))]
    fn recognize(&self, png: &[u8], request: &RecognitionRequest) -> Result<RecognizedText> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &request.language])
            .args(["--psm", &request.mode.psm().to_string()])
            .args(["--oem", &request.engine_mode.to_string()])
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                TextwerkError::OcrError(format!(
                    "cannot run {}: {}",
                    self.command.display(),
                    err
                ))
            })?;

        // The child is always reaped; an early exit shows up as a broken pipe
        // here and its own message on stderr.
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(png),
            None => Ok(()),
        };
        let output = child
            .wait_with_output()
            .map_err(|err| TextwerkError::OcrError(format!("recognition did not finish: {}", err)))?;
        if !output.status.success() {
            return Err(TextwerkError::OcrError(format!(
                "recognition exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        sent.map_err(|err| TextwerkError::OcrError(format!("cannot send image: {}", err)))?;

        let recognized = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        debug!(
            chars = recognized.text.len(),
            tokens = recognized.confidences.len(),
            "recognition done"
        );
        Ok(recognized)
    }
}

/// Rebuild text from TSV rows: words joined by spaces, lines by a newline,
/// paragraphs and blocks by a blank line. Every row contributes its
/// confidence; structural rows carry the -1 sentinel.
pub fn parse_tsv(tsv: &str) -> RecognizedText {
    let mut text = String::new();
    let mut confidences = Vec::new();
    let mut last_line: Option<(u32, u32, u32, u32)> = None;

    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 11 {
            continue;
        }
        let number = |i: usize| fields[i].trim().parse::<u32>().unwrap_or(0);
        let Ok(confidence) = fields[10].trim().parse::<f32>() else {
            continue;
        };
        confidences.push(confidence);

        let word = fields.get(11).map(|w| w.trim()).unwrap_or("");
        if number(0) != WORD_LEVEL || word.is_empty() {
            continue;
        }
        let line = (number(1), number(2), number(3), number(4));
        match last_line {
            Some(previous) if previous == line => text.push(' '),
            Some(previous) if previous.0 == line.0 && previous.1 == line.1 && previous.2 == line.2 => {
                text.push('\n')
            }
            Some(_) => text.push_str("\n\n"),
            None => {}
        }
        text.push_str(word);
        last_line = Some(line);
    }

    RecognizedText { text, confidences }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textwerk_core::types::SegmentationMode;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t600\t400\t-1\t
2\t1\t1\t0\t0\t0\t10\t10\t500\t60\t-1\t
5\t1\t1\t1\t1\t1\t10\t10\t80\t20\t96.5\tJeudi
5\t1\t1\t1\t1\t2\t95\t10\t20\t20\t91.0\t12
5\t1\t1\t1\t2\t1\t10\t40\t80\t20\t88.0\tdécembre
5\t1\t2\t1\t1\t1\t10\t200\t80\t20\t70.5\tFin
5\t1\t2\t1\t1\t2\t10\t200\t80\t20\t-1\t ";

    #[test]
    fn words_lines_and_blocks() {
        let recognized = parse_tsv(TSV);
        assert_eq!(recognized.text, "Jeudi 12\ndécembre\n\nFin");
        assert_eq!(recognized.confidences.len(), 7);
        let mean = recognized.mean_confidence();
        assert!((mean - (96.5 + 91.0 + 88.0 + 70.5) / 400.0).abs() < 1e-5);
    }

    #[test]
    fn header_only_output_is_empty() {
        let recognized = parse_tsv("level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n");
        assert!(recognized.text.is_empty());
        assert!(recognized.confidences.is_empty());
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("tesseract");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn request() -> RecognitionRequest {
        RecognitionRequest {
            language: "fra".into(),
            mode: SegmentationMode::UniformBlock,
            engine_mode: 1,
        }
    }

    #[cfg(unix)]
    #[test]
    fn early_exit_reports_the_engine_message() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(script(
            dir.path(),
            "echo \"Failed loading language 'fra'\" >&2\nexit 1",
        ));
        // Far larger than a pipe buffer, so the write hits the closed pipe.
        let image = vec![0u8; 4 * 1024 * 1024];
        for _ in 0..3 {
            match engine.recognize(&image, &request()) {
                Err(TextwerkError::OcrError(message)) => {
                    assert!(message.contains("Failed loading language"), "{message}");
                }
                other => panic!("expected an OCR error, got {other:?}"),
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn reads_tsv_from_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("cat > /dev/null\ncat <<'EOF'\n{TSV}\nEOF");
        let engine = TesseractEngine::new(script(dir.path(), &body));
        let recognized = engine.recognize(b"png bytes", &request()).unwrap();
        assert_eq!(recognized.text, "Jeudi 12\ndécembre\n\nFin");
    }

    #[test]
    fn missing_binary_is_an_ocr_error() {
        let engine = TesseractEngine::new("/nonexistent/textwerk/tesseract");
        assert!(matches!(engine.version(), Err(TextwerkError::OcrError(_))));
    }
}
