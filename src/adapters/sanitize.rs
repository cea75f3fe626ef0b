//! Log sanitization for patient identifiers and credentials.
//!
//! Formatted log lines pass through [`SanitizingMakeWriter`] before reaching
//! the sink. The following are masked:
//! - CPF numbers (bare 11 digits or `xxx.xxx.xxx-xx`)
//! - Share access tokens (UUID shaped)
//! - Email addresses and phone numbers
//! - Bearer JWTs and `key=value` style secrets
//!
//! Sanitizing strings is a fallback. Call sites should still avoid putting
//! CPFs or access tokens into log messages in the first place.
//!
//! # Performance / DoS
//!
//! Input is capped at [`max_bytes`] per call (default 16 KiB). The cap is set
//! once at startup from `MEDSHARE_SANITIZE_MAX_BYTES`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

pub const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

static MAX_BYTES: AtomicUsize = AtomicUsize::new(DEFAULT_SANITIZE_MAX_BYTES);

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

struct Mask {
    regex: Regex,
    replacement: &'static str,
}

struct Patterns {
    any: RegexSet,
    masks: Vec<Mask>,
}

// Order matters: replacements run top to bottom, so the formatted CPF goes
// before the phone rule that would otherwise eat its tail.
const RULES: &[(&str, &str)] = &[
    (
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        "[REDACTED-TOKEN]",
    ),
    (r"\b\d{3}\.\d{3}\.\d{3}-\d{2}\b", "[REDACTED-CPF]"),
    (r"\b\d{11}\b", "[REDACTED-CPF]"),
    (
        r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
        "[REDACTED-EMAIL]",
    ),
    (
        r"(?:\+55\s?)?\(?\b\d{2}\)?\s?9?\d{4}-\d{4}\b",
        "[REDACTED-PHONE]",
    ),
    (
        r"\beyJ[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}\b",
        "[REDACTED-JWT]",
    ),
    (
        r"(?i)\b(?:api[_-]?key|access[_-]?token|token|secret|password|pwd)\b\s*[:=]\s*[A-Za-z0-9+/_-]{16,}={0,2}",
        "[REDACTED-SECRET]",
    ),
];

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        let any = RegexSet::new(RULES.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let masks = RULES
            .iter()
            .map(|(pattern, replacement)| Mask {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();
        Patterns { any, masks }
    })
}

/// Set the per-call input cap. Zero is ignored.
pub fn set_max_bytes(limit: usize) {
    if limit > 0 {
        MAX_BYTES.store(limit, Ordering::Relaxed);
    }
}

#[must_use]
pub fn max_bytes() -> usize {
    MAX_BYTES.load(Ordering::Relaxed)
}

fn truncate_to_char_boundary(input: &str, limit: usize) -> (&str, bool) {
    if input.len() <= limit {
        return (input, false);
    }
    let mut end = limit;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// Mask every sensitive pattern found in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_bytes())
}

fn sanitize_with_limit(input: &str, limit: usize) -> String {
    let patterns = patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, limit);

    let mut result = prefix.to_string();
    if patterns.any.is_match(prefix) {
        for mask in &patterns.masks {
            if mask.regex.is_match(&result) {
                result = mask.regex.replace_all(&result, mask.replacement).into_owned();
            }
        }
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
        if input.ends_with('\n') {
            result.push('\n');
        }
    }
    result
}

#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let (prefix, _) = truncate_to_char_boundary(input, max_bytes());
    patterns().any.is_match(prefix)
}

/// `tracing_subscriber` writer factory that sanitizes each formatted line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W: std::io::Write> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    fn write_sanitized(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.write_sanitized(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A formatter that never emits a newline must not grow the buffer forever.
        if self.buffer.len() > max_bytes().saturating_mul(2) {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
            if !pending.ends_with(b"\n") {
                self.inner.write_all(b"\n")?;
            }
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
        }
        self.inner.flush()
    }
}

impl<W: std::io::Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        let _ = std::io::Write::flush(self);
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}
