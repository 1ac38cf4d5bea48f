//! Log sanitization for patient identifiers and contact details.
//!
//! Every formatted log line passes through [`SanitizingMakeWriter`], which
//! replaces:
//! - identifiers registered from the loaded visit file
//! - `patient_id=...` style key/value pairs
//! - emails, phone numbers, SSN-like and MRN-like tokens
//!
//! Identifiers are arbitrary strings, so no fixed pattern can catch them all.
//! The record store calls [`register_identifiers`] after each successful load
//! so later log lines mentioning a known identifier are redacted.
//!
//! `sanitize()` caps its input (see `HEALTHPREDICT_SANITIZE_MAX_BYTES`) so a
//! huge log line cannot stall the writer.

use regex::{Regex, RegexSet};
use std::collections::BTreeSet;
use std::sync::{OnceLock, RwLock};
use tracing_subscriber::fmt::MakeWriter;

static PII_PATTERNS: OnceLock<PiiPatterns> = OnceLock::new();

static KNOWN_IDS: RwLock<KnownIds> = RwLock::new(KnownIds {
    ids: BTreeSet::new(),
    regex: None,
});

/// Defaults to 16 KiB; can be overridden via `HEALTHPREDICT_SANITIZE_MAX_BYTES`.
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

const ID_REPLACEMENT: &str = "[REDACTED-ID]";

struct PiiPattern {
    regex: Regex,
    replacement: &'static str,
}

struct PiiPatterns {
    set: RegexSet,
    patterns: Vec<PiiPattern>,
}

struct KnownIds {
    ids: BTreeSet<String>,
    /// Whole-token alternation over `ids`, longest first.
    regex: Option<Regex>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("HEALTHPREDICT_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn get_patterns() -> &'static PiiPatterns {
    PII_PATTERNS.get_or_init(|| {
        let rules: Vec<(&'static str, &'static str)> = vec![
            // patient_id=P001, patient: P001, identifier=...
            (
                r"(?i)\b(patient(?:[_ ]?id)?|identifier)\s*[:=]\s*[^\s,;)]+",
                "$1=[REDACTED-ID]",
            ),
            (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
            (r"\bMRN[:\s]?\d{6,10}\b", "[REDACTED-MRN]"),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            (
                r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s][0-9]{3}[-.\s][0-9]{4}\b",
                "[REDACTED-PHONE]",
            ),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let patterns = rules
            .into_iter()
            .map(|(pattern, replacement)| PiiPattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        PiiPatterns { set, patterns }
    })
}

// Whole-token match: an id must not match inside a longer word or number.
// `\b` is only added on edges that are word characters, where it can hold.
fn bounded(id: &str) -> String {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let start = if is_word(id.chars().next()) { r"\b" } else { "" };
    let end = if is_word(id.chars().next_back()) { r"\b" } else { "" };
    format!("{start}{}{end}", regex::escape(id))
}

/// Register identifiers present in the loaded visit file.
///
/// Registration is additive: identifiers from earlier loads stay redacted.
pub fn register_identifiers<'a, I>(ids: I)
where
    I: IntoIterator<Item = &'a str>,
{
    let Ok(mut known) = KNOWN_IDS.write() else {
        return;
    };

    let before = known.ids.len();
    known
        .ids
        .extend(ids.into_iter().filter(|s| !s.is_empty()).map(str::to_string));
    if known.ids.len() == before {
        return;
    }

    let mut ordered: Vec<&String> = known.ids.iter().collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let alternation = ordered
        .iter()
        .map(|id| bounded(id))
        .collect::<Vec<_>>()
        .join("|");

    let compiled = Regex::new(&alternation);
    known.regex = compiled.as_ref().ok().cloned();
    drop(known);

    // Logged after the lock is released: the log writer reads KNOWN_IDS.
    if let Err(e) = compiled {
        // Too many identifiers for one program; fixed patterns still apply.
        tracing::warn!("Identifier redaction disabled: {e}");
    }
}

/// Sanitize a string by replacing identifiers and PII patterns.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();

    // Key/value redaction runs first so the known-id pass never splits a pair.
    for idx in patterns.set.matches(prefix).into_iter() {
        let pattern = &patterns.patterns[idx];
        result = pattern
            .regex
            .replace_all(&result, pattern.replacement)
            .into_owned();
    }

    if let Ok(known) = KNOWN_IDS.read() {
        if let Some(re) = known.regex.as_ref() {
            if re.is_match(&result) {
                result = re.replace_all(&result, ID_REPLACEMENT).into_owned();
            }
        }
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check if a string contains potential PII or a registered identifier.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let (prefix, _truncated) = truncate_to_char_boundary(input, max_sanitize_bytes());
    if get_patterns().set.is_match(prefix) {
        return true;
    }
    KNOWN_IDS
        .read()
        .map(|known| known.regex.as_ref().is_some_and(|re| re.is_match(prefix)))
        .unwrap_or(false)
}

/// A `tracing_subscriber` writer wrapper that sanitizes formatted log output
/// before it is written to the underlying sink.
#[derive(Debug)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<M> Clone for SanitizingMakeWriter<M>
where
    M: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }
}

impl<W> SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            let sanitized = sanitize(&String::from_utf8_lossy(&line));
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W> std::io::Write for SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A formatter writing one huge line with no newline must not buffer forever.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if hard_cap > 0 && self.buffer.len() > hard_cap {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n[TRUNCATED]\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;

        if !self.buffer.is_empty() {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }

        self.inner.flush()
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_sanitize_patient_key_value() {
        let sanitized = sanitize("login ok patient_id=ZX-4411 session=1");
        assert!(sanitized.contains("patient_id=[REDACTED-ID]"));
        assert!(!sanitized.contains("ZX-4411"));
        assert!(sanitized.contains("session=1"));
    }

    #[test]
    fn test_sanitize_registered_identifier() {
        register_identifiers(["QK77AB19", "QK77AB1"]);
        let sanitized = sanitize("rendering dashboard for QK77AB19");
        assert!(sanitized.contains(ID_REPLACEMENT));
        assert!(!sanitized.contains("QK77AB1"));
        assert!(contains_pii("QK77AB1 and more"));
    }

    #[test]
    fn test_registered_identifier_matches_whole_tokens_only() {
        register_identifiers(["9041", "#K12"]);
        assert_eq!(
            sanitize("Loaded 19041 rows in 90412 us"),
            "Loaded 19041 rows in 90412 us"
        );
        assert_eq!(sanitize("viewing 9041 now"), format!("viewing {ID_REPLACEMENT} now"));
        assert_eq!(sanitize("ward #K12, bed 3"), format!("ward {ID_REPLACEMENT}, bed 3"));
        assert!(!contains_pii("timestamp 2024-09-04 1904"));
    }

    #[test]
    fn test_sanitize_email_and_phone() {
        let sanitized = sanitize("Contact: patient@hospital.com or 555-123-4567");
        assert!(sanitized.contains("[REDACTED-EMAIL]"));
        assert!(sanitized.contains("[REDACTED-PHONE]"));
    }

    #[test]
    fn test_sanitize_ssn_and_mrn() {
        assert!(sanitize("SSN: 123-45-6789").contains("[REDACTED-SSN]"));
        assert!(sanitize("MRN:12345678 found").contains("[REDACTED-MRN]"));
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(sanitize("Loaded 42 visit records"), "Loaded 42 visit records");
        assert!(!contains_pii("Just normal log text"));
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let sanitized = sanitize_with_limit("a fairly long log line that keeps going", 16);
        assert!(sanitized.ends_with("[TRUNCATED]"));
    }

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("sink lock").extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let sink = Sink::default();
        let mut writer = SanitizingWriter::new(sink.clone());
        writer.write_all(b"patient=AB12").expect("write");
        writer.write_all(b"3 done\nnext line\n").expect("write");
        writer.flush().expect("flush");

        let out = String::from_utf8(sink.0.lock().expect("sink lock").clone()).expect("utf8");
        assert_eq!(out, "patient=[REDACTED-ID] done\nnext line\n");
    }
}
