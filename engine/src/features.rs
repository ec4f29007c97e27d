use crate::{
    schema::{FEATURE_COUNT, FEATURE_NAMES},
    url_parts::{parse_ipv4_literal, UrlParts},
    whois::{WhoisClient, WhoisError, WhoisLookup, WhoisRecord},
};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;

const COUNTED_SYMBOLS: [char; 16] = [
    '.', '-', '@', '?', '&', '=', '_', '~', '%', '/', '*', ':', ',', ';', '$', ' ',
];
const COUNTED_SUBSTRINGS: [&str; 3] = ["www", ".com", "//"];
const SHORTENERS: [&str; 3] = ["bit.ly", "tinyurl.com", "goo.gl"];

// Unmeasured signals. The deployed model was trained with these constants,
// so they stay fixed until real data sources exist and the model is retrained.
const WEB_TRAFFIC: f64 = 0.0;
const DNS_RECORD: f64 = 1.0;
const GOOGLE_INDEX: f64 = 1.0;
const PAGE_RANK: f64 = 0.0;

/// Runs of anything that is not a letter, a number or `_`. Vulgar fractions
/// and other `No` characters count as word characters.
fn word_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}_]+").expect("valid regex"))
}

/// Decimal digits plus the `No` characters with a digit value (superscripts,
/// subscripts, circled and parenthesized digits). Fractions are excluded.
fn digit_char() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"[\p{Nd}\x{00B2}\x{00B3}\x{00B9}\x{1369}-\x{1371}\x{19DA}",
            r"\x{2070}\x{2074}-\x{2079}\x{2080}-\x{2089}\x{2460}-\x{2468}",
            r"\x{2474}-\x{247C}\x{2488}-\x{2490}\x{24EA}\x{24F5}-\x{24FD}\x{24FF}",
            r"\x{2776}-\x{277E}\x{2780}-\x{2788}\x{278A}-\x{2792}\x{1F100}-\x{1F10A}]",
        ))
        .expect("valid regex")
    })
}

fn trailing_extension() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.[a-z]{2,}$").expect("valid regex"))
}

fn generated_dot_com() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]{10,}\.com").expect("valid regex"))
}

fn slashes_after_authority() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://[^/]*//").expect("valid regex"))
}

/// Ordered feature values, laid out as in [`FEATURE_NAMES`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        crate::schema::index_of(name).and_then(|i| self.values.get(i).copied())
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

/// Registration-age group derived from a WHOIS record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegistrationSignals {
    pub domain_present: f64,
    pub registration_length_days: f64,
    pub domain_age_days: f64,
}

impl RegistrationSignals {
    pub fn from_record(record: &WhoisRecord, now: DateTime<Utc>) -> Self {
        let domain_present = record.domain_name.as_deref().is_some_and(|d| !d.is_empty());

        let registration_length_days = match (record.expiration_date, record.updated_date) {
            (Some(expires), Some(updated)) => (expires - updated).num_days().max(0),
            _ => 0,
        };
        let domain_age_days = record
            .creation_date
            .map_or(0, |created| (now - created).num_days().max(0));

        Self {
            domain_present: flag(domain_present),
            registration_length_days: registration_length_days as f64,
            domain_age_days: domain_age_days as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct TokenStats {
    count: usize,
    min: usize,
    max: usize,
    mean: f64,
}

impl TokenStats {
    /// `count` and the mean's denominator include empty tokens; max only
    /// looks at non-empty ones. min folds a zero into the non-empty lengths,
    /// so it is always 0: deployed models were trained on that column.
    fn of<'a>(tokens: impl Iterator<Item = &'a str>) -> Self {
        let mut stats = TokenStats::default();
        let mut total = 0usize;
        let mut lengths = Vec::new();

        for token in tokens {
            let len = token.chars().count();
            stats.count += 1;
            total += len;
            if len > 0 {
                lengths.push(len);
            }
        }

        stats.min = lengths.iter().copied().chain([0]).min().unwrap_or(0);
        stats.max = lengths.iter().copied().max().unwrap_or(0);
        stats.mean = total as f64 / stats.count.max(1) as f64;
        stats
    }
}

pub struct FeatureExtractor<W = WhoisClient> {
    whois: W,
}

impl<W: WhoisLookup> FeatureExtractor<W> {
    pub fn new(whois: W) -> Self {
        Self { whois }
    }

    /// Never fails: every risky stage degrades to its documented defaults.
    pub async fn extract(&self, url: &str) -> FeatureVector {
        let parts = UrlParts::split(url);
        let mut values = lexical_features(url, &parts);

        let registration = match self.registration_signals(&parts.hostname).await {
            Ok(signals) => signals,
            Err(e) => {
                debug!("Registration features defaulted for {:?}: {}", parts.hostname, e);
                metrics::counter!("whois_failures_total", "kind" => e.kind()).increment(1);
                RegistrationSignals::default()
            }
        };
        values.extend([
            registration.domain_present,
            registration.registration_length_days,
            registration.domain_age_days,
        ]);

        values.extend([WEB_TRAFFIC, DNS_RECORD, GOOGLE_INDEX, PAGE_RANK]);

        debug_assert_eq!(values.len(), FEATURE_COUNT);
        FeatureVector { values }
    }

    async fn registration_signals(&self, hostname: &str) -> Result<RegistrationSignals, WhoisError> {
        let record = self.whois.lookup(hostname).await?;
        Ok(RegistrationSignals::from_record(&record, Utc::now()))
    }
}

/// Everything before the registration group; pure and deterministic.
pub fn lexical_features(url: &str, parts: &UrlParts) -> Vec<f64> {
    let host = parts.hostname.as_str();
    let path = parts.path.as_str();
    let lower = url.to_lowercase();
    let url_len = url.chars().count();
    let host_len = host.chars().count();

    let mut f = Vec::with_capacity(FEATURE_COUNT);

    // Lengths
    f.push(url_len as f64);
    f.push(host_len as f64);
    f.push(flag(parse_ipv4_literal(host).is_some()));

    // Symbol counts
    f.extend(COUNTED_SYMBOLS.iter().map(|c| url.matches(*c).count() as f64));
    f.extend(COUNTED_SUBSTRINGS.iter().map(|s| lower.matches(s).count() as f64));

    // Positional flags: a second scheme token hiding past the real one.
    f.push(flag(path.contains("http")));
    let after_scheme: String = url.chars().skip(8).collect();
    f.push(flag(after_scheme.contains("https")));

    // Digit ratios
    f.push(digit_ratio(url, url_len));
    f.push(digit_ratio(host, host_len));

    // Structural flags
    let host_labels: Vec<&str> = host.split('.').collect();
    f.push(flag(url.contains("xn--")));
    f.push(flag(parts.port.is_some_and(|p| p != 0)));
    f.push(flag(trailing_extension().is_match(path)));
    f.push(flag(trailing_extension().is_match(host_labels[0])));
    f.push(flag(host_labels.len() > 3));
    f.push(host_labels.len() as f64);
    f.push(flag(host.contains('-')));
    f.push(flag(generated_dot_com().is_match(host)));
    f.push(flag(SHORTENERS.iter().any(|s| url.contains(s))));
    f.push(flag(path.contains('.')));
    f.push(url.matches("//").count() as f64 - 1.0);
    f.push(flag(slashes_after_authority().is_match(url)));

    // Token statistics
    let url_tokens = TokenStats::of(word_separator().split(url));
    let host_tokens = TokenStats::of(host.split('.'));
    let path_tokens = TokenStats::of(path.split('/'));
    f.push(url_tokens.count as f64);
    f.push(flag(has_char_run(url, 4)));
    f.extend([url_tokens.min, host_tokens.min, path_tokens.min].map(|v| v as f64));
    f.extend([url_tokens.max, host_tokens.max, path_tokens.max].map(|v| v as f64));
    f.extend([url_tokens.mean, host_tokens.mean, path_tokens.mean]);

    // Keywords
    f.push(lower.matches("phish").count() as f64);
    f.push(flag(host.contains("domain")));
    f.push(flag(host.contains("brand")));
    f.push(flag(path.contains("brand")));
    f.push(flag(host.ends_with(".tk")));

    f
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

fn digit_ratio(text: &str, len: usize) -> f64 {
    if len == 0 {
        return 0.0;
    }
    digit_char().find_iter(text).count() as f64 / len as f64
}

/// True when some character repeats `run` or more times in a row. Newlines
/// never count toward a run.
fn has_char_run(text: &str, run: usize) -> bool {
    let mut previous = None;
    let mut streak = 0;
    for c in text.chars() {
        if c == '\n' {
            previous = None;
            streak = 0;
            continue;
        }
        streak = if previous == Some(c) { streak + 1 } else { 1 };
        if streak >= run {
            return true;
        }
        previous = Some(c);
    }
    false
}
