use crate::{config::WhoisConfig, url_parts::parse_ipv4_literal};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use moka::future::Cache;
use std::{future::Future, net::IpAddr, time::Duration};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tracing::debug;

const MAX_RESPONSE_BYTES: u64 = 256 * 1024;

/// Second-level labels that act as public suffixes under two-letter ccTLDs.
const GENERIC_SECOND_LEVEL: &[&str] = &["ac", "co", "com", "edu", "gov", "net", "org", "or", "ne"];

const DOMAIN_KEYS: &[&str] = &["domain name", "domain", "domain_name"];
const CREATION_KEYS: &[&str] = &[
    "creation date",
    "created",
    "created on",
    "created date",
    "registration time",
    "registered on",
    "registered",
    "registration date",
    "domain registration date",
];
const EXPIRATION_KEYS: &[&str] = &[
    "registry expiry date",
    "registrar registration expiration date",
    "expiration date",
    "expiry date",
    "expires",
    "expires on",
    "expire date",
    "expiration time",
    "paid-till",
    "domain expiration date",
];
const UPDATED_KEYS: &[&str] = &[
    "updated date",
    "last updated",
    "last updated on",
    "last modified",
    "last-modified",
    "changed",
    "modified",
];

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y.%m.%d %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d-%b-%Y", "%d.%m.%Y", "%Y.%m.%d", "%Y/%m/%d", "%d/%m/%Y", "%Y%m%d", "%b %d %Y",
];

#[derive(Error, Debug)]
pub enum WhoisError {
    #[error("no hostname to look up")]
    EmptyDomain,

    #[error("{0} is an IP literal")]
    IpLiteral(String),

    #[error("WHOIS lookups are disabled")]
    Disabled,

    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no WHOIS server known for .{0}")]
    NoServer(String),

    #[error("no registration record for {0}")]
    NotFound(String),

    #[error("unparseable {field} date: {value:?}")]
    MalformedDate { field: &'static str, value: String },
}

impl WhoisError {
    pub fn kind(&self) -> &'static str {
        match self {
            WhoisError::EmptyDomain => "empty_domain",
            WhoisError::IpLiteral(_) => "ip_literal",
            WhoisError::Disabled => "disabled",
            WhoisError::Timeout(_) => "timeout",
            WhoisError::Io(_) => "io",
            WhoisError::NoServer(_) => "no_server",
            WhoisError::NotFound(_) => "not_found",
            WhoisError::MalformedDate { .. } => "malformed_date",
        }
    }
}

/// The parts of a registration record the extractor cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoisRecord {
    pub domain_name: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
}

pub trait WhoisLookup: Send + Sync {
    fn lookup(&self, hostname: &str) -> impl Future<Output = Result<WhoisRecord, WhoisError>> + Send;
}

/// Port-43 WHOIS client with IANA bootstrap and a TTL cache of successful lookups.
#[derive(Clone)]
pub struct WhoisClient {
    config: WhoisConfig,
    cache: Cache<String, WhoisRecord>,
}

impl WhoisClient {
    pub fn new(config: WhoisConfig) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(config.cache_ttl_secs))
            .max_capacity(config.cache_capacity)
            .build();
        Self { config, cache }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    async fn query(&self, server: &str, query: &str) -> Result<String, WhoisError> {
        let mut stream = TcpStream::connect((server, self.config.port)).await?;
        stream.write_all(format!("{query}\r\n").as_bytes()).await?;

        let mut buf = Vec::new();
        stream.take(MAX_RESPONSE_BYTES).read_to_end(&mut buf).await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    async fn registry_server(&self, tld: &str) -> Result<String, WhoisError> {
        let response = self.query(&self.config.bootstrap_server, tld).await?;
        find_value(&response, &["refer", "whois"])
            .map(normalize_server)
            .ok_or_else(|| WhoisError::NoServer(tld.to_string()))
    }

    async fn lookup_uncached(&self, domain: &str) -> Result<WhoisRecord, WhoisError> {
        let tld = domain.rsplit('.').next().unwrap_or(domain);
        let registry = self.registry_server(tld).await?;
        let response = self.query(&registry, domain).await?;

        if self.config.follow_referrals {
            if let Some(registrar) = find_value(&response, &["registrar whois server"]).map(normalize_server) {
                if !registrar.is_empty() && !registrar.eq_ignore_ascii_case(&registry) {
                    match self.query(&registrar, domain).await.and_then(|text| parse_response(&text)) {
                        Ok(record) => return Ok(record),
                        Err(e) => debug!("Registrar referral {} failed for {}: {}", registrar, domain, e),
                    }
                }
            }
        }

        parse_response(&response)
    }
}

impl WhoisLookup for WhoisClient {
    async fn lookup(&self, hostname: &str) -> Result<WhoisRecord, WhoisError> {
        if !self.config.enabled {
            return Err(WhoisError::Disabled);
        }
        let domain = query_domain(hostname)?;

        if let Some(record) = self.cache.get(&domain).await {
            debug!("WHOIS cache hit for {}", domain);
            return Ok(record);
        }

        let timeout = self.timeout();
        let record = tokio::time::timeout(timeout, self.lookup_uncached(&domain))
            .await
            .map_err(|_| WhoisError::Timeout(timeout))??;

        self.cache.insert(domain, record.clone()).await;
        Ok(record)
    }
}

/// Reduces a hostname to the name a registry will answer for.
pub fn query_domain(hostname: &str) -> Result<String, WhoisError> {
    let host = hostname.trim_end_matches('.');
    if host.is_empty() {
        return Err(WhoisError::EmptyDomain);
    }
    if host.parse::<IpAddr>().is_ok() || parse_ipv4_literal(host).is_some() {
        return Err(WhoisError::IpLiteral(host.to_string()));
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return Err(WhoisError::NotFound(host.to_string()));
    }

    let tld = labels[labels.len() - 1];
    let sld = labels[labels.len() - 2];
    let keep = if labels.len() >= 3 && tld.len() == 2 && GENERIC_SECOND_LEVEL.contains(&sld) {
        3
    } else {
        2
    };
    Ok(labels[labels.len() - keep..].join("."))
}

/// Parses a registry or registrar response. Repeated keys are list-valued
/// fields; only the first value counts.
pub fn parse_response(text: &str) -> Result<WhoisRecord, WhoisError> {
    let mut record = WhoisRecord::default();

    for (key, value) in key_values(text) {
        if record.domain_name.is_none() && DOMAIN_KEYS.contains(&key.as_str()) {
            record.domain_name = Some(value.to_lowercase());
        } else if record.creation_date.is_none() && CREATION_KEYS.contains(&key.as_str()) {
            record.creation_date = Some(parse_date("creation", value)?);
        } else if record.expiration_date.is_none() && EXPIRATION_KEYS.contains(&key.as_str()) {
            record.expiration_date = Some(parse_date("expiration", value)?);
        } else if record.updated_date.is_none() && UPDATED_KEYS.contains(&key.as_str()) {
            record.updated_date = Some(parse_date("updated", value)?);
        }
    }

    let empty = record.domain_name.is_none()
        && record.creation_date.is_none()
        && record.expiration_date.is_none()
        && record.updated_date.is_none();
    if empty {
        return Err(WhoisError::NotFound(first_line(text)));
    }
    Ok(record)
}

pub fn parse_date(field: &'static str, value: &str) -> Result<DateTime<Utc>, WhoisError> {
    let trimmed = value.trim();
    let candidates = [trimmed, trimmed.split_whitespace().next().unwrap_or_default()];
    candidates
        .iter()
        .find_map(|candidate| try_parse_date(candidate))
        .ok_or_else(|| WhoisError::MalformedDate {
            field,
            value: trimmed.to_string(),
        })
}

fn try_parse_date(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = text
        .trim_end_matches('Z')
        .trim_end_matches(" UTC")
        .trim_end_matches(" GMT")
        .trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(naive, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn key_values(text: &str) -> impl Iterator<Item = (String, &str)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('%') && !line.starts_with('#') && !line.starts_with(">>>"))
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim()))
        .filter(|(_, value)| !value.is_empty())
}

fn find_value<'a>(text: &'a str, keys: &[&str]) -> Option<&'a str> {
    key_values(text)
        .find(|(key, _)| keys.contains(&key.as_str()))
        .map(|(_, value)| value)
}

fn normalize_server(value: &str) -> String {
    value
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_lowercase()
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("empty response")
        .chars()
        .take(120)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const VERISIGN_STYLE: &str = "\
   Domain Name: EXAMPLE.COM
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN
   Registrar WHOIS Server: whois.iana.org
   Updated Date: 2024-08-14T07:01:34Z
   Creation Date: 1995-08-14T04:00:00Z
   Registry Expiry Date: 2025-08-13T04:00:00Z
   Name Server: A.IANA-SERVERS.NET
>>> Last update of whois database: 2024-10-01T12:00:00Z <<<
";

    #[test]
    fn parses_thin_registry_record() {
        let record = parse_response(VERISIGN_STYLE).unwrap();
        assert_eq!(record.domain_name.as_deref(), Some("example.com"));
        assert_eq!(record.creation_date.unwrap().year(), 1995);
        assert_eq!(record.updated_date.unwrap().year(), 2024);
        assert_eq!(record.expiration_date.unwrap().year(), 2025);
    }

    #[test]
    fn repeated_dates_use_the_first_value() {
        let text = "domain: example.ru\ncreated: 2001-02-03\ncreated: 2010-01-01\n";
        let record = parse_response(text).unwrap();
        assert_eq!(record.creation_date.unwrap().year(), 2001);
    }

    #[test]
    fn common_date_layouts_parse() {
        for value in [
            "2019-09-09T15:39:04Z",
            "2019-09-09T15:39:04.000Z",
            "2019-09-09T15:39:04+0000",
            "2019-09-09 15:39:04",
            "2019-09-09 15:39:04 UTC",
            "2019-09-09",
            "09-Sep-2019",
            "2019.09.09",
            "09.09.2019",
            "2019-09-09T15:39:04Z (registrar note)",
        ] {
            let parsed = parse_date("creation", value).unwrap_or_else(|e| panic!("{value}: {e}"));
            assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2019, 9, 9), "{value}");
        }
    }

    #[test]
    fn garbage_date_is_malformed() {
        let err = parse_response("Domain Name: x.com\nCreation Date: before time\n").unwrap_err();
        assert!(matches!(err, WhoisError::MalformedDate { field: "creation", .. }));
    }

    #[test]
    fn no_match_response_is_not_found() {
        let err = parse_response("No match for \"NOPE-NOPE.COM\".\r\n").unwrap_err();
        assert!(matches!(err, WhoisError::NotFound(_)));
    }

    #[test]
    fn comments_are_ignored() {
        let err = parse_response("% Created: 2020-01-01\n# Domain: foo.com\n").unwrap_err();
        assert!(matches!(err, WhoisError::NotFound(_)));
    }

    #[test]
    fn query_domain_strips_subdomains() {
        assert_eq!(query_domain("www.example.com").unwrap(), "example.com");
        assert_eq!(query_domain("a.b.example.co.uk").unwrap(), "example.co.uk");
        assert_eq!(query_domain("login.example.de").unwrap(), "example.de");
        assert_eq!(query_domain("example.com.").unwrap(), "example.com");
    }

    #[test]
    fn query_domain_rejects_hosts_without_registrations() {
        assert!(matches!(query_domain(""), Err(WhoisError::EmptyDomain)));
        assert!(matches!(query_domain("192.168.1.1"), Err(WhoisError::IpLiteral(_))));
        assert!(matches!(query_domain("::1"), Err(WhoisError::IpLiteral(_))));
        assert!(matches!(query_domain("localhost"), Err(WhoisError::NotFound(_))));
    }

    #[test]
    fn referral_server_is_normalized() {
        let server = find_value(VERISIGN_STYLE, &["registrar whois server"]).map(normalize_server);
        assert_eq!(server.as_deref(), Some("whois.iana.org"));
        assert_eq!(normalize_server("http://Whois.Example.net/"), "whois.example.net");
    }

    #[tokio::test]
    async fn disabled_client_never_touches_the_network() {
        let client = WhoisClient::new(WhoisConfig {
            enabled: false,
            ..WhoisConfig::default()
        });
        assert!(matches!(client.lookup("example.com").await, Err(WhoisError::Disabled)));
    }
}
