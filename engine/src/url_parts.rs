//! Lenient URL decomposition.
//!
//! Unlike `url::Url`, this never rejects input and never normalizes it: the
//! feature extractor needs the components exactly as they appear in the raw
//! string, including for things like `http://` with no host.

/// Schemes whose last path segment may carry `;params`.
const PARAM_SCHEMES: &[&str] = &[
    "", "ftp", "hdl", "prospero", "http", "imap", "https", "shttp", "rtsp", "rtspu", "sip",
    "sips", "mms", "sftp", "tel",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub netloc: String,
    /// Lowercased host without userinfo, port or IPv6 brackets.
    pub hostname: String,
    /// `None` when absent, empty, non-numeric or out of range.
    pub port: Option<u16>,
    pub path: String,
}

impl UrlParts {
    pub fn split(raw: &str) -> Self {
        let (scheme, rest) = split_scheme(raw);

        let (netloc, rest) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find(['/', '?', '#']).unwrap_or(after.len());
                (&after[..end], &after[end..])
            }
            None => ("", rest),
        };

        let rest = rest.split('#').next().unwrap_or_default();
        let mut path = rest.split('?').next().unwrap_or_default();

        if PARAM_SCHEMES.contains(&scheme.as_str()) {
            let last_segment = path.rfind('/').unwrap_or(0);
            if let Some(offset) = path[last_segment..].find(';') {
                path = &path[..last_segment + offset];
            }
        }

        let (hostname, port) = split_host_port(netloc);

        Self {
            scheme,
            netloc: netloc.to_string(),
            hostname,
            port,
            path: path.to_string(),
        }
    }
}

fn split_scheme(raw: &str) -> (String, &str) {
    if let Some(colon) = raw.find(':') {
        let candidate = &raw[..colon];
        let mut chars = candidate.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if valid {
            return (candidate.to_ascii_lowercase(), &raw[colon + 1..]);
        }
    }
    (String::new(), raw)
}

fn split_host_port(netloc: &str) -> (String, Option<u16>) {
    let hostinfo = netloc.rsplit_once('@').map_or(netloc, |(_, host)| host);

    let (host, port) = match hostinfo.split_once('[') {
        Some((_, bracketed)) => match bracketed.split_once(']') {
            Some((host, after)) => (host, after.split_once(':').map_or("", |(_, p)| p)),
            // Unbalanced bracket: no usable host.
            None => ("", ""),
        },
        None => hostinfo.split_once(':').unwrap_or((hostinfo, "")),
    };

    let port = if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
        port.parse::<u16>().ok()
    } else {
        None
    };

    (host.to_lowercase(), port)
}

/// Classic `inet_aton` acceptance: one to four dot-separated numbers in
/// decimal, octal (leading `0`) or hex (`0x`), the last one filling the
/// remaining bytes. `"127.1"` and `"0x7f000001"` are both valid.
pub fn parse_ipv4_literal(host: &str) -> Option<u32> {
    if host.is_empty() {
        return None;
    }
    let parts = host
        .split('.')
        .map(parse_c_number)
        .collect::<Option<Vec<u64>>>()?;
    if parts.len() > 4 {
        return None;
    }

    let (last, leading) = parts.split_last()?;
    if leading.iter().any(|&part| part > 0xff) {
        return None;
    }
    let last_bits = 32 - 8 * leading.len() as u32;
    if *last >= 1u64 << last_bits {
        return None;
    }

    let prefix = leading
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &part)| acc | part << (24 - 8 * i as u32));
    u32::try_from(prefix | last).ok()
}

fn parse_c_number(text: &str) -> Option<u64> {
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    if digits.is_empty() && radix != 16 {
        return None;
    }
    if digits.is_empty() {
        // "0x" alone reads as zero.
        return Some(0);
    }
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok().filter(|v| *v <= u64::from(u32::MAX))
}
