//! Column layout of the URL feature vector.
//!
//! Model artifacts are trained against this exact order. Any insertion,
//! removal or reordering requires a new `SCHEMA_VERSION` and a retrained model.

pub const SCHEMA_VERSION: &str = "url-lexical-v1";

pub const FEATURE_NAMES: [&str; 61] = [
    // lengths
    "url_length",
    "hostname_length",
    "ip_literal",
    // symbol counts
    "count_dot",
    "count_hyphen",
    "count_at",
    "count_question",
    "count_ampersand",
    "count_equals",
    "count_underscore",
    "count_tilde",
    "count_percent",
    "count_slash",
    "count_star",
    "count_colon",
    "count_comma",
    "count_semicolon",
    "count_dollar",
    "count_space",
    "count_www",
    "count_dot_com",
    "count_double_slash",
    // positional flags
    "http_in_path",
    "https_after_scheme",
    // digit ratios
    "url_digit_ratio",
    "host_digit_ratio",
    // structural flags
    "punycode",
    "explicit_port",
    "path_extension",
    "host_label_extension",
    "deep_subdomain",
    "host_label_count",
    "hyphen_in_host",
    "generated_dot_com",
    "shortener",
    "dot_in_path",
    "extra_double_slash",
    "double_slash_after_authority",
    // token statistics
    "url_token_count",
    "repeated_char_run",
    "url_token_min",
    "host_token_min",
    "path_token_min",
    "url_token_max",
    "host_token_max",
    "path_token_max",
    "url_token_mean",
    "host_token_mean",
    "path_token_mean",
    // keywords
    "phish_hint_count",
    "domain_in_host",
    "brand_in_host",
    "brand_in_path",
    "tk_suffix",
    // registration
    "whois_domain_present",
    "registration_length_days",
    "domain_age_days",
    // unmeasured placeholders
    "web_traffic",
    "dns_record",
    "google_index",
    "page_rank",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

pub fn index_of(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

/// How a vector was adjusted to fit a model's input width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthFit {
    Exact,
    Padded { from: usize, to: usize },
    Truncated { from: usize, to: usize },
}

/// Pads `values` with trailing zeros, or drops trailing entries, until it is
/// exactly `width` long.
pub fn fit_to_width(values: &mut Vec<f64>, width: usize) -> WidthFit {
    let from = values.len();
    if from < width {
        values.resize(width, 0.0);
        WidthFit::Padded { from, to: width }
    } else if from > width {
        values.truncate(width);
        WidthFit::Truncated { from, to: width }
    } else {
        WidthFit::Exact
    }
}

/// First position where an artifact's column order disagrees with ours.
pub fn first_order_mismatch(order: &[String]) -> Option<(usize, Option<&str>, Option<&str>)> {
    let longest = order.len().max(FEATURE_COUNT);
    (0..longest).find_map(|i| {
        let theirs = order.get(i).map(String::as_str);
        let ours = FEATURE_NAMES.get(i).copied();
        (theirs != ours).then_some((i, ours, theirs))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let unique: HashSet<_> = FEATURE_NAMES.iter().collect();
        assert_eq!(unique.len(), FEATURE_COUNT);
    }

    #[test]
    fn group_boundaries_sit_where_models_expect_them() {
        assert_eq!(index_of("url_length"), Some(0));
        assert_eq!(index_of("count_double_slash"), Some(21));
        assert_eq!(index_of("url_token_count"), Some(38));
        assert_eq!(index_of("whois_domain_present"), Some(54));
        assert_eq!(index_of("page_rank"), Some(FEATURE_COUNT - 1));
        assert_eq!(index_of("no_such_feature"), None);
    }

    #[test]
    fn short_vector_is_padded_with_zeros() {
        let mut values = vec![1.0; 9];
        let fit = fit_to_width(&mut values, 12);
        assert_eq!(fit, WidthFit::Padded { from: 9, to: 12 });
        assert_eq!(values.len(), 12);
        assert_eq!(&values[9..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn long_vector_is_truncated() {
        let mut values: Vec<f64> = (0..5).map(f64::from).collect();
        let fit = fit_to_width(&mut values, 3);
        assert_eq!(fit, WidthFit::Truncated { from: 5, to: 3 });
        assert_eq!(values, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn matching_order_has_no_mismatch() {
        let order: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        assert_eq!(first_order_mismatch(&order), None);
    }

    #[test]
    fn swapped_columns_are_reported() {
        let mut order: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        order.swap(3, 4);
        assert_eq!(
            first_order_mismatch(&order),
            Some((3, Some("count_dot"), Some("count_hyphen")))
        );
    }

    #[test]
    fn shorter_order_reports_first_missing_column() {
        let order: Vec<String> = FEATURE_NAMES[..10].iter().map(|s| s.to_string()).collect();
        assert_eq!(first_order_mismatch(&order), Some((10, Some(FEATURE_NAMES[10]), None)));
    }
}
