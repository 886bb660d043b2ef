//! Extraction and validation of links typed or pasted by chat users.

use std::net::Ipv4Addr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use url::{Host, Url};

/// Explicit links; the character before the scheme must not continue a word.
const SCHEME_LINK: &str = r#"(?i)(?:^|[^\w+.\-])(?P<link>https?://[^\s<>"'`]+)"#;

/// Scheme-less links such as `www.example.com` or `docs.rs/tokio`.
const FUZZY_LINK: &str = concat!(
    r"(?:^|[^\w@.\-/:])",
    r"(?P<link>(?P<host>(?:[\w-]+\.)+[\w-]+)",
    r#"(?::\d{1,5})?(?:[/?#][^\s<>"'`]*)?)"#,
);

/// Top-level domains a scheme-less link may end in: common generic ones, punycode and the
/// two-letter country codes.
const FUZZY_TLD: &str = concat!(
    "^(?:biz|com|edu|gov|net|org|pro|web|xxx|aero|asia|coop|info|museum|name|shop|рф",
    "|xn--[a-z0-9-]{1,59}",
    "|a[cdefgilmnoqrstuwxz]|b[abdefghijmnorstvwyz]|c[acdfghiklmnoruvwxyz]|d[ejkmoz]",
    "|e[cegrstu]|f[ijkmor]|g[abdefghilmnpqrstuwy]|h[kmnrtu]|i[delmnoqrst]|j[emop]",
    "|k[eghimnprwyz]|l[abcikrstuvy]|m[acdeghklmnopqrstuvwxyz]|n[acefgilopruz]|om",
    "|p[aefghklmnrstwy]|qa|r[eosuw]|s[abcdeghijklmnortuvxyz]|t[cdfghjklmnortvwz]",
    "|u[agksyz]|v[aceginu]|w[fs]|y[et]|z[amw])$",
);

struct LinkPatterns {
    scheme: Regex,
    fuzzy: Regex,
    fuzzy_tld: Regex,
}

impl LinkPatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            scheme: Regex::new(SCHEME_LINK)?,
            fuzzy: Regex::new(FUZZY_LINK)?,
            fuzzy_tld: Regex::new(FUZZY_TLD)?,
        })
    }
}

fn link_patterns() -> Option<&'static LinkPatterns> {
    static PATTERNS: OnceLock<Option<LinkPatterns>> = OnceLock::new();
    PATTERNS.get_or_init(|| LinkPatterns::compile().ok()).as_ref()
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UrlInputError {
    #[error("URL is required.")]
    Empty,
    #[error("Invalid URL.")]
    Unparseable,
    #[error("Only http/https URLs are allowed.")]
    UnsupportedScheme,
    #[error("Invalid URL hostname.")]
    MissingHost,
    #[error("Enter a full domain like example.com (or an IP/localhost).")]
    IncompleteDomain,
    #[error("Invalid URL host.")]
    NumericHost,
}

/// Finds the first link in free text.
///
/// Explicit `http://` and `https://` links are returned as written; `www.` links and bare
/// domains ending in a known top-level domain are returned with an `http://` prefix. Trailing
/// sentence punctuation and unbalanced closing brackets are stripped.
pub fn extract_first_url(text: &str) -> Option<String> {
    let patterns = link_patterns()?;
    [first_scheme_link(patterns, text), first_fuzzy_link(patterns, text)]
        .into_iter()
        .flatten()
        .min_by_key(|(start, _)| *start)
        .map(|(_, link)| link)
}

fn first_scheme_link(patterns: &LinkPatterns, text: &str) -> Option<(usize, String)> {
    patterns.scheme.captures_iter(text).find_map(|captures| {
        let link = captures.name("link")?;
        let trimmed = trim_trailing_punctuation(link.as_str());
        let (_, rest) = trimmed.split_once("://")?;
        (!rest.is_empty()).then(|| (link.start(), trimmed.to_owned()))
    })
}

fn first_fuzzy_link(patterns: &LinkPatterns, text: &str) -> Option<(usize, String)> {
    patterns.fuzzy.captures_iter(text).find_map(|captures| {
        let link = captures.name("link")?;
        let host = captures.name("host")?.as_str();
        // `name.part@example.com` is an email address
        if text[link.end()..].starts_with('@') {
            return None;
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.iter().any(|label| !is_domain_label(label)) {
            return None;
        }
        let tld = labels.last()?.to_lowercase();
        if !patterns.fuzzy_tld.is_match(&tld) {
            return None;
        }

        let trimmed = trim_trailing_punctuation(link.as_str());
        Some((link.start(), format!("http://{trimmed}")))
    })
}

fn trim_trailing_punctuation(link: &str) -> &str {
    let mut current = link;
    while let Some(last) = current.chars().last() {
        let strip = match last {
            '.' | ',' | '!' | '?' | ';' | ':' | '*' => true,
            ')' => current.matches('(').count() < current.matches(')').count(),
            ']' => current.matches('[').count() < current.matches(']').count(),
            '}' => current.matches('{').count() < current.matches('}').count(),
            _ => false,
        };
        if !strip {
            break;
        }
        current = &current[..current.len() - last.len_utf8()];
    }
    current
}

/// Validates user input as an absolute http/https url, adding `https://` when no scheme is
/// given, and returns its canonical serialization.
pub fn normalize_http_url(input: &str) -> Result<String, UrlInputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlInputError::Empty);
    }

    let with_scheme =
        if has_any_scheme(trimmed) { trimmed.to_owned() } else { format!("https://{trimmed}") };
    let url = Url::parse(&with_scheme).map_err(|_| UrlInputError::Unparseable)?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlInputError::UnsupportedScheme);
    }

    match url.host() {
        None => return Err(UrlInputError::MissingHost),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {}
        Some(Host::Domain(domain)) => {
            if domain.is_empty() {
                return Err(UrlInputError::MissingHost);
            }
            if domain != "localhost" && !domain.contains('.') {
                return Err(UrlInputError::IncompleteDomain);
            }
            if domain.bytes().all(|byte| byte.is_ascii_digit())
                && domain.parse::<Ipv4Addr>().is_err()
            {
                return Err(UrlInputError::NumericHost);
            }
        }
    }

    Ok(url.to_string())
}

/// `scheme://` prefix where the scheme is a letter followed by letters, digits, `+`, `.`, `-`.
fn has_any_scheme(candidate: &str) -> bool {
    let Some((scheme, _)) = candidate.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '.' | '-'))
}

fn is_domain_label(label: &str) -> bool {
    !label.is_empty()
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|ch| ch.is_alphanumeric() || ch == '-')
}

#[cfg(test)]
mod tests {
    use super::{extract_first_url, normalize_http_url, UrlInputError};

    #[test]
    fn extracts_first_explicit_link() {
        assert_eq!(
            extract_first_url("Check this https://example.com please").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            extract_first_url("First https://first.com then https://second.com").as_deref(),
            Some("https://first.com")
        );
        assert_eq!(
            extract_first_url("Link: https://example.com?foo=bar&baz=qux").as_deref(),
            Some("https://example.com?foo=bar&baz=qux")
        );
        assert_eq!(
            extract_first_url("See https://example.com/path/to/page").as_deref(),
            Some("https://example.com/path/to/page")
        );
    }

    #[test]
    fn strips_trailing_punctuation() {
        for text in [
            "Check https://example.com.",
            "Check https://example.com,",
            "(https://example.com)!",
        ] {
            assert_eq!(extract_first_url(text).as_deref(), Some("https://example.com"), "{text}");
        }
        assert_eq!(
            extract_first_url("see https://en.wikipedia.org/wiki/Rust_(language).").as_deref(),
            Some("https://en.wikipedia.org/wiki/Rust_(language)")
        );
    }

    #[test]
    fn recognizes_www_and_bare_domains() {
        assert_eq!(
            extract_first_url("go to www.rust-lang.org now").as_deref(),
            Some("http://www.rust-lang.org")
        );
        assert_eq!(
            extract_first_url("docs.rs/tokio is handy").as_deref(),
            Some("http://docs.rs/tokio")
        );
        assert_eq!(
            extract_first_url("staging at example.co.uk:8443/health.").as_deref(),
            Some("http://example.co.uk:8443/health")
        );
    }

    #[test]
    fn file_names_are_not_mistaken_for_links() {
        assert_eq!(
            extract_first_url("edit notes.txt then open https://example.com/a").as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(extract_first_url("see notes.txt and Cargo.toml"), None);
    }

    #[test]
    fn finds_links_glued_to_labels_or_wrapped_in_markup() {
        assert_eq!(
            extract_first_url("Link:https://example.com").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            extract_first_url("see <https://example.com>").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            extract_first_url("quoted \"https://example.com/q\" here").as_deref(),
            Some("https://example.com/q")
        );
        assert_eq!(extract_first_url("see <example.com>").as_deref(), Some("http://example.com"));
    }

    #[test]
    fn ignores_text_without_links() {
        assert_eq!(extract_first_url(""), None);
        assert_eq!(extract_first_url("No URL here"), None);
        assert_eq!(extract_first_url("mail me at someone@example.com"), None);
        assert_eq!(extract_first_url("write to first.de@example.com"), None);
        assert_eq!(extract_first_url("version 1.2 shipped"), None);
        assert_eq!(extract_first_url("broken https:// link"), None);
    }

    #[test]
    fn normalizes_and_adds_default_scheme() {
        for (input, expected) in [
            ("https://example.com", "https://example.com/"),
            ("http://example.com", "http://example.com/"),
            ("  example.com/path ", "https://example.com/path"),
            ("www.example.com", "https://www.example.com/"),
            ("example.com:8080", "https://example.com:8080/"),
            ("localhost:3000", "https://localhost:3000/"),
            ("192.168.1.1", "https://192.168.1.1/"),
            ("http://[::1]:8080/x", "http://[::1]:8080/x"),
        ] {
            assert_eq!(normalize_http_url(input).as_deref(), Ok(expected), "{input}");
        }
    }

    #[test]
    fn rejects_invalid_input_with_specific_errors() {
        assert_eq!(normalize_http_url("   "), Err(UrlInputError::Empty));
        assert_eq!(normalize_http_url("not a url"), Err(UrlInputError::Unparseable));
        assert_eq!(normalize_http_url("ftp://example.com"), Err(UrlInputError::UnsupportedScheme));
        assert_eq!(normalize_http_url("intranet"), Err(UrlInputError::IncompleteDomain));
    }

    #[test]
    fn error_messages_are_user_facing() {
        assert_eq!(UrlInputError::Empty.to_string(), "URL is required.");
        assert_eq!(
            UrlInputError::IncompleteDomain.to_string(),
            "Enter a full domain like example.com (or an IP/localhost)."
        );
    }
}
