use std::sync::LazyLock;

use regex::Regex;

use crate::models::ParsedFields;

const SLOW_REQUEST_MS: i64 = 2000;
const FAIL_STATUS_FROM: i64 = 400;

// ASCII digits only, `\d` would also accept other Unicode decimal digits.
const OCTET: &str = r"(?:25[0-5]|2[0-4][0-9]|[0-1][0-9]{2}|[1-9]?[0-9])";

static IPV4: LazyLock<TokenPattern> =
    LazyLock::new(|| TokenPattern::new(&format!(r"{OCTET}\.{OCTET}\.{OCTET}\.{OCTET}")));
static HOSTNAME: LazyLock<TokenPattern> =
    LazyLock::new(|| TokenPattern::new(r"(?:[a-z0-9]+(?:-[a-z0-9]+)*\.)+[a-z]{2,}"));
static METHOD: LazyLock<TokenPattern> = LazyLock::new(|| {
    TokenPattern::new(r"GET|HEAD|POST|PUT|DELETE|TRACE|OPTIONS|CONNECT")
});
static BARE_NUMBER: LazyLock<TokenPattern> = LazyLock::new(|| TokenPattern::new(r"[0-9]+"));
// The path may run past whitespace, only the first token of the match is kept.
static PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+/[^?#]*").expect("valid path pattern"));

/// Matches whole tokens that have whitespace on both sides.
///
/// The first and last token of a trimmed line never qualify. Tokens are
/// disjoint, so matches never overlap and come out left to right.
struct TokenPattern(Regex);

impl TokenPattern {
    fn new(token: &str) -> Self {
        Self(Regex::new(&format!("^(?:{token})$")).expect("valid token pattern"))
    }

    fn find_iter<'a>(&'a self, line: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let mut tokens = line.split_whitespace().peekable();
        // skip the leading token, it has no whitespace before it
        tokens.next();
        std::iter::from_fn(move || {
            let token = tokens.next()?;
            tokens.peek()?;
            Some(token)
        })
        .filter(|token| self.0.is_match(token))
    }

    fn find<'a>(&'a self, line: &'a str) -> Option<&'a str> {
        self.find_iter(line).next()
    }
}

/// Extracts [`ParsedFields`] from unstructured access-log lines.
///
/// Stateless; the compiled patterns are shared process-wide.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineParser;

impl LineParser {
    /// Returns `None` for a blank line, otherwise a fully populated record.
    pub fn parse(&self, line: &str) -> Option<ParsedFields> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (client_ip, host_ip) = ip_pair(line);
        let (status_code, upstream_time) = status_and_upstream(line);
        let fail_status = i64::from(status_code >= FAIL_STATUS_FROM);

        Some(ParsedFields {
            client_ip,
            host_ip,
            hostname: HOSTNAME.find(line).unwrap_or_default().to_string(),
            method: METHOD.find(line).unwrap_or_default().to_string(),
            status_code,
            upstream_time,
            success_status: 1 - fail_status,
            fail_status,
            slow_request: i64::from(upstream_time > SLOW_REQUEST_MS),
            path: request_path(line),
        })
    }
}

fn ip_pair(line: &str) -> (String, String) {
    let mut hosts = IPV4.find_iter(line);
    match (hosts.next(), hosts.next()) {
        (Some(client), Some(host)) => (client.to_string(), host.to_string()),
        _ => Default::default(),
    }
}

/// With two or more bare numbers the first is the upstream time and the
/// second the status code. A lone number is the status code.
fn status_and_upstream(line: &str) -> (i64, i64) {
    let numbers: Vec<&str> = BARE_NUMBER.find_iter(line).take(3).collect();
    match numbers.as_slice() {
        [] => (0, 0),
        [status] => (to_int(status), 0),
        [upstream, status, ..] => (to_int(status), to_int(upstream)),
    }
}

fn to_int(digits: &str) -> i64 {
    digits.parse().unwrap_or_default()
}

fn request_path(line: &str) -> String {
    PATH.find(line)
        .and_then(|m| m.as_str().split_whitespace().next())
        .unwrap_or_default()
        .to_string()
}
