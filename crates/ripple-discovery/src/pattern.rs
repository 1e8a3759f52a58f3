//! Search patterns for endpoints and schema entities

use regex::Regex;
use ripple_domain::ApiChangeItem;

use crate::error::Result;

/// Regex fragment standing in for a path template parameter
const PARAM_SEGMENT: &str = r#"[^/\s"'`?#]+"#;

/// Longest snippet kept around a matching line
const MAX_SNIPPET_CHARS: usize = 240;

/// A compiled search for one endpoint or entity
#[derive(Debug, Clone)]
pub struct SearchPattern {
    /// Grouping key: `METHOD /path` for endpoints, the name for entities
    target: String,
    /// Literal term handed to hosted code search
    query: String,
    regex: Regex,
}

impl SearchPattern {
    /// Match references to an endpoint path.
    ///
    /// Literal segments are escaped, `{param}` and `:param` segments match
    /// any non-separator run, and the leading slash is optional.
    pub fn for_endpoint(method: &str, path: &str) -> Result<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let body = if segments.is_empty() {
            r#"["'`]/["'`]"#.to_string()
        } else {
            let joined = segments
                .iter()
                .map(|s| segment_regex(s))
                .collect::<Vec<_>>()
                .join("/");
            format!(r"(?:^|[^\w-])/?{}(?:[^\w\-/]|$)", joined)
        };

        Ok(Self {
            target: format!("{} {}", method.to_ascii_uppercase(), path),
            query: literal_query(&segments, path),
            regex: Regex::new(&body)?,
        })
    }

    pub fn for_api_change(item: &ApiChangeItem) -> Result<Self> {
        Self::for_endpoint(&item.method, &item.endpoint)
    }

    /// Match a table or collection name as a whole word, ignoring case
    pub fn for_entity(name: &str) -> Result<Self> {
        Ok(Self {
            target: name.to_string(),
            query: name.to_string(),
            regex: Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name)))?,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// 1-based line numbers and trimmed snippets of every matching line
    pub fn matching_lines<'a>(&'a self, content: &'a str) -> impl Iterator<Item = (u32, String)> + 'a {
        content
            .lines()
            .enumerate()
            .filter(move |(_, line)| self.is_match(line))
            .map(|(index, line)| (index as u32 + 1, snippet(line)))
    }
}

fn is_named_param(segment: &str) -> bool {
    segment.len() > 1 && (segment.starts_with(':') || (segment.starts_with('<') && segment.ends_with('>')))
}

fn segment_regex(segment: &str) -> String {
    if is_named_param(segment) {
        return PARAM_SEGMENT.to_string();
    }

    let mut out = String::new();
    let mut rest = segment;
    while let Some(start) = rest.find('{') {
        match rest[start..].find('}') {
            Some(len) => {
                out.push_str(&regex::escape(&rest[..start]));
                out.push_str(PARAM_SEGMENT);
                rest = &rest[start + len + 1..];
            }
            None => break,
        }
    }
    out.push_str(&regex::escape(rest));
    out
}

fn is_template(segment: &str) -> bool {
    is_named_param(segment) || segment.contains('{')
}

/// Longest literal prefix of the path, falling back to its last literal segment
fn literal_query(segments: &[&str], path: &str) -> String {
    let prefix: Vec<&str> = segments.iter().take_while(|s| !is_template(s)).copied().collect();
    if !prefix.is_empty() {
        return format!("/{}", prefix.join("/"));
    }
    segments
        .iter()
        .rev()
        .find(|s| !is_template(s))
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.to_string())
}

fn snippet(line: &str) -> String {
    line.trim().chars().take(MAX_SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_endpoint_matches_with_or_without_slash() {
        let pattern = SearchPattern::for_endpoint("post", "/api/stocks/buy").unwrap();
        assert_eq!(pattern.target(), "POST /api/stocks/buy");
        assert!(pattern.is_match(r#"await axios.post("/api/stocks/buy", order)"#));
        assert!(pattern.is_match("fetch(`${BASE}/api/stocks/buy`)"));
        assert!(pattern.is_match("url = 'api/stocks/buy'"));
        assert!(pattern.is_match("/api/stocks/buy?dryRun=1"));
    }

    #[test]
    fn test_literal_endpoint_rejects_longer_paths() {
        let pattern = SearchPattern::for_endpoint("POST", "/api/stocks/buy").unwrap();
        assert!(!pattern.is_match(r#"post("/api/stocks/buyback")"#));
        assert!(!pattern.is_match(r#"post("/api/stocks/buy/limit")"#));
        assert!(!pattern.is_match(r#"post("/v2api/stocks/buy")"#));
    }

    #[test]
    fn test_template_segments_match_any_value() {
        let pattern = SearchPattern::for_endpoint("GET", "/api/stocks/{id}").unwrap();
        assert!(pattern.is_match(r#"get(`/api/stocks/${stock.id}`)"#));
        assert!(pattern.is_match(r#"get("/api/stocks/42")"#));
        assert!(!pattern.is_match(r#"get("/api/stocks/")"#));
        assert_eq!(pattern.query(), "/api/stocks");

        let express = SearchPattern::for_endpoint("GET", "/users/:userId/orders").unwrap();
        assert!(express.is_match(r#"get("/users/7/orders")"#));
    }

    #[test]
    fn test_regex_metacharacters_are_escaped() {
        let pattern = SearchPattern::for_endpoint("GET", "/api/v1.0/items").unwrap();
        assert!(pattern.is_match(r#""/api/v1.0/items""#));
        assert!(!pattern.is_match(r#""/api/v1x0/items""#));
    }

    #[test]
    fn test_entity_pattern_is_case_insensitive_word() {
        let pattern = SearchPattern::for_entity("accounts").unwrap();
        assert!(pattern.is_match("SELECT * FROM Accounts WHERE id = $1"));
        assert!(!pattern.is_match("SELECT * FROM accounts_archive"));
    }

    #[test]
    fn test_matching_lines_are_one_based() {
        let pattern = SearchPattern::for_entity("orders").unwrap();
        let content = "import x\n  db.orders.find()\nnothing\nORDERS\n";
        let lines: Vec<(u32, String)> = pattern.matching_lines(content).collect();
        assert_eq!(
            lines,
            vec![(2, "db.orders.find()".to_string()), (4, "ORDERS".to_string())]
        );
    }

    #[test]
    fn test_query_falls_back_when_path_starts_with_template() {
        let pattern = SearchPattern::for_endpoint("GET", "/{tenant}/reports").unwrap();
        assert_eq!(pattern.query(), "reports");
    }
}
