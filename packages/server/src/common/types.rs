// Common request types shared across domains
//
// Webhook callers (Zapier, Monday.com) are loose about JSON types, so these
// accept the shapes they actually send.

use serde::Deserialize;
use thiserror::Error;

/// A request that failed validation; surfaces as HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvalidRequest(pub String);

impl InvalidRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// `tags`: either `"a, b,c"` or `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    Csv(String),
    List(Vec<String>),
}

impl TagsInput {
    pub fn into_tags(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            TagsInput::Csv(csv) => csv.split(',').map(str::to_string).collect(),
            TagsInput::List(list) => list,
        };
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// `post_id`: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PostIdInput {
    Number(u64),
    Text(String),
}

impl PostIdInput {
    /// `Ok(None)` for blank or zero, which callers send for "no post".
    pub fn resolve(&self) -> Result<Option<u64>, InvalidRequest> {
        let id = match self {
            PostIdInput::Number(n) => *n,
            PostIdInput::Text(s) if s.trim().is_empty() => return Ok(None),
            PostIdInput::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| InvalidRequest::new(format!("post_id must be numeric, got {s:?}")))?,
        };
        Ok((id != 0).then_some(id))
    }
}

/// `Some(trimmed)` unless missing or blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_from_csv_and_list() {
        let csv: TagsInput = serde_json::from_str(r#"" cnc, milling ,,lathe ""#).unwrap();
        assert_eq!(csv.into_tags(), vec!["cnc", "milling", "lathe"]);

        let list: TagsInput = serde_json::from_str(r#"["cnc", " ", "5-axis"]"#).unwrap();
        assert_eq!(list.into_tags(), vec!["cnc", "5-axis"]);
    }

    #[test]
    fn test_post_id_number_or_string() {
        let n: PostIdInput = serde_json::from_str("42").unwrap();
        assert_eq!(n.resolve().unwrap(), Some(42));

        let s: PostIdInput = serde_json::from_str(r#"" 42 ""#).unwrap();
        assert_eq!(s.resolve().unwrap(), Some(42));

        let blank: PostIdInput = serde_json::from_str(r#""""#).unwrap();
        assert_eq!(blank.resolve().unwrap(), None);

        let bad: PostIdInput = serde_json::from_str(r#""abc""#).unwrap();
        assert!(bad.resolve().is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ".into())), Some("x".to_string()));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }
}
