use serde_json::Value;

use crate::backend::BackendResult;

/// Extraction rules for the backend's reply text, in precedence order. The
/// backend's response envelope is not contractually fixed, so each rule
/// targets one known shape and the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractRule {
    /// `{"output": "..."}`
    TopLevelOutput,
    /// `[{"output": "..."}]` or `[{"json": {"output": "..."}}]`
    FirstElementOutput,
    /// `{"data": {"output": "..."}}`
    NestedDataOutput,
    /// Fall back to the raw body text, trimmed.
    RawText,
}

const RULES: [ExtractRule; 4] = [
    ExtractRule::TopLevelOutput,
    ExtractRule::FirstElementOutput,
    ExtractRule::NestedDataOutput,
    ExtractRule::RawText,
];

impl ExtractRule {
    fn apply(self, parsed: Option<&Value>, raw: &str) -> Option<String> {
        match self {
            ExtractRule::TopLevelOutput => non_empty_str(parsed?.get("output")?),
            ExtractRule::FirstElementOutput => {
                let first = parsed?.as_array()?.first()?;
                non_empty_str(first.get("output").unwrap_or(&Value::Null))
                    .or_else(|| non_empty_str(first.get("json")?.get("output")?))
            }
            ExtractRule::NestedDataOutput => non_empty_str(parsed?.get("data")?.get("output")?),
            ExtractRule::RawText => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        }
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Some(s.to_string()),
        _ => None,
    }
}

/// Extract the reply text from a successful backend result. `None` means the
/// backend produced nothing to show, which is a valid terminal outcome.
pub fn normalize(result: &BackendResult) -> Option<String> {
    let BackendResult::Success { parsed, raw, .. } = result else {
        return None;
    };

    RULES
        .iter()
        .find_map(|rule| rule.apply(parsed.as_ref(), raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(body: &str) -> BackendResult {
        BackendResult::Success {
            status: 200,
            parsed: serde_json::from_str(body).ok(),
            raw: body.to_string(),
        }
    }

    #[test]
    fn test_top_level_output() {
        assert_eq!(normalize(&success(r#"{"output":"a"}"#)).as_deref(), Some("a"));
    }

    #[test]
    fn test_first_element_output() {
        assert_eq!(
            normalize(&success(r#"[{"output":"b"}]"#)).as_deref(),
            Some("b")
        );
    }

    #[test]
    fn test_first_element_nested_json_output() {
        assert_eq!(
            normalize(&success(r#"[{"json":{"output":"c"}}]"#)).as_deref(),
            Some("c")
        );
    }

    #[test]
    fn test_nested_data_output() {
        assert_eq!(
            normalize(&success(r#"{"data":{"output":"d"}}"#)).as_deref(),
            Some("d")
        );
    }

    #[test]
    fn test_unparseable_body_falls_back_to_raw_text() {
        assert_eq!(normalize(&success("e")).as_deref(), Some("e"));
    }

    #[test]
    fn test_empty_object_and_empty_raw_is_none() {
        let result = BackendResult::Success {
            status: 200,
            parsed: serde_json::from_str("{}").ok(),
            raw: String::new(),
        };
        assert_eq!(normalize(&result), None);
    }

    #[test]
    fn test_precedence_prefers_top_level_output() {
        let body = r#"{"output":"first","data":{"output":"second"}}"#;
        assert_eq!(normalize(&success(body)).as_deref(), Some("first"));
    }

    #[test]
    fn test_empty_output_field_falls_through_to_raw() {
        let body = r#"{"output":""}"#;
        // The empty field does not match; the raw body text does.
        assert_eq!(normalize(&success(body)).as_deref(), Some(body));
    }

    #[test]
    fn test_failure_is_never_normalized() {
        let result = BackendResult::Failure(crate::backend::BackendFailure::Timeout);
        assert_eq!(normalize(&result), None);
    }
}
