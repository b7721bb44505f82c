//! Best-effort repair of unescaped quotes inside JSON string values.
//!
//! Model output regularly embeds raw quotation marks in string values.
//! The walk below tracks string state character by character and escapes any
//! quote that is not, after optional spaces, followed by a JSON structural
//! character (`:`, `,`, `}`, `]`) — those are the only quotes that may
//! legitimately close a string. There is no formal grammar behind this;
//! pathological quoting can still defeat it, in which case the block is
//! discarded like any other parse failure.

/// Escape quotes that appear inside string values. Idempotent on valid JSON.
pub fn repair_quotes(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut result = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escaped {
            result.push(ch);
            escaped = false;
            continue;
        }
        if ch == '\\' {
            result.push(ch);
            escaped = true;
            continue;
        }
        if ch != '"' {
            result.push(ch);
            continue;
        }
        if !in_string {
            in_string = true;
            result.push(ch);
            continue;
        }
        let mut j = i + 1;
        while j < chars.len() && chars[j] == ' ' {
            j += 1;
        }
        match chars.get(j) {
            Some(':') | Some(',') | Some('}') | Some(']') | None => {
                in_string = false;
                result.push(ch);
            }
            Some(_) => result.push_str("\\\""),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_json_passes_through_unchanged() {
        let cases = [
            r#"{"name":"edit","args":{"old":"a","new":"b"}}"#,
            r#"{"nested":{"list":["x","y"],"n":3}}"#,
            r#"{"pre_escaped":"say \"hi\""}"#,
            r#"["a", "b"]"#,
        ];
        for case in cases {
            assert_eq!(repair_quotes(case), case);
            // Idempotence: a second pass is also a no-op.
            assert_eq!(repair_quotes(&repair_quotes(case)), case);
        }
    }

    #[test]
    fn inner_quotes_are_escaped() {
        let raw = r#"{"msg":"he said "stop" twice"}"#;
        let repaired = repair_quotes(raw);
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["msg"], r#"he said "stop" twice"#);
    }

    #[test]
    fn quote_before_spaces_then_structural_closes_the_string() {
        let raw = r#"{"a":"x" , "b":"y"}"#;
        assert_eq!(repair_quotes(raw), raw);
    }

    #[test]
    fn already_escaped_quotes_are_left_alone() {
        let raw = r#"{"a":"\"quoted\""}"#;
        assert_eq!(repair_quotes(raw), raw);
    }
}
