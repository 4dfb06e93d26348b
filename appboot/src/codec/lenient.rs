//! Near-conforming JSON normalization.
//!
//! Removes `//` line comments, `/* */` block comments and trailing commas
//! before `}` or `]`. String literals are left untouched.

use std::borrow::Cow;

/// Normalize `input` into strict JSON text.
///
/// Returns the input unchanged (borrowed) when there is nothing to strip.
pub fn normalize(input: &str) -> Cow<'_, str> {
    if !input.contains("//") && !input.contains("/*") && !input.contains(',') {
        return Cow::Borrowed(input);
    }
    let without_comments = strip_comments(input);
    let normalized = strip_trailing_commas(&without_comments);
    if normalized == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(normalized)
    }
}

fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conforming_input_is_borrowed() {
        let input = r#"{"a":1,"b":[1,2]}"#;
        assert!(matches!(normalize(input), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strips_line_and_block_comments() {
        let input = "{\"a\": 1, // one\n/* two */ \"b\": 2}";
        let value: serde_json::Value = serde_json::from_str(&normalize(input)).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], 2);
    }

    #[test]
    fn test_strips_trailing_commas() {
        let normalized = normalize("{\"a\": [1, 2, ], }");
        let value: serde_json::Value = serde_json::from_str(&normalized).unwrap();
        assert_eq!(value["a"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_string_contents_are_preserved() {
        let input = r#"{"url": "http://host/a,}", "note": "/* not a comment */"}"#;
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let input = r#"{"q": "say \"hi\", // still string", }"#;
        let value: serde_json::Value = serde_json::from_str(&normalize(input)).unwrap();
        assert_eq!(value["q"], r#"say "hi", // still string"#);
    }
}
