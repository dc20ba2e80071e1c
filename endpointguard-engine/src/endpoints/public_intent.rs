//! `public-intent` directive parsing (spec §4.4): a first single-line
//! comment declaring an endpoint is intentionally unauthenticated.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{MalformedPublicIntent, PublicIntent};

static DIRECTIVE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*//.*:public-intent(?:\s+reason\s*=\s*(["'])(.*?)\1)?"#).expect("static public-intent pattern"));

pub enum DirectiveResult {
    None,
    Valid(PublicIntent),
    Malformed(MalformedPublicIntent),
}

/// The first line matching the directive tag wins; an empty or missing
/// reason makes it malformed rather than absent.
pub fn parse_public_intent(text: &str) -> DirectiveResult {
    for (idx, line) in text.lines().enumerate() {
        if let Some(caps) = DIRECTIVE_LINE.captures(line) {
            let line_no = idx as u32 + 1;
            match caps.get(2).map(|m| m.as_str().trim()) {
                Some(reason) if !reason.is_empty() => {
                    return DirectiveResult::Valid(PublicIntent {
                        reason: reason.to_string(),
                        line: line_no,
                    });
                }
                _ => {
                    return DirectiveResult::Malformed(MalformedPublicIntent {
                        line: line_no,
                        raw_text: line.trim().to_string(),
                    });
                }
            }
        }
    }
    DirectiveResult::None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_directive() {
        let text = r#"// <tag>:public-intent reason="health aggregator""#;
        match parse_public_intent(text) {
            DirectiveResult::Valid(intent) => assert_eq!(intent.reason, "health aggregator"),
            _ => panic!("expected valid directive"),
        }
    }

    #[test]
    fn missing_reason_is_malformed() {
        let text = "// <tag>:public-intent";
        assert!(matches!(parse_public_intent(text), DirectiveResult::Malformed(_)));
    }

    #[test]
    fn empty_reason_is_malformed() {
        let text = r#"// <tag>:public-intent reason="""#;
        assert!(matches!(parse_public_intent(text), DirectiveResult::Malformed(_)));
    }

    #[test]
    fn absent_directive_is_none() {
        assert!(matches!(parse_public_intent("export async function GET() {}"), DirectiveResult::None));
    }
}
