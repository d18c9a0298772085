use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

/// Key markers that identify a generated test payload
pub const TEST_PAYLOAD_MARKERS: &[&str] = &["\"questions\"", "\"testTitle\"", "questions\":"];

static GREEDY_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{.*\}").expect("static regex is valid")
});

/// One way of turning model output into a JSON value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// The whole response is JSON (a JSON string holding JSON is unwrapped)
    Direct,
    /// First balanced `{...}` block that contains one of the markers
    MarkedBlock,
    /// `Direct` after normalizing `\n`, `\r` and `\"` artifacts
    UnescapedDirect,
    /// `MarkedBlock` after normalizing escape artifacts
    UnescapedMarkedBlock,
    /// Everything from the first `{` to the last `}`
    GreedyBlock,
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseStrategy::Direct => "direct",
            ParseStrategy::MarkedBlock => "marked_block",
            ParseStrategy::UnescapedDirect => "unescaped_direct",
            ParseStrategy::UnescapedMarkedBlock => "unescaped_marked_block",
            ParseStrategy::GreedyBlock => "greedy_block",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedJson {
    pub value: Value,
    pub strategy: ParseStrategy,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("no JSON object could be recovered from the response ({attempts} strategies tried)")]
pub struct JsonExtractionError {
    pub attempts: usize,
    pub raw: String,
}

/// Ordered chain of parse attempts over untrusted model output; the first
/// strategy that yields a JSON object wins.
#[derive(Debug, Clone)]
pub struct JsonResponseParser {
    strategies: Vec<ParseStrategy>,
    markers: Vec<String>,
}

impl JsonResponseParser {
    pub fn new(strategies: Vec<ParseStrategy>, markers: &[&str]) -> Self {
        Self {
            strategies,
            markers: markers.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Chain used for generated tests
    pub fn for_test_payload() -> Self {
        Self::new(
            vec![
                ParseStrategy::Direct,
                ParseStrategy::MarkedBlock,
                ParseStrategy::UnescapedDirect,
                ParseStrategy::UnescapedMarkedBlock,
            ],
            TEST_PAYLOAD_MARKERS,
        )
    }

    /// Chain used for grading replies
    pub fn for_grade() -> Self {
        Self::new(vec![ParseStrategy::Direct, ParseStrategy::GreedyBlock], &[])
    }

    pub fn parse(&self, content: &str) -> Result<ParsedJson, JsonExtractionError> {
        for strategy in &self.strategies {
            match self.attempt(*strategy, content) {
                Some(value) => {
                    debug!(strategy = %strategy, "Recovered JSON from model response");
                    return Ok(ParsedJson {
                        value,
                        strategy: *strategy,
                    });
                }
                None => debug!(strategy = %strategy, "Parse strategy did not match"),
            }
        }

        Err(JsonExtractionError {
            attempts: self.strategies.len(),
            raw: content.to_string(),
        })
    }

    fn attempt(&self, strategy: ParseStrategy, content: &str) -> Option<Value> {
        match strategy {
            ParseStrategy::Direct => parse_object(content.trim()),
            ParseStrategy::MarkedBlock => self.marked_block(content),
            ParseStrategy::UnescapedDirect => parse_object(normalize_escapes(content).trim()),
            ParseStrategy::UnescapedMarkedBlock => self.marked_block(&normalize_escapes(content)),
            ParseStrategy::GreedyBlock => GREEDY_OBJECT
                .find(content)
                .and_then(|m| parse_object(m.as_str())),
        }
    }

    fn marked_block(&self, content: &str) -> Option<Value> {
        brace_positions(content)
            .filter_map(|start| balanced_block_at(content, start))
            .find(|block| self.markers.iter().any(|m| block.contains(m.as_str())))
            .and_then(parse_object)
    }
}

/// Parses `text` as a JSON object. A JSON string literal whose content is an
/// object (double-encoded payloads) is unwrapped once.
fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text).ok()? {
        value @ Value::Object(_) => Some(value),
        Value::String(inner) => match serde_json::from_str::<Value>(inner.trim()).ok()? {
            value @ Value::Object(_) => Some(value),
            _ => None,
        },
        _ => None,
    }
}

pub fn normalize_escapes(text: &str) -> String {
    text.replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\\"", "\"")
}

/// Balanced `{...}` candidates in order of their opening brace, one for
/// every `{` that is eventually closed. Braces inside JSON string literals do
/// not count towards nesting. An unmatched `{` in surrounding prose only
/// loses its own candidate.
pub fn balanced_blocks(text: &str) -> Vec<&str> {
    brace_positions(text)
        .filter_map(|start| balanced_block_at(text, start))
        .collect()
}

fn brace_positions(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.char_indices().filter(|(_, ch)| *ch == '{').map(|(idx, _)| idx)
}

/// The balanced block opening at byte `start`, which must hold a `{`
fn balanced_block_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_parse_wins_first() {
        let parsed = JsonResponseParser::for_test_payload()
            .parse(r#"{"questions": []}"#)
            .unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::Direct);
    }

    #[test]
    fn test_prose_around_payload_is_ignored() {
        let text = r#"Here is your test: {"questions":[{"question":"Q?","options":["a","b"],"correct":0}]} Thanks!"#;
        let parsed = JsonResponseParser::for_test_payload().parse(text).unwrap();

        assert_eq!(parsed.strategy, ParseStrategy::MarkedBlock);
        assert_eq!(parsed.value["questions"][0]["question"], "Q?");
    }

    #[test]
    fn test_unmarked_blocks_are_skipped() {
        let text = r#"Note {"hint": "x"} and then {"testTitle": "T", "questions": []}"#;
        let parsed = JsonResponseParser::for_test_payload().parse(text).unwrap();
        assert_eq!(parsed.value["testTitle"], "T");
    }

    #[test]
    fn test_fenced_payload() {
        let text = "```json\n{\"questions\": [], \"testTitle\": \"Вазов\"}\n```";
        let parsed = JsonResponseParser::for_test_payload().parse(text).unwrap();
        assert_eq!(parsed.value["testTitle"], "Вазов");
    }

    #[test]
    fn test_braces_inside_strings_do_not_break_blocks() {
        let text = r#"ok {"questions": [{"question": "Какво е {това}?"}]} end"#;
        let blocks = balanced_blocks(text);
        assert_eq!(blocks[0], r#"{"questions": [{"question": "Какво е {това}?"}]}"#);

        let parsed = JsonResponseParser::for_test_payload().parse(text).unwrap();
        assert_eq!(parsed.value["questions"][0]["question"], "Какво е {това}?");
    }

    #[test]
    fn test_unmatched_brace_in_prose_does_not_hide_payload() {
        let text = r#"Ето теста (формат {JSON): {"questions":[{"question":"Q?","options":["a","b","c","d"],"correct":0}]} Край"#;

        let blocks = balanced_blocks(text);
        assert!(blocks[0].starts_with(r#"{"questions""#));

        let parsed = JsonResponseParser::for_test_payload().parse(text).unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::MarkedBlock);
        assert_eq!(parsed.value["questions"][0]["options"][3], "d");
    }

    #[test]
    fn test_escaped_payload_is_normalized() {
        let text = r#"Result: {\"questions\": [], \"testTitle\": \"Ботев\"}"#;
        let parsed = JsonResponseParser::for_test_payload().parse(text).unwrap();

        assert_eq!(parsed.strategy, ParseStrategy::UnescapedMarkedBlock);
        assert_eq!(parsed.value["testTitle"], "Ботев");
    }

    #[test]
    fn test_double_encoded_payload_is_unwrapped() {
        let inner = r#"{"questions": []}"#;
        let text = serde_json::to_string(inner).unwrap();
        let parsed = JsonResponseParser::for_test_payload().parse(&text).unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::Direct);
        assert!(parsed.value["questions"].is_array());
    }

    #[test]
    fn test_unrecoverable_text_reports_raw() {
        let err = JsonResponseParser::for_test_payload()
            .parse("Съжалявам, не мога да генерирам тест.")
            .unwrap_err();
        assert_eq!(err.attempts, 4);
        assert!(err.raw.starts_with("Съжалявам"));
    }

    #[test]
    fn test_grade_chain_uses_greedy_block() {
        let text = "Оценка:\n{\"grade\": \"5.00\", \"comment\": \"Браво\"}\nКрай";
        let parsed = JsonResponseParser::for_grade().parse(text).unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::GreedyBlock);
        assert_eq!(parsed.value["comment"], "Браво");
    }
}
