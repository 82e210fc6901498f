//! Recovering a JSON value from free-text model output.
//!
//! Models are asked for bare JSON but routinely wrap it in prose or code
//! fences. Each strategy below is a pure attempt; the first one that yields a
//! parsed value wins.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

type Strategy = fn(&str) -> Option<Value>;

const STRATEGIES: [Strategy; 4] = [json_fence, any_fence, brace_span, whole_text];

lazy_static! {
    static ref JSON_FENCE_RE: Regex = Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap();
    static ref ANY_FENCE_RE: Regex = Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap();
}

/// Returns the first value any strategy manages to parse, or `None`.
pub fn extract_json(text: &str) -> Option<Value> {
    STRATEGIES.iter().find_map(|strategy| strategy(text))
}

/// Like [`extract_json`] but only accepts a non-empty JSON object.
pub fn extract_object(text: &str) -> Option<Map<String, Value>> {
    match extract_json(text)? {
        Value::Object(map) if !map.is_empty() => Some(map),
        _ => None,
    }
}

fn json_fence(text: &str) -> Option<Value> {
    parse_capture(&JSON_FENCE_RE, text)
}

fn any_fence(text: &str) -> Option<Value> {
    parse_capture(&ANY_FENCE_RE, text)
}

// Known limitation: several independent objects in one reply produce a span
// covering all of them, which then fails to parse.
fn brace_span(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn whole_text(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

fn parse_capture(re: &Regex, text: &str) -> Option<Value> {
    let body = re.captures(text)?.get(1)?.as_str();
    serde_json::from_str(body).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labelled_fence_is_parsed() {
        let text = "Here you go:\n```json\n{\"food_name\": \"Apple\", \"calories_per_100g\": 52}\n```\nEnjoy!";
        assert_eq!(
            extract_json(text),
            Some(json!({ "food_name": "Apple", "calories_per_100g": 52 }))
        );
    }

    #[test]
    fn labelled_fence_wins_over_earlier_braces() {
        let text = "Note {draft}\n```json\n{\"food_name\": \"Pear\"}\n```";
        assert_eq!(extract_json(text), Some(json!({ "food_name": "Pear" })));
    }

    #[test]
    fn unlabelled_fence_is_parsed() {
        let text = "```\n[{\"name\": \"Corner Cafe\"}]\n```";
        assert_eq!(extract_json(text), Some(json!([{ "name": "Corner Cafe" }])));
    }

    #[test]
    fn broken_fence_falls_through_to_brace_span() {
        let text = "```json\nnot json\n``` but later {\"food_name\": \"Rice\"}";
        assert_eq!(extract_json(text), Some(json!({ "food_name": "Rice" })));
    }

    #[test]
    fn prose_wrapped_object_uses_brace_span() {
        let text = "The analysis is {\"food_name\": \"Banana\", \"nutritional_info\": {\"fat\": 0.3}} as requested.";
        assert_eq!(
            extract_json(text),
            Some(json!({ "food_name": "Banana", "nutritional_info": { "fat": 0.3 } }))
        );
    }

    #[test]
    fn bare_json_is_recovered_exactly() {
        assert_eq!(extract_json("  [1, 2, 3]\n"), Some(json!([1, 2, 3])));
        assert_eq!(extract_json("\"just text\""), Some(json!("just text")));
        assert_eq!(extract_json("{\"a\": true}"), Some(json!({ "a": true })));
    }

    #[test]
    fn plain_prose_yields_nothing() {
        assert_eq!(extract_json("I could not identify this food, sorry."), None);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(extract_json(""), None);
        assert_eq!(extract_json("   \n"), None);
    }

    #[test]
    fn invalid_content_between_braces_yields_nothing() {
        assert_eq!(extract_json("Result: {food_name: Apple, calories: ??} done"), None);
    }

    #[test]
    fn truncated_object_yields_nothing() {
        assert_eq!(extract_json("{\"food_name\": \"Apple\", \"category\": "), None);
    }

    #[test]
    fn reversed_braces_are_ignored() {
        assert_eq!(extract_json("} oops {"), None);
    }

    #[test]
    fn two_separate_objects_are_not_split() {
        assert_eq!(extract_json("first {\"a\": 1} then {\"b\": 2}"), None);
    }

    #[test]
    fn extract_object_rejects_non_objects() {
        assert!(extract_object("[1, 2]").is_none());
        assert!(extract_object("{}").is_none());
        let map = extract_object("```json\n{\"food_name\": \"Kiwi\"}\n```").unwrap();
        assert_eq!(map["food_name"], "Kiwi");
    }
}
