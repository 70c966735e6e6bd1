//! Pretty-printing of JSON values (and host response frames) back into
//! source-language text, used by the macro eval bridge to turn a
//! JavaScript evaluation result into something the parser can re-read.

use serde_json::Value;

/// Renders a bare JSON value the way the source language would write
/// it: objects as `k: v` pairs with no braces (matching the original's
/// terse object dump), arrays as bracketed, space-separated elements,
/// everything else via its JSON display form.
pub fn from_json(value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", from_json(v)))
            .collect::<Vec<_>>()
            .join(""),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(from_json).collect();
            format!("[{}]", inner.join(" "))
        }
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "nil".to_string(),
    }
}

/// One line of response from the host process: either a computed
/// result or a reported JavaScript error.
#[derive(Debug, Clone, PartialEq)]
pub enum HostFrame {
    Result(String),
    Error(String),
}

/// Parses one line of the host's stdout. The host always answers with
/// a single-line JSON object shaped `{"result": ...}` or `{"error":
/// ...}`.
pub fn parse_frame(line: &str) -> Result<HostFrame, String> {
    let value: Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let obj = value.as_object().ok_or("response frame was not an object")?;
    if let Some(result) = obj.get("result") {
        let text = match result {
            Value::String(s) => s.clone(),
            other => from_json(other),
        };
        return Ok(HostFrame::Result(text));
    }
    if let Some(err) = obj.get("error") {
        let text = err.as_str().map(str::to_string).unwrap_or_default();
        return Ok(HostFrame::Error(text));
    }
    Ok(HostFrame::Result("nil".to_string()))
}

/// The sentinel the host sends back for a bare function or macro
/// definition submission, rather than an evaluated value.
pub const DEFINITION_SENTINEL: &str = "\"use strict\"";

/// Given the submitted source, extracts the defined name and whether
/// it was a `fn` or a `macro`, for the REPL's `<fn NAME>` / `<macro
/// NAME>` echo printed in place of the sentinel.
pub fn definition_echo(submitted: &str) -> Option<String> {
    for (keyword, label) in [("(fn ", "fn"), ("(macro ", "macro")] {
        if let Some(rest) = submitted.split(keyword).nth(1) {
            let name = rest.split(' ').next().unwrap_or("");
            if !name.is_empty() {
                return Some(format!("<{label} {name}>"));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_echo_recognizes_fn() {
        assert_eq!(
            definition_echo("(fn add [x y] (+ x y))"),
            Some("<fn add>".to_string())
        );
    }

    #[test]
    fn definition_echo_recognizes_macro() {
        assert_eq!(
            definition_echo("(macro inc [n] `(+ ,n 1))"),
            Some("<macro inc>".to_string())
        );
    }

    #[test]
    fn definition_echo_is_none_for_plain_expressions() {
        assert_eq!(definition_echo("(+ 1 1)"), None);
    }

    #[test]
    fn parses_a_result_frame() {
        let frame = parse_frame(r#"{"result": "2"}"#).unwrap();
        assert_eq!(frame, HostFrame::Result("2".to_string()));
    }

    #[test]
    fn parses_an_error_frame() {
        let frame = parse_frame(r#"{"error": "boom"}"#).unwrap();
        assert_eq!(frame, HostFrame::Error("boom".to_string()));
    }
}
