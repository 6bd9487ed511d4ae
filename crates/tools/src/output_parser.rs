//! Model Output Parsing
//!
//! Query-synthesis replies come back as free text. This module recognizes
//! either a query (fenced or bare) or a tool call (fenced `tool_call` block or
//! bare JSON). Anything else is returned as unrecognized text.
//!
//! Detection order:
//! 1. a ```sql / ```sqlite fenced block
//! 2. any other fenced block (not `tool_call`) whose body contains a statement verb
//! 3. a ```tool_call block, as `tool: x` / `param: k=v` lines or JSON
//! 4. a bare JSON object with a `"tool"` key
//! 5. a line starting with a statement verb, up to the next blank line

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::ToolParams;

/// A tool call written by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedToolCall {
    pub tool: String,
    pub params: ToolParams,
    /// The raw text the call was parsed from.
    pub raw_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognized {
    Query(String),
    ToolCall(ParsedToolCall),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOutput {
    Recognized(Recognized),
    /// Nothing recognizable; carries the trimmed reply.
    Unrecognized(String),
}

impl ParsedOutput {
    pub fn query(&self) -> Option<&str> {
        match self {
            ParsedOutput::Recognized(Recognized::Query(q)) => Some(q),
            _ => None,
        }
    }
}

/// Statement verbs. Mutating verbs are recognized so that validation can
/// reject them explicitly.
const STATEMENT_VERBS: &[&str] = &[
    "SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "CREATE", "ALTER", "DROP",
];

const TOOL_CALL_LANG: &str = "tool_call";

struct Fence<'a> {
    lang: &'a str,
    body: &'a str,
}

/// Fenced blocks in order. An unclosed final fence is ignored.
fn fences(text: &str) -> Vec<Fence<'_>> {
    let mut blocks = Vec::new();
    let mut remaining = text;
    while let Some(start) = remaining.find("```") {
        let after_marker = &remaining[start + 3..];
        let (lang, body_start) = match after_marker.find('\n') {
            Some(nl) => (after_marker[..nl].trim(), nl + 1),
            None => break,
        };
        let after_lang = &after_marker[body_start..];
        match after_lang.find("```") {
            Some(end) => {
                blocks.push(Fence {
                    lang,
                    body: after_lang[..end].trim(),
                });
                remaining = &after_lang[end + 3..];
            }
            None => break,
        }
    }
    blocks
}

fn verb_regex() -> Option<&'static Regex> {
    static VERB: OnceLock<Option<Regex>> = OnceLock::new();
    VERB.get_or_init(|| {
        let pattern = format!(r"(?i)\b({})\b", STATEMENT_VERBS.join("|"));
        Regex::new(&pattern).ok()
    })
    .as_ref()
}

fn line_start_verb_regex() -> Option<&'static Regex> {
    static VERB: OnceLock<Option<Regex>> = OnceLock::new();
    VERB.get_or_init(|| {
        let pattern = format!(r"(?im)^[ \t]*({})\b", STATEMENT_VERBS.join("|"));
        Regex::new(&pattern).ok()
    })
    .as_ref()
}

fn contains_statement(body: &str) -> bool {
    verb_regex().is_some_and(|re| re.is_match(body))
}

/// Classify a synthesis reply.
pub fn parse_model_output(text: &str) -> ParsedOutput {
    let blocks = fences(text);

    if let Some(block) = blocks.iter().find(|b| {
        let lang = b.lang.to_ascii_lowercase();
        (lang == "sql" || lang == "sqlite") && !b.body.is_empty()
    }) {
        return ParsedOutput::Recognized(Recognized::Query(block.body.to_string()));
    }

    if let Some(block) = blocks
        .iter()
        .find(|b| !b.lang.eq_ignore_ascii_case(TOOL_CALL_LANG) && contains_statement(b.body))
    {
        return ParsedOutput::Recognized(Recognized::Query(block.body.to_string()));
    }

    if let Some(call) = blocks
        .iter()
        .filter(|b| b.lang.eq_ignore_ascii_case(TOOL_CALL_LANG))
        .find_map(|b| parse_tool_call_block(b.body))
    {
        return ParsedOutput::Recognized(Recognized::ToolCall(call));
    }

    if let Some(call) = parse_bare_json_tool_call(text) {
        return ParsedOutput::Recognized(Recognized::ToolCall(call));
    }

    if let Some(query) = parse_bare_statement(text) {
        return ParsedOutput::Recognized(Recognized::Query(query));
    }

    ParsedOutput::Unrecognized(text.trim().to_string())
}

/// Body of a ```tool_call block: JSON, or `tool:` / `param:` lines.
fn parse_tool_call_block(body: &str) -> Option<ParsedToolCall> {
    if body.trim_start().starts_with('{') {
        return serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| tool_call_from_json(&v, body));
    }

    let mut tool = None;
    let mut params = ToolParams::new();
    for line in body.lines() {
        let line = line.trim();
        if let Some(name) = strip_key(line, "tool") {
            tool = Some(name.to_string());
        } else if let Some(pair) = strip_key(line, "param") {
            if let Some((k, v)) = pair.split_once('=') {
                let (k, v) = (k.trim(), v.trim());
                if !k.is_empty() && !v.is_empty() {
                    params.insert(k.to_string(), v.to_string());
                }
            }
        }
    }

    tool.filter(|t| !t.is_empty()).map(|tool| ParsedToolCall {
        tool,
        params,
        raw_text: format!("```tool_call\n{}\n```", body),
    })
}

/// `key: value` or `key：value` (full-width colon).
fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(key)?.trim_start();
    rest.strip_prefix(':')
        .or_else(|| rest.strip_prefix('：'))
        .map(str::trim)
}

fn tool_call_from_json(value: &Value, raw: &str) -> Option<ParsedToolCall> {
    let tool = value.get("tool")?.as_str()?.trim();
    if tool.is_empty() {
        return None;
    }
    let mut params = ToolParams::new();
    let arguments = value.get("arguments").or_else(|| value.get("params"));
    if let Some(Value::Object(map)) = arguments {
        for (k, v) in map {
            let v = match v {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            params.insert(k.clone(), v);
        }
    }
    Some(ParsedToolCall {
        tool: tool.to_string(),
        params,
        raw_text: raw.trim().to_string(),
    })
}

/// First `{...}` in the text that parses as JSON with a `"tool"` key.
fn parse_bare_json_tool_call(text: &str) -> Option<ParsedToolCall> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find('{') {
        let start = offset + pos;
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            let end = start + stream.byte_offset();
            if let Some(call) = tool_call_from_json(&value, &text[start..end]) {
                return Some(call);
            }
        }
        offset = start + 1;
    }
    None
}

/// A statement starting a line, running to the next blank line.
fn parse_bare_statement(text: &str) -> Option<String> {
    let m = line_start_verb_regex()?.find(text)?;
    let rest = &text[m.start()..];
    let statement = match rest.find("\n\n") {
        Some(end) => &rest[..end],
        None => rest,
    };
    let statement = statement.trim().trim_end_matches('`').trim();
    (!statement.is_empty()).then(|| statement.to_string())
}
