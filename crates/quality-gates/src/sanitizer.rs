//! Response Sanitizer
//!
//! Turns model output into plain conversational text: code fences, inline
//! code, headings, bullets, emphasis, links, tables, tool-call fragments and
//! process narration are removed. `sanitize` is idempotent.

use regex::Regex;

use crate::models::SanitizerPolicy;

/// A compiled rewrite rule.
struct Rule {
    name: &'static str,
    regex: Regex,
    replacement: &'static str,
}

/// Rewrite rules in application order: (name, pattern, replacement).
const RULES: &[(&str, &str, &str)] = &[
    ("fenced_block", r"(?s)```[^\n`]*\n?.*?```", ""),
    ("unclosed_fence", r"(?s)```.*\z", ""),
    (
        "tool_call_json",
        r#"\{[ \t]*"tool"[ \t]*:[^{}]*(\{[^{}]*\})?[^{}]*\}"#,
        "",
    ),
    ("inline_code", r"`[^`\n]*`", ""),
    ("stray_backtick", r"`", ""),
    ("image", r"!\[([^\]\n]*)\]\([^)\n]*\)", "$1"),
    ("link", r"\[([^\]\n]+)\]\([^)\n]*\)", "$1"),
    (
        "table_separator",
        r"(?m)^[ \t]*\|?[ \t]*:?-{3,}:?[ \t]*(\|[ \t]*:?-{3,}:?[ \t]*)*\|?[ \t]*$",
        "",
    ),
    ("horizontal_rule", r"(?m)^[ \t]*([*_][ \t]*){3,}$", ""),
    ("heading", r"(?m)^[ \t]{0,3}#{1,6}[ \t]+", ""),
    ("blockquote", r"(?m)^[ \t]*>[ \t]?", ""),
    ("bullet", r"(?m)^[ \t]*[-*+•][ \t]+", ""),
    ("bold_stars", r"\*\*([^\n]+?)\*\*", "$1"),
    ("bold_underscores", r"__([^\n]+?)__", "$1"),
    ("strikethrough", r"~~([^\n]+?)~~", "$1"),
    ("italic_stars", r"\*([^*\s][^*\n]*?)\*", "$1"),
];

/// Deterministic post-processor for model output.
pub struct ResponseSanitizer {
    rules: Vec<Rule>,
    meta_phrases: Vec<String>,
    table_row: Option<Regex>,
    trailing_space: Option<Regex>,
    blank_runs: Option<Regex>,
}

impl ResponseSanitizer {
    pub fn new(policy: &SanitizerPolicy) -> Self {
        let rules = RULES
            .iter()
            .filter_map(|(name, pattern, replacement)| match Regex::new(pattern) {
                Ok(regex) => Some(Rule {
                    name: *name,
                    regex,
                    replacement: *replacement,
                }),
                Err(e) => {
                    tracing::error!(rule = name, error = %e, "invalid sanitizer rule");
                    None
                }
            })
            .collect();

        Self {
            rules,
            meta_phrases: policy
                .meta_phrases
                .iter()
                .filter(|p| !p.trim().is_empty())
                .cloned()
                .collect(),
            table_row: Regex::new(r"(?m)^[ \t]*\|(.*)\|[ \t]*$").ok(),
            trailing_space: Regex::new(r"(?m)[ \t]+$").ok(),
            blank_runs: Regex::new(r"\n{3,}").ok(),
        }
    }

    /// Strip structural markup from `text`.
    ///
    /// Every rule strictly shortens the text when it fires, so repeating the
    /// pass until nothing changes terminates, and the result is a fixed point.
    pub fn sanitize(&self, text: &str) -> String {
        let mut current = text.replace("\r\n", "\n");
        loop {
            let next = self.pass(&current);
            if next == current {
                return next;
            }
            current = next;
        }
    }

    fn pass(&self, text: &str) -> String {
        let mut out = text.to_string();

        for rule in &self.rules {
            if rule.regex.is_match(&out) {
                tracing::trace!(rule = rule.name, "sanitizer rule applied");
                out = rule.regex.replace_all(&out, rule.replacement).into_owned();
            }
        }

        for phrase in &self.meta_phrases {
            if out.contains(phrase.as_str()) {
                out = out.replace(phrase.as_str(), "");
            }
        }

        if let Some(row) = &self.table_row {
            out = row
                .replace_all(&out, |caps: &regex::Captures| {
                    caps[1]
                        .split('|')
                        .map(str::trim)
                        .filter(|cell| !cell.is_empty())
                        .collect::<Vec<_>>()
                        .join("，")
                })
                .into_owned();
        }

        if let Some(trailing) = &self.trailing_space {
            out = trailing.replace_all(&out, "").into_owned();
        }
        if let Some(blank) = &self.blank_runs {
            out = blank.replace_all(&out, "\n\n").into_owned();
        }

        out.trim().to_string()
    }
}

impl Default for ResponseSanitizer {
    fn default() -> Self {
        Self::new(&SanitizerPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sanitize(text: &str) -> String {
        ResponseSanitizer::default().sanitize(text)
    }

    #[test]
    fn test_removes_code_fences() {
        let text = "我将使用以下SQL查询来回答你的问题：\n```sql\nSELECT COUNT(*) FROM employees\n```\n研发部共有12人。";
        assert_eq!(sanitize(text), "研发部共有12人。");
    }

    #[test]
    fn test_removes_unclosed_fence() {
        assert_eq!(sanitize("结果如下\n```sql\nSELECT *"), "结果如下");
    }

    #[test]
    fn test_removes_tool_call_blocks() {
        let text = "我需要使用工具来回答这个问题。\n\n```tool_call\ntool: analyze_department\nparam: department=研发部\n```\n研发部有20人。";
        assert_eq!(sanitize(text), "研发部有20人。");
        let json = r#"{"tool": "find_employee", "arguments": {"name": "张三"}} 张三在研发部。"#;
        assert_eq!(sanitize(json), "张三在研发部。");
    }

    #[test]
    fn test_strips_markdown() {
        let text = "## 结果\n\n- **研发部**：20人\n* 市场部：*8* 人\n> 注意：数据来自[人事系统](http://hr)";
        assert_eq!(sanitize(text), "结果\n\n研发部：20人\n市场部：8 人\n注意：数据来自人事系统");
    }

    #[test]
    fn test_inline_code_removed() {
        assert_eq!(sanitize("使用 `department` 字段统计"), "使用  字段统计");
    }

    #[test]
    fn test_tables_flattened() {
        let text = "| 部门 | 人数 |\n|---|---|\n| 研发部 | 20 |";
        assert_eq!(sanitize(text), "部门，人数\n\n研发部，20");
    }

    #[test]
    fn test_collapses_blank_lines_and_trims() {
        assert_eq!(sanitize("\n\n第一段\n\n\n\n\n第二段   \n\n"), "第一段\n\n第二段");
    }

    #[test]
    fn test_arithmetic_stars_survive() {
        assert_eq!(sanitize("3 * 4 * 5 = 60"), "3 * 4 * 5 = 60");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let text = "研发部目前共有42名员工。\n\n其中硕士学历占一半。";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn test_idempotent_on_tricky_inputs() {
        let inputs = [
            "***加粗斜体***",
            "**a** __b__ ~~c~~ *d*",
            "```\n```\n```",
            "`a``b`",
            "[[链接](x)](y)",
            "| a | b |\n| c |",
            "# # 双重标题",
            "- - 嵌套列表",
            "> > 引用",
            "{\"tool\": \"x\"}{\"tool\": \"y\"}",
            "\n\n\n  \n\n\n",
            "****",
            "*",
            "__init__ 方法",
            "我需要使用工具来回答这个问题。我需要使用工具来回答这个问题。",
        ];
        let sanitizer = ResponseSanitizer::default();
        for input in inputs {
            let once = sanitizer.sanitize(input);
            let twice = sanitizer.sanitize(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", input);
        }
    }

    const MARKUP: &[&str] = &[
        "```sql\n", "```", "`", "**", "*", "__", "~~", "# ", "- ", "> ", "|", "---", "\n",
        "\n\n\n", "[", "](", ")", "!", "{\"tool\": ", "}", "研发部", "20人", " ", "SELECT",
    ];

    fn markup_heavy() -> impl Strategy<Value = String> {
        let piece = prop_oneof![
            3 => prop::sample::select(MARKUP).prop_map(String::from),
            1 => "[a-z0-9 \t研发市场部人：，。]{0,8}",
        ];
        prop::collection::vec(piece, 0..24).prop_map(|pieces| pieces.concat())
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent_on_markup(text in markup_heavy()) {
            let sanitizer = ResponseSanitizer::default();
            let once = sanitizer.sanitize(&text);
            prop_assert_eq!(sanitizer.sanitize(&once), once);
        }

        #[test]
        fn sanitize_leaves_no_fences_or_tool_calls(text in markup_heavy()) {
            let once = ResponseSanitizer::default().sanitize(&text);
            prop_assert!(!once.contains('`'));
            prop_assert!(!once.contains("{\"tool\": }"), "sanitized output still contains a tool-call marker");
        }
    }
}
