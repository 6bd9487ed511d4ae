//! Parameter Specs and Extraction
//!
//! Each tool declares named parameters; values are pulled out of the
//! question text with regex rules, preferring names already known from the
//! record snapshot (department names, employee names) over raw captures.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::trait_def::ToolContext;

/// Extracted parameter values by name.
pub type ToolParams = BTreeMap<String, String>;

/// What kind of value a parameter holds, which selects its extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// An employee name
    PersonName,
    /// The first organizational unit mentioned
    Department,
    /// The second organizational unit mentioned
    SecondDepartment,
    /// A distribution dimension (gender, age, education, tenure, salary, birth month, department)
    Dimension,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }
}

/// Extract values for `specs` from `question`.
///
/// Returns the values found and the names of required parameters that were not.
pub fn extract_params(
    specs: &[ParamSpec],
    question: &str,
    ctx: &ToolContext,
) -> (ToolParams, Vec<String>) {
    let mut params = ToolParams::new();
    let mut missing = Vec::new();
    let departments = extract_departments(question, ctx.departments());

    for spec in specs {
        let value = match spec.kind {
            ParamKind::PersonName => extract_person_name(question, ctx.employee_names()),
            ParamKind::Department => departments.first().cloned(),
            ParamKind::SecondDepartment => departments.get(1).cloned(),
            ParamKind::Dimension => extract_dimension(question).map(|d| d.to_string()),
        };
        match value {
            Some(v) => {
                params.insert(spec.name.to_string(), v);
            }
            None if spec.required => missing.push(spec.name.to_string()),
            None => {}
        }
    }

    (params, missing)
}

// ============================================================================
// Person names
// ============================================================================

fn name_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?:谁是|关于|查询|查找|找一下|介绍一下)\s*([^\s,，。？?!！的]+)",
            r"([^\s,，。？?!！的]{2,4})是谁",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// An employee name mentioned in the question.
///
/// Known names found verbatim win (longest first); otherwise the token after
/// "谁是"/"关于"/"查询" (or before "是谁") is used.
pub fn extract_person_name(question: &str, known_names: &[String]) -> Option<String> {
    let known = known_names
        .iter()
        .filter(|n| n.chars().count() >= 2 && question.contains(n.as_str()))
        .max_by_key(|n| n.chars().count());
    if let Some(name) = known {
        return Some(name.clone());
    }

    name_patterns()
        .iter()
        .filter_map(|re| re.captures(question))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .find(|name| !name.is_empty() && !is_unit_token(name))
}

fn is_unit_token(token: &str) -> bool {
    ["部门", "部", "所", "中心"].iter().any(|s| token.ends_with(s))
}

// ============================================================================
// Departments
// ============================================================================

/// Unit names that are always recognized, even before a snapshot is loaded.
pub const KNOWN_UNITS: &[&str] = &[
    "大数据平台与信息部",
    "数字经济研究所",
    "生物经济研究所",
    "海洋经济研究所",
    "城市轨道与城市发展研究所",
    "创新中心",
    "党委办公室",
    "合规管理部",
    "综合协同部",
    "战略发展与项目管理部",
];

/// Verbs and fillers that precede a unit name without being part of it.
const LEADING_NOISE: &[&str] = &[
    "请问", "请", "帮我", "告诉我", "我想知道", "我想了解", "查询", "查看", "查一下", "统计",
    "分析", "对比", "比较", "显示", "列出", "关于", "一下", "看看", "在",
];

/// Characters that, right after a 部/所 suffix, show it is part of another word
/// (所有, 部分, 所以, ...).
const SUFFIX_CONTINUATIONS: &[char] = &['有', '分', '以', '在', '属', '谓', '长'];

fn unit_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[^，。？?!！、,\s和与跟及的]+?(?:部门|中心|部|所)").ok())
        .as_ref()
}

/// Organizational units mentioned in the question, in order of appearance,
/// canonicalized against `known` where possible.
pub fn extract_departments(question: &str, known: &[String]) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();

    let push = |pos: usize, name: String, found: &mut Vec<(usize, String)>| {
        if !found.iter().any(|(_, n)| *n == name) {
            found.push((pos, name));
        }
    };

    let fixed = KNOWN_UNITS.iter().map(|s| s.to_string());
    let mut all_known: Vec<String> = known.iter().cloned().chain(fixed).collect();
    all_known.sort_by_key(|n| std::cmp::Reverse(n.chars().count()));
    all_known.dedup();

    let mut masked = question.to_string();
    for name in &all_known {
        if name.is_empty() {
            continue;
        }
        if let Some(pos) = masked.find(name.as_str()) {
            push(pos, name.clone(), &mut found);
            masked = masked.replace(name.as_str(), &"，".repeat(name.chars().count()));
        }
    }

    if let Some(re) = unit_pattern() {
        for m in re.find_iter(&masked) {
            let next = masked[m.end()..].chars().next();
            if next.is_some_and(|c| SUFFIX_CONTINUATIONS.contains(&c)) {
                continue;
            }
            if let Some(token) = clean_unit_token(m.as_str()) {
                let name = resolve_unit(&token, known);
                push(m.start(), name, &mut found);
            }
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, name)| name).collect()
}

/// Strip leading noise and normalize `X部门` to `X部`; reject generic words.
fn clean_unit_token(raw: &str) -> Option<String> {
    let mut token = raw.trim();
    loop {
        let before = token;
        for noise in LEADING_NOISE {
            if let Some(rest) = token.strip_prefix(noise) {
                token = rest;
            }
        }
        if before == token {
            break;
        }
    }

    let token = match token.strip_suffix("部门") {
        Some(stem) => format!("{}部", stem),
        None => token.to_string(),
    };

    let generic = ["部", "所", "中心", "全部", "内部", "外部", "总部门", "每个部", "哪个部"];
    let first = token.chars().next()?;
    if token.chars().count() < 2
        || generic.contains(&token.as_str())
        || ['各', '每', '哪', '某', '其'].contains(&first)
    {
        return None;
    }
    Some(token)
}

/// Map a raw unit token onto a known unit name when one clearly matches.
pub fn resolve_unit(token: &str, known: &[String]) -> String {
    if known.iter().any(|k| k == token) {
        return token.to_string();
    }
    let stem = token
        .trim_end_matches("中心")
        .trim_end_matches('部')
        .trim_end_matches('所');
    let candidates: Vec<&String> = known
        .iter()
        .filter(|k| !stem.is_empty() && (k.contains(stem) || token.contains(k.as_str())))
        .collect();
    match candidates.as_slice() {
        [only] => (*only).clone(),
        _ => token.to_string(),
    }
}

// ============================================================================
// Distribution dimensions
// ============================================================================

/// Grouping dimension for distribution statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Gender,
    Age,
    Education,
    Tenure,
    Salary,
    BirthMonth,
    Department,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Gender => "gender",
            Dimension::Age => "age",
            Dimension::Education => "education",
            Dimension::Tenure => "tenure",
            Dimension::Salary => "salary",
            Dimension::BirthMonth => "birth_month",
            Dimension::Department => "department",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Dimension::Gender => "性别",
            Dimension::Age => "年龄",
            Dimension::Education => "学历",
            Dimension::Tenure => "司龄",
            Dimension::Salary => "薪资",
            Dimension::BirthMonth => "生日月份",
            Dimension::Department => "部门",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "gender" | "性别" => Some(Dimension::Gender),
            "age" | "年龄" => Some(Dimension::Age),
            "education" | "学历" => Some(Dimension::Education),
            "tenure" | "司龄" | "工龄" => Some(Dimension::Tenure),
            "salary" | "薪资" | "工资" | "月薪" => Some(Dimension::Salary),
            "birth_month" | "birthday" | "生日" | "生日月份" | "出生月份" => Some(Dimension::BirthMonth),
            "department" | "部门" => Some(Dimension::Department),
            _ => None,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Infer the distribution dimension from question vocabulary.
pub fn extract_dimension(question: &str) -> Option<Dimension> {
    const VOCABULARY: &[(&[&str], Dimension)] = &[
        (&["性别", "男女", "男性", "女性"], Dimension::Gender),
        (&["年龄", "岁"], Dimension::Age),
        (&["学历", "教育", "本科", "硕士", "博士"], Dimension::Education),
        (&["司龄", "工龄", "入职年限", "工作年限"], Dimension::Tenure),
        (&["薪资", "工资", "月薪", "收入"], Dimension::Salary),
        (&["生日", "出生月份"], Dimension::BirthMonth),
        (&["各部门", "部门分布", "每个部门"], Dimension::Department),
    ];
    VOCABULARY
        .iter()
        .find(|(words, _)| words.iter().any(|w| question.contains(w)))
        .map(|(_, dim)| *dim)
}
