use serde::{Deserialize, Serialize};

const BASE_PROMPT: &str = "You are a data extraction specialist for web pages.

You receive a screenshot of a rendered page together with its structure and visible text.
Return structured data as a single JSON object.

Rules:
1. Always answer with valid JSON and nothing else.
2. Follow the requested schema exactly.
3. Use null for fields that are not present on the page.
4. Prices are plain numbers without currency symbols.
5. Dates use ISO 8601 when possible.
6. URLs are absolute when possible.
7. Never invent data that is not visible.";

const ECOMMERCE_FOCUS: &str = "
Focus: e-commerce.
- Capture product name, price, discount and availability.
- Capture technical specifications, ratings and review counts.
- Capture categories, tags and every product image.";

const NEWS_FOCUS: &str = "
Focus: news and articles.
- Capture headline, subtitle, author and publication date.
- Capture the main body text, categories and tags.
- Capture images with captions and related links.";

const GENERIC_FOCUS: &str = "
Focus: generic extraction.
- Identify the kind of content on the page.
- Detect the relevant fields and the relations between elements.";

pub const AGENT_PLANNER_PROMPT: &str = r#"You drive a web browser towards a data collection goal.
You receive the visible TEXT and a SCREENSHOT of the current page. Use both.

Answer with JSON only:
{
  "action": "goto|click|type|scroll|wait|back|open_new_tab|extract|stop",
  "target": "css selector or null",
  "value": "optional value",
  "reason": "short reason"
}

Rules:
- Look at the screenshot to find buttons or icons without readable labels.
- For icon-only elements describe the icon in "reason" and try a generic selector or id.
- Prefer small, safe actions and avoid loops.
- Use "extract" once enough data is visible.
- Use "stop" when the goal is done or the page is blocked."#;

pub const AGENT_EXTRACTOR_PROMPT: &str =
    "You receive several browsing states (text, html, urls) and must extract structured data from them.
Answer with valid JSON only, following the requested schema.";

pub const REPAIR_INSTRUCTION: &str =
    "Your previous answer was not valid JSON. Reply again with strict, valid JSON only, no extra text, keeping the same schema.";

/// System prompt presets offered to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptPreset {
    #[default]
    Generic,
    Ecommerce,
    News,
}

impl PromptPreset {
    pub fn system_prompt(&self) -> String {
        let focus = match self {
            Self::Generic => GENERIC_FOCUS,
            Self::Ecommerce => ECOMMERCE_FOCUS,
            Self::News => NEWS_FOCUS,
        };
        format!("{}\n{}", BASE_PROMPT, focus)
    }
}

/// Shapes the instructions only; the schema stays the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    List,
    Summary,
    Report,
}

impl OutputStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "list" => Some(Self::List),
            "summary" => Some(Self::Summary),
            "report" => Some(Self::Report),
            _ => None,
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Summary => "OUTPUT STYLE: EXECUTIVE SUMMARY (CONCISE).
- Put the weight on the 'summary' field: one dense, direct paragraph about the content.
- Use Markdown bold for key points.
- Use 'findings' only for crucial topics, without excess detail.
- Skip irrelevant details.",
            Self::Report => "OUTPUT STYLE: FULL REPORT (DETAILED).
- 'summary' is a comprehensive introduction written in Markdown with headings, bold text and lists.
- When relevant, embed images in the Markdown with ![alt](url), picking the best URLs from 'Available images'.
- 'findings' must be extensive: extract everything relevant.
- Descriptions are long, detailed and analytical.
- Put technical data in the 'extra' field.",
            Self::List => "OUTPUT STYLE: STRUCTURED LIST (DEFAULT).
- Focus on the 'findings' list.
- Identify every item individually.
- Keep descriptions objective and direct.
- Keep 'summary' short, as general context only.",
        }
    }
}

/// Goal and style directive that opens the user message.
pub fn goal_directive(goal: Option<&str>, style: OutputStyle) -> String {
    match goal.map(str::trim).filter(|g| !g.is_empty()) {
        Some(goal) => format!("User goal (takes priority): {}\n\n{}\n", goal, style.instruction()),
        None => format!("{}\n", style.instruction()),
    }
}
