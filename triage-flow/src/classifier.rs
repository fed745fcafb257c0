//! Keyword classification of symptom descriptions into clinical categories.
//!
//! Two rule sets exist on purpose. The question-time set picks the follow-up
//! question while evidence is still being gathered and escalates long-running
//! vomiting to the systemic question; the output-time set picks the final
//! template and has no such escalation. Both lower-case their input and use
//! plain substring matching.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

use crate::context::{InputMode, TriageContext};
use crate::rules::RuleSet;

/// Clinical bucket used to pick both the follow-up question and the final template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    SystemicFever,
    Headache,
    Gi,
    Respiratory,
    Skin,
    Musculoskeletal,
    Autonomic,
    General,
    Wound,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SystemicFever => "SYSTEMIC_FEVER",
            Category::Headache => "HEADACHE",
            Category::Gi => "GI",
            Category::Respiratory => "RESPIRATORY",
            Category::Skin => "SKIN",
            Category::Musculoskeletal => "MUSCULOSKELETAL",
            Category::Autonomic => "AUTONOMIC",
            Category::General => "GENERAL",
            Category::Wound => "WOUND",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased symptom text and duration hint, the input to every text rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymptomInput {
    pub text: String,
    pub duration: String,
}

impl SymptomInput {
    pub fn new(text: &str, duration: Option<&str>) -> Self {
        Self {
            text: text.to_lowercase(),
            duration: duration.unwrap_or_default().to_lowercase(),
        }
    }

    fn mentions(&self, keywords: &[&str]) -> bool {
        mentions_any(&self.text, keywords)
    }
}

fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

// Output-time vocabulary.
const HEADACHE_KEYWORDS: &[&str] = &["headache", "head pain", "migraine", "head ache"];
const GI_KEYWORDS: &[&str] = &[
    "stomach",
    "nausea",
    "vomit",
    "diarrhea",
    "bloating",
    "stomach pain",
    "abdominal",
    "belly",
    "gastric",
    "indigestion",
    "acid reflux",
    "heartburn",
];
const FEVER_KEYWORDS: &[&str] = &["fever", "chills", "cold", "flu", "temperature"];
const RESPIRATORY_KEYWORDS: &[&str] = &[
    "cough",
    "breathing",
    "breath",
    "chest pain",
    "wheezing",
    "congestion",
    "runny nose",
    "sore throat",
    "throat pain",
];
const SKIN_KEYWORDS: &[&str] = &[
    "rash", "itchy", "itching", "hives", "skin", "bump", "acne", "pimple",
];
const AUTONOMIC_KEYWORDS: &[&str] = &[
    "sweating",
    "sweat",
    "shivering",
    "shiver",
    "trembling",
    "tremble",
    "shaking",
    "clammy",
    "cold sweat",
];
const FEVER_DENIALS: &[&str] = &[
    "no fever",
    "don't have a fever",
    "don't have fever",
    "not have fever",
    "no temperature",
    "haven't got fever",
    "i don't have a fever",
    "i dont have fever",
];
const MUSCULOSKELETAL_INDICATORS: &[&str] =
    &["sprain", "strain", "swelling", "stiff", "ache", "sore", "injury"];

/// Body parts in personalization priority order.
pub const BODY_PARTS: &[&str] = &[
    "thumb", "finger", "hand", "wrist", "arm", "elbow", "shoulder", "knee", "ankle", "foot",
    "toe", "leg", "hip", "back", "neck", "joint",
];
const EXTRA_MUSCULOSKELETAL_SITES: &[&str] = &["muscle", "spine"];

// Question-time vocabulary.
const QUESTION_INFECTION_KEYWORDS: &[&str] = &["fever", "chills", "shivering"];
const QUESTION_HEADACHE_KEYWORDS: &[&str] = &["headache", "head pain", "migraine"];
const QUESTION_GI_KEYWORDS: &[&str] =
    &["uneasy", "stomach", "nausea", "indigestion", "bloating", "gas"];
const QUESTION_VOMIT_KEYWORDS: &[&str] = &["vomit", "throwing up", "puke"];
const QUESTION_MUSCULOSKELETAL_KEYWORDS: &[&str] = &[
    "pain", "ache", "sore", "hurt", "swelling", "stiff", "sprain", "strain", "thumb", "finger",
    "hand", "wrist", "arm", "elbow", "shoulder", "knee", "ankle", "foot", "toe", "leg", "hip",
    "back", "neck", "joint",
];

pub const AFFECTED_AREA_FALLBACK: &str = "the affected area";

static HOT_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhot\b").expect("static regex"));

static DURATION_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*(day|week|month)").expect("static regex")
});

fn denies_fever(input: &SymptomInput) -> bool {
    input.mentions(FEVER_DENIALS)
}

fn has_autonomic(input: &SymptomInput) -> bool {
    input.mentions(AUTONOMIC_KEYWORDS)
}

fn has_fever_keyword(input: &SymptomInput) -> bool {
    input.mentions(FEVER_KEYWORDS)
}

fn has_body_part(input: &SymptomInput) -> bool {
    input.mentions(BODY_PARTS) || input.mentions(EXTRA_MUSCULOSKELETAL_SITES)
}

fn has_vomiting(input: &SymptomInput) -> bool {
    input.mentions(QUESTION_VOMIT_KEYWORDS)
}

/// Whether a free-text duration reads as two days or longer.
pub fn is_long_duration(duration: &str) -> bool {
    let duration = duration.to_lowercase();
    if let Some(caps) = DURATION_AMOUNT.captures(&duration) {
        // A count too large for u64 is still a very long time.
        let amount = caps[1].parse::<u64>().unwrap_or(u64::MAX);
        return match &caps[2] {
            "day" => amount >= 2,
            _ => amount >= 1,
        };
    }
    mentions_any(
        &duration,
        &["two day", "three day", "few day", "several day", "week", "month"],
    )
}

/// Output-time rules, first match wins.
pub static OUTPUT_RULES: LazyLock<RuleSet<SymptomInput, Category>> = LazyLock::new(|| {
    RuleSet::new("output", Category::General)
        .rule(
            "autonomic_without_fever",
            |i: &SymptomInput| has_autonomic(i) && (denies_fever(i) || !has_fever_keyword(i)),
            Category::Autonomic,
        )
        .rule(
            "headache",
            |i: &SymptomInput| i.mentions(HEADACHE_KEYWORDS),
            Category::Headache,
        )
        .rule(
            "fever_not_denied",
            |i: &SymptomInput| has_fever_keyword(i) && !denies_fever(i),
            Category::SystemicFever,
        )
        .rule(
            "respiratory",
            |i: &SymptomInput| i.mentions(RESPIRATORY_KEYWORDS),
            Category::Respiratory,
        )
        .rule("gi", |i: &SymptomInput| i.mentions(GI_KEYWORDS), Category::Gi)
        .rule(
            "skin",
            |i: &SymptomInput| i.mentions(SKIN_KEYWORDS),
            Category::Skin,
        )
        .rule(
            "musculoskeletal",
            |i: &SymptomInput| has_body_part(i) || i.mentions(MUSCULOSKELETAL_INDICATORS),
            Category::Musculoskeletal,
        )
});

/// Question-time rules, first match wins.
pub static QUESTION_RULES: LazyLock<RuleSet<SymptomInput, Category>> = LazyLock::new(|| {
    RuleSet::new("question", Category::General)
        .rule(
            "infection",
            |i: &SymptomInput| i.mentions(QUESTION_INFECTION_KEYWORDS) || HOT_WORD.is_match(&i.text),
            Category::SystemicFever,
        )
        .rule(
            "vomiting_long_duration",
            |i: &SymptomInput| has_vomiting(i) && is_long_duration(&i.duration),
            Category::SystemicFever,
        )
        .rule(
            "headache",
            |i: &SymptomInput| i.mentions(QUESTION_HEADACHE_KEYWORDS),
            Category::Headache,
        )
        .rule(
            "gi_or_vomiting",
            |i: &SymptomInput| i.mentions(QUESTION_GI_KEYWORDS) || has_vomiting(i),
            Category::Gi,
        )
        .rule(
            "musculoskeletal",
            |i: &SymptomInput| i.mentions(QUESTION_MUSCULOSKELETAL_KEYWORDS),
            Category::Musculoskeletal,
        )
});

/// Category for the final output, from text alone.
pub fn classify_text(symptoms: &str) -> Category {
    let (category, rule) = OUTPUT_RULES.evaluate_named(&SymptomInput::new(symptoms, None));
    debug!(category = %category, rule, "output-time text classification");
    category
}

/// Category for the follow-up question, from text and an optional duration hint.
pub fn classify_text_for_question(symptoms: &str, duration: Option<&str>) -> Category {
    let (category, rule) = QUESTION_RULES.evaluate_named(&SymptomInput::new(symptoms, duration));
    debug!(category = %category, rule, "question-time text classification");
    category
}

/// Wound beats skin; anything else is left to the text.
pub fn classify_observations(findings: &[String]) -> Option<Category> {
    let has = |label: &str| findings.iter().any(|f| f.eq_ignore_ascii_case(label));
    if has("open wound") || has("bleeding") {
        Some(Category::Wound)
    } else if has("redness") || has("rash") {
        Some(Category::Skin)
    } else {
        None
    }
}

/// Category used to pick the follow-up question for this context.
pub fn classify_for_question(ctx: &TriageContext) -> Category {
    match ctx.input_mode {
        InputMode::Text => {
            classify_text_for_question(&ctx.combined_text, ctx.duration_hint.as_deref())
        }
        InputMode::Image | InputMode::Mixed => classify_observations(ctx.findings())
            .unwrap_or_else(|| {
                match classify_text_for_question(&ctx.combined_text, ctx.duration_hint.as_deref())
                {
                    Category::General | Category::Musculoskeletal => Category::SystemicFever,
                    other => other,
                }
            }),
    }
}

/// Category used to pick the final output for this context.
///
/// Image evidence decides first; otherwise accompanying text is classified,
/// and when the text says nothing recognisable the systemic template applies.
pub fn classify_for_output(ctx: &TriageContext) -> Category {
    match ctx.input_mode {
        InputMode::Text => classify_text(&ctx.combined_text),
        InputMode::Image | InputMode::Mixed => {
            if let Some(category) = classify_observations(ctx.findings()) {
                return category;
            }
            if ctx.combined_text.trim().is_empty() {
                return Category::SystemicFever;
            }
            match classify_text(&ctx.combined_text) {
                Category::General => Category::SystemicFever,
                other => other,
            }
        }
    }
}

/// First body part named in the text, or a neutral phrase.
pub fn affected_body_part(symptoms: &str) -> &'static str {
    let lower = symptoms.to_lowercase();
    BODY_PARTS
        .iter()
        .copied()
        .find(|part| lower.contains(part))
        .unwrap_or(AFFECTED_AREA_FALLBACK)
}
