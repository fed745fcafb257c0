//! Emergency detection that runs before any classification.
//!
//! Any pattern match finalizes the session with a critical response. The
//! canned message is picked by a separate keyword check and never changes the
//! severity.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::output::{Severity, TriageOutput};

/// Pattern family that triggered the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyGroup {
    SelfHarm,
    Cardiac,
    Respiratory,
    Neurological,
    Trauma,
    Critical,
}

/// Which canned message is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyKind {
    Cardiac,
    Respiratory,
    Stroke,
    MentalHealthCrisis,
    Generic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyResponse {
    pub group: EmergencyGroup,
    pub kind: EmergencyKind,
    pub output: TriageOutput,
}

pub const EMERGENCY_DISCLAIMER: &str = "This system has detected potential emergency symptoms. This is NOT a diagnosis - emergency services can provide proper evaluation.";

struct EmergencyPattern {
    regex: Regex,
    group: EmergencyGroup,
}

fn patterns(group: EmergencyGroup, sources: &[&str]) -> Vec<EmergencyPattern> {
    sources
        .iter()
        .map(|src| EmergencyPattern {
            regex: Regex::new(src).expect("static emergency pattern"),
            group,
        })
        .collect()
}

/// Ordered emergency patterns, matched against lower-cased text.
static EMERGENCY_PATTERNS: LazyLock<Vec<EmergencyPattern>> = LazyLock::new(|| {
    let mut all = Vec::new();
    all.extend(patterns(
        EmergencyGroup::SelfHarm,
        &[
            r"\bsuicid",
            r"\bkill myself",
            r"\bwant to die",
            r"\bend my life",
            r"\bharm myself",
            r"\bself.?harm",
        ],
    ));
    all.extend(patterns(
        EmergencyGroup::Cardiac,
        &[
            r"\bcardiac arrest",
            r"\bheart attack",
            r"\bheart stop",
            r"\bchest pain\b",
            r"\bchest tightness",
            r"\bchest pressure",
            r"\bheart racing",
            r"\birregular heartbeat",
            r"\bpalpitation",
        ],
    ));
    all.extend(patterns(
        EmergencyGroup::Respiratory,
        &[
            r"\bcant breathe\b",
            r"\bcan't breathe\b",
            r"\bcannot breathe",
            r"\bdifficulty breathing",
            r"\bshortness of breath",
            r"\bchoking",
            r"\bcan't get air",
            r"\bgasping",
        ],
    ));
    all.extend(patterns(
        EmergencyGroup::Neurological,
        &[
            r"\bstroke\b",
            r"\bseizure",
            r"\bconvulsion",
            r"\bslurred speech",
            r"\bface droop",
            r"\barm weakness",
            r"\bsudden confusion",
            r"\bsudden numbness",
            r"\bworst headache",
            r"\bthunderclap headache",
            r"\bloss of consciousness",
            r"\bpassed out",
            r"\bfainted",
            r"\bunresponsive",
        ],
    ));
    all.extend(patterns(
        EmergencyGroup::Trauma,
        &[
            r"\bsevere bleeding",
            r"\buncontrollable bleeding",
            r"\bhead injury",
            r"\bhead trauma",
            r"\bsevere burn",
            r"\belectrocution",
        ],
    ));
    all.extend(patterns(
        EmergencyGroup::Critical,
        &[
            r"\boverdose",
            r"\bpoisoning",
            r"\ballergic reaction.*severe",
            r"\banaphyla",
            r"\bswelling.*throat",
            r"\bthroat.*closing",
        ],
    ));
    all
});

const CARDIAC_TERMS: &[&str] = &["cardiac", "heart", "chest pain", "chest tight", "chest pressure"];
const RESPIRATORY_TERMS: &[&str] = &["breathe", "breathing", "choking", "gasping", "air"];
const STROKE_TERMS: &[&str] = &["stroke", "slurred", "face droop", "arm weak", "sudden numb"];
const MENTAL_HEALTH_TERMS: &[&str] = &["suicid", "kill myself", "want to die", "harm myself"];

fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

/// Canned-message selection, priority cardiac > respiratory > stroke > crisis.
pub fn emergency_kind(text: &str) -> EmergencyKind {
    let lower = normalize(text);
    let any = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));
    if any(CARDIAC_TERMS) {
        EmergencyKind::Cardiac
    } else if any(RESPIRATORY_TERMS) {
        EmergencyKind::Respiratory
    } else if any(STROKE_TERMS) {
        EmergencyKind::Stroke
    } else if any(MENTAL_HEALTH_TERMS) {
        EmergencyKind::MentalHealthCrisis
    } else {
        EmergencyKind::Generic
    }
}

fn immediate_actions(kind: EmergencyKind) -> (&'static str, &'static [&'static str]) {
    match kind {
        EmergencyKind::Cardiac => (
            "🚨 CRITICAL: POTENTIAL CARDIAC EMERGENCY DETECTED",
            &[
                "Call 911/112 IMMEDIATELY",
                "If available, chew aspirin (unless allergic)",
                "Sit or lie down in a comfortable position",
                "Loosen any tight clothing",
                "If you have prescribed nitroglycerin, take as directed",
                "Stay calm and wait for emergency services",
            ],
        ),
        EmergencyKind::Respiratory => (
            "🚨 CRITICAL: BREATHING EMERGENCY DETECTED",
            &[
                "Call 911/112 IMMEDIATELY",
                "If choking, perform Heimlich maneuver or get help",
                "Sit upright to ease breathing",
                "Use rescue inhaler if you have asthma",
                "Stay calm, panic worsens breathing difficulty",
            ],
        ),
        EmergencyKind::Stroke => (
            "🚨 CRITICAL: POTENTIAL STROKE - TIME IS CRITICAL",
            &[
                "Call 911/112 IMMEDIATELY - Every minute counts!",
                "Note the TIME symptoms started (critical for treatment)",
                "F.A.S.T.: Face drooping, Arm weakness, Speech difficulty, Time to call 911",
                "Do NOT give food/water (risk of choking)",
                "Lay person on side if vomiting",
            ],
        ),
        EmergencyKind::MentalHealthCrisis => (
            "🚨 CRISIS SUPPORT NEEDED - You are not alone",
            &[
                "Call emergency services (911/112) if in immediate danger",
                "National Suicide Prevention Lifeline: 988 (US)",
                "iCall (India): 9152987821",
                "Vandrevala Foundation (India): 1860-2662-345",
                "Crisis Text Line: Text HOME to 741741",
                "Stay on the line - someone cares about you",
            ],
        ),
        EmergencyKind::Generic => (
            "🚨 CRITICAL: EMERGENCY SYMPTOMS DETECTED",
            &[
                "Call 911/112 IMMEDIATELY",
                "Do not ignore these symptoms",
                "Stay calm and await emergency services",
            ],
        ),
    }
}

/// Build the critical payload for a given message kind.
pub fn emergency_output(kind: EmergencyKind) -> TriageOutput {
    let (summary, actions) = immediate_actions(kind);
    TriageOutput {
        summary: summary.to_string(),
        severity: Severity::Critical,
        possible_causes: Vec::new(),
        home_care: actions.iter().map(|a| a.to_string()).collect(),
        prevention: Vec::new(),
        red_flags: vec!["THIS IS AN EMERGENCY - Do not delay seeking help".to_string()],
        when_to_seek_care: vec![
            "🚨 SEEK HELP NOW - Call 911/112 immediately".to_string(),
            "Go to the nearest emergency room".to_string(),
            "Do NOT drive yourself - have someone else drive or call ambulance".to_string(),
        ],
        disclaimer: EMERGENCY_DISCLAIMER.to_string(),
    }
}

/// Stateless scanner over the shared pattern table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyScanner;

impl SafetyScanner {
    pub fn new() -> Self {
        Self
    }

    /// Group of the first matching pattern, if any.
    pub fn detect(&self, text: &str) -> Option<EmergencyGroup> {
        let lower = normalize(text);
        EMERGENCY_PATTERNS
            .iter()
            .find(|p| p.regex.is_match(&lower))
            .map(|p| p.group)
    }

    /// Critical response when `text` contains any emergency pattern.
    pub fn scan(&self, text: &str) -> Option<EmergencyResponse> {
        let group = self.detect(text)?;
        let kind = emergency_kind(text);
        Some(EmergencyResponse {
            group,
            kind,
            output: emergency_output(kind),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Option<EmergencyResponse> {
        SafetyScanner::new().scan(text)
    }

    #[test]
    fn benign_text_passes() {
        assert!(scan("I have a sharp headache").is_none());
        assert!(scan("I feel uneasy in my stomach").is_none());
        assert!(scan("").is_none());
    }

    #[test]
    fn each_group_triggers_critical() {
        for (text, group) in [
            ("I want to kill myself", EmergencyGroup::SelfHarm),
            ("I think I'm having a heart attack", EmergencyGroup::Cardiac),
            ("I can't breathe", EmergencyGroup::Respiratory),
            ("my dad has slurred speech", EmergencyGroup::Neurological),
            ("there is severe bleeding from my leg", EmergencyGroup::Trauma),
            ("possible overdose on pills", EmergencyGroup::Critical),
        ] {
            let response = scan(text).unwrap_or_else(|| panic!("no alert for {text:?}"));
            assert_eq!(response.group, group, "{text}");
            assert_eq!(response.output.severity, Severity::Critical);
            assert!(response.output.possible_causes.is_empty());
            assert!(response.output.when_to_seek_care[0].contains("Call 911/112"));
        }
    }

    #[test]
    fn matching_is_case_insensitive_and_handles_curly_apostrophes() {
        let response = scan("I CAN\u{2019}T BREATHE").unwrap();
        assert_eq!(response.group, EmergencyGroup::Respiratory);
        assert_eq!(response.kind, EmergencyKind::Respiratory);
    }

    #[test]
    fn message_kind_priority() {
        // Cardiac wording outranks the respiratory wording in the same text.
        let response = scan("chest pain and shortness of breath").unwrap();
        assert_eq!(response.kind, EmergencyKind::Cardiac);
        assert!(response.output.summary.contains("CARDIAC"));

        let stroke = scan("sudden numbness and slurred speech").unwrap();
        assert_eq!(stroke.kind, EmergencyKind::Stroke);

        let crisis = scan("I want to die").unwrap();
        assert_eq!(crisis.kind, EmergencyKind::MentalHealthCrisis);
        assert!(crisis.output.home_care.iter().any(|a| a.contains("988")));

        let generic = scan("accidental poisoning").unwrap();
        assert_eq!(generic.kind, EmergencyKind::Generic);
    }

    #[test]
    fn emergency_anywhere_in_combined_text_is_caught() {
        let combined = "mild rash on my arm\nit is itchy\nhonestly I want to end my life";
        assert_eq!(
            SafetyScanner::new().detect(combined),
            Some(EmergencyGroup::SelfHarm)
        );
    }

    #[test]
    fn emergency_disclaimer_is_used() {
        let response = scan("having a seizure").unwrap();
        assert_eq!(response.output.disclaimer, EMERGENCY_DISCLAIMER);
    }
}
