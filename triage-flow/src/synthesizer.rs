//! Fixed guidance templates keyed by category.

use crate::classifier::{Category, affected_body_part};
use crate::output::{PossibleCause, Severity, TriageOutput};

pub const DISCLAIMER: &str = "This is not a medical diagnosis. Consult a professional.";

/// Characters of the user's own words echoed back in the general summary.
const GENERAL_ECHO_CHARS: usize = 100;

struct Template {
    summary: &'static str,
    severity: Severity,
    causes: &'static [(&'static str, f64)],
    home_care: &'static [&'static str],
    prevention: &'static [&'static str],
    red_flags: &'static [&'static str],
    when_to_seek_care: &'static [&'static str],
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Template {
    fn render(&self, summary: String) -> TriageOutput {
        TriageOutput {
            summary,
            severity: self.severity,
            possible_causes: self
                .causes
                .iter()
                .map(|(name, confidence)| PossibleCause::new(*name, *confidence))
                .collect(),
            home_care: strings(self.home_care),
            prevention: strings(self.prevention),
            red_flags: strings(self.red_flags),
            when_to_seek_care: strings(self.when_to_seek_care),
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

const SYSTEMIC: Template = Template {
    summary: "Symptoms consistent with a viral illness or systemic infection.",
    severity: Severity::Medium,
    causes: &[("Viral Influenza", 0.78), ("Common Cold", 0.65)],
    home_care: &["Rest and hydration", "Over-the-counter antipyretics"],
    prevention: &["Wash hands frequently"],
    red_flags: &["Stiff neck", "Confusion", "Difficulty breathing"],
    when_to_seek_care: &["If fever persists > 3 days", "If unable to keep fluids down"],
};

const WOUND: Template = Template {
    summary: "Observation of an open wound.",
    severity: Severity::Medium,
    causes: &[("Laceration", 0.85), ("Abrasion", 0.80)],
    home_care: &[
        "Clean with water",
        "Apply antibiotic ointment",
        "Cover with sterile bandage",
    ],
    prevention: &["Keep environment safe"],
    red_flags: &[
        "Uncontrollable bleeding",
        "Signs of infection (pus, red streaks)",
    ],
    when_to_seek_care: &[
        "If wound is deep (needs stitches)",
        "If bleeding doesn't stop",
    ],
};

const SKIN: Template = Template {
    summary: "Symptoms suggest a localized skin reaction.",
    severity: Severity::Low,
    causes: &[("Contact Dermatitis", 0.75), ("Insect Bite", 0.60)],
    home_care: &["Keep clean and dry", "Apply cold compress"],
    prevention: &["Avoid potential allergens"],
    red_flags: &["Rapidly spreading redness", "High fever"],
    when_to_seek_care: &["If symptoms worsen after 24 hours"],
};

const MUSCULOSKELETAL: Template = Template {
    summary: "",
    severity: Severity::Low,
    causes: &[
        ("Strain or Overuse Injury", 0.75),
        ("Minor Sprain", 0.65),
        ("Repetitive Stress Injury", 0.55),
        ("Joint Inflammation", 0.45),
    ],
    home_care: &[
        "Rest the affected area and avoid activities that worsen pain",
        "Apply ice for 15-20 minutes several times a day",
        "Use over-the-counter pain relievers (ibuprofen, acetaminophen)",
        "Gentle stretching once pain subsides",
    ],
    prevention: &[
        "Take regular breaks during repetitive activities",
        "Use proper ergonomics",
        "Warm up before physical activities",
    ],
    red_flags: &[
        "Severe swelling or deformity",
        "Inability to move the affected area",
        "Numbness or tingling",
        "Pain that worsens despite rest",
    ],
    when_to_seek_care: &[
        "If pain persists for more than a week",
        "If swelling does not improve with ice and rest",
        "If you cannot use the affected body part normally",
    ],
};

const HEADACHE: Template = Template {
    summary: "Symptoms suggest a tension or stress-related headache.",
    severity: Severity::Low,
    causes: &[
        ("Tension Headache", 0.80),
        ("Dehydration", 0.60),
        ("Eye Strain", 0.50),
    ],
    home_care: &[
        "Rest in a quiet, dark room",
        "Stay hydrated",
        "Over-the-counter pain relievers",
        "Apply cold or warm compress to forehead",
    ],
    prevention: &["Manage stress", "Get adequate sleep", "Limit screen time"],
    red_flags: &[
        "Sudden severe headache",
        "Headache with fever and stiff neck",
        "Vision changes",
    ],
    when_to_seek_care: &[
        "If headache is the worst of your life",
        "If accompanied by confusion",
    ],
};

const GI: Template = Template {
    summary: "Symptoms suggest a gastrointestinal issue.",
    severity: Severity::Low,
    causes: &[
        ("Indigestion", 0.70),
        ("Gastritis", 0.55),
        ("Food Intolerance", 0.50),
    ],
    home_care: &[
        "Eat bland foods",
        "Stay hydrated with clear fluids",
        "Avoid spicy, fatty, or acidic foods",
        "Rest and avoid strenuous activity",
    ],
    prevention: &[
        "Eat smaller meals",
        "Avoid trigger foods",
        "Don't lie down right after eating",
    ],
    red_flags: &[
        "Severe abdominal pain",
        "Blood in vomit or stool",
        "High fever",
    ],
    when_to_seek_care: &[
        "If symptoms persist more than 2 days",
        "If unable to keep fluids down",
    ],
};

const RESPIRATORY: Template = Template {
    summary: "Symptoms suggest a respiratory issue such as a common cold or upper respiratory infection.",
    severity: Severity::Low,
    causes: &[
        ("Common Cold", 0.75),
        ("Upper Respiratory Infection", 0.70),
        ("Allergies", 0.55),
        ("Bronchitis", 0.40),
    ],
    home_care: &[
        "Rest and get plenty of sleep",
        "Stay hydrated with warm fluids (tea, soup)",
        "Use honey for sore throat (if over 1 year old)",
        "Use saline nasal spray for congestion",
        "Take over-the-counter decongestants if needed",
    ],
    prevention: &[
        "Wash hands frequently",
        "Avoid close contact with sick people",
        "Get adequate sleep",
    ],
    red_flags: &[
        "Difficulty breathing",
        "Chest pain",
        "High fever (>39°C/102°F)",
        "Symptoms lasting >10 days",
    ],
    when_to_seek_care: &[
        "If breathing becomes difficult",
        "If cough produces blood",
        "If fever persists >3 days",
    ],
};

const AUTONOMIC: Template = Template {
    summary: "Symptoms suggest an autonomic nervous system response, possibly related to stress, anxiety, blood sugar changes, or temperature regulation.",
    severity: Severity::Low,
    causes: &[
        ("Anxiety or Panic Response", 0.75),
        ("Low Blood Sugar (Hypoglycemia)", 0.65),
        ("Stress Response", 0.60),
        ("Caffeine or Stimulant Effect", 0.45),
        ("Cold Exposure", 0.40),
    ],
    home_care: &[
        "Eat something with sugar if you haven't eaten recently",
        "Practice deep breathing exercises",
        "Move to a comfortable temperature environment",
        "Sit or lie down if feeling faint",
        "Drink water and stay hydrated",
    ],
    prevention: &[
        "Eat regular meals to maintain blood sugar",
        "Practice stress management techniques",
        "Limit caffeine intake",
        "Get adequate sleep",
    ],
    red_flags: &[
        "Chest pain or pressure",
        "Difficulty breathing",
        "Confusion or altered consciousness",
        "Symptoms not improving after eating",
    ],
    when_to_seek_care: &[
        "If symptoms are frequent or recurring",
        "If accompanied by fainting or near-fainting",
        "If you have diabetes and suspect low blood sugar",
    ],
};

const GENERAL: Template = Template {
    summary: "",
    severity: Severity::Low,
    causes: &[("General Discomfort", 0.60), ("Minor Health Issue", 0.50)],
    home_care: &[
        "Get adequate rest",
        "Stay hydrated",
        "Monitor symptoms for changes",
    ],
    prevention: &[
        "Maintain healthy lifestyle",
        "Regular exercise",
        "Balanced diet",
    ],
    red_flags: &[
        "Symptoms worsening rapidly",
        "New severe symptoms appearing",
    ],
    when_to_seek_care: &[
        "If symptoms persist or worsen",
        "If you develop new concerns",
    ],
};

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Deterministic guidance for a category. `raw_text` is only read for the
/// musculoskeletal body part and the general summary echo.
pub fn synthesize(category: Category, raw_text: Option<&str>) -> TriageOutput {
    let text = raw_text.unwrap_or_default();
    match category {
        Category::SystemicFever => SYSTEMIC.render(SYSTEMIC.summary.to_string()),
        Category::Wound => WOUND.render(WOUND.summary.to_string()),
        Category::Skin => SKIN.render(SKIN.summary.to_string()),
        Category::Headache => HEADACHE.render(HEADACHE.summary.to_string()),
        Category::Gi => GI.render(GI.summary.to_string()),
        Category::Respiratory => RESPIRATORY.render(RESPIRATORY.summary.to_string()),
        Category::Autonomic => AUTONOMIC.render(AUTONOMIC.summary.to_string()),
        Category::Musculoskeletal => MUSCULOSKELETAL.render(format!(
            "Symptoms suggest a musculoskeletal issue affecting {}.",
            affected_body_part(text)
        )),
        Category::General => GENERAL.render(format!(
            "General health concern noted. Based on your symptoms: {}...",
            truncate_chars(&text.to_lowercase(), GENERAL_ECHO_CHARS)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wound_summary_never_mentions_skin() {
        let out = synthesize(Category::Wound, None);
        assert!(out.summary.to_lowercase().contains("wound"));
        assert!(!out.summary.to_lowercase().contains("skin"));
        assert_eq!(out.possible_causes[0].name, "Laceration");
    }

    #[test]
    fn headache_mentions_tension() {
        let out = synthesize(Category::Headache, Some("throbbing"));
        assert!(out.summary.contains("tension"));
        assert_eq!(out.severity, Severity::Low);
    }

    #[test]
    fn systemic_is_medium_severity() {
        let out = synthesize(Category::SystemicFever, None);
        assert_eq!(out.severity, Severity::Medium);
        assert!(out.summary.to_lowercase().contains("viral"));
    }

    #[test]
    fn musculoskeletal_interpolates_body_part() {
        let out = synthesize(Category::Musculoskeletal, Some("my knee is stiff"));
        assert_eq!(
            out.summary,
            "Symptoms suggest a musculoskeletal issue affecting knee."
        );
        let fallback = synthesize(Category::Musculoskeletal, Some("so sore"));
        assert!(fallback.summary.contains("the affected area"));
    }

    #[test]
    fn general_echo_is_truncated_on_char_boundary() {
        let long = "é".repeat(150);
        let out = synthesize(Category::General, Some(&long));
        let echoed = out
            .summary
            .trim_start_matches("General health concern noted. Based on your symptoms: ")
            .trim_end_matches("...");
        assert_eq!(echoed.chars().count(), 100);

        let short = synthesize(Category::General, Some("Feeling Off"));
        assert!(short.summary.ends_with("feeling off..."));
    }

    #[test]
    fn every_template_is_well_formed() {
        for category in [
            Category::SystemicFever,
            Category::Headache,
            Category::Gi,
            Category::Respiratory,
            Category::Skin,
            Category::Musculoskeletal,
            Category::Autonomic,
            Category::General,
            Category::Wound,
        ] {
            let out = synthesize(category, Some("something"));
            assert!(!out.summary.is_empty());
            assert_eq!(out.disclaimer, DISCLAIMER);
            assert!(!out.possible_causes.is_empty());
            assert!(out
                .possible_causes
                .iter()
                .all(|c| (0.0..=1.0).contains(&c.confidence)));
            assert!(out
                .possible_causes
                .windows(2)
                .all(|w| w[0].confidence >= w[1].confidence));
            assert_ne!(out.severity, Severity::Critical);
        }
    }

    #[test]
    fn synthesis_is_deterministic() {
        assert_eq!(
            synthesize(Category::Gi, Some("nausea")),
            synthesize(Category::Gi, Some("nausea"))
        );
    }
}
