use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::classifier::Category;

/// A follow-up question shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub allow_custom: bool,
}

impl Question {
    fn new(id: &str, text: &str, options: &[&str], allow_custom: bool) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            allow_custom,
        }
    }
}

pub const CONFIRMATION_QUESTION_ID: &str = "q_continue_1";
pub const UPLOAD_PROMPT_QUESTION_ID: &str = "q_upload_prompt";

/// Asked after every image upload that does not finalize on its own.
pub static CONFIRMATION_QUESTION: LazyLock<Question> = LazyLock::new(|| {
    Question::new(
        CONFIRMATION_QUESTION_ID,
        "Do you want to continue (upload another image or describe symptoms) to improve accuracy?",
        &[
            "Yes, upload another image",
            "Yes, add symptoms in text",
            "No, finalize now",
        ],
        false,
    )
});

pub static UPLOAD_PROMPT_QUESTION: LazyLock<Question> = LazyLock::new(|| {
    Question::new(
        UPLOAD_PROMPT_QUESTION_ID,
        "Please upload the next image.",
        &[],
        false,
    )
});

/// Static catalog: one canonical question per category plus secondary follow-ups.
pub struct QuestionBank {
    systemic: Vec<Question>,
    headache: Vec<Question>,
    gi: Vec<Question>,
    respiratory: Vec<Question>,
    skin: Vec<Question>,
    musculoskeletal: Vec<Question>,
    autonomic: Vec<Question>,
    general: Vec<Question>,
    wound: Vec<Question>,
}

pub static QUESTION_BANK: LazyLock<QuestionBank> = LazyLock::new(QuestionBank::standard);

impl QuestionBank {
    pub fn standard() -> Self {
        Self {
            systemic: vec![
                Question::new(
                    "q_systemic_1",
                    "How high is your fever and how long has it lasted?",
                    &[
                        "Low grade (<38C), <2 days",
                        "High grade (>38C), <2 days",
                        "Any fever > 3 days",
                    ],
                    true,
                ),
                Question::new(
                    "q_systemic_2",
                    "Are you experiencing severe dehydration (dry mouth, no urine)?",
                    &["Yes", "No"],
                    false,
                ),
            ],
            headache: vec![Question::new(
                "q_headache_1",
                "Is the headache throbbing, squeezing, or sharp?",
                &["Throbbing", "Squeezing (band-like)", "Sharp/Stabbing"],
                true,
            )],
            gi: vec![Question::new(
                "q_gi_1",
                "Do you have any nausea, vomiting, or diarrhea?",
                &["Yes, nausea only", "Vomiting", "Diarrhea", "None"],
                true,
            )],
            respiratory: vec![Question::new(
                "q_respiratory_1",
                "Is the cough dry or producing mucus, and how long has it lasted?",
                &["Dry, < 1 week", "With mucus, < 1 week", "Longer than 1 week"],
                true,
            )],
            skin: vec![
                Question::new(
                    "q_skin_1",
                    "Is the rash itchy or painful?",
                    &["Itchy", "Painful", "Both", "Neither"],
                    true,
                ),
                Question::new(
                    "q_skin_2",
                    "Is the rash spreading rapidly?",
                    &["Yes", "No", "Stable"],
                    false,
                ),
            ],
            musculoskeletal: vec![
                Question::new(
                    "q_musculo_1",
                    "How did the pain start and how long have you had it?",
                    &[
                        "Sudden injury/trauma",
                        "Gradual onset, < 1 week",
                        "Chronic, > 1 week",
                    ],
                    true,
                ),
                Question::new(
                    "q_musculo_2",
                    "Is there any swelling, redness, or limited movement?",
                    &[
                        "Yes, swelling",
                        "Yes, redness/warmth",
                        "Limited movement",
                        "None of these",
                    ],
                    true,
                ),
            ],
            autonomic: vec![Question::new(
                "q_autonomic_1",
                "When did the sweating or shivering start, and have you eaten recently?",
                &[
                    "Started suddenly, haven't eaten",
                    "Comes and goes with stress",
                    "After caffeine or exercise",
                ],
                true,
            )],
            general: vec![Question::new(
                "q_general_1",
                "Can you describe your symptoms in more detail?",
                &["pain", "weakness", "discomfort"],
                true,
            )],
            wound: vec![
                Question::new(
                    "q_wound_1",
                    "Is the wound deep or showing signs of infection (pus, warmth)?",
                    &[
                        "Superficial, clean",
                        "Deep, bleeding controlled",
                        "Signs of infection",
                    ],
                    true,
                ),
                Question::new(
                    "q_wound_2",
                    "Is the bleeding uncontrollable?",
                    &["Yes", "No - stopped with pressure"],
                    false,
                ),
            ],
        }
    }

    fn questions(&self, category: Category) -> &[Question] {
        match category {
            Category::SystemicFever => &self.systemic,
            Category::Headache => &self.headache,
            Category::Gi => &self.gi,
            Category::Respiratory => &self.respiratory,
            Category::Skin => &self.skin,
            Category::Musculoskeletal => &self.musculoskeletal,
            Category::Autonomic => &self.autonomic,
            Category::General => &self.general,
            Category::Wound => &self.wound,
        }
    }

    /// The canonical follow-up question for a category.
    pub fn question_for(&self, category: Category) -> &Question {
        // Every category is seeded with at least one question in `standard`.
        &self.questions(category)[0]
    }

    /// Secondary questions after the canonical one, possibly empty.
    pub fn follow_ups_for(&self, category: Category) -> &[Question] {
        &self.questions(category)[1..]
    }

    /// Open-ended prompt used when the user chooses to add more text.
    pub fn describe_symptoms(&self) -> &Question {
        self.question_for(Category::General)
    }

    pub fn find(&self, id: &str) -> Option<&Question> {
        [
            &self.systemic,
            &self.headache,
            &self.gi,
            &self.respiratory,
            &self.skin,
            &self.musculoskeletal,
            &self.autonomic,
            &self.general,
            &self.wound,
        ]
        .into_iter()
        .flatten()
        .chain([&*CONFIRMATION_QUESTION, &*UPLOAD_PROMPT_QUESTION])
        .find(|q| q.id == id)
    }
}

pub fn question_for(category: Category) -> &'static Question {
    QUESTION_BANK.question_for(category)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Category; 9] = [
        Category::SystemicFever,
        Category::Headache,
        Category::Gi,
        Category::Respiratory,
        Category::Skin,
        Category::Musculoskeletal,
        Category::Autonomic,
        Category::General,
        Category::Wound,
    ];

    #[test]
    fn every_category_has_a_question() {
        for category in ALL {
            let q = question_for(category);
            assert!(!q.id.is_empty());
            assert!(!q.text.is_empty());
        }
    }

    #[test]
    fn question_ids_are_unique() {
        let mut ids: Vec<&str> = ALL
            .iter()
            .flat_map(|c| {
                std::iter::once(question_for(*c))
                    .chain(QUESTION_BANK.follow_ups_for(*c).iter())
                    .map(|q| q.id.as_str())
            })
            .collect();
        ids.push(CONFIRMATION_QUESTION_ID);
        ids.push(UPLOAD_PROMPT_QUESTION_ID);
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn canonical_texts() {
        assert!(question_for(Category::Headache).text.contains("throbbing"));
        assert!(question_for(Category::Gi).text.contains("nausea"));
        assert!(question_for(Category::SystemicFever).text.contains("fever"));
        assert!(question_for(Category::Musculoskeletal)
            .text
            .contains("how long"));
        assert!(!question_for(Category::Gi).text.to_lowercase().contains("fever"));
    }

    #[test]
    fn confirmation_question_options() {
        assert_eq!(CONFIRMATION_QUESTION.id, "q_continue_1");
        assert!(!CONFIRMATION_QUESTION.allow_custom);
        assert_eq!(CONFIRMATION_QUESTION.options.len(), 3);
        assert!(UPLOAD_PROMPT_QUESTION.options.is_empty());
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(
            QUESTION_BANK.find("q_wound_2").map(|q| q.text.as_str()),
            Some("Is the bleeding uncontrollable?")
        );
        assert!(QUESTION_BANK.find("q_continue_1").is_some());
        assert!(QUESTION_BANK.find("nope").is_none());
    }
}
