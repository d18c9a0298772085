use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Difficulty and reward category of a quiz item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Bronze, Tier::Silver, Tier::Gold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
        }
    }

    pub fn parse(value: &str) -> Option<Tier> {
        match value.trim().to_lowercase().as_str() {
            "bronze" => Some(Tier::Bronze),
            "silver" => Some(Tier::Silver),
            "gold" => Some(Tier::Gold),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multiple-choice question. Field names match the cached JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub correct: usize,
    #[serde(rename = "difficulty", default)]
    pub tier: Tier,
    #[serde(default)]
    pub explanation: String,
}

impl QuizItem {
    pub fn new(question: &str, options: [&str; 4], correct: usize, tier: Tier, explanation: &str) -> Self {
        Self {
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct,
            tier,
            explanation: explanation.to_string(),
        }
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct).map(String::as_str)
    }

    /// True when the correct index addresses an existing option
    pub fn is_well_formed(&self) -> bool {
        !self.question.trim().is_empty() && self.correct < self.options.len()
    }
}

/// Reward counters, one per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardKeys {
    pub bronze: u32,
    pub silver: u32,
    pub gold: u32,
}

impl RewardKeys {
    pub fn award(&mut self, tier: Tier) {
        match tier {
            Tier::Bronze => self.bronze += 1,
            Tier::Silver => self.silver += 1,
            Tier::Gold => self.gold += 1,
        }
    }

    pub fn count(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Bronze => self.bronze,
            Tier::Silver => self.silver,
            Tier::Gold => self.gold,
        }
    }

    pub fn total(&self) -> u32 {
        self.bronze + self.silver + self.gold
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_index: usize,
    pub selected_index: usize,
    pub correct_index: usize,
    pub was_correct: bool,
}

/// Final grade on the Bulgarian 2.00–6.00 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    #[serde(deserialize_with = "grade_from_number_or_string")]
    pub grade: f64,
    #[serde(default)]
    pub test_feedback: String,
    #[serde(default)]
    pub thesis_feedback: String,
    #[serde(default)]
    pub comment: String,
}

impl GradeResult {
    pub fn formatted_grade(&self) -> String {
        format!("{:.2}", self.grade)
    }
}

fn grade_from_number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawGrade {
        Number(f64),
        Text(String),
    }

    match RawGrade::deserialize(deserializer)? {
        RawGrade::Number(n) => Ok(n),
        RawGrade::Text(s) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("grade '{}' is not a number", s))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeReport {
    pub result: GradeResult,
    pub source: GradeSource,
}

/// Statistics handed to the grading engine once a run completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeInput {
    pub correct: usize,
    pub total: usize,
    pub essay: String,
    pub hints_used: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl UserProfile {
    pub fn local(username: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            username: username.to_string(),
            email: None,
            created_at,
            provider: None,
        }
    }
}
