use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Optimization strategy understood by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Clarity,
    Specificity,
    Structure,
    Conciseness,
    Context,
    TechnicalAccuracy,
    Creativity,
    Tone,
}

impl Goal {
    /// Every goal, in the order advertised to hosts.
    pub const ALL: [Goal; 8] = [
        Goal::Clarity,
        Goal::Specificity,
        Goal::Structure,
        Goal::Conciseness,
        Goal::Context,
        Goal::TechnicalAccuracy,
        Goal::Creativity,
        Goal::Tone,
    ];

    /// Substituted when a caller's goal list filters down to nothing.
    pub const DEFAULT: Goal = Goal::Clarity;

    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::Clarity => "clarity",
            Goal::Specificity => "specificity",
            Goal::Structure => "structure",
            Goal::Conciseness => "conciseness",
            Goal::Context => "context",
            Goal::TechnicalAccuracy => "technical_accuracy",
            Goal::Creativity => "creativity",
            Goal::Tone => "tone",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Goal::Clarity => "Remove ambiguity and make the intent explicit",
            Goal::Specificity => "Add concrete constraints, inputs and expected outputs",
            Goal::Structure => "Organize the prompt into clear sections or steps",
            Goal::Conciseness => "Cut redundant wording without losing meaning",
            Goal::Context => "Supply background the model needs to answer well",
            Goal::TechnicalAccuracy => "Use precise domain terminology",
            Goal::Creativity => "Encourage original, exploratory responses",
            Goal::Tone => "Set the voice and register of the response",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown goal: {0}")]
pub struct UnknownGoal(pub String);

impl FromStr for Goal {
    type Err = UnknownGoal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Goal::ALL
            .iter()
            .copied()
            .find(|goal| goal.as_str() == s)
            .ok_or_else(|| UnknownGoal(s.to_string()))
    }
}

/// Rejected before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("prompt is empty")]
    EmptyPrompt,
}

/// A prompt ready to be sent for optimization.
///
/// The prompt is trimmed and never empty. Goals are unique, keep the
/// caller's order and are never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationRequest {
    prompt: String,
    goals: Vec<Goal>,
}

impl OptimizationRequest {
    pub fn new(
        prompt: &str,
        goals: impl IntoIterator<Item = Goal>,
    ) -> Result<Self, RequestError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(RequestError::EmptyPrompt);
        }

        let mut unique = Vec::new();
        for goal in goals {
            if !unique.contains(&goal) {
                unique.push(goal);
            }
        }
        if unique.is_empty() {
            unique.push(Goal::DEFAULT);
        }

        Ok(Self {
            prompt: prompt.to_string(),
            goals: unique,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }
}

/// Result returned by the remote optimizer. Nothing here is computed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub optimized_prompt: String,
    pub confidence_score: f64,
    /// Goals the service actually applied, kept verbatim.
    #[serde(default, alias = "applied_goals")]
    pub goals_applied: Vec<String>,
    #[serde(default)]
    pub metadata: OptimizationMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}
