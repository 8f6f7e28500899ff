use serde::{Deserialize, Serialize};

/// Task categories the engine classifies input into, in inference priority
/// order (see `TaskCategory::ALL`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Analysis,
    Creative,
    Technical,
    Multimodal,
}

impl TaskCategory {
    /// Fixed priority order used by keyword inference and capability
    /// fallback. First match wins.
    pub const ALL: [TaskCategory; 4] = [
        TaskCategory::Analysis,
        TaskCategory::Creative,
        TaskCategory::Technical,
        TaskCategory::Multimodal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Creative => "creative",
            Self::Technical => "technical",
            Self::Multimodal => "multimodal",
        }
    }

    /// Parse a caller-supplied capability tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "analysis" => Some(Self::Analysis),
            "creative" => Some(Self::Creative),
            "technical" => Some(Self::Technical),
            "multimodal" => Some(Self::Multimodal),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static registry entry: per-category affinity plus cost/latency/load
/// weights, all in `[0, 1]`. Fixed at process start, read-only after.
#[derive(Clone, Debug)]
pub struct AgentProfile {
    pub id: String,
    pub analysis: f64,
    pub creative: f64,
    pub technical: f64,
    pub multimodal: f64,
    pub cost: f64,
    pub latency: f64,
    pub load: f64,
}

impl AgentProfile {
    pub fn affinity(&self, category: TaskCategory) -> f64 {
        match category {
            TaskCategory::Analysis => self.analysis,
            TaskCategory::Creative => self.creative,
            TaskCategory::Technical => self.technical,
            TaskCategory::Multimodal => self.multimodal,
        }
    }

    /// Profile assumed for agent ids absent from the registry: indifferent
    /// on every dimension.
    pub fn uniform(id: &str) -> Self {
        Self {
            id: id.to_string(),
            analysis: 0.5,
            creative: 0.5,
            technical: 0.5,
            multimodal: 0.5,
            cost: 0.5,
            latency: 0.5,
            load: 0.5,
        }
    }
}

/// Built-in three-agent registry. Registration order is the tie-break order
/// for selection, so it is part of the routing contract.
pub fn default_registry() -> Vec<AgentProfile> {
    vec![
        AgentProfile {
            id: "Claude".to_string(),
            analysis: 0.9,
            creative: 0.4,
            technical: 0.5,
            multimodal: 0.3,
            cost: 0.4,
            latency: 0.5,
            load: 0.2,
        },
        AgentProfile {
            id: "GPT-4".to_string(),
            analysis: 0.7,
            creative: 0.9,
            technical: 0.6,
            multimodal: 0.5,
            cost: 0.5,
            latency: 0.6,
            load: 0.3,
        },
        AgentProfile {
            id: "Gemini".to_string(),
            analysis: 0.6,
            creative: 0.6,
            technical: 0.9,
            multimodal: 0.9,
            cost: 0.6,
            latency: 0.6,
            load: 0.3,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serde_is_lowercase() {
        let json = serde_json::to_string(&TaskCategory::Multimodal).unwrap();
        assert_eq!(json, r#""multimodal""#);
        let parsed: TaskCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, TaskCategory::Multimodal);
    }

    #[test]
    fn from_tag_rejects_unknown() {
        assert_eq!(TaskCategory::from_tag("analysis"), Some(TaskCategory::Analysis));
        assert_eq!(TaskCategory::from_tag("juggling"), None);
    }

    #[test]
    fn default_registry_order_is_stable() {
        let ids: Vec<String> = default_registry().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["Claude", "GPT-4", "Gemini"]);
    }

    #[test]
    fn uniform_profile_is_indifferent() {
        let p = AgentProfile::uniform("mystery");
        for cat in TaskCategory::ALL {
            assert_eq!(p.affinity(cat), 0.5);
        }
    }
}
