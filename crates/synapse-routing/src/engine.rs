use crate::profiles::{AgentProfile, TaskCategory};

// Keyword tables for task inference, matched case-insensitively in the
// priority order of TaskCategory::ALL. Policy constants, not learned.
const ANALYSIS_KEYWORDS: &[&str] = &["analyze", "research", "compare", "insight"];
const CREATIVE_KEYWORDS: &[&str] = &["design", "write", "story", "create"];
const TECHNICAL_KEYWORDS: &[&str] = &["code", "debug", "implement", "optimize"];
const MULTIMODAL_KEYWORDS: &[&str] = &["image", "video", "audio"];

fn keywords_for(category: TaskCategory) -> &'static [&'static str] {
    match category {
        TaskCategory::Analysis => ANALYSIS_KEYWORDS,
        TaskCategory::Creative => CREATIVE_KEYWORDS,
        TaskCategory::Technical => TECHNICAL_KEYWORDS,
        TaskCategory::Multimodal => MULTIMODAL_KEYWORDS,
    }
}

/// Scoring weights. The specific values are heuristic policy constants;
/// keep them adjustable rather than baked into the formula.
#[derive(Clone, Copy, Debug)]
pub struct ScoreWeights {
    pub affinity: f64,
    pub cost: f64,
    pub latency: f64,
    pub load: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            affinity: 0.7,
            cost: 0.15,
            latency: 0.10,
            load: 0.05,
        }
    }
}

/// Stateless agent selection over a fixed registry. Every method is a pure
/// function of the static profiles; selection has no hidden randomness.
pub struct RoutingEngine {
    registry: Vec<AgentProfile>,
    weights: ScoreWeights,
}

impl RoutingEngine {
    pub fn new(registry: Vec<AgentProfile>) -> Self {
        Self {
            registry,
            weights: ScoreWeights::default(),
        }
    }

    pub fn with_weights(registry: Vec<AgentProfile>, weights: ScoreWeights) -> Self {
        Self { registry, weights }
    }

    /// Registered agent ids in registration order.
    pub fn agent_ids(&self) -> Vec<String> {
        self.registry.iter().map(|p| p.id.clone()).collect()
    }

    /// Classify free text. Keyword match wins over capability tags; the
    /// capability fallback walks the same priority order; Analysis is the
    /// default of last resort.
    pub fn infer_task(&self, text: &str, capabilities: &[String]) -> TaskCategory {
        let lowered = text.to_lowercase();
        for category in TaskCategory::ALL {
            if keywords_for(category).iter().any(|k| lowered.contains(k)) {
                return category;
            }
        }
        for category in TaskCategory::ALL {
            if capabilities.iter().any(|c| TaskCategory::from_tag(c) == Some(category)) {
                return category;
            }
        }
        TaskCategory::Analysis
    }

    /// Weighted score for one agent on one category. Unknown ids score
    /// against a uniform profile rather than failing.
    pub fn score(&self, agent_id: &str, category: TaskCategory) -> f64 {
        let uniform;
        let profile = match self.registry.iter().find(|p| p.id == agent_id) {
            Some(p) => p,
            None => {
                uniform = AgentProfile::uniform(agent_id);
                &uniform
            }
        };
        self.weights.affinity * profile.affinity(category)
            + self.weights.cost * (1.0 - profile.cost)
            + self.weights.latency * (1.0 - profile.latency)
            + self.weights.load * (1.0 - profile.load)
    }

    /// Select the highest-scoring registered agent for the text. Ties go to
    /// the earlier-registered agent, keeping selection reproducible.
    pub fn pick(&self, text: &str, capabilities: &[String]) -> (String, TaskCategory) {
        let category = self.infer_task(text, capabilities);
        let mut best: Option<(&AgentProfile, f64)> = None;
        for profile in &self.registry {
            let score = self.score(&profile.id, category);
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((profile, score)),
            }
        }
        let id = best.map(|(p, _)| p.id.clone()).unwrap_or_default();
        (id, category)
    }
}

impl Default for RoutingEngine {
    fn default() -> Self {
        Self::new(crate::profiles::default_registry())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_inference_basic() {
        let engine = RoutingEngine::default();
        assert_eq!(engine.infer_task("please analyze this dataset", &[]), TaskCategory::Analysis);
        assert_eq!(engine.infer_task("write a short story", &[]), TaskCategory::Creative);
        assert_eq!(engine.infer_task("debug the parser", &[]), TaskCategory::Technical);
        assert_eq!(engine.infer_task("caption this image", &[]), TaskCategory::Multimodal);
    }

    #[test]
    fn keyword_priority_analysis_beats_technical() {
        let engine = RoutingEngine::default();
        // Contains both an analysis and a technical keyword; priority order
        // resolves to analysis.
        assert_eq!(
            engine.infer_task("analyze this code for bugs", &[]),
            TaskCategory::Analysis
        );
    }

    #[test]
    fn inference_is_case_insensitive() {
        let engine = RoutingEngine::default();
        assert_eq!(engine.infer_task("ANALYZE the numbers", &[]), TaskCategory::Analysis);
    }

    #[test]
    fn capability_fallback_in_priority_order() {
        let engine = RoutingEngine::default();
        let caps = vec!["technical".to_string(), "creative".to_string()];
        // No keyword match: creative outranks technical in priority order
        // even though technical appears first in the list.
        assert_eq!(engine.infer_task("hello there", &caps), TaskCategory::Creative);
    }

    #[test]
    fn no_match_defaults_to_analysis() {
        let engine = RoutingEngine::default();
        assert_eq!(engine.infer_task("hello there", &[]), TaskCategory::Analysis);
        let caps = vec!["juggling".to_string()];
        assert_eq!(engine.infer_task("hello there", &caps), TaskCategory::Analysis);
    }

    #[test]
    fn score_matches_weighted_formula() {
        let engine = RoutingEngine::default();
        // Claude on analysis: 0.7*0.9 + 0.15*(1-0.4) + 0.10*(1-0.5) + 0.05*(1-0.2)
        let expected = 0.7 * 0.9 + 0.15 * 0.6 + 0.10 * 0.5 + 0.05 * 0.8;
        assert!((engine.score("Claude", TaskCategory::Analysis) - expected).abs() < 1e-9);
    }

    #[test]
    fn unknown_agent_scores_uniform() {
        let engine = RoutingEngine::default();
        let expected = 0.7 * 0.5 + 0.15 * 0.5 + 0.10 * 0.5 + 0.05 * 0.5;
        assert!((engine.score("mystery", TaskCategory::Creative) - expected).abs() < 1e-9);
    }

    #[test]
    fn pick_is_deterministic() {
        let engine = RoutingEngine::default();
        let (first, category) = engine.pick("please analyze this dataset", &[]);
        for _ in 0..20 {
            let (again, cat) = engine.pick("please analyze this dataset", &[]);
            assert_eq!(again, first);
            assert_eq!(cat, category);
        }
        assert_eq!(first, "Claude");
        assert_eq!(category, TaskCategory::Analysis);
    }

    #[test]
    fn pick_ties_break_by_registration_order() {
        let mut a = AgentProfile::uniform("first");
        let mut b = AgentProfile::uniform("second");
        a.analysis = 0.8;
        b.analysis = 0.8;
        let engine = RoutingEngine::new(vec![a, b]);
        let (id, _) = engine.pick("analyze", &[]);
        assert_eq!(id, "first");
    }

    #[test]
    fn technical_text_prefers_gemini() {
        let engine = RoutingEngine::default();
        let (id, category) = engine.pick("optimize this hot loop", &[]);
        assert_eq!(category, TaskCategory::Technical);
        assert_eq!(id, "Gemini");
    }
}
