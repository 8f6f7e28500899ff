use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;

use synapse_core::SessionId;
use synapse_state::{SharedState, StateError};

use crate::engine::RoutingEngine;
use crate::profiles::TaskCategory;

/// Routed-call log entries keep at most this many characters of the input.
const RECORD_TEXT_LIMIT: usize = 100;

/// Fixed collaboration plan, assigned round-robin across agents.
const PLAN_STEPS: &[&str] = &[
    "1. Understand task",
    "2. Plan approach",
    "3. Execute",
    "4. Review",
];

/// Append-only log entry, one per successful route call. Never mutated or
/// deleted within the process lifetime; growth is unbounded by design.
#[derive(Clone, Debug, Serialize)]
pub struct RoutingRecord {
    pub timestamp: String,
    pub session_id: String,
    pub message: String,
    pub selected_agent: String,
    pub category: TaskCategory,
}

#[derive(Clone, Debug, Serialize)]
pub struct Intent {
    pub primary_task: TaskCategory,
}

/// Result of a route call, serialized verbatim into the tool response.
#[derive(Clone, Debug, Serialize)]
pub struct RouteOutcome {
    pub status: &'static str,
    pub agent: String,
    pub intent: Intent,
    pub suggestion: String,
    pub timestamp: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ShareOutcome {
    pub status: &'static str,
    pub key: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Assignment {
    pub step: &'static str,
    pub agent: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Orchestration {
    pub status: &'static str,
    pub task: String,
    pub assignments: Vec<Assignment>,
}

/// Coordination hub between sessions and agents: owns the routing engine,
/// the shared-state handle, and the routing history.
pub struct AgentBus {
    state: Arc<SharedState>,
    engine: RoutingEngine,
    // Sessions append concurrently; a single mutex serializes the appends.
    history: Mutex<Vec<RoutingRecord>>,
}

impl AgentBus {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self::with_engine(state, RoutingEngine::default())
    }

    pub fn with_engine(state: Arc<SharedState>, engine: RoutingEngine) -> Self {
        Self {
            state,
            engine,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Pick an agent for the message and log exactly one routing record.
    pub fn route_message(
        &self,
        message: &str,
        capabilities: &[String],
        context: &serde_json::Value,
        session_id: &SessionId,
    ) -> RouteOutcome {
        let (agent, category) = self.engine.pick(message, capabilities);
        let timestamp = Utc::now().to_rfc3339();

        tracing::debug!(
            session_id = %session_id,
            agent = %agent,
            category = %category,
            has_context = !context.as_object().map_or(true, |o| o.is_empty()),
            "routed message"
        );

        self.history.lock().push(RoutingRecord {
            timestamp: timestamp.clone(),
            session_id: session_id.to_string(),
            message: truncate_chars(message, RECORD_TEXT_LIMIT),
            selected_agent: agent.clone(),
            category,
        });

        RouteOutcome {
            status: "routed",
            agent: agent.clone(),
            intent: Intent { primary_task: category },
            suggestion: format!("Use {agent} for this request"),
            timestamp,
        }
    }

    /// Publish a value into the shared state for other sessions to read.
    pub async fn share_context(
        &self,
        key: &str,
        value_text: &str,
        session_id: &SessionId,
    ) -> Result<ShareOutcome, StateError> {
        self.state.set(key, value_text).await?;
        tracing::debug!(session_id = %session_id, key = %key, "context shared");
        Ok(ShareOutcome {
            status: "shared",
            key: key.to_string(),
        })
    }

    /// Spread the fixed plan steps round-robin over the given agents (the
    /// full registry when none are named). Pure: no history side effect.
    pub fn orchestrate_collaboration(&self, task: &str, agents: &[String]) -> Orchestration {
        let agents = if agents.is_empty() {
            self.engine.agent_ids()
        } else {
            agents.to_vec()
        };

        let assignments = if agents.is_empty() {
            Vec::new()
        } else {
            PLAN_STEPS
                .iter()
                .enumerate()
                .map(|(i, step)| Assignment {
                    step,
                    agent: agents[i % agents.len()].clone(),
                })
                .collect()
        };

        Orchestration {
            status: "orchestrated",
            task: task.to_string(),
            assignments,
        }
    }

    /// Full shared-state snapshot for the resource read path.
    pub async fn shared_snapshot(&self) -> Result<HashMap<String, String>, StateError> {
        self.state.dump_all().await
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn history_snapshot(&self) -> Vec<RoutingRecord> {
        self.history.lock().clone()
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> AgentBus {
        AgentBus::new(Arc::new(SharedState::in_memory()))
    }

    #[test]
    fn route_appends_one_record() {
        let bus = bus();
        let sid = SessionId::new();
        let outcome = bus.route_message("analyze quarterly numbers", &[], &serde_json::json!({}), &sid);

        assert_eq!(outcome.status, "routed");
        assert_eq!(outcome.agent, "Claude");
        assert_eq!(outcome.intent.primary_task, TaskCategory::Analysis);
        assert_eq!(outcome.suggestion, "Use Claude for this request");

        assert_eq!(bus.history_len(), 1);
        let records = bus.history_snapshot();
        assert_eq!(records[0].session_id, sid.to_string());
        assert_eq!(records[0].selected_agent, "Claude");
    }

    #[test]
    fn route_truncates_long_input() {
        let bus = bus();
        let long = "analyze ".repeat(50);
        bus.route_message(&long, &[], &serde_json::json!({}), &SessionId::new());
        let records = bus.history_snapshot();
        assert_eq!(records[0].message.chars().count(), 100);
    }

    #[test]
    fn route_truncation_respects_char_boundaries() {
        let bus = bus();
        let text = format!("analyze {}", "é".repeat(200));
        bus.route_message(&text, &[], &serde_json::json!({}), &SessionId::new());
        let records = bus.history_snapshot();
        assert_eq!(records[0].message.chars().count(), 100);
    }

    #[tokio::test]
    async fn share_context_writes_through() {
        let state = Arc::new(SharedState::in_memory());
        let bus = AgentBus::new(Arc::clone(&state));
        let outcome = bus
            .share_context("sprint", r#"{"goal":"ship"}"#, &SessionId::new())
            .await
            .unwrap();
        assert_eq!(outcome.status, "shared");
        assert_eq!(outcome.key, "sprint");
        assert_eq!(
            state.get("sprint").await.unwrap().as_deref(),
            Some(r#"{"goal":"ship"}"#)
        );
    }

    #[test]
    fn orchestrate_defaults_to_full_registry_round_robin() {
        let bus = bus();
        let plan = bus.orchestrate_collaboration("x", &[]);

        assert_eq!(plan.status, "orchestrated");
        assert_eq!(plan.assignments.len(), 4);
        let agents: Vec<&str> = plan.assignments.iter().map(|a| a.agent.as_str()).collect();
        assert_eq!(agents, vec!["Claude", "GPT-4", "Gemini", "Claude"]);

        // 4 steps over 3 agents: each agent appears steps/agents + {0,1} times.
        for id in ["Claude", "GPT-4", "Gemini"] {
            let count = agents.iter().filter(|a| **a == id).count();
            assert!(count == 1 || count == 2, "{id} appeared {count} times");
        }
    }

    #[test]
    fn orchestrate_uses_named_agents() {
        let bus = bus();
        let named = vec!["alpha".to_string(), "beta".to_string()];
        let plan = bus.orchestrate_collaboration("review the draft", &named);
        let agents: Vec<&str> = plan.assignments.iter().map(|a| a.agent.as_str()).collect();
        assert_eq!(agents, vec!["alpha", "beta", "alpha", "beta"]);
    }

    #[test]
    fn orchestrate_has_no_history_side_effect() {
        let bus = bus();
        bus.orchestrate_collaboration("x", &[]);
        assert_eq!(bus.history_len(), 0);
    }

    #[tokio::test]
    async fn concurrent_routes_each_logged_once() {
        let bus = Arc::new(bus());
        let mut handles = Vec::new();
        for _ in 0..2 {
            let bus = Arc::clone(&bus);
            handles.push(tokio::spawn(async move {
                let sid = SessionId::new();
                let outcome = bus.route_message("analyze this", &[], &serde_json::json!({}), &sid);
                (sid, outcome)
            }));
        }

        let mut session_ids = Vec::new();
        for h in handles {
            let (sid, outcome) = h.await.unwrap();
            assert_eq!(outcome.status, "routed");
            session_ids.push(sid.to_string());
        }

        let records = bus.history_snapshot();
        assert_eq!(records.len(), 2);
        for sid in session_ids {
            assert_eq!(records.iter().filter(|r| r.session_id == sid).count(), 1);
        }
    }

    #[test]
    fn route_outcome_serializes() {
        let bus = bus();
        let outcome = bus.route_message("analyze", &[], &serde_json::json!({}), &SessionId::new());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "routed");
        assert_eq!(json["intent"]["primary_task"], "analysis");
        assert!(json["timestamp"].is_string());
    }
}
