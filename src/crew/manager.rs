//! Hierarchical coordination decisions
//!
//! The manager only chooses what happens next; the runner validates every
//! decision and owns the iteration budget.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::llm::{ChatMessage, LanguageModel};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManagerDecision {
    Run {
        task: String,
    },
    Delegate {
        task: String,
        agent: String,
        instruction: String,
    },
    Done,
    /// The manager replied with something that is not a decision.
    Invalid {
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskStatus {
    pub name: String,
    pub agent: String,
    pub summary: String,
    pub depends_on: Vec<String>,
    pub ready: bool,
    pub completed: bool,
    pub delegation_allowed: bool,
    pub output_preview: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ManagerView<'a> {
    pub ticket: &'a str,
    pub iteration: usize,
    pub max_iterations: usize,
    pub tasks: &'a [TaskStatus],
    pub agents: &'a [String],
    /// Feedback about the previous decision, if it was rejected.
    pub feedback: Option<&'a str>,
}

#[async_trait]
pub trait Manager: Send + Sync {
    async fn decide(&self, view: &ManagerView<'_>) -> Result<ManagerDecision>;
}

/// Manager backed by the language model, answering in JSON.
pub struct LlmManager {
    llm: Arc<dyn LanguageModel>,
}

impl LlmManager {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    fn system_prompt() -> &'static str {
        r#"You are the Crew Manager. You coordinate a team of analysts to produce a stock newsletter.
Each turn you choose exactly one next step:
- run a task that is ready (all of its dependencies are complete),
- delegate part of a task whose owner allows delegation to another team member, with a concrete instruction,
- or declare the work done once every task is complete.

Output MUST be a valid JSON object with the following structure:
{
    "action": "run" | "delegate" | "done",
    "task": "task name",
    "agent": "team member role (delegate only)",
    "instruction": "what the team member should do (delegate only)"
}
"#
    }

    fn describe(view: &ManagerView<'_>) -> String {
        let mut out = format!(
            "Ticket: {}\nIteration {}/{}\nTeam: {}\n\nTasks:\n",
            view.ticket,
            view.iteration,
            view.max_iterations,
            view.agents.join(", ")
        );
        for task in view.tasks {
            let state = if task.completed {
                "complete"
            } else if task.ready {
                "ready"
            } else {
                "waiting"
            };
            out.push_str(&format!(
                "- {} [{}] owner: {}{}{}\n  {}\n",
                task.name,
                state,
                task.agent,
                if task.depends_on.is_empty() {
                    String::new()
                } else {
                    format!(", needs: {}", task.depends_on.join(", "))
                },
                if task.delegation_allowed { ", delegation allowed" } else { "" },
                task.summary
            ));
            if let Some(preview) = &task.output_preview {
                out.push_str(&format!("  output so far: {preview}\n"));
            }
        }
        if let Some(feedback) = view.feedback {
            out.push_str(&format!("\nYour previous decision was rejected: {feedback}\n"));
        }
        out
    }
}

#[async_trait]
impl Manager for LlmManager {
    async fn decide(&self, view: &ManagerView<'_>) -> Result<ManagerDecision> {
        let messages = [
            ChatMessage::system(Self::system_prompt()),
            ChatMessage::user(Self::describe(view)),
        ];
        let reply = self.llm.chat(&messages).await?;
        let decision = parse_decision(&reply);
        match &decision {
            ManagerDecision::Invalid { reason } => {
                warn!("🧭 [MANAGER] Unusable decision: {}", reason);
            }
            other => info!("🧭 [MANAGER] Decision: {:?}", other),
        }
        Ok(decision)
    }
}

#[derive(Deserialize)]
struct RawDecision {
    action: String,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    agent: Option<String>,
    #[serde(default)]
    instruction: Option<String>,
}

pub fn parse_decision(reply: &str) -> ManagerDecision {
    let json_str = match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => reply,
    };

    let raw: RawDecision = match serde_json::from_str(json_str) {
        Ok(raw) => raw,
        Err(e) => {
            return ManagerDecision::Invalid {
                reason: format!("not a JSON decision ({e})"),
            }
        }
    };

    let task = raw.task.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    match (raw.action.trim().to_lowercase().as_str(), task) {
        ("done", _) => ManagerDecision::Done,
        ("run", Some(task)) => ManagerDecision::Run { task },
        ("delegate", Some(task)) => match raw.agent.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()) {
            Some(agent) => ManagerDecision::Delegate {
                task,
                agent,
                instruction: raw.instruction.unwrap_or_default().trim().to_string(),
            },
            None => ManagerDecision::Invalid {
                reason: "delegate decision without an agent".to_string(),
            },
        },
        (action, None) if action == "run" || action == "delegate" => ManagerDecision::Invalid {
            reason: format!("'{action}' decision without a task"),
        },
        (action, _) => ManagerDecision::Invalid {
            reason: format!("unknown action '{action}'"),
        },
    }
}
