use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::Process;
use crate::contract::OutputContract;

/// Values substituted into `{placeholders}` at kickoff.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskInputs {
    values: BTreeMap<String, String>,
}

impl TaskInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Unknown placeholders are left as written.
    pub fn interpolate(&self, template: &str) -> String {
        self.values
            .iter()
            .fold(template.to_string(), |acc, (key, value)| {
                acc.replace(&format!("{{{key}}}"), value)
            })
    }
}

/// A unit of work owned by exactly one agent.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskSpec {
    pub name: String,
    pub description: String,
    pub expected_output: String,
    pub agent: String,
    pub context: Vec<String>,
    pub tool_inputs: Vec<String>,
    pub contract: OutputContract,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            expected_output: String::new(),
            agent: agent.into(),
            context: Vec::new(),
            tool_inputs: Vec::new(),
            contract: OutputContract::None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = expected_output.into();
        self
    }

    /// Earlier tasks whose raw output is injected before this one runs.
    pub fn context<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context = tasks.into_iter().map(Into::into).collect();
        self
    }

    /// Tool calls made before the first model call.
    pub fn tool_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tool_inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn contract(mut self, contract: OutputContract) -> Self {
        self.contract = contract;
        self
    }

    pub fn interpolated(&self, inputs: &TaskInputs) -> Self {
        let contract = match &self.contract {
            OutputContract::None => OutputContract::None,
            OutputContract::PriceTrend { ticket } => OutputContract::PriceTrend {
                ticket: inputs.interpolate(ticket),
            },
            OutputContract::NewsSentiment { assets } => OutputContract::NewsSentiment {
                assets: dedup(assets.iter().map(|a| inputs.interpolate(a))),
            },
            OutputContract::Newsletter => OutputContract::Newsletter,
        };
        Self {
            name: self.name.clone(),
            description: inputs.interpolate(&self.description),
            expected_output: inputs.interpolate(&self.expected_output),
            agent: self.agent.clone(),
            context: self.context.clone(),
            tool_inputs: dedup(self.tool_inputs.iter().map(|i| inputs.interpolate(i))),
            contract,
        }
    }

    /// Full prompt: description, expected output, dependency outputs in
    /// declaration order, then any delegated notes.
    pub fn prompt(&self, context: &[&TaskOutput], notes: &[DelegationNote]) -> String {
        let mut prompt = format!(
            "{}\n\nThis is the expected criteria for your final answer: {}\n\
             You MUST return the actual complete content as the final answer, not a summary.",
            self.description.trim(),
            self.expected_output.trim()
        );

        if !context.is_empty() {
            prompt.push_str("\n\nThis is the context you're working with:");
            for output in context {
                prompt.push_str(&format!(
                    "\n\n### {} ({})\n{}",
                    output.task,
                    output.agent,
                    output.raw.trim()
                ));
            }
        }

        if !notes.is_empty() {
            prompt.push_str("\n\nNotes from delegated work:");
            for note in notes {
                prompt.push_str(&format!(
                    "\n- {} was asked \"{}\" and answered: {}",
                    note.agent,
                    note.instruction,
                    note.answer.trim()
                ));
            }
        }
        prompt
    }
}

// Asking the same tool twice for the same asset adds nothing, e.g. ticket == BTC.
fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.iter().any(|o| o.eq_ignore_ascii_case(&item)) {
            out.push(item);
        }
    }
    out
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DelegationNote {
    pub agent: String,
    pub instruction: String,
    pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskOutput {
    pub task: String,
    pub agent: String,
    pub raw: String,
    pub violations: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub ticket: String,
    pub process: Process,
    pub manager_iterations: usize,
    pub outputs: Vec<TaskOutput>,
}

impl PipelineResult {
    /// The artifact shown to the operator.
    pub fn final_output(&self) -> Option<&TaskOutput> {
        self.outputs.last()
    }

    pub fn output(&self, task: &str) -> Option<&TaskOutput> {
        self.outputs.iter().find(|o| o.task == task)
    }
}
