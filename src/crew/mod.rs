pub mod manager;
pub mod task;

#[cfg(test)]
mod crew_tests;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::{Agent, AgentMemory, AgentProfile};
use crate::constants;
use crate::error::{PipelineError, Result};
use crate::llm::LanguageModel;
use crate::tools::ToolBox;
use manager::{Manager, ManagerDecision, ManagerView, TaskStatus};
use task::{DelegationNote, PipelineResult, TaskInputs, TaskOutput, TaskSpec};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    Sequential,
    #[default]
    Hierarchical,
}

/// Lifecycle of a single kickoff, logged as it advances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Dispatched,
    Running(String),
    Completed,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => f.write_str("idle"),
            RunPhase::Dispatched => f.write_str("dispatched"),
            RunPhase::Running(task) => write!(f, "running {task}"),
            RunPhase::Completed => f.write_str("completed"),
            RunPhase::Failed => f.write_str("failed"),
        }
    }
}

/// Agents and tasks checked against each other at build time.
pub struct Crew {
    agents: Vec<Agent>,
    tasks: Vec<TaskSpec>,
    /// Per task: owning agent index and dependency indices in declaration order.
    owners: Vec<usize>,
    dependencies: Vec<Vec<usize>>,
    process: Process,
    manager: Option<Arc<dyn Manager>>,
    max_manager_iterations: usize,
    llm: Arc<dyn LanguageModel>,
}

pub struct CrewBuilder {
    agents: Vec<AgentProfile>,
    tasks: Vec<TaskSpec>,
    tools: ToolBox,
    process: Process,
    manager: Option<Arc<dyn Manager>>,
    max_manager_iterations: usize,
    llm: Option<Arc<dyn LanguageModel>>,
}

impl Crew {
    pub fn builder() -> CrewBuilder {
        CrewBuilder {
            agents: Vec::new(),
            tasks: Vec::new(),
            tools: ToolBox::default(),
            process: Process::default(),
            manager: None,
            max_manager_iterations: constants::pipeline::DEFAULT_MANAGER_MAX_ITERATIONS,
            llm: None,
        }
    }

    pub fn process(&self) -> Process {
        self.process
    }

    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Run every task once and return their outputs in declaration order.
    pub async fn kickoff(&self, run_id: Uuid, inputs: &TaskInputs) -> Result<PipelineResult> {
        let mut run = Run::new(self, inputs);
        info!("🚀 [CREW] Run {} {} -> {}", run_id, RunPhase::Idle, RunPhase::Dispatched);
        run.phase = RunPhase::Dispatched;

        let outcome = match self.process {
            Process::Sequential => run.sequential().await,
            Process::Hierarchical => run.hierarchical().await,
        };

        if let Err(e) = outcome {
            run.phase = RunPhase::Failed;
            error!("❌ [CREW] Run {} {}: {}", run_id, run.phase, e);
            return Err(e);
        }

        run.phase = RunPhase::Completed;
        info!(
            "✅ [CREW] Run {} {} after {} manager iteration(s)",
            run_id, run.phase, run.iterations
        );

        let iterations = run.iterations;
        let outputs = run.outputs.into_iter().flatten().collect();
        Ok(PipelineResult {
            run_id,
            ticket: inputs.get("ticket").unwrap_or_default().to_string(),
            process: self.process,
            manager_iterations: iterations,
            outputs,
        })
    }
}

impl CrewBuilder {
    pub fn agent(mut self, profile: AgentProfile) -> Self {
        self.agents.push(profile);
        self
    }

    pub fn task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tools(mut self, tools: ToolBox) -> Self {
        self.tools = tools;
        self
    }

    pub fn process(mut self, process: Process) -> Self {
        self.process = process;
        self
    }

    pub fn manager(mut self, manager: Arc<dyn Manager>) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn max_manager_iterations(mut self, max: usize) -> Self {
        self.max_manager_iterations = max;
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn build(self) -> Result<Crew> {
        let llm = self
            .llm
            .ok_or_else(|| PipelineError::Build("crew has no language model".to_string()))?;
        if self.tasks.is_empty() {
            return Err(PipelineError::Build("crew has no tasks".to_string()));
        }
        if self.process == Process::Hierarchical && self.manager.is_none() {
            return Err(PipelineError::Build(
                "hierarchical process requires a manager".to_string(),
            ));
        }
        if self.max_manager_iterations == 0 {
            return Err(PipelineError::Build(
                "manager iteration cap must be at least 1".to_string(),
            ));
        }

        let mut roles = HashSet::new();
        let mut agents = Vec::with_capacity(self.agents.len());
        for profile in self.agents {
            if !roles.insert(profile.role().to_string()) {
                return Err(PipelineError::Build(format!(
                    "duplicate agent role '{}'",
                    profile.role()
                )));
            }
            let tool = match profile.tool() {
                Some(kind) => Some(self.tools.get(kind).ok_or_else(|| {
                    PipelineError::Build(format!(
                        "agent '{}' needs the {:?} tool but none was provided",
                        profile.role(),
                        kind
                    ))
                })?),
                None => None,
            };
            agents.push(Agent::new(profile, tool));
        }

        let mut owners = Vec::with_capacity(self.tasks.len());
        let mut dependencies = Vec::with_capacity(self.tasks.len());
        for (idx, task) in self.tasks.iter().enumerate() {
            if self.tasks[..idx].iter().any(|t| t.name == task.name) {
                return Err(PipelineError::Build(format!("duplicate task name '{}'", task.name)));
            }
            let owner = agents
                .iter()
                .position(|a| a.role() == task.agent)
                .ok_or_else(|| {
                    PipelineError::Build(format!(
                        "task '{}' is assigned to unknown agent '{}'",
                        task.name, task.agent
                    ))
                })?;

            let mut deps = Vec::with_capacity(task.context.len());
            for dep in &task.context {
                let dep_idx = self.tasks[..idx]
                    .iter()
                    .position(|t| &t.name == dep)
                    .ok_or_else(|| {
                        PipelineError::Build(format!(
                            "task '{}' depends on '{}', which is not declared before it",
                            task.name, dep
                        ))
                    })?;
                if !deps.contains(&dep_idx) {
                    deps.push(dep_idx);
                }
            }
            deps.sort_unstable();

            owners.push(owner);
            dependencies.push(deps);
        }

        Ok(Crew {
            agents,
            tasks: self.tasks,
            owners,
            dependencies,
            process: self.process,
            manager: self.manager,
            max_manager_iterations: self.max_manager_iterations,
            llm,
        })
    }
}

/// Mutable state of one kickoff.
struct Run<'a> {
    crew: &'a Crew,
    ticket: String,
    agents: Vec<Agent>,
    tasks: Vec<TaskSpec>,
    outputs: Vec<Option<TaskOutput>>,
    notes: Vec<Vec<DelegationNote>>,
    memories: Vec<AgentMemory>,
    iterations: usize,
    phase: RunPhase,
}

impl<'a> Run<'a> {
    fn new(crew: &'a Crew, inputs: &TaskInputs) -> Self {
        Self {
            crew,
            ticket: inputs.get("ticket").unwrap_or_default().to_string(),
            agents: crew.agents.iter().map(|a| a.interpolated(inputs)).collect(),
            tasks: crew.tasks.iter().map(|t| t.interpolated(inputs)).collect(),
            outputs: vec![None; crew.tasks.len()],
            notes: vec![Vec::new(); crew.tasks.len()],
            memories: vec![AgentMemory::default(); crew.agents.len()],
            iterations: 0,
            phase: RunPhase::Idle,
        }
    }

    fn completed(&self) -> usize {
        self.outputs.iter().filter(|o| o.is_some()).count()
    }

    fn is_ready(&self, idx: usize) -> bool {
        self.crew.dependencies[idx].iter().all(|d| self.outputs[*d].is_some())
    }

    fn task_index(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }

    fn agent_index(&self, role: &str) -> Option<usize> {
        self.agents.iter().position(|a| a.role().eq_ignore_ascii_case(role.trim()))
    }

    async fn sequential(&mut self) -> Result<()> {
        for idx in 0..self.tasks.len() {
            self.run_task(idx).await?;
        }
        Ok(())
    }

    async fn hierarchical(&mut self) -> Result<()> {
        let manager = self
            .crew
            .manager
            .clone()
            .ok_or_else(|| PipelineError::Build("hierarchical process requires a manager".to_string()))?;
        let max = self.crew.max_manager_iterations;
        let agent_roles: Vec<String> = self.agents.iter().map(|a| a.role().to_string()).collect();
        let mut feedback: Option<String> = None;

        loop {
            if self.completed() == self.tasks.len() {
                return Ok(());
            }
            if self.iterations >= max {
                return Err(PipelineError::ManagerIterationExceeded {
                    max_iterations: max,
                    completed: self.completed(),
                    total: self.tasks.len(),
                });
            }
            self.iterations += 1;

            let statuses = self.statuses();
            let view = ManagerView {
                ticket: &self.ticket,
                iteration: self.iterations,
                max_iterations: max,
                tasks: &statuses,
                agents: &agent_roles,
                feedback: feedback.as_deref(),
            };
            let decision = manager.decide(&view).await?;
            feedback = self.apply(decision).await?;
            if let Some(reason) = &feedback {
                warn!(
                    "🧭 [MANAGER] Iteration {}/{} wasted: {}",
                    self.iterations, max, reason
                );
            }
        }
    }

    /// Carry out a manager decision. `Ok(Some(reason))` means it was rejected.
    async fn apply(&mut self, decision: ManagerDecision) -> Result<Option<String>> {
        match decision {
            ManagerDecision::Run { task } => {
                let idx = match self.runnable(&task) {
                    Ok(idx) => idx,
                    Err(reason) => return Ok(Some(reason)),
                };
                self.run_task(idx).await?;
                Ok(None)
            }
            ManagerDecision::Delegate { task, agent, instruction } => {
                let idx = match self.runnable(&task) {
                    Ok(idx) => idx,
                    Err(reason) => return Ok(Some(reason)),
                };
                let owner = self.crew.owners[idx];
                if !self.agents[owner].profile().allow_delegation() {
                    info!(
                        "🧭 [MANAGER] {} does not delegate; it runs '{}' itself",
                        self.agents[owner].role(),
                        self.tasks[idx].name
                    );
                    self.run_task(idx).await?;
                    return Ok(None);
                }
                let Some(target) = self.agent_index(&agent) else {
                    return Ok(Some(format!("unknown agent '{agent}'")));
                };
                if target == owner {
                    self.run_task(idx).await?;
                    return Ok(None);
                }
                self.delegate(idx, target, instruction).await?;
                Ok(None)
            }
            ManagerDecision::Done => Ok(Some(format!(
                "{} of {} tasks are still pending",
                self.tasks.len() - self.completed(),
                self.tasks.len()
            ))),
            ManagerDecision::Invalid { reason } => Ok(Some(reason)),
        }
    }

    fn runnable(&self, name: &str) -> std::result::Result<usize, String> {
        let idx = self
            .task_index(name)
            .ok_or_else(|| format!("unknown task '{name}'"))?;
        if self.outputs[idx].is_some() {
            return Err(format!("task '{}' is already complete", self.tasks[idx].name));
        }
        if !self.is_ready(idx) {
            let pending: Vec<&str> = self.crew.dependencies[idx]
                .iter()
                .filter(|d| self.outputs[**d].is_none())
                .map(|d| self.tasks[*d].name.as_str())
                .collect();
            return Err(format!(
                "task '{}' is waiting on {}",
                self.tasks[idx].name,
                pending.join(", ")
            ));
        }
        Ok(idx)
    }

    fn statuses(&self) -> Vec<TaskStatus> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| {
                let owner = &self.agents[self.crew.owners[idx]];
                TaskStatus {
                    name: task.name.clone(),
                    agent: owner.role().to_string(),
                    summary: first_line(&task.description),
                    depends_on: self.crew.dependencies[idx]
                        .iter()
                        .map(|d| self.tasks[*d].name.clone())
                        .collect(),
                    ready: self.is_ready(idx),
                    completed: self.outputs[idx].is_some(),
                    delegation_allowed: owner.profile().allow_delegation(),
                    output_preview: self.outputs[idx]
                        .as_ref()
                        .map(|o| preview(&o.raw, constants::pipeline::MANAGER_PREVIEW_CHARS)),
                }
            })
            .collect()
    }

    async fn run_task(&mut self, idx: usize) -> Result<()> {
        let owner = self.crew.owners[idx];
        let task = &self.tasks[idx];
        self.phase = RunPhase::Running(task.name.clone());
        info!("📋 [CREW] {} ({})", self.phase, self.agents[owner].role());

        let context: Vec<&TaskOutput> = self.crew.dependencies[idx]
            .iter()
            .filter_map(|d| self.outputs[*d].as_ref())
            .collect();
        let prompt = task.prompt(&context, &self.notes[idx]);

        let raw = self.agents[owner]
            .execute(&prompt, &task.tool_inputs, self.crew.llm.as_ref(), &mut self.memories[owner])
            .await?;

        let violations = task.contract.check(&raw);
        for violation in &violations {
            warn!("⚠️ [CREW] Task '{}' output: {}", task.name, violation);
        }

        self.outputs[idx] = Some(TaskOutput {
            task: task.name.clone(),
            agent: self.agents[owner].role().to_string(),
            raw,
            violations,
        });
        Ok(())
    }

    async fn delegate(&mut self, idx: usize, target: usize, instruction: String) -> Result<()> {
        let task = &self.tasks[idx];
        let owner_role = self.agents[self.crew.owners[idx]].role().to_string();
        let instruction = if instruction.trim().is_empty() {
            first_line(&task.description)
        } else {
            instruction
        };
        info!(
            "🧭 [MANAGER] Delegating part of '{}' from {} to {}",
            task.name,
            owner_role,
            self.agents[target].role()
        );

        let context: Vec<&TaskOutput> = self.crew.dependencies[idx]
            .iter()
            .filter_map(|d| self.outputs[*d].as_ref())
            .collect();
        let mut prompt = format!(
            "{instruction}\n\nThis is part of the task '{}' owned by {owner_role}:\n{}",
            task.name,
            task.description.trim()
        );
        for output in context {
            prompt.push_str(&format!("\n\n### {} ({})\n{}", output.task, output.agent, output.raw.trim()));
        }

        let answer = self.agents[target]
            .execute(&prompt, &[], self.crew.llm.as_ref(), &mut self.memories[target])
            .await?;

        self.notes[idx].push(DelegationNote {
            agent: self.agents[target].role().to_string(),
            instruction,
            answer,
        });
        Ok(())
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn preview(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
