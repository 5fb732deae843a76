pub mod news_analyst;
pub mod newsletter_writer;
pub mod price_analyst;


use std::sync::Arc;
use tracing::{debug, info};

use crate::crew::task::TaskInputs;
use crate::error::{PipelineError, Result};
use crate::llm::{ChatMessage, LanguageModel};
use crate::tools::{Tool, ToolKind};

const FINAL_ANSWER: &str = "Final Answer:";
const ACTION_INPUT: &str = "Action Input:";
const FORCE_FINAL: &str =
    "You have reached the maximum number of steps. Do not call any tool. Give your Final Answer now.";

/// Role configuration for one agent. Texts may carry `{placeholders}`
/// resolved once per run.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentProfile {
    role: String,
    goal: String,
    backstory: String,
    max_iter: usize,
    memory: bool,
    tool: Option<ToolKind>,
    allow_delegation: bool,
}

impl AgentProfile {
    pub fn builder(role: impl Into<String>) -> AgentProfileBuilder {
        AgentProfileBuilder {
            role: role.into(),
            goal: String::new(),
            backstory: String::new(),
            max_iter: 1,
            memory: false,
            tool: None,
            allow_delegation: false,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn memory(&self) -> bool {
        self.memory
    }

    pub fn tool(&self) -> Option<ToolKind> {
        self.tool
    }

    pub fn allow_delegation(&self) -> bool {
        self.allow_delegation
    }

    /// The role name is an identifier and is left untouched.
    pub fn interpolated(&self, inputs: &TaskInputs) -> Self {
        Self {
            goal: inputs.interpolate(&self.goal),
            backstory: inputs.interpolate(&self.backstory),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug)]
pub struct AgentProfileBuilder {
    role: String,
    goal: String,
    backstory: String,
    max_iter: usize,
    memory: bool,
    tool: Option<ToolKind>,
    allow_delegation: bool,
}

impl AgentProfileBuilder {
    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn memory(mut self, memory: bool) -> Self {
        self.memory = memory;
        self
    }

    pub fn tool(mut self, tool: ToolKind) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    pub fn build(self) -> Result<AgentProfile> {
        let role = self.role.trim().to_string();
        if role.is_empty() {
            return Err(PipelineError::Build("agent role must not be empty".to_string()));
        }
        if self.goal.trim().is_empty() {
            return Err(PipelineError::Build(format!("agent '{role}' has no goal")));
        }
        if self.backstory.trim().is_empty() {
            return Err(PipelineError::Build(format!("agent '{role}' has no backstory")));
        }
        if self.max_iter == 0 {
            return Err(PipelineError::Build(format!(
                "agent '{role}' needs an iteration cap of at least 1"
            )));
        }
        Ok(AgentProfile {
            role,
            goal: self.goal,
            backstory: self.backstory,
            max_iter: self.max_iter,
            memory: self.memory,
            tool: self.tool,
            allow_delegation: self.allow_delegation,
        })
    }
}

/// Prompt/answer turns an agent keeps for the rest of a run.
#[derive(Clone, Debug, Default)]
pub struct AgentMemory {
    turns: Vec<ChatMessage>,
}

impl AgentMemory {
    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn record(&mut self, prompt: &str, answer: &str) {
        self.turns.push(ChatMessage::user(prompt));
        self.turns.push(ChatMessage::assistant(answer));
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// One parsed model reply inside the agent loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentStep {
    Action { input: String },
    Final(String),
}

pub fn parse_step(reply: &str) -> AgentStep {
    if let Some(idx) = reply.rfind(FINAL_ANSWER) {
        let answer = reply[idx + FINAL_ANSWER.len()..].trim();
        if !answer.is_empty() {
            return AgentStep::Final(answer.to_string());
        }
    }

    let action = reply
        .lines()
        .find_map(|line| line.trim().strip_prefix(ACTION_INPUT))
        .map(str::trim)
        .filter(|input| !input.is_empty());

    match action {
        Some(input) => AgentStep::Action { input: input.to_string() },
        None => AgentStep::Final(reply.trim().to_string()),
    }
}

/// A profile bound to its tool.
#[derive(Clone)]
pub struct Agent {
    profile: AgentProfile,
    tool: Option<Arc<dyn Tool>>,
}

impl Agent {
    pub fn new(profile: AgentProfile, tool: Option<Arc<dyn Tool>>) -> Self {
        Self { profile, tool }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn role(&self) -> &str {
        self.profile.role()
    }

    pub fn interpolated(&self, inputs: &TaskInputs) -> Self {
        Self {
            profile: self.profile.interpolated(inputs),
            tool: self.tool.clone(),
        }
    }

    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are {}.\n{}\n\nYour personal goal is: {}\n\n",
            self.profile.role,
            self.profile.backstory.trim(),
            self.profile.goal.trim()
        );
        match &self.tool {
            Some(tool) => prompt.push_str(&format!(
                "You have access to the following tool:\n{}: {}\n\n\
                 To use the tool, reply with exactly:\nAction: {}\nAction Input: <input>\n\
                 You will receive an Observation with the result. Call it once per input, as many times as you need.\n\n\
                 When you know the answer, reply with:\nFinal Answer: <your complete answer>",
                tool.name(),
                tool.description(),
                tool.name()
            )),
            None => prompt.push_str("Reply with:\nFinal Answer: <your complete answer>"),
        }
        prompt
    }

    /// Run the reasoning loop for one prompt.
    ///
    /// `tool_inputs` are invoked before the first model call and their
    /// observations appended to the prompt. The loop stops at the agent's
    /// iteration cap; the last step is told to answer and its reply is final.
    pub async fn execute(
        &self,
        prompt: &str,
        tool_inputs: &[String],
        llm: &dyn LanguageModel,
        memory: &mut AgentMemory,
    ) -> Result<String> {
        let role = self.role();
        let max_iter = self.profile.max_iter;

        let mut task_prompt = prompt.to_string();
        if let Some(tool) = self.tool.as_ref().filter(|_| !tool_inputs.is_empty()) {
            task_prompt.push_str("\n\nTool results gathered for this task:\n");
            for input in tool_inputs {
                let observation = tool.invoke(input).await;
                task_prompt.push_str(&format!("\n[{}: {}]\n{}\n", tool.name(), input, observation.trim_end()));
            }
        }

        let mut messages = vec![ChatMessage::system(self.system_prompt())];
        if self.profile.memory {
            messages.extend(memory.turns().iter().cloned());
        }
        messages.push(ChatMessage::user(task_prompt.clone()));

        let mut step = 0;
        let answer = loop {
            step += 1;
            let last = step >= max_iter;
            if last && step > 1 {
                messages.push(ChatMessage::user(FORCE_FINAL));
            }

            info!("🤖 [AGENT] {} step {}/{}", role, step, max_iter);
            let reply = llm.chat(&messages).await?;
            debug!("🤖 [AGENT] {} replied: {}", role, reply);

            match (parse_step(&reply), last) {
                (AgentStep::Final(text), _) => break text,
                (AgentStep::Action { .. }, true) => break reply.trim().to_string(),
                (AgentStep::Action { input }, false) => {
                    let observation = match &self.tool {
                        Some(tool) => tool.invoke(&input).await,
                        None => "No tool is available to you. Answer directly with a Final Answer.".to_string(),
                    };
                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(format!("Observation: {observation}")));
                }
            }
        };

        if self.profile.memory {
            memory.record(&task_prompt, &answer);
        }
        info!("🤖 [AGENT] {} finished after {} step(s)", role, step);
        Ok(answer)
    }
}
