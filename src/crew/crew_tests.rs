//! Unit tests for crew assembly and both coordination processes.

#[cfg(test)]
mod crew_tests {
    use crate::agents::AgentProfile;
    use crate::contract::OutputContract;
    use crate::crew::manager::*;
    use crate::crew::task::*;
    use crate::crew::*;
    use crate::error::{PipelineError, Result};
    use crate::llm::{ChatMessage, ChatRole, LanguageModel};
    use crate::tools::{ToolBox, ToolKind};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    /// Answers as whichever agent the system prompt introduces.
    #[derive(Default)]
    struct RoleModel {
        prompts: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl LanguageModel for RoleModel {
        fn model_name(&self) -> &str {
            "role-model"
        }

        async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
            if self.fail {
                return Err(PipelineError::ModelService("upstream unavailable".to_string()));
            }
            let role = messages
                .iter()
                .find(|m| m.role == ChatRole::System)
                .and_then(|m| m.content.strip_prefix("You are "))
                .and_then(|rest| rest.split_once(".\n"))
                .map(|(role, _)| role.to_string())
                .unwrap_or_default();
            let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push((role.clone(), prompt));
            Ok(format!("Final Answer: output from {role}"))
        }
    }

    impl RoleModel {
        fn prompts_for(&self, role: &str) -> Vec<String> {
            self.prompts
                .lock()
                .unwrap()
                .iter()
                .filter(|(r, _)| r == role)
                .map(|(_, p)| p.clone())
                .collect()
        }
    }

    /// Replays decisions and records what it was shown.
    struct ScriptedManager {
        decisions: Mutex<VecDeque<ManagerDecision>>,
        feedback: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedManager {
        fn new(decisions: Vec<ManagerDecision>) -> Arc<Self> {
            Arc::new(Self {
                decisions: Mutex::new(decisions.into()),
                feedback: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Manager for ScriptedManager {
        async fn decide(&self, view: &ManagerView<'_>) -> Result<ManagerDecision> {
            self.feedback.lock().unwrap().push(view.feedback.map(str::to_string));
            Ok(self.decisions.lock().unwrap().pop_front().unwrap_or(ManagerDecision::Invalid {
                reason: "no more decisions".to_string(),
            }))
        }
    }

    fn run(task: &str) -> ManagerDecision {
        ManagerDecision::Run { task: task.to_string() }
    }

    fn agent(role: &str, allow_delegation: bool) -> AgentProfile {
        AgentProfile::builder(role)
            .goal("do the work")
            .backstory("reliable")
            .allow_delegation(allow_delegation)
            .build()
            .unwrap()
    }

    /// a (A), b (B), c (C) where c reads b then a.
    fn three_step(llm: Arc<RoleModel>) -> CrewBuilder {
        Crew::builder()
            .agent(agent("A", false))
            .agent(agent("B", false))
            .agent(agent("C", true))
            .task(TaskSpec::new("a", "A").description("First step for {ticket}"))
            .task(TaskSpec::new("b", "B").description("Second step"))
            .task(TaskSpec::new("c", "C").description("Combine").context(["b", "a"]))
            .llm(llm)
    }

    fn inputs() -> TaskInputs {
        TaskInputs::new().with("ticket", "AAPL")
    }

    // ============= Build Tests =============

    #[test]
    fn test_build_rejects_invalid_crews() {
        let llm = Arc::new(RoleModel::default());
        let build_err = |builder: CrewBuilder| match builder.build() {
            Err(PipelineError::Build(msg)) => msg,
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("crew should not build"),
        };

        let msg = build_err(Crew::builder().agent(agent("A", false)).task(TaskSpec::new("a", "A")));
        assert!(msg.contains("no language model"));

        let msg = build_err(Crew::builder().llm(llm.clone()).process(Process::Sequential));
        assert!(msg.contains("no tasks"));

        let msg = build_err(three_step(llm.clone()));
        assert!(msg.contains("requires a manager"));

        let msg = build_err(three_step(llm.clone()).process(Process::Sequential).task(TaskSpec::new("d", "Z")));
        assert!(msg.contains("unknown agent 'Z'"));

        let msg = build_err(
            Crew::builder()
                .agent(agent("A", false))
                .task(TaskSpec::new("a", "A").context(["b"]))
                .task(TaskSpec::new("b", "A"))
                .process(Process::Sequential)
                .llm(llm.clone()),
        );
        assert!(msg.contains("not declared before it"));

        let msg = build_err(three_step(llm.clone()).process(Process::Sequential).agent(agent("A", true)));
        assert!(msg.contains("duplicate agent role"));

        let msg = build_err(three_step(llm.clone()).process(Process::Sequential).task(TaskSpec::new("a", "B")));
        assert!(msg.contains("duplicate task name"));

        let msg = build_err(
            three_step(llm.clone())
                .manager(ScriptedManager::new(vec![]))
                .max_manager_iterations(0),
        );
        assert!(msg.contains("at least 1"));

        let with_tool = AgentProfile::builder("T")
            .goal("g")
            .backstory("b")
            .tool(ToolKind::NewsSearch)
            .build()
            .unwrap();
        let msg = build_err(
            Crew::builder()
                .agent(with_tool)
                .task(TaskSpec::new("t", "T"))
                .tools(ToolBox::default())
                .process(Process::Sequential)
                .llm(llm),
        );
        assert!(msg.contains("NewsSearch"));
    }

    // ============= Sequential Tests =============

    #[tokio::test]
    async fn test_sequential_runs_in_order_with_context() {
        let llm = Arc::new(RoleModel::default());
        let crew = three_step(llm.clone()).process(Process::Sequential).build().unwrap();

        let result = crew.kickoff(Uuid::new_v4(), &inputs()).await.unwrap();

        let names: Vec<&str> = result.outputs.iter().map(|o| o.task.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(result.manager_iterations, 0);
        assert_eq!(result.ticket, "AAPL");
        assert_eq!(result.final_output().unwrap().raw, "output from C");
        assert_eq!(result.output("b").unwrap().agent, "B");

        assert!(llm.prompts_for("A")[0].starts_with("First step for AAPL"));

        // Context arrives in declaration order, not the order it was listed
        let writer_prompt = &llm.prompts_for("C")[0];
        let a_pos = writer_prompt.find("### a (A)\noutput from A").unwrap();
        let b_pos = writer_prompt.find("### b (B)\noutput from B").unwrap();
        assert!(a_pos < b_pos);
    }

    #[tokio::test]
    async fn test_contract_violations_are_recorded_not_fatal() {
        let llm = Arc::new(RoleModel::default());
        let crew = Crew::builder()
            .agent(agent("A", false))
            .task(TaskSpec::new("a", "A").contract(OutputContract::PriceTrend {
                ticket: "{ticket}".to_string(),
            }))
            .process(Process::Sequential)
            .llm(llm)
            .build()
            .unwrap();

        let result = crew.kickoff(Uuid::new_v4(), &inputs()).await.unwrap();
        let violations = &result.outputs[0].violations;
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("does not name AAPL"));
    }

    #[tokio::test]
    async fn test_model_errors_abort_the_run() {
        let llm = Arc::new(RoleModel { fail: true, ..RoleModel::default() });
        let crew = three_step(llm).process(Process::Sequential).build().unwrap();

        let err = crew.kickoff(Uuid::new_v4(), &inputs()).await.unwrap_err();
        assert!(matches!(err, PipelineError::ModelService(_)));
    }

    // ============= Hierarchical Tests =============

    #[tokio::test]
    async fn test_hierarchical_rejects_bad_decisions_as_feedback() {
        let llm = Arc::new(RoleModel::default());
        let manager = ScriptedManager::new(vec![
            run("c"),
            ManagerDecision::Done,
            run("A"),
            run("a"),
            run("b"),
            run("c"),
        ]);
        let crew = three_step(llm).manager(manager.clone()).build().unwrap();

        let result = crew.kickoff(Uuid::new_v4(), &inputs()).await.unwrap();

        assert_eq!(result.manager_iterations, 6);
        assert_eq!(result.process, Process::Hierarchical);
        let names: Vec<&str> = result.outputs.iter().map(|o| o.task.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let feedback = manager.feedback.lock().unwrap().clone();
        assert_eq!(feedback.len(), 6);
        assert!(feedback[0].is_none());
        assert_eq!(feedback[1].as_deref(), Some("task 'c' is waiting on a, b"));
        assert_eq!(feedback[2].as_deref(), Some("3 of 3 tasks are still pending"));
        // Task names match case-insensitively, so "A" ran task a
        assert!(feedback[3].is_none());
        assert_eq!(feedback[4].as_deref(), Some("task 'a' is already complete"));
        assert!(feedback[5].is_none());
    }

    #[tokio::test]
    async fn test_hierarchical_iteration_cap() {
        let llm = Arc::new(RoleModel::default());
        let manager = ScriptedManager::new(vec![run("a")]);
        let crew = three_step(llm)
            .manager(manager)
            .max_manager_iterations(3)
            .build()
            .unwrap();

        let err = crew.kickoff(Uuid::new_v4(), &inputs()).await.unwrap_err();
        match err {
            PipelineError::ManagerIterationExceeded {
                max_iterations,
                completed,
                total,
            } => {
                assert_eq!(max_iterations, 3);
                assert_eq!(completed, 1);
                assert_eq!(total, 3);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn test_hierarchical_delegation() {
        let llm = Arc::new(RoleModel::default());
        let manager = ScriptedManager::new(vec![
            // A does not delegate, so it runs a itself
            ManagerDecision::Delegate {
                task: "a".to_string(),
                agent: "B".to_string(),
                instruction: "take over".to_string(),
            },
            run("b"),
            ManagerDecision::Delegate {
                task: "c".to_string(),
                agent: "nobody".to_string(),
                instruction: String::new(),
            },
            ManagerDecision::Delegate {
                task: "c".to_string(),
                agent: "a".to_string(),
                instruction: "double-check the numbers".to_string(),
            },
            run("c"),
        ]);
        let crew = three_step(llm.clone()).manager(manager.clone()).build().unwrap();

        let result = crew.kickoff(Uuid::new_v4(), &inputs()).await.unwrap();

        assert_eq!(result.manager_iterations, 5);
        assert_eq!(result.output("a").unwrap().agent, "A");
        let feedback = manager.feedback.lock().unwrap().clone();
        assert_eq!(feedback[3].as_deref(), Some("unknown agent 'nobody'"));

        let a_prompts = llm.prompts_for("A");
        assert_eq!(a_prompts.len(), 2);
        assert!(a_prompts[1].starts_with("double-check the numbers"));
        assert!(a_prompts[1].contains("owned by C"));

        let c_prompt = &llm.prompts_for("C")[0];
        assert!(c_prompt.contains("Notes from delegated work:"));
        assert!(c_prompt.contains("- A was asked \"double-check the numbers\" and answered: output from A"));
    }

    // ============= Decision Parsing Tests =============

    #[test]
    fn test_parse_decision() {
        assert_eq!(
            parse_decision("Sure.\n```json\n{\"action\": \"run\", \"task\": \"price_trend\"}\n```"),
            run("price_trend")
        );
        assert_eq!(parse_decision(r#"{"action": "DONE"}"#), ManagerDecision::Done);
        assert_eq!(
            parse_decision(r#"{"action": "delegate", "task": "newsletter", "agent": "Stock News Analyst"}"#),
            ManagerDecision::Delegate {
                task: "newsletter".to_string(),
                agent: "Stock News Analyst".to_string(),
                instruction: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_decision_invalid() {
        let invalid = |reply: &str| matches!(parse_decision(reply), ManagerDecision::Invalid { .. });

        assert!(invalid("I think we should start with prices"));
        assert!(invalid(r#"{"action": "run"}"#));
        assert!(invalid(r#"{"action": "run", "task": "  "}"#));
        assert!(invalid(r#"{"action": "delegate", "task": "newsletter"}"#));
        assert!(invalid(r#"{"action": "pause", "task": "newsletter"}"#));
    }

    // ============= Task Tests =============

    #[test]
    fn test_interpolation_dedups_assets() {
        let task = TaskSpec::new("news", "N")
            .description("News for {ticket} and {secondary_asset} on {unknown}")
            .tool_inputs(["{ticket}", "{secondary_asset}"])
            .contract(OutputContract::NewsSentiment {
                assets: vec!["{ticket}".to_string(), "{secondary_asset}".to_string()],
            });
        let inputs = TaskInputs::new().with("ticket", "btc").with("secondary_asset", "BTC");

        let resolved = task.interpolated(&inputs);

        assert_eq!(resolved.description, "News for btc and BTC on {unknown}");
        assert_eq!(resolved.tool_inputs, vec!["btc".to_string()]);
        assert_eq!(
            resolved.contract,
            OutputContract::NewsSentiment { assets: vec!["btc".to_string()] }
        );
    }
}
