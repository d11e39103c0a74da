mod common;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{extractor, FakeDoc, FakeEngine, FakeSite, GotoFault, ScriptedModel};
use pagelens::agent::{AgentLoop, AgentRequest, Planner};
use pagelens::browser::PageOptions;
use pagelens::db::Database;
use pagelens::errors::{ErrorKind, ScrapeError};
use pagelens::llm::PlannedAction;
use pagelens::models::{ActionKind, AgentAction, AgentState, ExtractionUsage};
use pagelens::schema;
use serde_json::json;

const START: &str = "https://maps.example/search";
const DETAIL: &str = "https://maps.example/place/1";

struct ScriptedPlanner {
    actions: Mutex<VecDeque<AgentAction>>,
    seen_steps: Mutex<Vec<u32>>,
}

impl ScriptedPlanner {
    fn new(actions: Vec<AgentAction>) -> Self {
        Self { actions: Mutex::new(actions.into()), seen_steps: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn next_action(&self, state: &AgentState, _goal: &str) -> Result<PlannedAction, ScrapeError> {
        self.seen_steps.lock().unwrap().push(state.step_index);
        let action = self.actions.lock().unwrap()
            .pop_front()
            .unwrap_or_else(|| AgentAction::new(ActionKind::Stop));
        Ok(PlannedAction {
            action,
            usage: ExtractionUsage { input_tokens: 10, output_tokens: 5, total_tokens: 15, cached_input_tokens: 0 },
            cost_usd: 0.0,
        })
    }
}

fn site() -> Arc<FakeSite> {
    let site = FakeSite::new();
    site.serve(START, FakeDoc::html("Results", "Cafe Azul, Cafe Verde"));
    site.serve(DETAIL, FakeDoc::html("Cafe Azul", "Cafe Azul, Rua 1, open 9-18"));
    site.link("a.result", DETAIL);
    site
}

fn agent(site: &Arc<FakeSite>, model: &Arc<ScriptedModel>) -> AgentLoop {
    AgentLoop::new(Arc::new(FakeEngine { site: site.clone() }), PageOptions::default(), extractor(model))
}

fn request(max_steps: u32) -> AgentRequest {
    AgentRequest::new(START, "list the cafes nearby", schema::lookup("guided_extract").unwrap())
        .with_max_steps(max_steps)
}

fn findings_reply() -> String {
    json!({
        "objective": "list the cafes nearby",
        "summary": "Two cafes",
        "findings": [
            {"title": "Cafe Azul", "description": "Rua 1"},
            {"title": "cafe azul ", "description": "duplicate"},
            {"title": "Cafe Verde"}
        ],
        "total_count": 2
    })
    .to_string()
}

#[tokio::test]
async fn test_planner_stop_ends_run_and_extracts() {
    let site = site();
    let model = ScriptedModel::new(&[&findings_reply()]);
    let db = Database::in_memory().unwrap();
    let planner = ScriptedPlanner::new(vec![
        AgentAction::new(ActionKind::Click).with_target("a.result"),
        AgentAction::new(ActionKind::Stop).with_reason("found enough cafes"),
    ]);

    let response = agent(&site, &model)
        .with_storage(db.clone())
        .run_with_planner(&request(8), &planner)
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.steps.len(), 1);
    assert_eq!(response.steps[0].current_url, DETAIL);
    assert_eq!(response.steps[0].title, "Cafe Azul");
    assert!(response.metadata.stop.reached_goal);
    assert_eq!(response.metadata.stop.reason.as_deref(), Some("found enough cafes"));
    assert_eq!(response.data.as_ref().unwrap()["findings"].as_array().unwrap().len(), 2);
    assert_eq!(response.metadata.tokens_used, 1_200 + 30);
    assert_eq!(*planner.seen_steps.lock().unwrap(), vec![0, 1]);
    assert_eq!(site.closed(), 1);

    let stored = db.get_execution_steps(&response.execution_id).unwrap();
    assert_eq!(stored, response.steps);
    assert!(db.get_agent_execution(&response.execution_id).unwrap().is_some());
}

#[tokio::test]
async fn test_stop_on_first_step_runs_no_actions() {
    let site = site();
    let model = ScriptedModel::new(&[&findings_reply()]);
    let planner = ScriptedPlanner::new(Vec::new());

    let response = agent(&site, &model).run_with_planner(&request(8), &planner).await.unwrap();

    assert!(response.steps.is_empty());
    assert_eq!(*planner.seen_steps.lock().unwrap(), vec![0]);
    assert_eq!(site.goto_modes.lock().unwrap().len(), 1);
    assert!(site.clicks.lock().unwrap().is_empty());
    assert_eq!(model.calls(), 1);
    assert!(response.metadata.stop.reached_goal);
    assert!(!response.metadata.stop.max_steps_reached);
    assert_eq!(response.metadata.stop.reason.as_deref(), Some("planner_stop"));
    assert!(response.success);
    assert_eq!(site.closed(), 1);
}

#[tokio::test]
async fn test_scrolling_in_place_trips_loop_guard() {
    let site = site();
    let model = ScriptedModel::new(&[&findings_reply()]);
    let planner = ScriptedPlanner::new(vec![AgentAction::new(ActionKind::Scroll).with_value("down"); 10]);

    let response = agent(&site, &model).run_with_planner(&request(10), &planner).await.unwrap();

    assert_eq!(response.steps.len(), 4);
    assert!(response.metadata.stop.no_progress);
    assert_eq!(response.metadata.stop.reason.as_deref(), Some("same_url_loop"));
    assert!(response.success, "evidence is still extracted after a guardrail stop");
}

#[tokio::test]
async fn test_step_budget_exhaustion() {
    let site = site();
    let model = ScriptedModel::new(&[&findings_reply()]);
    let planner = ScriptedPlanner::new(vec![
        AgentAction::new(ActionKind::Click).with_target("a.result"),
        AgentAction::new(ActionKind::Back),
        AgentAction::new(ActionKind::Click).with_target("a.result"),
    ]);

    let response = agent(&site, &model).run_with_planner(&request(3), &planner).await.unwrap();

    assert_eq!(response.steps.len(), 3);
    assert!(response.metadata.stop.max_steps_reached);
    let urls: Vec<&str> = response.steps.iter().map(|s| s.current_url.as_str()).collect();
    assert_eq!(urls, vec![DETAIL, START, DETAIL]);
}

#[tokio::test]
async fn test_failed_action_is_recorded_not_fatal() {
    let site = site();
    let model = ScriptedModel::new(&[&findings_reply()]);
    let planner = ScriptedPlanner::new(vec![
        AgentAction::new(ActionKind::Click).with_target("button.missing"),
        AgentAction::new(ActionKind::Extract),
    ]);

    let response = agent(&site, &model).run_with_planner(&request(5), &planner).await.unwrap();

    assert_eq!(response.steps.len(), 1);
    assert!(!response.steps[0].success);
    assert!(response.steps[0].error.as_deref().unwrap().contains("button.missing"));
    assert_eq!(response.metadata.stop.reason.as_deref(), Some("planner_extract"));
}

#[tokio::test]
async fn test_extraction_failure_yields_failed_response() {
    let site = site();
    let model = ScriptedModel::new(&[]);
    let planner = ScriptedPlanner::new(vec![AgentAction::new(ActionKind::Stop)]);

    let response = agent(&site, &model).run_with_planner(&request(5), &planner).await.unwrap();

    assert!(!response.success);
    assert!(response.data.is_none());
    assert_eq!(response.metadata.error_type, Some(ErrorKind::Model));
    assert_eq!(response.metadata.stop.reason.as_deref(), Some("planner_stop"));
}

#[tokio::test]
async fn test_invalid_evidence_record_is_validation_failure() {
    let site = site();
    let model = ScriptedModel::new(&[r#"{"findings": "none"}"#]);
    let planner = ScriptedPlanner::new(vec![AgentAction::new(ActionKind::Stop)]);

    let response = agent(&site, &model).run_with_planner(&request(5), &planner).await.unwrap();

    assert!(!response.success);
    assert_eq!(response.metadata.error_type, Some(ErrorKind::Validation));
    assert_eq!(response.metadata.error.as_deref(), Some("Validation failed"));
    assert!(!response.metadata.validation_errors.is_empty());
}

#[tokio::test]
async fn test_initial_navigation_failure_is_an_error() {
    let site = site();
    site.fail_goto(&[GotoFault::Network]);
    let model = ScriptedModel::new(&[]);
    let planner = ScriptedPlanner::new(Vec::new());

    let result = agent(&site, &model).run_with_planner(&request(5), &planner).await;

    assert!(matches!(result, Err(ScrapeError::Network(_))));
    assert_eq!(site.closed(), 1);
}

#[tokio::test]
async fn test_model_planner_drives_the_loop() {
    let site = site();
    let model = ScriptedModel::new(&[
        r#"{"action": "click", "target": "a.result", "reason": "open first result"}"#,
        r#"{"action": "stop", "reason": "details visible"}"#,
        &findings_reply(),
    ]);

    let response = agent(&site, &model).run(&request(5)).await.unwrap();

    assert!(response.success);
    assert_eq!(response.steps.len(), 1);
    assert_eq!(response.steps[0].action.action, ActionKind::Click);
    assert_eq!(response.metadata.stop.reason.as_deref(), Some("details visible"));
    assert_eq!(response.metadata.tokens_used, 3 * 1_200);
    assert_eq!(model.calls(), 3);
}
