use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::mcp::ToolDescriptor;
use crate::message::{Role, ToolArguments, ToolCall};
use crate::provider::{ModelResponse, ToolChoice};

/// Replays canned responses and records every request.
#[derive(Default)]
struct ScriptedModel {
    responses: Mutex<VecDeque<Result<ModelResponse, OrchestrationError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    fn new(responses: Vec<Result<ModelResponse, OrchestrationError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat_once(
        &self,
        request: ChatRequest,
        _deadline: &Deadline,
    ) -> Result<ModelResponse, OrchestrationError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ModelResponse::text("sem roteiro")))
    }
}

/// Shared record of what the fake tool process saw.
#[derive(Default)]
struct ToolLog {
    connects: AtomicUsize,
    closes: AtomicUsize,
    calls: Mutex<Vec<(String, Value)>>,
}

struct FakeConnector {
    log: Arc<ToolLog>,
    fail_connect: bool,
    fail_list: bool,
    failing_tool: Option<&'static str>,
}

impl FakeConnector {
    fn new() -> (Arc<Self>, Arc<ToolLog>) {
        Self::with(false, false, None)
    }

    fn with(
        fail_connect: bool,
        fail_list: bool,
        failing_tool: Option<&'static str>,
    ) -> (Arc<Self>, Arc<ToolLog>) {
        let log = Arc::new(ToolLog::default());
        let connector = Arc::new(Self {
            log: Arc::clone(&log),
            fail_connect,
            fail_list,
            failing_tool,
        });
        (connector, log)
    }
}

#[async_trait]
impl ToolConnector for FakeConnector {
    async fn connect(&self, _script_path: &Path) -> Result<Box<dyn ToolProvider>> {
        if self.fail_connect {
            anyhow::bail!("spawn node: No such file or directory");
        }
        self.log.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeProvider {
            log: Arc::clone(&self.log),
            fail_list: self.fail_list,
            failing_tool: self.failing_tool,
        }))
    }
}

struct FakeProvider {
    log: Arc<ToolLog>,
    fail_list: bool,
    failing_tool: Option<&'static str>,
}

#[async_trait]
impl ToolProvider for FakeProvider {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
        if self.fail_list {
            anyhow::bail!("tools/list failed");
        }
        Ok(vec![ToolDescriptor {
            name: "listDay".into(),
            description: "Retrieve all tasks for a given day".into(),
            input_schema: Some(json!({
                "type": "object",
                "properties": {"owner_id": {"type": "string"}, "date": {"type": "string"}},
                "required": ["owner_id", "date"]
            })),
        }])
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value> {
        self.log
            .calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        if self.failing_tool == Some(name) {
            anyhow::bail!("database offline");
        }
        Ok(json!({"content": [{"type": "text", "text": "- [pending] Dentista (Due: 2024-03-06 14:00)"}]}))
    }

    async fn close(&mut self) -> Result<()> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("close failures are only logged")
    }
}

fn settings() -> OrchestrationSettings {
    OrchestrationSettings {
        script_path: Some(PathBuf::from("mcp_server.mjs")),
        history_limit: 12,
        timeout: Duration::from_secs(30),
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
}

fn request(conversation: Vec<Message>) -> OrchestrationRequest {
    OrchestrationRequest {
        owner_id: "u1".into(),
        system_prompt: "Você é o NotiFly.".into(),
        conversation,
        today: today(),
    }
}

fn list_day_call(id: &str, args: &str) -> ToolCall {
    ToolCall::new(id, "listDay", ToolArguments::Raw(args.into()))
}

#[tokio::test]
async fn test_empty_owner_is_configuration_error() {
    let model = ScriptedModel::new(vec![]);
    let (connector, log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(model.clone(), connector, settings());

    let mut req = request(vec![Message::user("oi")]);
    req.owner_id = "  ".into();
    let err = orchestrator.run(req).await.unwrap_err();

    assert!(matches!(err, OrchestrationError::Configuration(_)));
    assert_eq!(log.connects.load(Ordering::SeqCst), 0);
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn test_missing_script_path_is_configuration_error() {
    let model = ScriptedModel::new(vec![]);
    let (connector, log) = FakeConnector::new();
    let mut settings = settings();
    settings.script_path = None;
    let orchestrator = Orchestrator::new(model, connector, settings);

    let err = orchestrator
        .run(request(vec![Message::user("oi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::Configuration(_)));
    assert_eq!(log.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_connect_failure_is_tool_process_unavailable() {
    let model = ScriptedModel::new(vec![]);
    let (connector, log) = FakeConnector::with(true, false, None);
    let orchestrator = Orchestrator::new(model.clone(), connector, settings());

    let err = orchestrator
        .run(request(vec![Message::user("oi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::ToolProcessUnavailable(_)));
    assert_eq!(log.closes.load(Ordering::SeqCst), 0);
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn test_list_failure_closes_session_once() {
    let model = ScriptedModel::new(vec![]);
    let (connector, log) = FakeConnector::with(false, true, None);
    let orchestrator = Orchestrator::new(model.clone(), connector, settings());

    let err = orchestrator
        .run(request(vec![Message::user("oi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::ToolProcessUnavailable(_)));
    assert_eq!(log.closes.load(Ordering::SeqCst), 1);
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn test_plain_answer_takes_one_direct_pass() {
    let model = ScriptedModel::new(vec![
        Ok(ModelResponse::text("Olá! Como posso ajudar?")),
        Ok(ModelResponse::text("  Olá! Em que posso ajudar?  \n")),
    ]);
    let (connector, log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(model.clone(), connector, settings());

    let reply = orchestrator
        .run(request(vec![Message::user("bom dia")]))
        .await
        .unwrap();

    assert_eq!(reply.path, ReplyPath::Direct);
    assert_eq!(reply.text, "Olá! Em que posso ajudar?");
    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tool_choice, Some(ToolChoice::Auto));
    assert!(requests[1].tools.is_none());
    assert!(requests[1]
        .system_prompt
        .ends_with("\n\nResponda normalmente, sem chamar ferramentas."));
    assert_eq!(requests[1].conversation, vec![Message::user("bom dia")]);
    assert!(log.calls.lock().unwrap().is_empty());
    assert_eq!(log.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_model_never_sees_owner_id() {
    let model = ScriptedModel::new(vec![Ok(ModelResponse::text("ok"))]);
    let (connector, _log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(model.clone(), connector, settings());

    orchestrator
        .run(request(vec![Message::user("oi")]))
        .await
        .unwrap();

    let tools = model.requests()[0].tools.clone().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(
        tools[0].function.parameters,
        json!({"type": "object", "properties": {"date": {"type": "string"}}, "required": ["date"]})
    );
}

#[tokio::test]
async fn test_tool_answer_uses_true_owner_and_final_pass() {
    let call = list_day_call("call_1", r#"{"date":"2024-03-06","owner_id":"u2"}"#);
    let model = ScriptedModel::new(vec![
        Ok(ModelResponse::calls(vec![call.clone()])),
        Ok(ModelResponse::text("")),
        Ok(ModelResponse::text("Amanhã você tem Dentista às 14:00.")),
    ]);
    let (connector, log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(model.clone(), connector, settings());
    let conversation = vec![Message::user("o que tenho amanhã?")];

    let reply = orchestrator.run(request(conversation.clone())).await.unwrap();

    assert_eq!(reply.path, ReplyPath::ToolAnswer);
    assert_eq!(reply.text, "Amanhã você tem Dentista às 14:00.");
    assert_eq!(
        log.calls.lock().unwrap().clone(),
        vec![("listDay".to_string(), json!({"date": "2024-03-06", "owner_id": "u1"}))]
    );

    let requests = model.requests();
    assert_eq!(requests.len(), 3);

    let second = &requests[1].conversation;
    assert_eq!(second.len(), 3);
    assert_eq!(second[1].role, Role::Assistant);
    assert_eq!(second[1].tool_calls, vec![call]);
    assert_eq!(second[2].role, Role::Tool);
    assert_eq!(second[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(
        second[2].content,
        r#"[{"type":"text","text":"- [pending] Dentista (Due: 2024-03-06 14:00)"}]"#
    );

    let final_pass = &requests[2];
    assert!(final_pass.tools.is_none());
    assert!(final_pass.tool_choice.is_none());
    assert!(final_pass.system_prompt.contains("Não chame ferramentas."));
    assert_eq!(final_pass.conversation, conversation);
    assert_eq!(log.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_loop_is_capped_at_three_tool_passes() {
    let mut responses: Vec<_> = (0..5)
        .map(|i| {
            Ok(ModelResponse::calls(vec![list_day_call(
                &format!("call_{i}"),
                r#"{"date":"2024-03-06"}"#,
            )]))
        })
        .collect();
    responses.insert(3, Ok(ModelResponse::text("Pronto.")));
    let model = ScriptedModel::new(responses);
    let (connector, log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(model.clone(), connector, settings());

    let reply = orchestrator
        .run(request(vec![Message::user("confere minha semana")]))
        .await
        .unwrap();

    assert_eq!(reply.path, ReplyPath::ToolAnswer);
    assert_eq!(reply.text, "Pronto.");
    let requests = model.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(
        requests.iter().filter(|r| r.tools.is_some()).count(),
        MAX_TOOL_ITERATIONS
    );
    assert_eq!(log.calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_tool_becomes_synthetic_result() {
    let model = ScriptedModel::new(vec![
        Ok(ModelResponse::calls(vec![list_day_call("c1", "not json")])),
        Ok(ModelResponse::text("")),
        Ok(ModelResponse::text("Não consegui acessar suas tarefas agora.")),
    ]);
    let (connector, log) = FakeConnector::with(false, false, Some("listDay"));
    let orchestrator = Orchestrator::new(model.clone(), connector, settings());

    let reply = orchestrator
        .run(request(vec![Message::user("o que tenho hoje?")]))
        .await
        .unwrap();

    assert_eq!(reply.path, ReplyPath::ToolAnswer);
    assert_eq!(log.calls.lock().unwrap()[0].1, json!({"owner_id": "u1"}));
    let tool_turn = &model.requests()[1].conversation[2];
    assert_eq!(
        tool_turn.content,
        r#"[{"type":"text","text":"Erro ao executar listDay: database offline"}]"#
    );
}

#[tokio::test]
async fn test_fallback_lists_tomorrow_when_model_skips_tools() {
    let model = ScriptedModel::new(vec![
        Ok(ModelResponse::text("Você não tem tarefas.")),
        Ok(ModelResponse::text(" Amanhã: Dentista às 14:00. ")),
    ]);
    let (connector, log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(model.clone(), connector, settings());

    let reply = orchestrator
        .run(request(vec![Message::user("quais minhas tarefas de amanhã?")]))
        .await
        .unwrap();

    assert_eq!(reply.path, ReplyPath::Fallback);
    assert_eq!(reply.text, "Amanhã: Dentista às 14:00.");
    assert_eq!(
        log.calls.lock().unwrap().clone(),
        vec![("listDay".to_string(), json!({"date": "2024-03-06", "owner_id": "u1"}))]
    );

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    let summary = &requests[1];
    assert!(summary.tools.is_none());
    assert!(summary.conversation.is_empty());
    assert!(summary.system_prompt.starts_with("Você é o NotiFly.\n\n"));
    assert!(summary.system_prompt.contains(
        "Resultado listDay (date=2024-03-06):\n[{\"type\":\"text\",\"text\":\"- [pending] Dentista (Due: 2024-03-06 14:00)\"}]"
    ));
    assert!(summary.system_prompt.contains("Não invente tarefas."));
    assert_eq!(log.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fallback_uses_explicit_date() {
    let model = ScriptedModel::new(vec![
        Ok(ModelResponse::text("...")),
        Ok(ModelResponse::text("Nada marcado.")),
    ]);
    let (connector, log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(model, connector, settings());

    orchestrator
        .run(request(vec![Message::user("Listar compromissos 11/12/2025")]))
        .await
        .unwrap();
    assert_eq!(log.calls.lock().unwrap()[0].1["date"], "2025-12-11");
}

#[tokio::test]
async fn test_fallback_without_resolvable_date_asks() {
    let model = ScriptedModel::new(vec![Ok(ModelResponse::text("Não sei."))]);
    let (connector, log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(model.clone(), connector, settings());

    let mut req = request(vec![Message::user("quais tarefas de amanhã?")]);
    req.today = NaiveDate::MAX;
    let reply = orchestrator.run(req).await.unwrap();

    assert_eq!(reply.path, ReplyPath::Clarification);
    assert_eq!(reply.text, CLARIFICATION_QUESTION);
    assert_eq!(model.requests().len(), 1);
    assert!(log.calls.lock().unwrap().is_empty());
    assert_eq!(log.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_router_reads_last_user_turn_before_truncation() {
    let mut conversation = vec![Message::user("quais minhas tarefas de hoje?")];
    conversation.extend((0..20).map(|i| Message::assistant(format!("resposta {i}"))));
    let model = ScriptedModel::new(vec![
        Ok(ModelResponse::text("...")),
        Ok(ModelResponse::text("Hoje está livre.")),
    ]);
    let (connector, log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(model.clone(), connector, settings());

    let reply = orchestrator.run(request(conversation)).await.unwrap();

    assert_eq!(reply.path, ReplyPath::Fallback);
    assert_eq!(model.requests()[0].conversation.len(), 12);
    assert_eq!(log.calls.lock().unwrap()[0].1["date"], "2024-03-05");
}

#[tokio::test]
async fn test_model_failure_propagates_after_close() {
    let model = ScriptedModel::new(vec![Err(OrchestrationError::Protocol {
        status: 500,
        body: "internal".into(),
    })]);
    let (connector, log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(model, connector, settings());

    let err = orchestrator
        .run(request(vec![Message::user("oi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::Protocol { status: 500, .. }));
    assert_eq!(log.closes.load(Ordering::SeqCst), 1);
}

/// Never answers; waits until the invocation's deadline fires.
struct StalledModel;

#[async_trait]
impl ChatModel for StalledModel {
    async fn chat_once(
        &self,
        _request: ChatRequest,
        deadline: &Deadline,
    ) -> Result<ModelResponse, OrchestrationError> {
        deadline.run(std::future::pending::<()>()).await?;
        Ok(ModelResponse::text("unreachable"))
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_closes_session_once() {
    let (connector, log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(Arc::new(StalledModel), connector, settings());

    let err = orchestrator
        .run(request(vec![Message::user("oi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestrationError::Timeout(d) if d == Duration::from_secs(30)));
    assert!(err.is_retryable());
    assert_eq!(log.connects.load(Ordering::SeqCst), 1);
    assert_eq!(log.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failure_after_tool_call_is_marked() {
    let call = list_day_call("call_1", r#"{"date":"2024-03-06"}"#);
    let model = ScriptedModel::new(vec![
        Ok(ModelResponse::calls(vec![call])),
        Ok(ModelResponse::text("")),
        Err(OrchestrationError::EndpointUnavailable("connection reset".into())),
    ]);
    let (connector, log) = FakeConnector::new();
    let orchestrator = Orchestrator::new(model, connector, settings());

    let err = orchestrator
        .run(request(vec![Message::user("o que tenho amanhã?")]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OrchestrationError::AfterToolCalls { tool_calls: 1, .. }
    ));
    assert!(matches!(err.root(), OrchestrationError::EndpointUnavailable(_)));
    assert!(!err.is_retryable());
    assert_eq!(log.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_truncate_history_keeps_most_recent() {
    let conversation: Vec<_> = (0..15).map(|i| Message::user(i.to_string())).collect();
    let kept = truncate_history(&conversation, 12);
    assert_eq!(kept.len(), 12);
    assert_eq!(kept[0].content, "3");
    assert_eq!(truncate_history(&conversation[..5], 12).len(), 5);
}
