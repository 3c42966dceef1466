use super::model_adapter::{to_model_tool, to_model_tools};
use super::*;
use serde_json::json;
use tempfile::TempDir;

fn registry() -> (TempDir, ToolRegistry) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(TaskStore::open(dir.path().join("tasks.json")).unwrap());
    (dir, ToolRegistry::with_task_tools(store))
}

#[tokio::test]
async fn test_registry_with_task_tools() {
    let (_dir, registry) = registry();
    assert_eq!(registry.len(), 5);
    assert!(!registry.is_empty());
    let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["add", "listDay", "listRange", "markDone", "snooze"]);
}

#[tokio::test]
async fn test_every_schema_requires_owner_id() {
    let (_dir, registry) = registry();
    for def in registry.definitions() {
        let schema = def.input_schema.unwrap();
        assert!(schema["properties"]["owner_id"].is_object(), "{}", def.name);
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("owner_id")), "{}", def.name);
    }
}

#[tokio::test]
async fn test_add_then_list_day() {
    let (_dir, registry) = registry();
    let added = registry
        .execute(
            "add",
            json!({"owner_id": "u1", "title": "Dentista", "due_date": "2024-03-06", "due_time": "14:00"}),
        )
        .await
        .unwrap();
    assert!(!added.is_error);
    assert!(added.text().starts_with("Task \"Dentista\" added successfully with ID: "));

    let listed = registry
        .execute("listDay", json!({"owner_id": "u1", "date": "2024-03-06"}))
        .await
        .unwrap();
    assert_eq!(listed.text(), "- [pending] Dentista (Due: 2024-03-06 14:00)");
}

#[tokio::test]
async fn test_list_day_empty() {
    let (_dir, registry) = registry();
    let result = registry
        .execute("listDay", json!({"owner_id": "u1", "date": "2024-03-06"}))
        .await
        .unwrap();
    assert!(!result.is_error);
    assert_eq!(result.text(), "No tasks found for 2024-03-06.");
}

#[tokio::test]
async fn test_list_range_empty_and_missing_date() {
    let (_dir, registry) = registry();
    registry
        .execute("add", json!({"owner_id": "u1", "title": "sem data"}))
        .await
        .unwrap();
    let result = registry
        .execute(
            "listRange",
            json!({"owner_id": "u1", "start": "2024-03-01", "end": "2024-03-07"}),
        )
        .await
        .unwrap();
    assert_eq!(result.text(), "No tasks found from 2024-03-01 to 2024-03-07.");
}

#[tokio::test]
async fn test_list_range_one_block_per_task() {
    let (_dir, registry) = registry();
    for (title, date) in [("b", "2024-03-05"), ("a", "2024-03-02")] {
        registry
            .execute("add", json!({"owner_id": "u1", "title": title, "due_date": date}))
            .await
            .unwrap();
    }
    let result = registry
        .execute(
            "listRange",
            json!({"owner_id": "u1", "start": "2024-03-01", "end": "2024-03-07"}),
        )
        .await
        .unwrap();
    assert_eq!(result.content.len(), 2);
    assert_eq!(result.content[0].text.as_deref(), Some("- [pending] a (Due: 2024-03-02 )"));
}

#[tokio::test]
async fn test_mark_done_not_found() {
    let (_dir, registry) = registry();
    let result = registry
        .execute("markDone", json!({"owner_id": "u1", "task_id": "nope"}))
        .await
        .unwrap();
    assert_eq!(result.text(), "Task with ID nope not found.");
}

#[tokio::test]
async fn test_snooze_requires_a_change() {
    let (_dir, registry) = registry();
    let result = registry
        .execute("snooze", json!({"owner_id": "u1", "task_id": "x"}))
        .await
        .unwrap();
    assert!(result.is_error);
}

#[tokio::test]
async fn test_add_without_title_is_tool_error() {
    let (_dir, registry) = registry();
    let result = registry
        .execute("add", json!({"owner_id": "u1"}))
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result.text().starts_with("Error creating task"));
}

#[tokio::test]
async fn test_unknown_tool() {
    let (_dir, registry) = registry();
    let result = registry.execute("nonexistent_tool", json!({})).await;
    assert!(result.is_err());
}

#[test]
fn test_model_tool_strips_owner_id() {
    let descriptor = ToolDescriptor {
        name: "listDay".into(),
        description: "Retrieve all tasks for a given day".into(),
        input_schema: Some(json!({
            "type": "object",
            "properties": {
                "owner_id": {"type": "string"},
                "date": {"type": "string"}
            },
            "required": ["owner_id", "date"]
        })),
    };
    let before = descriptor.clone();
    let spec = to_model_tool(&descriptor);

    assert_eq!(descriptor, before);
    assert_eq!(spec.kind, "function");
    assert_eq!(spec.function.name, "listDay");
    assert_eq!(
        spec.function.parameters,
        json!({
            "type": "object",
            "properties": {"date": {"type": "string"}},
            "required": ["date"]
        })
    );
}

#[test]
fn test_model_tool_drops_empty_required() {
    let descriptor = ToolDescriptor {
        name: "whoami".into(),
        description: String::new(),
        input_schema: Some(json!({
            "type": "object",
            "properties": {"owner_id": {"type": "string"}},
            "required": ["owner_id"]
        })),
    };
    let spec = to_model_tool(&descriptor);
    assert_eq!(spec.function.parameters, json!({"type": "object", "properties": {}}));
}

#[test]
fn test_model_tool_without_schema() {
    let descriptor = ToolDescriptor {
        name: "ping".into(),
        description: String::new(),
        input_schema: None,
    };
    let spec = to_model_tool(&descriptor);
    assert_eq!(spec.function.parameters, json!({"type": "object", "properties": {}}));
}

#[tokio::test]
async fn test_registry_definitions_adapt_cleanly() {
    let (_dir, registry) = registry();
    for spec in to_model_tools(&registry.definitions()) {
        let params = &spec.function.parameters;
        assert!(params["properties"].get("owner_id").is_none());
        if let Some(required) = params.get("required") {
            assert!(!required.as_array().unwrap().contains(&json!("owner_id")));
        }
    }
}
