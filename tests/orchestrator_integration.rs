//! End-to-end flows through the orchestrator: events in, agent results out.

mod common;

use std::sync::Arc;

use serde_json::{json, Map, Value};
use vaspera::adapters::{StaticCampaignSource, StaticHealthSource};
use vaspera::application::{Orchestrator, OrchestratorState, Sources};
use vaspera::domain::models::{AgentResult, Event};

fn sources(health: StaticHealthSource) -> Sources {
    Sources {
        campaigns: Arc::new(StaticCampaignSource::with_fixtures()),
        health: Arc::new(health),
    }
}

async fn orchestrator() -> Orchestrator {
    Orchestrator::new(common::test_config(), sources(StaticHealthSource::new()))
        .await
        .unwrap()
}

/// The first handler result is the agent's, the wildcard audit comes last.
fn agent_result(results: &[Result<Value, String>]) -> AgentResult {
    assert_eq!(results.len(), 2, "agent handler plus audit handler");
    serde_json::from_value(results[0].clone().unwrap()).unwrap()
}

fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_chat_message_refund_is_escalated() {
    let orch = orchestrator().await;

    let results = orch
        .bus()
        .publish_sync(
            "support.chat_message",
            payload(json!({
                "conversation_id": "conv-42",
                "user_message": "I want a refund for last month",
            })),
            "chatwoot",
            Some("vaspera-memory".to_string()),
        )
        .await;

    let result = agent_result(&results);
    assert_eq!(result.agent_id, "support");
    assert!(result.success);
    // "refund" is a billing keyword, so the billing rule wins on priority.
    assert_eq!(result.output["message_type"], "billing");
    assert_eq!(result.output["escalation_reason"], "billing_issue");
    assert_eq!(result.output["conversation_id"], "conv-42");
    assert!(results[1].as_ref().unwrap()["audited"].is_string());
}

#[tokio::test]
async fn test_ads_optimization_kills_non_converting_campaign() {
    let orch = orchestrator().await;

    let results = orch
        .bus()
        .publish_sync("schedule.ads_optimization", Map::new(), "scheduler:ads_optimization", None)
        .await;

    let result = agent_result(&results);
    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result
        .actions_taken
        .contains(&"pause:meta_1:ads_3x_kill".to_string()));
    assert_eq!(result.output["summary"]["total_campaigns"], 2);
    assert_eq!(result.output["campaigns_by_platform"]["meta"], 1);
}

#[tokio::test]
async fn test_health_check_raises_alerts_for_degraded_product() {
    let health = StaticHealthSource::new().with_health(common::health("nutrifit-ai", 6.0, 5500.0, 99.0));
    let orch = Orchestrator::new(common::test_config(), sources(health))
        .await
        .unwrap();

    let results = orch
        .bus()
        .publish_sync("schedule.health_check", Map::new(), "scheduler:monitor_health_check", None)
        .await;

    let result = agent_result(&results);
    assert_eq!(
        result.actions_taken,
        vec!["alert:nutrifit-ai:3_issues", "sent_critical_alerts"]
    );
    assert_eq!(result.output["alerts"]["critical"], 3);
    assert_eq!(result.output["products"]["healthy"], 1);
    assert_eq!(result.output["overall_status"], "degraded");
}

#[tokio::test]
async fn test_dry_run_records_instead_of_executing() {
    let mut config = common::test_config();
    config.dry_run = true;
    let orch = Orchestrator::new(config, sources(StaticHealthSource::new()))
        .await
        .unwrap();

    let results = orch
        .bus()
        .publish_sync("marketing.ad_threshold", Map::new(), "test", Some("nutrifit-ai".to_string()))
        .await;

    let result = agent_result(&results);
    assert_eq!(result.output["summary"]["total_campaigns"], 1);
    assert!(result
        .actions_taken
        .iter()
        .all(|a| a.starts_with("dry_run:")));
    assert!(!result.actions_taken.is_empty());
}

#[tokio::test]
async fn test_release_and_weekly_schedule_reach_content_agent() {
    let orch = orchestrator().await;

    let results = orch
        .bus()
        .publish_sync(
            "github.release",
            payload(json!({ "tag_name": "v1.4.0", "changes": ["Shared workspaces"] })),
            "github",
            Some("vaspera-memory".to_string()),
        )
        .await;
    let release = agent_result(&results);
    assert_eq!(release.agent_id, "content");
    assert_eq!(release.actions_taken, vec!["changelog:vaspera-memory"]);
    assert_eq!(release.output["requires_approval"], true);
    assert!(release.output["changelog"]
        .as_str()
        .unwrap()
        .contains("- Shared workspaces"));

    let results = orch
        .bus()
        .publish_sync("schedule.weekly_content", Map::new(), "scheduler:weekly_content_calendar", None)
        .await;
    let calendar = agent_result(&results);
    assert_eq!(calendar.actions_taken, vec!["calendar:8_items"]);
    assert_eq!(calendar.output["items"][0]["title"], "Weekly Tips: NutriFitAI");
}

#[tokio::test]
async fn test_unknown_product_event_fails_agent_only() {
    let orch = orchestrator().await;

    let results = orch
        .bus()
        .publish_sync("schedule.health_check", Map::new(), "test", Some("ghost".to_string()))
        .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].as_ref().unwrap_err().contains("ghost"));
    assert!(results[1].is_ok(), "audit still runs");
}

#[tokio::test]
async fn test_run_dispatches_published_events_until_shutdown() {
    common::setup_test_logging();
    let orch = Arc::new(orchestrator().await);

    let runner = {
        let orch = Arc::clone(&orch);
        tokio::spawn(async move { orch.run().await })
    };
    assert!(common::wait_for(|| orch.bus().is_running(), 2000).await);

    orch.bus().publish(
        Event::new(
            "support.chat_message",
            payload(json!({ "user_message": "How do I export data?" })),
            "test",
        )
        .for_product("vaspera-memory"),
    );
    assert!(common::wait_for(|| orch.bus().stats().dispatched == 1, 2000).await);
    assert_eq!(orch.bus().stats().handler_failures, 0);

    orch.shutdown();
    runner.await.unwrap().unwrap();
    assert_eq!(orch.state().await, OrchestratorState::Stopped);
}
