//! Orchestrator: wires rules, agents, the event bus and the scheduler
//! from a [`Config`] and runs them until shutdown.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ads_agent::{AdsAgent, ExecutionPolicy};
use super::agent::{Agent, AgentEventHandler};
use super::content_agent::ContentAgent;
use super::monitor_agent::MonitorAgent;
use super::support_agent::SupportAgent;
use crate::adapters::action_handlers::LoggingActionHandler;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::event_types::WILDCARD;
use crate::domain::models::{AgentConfig, Config, Event, RuleAction};
use crate::domain::ports::{CampaignSource, HealthSource};
use crate::services::ads_rules::{ads_domain, setup_ads_rules, AdsRuleParams};
use crate::services::event_bus::{EventBus, FnEventHandler};
use crate::services::event_scheduler::{setup_default_schedules, EventScheduler};
use crate::services::monitor_rules::setup_monitor_rules;
use crate::services::rules_engine::RulesEngine;
use crate::services::support_rules::setup_support_rules;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Stopped,
    Running,
    Stopping,
}

/// Data sources the agents read from.
#[derive(Clone)]
pub struct Sources {
    pub campaigns: Arc<dyn CampaignSource>,
    pub health: Arc<dyn HealthSource>,
}

pub struct Orchestrator {
    config: Config,
    engine: Arc<RulesEngine>,
    bus: Arc<EventBus>,
    scheduler: Arc<EventScheduler>,
    agents: BTreeMap<String, Arc<dyn Agent>>,
    state: RwLock<OrchestratorState>,
    /// Latches to true on the first shutdown request.
    shutdown_tx: watch::Sender<bool>,
}

impl Orchestrator {
    /// Rules engine with every rule set the config asks for and a logging
    /// handler for each action.
    pub fn build_engine(config: &Config) -> DomainResult<RulesEngine> {
        let mut engine = RulesEngine::new();

        for (product_id, product) in &config.products {
            let params = AdsRuleParams::from_product(product);
            setup_ads_rules(&mut engine, &ads_domain(product_id), &params)?;
            debug!(product_id = %product_id, target_cpa = params.target_cpa, "ads rules configured");
        }
        setup_monitor_rules(&mut engine, &config.monitor)?;
        setup_support_rules(&mut engine)?;

        for action in RuleAction::ALL {
            engine.register_action_handler(action, Arc::new(LoggingActionHandler::new(action)));
        }
        Ok(engine)
    }

    /// Build everything and subscribe enabled agents to their triggers.
    ///
    /// Nothing runs until [`Orchestrator::run`].
    pub async fn new(config: Config, sources: Sources) -> DomainResult<Self> {
        let engine = Arc::new(Self::build_engine(&config)?);
        let bus = Arc::new(EventBus::new(config.event_bus.clone()));
        let scheduler = Arc::new(EventScheduler::new(Arc::clone(&bus), config.scheduler.clone()));

        if config.scheduler.default_schedules {
            setup_default_schedules(&scheduler).await?;
        }

        let mut agents: BTreeMap<String, Arc<dyn Agent>> = BTreeMap::new();
        for (agent_id, agent_config) in &config.agents {
            if !agent_config.enabled {
                debug!(agent_id = %agent_id, "agent disabled, skipping");
                continue;
            }
            let agent = Self::build_agent(agent_id, agent_config, &config, &engine, &sources)?;
            for trigger in &agent_config.triggers {
                bus.subscribe(trigger.event_type.clone(), Arc::new(AgentEventHandler::new(Arc::clone(&agent))))
                    .await;
            }
            info!(
                agent_id = %agent_id,
                triggers = agent_config.triggers.len(),
                "agent registered"
            );
            agents.insert(agent_id.clone(), agent);
        }

        bus.subscribe(
            WILDCARD,
            Arc::new(FnEventHandler::new("audit", |event: &Event| {
                info!(
                    event_id = %event.id(),
                    event_type = %event.event_type,
                    source = %event.source,
                    product_id = event.product_id.as_deref().unwrap_or(""),
                    "event audited"
                );
                Ok(json!({ "audited": event.id().to_string() }))
            })),
        )
        .await;

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            engine,
            bus,
            scheduler,
            agents,
            state: RwLock::new(OrchestratorState::Stopped),
            shutdown_tx,
        })
    }

    fn build_agent(
        agent_id: &str,
        agent_config: &AgentConfig,
        config: &Config,
        engine: &Arc<RulesEngine>,
        sources: &Sources,
    ) -> DomainResult<Arc<dyn Agent>> {
        let product_ids: Vec<String> = config.products.keys().cloned().collect();

        let agent: Arc<dyn Agent> = match agent_id {
            AdsAgent::ID => Arc::new(AdsAgent::new(
                Arc::clone(engine),
                Arc::clone(&sources.campaigns),
                product_ids,
                ExecutionPolicy {
                    dry_run: config.dry_run,
                    approval_required: agent_config.approval_required,
                },
            )),
            MonitorAgent::ID => Arc::new(MonitorAgent::new(
                Arc::clone(engine),
                Arc::clone(&sources.health),
                product_ids,
                config.monitor,
                config.dry_run,
            )),
            SupportAgent::ID => {
                let names = config
                    .products
                    .iter()
                    .map(|(id, p)| (id.clone(), p.name.clone()))
                    .collect();
                Arc::new(SupportAgent::new(Arc::clone(engine), names, config.dry_run))
            }
            ContentAgent::ID => Arc::new(ContentAgent::new(config.products.clone(), config.dry_run)),
            other => return Err(DomainError::UnknownAgent(other.to_string())),
        };
        Ok(agent)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &Arc<RulesEngine> {
        &self.engine
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn scheduler(&self) -> &Arc<EventScheduler> {
        &self.scheduler
    }

    pub fn agent_ids(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    pub async fn state(&self) -> OrchestratorState {
        *self.state.read().await
    }

    /// Run the bus and the scheduler until Ctrl-C or [`Orchestrator::shutdown`].
    ///
    /// Returns immediately if shutdown was already requested.
    pub async fn run(&self) -> anyhow::Result<()> {
        let shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            info!("shutdown already requested, not starting");
            return Ok(());
        }
        {
            let mut state = self.state.write().await;
            if *state != OrchestratorState::Stopped {
                anyhow::bail!("Orchestrator is already running");
            }
            *state = OrchestratorState::Running;
        }

        let bus_handle = Arc::clone(&self.bus).spawn();
        let scheduler_handle = Arc::clone(&self.scheduler).spawn();

        info!(
            products = self.config.products.len(),
            agents = self.agents.len(),
            rules = self.engine.list_rules(None).len(),
            dry_run = self.config.dry_run,
            "orchestrator started"
        );

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("received Ctrl-C, shutting down"),
                    Err(e) => warn!(error = %e, "failed to listen for Ctrl-C, shutting down"),
                }
            }
            () = wait_for_shutdown(shutdown_rx) => {
                info!("shutdown requested");
            }
        }

        *self.state.write().await = OrchestratorState::Stopping;
        self.bus.stop();
        self.scheduler.stop();
        join_with_timeout("event bus", bus_handle).await;
        join_with_timeout("scheduler", scheduler_handle).await;

        *self.state.write().await = OrchestratorState::Stopped;
        info!(stats = ?self.bus.stats(), "orchestrator stopped");
        Ok(())
    }

    /// Ask the orchestrator to stop. Safe to call at any time; a request
    /// made before `run` makes `run` return without starting.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        self.bus.stop();
        self.scheduler.stop();
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn join_with_timeout(name: &str, handle: JoinHandle<()>) {
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
        Ok(Ok(())) => debug!(task = name, "task stopped"),
        Ok(Err(e)) => warn!(task = name, error = %e, "task ended abnormally"),
        Err(_) => warn!(task = name, "task shutdown timeout"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::static_sources::{StaticCampaignSource, StaticHealthSource};
    use crate::domain::models::ProductConfig;

    fn sources() -> Sources {
        Sources {
            campaigns: Arc::new(StaticCampaignSource::with_fixtures()),
            health: Arc::new(StaticHealthSource::new()),
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config
            .products
            .insert("vaspera-memory".to_string(), ProductConfig::new("VasperaMemory"));
        config
            .products
            .insert("nutrifit-ai".to_string(), ProductConfig::new("NutriFitAI"));
        config
    }

    #[test]
    fn test_build_engine_registers_all_rule_sets() {
        let engine = Orchestrator::build_engine(&config()).unwrap();

        assert_eq!(engine.rule_count("ads.vaspera-memory"), 7);
        assert_eq!(engine.rule_count("ads.nutrifit-ai"), 7);
        assert_eq!(engine.rule_count("monitor"), 5);
        assert_eq!(engine.rule_count("support"), 4);
        assert!(RuleAction::ALL.iter().all(|a| engine.has_handler(*a)));
    }

    #[tokio::test]
    async fn test_agents_subscribe_to_triggers() {
        let orch = Orchestrator::new(config(), sources()).await.unwrap();

        assert_eq!(orch.agent_ids(), vec!["ads", "content", "monitor", "support"]);
        assert_eq!(orch.bus().subscriber_count("support.chat_message").await, 1);
        assert_eq!(orch.bus().subscriber_count("github.release").await, 1);
        assert_eq!(orch.bus().subscriber_count("schedule.weekly_content").await, 1);
        assert_eq!(orch.bus().subscriber_count(WILDCARD).await, 1);
        assert_eq!(orch.scheduler().list_jobs().await.len(), 5);
    }

    #[tokio::test]
    async fn test_disabled_agent_is_not_subscribed() {
        let mut config = config();
        if let Some(support) = config.agents.get_mut("support") {
            support.enabled = false;
        }
        let orch = Orchestrator::new(config, sources()).await.unwrap();

        assert_eq!(orch.bus().subscriber_count("support.chat_message").await, 0);
        assert!(!orch.agent_ids().contains(&"support"));
    }

    #[tokio::test]
    async fn test_unknown_agent_is_rejected() {
        let mut config = config();
        config
            .agents
            .insert("seo".to_string(), AgentConfig::new("SEO", "Auditor", "Audit"));

        let err = Orchestrator::new(config, sources()).await.err().unwrap();
        assert!(matches!(err, DomainError::UnknownAgent(id) if id == "seo"));
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let mut config = config();
        config.scheduler.default_schedules = false;
        let orch = Arc::new(Orchestrator::new(config, sources()).await.unwrap());

        let runner = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.run().await })
        };
        for _ in 0..50 {
            if orch.state().await == OrchestratorState::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(orch.state().await, OrchestratorState::Running);

        orch.shutdown();
        runner.await.unwrap().unwrap();
        assert_eq!(orch.state().await, OrchestratorState::Stopped);
        assert!(!orch.bus().is_running());
    }

    #[tokio::test]
    async fn test_shutdown_before_run_is_not_lost() {
        let mut config = config();
        config.scheduler.default_schedules = false;
        let orch = Orchestrator::new(config, sources()).await.unwrap();

        orch.shutdown();
        tokio::time::timeout(Duration::from_secs(2), orch.run())
            .await
            .expect("run should return once shutdown was requested")
            .unwrap();

        assert_eq!(orch.state().await, OrchestratorState::Stopped);
        assert!(!orch.bus().is_running());
        assert!(!orch.scheduler().is_running());
    }

    #[tokio::test]
    async fn test_shutdown_racing_startup_stops_run() {
        let mut config = config();
        config.scheduler.default_schedules = false;
        let orch = Arc::new(Orchestrator::new(config, sources()).await.unwrap());

        let runner = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.run().await })
        };
        // No wait for Running: the request may land before or after startup.
        orch.shutdown();

        tokio::time::timeout(Duration::from_secs(2), runner)
            .await
            .expect("run should stop")
            .unwrap()
            .unwrap();
        assert_eq!(orch.state().await, OrchestratorState::Stopped);
    }
}
