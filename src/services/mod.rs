pub mod ads_rules;
pub mod event_bus;
pub mod event_scheduler;
pub mod monitor_rules;
pub mod rules_engine;
pub mod support_rules;

pub use ads_rules::{ads_domain, setup_ads_rules, AdsRuleParams};
pub use event_bus::{BusState, BusStats, EventBus, EventHandler, FnEventHandler, SubscriptionId};
pub use event_scheduler::{setup_default_schedules, EventScheduler, JobInfo, JobTrigger};
pub use monitor_rules::{setup_monitor_rules, MONITOR_DOMAIN};
pub use rules_engine::{ActionHandler, FnActionHandler, RulesEngine};
pub use support_rules::{setup_support_rules, SUPPORT_DOMAIN};
