//! Content agent: drafts posts and changelogs, plans the weekly content
//! calendar and distributes approved pieces.
//!
//! The action comes from the payload `action` field when present;
//! otherwise `schedule.weekly_content` plans the calendar,
//! `github.release` drafts a changelog and anything else drafts a piece
//! of content.

use std::collections::BTreeMap;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::agent::Agent;
use crate::domain::models::event_types::{GITHUB_RELEASE, SCHEDULE_WEEKLY_CONTENT};
use crate::domain::models::{
    brand_voice, AgentResult, ContentDraft, ContentStatus, ContentType, Event, Platform, ProductConfig,
};
use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentAction {
    Create,
    Distribute,
    Calendar,
    Changelog,
}

impl ContentAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "distribute" => Some(Self::Distribute),
            "calendar" => Some(Self::Calendar),
            "changelog" => Some(Self::Changelog),
            _ => None,
        }
    }

    fn for_event(event: &Event) -> anyhow::Result<Self> {
        if let Some(action) = event.payload_str("action") {
            return Self::parse(action).ok_or_else(|| anyhow!("unknown content action '{action}'"));
        }
        Ok(match event.event_type.as_str() {
            SCHEDULE_WEEKLY_CONTENT => Self::Calendar,
            GITHUB_RELEASE => Self::Changelog,
            _ => Self::Create,
        })
    }
}

/// One slot of the weekly plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarItem {
    pub day: &'static str,
    pub product_id: String,
    pub content_type: ContentType,
    pub title: String,
    pub platforms: Vec<Platform>,
}

const SOCIAL_DAYS: [&str; 3] = ["Tuesday", "Thursday", "Saturday"];

pub struct ContentAgent {
    products: BTreeMap<String, ProductConfig>,
    dry_run: bool,
}

impl ContentAgent {
    pub const ID: &'static str = "content";

    pub fn new(products: BTreeMap<String, ProductConfig>, dry_run: bool) -> Self {
        Self { products, dry_run }
    }

    /// The configured product an event concerns.
    fn product<'a>(&'a self, event: &'a Event) -> Result<(&'a str, &'a ProductConfig), DomainError> {
        let product_id = event
            .product_id
            .as_deref()
            .or_else(|| event.payload_str("product_id"))
            .ok_or_else(|| DomainError::ValidationFailed("content action needs a product_id".to_string()))?;
        self.products
            .get_key_value(product_id)
            .map(|(id, product)| (id.as_str(), product))
            .ok_or_else(|| DomainError::UnknownProduct(product_id.to_string()))
    }

    fn draft(&self, event: &Event, now: DateTime<Utc>) -> anyhow::Result<ContentDraft> {
        let (product_id, product) = self.product(event)?;
        let content_type = match event.payload_str("content_type") {
            Some(raw) => ContentType::parse(raw).ok_or_else(|| anyhow!("unknown content type '{raw}'"))?,
            None => ContentType::BlogPost,
        };
        let name = product.name.as_str();

        let (title, body, summary, platforms, tags) = match content_type {
            ContentType::BlogPost => {
                let features = bullet_list(&string_list(&event.payload, "features"), "Latest improvements and fixes");
                (
                    format!("What's New in {name}"),
                    format!(
                        "# What's New in {name}\n\nWe're excited to share the latest updates.\n\n\
                         ## New Features\n\n{features}\n\n## Getting Started\n\n\
                         Update {name} to try these features today."
                    ),
                    Some(format!("Latest updates and features in {name}")),
                    vec![Platform::Blog, Platform::Twitter, Platform::Linkedin],
                    vec!["product-update".to_string(), "features".to_string(), product_id.to_string()],
                )
            }
            ContentType::SocialPost => (
                String::new(),
                format!("Exciting news from {name}! Check out our latest features."),
                None,
                vec![Platform::Twitter, Platform::Linkedin],
                vec![product_id.to_string()],
            ),
            _ => (
                format!("{name} Update"),
                event
                    .payload_str("body")
                    .map_or_else(|| format!("Latest news from {name}."), str::to_string),
                None,
                Vec::new(),
                vec![product_id.to_string()],
            ),
        };

        Ok(ContentDraft {
            content_id: format!("{}_{}", content_type.id_prefix(), now.format("%Y%m%d_%H%M%S")),
            product_id: product_id.to_string(),
            content_type,
            title,
            body,
            summary,
            platforms,
            tags,
            status: ContentStatus::Draft,
            requires_approval: true,
            brand_voice: brand_voice(&product.kind).to_string(),
            created_at: now,
        })
    }

    fn changelog(&self, event: &Event, now: DateTime<Utc>) -> Result<Value, DomainError> {
        let (product_id, product) = self.product(event)?;
        let version = event
            .payload_str("version")
            .or_else(|| event.payload_str("tag_name"))
            .unwrap_or("unreleased");
        let changes = bullet_list(&string_list(&event.payload, "changes"), "See the release notes on GitHub");

        let changelog = format!(
            "# {} Changelog\n\n## {version} - {}\n\n### Changes\n{changes}\n",
            product.name,
            now.format("%Y-%m-%d"),
        );

        Ok(json!({
            "product_id": product_id,
            "version": version,
            "changelog": changelog,
            "status": ContentStatus::Draft,
            "requires_approval": true,
            "platforms": [Platform::Github, Platform::Blog],
            "brand_voice": brand_voice(&product.kind),
        }))
    }

    fn calendar(&self, now: DateTime<Utc>) -> Value {
        let today = now.date_naive();
        let week_of = today
            .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
            .unwrap_or(today);

        let mut items = Vec::new();
        for (product_id, product) in &self.products {
            items.push(CalendarItem {
                day: "Monday",
                product_id: product_id.clone(),
                content_type: ContentType::BlogPost,
                title: format!("Weekly Tips: {}", product.name),
                platforms: vec![Platform::Blog, Platform::Linkedin],
            });
            for day in SOCIAL_DAYS {
                items.push(CalendarItem {
                    day,
                    product_id: product_id.clone(),
                    content_type: ContentType::SocialPost,
                    title: format!("{} tip of the day", product.name),
                    platforms: vec![Platform::Twitter, Platform::Linkedin],
                });
            }
        }

        json!({
            "week_of": week_of.to_string(),
            "total_pieces": items.len(),
            "items": items,
        })
    }

    /// Publish an approved piece. Unknown platform names are reported and
    /// skipped.
    fn distribute(&self, event: &Event, now: DateTime<Utc>) -> anyhow::Result<(Value, Vec<String>)> {
        let content_id = event
            .payload_str("content_id")
            .ok_or_else(|| DomainError::ValidationFailed("distribute needs a content_id".to_string()))?;

        let mut errors = Vec::new();
        let mut platforms = Vec::new();
        for name in string_list(&event.payload, "platforms") {
            match Platform::parse(name) {
                Some(platform) if !platforms.contains(&platform) => platforms.push(platform),
                Some(_) => {}
                None => {
                    warn!(content_id, platform = name, "unknown platform");
                    errors.push(format!("unknown platform '{name}'"));
                }
            }
        }

        let mut results = Map::new();
        for platform in &platforms {
            let result = if self.dry_run {
                json!({ "status": ContentStatus::DryRun })
            } else {
                info!(content_id, platform = %platform, "content published");
                json!({
                    "status": ContentStatus::Published,
                    "url": format!("https://{platform}.com/post/{content_id}"),
                    "published_at": now.to_rfc3339(),
                })
            };
            results.insert(platform.to_string(), result);
        }

        let output = json!({
            "content_id": content_id,
            "platforms": platforms,
            "results": results,
        });
        Ok((output, errors))
    }
}

fn string_list<'a>(payload: &'a Map<String, Value>, key: &str) -> Vec<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn bullet_list(items: &[&str], fallback: &str) -> String {
    if items.is_empty() {
        return format!("- {fallback}");
    }
    items.iter().map(|item| format!("- {item}")).collect::<Vec<_>>().join("\n")
}

#[async_trait]
impl Agent for ContentAgent {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Content Agent"
    }

    async fn execute(&self, event: &Event) -> anyhow::Result<AgentResult> {
        let now = Utc::now();
        let action = ContentAction::for_event(event)?;

        let (output, action_tag, errors) = match action {
            ContentAction::Create => {
                let draft = self.draft(event, now)?;
                info!(content_id = %draft.content_id, product_id = %draft.product_id, "content drafted");
                let tag = format!("created:{}", draft.content_type);
                (serde_json::to_value(&draft)?, tag, Vec::new())
            }
            ContentAction::Changelog => {
                let output = self.changelog(event, now)?;
                let tag = format!("changelog:{}", output["product_id"].as_str().unwrap_or_default());
                (output, tag, Vec::new())
            }
            ContentAction::Calendar => {
                let output = self.calendar(now);
                let tag = format!("calendar:{}_items", output["total_pieces"]);
                (output, tag, Vec::new())
            }
            ContentAction::Distribute => {
                let (output, errors) = self.distribute(event, now)?;
                let count = output["platforms"].as_array().map_or(0, Vec::len);
                (output, format!("distributed:{count}_platforms"), errors)
            }
        };

        let action_tag = if self.dry_run && action == ContentAction::Distribute {
            format!("dry_run:{action_tag}")
        } else {
            action_tag
        };

        Ok(AgentResult::success(Self::ID, output)
            .with_actions(vec![action_tag])
            .with_errors(errors))
    }
}
