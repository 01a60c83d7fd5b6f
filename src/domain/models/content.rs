//! Content pieces, distribution channels and per-product brand voice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    BlogPost,
    Changelog,
    SocialPost,
    Newsletter,
    Documentation,
    Announcement,
}

impl ContentType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlogPost => "blog_post",
            Self::Changelog => "changelog",
            Self::SocialPost => "social_post",
            Self::Newsletter => "newsletter",
            Self::Documentation => "documentation",
            Self::Announcement => "announcement",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blog_post" => Some(Self::BlogPost),
            "changelog" => Some(Self::Changelog),
            "social_post" => Some(Self::SocialPost),
            "newsletter" => Some(Self::Newsletter),
            "documentation" => Some(Self::Documentation),
            "announcement" => Some(Self::Announcement),
            _ => None,
        }
    }

    /// Prefix of generated content ids.
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::BlogPost => "blog",
            Self::SocialPost => "social",
            Self::Changelog => "changelog",
            Self::Newsletter | Self::Documentation | Self::Announcement => "content",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where content gets published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Blog,
    Twitter,
    Linkedin,
    Newsletter,
    Github,
    Discord,
}

impl Platform {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Twitter => "twitter",
            Self::Linkedin => "linkedin",
            Self::Newsletter => "newsletter",
            Self::Github => "github",
            Self::Discord => "discord",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "blog" => Some(Self::Blog),
            "twitter" => Some(Self::Twitter),
            "linkedin" => Some(Self::Linkedin),
            "newsletter" => Some(Self::Newsletter),
            "github" => Some(Self::Github),
            "discord" => Some(Self::Discord),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Published,
    DryRun,
}

/// Writing guidelines by product kind; unknown kinds get the `saas` voice.
pub fn brand_voice(kind: &str) -> &'static str {
    match kind {
        "open-source-saas" => "Developer-friendly, authentic, community-focused",
        "consumer-app" => "Friendly, motivational, approachable",
        "fintech" => "Trustworthy, precise, professional",
        _ => "Professional, helpful, technical but accessible",
    }
}

/// A drafted piece of content. Drafts always wait for a human to approve
/// them before distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentDraft {
    pub content_id: String,
    pub product_id: String,
    pub content_type: ContentType,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub platforms: Vec<Platform>,
    pub tags: Vec<String>,
    pub status: ContentStatus,
    pub requires_approval: bool,
    pub brand_voice: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_names_match_serde() {
        for kind in [
            ContentType::BlogPost,
            ContentType::Changelog,
            ContentType::SocialPost,
            ContentType::Newsletter,
            ContentType::Documentation,
            ContentType::Announcement,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
            assert_eq!(ContentType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ContentType::parse("podcast"), None);
    }

    #[test]
    fn test_platform_parse_ignores_case() {
        assert_eq!(Platform::parse("LinkedIn"), Some(Platform::Linkedin));
        assert_eq!(Platform::parse("myspace"), None);
        assert_eq!(serde_json::to_value(Platform::Github).unwrap(), "github");
    }

    #[test]
    fn test_brand_voice_falls_back_to_saas() {
        assert_eq!(brand_voice("consumer-app"), "Friendly, motivational, approachable");
        assert_eq!(brand_voice(""), brand_voice("saas"));
    }
}
