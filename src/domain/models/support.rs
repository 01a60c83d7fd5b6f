//! Support chat classification.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Question,
    BugReport,
    FeatureRequest,
    Billing,
    Complaint,
    Feedback,
    Other,
}

impl MessageType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::BugReport => "bug_report",
            Self::FeatureRequest => "feature_request",
            Self::Billing => "billing",
            Self::Complaint => "complaint",
            Self::Feedback => "feedback",
            Self::Other => "other",
        }
    }

    /// Keyword classifier. First matching category wins.
    pub fn classify(message: &str) -> Self {
        const CATEGORIES: [(MessageType, &[&str]); 6] = [
            (
                MessageType::BugReport,
                &["bug", "error", "broken", "doesn't work", "crash"],
            ),
            (
                MessageType::FeatureRequest,
                &["feature", "add", "would be nice", "suggestion"],
            ),
            (
                MessageType::Billing,
                &["bill", "charge", "payment", "invoice", "subscription", "refund"],
            ),
            (
                MessageType::Complaint,
                &["terrible", "awful", "worst", "hate", "disappointed"],
            ),
            (
                MessageType::Feedback,
                &["love", "great", "thanks", "awesome", "feedback"],
            ),
            (
                MessageType::Question,
                &["how", "what", "why", "where", "can i", "is it possible"],
            ),
        ];

        let lower = message.to_lowercase();
        CATEGORIES
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map_or(Self::Other, |(kind, _)| *kind)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    BillingIssue,
    RefundRequest,
    ComplexTechnical,
    AngryCustomer,
    LegalCompliance,
    CannotResolve,
    HumanRequested,
}

impl EscalationReason {
    pub const ALL: [Self; 7] = [
        Self::BillingIssue,
        Self::RefundRequest,
        Self::ComplexTechnical,
        Self::AngryCustomer,
        Self::LegalCompliance,
        Self::CannotResolve,
        Self::HumanRequested,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BillingIssue => "billing_issue",
            Self::RefundRequest => "refund_request",
            Self::ComplexTechnical => "complex_technical",
            Self::AngryCustomer => "angry_customer",
            Self::LegalCompliance => "legal_compliance",
            Self::CannotResolve => "cannot_resolve",
            Self::HumanRequested => "human_requested",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }

    /// What the customer is told when handed to a human.
    pub const fn customer_message(self) -> &'static str {
        match self {
            Self::BillingIssue => {
                "I understand you have a billing question. Let me connect you with our \
                 billing team who can help you directly. Someone will be with you shortly."
            }
            Self::RefundRequest => {
                "I see you're requesting a refund. I'm connecting you with our support team \
                 who can process this for you. Please hold on."
            }
            Self::AngryCustomer => {
                "I'm sorry you're having a frustrating experience. Let me connect you with \
                 a senior support representative who can help resolve this right away."
            }
            Self::HumanRequested => {
                "Of course! I'm connecting you with a human support representative now. \
                 Someone will be with you shortly."
            }
            Self::ComplexTechnical => {
                "This looks like a complex technical issue. Let me connect you with our \
                 engineering support team for specialized assistance."
            }
            Self::CannotResolve | Self::LegalCompliance => {
                "I want to make sure you get the best help possible. Let me connect you \
                 with a human representative who can assist further."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_in_category_order() {
        assert_eq!(MessageType::classify("The app keeps crashing with an error"), MessageType::BugReport);
        assert_eq!(MessageType::classify("I was charged twice on my invoice"), MessageType::Billing);
        assert_eq!(MessageType::classify("How do I export my notes?"), MessageType::Question);
        assert_eq!(MessageType::classify("ok"), MessageType::Other);
    }

    #[test]
    fn test_escalation_reason_parse() {
        for reason in EscalationReason::ALL {
            assert_eq!(EscalationReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(EscalationReason::parse("bored"), None);
    }
}
