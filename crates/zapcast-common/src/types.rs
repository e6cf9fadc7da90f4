//! Common types for ZapCast

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for campaigns
pub type CampaignId = Uuid;

/// Unique identifier for contact lists
pub type ContactListId = Uuid;

/// Unique identifier for outbound message records
pub type OutboundMessageId = Uuid;

const USER_SUFFIX: &str = "@c.us";
const GROUP_SUFFIX: &str = "@g.us";

/// A WhatsApp chat address.
///
/// The provider addresses individual chats as `<phone>@c.us` and group chats
/// as `<group-id>@g.us`. Contact lists store bare phone numbers; this type
/// normalizes them to the addressed form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatAddress(String);

impl ChatAddress {
    /// Normalize a raw target into a chat address.
    ///
    /// Values that already carry a chat suffix are kept as-is; bare phone
    /// numbers get the individual-chat suffix appended.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.contains('@') {
            Self(trimmed.to_string())
        } else {
            Self(format!("{}{}", trimmed, USER_SUFFIX))
        }
    }

    /// Whether this address refers to a group chat.
    pub fn is_group(&self) -> bool {
        self.0.ends_with(GROUP_SUFFIX)
    }

    /// The address as the provider expects it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChatAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ChatAddress> for String {
    fn from(addr: ChatAddress) -> Self {
        addr.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_phone() {
        let addr = ChatAddress::normalize("5511999999999");
        assert_eq!(addr.as_str(), "5511999999999@c.us");
        assert!(!addr.is_group());
    }

    #[test]
    fn test_normalize_keeps_addressed_form() {
        let addr = ChatAddress::normalize("5511999999999@c.us");
        assert_eq!(addr.as_str(), "5511999999999@c.us");
    }

    #[test]
    fn test_group_address() {
        let addr = ChatAddress::normalize("123456789-987654@g.us");
        assert!(addr.is_group());
        assert_eq!(addr.as_str(), "123456789-987654@g.us");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        let addr = ChatAddress::normalize(" 5511999999999 ");
        assert_eq!(addr.as_str(), "5511999999999@c.us");
    }
}
