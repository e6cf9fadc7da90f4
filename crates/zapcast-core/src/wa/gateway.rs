//! Gateway trait and session types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zapcast_common::types::ChatAddress;
use zapcast_common::Result;

/// WhatsApp session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Disconnected,
    Initializing,
    Scanning,
    Connected,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Disconnected => write!(f, "disconnected"),
            SessionStatus::Initializing => write!(f, "initializing"),
            SessionStatus::Scanning => write!(f, "scanning"),
            SessionStatus::Connected => write!(f, "connected"),
        }
    }
}

/// Receipt for an accepted outbound message
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Provider-assigned message id; absent when the provider did not echo
    /// one back
    pub provider_message_id: Option<String>,
}

/// A group chat visible to the connected session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: String,
    pub name: String,
    pub participants: u32,
}

/// The messaging collaborator the engine drives.
///
/// A single session is shared by all campaigns; the sequential pacer ensures
/// only one logical send is in flight at a time.
#[async_trait]
pub trait WaGateway: Send + Sync {
    /// Current session status; transport failures read as disconnected
    async fn status(&self) -> SessionStatus;

    /// Send one message. When `media_url` is present the media is attached
    /// with `content` as its caption.
    async fn send_message(
        &self,
        to: &ChatAddress,
        content: &str,
        media_url: Option<&str>,
    ) -> Result<SendReceipt>;

    /// Group chats available to the connected session
    async fn groups(&self) -> Result<Vec<GroupInfo>>;
}
