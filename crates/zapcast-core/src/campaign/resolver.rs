//! Recipient resolution

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use zapcast_common::types::ChatAddress;
use zapcast_common::Result;
use zapcast_storage::models::TargetType;
use zapcast_storage::repository::ContactListRepository;

/// One concrete destination for a campaign pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub address: ChatAddress,
    /// True when the address is a group chat; the provider fans the send out
    /// to all participants as a single group message
    pub is_group: bool,
}

/// Expands a campaign's target reference into concrete recipients.
///
/// Pure lookup, no side effects. A missing contact list resolves to an empty
/// set (the pass sends to nobody); repository errors propagate and abort only
/// the owning campaign's pass for that tick.
pub struct RecipientResolver {
    lists: Arc<dyn ContactListRepository>,
}

impl RecipientResolver {
    /// Create a new resolver
    pub fn new(lists: Arc<dyn ContactListRepository>) -> Self {
        Self { lists }
    }

    /// Resolve a target into an ordered recipient sequence
    pub async fn resolve(&self, target_type: TargetType, target_id: &str) -> Result<Vec<Recipient>> {
        match target_type {
            TargetType::Group => Ok(vec![Recipient {
                address: ChatAddress::normalize(target_id),
                is_group: true,
            }]),
            TargetType::List => {
                let Ok(list_id) = Uuid::parse_str(target_id) else {
                    debug!(target_id, "Target is not a valid contact list id");
                    return Ok(Vec::new());
                };

                let Some(list) = self.lists.get(list_id).await? else {
                    debug!(%list_id, "Contact list not found");
                    return Ok(Vec::new());
                };

                Ok(list
                    .contacts_vec()
                    .into_iter()
                    .map(|contact| Recipient {
                        address: ChatAddress::normalize(&contact.phone),
                        is_group: false,
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::testing::MemBackend;
    use zapcast_storage::models::Contact;

    #[tokio::test]
    async fn test_group_target_yields_single_group_recipient() {
        let backend = MemBackend::new();
        let resolver = RecipientResolver::new(Arc::new(backend));

        let recipients = resolver
            .resolve(TargetType::Group, "123-456@g.us")
            .await
            .unwrap();

        assert_eq!(recipients.len(), 1);
        assert!(recipients[0].is_group);
        assert_eq!(recipients[0].address.as_str(), "123-456@g.us");
    }

    #[tokio::test]
    async fn test_list_target_yields_one_recipient_per_contact() {
        let backend = MemBackend::new();
        let list = backend.add_list(
            "VIP",
            vec![
                Contact {
                    phone: "5511999999999".to_string(),
                    name: Some("Ana".to_string()),
                },
                Contact {
                    phone: "5511888888888".to_string(),
                    name: None,
                },
            ],
        );
        let resolver = RecipientResolver::new(Arc::new(backend));

        let recipients = resolver
            .resolve(TargetType::List, &list.id.to_string())
            .await
            .unwrap();

        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0].address.as_str(), "5511999999999@c.us");
        assert!(!recipients[0].is_group);
        assert_eq!(recipients[1].address.as_str(), "5511888888888@c.us");
    }

    #[tokio::test]
    async fn test_missing_list_resolves_to_empty() {
        let backend = MemBackend::new();
        let resolver = RecipientResolver::new(Arc::new(backend));

        let recipients = resolver
            .resolve(TargetType::List, &Uuid::new_v4().to_string())
            .await
            .unwrap();

        assert!(recipients.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_list_id_resolves_to_empty() {
        let backend = MemBackend::new();
        let resolver = RecipientResolver::new(Arc::new(backend));

        let recipients = resolver
            .resolve(TargetType::List, "not-a-uuid")
            .await
            .unwrap();

        assert!(recipients.is_empty());
    }
}
