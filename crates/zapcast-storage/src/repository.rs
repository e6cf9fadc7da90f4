//! Repository layer for data access

pub mod campaigns;
pub mod contact_lists;
pub mod outbound;

pub use campaigns::{CampaignRepository, DbCampaignRepository};
pub use contact_lists::{ContactListRepository, DbContactListRepository};
pub use outbound::{DbOutboundMessageRepository, OutboundMessageRepository};
