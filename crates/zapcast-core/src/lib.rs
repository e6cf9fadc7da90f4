//! ZapCast Core - Campaign scheduling and delivery tracking
//!
//! This crate provides the campaign engine: recipient resolution, paced
//! dispatch through the WhatsApp gateway, the outbound message ledger, and
//! reconciliation of asynchronous delivery acknowledgements.

pub mod campaign;
pub mod wa;

pub use campaign::{
    AckReconciler, CampaignScheduler, DispatchOutcome, DispatchPacer, DispatchResult,
    MessageLedger, PacingWindow, Recipient, RecipientResolver, TickSummary,
};
pub use wa::{
    AckBus, AckEvent, AckLevel, GroupInfo, HttpBridgeGateway, SendReceipt, SessionStatus,
    WaGateway,
};
