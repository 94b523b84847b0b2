//! Lead lifecycle: creation, posting, purchase, and terminal states.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{BuyerType, Lead, LeadDraft, LeadId, LeadPatch, LeadStatus, LeadView};
pub use repository::LeadRepository;
pub use router::lead_router;
pub use service::{LeadError, LeadService};
