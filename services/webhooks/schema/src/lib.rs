//! sea-orm entities for the webhooks service tables.

pub mod attempts;
pub mod events;
pub mod registrations;
