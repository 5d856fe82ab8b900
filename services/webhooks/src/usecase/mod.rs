pub mod attempt;
pub mod connectivity;
pub mod event;
pub mod registration;
