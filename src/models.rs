pub mod auth;
pub mod clients;
pub mod inventory;
pub mod notifications;
pub mod orders;
