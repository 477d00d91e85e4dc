pub mod auth;
pub mod clients;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod users;
pub mod workflow;
