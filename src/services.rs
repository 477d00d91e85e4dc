pub mod auth;
pub use auth::AuthService;
pub mod notifier;
pub use notifier::{DbNotifier, Notifier};
pub mod inventory_service;
pub use inventory_service::InventoryService;
pub mod order_service;
pub use order_service::OrderService;
pub mod workflow_service;
pub use workflow_service::WorkflowService;
