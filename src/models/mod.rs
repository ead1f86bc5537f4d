pub mod account;
pub mod app_config;
pub mod oauth;

pub use account::{AccountSummary, FederatedKey, IdentityNamespace, LocalAccount, Role};
pub use app_config::{AppConfig, AppState, ProviderEndpoints};
