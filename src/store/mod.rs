pub mod accounts;
pub mod pending;
pub mod settings;

pub use accounts::{AccountStore, InMemoryAccountStore, ProfileUpdate};
pub use pending::{InMemoryPendingStore, PendingAuthorizationStore, spawn_sweeper};
pub use settings::{InMemorySettingsStore, ProviderCredentials, ProviderSettings, SettingsStore};
