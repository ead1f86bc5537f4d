pub mod account_resolver;
pub mod completion;
pub mod pkce;
pub mod session;

pub use account_resolver::AccountResolver;
pub use completion::{CompletionMessage, CompletionResponder};
pub use pkce::AuthorizationSeed;
pub use session::{AuthSession, SessionAccount, SessionEstablisher};
