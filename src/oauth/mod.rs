pub mod callback;
pub mod client;
pub mod prompt;
pub mod registration;
pub mod session;
pub mod store;
pub mod token;

pub use callback::CallbackListener;
pub use client::{is_expired, AuthorizationClient};
pub use prompt::{extract_code, CodePrompt, StdinPrompt};
pub use registration::{ApplicationKind, ClientRegistration};
pub use session::{AuthSession, AuthorizedSession};
pub use store::CredentialStore;
pub use token::GrantedToken;
