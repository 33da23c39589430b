pub mod cache;
pub mod claims;
pub mod module;
pub mod presenter;
pub mod profile;
pub mod redirect;
pub mod session;
pub mod state;
pub mod token;

pub use cache::{session_path, FileSession};
pub use claims::{decode_claims, OpenIdClaim};
pub use module::{LoginResult, OAuth2Module};
pub use presenter::{AuthorizationPresenter, BrowserPresenter};
pub use profile::{ProfileKind, ProviderProfile};
pub use redirect::{extract_code, listen_for_redirect};
pub use session::{InMemorySession, Session, SessionStore};
pub use state::{
    AuthorizationSignal, AuthorizationState, AuthorizationStateMachine, LifecycleHandle,
    PendingRequest,
};
pub use token::TokenGrant;
