pub mod cli;
pub mod config;
pub mod error;
pub mod oauth;
pub mod transport;
pub mod transports;

pub use config::{load_config, OAuth2Config};
pub use error::CodeflowError;
pub use oauth::{
    decode_claims, AuthorizationPresenter, AuthorizationState, BrowserPresenter, FileSession,
    InMemorySession, LifecycleHandle, LoginResult, OAuth2Module, OpenIdClaim, ProviderProfile,
    Session, SessionStore,
};
pub use transport::{HttpTransport, ResponseBody};
pub use transports::ReqwestTransport;
