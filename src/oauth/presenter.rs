use async_trait::async_trait;

use crate::error::CodeflowError;

/// Surface that shows the authorization page to the user: an external
/// browser, or an embedded web view owned by the host application.
#[async_trait]
pub trait AuthorizationPresenter: Send + Sync {
    /// Show the authorization page at `url`.
    async fn present(&self, url: &str) -> Result<(), CodeflowError>;

    /// Close the surface once the redirect has come back. External browsers
    /// cannot be closed, so the default does nothing.
    async fn dismiss(&self) {}
}

impl std::fmt::Debug for dyn AuthorizationPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationPresenter").finish_non_exhaustive()
    }
}

/// Opens the system browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserPresenter;

#[async_trait]
impl AuthorizationPresenter for BrowserPresenter {
    async fn present(&self, url: &str) -> Result<(), CodeflowError> {
        if webbrowser::open(url).is_err() {
            tracing::warn!("Could not open browser automatically. Please visit:\n{url}");
        }
        Ok(())
    }
}
