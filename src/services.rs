//! Small external collaborators: authentication, navigation, notices.

use async_trait::async_trait;

use crate::error::AuthError;

/// An identity token obtained from the authentication provider.
///
/// Opaque to this crate; presented verbatim to the room server on join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityToken(pub String);

impl IdentityToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The authentication provider.
///
/// Joining any room requires an identity token. The session path treats a
/// missing identity as a hard failure; the room-transition path treats it
/// as a silent no-op.
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// Obtain a token for the currently authenticated identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if no authenticated identity exists.
    async fn identity_token(&self) -> Result<IdentityToken, AuthError>;
}

/// The navigation/routing collaborator.
pub trait Navigator: Send + Sync + 'static {
    /// Navigate to `path`.
    fn go_to(&self, path: &str);

    /// The path the user is currently on.
    ///
    /// Disconnect classification needs this: a forced disconnect only
    /// redirects when the user is still on the lobby view.
    fn current_path(&self) -> String;
}

/// User-facing notice channel (toast, dialog — presentation is external).
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, message: &str);
}
