use tonic::Status;

/// Failures raised by the token pipeline.
///
/// All verification failures are terminal for the calling RPC and map to
/// `Unauthenticated`; they are never retried internally.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization token")]
    MissingToken,

    #[error("invalid access token: {0}")]
    InvalidToken(String),

    #[error("access token has expired")]
    Expired,

    #[error("cannot sign access token: {0}")]
    Signing(String),
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::Expired => {
                Status::unauthenticated(err.to_string())
            }
            AuthError::Signing(_) => Status::internal(err.to_string()),
        }
    }
}
