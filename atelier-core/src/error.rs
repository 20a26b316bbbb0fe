use thiserror::Error as ThisError;

/// Error taxonomy shared by the service layer and its collaborators.
///
/// Repository implementations map their transport failures into
/// `Unavailable`; the service layer surfaces collaborator errors
/// unchanged and never retries.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    // Reserved for overlap rejection; currently raised for business
    // rejections such as insufficient credit.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }
}
