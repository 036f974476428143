use kvbox_types::ValueKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    /// No storage primitive passed the probe and self-test.
    #[error("storage is not supported in this environment")]
    Unsupported,

    #[error("codec error: {0}")]
    Codec(#[from] kvbox_codec::CodecError),

    #[error("backend error: {0}")]
    Backend(#[from] kvbox_store::BackendError),

    /// A bulk load decoded to something other than an object or array.
    #[error("cannot load a {0} as a store document")]
    NotADocument(ValueKind),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SdkError {
    /// Caller or setup mistakes, as opposed to environment or data failures.
    pub fn is_configuration(&self) -> bool {
        match self {
            SdkError::Config(_) => true,
            SdkError::Codec(e) => e.is_configuration(),
            _ => false,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
