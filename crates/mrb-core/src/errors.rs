/// Core error type for the relay bot.
///
/// Adapter crates map their specific errors into this type so the relay core
/// can decide which reply the sender gets.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The destination chat does not exist or the bot may not write to it yet.
    #[error("recipient unreachable: {0}")]
    RecipientUnreachable(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn is_recipient_unreachable(&self) -> bool {
        matches!(self, Error::RecipientUnreachable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
