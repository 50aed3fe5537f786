use std::fmt;

/// Provider-scoped errors. `Transport` and `Parse` map directly onto the
/// abstract `TransportError`/`ParseError` kinds; a provider failure never
/// crosses this boundary as a panic.
#[derive(Debug)]
pub enum ProviderError {
    Validation(String),
    Transport(String),
    Parse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Validation(m) => write!(f, "provider request invalid: {m}"),
            ProviderError::Transport(m) => write!(f, "provider transport failure: {m}"),
            ProviderError::Parse(m) => write!(f, "provider response parse failure: {m}"),
        }
    }
}

impl std::error::Error for ProviderError {}
