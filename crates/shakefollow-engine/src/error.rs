use std::fmt;

/// Engine runner errors. `Config` matches the abstract `ConfigError` kind
/// (missing binary, unwritable paths, malformed templates); `NonZeroExit`
/// and `OutputParse` match `EngineError`. All are fatal for the run that
/// produced them.
#[derive(Debug)]
pub enum EngineError {
    Config(String),
    Io(std::io::Error),
    NonZeroExit { code: Option<i32>, stderr_tail: String },
    OutputParse(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(m) => write!(f, "engine config error: {m}"),
            EngineError::Io(e) => write!(f, "engine io error: {e}"),
            EngineError::NonZeroExit { code, stderr_tail } => {
                write!(f, "engine exited with code {code:?}: {stderr_tail}")
            }
            EngineError::OutputParse(m) => write!(f, "engine output parse error: {m}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e)
    }
}
