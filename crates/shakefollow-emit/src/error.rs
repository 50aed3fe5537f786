use std::fmt;

#[derive(Debug)]
pub enum EmitError {
    Io(std::io::Error),
    Xml(String),
    Json(serde_json::Error),
    ShakeMapCommand { code: Option<i32>, stderr_tail: String },
    Archive(String),
    Mail(String),
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::Io(e) => write!(f, "emitter io error: {e}"),
            EmitError::Xml(m) => write!(f, "emitter xml error: {m}"),
            EmitError::Json(e) => write!(f, "emitter json error: {e}"),
            EmitError::ShakeMapCommand { code, stderr_tail } => {
                write!(f, "shake-map command exited with code {code:?}: {stderr_tail}")
            }
            EmitError::Archive(m) => write!(f, "emitter archive error: {m}"),
            EmitError::Mail(m) => write!(f, "emitter mail error: {m}"),
        }
    }
}

impl std::error::Error for EmitError {}

impl From<std::io::Error> for EmitError {
    fn from(e: std::io::Error) -> Self {
        EmitError::Io(e)
    }
}

impl From<serde_json::Error> for EmitError {
    fn from(e: serde_json::Error) -> Self {
        EmitError::Json(e)
    }
}
