#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cannot read {path}: {reason}")]
    UnreadableInput { path: String, reason: String },

    #[error("No {0} given: pass a file or pipe it on stdin")]
    MissingInput(&'static str),

    #[error("Cannot derive an output name from {0}")]
    NoOutputName(String),
}
