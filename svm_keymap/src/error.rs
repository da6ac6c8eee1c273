use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeymapError {
    #[error("unknown hardware input id {0:?}")]
    UnknownInput(String),
    #[error("keymap {0:?} is not registered")]
    UnknownKeymap(String),
    #[error("keymap {keymap:?} has no action {action:?}")]
    UnknownAction { keymap: String, action: String },
    #[error("keymap {0:?} is already registered")]
    DuplicateKeymap(String),
}
