use crate::graph::Node;
use thiserror::Error;

/// Errors raised by graph construction, parsing, configuration and the solving engines.
#[derive(Debug, Error)]
pub enum MwcsError {
    #[error("node {0} does not exist")]
    InvalidReference(Node),

    #[error("self-loop at node {0} is not allowed")]
    SelfLoop(Node),

    #[error("node '{0}' is defined more than once")]
    DuplicateNode(String),

    #[error("graph has no candidate roots")]
    NoCandidateRoots,

    #[error("parse error in line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("solver engine failure: {0}")]
    Engine(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MwcsError {
    pub fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        MwcsError::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MwcsError>;
