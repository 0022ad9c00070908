//! error types shared by the whole rendering engine

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A variable was read but nothing can supply its value
    #[error("variable not populated: {name} (used by {consumer})")]
    VariableNotPopulated { name: String, consumer: String },

    #[error("output not defined: {name} (collection {collection})")]
    OutputNotDefined { name: String, collection: String },

    /// A value source tried to change a value that was already accepted
    #[error("conflicting variable value for {name}: {old_source} and {new_source} disagree")]
    ConflictingVariableValue {
        name: String,
        old_source: String,
        new_source: String,
    },

    #[error("unrenderable value: {kind} at {location}")]
    Unrenderable { kind: &'static str, location: String },

    #[error("producer was resumed with an unexpected value, expected {expected}")]
    UnexpectedResume { expected: &'static str },

    #[error("producer {producer} suspended without emitting anything")]
    ProducerStalled { producer: String },

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("unable to serialize json")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
