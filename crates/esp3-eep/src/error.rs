use crate::profile::ProfileId;

/// Errors raised while loading profiles or encoding field values.
#[derive(Debug, thiserror::Error)]
pub enum EepError {
    /// No profile (or no matching data block) for the requested identifiers.
    #[error("no profile for {id}{}", command_suffix(.command))]
    ProfileNotFound { id: ProfileId, command: Option<u8> },

    /// The field shortcut is not part of the selected data block.
    #[error("unknown field {0}")]
    UnknownField(String),

    /// The value does not fit the field.
    #[error("value {value} out of range for field {shortcut} (max {max})")]
    ValueOutOfRange {
        shortcut: String,
        value: String,
        max: u64,
    },

    /// No enum item of the field carries this label.
    #[error("field {shortcut} has no item labelled {label:?}")]
    UnknownLabel { shortcut: String, label: String },

    /// The field's bit range lies outside the payload.
    #[error("field {shortcut} ({size} bits at offset {offset}) outside payload of {len} bits")]
    FieldOutOfBounds {
        shortcut: String,
        offset: usize,
        size: usize,
        len: usize,
    },

    /// A profile document is structurally invalid.
    #[error("invalid profile {id}: {reason}")]
    InvalidProfile { id: String, reason: String },

    /// A profile identifier string could not be parsed.
    #[error("invalid profile id {0:?}")]
    InvalidProfileId(String),

    /// The profile source could not be read.
    #[error("failed to load profiles: {0}")]
    LoadFailed(String),

    /// The document is not valid JSON or does not match the profile model.
    #[error("invalid profile document: {0}")]
    Json(#[from] serde_json::Error),
}

fn command_suffix(command: &Option<u8>) -> String {
    command
        .map(|command| format!(" (command {command})"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, EepError>;
