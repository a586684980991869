//! Error types for the solve pipeline and hierarchy edits

use thiserror::Error;

use crate::error::ParseError;

/// Errors that can occur while editing or solving a design
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Malformed clause or unknown token
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The optimizer found no assignment satisfying the constraints
    #[error("constraints unsatisfiable: {message}")]
    Unsatisfiable { message: String },

    /// Freezing a cell with unbound content
    #[error("cannot freeze cell '{cell}': '{object}' is unbound")]
    FreezePrecondition { cell: String, object: String },

    /// Editing or solving a frozen cell
    #[error("cell '{cell}' is frozen")]
    Frozen { cell: String },

    /// Instancing a cell inside itself, directly or through other cells
    #[error("instancing '{template}' inside '{cell}' would make the hierarchy recursive")]
    RecursiveInstance { cell: String, template: String },

    /// A name in a design file that resolves to nothing
    #[error("undefined name '{name}' in {scope}")]
    UndefinedName {
        name: String,
        scope: String,
        suggestions: Vec<String>,
    },

    /// A constraint names an object that is neither solved nor bound
    #[error("'{name}' in clause '{clause}' is not part of this solve and has no box")]
    UnboundReference { name: String, clause: String },

    /// Stale key or key from another design
    #[error("stale or foreign handle")]
    InvalidHandle,

    /// Layer name or number missing from the layer table
    #[error("layer '{layer}' is not in the layer table")]
    UnknownLayer { layer: String },

    /// Cell missing from an imported library
    #[error("cell '{name}' not found in library")]
    MissingCell { name: String },
}

impl LayoutError {
    /// Create an undefined name error with suggestions
    pub fn undefined(
        name: impl Into<String>,
        scope: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self::UndefinedName {
            name: name.into(),
            scope: scope.into(),
            suggestions,
        }
    }

    /// Create an unsatisfiable error
    pub fn unsatisfiable(message: impl Into<String>) -> Self {
        Self::Unsatisfiable {
            message: message.into(),
        }
    }

    /// Get suggestions if available
    pub fn suggestions(&self) -> Option<&[String]> {
        match self {
            Self::UndefinedName { suggestions, .. } => Some(suggestions),
            _ => None,
        }
    }
}
