//! Error kinds raised by the composition engine.

use thiserror::Error;

// -------------------------------------------------------------------------------------------------

/// Structured error with a kind and a single line message.
///
/// Construction errors are local to the edit that caused them: the session state stays
/// untouched. Runtime errors abort the owning texture's score only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{0}")]
    ParameterObjectSyntax(String),
    #[error("{0}")]
    PulseSyntax(String),
    #[error("{0}")]
    PitchSyntax(String),
    #[error("{0}")]
    AutomataSpecification(String),
    #[error("{0}")]
    TransitionSyntax(String),
    #[error("{0}")]
    Sieve(String),
    #[error("{0}")]
    Grammar(String),
    #[error("{0}")]
    PathReference(String),
    #[error("{0}")]
    TextureState(String),
    #[error("{0}")]
    OutputFormat(String),
    #[error("{0}")]
    FileIO(String),
}

impl Error {
    /// Name of the error kind, as shown to users.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ParameterObjectSyntax(_) => "ParameterObjectSyntaxError",
            Error::PulseSyntax(_) => "PulseSyntaxError",
            Error::PitchSyntax(_) => "PitchSyntaxError",
            Error::AutomataSpecification(_) => "AutomataSpecificationError",
            Error::TransitionSyntax(_) => "TransitionSyntaxError",
            Error::Sieve(_) => "SieveSyntaxError",
            Error::Grammar(_) => "GrammarSyntaxError",
            Error::PathReference(_) => "PathReferenceError",
            Error::TextureState(_) => "TextureStateError",
            Error::OutputFormat(_) => "OutputFormatError",
            Error::FileIO(_) => "FileIOError",
        }
    }

    /// The plain message without kind.
    pub fn message(&self) -> &str {
        match self {
            Error::ParameterObjectSyntax(msg)
            | Error::PulseSyntax(msg)
            | Error::PitchSyntax(msg)
            | Error::AutomataSpecification(msg)
            | Error::TransitionSyntax(msg)
            | Error::Sieve(msg)
            | Error::Grammar(msg)
            | Error::PathReference(msg)
            | Error::TextureState(msg)
            | Error::OutputFormat(msg)
            | Error::FileIO(msg) => msg,
        }
    }

    /// Prefix the message with the name of the failing operation, keeping the kind.
    #[must_use]
    pub fn with_context(self, context: &str) -> Self {
        let prefix = |msg: String| format!("{}: {}", context, msg);
        match self {
            Error::ParameterObjectSyntax(msg) => Error::ParameterObjectSyntax(prefix(msg)),
            Error::PulseSyntax(msg) => Error::PulseSyntax(prefix(msg)),
            Error::PitchSyntax(msg) => Error::PitchSyntax(prefix(msg)),
            Error::AutomataSpecification(msg) => Error::AutomataSpecification(prefix(msg)),
            Error::TransitionSyntax(msg) => Error::TransitionSyntax(prefix(msg)),
            Error::Sieve(msg) => Error::Sieve(prefix(msg)),
            Error::Grammar(msg) => Error::Grammar(prefix(msg)),
            Error::PathReference(msg) => Error::PathReference(prefix(msg)),
            Error::TextureState(msg) => Error::TextureState(prefix(msg)),
            Error::OutputFormat(msg) => Error::OutputFormat(prefix(msg)),
            Error::FileIO(msg) => Error::FileIO(prefix(msg)),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::FileIO(err.to_string())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds_and_context() {
        let err = Error::PathReference("path 'a' is in use".to_string());
        assert_eq!(err.kind(), "PathReferenceError");
        let err = err.with_context("pathDelete");
        assert_eq!(err.to_string(), "pathDelete: path 'a' is in use");
        assert_eq!(err.kind(), "PathReferenceError");
    }
}
