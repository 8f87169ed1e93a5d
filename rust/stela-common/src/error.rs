use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::NotFound {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn already_registered(name: impl Into<String>) -> Error {
        Error(ErrorKind::AlreadyRegistered { name: name.into() }.into())
    }

    pub fn failed_precondition(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::FailedPrecondition {
                message: message.into(),
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("{name} is already registered")]
    AlreadyRegistered { name: String },

    #[error("failed precondition: {message}")]
    FailedPrecondition { message: String },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}
