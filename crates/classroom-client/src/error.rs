use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl ClientError {
    /// The server refused a write because it conflicts with existing data.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Status { status: 409, .. })
    }
}

/// Why a class submission did not go through. Form state is unchanged in
/// every case.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Please fill in all the required fields.")]
    Incomplete,

    #[error("Class name already exists. Please choose a different name.")]
    DuplicateName(String),

    #[error("could not create class: {0}")]
    Remote(#[from] ClientError),
}
