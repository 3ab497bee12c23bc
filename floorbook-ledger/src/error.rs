use floorbook_api::{CommentId, Error as ApiError, FloorNumber, SubjectId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn subject_not_found(subject: SubjectId) -> Error {
        Error::Api(ApiError::SubjectNotFound(subject))
    }

    pub fn parent_not_found(floor: &str) -> Error {
        Error::Api(ApiError::ParentNotFound(String::from(floor)))
    }

    pub fn floor_conflict(floor: FloorNumber) -> Error {
        Error::Api(ApiError::FloorConflict(floor.to_string()))
    }

    pub fn comment_not_found(comment: CommentId) -> Error {
        Error::Api(ApiError::CommentNotFound(comment))
    }

    /// Error as it may be shown to a client, storage details stay in the logs
    pub fn into_api(self) -> ApiError {
        match self {
            Error::Anyhow(err) => {
                tracing::error!(?err, "internal server error");
                #[cfg(not(test))]
                let err =
                    ApiError::Unknown(String::from("Internal server error, see logs for details"));
                #[cfg(test)]
                let err = ApiError::Unknown(format!("Internal server error: {err:?}"));
                err
            }
            Error::Api(err) => {
                tracing::info!("returning error to client: {err}");
                err
            }
        }
    }
}
