use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

use crate::{CommentId, SubjectId};

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Subject not found {0:?}")]
    SubjectNotFound(SubjectId),

    #[error("Replied-to floor does not exist {0:?}")]
    ParentNotFound(String),

    #[error("Conflict while assigning floor number {0:?}, please retry")]
    FloorConflict(String),

    #[error("Comment not found {0:?}")]
    CommentNotFound(CommentId),

    #[error("Invalid comment body: {0}")]
    InvalidBody(String),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::SubjectNotFound(_) => StatusCode::NOT_FOUND,
            Error::ParentNotFound(_) => StatusCode::NOT_FOUND,
            Error::FloorConflict(_) => StatusCode::CONFLICT,
            Error::CommentNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether the same request may succeed if sent again unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::FloorConflict(_))
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::SubjectNotFound(s) => json!({
                "message": "subject not found",
                "type": "subject-not-found",
                "subject": s.0,
            }),
            Error::ParentNotFound(f) => json!({
                "message": "replied-to floor does not exist",
                "type": "parent-not-found",
                "floor": f,
            }),
            Error::FloorConflict(f) => json!({
                "message": "conflict while assigning floor number, please retry",
                "type": "conflict-floor",
                "floor": f,
            }),
            Error::CommentNotFound(c) => json!({
                "message": "comment not found",
                "type": "comment-not-found",
                "comment": c.0,
            }),
            Error::InvalidBody(reason) => json!({
                "message": reason,
                "type": "invalid-body",
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
        })
        .expect("serializing error")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let field = |name: &str| data.get(name).and_then(|v| v.as_str());
        let uuid_field = |name: &str| field(name).and_then(|u| Uuid::from_str(u).ok());
        Ok(
            match field("type").ok_or_else(|| anyhow!("error type is not a string"))? {
                "unknown" => Error::Unknown(String::from(field("message").unwrap_or(""))),
                "subject-not-found" => Error::SubjectNotFound(SubjectId(
                    uuid_field("subject")
                        .ok_or_else(|| anyhow!("subject-not-found error without a subject"))?,
                )),
                "parent-not-found" => Error::ParentNotFound(String::from(
                    field("floor")
                        .ok_or_else(|| anyhow!("parent-not-found error without a floor"))?,
                )),
                "conflict-floor" => Error::FloorConflict(String::from(
                    field("floor").ok_or_else(|| anyhow!("floor conflict without a floor"))?,
                )),
                "comment-not-found" => Error::CommentNotFound(CommentId(
                    uuid_field("comment")
                        .ok_or_else(|| anyhow!("comment-not-found error without a comment"))?,
                )),
                "invalid-body" => Error::InvalidBody(String::from(
                    field("message")
                        .ok_or_else(|| anyhow!("invalid-body error without a message"))?,
                )),
                "null-byte" => Error::NullByteInString(String::from(field("string").ok_or_else(
                    || anyhow!("error is a null-byte-in-string without a string"),
                )?)),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
