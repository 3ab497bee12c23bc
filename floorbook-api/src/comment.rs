use crate::{CommentId, Error, FloorNumber, SubjectId, Time, UserId, VoteState};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub subject_id: SubjectId,
    pub author_id: UserId,
    pub body: String,

    /// Floor the reply should be displayed under, `None` for a top-level post
    pub display_parent: Option<String>,
}

impl NewComment {
    pub fn top_level(subject_id: SubjectId, author_id: UserId, body: String) -> NewComment {
        NewComment {
            subject_id,
            author_id,
            body,
            display_parent: None,
        }
    }

    pub fn reply(
        subject_id: SubjectId,
        author_id: UserId,
        body: String,
        display_parent: String,
    ) -> NewComment {
        NewComment {
            subject_id,
            author_id,
            body,
            display_parent: Some(display_parent),
        }
    }

    pub fn validate(&self, max_body_len: usize) -> Result<(), Error> {
        crate::validate_string(&self.body)?;
        if let Some(p) = &self.display_parent {
            crate::validate_string(p)?;
        }
        if self.body.trim().is_empty() {
            return Err(Error::InvalidBody(String::from("comment body is empty")));
        }
        let len = self.body.chars().count();
        if len > max_body_len {
            return Err(Error::InvalidBody(format!(
                "comment body is {len} characters long, the maximum is {max_body_len}"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub subject_id: SubjectId,
    pub author_id: UserId,
    pub body: String,

    /// Whether the author owned the subject when posting. Never recomputed.
    pub is_author_privileged: bool,

    /// Top-level floor this comment is numbered under
    pub functional_parent: Option<FloorNumber>,

    /// Floor the comment is displayed under, verbatim from the poster
    pub display_parent: Option<String>,

    pub floor_number: FloorNumber,

    pub like_count: u64,
    pub dislike_count: u64,

    pub created_at: Time,
}

impl Comment {
    /// Floor a reply should be rendered under, whichever parent field is set
    pub fn effective_display_floor(&self) -> Option<String> {
        self.display_parent
            .clone()
            .or_else(|| self.functional_parent.map(|f| f.to_string()))
    }
}

/// A comment as served to readers
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,

    /// Display name of the author, if the directory knows them
    pub author_name: Option<String>,

    pub effective_display_floor: Option<String>,

    /// Vote of the reader the view was built for
    pub viewer_vote: VoteState,
}

impl CommentView {
    pub fn new(comment: Comment, author_name: Option<String>, viewer_vote: VoteState) -> Self {
        CommentView {
            effective_display_floor: comment.effective_display_floor(),
            comment,
            author_name,
            viewer_vote,
        }
    }
}
