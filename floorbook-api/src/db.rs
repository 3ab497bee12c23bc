use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    Comment, CommentId, FloorNumber, SubjectId, UserId, VoteDirection, VoteState, VoteTally,
};

/// Sequence a floor number is drawn from: the top-level floors of a subject,
/// or the replies under one top-level floor
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FloorKey {
    pub subject: SubjectId,
    pub root: Option<u32>,
}

impl FloorKey {
    pub fn floor(&self, seq: u32) -> FloorNumber {
        match self.root {
            None => FloorNumber::top(seq),
            Some(root) => FloorNumber::reply(root, seq),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InsertError {
    #[error("floor number already taken")]
    FloorTaken,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn top_level_exists(&self, subject: SubjectId, root: u32) -> anyhow::Result<bool>;

    /// Sequence number the next floor drawn from `key` would get
    async fn next_sequence(&self, key: FloorKey) -> anyhow::Result<u32>;

    /// Fails with `FloorTaken` if `(subject_id, floor_number)` already exists
    async fn insert_comment(&self, c: &Comment) -> Result<(), InsertError>;

    /// Comments of a subject ordered by creation date, then insertion order
    async fn comments_for(&self, subject: SubjectId) -> anyhow::Result<Vec<Comment>>;

    /// Atomically toggle `user`'s vote, `None` if the comment does not exist
    async fn vote(
        &self,
        comment: CommentId,
        user: UserId,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<VoteTally>>;

    /// Non-`None` votes of `user` on the comments of `subject`
    async fn vote_states_for(
        &self,
        subject: SubjectId,
        user: UserId,
    ) -> anyhow::Result<HashMap<CommentId, VoteState>>;
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn subject_owner(&self, subject: SubjectId) -> anyhow::Result<Option<UserId>>;
}

#[async_trait]
pub trait Directory: Send + Sync {
    /// Users unknown to the directory are absent from the result
    async fn display_names(&self, users: &[UserId]) -> anyhow::Result<HashMap<UserId, String>>;
}
