use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use chrono::Utc;
use floorbook_api::{
    Catalog, Comment, CommentId, CommentView, Directory, FloorKey, FloorNumber, InsertError,
    NewComment, Store, SubjectId, UserId, Uuid, VoteDirection, VoteState, VoteTally,
};

use crate::{Error, FloorLocks, LedgerConfig};

/// Threaded comments of all subjects: floor numbering, listing and votes
pub struct Ledger {
    store: Arc<dyn Store>,
    catalog: Arc<dyn Catalog>,
    directory: Arc<dyn Directory>,
    locks: FloorLocks,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(
        store: Arc<dyn Store>,
        catalog: Arc<dyn Catalog>,
        directory: Arc<dyn Directory>,
        config: LedgerConfig,
    ) -> Ledger {
        Ledger {
            store,
            catalog,
            directory,
            locks: FloorLocks::new(),
            config,
        }
    }

    /// Ledger whose store, catalog and directory are all the same backend
    pub fn with_backend<B>(backend: Arc<B>, config: LedgerConfig) -> Ledger
    where
        B: 'static + Store + Catalog + Directory,
    {
        Ledger::new(backend.clone(), backend.clone(), backend, config)
    }

    pub async fn post_comment(&self, new: NewComment) -> Result<CommentView, Error> {
        new.validate(self.config.max_body_len)?;
        let subject = new.subject_id;

        let owner = self
            .catalog
            .subject_owner(subject)
            .await
            .with_context(|| format!("looking up the owner of {subject:?}"))?
            .ok_or_else(|| Error::subject_not_found(subject))?;
        let is_author_privileged = owner == new.author_id;

        let root = match &new.display_parent {
            None => None,
            Some(display) => Some(self.resolve_root(subject, display).await?),
        };
        let key = FloorKey {
            subject,
            root: root.map(|r| r.root()),
        };

        let guard = self.locks.lock(key).await;
        let id = CommentId(Uuid::new_v4());
        let mut retries = 0;
        let comment = loop {
            let seq = self
                .store
                .next_sequence(key)
                .await
                .with_context(|| format!("computing next floor for {key:?}"))?;
            let comment = Comment {
                id,
                subject_id: subject,
                author_id: new.author_id,
                body: new.body.clone(),
                is_author_privileged,
                functional_parent: root,
                display_parent: new.display_parent.clone(),
                floor_number: key.floor(seq),
                like_count: 0,
                dislike_count: 0,
                created_at: Utc::now(),
            };
            match self.store.insert_comment(&comment).await {
                Ok(()) => break comment,
                Err(InsertError::FloorTaken) if retries < self.config.max_floor_retries => {
                    retries += 1;
                    tracing::warn!(
                        floor = %comment.floor_number,
                        ?subject,
                        retries,
                        "floor number already taken, recomputing"
                    );
                }
                Err(InsertError::FloorTaken) => {
                    tracing::warn!(
                        floor = %comment.floor_number,
                        ?subject,
                        "floor number still taken after {retries} retries"
                    );
                    return Err(Error::floor_conflict(comment.floor_number));
                }
                Err(InsertError::Other(err)) => {
                    return Err(err.context(format!("inserting comment {id:?}")).into())
                }
            }
        };
        drop(guard);
        tracing::debug!(floor = %comment.floor_number, ?subject, ?id, "posted comment");

        // the comment is stored by now, so a directory failure must not fail the post
        let author_name = match self.directory.display_names(&[comment.author_id]).await {
            Ok(mut names) => names.remove(&comment.author_id),
            Err(err) => {
                tracing::warn!(?err, author = ?comment.author_id, "failed resolving author name");
                None
            }
        };
        Ok(CommentView::new(comment, author_name, VoteState::None))
    }

    async fn resolve_root(&self, subject: SubjectId, display: &str) -> Result<FloorNumber, Error> {
        let root = FloorNumber::root_of(display).ok_or_else(|| Error::parent_not_found(display))?;
        let exists = self
            .store
            .top_level_exists(subject, root.root())
            .await
            .with_context(|| format!("checking whether {root} exists on {subject:?}"))?;
        match exists {
            true => Ok(root),
            false => Err(Error::parent_not_found(display)),
        }
    }

    /// Comments of `subject` in chronological order, with `viewer`'s votes
    pub async fn list_comments(
        &self,
        subject: SubjectId,
        viewer: Option<UserId>,
    ) -> Result<Vec<CommentView>, Error> {
        let comments = self
            .store
            .comments_for(subject)
            .await
            .with_context(|| format!("fetching comments of {subject:?}"))?;

        let mut authors = comments.iter().map(|c| c.author_id).collect::<Vec<_>>();
        authors.sort();
        authors.dedup();
        // missing names do not fail the listing, as when posting
        let names = match authors.is_empty() {
            true => HashMap::new(),
            false => match self.directory.display_names(&authors).await {
                Ok(names) => names,
                Err(err) => {
                    tracing::warn!(?err, ?subject, "failed resolving author names");
                    HashMap::new()
                }
            },
        };

        let votes = match viewer {
            None => HashMap::new(),
            Some(user) => self
                .store
                .vote_states_for(subject, user)
                .await
                .with_context(|| format!("fetching votes of {user:?} on {subject:?}"))?,
        };

        Ok(comments
            .into_iter()
            .map(|c| {
                let name = names.get(&c.author_id).cloned();
                let vote = votes.get(&c.id).copied().unwrap_or_default();
                CommentView::new(c, name, vote)
            })
            .collect())
    }

    pub async fn vote(
        &self,
        comment: CommentId,
        user: UserId,
        direction: VoteDirection,
    ) -> Result<VoteTally, Error> {
        self.store
            .vote(comment, user, direction)
            .await
            .with_context(|| format!("recording {direction:?} of {user:?} on {comment:?}"))?
            .ok_or_else(|| Error::comment_not_found(comment))
    }
}
