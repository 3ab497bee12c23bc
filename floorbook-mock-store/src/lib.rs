use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use floorbook_api::{
    Catalog, Comment, CommentId, Directory, FloorKey, FloorNumber, InsertError, Store, SubjectId,
    UserId, VoteDirection, VoteState, VoteTally,
};
use parking_lot::Mutex;

/// In-memory backend holding the same data as the database would
#[derive(Debug, Default)]
pub struct MockStore(Mutex<Db>);

#[derive(Debug, Default)]
struct Db {
    users: HashMap<UserId, String>,
    subjects: HashMap<SubjectId, UserId>,

    // in insertion order
    comments: Vec<DbComment>,
    floors: HashSet<(SubjectId, FloorNumber)>,
    sequences: HashMap<FloorKey, u32>,
}

#[derive(Debug)]
struct DbComment {
    comment: Comment,
    votes: HashMap<UserId, VoteDirection>,
}

impl DbComment {
    fn with_counts(&self) -> Comment {
        let mut c = self.comment.clone();
        c.like_count = self.count(VoteDirection::Like);
        c.dislike_count = self.count(VoteDirection::Dislike);
        c
    }

    fn count(&self, direction: VoteDirection) -> u64 {
        self.votes.values().filter(|d| **d == direction).count() as u64
    }
}

impl MockStore {
    pub fn new() -> MockStore {
        MockStore::default()
    }

    pub fn add_user(&self, id: UserId, name: String) {
        self.0.lock().users.insert(id, name);
    }

    pub fn add_subject(&self, id: SubjectId, owner: UserId) {
        self.0.lock().subjects.insert(id, owner);
    }

    /// Change the owner of a subject, leaving existing comments untouched
    pub fn transfer_subject(&self, id: SubjectId, new_owner: UserId) {
        if let Some(owner) = self.0.lock().subjects.get_mut(&id) {
            *owner = new_owner;
        }
    }

    /// Return the current number of comments across all subjects
    pub fn test_num_comments(&self) -> usize {
        self.0.lock().comments.len()
    }
}

#[async_trait]
impl Store for MockStore {
    async fn top_level_exists(&self, subject: SubjectId, root: u32) -> anyhow::Result<bool> {
        Ok(self
            .0
            .lock()
            .floors
            .contains(&(subject, FloorNumber::top(root))))
    }

    async fn next_sequence(&self, key: FloorKey) -> anyhow::Result<u32> {
        Ok(self.0.lock().sequences.get(&key).copied().unwrap_or(0) + 1)
    }

    async fn insert_comment(&self, c: &Comment) -> Result<(), InsertError> {
        let mut db = self.0.lock();
        if !db.floors.insert((c.subject_id, c.floor_number)) {
            return Err(InsertError::FloorTaken);
        }
        let floor = c.floor_number;
        let (key, seq) = match floor.reply_seq() {
            None => (None, floor.root()),
            Some(seq) => (Some(floor.root()), seq),
        };
        let highest = db
            .sequences
            .entry(FloorKey {
                subject: c.subject_id,
                root: key,
            })
            .or_insert(0);
        *highest = (*highest).max(seq);
        db.comments.push(DbComment {
            comment: c.clone(),
            votes: HashMap::new(),
        });
        Ok(())
    }

    async fn comments_for(&self, subject: SubjectId) -> anyhow::Result<Vec<Comment>> {
        let mut res = self
            .0
            .lock()
            .comments
            .iter()
            .filter(|c| c.comment.subject_id == subject)
            .map(DbComment::with_counts)
            .collect::<Vec<_>>();
        // stable, so insertion order breaks ties
        res.sort_by_key(|c| c.created_at);
        Ok(res)
    }

    async fn vote(
        &self,
        comment: CommentId,
        user: UserId,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<VoteTally>> {
        let mut db = self.0.lock();
        let c = match db.comments.iter_mut().find(|c| c.comment.id == comment) {
            Some(c) => c,
            None => return Ok(None),
        };
        let state = VoteState::from_direction(c.votes.get(&user).copied()).toggle(direction);
        match state.direction() {
            None => {
                c.votes.remove(&user);
            }
            Some(d) => {
                c.votes.insert(user, d);
            }
        }
        Ok(Some(VoteTally::new(
            c.count(VoteDirection::Like),
            c.count(VoteDirection::Dislike),
            state,
        )))
    }

    async fn vote_states_for(
        &self,
        subject: SubjectId,
        user: UserId,
    ) -> anyhow::Result<HashMap<CommentId, VoteState>> {
        Ok(self
            .0
            .lock()
            .comments
            .iter()
            .filter(|c| c.comment.subject_id == subject)
            .filter_map(|c| {
                c.votes
                    .get(&user)
                    .map(|d| (c.comment.id, VoteState::from_direction(Some(*d))))
            })
            .collect())
    }
}

#[async_trait]
impl Catalog for MockStore {
    async fn subject_owner(&self, subject: SubjectId) -> anyhow::Result<Option<UserId>> {
        Ok(self.0.lock().subjects.get(&subject).copied())
    }
}

#[async_trait]
impl Directory for MockStore {
    async fn display_names(&self, users: &[UserId]) -> anyhow::Result<HashMap<UserId, String>> {
        let db = self.0.lock();
        Ok(users
            .iter()
            .filter_map(|u| db.users.get(u).map(|name| (*u, name.clone())))
            .collect())
    }
}
