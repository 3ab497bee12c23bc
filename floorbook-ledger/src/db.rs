use std::collections::HashMap;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use floorbook_api::{
    Catalog, Comment, CommentId, Directory, FloorKey, FloorNumber, InsertError, Store, SubjectId,
    Time, UserId, Uuid, VoteDirection, VoteState, VoteTally,
};
use futures::TryStreamExt;
use sqlx::{postgres::PgRow, Row};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const UNIQUE_VIOLATION: &str = "23505";
const FLOOR_CONSTRAINT: &str = "comments_floor_unique";

/// Postgres backend, see `migrations/` for the schema
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    pub fn new(pool: sqlx::PgPool) -> PgStore {
        PgStore { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<PgStore> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .with_context(|| format!("Error opening database {:?}", url))?;
        Ok(PgStore::new(pool))
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .context("applying database migrations")
    }

    pub async fn add_user(&self, id: UserId, name: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO users VALUES ($1, $2)")
            .bind(id.0)
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("inserting user {:?}", id))?;
        Ok(())
    }

    pub async fn add_subject(&self, id: SubjectId, owner: UserId) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO subjects VALUES ($1, $2)")
            .bind(id.0)
            .bind(owner.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("inserting subject {:?}", id))?;
        Ok(())
    }
}

fn to_db_seq(seq: u32) -> anyhow::Result<i32> {
    i32::try_from(seq).with_context(|| format!("floor sequence {seq} overflows the database"))
}

fn from_db_count(count: i64) -> anyhow::Result<u64> {
    u64::try_from(count).with_context(|| format!("database returned negative count {count}"))
}

fn comment_from_row(row: &PgRow) -> anyhow::Result<Comment> {
    let floor: String = row
        .try_get("floor_number")
        .context("retrieving the floor_number field")?;
    let functional_parent: Option<String> = row
        .try_get("functional_parent")
        .context("retrieving the functional_parent field")?;
    Ok(Comment {
        id: CommentId(row.try_get("id").context("retrieving the id field")?),
        subject_id: SubjectId(
            row.try_get("subject_id")
                .context("retrieving the subject_id field")?,
        ),
        author_id: UserId(
            row.try_get("author_id")
                .context("retrieving the author_id field")?,
        ),
        body: row.try_get("body").context("retrieving the body field")?,
        is_author_privileged: row
            .try_get("is_author_privileged")
            .context("retrieving the is_author_privileged field")?,
        functional_parent: functional_parent
            .map(|f| f.parse::<FloorNumber>())
            .transpose()
            .context("parsing the functional_parent field")?,
        display_parent: row
            .try_get("display_parent")
            .context("retrieving the display_parent field")?,
        floor_number: floor.parse().context("parsing the floor_number field")?,
        like_count: from_db_count(
            row.try_get("like_count")
                .context("retrieving the like_count field")?,
        )?,
        dislike_count: from_db_count(
            row.try_get("dislike_count")
                .context("retrieving the dislike_count field")?,
        )?,
        created_at: row
            .try_get::<Time, _>("created_at")
            .context("retrieving the created_at field")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn top_level_exists(&self, subject: SubjectId, root: u32) -> anyhow::Result<bool> {
        // nothing beyond the column range can have been stored
        let Ok(root) = i32::try_from(root) else {
            return Ok(false);
        };
        sqlx::query_scalar::<_, bool>(
            "
                SELECT EXISTS (
                    SELECT 1 FROM comments
                    WHERE subject_id = $1
                    AND root_seq = $2
                    AND reply_seq IS NULL
                )
            ",
        )
        .bind(subject.0)
        .bind(root)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("checking for floor B{root} on {subject:?}"))
    }

    async fn next_sequence(&self, key: FloorKey) -> anyhow::Result<u32> {
        let current = match key.root {
            None => sqlx::query_scalar::<_, i64>(
                "
                    SELECT COALESCE(MAX(root_seq), 0)::BIGINT FROM comments
                    WHERE subject_id = $1
                    AND reply_seq IS NULL
                ",
            )
            .bind(key.subject.0)
            .fetch_one(&self.pool)
            .await,
            Some(root) => sqlx::query_scalar::<_, i64>(
                "
                    SELECT COUNT(*) FROM comments
                    WHERE subject_id = $1
                    AND root_seq = $2
                    AND reply_seq IS NOT NULL
                ",
            )
            .bind(key.subject.0)
            .bind(to_db_seq(root)?)
            .fetch_one(&self.pool)
            .await,
        }
        .with_context(|| format!("querying the current sequence of {key:?}"))?;
        u32::try_from(current + 1)
            .with_context(|| format!("sequence of {key:?} is out of range: {current}"))
    }

    async fn insert_comment(&self, c: &Comment) -> Result<(), InsertError> {
        let res = sqlx::query(
            "
                INSERT INTO comments (
                    id, subject_id, author_id, body, is_author_privileged,
                    root_seq, reply_seq, floor_number, functional_parent, display_parent,
                    created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(c.id.0)
        .bind(c.subject_id.0)
        .bind(c.author_id.0)
        .bind(&c.body)
        .bind(c.is_author_privileged)
        .bind(to_db_seq(c.floor_number.root())?)
        .bind(c.floor_number.reply_seq().map(to_db_seq).transpose()?)
        .bind(c.floor_number.to_string())
        .bind(c.functional_parent.map(|f| f.to_string()))
        .bind(&c.display_parent)
        .bind(c.created_at)
        .execute(&self.pool)
        .await;
        match res {
            Ok(res) if res.rows_affected() == 1 => Ok(()),
            Ok(res) => Err(InsertError::Other(anyhow!(
                "insertion of comment {:?} affected {} rows",
                c.id,
                res.rows_affected()
            ))),
            Err(sqlx::Error::Database(err))
                if err.code().as_deref() == Some(UNIQUE_VIOLATION)
                    && err.constraint() == Some(FLOOR_CONSTRAINT) =>
            {
                tracing::debug!(floor = %c.floor_number, ?err, "floor number already taken");
                Err(InsertError::FloorTaken)
            }
            Err(err) => Err(InsertError::Other(
                anyhow::Error::new(err).context(format!("inserting comment {:?}", c.id)),
            )),
        }
    }

    async fn comments_for(&self, subject: SubjectId) -> anyhow::Result<Vec<Comment>> {
        let mut rows = sqlx::query(
            "
                SELECT
                    c.id,
                    c.subject_id,
                    c.author_id,
                    c.body,
                    c.is_author_privileged,
                    c.floor_number,
                    c.functional_parent,
                    c.display_parent,
                    c.created_at,
                    COUNT(v.user_id) FILTER (WHERE v.direction = 1) AS like_count,
                    COUNT(v.user_id) FILTER (WHERE v.direction = -1) AS dislike_count
                FROM comments c
                LEFT JOIN comment_votes v
                    ON v.comment_id = c.id
                WHERE c.subject_id = $1
                GROUP BY c.id
                ORDER BY c.created_at, c.seq
            ",
        )
        .bind(subject.0)
        .fetch(&self.pool);
        let mut comments = Vec::new();
        while let Some(row) = rows
            .try_next()
            .await
            .context("querying comments table")?
        {
            comments.push(comment_from_row(&row)?);
        }
        Ok(comments)
    }

    async fn vote(
        &self,
        comment: CommentId,
        user: UserId,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<VoteTally>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("starting vote transaction")?;

        // row lock serializes concurrent votes on the same comment
        let found = sqlx::query("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
            .bind(comment.0)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("locking comment {:?}", comment))?;
        if found.is_none() {
            return Ok(None);
        }

        let current = sqlx::query_scalar::<_, i16>(
            "SELECT direction FROM comment_votes WHERE comment_id = $1 AND user_id = $2",
        )
        .bind(comment.0)
        .bind(user.0)
        .fetch_optional(&mut *tx)
        .await
        .with_context(|| format!("fetching vote of {:?} on {:?}", user, comment))?
        .map(|d| VoteDirection::from_i16(d).ok_or_else(|| anyhow!("invalid vote direction {d}")))
        .transpose()?;

        let state = VoteState::from_direction(current).toggle(direction);
        match state.direction() {
            None => sqlx::query("DELETE FROM comment_votes WHERE comment_id = $1 AND user_id = $2")
                .bind(comment.0)
                .bind(user.0)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("withdrawing vote of {:?} on {:?}", user, comment))?,
            Some(d) => sqlx::query(
                "
                    INSERT INTO comment_votes VALUES ($1, $2, $3)
                    ON CONFLICT (comment_id, user_id)
                    DO UPDATE SET direction = EXCLUDED.direction
                ",
            )
            .bind(comment.0)
            .bind(user.0)
            .bind(d.as_i16())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("recording vote of {:?} on {:?}", user, comment))?,
        };

        let counts = sqlx::query(
            "
                SELECT
                    COUNT(*) FILTER (WHERE direction = 1) AS like_count,
                    COUNT(*) FILTER (WHERE direction = -1) AS dislike_count
                FROM comment_votes
                WHERE comment_id = $1
            ",
        )
        .bind(comment.0)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("counting votes on {:?}", comment))?;
        let tally = VoteTally::new(
            from_db_count(counts.try_get("like_count").context("retrieving like_count")?)?,
            from_db_count(
                counts
                    .try_get("dislike_count")
                    .context("retrieving dislike_count")?,
            )?,
            state,
        );

        tx.commit().await.context("committing vote transaction")?;
        Ok(Some(tally))
    }

    async fn vote_states_for(
        &self,
        subject: SubjectId,
        user: UserId,
    ) -> anyhow::Result<HashMap<CommentId, VoteState>> {
        let rows = sqlx::query(
            "
                SELECT v.comment_id, v.direction
                FROM comment_votes v
                INNER JOIN comments c
                    ON c.id = v.comment_id
                WHERE c.subject_id = $1
                AND v.user_id = $2
            ",
        )
        .bind(subject.0)
        .bind(user.0)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("fetching votes of {:?} on {:?}", user, subject))?;
        rows.iter()
            .map(|r| -> anyhow::Result<(CommentId, VoteState)> {
                let id = r.try_get("comment_id").context("retrieving comment_id")?;
                let d: i16 = r.try_get("direction").context("retrieving direction")?;
                let d = VoteDirection::from_i16(d)
                    .ok_or_else(|| anyhow!("invalid vote direction {d}"))?;
                Ok((CommentId(id), VoteState::from_direction(Some(d))))
            })
            .collect()
    }
}

#[async_trait]
impl Catalog for PgStore {
    async fn subject_owner(&self, subject: SubjectId) -> anyhow::Result<Option<UserId>> {
        Ok(
            sqlx::query_scalar::<_, Uuid>("SELECT owner_id FROM subjects WHERE id = $1")
                .bind(subject.0)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("fetching owner of {:?}", subject))?
                .map(UserId),
        )
    }
}

#[async_trait]
impl Directory for PgStore {
    async fn display_names(&self, users: &[UserId]) -> anyhow::Result<HashMap<UserId, String>> {
        let ids = users.iter().map(|u| u.0).collect::<Vec<Uuid>>();
        let rows = sqlx::query("SELECT id, name FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .context("querying users table")?;
        rows.iter()
            .map(|r| -> anyhow::Result<(UserId, String)> {
                Ok((
                    UserId(r.try_get("id").context("retrieving the id field")?),
                    r.try_get("name").context("retrieving the name field")?,
                ))
            })
            .collect::<anyhow::Result<HashMap<UserId, String>>>()
    }
}
