use std::sync::Arc;

use anyhow::Context;
use floorbook_api::{CommentId, NewComment, SubjectId, UserId, Uuid, VoteDirection};
use floorbook_ledger::{Ledger, LedgerConfig, PgStore};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(long, env = "DATABASE_URL")]
    database_url: String,

    /// Maximum number of database connections
    #[structopt(long, default_value = "4")]
    max_connections: u32,

    #[structopt(flatten)]
    ledger: LedgerConfig,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Create or update the database schema
    Migrate,

    /// Register a user, printing its id
    AddUser {
        /// Display name
        name: String,
    },

    /// Register a subject owned by a user, printing its id
    AddSubject { owner: Uuid },

    /// Post a comment, or a reply with --reply-to
    Post {
        subject: Uuid,
        author: Uuid,
        body: String,

        /// Floor to reply to, e.g. B1 or B1-2
        #[structopt(long)]
        reply_to: Option<String>,
    },

    /// List the comments of a subject
    List {
        subject: Uuid,

        /// Include this user's votes
        #[structopt(long)]
        viewer: Option<Uuid>,
    },

    /// Like a comment, or withdraw the like
    Like { comment: Uuid, user: Uuid },

    /// Dislike a comment, or withdraw the dislike
    Dislike { comment: Uuid, user: Uuid },
}

fn print_json<T: serde::Serialize>(v: &T) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(v).context("serializing output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let store = PgStore::connect(&opt.database_url, opt.max_connections).await?;
    let ledger = Ledger::with_backend(Arc::new(store.clone()), opt.ledger);

    let (direction, comment, user) = match opt.cmd {
        Command::Migrate => {
            store.migrate().await?;
            tracing::info!("database schema is up to date");
            return Ok(());
        }
        Command::AddUser { name } => {
            let id = UserId(Uuid::new_v4());
            store.add_user(id, &name).await?;
            return print_json(&id);
        }
        Command::AddSubject { owner } => {
            let id = SubjectId(Uuid::new_v4());
            store.add_subject(id, UserId(owner)).await?;
            return print_json(&id);
        }
        Command::Post {
            subject,
            author,
            body,
            reply_to,
        } => {
            let view = ledger
                .post_comment(NewComment {
                    subject_id: SubjectId(subject),
                    author_id: UserId(author),
                    body,
                    display_parent: reply_to,
                })
                .await
                .map_err(|e| e.into_api())?;
            return print_json(&view);
        }
        Command::List { subject, viewer } => {
            let views = ledger
                .list_comments(SubjectId(subject), viewer.map(UserId))
                .await
                .map_err(|e| e.into_api())?;
            return print_json(&views);
        }
        Command::Like { comment, user } => (VoteDirection::Like, comment, user),
        Command::Dislike { comment, user } => (VoteDirection::Dislike, comment, user),
    };

    let tally = ledger
        .vote(CommentId(comment), UserId(user), direction)
        .await
        .map_err(|e| e.into_api())?;
    print_json(&tally)
}
