use std::collections::HashMap;

use chrono::{Duration, Utc};
use floorbook_api::{FloorNumber, VoteDirection};
use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

const NUM_USERS: usize = 20;
const NUM_SUBJECTS: usize = 10;

const NUM_COMMENTS: usize = 300;
// odds that a comment replies to an existing thread instead of starting one
const REPLY_PROBABILITY: f64 = 0.6;
// odds that a reply targets another reply rather than the thread root
const NESTED_DISPLAY_PROBABILITY: f64 = 0.4;
const COMMENT_WORD_COUNT: usize = 25;

const NUM_VOTES: usize = 1000;

fn gen_n_items(table: &str, columns: &str, n: usize, mut f: impl FnMut(usize) -> String) {
    println!("INSERT INTO {} ({}) VALUES", table, columns);
    for i in 0..n {
        if i != 0 {
            println!(",");
        }
        print!("    {}", f(i));
    }
    println!();
    println!("ON CONFLICT DO NOTHING;");
}

fn sql_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn sql_opt(s: Option<String>) -> String {
    s.map(|s| sql_str(&s)).unwrap_or_else(|| String::from("NULL"))
}

/// Floors already handed out on one subject
#[derive(Default)]
struct Thread {
    // reply floors per top-level sequence
    roots: Vec<Vec<FloorNumber>>,
}

fn main() {
    let mut rng = rand::thread_rng();

    // Generate users
    let users = (0..NUM_USERS).map(|_| Uuid::new_v4()).collect::<Vec<_>>();
    gen_n_items("users", "id, name", NUM_USERS, |i| {
        format!("('{}', {})", users[i], sql_str(&lipsum::lipsum_words(2)))
    });

    // Generate subjects
    let subjects = (0..NUM_SUBJECTS)
        .map(|_| (Uuid::new_v4(), *users.choose(&mut rng).unwrap()))
        .collect::<Vec<_>>();
    gen_n_items("subjects", "id, owner_id", NUM_SUBJECTS, |i| {
        format!("('{}', '{}')", subjects[i].0, subjects[i].1)
    });

    // Generate comments, numbering floors the way the ledger does
    let mut threads = HashMap::<Uuid, Thread>::new();
    let mut comments = Vec::new();
    let start = Utc::now() - Duration::days(30);
    gen_n_items(
        "comments",
        "id, subject_id, author_id, body, is_author_privileged, root_seq, reply_seq, \
            floor_number, functional_parent, display_parent, created_at",
        NUM_COMMENTS,
        |i| {
            let id = Uuid::new_v4();
            comments.push(id);
            let (subject, owner) = *subjects.choose(&mut rng).unwrap();
            let author = *users.choose(&mut rng).unwrap();
            let thread = threads.entry(subject).or_default();

            let replying = !thread.roots.is_empty() && rng.gen_bool(REPLY_PROBABILITY);
            let (floor, display) = match replying {
                false => {
                    thread.roots.push(Vec::new());
                    (FloorNumber::top(thread.roots.len() as u32), None)
                }
                true => {
                    let root = rng.gen_range(0..thread.roots.len());
                    let replies = &mut thread.roots[root];
                    let root_floor = FloorNumber::top(root as u32 + 1);
                    let display = match replies.choose(&mut rng) {
                        Some(r) if rng.gen_bool(NESTED_DISPLAY_PROBABILITY) => *r,
                        _ => root_floor,
                    };
                    let floor = FloorNumber::reply(root_floor.root(), replies.len() as u32 + 1);
                    replies.push(floor);
                    (floor, Some(display))
                }
            };

            format!(
                "('{}', '{}', '{}', {}, {}, {}, {}, '{}', {}, {}, '{}')",
                id,
                subject,
                author,
                sql_str(&lipsum::lipsum_words(COMMENT_WORD_COUNT)),
                author == owner,
                floor.root(),
                floor
                    .reply_seq()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| String::from("NULL")),
                floor,
                sql_opt(display.map(|d| d.root_floor().to_string())),
                sql_opt(display.map(|d| d.to_string())),
                (start + Duration::minutes(i as i64)).to_rfc3339(),
            )
        },
    );

    // Generate votes, duplicates are dropped by ON CONFLICT
    gen_n_items("comment_votes", "comment_id, user_id, direction", NUM_VOTES, |_| {
        let direction = match rng.gen_bool(0.7) {
            true => VoteDirection::Like,
            false => VoteDirection::Dislike,
        };
        format!(
            "('{}', '{}', {})",
            comments.choose(&mut rng).unwrap(),
            users.choose(&mut rng).unwrap(),
            direction.as_i16(),
        )
    });
}
