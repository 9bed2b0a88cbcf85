use anyhow::Context;
use chrono::Duration;
use karma_client::api::{
    Action, CommentId, ContentType, NewComment, NewCommunity, NewPost, PostId, Target, Time,
    UserId, Uuid, Vote,
};
use karma_mock_server::MockServer;
use rand::{seq::SliceRandom, Rng};

const NUM_USERS: usize = 12;

const COMMUNITIES: &[&str] = &[
    "technology",
    "science",
    "gaming",
    "cooking",
    "music",
    "rust",
];

const NUM_POSTS: usize = 80;
const POST_WORD_COUNT: usize = 40;

const NUM_COMMENTS: usize = 300;
const COMMENT_WORD_COUNT: usize = 15;

const NUM_VOTES: usize = 1500;

/// Hides and saves made by the user whose snapshot gets printed
const NUM_HIDDEN: usize = 5;
const NUM_SAVED: usize = 8;

/// Content gets spread over this many hours before now
const HISTORY_HOURS: i64 = 10 * 24;

fn gen_content_type(rng: &mut impl Rng) -> ContentType {
    *[
        ContentType::Text,
        ContentType::Text,
        ContentType::Image,
        ContentType::Video,
        ContentType::Link,
    ]
    .choose(rng)
    .expect("slice is not empty")
}

fn gen_date_after(rng: &mut impl Rng, after: Time, now: Time) -> Time {
    let span = (now - after).num_minutes().max(1);
    after + Duration::minutes(rng.gen_range(0..span))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();
    let now = chrono::Utc::now();
    let start = now - Duration::hours(HISTORY_HOURS);
    let mut s = MockServer::new();

    // Generate users
    let mut users = Vec::new();
    for i in 0..NUM_USERS {
        let id = UserId(Uuid::new_v4());
        s.admin_create_user(id, &format!("user{i}"))
            .context("creating user")?;
        users.push(id);
    }

    // Generate communities
    for name in COMMUNITIES {
        let owner = *users.choose(&mut rng).expect("there are users");
        s.create_community(
            owner,
            NewCommunity {
                name: String::from(*name),
                description: lipsum::lipsum_words(8),
                date: start,
            },
        )
        .context("creating community")?;
    }

    // Generate posts
    let mut posts = Vec::new();
    for _ in 0..NUM_POSTS {
        let author = *users.choose(&mut rng).expect("there are users");
        let date = gen_date_after(&mut rng, start, now);
        let a = Action::NewPost(NewPost {
            community: String::from(*COMMUNITIES.choose(&mut rng).expect("there are communities")),
            date,
            title: lipsum::lipsum_title(),
            content: lipsum::lipsum_words(POST_WORD_COUNT),
            content_type: gen_content_type(&mut rng),
        });
        s.submit_action(author, a).await.context("creating post")?;
        posts.push(date);
    }

    // Generate comments, about half of them replies
    let mut comments: Vec<(PostId, Time)> = Vec::new();
    for _ in 0..NUM_COMMENTS {
        let author = *users.choose(&mut rng).expect("there are users");
        let (post_id, parent_id, after) = match rng.gen_bool(0.5) && !comments.is_empty() {
            true => {
                let i = rng.gen_range(0..comments.len());
                let (post, date) = comments[i];
                (post, Some(CommentId(i as u64 + 1)), date)
            }
            false => {
                let i = rng.gen_range(0..posts.len());
                (PostId(i as u64 + 1), None, posts[i])
            }
        };
        let date = gen_date_after(&mut rng, after, now);
        let a = Action::NewComment(NewComment {
            post_id,
            parent_id,
            date,
            content: lipsum::lipsum_words(COMMENT_WORD_COUNT),
        });
        s.submit_action(author, a).await.context("creating comment")?;
        comments.push((post_id, date));
    }

    // Generate votes
    for _ in 0..NUM_VOTES {
        let voter = *users.choose(&mut rng).expect("there are users");
        let target = match rng.gen_bool(0.4) {
            true => Target::Post(PostId(rng.gen_range(1..=NUM_POSTS as u64))),
            false => Target::Comment(CommentId(rng.gen_range(1..=NUM_COMMENTS as u64))),
        };
        let vote = match rng.gen_bool(0.7) {
            true => Vote::Up,
            false => Vote::Down,
        };
        s.submit_action(voter, Action::Vote(target, vote))
            .await
            .context("casting vote")?;
    }

    // Generate the snapshot owner's hidden and saved content
    for _ in 0..NUM_HIDDEN {
        let post = PostId(rng.gen_range(1..=NUM_POSTS as u64));
        s.submit_action(users[0], Action::Hide(post))
            .await
            .context("hiding post")?;
    }
    for _ in 0..NUM_SAVED {
        let target = match rng.gen_bool(0.5) {
            true => Target::Post(PostId(rng.gen_range(1..=NUM_POSTS as u64))),
            false => Target::Comment(CommentId(rng.gen_range(1..=NUM_COMMENTS as u64))),
        };
        s.submit_action(users[0], Action::Save(target))
            .await
            .context("saving content")?;
    }

    let dump = s.fetch_dump(users[0]).context("fetching snapshot")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&dump).context("serializing snapshot")?
    );
    Ok(())
}
