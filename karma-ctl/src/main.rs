use std::path::{Path, PathBuf};

use anyhow::Context;
use karma_client::{
    api::{CommentId, ContentType, Db, PostId, SortMode, Target, Time, Vote},
    walk, DbDump, DbExt, FeedOptions,
};

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON snapshot to read from, and write votes back to
    #[structopt(short, long, env = "KARMA_SNAPSHOT")]
    snapshot: PathBuf,

    /// Instant to rank at, in RFC 3339 format [default: now]
    #[structopt(long, parse(try_from_str = parse_time))]
    now: Option<Time>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Print one page of posts
    Feed {
        /// Only show posts from this community
        #[structopt(short, long)]
        community: Option<String>,

        /// Only show posts of this type (text, image, video or link)
        #[structopt(short, long)]
        kind: Option<ContentType>,

        /// hot, new, top, topWeek, rising or controversial
        #[structopt(long, default_value = "hot")]
        sort: SortMode,

        #[structopt(long, default_value = "10", allow_hyphen_values = true)]
        limit: i64,

        #[structopt(long, default_value = "0", allow_hyphen_values = true)]
        offset: i64,
    },

    /// Print a post, then its comments in display order
    Thread { post: u64 },

    /// Cast, switch or retract a vote, and save the snapshot
    Vote {
        /// Vote on a comment rather than a post
        #[structopt(long)]
        comment: bool,

        id: u64,

        /// up or down
        #[structopt(parse(try_from_str = parse_vote))]
        vote: Vote,
    },

    /// Hide a post from the feed, and save the snapshot
    Hide {
        post: u64,

        /// Show the post again instead
        #[structopt(long)]
        undo: bool,
    },

    /// Save a post or comment for later, and save the snapshot
    Save {
        /// Save a comment rather than a post
        #[structopt(long)]
        comment: bool,

        id: u64,

        /// Forget it instead
        #[structopt(long)]
        undo: bool,
    },

    /// Print the saved posts and comments, then the hidden posts
    Saved,

    /// List communities by member count
    Communities {
        /// Only list communities whose name or description contains this
        #[structopt(short, long)]
        search: Option<String>,

        #[structopt(long, default_value = "10")]
        limit: usize,
    },
}

fn parse_time(s: &str) -> anyhow::Result<Time> {
    let t = chrono::DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("parsing {s:?} as an RFC 3339 date"))?;
    Ok(t.with_timezone(&chrono::Utc))
}

fn parse_vote(s: &str) -> anyhow::Result<Vote> {
    match &s.to_lowercase() as &str {
        "up" => Ok(Vote::Up),
        "down" => Ok(Vote::Down),
        _ => Err(anyhow::anyhow!("unknown vote {s:?}, expected up or down")),
    }
}

fn load(path: &Path) -> anyhow::Result<DbDump> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening snapshot {}", path.display()))?;
    let db: DbDump = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    tracing::debug!(
        posts = db.posts.len(),
        comments = db.comments.len(),
        "loaded snapshot"
    );
    Ok(db)
}

fn save(path: &Path, db: &DbDump) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(db).context("serializing snapshot")?;
    std::fs::write(path, json).with_context(|| format!("writing snapshot {}", path.display()))
}

fn print<T: serde::Serialize>(v: &T) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(v).context("serializing output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let now = opt.now.unwrap_or_else(chrono::Utc::now);
    let mut db = load(&opt.snapshot)?;

    match opt.cmd {
        Command::Feed {
            community,
            kind,
            sort,
            limit,
            offset,
        } => {
            let opts = FeedOptions {
                community,
                kind,
                mode: sort,
                limit,
                offset,
                ..FeedOptions::default()
            };
            print(&db.feed(&opts, now).await?)?;
        }
        Command::Thread { post } => {
            let post = PostId(post);
            print(&db.get_post(post).await?)?;
            let thread = db.thread(post).await?;
            let comments = walk(&thread).map(|n| &n.comment).collect::<Vec<_>>();
            print(&comments)?;
        }
        Command::Vote { comment, id, vote } => {
            let votes = match comment {
                true => db.vote_comment(CommentId(id), vote).await?.votes,
                false => db.vote_post(PostId(id), vote).await?.votes,
            };
            save(&opt.snapshot, &db)?;
            print(&votes)?;
        }
        Command::Hide { post, undo } => {
            db.set_hidden(PostId(post), !undo).await?;
            save(&opt.snapshot, &db)?;
        }
        Command::Save { comment, id, undo } => {
            let target = match comment {
                true => Target::Comment(CommentId(id)),
                false => Target::Post(PostId(id)),
            };
            db.set_saved(target, !undo).await?;
            save(&opt.snapshot, &db)?;
        }
        Command::Saved => {
            let (posts, comments) = db.saved_items().await?;
            print(&posts)?;
            print(&comments)?;
            print(&db.hidden_posts().await?)?;
        }
        Command::Communities { search, limit } => {
            let mut communities = match search {
                Some(q) => db.search_communities(&q),
                None => db.popular_communities(usize::MAX),
            };
            communities.truncate(limit);
            print(&communities)?;
        }
    }

    Ok(())
}
