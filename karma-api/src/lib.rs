use chrono::Utc;

mod action;
pub use action::{Action, FeedMessage};

mod comment;
pub use comment::{Comment, CommentId, NewComment, MAX_DEPTH};

mod community;
pub use community::{Community, NewCommunity};

mod db;
pub use db::Db;

mod error;
pub use error::{Entity, Error};

mod name;
pub use name::{names_match, normalize_name, validate_name, MAX_NAME_LEN};

mod post;
pub use post::{ContentType, NewPost, Post, PostId};

mod sort;
pub use sort::SortMode;

mod user;
pub use user::{User, UserId};

mod vote;
pub use vote::{Target, Votable, Vote, Votes};

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

// The validate functions throughout karma-api all check that the data is
// representable in a JSON snapshot and in the store's indexes, ie. no null
// bytes in strings and no absurd dates.

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

pub fn validate_time(t: &Time) -> Result<(), Error> {
    // keep dates within what a millisecond timestamp can round-trip through f64
    const MAX_MILLIS: i64 = 1 << 52;
    if t.timestamp_millis().abs() >= MAX_MILLIS {
        return Err(Error::InvalidArgument(format!("date out of range: {t}")));
    }
    Ok(())
}
