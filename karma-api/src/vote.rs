use crate::{CommentId, PostId, Time};

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

/// Vote counters of a post or comment, as seen by one viewer
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize,
)]
pub struct Votes {
    pub upvotes: u64,
    pub downvotes: u64,

    /// The vote the requesting viewer currently holds, if any
    pub viewer_vote: Option<Vote>,
}

impl Votes {
    /// `upvotes - downvotes`, saturating at the bounds of `i64`
    pub fn score(&self) -> i64 {
        let score = i128::from(self.upvotes) - i128::from(self.downvotes);
        i64::try_from(score).unwrap_or(if score < 0 { i64::MIN } else { i64::MAX })
    }

    /// Counters as seen by `viewer_vote`, for projecting a stored aggregate
    pub fn seen_by(self, viewer_vote: Option<Vote>) -> Votes {
        Votes {
            viewer_vote,
            ..self
        }
    }
}

/// What a vote is cast on
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
pub enum Target {
    Post(PostId),
    Comment(CommentId),
}

/// Shared shape of posts and comments, everything ranking and voting needs
pub trait Votable {
    fn votes(&self) -> &Votes;
    fn votes_mut(&mut self) -> &mut Votes;
    fn date(&self) -> Time;

    fn comment_count(&self) -> u64 {
        0
    }

    fn score(&self) -> i64 {
        self.votes().score()
    }
}
