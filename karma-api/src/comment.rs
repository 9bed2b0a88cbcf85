use std::fmt;

use crate::{Error, PostId, Time, Votable, Votes};

/// Deepest nesting level a reply can be stored at. Top-level comments are at
/// depth 0, replies to comments at this depth are clamped to it.
pub const MAX_DEPTH: u8 = 2;

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
pub struct CommentId(pub u64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,

    /// None for top-level comments
    pub parent_id: Option<CommentId>,

    pub author: String,
    pub date: Time,
    pub content: String,

    #[serde(flatten)]
    pub votes: Votes,

    /// Always in 0..=MAX_DEPTH
    pub depth: u8,
}

impl Comment {
    /// Depth of a reply to a comment at `parent_depth`, or of a top-level
    /// comment if there is no parent
    pub fn depth_under(parent_depth: Option<u8>) -> u8 {
        match parent_depth {
            None => 0,
            Some(d) => d.saturating_add(1).min(MAX_DEPTH),
        }
    }

    pub fn can_reply(&self) -> bool {
        self.depth < MAX_DEPTH
    }
}

impl Votable for Comment {
    fn votes(&self) -> &Votes {
        &self.votes
    }

    fn votes_mut(&mut self) -> &mut Votes {
        &mut self.votes
    }

    fn date(&self) -> Time {
        self.date
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub date: Time,
    pub content: String,
}

impl NewComment {
    // See comments on other `validate` functions throughout karma-api
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_time(&self.date)?;
        crate::validate_string(&self.content)?;
        if self.content.trim().is_empty() {
            return Err(Error::InvalidArgument(String::from("comment is empty")));
        }
        Ok(())
    }
}
