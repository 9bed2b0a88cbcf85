use crate::{Comment, NewComment, NewPost, Post, PostId, Target, Vote};

/// A write submitted to the content store by a user
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Action {
    NewPost(NewPost),
    NewComment(NewComment),
    Vote(Target, Vote),

    /// Keep a post out of the submitting user's feeds
    Hide(PostId),
    Unhide(PostId),

    /// Bookmark a post or comment for the submitting user
    Save(Target),
    Unsave(Target),
}

/// What the content store relays to subscribers once an action is accepted.
/// Carried values have no viewer vote, as they are shared between viewers.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum FeedMessage {
    NewPost(Post),
    NewComment(Comment),
    VotesChanged {
        target: Target,
        upvotes: u64,
        downvotes: u64,
    },
    PostDeleted(PostId),

    // Only relayed to the feeds of the user who hid or saved
    HiddenChanged {
        post: PostId,
        hidden: bool,
    },
    SavedChanged {
        target: Target,
        saved: bool,
    },
}
