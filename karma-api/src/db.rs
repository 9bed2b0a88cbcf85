use async_trait::async_trait;

use crate::{Comment, CommentId, Error, Post, PostId, Target, UserId};

/// The content store, as seen by one viewer. Entities handed out carry that
/// viewer's vote, and lookups of unknown ids fail with `Error::NotFound`.
#[async_trait]
pub trait Db {
    fn current_user(&self) -> UserId;
    async fn list_posts(&mut self) -> Result<Vec<Post>, Error>;
    async fn get_post(&mut self, id: PostId) -> Result<Post, Error>;
    async fn put_post(&mut self, post: Post) -> Result<(), Error>;
    async fn list_comments(&mut self, post: PostId) -> Result<Vec<Comment>, Error>;
    async fn get_comment(&mut self, id: CommentId) -> Result<Comment, Error>;
    async fn put_comment(&mut self, comment: Comment) -> Result<(), Error>;

    /// Posts the viewer hid from their feeds
    async fn list_hidden(&mut self) -> Result<Vec<PostId>, Error>;
    async fn set_hidden(&mut self, post: PostId, hidden: bool) -> Result<(), Error>;

    /// Posts and comments the viewer saved
    async fn list_saved(&mut self) -> Result<Vec<Target>, Error>;
    async fn set_saved(&mut self, target: Target, saved: bool) -> Result<(), Error>;
}
