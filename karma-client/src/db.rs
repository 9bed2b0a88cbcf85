use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use async_trait::async_trait;

use crate::{
    api::{
        self, normalize_name, Comment, CommentId, Community, Db, Entity, Error, Post, PostId,
        Target, Time, User, UserId, Vote,
    },
    feed, tree, CommentNode, FeedOptions, VotableExt,
};

/// Everything one viewer can see, with their own votes filled in
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DbDump {
    pub owner: UserId,
    pub users: Arc<HashMap<UserId, User>>,

    /// Keyed by normalized name
    pub communities: Arc<BTreeMap<String, Community>>,

    pub posts: Arc<BTreeMap<PostId, Post>>,
    pub comments: Arc<BTreeMap<CommentId, Comment>>,

    /// Posts `owner` hid from their feeds
    #[serde(default)]
    pub hidden: Arc<BTreeSet<PostId>>,

    /// Posts and comments `owner` saved
    #[serde(default)]
    pub saved: Arc<BTreeSet<Target>>,
}

impl DbDump {
    pub fn stub() -> DbDump {
        DbDump {
            owner: UserId::stub(),
            users: Arc::new(HashMap::new()),
            communities: Arc::new(BTreeMap::new()),
            posts: Arc::new(BTreeMap::new()),
            comments: Arc::new(BTreeMap::new()),
            hidden: Arc::new(BTreeSet::new()),
            saved: Arc::new(BTreeSet::new()),
        }
    }

    pub fn add_users(&mut self, users: Vec<api::User>) {
        Arc::make_mut(&mut self.users).extend(users.into_iter().map(|u| (u.id, u)));
    }

    pub fn add_communities(&mut self, communities: Vec<Community>) {
        Arc::make_mut(&mut self.communities)
            .extend(communities.into_iter().map(|c| (normalize_name(&c.name), c)));
    }

    pub fn add_posts(&mut self, posts: Vec<Post>) {
        Arc::make_mut(&mut self.posts).extend(posts.into_iter().map(|p| (p.id, p)));
    }

    pub fn add_comments(&mut self, comments: Vec<Comment>) {
        Arc::make_mut(&mut self.comments).extend(comments.into_iter().map(|c| (c.id, c)));
    }

    pub fn community(&self, name: &str) -> Option<&Community> {
        self.communities.get(&normalize_name(name))
    }

    pub fn user(&self, name: &str) -> Option<&User> {
        let name = normalize_name(name);
        self.users.values().find(|u| u.name == name)
    }

    /// Returns the `limit` communities with the most members
    pub fn popular_communities(&self, limit: usize) -> Vec<Community> {
        let mut res = self.communities.values().cloned().collect::<Vec<_>>();
        res.sort_by(|a, b| b.member_count.cmp(&a.member_count));
        res.truncate(limit);
        res
    }

    /// Returns the communities whose name or description contains `query`,
    /// ignoring case
    pub fn search_communities(&self, query: &str) -> Vec<Community> {
        let query = normalize_name(query);
        self.communities
            .values()
            .filter(|c| c.name.contains(&query) || c.description.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    pub fn search_users(&self, query: &str) -> Vec<User> {
        let query = normalize_name(query);
        let mut res = self
            .users
            .values()
            .filter(|u| u.name.contains(&query))
            .cloned()
            .collect::<Vec<_>>();
        res.sort_by(|a, b| a.name.cmp(&b.name));
        res
    }

    fn contains(&self, target: Target) -> bool {
        match target {
            Target::Post(id) => self.posts.contains_key(&id),
            Target::Comment(id) => self.comments.contains_key(&id),
        }
    }

    /// All comments on `post`, in creation order
    pub fn comments_on(&self, post: PostId) -> Vec<Comment> {
        self.comments
            .values()
            .filter(|c| c.post_id == post)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Db for DbDump {
    fn current_user(&self) -> UserId {
        self.owner
    }

    async fn list_posts(&mut self) -> Result<Vec<Post>, Error> {
        Ok(self.posts.values().cloned().collect())
    }

    async fn get_post(&mut self, id: PostId) -> Result<Post, Error> {
        self.posts
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(Entity::Post(id)))
    }

    async fn put_post(&mut self, post: Post) -> Result<(), Error> {
        tracing::debug!(post = ?post.id, "storing post");
        Arc::make_mut(&mut self.posts).insert(post.id, post);
        Ok(())
    }

    async fn list_comments(&mut self, post: PostId) -> Result<Vec<Comment>, Error> {
        if !self.posts.contains_key(&post) {
            return Err(Error::NotFound(Entity::Post(post)));
        }
        Ok(self.comments_on(post))
    }

    async fn get_comment(&mut self, id: CommentId) -> Result<Comment, Error> {
        self.comments
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(Entity::Comment(id)))
    }

    async fn put_comment(&mut self, comment: Comment) -> Result<(), Error> {
        tracing::debug!(comment = ?comment.id, "storing comment");
        Arc::make_mut(&mut self.comments).insert(comment.id, comment);
        Ok(())
    }

    async fn list_hidden(&mut self) -> Result<Vec<PostId>, Error> {
        Ok(self.hidden.iter().copied().collect())
    }

    async fn set_hidden(&mut self, post: PostId, hidden: bool) -> Result<(), Error> {
        if !self.posts.contains_key(&post) {
            return Err(Error::NotFound(Entity::Post(post)));
        }
        tracing::debug!(?post, hidden, "storing hidden flag");
        let set = Arc::make_mut(&mut self.hidden);
        match hidden {
            true => set.insert(post),
            false => set.remove(&post),
        };
        Ok(())
    }

    async fn list_saved(&mut self) -> Result<Vec<Target>, Error> {
        Ok(self.saved.iter().copied().collect())
    }

    async fn set_saved(&mut self, target: Target, saved: bool) -> Result<(), Error> {
        if !self.contains(target) {
            return Err(Error::NotFound(match target {
                Target::Post(id) => Entity::Post(id),
                Target::Comment(id) => Entity::Comment(id),
            }));
        }
        tracing::debug!(?target, saved, "storing saved flag");
        let set = Arc::make_mut(&mut self.saved);
        match saved {
            true => set.insert(target),
            false => set.remove(&target),
        };
        Ok(())
    }
}

/// Lookup-then-compute helpers over any content store
#[async_trait]
pub trait DbExt: Db {
    /// Applies the current user's vote to a post and stores the result
    async fn vote_post(&mut self, id: PostId, vote: Vote) -> Result<Post, Error>;

    /// Applies the current user's vote to a comment and stores the result
    async fn vote_comment(&mut self, id: CommentId, vote: Vote) -> Result<Comment, Error>;

    async fn feed(&mut self, opts: &FeedOptions, now: Time) -> Result<Vec<Post>, Error>;

    async fn thread(&mut self, post: PostId) -> Result<Vec<CommentNode>, Error>;

    /// The posts the current user hid, in id order
    async fn hidden_posts(&mut self) -> Result<Vec<Post>, Error>;

    /// The posts and comments the current user saved, in id order
    async fn saved_items(&mut self) -> Result<(Vec<Post>, Vec<Comment>), Error>;
}

#[async_trait]
impl<D: Db + Send> DbExt for D {
    async fn vote_post(&mut self, id: PostId, vote: Vote) -> Result<Post, Error> {
        let post = self.get_post(id).await?.apply_vote(vote);
        self.put_post(post.clone()).await?;
        Ok(post)
    }

    async fn vote_comment(&mut self, id: CommentId, vote: Vote) -> Result<Comment, Error> {
        let comment = self.get_comment(id).await?.apply_vote(vote);
        self.put_comment(comment.clone()).await?;
        Ok(comment)
    }

    async fn feed(&mut self, opts: &FeedOptions, now: Time) -> Result<Vec<Post>, Error> {
        let mut opts = opts.clone();
        opts.hidden.extend(self.list_hidden().await?);
        let posts = self.list_posts().await?;
        Ok(feed::page(&posts, &opts, now))
    }

    async fn thread(&mut self, post: PostId) -> Result<Vec<CommentNode>, Error> {
        let comments = self.list_comments(post).await?;
        tree::build(&comments)
    }

    async fn hidden_posts(&mut self) -> Result<Vec<Post>, Error> {
        let mut res = Vec::new();
        for id in self.list_hidden().await? {
            res.push(self.get_post(id).await?);
        }
        Ok(res)
    }

    async fn saved_items(&mut self) -> Result<(Vec<Post>, Vec<Comment>), Error> {
        let (mut posts, mut comments) = (Vec::new(), Vec::new());
        for target in self.list_saved().await? {
            match target {
                Target::Post(id) => posts.push(self.get_post(id).await?),
                Target::Comment(id) => comments.push(self.get_comment(id).await?),
            }
        }
        Ok((posts, comments))
    }
}
