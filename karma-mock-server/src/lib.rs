use std::{
    collections::{btree_map, BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use karma_client::{
    api::{
        self, normalize_name, Action, Comment, CommentId, Community, Entity, Error, FeedMessage,
        NewComment, NewCommunity, NewPost, Post, PostId, Target, Time, User, UserId, Votable,
        Vote, Votes,
    },
    CommentNode, DbDump, DbExt, FeedOptions, VotableExt,
};
use tokio::sync::mpsc;

mod fuzz;

/// Multi-user in-memory content store.
///
/// `store` holds the canonical records, whose `viewer_vote` is always `None`.
/// Each user's own votes live in `votes` and are projected on read.
///
/// Ids come from counters that only ever grow, so a deleted post's id is
/// never handed out again.
pub struct MockServer {
    users: BTreeMap<UserId, DbUser>,
    store: DbDump,
    votes: HashMap<(UserId, Target), Vote>,
    next_post: u64,
    next_comment: u64,
}

#[derive(Debug)]
struct DbUser {
    name: String,
    feeds: Vec<mpsc::UnboundedSender<FeedMessage>>,
    hidden: BTreeSet<PostId>,
    saved: BTreeSet<Target>,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            users: BTreeMap::new(),
            store: DbDump::stub(),
            votes: HashMap::new(),
            next_post: 1,
            next_comment: 1,
        }
    }

    /// Return the id of user number `id`
    pub fn test_get_user(&self, id: usize) -> UserId {
        *self
            .users
            .keys()
            .nth(id)
            .unwrap_or_else(|| panic!("getting user {id} among {}", self.users.len()))
    }

    /// Return the current number of users
    pub fn test_num_users(&self) -> usize {
        self.users.len()
    }

    fn resolve(&self, uid: UserId) -> Result<&DbUser, Error> {
        self.users
            .get(&uid)
            .ok_or_else(|| Error::NotFound(Entity::User(uid.0.to_string())))
    }

    pub fn admin_create_user(&mut self, id: UserId, name: &str) -> Result<User, Error> {
        api::validate_name(name)?;
        let name = normalize_name(name);

        if self.users.values().any(|u| u.name == name) {
            return Err(Error::NameAlreadyUsed(name));
        }

        match self.users.entry(id) {
            btree_map::Entry::Occupied(_) => Err(Error::InvalidArgument(format!(
                "user id {} is already used",
                id.0
            ))),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(DbUser {
                    name: name.clone(),
                    feeds: Vec::new(),
                    hidden: BTreeSet::new(),
                    saved: BTreeSet::new(),
                });
                let user = User { id, name };
                self.store.add_users(vec![user.clone()]);
                tracing::debug!(?id, name = %user.name, "created user");
                Ok(user)
            }
        }
    }

    pub fn user(&self, name: &str) -> Result<User, Error> {
        self.store
            .user(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(Entity::User(normalize_name(name))))
    }

    pub fn search_users(&self, query: &str) -> Vec<User> {
        self.store.search_users(query)
    }

    /// Creates a community, with its creator as its only member
    pub fn create_community(
        &mut self,
        uid: UserId,
        c: NewCommunity,
    ) -> Result<Community, Error> {
        self.resolve(uid)?;
        c.validate()?;
        let name = normalize_name(&c.name);
        if self.store.community(&name).is_some() {
            return Err(Error::NameAlreadyUsed(name));
        }
        let community = Community {
            name,
            description: c.description,
            member_count: 1,
            post_count: 0,
            date: c.date,
        };
        self.store.add_communities(vec![community.clone()]);
        tracing::debug!(name = %community.name, "created community");
        Ok(community)
    }

    pub fn community(&self, name: &str) -> Result<Community, Error> {
        self.store
            .community(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(Entity::Community(normalize_name(name))))
    }

    pub fn popular_communities(&self, limit: usize) -> Vec<Community> {
        self.store.popular_communities(limit)
    }

    pub fn search_communities(&self, query: &str) -> Vec<Community> {
        self.store.search_communities(query)
    }

    /// Applies `a` on behalf of `uid`, and relays the resulting message to the
    /// open feeds. The returned message is the one that got relayed.
    ///
    /// Hiding and saving only reach `uid`'s own feeds.
    pub async fn submit_action(&mut self, uid: UserId, a: Action) -> Result<FeedMessage, Error> {
        let author = self.resolve(uid)?.name.clone();
        let msg = match a {
            Action::NewPost(p) => FeedMessage::NewPost(self.new_post(uid, author, p)?),
            Action::NewComment(c) => FeedMessage::NewComment(self.new_comment(uid, author, c)?),
            Action::Vote(target, vote) => self.vote(uid, target, vote)?,
            Action::Hide(post) => self.set_hidden(uid, post, true)?,
            Action::Unhide(post) => self.set_hidden(uid, post, false)?,
            Action::Save(target) => self.set_saved(uid, target, true)?,
            Action::Unsave(target) => self.set_saved(uid, target, false)?,
        };
        self.relay_action(uid, &msg);
        Ok(msg)
    }

    fn new_post(&mut self, uid: UserId, author: String, p: NewPost) -> Result<Post, Error> {
        p.validate()?;
        let mut community = self.community(&p.community)?;
        community.post_count += 1;

        let post = Post {
            id: PostId(self.next_post),
            community: community.name.clone(),
            author,
            date: p.date,
            title: p.title,
            content: p.content,
            content_type: p.content_type,
            votes: Votes {
                upvotes: 1,
                downvotes: 0,
                viewer_vote: None,
            },
            comment_count: 0,
        };
        self.next_post += 1;
        self.votes.insert((uid, Target::Post(post.id)), Vote::Up);
        self.store.add_communities(vec![community]);
        self.store.add_posts(vec![post.clone()]);
        tracing::debug!(id = ?post.id, "created post");
        Ok(post)
    }

    fn new_comment(
        &mut self,
        uid: UserId,
        author: String,
        c: NewComment,
    ) -> Result<Comment, Error> {
        c.validate()?;
        let mut post = self
            .store
            .posts
            .get(&c.post_id)
            .cloned()
            .ok_or(Error::NotFound(Entity::Post(c.post_id)))?;
        let parent_depth = match c.parent_id {
            None => None,
            Some(parent_id) => {
                let parent = self
                    .store
                    .comments
                    .get(&parent_id)
                    .ok_or(Error::NotFound(Entity::Comment(parent_id)))?;
                if parent.post_id != c.post_id {
                    return Err(Error::InvalidArgument(format!(
                        "comment {parent_id} is not on post {}",
                        c.post_id
                    )));
                }
                Some(parent.depth)
            }
        };
        post.comment_count += 1;

        let comment = Comment {
            id: CommentId(self.next_comment),
            post_id: c.post_id,
            parent_id: c.parent_id,
            author,
            date: c.date,
            content: c.content,
            votes: Votes {
                upvotes: 1,
                downvotes: 0,
                viewer_vote: None,
            },
            depth: Comment::depth_under(parent_depth),
        };
        self.next_comment += 1;
        self.votes.insert((uid, Target::Comment(comment.id)), Vote::Up);
        self.store.add_posts(vec![post]);
        self.store.add_comments(vec![comment.clone()]);
        tracing::debug!(id = ?comment.id, post = ?comment.post_id, "created comment");
        Ok(comment)
    }

    fn vote(&mut self, uid: UserId, target: Target, vote: Vote) -> Result<FeedMessage, Error> {
        let votes = match target {
            Target::Post(id) => {
                let post = self
                    .store
                    .posts
                    .get(&id)
                    .cloned()
                    .ok_or(Error::NotFound(Entity::Post(id)))?;
                let mut post = self.project(uid, target, post).apply_vote(vote);
                let votes = post.votes;
                post.votes.viewer_vote = None;
                self.store.add_posts(vec![post]);
                votes
            }
            Target::Comment(id) => {
                let comment = self
                    .store
                    .comments
                    .get(&id)
                    .cloned()
                    .ok_or(Error::NotFound(Entity::Comment(id)))?;
                let mut comment = self.project(uid, target, comment).apply_vote(vote);
                let votes = comment.votes;
                comment.votes.viewer_vote = None;
                self.store.add_comments(vec![comment]);
                votes
            }
        };
        match votes.viewer_vote {
            Some(v) => self.votes.insert((uid, target), v),
            None => self.votes.remove(&(uid, target)),
        };
        tracing::debug!(?uid, ?target, ?votes, "recorded vote");
        Ok(FeedMessage::VotesChanged {
            target,
            upvotes: votes.upvotes,
            downvotes: votes.downvotes,
        })
    }

    fn set_hidden(&mut self, uid: UserId, post: PostId, hidden: bool) -> Result<FeedMessage, Error> {
        if !self.store.posts.contains_key(&post) {
            return Err(Error::NotFound(Entity::Post(post)));
        }
        let u = self.user_mut(uid)?;
        match hidden {
            true => u.hidden.insert(post),
            false => u.hidden.remove(&post),
        };
        tracing::debug!(?uid, ?post, hidden, "recorded hidden flag");
        Ok(FeedMessage::HiddenChanged { post, hidden })
    }

    fn set_saved(&mut self, uid: UserId, target: Target, saved: bool) -> Result<FeedMessage, Error> {
        let known = match target {
            Target::Post(id) => self.store.posts.contains_key(&id),
            Target::Comment(id) => self.store.comments.contains_key(&id),
        };
        if !known {
            return Err(Error::NotFound(match target {
                Target::Post(id) => Entity::Post(id),
                Target::Comment(id) => Entity::Comment(id),
            }));
        }
        let u = self.user_mut(uid)?;
        match saved {
            true => u.saved.insert(target),
            false => u.saved.remove(&target),
        };
        tracing::debug!(?uid, ?target, saved, "recorded saved flag");
        Ok(FeedMessage::SavedChanged { target, saved })
    }

    fn user_mut(&mut self, uid: UserId) -> Result<&mut DbUser, Error> {
        self.users
            .get_mut(&uid)
            .ok_or_else(|| Error::NotFound(Entity::User(uid.0.to_string())))
    }

    /// Removes a post along with its comments and every vote, hide and save
    /// made on them, then tells every open feed
    pub fn delete_post(&mut self, id: PostId) -> Result<(), Error> {
        let post = Arc::make_mut(&mut self.store.posts)
            .remove(&id)
            .ok_or(Error::NotFound(Entity::Post(id)))?;
        Arc::make_mut(&mut self.store.comments).retain(|_, c| c.post_id != id);
        let comments = &self.store.comments;
        let survives = |t: &Target| match t {
            Target::Post(p) => *p != id,
            Target::Comment(c) => comments.contains_key(c),
        };
        self.votes.retain(|(_, t), _| survives(t));
        for u in self.users.values_mut() {
            u.hidden.remove(&id);
            u.saved.retain(|t| survives(t));
        }
        if let Some(mut community) = self.store.community(&post.community).cloned() {
            community.post_count = community.post_count.saturating_sub(1);
            self.store.add_communities(vec![community]);
        }
        tracing::debug!(?id, "deleted post");
        // not an action, so there is no author to speak of
        self.relay_to_all(&FeedMessage::PostDeleted(id));
        Ok(())
    }

    fn viewer_vote(&self, uid: UserId, target: Target) -> Option<Vote> {
        self.votes.get(&(uid, target)).copied()
    }

    fn project<T: Votable>(&self, uid: UserId, target: Target, mut e: T) -> T {
        let votes = e.votes().seen_by(self.viewer_vote(uid, target));
        *e.votes_mut() = votes;
        e
    }

    /// Everything `uid` can see, with their own votes filled in
    pub fn fetch_dump(&self, uid: UserId) -> Result<DbDump, Error> {
        let u = self.resolve(uid)?;
        let mut db = self.store.clone();
        db.owner = uid;
        db.hidden = Arc::new(u.hidden.clone());
        db.saved = Arc::new(u.saved.clone());
        for p in Arc::make_mut(&mut db.posts).values_mut() {
            *p = self.project(uid, Target::Post(p.id), p.clone());
        }
        for c in Arc::make_mut(&mut db.comments).values_mut() {
            *c = self.project(uid, Target::Comment(c.id), c.clone());
        }
        Ok(db)
    }

    pub async fn fetch_feed(
        &self,
        uid: UserId,
        opts: &FeedOptions,
        now: Time,
    ) -> Result<Vec<Post>, Error> {
        self.fetch_dump(uid)?.feed(opts, now).await
    }

    pub async fn fetch_thread(&self, uid: UserId, post: PostId) -> Result<Vec<CommentNode>, Error> {
        self.fetch_dump(uid)?.thread(post).await
    }

    pub async fn action_feed(
        &mut self,
        uid: UserId,
    ) -> Result<mpsc::UnboundedReceiver<FeedMessage>, Error> {
        let u = self
            .users
            .get_mut(&uid)
            .ok_or_else(|| Error::NotFound(Entity::User(uid.0.to_string())))?;
        let (sender, receiver) = mpsc::unbounded_channel();
        u.feeds.push(sender);
        Ok(receiver)
    }

    fn relay_action(&mut self, from: UserId, msg: &FeedMessage) {
        match msg {
            FeedMessage::HiddenChanged { .. } | FeedMessage::SavedChanged { .. } => {
                if let Some(u) = self.users.get_mut(&from) {
                    relay(from, u, msg);
                }
            }
            _ => self.relay_to_all(msg),
        }
    }

    fn relay_to_all(&mut self, msg: &FeedMessage) {
        for (uid, u) in self.users.iter_mut() {
            relay(*uid, u, msg);
        }
    }
}

fn relay(uid: UserId, u: &mut DbUser, msg: &FeedMessage) {
    u.feeds.retain_mut(|f| match f.send(msg.clone()) {
        Ok(()) => true,
        Err(_) => {
            tracing::debug!(?uid, "dropping closed feed");
            false
        }
    });
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}
