#![cfg(test)]

use std::panic::AssertUnwindSafe;

use chrono::TimeZone;
use karma_client::api::{CommentId, ContentType, Uuid};

use crate::*;

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    CreateUser,
    NewPost {
        uid: usize,
    },
    NewComment {
        uid: usize,
        post: u8,
        parent: Option<u8>,
    },
    Vote {
        uid: usize,
        id: u8,
        on_comment: bool,
        vote: Vote,
    },
    DeletePost {
        post: u8,
    },
    Hide {
        uid: usize,
        post: u8,
        undo: bool,
    },
    Save {
        uid: usize,
        id: u8,
        on_comment: bool,
        undo: bool,
    },
}

fn date() -> Time {
    chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

async fn apply(s: &mut MockServer, op: FuzzOp) {
    let num_users = s.test_num_users();
    let user = |uid: usize| s.test_get_user(uid % num_users);
    let res = match op {
        FuzzOp::CreateUser => s
            .admin_create_user(UserId(Uuid::new_v4()), &format!("user{num_users}"))
            .map(|_| ()),
        FuzzOp::NewPost { uid } => {
            let uid = user(uid);
            let a = Action::NewPost(NewPost {
                community: String::from("fuzz"),
                date: date(),
                title: String::from("title"),
                content: String::new(),
                content_type: ContentType::Text,
            });
            s.submit_action(uid, a).await.map(|_| ())
        }
        FuzzOp::NewComment { uid, post, parent } => {
            let uid = user(uid);
            let a = Action::NewComment(NewComment {
                post_id: PostId(post as u64),
                parent_id: parent.map(|p| CommentId(p as u64)),
                date: date(),
                content: String::from("content"),
            });
            s.submit_action(uid, a).await.map(|_| ())
        }
        FuzzOp::Vote {
            uid,
            id,
            on_comment,
            vote,
        } => {
            let uid = user(uid);
            let target = match on_comment {
                true => Target::Comment(CommentId(id as u64)),
                false => Target::Post(PostId(id as u64)),
            };
            s.submit_action(uid, Action::Vote(target, vote))
                .await
                .map(|_| ())
        }
        FuzzOp::DeletePost { post } => s.delete_post(PostId(post as u64)),
        FuzzOp::Hide { uid, post, undo } => {
            let uid = user(uid);
            let a = match undo {
                false => Action::Hide(PostId(post as u64)),
                true => Action::Unhide(PostId(post as u64)),
            };
            s.submit_action(uid, a).await.map(|_| ())
        }
        FuzzOp::Save {
            uid,
            id,
            on_comment,
            undo,
        } => {
            let uid = user(uid);
            let target = match on_comment {
                true => Target::Comment(CommentId(id as u64)),
                false => Target::Post(PostId(id as u64)),
            };
            let a = match undo {
                false => Action::Save(target),
                true => Action::Unsave(target),
            };
            s.submit_action(uid, a).await.map(|_| ())
        }
    };
    match res {
        Ok(()) => (),
        Err(Error::NotFound(_)) | Err(Error::InvalidArgument(_)) => (),
        Err(e) => panic!("unexpected error: {e}"),
    }
}

/// Aggregate counters equal the number of stored per-user votes
fn check_counters(s: &MockServer) {
    let count = |target: Target, dir: Vote| {
        s.votes
            .iter()
            .filter(|((_, t), v)| *t == target && **v == dir)
            .count() as u64
    };
    for p in s.store.posts.values() {
        let t = Target::Post(p.id);
        assert_eq!(p.votes.viewer_vote, None);
        assert_eq!(p.votes.upvotes, count(t, Vote::Up), "upvotes of {t:?}");
        assert_eq!(p.votes.downvotes, count(t, Vote::Down), "downvotes of {t:?}");
        let comments = s.store.comments.values().filter(|c| c.post_id == p.id);
        assert_eq!(p.comment_count, comments.count() as u64);
    }
    for c in s.store.comments.values() {
        let t = Target::Comment(c.id);
        assert_eq!(c.votes.viewer_vote, None);
        assert_eq!(c.votes.upvotes, count(t, Vote::Up), "upvotes of {t:?}");
        assert_eq!(c.votes.downvotes, count(t, Vote::Down), "downvotes of {t:?}");
    }
    let exists = |t: &Target| match t {
        Target::Post(id) => s.store.posts.contains_key(id),
        Target::Comment(id) => s.store.comments.contains_key(id),
    };
    for (_, t) in s.votes.keys() {
        assert!(exists(t), "vote on missing {t:?}");
    }
    for u in s.users.values() {
        assert!(u.hidden.iter().all(|p| s.store.posts.contains_key(p)));
        assert!(u.saved.iter().all(|t| exists(t)));
    }
}

/// Every stored id sits below the counter that handed it out
fn check_ids(s: &MockServer, prev: (u64, u64)) -> (u64, u64) {
    assert!(s.store.posts.keys().all(|id| id.0 < s.next_post));
    assert!(s.store.comments.keys().all(|id| id.0 < s.next_comment));
    assert!(s.next_post >= prev.0 && s.next_comment >= prev.1);
    (s.next_post, s.next_comment)
}

do_tokio_test!(fuzz_counters_match_stored_votes, Vec<FuzzOp>, |ops: Vec<FuzzOp>| async move {
    let mut s = MockServer::new();
    let founder = UserId(Uuid::new_v4());
    s.admin_create_user(founder, "founder").unwrap();
    s.create_community(
        founder,
        NewCommunity {
            name: String::from("fuzz"),
            description: String::new(),
            date: date(),
        },
    )
    .unwrap();
    let mut ids = (1, 1);
    for op in ops {
        apply(&mut s, op).await;
        check_counters(&s);
        ids = check_ids(&s, ids);
    }
});

do_tokio_test!(fuzz_thread_always_builds, Vec<(u8, Option<u8>)>, |replies: Vec<(u8, Option<u8>)>| async move {
    let mut s = MockServer::new();
    let uid = UserId(Uuid::new_v4());
    s.admin_create_user(uid, "author").unwrap();
    s.create_community(
        uid,
        NewCommunity {
            name: String::from("fuzz"),
            description: String::new(),
            date: date(),
        },
    )
    .unwrap();
    for _ in 0..3 {
        apply(&mut s, FuzzOp::NewPost { uid: 0 }).await;
    }
    for (post, parent) in replies {
        apply(&mut s, FuzzOp::NewComment { uid: 0, post, parent }).await;
    }
    for post in s.store.posts.keys().copied().collect::<Vec<_>>() {
        let thread = s.fetch_thread(uid, post).await.unwrap();
        let total = thread.iter().map(|n| 1 + n.descendants()).sum::<usize>();
        assert_eq!(total as u64, s.store.posts[&post].comment_count);
    }
});
