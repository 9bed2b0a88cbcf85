use std::collections::BTreeSet;

use crate::{
    api::{names_match, ContentType, Post, PostId, SortMode, Time},
    OrderExt,
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FeedOptions {
    /// Only keep posts from this community, compared case-insensitively
    pub community: Option<String>,

    /// Only keep posts of this type
    pub kind: Option<ContentType>,

    /// Posts the viewer hid, left out whatever the other filters say
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub hidden: BTreeSet<PostId>,

    pub mode: SortMode,

    // Signed so that out-of-range values sent by callers get clamped rather
    // than rejected
    pub limit: i64,
    pub offset: i64,
}

impl Default for FeedOptions {
    fn default() -> FeedOptions {
        FeedOptions {
            community: None,
            kind: None,
            hidden: BTreeSet::new(),
            mode: SortMode::default(),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl FeedOptions {
    pub fn matches(&self, p: &Post) -> bool {
        !self.hidden.contains(&p.id)
            && self
                .community
                .as_ref()
                .map_or(true, |c| names_match(c, &p.community))
            && self.kind.map_or(true, |k| k == p.content_type)
    }
}

/// Returns the posts `opts` selects, in feed order, windowed to one page
pub fn page(posts: &[Post], opts: &FeedOptions, now: Time) -> Vec<Post> {
    if opts.limit <= 0 {
        return Vec::new();
    }
    let selected = posts
        .iter()
        .filter(|p| opts.matches(p))
        .cloned()
        .collect::<Vec<_>>();
    let offset = usize::try_from(opts.offset.max(0)).unwrap_or(usize::MAX);
    let limit = usize::try_from(opts.limit).unwrap_or(usize::MAX);
    opts.mode
        .order(selected, now)
        .into_iter()
        .skip(offset)
        .take(limit)
        .collect()
}
