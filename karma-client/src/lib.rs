mod db;
pub use db::{DbDump, DbExt};

mod feed;
pub use feed::{page, FeedOptions, DEFAULT_PAGE_SIZE};

mod ledger;
pub use ledger::VotableExt;

mod order;
pub use order::OrderExt;

mod tree;
pub use tree::{attach, build, find_in, replace, walk, CommentNode, Walk};

pub mod api {
    pub use karma_api::*;
}

pub mod prelude {
    pub use crate::{DbExt, OrderExt, VotableExt};
}
