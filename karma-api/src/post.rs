use std::{fmt, str::FromStr};

use crate::{Error, Time, Votable, Votes};

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
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Image,
    Video,
    Link,
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<ContentType, Error> {
        match &s.to_lowercase() as &str {
            "text" | "discussion" | "discussions" => Ok(ContentType::Text),
            "image" | "images" => Ok(ContentType::Image),
            "video" | "videos" => Ok(ContentType::Video),
            "link" | "links" => Ok(ContentType::Link),
            _ => Err(Error::InvalidArgument(format!("unknown post type {s:?}"))),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Post {
    pub id: PostId,

    /// Normalized name of the community this was posted in
    pub community: String,
    pub author: String,
    pub date: Time,

    pub title: String,
    pub content: String,
    pub content_type: ContentType,

    #[serde(flatten)]
    pub votes: Votes,

    /// Maintained by the content store when comments are created
    pub comment_count: u64,
}

impl Votable for Post {
    fn votes(&self) -> &Votes {
        &self.votes
    }

    fn votes_mut(&mut self) -> &mut Votes {
        &mut self.votes
    }

    fn date(&self) -> Time {
        self.date
    }

    fn comment_count(&self) -> u64 {
        self.comment_count
    }
}

/// A post as submitted, before the store assigns it an id
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewPost {
    pub community: String,
    pub date: Time,
    pub title: String,
    pub content: String,
    pub content_type: ContentType,
}

impl NewPost {
    // See comments on other `validate` functions throughout karma-api
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.community)?;
        crate::validate_time(&self.date)?;
        crate::validate_string(&self.title)?;
        crate::validate_string(&self.content)?;
        if self.title.trim().is_empty() {
            return Err(Error::InvalidArgument(String::from("post title is empty")));
        }
        Ok(())
    }
}
