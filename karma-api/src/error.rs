use std::fmt;

use anyhow::{anyhow, Context};
use serde_json::json;

use crate::{CommentId, PostId};

/// An entity that the content store can be asked about
#[derive(
    Clone,
    Debug,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(tag = "kind", content = "key", rename_all = "kebab-case")]
pub enum Entity {
    Post(PostId),
    Comment(CommentId),
    Community(String),
    User(String),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Post(id) => write!(f, "post {id}"),
            Entity::Comment(id) => write!(f, "comment {id}"),
            Entity::Community(name) => write!(f, "community {name:?}"),
            Entity::User(name) => write!(f, "user {name:?}"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, bolero::generator::TypeGenerator, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Not found: {0}")]
    NotFound(Entity),

    #[error("Cycle detected in reply chain at comment {0}")]
    CycleDetected(CommentId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Name already used {0}")]
    NameAlreadyUsed(String),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Invalid character in name {0:?}")]
    InvalidName(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::CycleDetected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::NameAlreadyUsed(_) => StatusCode::CONFLICT,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::InvalidName(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::NotFound(e) => json!({
                "message": format!("{e} not found"),
                "type": "not-found",
                "entity": e,
            }),
            Error::CycleDetected(c) => json!({
                "message": "reply chain loops back on itself",
                "type": "cycle-detected",
                "comment": c,
            }),
            Error::InvalidArgument(msg) => json!({
                "message": msg,
                "type": "invalid-argument",
            }),
            Error::NameAlreadyUsed(n) => json!({
                "message": "name already used",
                "type": "conflict-name",
                "name": n,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::InvalidName(n) => json!({
                "message": "there was an invalid character in a name",
                "type": "invalid-name",
                "name": n,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let message = || {
            String::from(
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or(""),
            )
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(message()),
                "not-found" => Error::NotFound(
                    data.get("entity")
                        .cloned()
                        .ok_or_else(|| anyhow!("error is a not-found without an entity"))
                        .and_then(|e| {
                            serde_json::from_value(e).context("parsing not-found entity")
                        })?,
                ),
                "cycle-detected" => Error::CycleDetected(
                    data.get("comment")
                        .cloned()
                        .ok_or_else(|| anyhow!("error is a cycle without a comment id"))
                        .and_then(|c| {
                            serde_json::from_value(c).context("parsing cycle comment id")
                        })?,
                ),
                "invalid-argument" => Error::InvalidArgument(message()),
                "conflict-name" => Error::NameAlreadyUsed(String::from(
                    data.get("name")
                        .and_then(|n| n.as_str())
                        .ok_or_else(|| anyhow!("error is a name conflict without a name"))?,
                )),
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                "invalid-name" => Error::InvalidName(String::from(
                    data.get("name").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is about an invalid name but no name was provided")
                    })?,
                )),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
