use std::{fmt, str::FromStr};

use crate::Error;

/// How a feed is ordered
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "camelCase")]
pub enum SortMode {
    #[default]
    Hot,
    New,
    #[serde(alias = "topAllTime")]
    Top,
    TopWeek,
    Rising,
    Controversial,
}

impl SortMode {
    pub const ALL: [SortMode; 6] = [
        SortMode::Hot,
        SortMode::New,
        SortMode::Top,
        SortMode::TopWeek,
        SortMode::Rising,
        SortMode::Controversial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Hot => "hot",
            SortMode::New => "new",
            SortMode::Top => "top",
            SortMode::TopWeek => "topWeek",
            SortMode::Rising => "rising",
            SortMode::Controversial => "controversial",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<SortMode, Error> {
        match &s.trim().to_lowercase() as &str {
            "hot" => Ok(SortMode::Hot),
            "new" => Ok(SortMode::New),
            "top" | "topalltime" => Ok(SortMode::Top),
            "topweek" => Ok(SortMode::TopWeek),
            "rising" => Ok(SortMode::Rising),
            "controversial" => Ok(SortMode::Controversial),
            _ => Err(Error::InvalidArgument(format!("unknown sort mode {s:?}"))),
        }
    }
}
