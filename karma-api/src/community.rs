use crate::{Error, Time};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Community {
    /// Always normalized, see `normalize_name`
    pub name: String,
    pub description: String,
    pub member_count: u64,
    pub post_count: u64,
    pub date: Time,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewCommunity {
    pub name: String,
    pub description: String,
    pub date: Time,
}

impl NewCommunity {
    // See comments on other `validate` functions throughout karma-api
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_name(&self.name)?;
        crate::validate_string(&self.description)?;
        crate::validate_time(&self.date)
    }
}
