use crate::Error;

pub const MAX_NAME_LEN: usize = 64;

/// Canonical form of a community or user name, used for every lookup
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn names_match(a: &str, b: &str) -> bool {
    // avoid allocating for the common already-normalized case
    a == b || normalize_name(a) == normalize_name(b)
}

/// Checks that `name`, once normalized, is usable as a community or user name
pub fn validate_name(name: &str) -> Result<(), Error> {
    crate::validate_string(name)?;
    let normalized = normalize_name(name);
    if normalized.is_empty()
        || normalized.chars().count() > MAX_NAME_LEN
        || !normalized
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::InvalidName(String::from(name)));
    }
    Ok(())
}
