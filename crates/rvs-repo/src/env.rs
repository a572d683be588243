//! Identity resolution from the environment and config.
//!
//! `RVS_AUTHOR_NAME` / `RVS_AUTHOR_EMAIL` (and the `RVS_COMMITTER_*`
//! twins) win over `user.name` / `user.email` from the config file.
//! `RVS_AUTHOR_DATE` / `RVS_COMMITTER_DATE` accept the raw
//! `<epoch> <±HHMM>` form and pin timestamps for reproducible tests.

use rvs_utils::date::{RvsDate, Signature};

use crate::config::Config;
use crate::RepoError;

pub(crate) fn signature(prefix: &str, config: &Config) -> Result<Signature, RepoError> {
    let name = std::env::var(format!("{prefix}_NAME"))
        .ok()
        .or_else(|| config.get("user.name").map(str::to_string));
    let email = std::env::var(format!("{prefix}_EMAIL"))
        .ok()
        .or_else(|| config.get("user.email").map(str::to_string));

    let (name, email) = match (name, email) {
        (Some(name), Some(email)) if !name.is_empty() && !email.is_empty() => (name, email),
        _ => return Err(RepoError::IdentityUnset),
    };

    let when = match std::env::var(format!("{prefix}_DATE")) {
        Ok(raw) => RvsDate::parse(&raw)?,
        Err(_) => RvsDate::now(),
    };

    Ok(Signature::new(name, email, when))
}
