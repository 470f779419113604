use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{db::Author, AppResult};

pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";
pub const USER: &str = "user";

/// Signed-in identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

impl User {
    pub fn author(&self) -> Author {
        Author {
            name: self.name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

pub async fn current_user(session: &Session) -> AppResult<Option<User>> {
    Ok(session.get::<User>(USER).await?)
}

/// Only same-site paths are followed after login and logout.
pub fn local_path(return_url: Option<String>) -> String {
    match return_url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\") => url,
        _ => "/".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_local_paths() {
        assert_eq!(local_path(Some("/rooms/new".to_owned())), "/rooms/new");
    }

    #[test]
    fn drops_foreign_urls() {
        assert_eq!(local_path(Some("https://evil.example".to_owned())), "/");
        assert_eq!(local_path(Some("//evil.example".to_owned())), "/");
        assert_eq!(local_path(None), "/");
    }
}
