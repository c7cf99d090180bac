//! HTTP Basic authentication for API clients

use base64::{engine::general_purpose, Engine as _};
use std::collections::BTreeMap;
use tracing::debug;

use super::AuthOutcome;
use crate::access::Principal;

/// Configured API user names and passwords
#[derive(Debug, Clone, Default)]
pub struct ApiUsers {
    users: BTreeMap<String, String>,
}

impl ApiUsers {
    pub fn new(users: BTreeMap<String, String>) -> Self {
        Self { users }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check an `Authorization` header value
    pub fn authenticate(&self, authorization: Option<&str>) -> AuthOutcome {
        match authorization.and_then(decode_basic) {
            Some((name, pass)) if self.users.get(&name) == Some(&pass) => {
                AuthOutcome::Proceed(Principal::new(name))
            }
            Some((name, _)) => {
                debug!(user = %name, "api credentials rejected");
                challenge()
            }
            None => challenge(),
        }
    }
}

fn challenge() -> AuthOutcome {
    AuthOutcome::Challenge {
        www_authenticate: "Basic realm=\"api\"".to_string(),
    }
}

fn decode_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (name, pass) = decoded.split_once(':')?;
    Some((name.to_string(), pass.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> ApiUsers {
        let mut map = BTreeMap::new();
        map.insert("reporter".to_string(), "s3cret".to_string());
        ApiUsers::new(map)
    }

    fn header(cred: &str) -> String {
        format!("Basic {}", general_purpose::STANDARD.encode(cred))
    }

    #[test]
    fn test_valid_credentials() {
        let outcome = users().authenticate(Some(&header("reporter:s3cret")));
        assert!(matches!(outcome, AuthOutcome::Proceed(ref p) if p.id == "reporter"));
    }

    #[test]
    fn test_rejected_credentials_challenge() {
        for value in [Some(header("reporter:nope")), Some("Bearer abc".to_string()), None] {
            let outcome = users().authenticate(value.as_deref());
            assert!(matches!(
                outcome,
                AuthOutcome::Challenge { ref www_authenticate } if www_authenticate == "Basic realm=\"api\""
            ));
        }
    }
}
