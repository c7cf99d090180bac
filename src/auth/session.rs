//! Session state and the request facts the gate needs

use serde::{Deserialize, Serialize};

use crate::access::Principal;
use crate::types::{Result, TravelerError};

/// Per-browser session as kept by the host's session store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "userid", default)]
    pub user_id: Option<String>,

    #[serde(rename = "username", default)]
    pub user_name: Option<String>,

    /// Filtered directory group ids
    #[serde(default)]
    pub member_of: Vec<String>,

    /// Unset until the local user record has been loaded
    #[serde(default)]
    pub roles: Option<Vec<String>>,

    /// First URL requested before login
    #[serde(default)]
    pub landing: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The requesting principal, if logged in
    pub fn principal(&self) -> Option<Principal> {
        let id = self.user_id.as_ref()?;
        Some(
            Principal::new(id.clone())
                .with_name(self.user_name.clone().unwrap_or_default())
                .with_roles(self.roles.clone().unwrap_or_default())
                .with_groups(self.member_of.clone()),
        )
    }
}

/// Path, query and XHR flag of an incoming request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub xhr: bool,
}

impl RequestInfo {
    /// Parse a request target such as `/travelers/abc?ticket=ST-1`
    pub fn parse(target: &str, xhr: bool) -> Result<Self> {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        let query: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| TravelerError::BadRequest(format!("malformed query: {}", e)))?;
        Ok(Self {
            path: path.to_string(),
            query,
            xhr,
        })
    }

    pub fn ticket(&self) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, v)| k == "ticket" && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    /// Request target as received
    pub fn url(&self) -> String {
        Self::format(&self.path, self.query.iter())
    }

    /// Request target with the `ticket` parameter removed
    pub fn url_without_ticket(&self) -> String {
        Self::format(&self.path, self.query.iter().filter(|(k, _)| k != "ticket"))
    }

    fn format<'a>(path: &str, query: impl Iterator<Item = &'a (String, String)>) -> String {
        let pairs: Vec<&(String, String)> = query.collect();
        if pairs.is_empty() {
            return path.to_string();
        }
        match serde_urlencoded::to_string(&pairs) {
            Ok(q) => format!("{}?{}", path, q),
            Err(_) => path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_strip_ticket() {
        let req = RequestInfo::parse("/binders/1?view=full&ticket=ST-42", false).unwrap();
        assert_eq!(req.path, "/binders/1");
        assert_eq!(req.ticket(), Some("ST-42"));
        assert_eq!(req.url_without_ticket(), "/binders/1?view=full");
        assert_eq!(req.url(), "/binders/1?view=full&ticket=ST-42");

        let bare = RequestInfo::parse("/?ticket=ST-1", false).unwrap();
        assert_eq!(bare.url_without_ticket(), "/");
    }

    #[test]
    fn test_session_principal() {
        let mut session = Session::default();
        assert!(session.principal().is_none());
        session.user_id = Some("bob".into());
        session.member_of = vec!["lab.frib.ops".into()];
        let p = session.principal().unwrap();
        assert_eq!(p.id, "bob");
        assert_eq!(p.groups, vec!["lab.frib.ops".to_string()]);
        assert!(p.roles.is_empty());
    }
}
