//! Single sign-on session gate
//!
//! Establishes the requesting principal from a CAS service ticket. The flow
//! for every request that needs a login:
//!
//! - logged-in session: proceed, or strip a stale `ticket` parameter with a
//!   permanent redirect
//! - `ticket` present: validate it, resolve the user in the directory, keep
//!   filtered group memberships and roles in the session, then return to the
//!   first page requested
//! - otherwise: XHR requests get a 401 challenge, browsers are sent to the
//!   CAS login page
//!
//! The ticket validator is a collaborator; the host supplies the CAS client.

mod basic;
mod groups;
mod session;

pub use basic::ApiUsers;
pub use groups::{common_name, filter_groups};
pub use session::{RequestInfo, Session};

use async_trait::async_trait;
use chrono::Utc;
use hyper::StatusCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::access::Principal;
use crate::directory::{DirectoryLookup, ATTR_MEMBER_OF};
use crate::store::PrincipalStore;
use crate::types::{Result, TravelerError};

/// CAS endpoints
#[derive(Debug, Clone)]
pub struct SsoConfig {
    /// CAS base URL without trailing slash
    pub cas_url: String,
    /// This service's URL as registered with CAS
    pub service_url: String,
}

impl SsoConfig {
    pub fn login_url(&self) -> String {
        format!(
            "{}/login?service={}",
            self.cas_url,
            urlencoding::encode(&self.service_url)
        )
    }
}

/// What the host should do with the request
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Proceed(Principal),
    /// No login required and none present
    Anonymous,
    Redirect {
        status: StatusCode,
        location: String,
    },
    /// Respond 401 with this `WWW-Authenticate` value
    Challenge { www_authenticate: String },
}

/// Result of a service ticket validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketValidation {
    Validated { username: String },
    Rejected,
}

#[async_trait]
pub trait TicketValidator: Send + Sync {
    async fn validate(&self, ticket: &str, service: &str) -> Result<TicketValidation>;
}

#[derive(Clone)]
pub struct AuthGate {
    sso: SsoConfig,
    directory: DirectoryLookup,
    principals: Arc<dyn PrincipalStore>,
    validator: Arc<dyn TicketValidator>,
}

impl AuthGate {
    pub fn new(
        sso: SsoConfig,
        directory: DirectoryLookup,
        principals: Arc<dyn PrincipalStore>,
        validator: Arc<dyn TicketValidator>,
    ) -> Self {
        Self {
            sso,
            directory,
            principals,
            validator,
        }
    }

    pub fn sso(&self) -> &SsoConfig {
        &self.sso
    }

    /// Gate a request that requires a logged-in principal
    pub async fn ensure_authenticated(
        &self,
        session: &mut Session,
        request: &RequestInfo,
    ) -> Result<AuthOutcome> {
        if let Some(principal) = session.principal() {
            if request.ticket().is_some() {
                return Ok(AuthOutcome::Redirect {
                    status: StatusCode::MOVED_PERMANENTLY,
                    location: request.url_without_ticket(),
                });
            }
            return Ok(AuthOutcome::Proceed(principal));
        }

        if let Some(ticket) = request.ticket() {
            return self.login(session, ticket).await;
        }

        if request.xhr {
            return Ok(AuthOutcome::Challenge {
                www_authenticate: format!("CAS realm=\"{}\"", self.sso.service_url),
            });
        }

        session.landing = Some(request.url());
        Ok(AuthOutcome::Redirect {
            status: StatusCode::FOUND,
            location: self.sso.login_url(),
        })
    }

    /// Gate a public page: only a returning ticket triggers a login
    pub async fn check_auth(
        &self,
        session: &mut Session,
        request: &RequestInfo,
    ) -> Result<AuthOutcome> {
        if request.ticket().is_some() {
            return self.ensure_authenticated(session, request).await;
        }
        Ok(session
            .principal()
            .map(AuthOutcome::Proceed)
            .unwrap_or(AuthOutcome::Anonymous))
    }

    async fn login(&self, session: &mut Session, ticket: &str) -> Result<AuthOutcome> {
        let username = match self.validator.validate(ticket, &self.sso.service_url).await {
            Ok(TicketValidation::Validated { username }) => username,
            Ok(TicketValidation::Rejected) => {
                error!("CAS rejected the ticket");
                return Ok(AuthOutcome::Redirect {
                    status: StatusCode::FOUND,
                    location: self.sso.service_url.clone(),
                });
            }
            Err(e) => {
                error!(error = %e, "ticket validation failed");
                return Err(TravelerError::Unauthenticated(e.to_string()));
            }
        };

        // the session stays anonymous until the user record is in place
        let user_id = username.to_lowercase();
        let entry = self.directory.user_by_id(&user_id).await.map_err(|e| {
            warn!(user = %user_id, error = %e, "login directory lookup failed");
            e
        })?;
        let config = self.directory.config();
        let member_of = filter_groups(
            entry.all(ATTR_MEMBER_OF),
            &config.group_prefix,
            &config.group_aliases,
        );

        let existing = match self.principals.find_user(&user_id).await {
            Ok(user) => user,
            Err(e) => {
                error!(user = %user_id, error = %e, "cannot load user record");
                None
            }
        };
        let roles = match existing {
            Some(user) => {
                if let Err(e) = self.principals.touch_user(&user_id, Utc::now()).await {
                    error!(user = %user_id, error = %e, "cannot record last visit");
                }
                user.roles
            }
            None => {
                let mut user = entry.to_user()?;
                user.id = user_id.clone();
                user.last_visited_on = Some(Utc::now());
                self.principals.insert_user(user).await.map_err(|e| {
                    error!(user = %user_id, error = %e, "cannot create user record");
                    TravelerError::Internal("cannot log in. Please contact admin.".into())
                })?;
                info!(user = %user_id, "new user created");
                Vec::new()
            }
        };

        session.user_id = Some(user_id);
        session.user_name = entry.display_name().map(String::from);
        session.member_of = member_of;
        session.roles = Some(roles);

        let location = match session.landing.as_deref() {
            Some(landing) if landing != "/login" => landing.to_string(),
            _ => "/".to_string(),
        };
        Ok(AuthOutcome::Redirect {
            status: StatusCode::FOUND,
            location,
        })
    }
}

/// Require `role` in the session's roles
pub fn verify_role(session: &Session, role: &str) -> Result<()> {
    let roles = session.roles.as_ref().ok_or_else(|| {
        warn!("cannot find the user's roles");
        TravelerError::Internal("something wrong for the user's session".into())
    })?;
    if roles.iter().any(|r| r == role) {
        Ok(())
    } else {
        Err(TravelerError::Unauthorized(
            "You are not authorized to access this resource.".into(),
        ))
    }
}
