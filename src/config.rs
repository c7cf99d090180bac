//! Configuration for the traveler engine
//!
//! CLI arguments and environment variable handling using clap. Components
//! never read ambient globals: the host parses [`Args`] once at startup and
//! hands the derived [`DirectoryConfig`] / [`SsoConfig`] to constructors.

use clap::Parser;
use std::collections::BTreeMap;

use crate::auth::{ApiUsers, SsoConfig};
use crate::directory::DirectoryConfig;
use crate::types::TravelerError;

/// Traveler engine configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "traveler")]
#[command(about = "Access, sharing and progress engine for laboratory travelers")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "traveler")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Directory search configuration
    #[command(flatten)]
    pub directory: DirectoryArgs,

    /// Single sign-on configuration
    #[command(flatten)]
    pub sso: SsoArgs,
}

/// Directory (Active Directory / LDAP) search configuration
#[derive(Parser, Debug, Clone)]
pub struct DirectoryArgs {
    /// Base DN for user searches
    #[arg(long, env = "AD_SEARCH_BASE", default_value = "")]
    pub ad_search_base: String,

    /// User search filter by account id; `_id` is replaced
    #[arg(
        long,
        env = "AD_SEARCH_FILTER",
        default_value = "(&(objectClass=user)(sAMAccountName=_id))"
    )]
    pub ad_search_filter: String,

    /// User search filter by display name; `_name` is replaced
    #[arg(
        long,
        env = "AD_NAME_FILTER",
        default_value = "(&(objectClass=user)(displayName=_name))"
    )]
    pub ad_name_filter: String,

    /// Attributes fetched when resolving a user as a share target
    #[arg(
        long,
        env = "AD_OBJ_ATTRIBUTES",
        value_delimiter = ',',
        default_value = "sAMAccountName,displayName,mail,physicalDeliveryOfficeName,telephoneNumber,mobile"
    )]
    pub ad_obj_attributes: Vec<String>,

    /// Attributes fetched at login
    #[arg(
        long,
        env = "AD_MEMBER_ATTRIBUTES",
        value_delimiter = ',',
        default_value = "sAMAccountName,displayName,mail,physicalDeliveryOfficeName,telephoneNumber,mobile,memberOf"
    )]
    pub ad_member_attributes: Vec<String>,

    /// Base DN for group searches
    #[arg(long, env = "AD_GROUP_SEARCH_BASE", default_value = "")]
    pub ad_group_search_base: String,

    /// Group search filter by id; `_id` is replaced
    #[arg(
        long,
        env = "AD_GROUP_SEARCH_FILTER",
        default_value = "(&(objectClass=group)(sAMAccountName=_id))"
    )]
    pub ad_group_search_filter: String,

    /// Attributes fetched when resolving a group
    #[arg(
        long,
        env = "AD_GROUP_ATTRIBUTES",
        value_delimiter = ',',
        default_value = "sAMAccountName,displayName,mail"
    )]
    pub ad_group_attributes: Vec<String>,

    /// Only memberships whose common name starts with this prefix are kept
    #[arg(long, env = "GROUP_PREFIX", default_value = "lab.frib")]
    pub group_prefix: String,

    /// Group aliases as `group=alias` pairs, comma separated
    #[arg(long, env = "GROUP_ALIASES", value_delimiter = ',')]
    pub group_aliases: Vec<String>,
}

/// CAS single sign-on configuration
#[derive(Parser, Debug, Clone)]
pub struct SsoArgs {
    /// CAS server base URL
    #[arg(long, env = "CAS_URL", default_value = "https://cas.example.org/cas")]
    pub cas_url: String,

    /// Service URL registered with CAS
    #[arg(long, env = "SERVICE_URL", default_value = "http://localhost:3001")]
    pub service_url: String,

    /// API basic-auth users as `name=password` pairs, comma separated
    #[arg(long, env = "API_USERS", value_delimiter = ',')]
    pub api_users: Vec<String>,
}

impl DirectoryArgs {
    /// Parse `group=alias` pairs
    pub fn aliases(&self) -> Result<BTreeMap<String, String>, TravelerError> {
        let mut aliases = BTreeMap::new();
        for pair in self.group_aliases.iter().filter(|p| !p.trim().is_empty()) {
            let (group, alias) = pair.split_once('=').ok_or_else(|| {
                TravelerError::Config(format!("group alias '{}' is not group=alias", pair))
            })?;
            let (group, alias) = (group.trim(), alias.trim());
            if group.is_empty() || alias.is_empty() {
                return Err(TravelerError::Config(format!(
                    "group alias '{}' has an empty side",
                    pair
                )));
            }
            aliases.insert(group.to_lowercase(), alias.to_lowercase());
        }
        Ok(aliases)
    }
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), TravelerError> {
        if !self.directory.ad_search_filter.contains("_id") {
            return Err(TravelerError::Config(
                "AD_SEARCH_FILTER must contain the _id placeholder".into(),
            ));
        }
        if !self.directory.ad_name_filter.contains("_name") {
            return Err(TravelerError::Config(
                "AD_NAME_FILTER must contain the _name placeholder".into(),
            ));
        }
        if !self.directory.ad_group_search_filter.contains("_id") {
            return Err(TravelerError::Config(
                "AD_GROUP_SEARCH_FILTER must contain the _id placeholder".into(),
            ));
        }
        if self.sso.cas_url.is_empty() || self.sso.service_url.is_empty() {
            return Err(TravelerError::Config(
                "CAS_URL and SERVICE_URL are required".into(),
            ));
        }
        self.directory.aliases()?;
        self.api_users()?;
        Ok(())
    }

    /// Directory search settings for the share, ownership and login components
    pub fn directory_config(&self) -> Result<DirectoryConfig, TravelerError> {
        let d = &self.directory;
        Ok(DirectoryConfig {
            search_base: d.ad_search_base.clone(),
            search_filter: d.ad_search_filter.clone(),
            name_filter: d.ad_name_filter.clone(),
            obj_attributes: d.ad_obj_attributes.clone(),
            member_attributes: d.ad_member_attributes.clone(),
            group_search_base: d.ad_group_search_base.clone(),
            group_search_filter: d.ad_group_search_filter.clone(),
            group_attributes: d.ad_group_attributes.clone(),
            group_prefix: d.group_prefix.to_lowercase(),
            group_aliases: d.aliases()?,
        })
    }

    pub fn sso_config(&self) -> SsoConfig {
        SsoConfig {
            cas_url: self.sso.cas_url.trim_end_matches('/').to_string(),
            service_url: self.sso.service_url.clone(),
        }
    }

    /// Credentials accepted on the API surface
    pub fn api_users(&self) -> Result<ApiUsers, TravelerError> {
        let mut users = BTreeMap::new();
        for pair in self.sso.api_users.iter().filter(|p| !p.trim().is_empty()) {
            match pair.split_once('=') {
                Some((name, pass)) if !name.trim().is_empty() && !pass.is_empty() => {
                    users.insert(name.trim().to_string(), pass.to_string());
                }
                _ => {
                    return Err(TravelerError::Config(format!(
                        "API user '{}' is not name=password",
                        name_only(pair)
                    )))
                }
            }
        }
        Ok(ApiUsers::new(users))
    }
}

fn name_only(pair: &str) -> &str {
    pair.split('=').next().unwrap_or_default().trim()
}
