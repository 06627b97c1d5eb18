use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use time::UtcOffset;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Connection details for the hosted identity provider's admin API.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub url: String,
    pub service_key: String,
}

/// Business rules that differ between deployments.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub default_trial_days: u32,
    pub trial_offset: UtcOffset,
    pub hierarchy_editor_roles: Vec<String>,
    pub supreme_role: String,
    pub role_delete_cascade: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_trial_days: 30,
            trial_offset: UtcOffset::UTC,
            hierarchy_editor_roles: vec![
                "Founder".into(),
                "Head Developer".into(),
                "Developer".into(),
            ],
            supreme_role: "Founder".into(),
            role_delete_cascade: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub identity: IdentityConfig,
    /// Accept unverified tokens. Only safe behind a gateway that already verified them.
    pub trust_gateway: bool,
    pub upstream_timeout: Duration,
    pub policy: PolicyConfig,
}

const MIN_TIMEOUT_SECS: u64 = 10;
const MAX_TIMEOUT_SECS: u64 = 30;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "rolegate".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authenticated".into()),
        };
        let identity = IdentityConfig {
            url: std::env::var("IDENTITY_URL").context("IDENTITY_URL")?,
            service_key: std::env::var("IDENTITY_SERVICE_KEY").context("IDENTITY_SERVICE_KEY")?,
        };

        let defaults = PolicyConfig::default();
        let policy = PolicyConfig {
            default_trial_days: env_parse("DEFAULT_TRIAL_DAYS").unwrap_or(defaults.default_trial_days),
            trial_offset: match std::env::var("TRIAL_UTC_OFFSET") {
                Ok(raw) => parse_offset(&raw)
                    .with_context(|| format!("TRIAL_UTC_OFFSET={raw}"))?,
                Err(_) => defaults.trial_offset,
            },
            hierarchy_editor_roles: std::env::var("HIERARCHY_EDITOR_ROLES")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.hierarchy_editor_roles),
            supreme_role: std::env::var("SUPREME_ROLE").unwrap_or(defaults.supreme_role),
            role_delete_cascade: env_parse("ROLE_DELETE_CASCADE")
                .unwrap_or(defaults.role_delete_cascade),
        };

        let timeout_secs = env_parse::<u64>("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or(15)
            .clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);

        Ok(Self {
            database_url,
            jwt,
            identity,
            trust_gateway: env_parse("TRUST_GATEWAY").unwrap_or(false),
            upstream_timeout: Duration::from_secs(timeout_secs),
            policy,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parses `+HH:MM` / `-HH:MM`.
pub(crate) fn parse_offset(raw: &str) -> anyhow::Result<UtcOffset> {
    let format = time::macros::format_description!("[offset_hour sign:mandatory]:[offset_minute]");
    UtcOffset::parse(raw.trim(), &format).map_err(|e| anyhow::anyhow!(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(" Founder, Head Developer ,,Developer"),
            vec!["Founder", "Head Developer", "Developer"]
        );
    }

    #[test]
    fn parse_offset_accepts_signed_hours() {
        assert_eq!(parse_offset("+00:00").unwrap(), UtcOffset::UTC);
        assert_eq!(
            parse_offset("-05:30").unwrap(),
            UtcOffset::from_hms(-5, -30, 0).unwrap()
        );
        assert!(parse_offset("nonsense").is_err());
    }

    #[test]
    fn default_policy_matches_known_roles() {
        let p = PolicyConfig::default();
        assert_eq!(p.default_trial_days, 30);
        assert_eq!(p.supreme_role, "Founder");
        assert!(p.hierarchy_editor_roles.iter().any(|r| r == "Developer"));
        assert!(!p.role_delete_cascade);
    }
}
