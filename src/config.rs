//! Server configuration from CLI flags and environment variables.

use anyhow::{bail, Result};
use clap::Parser;
use tracing::warn;

use crate::auth::{jwt::DEFAULT_EXPIRATION_HOURS, password, PageLimits};

const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";
const DEV_ADMIN_PASSWORD: &str = "admin123";
const MIN_SECRET_LEN: usize = 16;
/// Upper bound on token lifetime, about a year
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

#[derive(Parser, Debug, Clone)]
#[command(name = "usermgmt")]
#[command(about = "User management API with signed session tokens")]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// SQLite file holding user accounts
    #[arg(long, env = "AUTH_DB_PATH", default_value = "users.db")]
    pub db_path: String,

    /// HMAC key for signing session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Session token lifetime in hours
    #[arg(long, env = "TOKEN_TTL_HOURS", default_value_t = DEFAULT_EXPIRATION_HOURS)]
    pub token_ttl_hours: i64,

    /// bcrypt work factor for stored credentials
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// Default page size of the admin user listing
    #[arg(long, env = "ADMIN_PAGE_SIZE", default_value = "20")]
    pub page_size: u32,

    /// Upper bound a client may request for the admin user listing
    #[arg(long, env = "ADMIN_MAX_PAGE_SIZE", default_value = "100")]
    pub max_page_size: u32,

    /// Password for the `admin` account seeded on an empty database
    #[arg(long, env = "BOOTSTRAP_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

impl Config {
    /// Reject settings the server cannot run safely with.
    pub fn validate(&self) -> Result<()> {
        if self.token_ttl_hours <= 0 {
            bail!("TOKEN_TTL_HOURS must be positive");
        }
        if self.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            bail!("TOKEN_TTL_HOURS cannot exceed {}", MAX_TOKEN_TTL_HOURS);
        }
        if !(password::MIN_COST..=password::MAX_COST).contains(&self.bcrypt_cost) {
            bail!(
                "BCRYPT_COST must be between {} and {}",
                password::MIN_COST,
                password::MAX_COST
            );
        }
        if self.page_size == 0 || self.max_page_size == 0 {
            bail!("Page sizes must be at least 1");
        }
        if self.page_size > self.max_page_size {
            bail!("ADMIN_PAGE_SIZE cannot exceed ADMIN_MAX_PAGE_SIZE");
        }
        if let Some(secret) = &self.jwt_secret {
            if secret.len() < MIN_SECRET_LEN {
                bail!("JWT_SECRET must be at least {} bytes", MIN_SECRET_LEN);
            }
        }
        Ok(())
    }

    pub fn jwt_secret(&self) -> String {
        match &self.jwt_secret {
            Some(secret) => secret.clone(),
            None => {
                warn!("⚠️  JWT_SECRET not set, using development secret");
                DEV_JWT_SECRET.to_string()
            }
        }
    }

    pub fn admin_password(&self) -> String {
        match &self.admin_password {
            Some(password) => password.clone(),
            None => {
                warn!("⚠️  BOOTSTRAP_ADMIN_PASSWORD not set, using development default");
                DEV_ADMIN_PASSWORD.to_string()
            }
        }
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_per_page: self.page_size,
            max_per_page: self.max_page_size,
        }
    }
}
