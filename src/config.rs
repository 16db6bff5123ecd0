use std::{env, str::FromStr};

use anyhow::Context;

/// How cart mutations are serialized during admission control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartLockScope {
    /// One exclusive lock on the whole `cart_items` table.
    #[default]
    Table,
    /// A transaction-scoped advisory lock keyed by product id.
    Product,
}

impl FromStr for CartLockScope {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(CartLockScope::Table),
            "product" => Ok(CartLockScope::Product),
            other => Err(anyhow::anyhow!(
                "invalid CART_LOCK_SCOPE '{other}', expected 'table' or 'product'"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub cart_lock: CartLockScope,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match env::var("APP_PORT") {
            Ok(p) => p
                .parse::<u16>()
                .with_context(|| format!("invalid APP_PORT '{p}'"))?,
            Err(_) => 3000,
        };
        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|n| n.parse::<u32>().ok())
            .unwrap_or(10);
        let cart_lock = match env::var("CART_LOCK_SCOPE") {
            Ok(scope) => scope.parse()?,
            Err(_) => CartLockScope::default(),
        };
        Ok(Self {
            port,
            database_url,
            host,
            max_connections,
            cart_lock,
        })
    }
}
