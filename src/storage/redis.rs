//! Redis sorted-set engine
//!
//! Connections come from an r2d2 pool so concurrent requests never share
//! one socket. Every call is a single synchronous command; timeouts are
//! whatever the client and pool enforce.

use std::time::Duration;

use ::redis::Commands;

use crate::config::RedisConfig;
use crate::storage::sorted::SortedSetStore;
use crate::Result;

pub struct RedisSortedSets {
    pool: r2d2::Pool<::redis::Client>,
}

impl RedisSortedSets {
    /// Connect to the configured server and fill the pool
    pub fn connect(config: &RedisConfig) -> Result<Self> {
        let url = config.url();
        tracing::debug!("Connecting to redis at {}", url);
        let client = ::redis::Client::open(url)?;
        let pool = r2d2::Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build(client)?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<::redis::Client>> {
        Ok(self.pool.get()?)
    }
}

impl SortedSetStore for RedisSortedSets {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let created: bool = conn.set_nx(key, value)?;
        Ok(created)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn()?;
        let value: Option<String> = conn.get(key)?;
        Ok(value)
    }

    fn add_member(&self, set: &str, member: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let _: i64 = conn.zadd(set, member, 0)?;
        Ok(())
    }

    fn is_member(&self, set: &str, member: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let score: Option<f64> = conn.zscore(set, member)?;
        Ok(score.is_some())
    }

    fn scan(&self, set: &str, cursor: u64, count: usize) -> Result<(u64, Vec<String>)> {
        let mut conn = self.conn()?;
        // ZSCAN replies with a flat [member, score, member, score, ...] list
        let (next, flat): (u64, Vec<String>) = ::redis::cmd("ZSCAN")
            .arg(set)
            .arg(cursor)
            .arg("COUNT")
            .arg(count.max(1))
            .query(&mut *conn)?;
        let members = flat.into_iter().step_by(2).collect();
        Ok((next, members))
    }
}
