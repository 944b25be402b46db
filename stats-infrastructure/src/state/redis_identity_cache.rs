use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use stats_domain::IdentityCache;

pub fn identity_key(guid: &str) -> String {
    format!("guid:{}:smf_id", guid)
}

/// Shared identity tier. Entries expire on their own; nothing invalidates them.
/// Only registrations overwrite; lookup results are written with `SET NX`.
#[derive(Clone)]
pub struct RedisIdentityCache {
    conn: ConnectionManager,
}

impl RedisIdentityCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl IdentityCache for RedisIdentityCache {
    async fn get(&self, guid: &str) -> Result<Option<i64>> {
        let mut conn = self.conn.clone();
        let smf_id: Option<i64> = conn.get(identity_key(guid)).await?;
        Ok(smf_id)
    }

    async fn put(&self, guid: &str, smf_id: i64, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(identity_key(guid), smf_id, ttl_seconds(ttl))
            .await?;
        Ok(())
    }

    async fn put_if_absent(&self, guid: &str, smf_id: i64, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: Option<String> = set_nx_ex(guid, smf_id, ttl).query_async(&mut conn).await?;
        Ok(())
    }

    async fn put_many_if_absent(&self, entries: &[(String, i64)], ttl: Duration) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for (guid, smf_id) in entries {
            pipe.add_command(set_nx_ex(guid, *smf_id, ttl)).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}

fn set_nx_ex(guid: &str, smf_id: i64, ttl: Duration) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(identity_key(guid))
        .arg(smf_id)
        .arg("NX")
        .arg("EX")
        .arg(ttl_seconds(ttl));
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_second_ttls_round_up() {
        assert_eq!(identity_key("abc"), "guid:abc:smf_id");
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(300)), 300);
    }

    #[test]
    fn lookup_write_back_never_overwrites() {
        let packed = set_nx_ex("abc", 0, Duration::from_secs(60)).get_packed_command();
        let text = String::from_utf8_lossy(&packed);
        assert!(text.contains("guid:abc:smf_id"));
        assert!(text.contains("NX"));
        assert!(text.contains("EX"));
    }
}
