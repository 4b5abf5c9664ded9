use crate::cache::RedisClient;
use crate::error::SolverResult;
use crate::types::DailyVisitorStats;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;

const AGENT_SAMPLE_MAX_LEN: usize = 100;

/// Append-only visitor log backed by per-day Redis sets.
///
/// One set of unique caller IPs per UTC calendar day plus a sample user
/// agent. Records grow monotonically within a day; date rollover starts a
/// fresh record instead of mutating the old one. Recording is best-effort
/// and must never fail a user request.
pub struct VisitorLog {
    redis: Arc<RedisClient>,
}

impl VisitorLog {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        VisitorLog { redis }
    }

    fn ips_key(date: &str) -> String {
        format!("visitors:{}:ips", date)
    }

    fn agent_key(date: &str) -> String {
        format!("visitors:{}:agent", date)
    }

    /// Today's record date in YYYY-MM-DD (UTC)
    pub fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Record a caller for the given day.
    ///
    /// Adding an already-seen IP is a no-op on the set; the agent sample is
    /// simply the last one observed.
    pub async fn record(&self, date: &str, caller_ip: &str, user_agent: &str) -> SolverResult<()> {
        let newly_seen = self.redis.add_to_set(&Self::ips_key(date), caller_ip).await?;
        self.redis
            .set_string(&Self::agent_key(date), user_agent)
            .await?;

        if newly_seen {
            debug!("New unique visitor for {}", date);
        }

        Ok(())
    }

    /// Unique-visitor counts and agent samples for the most recent `days`
    /// days, newest first.
    pub async fn daily_stats(&self, days: u32) -> SolverResult<Vec<DailyVisitorStats>> {
        let today = Utc::now().date_naive();
        let mut stats = Vec::with_capacity(days as usize);

        for offset in 0..days {
            let date = (today - Duration::days(offset as i64))
                .format("%Y-%m-%d")
                .to_string();

            let count = self.redis.set_size(&Self::ips_key(&date)).await?;
            let agent = self.redis.get_string(&Self::agent_key(&date)).await?;

            stats.push(DailyVisitorStats {
                date,
                unique_users_count: count,
                sample_device: truncate_agent(agent.as_deref()),
            });
        }

        Ok(stats)
    }
}

fn truncate_agent(agent: Option<&str>) -> String {
    match agent {
        None => "N/A".to_string(),
        Some(agent) if agent.chars().count() > AGENT_SAMPLE_MAX_LEN => {
            let truncated: String = agent.chars().take(AGENT_SAMPLE_MAX_LEN).collect();
            format!("{}...", truncated)
        }
        Some(agent) => agent.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(VisitorLog::ips_key("2026-08-25"), "visitors:2026-08-25:ips");
        assert_eq!(
            VisitorLog::agent_key("2026-08-25"),
            "visitors:2026-08-25:agent"
        );
    }

    #[test]
    fn test_today_format() {
        let today = VisitorLog::today();
        assert_eq!(today.len(), 10);
        assert_eq!(&today[4..5], "-");
        assert_eq!(&today[7..8], "-");
    }

    #[test]
    fn test_truncate_agent() {
        assert_eq!(truncate_agent(None), "N/A");
        assert_eq!(truncate_agent(Some("Mozilla/5.0")), "Mozilla/5.0");

        let long = "x".repeat(150);
        let truncated = truncate_agent(Some(&long));
        assert_eq!(truncated.len(), AGENT_SAMPLE_MAX_LEN + 3);
        assert!(truncated.ends_with("..."));
    }
}
