//! `/health` endpoint body.

use std::time::Instant;

use serde::Serialize;

use crate::hub::Hub;

/// Coarse liveness of the hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Accepting and serving connections.
    Ok,
    /// Hub torn down; upgrades get 503.
    ShuttingDown,
}

/// Snapshot of hub occupancy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Liveness.
    pub status: HealthStatus,
    /// Whole seconds since the server was created.
    pub uptime_secs: u64,
    /// Registered connections.
    pub connections: usize,
    /// Topics with at least one subscriber.
    pub topics: usize,
}

/// Read the hub's counters.
pub fn health_check(start_time: Instant, hub: &Hub) -> HealthResponse {
    HealthResponse {
        status: if hub.is_shut_down() {
            HealthStatus::ShuttingDown
        } else {
            HealthStatus::Ok
        },
        uptime_secs: start_time.elapsed().as_secs(),
        connections: hub.connection_count(),
        topics: hub.topic_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::HubConfig;
    use matchfeed_core::MatchId;

    fn hub() -> Hub {
        Hub::new(HubConfig::default())
    }

    #[tokio::test]
    async fn counts_connections_and_topics() {
        let hub = hub();
        let (a, _rx_a) = hub.register();
        let (b, _rx_b) = hub.register();
        let _ = hub.subscribe(&a.id, MatchId::new(1).unwrap()).unwrap();
        let _ = hub.subscribe(&b.id, MatchId::new(1).unwrap()).unwrap();
        let _ = hub.subscribe(&b.id, MatchId::new(2).unwrap()).unwrap();

        let resp = health_check(Instant::now(), &hub);
        assert_eq!(resp.status, HealthStatus::Ok);
        assert_eq!(resp.connections, 2);
        assert_eq!(resp.topics, 2);
        assert!(resp.uptime_secs < 2);
    }

    #[tokio::test]
    async fn reports_shutdown() {
        let hub = hub();
        let (_conn, _rx) = hub.register();
        hub.shutdown();

        let resp = health_check(Instant::now(), &hub);
        assert_eq!(resp.status, HealthStatus::ShuttingDown);
        assert_eq!(resp.connections, 0);
    }

    #[test]
    fn uptime_counts_from_start() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        assert!(health_check(start, &hub()).uptime_secs >= 59);
    }

    #[tokio::test]
    async fn wire_shape() {
        let hub = hub();
        hub.shutdown();
        let value = serde_json::to_value(health_check(Instant::now(), &hub)).unwrap();
        assert_eq!(value["status"], "shutting_down");
        assert!(value["uptimeSecs"].is_number());
        assert_eq!(value["topics"], 0);
    }
}
