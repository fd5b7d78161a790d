// Endpoint discovery and the primary/secondary RPC pool (spec §4.7). A
// light client starts with one or more seed endpoints, then periodically
// asks each of them (via a small GraphQL query) for the rest of the
// network's known endpoints, refreshing its pool every `DISCOVERY_INTERVAL`.

use serde::Deserialize;
use std::time::Duration;

pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct EndpointPool {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

impl EndpointPool {
    pub fn new(primary: Vec<String>, secondary: Vec<String>) -> Self {
        EndpointPool { primary, secondary }
    }

    /// All endpoints, primaries first, for a client that wants to fail
    /// over transparently.
    pub fn ordered(&self) -> Vec<&str> {
        self.primary
            .iter()
            .chain(self.secondary.iter())
            .map(|s| s.as_str())
            .collect()
    }

    pub fn merge_discovered(&mut self, discovered: Vec<String>) {
        for endpoint in discovered {
            if !self.primary.contains(&endpoint) && !self.secondary.contains(&endpoint) {
                self.secondary.push(endpoint);
            }
        }
    }
}

#[derive(Deserialize)]
struct DiscoveryResponse {
    data: DiscoveryData,
}

#[derive(Deserialize)]
struct DiscoveryData {
    peers: Vec<PeerEntry>,
}

#[derive(Deserialize)]
struct PeerEntry {
    endpoint: String,
}

const DISCOVERY_QUERY: &str = r#"{"query":"{ peers { endpoint } }"}"#;

pub async fn discover_peers(client: &reqwest::Client, endpoint: &str) -> anyhow::Result<Vec<String>> {
    let url = format!("{endpoint}/graphql");
    let response = client
        .post(&url)
        .header("content-type", "application/json")
        .body(DISCOVERY_QUERY)
        .send()
        .await?
        .json::<DiscoveryResponse>()
        .await?;
    Ok(response.data.peers.into_iter().map(|p| p.endpoint).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_discovered_skips_known_endpoints() {
        let mut pool = EndpointPool::new(vec!["https://a".to_string()], vec!["https://b".to_string()]);
        pool.merge_discovered(vec!["https://a".to_string(), "https://c".to_string()]);
        assert_eq!(pool.secondary, vec!["https://b".to_string(), "https://c".to_string()]);
    }

    #[test]
    fn ordered_lists_primary_before_secondary() {
        let pool = EndpointPool::new(vec!["https://a".to_string()], vec!["https://b".to_string()]);
        assert_eq!(pool.ordered(), vec!["https://a", "https://b"]);
    }
}
