/*!
Test Harness pour la boucle d'échantillonnage

Facilite l'écriture de tests avec:
- Setup automatique du mock MQTT et du faux collecteur
- Horloge fixe pour des timestamps reproductibles
- Assertions sur les topics et payloads publiés
*/

use crate::host_stub::FakeHostStats;
use crate::mqtt_stub::MockMqttClient;
use anyhow::Result;
use hostmetrics_agent::{
    Clock, HostId, MetricPublisher, MetricSampler, PassSummary, SampleError, SampleLoop, SamplingSettings,
    Topics,
};
use std::collections::HashMap;

/// Horloge qui renvoie toujours le même instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_nanos(&self) -> i64 {
        self.0
    }
}

/// Timestamp utilisé par défaut par le harness (14 nov. 2023)
pub const TEST_TIMESTAMP: i64 = 1_700_000_000_000_000_000;

/// Harness de test complet: boucle réelle, broker et OS simulés
pub struct TestHarness {
    pub mqtt_client: MockMqttClient,
    pub topics: Topics,
    pub sample_loop: SampleLoop<FakeHostStats, MockMqttClient, FixedClock>,
}

impl TestHarness {
    /// Crée un harness pour `host_id` avec les valeurs de [`FakeHostStats::typical`]
    pub fn new(host_id: &str) -> Self {
        Self::with_stats(host_id, FakeHostStats::typical())
    }

    pub fn with_stats(host_id: &str, stats: FakeHostStats) -> Self {
        env_logger::try_init().ok(); // Init logging pour tests

        let mqtt_client = MockMqttClient::new();
        let topics = Topics::new(&HostId::new(host_id));
        let sample_loop = SampleLoop::new(
            MetricSampler::new(stats),
            MetricPublisher::new(mqtt_client.clone(), topics.clone()),
            FixedClock(TEST_TIMESTAMP),
            SamplingSettings::default(),
        );

        Self {
            mqtt_client,
            topics,
            sample_loop,
        }
    }

    /// Accès au faux collecteur après construction
    pub fn stats(&mut self) -> &mut FakeHostStats {
        self.sample_loop.sampler_mut().stats_mut()
    }

    /// Exécute une passe complète au timestamp par défaut
    pub async fn run_pass(&mut self) -> Result<PassSummary, SampleError> {
        self.sample_loop.run_pass(TEST_TIMESTAMP).await
    }

    /// Topic complet pour un chemin relatif (`memory/total`)
    pub fn topic(&self, path: &str) -> String {
        self.topics.metric(path)
    }

    /// Assert que le dernier payload publié sur `path` vaut `expected`
    pub fn assert_payload(&self, path: &str, expected: &str) -> Result<()> {
        let topic = self.topic(path);
        match self.mqtt_client.get_last_payload(&topic) {
            Some(payload) if payload == expected => {
                log::info!("✅ Found expected payload on {}", topic);
                Ok(())
            }
            Some(payload) => anyhow::bail!(
                "Payload mismatch on '{}': expected {:?}, got {:?}",
                topic,
                expected,
                payload
            ),
            None => anyhow::bail!("Expected message not found on topic: {}", topic),
        }
    }

    /// Nombre de messages publiés par topic
    pub fn topic_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for msg in self.mqtt_client.get_published_messages() {
            *counts.entry(msg.topic).or_insert(0) += 1;
        }
        counts
    }

    /// Reset le harness pour une nouvelle passe
    pub fn reset(&mut self) {
        self.mqtt_client.clear();
        log::info!("🧹 Test harness reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_harness_basic_functionality() {
        let mut harness = TestHarness::new("h");

        let summary = harness.run_pass().await.unwrap();
        assert_eq!(summary.failed, 0);

        harness.assert_payload("uptime", "1700000000000000000;12345.68").unwrap();
        assert!(harness.assert_payload("memory/total", "nope").is_err());
        assert!(harness.assert_payload("does/not/exist", "x").is_err());

        assert_eq!(harness.topic_counts().get("metrics/h/load/avg1"), Some(&1));

        harness.reset();
        assert!(harness.mqtt_client.get_published_messages().is_empty());
    }
}
