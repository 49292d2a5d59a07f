/*!
# HostMetrics DevKit - Stubs et Utilitaires pour Développement

Bibliothèque facilitant le test de l'agent de métriques avec:
- Stub MQTT pour tests sans broker
- Faux collecteur système scriptable
- Horloge fixe et harness de test
*/

pub mod host_stub;
pub mod mqtt_stub;
pub mod test_utils;

pub use host_stub::FakeHostStats;
pub use mqtt_stub::{MockMessage, MockMqttClient};
pub use test_utils::{FixedClock, TestHarness, TEST_TIMESTAMP};
