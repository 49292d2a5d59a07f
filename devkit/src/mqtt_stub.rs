/*!
Mock MQTT Client pour développement sans broker

Permet de tester la boucle d'échantillonnage sans démarrer un broker MQTT réel.
Enregistre tous les messages publiés et peut simuler l'échec de certains topics.
*/

use hostmetrics_agent::{BrokerSession, PublishError};
use rumqttc::QoS;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct MockMessage {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retain: bool,
}

/// Mock MQTT Client qui remplace rumqttc::AsyncClient côté publication
#[derive(Clone, Default)]
pub struct MockMqttClient {
    published_messages: Arc<Mutex<Vec<MockMessage>>>,
    attempted_topics: Arc<Mutex<Vec<String>>>,
    failing_topics: Arc<Mutex<HashSet<String>>>,
}

impl MockMqttClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toute publication sur ce topic échouera
    pub fn fail_topic<S: Into<String>>(&self, topic: S) {
        self.failing_topics.lock().unwrap().insert(topic.into());
    }

    /// Récupère tous les messages publiés avec succès (pour assertions de tests)
    pub fn get_published_messages(&self) -> Vec<MockMessage> {
        self.published_messages.lock().unwrap().clone()
    }

    /// Topics de toutes les tentatives de publication, échecs compris, dans l'ordre
    pub fn get_attempted_topics(&self) -> Vec<String> {
        self.attempted_topics.lock().unwrap().clone()
    }

    /// Topics publiés avec succès, dans l'ordre
    pub fn get_published_topics(&self) -> Vec<String> {
        self.published_messages
            .lock()
            .unwrap()
            .iter()
            .map(|msg| msg.topic.clone())
            .collect()
    }

    /// Trouve les messages publiés sur un topic donné
    pub fn find_messages_by_topic(&self, topic: &str) -> Vec<MockMessage> {
        self.published_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|msg| msg.topic == topic)
            .cloned()
            .collect()
    }

    /// Payload du dernier message d'un topic
    pub fn get_last_payload(&self, topic: &str) -> Option<String> {
        self.find_messages_by_topic(topic)
            .last()
            .map(|msg| msg.payload.clone())
    }

    /// Reset tous les messages enregistrés
    pub fn clear(&self) {
        self.published_messages.lock().unwrap().clear();
        self.attempted_topics.lock().unwrap().clear();
    }
}

impl BrokerSession for MockMqttClient {
    async fn send(&self, topic: &str, qos: QoS, retain: bool, payload: String) -> Result<(), PublishError> {
        self.attempted_topics.lock().unwrap().push(topic.to_string());

        if self.failing_topics.lock().unwrap().contains(topic) {
            log::warn!("💥 [MOCK] Rejected publish to {}", topic);
            return Err(PublishError::Rejected(format!("mock failure on {}", topic)));
        }

        log::info!("📤 [MOCK] Published to {}: {}", topic, payload);
        self.published_messages.lock().unwrap().push(MockMessage {
            topic: topic.to_string(),
            payload,
            qos,
            retain,
        });
        Ok(())
    }
}
