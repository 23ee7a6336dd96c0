//! Prediction Request Client
//!
//! Sends generated symptom requests to the prediction service over NATS
//! request/reply and logs the answers.

use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// Request body matching the service's inbound format
#[derive(Debug, Clone, Serialize)]
struct SymptomRequest {
    symptoms: BTreeMap<String, u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<String>,
}

/// Random patient generator
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    symptoms: Vec<String>,
}

impl RequestGenerator {
    fn new(symptoms: Vec<String>) -> Self {
        Self {
            rng: rand::thread_rng(),
            symptoms,
        }
    }

    fn generate(&mut self) -> SymptomRequest {
        let symptoms = self
            .symptoms
            .iter()
            .map(|s| (s.clone(), u8::from(self.rng.gen_bool(0.3))))
            .collect();

        // Leave age and gender out now and then to exercise the defaults
        let age = self.rng.gen_bool(0.9).then(|| self.rng.gen_range(1..90));
        let gender = self
            .rng
            .gen_bool(0.9)
            .then(|| if self.rng.gen_bool(0.5) { "M" } else { "F" }.to_string());

        SymptomRequest {
            symptoms,
            age,
            gender,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("predict_client=info".parse()?),
        )
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("symptoms.predict");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(10);
    let symptoms: Vec<String> = args
        .get(4)
        .map(|s| s.as_str())
        .unwrap_or("fever,cough,headache,fatigue,chills,rash,nausea")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        symptoms = ?symptoms,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = async_nats::connect(nats_url).await?;
    info!("Connected to NATS");

    let mut generator = RequestGenerator::new(symptoms);
    let mut answered = 0u64;

    for i in 0..count {
        let request = generator.generate();
        let payload = serde_json::to_vec(&request)?;

        let reply = tokio::time::timeout(
            Duration::from_secs(5),
            client.request(subject.to_string(), payload.into()),
        )
        .await;

        match reply {
            Ok(Ok(message)) => {
                answered += 1;
                let body: serde_json::Value = serde_json::from_slice(&message.payload)?;
                info!(
                    request = i + 1,
                    sent = %serde_json::to_string(&request)?,
                    "Reply: {}",
                    body
                );
            }
            Ok(Err(e)) => warn!(request = i + 1, error = %e, "Request failed"),
            Err(_) => warn!(request = i + 1, "Request timed out"),
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! {} of {} requests answered", answered, count);

    Ok(())
}
