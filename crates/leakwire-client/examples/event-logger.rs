//! Connect to a running engine and print every event until the stream ends.
//!
//! Run with: cargo run --example event-logger [-- host:port]

use leakwire_client::{Client, ClientConfig};

fn main() {
    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| leakwire_client::DEFAULT_ENDPOINT.to_string());

    let client = Client::with_config(ClientConfig {
        endpoint,
        ..ClientConfig::default()
    });

    let result = client.run(|event, payload, _stop| {
        println!("{event}: {}", serde_json::Value::Object(payload.clone()));
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
