//! Rewrite and veto interception events before the engine acts on them.
//!
//! Run with: cargo run --example intercept [-- host:port]

use leakwire_client::{Client, ClientConfig, Outcome};
use serde_json::json;

fn main() {
    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| leakwire_client::DEFAULT_ENDPOINT.to_string());

    let client = Client::with_config(ClientConfig {
        endpoint,
        ..ClientConfig::default()
    });

    client.register_interceptor(["MethodCall"], |_, payload| {
        match payload.get("Method").and_then(|v| v.as_str()) {
            // Rewrite the first argument before the engine sees it.
            Some("SomeSpecificMethod") => Outcome::Replace(
                [("Arguments".to_string(), json!(["intercepted_value"]))]
                    .into_iter()
                    .collect(),
            ),
            // Block this call entirely.
            Some("SomeOtherMethod") => Outcome::Suppress,
            _ => Outcome::NoChange,
        }
    });

    if let Err(err) = client.run(|event, payload, _stop| {
        println!("{event}: {}", serde_json::Value::Object(payload.clone()));
    }) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
