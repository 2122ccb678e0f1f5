use std::time::Instant;

use leakwire_client::{Client, ClientConfig, ClientError};
use serde::Serialize;

use crate::cmd::{parse_duration, InfoArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct ProbeOutput<'a> {
    endpoint: &'a str,
    status: &'a str,
    elapsed_ms: u128,
}

/// Probe the engine endpoint. Reachable, refused, and timed out are
/// reported distinctly so an operator can tell whether the engine process
/// is up at all.
pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let config = ClientConfig {
        endpoint: args.endpoint.clone(),
        connect_timeout: parse_duration(&args.timeout)?,
        ..ClientConfig::default()
    };
    let client = Client::with_config(config);

    let started = Instant::now();
    match client.connect() {
        Ok(()) => {
            client.disconnect();
            print_probe(&args.endpoint, "reachable", started.elapsed().as_millis(), format);
            Ok(SUCCESS)
        }
        Err(err) => {
            let status = match &err {
                ClientError::ConnectTimeout { .. } => "timed-out",
                _ => "unreachable",
            };
            print_probe(&args.endpoint, status, started.elapsed().as_millis(), format);
            Err(client_error("probe failed", err))
        }
    }
}

fn print_probe(endpoint: &str, status: &str, elapsed_ms: u128, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ProbeOutput {
                endpoint,
                status,
                elapsed_ms,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("endpoint={endpoint} status={status} elapsed={elapsed_ms}ms");
        }
    }
}
