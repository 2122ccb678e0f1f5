use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use leakwire_client::{Client, ClientConfig};

use crate::cmd::{parse_duration, TapArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub fn run(args: TapArgs, format: OutputFormat) -> CliResult<i32> {
    let config = ClientConfig {
        endpoint: args.endpoint.clone(),
        connect_timeout: parse_duration(&args.timeout)?,
        ..ClientConfig::default()
    };
    let client = Arc::new(Client::with_config(config));
    install_ctrlc_handler(Arc::clone(&client))?;

    let filter = args.events;
    let limit = args.count;
    let printed = AtomicUsize::new(0);

    client
        .run(move |event, payload, stop| {
            if let Some(filter) = &filter {
                if !filter.iter().any(|wanted| wanted == event) {
                    return;
                }
            }
            print_event(event, payload, format);
            let total = printed.fetch_add(1, Ordering::SeqCst) + 1;
            if limit.is_some_and(|limit| total >= limit) {
                stop.stop();
            }
        })
        .map_err(|err| client_error("session failed", err))?;

    Ok(SUCCESS)
}

fn install_ctrlc_handler(client: Arc<Client>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        // Teardown flips `running`, which ends the tap run loop.
        client.disconnect();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
