mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "leakwire", version, about = "Instrumentation engine client CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tap_subcommand() {
        let cli = Cli::try_parse_from([
            "leakwire",
            "tap",
            "localhost:69420",
            "--count",
            "5",
            "--events",
            "Foo,Bar",
        ])
        .expect("tap args should parse");

        assert!(matches!(cli.command, Command::Tap(_)));
    }

    #[test]
    fn tap_defaults_to_the_standard_endpoint() {
        let cli = Cli::try_parse_from(["leakwire", "tap"]).expect("tap should parse bare");
        let Command::Tap(args) = cli.command else {
            panic!("expected tap");
        };
        assert_eq!(args.endpoint, leakwire_client::DEFAULT_ENDPOINT);
        assert!(args.count.is_none());
    }

    #[test]
    fn parses_info_subcommand() {
        let cli = Cli::try_parse_from(["leakwire", "info", "localhost:69420", "--timeout", "3s"])
            .expect("info args should parse");
        assert!(matches!(cli.command, Command::Info(_)));
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["leakwire", "bogus"]).is_err());
    }
}
