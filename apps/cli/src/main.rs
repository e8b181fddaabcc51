//! portpipe — bidirectional relay between a serial port and a local pipe.
//!
//! The binary owns everything the relay core treats as external: argument
//! parsing, the cancellation signal source (SIGINT/SIGTERM set a shared
//! atomic flag), logging setup, and the process exit status. Status lines
//! for the operator go to stdout; diagnostics go through `log`.

use std::path::PathBuf;
use std::process;

use bridge_engine::{Bridge, Connector, PipeTarget, SerialTarget};
use clap::Parser;
use core_types::CancelFlag;

/// Exit status for every failure path.
const EXIT_FAILURE: i32 = -1;

/// Bidirectional relay between a serial port and a local pipe endpoint.
#[derive(Parser, Debug)]
#[command(name = "portpipe")]
#[command(version)]
#[command(about = "Bidirectional relay between a serial port and a local pipe endpoint")]
#[command(after_help = "\
Examples:
  portpipe -c /dev/ttyUSB0 -p /run/user/1000/relay.sock
  portpipe -b 19200 -c /dev/ttyUSB0 -p /run/user/1000/relay.sock

Notes:
  1. portpipe does not create the pipe endpoint, it only connects to an
     existing one.
  2. The default baud rate is 9600. Common rates: 4800, 9600, 14400, 19200,
     38400, 57600, 115200; any positive rate is accepted.")]
struct Cli {
    /// Serial device to bridge
    #[arg(short = 'c', long = "port")]
    port: String,

    /// Path of the pipe endpoint (a Unix-domain socket) to connect to
    #[arg(short = 'p', long = "pipe")]
    pipe: PathBuf,

    /// Baud rate for the serial side
    #[arg(
        short = 'b',
        long = "baud",
        default_value_t = 9600,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    baud: u32,
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help/--version print and exit clean; real usage errors take
            // the failure status.
            let failed = err.use_stderr();
            let _ = err.print();
            process::exit(if failed { EXIT_FAILURE } else { 0 });
        }
    };

    let cancel = CancelFlag::new();
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(err) = signal_hook::flag::register(signal, cancel.shared()) {
            eprintln!("could not install signal handler: {err}");
            process::exit(EXIT_FAILURE);
        }
    }

    println!(
        "Bridging {} at {} baud to {}.",
        cli.port,
        cli.baud,
        cli.pipe.display()
    );
    println!("Press Ctrl-C to quit.");

    let connector = Connector {
        serial: SerialTarget {
            path: cli.port,
            baud_rate: cli.baud,
        },
        pipe: PipeTarget { path: cli.pipe },
    };

    let mut bridge = Bridge::new(connector, cancel);
    if let Err(err) = bridge.run() {
        println!("{err}");
        log::error!("relay stopped: {err}");
        process::exit(EXIT_FAILURE);
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_port_and_pipe_are_required() {
        assert!(Cli::try_parse_from(["portpipe"]).is_err());
        assert!(Cli::try_parse_from(["portpipe", "-c", "/dev/ttyUSB0"]).is_err());
        assert!(Cli::try_parse_from(["portpipe", "-p", "/tmp/relay.sock"]).is_err());
    }

    #[test]
    fn test_baud_defaults_to_9600() {
        let cli =
            Cli::try_parse_from(["portpipe", "-c", "/dev/ttyUSB0", "-p", "/tmp/relay.sock"])
                .unwrap();
        assert_eq!(cli.baud, 9600);
    }

    #[test]
    fn test_any_positive_baud_is_accepted() {
        let cli = Cli::try_parse_from([
            "portpipe",
            "-b",
            "250000",
            "-c",
            "/dev/ttyUSB0",
            "-p",
            "/tmp/relay.sock",
        ])
        .unwrap();
        assert_eq!(cli.baud, 250000);
    }

    #[test]
    fn test_zero_baud_is_rejected() {
        assert!(
            Cli::try_parse_from([
                "portpipe",
                "-b",
                "0",
                "-c",
                "/dev/ttyUSB0",
                "-p",
                "/tmp/relay.sock",
            ])
            .is_err()
        );
    }
}
