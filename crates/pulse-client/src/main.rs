//! # pulse
//!
//! Command-line client for the Pulse realtime service.
//!
//! ## Usage
//!
//! ```bash
//! # Publish a JSON message
//! pulse publish room '{"text":"hello"}'
//!
//! # Print everything arriving on two channels, with presence
//! pulse listen room lobby --presence
//!
//! # Use a specific config file and export metrics
//! pulse --config /path/to/pulse.toml --metrics-port 9100 here-now room
//!
//! # Keys from the environment
//! PULSE_SUBSCRIBE_KEY=sub-c-... PULSE_PUBLISH_KEY=pub-c-... pulse time
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tenvis_pulse_client::{metrics, ClientConfig, PulseClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "pulse")]
#[command(about = "Command-line client for the Pulse realtime service")]
struct Cli {
    /// Path to configuration file (default search paths when omitted)
    #[arg(short, long, env = "PULSE_CONFIG")]
    config: Option<String>,

    /// Serve Prometheus metrics on this port
    #[arg(long)]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Publish a message (JSON, or plain text)
    Publish { channel: String, message: String },

    /// Publish without storage or replication
    Fire { channel: String, message: String },

    /// Send a signal
    Signal { channel: String, message: String },

    /// Get this client's state, or set it to <STATE>
    State {
        channel: String,
        state: Option<String>,
    },

    /// Channel occupancy; global without channels
    HereNow { channels: Vec<String> },

    /// Service timetoken
    Time,

    /// Print events until interrupted
    Listen {
        #[arg(required = true)]
        channels: Vec<String>,

        /// Also subscribe to presence events
        #[arg(long)]
        presence: bool,
    },
}

/// Read a message argument as JSON, falling back to a plain string.
fn message_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=info,tenvis_pulse_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => ClientConfig::from_file(shellexpand::tilde(path).into_owned())?,
        None => ClientConfig::load()?,
    };

    // Initialize metrics
    metrics::init_metrics();
    if let Some(port) = cli.metrics_port {
        metrics::start_metrics_server(port)
            .map_err(|e| anyhow::anyhow!("Failed to start metrics server: {}", e))?;
    }

    let client = PulseClient::new(config);
    let result = run(&client, cli.command).await;
    client.destroy();
    result
}

async fn run(client: &PulseClient, command: Command) -> Result<()> {
    match command {
        Command::Publish { channel, message } => {
            let sent = client
                .publish()
                .channel(channel)
                .message(message_value(&message))
                .execute()
                .await?;
            print_json(&sent.data)
        }
        Command::Fire { channel, message } => {
            let sent = client
                .fire()
                .channel(channel)
                .message(message_value(&message))
                .execute()
                .await?;
            print_json(&sent.data)
        }
        Command::Signal { channel, message } => {
            let sent = client
                .signal()
                .channel(channel)
                .message(message_value(&message))
                .execute()
                .await?;
            print_json(&sent.data)
        }
        Command::State {
            channel,
            state: None,
        } => {
            let state = client.get_state().channels([channel]).execute().await?;
            print_json(&state.data)
        }
        Command::State {
            channel,
            state: Some(state),
        } => {
            let stored = client
                .set_state()
                .channels([channel])
                .state(message_value(&state))
                .execute()
                .await?;
            print_json(&stored.data)
        }
        Command::HereNow { channels } => {
            let here_now = client.here_now().channels(channels).execute().await?;
            print_json(&here_now.data)
        }
        Command::Time => {
            let time = client.time().execute().await?;
            println!("{}", time.data);
            Ok(())
        }
        Command::Listen { channels, presence } => listen(client, &channels, presence).await,
    }
}

/// Subscribe and print every event until Ctrl-C or a failed poll.
async fn listen(client: &PulseClient, channels: &[String], presence: bool) -> Result<()> {
    let mut listener = client.new_listener();
    client.add_listener(&listener);

    let mut subscriber = client.subscriber(channels.iter().cloned(), Vec::<String>::new());
    if presence {
        subscriber = subscriber.with_presence();
    }

    let cancel = client.shutdown_token();
    let mut poller = {
        let cancel = cancel.clone();
        tokio::spawn(async move { subscriber.run(cancel).await })
    };

    let printer = async {
        loop {
            tokio::select! {
                Some(status) = listener.status.recv() => print_json(status.as_ref())?,
                Some(message) = listener.message.recv() => print_json(message.as_ref())?,
                Some(signal) = listener.signal.recv() => print_json(signal.as_ref())?,
                Some(event) = listener.presence.recv() => print_json(event.as_ref())?,
                Some(event) = listener.user_event.recv() => print_json(event.as_ref())?,
                Some(event) = listener.space_event.recv() => print_json(event.as_ref())?,
                Some(event) = listener.membership_event.recv() => print_json(event.as_ref())?,
                Some(event) = listener.message_action_event.recv() => print_json(event.as_ref())?,
                else => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    };

    tokio::select! {
        result = printer => result?,
        result = &mut poller => {
            return Ok(result.context("Subscription task panicked")??);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, unsubscribing");
            cancel.cancel();
        }
    }

    poller.await.context("Subscription task panicked")??;
    Ok(())
}
