use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Arg, ArgAction, Command};
use tokio::sync::Notify;

use relaycast::config::{SessionOptions, TransportConfig};
use relaycast::pipeline::PacerState;
use relaycast::session::SessionCoordinator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let matches = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("Media file to stream.")
                .required(true),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Receiver address, e.g. udp://192.168.1.20:9000."),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Transport configuration as JSON; --url overrides its target."),
        )
        .arg(
            Arg::new("loop")
                .short('l')
                .long("loop")
                .action(ArgAction::SetTrue)
                .help("Restart from the beginning when the file ends."),
        )
        .arg(
            Arg::new("start")
                .short('s')
                .long("start")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(f64))
                .default_value("0")
                .help("Position to start streaming from."),
        )
        .arg(
            Arg::new("latency")
                .long("latency")
                .value_name("MS")
                .value_parser(clap::value_parser!(u32))
                .help("Transport latency budget in milliseconds."),
        )
        .arg(
            Arg::new("no-pacing")
                .long("no-pacing")
                .action(ArgAction::SetTrue)
                .help("Send as fast as the transport accepts instead of realtime pacing."),
        )
        .get_matches();

    let mut transport = match matches.get_one::<String>("config") {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading transport config {path}"))?;
            serde_json::from_str::<TransportConfig>(&raw)
                .with_context(|| format!("parsing transport config {path}"))?
        }
        None => TransportConfig::default(),
    };
    if let Some(url) = matches.get_one::<String>("url") {
        transport.target = url.clone();
    }
    if transport.target.is_empty() {
        bail!("no receiver target: pass --url or a config file with one");
    }
    if let Some(latency) = matches.get_one::<u32>("latency") {
        transport.latency_ms = *latency;
    }

    let options = SessionOptions {
        looping: matches.get_flag("loop"),
        start_time: *matches
            .get_one::<f64>("start")
            .unwrap_or(&0.0),
        realtime: !matches.get_flag("no-pacing"),
    };

    let input = matches
        .get_one::<String>("input")
        .cloned()
        .unwrap_or_default();

    let session = Arc::new(SessionCoordinator::new(transport, options));
    session.load_file(&input).await?;
    session.start_streaming().await?;

    // periodic progress to the log
    let mut progress_rx = session.progress();
    tokio::spawn(async move {
        while progress_rx.changed().await.is_ok() {
            let progress = *progress_rx.borrow();
            log::info!(
                "streaming: {} frames sent, position {:.1}s ({:.0}%), play-through {}",
                progress.frames_sent,
                progress.position_secs,
                progress.fraction * 100.0,
                progress.playthroughs + 1,
            );
        }
    });

    // gracefully stop on SIGINT, SIGTERM, or SIGHUP
    let stop = Arc::new(Notify::new());
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.notify_one())
            .context("setting signal handler")?;
    }

    let final_state = tokio::select! {
        _ = stop.notified() => {
            log::info!("interrupted, stopping stream");
            session.stop_streaming().await;
            PacerState::Stopped
        }
        _ = session.wait_until_stopped() => *session.state().borrow(),
    };

    log::info!("{}", session.health().summary());
    session.stop_streaming().await;

    if final_state == PacerState::Error {
        bail!("streaming ended with an error, see the log above");
    }
    Ok(())
}
