//! Echo messages over an encrypted stream.
//!
//! # Usage
//!
//! ## Server
//!
//! Accepts connections on the given port and echoes every message back to its sender:
//!
//! ```sh
//! cargo run --release --bin sealstream-echo -- --listen 8080
//! ```
//!
//! ## Client
//!
//! Dials the server on `localhost`, sends a message and prints the reply:
//!
//! ```sh
//! cargo run --release --bin sealstream-echo -- 8080 "hello world"
//! ```

use clap::{value_parser, Arg, ArgAction, Command};
use sealstream::{
    connection::{self, connect, serve},
    transport::{tokio::Network, Network as _},
    Closer as _, Reader as _, Writer as _,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::{error, info, Level};

fn main() {
    // Parse arguments
    let matches = Command::new("sealstream-echo")
        .about("echo messages over an encrypted stream")
        .arg(
            Arg::new("listen")
                .short('l')
                .long("listen")
                .value_parser(value_parser!(u16))
                .conflicts_with_all(["port", "message"])
                .help("Listen mode. Port to accept connections on"),
        )
        .arg(
            Arg::new("max-exchanges")
                .long("max-exchanges")
                .value_parser(value_parser!(usize))
                .requires("listen")
                .help("Close each connection after echoing this many messages"),
        )
        .arg(
            Arg::new("port")
                .value_parser(value_parser!(u16))
                .required_unless_present("listen")
                .help("Port of the server to dial"),
        )
        .arg(
            Arg::new("message")
                .required_unless_present("listen")
                .help("Message to send"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .get_matches();

    // Create logger
    let level = if matches.get_flag("verbose") {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    // Initialize runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");
    let network = Network::default();

    // Run server
    if let Some(port) = matches.get_one::<u16>("listen").copied() {
        let config = connection::Config {
            max_exchanges: matches.get_one::<usize>("max-exchanges").copied(),
            ..Default::default()
        };
        let socket = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        runtime.block_on(async move {
            let listener = network.bind(socket).await.expect("Failed to bind");
            if let Err(err) = serve(listener, config).await {
                error!(?err, "server stopped");
                std::process::exit(1);
            }
        });
        return;
    }

    // Run client
    let port = *matches.get_one::<u16>("port").expect("Please provide port");
    let message = matches
        .get_one::<String>("message")
        .expect("Please provide message")
        .clone();
    let socket = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    runtime.block_on(async move {
        let config = sealstream::Config::default();
        let mut channel = connect(&network, socket, &config)
            .await
            .expect("Failed to connect");
        info!(%socket, "connected");

        channel
            .write(message.as_bytes())
            .await
            .expect("Failed to send message");
        let mut buf = vec![0u8; message.len()];
        let n = channel.read(&mut buf).await.expect("Failed to read reply");
        println!("{}", String::from_utf8_lossy(&buf[..n]));

        if let Err(err) = channel.close().await {
            error!(?err, "failed to close channel");
        }
    });
}
