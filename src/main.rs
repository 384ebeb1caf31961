//! respline - A Composable Middleware Pipeline for RESP Servers
//!
//! Main entry point: parses flags, composes the pipeline once, and
//! accepts connections until shutdown.

use respline::commands::{build_pipeline, RedisContext};
use respline::config::ServerOptions;
use respline::connection::{handle_connection, ConnectionStats};
use respline::pipeline::Next;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Password clients must present via AUTH (unset: no authentication)
    requirepass: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: respline::DEFAULT_HOST.to_string(),
            port: respline::DEFAULT_PORT,
            requirepass: None,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--requirepass" => {
                    if i + 1 < args.len() {
                        config.requirepass = Some(args[i + 1].clone());
                        i += 2;
                    } else {
                        eprintln!("Error: --requirepass requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("respline version {}", respline::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
respline - A Composable Middleware Pipeline for RESP Servers

USAGE:
    respline [OPTIONS]

OPTIONS:
    -h, --host <HOST>            Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>            Port to listen on (default: 6379)
        --requirepass <PASS>     Require AUTH with this password
    -v, --version                Print version information
        --help                   Print this help message

EXAMPLES:
    respline                               # Start on 127.0.0.1:6379
    respline --port 6380                   # Start on port 6380
    respline --requirepass secret          # Clients must AUTH first

CONNECTING:
    Use redis-cli or any Redis client to connect:
    $ redis-cli -p 6379
    127.0.0.1:6379> PING
    PONG
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
respline v{} - Composable Middleware Pipeline for RESP Servers
──────────────────────────────────────────────────────────────
Server started on {}
Authentication: {}

Use Ctrl+C to shutdown gracefully.
"#,
        respline::VERSION,
        config.bind_address(),
        if config.requirepass.is_some() {
            "required"
        } else {
            "disabled"
        }
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner(&config);

    // Runtime options shared by the gate and the CONFIG handler
    let options = Arc::new(match &config.requirepass {
        Some(password) => ServerOptions::with_requirepass(password.clone()),
        None => ServerOptions::new(),
    });

    // Compose the pipeline once; every connection shares it
    let pipeline = build_pipeline(Arc::clone(&options));
    info!("Pipeline composed: auth gate + 6 command handlers");

    // Connection statistics
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, pipeline, stats) => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    pipeline: Next<RedisContext>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let pipeline = Arc::clone(&pipeline);
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, pipeline, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
