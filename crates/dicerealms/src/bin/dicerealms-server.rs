// CLI entry point for the DiceRealms server.
//
// Usage:
//   dicerealms-server [OPTIONS]
//     --host <HOST>               Bind address (default: 127.0.0.1)
//     --port <PORT>               Listen port (default: 8765)
//     --delay-ms <MS>             Pause before each action result (default: 2000)
//     --idle-timeout-secs <SECS>  Close silent connections after this long (default: 300)
//     --world <PATH>              Load the world from a JSON file
//
// Log verbosity follows RUST_LOG (default: info).

use std::time::Duration;

use dicerealms::prelude::*;

struct Args {
    host: String,
    port: u16,
    config: ServerConfig,
    world_path: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let args = parse_args();
    if let Err(e) = serve(args).await {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

async fn serve(args: Args) -> Result<(), DiceRealmsError> {
    let mut builder = DiceRealmsServer::builder()
        .config(args.config)
        .bind(&format!("{}:{}", args.host, args.port));

    if let Some(path) = args.world_path {
        let json = std::fs::read_to_string(&path)?;
        let world = World::from_json(&json)?;
        tracing::info!(%path, title = world.title(), "loaded world");
        builder = builder.world(world);
    }

    let server = builder.build().await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}

/// Parse command-line arguments. Plain `std::env::args()` matching.
fn parse_args() -> Args {
    let mut parsed = Args {
        host: "127.0.0.1".to_string(),
        port: 8765,
        config: ServerConfig::default(),
        world_path: None,
    };
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                i += 1;
                parsed.host = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--host requires a value");
                    std::process::exit(1);
                });
            }
            "--port" => {
                i += 1;
                parsed.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--delay-ms" => {
                i += 1;
                let ms: u64 = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--delay-ms requires a number of milliseconds");
                    std::process::exit(1);
                });
                parsed.config.pipeline.action_delay = Duration::from_millis(ms);
            }
            "--idle-timeout-secs" => {
                i += 1;
                let secs: u64 =
                    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                        eprintln!("--idle-timeout-secs requires a number of seconds");
                        std::process::exit(1);
                    });
                parsed.config.idle_timeout = Duration::from_secs(secs);
            }
            "--world" => {
                i += 1;
                parsed.world_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--world requires a path");
                    std::process::exit(1);
                }));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_usage() {
    println!("Usage: dicerealms-server [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --host <HOST>               Bind address (default: 127.0.0.1)");
    println!("  --port <PORT>               Listen port (default: 8765)");
    println!("  --delay-ms <MS>             Pause before each action result (default: 2000)");
    println!("  --idle-timeout-secs <SECS>  Close silent connections (default: 300)");
    println!("  --world <PATH>              Load the world from a JSON file");
    println!("  --help, -h                  Show this help");
}
