use clap::Parser;
use smtpsink::{ServerConfig, SmtpServer};
use std::time::Duration;
use tracing::{error, info};

/// In-memory SMTP server that never delivers anything
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on. Empty binds port 25 on all interfaces, `:PORT` binds PORT.
    #[arg(long, default_value = "")]
    listen: String,

    /// Hostname announced in the greeting and HELO/EHLO replies
    #[arg(long, default_value = "localhost")]
    hostname: String,
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let config = ServerConfig::new(&cli.listen, &cli.hostname);

    let server = match SmtpServer::start(&config) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    let mut seen = 0;
    loop {
        let emails = server.store().wait_for(seen + 1, Duration::from_secs(60));
        for email in &emails[seen..] {
            info!(
                "Received email #{} from: {} to: {:?}",
                seen + 1,
                email.from,
                email.to
            );
            seen += 1;
        }
    }
}
