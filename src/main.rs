mod demo;

use talon::config::Config;
use talon::server::Server;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load();
    let key = std::env::var("TALON_KEY").unwrap_or_default().into_bytes();

    let handler = demo::DemoHandler::new(cfg.max_request_header_bytes, key);
    let mut server = Server::bind(&cfg.listen_addr, handler)?;
    server.run()
}
