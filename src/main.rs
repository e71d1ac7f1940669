use muxhttpd::config::Config;
use muxhttpd::http::router::Router;
use muxhttpd::http::service::HttpService;
use muxhttpd::server::Server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let service = HttpService::new(Router::new(cfg.root.clone()));
    let mut server = Server::bind(&cfg, service)?;

    tokio::select! {
        res = server.run() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
