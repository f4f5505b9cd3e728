mod demo;

use std::sync::{Arc, Mutex};

use tinyroute::config::Config;
use tinyroute::{logger, Cycle, Server, ServerOptions};
use tokio::time::MissedTickBehavior;

use demo::led::LedStrip;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config_path = "config".to_string();
    let mut print_config = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--print-config" => print_config = true,
            path => config_path = path.to_string(),
        }
    }

    let cfg = Config::load_from(&config_path)?;
    if print_config {
        print!("{}", cfg.to_toml()?);
        return Ok(());
    }
    logger::init(&cfg)?;

    // One connection at a time; a single thread drives everything
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(cfg))
}

async fn run(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let strip = Arc::new(Mutex::new(LedStrip::load(
        cfg.demo.led_count,
        cfg.demo.state_file.as_deref(),
    )));
    let routes = demo::routes(&cfg.demo, &strip)?;

    let addr = cfg.get_socket_addr()?;
    let mut server = Server::bind(addr, cfg.server.backlog, ServerOptions::from(&cfg))?;
    logger::log_server_start(&addr, &cfg, &routes.rules().collect::<Vec<_>>());

    let mut ticker = tokio::time::interval(cfg.cycle_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut responses: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Ok(mut strip) = strip.lock() {
                    strip.animate();
                }
                match server.serve_once(&routes) {
                    Ok(Cycle::Served { .. } | Cycle::HandlerFailed { .. } | Cycle::Rejected { .. }) => {
                        responses += 1;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        logger::log_error(&e.to_string());
                        return Err(e.into());
                    }
                }
            }
            _ = &mut shutdown => {
                logger::log_shutdown(responses);
                return Ok(());
            }
        }
    }
}
