//! LED controller application
//!
//! Endpoints:
//! - `/`             index page from the static directory
//! - `/status`       current settings
//! - `/mode/<mode>`  switch animation (`solid`, `rainbow`, `cylon`, `confetti`)
//! - `/on`, `/off`   solid white / dark
//! - `/set?rgb=FF2288` change the color
//! - `/*`            any other file under the static directory

pub mod led;

use std::sync::{Arc, Mutex, MutexGuard};

use tinyroute::config::DemoConfig;
use tinyroute::handler::StaticFiles;
use tinyroute::{HandlerError, HandlerResult, Response, RouteError, RouteTable};

use led::{LedStrip, Mode};

pub type SharedStrip = Arc<Mutex<LedStrip>>;

/// Build the application's route table
pub fn routes(config: &DemoConfig, strip: &SharedStrip) -> Result<RouteTable, RouteError> {
    let mut table = RouteTable::new();
    let files = StaticFiles::new(&config.static_dir);
    let state_file = config.state_file.clone();

    table.register_handler("/", files.clone())?;

    let s = Arc::clone(strip);
    table.register("/status", move |_, _| report(&*lock(&s)?))?;

    let s = Arc::clone(strip);
    let saved = state_file.clone();
    table.register("/mode/<mode>", move |_, params| {
        let mode: Mode = params
            .get("mode")
            .unwrap_or_default()
            .parse()
            .map_err(|e: String| HandlerError::with_status(400, e))?;
        let mut strip = lock(&s)?;
        strip.set_mode(mode);
        persist(&strip, saved.as_deref());
        report(&strip)
    })?;

    let s = Arc::clone(strip);
    let saved = state_file.clone();
    table.register("/on", move |_, _| {
        let mut strip = lock(&s)?;
        strip.turn_on();
        persist(&strip, saved.as_deref());
        report(&strip)
    })?;

    let s = Arc::clone(strip);
    let saved = state_file.clone();
    table.register("/off", move |_, _| {
        let mut strip = lock(&s)?;
        strip.turn_off();
        persist(&strip, saved.as_deref());
        report(&strip)
    })?;

    let s = Arc::clone(strip);
    let saved = state_file;
    table.register("/set", move |req, _| {
        let mut strip = lock(&s)?;
        strip.set_color(req.param("rgb"));
        persist(&strip, saved.as_deref());
        report(&strip)
    })?;

    table.register_handler("/*", files)?;
    Ok(table)
}

fn lock(strip: &SharedStrip) -> Result<MutexGuard<'_, LedStrip>, HandlerError> {
    strip
        .lock()
        .map_err(|_| HandlerError::new("LED state lock poisoned"))
}

fn report(strip: &LedStrip) -> HandlerResult {
    Ok(Response::json(&strip.report())?)
}

fn persist(strip: &LedStrip, path: Option<&str>) {
    if let Some(path) = path {
        if let Err(e) = strip.save(path) {
            tinyroute::logger::log_warning(&format!("Failed to save LED state to {path}: {e}"));
        }
    }
}
