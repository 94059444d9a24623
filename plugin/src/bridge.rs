//! JSON-lines event loop between the control surface and the plugin

use log::{debug, error, info, warn};
use proxy_toggle_core::{ProxyTogglePlugin, Result, SurfaceEvent};
use std::io::{self, BufRead};
use std::thread::JoinHandle;

/// Feed every event line from `input` to the plugin until EOF.
///
/// Lines that are not valid UTF-8 or not a known JSON event are logged and
/// skipped. Toggle workers still running when input ends, or fails, are
/// joined so their final commands reach the surface. Returns the number of
/// events dispatched.
pub fn serve<R: BufRead>(plugin: &ProxyTogglePlugin, mut input: R) -> Result<usize> {
    let mut workers: Vec<JoinHandle<()>> = Vec::new();
    let mut dispatched = 0;
    let mut buf = Vec::new();

    let outcome = loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break Ok(dispatched),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("failed to read from surface: {}", e);
                break Err(e.into());
            }
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!("ignoring event line that is not UTF-8: {}", e);
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let event: SurfaceEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!("ignoring malformed event: {}", e);
                continue;
            }
        };
        debug!("<- {:?}", event);

        if let Some(worker) = plugin.handle_event(event) {
            workers.push(worker);
        }
        workers.retain(|w| !w.is_finished());
        dispatched += 1;
    };

    info!("surface closed after {} events", dispatched);
    for worker in workers {
        if worker.join().is_err() {
            warn!("toggle worker panicked");
        }
    }
    outcome
}
