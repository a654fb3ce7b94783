//=============================================
// nekoscript/logging.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tracing helpers shared by the CLI and embedders
// Objective: Offer a consistent subscriber configuration with component labels
//=============================================

use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize tracing once per process. `RUST_LOG` overrides the default
/// `warn` level; `verbose` raises it to `debug`.
pub fn init(component: &str, verbose: bool) {
    INIT.get_or_init(|| {
        let level = if verbose { Level::DEBUG } else { Level::WARN };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));
        SubscriberBuilder::default()
            .with_env_filter(filter)
            .with_target(verbose)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    });
    tracing::debug!(component, "tracing initialised");
}

//=============================================
// End of file
//=============================================
