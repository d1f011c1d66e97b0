//=====================================================
// File: logging.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tracing setup for the bridge binary and embedders
// Objective: Install one compact fmt subscriber with a configurable filter
//=====================================================

use std::sync::OnceLock;

use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize tracing with a component label. `RUST_LOG` wins over `filter`.
pub fn init(component: &str, filter: &str) {
    INIT.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
        let _ = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_names(true)
            .compact()
            .try_init();
    });
    tracing::info!(component, "tracing initialised");
}

//=====================================================
// End of file
//=====================================================
