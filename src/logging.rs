// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::io;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "SHOPDESK_LOG";

/// Install the stderr subscriber. `SHOPDESK_LOG` wins over `RUST_LOG`;
/// stdout is left alone for tables and JSON.
pub fn init(verbose: bool) {
    let default = if verbose { "shopdesk=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(io::stderr)
        .try_init();
}
