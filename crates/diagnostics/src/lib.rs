// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logging shared by the hdx crates
//!
//! Output goes to stderr through `emit_term`. The `HDX_LOG` environment
//! variable picks the minimum level: `off` (default), `error`, `warn`,
//! `info` or `debug`.

use std::sync::Once;

pub use emit;

static INIT: Once = Once::new();

const LOG_VARIABLE: &str = "HDX_LOG";

fn level_from(value: &str) -> Option<Option<emit::Level>> {
    match value.to_ascii_lowercase().as_str() {
        "off" | "" => Some(None),
        "error" => Some(Some(emit::Level::Error)),
        "warn" => Some(Some(emit::Level::Warn)),
        "info" => Some(Some(emit::Level::Info)),
        "debug" => Some(Some(emit::Level::Debug)),
        _ => None,
    }
}

/// Install the stderr emitter once, at the level named by `HDX_LOG`.
/// Later calls do nothing.
pub fn init() {
    INIT.call_once(|| {
        let requested = std::env::var(LOG_VARIABLE).unwrap_or_default();
        let (level, unknown) = match level_from(&requested) {
            Some(None) => return,
            Some(Some(level)) => (level, false),
            None => (emit::Level::Info, true),
        };
        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();
        if unknown {
            emit::warn!("Unknown {variable} value {requested}, using info", variable: LOG_VARIABLE);
        }
        // Runtime lives for the rest of the process
        std::mem::forget(rt);
    });
}

pub use emit::{debug, error, info, warn};
