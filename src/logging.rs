// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Logging initialization
//!
//! Host shells call [`init_logging`] once at startup. Log output goes to a
//! rolling file under ~/.kube/kube_shell/log/ so warnings never corrupt the
//! interactive prompt. Setup failures degrade to stderr notices; they never
//! prevent the session from starting.

use tracing_subscriber::prelude::*;

use crate::config;

/// Initialize logging with rolling file output.
///
/// - Max 10MB per file, keep up to 5 files, also rotate daily
/// - Filter defaults to this crate at info (debug when `verbose`), overridable
///   via `RUST_LOG`
pub fn init_logging(verbose: bool) {
    use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
    use tracing_subscriber::fmt::format::FmtSpan;

    let log_dir = match config::log_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Warning: Could not determine log directory: {}", e);
            return;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        return;
    }

    let log_path = log_dir.join("kube_shell.log");
    let condition = RollingConditionBase::new()
        .daily()
        .max_size(10 * 1024 * 1024); // 10MB

    let file_appender = match RollingFileAppenderBase::new(log_path, condition, 5) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {}", e);
            return;
        }
    };

    // Non-blocking writer; leak the guard to keep the background writer alive
    let (non_blocking, _guard) = file_appender.get_non_blocking_appender();
    std::mem::forget(_guard);

    let filter = if verbose {
        "kube_shell_cache=debug"
    } else {
        "kube_shell_cache=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE);

    // try_init: the host may have installed its own subscriber already
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init();
}
