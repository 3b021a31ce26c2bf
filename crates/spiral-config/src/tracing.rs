// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const CHROME_TRACE_VAR: &str = "SPIRAL_TRACE_CHROME";

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Keeps the Chrome trace writer alive. The trace file is completed when the
/// guard is dropped, so hold it for as long as spans should be recorded.
#[must_use = "dropping the guard closes the Chrome trace file"]
pub struct TracingGuard {
    chrome: Option<tracing_chrome::FlushGuard>,
}

impl TracingGuard {
    /// Whether spans are also being written to a Chrome trace file.
    pub fn writes_chrome_trace(&self) -> bool {
        self.chrome.is_some()
    }
}

/// Installs the global subscriber.
///
/// Filtering follows `RUST_LOG` and defaults to `info`. When
/// `SPIRAL_TRACE_CHROME` names a file, spans are also written there in the
/// Chrome trace format, which is handy for profiling long kernel computations.
pub fn init_tracing() -> Result<TracingGuard, InitError> {
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stdout().is_terminal());

    let (chrome_layer, chrome) = match chrome_trace_path()? {
        Some(path) => {
            let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file(path)
                .include_args(true)
                .build();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(chrome_layer)
        .init();
    Ok(TracingGuard { chrome })
}

fn chrome_trace_path() -> Result<Option<PathBuf>, InitError> {
    match std::env::var(CHROME_TRACE_VAR) {
        Ok(raw) if !raw.trim().is_empty() => Ok(Some(PathBuf::from(raw))),
        Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(InitError::Env(err)),
    }
}

/// Errors emitted when configuring the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to read SPIRAL_TRACE_CHROME: {0}")]
    Env(std::env::VarError),
}
