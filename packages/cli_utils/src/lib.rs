#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the OSM document toolchain.
//!
//! Provides an `indicatif`-backed progress bar behind the
//! [`ProgressCallback`] trait, plus [`init_logger`] which sets up
//! `indicatif-log-bridge` so that `log::info!` and friends are suspended
//! while progress bars redraw.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use osm_docs_normalize::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once `set_total()` provides a known length.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Creates a progress indicator for bytes of input consumed.
    ///
    /// Starts as a spinner showing bytes read (compressed input and stdin
    /// have no known length) and transitions to a full bar with
    /// percentage/ETA once [`ProgressCallback::set_total()`] is called,
    /// immediately when `total` is given.
    #[must_use]
    pub fn bytes_bar(
        multi: &MultiProgress,
        message: &str,
        total: Option<u64>,
    ) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} {bytes} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {bytes}/{total_bytes} {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        let progress = Self { bar, bar_style };
        if let Some(total) = total {
            progress.set_total(total);
        }
        Arc::new(progress)
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_style(self.bar_style.clone());
    }

    fn set_position(&self, pos: u64) {
        // The file may grow while it is read.
        if self.bar.length().is_some_and(|len| pos > len) {
            self.bar.set_length(pos);
        }
        self.bar.set_position(pos);
    }

    fn finish(&self, msg: String) {
        self.bar.disable_steady_tick();
        self.bar.finish_with_message(msg);
    }
}

/// Log filter used when `RUST_LOG` is unset: this toolchain at `info`,
/// dependencies at `warn`.
pub const DEFAULT_LOG_FILTER: &str = "warn,osm_docs=info";

/// Installs `pretty_env_logger` behind an `indicatif-log-bridge` wrapper and
/// returns the [`MultiProgress`] every progress bar must join, so log lines
/// are printed above the bars instead of through them.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. Only the first call installs
/// a logger; later calls just hand out a fresh [`MultiProgress`].
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

    let logger = pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .build();
    let max_level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(max_level);
    }

    multi
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressDrawTarget;

    use super::*;

    fn hidden_progress() -> (ProgressBar, IndicatifProgress) {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());
        let progress = IndicatifProgress {
            bar: bar.clone(),
            bar_style: ProgressStyle::default_bar(),
        };
        (bar, progress)
    }

    #[test]
    fn switches_to_bar_once_total_is_known() {
        let (bar, progress) = hidden_progress();

        progress.set_position(100);
        assert_eq!(bar.length(), None);

        progress.set_total(1_000);
        progress.set_position(500);
        assert_eq!(bar.length(), Some(1_000));
        assert_eq!(bar.position(), 500);

        progress.finish("done".to_string());
        assert!(bar.is_finished());
    }

    #[test]
    fn grows_length_when_position_overshoots() {
        let (bar, progress) = hidden_progress();

        progress.set_total(100);
        progress.set_position(120);
        assert_eq!(bar.length(), Some(120));
        assert_eq!(bar.position(), 120);
    }

    #[test]
    fn default_filter_enables_toolchain_info() {
        let logger = pretty_env_logger::formatted_builder()
            .parse_filters(DEFAULT_LOG_FILTER)
            .build();
        assert_eq!(logger.filter(), log::LevelFilter::Info);
    }

    #[test]
    fn init_logger_can_run_twice() {
        let _ = init_logger();
        let _ = init_logger();
        log::info!("logger initialized");
    }
}
