//! # Progress Tracking Module
//!
//! Questo modulo stima l'avanzamento del batch e lo rende visibile all'utente.
//!
//! ## Responsabilità:
//! - `ProgressEstimator`: percentuale, velocità, tempo residuo e orario di fine
//!   stimato a partire dal tempo trascorso
//! - Throttling: al massimo un aggiornamento per intervallo minimo
//! - `ProgressSink`: rendering intercambiabile del report
//!
//! ## Stati:
//! - **idle**: prima del primo `update` (il tempo di partenza non è ancora fissato)
//! - **running**: dopo il primo `update`; la chiamata con `current == total` emette
//!   il report finale, chiude la riga e rende silenziose le chiamate successive
//!
//! ## Calcoli:
//! - `percent = current / total`
//! - `speed = current / elapsed` (0 se elapsed è 0)
//! - `remaining = elapsed * (1 - p) / p` (saltato se `current == 0`)
//! - `eta = now + remaining`
//!
//! ## Rendering:
//! - `BarSink`: barra `indicatif` sovrascritta sul posto
//! - `LogSink`: un record `tracing` strutturato per intervallo
//! - `JsonSink`: un evento JSON `progress` su stdout
//!
//! ## Visual feedback:
//! ```text
//! [████████████░░░░░░░░] converting :  42.000 %   42 / 100  speed:12.3/s  remaining:4.7s  eta:2024-05-01 10:42:17
//! ```
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut progress = ProgressEstimator::new(total, sink_for(ProgressMode::Bar, total));
//! for (i, task) in tasks.iter().enumerate() {
//!     progress.update(i as u64);
//!     // ...
//! }
//! progress.update(total.get());
//! ```

use crate::config::ProgressMode;
use crate::json_output::JsonMessage;
use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use std::num::NonZeroU64;
use std::time::{Duration, Instant};
use tracing::info;

/// Label shown in front of every progress line
pub const LABEL: &str = "converting";

/// Format of the predicted completion time
pub const ETA_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rate-derived fields, only available once at least one unit is done
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    pub elapsed: Duration,
    /// Units per second
    pub speed: f64,
    /// Estimated seconds left
    pub remaining_secs: f64,
    /// Predicted wall-clock completion time, None if out of the calendar range
    pub eta: Option<DateTime<Local>>,
}

impl Timing {
    pub fn eta_string(&self) -> String {
        match self.eta {
            Some(eta) => eta.format(ETA_FORMAT).to_string(),
            None => "-".to_string(),
        }
    }
}

/// One progress emission
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub label: String,
    pub current: u64,
    pub total: u64,
    /// Completion in percent (0-100)
    pub percent: f64,
    /// None in degraded mode (no units done yet, or verbose output disabled)
    pub timing: Option<Timing>,
}

impl ProgressReport {
    pub fn compute(
        label: &str,
        current: u64,
        total: NonZeroU64,
        elapsed: Duration,
        wall_now: DateTime<Local>,
        verbose: bool,
    ) -> Self {
        let total = total.get();
        let fraction = current as f64 / total as f64;

        let timing = if verbose && current > 0 {
            let elapsed_secs = elapsed.as_secs_f64();
            let speed = if elapsed_secs == 0.0 {
                0.0
            } else {
                current as f64 / elapsed_secs
            };
            let remaining_secs = elapsed_secs * (1.0 - fraction) / fraction;
            let eta = Duration::try_from_secs_f64(remaining_secs)
                .ok()
                .and_then(|d| chrono::Duration::from_std(d).ok())
                .and_then(|d| wall_now.checked_add_signed(d));
            Some(Timing {
                elapsed,
                speed,
                remaining_secs,
                eta,
            })
        } else {
            None
        };

        Self {
            label: label.to_string(),
            current,
            total,
            percent: fraction * 100.0,
            timing,
        }
    }

    /// Single-line status text
    pub fn render(&self) -> String {
        let mut line = format!(
            "{} : {:>7.3} %   {} / {}",
            self.label, self.percent, self.current, self.total
        );
        if let Some(ref timing) = self.timing {
            line.push_str(&format!(
                "  speed:{:.1}/s  remaining:{:.1}s  eta:{}",
                timing.speed,
                timing.remaining_secs,
                timing.eta_string()
            ));
        }
        line
    }
}

/// Receives throttled progress reports. Rendering must never fail the batch.
pub trait ProgressSink {
    fn emit(&mut self, report: &ProgressReport);

    /// Terminal report; the sink ends its line here.
    fn finish(&mut self, report: &ProgressReport);

    /// Run `f` with the sink's output cleared from the terminal, so other
    /// writers on the same stream do not garble it.
    fn suspend(&self, f: &mut dyn FnMut()) {
        f()
    }
}

/// Progress estimator for a fixed number of work units
pub struct ProgressEstimator {
    total_units: NonZeroU64,
    min_interval: Duration,
    verbose: bool,
    started_at: Option<Instant>,
    last_emit: Option<Instant>,
    finished: bool,
    sink: Box<dyn ProgressSink>,
}

impl ProgressEstimator {
    pub fn new(total_units: NonZeroU64, sink: Box<dyn ProgressSink>) -> Self {
        Self {
            total_units,
            min_interval: Duration::from_millis(10),
            verbose: true,
            started_at: None,
            last_emit: None,
            finished: false,
            sink,
        }
    }

    pub fn with_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// Disabling verbose output drops speed and ETA from every report.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Run `f` (typically a log record) without the progress output in the way
    pub fn suspend(&self, mut f: impl FnMut()) {
        self.sink.suspend(&mut f);
    }

    /// Record that `current` units are done
    pub fn update(&mut self, current: u64) {
        self.update_at(current, Instant::now(), Local::now());
    }

    fn update_at(&mut self, current: u64, now: Instant, wall_now: DateTime<Local>) {
        if self.finished {
            return;
        }

        let started_at = *self.started_at.get_or_insert(now);
        let current = current.min(self.total_units.get());
        let terminal = current == self.total_units.get();

        let due = match self.last_emit {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.min_interval,
        };
        if !due && !terminal {
            return;
        }

        let report = ProgressReport::compute(
            LABEL,
            current,
            self.total_units,
            now.saturating_duration_since(started_at),
            wall_now,
            self.verbose,
        );

        if terminal {
            self.sink.finish(&report);
            self.finished = true;
        } else {
            self.sink.emit(&report);
        }

        self.last_emit = Some(match self.last_emit {
            Some(last) if last > now => last,
            _ => now,
        });
    }
}

/// Build the sink for a progress mode
pub fn sink_for(mode: ProgressMode, total: NonZeroU64) -> Box<dyn ProgressSink> {
    match mode {
        ProgressMode::Bar => Box::new(BarSink::new(total.get())),
        ProgressMode::Log => Box::new(LogSink),
        ProgressMode::Json => Box::new(JsonSink),
    }
}

/// Self-overwriting progress bar on stderr
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    pub fn new(total: u64) -> Self {
        Self::with_bar(ProgressBar::new(total))
    }

    /// Bar that draws nothing
    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total);
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressSink for BarSink {
    fn emit(&mut self, report: &ProgressReport) {
        self.bar.set_position(report.current);
        self.bar.set_message(report.render());
    }

    fn finish(&mut self, report: &ProgressReport) {
        self.bar.set_position(report.current);
        self.bar.finish_with_message(report.render());
    }

    fn suspend(&self, f: &mut dyn FnMut()) {
        self.bar.suspend(|| f());
    }
}

/// One structured log record per emission
pub struct LogSink;

impl LogSink {
    fn record(report: &ProgressReport) {
        match report.timing {
            Some(ref timing) => info!(
                current = report.current,
                total = report.total,
                percent = report.percent,
                speed = timing.speed,
                remaining_secs = timing.remaining_secs,
                eta = %timing.eta_string(),
                "{}", report.label
            ),
            None => info!(
                current = report.current,
                total = report.total,
                percent = report.percent,
                "{}", report.label
            ),
        }
    }
}

impl ProgressSink for LogSink {
    fn emit(&mut self, report: &ProgressReport) {
        Self::record(report);
    }

    fn finish(&mut self, report: &ProgressReport) {
        Self::record(report);
    }
}

/// JSON `progress` events on stdout
pub struct JsonSink;

impl ProgressSink for JsonSink {
    fn emit(&mut self, report: &ProgressReport) {
        JsonMessage::progress(report).emit();
    }

    fn finish(&mut self, report: &ProgressReport) {
        JsonMessage::progress(report).emit();
    }
}
