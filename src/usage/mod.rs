//! Usage and context-window monitoring.
//!
//! Usage totals are owned by the host and replaced wholesale whenever it
//! reports them. Context figures are recomputed into a percentage and a
//! band; entering the critical band means the host is about to compact.

use tracing::{debug, info};

use crate::channel::protocol::{CompactionReport, ContextFigures, Totals};
use crate::util::{format_cost, format_tokens};

/// Cumulative usage reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageStats {
    pub total_cost: f64,
    pub total_tokens_input: u64,
    pub total_tokens_output: u64,
    pub request_count: u64,
}

impl UsageStats {
    /// Input plus output tokens.
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.total_tokens_input
            .saturating_add(self.total_tokens_output)
    }

    /// Short summary, e.g. `12,345 tokens · $0.0123`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} tokens · {}",
            format_tokens(self.total_tokens()),
            format_cost(self.total_cost)
        )
    }
}

impl From<Totals> for UsageStats {
    fn from(totals: Totals) -> Self {
        Self {
            total_cost: totals.total_cost,
            total_tokens_input: totals.total_tokens_input,
            total_tokens_output: totals.total_tokens_output,
            request_count: totals.request_count,
        }
    }
}

/// Context window pressure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContextBand {
    #[default]
    Healthy,
    Warning,
    Critical,
}

impl std::fmt::Display for ContextBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Context window figures with derived pressure flags.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContextStats {
    pub total_tokens: u64,
    pub max_tokens: u64,
    /// Always within `0.0..=100.0`.
    pub usage_percent: f64,
    pub is_warning: bool,
    pub needs_compression: bool,
}

impl ContextStats {
    /// Computes stats from raw figures and the band thresholds.
    ///
    /// An unknown window size (`max_tokens == 0`) counts as 0 %.
    #[must_use]
    pub fn compute(figures: ContextFigures, warning_percent: f64, critical_percent: f64) -> Self {
        let usage_percent = if figures.max_tokens == 0 {
            0.0
        } else {
            (figures.total_tokens as f64 / figures.max_tokens as f64 * 100.0).clamp(0.0, 100.0)
        };

        Self {
            total_tokens: figures.total_tokens,
            max_tokens: figures.max_tokens,
            usage_percent,
            is_warning: usage_percent >= warning_percent,
            needs_compression: usage_percent >= critical_percent,
        }
    }

    /// Returns the band these stats fall in.
    #[must_use]
    pub fn band(&self) -> ContextBand {
        if self.needs_compression {
            ContextBand::Critical
        } else if self.is_warning {
            ContextBand::Warning
        } else {
            ContextBand::Healthy
        }
    }
}

/// Who started the compaction currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionOrigin {
    /// The host compacts on its own when the context is critical.
    Auto,
    /// The user asked for it.
    Manual,
}

/// Tracks usage totals, context pressure and compaction progress.
#[derive(Debug, Clone)]
pub struct UsageMonitor {
    usage: UsageStats,
    context: ContextStats,
    warning_percent: f64,
    critical_percent: f64,
    compacting: Option<CompactionOrigin>,
}

impl UsageMonitor {
    /// Creates a monitor with the given band thresholds.
    #[must_use]
    pub fn new(warning_percent: f64, critical_percent: f64) -> Self {
        Self {
            usage: UsageStats::default(),
            context: ContextStats::default(),
            warning_percent,
            critical_percent,
            compacting: None,
        }
    }

    #[must_use]
    pub fn usage(&self) -> &UsageStats {
        &self.usage
    }

    #[must_use]
    pub fn context(&self) -> &ContextStats {
        &self.context
    }

    /// Returns the compaction in progress, if any.
    #[must_use]
    pub fn compacting(&self) -> Option<CompactionOrigin> {
        self.compacting
    }

    /// Replaces the usage totals.
    pub fn apply_totals(&mut self, totals: Totals) {
        self.usage = UsageStats::from(totals);
        debug!(
            tokens = self.usage.total_tokens(),
            cost = self.usage.total_cost,
            requests = self.usage.request_count,
            "Usage totals updated"
        );
    }

    /// Applies new context figures.
    ///
    /// Returns `Some(CompactionOrigin::Auto)` when the context just entered
    /// the critical band and no compaction is already in progress.
    pub fn apply_context(&mut self, figures: ContextFigures) -> Option<CompactionOrigin> {
        let previous = self.context.band();
        self.context = ContextStats::compute(figures, self.warning_percent, self.critical_percent);
        let band = self.context.band();

        debug!(
            percent = self.context.usage_percent,
            band = %band,
            "Context stats updated"
        );

        let entered_critical = band == ContextBand::Critical && previous != ContextBand::Critical;
        if entered_critical && self.compacting.is_none() {
            info!(percent = self.context.usage_percent, "Context critical, host will compact");
            self.compacting = Some(CompactionOrigin::Auto);
            return self.compacting;
        }
        None
    }

    /// Starts a user-requested compaction.
    ///
    /// Returns `false` if a compaction is already in progress.
    pub fn begin_manual(&mut self) -> bool {
        if self.compacting.is_some() {
            return false;
        }
        self.compacting = Some(CompactionOrigin::Manual);
        true
    }

    /// Gives up waiting for a compaction result.
    pub fn expire_compaction(&mut self) -> Option<CompactionOrigin> {
        self.compacting.take()
    }

    /// Applies a compaction result and returns the text to show the user.
    pub fn apply_compacted(&mut self, report: &CompactionReport) -> String {
        let origin = self.compacting.take();
        debug!(origin = ?origin, success = report.success, "Compaction finished");

        if let Some(stats) = report.stats {
            self.context = ContextStats::compute(stats, self.warning_percent, self.critical_percent);
        }

        if report.success {
            format!(
                "Context compacted: {:.0}% smaller, {} messages summarized",
                report.compression_ratio * 100.0,
                report.messages_compressed
            )
        } else {
            match report.error.as_deref() {
                Some(error) => format!("Compaction failed: {}", error),
                None => "Compaction failed".to_string(),
            }
        }
    }

    /// Forgets per-session context state. Usage totals are kept.
    pub fn reset_context(&mut self) {
        self.context = ContextStats::default();
        self.compacting = None;
    }
}
