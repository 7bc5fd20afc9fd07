//! Usage and context monitoring tests.

use proptest::prelude::*;
use std::time::Duration;
use tether::app::{AppEvent, Effect, UserAction, ViewEvent};
use tether::channel::protocol::{CompactionReport, ContextFigures, Totals};
use tether::channel::{Inbound, Outbound};
use tether::notices::NoticeKind;
use tether::usage::{ContextBand, ContextStats};

use crate::common::Harness;

fn context(total: u64, max: u64) -> Inbound {
    Inbound::ContextStats(ContextFigures {
        total_tokens: total,
        max_tokens: max,
    })
}

fn compacted(success: bool) -> Inbound {
    Inbound::ContextCompacted(CompactionReport {
        success,
        compression_ratio: 0.6,
        messages_compressed: 12,
        stats: Some(ContextFigures {
            total_tokens: 40_000,
            max_tokens: 200_000,
        }),
        error: (!success).then(|| "model refused".to_string()),
    })
}

fn compacting_notices(h: &Harness) -> usize {
    h.views()
        .iter()
        .filter(|v| {
            matches!(
                v,
                ViewEvent::NoticeShown {
                    kind: NoticeKind::Compacting,
                    ..
                }
            )
        })
        .count()
}

proptest! {
    #[test]
    fn prop_usage_percent_in_range(total in any::<u64>(), max in any::<u64>()) {
        let stats = ContextStats::compute(
            ContextFigures { total_tokens: total, max_tokens: max },
            85.0,
            95.0,
        );
        prop_assert!((0.0..=100.0).contains(&stats.usage_percent));
        if max == 0 {
            prop_assert_eq!(stats.usage_percent, 0.0);
        }
        prop_assert_eq!(stats.needs_compression, stats.band() == ContextBand::Critical);
    }
}

#[test]
fn test_critical_shows_one_auto_compacting_notice() {
    let mut h = Harness::new();
    h.host(context(170_000, 200_000));
    assert_eq!(compacting_notices(&h), 0);

    h.host(context(192_000, 200_000));
    h.host(context(195_000, 200_000));
    assert_eq!(compacting_notices(&h), 1);
    assert!(h.notice_texts()[0].contains("96%"));
}

#[test]
fn test_compaction_result_replaces_progress_notice() {
    let mut h = Harness::new();
    h.host(context(192_000, 200_000));
    let progress = h.state.notices.iter().next().map(|n| n.id).unwrap();

    let fx = h.host(compacted(true));
    assert!(fx.contains(&Effect::CancelDismiss { id: progress }));
    assert!(fx.contains(&Effect::View(ViewEvent::NoticeDismissed { id: progress })));
    assert_eq!(h.state.notices.len(), 1);
    assert_eq!(
        h.state.notices.iter().next().unwrap().text,
        "Context compacted: 60% smaller, 12 messages summarized"
    );
    assert_eq!(h.state.usage.context().usage_percent, 20.0);

    // The old timer firing late must not kill the result notice.
    h.dispatch(AppEvent::NoticeExpired(progress));
    assert_eq!(h.state.notices.len(), 1);
}

#[test]
fn test_manual_compaction() {
    let mut h = Harness::new();
    let fx = h.user(UserAction::CompactContext);
    assert_eq!(h.sent(), vec![Outbound::CompactContext { manual: true }]);
    assert!(fx.iter().any(|e| matches!(
        e,
        Effect::ScheduleDismiss { after, .. } if *after == Duration::from_secs(60)
    )));

    h.clear_effects();
    h.user(UserAction::CompactContext);
    assert!(h.sent().is_empty(), "second request while compacting");

    h.host(compacted(false));
    assert_eq!(
        h.state.notices.iter().last().unwrap().text,
        "Compaction failed: model refused"
    );
}

#[test]
fn test_manual_compaction_timeout_allows_retry() {
    let mut h = Harness::new();
    h.user(UserAction::CompactContext);
    let id = h.state.notices.iter().next().unwrap().id;

    h.dispatch(AppEvent::NoticeExpired(id));
    assert!(h.state.usage.compacting().is_none());

    h.clear_effects();
    h.user(UserAction::CompactContext);
    assert_eq!(h.sent(), vec![Outbound::CompactContext { manual: true }]);
}

#[test]
fn test_totals_feed_status_line() {
    let mut h = Harness::new();
    h.host(Inbound::UpdateTotals(Totals {
        total_cost: 0.0123,
        total_tokens_input: 1_000,
        total_tokens_output: 234,
        request_count: 2,
    }));
    assert_eq!(h.state.status_line(h.now), "Ready · 1,234 tokens · $0.0123");

    h.send("next");
    h.advance(Duration::from_millis(3_250));
    assert_eq!(h.state.status_line(h.now), "Processing · 3.2s · 1,234 tokens");
}
