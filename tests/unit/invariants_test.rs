//! Property tests over random event sequences.
//!
//! Whatever order host signals and user actions arrive in, the derived busy
//! state, the status ticker and the AutoMode hand-off stay consistent.

use proptest::prelude::*;
use tether::app::{AppEvent, Effect, UserAction, ViewEvent};
use tether::automode::AutoModePhase;
use tether::channel::{Inbound, Outbound};

use crate::common::{output, processing, Harness};

fn event() -> impl Strategy<Value = AppEvent> {
    prop_oneof![
        3 => Just(AppEvent::User(UserAction::Send { text: "task".to_string() })),
        2 => Just(AppEvent::User(UserAction::StartAutoMode { text: "feature".to_string() })),
        1 => Just(AppEvent::User(UserAction::Stop)),
        4 => Just(AppEvent::Host(processing(true))),
        4 => Just(AppEvent::Host(processing(false))),
        2 => Just(AppEvent::Host(output("chunk"))),
        1 => Just(AppEvent::Host(Inbound::Error { message: "boom".to_string() })),
        1 => Just(AppEvent::Host(Inbound::InstallRequired)),
        1 => Just(AppEvent::Host(Inbound::Ready)),
        1 => Just(AppEvent::User(UserAction::NewSession)),
        1 => Just(AppEvent::Tick),
    ]
}

proptest! {
    #[test]
    fn prop_busy_is_derived_and_published(events in prop::collection::vec(event(), 1..60)) {
        let mut h = Harness::new();
        let mut shown_busy = false;

        for event in events {
            let fx = h.dispatch(event);
            for effect in &fx {
                if let Effect::View(ViewEvent::BusyChanged { busy }) = effect {
                    prop_assert_ne!(*busy, shown_busy, "BusyChanged only on change");
                    shown_busy = *busy;
                }
            }
            prop_assert_eq!(shown_busy, h.state.busy());
        }
    }

    #[test]
    fn prop_ticker_runs_exactly_while_processing(events in prop::collection::vec(event(), 1..60)) {
        let mut h = Harness::new();
        let mut ticking = false;

        for event in events {
            for effect in h.dispatch(event) {
                match effect {
                    Effect::StartStatusTicker { .. } => {
                        prop_assert!(!ticking);
                        ticking = true;
                    }
                    Effect::StopStatusTicker => {
                        prop_assert!(ticking);
                        ticking = false;
                    }
                    _ => {}
                }
            }
            prop_assert_eq!(ticking, h.state.session.is_processing());
        }
    }

    #[test]
    fn prop_one_execute_per_planning_completion(events in prop::collection::vec(event(), 1..60)) {
        let mut h = Harness::new();

        for event in events {
            let planning = h.state.automode.phase() == AutoModePhase::Planning;
            let fx = h.dispatch(event);
            let executes = fx
                .iter()
                .filter(|e| matches!(
                    e,
                    Effect::Send(Outbound::SendMessage { plan_mode: false, text, .. })
                        if text.starts_with("Execute the plan")
                ))
                .count();

            prop_assert!(executes <= 1);
            if executes == 1 {
                prop_assert!(planning, "execution only follows planning");
                prop_assert_eq!(h.state.automode.phase(), AutoModePhase::Executing);
                prop_assert!(h.state.busy());
            }
        }
    }
}
