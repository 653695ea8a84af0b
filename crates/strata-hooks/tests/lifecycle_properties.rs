//! Property-based tests for request lifecycle dispatch
//!
//! However often an event is fired within a request, its hooks run once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;
use strata_hooks::*;

fn event_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(events::TRACKER_END),
        Just(events::REQUEST_DISPATCH_END),
        Just("Custom.event"),
    ]
}

proptest! {
    /// Each event's hooks run once per request no matter how many times it fires.
    #[test]
    fn prop_hooks_run_at_most_once_per_request(
        requests in prop::collection::vec(prop::collection::vec(event_strategy(), 0..12), 1..6)
    ) {
        let registry = Arc::new(InMemoryHookRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        registry.on(events::TRACKER_END, Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })).unwrap();

        let lifecycle = RequestLifecycle::new(registry);
        let mut expected = 0;
        for fired in &requests {
            lifecycle.begin_request();
            for event in fired {
                lifecycle.fire(event);
            }
            if fired.contains(&events::TRACKER_END) {
                expected += 1;
            }
        }

        prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
    }

    /// Dispatch invokes exactly the hooks registered for the event.
    #[test]
    fn prop_dispatch_counts_matching_hooks(
        registrations in prop::collection::vec(event_strategy(), 0..20),
        target in event_strategy(),
    ) {
        let registry = InMemoryHookRegistry::new();
        for event in &registrations {
            registry.on(event, Arc::new(|| {})).unwrap();
        }

        let expected = registrations.iter().filter(|e| **e == target).count();
        prop_assert_eq!(registry.hooks_for_event(target), expected);
        prop_assert_eq!(registry.dispatch(target), expected);
    }
}
