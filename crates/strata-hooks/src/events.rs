//! Well-known lifecycle event names

/// Fired once when a tracking request has been fully handled.
pub const TRACKER_END: &str = "Tracker.end";

/// Fired once when an interactive (UI) request has been dispatched.
pub const REQUEST_DISPATCH_END: &str = "Request.dispatch.end";
