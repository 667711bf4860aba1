//! Names of the metrics recorded while dispatching.

/// Inbound messages seen by the dispatcher (counter).
pub const MESSAGES_TOTAL: &str = "courier_messages_total";
/// Rejected or dropped messages (counter, labels: errsrc).
pub const DISPATCH_ERRORS_TOTAL: &str = "courier_dispatch_errors_total";
/// Handler run time, after authorization (histogram, labels: func).
pub const HANDLER_DURATION_SECONDS: &str = "courier_handler_duration_seconds";
/// Replies that could not be enqueued (counter).
pub const SEND_DROPS_TOTAL: &str = "courier_send_drops_total";
