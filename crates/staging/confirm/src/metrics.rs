//! Metrics for the confirmation exchange.

/// Container for metrics.
#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    pub(crate) const CONFIRM_REQUESTS_TOTAL: &'static str = "vestibule_confirm_requests_total";
    pub(crate) const CONFIRM_REQUEST_ERRORS_TOTAL: &'static str =
        "vestibule_confirm_request_errors_total";
    pub(crate) const CONFIRM_STATUS_TOTAL: &'static str = "vestibule_confirm_status_total";

    /// Describes the confirmation metrics.
    pub(crate) fn init() {
        metrics::describe_counter!(
            Self::CONFIRM_REQUESTS_TOTAL,
            metrics::Unit::Count,
            "Confirmation requests sent to the authority",
        );
        metrics::describe_counter!(
            Self::CONFIRM_REQUEST_ERRORS_TOTAL,
            metrics::Unit::Count,
            "Confirmation requests that failed before a valid response",
        );
        metrics::describe_counter!(
            Self::CONFIRM_STATUS_TOTAL,
            metrics::Unit::Count,
            "Block verdicts received from the authority, by status",
        );
    }
}
