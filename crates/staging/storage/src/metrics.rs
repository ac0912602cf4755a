//! Metrics for the pending header container.

/// Container for metrics.
#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    pub(crate) const STAGING_HEADERS_WRITTEN_TOTAL: &'static str =
        "vestibule_staging_headers_written_total";
    pub(crate) const STAGING_HEADERS_PRUNED_TOTAL: &'static str =
        "vestibule_staging_headers_pruned_total";
    pub(crate) const STAGING_HEADERS: &'static str = "vestibule_staging_headers";
    pub(crate) const STAGING_NOTIFICATIONS_DROPPED_TOTAL: &'static str =
        "vestibule_staging_notifications_dropped_total";
    pub(crate) const STAGING_CATCH_UP_TOTAL: &'static str = "vestibule_staging_catch_up_total";

    /// Initializes metrics for the staging container.
    ///
    /// This does two things:
    /// * Describes various metrics.
    /// * Initializes metrics to 0 so they can be queried immediately.
    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::STAGING_HEADERS_WRITTEN_TOTAL,
            metrics::Unit::Count,
            "Total number of headers written to the pending header container",
        );
        metrics::describe_counter!(
            Self::STAGING_HEADERS_PRUNED_TOTAL,
            metrics::Unit::Count,
            "Total number of headers removed from the pending header container",
        );
        metrics::describe_gauge!(
            Self::STAGING_HEADERS,
            metrics::Unit::Count,
            "Number of headers currently staged",
        );
        metrics::describe_counter!(
            Self::STAGING_NOTIFICATIONS_DROPPED_TOTAL,
            metrics::Unit::Count,
            "Header notifications dropped because a subscriber queue was full",
        );
        metrics::describe_counter!(
            Self::STAGING_CATCH_UP_TOTAL,
            metrics::Unit::Count,
            "Reads that fell back to returning every staged header",
        );
    }

    fn zero() {
        metrics::counter!(Self::STAGING_HEADERS_WRITTEN_TOTAL).increment(0);
        metrics::counter!(Self::STAGING_HEADERS_PRUNED_TOTAL).increment(0);
        metrics::counter!(Self::STAGING_NOTIFICATIONS_DROPPED_TOTAL).increment(0);
        metrics::counter!(Self::STAGING_CATCH_UP_TOTAL).increment(0);
        metrics::gauge!(Self::STAGING_HEADERS).set(0.0);
    }
}
