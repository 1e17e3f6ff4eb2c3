//! Default metric catalogue

/// Metrics requested when the caller does not name any
pub const DEFAULT_METRICS: &[&str] = &[
    "order_cnt",
    "gmv",
    "gmv_995",
    "gmv_995_v2",
    "nmv",
    "ads_load",
    "ads_revenue_usd",
    "bad_query_rate",
];

const METRIC_DESCRIPTIONS: &[(&str, &str)] = &[
    ("order_cnt", "Order count"),
    ("gmv", "GMV (gross merchandise value)"),
    ("gmv_995", "GMV 995"),
    ("gmv_995_v2", "GMV 995 v2"),
    ("nmv", "NMV (net merchandise value)"),
    ("ads_load", "Ads load rate (paid ads)"),
    ("ads_revenue_usd", "Ads revenue (USD)"),
    ("bad_query_rate", "Bad query rate (organic + ads)"),
];

/// Owned copy of the default metric list
pub fn default_metrics() -> Vec<String> {
    DEFAULT_METRICS.iter().map(|m| m.to_string()).collect()
}

/// Human description of a metric, falling back to the metric name itself
pub fn metric_description(metric: &str) -> &str {
    METRIC_DESCRIPTIONS
        .iter()
        .find(|(name, _)| *name == metric)
        .map(|(_, desc)| *desc)
        .unwrap_or(metric)
}
