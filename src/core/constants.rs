/// URL of the CGM export served from the data repository.
pub const DATA_URL: &str =
    "https://raw.githubusercontent.com/ilhem98/Patient2DataAnalytics/main/diabete%20data.csv";

/// Local file the downloaded bytes are mirrored to on every cold load.
pub const CACHE_FILE: &str = "diabete data";

/// Expected CSV header names.
pub const COL_DATE: &str = "date";
pub const COL_TIME: &str = "time";
pub const COL_GLYCEMIA: &str = "glycemia(g/l)";
pub const COL_BOLUS: &str = "bolus";
pub const COL_BASAL: &str = "basal rate (U/h)";

/// Clinical glucose bin edges in g/L. Readings outside the outer edges are
/// left unclassified.
pub const RANGE_EDGES: [f64; 4] = [0.0, 0.7, 1.8, 3.5];

/// Aggregate severity thresholds in mg/dL.
pub const SEVERITY_LOW: f64 = 70.0;
pub const SEVERITY_HIGH: f64 = 180.0;

/// Timeout applied to the data download.
pub const FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
