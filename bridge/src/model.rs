//! Row model written to the store.

/// Seconds in one UTC day.
const SECONDS_PER_DAY: i64 = 86_400;

/// One flattened sample, borrowed from the series it was produced from.
///
/// `EventDate` and `EventDateTime` are both derived from `timestamp_secs` so
/// the two columns always agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row<'a> {
    pub timestamp_secs: i64,
    pub metric: &'a str,
    pub label_names: &'a [String],
    pub label_values: &'a [String],
    pub value: f64,
}

impl Row<'_> {
    /// Whole seconds since the epoch, used for the `EventDateTime` column.
    pub fn event_date_time(&self) -> i64 {
        self.timestamp_secs
    }

    /// Days since the epoch of the UTC day containing the sample, used for the
    /// `EventDate` column.
    pub fn event_date(&self) -> i64 {
        self.timestamp_secs.div_euclid(SECONDS_PER_DAY)
    }

    pub fn to_owned_row(&self) -> OwnedRow {
        OwnedRow {
            timestamp_secs: self.timestamp_secs,
            metric: self.metric.to_string(),
            label_names: self.label_names.to_vec(),
            label_values: self.label_values.to_vec(),
            value: self.value,
        }
    }
}

/// Owned copy of a [`Row`], kept by stores that buffer rows until commit.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedRow {
    pub timestamp_secs: i64,
    pub metric: String,
    pub label_names: Vec<String>,
    pub label_values: Vec<String>,
    pub value: f64,
}

impl OwnedRow {
    pub fn as_row(&self) -> Row<'_> {
        Row {
            timestamp_secs: self.timestamp_secs,
            metric: &self.metric,
            label_names: &self.label_names,
            label_values: &self.label_values,
            value: self.value,
        }
    }
}

/// Truncate a millisecond timestamp to whole seconds.
///
/// Integer division truncates toward zero, so pre-epoch timestamps round up.
pub fn timestamp_secs(timestamp_ms: i64) -> i64 {
    timestamp_ms / 1000
}
