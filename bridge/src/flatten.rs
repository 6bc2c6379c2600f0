//! Flattening of labeled time series into store rows.
//!
//! Each series is split into its metric name and the remaining label set,
//! which is stored as two parallel arrays. Every sample then becomes one row
//! sharing that partition.

use crate::model::{Row, timestamp_secs};
use crate::proto::{Label, Sample};

/// Reserved label whose value names the metric.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Labels of one series, partitioned into the metric name and the rest.
///
/// `label_names[i]` pairs with `label_values[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedSeries {
    pub metric: String,
    pub label_names: Vec<String>,
    pub label_values: Vec<String>,
}

/// Partition a series' labels in a single pass.
///
/// Non-metric labels keep their encounter order. If the metric name label
/// appears more than once the last occurrence wins; a series without one gets
/// an empty metric name.
pub fn partition_labels(labels: &[Label]) -> FlattenedSeries {
    let mut flattened = FlattenedSeries::default();
    for label in labels {
        if label.name == METRIC_NAME_LABEL {
            flattened.metric.clone_from(&label.value);
        } else {
            flattened.label_names.push(label.name.clone());
            flattened.label_values.push(label.value.clone());
        }
    }
    flattened
}

impl FlattenedSeries {
    /// One row per sample, in sample order.
    pub fn rows<'a>(&'a self, samples: &'a [Sample]) -> impl Iterator<Item = Row<'a>> + 'a {
        samples.iter().map(move |sample| Row {
            timestamp_secs: timestamp_secs(sample.timestamp),
            metric: &self.metric,
            label_names: &self.label_names,
            label_values: &self.label_values,
            value: sample.value,
        })
    }
}
