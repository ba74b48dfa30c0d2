//! Counters for copy runs.
//!
//! Names follow Prometheus conventions. Nothing is exported unless the
//! embedding process installs a `metrics` recorder.

use crate::model::ObjectKind;
use std::fmt;

/// All metric names used by the copier and orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    FieldsCopied,
    FieldsFailed,
    FieldMismatches,
    RegistryEntries,
    ObjectsCreated,
    ObjectsSkipped,
    ObjectsFailed,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricName::FieldsCopied => "omero_copy_fields_copied_total",
            MetricName::FieldsFailed => "omero_copy_fields_failed_total",
            MetricName::FieldMismatches => "omero_copy_field_mismatches_total",
            MetricName::RegistryEntries => "omero_copy_registry_entries_total",
            MetricName::ObjectsCreated => "omero_copy_objects_created_total",
            MetricName::ObjectsSkipped => "omero_copy_objects_skipped_total",
            MetricName::ObjectsFailed => "omero_copy_objects_failed_total",
        };
        write!(f, "{}", name)
    }
}

pub fn increment(name: MetricName, by: u64) {
    ::metrics::counter!(name.to_string()).increment(by);
}

/// Per-kind counter, labelled with the object's type name.
pub fn increment_for(name: MetricName, kind: ObjectKind) {
    ::metrics::counter!(name.to_string(), "kind" => kind.type_name()).increment(1);
}
