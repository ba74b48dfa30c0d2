//! Generic attribute copier.
//!
//! Works over any pair of [`FieldAccess`] objects, which may be different
//! concrete variants. The readable set of the source and the writable set of
//! the destination are reconciled at call time; individual field failures are
//! logged and recorded, never propagated.

use crate::metrics::{self, MetricName};
use crate::model::{FieldAccess, ModelError};
use std::collections::BTreeSet;
use tracing::{debug, error, warn};

/// Field that is never written, whatever the filter says.
pub const IDENTITY_FIELD: &str = "Id";

/// Readable-only on every variant; not worth reporting as a mismatch.
pub const DETAILS_FIELD: &str = "Details";

/// Anything that can be turned into a list of field names.
///
/// A bare `&str` is a one-element list.
pub trait FieldNames {
    fn into_field_names(self) -> Vec<String>;
}

impl FieldNames for &str {
    fn into_field_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl FieldNames for String {
    fn into_field_names(self) -> Vec<String> {
        vec![self]
    }
}

impl FieldNames for &[&str] {
    fn into_field_names(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> FieldNames for [&str; N] {
    fn into_field_names(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl FieldNames for Vec<&str> {
    fn into_field_names(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl FieldNames for Vec<String> {
    fn into_field_names(self) -> Vec<String> {
        self
    }
}

/// Include/exclude lists for one copy.
///
/// An empty include list means "every field readable on the source and
/// writable on the destination".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFilter {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl FieldFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(fields: impl FieldNames) -> Self {
        Self::default().including(fields)
    }

    pub fn including(mut self, fields: impl FieldNames) -> Self {
        self.include.extend(fields.into_field_names());
        self
    }

    pub fn excluding(mut self, fields: impl FieldNames) -> Self {
        self.exclude.extend(fields.into_field_names());
        self
    }

    pub fn include(&self) -> &BTreeSet<String> {
        &self.include
    }

    pub fn exclude(&self) -> &BTreeSet<String> {
        &self.exclude
    }
}

/// Resolved field set plus the diagnostics computed alongside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    pub fields: BTreeSet<String>,
    /// Fields readable or writable but not both, minus `Details` and the
    /// exclude list. Only computed when no include list was given.
    pub mismatched: BTreeSet<String>,
    pub missing_get: BTreeSet<String>,
    pub missing_set: BTreeSet<String>,
}

pub fn select_fields(
    readable: &BTreeSet<&'static str>,
    writable: &BTreeSet<&'static str>,
    filter: &FieldFilter,
) -> FieldSelection {
    let readable: BTreeSet<String> = readable.iter().map(|s| s.to_string()).collect();
    let writable: BTreeSet<String> = writable.iter().map(|s| s.to_string()).collect();
    let both: BTreeSet<String> = readable.intersection(&writable).cloned().collect();

    let mut mismatched = BTreeSet::new();
    let fields: BTreeSet<String> = if filter.include.is_empty() {
        mismatched = readable
            .symmetric_difference(&writable)
            .filter(|f| f.as_str() != DETAILS_FIELD && !filter.exclude.contains(*f))
            .cloned()
            .collect();
        both.difference(&filter.exclude).cloned().collect()
    } else {
        filter.include.difference(&filter.exclude).cloned().collect()
    };

    let missing_get = fields.difference(&readable).cloned().collect();
    let missing_set = fields.difference(&writable).cloned().collect();

    FieldSelection {
        fields,
        mismatched,
        missing_get,
        missing_set,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFailure {
    pub field: String,
    pub error: ModelError,
}

/// Outcome of one [`copy_fields`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyReport {
    pub source_type: &'static str,
    pub destination_type: &'static str,
    pub copied: Vec<String>,
    pub failed: Vec<FieldFailure>,
    pub mismatched: BTreeSet<String>,
    pub missing_get: BTreeSet<String>,
    pub missing_set: BTreeSet<String>,
}

impl CopyReport {
    /// No field failed and no diagnostics were raised.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
            && self.mismatched.is_empty()
            && self.missing_get.is_empty()
            && self.missing_set.is_empty()
    }
}

/// Copy every selected field from `source` to `destination`.
///
/// `Id` is skipped even when explicitly included. The destination is mutated
/// in place and not persisted.
pub fn copy_fields<S, D>(source: &S, destination: &mut D, filter: &FieldFilter) -> CopyReport
where
    S: FieldAccess + ?Sized,
    D: FieldAccess + ?Sized,
{
    let source_type = source.type_name();
    let destination_type = destination.type_name();
    let readable = source.readable_fields();
    let writable = destination.writable_fields();
    debug!("get: {:?}", readable);
    debug!("set: {:?}", writable);

    let selection = select_fields(&readable, &writable, filter);
    if !selection.mismatched.is_empty() {
        warn!(
            source = source_type,
            destination = destination_type,
            "Mismatch between get and set fields: {:?}",
            selection.mismatched
        );
        metrics::increment(MetricName::FieldMismatches, selection.mismatched.len() as u64);
    }
    if !selection.missing_get.is_empty() {
        warn!(source = source_type, "Fields missing from get: {:?}", selection.missing_get);
    }
    if !selection.missing_set.is_empty() {
        warn!(
            destination = destination_type,
            "Fields missing from set: {:?}", selection.missing_set
        );
    }
    debug!("fields: {:?}", selection.fields);

    let mut copied = Vec::new();
    let mut failed = Vec::new();
    for field in &selection.fields {
        if field == IDENTITY_FIELD {
            continue;
        }
        debug!("Copying {}", field);
        let result = source
            .read_field(field)
            .and_then(|value| destination.write_field(field, value));
        match result {
            Ok(()) => copied.push(field.clone()),
            Err(e) => {
                error!(
                    source = source_type,
                    destination = destination_type,
                    "Copy of {} failed: {}",
                    field,
                    e
                );
                failed.push(FieldFailure {
                    field: field.clone(),
                    error: e,
                });
            }
        }
    }

    metrics::increment(MetricName::FieldsCopied, copied.len() as u64);
    metrics::increment(MetricName::FieldsFailed, failed.len() as u64);

    CopyReport {
        source_type,
        destination_type,
        copied,
        failed,
        mismatched: selection.mismatched,
        missing_get: selection.missing_get,
        missing_set: selection.missing_set,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Access, Channel, FieldValue, Image, LogicalChannel, ModelObject, ObjectKind, ObjectRef,
        TagAnnotation,
    };

    fn set(items: &[&'static str]) -> BTreeSet<&'static str> {
        items.iter().copied().collect()
    }

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Object whose accessors fail on demand.
    struct Faulty {
        fail_reads: bool,
    }

    impl FieldAccess for Faulty {
        fn type_name(&self) -> &'static str {
            "Faulty"
        }

        fn readable_fields(&self) -> BTreeSet<&'static str> {
            set(&["Id", "Name", "Value"])
        }

        fn writable_fields(&self) -> BTreeSet<&'static str> {
            set(&["Id", "Name", "Value"])
        }

        fn read_field(&self, field: &str) -> Result<FieldValue, ModelError> {
            if self.fail_reads {
                return Err(ModelError::Rejected {
                    field: "Faulty",
                    reason: format!("read of {} refused", field),
                });
            }
            Ok(FieldValue::Int(1))
        }

        fn write_field(&mut self, field: &str, _value: FieldValue) -> Result<(), ModelError> {
            Err(ModelError::UnknownField {
                type_name: "Faulty",
                field: field.to_string(),
                access: Access::Write,
            })
        }
    }

    #[test]
    fn test_selection_uses_intersection_without_include() {
        let selection = select_fields(
            &set(&["Id", "Details", "Name", "Count"]),
            &set(&["Id", "Name", "Extra"]),
            &FieldFilter::all(),
        );
        assert_eq!(selection.fields, names(&["Id", "Name"]));
        assert_eq!(selection.mismatched, names(&["Count", "Extra"]));
        assert!(selection.missing_get.is_empty());
        assert!(selection.missing_set.is_empty());
    }

    #[test]
    fn test_exclude_is_subtracted_from_mismatches() {
        let selection = select_fields(
            &set(&["Id", "Name", "Count"]),
            &set(&["Id", "Name"]),
            &FieldFilter::all().excluding("Count"),
        );
        assert!(selection.mismatched.is_empty());
    }

    #[test]
    fn test_include_reports_missing_accessors() {
        let selection = select_fields(
            &set(&["Id", "Name"]),
            &set(&["Id", "Value"]),
            &FieldFilter::only(["Name", "Value"]),
        );
        assert_eq!(selection.missing_get, names(&["Value"]));
        assert_eq!(selection.missing_set, names(&["Name"]));
        assert!(selection.mismatched.is_empty());
    }

    #[test]
    fn test_copy_all_fields_between_same_variant() {
        let mut source = LogicalChannel {
            name: Some("GFP".to_string()),
            emission_wave: Some(520.0),
            excitation_wave: Some(488.0),
            fluor: Some("EGFP".to_string()),
            samples_per_pixel: Some(1),
            mode: Some("WideField".to_string()),
            ..Default::default()
        };
        source.header.id = Some(11);
        let mut destination = LogicalChannel::default();

        let report = copy_fields(&source, &mut destination, &FieldFilter::all());

        assert!(report.is_clean(), "{:?}", report);
        assert_eq!(destination.header.id, None);
        for field in source.readable_fields() {
            if field == IDENTITY_FIELD || field == DETAILS_FIELD {
                continue;
            }
            assert_eq!(
                source.read_field(field).unwrap(),
                destination.read_field(field).unwrap(),
                "field {}",
                field
            );
        }
    }

    #[test]
    fn test_id_is_never_written() {
        let mut source = TagAnnotation::default();
        source.header.id = Some(42);
        source.value = Some("nuclei".to_string());
        let mut destination = TagAnnotation::default();

        let report = copy_fields(&source, &mut destination, &FieldFilter::only(["Id", "Value"]));

        assert_eq!(destination.header.id, None);
        assert_eq!(destination.value.as_deref(), Some("nuclei"));
        assert_eq!(report.copied, vec!["Value".to_string()]);
    }

    #[test]
    fn test_only_value_is_copied() {
        let source = TagAnnotation {
            name: Some("name".to_string()),
            description: Some("desc".to_string()),
            namespace: Some("ns".to_string()),
            value: Some("nuclei".to_string()),
            ..Default::default()
        };
        let mut destination = TagAnnotation::default();

        copy_fields(&source, &mut destination, &FieldFilter::only("Value"));

        assert_eq!(destination.value.as_deref(), Some("nuclei"));
        assert_eq!(destination.name, None);
        assert_eq!(destination.description, None);
        assert_eq!(destination.namespace, None);
    }

    #[test]
    fn test_failures_are_collected_not_raised() {
        let source = Faulty { fail_reads: true };
        let mut destination = Faulty { fail_reads: false };
        let report = copy_fields(&source, &mut destination, &FieldFilter::all());
        assert!(report.copied.is_empty());
        assert_eq!(report.failed.len(), 2);

        let source = Faulty { fail_reads: false };
        let report = copy_fields(&source, &mut destination, &FieldFilter::all());
        assert_eq!(report.failed.len(), 2);
        assert!(report
            .failed
            .iter()
            .all(|f| matches!(f.error, ModelError::UnknownField { .. })));
    }

    #[test]
    fn test_unloaded_source_fails_every_field() {
        let source = ModelObject::unloaded(ObjectRef::new(ObjectKind::Channel, 3));
        let mut destination = ModelObject::blank(ObjectKind::Channel);
        let report = copy_fields(&source, &mut destination, &FieldFilter::all());
        assert!(report.copied.is_empty());
        assert!(report
            .failed
            .iter()
            .all(|f| matches!(f.error, ModelError::Unloaded { .. })));
        assert_eq!(destination, ModelObject::blank(ObjectKind::Channel));
    }

    #[test]
    fn test_rejected_value_does_not_stop_other_fields() {
        // Channel has no validation on reads, so build an out-of-range source directly.
        let source = Channel {
            red: Some(999),
            green: Some(10),
            ..Default::default()
        };
        let mut destination = Channel::default();
        let report = copy_fields(
            &source,
            &mut destination,
            &FieldFilter::all().excluding(["AnnotationLinksCountPerOwner"]),
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].field, "Red");
        assert_eq!(destination.green, Some(10));
        assert!(report.mismatched.is_empty());
    }

    #[test]
    fn test_cross_variant_copy_uses_shared_fields() {
        let source = Image {
            name: Some("cells.tif".to_string()),
            description: Some("confocal".to_string()),
            series: Some(0),
            ..Default::default()
        };
        let mut destination = TagAnnotation::default();
        let report = copy_fields(&source, &mut destination, &FieldFilter::all());
        assert_eq!(destination.name.as_deref(), Some("cells.tif"));
        assert_eq!(destination.description.as_deref(), Some("confocal"));
        assert!(report.mismatched.contains("Series"));
        assert!(report.mismatched.contains("Value"));
        assert!(!report.mismatched.contains("Details"));
    }
}
