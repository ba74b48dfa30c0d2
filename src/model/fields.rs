use super::{Access, FieldValue, ModelError, ObjectHeader, ObjectKind};
use std::collections::BTreeSet;

/// Runtime accessor pair for one field of `T`.
///
/// A field with no `read` is write-only and a field with no `write` is
/// read-only; the copier treats either as one half of a mismatch.
pub struct FieldDescriptor<T> {
    pub name: &'static str,
    pub read: Option<fn(&T) -> FieldValue>,
    pub write: Option<fn(&mut T, FieldValue) -> Result<(), ModelError>>,
}

/// Uniform get/set surface over heterogeneous objects.
pub trait FieldAccess {
    fn type_name(&self) -> &'static str;

    fn readable_fields(&self) -> BTreeSet<&'static str>;

    fn writable_fields(&self) -> BTreeSet<&'static str>;

    fn read_field(&self, field: &str) -> Result<FieldValue, ModelError>;

    fn write_field(&mut self, field: &str, value: FieldValue) -> Result<(), ModelError>;
}

/// A concrete variant with a static descriptor table.
pub trait Described: Sized + 'static {
    const KIND: ObjectKind;

    fn descriptors() -> &'static [FieldDescriptor<Self>];

    fn header(&self) -> &ObjectHeader;

    fn header_mut(&mut self) -> &mut ObjectHeader;

    fn descriptor(field: &str) -> Option<&'static FieldDescriptor<Self>> {
        Self::descriptors().iter().find(|d| d.name == field)
    }
}

impl<T: Described> FieldAccess for T {
    fn type_name(&self) -> &'static str {
        T::KIND.type_name()
    }

    fn readable_fields(&self) -> BTreeSet<&'static str> {
        T::descriptors()
            .iter()
            .filter(|d| d.read.is_some())
            .map(|d| d.name)
            .collect()
    }

    fn writable_fields(&self) -> BTreeSet<&'static str> {
        T::descriptors()
            .iter()
            .filter(|d| d.write.is_some())
            .map(|d| d.name)
            .collect()
    }

    fn read_field(&self, field: &str) -> Result<FieldValue, ModelError> {
        let read = T::descriptor(field)
            .and_then(|d| d.read)
            .ok_or_else(|| ModelError::UnknownField {
                type_name: T::KIND.type_name(),
                field: field.to_string(),
                access: Access::Read,
            })?;
        if !self.header().loaded && field != "Id" {
            return Err(ModelError::Unloaded {
                type_name: T::KIND.type_name(),
                field: field.to_string(),
            });
        }
        Ok(read(self))
    }

    fn write_field(&mut self, field: &str, value: FieldValue) -> Result<(), ModelError> {
        let write = T::descriptor(field)
            .and_then(|d| d.write)
            .ok_or_else(|| ModelError::UnknownField {
                type_name: T::KIND.type_name(),
                field: field.to_string(),
                access: Access::Write,
            })?;
        write(self, value)
    }
}

// Accessors shared by every variant.

pub(crate) fn read_id<T: Described>(obj: &T) -> FieldValue {
    obj.header().id.into()
}

pub(crate) fn write_id<T: Described>(obj: &mut T, value: FieldValue) -> Result<(), ModelError> {
    obj.header_mut().id = value.into_int("Id")?;
    Ok(())
}

pub(crate) fn read_details<T: Described>(obj: &T) -> FieldValue {
    obj.header().details.clone().into()
}

/// Rejects values outside `0..=255`, the range of an 8-bit colour component.
pub(crate) fn color_component(field: &'static str, value: FieldValue) -> Result<Option<i64>, ModelError> {
    match value.into_int(field)? {
        Some(v) if !(0..=255).contains(&v) => Err(ModelError::Rejected {
            field,
            reason: format!("{} is outside 0..=255", v),
        }),
        other => Ok(other),
    }
}

pub(crate) fn positive(field: &'static str, value: Option<f64>) -> Result<Option<f64>, ModelError> {
    match value {
        Some(v) if v <= 0.0 => Err(ModelError::Rejected {
            field,
            reason: format!("{} must be positive", v),
        }),
        other => Ok(other),
    }
}

/// Builds a descriptor from closure literals.
///
/// `field!("Name", rw, |o: &T| ..., |o: &mut T, v| ...)` for read/write,
/// `field!("Name", ro, |o: &T| ...)` for read-only.
macro_rules! field {
    ($name:literal, rw, $read:expr, $write:expr) => {
        $crate::model::fields::FieldDescriptor {
            name: $name,
            read: Some($read),
            write: Some($write),
        }
    };
    ($name:literal, ro, $read:expr) => {
        $crate::model::fields::FieldDescriptor {
            name: $name,
            read: Some($read),
            write: None,
        }
    };
}

pub(crate) use field;
