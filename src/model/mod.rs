//! Closed object model for the entities copied between servers.
//!
//! Each variant carries a static field descriptor table (see [`fields`]) so
//! the copier can discover which fields are readable and writable without
//! hand-maintained per-type copy code.

pub mod annotation;
pub mod channel;
pub mod fields;
pub mod image;

pub use annotation::{AnnotationAnnotationLink, TagAnnotation};
pub use channel::{Channel, LogicalChannel};
pub use fields::{Described, FieldAccess, FieldDescriptor};
pub use image::{Image, Pixels};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Concrete object variants known to the copier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Image,
    Pixels,
    Channel,
    LogicalChannel,
    TagAnnotation,
    AnnotationAnnotationLink,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 6] = [
        ObjectKind::Image,
        ObjectKind::Pixels,
        ObjectKind::Channel,
        ObjectKind::LogicalChannel,
        ObjectKind::TagAnnotation,
        ObjectKind::AnnotationAnnotationLink,
    ];

    /// Type name as it appears in provenance markers.
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectKind::Image => "Image",
            ObjectKind::Pixels => "Pixels",
            ObjectKind::Channel => "Channel",
            ObjectKind::LogicalChannel => "LogicalChannel",
            ObjectKind::TagAnnotation => "TagAnnotation",
            ObjectKind::AnnotationAnnotationLink => "AnnotationAnnotationLink",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ObjectKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectKind::ALL
            .into_iter()
            .find(|kind| kind.type_name() == s)
            .ok_or_else(|| ModelError::UnknownKind(s.to_string()))
    }
}

/// Which half of an accessor pair was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// Field-level failures raised by accessors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{type_name} has no {access} accessor for {field}")]
    UnknownField {
        type_name: &'static str,
        field: String,
        access: Access,
    },

    #[error("{type_name} is unloaded, cannot read {field}")]
    Unloaded { type_name: &'static str, field: String },

    #[error("{field} expects {expected}, got {found}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{field} rejected value: {reason}")]
    Rejected { field: &'static str, reason: String },

    #[error("Expected {expected}, found {found}")]
    WrongKind { expected: ObjectKind, found: ObjectKind },

    #[error("Unknown object type: {0}")]
    UnknownKind(String),
}

/// Reference to another persisted object on the same server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: i64,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Ownership and creation metadata, maintained by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Details {
    pub owner: Option<String>,
    pub group: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Identity and load state shared by every variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectHeader {
    pub id: Option<i64>,
    #[serde(default = "default_loaded")]
    pub loaded: bool,
    #[serde(default)]
    pub details: Details,
}

fn default_loaded() -> bool {
    true
}

impl Default for ObjectHeader {
    fn default() -> Self {
        Self {
            id: None,
            loaded: true,
            details: Details::default(),
        }
    }
}

/// A single field value moved between accessors.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Ref(ObjectRef),
    Details(Details),
}

impl FieldValue {
    pub fn type_label(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "text",
            FieldValue::Ref(_) => "reference",
            FieldValue::Details(_) => "details",
        }
    }

    fn mismatch(&self, field: &'static str, expected: &'static str) -> ModelError {
        ModelError::TypeMismatch {
            field,
            expected,
            found: self.type_label(),
        }
    }

    pub fn into_text(self, field: &'static str) -> Result<Option<String>, ModelError> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Text(s) => Ok(Some(s)),
            other => Err(other.mismatch(field, "text")),
        }
    }

    pub fn into_int(self, field: &'static str) -> Result<Option<i64>, ModelError> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Int(i) => Ok(Some(i)),
            other => Err(other.mismatch(field, "int")),
        }
    }

    /// Integers widen to floats; nothing narrows.
    pub fn into_float(self, field: &'static str) -> Result<Option<f64>, ModelError> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Float(f) => Ok(Some(f)),
            FieldValue::Int(i) => Ok(Some(i as f64)),
            other => Err(other.mismatch(field, "float")),
        }
    }

    pub fn into_bool(self, field: &'static str) -> Result<Option<bool>, ModelError> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Bool(b) => Ok(Some(b)),
            other => Err(other.mismatch(field, "bool")),
        }
    }

    pub fn into_ref(
        self,
        field: &'static str,
        kind: ObjectKind,
    ) -> Result<Option<ObjectRef>, ModelError> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Ref(r) if r.kind == kind => Ok(Some(r)),
            FieldValue::Ref(r) => Err(ModelError::WrongKind {
                expected: kind,
                found: r.kind,
            }),
            other => Err(other.mismatch(field, kind.type_name())),
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Text)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Int)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Float)
    }
}

impl From<Option<bool>> for FieldValue {
    fn from(value: Option<bool>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Bool)
    }
}

impl From<Option<ObjectRef>> for FieldValue {
    fn from(value: Option<ObjectRef>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Ref)
    }
}

impl From<Details> for FieldValue {
    fn from(value: Details) -> Self {
        FieldValue::Details(value)
    }
}

/// Any persisted object, tagged by its concrete variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModelObject {
    Image(Image),
    Pixels(Pixels),
    Channel(Channel),
    LogicalChannel(LogicalChannel),
    TagAnnotation(TagAnnotation),
    AnnotationAnnotationLink(AnnotationAnnotationLink),
}

macro_rules! each_variant {
    ($obj:expr, $inner:ident => $body:expr) => {
        match $obj {
            ModelObject::Image($inner) => $body,
            ModelObject::Pixels($inner) => $body,
            ModelObject::Channel($inner) => $body,
            ModelObject::LogicalChannel($inner) => $body,
            ModelObject::TagAnnotation($inner) => $body,
            ModelObject::AnnotationAnnotationLink($inner) => $body,
        }
    };
}

impl ModelObject {
    /// A fresh, unsaved instance of the given variant.
    pub fn blank(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Image => ModelObject::Image(Image::default()),
            ObjectKind::Pixels => ModelObject::Pixels(Pixels::default()),
            ObjectKind::Channel => ModelObject::Channel(Channel::default()),
            ObjectKind::LogicalChannel => ModelObject::LogicalChannel(LogicalChannel::default()),
            ObjectKind::TagAnnotation => ModelObject::TagAnnotation(TagAnnotation::default()),
            ObjectKind::AnnotationAnnotationLink => {
                ModelObject::AnnotationAnnotationLink(AnnotationAnnotationLink::default())
            }
        }
    }

    /// A proxy carrying only an id; every other field read fails.
    pub fn unloaded(target: ObjectRef) -> Self {
        let mut obj = Self::blank(target.kind);
        let header = obj.header_mut();
        header.id = Some(target.id);
        header.loaded = false;
        obj
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            ModelObject::Image(_) => ObjectKind::Image,
            ModelObject::Pixels(_) => ObjectKind::Pixels,
            ModelObject::Channel(_) => ObjectKind::Channel,
            ModelObject::LogicalChannel(_) => ObjectKind::LogicalChannel,
            ModelObject::TagAnnotation(_) => ObjectKind::TagAnnotation,
            ModelObject::AnnotationAnnotationLink(_) => ObjectKind::AnnotationAnnotationLink,
        }
    }

    pub fn header(&self) -> &ObjectHeader {
        each_variant!(self, inner => inner.header())
    }

    pub fn header_mut(&mut self) -> &mut ObjectHeader {
        each_variant!(self, inner => inner.header_mut())
    }

    pub fn id(&self) -> Option<i64> {
        self.header().id
    }

    /// Reference to this object, once it has been persisted.
    pub fn object_ref(&self) -> Option<ObjectRef> {
        self.id().map(|id| ObjectRef::new(self.kind(), id))
    }

    /// Free-text description, for the variants that carry one.
    pub fn description(&self) -> Option<&str> {
        match self {
            ModelObject::Image(image) => image.description.as_deref(),
            ModelObject::TagAnnotation(tag) => tag.description.as_deref(),
            _ => None,
        }
    }

    pub fn set_description(&mut self, description: Option<String>) -> Result<(), ModelError> {
        self.write_field("Description", description.into())
    }
}

impl FieldAccess for ModelObject {
    fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    fn readable_fields(&self) -> std::collections::BTreeSet<&'static str> {
        each_variant!(self, inner => inner.readable_fields())
    }

    fn writable_fields(&self) -> std::collections::BTreeSet<&'static str> {
        each_variant!(self, inner => inner.writable_fields())
    }

    fn read_field(&self, field: &str) -> Result<FieldValue, ModelError> {
        each_variant!(self, inner => inner.read_field(field))
    }

    fn write_field(&mut self, field: &str, value: FieldValue) -> Result<(), ModelError> {
        each_variant!(self, inner => inner.write_field(field, value))
    }
}

macro_rules! model_variant {
    ($variant:ident) => {
        impl From<$variant> for ModelObject {
            fn from(value: $variant) -> Self {
                ModelObject::$variant(value)
            }
        }

        impl TryFrom<ModelObject> for $variant {
            type Error = ModelError;

            fn try_from(value: ModelObject) -> Result<Self, Self::Error> {
                match value {
                    ModelObject::$variant(inner) => Ok(inner),
                    other => Err(ModelError::WrongKind {
                        expected: ObjectKind::$variant,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

model_variant!(Image);
model_variant!(Pixels);
model_variant!(Channel);
model_variant!(LogicalChannel);
model_variant!(TagAnnotation);
model_variant!(AnnotationAnnotationLink);
