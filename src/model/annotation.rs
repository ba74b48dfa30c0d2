use super::fields::{field, read_details, read_id, write_id, Described, FieldDescriptor};
use super::{ObjectHeader, ObjectKind, ObjectRef};
use serde::{Deserialize, Serialize};

/// Namespace that marks a tag as a tagset (a tag grouping other tags).
pub const TAGSET_NAMESPACE: &str = "openmicroscopy.org/omero/insight/tagset";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagAnnotation {
    #[serde(flatten)]
    pub header: ObjectHeader,
    pub name: Option<String>,
    pub description: Option<String>,
    pub namespace: Option<String>,
    pub value: Option<String>,
}

impl TagAnnotation {
    pub fn is_tagset(&self) -> bool {
        self.namespace.as_deref() == Some(TAGSET_NAMESPACE)
    }
}

static TAG_FIELDS: &[FieldDescriptor<TagAnnotation>] = &[
    field!("Id", rw, read_id::<TagAnnotation>, write_id::<TagAnnotation>),
    field!("Details", ro, read_details::<TagAnnotation>),
    field!(
        "Name",
        rw,
        |o: &TagAnnotation| o.name.clone().into(),
        |o: &mut TagAnnotation, v| {
            o.name = v.into_text("Name")?;
            Ok(())
        }
    ),
    field!(
        "Description",
        rw,
        |o: &TagAnnotation| o.description.clone().into(),
        |o: &mut TagAnnotation, v| {
            o.description = v.into_text("Description")?;
            Ok(())
        }
    ),
    field!(
        "Namespace",
        rw,
        |o: &TagAnnotation| o.namespace.clone().into(),
        |o: &mut TagAnnotation, v| {
            o.namespace = v.into_text("Namespace")?;
            Ok(())
        }
    ),
    field!(
        "Value",
        rw,
        |o: &TagAnnotation| o.value.clone().into(),
        |o: &mut TagAnnotation, v| {
            o.value = v.into_text("Value")?;
            Ok(())
        }
    ),
];

impl Described for TagAnnotation {
    const KIND: ObjectKind = ObjectKind::TagAnnotation;

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        TAG_FIELDS
    }

    fn header(&self) -> &ObjectHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ObjectHeader {
        &mut self.header
    }
}

/// Parent/child link between two annotations; a tag under a tagset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationAnnotationLink {
    #[serde(flatten)]
    pub header: ObjectHeader,
    pub parent: Option<ObjectRef>,
    pub child: Option<ObjectRef>,
}

impl AnnotationAnnotationLink {
    pub fn new(parent: ObjectRef, child: ObjectRef) -> Self {
        Self {
            header: ObjectHeader::default(),
            parent: Some(parent),
            child: Some(child),
        }
    }
}

static LINK_FIELDS: &[FieldDescriptor<AnnotationAnnotationLink>] = &[
    field!(
        "Id",
        rw,
        read_id::<AnnotationAnnotationLink>,
        write_id::<AnnotationAnnotationLink>
    ),
    field!("Details", ro, read_details::<AnnotationAnnotationLink>),
    field!(
        "Parent",
        rw,
        |o: &AnnotationAnnotationLink| o.parent.into(),
        |o: &mut AnnotationAnnotationLink, v| {
            o.parent = v.into_ref("Parent", ObjectKind::TagAnnotation)?;
            Ok(())
        }
    ),
    field!(
        "Child",
        rw,
        |o: &AnnotationAnnotationLink| o.child.into(),
        |o: &mut AnnotationAnnotationLink, v| {
            o.child = v.into_ref("Child", ObjectKind::TagAnnotation)?;
            Ok(())
        }
    ),
];

impl Described for AnnotationAnnotationLink {
    const KIND: ObjectKind = ObjectKind::AnnotationAnnotationLink;

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        LINK_FIELDS
    }

    fn header(&self) -> &ObjectHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ObjectHeader {
        &mut self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldAccess, FieldValue};

    #[test]
    fn test_tag_fields() {
        let tag = TagAnnotation {
            value: Some("nuclei".to_string()),
            namespace: Some("ns1".to_string()),
            ..Default::default()
        };
        assert_eq!(tag.read_field("Value").unwrap(), FieldValue::from("nuclei"));
        assert_eq!(tag.read_field("Namespace").unwrap(), FieldValue::from("ns1"));
        assert_eq!(tag.read_field("Name").unwrap(), FieldValue::Null);
        assert!(!tag.is_tagset());
    }

    #[test]
    fn test_link_only_accepts_annotation_refs() {
        let mut link = AnnotationAnnotationLink::default();
        let image = FieldValue::Ref(ObjectRef::new(ObjectKind::Image, 1));
        assert!(link.write_field("Parent", image).is_err());
        let tag = FieldValue::Ref(ObjectRef::new(ObjectKind::TagAnnotation, 1));
        link.write_field("Parent", tag).unwrap();
        assert_eq!(link.parent, Some(ObjectRef::new(ObjectKind::TagAnnotation, 1)));
    }
}
