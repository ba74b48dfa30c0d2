use super::fields::{field, read_details, read_id, write_id, Described, FieldDescriptor};
use super::{ObjectHeader, ObjectKind, ObjectRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(flatten)]
    pub header: ObjectHeader,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Milliseconds since the epoch.
    pub acquisition_date: Option<i64>,
    pub archived: Option<bool>,
    pub partial: Option<bool>,
    pub series: Option<i64>,
    pub format: Option<String>,
    /// Maintained by the server when pixels are attached.
    pub primary_pixels: Option<ObjectRef>,
}

static IMAGE_FIELDS: &[FieldDescriptor<Image>] = &[
    field!("Id", rw, read_id::<Image>, write_id::<Image>),
    field!("Details", ro, read_details::<Image>),
    field!(
        "Name",
        rw,
        |o: &Image| o.name.clone().into(),
        |o: &mut Image, v| {
            o.name = v.into_text("Name")?;
            Ok(())
        }
    ),
    field!(
        "Description",
        rw,
        |o: &Image| o.description.clone().into(),
        |o: &mut Image, v| {
            o.description = v.into_text("Description")?;
            Ok(())
        }
    ),
    field!(
        "AcquisitionDate",
        rw,
        |o: &Image| o.acquisition_date.into(),
        |o: &mut Image, v| {
            o.acquisition_date = v.into_int("AcquisitionDate")?;
            Ok(())
        }
    ),
    field!(
        "Archived",
        rw,
        |o: &Image| o.archived.into(),
        |o: &mut Image, v| {
            o.archived = v.into_bool("Archived")?;
            Ok(())
        }
    ),
    field!(
        "Partial",
        rw,
        |o: &Image| o.partial.into(),
        |o: &mut Image, v| {
            o.partial = v.into_bool("Partial")?;
            Ok(())
        }
    ),
    field!(
        "Series",
        rw,
        |o: &Image| o.series.into(),
        |o: &mut Image, v| {
            o.series = v.into_int("Series")?;
            Ok(())
        }
    ),
    field!(
        "Format",
        rw,
        |o: &Image| o.format.clone().into(),
        |o: &mut Image, v| {
            o.format = v.into_text("Format")?;
            Ok(())
        }
    ),
    field!("PrimaryPixels", ro, |o: &Image| o.primary_pixels.into()),
];

impl Described for Image {
    const KIND: ObjectKind = ObjectKind::Image;

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        IMAGE_FIELDS
    }

    fn header(&self) -> &ObjectHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ObjectHeader {
        &mut self.header
    }
}

/// Pixel set dimensions and physical calibration. Plane data is not modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pixels {
    #[serde(flatten)]
    pub header: ObjectHeader,
    pub image: Option<ObjectRef>,
    pub size_x: Option<i64>,
    pub size_y: Option<i64>,
    pub size_z: Option<i64>,
    pub size_c: Option<i64>,
    pub size_t: Option<i64>,
    pub pixels_type: Option<String>,
    pub dimension_order: Option<String>,
    pub physical_size_x: Option<f64>,
    pub physical_size_y: Option<f64>,
    pub physical_size_z: Option<f64>,
    pub significant_bits: Option<i64>,
    pub sha1: Option<String>,
}

fn dimension(field: &'static str, value: super::FieldValue) -> Result<Option<i64>, super::ModelError> {
    match value.into_int(field)? {
        Some(v) if v < 1 => Err(super::ModelError::Rejected {
            field,
            reason: format!("dimension {} must be at least 1", v),
        }),
        other => Ok(other),
    }
}

static PIXELS_FIELDS: &[FieldDescriptor<Pixels>] = &[
    field!("Id", rw, read_id::<Pixels>, write_id::<Pixels>),
    field!("Details", ro, read_details::<Pixels>),
    field!(
        "Image",
        rw,
        |o: &Pixels| o.image.into(),
        |o: &mut Pixels, v| {
            o.image = v.into_ref("Image", ObjectKind::Image)?;
            Ok(())
        }
    ),
    field!(
        "SizeX",
        rw,
        |o: &Pixels| o.size_x.into(),
        |o: &mut Pixels, v| {
            o.size_x = dimension("SizeX", v)?;
            Ok(())
        }
    ),
    field!(
        "SizeY",
        rw,
        |o: &Pixels| o.size_y.into(),
        |o: &mut Pixels, v| {
            o.size_y = dimension("SizeY", v)?;
            Ok(())
        }
    ),
    field!(
        "SizeZ",
        rw,
        |o: &Pixels| o.size_z.into(),
        |o: &mut Pixels, v| {
            o.size_z = dimension("SizeZ", v)?;
            Ok(())
        }
    ),
    field!(
        "SizeC",
        rw,
        |o: &Pixels| o.size_c.into(),
        |o: &mut Pixels, v| {
            o.size_c = dimension("SizeC", v)?;
            Ok(())
        }
    ),
    field!(
        "SizeT",
        rw,
        |o: &Pixels| o.size_t.into(),
        |o: &mut Pixels, v| {
            o.size_t = dimension("SizeT", v)?;
            Ok(())
        }
    ),
    field!(
        "PixelsType",
        rw,
        |o: &Pixels| o.pixels_type.clone().into(),
        |o: &mut Pixels, v| {
            o.pixels_type = v.into_text("PixelsType")?;
            Ok(())
        }
    ),
    field!(
        "DimensionOrder",
        rw,
        |o: &Pixels| o.dimension_order.clone().into(),
        |o: &mut Pixels, v| {
            o.dimension_order = v.into_text("DimensionOrder")?;
            Ok(())
        }
    ),
    field!(
        "PhysicalSizeX",
        rw,
        |o: &Pixels| o.physical_size_x.into(),
        |o: &mut Pixels, v| {
            o.physical_size_x = v.into_float("PhysicalSizeX")?;
            Ok(())
        }
    ),
    field!(
        "PhysicalSizeY",
        rw,
        |o: &Pixels| o.physical_size_y.into(),
        |o: &mut Pixels, v| {
            o.physical_size_y = v.into_float("PhysicalSizeY")?;
            Ok(())
        }
    ),
    field!(
        "PhysicalSizeZ",
        rw,
        |o: &Pixels| o.physical_size_z.into(),
        |o: &mut Pixels, v| {
            o.physical_size_z = v.into_float("PhysicalSizeZ")?;
            Ok(())
        }
    ),
    field!(
        "SignificantBits",
        rw,
        |o: &Pixels| o.significant_bits.into(),
        |o: &mut Pixels, v| {
            o.significant_bits = v.into_int("SignificantBits")?;
            Ok(())
        }
    ),
    field!(
        "Sha1",
        rw,
        |o: &Pixels| o.sha1.clone().into(),
        |o: &mut Pixels, v| {
            o.sha1 = v.into_text("Sha1")?;
            Ok(())
        }
    ),
];

impl Described for Pixels {
    const KIND: ObjectKind = ObjectKind::Pixels;

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        PIXELS_FIELDS
    }

    fn header(&self) -> &ObjectHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ObjectHeader {
        &mut self.header
    }
}
