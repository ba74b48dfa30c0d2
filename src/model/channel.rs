use super::fields::{
    color_component, field, positive, read_details, read_id, write_id, Described, FieldDescriptor,
};
use super::{ObjectHeader, ObjectKind, ObjectRef};
use serde::{Deserialize, Serialize};

/// Per-pixels rendering of one logical channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(flatten)]
    pub header: ObjectHeader,
    pub pixels: Option<ObjectRef>,
    pub logical_channel: Option<ObjectRef>,
    pub red: Option<i64>,
    pub green: Option<i64>,
    pub blue: Option<i64>,
    pub alpha: Option<i64>,
    pub lookup_table: Option<String>,
    #[serde(default)]
    pub annotation_links_count: i64,
}

static CHANNEL_FIELDS: &[FieldDescriptor<Channel>] = &[
    field!("Id", rw, read_id::<Channel>, write_id::<Channel>),
    field!("Details", ro, read_details::<Channel>),
    field!(
        "Pixels",
        rw,
        |o: &Channel| o.pixels.into(),
        |o: &mut Channel, v| {
            o.pixels = v.into_ref("Pixels", ObjectKind::Pixels)?;
            Ok(())
        }
    ),
    field!(
        "LogicalChannel",
        rw,
        |o: &Channel| o.logical_channel.into(),
        |o: &mut Channel, v| {
            o.logical_channel = v.into_ref("LogicalChannel", ObjectKind::LogicalChannel)?;
            Ok(())
        }
    ),
    field!(
        "Red",
        rw,
        |o: &Channel| o.red.into(),
        |o: &mut Channel, v| {
            o.red = color_component("Red", v)?;
            Ok(())
        }
    ),
    field!(
        "Green",
        rw,
        |o: &Channel| o.green.into(),
        |o: &mut Channel, v| {
            o.green = color_component("Green", v)?;
            Ok(())
        }
    ),
    field!(
        "Blue",
        rw,
        |o: &Channel| o.blue.into(),
        |o: &mut Channel, v| {
            o.blue = color_component("Blue", v)?;
            Ok(())
        }
    ),
    field!(
        "Alpha",
        rw,
        |o: &Channel| o.alpha.into(),
        |o: &mut Channel, v| {
            o.alpha = color_component("Alpha", v)?;
            Ok(())
        }
    ),
    field!(
        "LookupTable",
        rw,
        |o: &Channel| o.lookup_table.clone().into(),
        |o: &mut Channel, v| {
            o.lookup_table = v.into_text("LookupTable")?;
            Ok(())
        }
    ),
    field!("AnnotationLinksCountPerOwner", ro, |o: &Channel| {
        Some(o.annotation_links_count).into()
    }),
];

impl Described for Channel {
    const KIND: ObjectKind = ObjectKind::Channel;

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        CHANNEL_FIELDS
    }

    fn header(&self) -> &ObjectHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ObjectHeader {
        &mut self.header
    }
}

/// Acquisition properties shared by channels of the same wavelength.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicalChannel {
    #[serde(flatten)]
    pub header: ObjectHeader,
    pub name: Option<String>,
    pub emission_wave: Option<f64>,
    pub excitation_wave: Option<f64>,
    pub fluor: Option<String>,
    pub nd_filter: Option<f64>,
    pub pinhole_size: Option<f64>,
    pub pockel_cell_setting: Option<i64>,
    pub samples_per_pixel: Option<i64>,
    pub contrast_method: Option<String>,
    pub illumination: Option<String>,
    pub mode: Option<String>,
    /// Id of the detector settings on the owning server.
    pub detector_settings: Option<i64>,
}

static LOGICAL_CHANNEL_FIELDS: &[FieldDescriptor<LogicalChannel>] = &[
    field!("Id", rw, read_id::<LogicalChannel>, write_id::<LogicalChannel>),
    field!("Details", ro, read_details::<LogicalChannel>),
    field!(
        "Name",
        rw,
        |o: &LogicalChannel| o.name.clone().into(),
        |o: &mut LogicalChannel, v| {
            o.name = v.into_text("Name")?;
            Ok(())
        }
    ),
    field!(
        "EmissionWave",
        rw,
        |o: &LogicalChannel| o.emission_wave.into(),
        |o: &mut LogicalChannel, v| {
            o.emission_wave = positive("EmissionWave", v.into_float("EmissionWave")?)?;
            Ok(())
        }
    ),
    field!(
        "ExcitationWave",
        rw,
        |o: &LogicalChannel| o.excitation_wave.into(),
        |o: &mut LogicalChannel, v| {
            o.excitation_wave = positive("ExcitationWave", v.into_float("ExcitationWave")?)?;
            Ok(())
        }
    ),
    field!(
        "Fluor",
        rw,
        |o: &LogicalChannel| o.fluor.clone().into(),
        |o: &mut LogicalChannel, v| {
            o.fluor = v.into_text("Fluor")?;
            Ok(())
        }
    ),
    field!(
        "NdFilter",
        rw,
        |o: &LogicalChannel| o.nd_filter.into(),
        |o: &mut LogicalChannel, v| {
            o.nd_filter = v.into_float("NdFilter")?;
            Ok(())
        }
    ),
    field!(
        "PinHoleSize",
        rw,
        |o: &LogicalChannel| o.pinhole_size.into(),
        |o: &mut LogicalChannel, v| {
            o.pinhole_size = positive("PinHoleSize", v.into_float("PinHoleSize")?)?;
            Ok(())
        }
    ),
    field!(
        "PockelCellSetting",
        rw,
        |o: &LogicalChannel| o.pockel_cell_setting.into(),
        |o: &mut LogicalChannel, v| {
            o.pockel_cell_setting = v.into_int("PockelCellSetting")?;
            Ok(())
        }
    ),
    field!(
        "SamplesPerPixel",
        rw,
        |o: &LogicalChannel| o.samples_per_pixel.into(),
        |o: &mut LogicalChannel, v| {
            o.samples_per_pixel = v.into_int("SamplesPerPixel")?;
            Ok(())
        }
    ),
    field!(
        "ContrastMethod",
        rw,
        |o: &LogicalChannel| o.contrast_method.clone().into(),
        |o: &mut LogicalChannel, v| {
            o.contrast_method = v.into_text("ContrastMethod")?;
            Ok(())
        }
    ),
    field!(
        "Illumination",
        rw,
        |o: &LogicalChannel| o.illumination.clone().into(),
        |o: &mut LogicalChannel, v| {
            o.illumination = v.into_text("Illumination")?;
            Ok(())
        }
    ),
    field!(
        "Mode",
        rw,
        |o: &LogicalChannel| o.mode.clone().into(),
        |o: &mut LogicalChannel, v| {
            o.mode = v.into_text("Mode")?;
            Ok(())
        }
    ),
    // Detector settings live in the instrument graph, which is never copied.
    field!(
        "DetectorSettings",
        rw,
        |o: &LogicalChannel| o.detector_settings.into(),
        |o: &mut LogicalChannel, v| {
            o.detector_settings = v.into_int("DetectorSettings")?;
            Ok(())
        }
    ),
];

impl Described for LogicalChannel {
    const KIND: ObjectKind = ObjectKind::LogicalChannel;

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        LOGICAL_CHANNEL_FIELDS
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
    use crate::model::{FieldAccess, FieldValue, ModelError};

    #[test]
    fn test_color_components_are_range_checked() {
        let mut channel = Channel::default();
        assert!(matches!(
            channel.write_field("Red", FieldValue::Int(300)),
            Err(ModelError::Rejected { field: "Red", .. })
        ));
        channel.write_field("Red", FieldValue::Int(255)).unwrap();
        assert_eq!(channel.red, Some(255));
    }

    #[test]
    fn test_annotation_link_count_is_not_writable() {
        let channel = Channel::default();
        let readable = channel.readable_fields();
        let writable = channel.writable_fields();
        assert!(readable.contains("AnnotationLinksCountPerOwner"));
        assert!(!writable.contains("AnnotationLinksCountPerOwner"));
    }

    #[test]
    fn test_emission_wave_accepts_integer_nanometres() {
        let mut lc = LogicalChannel::default();
        lc.write_field("EmissionWave", FieldValue::Int(520)).unwrap();
        assert_eq!(lc.emission_wave, Some(520.0));
        assert!(lc.write_field("EmissionWave", FieldValue::Float(-1.0)).is_err());
    }
}
