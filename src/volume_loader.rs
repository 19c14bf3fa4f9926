use crate::enums::SortBy;
use crate::geometry::{self, Point3};
use crate::volume::{ImagePlane, ImageVolume, VolumeError, VolumeGeometry};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, s};
use rayon::prelude::*;
use std::{fs, path::Path};
use thiserror::Error;

/// Slice distances below this are treated as coincident positions
const MIN_SLICE_DISTANCE: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("Image orientation does not span a plane")]
    InvalidOrientation,

    #[error("Invalid volume: {0}")]
    Volume(#[from] VolumeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}

/// Geometry attributes of one acquired image
#[derive(Debug, Clone, PartialEq)]
pub struct SliceHeader {
    /// SOP Instance UID
    pub image_id: String,
    pub image_position_patient: Point3,
    /// Direction of increasing column index, then of increasing row index
    pub image_orientation_patient: [Point3; 2],
    /// Distance between rows, then between columns
    pub pixel_spacing: Option<[f64; 2]>,
    pub slice_thickness: Option<f64>,
    pub instance_number: Option<i32>,
}

impl SliceHeader {
    /// Read the geometry attributes of `dicom_object`.
    ///
    /// Returns `None` if the image id, position or orientation is missing.
    pub fn from_dicom_object(dicom_object: &InMemDicomObject) -> Option<Self> {
        let image_id = dicom_object
            .element(tags::SOP_INSTANCE_UID)
            .ok()?
            .to_str()
            .ok()?
            .trim_end_matches(['\0', ' '])
            .to_owned();

        let position = dicom_object
            .element(tags::IMAGE_POSITION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        let orientation = dicom_object
            .element(tags::IMAGE_ORIENTATION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        let (&[x, y, z], &[rx, ry, rz, cx, cy, cz]) = (position.as_slice(), orientation.as_slice())
        else {
            return None;
        };

        let pixel_spacing = dicom_object
            .element(tags::PIXEL_SPACING)
            .ok()
            .and_then(|element| element.to_multi_float64().ok())
            .and_then(|spacing| match spacing.as_slice() {
                &[row, column] => Some([row, column]),
                _ => None,
            });
        let slice_thickness = dicom_object
            .element(tags::SLICE_THICKNESS)
            .ok()
            .and_then(|element| element.to_float64().ok());
        let instance_number = dicom_object
            .element(tags::INSTANCE_NUMBER)
            .ok()
            .and_then(|element| element.to_int::<i32>().ok());

        Some(Self {
            image_id,
            image_position_patient: [x, y, z],
            image_orientation_patient: [[rx, ry, rz], [cx, cy, cz]],
            pixel_spacing,
            slice_thickness,
            instance_number,
        })
    }

    /// Unit normal of the image plane
    pub fn normal(&self) -> Option<Point3> {
        let [row, column] = self.image_orientation_patient;
        geometry::normalize(geometry::cross(row, column))
    }
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `volume_id` - Id the volume is cached under
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found, dimensions are inconsistent
    /// or the images carry no usable geometry
    pub fn load_from_dicom_objects(
        volume_id: impl Into<String>,
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<ImageVolume, VolumeLoaderError> {
        let mut slices: Vec<_> = dicom_objects
            .par_iter()
            .filter_map(|dicom_object| {
                let Some(header) = SliceHeader::from_dicom_object(dicom_object) else {
                    log::warn!("Skipping DICOM object without image geometry");
                    return None;
                };
                let image = Self::decode_image(dicom_object)?;
                Some((header, image))
            })
            .collect();

        if slices.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::sort_slices(&mut slices, &sort_by)?;
        let (headers, images): (Vec<_>, Vec<_>) = slices.into_iter().unzip();

        Self::validate_dimensions(&images)?;
        let geometry = Self::volume_geometry(&headers)?;
        let volume_array = Self::build_volume_array(&images);

        let image_planes = headers
            .into_iter()
            .map(|header| ImagePlane {
                image_id: header.image_id,
                image_position_patient: header.image_position_patient,
            })
            .collect();

        let volume = ImageVolume::with_image_planes(volume_id, volume_array, geometry, image_planes)?;
        log::debug!(
            "Loaded volume {} with dimensions {:?}",
            volume.volume_id,
            volume.dimensions()
        );
        Ok(volume)
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        volume_id: impl Into<String>,
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
    ) -> Result<ImageVolume, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> =
            paths.iter().map(|path| open_file(path.as_ref())).collect();

        Self::load_from_dicom_objects(volume_id, &objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        volume_id: impl Into<String>,
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<ImageVolume, VolumeLoaderError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::load_from_file_paths(volume_id, &paths, sort_by)
    }

    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<u16>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        pixel_data
            .to_ndarray_with_options::<u16>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    /// Order slices along the acquisition direction.
    ///
    /// Positions are projected onto the image normal, so this also works for
    /// tilted acquisitions.
    pub fn sort_slices<T>(
        slices: &mut [(SliceHeader, T)],
        sort_by: &SortBy,
    ) -> Result<(), VolumeLoaderError> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let normal = slices
                    .first()
                    .and_then(|(header, _)| header.normal())
                    .ok_or(VolumeLoaderError::InvalidOrientation)?;
                slices.sort_by(|(a, _), (b, _)| {
                    let a = geometry::dot(a.image_position_patient, normal);
                    let b = geometry::dot(b.image_position_patient, normal);
                    a.total_cmp(&b)
                });
            }
            SortBy::InstanceNumber => {
                slices.sort_by_key(|(header, _)| header.instance_number.unwrap_or(i32::MAX));
            }
            SortBy::None => {}
        }
        Ok(())
    }

    /// Geometry of a volume made of the already sorted `headers`.
    ///
    /// The slice axis points from the first to the last image position. Slice
    /// spacing is the mean distance between positions, or the slice thickness
    /// for single images.
    pub fn volume_geometry(headers: &[SliceHeader]) -> Result<VolumeGeometry, VolumeLoaderError> {
        let (Some(first), Some(last)) = (headers.first(), headers.last()) else {
            return Err(VolumeLoaderError::NoValidImages);
        };
        let normal = first.normal().ok_or(VolumeLoaderError::InvalidOrientation)?;
        let [row_spacing, column_spacing] = headers
            .iter()
            .find_map(|header| header.pixel_spacing)
            .ok_or(VolumeLoaderError::MissingSpacing)?;

        let span = geometry::sub(last.image_position_patient, first.image_position_patient);
        let distance = geometry::length(span);

        let (k_axis, slice_spacing) = if headers.len() > 1 && distance > MIN_SLICE_DISTANCE {
            let k_axis = geometry::normalize(span).unwrap_or(normal);
            (k_axis, distance / (headers.len() - 1) as f64)
        } else {
            let thickness = headers
                .iter()
                .find_map(|header| header.slice_thickness)
                .filter(|thickness| *thickness > 0.0)
                .unwrap_or(1.0);
            (normal, thickness)
        };

        let [row_direction, column_direction] = first.image_orientation_patient;
        Ok(VolumeGeometry {
            origin: first.image_position_patient,
            spacing: [column_spacing, row_spacing, slice_spacing],
            direction: [row_direction, column_direction, k_axis],
        })
    }

    fn validate_dimensions(images: &[Array2<u16>]) -> Result<(), VolumeLoaderError> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(images: &[Array2<u16>]) -> Array3<u16> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<u16>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::{DataElement, PrimitiveValue, VR, dicom_value};

    fn header(image_id: &str, z: f64, instance_number: i32) -> SliceHeader {
        SliceHeader {
            image_id: image_id.to_string(),
            image_position_patient: [-100.0, -100.0, z],
            image_orientation_patient: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            pixel_spacing: Some([0.5, 0.7]),
            slice_thickness: Some(3.0),
            instance_number: Some(instance_number),
        }
    }

    #[test]
    fn test_header_from_dicom_object() {
        let object = InMemDicomObject::from_element_iter([
            DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from("1.2.3\0")),
            DataElement::new(
                tags::IMAGE_POSITION_PATIENT,
                VR::DS,
                dicom_value!(F64, [-100.0, -100.0, 12.5]),
            ),
            DataElement::new(
                tags::IMAGE_ORIENTATION_PATIENT,
                VR::DS,
                dicom_value!(F64, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            ),
            DataElement::new(tags::PIXEL_SPACING, VR::DS, dicom_value!(F64, [0.5, 0.7])),
            DataElement::new(tags::INSTANCE_NUMBER, VR::IS, dicom_value!(I32, [4])),
        ]);

        let header = SliceHeader::from_dicom_object(&object).expect("geometry present");
        assert_eq!(header.image_id, "1.2.3");
        assert_eq!(header.image_position_patient, [-100.0, -100.0, 12.5]);
        assert_eq!(header.pixel_spacing, Some([0.5, 0.7]));
        assert_eq!(header.slice_thickness, None);
        assert_eq!(header.instance_number, Some(4));
        assert_eq!(header.normal(), Some([0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_header_requires_orientation() {
        let object = InMemDicomObject::from_element_iter([
            DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from("1.2.3")),
            DataElement::new(
                tags::IMAGE_POSITION_PATIENT,
                VR::DS,
                dicom_value!(F64, [0.0, 0.0, 0.0]),
            ),
        ]);
        assert!(SliceHeader::from_dicom_object(&object).is_none());
    }

    #[test]
    fn test_sort_by_position_along_normal() {
        let mut slices = vec![
            (header("b", 6.0, 1), ()),
            (header("a", 0.0, 3), ()),
            (header("c", 3.0, 2), ()),
        ];
        VolumeLoader::sort_slices(&mut slices, &SortBy::ImagePositionPatient).unwrap();
        let ids: Vec<_> = slices.iter().map(|(h, _)| h.image_id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "b"]);

        VolumeLoader::sort_slices(&mut slices, &SortBy::InstanceNumber).unwrap();
        let ids: Vec<_> = slices.iter().map(|(h, _)| h.image_id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn test_volume_geometry() {
        let headers = [header("a", 0.0, 1), header("b", 2.5, 2), header("c", 5.0, 3)];
        let geometry = VolumeLoader::volume_geometry(&headers).unwrap();
        assert_eq!(geometry.origin, [-100.0, -100.0, 0.0]);
        assert_eq!(geometry.spacing, [0.7, 0.5, 2.5]);
        assert_eq!(geometry.direction[2], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_volume_geometry_descending_positions() {
        let headers = [header("a", 5.0, 1), header("b", 0.0, 2)];
        let geometry = VolumeLoader::volume_geometry(&headers).unwrap();
        assert_eq!(geometry.direction[2], [0.0, 0.0, -1.0]);
        assert_eq!(geometry.spacing[2], 5.0);
    }

    #[test]
    fn test_single_image_uses_slice_thickness() {
        let geometry = VolumeLoader::volume_geometry(&[header("a", 0.0, 1)]).unwrap();
        assert_eq!(geometry.spacing[2], 3.0);
        assert_eq!(geometry.direction[2], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_missing_pixel_spacing() {
        let mut only = header("a", 0.0, 1);
        only.pixel_spacing = None;
        assert!(matches!(
            VolumeLoader::volume_geometry(&[only]),
            Err(VolumeLoaderError::MissingSpacing)
        ));
    }

    #[test]
    fn test_missing_directory() {
        let result = VolumeLoader::load_from_directory(
            "vol",
            "/nonexistent/dicom-roi-test",
            SortBy::default(),
        );
        assert!(matches!(result, Err(VolumeLoaderError::Io(_))));
    }
}
