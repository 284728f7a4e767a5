// src/services/photo_validator.rs
use crate::errors::AutoCheckError;
use crate::models::{Photo, PhotoPosition};
use image::ImageFormat as ImgFormat;
use std::collections::BTreeMap;

pub const ACCEPTED_CONTENT_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/heif", "image/heic"];

pub struct PhotoValidator {
    max_bytes: usize,
}

impl PhotoValidator {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn validate_photo(&self, photo: &Photo) -> Result<(), AutoCheckError> {
        let content_type = photo.content_type.to_ascii_lowercase();
        if !ACCEPTED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(AutoCheckError::Validation(format!(
                "{} has unsupported type {}; use JPEG, PNG or HEIF",
                photo.file_name, photo.content_type
            )));
        }

        if photo.data.is_empty() {
            return Err(AutoCheckError::Validation(format!(
                "{} is empty",
                photo.file_name
            )));
        }

        if photo.data.len() > self.max_bytes {
            return Err(AutoCheckError::Validation(format!(
                "{} exceeds the {} byte limit",
                photo.file_name, self.max_bytes
            )));
        }

        // HEIF is passed through; the image crate cannot sniff it.
        let expected = match content_type.as_str() {
            "image/jpeg" => Some(ImgFormat::Jpeg),
            "image/png" => Some(ImgFormat::Png),
            _ => None,
        };
        if let Some(expected) = expected {
            let sniffed = image::guess_format(&photo.data).map_err(|e| {
                AutoCheckError::Validation(format!(
                    "{} is not a readable image: {}",
                    photo.file_name, e
                ))
            })?;
            if sniffed != expected {
                return Err(AutoCheckError::Validation(format!(
                    "{} is declared as {} but contains {:?}",
                    photo.file_name, photo.content_type, sniffed
                )));
            }
        }

        Ok(())
    }
}

/// Photos keyed by position, at most one per position.
#[derive(Debug, Clone, Default)]
pub struct PhotoSet {
    photos: BTreeMap<PhotoPosition, Photo>,
}

impl PhotoSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the photo and returns the one it replaced.
    pub fn insert(&mut self, position: PhotoPosition, photo: Photo) -> Option<Photo> {
        self.photos.insert(position, photo)
    }

    pub fn positions(&self) -> Vec<PhotoPosition> {
        self.photos.keys().copied().collect()
    }

    pub fn missing_required(&self) -> Vec<PhotoPosition> {
        PhotoPosition::REQUIRED
            .into_iter()
            .filter(|position| !self.photos.contains_key(position))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn clear(&mut self) {
        self.photos.clear();
    }

    /// Splits into the parallel file and position lists the upload call takes.
    pub fn into_upload(self) -> (Vec<Photo>, Vec<PhotoPosition>) {
        self.photos
            .into_iter()
            .map(|(position, photo)| (photo, position))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

    fn photo(content_type: &str, data: &[u8]) -> Photo {
        Photo {
            file_name: "car.img".to_string(),
            content_type: content_type.to_string(),
            data: Bytes::copy_from_slice(data),
        }
    }

    #[test]
    fn accepts_matching_jpeg_png_and_heif() {
        let validator = PhotoValidator::new(1024);
        assert!(validator.validate_photo(&photo("image/jpeg", JPEG_MAGIC)).is_ok());
        assert!(validator.validate_photo(&photo("image/PNG", PNG_MAGIC)).is_ok());
        assert!(validator.validate_photo(&photo("image/heif", b"....ftypheic")).is_ok());
    }

    #[test]
    fn rejects_other_types_and_mismatched_content() {
        let validator = PhotoValidator::new(1024);
        assert!(validator.validate_photo(&photo("image/gif", b"GIF89a")).is_err());
        assert!(validator.validate_photo(&photo("image/jpeg", PNG_MAGIC)).is_err());
        assert!(validator.validate_photo(&photo("image/png", b"not an image")).is_err());
    }

    #[test]
    fn rejects_empty_and_oversized_files() {
        let validator = PhotoValidator::new(8);
        assert!(validator.validate_photo(&photo("image/jpeg", b"")).is_err());
        let err = validator.validate_photo(&photo("image/png", PNG_MAGIC)).unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn photo_set_tracks_required_positions() {
        let mut set = PhotoSet::new();
        assert_eq!(set.missing_required().len(), 4);

        for position in [PhotoPosition::Front, PhotoPosition::Rear, PhotoPosition::Left] {
            set.insert(position, photo("image/jpeg", JPEG_MAGIC));
        }
        set.insert(PhotoPosition::Other, photo("image/jpeg", JPEG_MAGIC));
        assert_eq!(set.missing_required(), vec![PhotoPosition::Right]);
        assert!(!set.is_complete());

        set.insert(PhotoPosition::Right, photo("image/jpeg", JPEG_MAGIC));
        assert!(set.is_complete());

        let (files, positions) = set.into_upload();
        assert_eq!(files.len(), 5);
        assert_eq!(
            positions,
            vec![
                PhotoPosition::Front,
                PhotoPosition::Rear,
                PhotoPosition::Left,
                PhotoPosition::Right,
                PhotoPosition::Other
            ]
        );
    }

    #[test]
    fn replacing_a_position_keeps_one_photo() {
        let mut set = PhotoSet::new();
        assert!(set.insert(PhotoPosition::Front, photo("image/jpeg", JPEG_MAGIC)).is_none());
        assert!(set.insert(PhotoPosition::Front, photo("image/png", PNG_MAGIC)).is_some());
        assert_eq!(set.len(), 1);

        let (files, _) = set.into_upload();
        assert_eq!(files[0].content_type, "image/png");
    }
}
