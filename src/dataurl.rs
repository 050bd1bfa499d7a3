//! Data url conversion for file payloads.
//!
//! Reference images cross the message channel as `data:` urls; this
//! module converts between that form and [`FileUpload`] bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, Result};
use crate::models::FileUpload;

/// Encodes raw bytes as a base64 data url.
pub fn to_data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

/// Decodes a base64 data url into an upload-ready file.
///
/// A missing or empty mime section yields an empty mime type rather
/// than an error; only a missing payload separator or bad base64 fails.
pub fn parse_data_url(data_url: &str, filename: &str) -> Result<FileUpload> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| Error::unknown("malformed data url"))?;

    let mime_type = header
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .unwrap_or_default();

    let data = STANDARD
        .decode(payload)
        .map_err(|error| Error::unknown(format!("invalid base64 payload: {error}")))?;

    Ok(FileUpload::new(filename, mime_type, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

    #[test]
    fn test_to_data_url() {
        assert_eq!(
            to_data_url("image/png", &PNG_MAGIC),
            "data:image/png;base64,iVBORw=="
        );
        assert_eq!(to_data_url("text/plain", &[]), "data:text/plain;base64,");
    }

    #[test]
    fn test_parse_round_trip() {
        let url = to_data_url("image/png", &PNG_MAGIC);
        let file = parse_data_url(&url, "ref.png").unwrap();
        assert_eq!(file.name, "ref.png");
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.data, PNG_MAGIC);
    }

    #[test]
    fn test_parse_extra_header_parameters() {
        let file = parse_data_url("data:text/plain;charset=utf-8;base64,SGk=", "a.txt").unwrap();
        assert_eq!(file.mime_type, "text/plain");
        assert_eq!(file.data, b"Hi");
    }

    #[test]
    fn test_parse_empty_mime() {
        let file = parse_data_url("data:;base64,AA==", "raw.bin").unwrap();
        assert_eq!(file.mime_type, "");
        assert_eq!(file.data, vec![0]);
    }

    #[test]
    fn test_parse_failures() {
        let err = parse_data_url("not a data url", "a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);

        let err = parse_data_url("data:image/png;base64,%%%", "a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }
}
