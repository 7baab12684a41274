//! Reads identity metadata straight from an APK
//!
//! An APK is a zip archive whose `AndroidManifest.xml` is stored in Android's
//! compiled binary XML format: a chunk stream holding a string pool followed
//! by namespace and element nodes. Only the root `<manifest>` element is
//! decoded.

use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::PackageInspector;
use crate::types::PackageInfo;

const MANIFEST_ENTRY: &str = "AndroidManifest.xml";

const RES_STRING_POOL_TYPE: u16 = 0x0001;
const RES_XML_TYPE: u16 = 0x0003;
const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;

const UTF8_FLAG: u32 = 1 << 8;
const NO_INDEX: u32 = 0xFFFF_FFFF;

const TYPE_STRING: u8 = 0x03;
const TYPE_INT_DEC: u8 = 0x10;
const TYPE_INT_HEX: u8 = 0x11;

/// Binary XML decoding failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest is truncated at offset {0}")]
    Truncated(usize),

    #[error("not a compiled binary XML document")]
    NotBinaryXml,

    #[error("string index {0} is out of range")]
    BadStringIndex(u32),

    #[error("element appears before the string pool")]
    MissingStringPool,

    #[error("no <manifest> element found")]
    MissingManifestElement,

    #[error("manifest has no '{0}' attribute")]
    MissingAttribute(&'static str),

    #[error("manifest attribute '{attribute}' has invalid value '{value}'")]
    InvalidValue { attribute: &'static str, value: String },
}

type DecodeResult<T> = std::result::Result<T, ManifestError>;

/// Little-endian accessors with bounds checks
struct Bytes<'a>(&'a [u8]);

impl<'a> Bytes<'a> {
    fn u8_at(&self, offset: usize) -> DecodeResult<u8> {
        self.0.get(offset).copied().ok_or(ManifestError::Truncated(offset))
    }

    fn u16_at(&self, offset: usize) -> DecodeResult<u16> {
        let bytes = self.slice(offset, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32_at(&self, offset: usize) -> DecodeResult<u32> {
        let bytes = self.slice(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn slice(&self, offset: usize, len: usize) -> DecodeResult<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.0.get(offset..end))
            .ok_or(ManifestError::Truncated(offset))
    }
}

/// Decoded string pool chunk
struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    fn parse(bytes: &Bytes<'_>, start: usize) -> DecodeResult<Self> {
        let header_size = bytes.u16_at(start + 2)? as usize;
        let count = bytes.u32_at(start + 8)? as usize;
        let flags = bytes.u32_at(start + 16)?;
        let strings_start = start + bytes.u32_at(start + 20)? as usize;
        let utf8 = flags & UTF8_FLAG != 0;

        let mut strings = Vec::with_capacity(count.min(4096));
        for i in 0..count {
            let offset = strings_start + bytes.u32_at(start + header_size + i * 4)? as usize;
            let value = if utf8 {
                Self::read_utf8(bytes, offset)?
            } else {
                Self::read_utf16(bytes, offset)?
            };
            strings.push(value);
        }

        Ok(Self { strings })
    }

    fn read_utf8(bytes: &Bytes<'_>, offset: usize) -> DecodeResult<String> {
        // UTF-16 length first, then UTF-8 byte length; only the latter is needed
        let (_, skip) = Self::utf8_length(bytes, offset)?;
        let (len, skip2) = Self::utf8_length(bytes, offset + skip)?;
        let data = bytes.slice(offset + skip + skip2, len)?;
        Ok(String::from_utf8_lossy(data).into_owned())
    }

    fn utf8_length(bytes: &Bytes<'_>, offset: usize) -> DecodeResult<(usize, usize)> {
        let first = bytes.u8_at(offset)? as usize;
        if first & 0x80 != 0 {
            let second = bytes.u8_at(offset + 1)? as usize;
            Ok((((first & 0x7F) << 8) | second, 2))
        } else {
            Ok((first, 1))
        }
    }

    fn read_utf16(bytes: &Bytes<'_>, offset: usize) -> DecodeResult<String> {
        let first = bytes.u16_at(offset)? as usize;
        let (len, skip) = if first & 0x8000 != 0 {
            let second = bytes.u16_at(offset + 2)? as usize;
            (((first & 0x7FFF) << 16) | second, 4)
        } else {
            (first, 2)
        };

        let data = bytes.slice(offset + skip, len * 2)?;
        let units: Vec<u16> = data
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units))
    }

    fn get(&self, index: u32) -> DecodeResult<&str> {
        self.strings
            .get(index as usize)
            .map(String::as_str)
            .ok_or(ManifestError::BadStringIndex(index))
    }
}

/// A decoded attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeValue {
    String(String),
    Int(u32),
}

impl AttributeValue {
    fn into_string(self) -> String {
        match self {
            Self::String(s) => s,
            Self::Int(n) => n.to_string(),
        }
    }
}

/// Decode the `<manifest>` element of a binary manifest
pub fn parse_binary_manifest(data: &[u8]) -> std::result::Result<PackageInfo, ManifestError> {
    let bytes = Bytes(data);
    if bytes.u16_at(0)? != RES_XML_TYPE {
        return Err(ManifestError::NotBinaryXml);
    }

    let mut pos = bytes.u16_at(2)? as usize;
    let end = (bytes.u32_at(4)? as usize).min(data.len());
    let mut pool: Option<StringPool> = None;

    while pos + 8 <= end {
        let chunk_type = bytes.u16_at(pos)?;
        let header_size = bytes.u16_at(pos + 2)? as usize;
        let chunk_size = bytes.u32_at(pos + 4)? as usize;
        if chunk_size < 8 {
            return Err(ManifestError::Truncated(pos));
        }

        match chunk_type {
            RES_STRING_POOL_TYPE => pool = Some(StringPool::parse(&bytes, pos)?),
            RES_XML_START_ELEMENT_TYPE => {
                let pool = pool.as_ref().ok_or(ManifestError::MissingStringPool)?;
                let ext = pos + header_size;
                if pool.get(bytes.u32_at(ext + 4)?)? == "manifest" {
                    return read_manifest_element(&bytes, pool, ext);
                }
            }
            _ => {}
        }

        pos += chunk_size;
    }

    Err(ManifestError::MissingManifestElement)
}

fn read_manifest_element(bytes: &Bytes<'_>, pool: &StringPool, ext: usize) -> DecodeResult<PackageInfo> {
    let attr_start = bytes.u16_at(ext + 8)? as usize;
    let attr_size = bytes.u16_at(ext + 10)? as usize;
    let attr_count = bytes.u16_at(ext + 12)? as usize;

    let mut package = None;
    let mut version_code = None;
    let mut version_name = None;

    for i in 0..attr_count {
        let attr = ext + attr_start + i * attr_size;
        let name = pool.get(bytes.u32_at(attr + 4)?)?;
        let raw = bytes.u32_at(attr + 8)?;
        let data_type = bytes.u8_at(attr + 15)?;
        let data = bytes.u32_at(attr + 16)?;

        let value = match data_type {
            TYPE_STRING => AttributeValue::String(pool.get(data)?.to_string()),
            TYPE_INT_DEC | TYPE_INT_HEX => AttributeValue::Int(data),
            _ if raw != NO_INDEX => AttributeValue::String(pool.get(raw)?.to_string()),
            _ => AttributeValue::Int(data),
        };

        match name {
            "package" => package = Some(value.into_string()),
            "versionCode" => version_code = Some(value),
            "versionName" => version_name = Some(value.into_string()),
            _ => {}
        }
    }

    let application_id = package
        .filter(|p| !p.is_empty())
        .ok_or(ManifestError::MissingAttribute("package"))?;

    let version_code = match version_code.ok_or(ManifestError::MissingAttribute("versionCode"))? {
        AttributeValue::Int(n) => n,
        AttributeValue::String(s) => s.trim().parse().map_err(|_| ManifestError::InvalidValue {
            attribute: "versionCode",
            value: s,
        })?,
    };

    Ok(PackageInfo {
        application_id,
        version_code,
        version_name,
    })
}

/// Package reader that decodes the manifest embedded in the APK
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestInspector;

impl ManifestInspector {
    /// Create a new inspector
    pub fn new() -> Self {
        Self
    }
}

impl PackageInspector for ManifestInspector {
    fn name(&self) -> &str {
        "manifest"
    }

    fn inspect(&self, path: &Path) -> Result<PackageInfo> {
        let file = std::fs::File::open(path)
            .map_err(|e| StoreError::invalid_artifact(path, e.to_string()))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| StoreError::invalid_artifact(path, format!("not a zip archive: {}", e)))?;

        let mut entry = archive.by_name(MANIFEST_ENTRY).map_err(|_| {
            StoreError::invalid_artifact(path, format!("{} not found", MANIFEST_ENTRY))
        })?;

        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| StoreError::invalid_artifact(path, e.to_string()))?;

        let info = parse_binary_manifest(&contents)
            .map_err(|e| StoreError::invalid_artifact(path, e.to_string()))?;

        debug!(
            path = %path.display(),
            application_id = %info.application_id,
            version_code = info.version_code,
            "read package manifest"
        );
        Ok(info)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";

    fn string_pool(strings: &[&str], utf8: bool) -> Vec<u8> {
        let mut offsets = Vec::new();
        let mut data = Vec::new();
        for s in strings {
            offsets.push(data.len() as u32);
            if utf8 {
                data.push(s.chars().count() as u8);
                data.push(s.len() as u8);
                data.extend_from_slice(s.as_bytes());
                data.push(0);
            } else {
                let units: Vec<u16> = s.encode_utf16().collect();
                data.extend_from_slice(&(units.len() as u16).to_le_bytes());
                for unit in units {
                    data.extend_from_slice(&unit.to_le_bytes());
                }
                data.extend_from_slice(&[0, 0]);
            }
        }
        while data.len() % 4 != 0 {
            data.push(0);
        }

        let header_size = 28u16;
        let strings_start = header_size as u32 + 4 * strings.len() as u32;
        let size = strings_start + data.len() as u32;
        let flags = if utf8 { UTF8_FLAG } else { 0 };

        let mut out = Vec::new();
        out.extend_from_slice(&RES_STRING_POOL_TYPE.to_le_bytes());
        out.extend_from_slice(&header_size.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&strings_start.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        for offset in offsets {
            out.extend_from_slice(&offset.to_le_bytes());
        }
        out.extend_from_slice(&data);
        out
    }

    /// (namespace, name, raw value, data type, data)
    type Attr = (u32, u32, u32, u8, u32);

    fn start_element(name: u32, attrs: &[Attr]) -> Vec<u8> {
        let size = 16 + 20 + 20 * attrs.len() as u32;
        let mut out = Vec::new();
        out.extend_from_slice(&RES_XML_START_ELEMENT_TYPE.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&NO_INDEX.to_le_bytes());

        out.extend_from_slice(&NO_INDEX.to_le_bytes());
        out.extend_from_slice(&name.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&(attrs.len() as u16).to_le_bytes());
        out.extend_from_slice(&[0; 6]);

        for (ns, name, raw, data_type, data) in attrs {
            out.extend_from_slice(&ns.to_le_bytes());
            out.extend_from_slice(&name.to_le_bytes());
            out.extend_from_slice(&raw.to_le_bytes());
            out.extend_from_slice(&8u16.to_le_bytes());
            out.push(0);
            out.push(*data_type);
            out.extend_from_slice(&data.to_le_bytes());
        }
        out
    }

    fn document(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut out = Vec::new();
        out.extend_from_slice(&RES_XML_TYPE.to_le_bytes());
        out.extend_from_slice(&8u16.to_le_bytes());
        out.extend_from_slice(&(8 + body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// Compiled manifest declaring `package` and `android:versionCode`
    pub(crate) fn compiled_manifest(application_id: &str, version_code: u32) -> Vec<u8> {
        let strings = [
            "versionCode",
            "versionName",
            ANDROID_NS,
            "manifest",
            "package",
            application_id,
            "1.0",
        ];
        document(&[
            string_pool(&strings, false),
            start_element(
                3,
                &[
                    (2, 0, NO_INDEX, TYPE_INT_DEC, version_code),
                    (2, 1, 6, TYPE_STRING, 6),
                    (NO_INDEX, 4, 5, TYPE_STRING, 5),
                ],
            ),
        ])
    }

    /// Write a minimal APK containing a compiled manifest
    pub(crate) fn write_apk(path: &Path, application_id: &str, version_code: u32) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file(MANIFEST_ENTRY, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(&compiled_manifest(application_id, version_code))
            .unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_parse_utf16_manifest() {
        let info = parse_binary_manifest(&compiled_manifest("com.example.app", 42)).unwrap();
        assert_eq!(info.application_id, "com.example.app");
        assert_eq!(info.version_code, 42);
        assert_eq!(info.version_name.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_parse_utf8_manifest_with_string_version_code() {
        let strings = ["manifest", "package", "versionCode", "com.example.utf8", "317"];
        let data = document(&[
            string_pool(&strings, true),
            start_element(
                0,
                &[(NO_INDEX, 1, 3, TYPE_STRING, 3), (NO_INDEX, 2, 4, TYPE_STRING, 4)],
            ),
        ]);

        let info = parse_binary_manifest(&data).unwrap();
        assert_eq!(info.application_id, "com.example.utf8");
        assert_eq!(info.version_code, 317);
        assert_eq!(info.version_name, None);
    }

    #[test]
    fn test_missing_version_code() {
        let strings = ["manifest", "package", "com.example"];
        let data = document(&[
            string_pool(&strings, false),
            start_element(0, &[(NO_INDEX, 1, 2, TYPE_STRING, 2)]),
        ]);

        assert_eq!(
            parse_binary_manifest(&data),
            Err(ManifestError::MissingAttribute("versionCode"))
        );
    }

    #[test]
    fn test_plain_text_manifest_rejected() {
        let data = b"<?xml version=\"1.0\"?><manifest package=\"x\"/>";
        assert_eq!(parse_binary_manifest(data), Err(ManifestError::NotBinaryXml));
    }

    #[test]
    fn test_truncated_manifest() {
        let mut data = compiled_manifest("com.example", 1);
        data.truncate(40);
        assert!(matches!(
            parse_binary_manifest(&data),
            Err(ManifestError::Truncated(_))
        ));
    }

    #[test]
    fn test_inspect_apk() {
        let temp = tempfile::TempDir::new().unwrap();
        let apk = temp.path().join("app.apk");
        write_apk(&apk, "com.example.app", 7);

        let info = ManifestInspector::new().inspect(&apk).unwrap();
        assert_eq!(info.application_id, "com.example.app");
        assert_eq!(info.version_code, 7);
    }

    #[test]
    fn test_inspect_non_zip_names_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let apk = temp.path().join("broken.apk");
        std::fs::write(&apk, b"not a zip").unwrap();

        let err = ManifestInspector::new().inspect(&apk).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArtifact { .. }));
        assert!(err.to_string().contains("broken.apk"));
    }
}
