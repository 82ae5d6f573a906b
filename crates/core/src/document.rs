//! Document model: export configuration plus the ordered image list.
//!
//! Documents persist as plain JSON. Loading never deserializes directly
//! into a record: the parsed value is merged field by field into a
//! default-constructed record, so files written by older versions keep
//! defaults for missing keys and unknown keys are ignored.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One animation frame: source PNG path and display duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageEntry {
    /// Source file path as shown in the table (forward slashes).
    pub path: String,
    /// Display duration in milliseconds, at least 1.
    pub duration: u32,
}

impl ImageEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for ImageEntry {
    fn default() -> Self {
        Self {
            path: String::new(),
            duration: 100,
        }
    }
}

/// Encoding options plus destination path.
///
/// Persisted alone as the last-used settings file and embedded in full
/// documents under the `config` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportConfig {
    pub dst_path: String,
    pub is_loop: bool,
    pub is_lossless: bool,
    /// Lossy quality, 0..=100.
    pub quality: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dst_path: String::new(),
            is_loop: true,
            is_lossless: true,
            quality: 80,
        }
    }
}

/// The full exportable state: config plus ordered image list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub config: ExportConfig,
    pub images: Vec<ImageEntry>,
}

/// Field-wise merge from a parsed JSON value.
///
/// Each record walks its own field set: keys present in the input
/// overwrite the matching field, nested records merge recursively, and
/// lists of records are replaced wholesale (one default-constructed
/// element merged per input item). Keys absent from the input leave the
/// field unchanged, unknown input keys are ignored, and a value whose
/// JSON type does not match the field is skipped.
pub trait Merge {
    fn merge(&mut self, value: &Value);
}

impl Merge for ImageEntry {
    fn merge(&mut self, value: &Value) {
        let Some(obj) = value.as_object() else { return };
        if let Some(v) = obj.get("path").and_then(Value::as_str) {
            self.path = v.to_string();
        }
        if let Some(v) = obj.get("duration").and_then(Value::as_u64) {
            if let Ok(v) = u32::try_from(v) {
                self.duration = v;
            }
        }
    }
}

impl Merge for ExportConfig {
    fn merge(&mut self, value: &Value) {
        let Some(obj) = value.as_object() else { return };
        if let Some(v) = obj.get("dst_path").and_then(Value::as_str) {
            self.dst_path = v.to_string();
        }
        if let Some(v) = obj.get("is_loop").and_then(Value::as_bool) {
            self.is_loop = v;
        }
        if let Some(v) = obj.get("is_lossless").and_then(Value::as_bool) {
            self.is_lossless = v;
        }
        if let Some(v) = obj.get("quality").and_then(Value::as_u64) {
            if let Ok(v) = u8::try_from(v) {
                self.quality = v;
            }
        }
    }
}

impl Merge for Document {
    fn merge(&mut self, value: &Value) {
        let Some(obj) = value.as_object() else { return };
        if let Some(v) = obj.get("config") {
            self.config.merge(v);
        }
        if let Some(items) = obj.get("images").and_then(Value::as_array) {
            self.images = items
                .iter()
                .map(|item| {
                    let mut entry = ImageEntry::default();
                    entry.merge(item);
                    entry
                })
                .collect();
        }
    }
}

/// Read `path`, parse it as JSON, and merge into a default-constructed
/// record.
///
/// The file must exist; callers with an optional file check first. A
/// malformed file is an error.
pub fn load_json<T>(path: &Path) -> Result<T>
where
    T: Default + Merge,
{
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Malformed JSON in {}", path.display()))?;
    let mut record = T::default();
    record.merge(&value);
    Ok(record)
}

/// Serialize `value` as 2-space-indented JSON, overwriting `path`.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize record")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

impl Document {
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }
}

impl ExportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> Document {
        Document {
            config: ExportConfig {
                dst_path: "out/anim.webp".to_string(),
                is_loop: true,
                is_lossless: true,
                quality: 80,
            },
            images: vec![
                ImageEntry { path: "a.png".into(), duration: 100 },
                ImageEntry { path: "b.png".into(), duration: 200 },
            ],
        }
    }

    #[test]
    fn test_merge_roundtrip() {
        let doc = sample_document();
        let value = serde_json::to_value(&doc).unwrap();
        let mut restored = Document::default();
        restored.merge(&value);
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_json_key_names() {
        let value = serde_json::to_value(sample_document()).unwrap();
        let config = &value["config"];
        assert_eq!(config["dst_path"], "out/anim.webp");
        assert_eq!(config["is_loop"], true);
        assert_eq!(config["is_lossless"], true);
        assert_eq!(config["quality"], 80);
        assert_eq!(value["images"][0]["path"], "a.png");
        assert_eq!(value["images"][1]["duration"], 200);
    }

    #[test]
    fn test_merge_ignores_unknown_keys() {
        let mut config = ExportConfig::default();
        config.merge(&json!({
            "quality": 50,
            "bogus": "value",
            "frame_rate": 24
        }));
        assert_eq!(config.quality, 50);
        assert_eq!(config, ExportConfig { quality: 50, ..Default::default() });
    }

    #[test]
    fn test_merge_keeps_fields_absent_from_input() {
        let mut config = ExportConfig {
            dst_path: "keep.webp".into(),
            is_loop: false,
            is_lossless: false,
            quality: 10,
        };
        config.merge(&json!({ "quality": 90 }));
        assert_eq!(config.dst_path, "keep.webp");
        assert!(!config.is_loop);
        assert!(!config.is_lossless);
        assert_eq!(config.quality, 90);
    }

    #[test]
    fn test_merge_skips_mismatched_types() {
        let mut config = ExportConfig::default();
        config.merge(&json!({
            "dst_path": 42,
            "is_loop": "yes",
            "quality": "high"
        }));
        assert_eq!(config, ExportConfig::default());

        // Out-of-range counts as a mismatch too.
        let mut entry = ImageEntry::default();
        entry.merge(&json!({ "duration": u64::from(u32::MAX) + 1 }));
        assert_eq!(entry.duration, 100);
    }

    #[test]
    fn test_merge_replaces_image_list_wholesale() {
        let mut doc = sample_document();
        doc.merge(&json!({
            "images": [{ "path": "c.png" }]
        }));
        assert_eq!(doc.images.len(), 1);
        assert_eq!(doc.images[0].path, "c.png");
        // Missing duration falls back to the element default.
        assert_eq!(doc.images[0].duration, 100);
        // Config was absent from the input and is untouched.
        assert_eq!(doc.config.dst_path, "out/anim.webp");
    }

    #[test]
    fn test_merge_non_object_input_is_noop() {
        let mut doc = sample_document();
        doc.merge(&json!([1, 2, 3]));
        assert_eq!(doc, sample_document());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("webpanim_doc_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("doc.json");

        let doc = sample_document();
        doc.save(&path).unwrap();
        let loaded = Document::load(&path).unwrap();
        assert_eq!(loaded, doc);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_uses_two_space_indent() {
        let dir = std::env::temp_dir().join(format!("webpanim_indent_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("doc.json");

        sample_document().save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"config\""));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let path = std::env::temp_dir().join("webpanim_no_such_file.json");
        assert!(Document::load(&path).is_err());
    }

    #[test]
    fn test_load_malformed_json_is_error() {
        let dir = std::env::temp_dir().join(format!("webpanim_bad_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = Document::load(&path).unwrap_err();
        assert!(err.to_string().contains("Malformed JSON"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
