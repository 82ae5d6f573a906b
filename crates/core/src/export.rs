//! Animated WebP export: precondition checks, frame decoding, encoding.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use thiserror::Error;
use webp_animation::{
    AnimParams, Encoder, EncoderOptions, EncodingConfig, EncodingType, LossyEncodingConfig,
};

use crate::document::Document;

/// Failure modes of a single export run.
///
/// Validation failures are reported to the user and leave the app
/// usable; decode and encode failures are terminal for the run only.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no destination path set")]
    NoDestination,
    #[error("an animation needs at least two images (got {0})")]
    InsufficientFrames(usize),
    #[error("failed to read image {}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{} is {got_w}x{got_h}, expected {want_w}x{want_h} (all frames must match the first)", .path.display())]
    FrameSize {
        path: PathBuf,
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
    },
    #[error("webp encoding failed: {0:?}")]
    Encode(webp_animation::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything the encoder needs, captured after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPlan {
    pub dst_path: PathBuf,
    /// Source frames in encode order.
    pub frames: Vec<PathBuf>,
    /// Per-frame display time in milliseconds, same order as `frames`.
    pub durations: Vec<u32>,
    pub lossless: bool,
    pub quality: u8,
    /// WebP loop count: 0 plays forever, 1 plays once.
    pub loop_count: i32,
}

/// Validate a document and capture the encoder inputs.
///
/// Fails without touching the filesystem.
pub fn plan(document: &Document) -> Result<ExportPlan, ExportError> {
    let dst = document.config.dst_path.trim();
    if dst.is_empty() {
        return Err(ExportError::NoDestination);
    }
    if document.images.len() < 2 {
        return Err(ExportError::InsufficientFrames(document.images.len()));
    }

    Ok(ExportPlan {
        dst_path: PathBuf::from(dst),
        frames: document.images.iter().map(|e| PathBuf::from(&e.path)).collect(),
        durations: document.images.iter().map(|e| e.duration).collect(),
        lossless: document.config.is_lossless,
        quality: document.config.quality.min(100),
        loop_count: if document.config.is_loop { 0 } else { 1 },
    })
}

/// Decode every frame and encode the animation to `plan.dst_path`.
///
/// Creates the destination's parent directory if needed. No rollback: a
/// mid-encode failure leaves any partially written output as-is.
pub fn run(plan: &ExportPlan) -> Result<PathBuf, ExportError> {
    if plan.frames.len() < 2 {
        return Err(ExportError::InsufficientFrames(plan.frames.len()));
    }
    if let Some(parent) = plan.dst_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let frames = decode_frames(&plan.frames)?;
    let (width, height) = frames[0].dimensions();

    let mut anim_params = AnimParams::default();
    anim_params.loop_count = plan.loop_count;
    let options = EncoderOptions {
        anim_params,
        encoding_config: Some(EncodingConfig {
            encoding_type: if plan.lossless {
                EncodingType::Lossless
            } else {
                EncodingType::Lossy(LossyEncodingConfig::default())
            },
            quality: plan.quality as f32,
            ..Default::default()
        }),
        ..Default::default()
    };

    let mut encoder =
        Encoder::new_with_options((width, height), options).map_err(ExportError::Encode)?;
    let mut timestamp_ms: i32 = 0;
    for (frame, &duration) in frames.iter().zip(&plan.durations) {
        encoder
            .add_frame(frame.as_raw(), timestamp_ms)
            .map_err(ExportError::Encode)?;
        timestamp_ms += duration as i32;
    }
    let data = encoder.finalize(timestamp_ms).map_err(ExportError::Encode)?;
    std::fs::write(&plan.dst_path, &data)?;

    log::info!(
        "Encoded {} frames ({}x{}) to {}",
        frames.len(),
        width,
        height,
        plan.dst_path.display()
    );
    Ok(plan.dst_path.clone())
}

/// Validate and export in one step.
pub fn export(document: &Document) -> Result<PathBuf, ExportError> {
    run(&plan(document)?)
}

/// Decode all frames to RGBA and check them against the first frame's
/// dimensions. The WebP canvas is fixed, so a mismatch is an error.
fn decode_frames(paths: &[PathBuf]) -> Result<Vec<RgbaImage>, ExportError> {
    let mut frames: Vec<RgbaImage> = Vec::with_capacity(paths.len());
    let mut canvas: Option<(u32, u32)> = None;
    for path in paths {
        let img = open_rgba(path)?;
        let want = *canvas.get_or_insert_with(|| img.dimensions());
        if let Some(err) = frame_mismatch(path, &img, want) {
            return Err(err);
        }
        frames.push(img);
    }
    Ok(frames)
}

fn open_rgba(path: &Path) -> Result<RgbaImage, ExportError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| ExportError::Image {
            path: path.to_path_buf(),
            source,
        })
}

fn frame_mismatch(path: &Path, frame: &RgbaImage, want: (u32, u32)) -> Option<ExportError> {
    let (got_w, got_h) = frame.dimensions();
    if (got_w, got_h) == want {
        return None;
    }
    Some(ExportError::FrameSize {
        path: path.to_path_buf(),
        got_w,
        got_h,
        want_w: want.0,
        want_h: want.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ExportConfig, ImageEntry};

    fn document(dst: &str, images: &[(&str, u32)]) -> Document {
        Document {
            config: ExportConfig {
                dst_path: dst.to_string(),
                ..Default::default()
            },
            images: images
                .iter()
                .map(|&(path, duration)| ImageEntry {
                    path: path.to_string(),
                    duration,
                })
                .collect(),
        }
    }

    fn write_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
        let img = RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        img.save(path).unwrap();
    }

    #[test]
    fn test_plan_rejects_empty_destination() {
        let doc = document("", &[("a.png", 100), ("b.png", 100)]);
        assert!(matches!(plan(&doc), Err(ExportError::NoDestination)));
    }

    #[test]
    fn test_plan_rejects_whitespace_destination() {
        let doc = document("   ", &[("a.png", 100), ("b.png", 100)]);
        assert!(matches!(plan(&doc), Err(ExportError::NoDestination)));
    }

    #[test]
    fn test_plan_rejects_single_image() {
        let doc = document("out.webp", &[("a.png", 100)]);
        assert!(matches!(plan(&doc), Err(ExportError::InsufficientFrames(1))));
    }

    #[test]
    fn test_plan_captures_order_and_options() {
        let mut doc = document("out/anim.webp", &[("a.png", 100), ("b.png", 200)]);
        doc.config.is_loop = true;
        doc.config.is_lossless = true;
        doc.config.quality = 80;

        let p = plan(&doc).unwrap();
        assert_eq!(p.dst_path, PathBuf::from("out/anim.webp"));
        assert_eq!(p.frames, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
        assert_eq!(p.durations, vec![100, 200]);
        assert_eq!(p.loop_count, 0);
        assert_eq!(p.quality, 80);
        assert!(p.lossless);
    }

    #[test]
    fn test_plan_loop_off_plays_once() {
        let mut doc = document("out.webp", &[("a.png", 100), ("b.png", 100)]);
        doc.config.is_loop = false;
        assert_eq!(plan(&doc).unwrap().loop_count, 1);
    }

    #[test]
    fn test_plan_clamps_quality() {
        let mut doc = document("out.webp", &[("a.png", 100), ("b.png", 100)]);
        doc.config.quality = 200;
        assert_eq!(plan(&doc).unwrap().quality, 100);
    }

    #[test]
    fn test_export_without_destination_writes_nothing() {
        let dir = std::env::temp_dir().join(format!("webpanim_noval_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let before: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();

        let doc = document("", &[("a.png", 100), ("b.png", 100)]);
        assert!(matches!(export(&doc), Err(ExportError::NoDestination)));

        let after: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(before.len(), after.len());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_export_writes_webp_container() {
        let dir = std::env::temp_dir().join(format!("webpanim_export_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let a = dir.join("a.png");
        let b = dir.join("b.png");
        write_png(&a, 4, 4, [255, 0, 0, 255]);
        write_png(&b, 4, 4, [0, 0, 255, 255]);

        let dst = dir.join("nested").join("anim.webp");
        let doc = document(
            dst.to_str().unwrap(),
            &[(a.to_str().unwrap(), 100), (b.to_str().unwrap(), 200)],
        );
        let written = export(&doc).unwrap();
        assert_eq!(written, dst);

        let bytes = std::fs::read(&dst).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_export_rejects_mismatched_frame_sizes() {
        let dir = std::env::temp_dir().join(format!("webpanim_mismatch_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let a = dir.join("a.png");
        let b = dir.join("b.png");
        write_png(&a, 4, 4, [255, 0, 0, 255]);
        write_png(&b, 8, 8, [0, 255, 0, 255]);

        let dst = dir.join("anim.webp");
        let doc = document(
            dst.to_str().unwrap(),
            &[(a.to_str().unwrap(), 100), (b.to_str().unwrap(), 100)],
        );
        let err = export(&doc).unwrap_err();
        assert!(matches!(err, ExportError::FrameSize { got_w: 8, got_h: 8, .. }));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_export_unreadable_image_names_path() {
        let dir = std::env::temp_dir().join(format!("webpanim_unread_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let missing = dir.join("missing.png");
        let a = dir.join("a.png");
        write_png(&a, 4, 4, [255, 0, 0, 255]);

        let dst = dir.join("anim.webp");
        let doc = document(
            dst.to_str().unwrap(),
            &[(missing.to_str().unwrap(), 100), (a.to_str().unwrap(), 100)],
        );
        match export(&doc).unwrap_err() {
            ExportError::Image { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }

        std::fs::remove_dir_all(&dir).ok();
    }
}
