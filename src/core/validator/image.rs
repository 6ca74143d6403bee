//! Image integrity checks.
//!
//! Two phases: (a) structural verification of the container/header, then
//! (b) a full pixel decode. Either failing means Corrupt, with the reason
//! naming the phase. A file that decodes fully but is missing its format
//! trailer (a truncated-but-recoverable tail, common in carved files) is
//! Suspicious rather than Corrupt: it is usable, just doubtful.

use super::Verdict;
use image::{ImageError, ImageReader};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Tail window searched for the JPEG/PNG trailer
const TRAILER_WINDOW: u64 = 64 * 1024;
/// GIF terminators sit close to the end
const GIF_TRAILER_WINDOW: u64 = 16 * 1024;

pub fn check_image(path: &Path) -> Verdict {
    // Phase (a): structural check - open, identify the format, parse the
    // header far enough to get dimensions.
    let reader = match ImageReader::open(path) {
        Ok(reader) => reader,
        Err(e) => return Verdict::error(format!("failed to open: {e}")),
    };
    let reader = match reader.with_guessed_format() {
        Ok(reader) => reader,
        Err(e) => return Verdict::error(format!("failed to read header: {e}")),
    };
    if reader.format().is_none() {
        return Verdict::corrupt("structure check failed: unrecognized image container");
    }
    let (width, height) = match reader.into_dimensions() {
        Ok(dims) => dims,
        Err(e) => return decode_failure("structure check failed", e),
    };
    if width == 0 || height == 0 {
        return Verdict::corrupt(format!(
            "structure check failed: invalid dimensions {width}x{height}"
        ));
    }

    // Phase (b): full pixel decode.
    let decoded = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(ImageError::IoError)
        .and_then(|r| r.decode());
    if let Err(e) = decoded {
        return decode_failure("decode failed", e);
    }

    // Decode succeeded; a missing trailer downgrades to Suspicious only.
    match check_trailer(path) {
        Ok(Some(anomaly)) => Verdict::suspicious(anomaly),
        Ok(None) => Verdict::healthy(),
        Err(e) => Verdict::error(format!("failed to read file tail: {e}")),
    }
}

/// Corrupt for anything the decoder determined to be bad; Error when the
/// file could not be read at all (could not determine).
fn decode_failure(phase: &str, e: ImageError) -> Verdict {
    match e {
        ImageError::IoError(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            Verdict::corrupt(format!("{phase}: file truncated"))
        }
        ImageError::IoError(io) => Verdict::error(format!("{phase}: {io}")),
        other => Verdict::corrupt(format!("{phase}: {other}")),
    }
}

/// Look for the format's end-of-file marker near the tail.
///
/// Some tools write trailing bytes after the marker, so the marker only has
/// to appear somewhere in the window, not at the very end. Formats without a
/// fixed trailer pass unconditionally.
fn check_trailer(path: &Path) -> std::io::Result<Option<String>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let (marker, window, label): (&[u8], u64, &str) = match ext.as_str() {
        "jpg" | "jpeg" => (&[0xFF, 0xD9], TRAILER_WINDOW, "JPEG end marker (FFD9)"),
        "png" => (b"IEND", TRAILER_WINDOW, "PNG IEND chunk"),
        "gif" => (&[0x3B], GIF_TRAILER_WINDOW, "GIF terminator (';')"),
        _ => return Ok(None),
    };

    let mut file = File::open(path)?;
    let file_size = file.seek(SeekFrom::End(0))?;
    let start = file_size.saturating_sub(window);
    file.seek(SeekFrom::Start(start))?;
    let mut tail = Vec::with_capacity((file_size - start) as usize);
    file.read_to_end(&mut tail)?;

    if tail.windows(marker.len()).any(|w| w == marker) {
        Ok(None)
    } else {
        Ok(Some(format!("decoded fully but {label} is missing")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::FileStatus;
    use image::codecs::jpeg::JpegEncoder;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder, RgbImage};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_bytes(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        File::create(&path).unwrap().write_all(bytes).unwrap();
        path
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([120, 80, 40]));
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([120, 80, 40]));
        let mut out = Vec::new();
        JpegEncoder::new(&mut out).encode_image(&img).unwrap();
        out
    }

    #[test]
    fn valid_png_is_healthy() {
        let dir = TempDir::new().unwrap();
        let path = write_bytes(&dir, "ok.png", &png_bytes(4, 4));
        let verdict = check_image(&path);
        assert_eq!(verdict.status, FileStatus::Healthy, "{:?}", verdict.reason);
    }

    #[test]
    fn valid_jpeg_is_healthy() {
        let dir = TempDir::new().unwrap();
        let path = write_bytes(&dir, "ok.jpg", &jpeg_bytes(8, 8));
        let verdict = check_image(&path);
        assert_eq!(verdict.status, FileStatus::Healthy, "{:?}", verdict.reason);
    }

    #[test]
    fn garbage_bytes_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = write_bytes(&dir, "junk.jpg", &[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11]);
        let verdict = check_image(&path);
        assert_eq!(verdict.status, FileStatus::Corrupt);
    }

    #[test]
    fn heavily_truncated_png_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let bytes = png_bytes(16, 16);
        // Cut in the middle of the pixel data
        let path = write_bytes(&dir, "cut.png", &bytes[..bytes.len() / 2]);
        let verdict = check_image(&path);
        assert_eq!(verdict.status, FileStatus::Corrupt);
        let reason = verdict.reason.unwrap();
        assert!(
            reason.contains("decode failed") || reason.contains("structure check failed"),
            "reason should name the failing phase: {reason}"
        );
    }

    #[test]
    fn trailing_garbage_after_trailer_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let mut bytes = png_bytes(4, 4);
        bytes.extend_from_slice(b"recovery-tool-footer");
        let path = write_bytes(&dir, "padded.png", &bytes);
        let verdict = check_image(&path);
        assert_eq!(verdict.status, FileStatus::Healthy, "{:?}", verdict.reason);
    }

    #[test]
    fn trailer_check_flags_missing_jpeg_eoi() {
        let dir = TempDir::new().unwrap();
        let bytes = jpeg_bytes(4, 4);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
        let path = write_bytes(&dir, "noeoi.jpg", &bytes[..bytes.len() - 2]);
        let anomaly = check_trailer(&path).unwrap();
        assert!(anomaly.unwrap().contains("FFD9"));
    }

    #[test]
    fn trailer_check_passes_formats_without_a_trailer() {
        let dir = TempDir::new().unwrap();
        let path = write_bytes(&dir, "pic.bmp", &[0u8; 32]);
        assert!(check_trailer(&path).unwrap().is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        let verdict = check_image(Path::new("/nonexistent/a.png"));
        assert_eq!(verdict.status, FileStatus::Error);
    }
}
