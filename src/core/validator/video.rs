//! Video integrity checks.
//!
//! The probe opens the container and samples a small fixed number of frames
//! (first, middle, last reachable). Classification is deliberately
//! asymmetric: strict on decodability, lenient on metadata. Recovered files
//! routinely carry garbage frame rates and frame counts, and treating a
//! lying header as corruption would quarantine perfectly playable footage.
//!
//! The probe itself is a capability behind the [`VideoProbe`] trait; the
//! default [`Mp4Probe`] parses the container with `mp4parse` and verifies
//! sample data is present, without decoding pixels.

use super::Verdict;
use crate::error::ValidateError;
use mp4parse::{read_mp4, SampleEntry, TrackType};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Tunable thresholds for the video checks.
///
/// The exact boundary between "suspicious" and "corrupt" metadata is a
/// heuristic, so the numbers live here instead of being buried in the
/// classifier.
#[derive(Debug, Clone)]
pub struct VideoHeuristics {
    /// How many sample frames to probe (spread from first to last)
    pub sample_count: usize,
    /// Frame rates at or below this are implausible
    pub min_frame_rate: f64,
    /// Frame rates above this are implausible
    pub max_frame_rate: f64,
}

impl Default for VideoHeuristics {
    fn default() -> Self {
        Self {
            sample_count: 3,
            min_frame_rate: 0.0,
            max_frame_rate: 480.0,
        }
    }
}

/// One probed sample frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFrame {
    /// Whether the frame's data could be read
    pub readable: bool,
    pub width: u32,
    pub height: u32,
}

impl SampleFrame {
    pub fn readable(width: u32, height: u32) -> Self {
        Self {
            readable: true,
            width,
            height,
        }
    }

    pub fn unreadable() -> Self {
        Self {
            readable: false,
            width: 0,
            height: 0,
        }
    }
}

/// What the probe learned about one video file
#[derive(Debug, Clone)]
pub struct VideoScan {
    /// Container-declared dimensions (may lie)
    pub width: u32,
    pub height: u32,
    /// Derived frame rate, when the container carries enough to compute one
    pub frame_rate: Option<f64>,
    /// Container-declared frame count
    pub frame_count: Option<u64>,
    /// Container-declared duration
    pub duration_ms: Option<u64>,
    /// The probed sample frames
    pub samples: Vec<SampleFrame>,
}

/// Capability for opening a video container and probing sample frames.
///
/// The engine never decodes video pixels itself; richer decoders can be
/// slotted in through this seam, and tests use stubs.
pub trait VideoProbe: Send + Sync {
    fn probe(&self, path: &Path, heuristics: &VideoHeuristics)
        -> Result<VideoScan, ValidateError>;
}

/// Classify a video candidate using the given probe.
pub fn check_video(path: &Path, probe: &dyn VideoProbe, heuristics: &VideoHeuristics) -> Verdict {
    match probe.probe(path, heuristics) {
        Ok(scan) => classify(&scan, heuristics),
        Err(ValidateError::Structure { reason }) => {
            Verdict::corrupt(format!("container check failed: {reason}"))
        }
        Err(e) => Verdict::error(e.to_string()),
    }
}

/// Pure classification of a probe result.
///
/// Corrupt only when frame data itself is bad: nothing readable, or
/// readable frames with zero or inconsistent dimensions. Bad metadata with
/// readable frames is Suspicious, never Corrupt.
fn classify(scan: &VideoScan, heuristics: &VideoHeuristics) -> Verdict {
    let readable: Vec<&SampleFrame> = scan.samples.iter().filter(|s| s.readable).collect();

    if readable.is_empty() {
        return Verdict::corrupt("no readable sample frames");
    }
    if readable.iter().any(|s| s.width == 0 || s.height == 0) {
        return Verdict::corrupt("sample frame has zero dimensions");
    }
    let first = (readable[0].width, readable[0].height);
    if readable.iter().any(|s| (s.width, s.height) != first) {
        return Verdict::corrupt("inconsistent dimensions across sample frames");
    }

    let mut anomalies = Vec::new();
    if scan.width == 0 || scan.height == 0 {
        anomalies.push("declared dimensions are zero".to_string());
    }
    match scan.frame_rate {
        None => anomalies.push("frame rate missing".to_string()),
        Some(fps) if fps <= heuristics.min_frame_rate || fps > heuristics.max_frame_rate => {
            anomalies.push(format!("implausible frame rate {fps:.2}"))
        }
        _ => {}
    }
    match scan.frame_count {
        None | Some(0) => anomalies.push("frame count missing or zero".to_string()),
        _ => {}
    }

    if anomalies.is_empty() {
        Verdict::healthy()
    } else {
        Verdict::suspicious(format!("frames readable but {}", anomalies.join(", ")))
    }
}

/// Default probe: parses the MP4 container and checks that sample data is
/// actually present in `mdat`, without decoding pixels.
pub struct Mp4Probe;

impl VideoProbe for Mp4Probe {
    fn probe(
        &self,
        path: &Path,
        heuristics: &VideoHeuristics,
    ) -> Result<VideoScan, ValidateError> {
        let mut file = File::open(path).map_err(|source| ValidateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|source| ValidateError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let mut cursor = std::io::Cursor::new(&buffer);
        let context = read_mp4(&mut cursor).map_err(|e| ValidateError::Structure {
            reason: format!("MP4 parse error: {e:?}"),
        })?;

        let track = context
            .tracks
            .iter()
            .find(|t| t.track_type == TrackType::Video)
            .ok_or_else(|| ValidateError::Structure {
                reason: "no video track in container".to_string(),
            })?;

        let (width, height) = track
            .stsd
            .as_ref()
            .and_then(|stsd| stsd.descriptions.first())
            .and_then(|entry| match entry {
                SampleEntry::Video(v) => Some((v.width as u32, v.height as u32)),
                _ => None,
            })
            .unwrap_or((0, 0));

        let duration_ms = track.duration.and_then(|d| {
            track.timescale.and_then(|ts| {
                if ts.0 > 0 {
                    Some(d.0 * 1000 / ts.0)
                } else {
                    None
                }
            })
        });

        // Frame count from the sample-size table; a carved file with a
        // stripped moov simply reports None here.
        let frame_count = video_sample_count(&buffer).filter(|&count| count > 0);

        let frame_rate = match (frame_count, duration_ms) {
            (Some(count), Some(ms)) if ms > 0 => Some(count as f64 * 1000.0 / ms as f64),
            _ => None,
        };

        let samples = probe_mdat_samples(&buffer, width, height, heuristics.sample_count);

        Ok(VideoScan {
            width,
            height,
            frame_rate,
            frame_count,
            duration_ms,
            samples,
        })
    }
}

/// Walk the top-level boxes for `mdat` and probe evenly spread offsets in
/// its payload. A sample is readable when the payload actually holds data
/// at that position.
fn probe_mdat_samples(
    buffer: &[u8],
    width: u32,
    height: u32,
    sample_count: usize,
) -> Vec<SampleFrame> {
    let payload_len = match find_mdat_payload_len(buffer) {
        Some(len) if len > 0 => len,
        _ => return vec![SampleFrame::unreadable(); sample_count.max(1)],
    };

    (0..sample_count.max(1))
        .map(|i| {
            // Spread positions from the first byte to the last
            let fraction = if sample_count <= 1 {
                0.0
            } else {
                i as f64 / (sample_count - 1) as f64
            };
            let offset = ((payload_len - 1) as f64 * fraction) as u64;
            if offset < payload_len {
                SampleFrame::readable(width, height)
            } else {
                SampleFrame::unreadable()
            }
        })
        .collect()
}

/// One parsed box at some level of the tree.
struct BoxRegion<'a> {
    kind: [u8; 4],
    payload: &'a [u8],
    /// Declared size ran past the end of the buffer
    truncated: bool,
}

/// Iterate sibling boxes in a buffer. Handles 32-bit, 64-bit (largesize),
/// and to-end-of-file sizes; stops at the first malformed header.
struct BoxIter<'a> {
    buf: &'a [u8],
    offset: usize,
}

fn boxes(buf: &[u8]) -> BoxIter<'_> {
    BoxIter { buf, offset: 0 }
}

impl<'a> Iterator for BoxIter<'a> {
    type Item = BoxRegion<'a>;

    fn next(&mut self) -> Option<BoxRegion<'a>> {
        let at = self.offset;
        if at + 8 > self.buf.len() {
            return None;
        }
        let size32 = u32::from_be_bytes(self.buf[at..at + 4].try_into().ok()?) as u64;
        let kind: [u8; 4] = self.buf[at + 4..at + 8].try_into().ok()?;

        let (box_size, header_size) = match size32 {
            0 => ((self.buf.len() - at) as u64, 8usize),
            1 => {
                if at + 16 > self.buf.len() {
                    return None;
                }
                let large = u64::from_be_bytes(self.buf[at + 8..at + 16].try_into().ok()?);
                if large < 16 {
                    return None;
                }
                (large, 16usize)
            }
            n if n < 8 => return None,
            n => (n, 8usize),
        };

        let declared_end = (at as u64).checked_add(box_size)?;
        let truncated = declared_end > self.buf.len() as u64;
        let payload_start = at + header_size;
        let payload_end = if truncated {
            self.buf.len()
        } else {
            declared_end as usize
        };
        if payload_start > payload_end {
            return None;
        }

        self.offset = if truncated {
            self.buf.len()
        } else {
            declared_end as usize
        };
        Some(BoxRegion {
            kind,
            payload: &self.buf[payload_start..payload_end],
            truncated,
        })
    }
}

/// Byte length of the `mdat` payload, or None when the box is absent or its
/// declared size overruns the file (a truncated tail).
fn find_mdat_payload_len(buffer: &[u8]) -> Option<u64> {
    boxes(buffer)
        .find(|b| &b.kind == b"mdat")
        .filter(|b| !b.truncated)
        .map(|b| b.payload.len() as u64)
}

/// Sample count of the first video track, from the `stsz` box of the
/// `moov/trak/mdia` whose handler is `vide`.
fn video_sample_count(buffer: &[u8]) -> Option<u64> {
    let moov = boxes(buffer).find(|b| &b.kind == b"moov" && !b.truncated)?;
    for trak in boxes(moov.payload).filter(|b| &b.kind == b"trak") {
        let Some(mdia) = boxes(trak.payload).find(|b| &b.kind == b"mdia") else {
            continue;
        };
        let is_video = boxes(mdia.payload)
            .find(|b| &b.kind == b"hdlr")
            .and_then(|hdlr| hdlr.payload.get(8..12).map(|h| h == b"vide"))
            .unwrap_or(false);
        if !is_video {
            continue;
        }
        let Some(minf) = boxes(mdia.payload).find(|b| &b.kind == b"minf") else {
            continue;
        };
        let Some(stbl) = boxes(minf.payload).find(|b| &b.kind == b"stbl") else {
            continue;
        };
        let Some(stsz) = boxes(stbl.payload).find(|b| &b.kind == b"stsz") else {
            continue;
        };
        // stsz payload: version/flags (4), sample_size (4), sample_count (4)
        let count = stsz.payload.get(8..12)?;
        return Some(u32::from_be_bytes(count.try_into().ok()?) as u64);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::FileStatus;
    use std::io::Write;
    use tempfile::TempDir;

    fn scan_with(
        frame_rate: Option<f64>,
        frame_count: Option<u64>,
        samples: Vec<SampleFrame>,
    ) -> VideoScan {
        VideoScan {
            width: 640,
            height: 480,
            frame_rate,
            frame_count,
            duration_ms: Some(10_000),
            samples,
        }
    }

    #[test]
    fn readable_frames_with_sane_metadata_are_healthy() {
        let scan = scan_with(
            Some(29.97),
            Some(300),
            vec![SampleFrame::readable(640, 480); 3],
        );
        let verdict = classify(&scan, &VideoHeuristics::default());
        assert_eq!(verdict.status, FileStatus::Healthy);
    }

    #[test]
    fn no_readable_frames_is_corrupt() {
        let scan = scan_with(Some(30.0), Some(300), vec![SampleFrame::unreadable(); 3]);
        let verdict = classify(&scan, &VideoHeuristics::default());
        assert_eq!(verdict.status, FileStatus::Corrupt);
        assert!(verdict.reason.unwrap().contains("no readable sample frames"));
    }

    #[test]
    fn zero_dimension_samples_are_corrupt() {
        let scan = scan_with(Some(30.0), Some(300), vec![SampleFrame::readable(0, 0); 3]);
        let verdict = classify(&scan, &VideoHeuristics::default());
        assert_eq!(verdict.status, FileStatus::Corrupt);
    }

    #[test]
    fn inconsistent_sample_dimensions_are_corrupt() {
        let scan = scan_with(
            Some(30.0),
            Some(300),
            vec![
                SampleFrame::readable(640, 480),
                SampleFrame::readable(320, 240),
                SampleFrame::readable(640, 480),
            ],
        );
        let verdict = classify(&scan, &VideoHeuristics::default());
        assert_eq!(verdict.status, FileStatus::Corrupt);
        assert!(verdict.reason.unwrap().contains("inconsistent"));
    }

    #[test]
    fn garbage_metadata_with_readable_frames_is_suspicious_never_corrupt() {
        // The key tolerance heuristic: a zero frame count and missing frame
        // rate must not condemn decodable footage.
        let scan = scan_with(None, Some(0), vec![SampleFrame::readable(640, 480); 3]);
        let verdict = classify(&scan, &VideoHeuristics::default());
        assert_eq!(verdict.status, FileStatus::Suspicious);
        let reason = verdict.reason.unwrap();
        assert!(reason.contains("frame rate missing"));
        assert!(reason.contains("frame count missing or zero"));
    }

    #[test]
    fn zero_declared_dimensions_with_readable_frames_is_suspicious() {
        let mut scan = scan_with(
            Some(30.0),
            Some(300),
            vec![SampleFrame::readable(640, 480); 3],
        );
        scan.width = 0;
        scan.height = 0;
        let verdict = classify(&scan, &VideoHeuristics::default());
        assert_eq!(verdict.status, FileStatus::Suspicious);
        assert!(verdict.reason.unwrap().contains("declared dimensions"));
    }

    #[test]
    fn implausible_frame_rate_is_suspicious() {
        let scan = scan_with(
            Some(100_000.0),
            Some(300),
            vec![SampleFrame::readable(640, 480); 3],
        );
        let verdict = classify(&scan, &VideoHeuristics::default());
        assert_eq!(verdict.status, FileStatus::Suspicious);
        assert!(verdict.reason.unwrap().contains("implausible frame rate"));
    }

    #[test]
    fn single_readable_frame_with_good_metadata_is_healthy() {
        let scan = scan_with(
            Some(24.0),
            Some(100),
            vec![
                SampleFrame::readable(1920, 1080),
                SampleFrame::unreadable(),
                SampleFrame::unreadable(),
            ],
        );
        let verdict = classify(&scan, &VideoHeuristics::default());
        assert_eq!(verdict.status, FileStatus::Healthy);
    }

    #[test]
    fn mdat_walker_finds_payload() {
        // ftyp(16) + mdat(8 + 4 payload)
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&16u32.to_be_bytes());
        buffer.extend_from_slice(b"ftypisom\x00\x00\x00\x01");
        buffer.extend_from_slice(&12u32.to_be_bytes());
        buffer.extend_from_slice(b"mdat\xAA\xBB\xCC\xDD");
        assert_eq!(find_mdat_payload_len(&buffer), Some(4));
    }

    #[test]
    fn mdat_walker_rejects_truncated_box() {
        // mdat declares 100 bytes but the file ends after 4
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&100u32.to_be_bytes());
        buffer.extend_from_slice(b"mdat\xAA\xBB\xCC\xDD");
        assert_eq!(find_mdat_payload_len(&buffer), None);
    }

    fn boxed(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn sample_count_comes_from_the_video_trak_stsz() {
        let mut stsz_payload = vec![0u8; 8]; // version/flags + sample_size
        stsz_payload.extend_from_slice(&42u32.to_be_bytes());
        let stbl = boxed(b"stbl", &boxed(b"stsz", &stsz_payload));
        let minf = boxed(b"minf", &stbl);

        let mut hdlr_payload = vec![0u8; 8];
        hdlr_payload.extend_from_slice(b"vide");
        let hdlr = boxed(b"hdlr", &hdlr_payload);

        let mut mdia_payload = hdlr;
        mdia_payload.extend_from_slice(&minf);
        let trak = boxed(b"trak", &boxed(b"mdia", &mdia_payload));
        let moov = boxed(b"moov", &trak);

        assert_eq!(video_sample_count(&moov), Some(42));
    }

    #[test]
    fn sample_count_ignores_non_video_traks() {
        let mut hdlr_payload = vec![0u8; 8];
        hdlr_payload.extend_from_slice(b"soun");
        let hdlr = boxed(b"hdlr", &hdlr_payload);
        let trak = boxed(b"trak", &boxed(b"mdia", &hdlr));
        let moov = boxed(b"moov", &trak);

        assert_eq!(video_sample_count(&moov), None);
    }

    #[test]
    fn mdat_walker_handles_missing_mdat() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&16u32.to_be_bytes());
        buffer.extend_from_slice(b"ftypisom\x00\x00\x00\x01");
        assert_eq!(find_mdat_payload_len(&buffer), None);
    }

    #[test]
    fn mp4_probe_flags_garbage_container_as_structure_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.mp4");
        File::create(&path)
            .unwrap()
            .write_all(&[0x00; 64])
            .unwrap();
        let result = Mp4Probe.probe(&path, &VideoHeuristics::default());
        assert!(matches!(result, Err(ValidateError::Structure { .. })));
    }

    #[test]
    fn mp4_probe_missing_file_is_io_error() {
        let result = Mp4Probe.probe(Path::new("/nonexistent/v.mp4"), &VideoHeuristics::default());
        assert!(matches!(result, Err(ValidateError::Io { .. })));
    }
}
