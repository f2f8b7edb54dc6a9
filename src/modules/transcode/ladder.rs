use crate::media::probe::SourceInfo;

/// One rung of the fixed resolution ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rung {
    pub height: u32,
    pub bitrate_kbps: u32,
}

/// Ordered highest-first; rungs above the source height are skipped.
pub const LADDER: [Rung; 7] = [
    Rung { height: 2160, bitrate_kbps: 14000 },
    Rung { height: 1440, bitrate_kbps: 9000 },
    Rung { height: 1080, bitrate_kbps: 6500 },
    Rung { height: 720, bitrate_kbps: 4000 },
    Rung { height: 480, bitrate_kbps: 1800 },
    Rung { height: 360, bitrate_kbps: 900 },
    Rung { height: 240, bitrate_kbps: 500 },
];

/// Sources below the lowest rung are rejected at intake.
pub const MIN_SOURCE_HEIGHT: u32 = LADDER[LADDER.len() - 1].height;

pub const SUPPORTED_AUDIO_CODECS: &[&str] = &["aac", "mp3", "opus", "vorbis", "flac"];

pub const TARGET_AUDIO_CODEC: &str = "aac";
pub const TARGET_AUDIO_BITRATE_KBPS: u32 = 128;

// Fixed GOP so the packager can cut aligned segments across renditions.
pub const KEYFRAME_INTERVAL_FRAMES: u32 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Audio,
    Video(Rung),
}

/// Explicit step list for one job: the optional audio step first, then one
/// video step per rung the source resolution reaches.
pub fn plan_steps(source: &SourceInfo, include_audio: bool) -> Vec<Step> {
    let mut steps = Vec::new();

    if include_audio {
        steps.push(Step::Audio);
    }

    for rung in LADDER {
        if rung.height <= source.height {
            steps.push(Step::Video(rung));
        }
    }

    steps
}

pub fn audio_codec_supported(codec: &str) -> bool {
    SUPPORTED_AUDIO_CODECS.contains(&codec)
}

/// x264 preset by source codec class: already-h264 sources decode cheaply and
/// can afford a faster preset; heavier codecs get the slower default.
pub fn preset_for(video_codec: Option<&str>) -> &'static str {
    match video_codec {
        Some("h264") => "veryfast",
        Some("hevc") | Some("av1") | Some("vp9") => "medium",
        _ => "fast",
    }
}
