//! Bark Tracker - dog-bark detection over live streams and media files
//!
//! The crate turns a raw PCM byte stream (typically ffmpeg decoding an RTSP
//! camera feed or a recorded clip) into bark detection events:
//!
//! - [decode]: incremental 16-bit LE PCM decoding with one-time WAV header
//!   skip and chunk-boundary byte pairing
//! - [analysis]: overlapping window assembly and acoustic feature
//!   extraction (RMS, ZCR, spectral centroid and rolloff)
//! - [classify]: heuristic profile scoring, external audio-event models,
//!   per-window fallback, and any-positive ensembles
//! - [sink]: at-most-once detection persistence (JSON lines, in-memory)
//! - [pipeline]: per-source orchestration with ordered emission, plus the
//!   registry managing concurrent pipelines

pub mod analysis;
pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod pipeline;
pub mod sink;
