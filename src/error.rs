// Error types for the bark detection pipeline
//
// Each error kind maps to one containment boundary: decode and inference
// errors are contained at the window boundary, model-load errors permanently
// route a pipeline to the heuristic path, sink errors are surfaced but never
// stop a stream, and only decoder-process death is fatal.

use std::fmt;

/// Malformed or truncated audio framing. Recoverable: the fragment is
/// dropped and the pipeline continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The byte stream ended in the middle of a 16-bit sample.
    TrailingByte,
    /// The stream ended before the container header was complete.
    TruncatedHeader { got: usize, expected: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TrailingByte => {
                write!(f, "audio stream terminated mid-sample (odd trailing byte)")
            }
            DecodeError::TruncatedHeader { got, expected } => {
                write!(
                    f,
                    "audio stream ended inside the container header ({} of {} bytes)",
                    got, expected
                )
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// The external ML classifier could not be loaded. Recoverable: the
/// pipeline instance permanently falls back to the heuristic classifier.
#[derive(Debug, Clone)]
pub struct ModelLoadError {
    pub model: String,
    pub reason: String,
}

impl fmt::Display for ModelLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load model '{}': {}", self.model, self.reason)
    }
}

impl std::error::Error for ModelLoadError {}

/// Per-window ML inference failure. Recoverable: the window is re-scored
/// by the heuristic classifier.
#[derive(Debug, Clone)]
pub struct InferenceError {
    pub model: String,
    pub reason: String,
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inference failed on model '{}': {}",
            self.model, self.reason
        )
    }
}

impl std::error::Error for InferenceError {}

/// Persistence failure from the detection sink. Surfaced to the caller and
/// logged; never restarts or stops the stream.
#[derive(Debug)]
pub enum SinkError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
    Closed,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Io(err) => write!(f, "sink I/O error: {}", err),
            SinkError::Serialize(err) => write!(f, "sink serialization error: {}", err),
            SinkError::Closed => write!(f, "sink is closed"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Io(err) => Some(err),
            SinkError::Serialize(err) => Some(err),
            SinkError::Closed => None,
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialize(err)
    }
}

/// Decoding-process failure. Fatal for stream mode; fails the overall
/// operation in file mode.
#[derive(Debug, Clone)]
pub enum ProcessError {
    /// The process could not be spawned.
    SpawnFailed { command: String, reason: String },
    /// The process exited with a non-zero status.
    Exited { code: Option<i32> },
    /// The chunk channel closed before end-of-stream was signalled.
    ChannelClosed,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::SpawnFailed { command, reason } => {
                write!(f, "failed to spawn '{}': {}", command, reason)
            }
            ProcessError::Exited { code: Some(code) } => {
                write!(f, "decoding process exited with code {}", code)
            }
            ProcessError::Exited { code: None } => {
                write!(f, "decoding process was killed by a signal")
            }
            ProcessError::ChannelClosed => {
                write!(f, "chunk channel closed unexpectedly")
            }
        }
    }
}

impl std::error::Error for ProcessError {}

/// Error kind recorded as a pipeline's terminal status detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Decode,
    ModelLoad,
    Inference,
    Sink,
    Process,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Decode => "decode",
            ErrorKind::ModelLoad => "model_load",
            ErrorKind::Inference => "inference",
            ErrorKind::Sink => "sink",
            ErrorKind::Process => "process",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::TrailingByte;
        assert!(err.to_string().contains("mid-sample"));

        let err = DecodeError::TruncatedHeader {
            got: 10,
            expected: 44,
        };
        assert!(err.to_string().contains("10 of 44"));
    }

    #[test]
    fn test_process_error_display() {
        let err = ProcessError::Exited { code: Some(1) };
        assert!(err.to_string().contains("code 1"));

        let err = ProcessError::Exited { code: None };
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn test_sink_error_from_io() {
        let io_err = std::io::Error::other("disk full");
        let sink_err: SinkError = io_err.into();
        assert!(sink_err.to_string().contains("disk full"));
    }

    #[test]
    fn test_error_kind_serde() {
        let json = serde_json::to_string(&ErrorKind::ModelLoad).unwrap();
        assert_eq!(json, "\"model_load\"");
        assert_eq!(ErrorKind::Process.to_string(), "process");
    }
}
