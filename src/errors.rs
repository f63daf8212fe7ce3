//! Error Types
//!
//! The main error type [`PrismError`] covers all failure modes of the engine:
//! GPU initialization, graph configuration, resource loading and the codec
//! boundary. All public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, PrismError>`.
//!
//! The codec and stream layers additionally use the compact [`ErrorCode`]
//! taxonomy, which consolidates decoder-native status codes into a single
//! enum that crosses the component boundary without allocation.

use thiserror::Error;

/// The main error type for the Prism engine.
#[derive(Error, Debug)]
pub enum PrismError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create a rendering surface.
    #[error("Failed to create surface: {0}")]
    SurfaceCreateFailed(#[from] wgpu::CreateSurfaceError),

    /// Window system error.
    #[error("Window system error: {0}")]
    WindowError(#[from] raw_window_handle::HandleError),

    // ========================================================================
    // Graph Errors
    // ========================================================================
    /// The requested node type is not registered.
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// A handle did not resolve to a live node.
    #[error("Node not found in the graph: {0}")]
    NodeNotFound(u64),

    /// A port index was out of range or the port kinds did not match.
    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    /// A node constructor required an engine resource the host did not
    /// provide (GPU context, stream manager, NDI sender).
    #[error("Missing engine resource: {0}")]
    MissingResource(&'static str),

    // ========================================================================
    // Resource & Codec Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecodeError(String),

    /// Codec-layer failure, carrying the consolidated code.
    #[error("Codec error: {0:?}")]
    CodecError(ErrorCode),

    /// A stream handle did not resolve to a registered stream.
    #[error("Stream not found: {0}")]
    StreamNotFound(u64),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// Property map parse error.
    #[error("Property parse error: {0}")]
    PropertyParseError(String),

    /// JSON parsing error (animation persisted state).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<image::ImageError> for PrismError {
    fn from(err: image::ImageError) -> Self {
        PrismError::ImageDecodeError(err.to_string())
    }
}

impl From<ErrorCode> for PrismError {
    fn from(code: ErrorCode) -> Self {
        PrismError::CodecError(code)
    }
}

/// Consolidated status taxonomy for the codec and stream layers.
///
/// `Again` and `EndOfFile` are flow-control signals, not failures: `Again`
/// means "retry once the other side has drained", `EndOfFile` triggers a
/// decoder flush. Everything else aborts the current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The operation cannot make progress right now; retry later.
    Again,
    /// End of stream; flush and surface "no frame available".
    EndOfFile,
    FileNotFound,
    InvalidArgument,
    NotEnoughMemory,
    IoError,
    DecoderNotFound,
    StreamNotFound,
    InvalidData,
    /// A timeout expired (stream open, fence wait).
    Timeout,
    /// Passthrough for codec-native codes not covered above.
    Native(i32),
}

impl ErrorCode {
    /// Whether this code is a flow-control signal rather than a failure.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorCode::Again | ErrorCode::EndOfFile)
    }
}

/// Alias for `Result<T, PrismError>`.
pub type Result<T> = std::result::Result<T, PrismError>;
