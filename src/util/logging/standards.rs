//! Centralised logging metadata (event names, shared keys, etc.).

/// Canonical event names used across the service.
pub mod events {
    /// HTTP request lifecycle.
    pub const REQUEST_START: &str = "request.start";
    pub const REQUEST_COMPLETE: &str = "request.complete";
    pub const REQUEST_ERROR: &str = "request.error";
    pub const REQUEST_SLOW: &str = "request.slow";

    /// Upload acceptor.
    pub const UPLOAD_ACCEPTED: &str = "upload.accepted";
    pub const UPLOAD_REJECTED: &str = "upload.rejected";
    pub const UPLOAD_TYPE_MISMATCH: &str = "upload.type_mismatch";
    pub const UPLOAD_CLEANUP_FAILED: &str = "upload.cleanup_failed";

    /// Per-file extraction.
    pub const OCR_EXTRACT_START: &str = "ocr.extract.start";
    pub const OCR_EXTRACT_COMPLETE: &str = "ocr.extract.complete";
    pub const OCR_EXTRACT_FAILED: &str = "ocr.extract.failed";

    /// Document assembly.
    pub const DOCUMENT_WRITTEN: &str = "document.written";
    pub const DOCUMENT_FAILED: &str = "document.failed";

    /// Batch pipeline lifecycle.
    pub const PIPELINE_STAGE: &str = "processing.stage";
    pub const PIPELINE_COMPLETE: &str = "processing.complete";
    pub const PIPELINE_ERROR: &str = "processing.error";

    /// Output retention sweeper.
    pub const RETENTION_SWEEP: &str = "retention.sweep";
    pub const RETENTION_SWEEP_FAILED: &str = "retention.sweep_failed";

    /// Server lifecycle.
    pub const SERVER_LISTENING: &str = "server.listening";
    pub const SERVER_SHUTDOWN: &str = "server.shutdown";
}
