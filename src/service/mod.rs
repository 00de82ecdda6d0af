//! Upload → parse → score → persist orchestration and its HTTP surface.

mod http;
mod pipeline;

pub use http::{router, ApiError};
pub use pipeline::{secure_filename, PipelineError, PipelineService, Upload, UploadReceipt};
