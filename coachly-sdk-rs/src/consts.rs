use std::time::Duration;

/// Timeout for a single multipart chunk PUT.
pub const CHUNK_UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);
/// Timeout for a whole-file single-shot PUT.
pub const FILE_UPLOAD_TIMEOUT: Duration = Duration::from_secs(1800);

pub const MAX_UPLOAD_RETRIES: u32 = 3;
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Presigned URLs are requested this many parts at a time during
/// fetch-ahead, so the signing endpoint is never hit with the full part
/// range at once.
pub const PRESIGN_BATCH_SIZE: usize = 10;

/// Concurrent chunk workers for a single file.
pub const DEFAULT_MAX_WORKERS: usize = 6;
/// Concurrent chunk workers across a whole batch of files.
pub const GLOBAL_CONCURRENCY_CEILING: usize = 12;
pub const MIN_WORKERS_PER_FILE: usize = 2;

pub const MAX_PART_NUMBER: u16 = 10_000;

/// Frame size for the progress-counting PUT body stream.
pub const PROGRESS_FRAME_SIZE: usize = 64 * 1024;

pub const OCTET_STREAM: &str = "application/octet-stream";
