//! Archive download and extraction.

mod extract;
mod http;

pub use extract::{
    DEFAULT_MAX_ENTRIES, DEFAULT_MAX_EXTRACTED_BYTES, ExtractLimits, extract_zip,
};
pub use http::{ARCHIVE_CDN_HOST, DEFAULT_MAX_ARCHIVE_BYTES, HttpArchiveFetcher};
