//! Submit-and-poll adapters over the two long-running external jobs this
//! pipeline fans out to: video transcoding and ASR (§4.2).
//!
//! Both adapters share a `JobAdapter` trait (submit / poll / terminal-state
//! check) so the retry-with-backoff-around-submit+poll skeleton is written
//! once; the concrete wire shapes live in `transcoding` and `asr`.

pub mod asr;
pub mod job_adapter;
pub mod transcoding;

pub use asr::{AsrAdapter, AsrOutcome};
pub use job_adapter::{run_with_retry, JobAdapter, JobState};
pub use transcoding::{TranscodeOutcome, TranscodingAdapter};
