//! Ingestion services layer: the LM-driven annotation engine.
//!
//! Hosts `CatalogTool`, the `Annotator`s, `LmDriver`, `AnnotationOrchestrator`,
//! and `NotifierGateway` — everything between "ASR segments in hand" and
//! "annotations ready to persist" (§4.3-§4.8).

pub mod annotator;
pub mod catalog_tool;
pub mod lm_driver;
pub mod notifier;
pub mod orchestrator;
pub mod webhook;

pub use annotator::{Annotator, AnnotatorKind, PhraseAnnotator, WordAnnotator};
pub use catalog_tool::CatalogTool;
pub use lm_driver::{CacheHandle, LmDriver, ToolHandler};
pub use notifier::{Card, NotifierGateway, Severity};
pub use orchestrator::{AnnotationOrchestrator, AnnotationResult};
