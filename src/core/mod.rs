//! Core modules for facestate

pub mod api;
pub mod assets;
pub mod classifier;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod stability;
pub mod trace;

pub use api::{create_router, run_server};
pub use assets::{AssetCatalog, AssetRef};
pub use classifier::{ClassifierLabels, PriorityClassifier, SignalClassifier};
pub use config::EngineConfig;
pub use pipeline::FramePipeline;
pub use report::{load_report, save_report, ReportBuilder};
pub use stability::StabilityEngine;
pub use trace::{candidate_from_name, TraceParser, MAX_TRACE_REPEAT};
