//! Plate Scan Library
//!
//! Real-time licence plate capture and registry matching. A live camera
//! stream is sampled on a fixed interval, each still is sent to an
//! external recognizer, and the first valid plate becomes a candidate
//! that the user confirms against a vehicle registry.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → recognition → plate (normalize) → scan session → plate (match)
//!    ↑            │                                │               ↑
//!    └── scheduler (single-flight, timeout) ◀──────┘           registry
//! ```
//!
//! # Design Principles
//!
//! - **Single-flight**: at most one recognition call is ever outstanding
//! - **Contained failures**: transport errors and rejected text never leave the scheduler
//! - **Explicit session**: one object owns status, candidate, verdict and the armed flag
//! - **Fresh snapshots**: every check reads the registry again
//!
//! # Example
//!
//! ```no_run
//! use plate_scan::{
//!     capture::{CameraManager, CaptureConfig, MockBackend, Platform, ScanConfig},
//!     recognition::ScriptedRecognizer,
//!     registry::InMemoryRegistry,
//!     scan::ScanPipeline,
//! };
//!
//! # async fn demo() {
//! let camera = CameraManager::new(MockBackend::default(), Platform::Standard, &CaptureConfig::default());
//! let mut pipeline = ScanPipeline::new(
//!     camera,
//!     ScriptedRecognizer::new(),
//!     InMemoryRegistry::new(),
//!     &ScanConfig::default(),
//! );
//!
//! pipeline.activate().unwrap();
//! let (_stop, mut shutdown) = tokio::sync::watch::channel(false);
//! if let Some(plate) = pipeline.run_until_candidate(&mut shutdown).await {
//!     println!("candidate {}", plate);
//!     let verdict = pipeline.confirm().await;
//!     println!("{:?}", verdict);
//! }
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod activity;
#[cfg(feature = "http")]
pub mod backend;
pub mod capture;
pub mod metrics;
pub mod plate;
pub mod recognition;
pub mod registry;
pub mod scan;

// Re-export commonly used types at crate root
pub use activity::{ActivityEntry, ActivityLog};
pub use capture::{CameraBackend, CameraManager, CaptureConfig, CaptureFrame, ScanConfig};
pub use plate::{match_plate, normalize, PlateValidator};
pub use recognition::{BoundingBox, Recognition, Recognizer};
pub use registry::{RegistryRecord, VehicleRegistry};
pub use scan::{ScanPipeline, ScanSession, ScanStatus, Verdict};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
