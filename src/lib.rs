//! # purrtop
//!
//! A terminal system monitor with a mood. Samples CPU, memory, OS-reserved
//! memory, GPU, network throughput and the biggest memory consumer from
//! native OS facilities, turns them into one of nine moods and draws a cat
//! in a panel over a drifting star field.
//!
//! ## Pipeline
//!
//! ```text
//! collectors ──▶ smoothing / mood ──▶ particles + compositor ──▶ terminal
//!                                                  ▲
//!                                     input ───────┘
//! ```
//!
//! - [`collectors`]: one native reader per source, behind [`collectors::Guarded`]
//! - [`smoothing`]: glitch hold and asymmetric EMA for the CPU
//! - [`mood`]: ordered classification rules, commentary, faces
//! - [`particles`]: the star field
//! - [`canvas`], [`compositor`], [`theme`], [`text`]: frame composition
//! - [`app`], [`terminal`], [`input`]: the frame loop and its lifecycle
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use purrtop::app;
//! use purrtop::collectors::SystemReaders;
//! use purrtop::config::Config;
//! use purrtop::terminal::{install_panic_hook, CrosstermConsole};
//!
//! install_panic_hook();
//! let config = Config::default();
//! let mut readers = SystemReaders::open();
//! let mut console = CrosstermConsole::new();
//! app::run(&config, &mut readers, &mut console)?;
//! # Ok::<(), purrtop::MonitorError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `nvidia`: read GPU engine utilization through NVML

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
// Terminal cell math casts between f64, i32, usize and u16 throughout
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod app;
pub mod canvas;
pub mod collectors;
pub mod compositor;
pub mod config;
pub mod error;
pub mod input;
pub mod mood;
pub mod particles;
pub mod smoothing;
pub mod terminal;
pub mod text;
pub mod theme;
pub mod types;

pub use error::{MonitorError, Result};
pub use types::{Fraction, MetricReader, MetricSample, MetricSource, ProcessMemoryGroup};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
