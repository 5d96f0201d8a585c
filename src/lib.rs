#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Relocator Core
//!
//! Bounded-concurrency orchestrator for bulk cross-vCenter VM relocations.
//!
//! ## Overview
//!
//! A run takes an ordered list of migration requests, drives each through a
//! short-circuiting validation pipeline and a greedy placement resolver, then
//! submits relocations to an abstract Infrastructure Provider while keeping
//! at most `max_concurrent` tasks in flight. In-flight tasks are reconciled
//! by polling on a fixed interval; the run ends when every request has
//! reached a terminal state, and the final report preserves input order.
//!
//! ## Module Organization
//!
//! - [`models`] - Work item record, lifecycle states, and the final report
//! - [`provider`] - Abstract Infrastructure Provider capability
//! - [`orchestration`] - Validation, placement, scheduling, notifications
//! - [`config`] - YAML configuration with environment overrides
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured tracing initialization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relocator_core::config::SchedulerConfig;
//! use relocator_core::models::{MigrationRequest, RunReport};
//! use relocator_core::orchestration::{LoggingNotificationSink, MigrationScheduler};
//! use relocator_core::provider::InfrastructureProvider;
//!
//! # async fn example(provider: Arc<dyn InfrastructureProvider>, requests: Vec<MigrationRequest>)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = MigrationScheduler::new(
//!     provider,
//!     Arc::new(LoggingNotificationSink),
//!     SchedulerConfig::default(),
//! );
//! let items = scheduler.run(requests).await?;
//! let report = RunReport::from_items(&items);
//! std::process::exit(report.exit_code());
//! # }
//! ```
//!
//! ## Failure Semantics
//!
//! Per-item failures (missing inventory, insufficient capacity, provider
//! task errors) become work item state and degrade the run's exit code; they
//! never abort the run. Only a connection-level provider failure is fatal.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod provider;

pub use config::{ConfigManager, RelocatorConfig, SchedulerConfig};
pub use constants::{defaults, events as system_events, status_groups};
pub use error::{RelocatorError, Result};
pub use models::{MigrationRequest, RunReport, SwitchType, WorkItem, WorkItemStatus};
pub use orchestration::{MigrationScheduler, NotificationSink, ValidationPipeline};
pub use provider::{InfrastructureProvider, ProviderError, TaskHandle};
