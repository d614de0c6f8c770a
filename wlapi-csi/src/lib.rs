//! # wlapi-csi — Workload API socket CSI node plugin
//!
//! Publishes the node agent's Workload API socket directory into a
//! workload's ephemeral CSI volume as a read-only bind mount, and removes it
//! again on unpublish.
//!
//! | Module | Purpose |
//! |---|---|
//! | [`capability`] | Predicates over the supported capability profile. |
//! | [`validate`] | Ordered request validation rules. |
//! | [`mounter`] | [`MountOperator`] — target directory and bind mount lifecycle. |
//! | [`plugin`] | [`WorkloadApiPlugin`] — CSI Identity and Node services. |
//! | [`config`] | Command-line flags and the resolved [`Config`]. |
//!
//! [`MountOperator`]: mounter::MountOperator
//! [`WorkloadApiPlugin`]: plugin::WorkloadApiPlugin
//! [`Config`]: config::Config

pub mod capability;
pub mod config;
pub mod mounter;
pub mod plugin;
pub mod validate;
