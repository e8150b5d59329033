// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions shared across the workspace.

pub mod service;

pub use service::Service;
