/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

pub mod admin;
pub mod build;
pub mod collect;
pub mod config;
pub mod daemon;
pub mod export;
pub mod flush;
pub mod import;
pub mod log;
pub mod opts;
pub mod signal;
pub mod stat;
pub mod types;
