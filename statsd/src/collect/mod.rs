/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

pub mod store;
pub use store::{AggregateStore, CounterSnapshot, FlushSnapshot, TimerSummary};
