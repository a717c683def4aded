/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod import;
pub use import::StatsdImporter;

mod parser;
pub use parser::{StatsdParseError, StatsdRecordVisitor};
