/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum AdminCommand {
    Help,
    Stats,
    Counters,
    Timers,
    Gauges,
    Sets,
    Flush,
    Quit,
}

/// Commands in the order they are listed by `help`.
pub(super) const COMMAND_TABLE: &[(&str, AdminCommand, &str)] = &[
    ("stats", AdminCommand::Stats, "print server stats."),
    ("counters", AdminCommand::Counters, "print counter data."),
    ("timers", AdminCommand::Timers, "print timer data."),
    ("gauges", AdminCommand::Gauges, "print gauge data."),
    ("sets", AdminCommand::Sets, "print set data."),
    ("flush", AdminCommand::Flush, "flush metrics to sinks now."),
    ("help", AdminCommand::Help, "print this help."),
    ("quit", AdminCommand::Quit, "close this connection."),
];

impl AdminCommand {
    pub(super) fn lookup(name: &str) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, cmd, _)| *cmd)
    }

    pub(super) fn name(&self) -> &'static str {
        COMMAND_TABLE
            .iter()
            .find(|(_, cmd, _)| cmd == self)
            .map(|(n, _, _)| *n)
            .unwrap_or_default()
    }
}
