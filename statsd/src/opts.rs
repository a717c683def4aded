/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::config::StatsdConfig;

const ARGS_VERSION: &str = "version";
const ARGS_VERBOSE: &str = "verbose";
const ARGS_HOST: &str = "host";
const ARGS_PORT: &str = "port";
const ARGS_ADMIN_HOST: &str = "admin-host";
const ARGS_ADMIN_PORT: &str = "admin-port";
const ARGS_CONSOLE: &str = "console";
const ARGS_FLUSH_INTERVAL: &str = "flush-interval";
const ARGS_MANUAL_FLUSH: &str = "manual-flush";
const ARGS_RELATIVE_GAUGES: &str = "relative-gauges";
const ARGS_ADMIN_MAX_SESSIONS: &str = "admin-max-sessions";

#[derive(Debug, Default)]
pub struct ProcArgs {
    pub verbose_level: u8,
    pub config: StatsdConfig,
}

fn build_cli_args() -> Command {
    Command::new(crate::build::PKG_NAME)
        .disable_version_flag(true)
        .arg(
            Arg::new(ARGS_VERSION)
                .help("Show version")
                .action(ArgAction::SetTrue)
                .short('V')
                .long(ARGS_VERSION),
        )
        .arg(
            Arg::new(ARGS_VERBOSE)
                .help("Show verbose output")
                .num_args(0)
                .action(ArgAction::Count)
                .short('v')
                .long(ARGS_VERBOSE),
        )
        .arg(
            Arg::new(ARGS_HOST)
                .help("The address to listen for metrics")
                .num_args(1)
                .value_name("HOST")
                .value_parser(value_parser!(IpAddr))
                .default_value("0.0.0.0")
                .long(ARGS_HOST),
        )
        .arg(
            Arg::new(ARGS_PORT)
                .help("The UDP port to listen for metrics")
                .num_args(1)
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .default_value("8125")
                .short('p')
                .long(ARGS_PORT),
        )
        .arg(
            Arg::new(ARGS_ADMIN_HOST)
                .help("The address to listen for admin connections")
                .num_args(1)
                .value_name("HOST")
                .value_parser(value_parser!(IpAddr))
                .default_value("127.0.0.1")
                .long(ARGS_ADMIN_HOST),
        )
        .arg(
            Arg::new(ARGS_ADMIN_PORT)
                .help("The TCP port for the admin console")
                .num_args(1)
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .default_value("8126")
                .short('a')
                .long(ARGS_ADMIN_PORT),
        )
        .arg(
            Arg::new(ARGS_CONSOLE)
                .help("Print flushed metrics to stdout")
                .action(ArgAction::SetTrue)
                .long(ARGS_CONSOLE),
        )
        .arg(
            Arg::new(ARGS_FLUSH_INTERVAL)
                .help("How frequently to flush metrics, in seconds")
                .num_args(1)
                .value_name("SECONDS")
                .value_parser(value_parser!(u64).range(1..))
                .default_value("10")
                .long(ARGS_FLUSH_INTERVAL),
        )
        .arg(
            Arg::new(ARGS_MANUAL_FLUSH)
                .help("Disable the flush timer, flush only by the admin command")
                .action(ArgAction::SetTrue)
                .long(ARGS_MANUAL_FLUSH),
        )
        .arg(
            Arg::new(ARGS_RELATIVE_GAUGES)
                .help("Treat gauge values with a leading +/- as relative changes")
                .action(ArgAction::SetTrue)
                .long(ARGS_RELATIVE_GAUGES),
        )
        .arg(
            Arg::new(ARGS_ADMIN_MAX_SESSIONS)
                .help("Max number of concurrent admin sessions")
                .num_args(1)
                .value_name("COUNT")
                .value_parser(value_parser!(usize))
                .default_value("64")
                .long(ARGS_ADMIN_MAX_SESSIONS),
        )
}

fn parse_matches(args: &ArgMatches) -> anyhow::Result<Option<ProcArgs>> {
    let mut proc_args = ProcArgs::default();

    if let Some(verbose_level) = args.get_one::<u8>(ARGS_VERBOSE) {
        proc_args.verbose_level = *verbose_level;
    }
    if args.get_flag(ARGS_VERSION) {
        crate::build::print_version(proc_args.verbose_level);
        return Ok(None);
    }

    let config = &mut proc_args.config;
    if let Some(host) = args.get_one::<IpAddr>(ARGS_HOST) {
        config.listen.set_ip(*host);
    }
    if let Some(port) = args.get_one::<u16>(ARGS_PORT) {
        config.listen.set_port(*port);
    }
    if let Some(host) = args.get_one::<IpAddr>(ARGS_ADMIN_HOST) {
        config.admin_listen.set_ip(*host);
    }
    if let Some(port) = args.get_one::<u16>(ARGS_ADMIN_PORT) {
        config.admin_listen.set_port(*port);
    }
    config.console = args.get_flag(ARGS_CONSOLE);
    if let Some(secs) = args.get_one::<u64>(ARGS_FLUSH_INTERVAL) {
        config.flush_interval = Duration::from_secs(*secs);
    }
    config.manual_flush = args.get_flag(ARGS_MANUAL_FLUSH);
    config.relative_gauges = args.get_flag(ARGS_RELATIVE_GAUGES);
    if let Some(n) = args.get_one::<usize>(ARGS_ADMIN_MAX_SESSIONS) {
        config.admin_max_sessions = *n;
    }
    config.check().context("invalid command line options")?;

    Ok(Some(proc_args))
}

pub fn parse_clap() -> anyhow::Result<Option<ProcArgs>> {
    let args = build_cli_args().get_matches();
    parse_matches(&args)
}
