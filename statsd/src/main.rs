/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::Context;
use log::info;

use statsd::daemon::Daemon;
use statsd::opts::ProcArgs;
use statsd::stat::ServerStats;

fn main() -> anyhow::Result<()> {
    let Some(proc_args) =
        statsd::opts::parse_clap().context("failed to parse command line options")?
    else {
        return Ok(());
    };

    // set up process logger early, only proc args is used inside
    let (_log_guard, log_stats) = statsd::log::setup(proc_args.verbose_level)?;

    // a fatal error is printed once, by the return of main
    tokio_run(&proc_args, ServerStats::new().with_log_stats(log_stats))
}

fn tokio_run(args: &ProcArgs, stats: ServerStats) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("statsd-main")
        .build()
        .context("failed to start runtime")?;

    let ret = rt.block_on(async {
        let sinks = statsd::export::build_all(&args.config);
        let daemon = Daemon::start_with_stats(args.config.clone(), sinks, stats).await?;

        statsd::signal::register(daemon.quit_sender())
            .context("failed to setup signal handler")?;

        daemon.wait().await;
        Ok(())
    });

    rt.shutdown_timeout(args.config.shutdown_grace);
    info!("statsd exited");
    ret
}
