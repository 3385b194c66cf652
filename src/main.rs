use anyhow::{Context as _, Result};
use clap::Parser;
use std::process::{exit, Command as Process};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sswenv::{
    cli::{Args, Command},
    export, report, ContextEnv, Session,
};

fn main() {
    // stdout is eval'd by the calling shell; logs go to stderr only.
    let layer = fmt::layer().compact().with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_env("SSWENV_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry().with(layer).with(filter).init();

    match run() {
        Ok(code) => exit(code),
        Err(error) => {
            error!("{error:?}");
            exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let args = Args::parse();
    let mut ctx = ContextEnv::new()?;
    let session = Session::load(&mut ctx, args.config.as_deref(), args.shell)?;

    let command = args.command();
    if let Command::Report { mode } = command {
        print!("{}", report::build_report(&session.cfg, mode));
        return Ok(0);
    }

    let source = ctx.hostname_source(args.host.as_deref());
    let resolved = session.resolve(source.as_ref());

    if let Command::Hosts = command {
        print!(
            "{}",
            report::host_listing(&session.cfg, &session.hosts, resolved.host())
        );
        return Ok(0);
    }

    let env = session.export_env(&ctx, &resolved, args.raw)?;

    match command {
        Command::Emit => {
            let toolkit = session.toolkit(&ctx, &resolved, &env, args.raw)?;
            print!(
                "{}",
                export::render_script(session.shell, &resolved, &env, toolkit.as_ref())
            );
        }
        Command::Show { json: true } => println!("{}", export::render_json(&resolved, &env)?),
        Command::Show { json: false } => print!("{}", export::render_plain(&env)),
        Command::Exec { argv } => return exec(&session, &argv, &env),
        Command::Hosts | Command::Report { .. } => {}
    }

    Ok(0)
}

fn exec(session: &Session, argv: &[String], env: &sswenv::EnvMap) -> Result<i32> {
    if session.cfg.active_toolkit().is_some() {
        warn!("toolkit setup is only sourced by `emit`; running without it");
    }

    let (program, rest) = argv.split_first().context("no command given to exec")?;
    let mut cmd = Process::new(program);
    cmd.args(rest);
    export::apply_to_command(&mut cmd, env);

    let status = cmd
        .status()
        .with_context(|| format!("failed to run {program}"))?;
    Ok(status.code().unwrap_or(1))
}
