//! Runs a single ledger node from command-line arguments.
//!
//! # Usage
//! ```text
//! ledger-node <listen_addr> [OPTIONS]
//! ```
//!
//! # Options
//! - `--peer <addr>`: Peer to bootstrap from, may be repeated
//! - `--name <name>`: Name used in log lines (defaults to the listen address)
//! - `--workers <n>`: Maximum concurrent dials while bootstrapping
//! - `--debug`: Also print debug-level log lines

use ledger_node::core::ledger::Ledger;
use ledger_node::network::node::{Node, NodeOpts};
use ledger_node::utils::log::{Level, Logger};
use ledger_node::{error, info};
use std::env;
use std::process;
use std::sync::Arc;

const USAGE: &str = "\
Ledger Node

USAGE:
    {program} <listen_addr> [OPTIONS]

ARGS:
    <listen_addr>    Local address to bind (e.g., 127.0.0.1:3000)

OPTIONS:
    --peer <addr>    Peer to bootstrap from (repeatable)
    --name <name>    Node name shown in logs (defaults to listen address)
    --workers <n>    Maximum concurrent dials while bootstrapping (default 8)
    --debug          Print debug-level logs
    -h, --help       Print this help message

EXAMPLES:
    # Three nodes forming a mesh from chained bootstrap lists
    {program} 127.0.0.1:3000 --name node-a
    {program} 127.0.0.1:3001 --name node-b --peer 127.0.0.1:3000
    {program} 127.0.0.1:3002 --name node-c --peer 127.0.0.1:3001
";

fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}

/// Returns the value following the flag at `*i`, advancing past both.
fn flag_value<'a>(args: &'a [String], i: &mut usize) -> &'a str {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(value) => {
            *i += 1;
            value
        }
        None => {
            eprintln!("{flag} requires an argument");
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1] == "-h" || args[1] == "--help" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let mut opts = NodeOpts {
        listen_addr: args[1].clone(),
        ..Default::default()
    };
    let mut name: Option<String> = None;
    let mut level = Level::Info;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--peer" => {
                let peer = flag_value(&args, &mut i);
                opts.bootstrap.push(peer.to_string());
            }
            "--name" => {
                name = Some(flag_value(&args, &mut i).to_string());
            }
            "--workers" => {
                let value = flag_value(&args, &mut i);
                opts.max_dial_workers = match value.parse() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        eprintln!("Invalid worker count: {value}");
                        process::exit(1);
                    }
                };
            }
            "--debug" => {
                level = Level::Debug;
                i += 1;
            }
            other => {
                eprintln!("Unexpected argument: {other}\n");
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let name = name.unwrap_or_else(|| opts.listen_addr.clone());
    let ledger = Arc::new(Ledger::in_memory());
    info!(
        "Ledger initialized at height {} (tip {})",
        ledger.height(),
        ledger.tip_hash()
    );

    let node = Node::with_tcp(opts, ledger, Logger::new(name.clone(), level));
    let addr = match node.start().await {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to start node '{name}': {e}");
            process::exit(1);
        }
    };
    info!("Node '{name}' started on {addr}");

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to setup Ctrl+C handler: {e}");
        return;
    }
    info!(
        "Ctrl+C received, shutting down with {} peer(s)",
        node.peer_count()
    );
}
