// Copyright (C) Microsoft Corporation. All rights reserved.

//! Prints which native digest backend this host resolves to.

use std::process::ExitCode;

use clap::Parser;
use native_digest::*;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct CliArgs {
    /// Extra directory to search for the native library (repeatable)
    #[arg(long = "library-dir")]
    library_dirs: Vec<std::path::PathBuf>,

    /// ABI generation to probe first: legacy, modern or current
    #[arg(long)]
    backend: Option<String>,

    /// Digest names to query
    #[arg(default_values_t = ["SHA256".to_string()])]
    algorithms: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    // Example expected output:

    // ====Start Logging native digest backend
    // Library: "libssl (current)"
    // Version: "OpenSSL 3.0.13 30 Jan 2024"
    // Version number: 0x300000d0
    // SHA256: size 32, block 64, empty e3b0c442...
    // ====Done Logging native digest backend

    let backend = match resolve(&args) {
        Ok(backend) => backend,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    println!("====Start Logging native digest backend");
    println!("Library: {:?}", backend.descriptor().to_string());
    println!("Version: {:?}", backend.version());
    println!("Version number: {:#x}", backend.version_number());

    let mut status = ExitCode::SUCCESS;
    for name in &args.algorithms {
        match describe(backend, name) {
            Ok(line) => println!("{name}: {line}"),
            Err(err) => {
                println!("{name}: {err}");
                status = ExitCode::FAILURE;
            }
        }
    }

    println!("====Done Logging native digest backend");
    status
}

fn resolve(args: &CliArgs) -> Result<&'static ActiveBackend, DigestError> {
    if args.library_dirs.is_empty() && args.backend.is_none() {
        return Ok(active_backend()?);
    }

    // Explicit options replace the environment.
    let mut config = ProbeConfig::from_vars(None, args.backend.as_deref());
    for dir in &args.library_dirs {
        config = config.with_search_dir(dir);
    }

    static SLOT: BackendSlot = BackendSlot::new();
    let loader = SystemLoader::new(&config);
    let registry = BackendRegistry::from_config(&config);
    Ok(SLOT.get_or_resolve(&loader, &registry)?)
}

fn describe(backend: &ActiveBackend, name: &str) -> Result<String, DigestError> {
    let algo = DigestAlgo::lookup(backend, name)?;
    let empty = Hasher::hash_vec(&algo, &[])?;
    Ok(format!(
        "size {}, block {}, empty {}",
        algo.output_size()?,
        algo.block_size()?,
        hex::encode(empty)
    ))
}
