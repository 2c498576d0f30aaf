//! Transparency Log Verification CLI
//!
//! Verifies log entries, signed checkpoints and consistency proofs that were
//! fetched from a log and saved to disk.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, SecondsFormat};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tlog_verifier::checkpoint::{parse_checkpoint, SignedCheckpoint};
use tlog_verifier::config::VerifierConfig;
use tlog_verifier::crypto::KeyType;
use tlog_verifier::entry::{parse_log_entries, select_entries, ConsistencyProofResponse, LogEntry};
use tlog_verifier::LogVerifier;

#[derive(Parser)]
#[command(name = "tlog-verify")]
#[command(about = "Verify transparency log entries, checkpoints and consistency proofs offline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Public key of the log, hex or PEM
    #[arg(long, global = true)]
    public_key: Option<String>,

    /// Public key type (secp256k1, ed25519, ecdsa-p256)
    #[arg(long, global = true)]
    key_type: Option<KeyType>,

    /// Expected checkpoint origin
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the inclusion proof and signed entry timestamp of log entries
    Entry {
        /// JSON entry response
        file: PathBuf,

        /// Only verify the entry with this UUID or entry ID
        #[arg(short, long)]
        uuid: Option<String>,

        /// Only verify the entry at this log index
        #[arg(long)]
        log_index: Option<u64>,
    },

    /// Verify the signature on a checkpoint
    Checkpoint {
        /// Signed checkpoint note
        file: PathBuf,
    },

    /// Verify that a newer checkpoint extends an older one
    Consistency {
        /// Previously trusted checkpoint
        old: PathBuf,

        /// Newly fetched checkpoint
        new: PathBuf,

        /// JSON consistency proof response
        proof: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = VerifierConfig::load_from(cli.config.as_deref())?;
    if let Some(public_key) = &cli.public_key {
        config.public_key = Some(public_key.clone());
    }
    if let Some(key_type) = cli.key_type {
        config.key_type = key_type;
    }
    if let Some(origin) = &cli.origin {
        config.expected_origin = Some(origin.clone());
    }

    let default_filter = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "tlog_verifier=debug,tlog_verify=debug".to_string()
    } else {
        config.log_filter.clone()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(&cli, &config) {
        error!("Verification failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn run(cli: &Cli, config: &VerifierConfig) -> Result<()> {
    let verifier = LogVerifier::from_config(config)?;

    match &cli.command {
        Commands::Entry {
            file,
            uuid,
            log_index,
        } => verify_entries(&verifier, file, uuid.as_deref(), *log_index, cli),
        Commands::Checkpoint { file } => {
            let checkpoint = read_checkpoint(file)?;
            verifier.verify_checkpoint_signature(&checkpoint)?;
            if !cli.quiet {
                println!("Origin: {}", checkpoint.origin());
                println!("Tree size: {}", checkpoint.size());
                println!("Root hash: {}", hex::encode(checkpoint.root_hash()));
                println!("✓ Checkpoint signature verified");
            }
            Ok(())
        }
        Commands::Consistency { old, new, proof } => {
            let old = read_checkpoint(old)?;
            let new = read_checkpoint(new)?;
            let response: ConsistencyProofResponse = serde_json::from_str(&read_file(proof)?)
                .with_context(|| format!("Failed to parse consistency proof {:?}", proof))?;

            verifier.verify_checkpoint_signature(&old)?;
            verifier.verify_checkpoint_signature(&new)?;
            verifier.verify_consistency_proof(&old.checkpoint, &new.checkpoint, &response)?;

            if !cli.quiet {
                println!(
                    "✓ {} is consistent from size {} to {}",
                    new.origin(),
                    old.size(),
                    new.size()
                );
            }
            Ok(())
        }
    }
}

fn verify_entries(
    verifier: &LogVerifier,
    file: &Path,
    uuid: Option<&str>,
    log_index: Option<u64>,
    cli: &Cli,
) -> Result<()> {
    let entries = parse_log_entries(&read_file(file)?)?;
    let selected = select_entries(&entries, uuid, log_index)?;

    if selected.is_empty() {
        return Err(match (uuid, log_index) {
            (Some(uuid), _) => anyhow!("No entry with UUID {} in {:?}", uuid, file),
            (None, Some(index)) => anyhow!("No entry at log index {} in {:?}", index, file),
            (None, None) => anyhow!("No entries in {:?}", file),
        });
    }

    for (key_uuid, entry) in selected {
        info!("Verifying entry {}", key_uuid);
        verifier
            .verify_log_entry(entry)
            .with_context(|| format!("Entry {}", key_uuid))?;
        if entry
            .inclusion_proof()
            .and_then(|p| p.checkpoint.as_ref())
            .is_some()
        {
            verifier
                .verify_entry_checkpoint(entry)
                .with_context(|| format!("Checkpoint for entry {}", key_uuid))?;
        }

        if !cli.quiet {
            print_entry(key_uuid, entry, cli.verbose);
        }
    }
    Ok(())
}

fn print_entry(uuid: &str, entry: &LogEntry, verbose: bool) {
    println!("UUID: {}", uuid);
    if let Some(log_id) = &entry.log_id {
        println!("LogID: {}", log_id);
    }
    if let Some(index) = entry.log_index {
        println!("Index: {}", index);
    }
    if let Some(integrated_time) = entry.integrated_time {
        match DateTime::from_timestamp(integrated_time, 0) {
            Some(time) => println!(
                "IntegratedTime: {}",
                time.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            None => println!("IntegratedTime: {}", integrated_time),
        }
    }
    if verbose {
        match serde_json::from_slice::<serde_json::Value>(&entry.body)
            .ok()
            .and_then(|body| serde_json::to_string_pretty(&body).ok())
        {
            Some(body) => println!("Body: {}", body),
            None => println!("Body: {}", STANDARD.encode(&entry.body)),
        }
    }
    println!("✓ Inclusion proof and signed entry timestamp verified\n");
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

fn read_checkpoint(path: &Path) -> Result<SignedCheckpoint> {
    parse_checkpoint(&read_file(path)?).with_context(|| format!("Invalid checkpoint {:?}", path))
}
