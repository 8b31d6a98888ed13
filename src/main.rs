//! Codex runtime CLI
//!
//! Usage:
//!   codex validate                                  # Validate the codex
//!   codex handshake --stakes high                   # Effective handshake header
//!   codex classify 0.33                             # Failure outcome + text
//!   codex reflex --stakes high hallucination=0.81   # Gate reflex scores
//!   codex serve --addr 127.0.0.1:3000               # HTTP API server
//!   codex --codex ./my_codex.json validate          # Use a codex file

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use codex_runtime::core::{
    build_handshake, classify_failure, failure_text, load_codex, run_server, schedule, validate,
};
use codex_runtime::types::{
    CitePolicy, CodexDocument, FailureOutcome, HandshakeOverrides, Mode, Stakes,
};
use codex_runtime::{CodexResult, DEFAULT_REFLEX_PROFILE, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "codex",
    version = VERSION,
    about = "Codex runtime - policy decisions for AI response pipelines",
    long_about = "Loads a codex document (policy defaults and thresholds) and answers\n\
                  the questions a response pipeline asks per request: which confidence\n\
                  bar applies, whether citations or an omission scan are mandatory,\n\
                  which reflexes fire or block, and how low confidence is phrased."
)]
struct Args {
    /// Codex document (default: built-in codex)
    #[arg(long, global = true)]
    codex: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the codex and print any issues
    Validate,

    /// Print the effective handshake header
    Handshake {
        #[arg(long, value_parser = parse_mode)]
        mode: Option<Mode>,
        #[arg(long, value_parser = parse_stakes)]
        stakes: Option<Stakes>,
        #[arg(long)]
        min_confidence: Option<f64>,
        #[arg(long, value_parser = parse_cite_policy)]
        cite_policy: Option<CitePolicy>,
        #[arg(long)]
        reflex_profile: Option<String>,
    },

    /// Classify a final confidence value
    Classify {
        confidence: f64,
    },

    /// Gate reflex scores given as id=score pairs
    Reflex {
        #[arg(long, default_value = DEFAULT_REFLEX_PROFILE)]
        profile: String,
        #[arg(long, value_parser = parse_stakes, default_value = "medium")]
        stakes: Stakes,
        #[arg(value_parser = parse_score)]
        scores: Vec<(String, f64)>,
    },

    /// Run as HTTP API server
    Serve {
        /// Server address
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    Mode::parse(s).ok_or_else(|| format!("unknown mode \"{}\" (direct, careful, recap)", s))
}

fn parse_stakes(s: &str) -> Result<Stakes, String> {
    Stakes::parse(s).ok_or_else(|| format!("unknown stakes \"{}\" (low, medium, high)", s))
}

fn parse_cite_policy(s: &str) -> Result<CitePolicy, String> {
    CitePolicy::parse(s).ok_or_else(|| format!("unknown cite policy \"{}\" (auto, force, off)", s))
}

fn parse_score(s: &str) -> Result<(String, f64), String> {
    let (id, score) = s
        .split_once('=')
        .ok_or_else(|| format!("expected id=score, got \"{}\"", s))?;
    let score: f64 = score
        .parse()
        .map_err(|_| format!("score for {} is not a number", id))?;
    Ok((id.to_string(), score))
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let codex = match open_codex(args.codex.as_ref()) {
        Ok(codex) => codex,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Command::Validate => run_validate(&codex, args.json),
        Command::Handshake { mode, stakes, min_confidence, cite_policy, reflex_profile } => {
            let overrides = HandshakeOverrides {
                mode,
                stakes,
                min_confidence,
                cite_policy,
                omission_scan: None,
                reflex_profile,
            };
            run_handshake(&codex, &overrides, args.json)
        }
        Command::Classify { confidence } => run_classify(&codex, confidence, args.json),
        Command::Reflex { profile, stakes, scores } => {
            run_reflex(&codex, &profile, stakes, scores.into_iter().collect(), args.json)
        }
        Command::Serve { addr } => run_serve(codex, &addr).await,
    }
}

/// Logs go to stderr so JSON on stdout stays clean
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn open_codex(path: Option<&PathBuf>) -> CodexResult<CodexDocument> {
    match path {
        Some(path) => load_codex(path),
        None => CodexDocument::builtin(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
    }
}

fn run_validate(codex: &CodexDocument, json: bool) -> ExitCode {
    let report = validate(codex);
    if json {
        print_json(&report);
    } else if report.ok {
        println!("{} codex {} is valid", "✓".green().bold(), codex.version);
        println!("  fingerprint: {}", codex.fingerprint().dimmed());
    } else {
        println!("{} codex {} has {} issue(s):", "✗".red().bold(), codex.version, report.errors.len());
        for error in &report.errors {
            println!("  - {}", error);
        }
    }
    if report.ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn run_handshake(codex: &CodexDocument, overrides: &HandshakeOverrides, json: bool) -> ExitCode {
    let handshake = build_handshake(codex, overrides);
    if json {
        print_json(&handshake);
    } else {
        println!("{}", handshake.to_parseable_string());
    }
    ExitCode::SUCCESS
}

fn run_classify(codex: &CodexDocument, confidence: f64, json: bool) -> ExitCode {
    let outcome = classify_failure(codex, confidence);
    let text = outcome.kind().map(|kind| failure_text(codex, kind));

    if json {
        print_json(&serde_json::json!({ "outcome": outcome, "failure": text }));
        return ExitCode::SUCCESS;
    }

    let label = outcome.to_string();
    let label = match outcome {
        FailureOutcome::Ok => label.green(),
        FailureOutcome::Hedge => label.yellow(),
        FailureOutcome::Refuse => label.red(),
    };
    println!("confidence={:.3} | outcome={}", confidence, label.bold());
    if let Some(text) = text {
        println!("  \"{}\" ({})", text.text, text.action.dimmed());
    }
    ExitCode::SUCCESS
}

fn run_reflex(
    codex: &CodexDocument,
    profile: &str,
    stakes: Stakes,
    scores: HashMap<String, f64>,
    json: bool,
) -> ExitCode {
    let report = schedule(codex, profile, &scores, stakes);
    if json {
        print_json(&report);
        return ExitCode::SUCCESS;
    }

    println!("profile={} | stakes={}", profile, stakes);
    for outcome in &report.outcomes {
        let status = match (outcome.decision.trigger, outcome.decision.block) {
            (_, true) => "BLOCK".red().bold(),
            (true, false) => "TRIGGER".yellow(),
            (false, false) => "quiet".dimmed(),
        };
        println!("  {:<20} {:.3}  {}", outcome.reflex, outcome.score, status);
    }
    for id in scores.keys() {
        if !report.outcomes.iter().any(|o| &o.reflex == id) {
            println!("  {:<20} {}", id, "not scheduled".dimmed());
        }
    }
    ExitCode::SUCCESS
}

async fn run_serve(codex: CodexDocument, addr: &str) -> ExitCode {
    let report = validate(&codex);
    if !report.ok {
        for error in &report.errors {
            tracing::warn!(%error, "serving with invalid codex");
        }
    }

    if let Err(e) = run_server(addr, Arc::new(codex)).await {
        eprintln!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
