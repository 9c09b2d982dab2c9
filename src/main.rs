mod cancel;
mod cli;
mod clipboard;
mod config;
mod crypto;
mod errors;
mod filesystem;
mod mem_struct;
mod namespace;
mod prompt;
mod random;
mod reveal;
mod store;

use cancel::CancelSignal;
use cli::{Cli, Commands};
use clipboard::XclipSink;
use config::Settings;
use crypto::{AgeGateway, CryptoGateway, GpgGateway};
use errors::{ErrorKind, SecretError};
use prompt::TerminalPrompter;
use random::PasswordPolicy;
use reveal::{RevealMode, RevealSession, RevealWindow};
use store::{PlaintextSource, Removed, StoreEngine};

use clap::Parser;
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

// Yet another password manager: secrets encrypted to a gpg key id, stored
// as one file per secret under ~/.password-store

/// Main function
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        report(&e);
        process::exit(e.exit_code());
    }
}

/// Logs go to stderr; RUST_LOG wins over --verbose
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "yapm=debug" } else { "yapm=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), SecretError> {
    let settings = Settings::resolve(cli.store, cli.gpg, cli.clipboard_tool, cli.age_identity)?;
    let cancel = CancelSignal::install()?;

    let crypto = gateway_for(&settings);
    let prompter = TerminalPrompter::new(&cancel);
    let clipboard = XclipSink::new(settings.clipboard_program.clone());

    let engine = StoreEngine::new(&settings, crypto.as_ref(), &prompter);
    let mut session = RevealSession::new(io::stdout(), &clipboard, &cancel);

    match cli.command {
        Commands::Init { key_id } => {
            let root = engine.init(&key_id)?;
            println!("Password store initialized at {}", root.display());
        }
        Commands::Add {
            path,
            interactive,
            length,
            symbols,
            uppercase,
            numbers,
            clipboard,
        } => {
            let source = if interactive {
                PlaintextSource::Interactive
            } else {
                PlaintextSource::Generate(PasswordPolicy::new(
                    length.into(),
                    uppercase,
                    symbols,
                    numbers,
                )?)
            };

            let outcome = engine.add(&path, source)?;
            println!("{} stored in {}", outcome.path, outcome.artifact.display());

            if let Some(generated) = &outcome.generated {
                let mode = if clipboard {
                    RevealMode::Clipboard
                } else {
                    RevealMode::Terminal
                };
                session.deliver(generated, mode, RevealWindow::default())?;
            }
        }
        Commands::Rm { path, recursive } => match engine.remove(&path, recursive)? {
            Removed::Secret(artifact) => println!("Removed {}", artifact.display()),
            Removed::Folder(folder) => {
                println!("Removed {} and everything below it", folder.display())
            }
        },
        Commands::Show {
            path,
            clipboard,
            time,
        } => engine.show(&path, clipboard, time, &mut session)?,
        Commands::Ls => {
            for name in engine.list()? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

/// age when an identity file is configured, gpg otherwise
fn gateway_for(settings: &Settings) -> Box<dyn CryptoGateway> {
    match &settings.age_identity {
        Some(identity) => Box::new(AgeGateway::with_identity_file(identity)),
        None => Box::new(GpgGateway::new(settings.gpg_program.clone())),
    }
}

fn report(err: &SecretError) {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::UserDeclined => eprintln!("{}", err),
        ErrorKind::Cancelled => eprintln!("\n{}", err),
        _ => eprintln!("Error: {}", err),
    }
}
