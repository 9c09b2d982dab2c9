use crate::config::{DEFAULT_CLIPBOARD_PROGRAM, DEFAULT_GPG_PROGRAM};
use crate::reveal::DEFAULT_TIME;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_LENGTH: &str = "21";

#[derive(Parser)]
#[command(name = "yapm", version, about, arg_required_else_help = true)]
pub struct Cli {
    /// Log what is being done (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Password store directory [default: ~/.password-store]
    #[arg(long, global = true, env = "PASSWORD_STORE_DIR")]
    pub store: Option<PathBuf>,

    /// gpg binary used for encryption and decryption
    #[arg(long, global = true, env = "YAPM_GPG", default_value = DEFAULT_GPG_PROGRAM)]
    pub gpg: String,

    /// Clipboard utility fed through stdin
    #[arg(long, global = true, env = "YAPM_CLIPBOARD", default_value = DEFAULT_CLIPBOARD_PROGRAM)]
    pub clipboard_tool: String,

    /// Use age instead of gpg, decrypting with this identity file
    #[arg(long, global = true, env = "YAPM_AGE_IDENTITY")]
    pub age_identity: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the password store for a key id
    Init {
        /// Recipient key id (gpg key id, or an age1... recipient)
        key_id: String,
    },
    /// Add a password, generated unless --interactive is given
    Add {
        /// Secret path, e.g. email/google
        path: String,
        /// Type the password instead of generating one
        #[arg(short, long, conflicts_with_all = ["length", "symbols", "uppercase", "numbers"])]
        interactive: bool,
        /// Length of the generated password
        #[arg(short, long, default_value = DEFAULT_LENGTH, value_parser = clap::value_parser!(u16).range(1..))]
        length: u16,
        /// Include symbols
        #[arg(short, long)]
        symbols: bool,
        /// Include uppercase letters
        #[arg(short, long)]
        uppercase: bool,
        /// Include digits
        #[arg(short, long)]
        numbers: bool,
        /// Copy the generated password to the clipboard instead of printing it
        #[arg(short, long)]
        clipboard: bool,
    },
    /// Remove a password, or a whole folder with --recursive
    Rm {
        /// Secret path
        path: String,
        /// Remove a folder and everything below it
        #[arg(short, long)]
        recursive: bool,
    },
    /// Decrypt and show a password for a limited time
    Show {
        /// Secret path
        path: String,
        /// Copy to the clipboard instead of printing
        #[arg(short, long)]
        clipboard: bool,
        /// Seconds before the password is erased (max 30)
        #[arg(short, long, default_value_t = DEFAULT_TIME)]
        time: u64,
    },
    /// List stored passwords
    Ls,
}
