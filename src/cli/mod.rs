//! CLI Module
//!
//! Command-line interface for the fxrack effects host.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fxrack - stereo effects host and impulse response tools
#[derive(Parser, Debug)]
#[command(name = "fxrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Host configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the impulse responses in the kernel directory
    #[command(name = "list-kernels")]
    ListKernels,

    /// Convolve two impulse responses into a new one
    #[command(name = "combine")]
    Combine {
        /// First kernel name (without extension)
        kernel_1: String,

        /// Second kernel name (without extension)
        kernel_2: String,

        /// Name of the combined kernel
        output: String,
    },

    /// Run a WAV file through an effect chain
    #[command(name = "process")]
    Process {
        /// Input WAV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Preset document to load into the chain
        #[arg(short, long)]
        preset: Option<PathBuf>,

        /// Effects in processing order
        #[arg(short, long, value_delimiter = ',', default_value = "equalizer")]
        effects: Vec<String>,
    },

    /// Print the default preset document for a chain
    #[command(name = "preset")]
    Preset {
        /// Effects to include
        #[arg(
            short,
            long,
            value_delimiter = ',',
            default_value = "pitch,equalizer,psyclipper,loudness"
        )]
        effects: Vec<String>,

        /// Preset section
        #[arg(short, long, default_value = "output")]
        section: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process() {
        let cli = Cli::parse_from([
            "fxrack",
            "-v",
            "process",
            "-i",
            "in.wav",
            "-o",
            "out.wav",
            "--effects",
            "pitch,equalizer",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Process { effects, preset, .. }) => {
                assert_eq!(effects, vec!["pitch", "equalizer"]);
                assert!(preset.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_combine_with_config() {
        let cli = Cli::parse_from([
            "fxrack",
            "combine",
            "hall",
            "plate",
            "both",
            "--config",
            "host.json",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("host.json")));
        assert!(matches!(
            cli.command,
            Some(Commands::Combine { ref output, .. }) if output == "both"
        ));
    }
}
