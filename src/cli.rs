//! Command-line surface. Kept intentionally small: this binary packs one
//! folder into one `.ipf`, nothing more.

use std::path::PathBuf;

use clap::Parser;

use crate::error::IpfError;

#[derive(Parser, Debug)]
#[command(name = "ipf-pack", version, about = "Pack a folder into an IPF archive")]
pub struct Cli {
    /// Folder to ingest. Subfolders named `*.ipf` each become a pack unless
    /// `--pack-name` is given.
    pub input: PathBuf,

    /// Output archive path. Defaults to `{new_version}_001001.ipf`.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// New client version stamped into the footer; also the cipher gate.
    #[arg(long = "nv", default_value_t = 1_000_000)]
    pub new_version: u32,

    /// Old client version stamped into the footer.
    #[arg(long = "ov", default_value_t = 0)]
    pub old_version: u32,

    /// Ingest `input` as a single pack under this name, instead of
    /// auto-deriving packs from `*.ipf`-named subfolders.
    #[arg(short = 'p', long = "pack-name")]
    pub pack_name: Option<String>,

    /// Print progress to stderr. Repeat for more detail.
    #[arg(short = 'V', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Resolved, validated build parameters derived from `Cli`.
pub struct BuildConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub old_version: u32,
    pub new_version: u32,
    pub pack_name: Option<String>,
    pub verbose: u8,
}

impl TryFrom<Cli> for BuildConfig {
    type Error = IpfError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if !cli.input.is_dir() {
            return Err(IpfError::InvalidFormat(format!(
                "input {:?} is not a directory",
                cli.input
            )));
        }
        let output = cli
            .output
            .unwrap_or_else(|| PathBuf::from(format!("{}_001001.ipf", cli.new_version)));

        Ok(BuildConfig {
            input: cli.input,
            output,
            old_version: cli.old_version,
            new_version: cli.new_version,
            pack_name: cli.pack_name,
            verbose: cli.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_derives_from_new_version() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli {
            input: tmp.path().to_path_buf(),
            output: None,
            new_version: 42,
            old_version: 0,
            pack_name: None,
            verbose: 0,
        };
        let config = BuildConfig::try_from(cli).unwrap();
        assert_eq!(config.output, PathBuf::from("42_001001.ipf"));
    }

    #[test]
    fn rejects_non_directory_input() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let cli = Cli {
            input: tmp.path().to_path_buf(),
            output: None,
            new_version: 1,
            old_version: 0,
            pack_name: None,
            verbose: 0,
        };
        assert!(BuildConfig::try_from(cli).is_err());
    }
}
