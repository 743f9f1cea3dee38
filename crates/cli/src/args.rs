use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "seqexec",
    version,
    about = "Run every script under a directory once, in order, resuming after failures"
)]
pub struct Args {
    /// Directory to scan for `.py` and `.sh` scripts.
    pub directory: PathBuf,

    /// Forget completed scripts and start from scratch.
    #[arg(long)]
    pub reset: bool,

    /// Kill a script that runs longer than this many seconds.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Do not write or upload harvested results.
    #[arg(long)]
    pub no_export: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_is_required() {
        assert!(Args::try_parse_from(["seqexec"]).is_err());
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["seqexec", "jobs"]).unwrap();
        assert_eq!(args.directory, PathBuf::from("jobs"));
        assert!(!args.reset);
        assert_eq!(args.timeout, None);
        assert!(!args.no_export);
    }

    #[test]
    fn all_flags() {
        let args =
            Args::try_parse_from(["seqexec", "/srv/jobs", "--reset", "--timeout", "30", "--no-export"])
                .unwrap();
        assert!(args.reset);
        assert_eq!(args.timeout, Some(30));
        assert!(args.no_export);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Args::try_parse_from(["seqexec", "jobs", "--timeout", "0"]).is_err());
    }
}
