use std::path::PathBuf;

use clap::Parser;

/// Watch a camera feed for falls and ship evidence clips.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"Examples:
    fallwatch --replay session.jsonl
    fallwatch --replay session.jsonl --settings fallwatch.json --dry-run
    fallwatch --replay session.jsonl --output-dir /var/lib/fallwatch/clips --realtime"#)]
pub struct Cli {
    /// Recorded keypoint track (JSON lines) to replay as the camera feed
    #[arg(short, long)]
    pub replay: PathBuf,

    /// Settings file; written with defaults when missing
    #[arg(short, long, default_value = "fallwatch.json")]
    pub settings: PathBuf,

    /// Directory finished clips are written to (overrides settings)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Keep clips local and log alerts instead of sending them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Sleep between replayed frames to match recorded timestamps
    #[arg(long, default_value_t = false)]
    pub realtime: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["fallwatch", "--replay", "track.jsonl"]);
        assert_eq!(cli.replay, PathBuf::from("track.jsonl"));
        assert_eq!(cli.settings, PathBuf::from("fallwatch.json"));
        assert!(cli.output_dir.is_none());
        assert!(!cli.dry_run);
        assert!(!cli.realtime);
    }

    #[test]
    fn overrides() {
        let cli = Cli::parse_from([
            "fallwatch",
            "-r",
            "t.jsonl",
            "--settings",
            "/etc/fw.json",
            "--output-dir",
            "/tmp/clips",
            "--dry-run",
            "--realtime",
        ]);
        assert_eq!(cli.settings, PathBuf::from("/etc/fw.json"));
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/clips")));
        assert!(cli.dry_run);
        assert!(cli.realtime);
    }

    #[test]
    fn replay_is_required() {
        assert!(Cli::try_parse_from(["fallwatch"]).is_err());
    }
}
