//! Tests for command-line parsing and the end-to-end batch runner

#[cfg(test)]
mod tests {
    use crate::support::png_bytes;
    use clap::Parser;
    use multiverse::MultiverseError;
    use multiverse::album::compositor::AlbumFormat;
    use multiverse::io::cli::{Backend, BatchRunner, Cli};
    use multiverse::io::configuration::{DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR};
    use multiverse::io::logging::Verbosity;
    use std::ffi::OsStr;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_source(dir: &Path) -> PathBuf {
        let path = dir.join("photo.png");
        std::fs::write(&path, png_bytes(48, 32, [180, 90, 40]).as_bytes()).expect("write source");
        path
    }

    // Tests CLI parsing with only the required source argument
    // Verified by changing default values to ensure defaults are used
    #[test]
    fn test_cli_parse_minimal_args() {
        let cli = Cli::parse_from(["multiverse", "photo.png"]);

        assert_eq!(cli.source, PathBuf::from("photo.png"));
        assert_eq!(cli.output, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(cli.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(cli.backend, Backend::Local);
        assert_eq!(cli.format, AlbumFormat::Png);
        assert!(!cli.no_album);
        assert_eq!(cli.verbosity(), Verbosity::Normal);
        assert!(cli.should_show_progress());
    }

    // Tests CLI parsing with all available arguments
    // Verified by renaming a long flag
    #[test]
    fn test_cli_parse_all_args() {
        let cli = Cli::parse_from([
            "multiverse",
            "in.jpg",
            "--output",
            "albums",
            "--concurrency",
            "4",
            "--backend",
            "command",
            "--generator",
            "/usr/local/bin/gen",
            "--generator-arg",
            "--steps=30",
            "--timeout",
            "15",
            "--format",
            "jpeg",
            "--no-album",
            "--verbose",
        ]);

        assert_eq!(cli.output, PathBuf::from("albums"));
        assert_eq!(cli.concurrency, 4);
        assert_eq!(cli.backend, Backend::Command);
        assert_eq!(cli.generator, Some(PathBuf::from("/usr/local/bin/gen")));
        assert_eq!(cli.generator_args, ["--steps=30"]);
        assert_eq!(cli.format, AlbumFormat::Jpeg);
        assert!(cli.no_album);
        assert_eq!(cli.verbosity(), Verbosity::Verbose);

        let config = cli.pool_config().expect("valid config");
        assert_eq!(config.concurrency(), 4);
        assert_eq!(config.timeout(), Some(Duration::from_secs(15)));
        assert!(cli.client().is_ok());
    }

    // Tests quiet and verbose cannot be combined
    // Verified by removing the conflict declaration
    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["multiverse", "a.png", "-q", "-v"]).is_err());

        let quiet = Cli::parse_from(["multiverse", "a.png", "-q"]);
        assert_eq!(quiet.verbosity(), Verbosity::Quiet);
        assert!(!quiet.should_show_progress());
    }

    // Tests invalid flag values surface as parameter errors
    // Verified by clamping concurrency instead of rejecting it
    #[test]
    fn test_invalid_configuration() {
        let zero = Cli::parse_from(["multiverse", "a.png", "-c", "0"]);
        assert!(matches!(
            zero.pool_config(),
            Err(MultiverseError::InvalidParameter {
                parameter: "concurrency",
                ..
            })
        ));

        let untimed = Cli::parse_from(["multiverse", "a.png", "-t", "0"]);
        assert_eq!(untimed.pool_config().expect("valid").timeout(), None);

        let mut no_generator = Cli::parse_from(["multiverse", "a.png", "-b", "command"]);
        no_generator.generator = None;
        assert!(matches!(
            no_generator.client(),
            Err(MultiverseError::InvalidParameter {
                parameter: "generator",
                ..
            })
        ));
    }

    // Tests a local run writes every universe and the album
    // Verified by skipping the album export
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_local_run_writes_outputs() {
        let dir = TempDir::new().expect("tempdir");
        let source = write_source(dir.path());
        let output = dir.path().join("out");
        let cli = Cli::parse_from([
            OsStr::new("multiverse"),
            source.as_os_str(),
            OsStr::new("-o"),
            output.as_os_str(),
        ]);

        let summary = BatchRunner::without_progress(cli)
            .run()
            .await
            .expect("local run succeeds");

        assert_eq!(summary.report.completed, 6);
        assert_eq!(summary.images.len(), 6);
        assert!(summary.images.iter().all(|path| path.exists()));
        let album = summary.album.expect("album requested");
        assert_eq!(album, output.join("multiverse-album.png"));
        assert!(album.exists());
    }

    // Tests a failed universe still exports the others before the album error
    // Verified by composing the album before exporting images
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_universe_exports_rest() {
        let dir = TempDir::new().expect("tempdir");
        let source = write_source(dir.path());
        let output = dir.path().join("out");
        let script = dir.path().join("generator.sh");
        std::fs::write(
            &script,
            r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --prompt) prompt="$2"; shift 2 ;;
    --input) input="$2"; shift 2 ;;
    --output) output="$2"; shift 2 ;;
    *) shift ;;
  esac
done
case "$prompt" in
  *Fantasy*) echo "blocked" >&2; exit 1 ;;
esac
cp "$input" "$output"
"#,
        )
        .expect("write script");

        let cli = Cli::parse_from([
            OsStr::new("multiverse"),
            source.as_os_str(),
            OsStr::new("-o"),
            output.as_os_str(),
            OsStr::new("-b"),
            OsStr::new("command"),
            OsStr::new("-g"),
            OsStr::new("/bin/sh"),
            OsStr::new("--generator-arg"),
            script.as_os_str(),
        ]);

        let result = BatchRunner::without_progress(cli).run().await;

        assert!(matches!(
            result,
            Err(MultiverseError::IncompleteAlbumRequest { done: 5, .. })
        ));
        assert!(output.join("cyberpunk.png").exists());
        assert!(!output.join("fantasy.png").exists());
        assert!(!output.join("multiverse-album.png").exists());
    }

    // Tests --no-album skips composition
    // Verified by ignoring the flag
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_album() {
        let dir = TempDir::new().expect("tempdir");
        let source = write_source(dir.path());
        let output = dir.path().join("out");
        let cli = Cli::parse_from([
            OsStr::new("multiverse"),
            source.as_os_str(),
            OsStr::new("-o"),
            output.as_os_str(),
            OsStr::new("--no-album"),
        ]);

        let summary = BatchRunner::new(cli).run().await.expect("run succeeds");
        assert!(summary.album.is_none());
        assert_eq!(summary.images.len(), 6);
    }
}
