use super::*;

fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_fetch() {
    match parse(&["kdm", "fetch", "jobs.json"]) {
        CliCommand::Fetch {
            manifest,
            jobs,
            no_progress,
        } => {
            assert_eq!(manifest, "jobs.json");
            assert_eq!(jobs, None);
            assert!(!no_progress);
        }
        _ => panic!("expected Fetch"),
    }
}

#[test]
fn cli_parse_fetch_options() {
    match parse(&["kdm", "fetch", "jobs.json", "--jobs", "8", "--no-progress"]) {
        CliCommand::Fetch {
            jobs, no_progress, ..
        } => {
            assert_eq!(jobs, Some(8));
            assert!(no_progress);
        }
        _ => panic!("expected Fetch with options"),
    }
}

#[test]
fn cli_parse_fetch_requires_manifest() {
    assert!(Cli::try_parse_from(["kdm", "fetch"]).is_err());
}

#[test]
fn cli_parse_fetch_rejects_bad_jobs() {
    assert!(Cli::try_parse_from(["kdm", "fetch", "m.json", "--jobs", "many"]).is_err());
}

#[test]
fn cli_parse_checksum() {
    match parse(&["kdm", "checksum", "/tmp/file.bin"]) {
        CliCommand::Checksum { path } => assert_eq!(path, "/tmp/file.bin"),
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_rejects_unknown_command() {
    assert!(Cli::try_parse_from(["kdm", "status"]).is_err());
}
