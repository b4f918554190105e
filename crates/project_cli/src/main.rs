//! Command-line probe for `project_core`.
//!
//! # Responsibility
//! - Verify core crate linkage (`project_cli` with no subcommand).
//! - Run maintenance passes against a database file:
//!   `project_cli list <db-path>` and `project_cli health <db-path>`.
//! - Route core diagnostics to rolling files when `--log-dir` is given.

use clap::{Parser, Subcommand};
use project_core::db::open_db;
use project_core::{ProjectService, ProjectServiceConfig};
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "project_cli", version, about = "Project store maintenance probe")]
struct Cli {
    /// Directory for rolling log files. Logging stays off when omitted.
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Log level used with `--log-dir`.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every project in the database.
    List { db_path: PathBuf },
    /// Recompute and store the health rating of every project.
    Health { db_path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let stdout = io::stdout();
    match run(&cli, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = &cli.log_dir {
        let level = cli
            .log_level
            .as_deref()
            .unwrap_or(project_core::default_log_level());
        let log_dir = absolute_dir(log_dir)?;
        project_core::init_logging(level, &log_dir.to_string_lossy())?;
    }

    match &cli.command {
        None => {
            writeln!(out, "project_core ping={}", project_core::ping())?;
            writeln!(out, "project_core version={}", project_core::core_version())?;
        }
        Some(Command::List { db_path }) => {
            let conn = open_db(db_path)?;
            let service = ProjectService::sqlite(&conn, ProjectServiceConfig::default())?;
            for project in service.list_projects()? {
                writeln!(out, "project={} name={}", project.id, project.name)?;
            }
        }
        Some(Command::Health { db_path }) => {
            let conn = open_db(db_path)?;
            let service = ProjectService::sqlite(&conn, ProjectServiceConfig::default())?;
            let reports = service.refresh_health_ratings()?;
            for report in &reports {
                writeln!(
                    out,
                    "project={} rating={} total={} stale={} potentially_stale={}",
                    report.project,
                    report.rating,
                    report.total,
                    report.stale,
                    report.potentially_stale
                )?;
            }
            for project in service.list_projects()? {
                if reports.iter().all(|report| report.project != project.id) {
                    writeln!(out, "project={} status=skipped", project.id)?;
                }
            }
        }
    }
    Ok(())
}

fn absolute_dir(dir: &Path) -> io::Result<PathBuf> {
    if dir.is_absolute() {
        Ok(dir.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::{run, Cli, Command};
    use clap::Parser;
    use project_core::db::open_db;
    use project_core::{ProjectInput, ProjectService, ProjectServiceConfig, User};
    use std::path::PathBuf;

    fn output(cli: &Cli) -> String {
        let mut buf = Vec::new();
        run(cli, &mut buf).expect("command should succeed");
        String::from_utf8(buf).expect("output should be UTF-8")
    }

    #[test]
    fn parses_subcommands_with_db_path() {
        let cli = Cli::try_parse_from(["project_cli", "health", "/tmp/p.db"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Health { ref db_path }) if db_path == &PathBuf::from("/tmp/p.db")
        ));
        assert!(cli.log_dir.is_none());

        let cli = Cli::try_parse_from(["project_cli", "list", "p.db", "--log-dir", "/tmp/logs"])
            .unwrap();
        assert!(matches!(cli.command, Some(Command::List { .. })));
        assert_eq!(cli.log_dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn rejects_missing_db_path_and_unknown_subcommand() {
        assert!(Cli::try_parse_from(["project_cli", "list"]).is_err());
        assert!(Cli::try_parse_from(["project_cli", "purge", "p.db"]).is_err());
    }

    #[test]
    fn no_subcommand_prints_probe() {
        let cli = Cli::try_parse_from(["project_cli"]).unwrap();
        let text = output(&cli);
        assert!(text.contains("project_core ping=pong"));
    }

    #[test]
    fn list_and_health_report_every_project() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("projects.db");
        {
            let conn = open_db(&db_path).unwrap();
            let service = ProjectService::sqlite(&conn, ProjectServiceConfig::default()).unwrap();
            service
                .create_project(&ProjectInput::new("web", "Web"), &User::new(1))
                .unwrap();
        }
        let db = db_path.to_string_lossy().to_string();

        let listed = output(&Cli::try_parse_from(["project_cli", "list", db.as_str()]).unwrap());
        assert_eq!(listed, "project=default name=Default\nproject=web name=Web\n");

        let health = output(&Cli::try_parse_from(["project_cli", "health", db.as_str()]).unwrap());
        assert!(health.contains("project=default rating=100 total=0"));
        assert!(health.contains("project=web rating=100 total=0"));
        assert!(!health.contains("status=skipped"));
    }
}
