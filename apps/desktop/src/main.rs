use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    FileHandle, HttpRecordSource, IntakeController, IntakeError, Session, SubmitOutcome,
};
use shared::domain::{FileKind, Period};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod report;

const DEV_SERVER_URL: &str = "http://localhost:8001";
const PRODUCTION_SERVER_URL: &str = "https://site-upa-back.vercel.app";

/// Uploads a patient-flow PDF and spreadsheet and prints the period summary.
#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the upload service. Defaults by APP_ENV.
    #[arg(long)]
    server_url: Option<String>,
    /// Month to report (1-12). Defaults to the current month.
    #[arg(long)]
    month: Option<u32>,
    /// Year to report. Defaults to the current year.
    #[arg(long)]
    year: Option<i32>,
    /// One PDF and one spreadsheet (.xlsx or .xls); other files are ignored.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn resolve_server_url(explicit: Option<String>, app_env: Option<&str>) -> String {
    match (explicit, app_env) {
        (Some(url), _) => url,
        (None, Some("production")) => PRODUCTION_SERVER_URL.to_string(),
        (None, _) => DEV_SERVER_URL.to_string(),
    }
}

fn resolve_period(month: Option<u32>, year: Option<i32>) -> Result<Period> {
    let current = Period::current();
    let period = Period::new(
        month.unwrap_or(current.month()),
        year.unwrap_or(current.year()),
    )?;
    Ok(period)
}

/// Paths whose name maps to an intake slot; only these are read from disk.
fn slot_candidates(paths: &[PathBuf]) -> Vec<&Path> {
    paths
        .iter()
        .map(PathBuf::as_path)
        .filter(|path| {
            let name = path.file_name().map(|n| n.to_string_lossy());
            let supported = name.as_deref().and_then(FileKind::classify).is_some();
            if !supported {
                debug!(path = %path.display(), "skipping file with unsupported extension");
            }
            supported
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let app_env = std::env::var("APP_ENV").ok();
    let server_url = resolve_server_url(args.server_url, app_env.as_deref());
    let period = resolve_period(args.month, args.year)?;
    info!(%server_url, %period, "starting intake");

    let source = HttpRecordSource::new(&server_url)
        .with_context(|| format!("invalid server url '{server_url}'"))?;
    let controller = IntakeController::new(source);
    let session = Session::new(period);

    let candidates = slot_candidates(&args.files);
    let mut handles = Vec::with_capacity(candidates.len());
    for path in candidates {
        handles.push(FileHandle::from_path(path).await?);
    }
    controller.select_files(handles).await;

    let status = controller.status().await;
    println!(
        "PDF: {}",
        status.pdf_name.as_deref().unwrap_or("Não selecionado")
    );
    println!(
        "Excel: {}",
        status.spreadsheet_name.as_deref().unwrap_or("Não selecionado")
    );

    println!("Enviando arquivos para processamento...");
    match controller.submit(&session).await {
        SubmitOutcome::Delivered { records } => {
            info!(records, "records received");
        }
        SubmitOutcome::NoData => {
            println!("O serviço não retornou dados.");
            return Ok(());
        }
        SubmitOutcome::Busy => bail!("a submission is already in progress"),
        SubmitOutcome::Failed(IntakeError::MissingFiles) => {
            bail!("{}", IntakeError::MissingFiles)
        }
        SubmitOutcome::Failed(IntakeError::Upload(err)) => {
            return Err(err).context("upload failed");
        }
    }

    print!("{}", report::build_report(session.period(), &session.view()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_server_url_wins() {
        assert_eq!(
            resolve_server_url(Some("http://x:1".into()), Some("production")),
            "http://x:1"
        );
    }

    #[test]
    fn server_url_follows_app_env() {
        assert_eq!(resolve_server_url(None, Some("production")), PRODUCTION_SERVER_URL);
        assert_eq!(resolve_server_url(None, Some("development")), DEV_SERVER_URL);
        assert_eq!(resolve_server_url(None, None), DEV_SERVER_URL);
    }

    #[test]
    fn period_rejects_invalid_month() {
        assert!(resolve_period(Some(13), Some(2024)).is_err());
        let period = resolve_period(Some(3), Some(2024)).expect("period");
        assert_eq!(period.to_string(), "3/2024");
    }

    #[test]
    fn only_slot_files_are_read() {
        let paths: Vec<PathBuf> = ["notas.txt", "dir/relatorio.PDF", "dados.xls", "sem_extensao"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(
            slot_candidates(&paths),
            [Path::new("dir/relatorio.PDF"), Path::new("dados.xls")]
        );
    }

    #[test]
    fn args_require_files() {
        assert!(Args::try_parse_from(["desktop"]).is_err());
        let args = Args::try_parse_from(["desktop", "--month", "3", "a.pdf", "b.xlsx"])
            .expect("args");
        assert_eq!(args.month, Some(3));
        assert_eq!(args.files.len(), 2);
    }
}
