use clap::Parser;
use std::path::PathBuf;

use crate::domain::order::{ClientSummary, WorkerRef};

#[derive(Parser, Debug)]
#[command(name = "duna-orders")]
#[command(about = "Turn a photo of price tags into a signed order sheet", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Photo of the price tags
    pub photo: PathBuf,

    /// Recorded analysis response for the photo (JSON)
    pub analysis: PathBuf,

    /// Client id
    #[arg(long)]
    pub client_id: String,

    /// Client display name
    #[arg(long)]
    pub client_name: String,

    /// Client code printed on the sheet
    #[arg(long)]
    pub client_code: String,

    /// Client signature
    #[arg(long)]
    pub signature: String,

    /// Salesperson taking the order
    #[arg(long, env = "DUNA_WORKER_NAME")]
    pub worker_name: String,

    /// Order notes
    #[arg(long)]
    pub notes: Option<String>,
}

impl Cli {
    pub fn client(&self) -> ClientSummary {
        ClientSummary {
            id: self.client_id.clone(),
            name: self.client_name.clone(),
            client_code: self.client_code.clone(),
        }
    }

    pub fn worker(&self) -> WorkerRef {
        WorkerRef {
            id: "cli".to_string(),
            name: self.worker_name.clone(),
            email: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    const FULL: &[&str] = &[
        "duna-orders",
        "tags.jpg",
        "tags.json",
        "--client-id",
        "client-1",
        "--client-name",
        "Joyería Sol",
        "--client-code",
        "C-001",
        "--signature",
        "Marta",
        "--worker-name",
        "Ana",
    ];

    #[test]
    fn test_parses_full_invocation() {
        let cli = Cli::try_parse_from(FULL).unwrap();

        assert_eq!(cli.photo, PathBuf::from("tags.jpg"));
        assert_eq!(cli.analysis, PathBuf::from("tags.json"));
        assert_eq!(cli.notes, None);
        assert_eq!(cli.client().client_code, "C-001");
        assert_eq!(cli.worker().name, "Ana");
    }

    #[test]
    fn test_notes_are_optional() {
        let mut args = FULL.to_vec();
        args.extend(["--notes", "Entregar el lunes"]);

        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.notes.as_deref(), Some("Entregar el lunes"));
    }

    #[test]
    fn test_help_is_not_a_usage_error() {
        let err = Cli::try_parse_from(["duna-orders", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert!(err.to_string().contains("--client-id"));
    }

    #[test]
    fn test_missing_arguments_are_reported() {
        let err = Cli::try_parse_from(["duna-orders", "tags.jpg"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }
}
