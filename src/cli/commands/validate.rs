//! `validate`: check settings files without starting a session.

use std::path::Path;

use serde_json::{Value, json};

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{LoaderOptions, SettingsLoader};
use crate::error::{ConfigError, GazecueError, Severity, ValidationIssue};

/// Outcome for one file.
struct FileReport {
    file: String,
    config: Option<String>,
    warnings: Vec<ValidationIssue>,
    error: Option<ConfigError>,
}

impl FileReport {
    const fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Validates every file and prints a report.
///
/// Environment overrides are not applied; the files are judged on their own.
///
/// # Errors
///
/// Returns the first failure after all files have been reported. With
/// `--strict`, warnings count as failures.
pub fn run(args: &ValidateArgs) -> Result<(), GazecueError> {
    let loader = SettingsLoader::new(LoaderOptions {
        apply_env: false,
        ..LoaderOptions::default()
    });

    let reports: Vec<FileReport> = args
        .files
        .iter()
        .map(|path| check(&loader, path, args.strict))
        .collect();

    match args.format {
        OutputFormat::Human => print_human(&reports),
        OutputFormat::Json => {
            let value: Vec<Value> = reports.iter().map(report_json).collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    match reports.into_iter().find_map(|r| r.error) {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

fn check(loader: &SettingsLoader, path: &Path, strict: bool) -> FileReport {
    tracing::info!(file = %path.display(), "validating settings");
    let file = path.display().to_string();

    match loader.load_file(path) {
        Ok(result) => {
            let error = (strict && !result.warnings.is_empty()).then(|| {
                ConfigError::ValidationError {
                    path: file.clone(),
                    errors: result
                        .warnings
                        .iter()
                        .map(|w| ValidationIssue {
                            severity: Severity::Error,
                            ..w.clone()
                        })
                        .collect(),
                }
            });
            FileReport {
                config: Some(result.config.to_string()),
                warnings: result.warnings,
                error,
                file,
            }
        }
        Err(error) => FileReport {
            file,
            config: None,
            warnings: Vec::new(),
            error: Some(error),
        },
    }
}

fn print_human(reports: &[FileReport]) {
    for report in reports {
        match &report.error {
            None => println!("ok    {}", report.file),
            Some(error) => println!("FAIL  {}: {error}", report.file),
        }
        if let Some(config) = &report.config {
            println!("      {config}");
        }
        for warning in &report.warnings {
            println!("      {warning}");
        }
        if let Some(ConfigError::ValidationError { errors, .. }) = &report.error {
            for issue in errors {
                println!("      {issue}");
            }
        }
    }
}

fn issue_json(issue: &ValidationIssue) -> Value {
    json!({ "path": issue.path, "message": issue.message })
}

fn report_json(report: &FileReport) -> Value {
    let errors: Vec<Value> = match &report.error {
        Some(ConfigError::ValidationError { errors, .. }) => errors.iter().map(issue_json).collect(),
        Some(other) => vec![json!({ "path": report.file, "message": other.to_string() })],
        None => Vec::new(),
    };
    json!({
        "file": report.file,
        "valid": report.is_valid(),
        "config": report.config,
        "warnings": report.warnings.iter().map(issue_json).collect::<Vec<_>>(),
        "errors": errors,
    })
}
