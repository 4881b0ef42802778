//! `cfm`: validate medical content against CFM publicity and LGPD rules.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use cfm_core::{catalog, get_template, AuditReport, TemplateType, ValidationResult, CATALOG_VERSION};
use cfm_runtime::{ComplianceService, ComplianceSettings};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cfm", version, about = "CFM compliance validation for medical content")]
struct Cli {
    /// Settings file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate one document (file path or "-" for stdin)
    Validate {
        #[arg(default_value = "-")]
        input: String,

        /// Require a score of 90 to pass
        #[arg(long)]
        strict: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Validate several documents
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        strict: bool,

        /// Documents validated concurrently
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print an audit report after the results
        #[arg(long)]
        report: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print a boilerplate template
    Template {
        name: String,

        #[arg(long, default_value = "pt")]
        lang: String,
    },

    /// List the rule catalog
    Catalog,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = match &cli.config {
        Some(path) => ComplianceSettings::from_yaml_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => ComplianceSettings::default(),
    };
    tracing::debug!(runner = ?settings.runner, strict = settings.strict_mode, "Settings loaded");

    match cli.command {
        Command::Validate {
            input,
            strict,
            format,
        } => {
            settings.strict_mode |= strict;
            let content = read_input(&input)?;
            let service = ComplianceService::new(settings)?;
            let result = service.validate(&content).await?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                Format::Text => print_result(&input, &result),
            }
            Ok(exit_code(result.valid))
        }
        Command::Batch {
            files,
            strict,
            concurrency,
            report,
            format,
        } => {
            settings.strict_mode |= strict;
            if let Some(concurrency) = concurrency {
                settings.batch.concurrency = concurrency;
            }
            let contents = files
                .iter()
                .map(|path| read_file(path))
                .collect::<Result<Vec<_>>>()?;

            let service = ComplianceService::new(settings)?;
            let results = service.validate_batch(&contents).await;
            let audit = if report { service.audit(&results) } else { None };

            match format {
                Format::Json => {
                    let output = serde_json::json!({ "results": results, "report": audit });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                Format::Text => {
                    for (path, result) in files.iter().zip(&results) {
                        print_result(&path.display().to_string(), result);
                    }
                    if let Some(audit) = &audit {
                        print_report(audit);
                    }
                }
            }
            Ok(exit_code(results.iter().all(|r| r.valid)))
        }
        Command::Template { name, lang } => {
            let template: TemplateType = name.parse()?;
            println!("{}", get_template(template).text(&lang));
            Ok(ExitCode::SUCCESS)
        }
        Command::Catalog => {
            println!("Rule catalog {}", CATALOG_VERSION);
            for rule in catalog::rules() {
                println!(
                    "  {:<20} {:<9} -{:<3} {}",
                    rule.id.as_str(),
                    rule.severity.as_str(),
                    rule.weight,
                    rule.legal_reference
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        Ok(buf)
    } else {
        read_file(Path::new(input))
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn exit_code(valid: bool) -> ExitCode {
    if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn print_result(label: &str, result: &ValidationResult) {
    let status = if result.valid { "PASS" } else { "FAIL" };
    println!(
        "{}: {} score={} level={}",
        label,
        status,
        result.score,
        result.level.as_str()
    );
    for violation in &result.violations {
        let count = violation
            .count
            .map(|c| format!(" x{}", c))
            .unwrap_or_default();
        println!(
            "  [{}] {}{} (-{}) {}",
            violation.severity.as_str(),
            violation.kind.as_str(),
            count,
            violation.weight,
            violation.message
        );
    }
    for recommendation in &result.recommendations {
        println!(
            "  -> {} [{}]",
            recommendation.message, recommendation.template
        );
    }
}

fn print_report(report: &AuditReport) {
    println!();
    println!(
        "Audit: {}/{} compliant ({:.0}%), mean score {:.1}",
        report.compliant_content,
        report.total_content,
        report.compliance_rate * 100.0,
        report.overall_score
    );
    for (kind, count) in &report.violations_by_type {
        println!("  {:<20} {}", kind.as_str(), count);
    }
    for (severity, count) in &report.violations_by_severity {
        println!("  {:<20} {}", severity.as_str(), count);
    }
}
