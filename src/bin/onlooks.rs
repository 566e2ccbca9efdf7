use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use onlooks::analytics::export::{report_columns, trend_columns, ExportManager, ExportTable};
use onlooks::analytics::export::{ExcelExporter, ExportFormat};
use onlooks::analytics::trend_series;
use onlooks::api::auth::{TokenStorage, TokenStore};
use onlooks::api::gateway::FetchError;
use onlooks::config::{AppConfig, ConfigManager};
use onlooks::projection::{
    extract_insight_sections, filter_by_tab, paginate, quoted_risk_factors,
    scholarship_suggestions, search_insights, tab_counts, total_pages, Tab,
};
use onlooks::validation::{LoginForm, RegistrationForm};
use onlooks::{
    logging, DashboardClient, DashboardError, FetchGateway, PredictionRecord,
    PredictionRepository, ReqwestTransport, SessionStore,
};

#[derive(Parser)]
#[command(name = "onlooks")]
#[command(about = "Onlooks student dropout prediction dashboard", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long)]
        school_name: String,
        /// teacher, principal or admin
        #[arg(long)]
        role: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Dashboard overview
    Stats,
    /// List student predictions page by page
    Students {
        #[arg(long, default_value = "all")]
        tab: Tab,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Browse predictions with their insights
    Predictions {
        #[arg(long, default_value = "all")]
        tab: Tab,
        #[arg(long)]
        search: Option<String>,
        /// Show insight sections for every student
        #[arg(long)]
        details: bool,
    },
    /// Upload a CSV/XLS/XLSX file of student records
    Upload { file: PathBuf },
    /// Delete a student and refresh the dashboard
    Delete { student_id: String },
    /// Export dashboard data (format chosen by file extension: csv or xlsx)
    Export {
        #[command(subcommand)]
        target: ExportTarget,
    },
    /// Inspect or reset the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ExportTarget {
    /// Monthly dropout/continue trend
    Trends {
        #[arg(long)]
        out: PathBuf,
    },
    /// Full per-student report
    Report {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "all")]
        tab: Tab,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Reset,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => Ok(ConfigManager::with_path(path.clone())),
        None => ConfigManager::new(),
    };
    let config_manager = match config_manager {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut config = config_manager.load_config().unwrap_or_else(|e| {
        eprintln!("Warning: {:#}, using default settings", e);
        AppConfig::default()
    });
    config.apply_env_overrides();

    let _log_guard = match logging::init_logging(&config.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        }
    };

    tracing::debug!(api_url = %config.api_url, "🎬 Starting onlooks");

    match run(cli.command, &config, &config_manager).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", describe_error(&e));
            ExitCode::FAILURE
        }
    }
}

/// 分類ごとに利用者向けのメッセージを出し分ける
fn describe_error(error: &anyhow::Error) -> String {
    match error.downcast_ref::<DashboardError>() {
        Some(DashboardError::Fetch(FetchError::SessionExpired)) => {
            "Your session has expired. Please log in again.".to_string()
        }
        Some(DashboardError::Fetch(FetchError::Connection(reason))) => format!(
            "Unable to connect to the server. Please check your connection and try again. ({})",
            reason
        ),
        Some(DashboardError::Fetch(FetchError::Request { status, message })) => {
            format!("Request failed ({}): {}", status, message)
        }
        Some(DashboardError::Validation(e)) => format!("Invalid input: {}", e),
        _ => format!("Error: {:#}", error),
    }
}

fn build_client(config: &AppConfig, config_manager: &ConfigManager) -> anyhow::Result<DashboardClient> {
    // 認証情報は設定ファイルと同じディレクトリに置く
    let token_store = match config_manager.config_path().parent() {
        Some(dir) if !dir.as_os_str().is_empty() => TokenStore::new(dir.to_path_buf()),
        _ => TokenStore::with_default_dir().context("Failed to locate credentials directory")?,
    };
    let storage: Arc<dyn TokenStorage> = Arc::new(token_store);
    let session = Arc::new(SessionStore::new(storage));

    let transport = Arc::new(
        ReqwestTransport::new(config.request_timeout()).context("Failed to build HTTP client")?,
    );
    let gateway = FetchGateway::new(config.api_url.clone(), transport, session);
    let repository = Arc::new(PredictionRepository::new());

    // リポジトリの変更をログに流す
    let mut changes = repository.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => {
                    tracing::debug!(revision = change.revision(), "🔔 Repository changed: {:?}", change)
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "⏭️ Repository change listener lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    Ok(DashboardClient::new(gateway, repository))
}

async fn run(command: Commands, config: &AppConfig, config_manager: &ConfigManager) -> anyhow::Result<()> {
    let client = build_client(config, config_manager)?;

    match command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password: ")?,
            };
            let credential = client.login(&LoginForm::new(email, password)).await?;
            println!("Logged in as {}.", credential.claims().subject_email);
        }
        Commands::Register {
            name,
            email,
            password,
            confirm_password,
            school_name,
            role,
        } => {
            let form = RegistrationForm {
                name,
                email,
                password,
                confirm_password,
                school_name,
                role,
            };
            let credential = client.register(&form).await?;
            println!("Registered and logged in as {}.", credential.claims().subject_email);
        }
        Commands::Logout => {
            client.logout();
            println!("Logged out.");
        }
        Commands::Whoami => match client.session().current_credential() {
            Some(credential) => {
                let claims = credential.claims();
                println!("Email:  {}", claims.subject_email);
                println!("Role:   {}", claims.role.as_deref().unwrap_or("-"));
                println!("School: {}", claims.school_name.as_deref().unwrap_or("-"));
                if let Some(expires_at) = claims.expires_at {
                    let expires = chrono::DateTime::from_timestamp(expires_at, 0)
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| expires_at.to_string());
                    println!("Expires: {}", expires);
                }
            }
            None => println!("Not logged in."),
        },
        Commands::Stats => {
            let snapshot = client.refresh().await?;
            let stats = &snapshot.stats;
            println!("Total students:    {}", stats.total_students);
            println!("Dropout rate:      {:.1}%", stats.dropout_rate_percent);
            println!("Continue rate:     {:.1}%", stats.continue_rate_percent);
            println!("Predictions made:  {}", stats.predictions_made);

            let counts = tab_counts(&snapshot.records);
            println!();
            println!(
                "Students: {} (Will DropOut {} / Will Continue {})",
                counts.all, counts.will_drop_out, counts.will_continue
            );
            println!(
                "Dropout {}% / Continue {}%",
                snapshot.aggregates.dropout_rate_percent, snapshot.aggregates.continue_rate_percent
            );

            let series = trend_series(&stats.monthly_trends);
            if !series.is_empty() {
                println!();
                println!("Monthly trend:");
                for (i, label) in series.labels.iter().enumerate() {
                    println!(
                        "  {}  dropout {:>4}  continue {:>4}",
                        label, series.dropout_data[i], series.continue_data[i]
                    );
                }
            }

            let recent = client.repository().recent_activity(config.recent_activity_limit);
            if !recent.is_empty() {
                println!();
                println!("Recent activity:");
                for record in &recent {
                    println!("  - {} : {}", record.student_name, record.prediction);
                }
            }
        }
        Commands::Students {
            tab,
            page,
            page_size,
        } => {
            let snapshot = client.refresh().await?;
            let page_size = page_size.unwrap_or(config.page_size);
            let filtered = filter_by_tab(&snapshot.records, tab);
            let pages = total_pages(filtered.len(), page_size);

            if filtered.is_empty() {
                println!("No students in '{}'.", tab);
                return Ok(());
            }
            if page < 1 || page > pages {
                println!("Page {} is out of range (1-{}).", page, pages);
                return Ok(());
            }

            println!("{} - page {} of {}", tab, page, pages);
            for record in paginate(&filtered, page, page_size) {
                print_record_line(record);
            }
        }
        Commands::Predictions {
            tab,
            search,
            details,
        } => {
            let snapshot = client.refresh().await?;
            let filtered = filter_by_tab(&snapshot.records, tab);
            let matches = search_insights(filtered, search.as_deref().unwrap_or(""));

            if matches.is_empty() {
                println!("No predictions match.");
                return Ok(());
            }
            for record in matches {
                print_record_line(record);
                if details {
                    print_insights(record);
                }
            }
        }
        Commands::Upload { file } => {
            let uploaded = client.upload_file(&file).await?;
            println!("Uploaded {}: {} predictions.", file.display(), uploaded.len());
            for record in &uploaded {
                print_record_line(record);
                print_insights(record);
            }
        }
        Commands::Delete { student_id } => {
            let snapshot = client.delete_student(&student_id).await?;
            println!(
                "Deleted student {}. {} students remain.",
                student_id,
                snapshot.records.len()
            );
        }
        Commands::Export { target } => {
            let snapshot = client.refresh().await?;
            let mut manager = ExportManager::new();
            let (table, out, sheet) = match target {
                ExportTarget::Trends { out } => (
                    ExportTable::from_records(&snapshot.stats.monthly_trends, &trend_columns()),
                    out,
                    "Monthly Trends",
                ),
                ExportTarget::Report { out, tab } => {
                    let selected: Vec<PredictionRecord> = filter_by_tab(&snapshot.records, tab)
                        .into_iter()
                        .cloned()
                        .collect();
                    (
                        ExportTable::from_records(&selected, &report_columns()),
                        out,
                        "Student Report",
                    )
                }
            };
            manager.register_handler(
                ExportFormat::Excel,
                Box::new(ExcelExporter::new().with_sheet_name(sheet)),
            );
            export_table(&manager, &table, &out)?;
        }
        Commands::Config { action } => run_config(&action, config, config_manager)?,
    }

    Ok(())
}

fn run_config(action: &ConfigAction, config: &AppConfig, config_manager: &ConfigManager) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("# {}", config_manager.config_path().display());
            print!("{}", toml::to_string_pretty(config).context("Failed to serialize config")?);
        }
        ConfigAction::Reset => {
            config_manager.reset_config()?;
            println!("Configuration reset: {}", config_manager.config_path().display());
        }
    }
    Ok(())
}

fn export_table(manager: &ExportManager, table: &ExportTable, out: &Path) -> anyhow::Result<()> {
    let format = manager
        .export_to_file(table, out)
        .with_context(|| format!("Failed to export to {}", out.display()))?;
    println!(
        "Exported {} rows as {} to {}.",
        table.rows.len(),
        format.file_extension(),
        out.display()
    );
    Ok(())
}

fn print_record_line(record: &PredictionRecord) {
    let id = record.student_id.as_deref().unwrap_or("-");
    let class = record.class_name.as_deref().unwrap_or("-");
    println!(
        "{:<24} id {:<10} class {:<8} {}",
        record.student_name, id, class, record.prediction
    );
}

fn print_insights(record: &PredictionRecord) {
    let sections = extract_insight_sections(&record.insights_text);
    if !sections.analysis.is_empty() {
        println!("    Analysis: {}", sections.analysis);
    }
    if !sections.key_risk_factors.is_empty() {
        println!("    Key risk factors:");
        for factor in &sections.key_risk_factors {
            println!("      • {}", factor);
        }
    }
    let quoted = quoted_risk_factors(&record.insights_text);
    if !quoted.is_empty() {
        println!("    Top features: {}", quoted.join(", "));
    }
    if !sections.recommendations.is_empty() {
        println!("    Recommendations: {}", sections.recommendations);
    }
    let scholarships = scholarship_suggestions(&record.insights_text);
    if !scholarships.is_empty() {
        println!("    Scholarships: {}", scholarships.join(", "));
    }
    if !record.similar_students.is_empty() {
        println!("    Similar students: {}", record.similar_students.len());
    }
}

fn prompt(label: &str) -> anyhow::Result<String> {
    eprint!("{}", label);
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
