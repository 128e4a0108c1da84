use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use escola_admin::api::{ExportFormat, HttpSchoolApi};
use escola_admin::config::ClientConfig;
use escola_admin::db::{MemoryPreferenceStore, SortPreferenceStore, SqlitePreferenceStore};
use escola_admin::error::AppError;
use escola_admin::models::filter::parse_status;
use escola_admin::models::{FilterCriteria, SortDirection, SortField, SortPreference};
use escola_admin::state::AppState;
use escola_admin::ui::TerminalRenderer;

/// Administração escolar: alunos, turmas e matrículas
#[derive(Parser)]
#[command(name = "escola-admin")]
#[command(version = "0.1.0")]
struct Cli {
    /// Backend base URL (overrides ESCOLA_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Preference database URL (overrides ESCOLA_PREFS_DB)
    #[arg(long)]
    prefs_db: Option<String>,

    /// Keep the sort preference in memory only
    #[arg(long)]
    no_prefs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List students with filters and sort
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long = "class")]
        class_id: Option<i64>,
        /// all, active or inactive
        #[arg(long)]
        status: Option<String>,
        /// name, birthDate, email, active or classId; saved as the new default
        #[arg(long)]
        sort: Option<SortField>,
        #[arg(long, conflicts_with = "asc")]
        desc: bool,
        #[arg(long)]
        asc: bool,
    },
    /// Show classes with their occupancy
    Classes,
    /// Create a class, or update it when --id is given
    ClassSave {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        capacity: Option<String>,
    },
    /// Create a student, or update it when --id is given
    StudentSave {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        name: Option<String>,
        /// yyyy-mm-dd
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Class id; pass an empty value to clear
        #[arg(long = "class")]
        class_id: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a student
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Enroll a student in a class
    Enroll {
        #[arg(long)]
        student: String,
        #[arg(long = "class")]
        class_id: String,
    },
    /// Export the student report
    Export {
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Read search text from stdin, one line per keystroke batch
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "escola_admin=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = ClientConfig::new_from_env()?;
    if let Some(url) = cli.api_url.as_deref() {
        config = config.with_api_url(url)?;
    }
    if let Some(db) = cli.prefs_db {
        config.prefs_db = db;
    }
    info!("using backend {}", config.api_url);

    let api = Arc::new(HttpSchoolApi::new(&config)?);
    let prefs = open_preferences(&config, cli.no_prefs).await;
    let mut state = AppState::load(api, prefs, Arc::new(TerminalRenderer::new())).await;

    match cli.command {
        Command::List {
            search,
            class_id,
            status,
            sort,
            desc,
            asc,
        } => {
            let status =
                parse_status(status.as_deref().unwrap_or("")).map_err(AppError::Validation)?;
            let filters = FilterCriteria {
                search: search.unwrap_or_default(),
                class_id,
                status,
            };
            let current = state.sort();
            let direction = if desc {
                SortDirection::Descending
            } else if asc {
                SortDirection::Ascending
            } else {
                current.direction
            };
            let requested = SortPreference::new(sort.unwrap_or(current.field), direction);
            state.apply(filters, requested).await
        }
        Command::Classes => state.show_classes().await.map(|_| ()),
        Command::ClassSave { id, name, capacity } => {
            if let Some(id) = id {
                state.edit_class(id).await?;
            }
            if let Some(name) = name {
                state.class_form.values.name = name;
            }
            if let Some(capacity) = capacity {
                state.class_form.values.capacity = capacity;
            }
            state.submit_class_form().await
        }
        Command::StudentSave {
            id,
            name,
            birth_date,
            email,
            class_id,
            active,
        } => {
            if let Some(id) = id {
                state.edit_student(id).await?;
            }
            let values = &mut state.student_form.values;
            if let Some(name) = name {
                values.name = name;
            }
            if let Some(birth_date) = birth_date {
                values.birth_date = birth_date;
            }
            if let Some(email) = email {
                values.email = email;
            }
            if let Some(class_id) = class_id {
                values.class_id = class_id;
            }
            if let Some(active) = active {
                values.active = active.to_string();
            }
            state.submit_student_form().await
        }
        Command::Delete { id, yes } => {
            let confirmed = yes || confirm_delete().await?;
            if !state.delete_student(id, confirmed).await? {
                info!("deletion of student {} cancelled", id);
            }
            Ok(())
        }
        Command::Enroll { student, class_id } => {
            state.enrollment_form.values.student_id = student;
            state.enrollment_form.values.class_id = class_id;
            state.submit_enrollment_form().await
        }
        Command::Export { format, out } => state.export(format, out.as_deref()).await.map(|_| ()),
        Command::Watch => watch(&mut state).await,
    }
}

/// Falls back to an in-memory store when the database cannot be opened;
/// the session then runs with the default order.
async fn open_preferences(config: &ClientConfig, disabled: bool) -> Arc<dyn SortPreferenceStore> {
    if disabled {
        return Arc::new(MemoryPreferenceStore::new());
    }
    match SqlitePreferenceStore::connect(&config.prefs_db).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("preference store unavailable ({}), using memory", e);
            Arc::new(MemoryPreferenceStore::new())
        }
    }
}

async fn confirm_delete() -> Result<bool, AppError> {
    println!("Tem certeza que deseja excluir este aluno? [s/N]");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "s" | "sim" | "y" | "yes"))
}

async fn watch(state: &mut AppState) -> Result<(), AppError> {
    state.refresh().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(text) => state.on_search_input(text),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                return Ok(());
            }
        }
    }

    state.flush_search().await
}
