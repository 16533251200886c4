use dotenvy::dotenv;
use ledger_dashboard::{
    api::client::ApiClient,
    config::{app::load_default_config, session::RequestContext},
    core::report::{format_account_table, format_meta_summary},
    errors::{Error, Result},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: ledger-dashboard <project-id> [year]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the environment
    dotenv().ok();

    // 3. Configuration and session
    let app_config = load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    let context = RequestContext::from_env();
    info!(backend = %app_config.backend_url, role = context.role.as_str(), "Configuration loaded");

    // 4. Arguments
    let mut args = std::env::args().skip(1);
    let project_id = args.next().ok_or_else(|| Error::Validation {
        message: USAGE.to_string(),
    })?;
    let year = match args.next() {
        Some(raw) => raw.trim().parse::<i32>().map_err(|_| Error::Validation {
            message: format!("Invalid year {raw:?}. {USAGE}"),
        })?,
        None => app_config.default_year,
    };

    // 5. Client; a saved department context is re-checked before use
    let api = ApiClient::new(&app_config, context)?
        .restore_department_context()
        .await
        .inspect_err(|e| error!("Could not verify the saved department context: {}", e))?;

    // 6. Fetch and print the project's accounts
    let project = api
        .project_accounts(&project_id, year, app_config.display.include_zero_balances)
        .await
        .inspect_err(|e| {
            if e.requires_sign_in() {
                warn!("Stored credentials were rejected; set a fresh LEDGER_API_TOKEN");
            }
        })?;

    for line in format_account_table(&project.tree, &app_config.display) {
        println!("{line}");
    }
    if let Some(meta) = &project.meta {
        println!("{}", format_meta_summary(meta));
    }

    Ok(())
}
