use anyhow::Context;
use captain::{CaptainApp, ReceiptFormat, load_receipt, render_receipt, setup_environment};
use captain_client::LoginSession;
use captain_printer::{NoCentral, ReceiptPrinter};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "captain")]
#[command(about = "Captain app tools: cached backend calls and receipt printing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a receipt JSON file to ESC/POS bytes or HTML
    Render {
        input: PathBuf,
        #[arg(short, long, value_enum, default_value = "escpos")]
        format: ReceiptFormat,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a receipt JSON file
    Print { input: PathBuf },
    /// POST to an endpoint through the response cache, printing each update
    Fetch {
        endpoint: String,
        /// JSON request body
        #[arg(short, long, default_value = "{}")]
        payload: String,
    },
    /// Store login credentials
    Login {
        #[arg(long, env = "CAPTAIN_DEVICE_TOKEN")]
        device_token: String,
        #[arg(long, env = "CAPTAIN_ACCESS_TOKEN")]
        access_token: String,
        #[arg(long)]
        refresh_token: Option<String>,
        #[arg(long)]
        user_id: String,
    },
    /// Forget the stored login
    Logout,
    /// Drop cached responses
    ClearCache {
        /// Drop entries of every device session, not just the current one
        #[arg(long)]
        all_sessions: bool,
    },
    /// Show or change device settings
    Settings {
        /// Always print through the print dialog
        #[arg(long)]
        html_fallback: Option<bool>,
        /// Remember this printer id
        #[arg(long)]
        printer: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = setup_environment()?;
    tracing::info!(api_url = %config.api_url, "Captain starting");

    let app = CaptainApp::open(config).await?;

    match cli.command {
        Command::Render {
            input,
            format,
            output,
        } => {
            let receipt = load_receipt(&input).await?;
            let data = render_receipt(&receipt, format);
            match output {
                Some(path) => tokio::fs::write(&path, &data)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?,
                None => std::io::stdout().lock().write_all(&data)?,
            }
        }
        Command::Print { input } => {
            let receipt = load_receipt(&input).await?;
            let printer = app.printer(None::<NoCentral>).await?;
            if let Err(e) = printer.print_receipt(&receipt).await {
                tracing::error!(error = %e, "Print failed");
                anyhow::bail!(e.user_message());
            }
        }
        Command::Fetch { endpoint, payload } => {
            let payload: Value = serde_json::from_str(&payload).context("parsing payload")?;
            app.fetch(&endpoint, &payload, |body| println!("{body}"))
                .await?;
        }
        Command::Login {
            device_token,
            access_token,
            refresh_token,
            user_id,
        } => {
            let change = app
                .login(&LoginSession {
                    device_token,
                    access_token,
                    refresh_token,
                    user_id,
                    owner_data: None,
                })
                .await?;
            println!("{change:?}");
        }
        Command::Logout => app.logout().await?,
        Command::ClearCache { all_sessions } => {
            let removed = if all_sessions {
                app.client().clear_all_cache_on_new_session().await
            } else {
                app.client().clear_all_cache().await
            };
            println!("removed {removed} cached responses");
        }
        Command::Settings {
            html_fallback,
            printer,
        } => {
            let mut settings = app.session().app_settings().await;
            if let Some(flag) = html_fallback {
                settings.html_fallback = flag;
            }
            if printer.is_some() {
                settings.preferred_printer = printer;
            }
            app.session().save_app_settings(&settings).await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}
