use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::error;

use receipt_printer_lib::PrinterError;
use receipt_printer_lib::commands;
use receipt_printer_lib::config::printer_config::PrinterConfig;
use receipt_printer_lib::core::SaleReceipt;
use receipt_printer_lib::core::bluetooth::{AutoSelect, DeviceSelector, PrintReport, PrinterDevice};
use receipt_printer_lib::state::{AppState, resolve_config_dir};

#[derive(Parser)]
#[command(name = "receipt-printer", version, about = "Print receipts on Bluetooth LE thermal printers")]
struct Cli {
    /// Directory holding printer_config.json and the saved printer
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Pick the first device whose name contains this text
    #[arg(long, global = true)]
    name: Option<String>,

    /// Pick the first device found instead of prompting
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Choose a nearby printer and show it
    Scan,
    /// Choose a printer, connect and remember it
    Connect,
    /// Show Bluetooth availability and the saved printer
    Status,
    /// Forget the saved printer
    Forget,
    /// Print a test page
    TestPrint,
    /// Print a sale receipt described by a JSON file
    PrintReceipt {
        file: PathBuf,
    },
    /// Send a file of ESC/POS bytes as-is
    PrintRaw {
        file: PathBuf,
    },
    /// Write the effective config to the config directory
    InitConfig,
}

/// Lists candidates on stdout and reads a choice from stdin
struct PromptSelect;

impl DeviceSelector for PromptSelect {
    fn select(&self, candidates: &[PrinterDevice]) -> Option<usize> {
        println!("Found {} device(s):", candidates.len());
        for (i, candidate) in candidates.iter().enumerate() {
            println!("  [{}] {} ({})", i + 1, candidate.name, candidate.id);
        }
        print!("Select a printer (empty to cancel): ");
        io::stdout().flush().ok()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input).ok()?;
        let choice: usize = input.trim().parse().ok()?;
        (1..=candidates.len()).contains(&choice).then(|| choice - 1)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    receipt_printer_lib::setup_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {}", describe_failure(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_dir = resolve_config_dir(cli.config_dir);

    if let Command::InitConfig = cli.command {
        let config = PrinterConfig::load_config(&config_dir).await?;
        config.save_config(&config_dir).await?;
        println!("Config written to {}", config_dir.display());
        return Ok(());
    }

    let printer_config = PrinterConfig::load_config(&config_dir).await?;
    let selector: Arc<dyn DeviceSelector> = match cli.name.or(printer_config.device_name_filter) {
        Some(filter) => Arc::new(AutoSelect::new(Some(filter))),
        None if cli.yes => Arc::new(AutoSelect::default()),
        None => Arc::new(PromptSelect),
    };
    let app_state = AppState::new(&config_dir, selector).await?;

    match cli.command {
        Command::Scan => match commands::scan_printers(&app_state).await? {
            Some(printer) => println!("{} ({})", printer.name, printer.id),
            None => println!("No printer selected"),
        },
        Command::Connect => match commands::connect_printer(&app_state).await? {
            Some(printer) => println!("Connected to {} ({})", printer.name, printer.id),
            None => println!("No printer selected"),
        },
        Command::Status => {
            let status = commands::printer_status(&app_state).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Forget => {
            commands::forget_printer(&app_state).await?;
            println!("Saved printer forgotten");
        }
        Command::TestPrint => {
            if connect_or_cancel(&app_state).await? {
                report(commands::print_test_page(&app_state).await?);
            }
        }
        Command::PrintReceipt { file } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let sale: SaleReceipt = serde_json::from_str(&json)
                .with_context(|| format!("Invalid sale receipt in {}", file.display()))?;
            if connect_or_cancel(&app_state).await? {
                report(commands::print_sale_receipt(&app_state, &sale).await?);
            }
        }
        Command::PrintRaw { file } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            if connect_or_cancel(&app_state).await? {
                report(commands::print_raw(&app_state, &data).await?);
            }
        }
        Command::InitConfig => unreachable!("handled before the adapter is opened"),
    }

    commands::disconnect_printer(&app_state).await?;
    Ok(())
}

/// False when the user dismissed the chooser
async fn connect_or_cancel(app_state: &AppState) -> Result<bool> {
    match commands::ensure_connected(app_state).await? {
        Some(printer) => {
            println!("Printing on {} ({})", printer.name, printer.id);
            Ok(true)
        }
        None => {
            println!("No printer selected");
            Ok(false)
        }
    }
}

fn report(report: PrintReport) {
    println!("Sent {} bytes in {} chunks", report.bytes, report.chunks);
}

/// Tells "connect a printer" apart from "check the printer"
fn describe_failure(e: &anyhow::Error) -> String {
    match e.downcast_ref::<PrinterError>() {
        Some(p) if p.is_not_connected() => {
            "No printer connected. Run `receipt-printer connect` first.".to_string()
        }
        Some(p @ PrinterError::PrintInterrupted { .. }) => {
            format!("{p}. The receipt may be incomplete, check the printer.")
        }
        _ => format!("{e:#}"),
    }
}
