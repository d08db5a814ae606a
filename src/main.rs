use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    let cli = table_pager::cli::Cli::parse();
    match cli.command {
        table_pager::cli::Commands::Browse { ref table } => {
            let input = std::io::BufReader::new(std::io::stdin());
            match table_pager::cli::run_browse(table, input, std::io::stdout()).await {
                Ok(()) => std::process::ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("Error: {err:#}");
                    std::process::ExitCode::from(1)
                }
            }
        }
        _ => match table_pager::cli::run(cli).await {
            Ok(output) => {
                println!("{output}");
                std::process::ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Error: {err:#}");
                std::process::ExitCode::from(1)
            }
        },
    }
}
