use clap::{Parser, Subcommand};
use examsession_core::ExamCategory;

mod commands;

#[derive(Parser)]
#[command(
    name = "examsession-cli",
    version,
    about = "Timed mock-test sessions from the terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the paper catalog
    Papers {
        /// Restrict to one exam category (prelims or mains)
        #[arg(long)]
        exam: Option<ExamCategory>,
    },
    /// Run a full timed session against a backend
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Papers { exam } => commands::papers::run(exam),
        Commands::Run(args) => commands::run::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
