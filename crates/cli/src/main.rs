use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vaultmd_core::{
    build_prompt,
    config::{data_dir_from_env_value, generator_command_from_env_value},
    CommandGenerator, CoreConfig, DocumentMerger, ExtractedSections, FileRecordStore,
    LocalFileAccess, MergeResult, ProcedureSession, ProcessOutcome, SourceDocument,
};

#[derive(Parser)]
#[command(name = "vaultmd")]
#[command(about = "VaultMD procedure processor CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge documents and print the merged text
    Merge {
        /// Text or PDF files, in merge order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the prompt that would be sent for the given documents
    Prompt {
        /// Text or PDF files, in merge order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Split a generated output into its labelled sections
    Sections {
        /// File holding the generated output ("-" for stdin)
        output_file: PathBuf,
    },
    /// Merge documents, generate documentation and save the procedure record
    Process {
        /// Text or PDF files, in merge order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Use this file's contents instead of the merged text
        #[arg(long)]
        edited: Option<PathBuf>,
    },
}

fn source_documents(
    files: &[PathBuf],
) -> Result<Vec<SourceDocument>, Box<dyn std::error::Error>> {
    files
        .iter()
        .map(|path| SourceDocument::from_path(path).map_err(Into::into))
        .collect()
}

fn merge_files(files: &[PathBuf]) -> Result<MergeResult, Box<dyn std::error::Error>> {
    let documents = source_documents(files)?;
    let access = LocalFileAccess::new();
    Ok(DocumentMerger::new(&access).merge(&documents)?)
}

fn read_input(path: &Path) -> std::io::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

fn print_sections(output: &str) {
    let sections = ExtractedSections::from_output(output);
    if sections.is_empty() {
        println!("{}", output.trim());
        return;
    }
    for (label, text) in sections.present() {
        println!("== {} ==\n{}\n", label.title(), text);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vaultmd_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Merge { files }) => {
            let result = merge_files(&files)?;
            for fragment in result.fragments().iter().filter(|f| f.is_placeholder()) {
                eprintln!("Warning: {}", fragment.text());
            }
            println!("{}", result.merged_text());
        }
        Some(Commands::Prompt { files }) => {
            let result = merge_files(&files)?;
            println!("{}", build_prompt(result.merged_text()));
        }
        Some(Commands::Sections { output_file }) => {
            let output = read_input(&output_file)?;
            print_sections(&output);
        }
        Some(Commands::Process { files, edited }) => {
            let cfg = CoreConfig::new(
                data_dir_from_env_value(std::env::var("VAULTMD_DATA_DIR").ok()),
                generator_command_from_env_value(std::env::var("VAULTMD_GENERATOR_CMD").ok()),
            )?;

            let session = ProcedureSession::new(
                LocalFileAccess::new(),
                CommandGenerator::from_config(&cfg),
                FileRecordStore::new(&cfg),
            );
            session.select_documents(source_documents(&files)?);
            session.merge()?;
            if let Some(edited) = edited {
                session.set_merged_text(read_input(&edited)?);
            }

            match session.process().await? {
                ProcessOutcome::Saved(record) => {
                    if let Some(output) = record.generated_output() {
                        print_sections(output);
                    }
                    println!("Saved procedure record: {}", record.id());
                }
                ProcessOutcome::AlreadyInFlight => {
                    eprintln!("Processing is already in progress.");
                }
                ProcessOutcome::Discarded => {
                    eprintln!("Processing was cancelled.");
                }
            }
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
