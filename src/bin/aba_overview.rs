use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use aba_overview::app::App;
use aba_overview::config::ConfigLoader;
use aba_overview::domain::{ExportFormat, ScanType};
use aba_overview::error::OverviewError;
use aba_overview::linkahead::connect;
use aba_overview::output::{JsonOutput, OutputMode, TextOutput};
use aba_overview::store::{MemoryStore, MetadataStore};
use aba_overview::synthetic::{self, SyntheticSpec};

#[derive(Parser)]
#[command(name = "aba-overview")]
#[command(about = "Tabular overview of scan metadata stored in LinkAhead")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Build the scan overview report and optionally export it")]
    Report(ReportArgs),
    #[command(about = "Print a table of random placeholder data")]
    Synthetic(SyntheticArgs),
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long)]
    config: Option<String>,

    /// Read entities from a JSON snapshot instead of the LinkAhead server.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    #[arg(long = "scan-type", value_enum)]
    scan_types: Vec<ScanType>,

    #[arg(long)]
    export_dir: Option<Utf8PathBuf>,

    #[arg(long, value_enum)]
    format: Option<ExportFormat>,
}

#[derive(Args)]
struct SyntheticArgs {
    #[arg(long)]
    rows: Option<usize>,

    #[arg(long)]
    cols: Option<usize>,

    #[arg(long)]
    length: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<OverviewError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &OverviewError) -> u8 {
    match error {
        OverviewError::MissingConfig
        | OverviewError::ConfigRead(_)
        | OverviewError::ConfigParse(_)
        | OverviewError::MissingCredential
        | OverviewError::InvalidConfig(_) => 2,
        OverviewError::ConnectionFailure { .. }
        | OverviewError::StoreHttp(_)
        | OverviewError::StoreStatus { .. }
        | OverviewError::SnapshotRead(_)
        | OverviewError::SnapshotParse(_) => 3,
        OverviewError::ChannelMismatch { .. }
        | OverviewError::ReferenceResolution { .. }
        | OverviewError::MissingProperty { .. }
        | OverviewError::AmbiguousProperty { .. }
        | OverviewError::InvalidValue { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Commands::Report(args) => run_report(args, output_mode),
        Commands::Synthetic(args) => run_synthetic(args),
    }
}

fn run_report(args: ReportArgs, output_mode: OutputMode) -> miette::Result<()> {
    let ReportArgs {
        config,
        snapshot,
        scan_types,
        export_dir,
        format,
    } = args;

    let resolved = match &snapshot {
        Some(_) => ConfigLoader::resolve_optional(config.as_deref())?,
        None => Some(ConfigLoader::resolve(config.as_deref())?),
    };
    let synthetic = resolved
        .as_ref()
        .map(|config| config.synthetic)
        .unwrap_or_default();
    let export_dir = export_dir.or_else(|| {
        resolved
            .as_ref()
            .and_then(|config| config.export.dir.clone())
    });
    let format = format
        .or_else(|| resolved.as_ref().map(|config| config.export.format))
        .unwrap_or(ExportFormat::Xlsx);
    let scan_types = if scan_types.is_empty() {
        ScanType::ALL.to_vec()
    } else {
        scan_types
    };
    let plan = ReportPlan {
        scan_types,
        export_dir,
        format,
        output_mode,
    };

    match snapshot {
        Some(path) => {
            let store = MemoryStore::from_snapshot(&path)?;
            plan.run(App::new(store, synthetic))
        }
        None => {
            let connection = resolved
                .as_ref()
                .ok_or(OverviewError::MissingConfig)?
                .connection()?;
            let store = connect(&connection)?;
            plan.run(App::new(store, synthetic))
        }
    }
}

struct ReportPlan {
    scan_types: Vec<ScanType>,
    export_dir: Option<Utf8PathBuf>,
    format: ExportFormat,
    output_mode: OutputMode,
}

impl ReportPlan {
    fn run<S: MetadataStore>(self, app: App<S>) -> miette::Result<()> {
        match self.output_mode {
            OutputMode::NonInteractive => {
                let report = app.report(&self.scan_types, &JsonOutput)?;
                let exported = match &self.export_dir {
                    Some(dir) => Some(app.export(&report, dir, self.format, &JsonOutput)?),
                    None => None,
                };
                JsonOutput::print_report(&report, exported.as_ref()).into_diagnostic()?;
            }
            OutputMode::Interactive => {
                let report = app.report(&self.scan_types, &TextOutput)?;
                TextOutput::print_report(&report).into_diagnostic()?;
                if let Some(dir) = &self.export_dir {
                    let exported = app.export(&report, dir, self.format, &TextOutput)?;
                    TextOutput::print_export(&exported).into_diagnostic()?;
                }
            }
        }
        Ok(())
    }
}

fn run_synthetic(args: SyntheticArgs) -> miette::Result<()> {
    let defaults = SyntheticSpec::default();
    let spec = SyntheticSpec {
        rows: args.rows.unwrap_or(defaults.rows),
        cols: args.cols.unwrap_or(defaults.cols),
        string_length: args.length.unwrap_or(defaults.string_length),
    };
    let table = match args.seed {
        Some(seed) => synthetic::generate(
            spec.rows,
            spec.cols,
            spec.string_length,
            &mut StdRng::seed_from_u64(seed),
        ),
        None => spec.generate(),
    };
    JsonOutput::print_table(&table).into_diagnostic()?;
    Ok(())
}
