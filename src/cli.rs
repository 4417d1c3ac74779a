use std::{
    fs,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

mod init;
mod report;
mod transform;

use anyhow::Context;
use clap::{ArgAction, ValueEnum};
use perky::{domain::StorageMode, Config, FragmentStore};
use report::Report;

/// Name of the configuration file, looked up in the fragment directory.
const CONFIG_FILE: &str = "prk.toml";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the fragment directory
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Read the document from this file instead of stdin
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Write the result to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let mut config = load_config(&self.root)?;
        self.overrides.apply(&mut config);

        let workspace = Workspace {
            root: self.root,
            input: self.input,
            output: self.output,
            config,
        };
        self.command.run(&workspace)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        // stdout carries the transformed document
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Reads `prk.toml` from the fragment directory, if there is one.
fn load_config(root: &Path) -> anyhow::Result<Config> {
    let path = root.join(CONFIG_FILE);
    if !path.is_file() {
        tracing::debug!("no {} found, using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load(&path).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
}

/// Command-line settings taking precedence over the configuration file.
#[derive(Debug, Default, clap::Args)]
struct Overrides {
    /// Identifier pattern; `%d` marks the numeric part
    #[arg(long, global = true)]
    pattern: Option<String>,

    /// Minimum number of digits in generated identifiers
    #[arg(long, global = true)]
    digits: Option<usize>,

    /// Fragment layout used when writing
    #[arg(long, value_enum, global = true)]
    storage: Option<Storage>,

    /// List referenced identifiers no requirement cites in the transposed
    /// matrix
    #[arg(long, global = true, overrides_with = "compact")]
    sparse: bool,

    /// Only list cited identifiers in the transposed matrix
    #[arg(long, global = true, overrides_with = "sparse")]
    compact: bool,

    /// Pass stray inline requirement marks through
    #[arg(long, global = true, overrides_with = "strict")]
    permissive: bool,

    /// Drop stray inline requirement marks
    #[arg(long, global = true, overrides_with = "permissive")]
    strict: bool,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if let Some(pattern) = &self.pattern {
            config.pattern.clone_from(pattern);
        }
        if let Some(digits) = self.digits {
            config.digits = digits;
        }
        if let Some(storage) = self.storage {
            config.storage = storage.into();
        }
        if self.sparse {
            config.sparse = true;
        }
        if self.compact {
            config.sparse = false;
        }
        if self.permissive {
            config.permissive = true;
        }
        if self.strict {
            config.permissive = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Storage {
    File,
    Directory,
}

impl From<Storage> for StorageMode {
    fn from(storage: Storage) -> Self {
        match storage {
            Storage::File => Self::File,
            Storage::Directory => Self::Directory,
        }
    }
}

/// Where a command reads from and writes to.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Config,
}

impl Workspace {
    fn store(&self) -> FragmentStore {
        FragmentStore::from_config(self.root.clone(), &self.config)
    }

    /// The whole input document, line by line.
    fn read_input(&self) -> anyhow::Result<Vec<String>> {
        let text = match &self.input {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
            None => {
                let mut text = String::new();
                io::stdin()
                    .read_to_string(&mut text)
                    .context("failed to read standard input")?;
                text
            }
        };
        Ok(text.lines().map(str::to_string).collect())
    }

    fn open_output(&self) -> anyhow::Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => {
                let file = fs::File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(BufWriter::new(io::stdout().lock())),
        })
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Move inline requirements into fragments, leaving include marks
    Split,

    /// Expand include marks back into inline requirements
    Merge,

    /// Render the document for publication
    ///
    /// Fragments are read, never written.
    Yield,

    /// Write a default configuration file to the fragment directory
    Init,

    /// List the identifiers of the requirements a document defines
    Defined(Report),

    /// List the direct traceability pairs of a document
    ///
    /// A derived requirement is paired with `-`.
    Pairs(Report),

    /// List the identifiers referenced by requirements of a document
    Referenced(Report),
}

impl Command {
    fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        match self {
            Self::Split => transform::split(workspace)?,
            Self::Merge => transform::merge(workspace)?,
            Self::Yield => transform::publish(workspace)?,
            Self::Init => init::run(workspace)?,
            Self::Defined(report) => report.run(workspace, report::Listing::Defined)?,
            Self::Pairs(report) => report.run(workspace, report::Listing::Pairs)?,
            Self::Referenced(report) => report.run(workspace, report::Listing::Referenced)?,
        }
        Ok(())
    }
}
