//! These structs provide the CLI interface for deltaconv.

use crate::formats::Format;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// deltaconv: converts transaction exports of crypto exchanges.
///
/// Reads a trade, deposit or withdrawal history exported by an exchange (CSV or XLSX) and writes
/// it in another format, e.g. for import into the Delta portfolio tracker. When --source is not
/// given, the format of the input file is detected.
///
/// Splitting Binance market codes like ETHBTC needs a listing of known currencies. It is fetched
/// from the configured listing URL unless a saved copy is given with --symbols-file.
#[derive(Debug, Parser, Clone)]
#[command(version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    /// The file to convert.
    #[arg(long, short = 'i')]
    file: PathBuf,

    /// The format to convert to.
    #[arg(long, short = 'f', value_enum)]
    format: Format,

    /// Where to write the result. Defaults to `<input stem>.<format>.<ext>` next to the input. When
    /// the path has no extension, the default extension of the format is added.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// The format of the input file. Detected when not given.
    #[arg(long, short = 's', value_enum)]
    source: Option<Format>,

    /// A saved currency listing (CoinMarketCap JSON) to use instead of fetching one.
    #[arg(long, env = "DELTACONV_SYMBOLS_FILE")]
    symbols_file: Option<PathBuf>,
}

impl Args {
    pub fn new(common: Common, file: impl Into<PathBuf>, format: Format) -> Self {
        Self {
            common,
            file: file.into(),
            format,
            output: None,
            source: None,
            symbols_file: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_source(mut self, source: Format) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_symbols_file(mut self, symbols_file: impl Into<PathBuf>) -> Self {
        self.symbols_file = Some(symbols_file.into());
        self
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn source(&self) -> Option<Format> {
        self.source
    }

    pub fn symbols_file(&self) -> Option<&Path> {
        self.symbols_file.as_deref()
    }
}

/// Arguments that configure the program rather than the conversion.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The config file. Defaults to ~/.deltaconv/config.json if that exists.
    #[arg(long, env = "DELTACONV_CONFIG")]
    config: Option<PathBuf>,
}

impl Common {
    pub fn new(log_level: LevelFilter, config: Option<PathBuf>) -> Self {
        Self { log_level, config }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}
