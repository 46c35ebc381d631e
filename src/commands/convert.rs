use crate::args::Args;
use crate::commands::Out;
use crate::dispatch::Dispatcher;
use crate::error::{FormatError, FormatResult};
use crate::formats::Format;
use crate::model::Record;
use crate::symbols::{FileListing, HttpListing, SymbolResolver, SymbolSource};
use crate::{Config, Result};
use anyhow::{bail, Context};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The outcome of a conversion.
#[derive(Debug, Clone, Serialize)]
pub struct Converted {
    input: PathBuf,
    source: Format,
    output: PathBuf,
    target: Format,
    records: usize,
    rows_written: usize,
}

impl Converted {
    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn source(&self) -> Format {
        self.source
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn target(&self) -> Format {
        self.target
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

/// Converts the file named by `args` into the target format.
///
/// With a `--source` format that parser is used and its errors end the conversion. Otherwise the
/// format is detected, and a file that no format accepts is an `UnsupportedFile` error.
pub async fn convert(config: &Config, args: &Args) -> Result<Out<Converted>> {
    let target = args.format();
    if !target.can_export() {
        return Err(FormatError::ExportUnsupported {
            format: target.to_string(),
        }
        .into());
    }

    let input = args.file().to_path_buf();
    let output = output_path(&input, target, args.output());
    if output == input {
        bail!(
            "The output file '{}' is the input file, choose another --output",
            output.display()
        );
    }

    let dispatcher = match args.source() {
        Some(source) => Dispatcher::new(vec![source]),
        None => Dispatcher::default(),
    };
    let resolver = if dispatcher.needs_symbols() {
        let symbols_file = args
            .symbols_file()
            .map(Path::to_path_buf)
            .or_else(|| config.symbols_file());
        load_resolver(config, symbols_file).await?
    } else {
        debug!("No currency listing needed");
        SymbolResolver::empty()
    };

    let explicit = args.source().is_some();
    let (source, records, rows_written) = {
        let (input, output) = (input.clone(), output.clone());
        tokio::task::spawn_blocking(move || {
            run(&dispatcher, explicit, &resolver, &input, target, &output)
        })
        .await
        .context("The conversion task failed")??
    };

    let message = format!(
        "Converted {records} records from '{}' ({source}) into {rows_written} rows of '{}' ({target})",
        input.display(),
        output.display()
    );
    Ok(Out::new(
        message,
        Converted {
            input,
            source,
            output,
            target,
            records,
            rows_written,
        },
    ))
}

async fn load_resolver(config: &Config, symbols_file: Option<PathBuf>) -> Result<SymbolResolver> {
    let source: Box<dyn SymbolSource> = match symbols_file {
        Some(path) => {
            info!("Using the currency listing in {}", path.display());
            Box::new(FileListing::new(path))
        }
        None => {
            info!("Fetching the currency listing from {}", config.listing_url());
            Box::new(HttpListing::from_config(config))
        }
    };
    SymbolResolver::load(source.as_ref()).await
}

/// Parses `input` and exports the records to `output`. Returns the source format, the number of
/// records and the number of rows written.
fn run(
    dispatcher: &Dispatcher,
    explicit: bool,
    resolver: &SymbolResolver,
    input: &Path,
    target: Format,
    output: &Path,
) -> FormatResult<(Format, usize, usize)> {
    let (source, records) = parse(dispatcher, explicit, resolver, input)?;
    let written = target.export(&records, output)?;
    Ok((source, records.len(), written))
}

fn parse(
    dispatcher: &Dispatcher,
    explicit: bool,
    resolver: &SymbolResolver,
    input: &Path,
) -> FormatResult<(Format, Vec<Record>)> {
    if explicit {
        if let Some(&format) = dispatcher.formats().first() {
            let records = format.parse(input, resolver)?;
            if records.is_empty() {
                warn!("The {format} parser found no records in {}", input.display());
            }
            return Ok((format, records));
        }
    }
    dispatcher
        .detect_and_parse(input, resolver)?
        .ok_or_else(|| FormatError::UnsupportedFile {
            path: input.to_path_buf(),
        })
}

/// The path to write to. Without `output` this is `<input stem>.<target>.<ext>` next to the input.
fn output_path(input: &Path, target: Format, output: Option<&Path>) -> PathBuf {
    let extension = target.default_extension();
    match output {
        Some(p) if p.extension().is_some() => p.to_path_buf(),
        Some(p) => p.with_extension(extension),
        None => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "converted".to_string());
            input.with_file_name(format!("{stem}.{target}.{extension}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Common;
    use crate::table::{self, ReadOptions};
    use crate::test::{write_fixture, LISTING_JSON};
    use tempfile::TempDir;
    use tracing_subscriber::filter::LevelFilter;

    const TRADES: &str = "\
Date(UTC),Market,Type,Price,Amount,Total,Fee,Fee Coin
2018-01-02 11:00:00,IOTABTC,SELL,0.0002,100,0.02,0.00002,BTC
2018-01-02 10:00:00,ETHBTC,BUY,0.05,2.0,0.1,0.002,ETH
";

    fn common() -> Common {
        Common::new(LevelFilter::OFF, None)
    }

    async fn config() -> Config {
        let dir = TempDir::new().unwrap();
        Config::load(Some(&write_fixture(
            &dir,
            "config.json",
            r#"{ "app_name": "deltaconv", "config_version": 1 }"#,
        )))
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_convert_binance_to_delta() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(&dir, "trades.csv", TRADES);
        let listing = write_fixture(&dir, "listing.json", LISTING_JSON);
        let args = Args::new(common(), &input, Format::Delta).with_symbols_file(&listing);

        let out = convert(&config().await, &args).await.unwrap();
        let converted = out.structure().unwrap();
        assert_eq!(converted.source(), Format::Binance);
        assert_eq!(converted.records(), 2);
        assert_eq!(converted.rows_written(), 2);
        assert_eq!(converted.output(), dir.path().join("trades.delta.csv"));

        let rows = table::read(converted.output(), &ReadOptions::default()).unwrap();
        assert_eq!(rows.len(), 3);
        // Sorted by time, IOTA spelled the way Delta expects.
        assert_eq!(rows[1][4].to_string(), "ETH");
        assert_eq!(rows[2][4].to_string(), "MIOTA");
        assert_eq!(rows[2][2].to_string(), "Binance");
    }

    #[tokio::test]
    async fn test_convert_bitpanda_without_listing() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(
            &dir,
            "bitpanda.csv",
            "Disclaimer\nTitle\n\
            ID,Created at,Type,In/Out,Fiat Currency,Amount Fiat,Cryptocoin,Amount Cryptocoin,Status\n\
            T1,2018-01-02T10:00:00+00:00,buy,incoming,EUR,100,BTC,0.01,finished\n",
        );
        let output = dir.path().join("out");
        // No listing is configured, so anything that needed one would fail.
        let args = Args::new(common(), &input, Format::Binance)
            .with_source(Format::Bitpanda)
            .with_output(&output);

        let out = convert(&config().await, &args).await.unwrap();
        let converted = out.structure().unwrap();
        assert_eq!(converted.output(), dir.path().join("out.xlsx"));
        assert!(converted.output().is_file());
        assert_eq!(converted.rows_written(), 1);
    }

    #[tokio::test]
    async fn test_convert_unsupported_file() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(&dir, "other.csv", "Foo,Bar\n1,2\n");
        let listing = write_fixture(&dir, "listing.json", LISTING_JSON);
        let args = Args::new(common(), &input, Format::Delta).with_symbols_file(&listing);

        let err = convert(&config().await, &args).await.unwrap_err();
        let format_error = err.downcast_ref::<FormatError>().unwrap();
        assert!(matches!(format_error, FormatError::UnsupportedFile { .. }));
        assert!(!dir.path().join("other.delta.csv").exists());
    }

    #[tokio::test]
    async fn test_convert_to_read_only_format() {
        let args = Args::new(common(), "trades.csv", Format::Bitpanda);
        let err = convert(&config().await, &args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormatError>(),
            Some(FormatError::ExportUnsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_explicit_source_errors_are_fatal() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(&dir, "other.csv", "Foo,Bar\n1,2\n");
        let args = Args::new(common(), &input, Format::Binance).with_source(Format::Delta);
        let err = convert(&config().await, &args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormatError>(),
            Some(FormatError::ParserOutdated { .. })
        ));
    }

    #[test]
    fn test_output_path() {
        let input = Path::new("/data/trades.xlsx");
        assert_eq!(
            output_path(input, Format::Delta, None),
            PathBuf::from("/data/trades.delta.csv")
        );
        assert_eq!(
            output_path(input, Format::Binance, None),
            PathBuf::from("/data/trades.binance.xlsx")
        );
        assert_eq!(
            output_path(input, Format::Binance, Some(Path::new("/out/b.csv"))),
            PathBuf::from("/out/b.csv")
        );
        assert_eq!(
            output_path(input, Format::Delta, Some(Path::new("/out/d"))),
            PathBuf::from("/out/d.csv")
        );
    }
}
