//! Purchase log report
//!
//! Each `<name>.dat` file holds one JSON purchase record per line, written
//! in any of three layouts. Every file is totalled on its own thread, and
//! the report names whoever spent the most overall and on average.
//!
//! Run with: cargo run --bin complete_09_purchase_report -- alice.dat bob.dat

use anyhow::Context;
use clap::Parser;
use crossbeam::channel::{self, Receiver, Sender};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::thread;
use thiserror::Error;
use tracing::{debug, error, info, trace};
use tracing_subscriber::EnvFilter;

// =============================================================================
// Milestone 1: Purchase record layouts
// =============================================================================

/// Anything that can report the tax-inclusive amount of one purchase.
pub trait Totaller {
    fn total(&self) -> f64;
}

/// `{"PurchaseTotal": number}`
#[derive(Debug, Clone, PartialEq)]
pub struct PreTotaled {
    pub purchase_total: f64,
}

/// `{"PurchasePrice": number, "Taxes": number}`
#[derive(Debug, Clone, PartialEq)]
pub struct PriceAndTax {
    pub purchase_price: f64,
    pub taxes: f64,
}

/// `{"Purchases": [number, ...], "TotalTaxes": number}`
#[derive(Debug, Clone, PartialEq)]
pub struct Itemized {
    pub purchases: Vec<f64>,
    pub total_taxes: f64,
}

impl Totaller for PreTotaled {
    fn total(&self) -> f64 {
        self.purchase_total
    }
}

impl Totaller for PriceAndTax {
    fn total(&self) -> f64 {
        self.purchase_price + self.taxes
    }
}

impl Totaller for Itemized {
    fn total(&self) -> f64 {
        self.purchases.iter().sum::<f64>() + self.total_taxes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseRecord {
    PreTotaled(PreTotaled),
    PriceAndTax(PriceAndTax),
    Itemized(Itemized),
}

impl Totaller for PurchaseRecord {
    fn total(&self) -> f64 {
        match self {
            PurchaseRecord::PreTotaled(record) => record.total(),
            PurchaseRecord::PriceAndTax(record) => record.total(),
            PurchaseRecord::Itemized(record) => record.total(),
        }
    }
}

// =============================================================================
// Milestone 2: Strict schema checks and ordered decoding
// =============================================================================

/// Why a line did not fit one particular layout.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("{schema}: not valid JSON: {message}")]
    InvalidJson {
        schema: &'static str,
        message: String,
    },

    #[error("{schema}: expected a JSON object, got {actual}")]
    NotAnObject {
        schema: &'static str,
        actual: &'static str,
    },

    #[error("{schema}: missing \"{field}\" field")]
    MissingField {
        schema: &'static str,
        field: &'static str,
    },

    #[error("{schema}: \"{field}\" should be {expected}, got {actual}")]
    InvalidType {
        schema: &'static str,
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{schema}: \"{field}\"[{index}] should be a number, got {actual}")]
    InvalidItem {
        schema: &'static str,
        field: &'static str,
        index: usize,
        actual: &'static str,
    },
}

impl SchemaError {
    pub fn missing_field(schema: &'static str, field: &'static str) -> Self {
        Self::MissingField { schema, field }
    }

    pub fn invalid_type(
        schema: &'static str,
        field: &'static str,
        expected: &'static str,
        value: &Value,
    ) -> Self {
        Self::InvalidType {
            schema,
            field,
            expected,
            actual: value_type_name(value),
        }
    }
}

/// No layout accepted the line. Keeps the raw input and every attempt's reason.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unable to decode a purchase record from {raw:?}")]
pub struct DecodeError {
    pub raw: String,
    pub attempts: Vec<SchemaError>,
}

impl DecodeError {
    pub fn reasons(&self) -> String {
        self.attempts
            .iter()
            .map(|attempt| attempt.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn require<'a>(
    object: &'a Map<String, Value>,
    schema: &'static str,
    field: &'static str,
) -> Result<&'a Value, SchemaError> {
    object
        .get(field)
        .ok_or_else(|| SchemaError::missing_field(schema, field))
}

fn require_number(
    object: &Map<String, Value>,
    schema: &'static str,
    field: &'static str,
) -> Result<f64, SchemaError> {
    let value = require(object, schema, field)?;
    value
        .as_f64()
        .ok_or_else(|| SchemaError::invalid_type(schema, field, "a number", value))
}

fn require_numbers(
    object: &Map<String, Value>,
    schema: &'static str,
    field: &'static str,
) -> Result<Vec<f64>, SchemaError> {
    let value = require(object, schema, field)?;
    let Some(items) = value.as_array() else {
        return Err(SchemaError::invalid_type(schema, field, "an array of numbers", value));
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_f64().ok_or(SchemaError::InvalidItem {
                schema,
                field,
                index,
                actual: value_type_name(item),
            })
        })
        .collect()
}

/// A record layout with a strict validator. Every declared field must be
/// present and numeric; unknown fields are ignored.
pub trait RecordSchema: Sized + Into<PurchaseRecord> {
    const NAME: &'static str;

    fn from_object(object: &Map<String, Value>) -> Result<Self, SchemaError>;
}

impl RecordSchema for PreTotaled {
    const NAME: &'static str = "PreTotaled";

    fn from_object(object: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(PreTotaled {
            purchase_total: require_number(object, Self::NAME, "PurchaseTotal")?,
        })
    }
}

impl RecordSchema for PriceAndTax {
    const NAME: &'static str = "PriceAndTax";

    fn from_object(object: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(PriceAndTax {
            purchase_price: require_number(object, Self::NAME, "PurchasePrice")?,
            taxes: require_number(object, Self::NAME, "Taxes")?,
        })
    }
}

impl RecordSchema for Itemized {
    const NAME: &'static str = "Itemized";

    fn from_object(object: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Itemized {
            purchases: require_numbers(object, Self::NAME, "Purchases")?,
            total_taxes: require_number(object, Self::NAME, "TotalTaxes")?,
        })
    }
}

impl From<PreTotaled> for PurchaseRecord {
    fn from(record: PreTotaled) -> Self {
        PurchaseRecord::PreTotaled(record)
    }
}

impl From<PriceAndTax> for PurchaseRecord {
    fn from(record: PriceAndTax) -> Self {
        PurchaseRecord::PriceAndTax(record)
    }
}

impl From<Itemized> for PurchaseRecord {
    fn from(record: Itemized) -> Self {
        PurchaseRecord::Itemized(record)
    }
}

fn attempt<S: RecordSchema>(parsed: &Result<Value, String>) -> Result<PurchaseRecord, SchemaError> {
    let value = parsed.as_ref().map_err(|message| SchemaError::InvalidJson {
        schema: S::NAME,
        message: message.clone(),
    })?;
    let Some(object) = value.as_object() else {
        return Err(SchemaError::NotAnObject {
            schema: S::NAME,
            actual: value_type_name(value),
        });
    };
    S::from_object(object).map(Into::into)
}

type Attempt = fn(&Result<Value, String>) -> Result<PurchaseRecord, SchemaError>;

/// Layouts in the order they are tried. The first one that validates wins.
const SCHEMA_ORDER: [Attempt; 3] = [
    attempt::<PreTotaled>,
    attempt::<PriceAndTax>,
    attempt::<Itemized>,
];

/// Decode one JSON line into whichever layout accepts it first.
pub fn decode(line: &[u8]) -> Result<PurchaseRecord, DecodeError> {
    let parsed = serde_json::from_slice::<Value>(line).map_err(|err| err.to_string());
    let mut attempts = Vec::with_capacity(SCHEMA_ORDER.len());

    for try_schema in SCHEMA_ORDER {
        match try_schema(&parsed) {
            Ok(record) => return Ok(record),
            Err(reason) => attempts.push(reason),
        }
    }

    Err(DecodeError {
        raw: String::from_utf8_lossy(line).into_owned(),
        attempts,
    })
}

// =============================================================================
// Milestone 3: Totalling one person's file
// =============================================================================

pub const DATA_EXTENSION: &str = ".dat";

#[derive(Error, Debug)]
pub enum PurchaseError {
    #[error("Failed to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: no record layout matched ({})", .path.display(), .source.reasons())]
    Decode {
        path: PathBuf,
        line: usize,
        #[source]
        source: DecodeError,
    },

    #[error("A worker stopped before reporting; {received} of {expected} results received")]
    WorkerLost { received: usize, expected: usize },
}

/// Running totals for one person.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub name: String,
    pub sum: f64,
    pub count: usize,
}

impl Tally {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, record: &impl Totaller) {
        self.sum += record.total();
        self.count += 1;
    }

    pub fn average(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Person name for a data file: the file name without its `.dat` suffix.
pub fn person_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match file_name.strip_suffix(DATA_EXTENSION) {
        Some(stem) => stem.to_string(),
        None => file_name,
    }
}

/// Decode every line of `path` and total it. Any unreadable or undecodable
/// line fails the whole file.
pub fn aggregate(path: &Path) -> Result<Tally, PurchaseError> {
    let file = File::open(path).map_err(|source| PurchaseError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let mut tally = Tally::new(person_name(path));

    for (index, line) in reader.split(b'\n').enumerate() {
        let mut line = line.map_err(|source| PurchaseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        let record = decode(&line).map_err(|source| PurchaseError::Decode {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        trace!(file = %path.display(), line = index + 1, total = record.total(), "decoded record");
        tally.add(&record);
    }

    debug!(name = %tally.name, sum = tally.sum, count = tally.count, "file totalled");
    Ok(tally)
}

// =============================================================================
// Milestone 4: One worker per file, fan-in, and the winners
// =============================================================================

/// Count used to seed the highest-average slot so its starting average is 0.
pub const AVERAGE_SEED_COUNT: usize = 999;

/// Highest total and highest average seen so far. Ties keep the earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct Standings {
    pub highest_total: Tally,
    pub highest_average: Tally,
}

impl Default for Standings {
    fn default() -> Self {
        Self {
            highest_total: Tally::default(),
            highest_average: Tally {
                count: AVERAGE_SEED_COUNT,
                ..Tally::default()
            },
        }
    }
}

impl Standings {
    pub fn observe(&mut self, tally: &Tally) {
        if tally.sum > self.highest_total.sum {
            self.highest_total = tally.clone();
        }
        if tally.average() > self.highest_average.average() {
            self.highest_average = tally.clone();
        }
    }
}

type Outcome = Result<Tally, PurchaseError>;

fn worker(paths: Receiver<PathBuf>, results: Sender<Outcome>) {
    let Ok(path) = paths.recv() else {
        return;
    };
    let outcome = aggregate(&path);
    // The dispatcher may already have given up after another file failed.
    let _ = results.send(outcome);
}

/// Spawn one worker per file, hand each its path, and fold the results as
/// they arrive. `on_tally` sees every file in completion order. The first
/// failure is returned immediately; workers still running are abandoned.
pub fn dispatch<F>(files: &[PathBuf], mut on_tally: F) -> Result<Standings, PurchaseError>
where
    F: FnMut(&Tally),
{
    let (path_tx, path_rx) = channel::bounded::<PathBuf>(0);
    let (result_tx, result_rx) = channel::unbounded::<Outcome>();

    for path in files {
        let paths = path_rx.clone();
        let results = result_tx.clone();
        thread::spawn(move || worker(paths, results));
        debug!(file = %path.display(), "spawned worker");
        if path_tx.send(path.clone()).is_err() {
            break;
        }
    }
    drop(path_tx);
    drop(path_rx);
    drop(result_tx);

    let mut standings = Standings::default();
    for received in 0..files.len() {
        let tally = result_rx.recv().map_err(|_| PurchaseError::WorkerLost {
            received,
            expected: files.len(),
        })??;
        info!(name = %tally.name, sum = tally.sum, count = tally.count, "received tally");
        on_tally(&tally);
        standings.observe(&tally);
    }

    Ok(standings)
}

pub fn format_average(tally: &Tally) -> String {
    format!("{} spent ${:.2} on average", tally.name, tally.average())
}

pub fn format_summary(standings: &Standings) -> String {
    format!(
        "\n{} had the highest average: ${:.2}\n{} had the highest total: ${:.2}",
        standings.highest_average.name,
        standings.highest_average.average(),
        standings.highest_total.name,
        standings.highest_total.sum
    )
}

// =============================================================================
// Command line
// =============================================================================

/// Report who spent the most, overall and on average, from purchase logs
#[derive(Parser, Debug)]
#[command(name = "complete_09_purchase_report", version)]
struct Cli {
    /// Enable verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Purchase logs, one per person, named `<person>.dat`
    #[arg(value_name = "NAME.dat", required = true, value_parser = parse_data_file)]
    files: Vec<PathBuf>,
}

fn parse_data_file(raw: &str) -> Result<PathBuf, String> {
    if raw.ends_with(DATA_EXTENSION) {
        Ok(PathBuf::from(raw))
    } else {
        Err(format!("{raw} doesn't appear to be a data file."))
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut write_error: Option<io::Error> = None;

    let standings = dispatch(&cli.files, |tally| {
        if write_error.is_none() {
            if let Err(err) = writeln!(out, "{}", format_average(tally)) {
                write_error = Some(err);
            }
        }
    })
    .context("failed to total purchase logs")?;

    if let Some(err) = write_error {
        return Err(err).context("failed to write report");
    }

    info!(
        highest_total = %standings.highest_total.name,
        highest_average = %standings.highest_average.name,
        "all files totalled"
    );
    writeln!(out, "{}", format_summary(&standings)).context("failed to write report")?;
    Ok(())
}

fn main() {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let code = if err.use_stderr() { 1 } else { 0 };
        let _ = err.print();
        std::process::exit(code);
    });
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

// =============================================================================
// Tests
// =============================================================================
