use std::{
    fs::File,
    io::{self, BufReader, BufWriter, StdoutLock, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Serialize, de::DeserializeOwned};
use spinstack_evaluator::{Difficulty, Personality, Policy};

/// Destination of a command's JSON report.
///
/// Game summaries, versus reports and policies all go to stdout unless
/// `--output` names a file, so progress on stderr never mixes with them.
#[derive(Debug)]
pub enum Output {
    Stdout(StdoutLock<'static>),
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    /// Writes `report` as pretty JSON to `--output` or stdout.
    pub fn save_json<T>(report: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let mut output = match output_path {
            Some(path) => Output::create(path)?,
            None => Output::Stdout(io::stdout().lock()),
        };
        output.write_report(report)
    }

    fn create(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    fn destination(&self) -> String {
        match self {
            Output::Stdout(_) => "stdout".to_owned(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    fn write_report<T>(&mut self, report: &T) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let destination = self.destination();
        let writer: &mut dyn Write = match self {
            Output::Stdout(writer) => writer,
            Output::File { writer, .. } => writer,
        };
        serde_json::to_writer_pretty(&mut *writer, report)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(writer))
            .and_then(|()| writer.flush())
            .with_context(|| format!("Failed to write report to {destination}"))
    }
}

/// Reads a JSON file, naming `file_kind` in error messages.
pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} JSON file: {}", path.display()))
}

/// Builds a policy from a JSON file, or from a preset and a personality.
///
/// # Errors
///
/// Returns error if the file cannot be read or the policy is invalid
pub fn load_policy(
    path: Option<&Path>,
    difficulty: Difficulty,
    personality: Personality,
) -> anyhow::Result<Policy> {
    let policy = match path {
        Some(path) => read_json_file("policy", path)?,
        None => Policy::new(difficulty, personality),
    };
    policy.validate().context("Invalid policy")?;
    Ok(policy)
}
