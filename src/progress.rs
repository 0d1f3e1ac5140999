//! Progress reporting while parts are written.
//!
//! Three sinks are available: a textual bar on stderr for humans, a JSON line
//! stream for tools driving the conversion, and a silent one.

use std::io::{self, Write};

use serde::Serialize;

use crate::error::Result;

const BAR_WIDTH: usize = 30;

/// Receives progress units as the work advances.
pub trait Progress: Send {
    fn add(&mut self, n: usize) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct ProgressOptions {
    /// Total number of units.
    pub max: usize,
    pub description: String,
    /// Position of this job in a multi-step run (1-based).
    pub current_job: usize,
    pub total_job: usize,
    pub quiet: bool,
    pub json: bool,
}

/// Picks the sink matching the options. JSON wins over quiet.
pub fn new_progress(options: ProgressOptions) -> Box<dyn Progress> {
    if options.json {
        Box::new(JsonProgress::new(options, io::stdout()))
    } else if options.quiet {
        Box::new(QuietProgress)
    } else {
        Box::new(ProgressBar::new(options, io::stderr()))
    }
}

pub struct QuietProgress;

impl Progress for QuietProgress {
    fn add(&mut self, _n: usize) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct Counter {
    current: usize,
    total: usize,
}

#[derive(Serialize)]
struct ProgressData<'a> {
    progress: Counter,
    steps: Counter,
    description: &'a str,
}

#[derive(Serialize)]
struct ProgressEvent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: ProgressData<'a>,
}

/// One JSON object per line, on every `add`.
pub struct JsonProgress<W: Write> {
    options: ProgressOptions,
    writer: W,
    current: usize,
}

impl<W: Write> JsonProgress<W> {
    pub fn new(options: ProgressOptions, writer: W) -> Self {
        Self {
            options,
            writer,
            current: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Progress for JsonProgress<W> {
    fn add(&mut self, n: usize) -> Result<()> {
        self.current += n;
        let event = ProgressEvent {
            kind: "progress",
            data: ProgressData {
                progress: Counter {
                    current: self.current,
                    total: self.options.max,
                },
                steps: Counter {
                    current: self.options.current_job,
                    total: self.options.total_job,
                },
                description: &self.options.description,
            },
        };
        serde_json::to_writer(&mut self.writer, &event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Redraws a single line: `Writing Part (2/2) [#####     ] 1/2`.
pub struct ProgressBar<W: Write> {
    options: ProgressOptions,
    writer: W,
    current: usize,
}

impl<W: Write> ProgressBar<W> {
    pub fn new(options: ProgressOptions, writer: W) -> Self {
        Self {
            options,
            writer,
            current: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn line(&self) -> String {
        let filled = if self.options.max == 0 {
            BAR_WIDTH
        } else {
            (self.current.min(self.options.max) * BAR_WIDTH) / self.options.max
        };
        format!(
            "{} ({}/{}) [{}{}] {}/{}",
            self.options.description,
            self.options.current_job,
            self.options.total_job,
            "#".repeat(filled),
            " ".repeat(BAR_WIDTH - filled),
            self.current,
            self.options.max
        )
    }
}

impl<W: Write + Send> Progress for ProgressBar<W> {
    fn add(&mut self, n: usize) -> Result<()> {
        self.current += n;
        let line = self.line();
        write!(self.writer, "\r{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
