//! Line-oriented command scripts driving a calibration session.
//!
//! Each line holds one command and its arguments separated by whitespace.
//! Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! filter 13 5
//! find-peaks 0.1
//! enumerate 8 8
//! correct 17 9
//! tessellate
//! save-map map.txt
//! ```

use crate::{CliError, Result};
use crystalmap_algorithms::CalibrationSession;
use crystalmap_core::{Progress, Roi};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Script parse errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command {0:?}")]
    Unknown(String),

    #[error("usage: {command} {usage}")]
    Usage {
        command: &'static str,
        usage: &'static str,
    },

    #[error("{command}: invalid argument {token:?}")]
    InvalidArgument {
        command: &'static str,
        token: String,
    },
}

/// One interactive operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Filter with optional new size and threshold, over an optional region.
    Filter {
        params: Option<(u32, f64)>,
        roi: Option<Roi>,
    },
    /// Discard filtering.
    ResetFilter,
    FindPeaks {
        cutoff: Option<f64>,
    },
    Enumerate {
        columns: usize,
        rows: usize,
    },
    Correct {
        peak: usize,
        new_id: usize,
    },
    Tessellate,
    Add {
        x: i32,
        y: i32,
    },
    AddLocal {
        x: i32,
        y: i32,
    },
    Select {
        x: i32,
        y: i32,
    },
    Next,
    Move {
        x: i32,
        y: i32,
    },
    Remove,
    Clear,
    Count,
    List,
    SavePeaks(PathBuf),
    LoadPeaks(PathBuf),
    SaveMap(PathBuf),
    SaveBoundaries(PathBuf),
    SaveImage(PathBuf),
}

struct Args<'a> {
    command: &'static str,
    usage: &'static str,
    tokens: Vec<&'a str>,
}

impl Args<'_> {
    fn usage(&self) -> CommandError {
        CommandError::Usage {
            command: self.command,
            usage: self.usage,
        }
    }

    fn expect(&self, counts: &[usize]) -> std::result::Result<(), CommandError> {
        if counts.contains(&self.tokens.len()) {
            Ok(())
        } else {
            Err(self.usage())
        }
    }

    fn get<T: FromStr>(&self, idx: usize) -> std::result::Result<T, CommandError> {
        let token = self.tokens.get(idx).ok_or_else(|| self.usage())?;
        token.parse().map_err(|_| CommandError::InvalidArgument {
            command: self.command,
            token: (*token).to_string(),
        })
    }

    fn path(&self) -> std::result::Result<PathBuf, CommandError> {
        self.expect(&[1])?;
        Ok(PathBuf::from(self.tokens[0]))
    }

    fn point(&self) -> std::result::Result<(i32, i32), CommandError> {
        self.expect(&[2])?;
        Ok((self.get(0)?, self.get(1)?))
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().unwrap_or_default();
        let (command, usage): (&'static str, &'static str) = match name {
            "filter" => ("filter", "[size threshold [x y width height]]"),
            "reset-filter" => ("reset-filter", ""),
            "find-peaks" => ("find-peaks", "[cutoff]"),
            "enumerate" => ("enumerate", "columns rows"),
            "correct" => ("correct", "peak new-id"),
            "tessellate" => ("tessellate", ""),
            "add" => ("add", "x y"),
            "add-local" => ("add-local", "x y"),
            "select" => ("select", "x y"),
            "next" => ("next", ""),
            "move" => ("move", "x y"),
            "remove" => ("remove", ""),
            "clear" => ("clear", ""),
            "count" => ("count", ""),
            "list" => ("list", ""),
            "save-peaks" => ("save-peaks", "path"),
            "load-peaks" => ("load-peaks", "path"),
            "save-map" => ("save-map", "path"),
            "save-boundaries" => ("save-boundaries", "path"),
            "save-image" => ("save-image", "path"),
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        let args = Args {
            command,
            usage,
            tokens: tokens.collect(),
        };

        let parsed = match command {
            "filter" => {
                args.expect(&[0, 2, 6])?;
                let params = if args.tokens.is_empty() {
                    None
                } else {
                    Some((args.get(0)?, args.get(1)?))
                };
                let roi = if args.tokens.len() == 6 {
                    Some(Roi::new(args.get(2)?, args.get(3)?, args.get(4)?, args.get(5)?))
                } else {
                    None
                };
                Command::Filter { params, roi }
            }
            "find-peaks" => {
                args.expect(&[0, 1])?;
                let cutoff = if args.tokens.is_empty() {
                    None
                } else {
                    Some(args.get(0)?)
                };
                Command::FindPeaks { cutoff }
            }
            "enumerate" => {
                args.expect(&[2])?;
                Command::Enumerate {
                    columns: args.get(0)?,
                    rows: args.get(1)?,
                }
            }
            "correct" => {
                args.expect(&[2])?;
                Command::Correct {
                    peak: args.get(0)?,
                    new_id: args.get(1)?,
                }
            }
            "add" | "add-local" | "select" | "move" => {
                let (x, y) = args.point()?;
                match command {
                    "add" => Command::Add { x, y },
                    "add-local" => Command::AddLocal { x, y },
                    "select" => Command::Select { x, y },
                    _ => Command::Move { x, y },
                }
            }
            "save-peaks" => Command::SavePeaks(args.path()?),
            "load-peaks" => Command::LoadPeaks(args.path()?),
            "save-map" => Command::SaveMap(args.path()?),
            "save-boundaries" => Command::SaveBoundaries(args.path()?),
            "save-image" => Command::SaveImage(args.path()?),
            _ => {
                args.expect(&[0])?;
                match command {
                    "reset-filter" => Command::ResetFilter,
                    "tessellate" => Command::Tessellate,
                    "next" => Command::Next,
                    "remove" => Command::Remove,
                    "clear" => Command::Clear,
                    "count" => Command::Count,
                    _ => Command::List,
                }
            }
        };
        Ok(parsed)
    }
}

/// Logs stage progress at every tenth.
pub struct LogProgress {
    stage: &'static str,
    next: f64,
}

impl LogProgress {
    pub fn new(stage: &'static str) -> Self {
        Self { stage, next: 0.1 }
    }
}

impl Progress for LogProgress {
    fn update(&mut self, fraction: f64) {
        if fraction >= self.next {
            log::debug!("{}: {:.0}%", self.stage, fraction * 100.0);
            while self.next <= fraction {
                self.next += 0.1;
            }
        }
    }
}

/// Applies `command` to `session`, writing any listing to `out`.
pub fn execute<W: Write>(
    session: &mut CalibrationSession,
    command: &Command,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Filter { params, roi } => {
            if let Some((size, threshold)) = *params {
                session.set_filter_params(size, threshold)?;
            }
            session.apply_filter(*roi, &mut LogProgress::new("filter"))?;
        }
        Command::ResetFilter => session.reset_filter(),
        Command::FindPeaks { cutoff } => {
            if let Some(cutoff) = *cutoff {
                session.set_peak_cutoff(cutoff)?;
            }
            let found = session.find_peaks()?;
            writeln!(out, "{found} peaks found")?;
        }
        Command::Enumerate { columns, rows } => session.enumerate(*columns, *rows)?,
        Command::Correct { peak, new_id } => session.correct_peak(*peak, *new_id)?,
        Command::Tessellate => {
            session.tessellate(&mut LogProgress::new("tessellate"));
        }
        Command::Add { x, y } => {
            session.add_peak(*x, *y)?;
        }
        Command::AddLocal { x, y } => {
            session.add_local_peak(*x, *y)?;
        }
        Command::Select { x, y } => {
            session.select_nearest(*x, *y);
        }
        Command::Next => {
            session.store_mut().select_next();
        }
        Command::Move { x, y } => {
            session.move_current(*x, *y);
        }
        Command::Remove => {
            session.remove_current();
        }
        Command::Clear => session.clear_peaks(),
        Command::Count => writeln!(out, "{} total peaks.", session.store().len())?,
        Command::List => write!(out, "{}", session.store().table())?,
        Command::SavePeaks(path) => crystalmap_io::save_peaks(path, session.store())?,
        Command::LoadPeaks(path) => {
            let peaks = crystalmap_io::load_peaks(path)?;
            session.replace_peaks(peaks);
        }
        Command::SaveMap(path) => {
            let map = session
                .crystal_map()
                .ok_or(CliError::NotReady("save-map needs a tessellation"))?;
            crystalmap_io::save_grid(path, &map.to_float_grid())?;
        }
        Command::SaveBoundaries(path) => {
            let image = session
                .boundary_image()
                .ok_or(CliError::NotReady("save-boundaries needs a tessellation"))?;
            crystalmap_io::save_grid(path, image)?;
        }
        Command::SaveImage(path) => crystalmap_io::save_grid(path, session.image())?,
    }
    Ok(())
}

/// Runs every command in `script`, stopping at the first failure.
///
/// Returns the number of commands executed.
pub fn run_script<W: Write>(
    session: &mut CalibrationSession,
    script: &str,
    out: &mut W,
) -> Result<usize> {
    let mut executed = 0;
    for (idx, raw) in script.lines().enumerate() {
        let line = idx + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let command: Command = text
            .parse()
            .map_err(|source| CliError::Command { line, source })?;
        log::debug!("line {line}: {command:?}");
        execute(session, &command, out).map_err(|source| CliError::Step {
            line,
            source: Box::new(source),
        })?;
        executed += 1;
    }
    Ok(executed)
}
