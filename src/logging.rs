//! Process logging setup
//!
//! Log lines go through the `log` facade into an `env_logger` instance whose
//! target is a file rotated at local midnight. Rotated files keep a dated
//! suffix (`network_monitor.log.2024-01-01`). The line layout follows a
//! `%(field)s` template taken from the configuration file.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use log::Level;
use std::fmt::{self, Display};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Installs the global logger described by `config`
///
/// `RUST_LOG` still takes precedence over the configured level so a single run
/// can be made more verbose without editing the file.
pub fn init(config: &Config) -> Result<()> {
    let writer = DailyRotatingFile::open(&config.log_file).with_context(|| {
        format!("Failed to open log file {}", config.log_file.display())
    })?;
    let template = LogTemplate::parse(&config.log_format);

    env_logger::Builder::new()
        .filter_level(config.log_level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(writer)))
        .format(move |buf, record| {
            writeln!(
                buf,
                "{}",
                template.render(record.level(), record.target(), record.args(), Local::now())
            )
        })
        .try_init()
        .context("Logger already initialized")?;

    Ok(())
}

/// A writer that switches to a fresh file on the first write of a new day
#[derive(Debug)]
pub struct DailyRotatingFile {
    path: PathBuf,
    file: Option<File>,
    current_day: NaiveDate,
}

impl DailyRotatingFile {
    /// Opens `path` for appending, creating parent directories as needed
    ///
    /// An existing file is attributed to the day it was last modified, so a
    /// restart after midnight still rotates yesterday's lines away.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let current_day = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(|t| DateTime::<Local>::from(t).date_naive())
            .unwrap_or_else(|_| Local::now().date_naive());

        let file = open_append(&path)?;
        Ok(Self {
            path,
            file: Some(file),
            current_day,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name the active file gets once `day` is over
    pub fn rotated_path(&self, day: NaiveDate) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}", day.format("%Y-%m-%d")));
        PathBuf::from(name)
    }

    /// Rotates when `today` differs from the day the active file belongs to
    pub fn rotate_if_needed(&mut self, today: NaiveDate) -> io::Result<()> {
        if today == self.current_day {
            return Ok(());
        }

        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        let target = self.rotated_path(self.current_day);
        // Keep an earlier rotation of the same day rather than overwrite it
        if !target.exists() && self.path.exists() {
            fs::rename(&self.path, &target)?;
        }

        self.file = Some(open_append(&self.path)?);
        self.current_day = today;
        Ok(())
    }

    fn active(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            self.file = Some(open_append(&self.path)?);
        }
        // Populated just above
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file unavailable"))
    }
}

impl Write for DailyRotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.rotate_if_needed(Local::now().date_naive())?;
        self.active()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Placeholders understood by [`LogTemplate`]
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    AscTime,
    LevelName,
    Message,
    Name,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field {
        field: Field,
        width: usize,
        left_align: bool,
    },
}

/// A parsed `%(field)s` line template
///
/// Supports `asctime`, `levelname`, `message` and `name`, an optional
/// `-`/width modifier (`%(levelname)-8s`) and `%%`. Anything else is copied
/// through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct LogTemplate {
    segments: Vec<Segment>,
}

impl LogTemplate {
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(pos) = rest.find('%') {
            literal.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("%%") {
                literal.push('%');
                rest = after;
                continue;
            }

            match parse_placeholder(tail) {
                Some((segment, consumed)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                    rest = &tail[consumed..];
                }
                None => {
                    literal.push('%');
                    rest = &tail[1..];
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    pub fn render(
        &self,
        level: Level,
        target: &str,
        message: &dyn Display,
        now: DateTime<Local>,
    ) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    field,
                    width,
                    left_align,
                } => {
                    let value = match field {
                        Field::AscTime => now.format("%Y-%m-%d %H:%M:%S,%3f").to_string(),
                        Field::LevelName => level_name(level).to_string(),
                        Field::Message => message.to_string(),
                        Field::Name => target.to_string(),
                    };
                    pad_into(&mut out, &value, *width, *left_align);
                }
            }
        }
        out
    }
}

impl Default for LogTemplate {
    fn default() -> Self {
        Self::parse("%(asctime)s - %(levelname)s - %(message)s")
    }
}

impl Display for LogTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => write!(f, "{}", text.replace('%', "%%"))?,
                Segment::Field {
                    field,
                    width,
                    left_align,
                } => {
                    let name = match field {
                        Field::AscTime => "asctime",
                        Field::LevelName => "levelname",
                        Field::Message => "message",
                        Field::Name => "name",
                    };
                    write!(f, "%({name})")?;
                    if *left_align {
                        write!(f, "-")?;
                    }
                    if *width > 0 {
                        write!(f, "{width}")?;
                    }
                    write!(f, "s")?;
                }
            }
        }
        Ok(())
    }
}

/// Parses `%(name)[-][width]s` at the start of `input`
fn parse_placeholder(input: &str) -> Option<(Segment, usize)> {
    let inner = input.strip_prefix("%(")?;
    let close = inner.find(')')?;
    let field = match &inner[..close] {
        "asctime" => Field::AscTime,
        "levelname" => Field::LevelName,
        "message" => Field::Message,
        "name" => Field::Name,
        _ => return None,
    };

    let mut spec = &inner[close + 1..];
    let left_align = spec.starts_with('-');
    if left_align {
        spec = &spec[1..];
    }
    let digits = spec.chars().take_while(char::is_ascii_digit).count();
    let width = spec[..digits].parse().unwrap_or(0);
    if !spec[digits..].starts_with('s') {
        return None;
    }

    let consumed = input.len() - spec[digits + 1..].len();
    Some((
        Segment::Field {
            field,
            width,
            left_align,
        },
        consumed,
    ))
}

fn pad_into(out: &mut String, value: &str, width: usize, left_align: bool) {
    let fill = width.saturating_sub(value.chars().count());
    if left_align {
        out.push_str(value);
        out.extend(std::iter::repeat_n(' ', fill));
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        out.push_str(value);
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}
