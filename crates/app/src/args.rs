use std::fmt;
use std::path::PathBuf;

use course_core::model::{LessonId, ModuleId};

pub const DEFAULT_DB_URL: &str = "sqlite://course.sqlite3";

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    MissingArgument { command: &'static str, name: &'static str },
    UnexpectedArgument(String),
    InvalidNumber { name: &'static str, raw: String },
    FlagNotSupported { flag: &'static str, command: &'static str },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::MissingArgument { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::UnexpectedArgument(arg) => write!(f, "unexpected argument: {arg}"),
            ArgsError::InvalidNumber { name, raw } => write!(f, "invalid {name}: {raw}"),
            ArgsError::FlagNotSupported { flag, command } => {
                write!(f, "{flag} is not supported by {command}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// Profile answers given on the command line. Absent fields keep their
/// stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileArgs {
    pub role: Option<String>,
    pub industry: Option<String>,
    pub experience: Option<String>,
    pub goals: Vec<String>,
    pub style: Option<String>,
    pub name: Option<String>,
}

impl ProfileArgs {
    fn first_flag(&self) -> Option<&'static str> {
        [
            (self.role.is_some(), "--role"),
            (self.industry.is_some(), "--industry"),
            (self.experience.is_some(), "--experience"),
            (!self.goals.is_empty(), "--goal"),
            (self.style.is_some(), "--style"),
            (self.name.is_some(), "--name"),
        ]
        .into_iter()
        .find_map(|(set, flag)| set.then_some(flag))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Complete {
        module_id: ModuleId,
        lesson_id: LessonId,
    },
    Quiz {
        module_id: ModuleId,
        lesson_id: LessonId,
        score: u8,
        seconds: u64,
    },
    Achievements,
    Path,
    Profile(ProfileArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::Complete { .. } => "complete",
            Command::Quiz { .. } => "quiz",
            Command::Achievements => "achievements",
            Command::Path => "path",
            Command::Profile(_) => "profile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub db_url: String,
    pub in_memory: bool,
    pub curriculum: Option<PathBuf>,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- status");
    eprintln!("  cargo run -p app -- complete <module> <lesson>");
    eprintln!("  cargo run -p app -- quiz <module> <lesson> <score> [--seconds <n>]");
    eprintln!("  cargo run -p app -- achievements");
    eprintln!("  cargo run -p app -- path");
    eprintln!(
        "  cargo run -p app -- profile [--role <role>] [--industry <x>] [--experience <x>] [--goal <x>]... [--style <x>] [--name <x>]"
    );
    eprintln!();
    eprintln!("Options (any subcommand):");
    eprintln!("  --db <sqlite_url>       default {DEFAULT_DB_URL}");
    eprintln!("  --memory                keep progress in memory only");
    eprintln!("  --curriculum <path>     JSON map of module id to lesson ids");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, COURSE_CURRICULUM, COURSE_LOG (falls back to RUST_LOG)");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: &str, name: &'static str) -> Result<T, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidNumber {
        name,
        raw: raw.to_string(),
    })
}

impl Args {
    /// Parse arguments after the binary name. `env` resolves environment
    /// variables so defaults can be injected in tests.
    pub fn parse(
        argv: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("COURSE_DB_URL")
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.to_string(), normalize_sqlite_url);
        let mut curriculum = env("COURSE_CURRICULUM")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let mut in_memory = false;
        let mut seconds: Option<u64> = None;
        let mut profile = ProfileArgs::default();
        let mut positionals = Vec::new();

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--memory" => in_memory = true,
                "--curriculum" => {
                    curriculum = Some(PathBuf::from(require_value(&mut args, "--curriculum")?));
                }
                "--seconds" => {
                    let value = require_value(&mut args, "--seconds")?;
                    seconds = Some(parse_number(&value, "seconds")?);
                }
                "--role" => profile.role = Some(require_value(&mut args, "--role")?),
                "--industry" => profile.industry = Some(require_value(&mut args, "--industry")?),
                "--experience" => {
                    profile.experience = Some(require_value(&mut args, "--experience")?);
                }
                "--goal" => profile.goals.push(require_value(&mut args, "--goal")?),
                "--style" => profile.style = Some(require_value(&mut args, "--style")?),
                "--name" => profile.name = Some(require_value(&mut args, "--name")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positionals.push(arg),
            }
        }

        let command = build_command(positionals, seconds, profile)?;
        Ok(Self {
            db_url,
            in_memory,
            curriculum,
            command,
        })
    }
}

fn build_command(
    positionals: Vec<String>,
    seconds: Option<u64>,
    profile: ProfileArgs,
) -> Result<Command, ArgsError> {
    let mut rest = positionals.into_iter();
    let name = rest.next().unwrap_or_else(|| "status".to_string());

    let mut positional = |command: &'static str, field: &'static str| {
        rest.next()
            .ok_or(ArgsError::MissingArgument { command, name: field })
    };

    let command = match name.as_str() {
        "status" => Command::Status,
        "achievements" => Command::Achievements,
        "path" => Command::Path,
        "complete" => {
            let module = positional("complete", "module")?;
            let lesson = positional("complete", "lesson")?;
            Command::Complete {
                module_id: parse_number(&module, "module id")?,
                lesson_id: parse_number(&lesson, "lesson id")?,
            }
        }
        "quiz" => {
            let module = positional("quiz", "module")?;
            let lesson = positional("quiz", "lesson")?;
            let score = positional("quiz", "score")?;
            let score: u16 = parse_number(&score, "score")?;
            Command::Quiz {
                module_id: parse_number(&module, "module id")?,
                lesson_id: parse_number(&lesson, "lesson id")?,
                score: u8::try_from(score.min(100)).unwrap_or(100),
                seconds: seconds.unwrap_or(0),
            }
        }
        "profile" => Command::Profile(profile.clone()),
        _ => return Err(ArgsError::UnknownCommand(name)),
    };

    if let Some(extra) = rest.next() {
        return Err(ArgsError::UnexpectedArgument(extra));
    }
    if seconds.is_some() && !matches!(command, Command::Quiz { .. }) {
        return Err(ArgsError::FlagNotSupported {
            flag: "--seconds",
            command: command.name(),
        });
    }
    if !matches!(command, Command::Profile(_)) {
        if let Some(flag) = profile.first_flag() {
            return Err(ArgsError::FlagNotSupported {
                flag,
                command: command.name(),
            });
        }
    }
    Ok(command)
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}
