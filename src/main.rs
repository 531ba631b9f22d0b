use std::env;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use minire::{Pattern, Template};
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq)]
struct Config {
    pattern: String,
    case_insensitive: bool,
    only_matching: bool,
    replacement: Option<String>,
}

impl Config {
    fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut pattern = None;
        let mut case_insensitive = false;
        let mut only_matching = false;
        let mut replacement = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-E" => pattern = Some(args.next().context("expected a pattern after -E")?),
                "-r" => replacement = Some(args.next().context("expected a template after -r")?),
                "-i" => case_insensitive = true,
                "-o" => only_matching = true,
                other => bail!("unexpected argument {other:?}"),
            }
        }

        let Some(pattern) = pattern else {
            bail!("expected a pattern: -E <pattern>");
        };
        if only_matching && replacement.is_some() {
            bail!("-o and -r cannot be combined");
        }

        Ok(Config {
            pattern,
            case_insensitive,
            only_matching,
            replacement,
        })
    }
}

// Usage: echo <input_text> | minire [-i] [-o] [-r <template>] -E <pattern>
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run(env::args().skip(1)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

// What to print for each input line.
enum Mode {
    Lines,
    OnlyMatching,
    Replace(Template),
}

impl Mode {
    // The template is parsed and checked once, before any input is read.
    fn from_config(config: &Config, pattern: &Pattern) -> Result<Self> {
        if let Some(template) = &config.replacement {
            let parsed = Template::parse(template)
                .and_then(|parsed| parsed.check(pattern.group_count()).map(|()| parsed))
                .with_context(|| format!("invalid template {template:?}"))?;
            return Ok(Mode::Replace(parsed));
        }
        if config.only_matching {
            return Ok(Mode::OnlyMatching);
        }
        Ok(Mode::Lines)
    }
}

// Returns whether any input line matched.
fn run(args: impl IntoIterator<Item = String>) -> Result<bool> {
    let config = Config::from_args(args)?;
    let pattern = Pattern::compile(&config.pattern, config.case_insensitive)
        .with_context(|| format!("invalid pattern {:?}", config.pattern))?;
    let mode = Mode::from_config(&config, &pattern)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut matched = false;
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        matched |= process_line(&pattern, &mode, &line, &mut out)?;
    }
    out.flush().context("failed to flush stdout")?;
    Ok(matched)
}

fn process_line(pattern: &Pattern, mode: &Mode, line: &str, out: &mut impl Write) -> Result<bool> {
    match mode {
        Mode::Replace(template) => {
            let (replaced, count) = template.replace_all(pattern, line);
            writeln!(out, "{replaced}")?;
            Ok(count > 0)
        }
        Mode::OnlyMatching => {
            let mut any = false;
            for m in pattern.find_iter(line) {
                writeln!(out, "{}", m.as_str())?;
                any = true;
            }
            Ok(any)
        }
        Mode::Lines => {
            if !pattern.is_match(line) {
                return Ok(false);
            }
            writeln!(out, "{line}")?;
            Ok(true)
        }
    }
}
