mod debug_report;

use parley::{
    Choices, DEFAULT_PATTERNS, Dispatcher, IntentsDb, Layer, LayerKind, Options, PatternSet, Request, Stack,
    TransitionRegister, TriggerSpec,
};
use std::error::Error;
use std::io::{self, IsTerminal, Read};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    init_tracing();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let matched = match config.mode {
        Mode::Dispatch(ref dispatch) => run_dispatch(dispatch, &config),
        Mode::Accept(ref kinds) => run_accept(kinds, &config),
    };

    match matched {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PARLEY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer().with_writer(io::stderr)).init();
}

type RunResult = Result<bool, Box<dyn Error>>;

fn run_dispatch(dispatch: &DispatchConfig, config: &CliConfig) -> RunResult {
    let db = Arc::new(match &dispatch.intents_file {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|err| format!("{path}: {err}"))?;
            IntentsDb::from_json(&json)?
        }
        None => IntentsDb::new("en"),
    });

    let mut dispatcher = Dispatcher::new();
    for trigger in &dispatch.triggers {
        match trigger {
            TriggerArg::Intent(key) => dispatcher.register(key.as_str(), TriggerSpec::text(&db, key)?)?,
            TriggerArg::Anything => dispatcher.register("anything", TriggerSpec::anything())?,
            TriggerArg::Choice => dispatcher.register("choice", TriggerSpec::choice(dispatch.when.as_deref()))?,
        };
    }

    let mut register = TransitionRegister::new();
    if !dispatch.choices.is_empty() {
        let mut builder = Choices::builder(&db);
        for (slug, text) in &dispatch.choices {
            builder.add(slug, None, Some(text))?;
        }
        builder.build().store(&mut register)?;
    }

    let mut layers = Vec::new();
    if let Some(text) = &config.input {
        layers.push(Layer::raw_text(text.as_str()));
    }
    if let Some(slug) = &dispatch.quick_reply {
        layers.push(Layer::quick_reply(slug.as_str()));
    }

    let mut request = Request::new(Stack::new(layers), register).with_intents(db);
    if let Some(locale) = &dispatch.locale {
        request = request.with_locale(locale.as_str());
    }

    let options = Options { parallel: dispatch.parallel };
    let verbose = dispatcher.dispatch_verbose_with(&mut request, &options);
    debug_report::print_dispatch(&request, &verbose, config.color);
    Ok(verbose.result.is_ok())
}

fn run_accept(kinds: &[LayerKind], config: &CliConfig) -> RunResult {
    let patterns = if config.patterns.is_empty() {
        DEFAULT_PATTERNS.clone()
    } else {
        let mut set = PatternSet::new();
        for (name, expression) in &config.patterns {
            set.register(name.as_str(), expression)?;
        }
        set
    };

    let mut stack: Stack = kinds.iter().map(|&kind| placeholder(kind)).collect();
    let result = patterns.accept(&mut stack).map(str::to_string);
    debug_report::print_accept(&patterns, &stack, &result, config.color);
    Ok(result.is_ok())
}

/// An empty layer of `kind`; acceptance only looks at kinds.
fn placeholder(kind: LayerKind) -> Layer {
    match kind {
        LayerKind::Text => Layer::text(""),
        LayerKind::RawText => Layer::raw_text(""),
        LayerKind::QuickReply => Layer::quick_reply(""),
        LayerKind::QuickRepliesList => Layer::QuickRepliesList { options: Vec::new() },
        LayerKind::Postback => Layer::Postback { payload: serde_json::Value::Null },
    }
}

struct CliConfig {
    mode: Mode,
    input: Option<String>,
    patterns: Vec<(String, String)>,
    color: bool,
}

enum Mode {
    Dispatch(DispatchConfig),
    Accept(Vec<LayerKind>),
}

#[derive(Default)]
struct DispatchConfig {
    intents_file: Option<String>,
    triggers: Vec<TriggerArg>,
    choices: Vec<(String, String)>,
    when: Option<String>,
    quick_reply: Option<String>,
    locale: Option<String>,
    parallel: bool,
}

enum TriggerArg {
    Intent(String),
    Anything,
    Choice,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut dispatch = DispatchConfig::default();
    let mut accept: Option<Vec<LayerKind>> = None;
    let mut patterns = Vec::new();
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            inline.clone().or_else(|| args.next()).ok_or_else(|| format!("error: {name} expects a value"))
        };

        match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("parley {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--parallel" => dispatch.parallel = true,
            "--anything" => dispatch.triggers.push(TriggerArg::Anything),
            "--intents" => dispatch.intents_file = Some(value("--intents")?),
            "--intent" => dispatch.triggers.push(TriggerArg::Intent(value("--intent")?)),
            "--when" => dispatch.when = Some(value("--when")?),
            "--quick-reply" => dispatch.quick_reply = Some(value("--quick-reply")?),
            "--locale" => dispatch.locale = Some(value("--locale")?),
            "--choice" => {
                let pair = value("--choice")?;
                let (slug, text) = split_pair(&pair, "--choice", "slug=text")?;
                if dispatch.choices.is_empty() {
                    dispatch.triggers.push(TriggerArg::Choice);
                }
                dispatch.choices.push((slug, text));
            }
            "--pattern" => {
                let pair = value("--pattern")?;
                patterns.push(split_pair(&pair, "--pattern", "name=expr")?);
            }
            "--accept" => accept = Some(parse_kinds(&value("--accept")?)?),
            "--" => {
                let rest = args.by_ref().collect::<Vec<_>>().join(" ");
                set_input(&mut input, rest)?;
                break;
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args.by_ref()).collect::<Vec<_>>().join(" ");
                set_input(&mut input, rest)?;
                break;
            }
        }
    }

    let mode = match accept {
        Some(kinds) => Mode::Accept(kinds),
        None => {
            if dispatch.triggers.is_empty() {
                return Err(format!("error: no trigger registered\n\n{}", help_text()));
            }
            if input.is_none() && dispatch.quick_reply.is_none() {
                input = Some(read_stdin_input()?);
            }
            if input.as_deref().is_some_and(|s| s.trim().is_empty()) && dispatch.quick_reply.is_none() {
                return Err(format!("error: no input provided\n\n{}", help_text()));
            }
            Mode::Dispatch(dispatch)
        }
    };

    Ok(CliConfig { mode, input, patterns, color })
}

fn set_input(input: &mut Option<String>, value: String) -> Result<(), String> {
    if value.trim().is_empty() {
        return Ok(());
    }
    if input.is_some() {
        return Err("error: input provided multiple times".to_string());
    }
    *input = Some(value);
    Ok(())
}

fn split_pair(pair: &str, flag: &str, shape: &str) -> Result<(String, String), String> {
    match pair.split_once('=') {
        Some((left, right)) if !left.is_empty() => Ok((left.to_string(), right.to_string())),
        _ => Err(format!("error: {flag} expects {shape}, got '{pair}'")),
    }
}

fn parse_kinds(list: &str) -> Result<Vec<LayerKind>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| LayerKind::from_name(name).ok_or_else(|| format!("error: unknown layer kind '{name}'")))
        .collect()
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer.trim_end().to_string())
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "parley {version}

Rank triggers against a message, or name the shape of an outgoing stack.

Usage:
  parley [OPTIONS] [--] <text...>
  parley --accept <Kind,...> [--pattern <name=expr>...]

Triggers (registered in the order given, ties go to the first):
  --intent <KEY>             Text trigger matching the intent KEY.
  --anything                 Trigger that accepts every message.
  --choice <slug=text>       Offer a choice; the first one also registers
                             the Choice trigger.
  --when <slug>              Only let the Choice trigger fire for <slug>.

Request:
  --intents <file>           Intents database (JSON). Default: empty.
  --quick-reply <slug>       Add a tapped quick reply to the message.
  --locale <locale>          Locale used to pick intent strings.
  --parallel                 Rank triggers on the thread pool.

Stacks:
  --accept <Kind,...>        Name a stack of layer kinds instead of dispatching.
                             Kinds: Text, RawText, QuickReply, QuickRepliesList, Postback
  --pattern <name=expr>      Pattern to accept with. Default: {default_patterns}

Output:
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Logging goes to stderr; set PARLEY_LOG (or RUST_LOG), e.g. PARLEY_LOG=parley=debug.

Exit codes:
  0  A trigger or pattern matched.
  1  Nothing matched.
  2  Invalid arguments or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
        default_patterns = DEFAULT_PATTERNS
            .names()
            .filter_map(|name| DEFAULT_PATTERNS.get(name).map(|p| format!("{name}={p}")))
            .collect::<Vec<_>>()
            .join(", "),
    )
}
