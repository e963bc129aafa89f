use parley::{DispatchVerbose, MatchError, PatternSet, RankOutcome, Request, Stack};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_dispatch(request: &Request, verbose: &DispatchVerbose, color: bool) {
    let palette = ansi::Palette::new(color);
    let message = request.stack().raw_text().map(|t| format!("\"{t}\"")).unwrap_or_else(|| "(no text)".to_string());
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Dispatching: {message}"), ansi::CYAN)));
    println!("  {} {}", palette.dim("stack:"), palette.paint(format!("[{}]", request.stack()), ansi::BLUE));

    println!("\n{}", palette.paint("━━━ Triggers ━━━", ansi::GRAY));
    let winner = verbose.result.as_ref().ok().map(|s| s.index);
    for (idx, report) in verbose.details.triggers.iter().enumerate() {
        let marker = if winner == Some(idx) { palette.paint("★", ansi::GREEN) } else { " ".to_string() };
        println!(
            "  {} {} {} {}  {}  {}",
            marker,
            palette.paint(format!("[{idx}]"), ansi::GRAY),
            palette.bold(&report.name),
            palette.dim(format!("({})", report.variant)),
            fmt_outcome(&report.outcome, &palette),
            palette.dim(format!("{:?}", report.duration)),
        );
    }
    if verbose.details.triggers.is_empty() {
        println!("{}", palette.dim("  No triggers registered"));
    }

    println!("\n{}", palette.paint("━━━ Result ━━━", ansi::GRAY));
    match &verbose.result {
        Ok(selection) => {
            println!(
                "  {} {}  {} {}",
                palette.dim("trigger:"),
                palette.bold(palette.paint(&selection.trigger, ansi::GREEN)),
                palette.dim("score:"),
                palette.paint(selection.score.to_string(), ansi::YELLOW),
            );
            if let Some(choice) = &selection.chosen {
                println!("  {} {}", palette.dim("chosen:"), palette.paint(&choice.slug, ansi::CYAN));
            }
        }
        Err(MatchError::NoTriggerMatched) => {
            println!("{}", palette.paint("  No trigger matched", ansi::YELLOW));
            println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
            println!("  • The message has none of the layers the triggers look at");
            println!("  • No choices were offered for a Choice trigger");
            println!("  • A trigger failed (see the faults above)");
        }
        Err(err) => println!("  {}", palette.paint(err.to_string(), ansi::RED)),
    }

    let metrics = &verbose.details.metrics;
    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Ranking: {}  │  Patch: {}",
        palette.paint(format!("{:?}", metrics.total), ansi::GREEN),
        palette.paint(format!("{:?}", metrics.ranking), ansi::CYAN),
        palette.dim(format!("{:?}", metrics.patch)),
    );
    println!();
}

pub fn print_accept(patterns: &PatternSet, stack: &Stack, result: &Result<String, MatchError>, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Accepting: [{stack}]"), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Patterns ━━━", ansi::GRAY));
    let kinds = stack.kinds();
    for name in patterns.names() {
        let Some(pattern) = patterns.get(name) else {
            continue;
        };
        let hit = if pattern.matches(&kinds) {
            palette.paint("✓", ansi::GREEN)
        } else {
            palette.dim("✗")
        };
        println!("  {} {} {}", hit, palette.paint(name, ansi::BLUE), palette.dim(pattern.to_string()));
    }

    println!("\n{}", palette.paint("━━━ Result ━━━", ansi::GRAY));
    match result {
        Ok(name) => println!("  {} {}", palette.dim("pattern:"), palette.bold(palette.paint(name, ansi::GREEN))),
        Err(err) => println!("  {}", palette.paint(err.to_string(), ansi::YELLOW)),
    }
    println!();
}

fn fmt_outcome(outcome: &RankOutcome, palette: &ansi::Palette) -> String {
    match outcome {
        RankOutcome::Scored(score) => palette.paint(format!("score {score}"), ansi::GREEN),
        RankOutcome::NoOpinion => palette.dim("no opinion"),
        RankOutcome::Skipped => palette.dim("skipped (no layer of interest)"),
        RankOutcome::Fault(err) => palette.paint(format!("fault: {err}"), ansi::RED),
    }
}
