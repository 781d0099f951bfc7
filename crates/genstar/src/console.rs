//! Colorful console output for generation runs.
//!
//! Provides a custom `tracing` layer that formats pipeline events with colors.
//! Initialized on the first file driven generation when the `console`
//! feature is enabled.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();

const TARGET: &str = "genstar_generator";

/// Initializes the console output.
///
/// Safe to call multiple times - only the first call has effect. Does
/// nothing when another global subscriber is already installed.
pub fn init() {
    INIT.get_or_init(|| {
        print_banner();

        let filter = match format!("{TARGET}=info").parse::<Directive>() {
            Ok(directive) => EnvFilter::builder()
                .with_default_directive(directive)
                .from_env_lossy(),
            Err(_) => EnvFilter::from_default_env(),
        };

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(GenerationConsoleLayer)
            .try_init();
    });
}

fn print_banner() {
    let banner = r#"
  ____                _
 / ___| ___ _ __  ___| |_ __ _ _ __
| |  _ / _ \ '_ \/ __| __/ _` | '__|
| |_| |  __/ | | \__ \ || (_| | |
 \____|\___|_| |_|___/\__\__,_|_|
"#;

    let version_line = format!(
        "        v{} - Synthetic Population Generator\n",
        env!("CARGO_PKG_VERSION")
    );

    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", banner.bright_cyan());
    let _ = writeln!(stdout, "{}", version_line.bright_white().bold());
    let _ = stdout.flush();
}

/// A tracing layer that formats generation events with colors.
pub struct GenerationConsoleLayer;

impl<S: Subscriber> Layer<S> for GenerationConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with(TARGET) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor);
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    event: Option<String>,
    algorithm: Option<String>,
    name: Option<String>,
    engine: Option<String>,
    crs: Option<String>,
    requested: Option<i64>,
    entities: Option<u64>,
    located: Option<u64>,
    dropped: Option<u64>,
    networks: Option<u64>,
    nodes: Option<u64>,
    edges: Option<u64>,
    duration_ms: Option<u64>,
    spatialized: Option<bool>,
    social: Option<bool>,
}

impl EventVisitor {
    fn set_text(&mut self, field: &Field, value: String) {
        match field.name() {
            "event" => self.event = Some(value),
            "algorithm" => self.algorithm = Some(value),
            "name" => self.name = Some(value),
            "engine" => self.engine = Some(value),
            "crs" => self.crs = Some(value),
            _ => {}
        }
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        self.set_text(field, s.trim_matches('"').to_string());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.set_text(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "entities" => self.entities = Some(value),
            "located" => self.located = Some(value),
            "dropped" => self.dropped = Some(value),
            "networks" => self.networks = Some(value),
            "nodes" => self.nodes = Some(value),
            "edges" => self.edges = Some(value),
            "duration_ms" => self.duration_ms = Some(value),
            "requested" => self.requested = Some(value as i64),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        match field.name() {
            "requested" => self.requested = Some(value),
            _ => self.record_u64(field, value.max(0) as u64),
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            "spatialized" => self.spatialized = Some(value),
            "social" => self.social = Some(value),
            _ => {}
        }
    }
}

fn format_event(v: &EventVisitor) -> String {
    match v.event.as_deref().unwrap_or("") {
        "generation_start" => format_generation_start(v),
        "synthesis_end" => format_synthesis_end(v),
        "spatialization_end" => format_spatialization_end(v),
        "network_attached" => format_network_attached(v),
        "generation_end" => format_generation_end(v),
        _ => String::new(),
    }
}

fn prefix(stage: &str) -> String {
    format!(
        "{} {} {}",
        timestamp().bright_black(),
        "INFO".bright_green(),
        format!("[{}]", stage).bright_cyan()
    )
}

fn format_generation_start(v: &EventVisitor) -> String {
    let requested = match v.requested {
        Some(n) if n > 0 => n.to_formatted_string(&Locale::en),
        _ => "from inputs".to_string(),
    };
    let mut stages = vec!["synthesis"];
    if v.spatialized.unwrap_or(false) {
        stages.push("spatialization");
    }
    if v.social.unwrap_or(false) {
        stages.push("socialization");
    }

    format!(
        "{} {} started: requested size ({}), stages ({})",
        prefix("Generator"),
        v.algorithm.as_deref().unwrap_or("unknown").white().bold(),
        requested.bright_yellow(),
        stages.join(" -> ").bright_magenta()
    )
}

fn format_synthesis_end(v: &EventVisitor) -> String {
    format!(
        "{} {} entities synthesized in {}",
        prefix("Synthesis"),
        count(v.entities).bright_yellow(),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow()
    )
}

fn format_spatialization_end(v: &EventVisitor) -> String {
    let dropped = v.dropped.unwrap_or(0);
    let dropped_text = count(v.dropped);
    let dropped_colored = if dropped > 0 {
        dropped_text.bright_red().to_string()
    } else {
        dropped_text.white().to_string()
    };
    format!(
        "{} {} entities located, {} dropped, crs ({})",
        prefix("Spatialization"),
        count(v.located).bright_yellow(),
        dropped_colored,
        v.crs.as_deref().unwrap_or("none").white()
    )
}

fn format_network_attached(v: &EventVisitor) -> String {
    format!(
        "    {} {} ({}) {} nodes, {} edges",
        "->".bright_blue(),
        v.name.as_deref().unwrap_or("?").white().bold(),
        v.engine.as_deref().unwrap_or("?").bright_magenta(),
        count(v.nodes).white(),
        count(v.edges).white()
    )
}

fn format_generation_end(v: &EventVisitor) -> String {
    let mut output = format!(
        "{} Generation ended: time spent ({})",
        prefix("Generator"),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow()
    );

    output.push_str("\n\n");
    output.push_str(&"╔══════════════════════════════════════════════════════════╗".bright_cyan().to_string());
    output.push('\n');
    for (label, value) in [
        ("Entities:", count(v.entities)),
        ("Dropped:", count(v.dropped)),
        ("Networks:", count(v.networks)),
    ] {
        output.push_str(&format!(
            "{}  {:<18}{:>36}  {}",
            "║".bright_cyan(),
            label,
            value,
            "║".bright_cyan()
        ));
        output.push('\n');
    }
    output.push_str(&"╚══════════════════════════════════════════════════════════╝".bright_cyan().to_string());
    output.push('\n');

    output
}

fn count(value: Option<u64>) -> String {
    value.unwrap_or(0).to_formatted_string(&Locale::en)
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| {
            let secs = d.as_secs() % 100000;
            let millis = d.subsec_millis();
            format!("{:5}.{:03}", secs, millis)
        })
        .unwrap_or_else(|_| "    0.000".to_string())
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}
