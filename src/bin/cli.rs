//! Binary entry point for the nodebridge administrative CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use nodebridge::cache::{CacheKey, NodeCache, Snapshot};
use nodebridge::config::ServiceConfig;
use nodebridge::external::SubprocessRenderer;
use nodebridge::model::ParsedNode;
use nodebridge::planner::{plan_tasks, PlannerConfig};
use nodebridge::verify::{VerificationLoop, VerifyConfig};

#[path = "cli/ui.rs"]
mod ui;

use ui::{Theme as UiTheme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "nodebridge",
    version,
    about = "Administrative CLI for the nodebridge cache and verification core",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(long, global = true, help = "Path to a TOML config file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = ThemeArg::Auto,
        help = "Color theme for text output"
    )]
    theme: ThemeArg,

    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Reduce decorative output and color usage"
    )]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand, about = "Inspect or mutate the node cache")]
    Cache(CacheCommand),

    #[command(about = "Dry-run the task planner against a JSON node fixture")]
    Plan {
        #[arg(value_name = "FIXTURE", help = "Path to a JSON-encoded ParsedNode tree")]
        fixture: PathBuf,

        #[arg(long, default_value_t = 6, help = "Maximum tree depth to plan over")]
        depth: u32,

        #[arg(long, help = "Cap the number of tasks returned")]
        max_tasks: Option<u32>,
    },

    #[command(about = "Run the visual verification loop once against a reference image")]
    Verify {
        #[arg(value_name = "REFERENCE_PNG", help = "Path to the reference screenshot")]
        reference: PathBuf,

        #[arg(value_name = "MARKUP_HTML", help = "Path to the candidate HTML/CSS markup")]
        markup: PathBuf,

        #[arg(long, help = "Renderer binary invoked as `<binary> <width>x<height>`")]
        renderer: PathBuf,

        #[arg(long, default_value_t = 0.99, help = "Acceptance threshold for human_ssim")]
        target_score: f32,

        #[arg(long, default_value_t = 5, help = "Maximum correction iterations")]
        max_iterations: u32,

        #[arg(long, help = "Directory to persist each iteration's html/png for inspection")]
        run_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    #[command(about = "Print cache hit-rate, tier occupancy, and learned prefetch patterns")]
    Stats,

    #[command(about = "Evict a file (or a single node within it) from both cache tiers")]
    Invalidate {
        #[arg(value_name = "FILE_KEY")]
        file_key: String,

        #[arg(long, help = "Evict only this node id instead of the whole file")]
        node: Option<String>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ThemeArg {
    Auto,
    Light,
    Dark,
    Plain,
}

impl From<ThemeArg> for UiTheme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Auto => UiTheme::Auto,
            ThemeArg::Light => UiTheme::Light,
            ThemeArg::Dark => UiTheme::Dark,
            ThemeArg::Plain => UiTheme::Plain,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let ui = Ui::new(cli.theme.into(), cli.quiet);
    let config = match &cli.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };

    match cli.command {
        Command::Cache(CacheCommand::Stats) => {
            let cache = open_cache(&config)?;
            let snapshot = cache.stats();
            emit(&cli.format, &ui, &snapshot, print_stats_text)?;
        }
        Command::Cache(CacheCommand::Invalidate { file_key, node }) => {
            let cache = open_cache(&config)?;
            match node {
                Some(node_id) => {
                    let key = CacheKey::new("node", &[file_key.as_str(), node_id.as_str()]);
                    cache.invalidate(key)?;
                    ui.success(&format!("invalidated {file_key}/{node_id}"));
                }
                None => {
                    let removed = cache.invalidate_file(&file_key)?;
                    ui.success(&format!("invalidated {removed} entries for {file_key}"));
                }
            }
        }
        Command::Plan { fixture, depth, max_tasks } => {
            let root = load_fixture(&fixture)?;
            let planner_config = PlannerConfig { max_depth: depth, max_tasks };
            let response = plan_tasks(&root, &planner_config);
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan_to_json(&response))?),
                OutputFormat::Text => print_plan_text(&ui, &response),
            }
        }
        Command::Verify { reference, markup, renderer, target_score, max_iterations, run_dir } => {
            let reference_png = std::fs::read(&reference)?;
            let markup_html = std::fs::read_to_string(&markup)?;
            let render_timeout = config.http_timeout;
            let mut loop_runner = VerificationLoop::new(SubprocessRenderer::new(renderer, render_timeout));
            if let Some(dir) = run_dir {
                loop_runner = loop_runner.with_run_dir(dir);
            }
            let verify_config = VerifyConfig {
                target_score,
                max_iterations,
                viewport: config.default_viewport,
            };
            let result = loop_runner.run(&reference_png, markup_html, &verify_config).await;
            let passed = result.passed;
            emit(&cli.format, &ui, &result, print_verify_text)?;
            if !passed {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

fn open_cache(config: &ServiceConfig) -> Result<NodeCache, Box<dyn Error>> {
    Ok(NodeCache::open(&config.cache_dir, config.max_l1_entries, config.l2_max_bytes, config.default_ttl_hours)?)
}

fn load_fixture(path: &std::path::Path) -> Result<ParsedNode, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn emit<T, F>(format: &OutputFormat, ui: &Ui, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize,
    F: Fn(&Ui, &T),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(ui, value),
    }
    Ok(())
}

fn print_stats_text(ui: &Ui, snapshot: &Snapshot) {
    ui.section(
        "cache",
        [
            ("l1 entries", snapshot.l1_entries.to_string()),
            ("l2 entries", snapshot.l2_entries.to_string()),
            ("l2 bytes", snapshot.l2_bytes.to_string()),
            ("l1 hits", snapshot.l1_hits.to_string()),
            ("l2 hits", snapshot.l2_hits.to_string()),
            ("misses", snapshot.misses.to_string()),
            ("hit rate", format!("{:.1}%", snapshot.hit_rate * 100.0)),
            ("evictions", snapshot.evictions.to_string()),
            ("invalidations", snapshot.invalidations.to_string()),
            ("learned patterns", snapshot.pattern_count.to_string()),
        ],
    );
    ui.list(
        "top prefetch patterns",
        snapshot
            .top_patterns
            .iter()
            .map(|p| format!("{} -> [{}]", p.from, p.to.join(", "))),
    );
}

fn plan_to_json(response: &nodebridge::codec::messages::PlanTasksResponse) -> serde_json::Value {
    serde_json::json!({
        "root_node_id": response.root_node_id,
        "total_estimated_tokens": response.total_estimated_tokens,
        "summary": response.summary,
        "tasks": response.tasks.iter().map(|t| serde_json::json!({
            "id": t.id,
            "node_id": t.node_id,
            "node_name": t.node_name,
            "node_type": t.node_type,
            "priority": format!("{:?}", t.priority),
            "dependencies": t.dependencies,
            "estimated_tokens": t.estimated_tokens,
            "semantic_dsl": t.semantic_dsl,
            "hints": t.hints,
        })).collect::<Vec<_>>(),
    })
}

fn print_plan_text(ui: &Ui, response: &nodebridge::codec::messages::PlanTasksResponse) {
    ui.section(
        "plan",
        [
            ("root", response.root_node_id.clone()),
            ("tasks", response.tasks.len().to_string()),
            ("total tokens", response.total_estimated_tokens.to_string()),
        ],
    );
    ui.list(
        "tasks",
        response.tasks.iter().map(|t| {
            format!(
                "[{:?}] {} ({}) ~{} tokens, deps: {}",
                t.priority,
                t.id,
                t.node_name,
                t.estimated_tokens,
                if t.dependencies.is_empty() { "none".to_string() } else { t.dependencies.join(", ") }
            )
        }),
    );
}

fn print_verify_text(ui: &Ui, result: &nodebridge::verify::VerificationResult) {
    ui.section(
        "verification",
        [
            ("passed", result.passed.to_string()),
            ("iterations", result.iterations.to_string()),
            ("corrections applied", result.corrections_applied.len().to_string()),
        ],
    );
    ui.list(
        "trace",
        result
            .trace
            .iter()
            .map(|record| format!("step {}: human_ssim={:.4}", record.step, record.human_ssim)),
    );
    if result.passed {
        ui.success("verification converged");
    } else {
        ui.warn("verification did not converge within the iteration budget");
    }
}
