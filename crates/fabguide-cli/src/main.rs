use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fabguide_catalog::{Catalog, RecordSink};
use fabguide_core::{group_by_scope, DeviceId, GuideId, InquiryId, PrioritizedSequence};
use fabguide_notify::TracingNotifier;
use fabguide_session::scenario::{load_expected, play, verify};
use fabguide_session::{load_fixture, Backend, Config};

#[derive(Parser)]
#[command(name = "fabguide", version)]
struct Cli {
    /// Directory holding .fabguide/ (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create .fabguide/ with a default config and an empty catalog
    Init {
        #[arg(long, default_value = "u1")]
        technician: String,
    },

    /// Load a YAML catalog fixture into the configured backend
    Seed { fixture: PathBuf },

    /// List the devices the configured technician may work on
    Devices {
        /// Include devices the technician is not assigned to
        #[arg(long)]
        all: bool,
    },

    /// Fault guides of a device, ranked and grouped by scope
    Guides {
        device: String,
        /// Match fault code, category or scope
        #[arg(long)]
        query: Option<String>,
    },

    /// Steps of a guide in execution order
    Steps { guide: String },

    /// Repair history of a guide, newest first
    History { guide: String },

    /// The configured technician's open repair record
    Open,

    /// Inquiries raised against a guide
    Inquiries { guide: String },

    /// Mark an inquiry resolved
    ResolveInquiry { id: String },

    /// Replay a scripted session directory (script.yaml, optional expected.yaml)
    Play { dir: PathBuf },
}

fn open(root: &Path) -> anyhow::Result<(Config, Backend)> {
    let cfg = Config::load_or_init(root, "u1")?;
    let backend = Backend::open(&cfg, root)?.with_notifier(TracingNotifier);
    Ok((cfg, backend))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };

    match cli.cmd {
        Command::Init { technician } => {
            let cfg = Config::load_or_init(&root, &technician)?;
            Backend::open(&cfg, &root)?;
            println!("Initialized fabguide in {} for technician {}", root.display(), cfg.technician.id);
        }
        Command::Seed { fixture } => {
            let (_, backend) = open(&root)?;
            tracing::info!(fixture = %fixture.display(), "seeding catalog");
            let summary = backend.seed(&load_fixture(&fixture)?)?;
            println!(
                "Seeded {} technicians, {} devices, {} guides, {} records, {} inquiries",
                summary.technicians, summary.devices, summary.guides, summary.records, summary.inquiries
            );
        }
        Command::Devices { all } => {
            let (cfg, backend) = open(&root)?;
            let devices = if all {
                backend.catalog.list_devices()?
            } else {
                let technician = backend
                    .catalog
                    .find_technician(&cfg.engineer_id())?
                    .ok_or_else(|| anyhow!("technician {} is not in the catalog", cfg.technician.id))?;
                backend.catalog.list_authorized_devices(&technician)?
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else {
                for d in devices {
                    println!("- {} {} {} [{:?}] sn={}", d.id, d.device_type, d.model, d.status, d.serial_number);
                }
            }
        }
        Command::Guides { device, query } => {
            let (_, backend) = open(&root)?;
            let guides = backend.catalog.list_guides(&DeviceId::from_str(device), query.as_deref())?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&guides)?);
            } else {
                for (scope, members) in group_by_scope(&guides) {
                    println!("{scope}");
                    for g in members {
                        let availability = if g.published { "published" } else { "draft" };
                        let count = g.total_occurrence_count.map(|c| c.to_string()).unwrap_or_else(|| "-".into());
                        println!("  - {} {} {} [{availability}] seen {count}x", g.id, g.fault_code, g.fault_category);
                    }
                }
            }
        }
        Command::Steps { guide } => {
            let (_, backend) = open(&root)?;
            let guide = backend
                .catalog
                .find_guide(&GuideId::from_str(guide.as_str()))?
                .ok_or_else(|| anyhow!("guide {guide} not found"))?;
            let sequence = PrioritizedSequence::for_guide(&guide);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&sequence)?);
            } else {
                println!("{} v{} fingerprint {}", guide.id, guide.version, sequence.fingerprint);
                for (i, s) in sequence.steps.iter().enumerate() {
                    let count = s.history_repair_count.map(|c| c.to_string()).unwrap_or_else(|| "-".into());
                    println!("{:>2}. {} [{}] {} (repairs {count})", i + 1, s.id, s.stage.label(), s.title);
                }
            }
        }
        Command::History { guide } => {
            let (_, backend) = open(&root)?;
            let records = backend.catalog.list_history(&GuideId::from_str(guide))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for r in records {
                    println!(
                        "- {} by {} [{:?}] {} steps: {}",
                        r.id,
                        r.engineer_id,
                        r.status,
                        r.completed_steps.len(),
                        r.treatment
                    );
                }
            }
        }
        Command::Open => {
            let (cfg, backend) = open(&root)?;
            match backend.catalog.list_open_record(&cfg.engineer_id())? {
                Some(r) if cli.json => println!("{}", serde_json::to_string_pretty(&r)?),
                Some(r) => println!("{} on guide {}: {} steps done", r.id, r.guide_id, r.completed_steps.len()),
                None => println!("No open record for {}", cfg.technician.id),
            }
        }
        Command::Inquiries { guide } => {
            let (_, backend) = open(&root)?;
            let inquiries = backend.catalog.list_inquiries(&GuideId::from_str(guide))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&inquiries)?);
            } else {
                for i in inquiries {
                    println!("- {} [{:?}] step {}: {}", i.id, i.status, i.step_id, i.question);
                }
            }
        }
        Command::ResolveInquiry { id } => {
            let (_, backend) = open(&root)?;
            let inquiry = backend.sink.resolve_inquiry(&InquiryId::from_str(id))?;
            println!("Resolved inquiry {}", inquiry.id);
        }
        Command::Play { dir } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("start async runtime")?;
            let result = runtime.block_on(play(&dir))?;
            println!("Scenario {} ended {}", result.scenario_id, result.final_state);
            for e in &result.errors {
                println!("  rejected: {e}");
            }
            if let Some(r) = &result.record {
                println!("  record {}: {} steps", r.id, r.completed_steps.len());
            }
            println!("  inquiries: {}, notices: {}", result.inquiries.len(), result.notices);
            if dir.join("expected.yaml").exists() {
                verify(&result, &load_expected(&dir)?)?;
                println!("OK");
            }
        }
    }

    Ok(())
}
