//! `reskin` command line: page simulation, schedule listing and store migration

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use reskin_dom::{render_card, CardSpec, PageBuilder, PageLayout};
use reskin_engine::keys::{CourseSchedules, CourseSchedulesSchemaVersion};
use reskin_engine::schedule::{migrate, weekly_view, ScheduleSaver, CURRENT_SCHEMA_VERSION};
use reskin_engine::{Engine, EngineConfig, SystemClock, Unattended, ViewMode};
use reskin_store::{ChangeHub, JsonFileBackend, MemoryBackend, PersistedStore, Record, StoreArea, StoreKey};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn cli() -> Command {
    let store_arg = Arg::new("store")
        .long("store")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("JSON store file");

    Command::new("reskin")
        .version(reskin_engine::VERSION)
        .about("Course listing reskin engine")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Engine configuration (TOML)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More logging; RESKIN_LOG overrides"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("simulate")
                .about("Run the engine against a synthetic page under host mutation bursts")
                .arg(
                    Arg::new("cards")
                        .long("cards")
                        .default_value("12")
                        .value_parser(value_parser!(usize))
                        .help("Cards on the page"),
                )
                .arg(
                    Arg::new("bursts")
                        .long("bursts")
                        .default_value("5")
                        .value_parser(value_parser!(usize))
                        .help("Frames with host mutations"),
                )
                .arg(
                    Arg::new("burst-size")
                        .long("burst-size")
                        .default_value("20")
                        .value_parser(value_parser!(usize))
                        .help("Host mutations per frame"),
                )
                .arg(
                    Arg::new("view")
                        .long("view")
                        .default_value("grid")
                        .value_parser(["grid", "list", "original", "carousel"])
                        .help("View mode to render"),
                ),
        )
        .subcommand(
            Command::new("schedule")
                .about("Print the weekly schedule held in a store file")
                .arg(store_arg.clone()),
        )
        .subcommand(
            Command::new("migrate")
                .about("Migrate the schedules in a store file to the current schema")
                .arg(store_arg)
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Report without writing"),
                ),
        )
}

fn init_tracing(verbosity: u8) -> anyhow::Result<()> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("RESKIN_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<EngineConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn file_store(path: &Path) -> PersistedStore {
    let hub = ChangeHub::new();
    let local = Arc::new(JsonFileBackend::new(StoreArea::Local, path, hub.clone()));
    let sync = Arc::new(MemoryBackend::new(StoreArea::Sync, hub.clone()));
    PersistedStore::new(local, sync, hub)
}

async fn stored_schedules(store: &PersistedStore) -> (Value, u32) {
    let mut defaults = Record::new();
    defaults.insert(CourseSchedules::NAME.to_string(), Value::Null);
    defaults.insert(CourseSchedulesSchemaVersion::NAME.to_string(), Value::Null);
    let mut raw = store.get(defaults).await;
    let version = PersistedStore::decode::<CourseSchedulesSchemaVersion>(raw.get(CourseSchedulesSchemaVersion::NAME));
    let schedules = raw.remove(CourseSchedules::NAME).unwrap_or(Value::Null);
    (schedules, version)
}

async fn simulate(config: EngineConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let cards = args.get_one::<usize>("cards").copied().unwrap_or(12);
    let bursts = args.get_one::<usize>("bursts").copied().unwrap_or(5);
    let burst_size = args.get_one::<usize>("burst-size").copied().unwrap_or(20);
    let view: ViewMode = serde_json::from_value(Value::String(
        args.get_one::<String>("view").cloned().unwrap_or_else(|| "grid".into()),
    ))?;

    let store = PersistedStore::in_memory();
    store.save::<reskin_engine::keys::ViewModeKey>(&view).await;
    let engine = Engine::start(config, store, Arc::new(SystemClock), Arc::new(Unattended)).await?;

    let semesters = ["א", "ב", "קיץ"];
    let mut page = PageBuilder::new(PageLayout::Frontpage)
        .cards((0..cards).map(|i| {
            CardSpec::new((1000 + i).to_string(), format!("Course {i}"))
                .with_text(format!("תשפ\"{} סמסטר {}", ["ד", "ה"][i % 2], semesters[i % 3]))
        }))
        .build()?;
    let container = page.container.context("front page without a course list")?;

    let first = engine.attach(&mut page.doc, &page.url).await.unwrap_or_default();
    println!("initial pass: {} cards in {} grids", first.cards, first.grids);

    for burst in 0..bursts {
        for n in 0..burst_size {
            let card = render_card(
                &mut page.doc,
                &CardSpec::new((5000 + burst * burst_size + n).to_string(), format!("Late course {burst}.{n}")),
                "div",
                "coursebox",
            )?;
            page.doc.append_child(container, card)?;
        }
        let pass = engine.tick(&mut page.doc);
        let idle = engine.tick(&mut page.doc);
        println!(
            "burst {burst}: {burst_size} host mutations -> {} pass(es), follow-up {}",
            u8::from(pass.is_some()),
            if idle.is_some() { "ran" } else { "none" },
        );
    }

    let stats = engine.stats();
    println!();
    println!("passes:                 {}", stats.passes);
    println!("host records:           {}", stats.host_records);
    println!("engine records ignored: {}", stats.dropped_engine_records);
    println!("listeners:              {}", page.doc.listener_count());
    Ok(())
}

async fn print_schedule(args: &ArgMatches) -> anyhow::Result<()> {
    let path = args.get_one::<PathBuf>("store").context("--store is required")?;
    let (raw, version) = stored_schedules(&file_store(path)).await;
    let book = migrate(&raw, version).book;
    if book.is_empty() {
        println!("no schedules in {}", path.display());
        return Ok(());
    }
    for column in weekly_view(&book) {
        println!("{}", column.day.display_name());
        if column.slots.is_empty() {
            println!("  -");
        }
        for slot in &column.slots {
            match slot.time_label() {
                Some(label) => println!("  {label}  {}", slot.name),
                None => println!("  {}", slot.name),
            }
        }
    }
    Ok(())
}

async fn run_migration(config: &EngineConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let path = args.get_one::<PathBuf>("store").context("--store is required")?;
    let store = file_store(path);
    let (raw, version) = stored_schedules(&store).await;
    let migration = migrate(&raw, version);
    println!(
        "schema v{version} -> v{CURRENT_SCHEMA_VERSION}: {} courses, {}",
        migration.book.len(),
        if migration.changed { "data changed" } else { "data unchanged" }
    );
    if !migration.needs_persist {
        println!("nothing to write");
    } else if args.get_flag("dry-run") {
        println!("dry run, not writing");
    } else {
        ScheduleSaver::new(store, config.save_retry()).save(migration.book).await;
        println!("written to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"))?;
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("simulate", args)) => simulate(config, args).await,
        Some(("schedule", args)) => print_schedule(args).await,
        Some(("migrate", args)) => run_migration(&config, args).await,
        _ => Ok(()),
    }
}
