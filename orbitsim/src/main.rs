use orbitsim::{ScenarioConfig, Scenario, Body, Trajectories};
use orbitsim::{DirectoryStore, load_history, load_states, store_history, store_states};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Run an N-body scenario and emit sampled trajectories as JSON")]
struct Args {
    /// Scenario file, looked up under `scenarios/` unless it exists as given
    #[arg(short, default_value = "earth_moon.yaml")]
    file_name: String,

    /// Directory holding one `<body>.json` timeline and live state per body
    #[arg(long)]
    store: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    bodies: &'a [Body],
    trajectories: &'a Trajectories,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let direct = PathBuf::from(file_name);
    let config_path = if direct.is_file() {
        direct
    } else {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
    };
    let file = File::open(&config_path)
        .with_context(|| format!("opening scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("parsing scenario {}", config_path.display()))?;
    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let mut scenario = Scenario::build_scenario(scenario_cfg)?;

    let mut store = args
        .store
        .as_ref()
        .map(|dir| DirectoryStore::open(dir.clone()))
        .transpose()
        .context("opening timeline store")?;

    let history = match store.as_ref() {
        Some(s) => {
            let names = scenario.system.bodies.iter().map(|b| b.name.as_str());
            let history = load_history(s, names.clone()).context("loading history")?;
            let states = load_states(s, names).context("loading live states")?;
            scenario.restore_states(&states)?;
            history
        }
        None => Trajectories::new(),
    };

    let trajectories = scenario.execute(history)?;
    log::info!(
        "simulation finished at t = {} s, {} bodies",
        scenario.system.t,
        scenario.system.bodies.len()
    );

    if let Some(s) = store.as_mut() {
        if scenario.parameters.persist_result {
            store_history(s, &trajectories).context("storing timelines")?;
            store_states(s, &scenario.system).context("storing live states")?;
            log::info!("timelines stored in {}", s.root().display());
        }
    }

    let report = Report {
        bodies: &scenario.system.bodies,
        trajectories: &trajectories,
    };
    match args.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &report)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer(&mut writer, &report)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
