mod config;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use clap::Parser;
use log::{LevelFilter, info, warn};
use rxdial_engine::display::{SignalMeter, Waterfall};
use rxdial_engine::freqlist::FrequencyList;
use rxdial_engine::sim::SimulatedFrontEnd;
use rxdial_engine::{Engine, SpectrumMailbox};
use rxdial_messages::{Command, Event, Hertz, Mode};

use config::{AppConfig, default_config_path};

/// Waterfall lines kept for display.
const WATERFALL_LINES: usize = 64;
const WATERFALL_WIDTH: usize = 64;

#[derive(Debug, Parser)]
#[command(version, about = "Software-defined radio receiver")]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Dial frequency, e.g. 7.074M or 10000000
    #[arg(long = "freq", short = 'f')]
    freq: Option<String>,
    /// Demodulation mode (AM, FM, WFM, USB, LSB, CW_USB, CW_LSB)
    #[arg(long = "mode", short = 'm')]
    mode: Option<String>,
    /// CSV or ODS frequency list
    #[arg(long = "freq-list", value_name = "FILE")]
    freq_list: Option<PathBuf>,
    /// Tune to the first frequency-list row with a matching field
    #[arg(long = "bookmark", short = 'b')]
    bookmark: Option<String>,
    /// How long to receive
    #[arg(long = "seconds", short = 's', default_value_t = 10)]
    seconds: u64,
    /// Do not write the configuration back on exit
    #[arg(long = "no-save")]
    no_save: bool,
}

fn init_logging() {
    env_logger::builder()
        .format(|buf, record| {
            writeln!(
                buf,
                "{:<5} - {} - {}",
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .filter_module("rxdial_engine", LevelFilter::Info)
        .filter_module("rustradio", LevelFilter::Warn)
        .parse_default_env()
        .init();
}

/// Command line settings win over the stored ones.
///
/// Without a configured list, bookmarks come from the first `*.ods`, else
/// `*.csv`, found in `list_dir`.
fn apply_cli(cli: &Cli, config: &mut AppConfig, list_dir: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = &cli.freq_list {
        config.freq_list = Some(path.clone());
    }
    if let Some(name) = &cli.bookmark {
        let path = config
            .freq_list
            .clone()
            .or_else(|| list_dir.and_then(FrequencyList::detect))
            .ok_or_else(|| anyhow!("--bookmark needs a frequency list (--freq-list)"))?;
        let list = FrequencyList::load(&path)?;
        let bookmark = list
            .find(name)
            .ok_or_else(|| anyhow!("no bookmark named {name:?} in {}", path.display()))?;
        bookmark.apply(&mut config.tuner);
        info!("Bookmark {name}: {} {}", bookmark.frequency, bookmark.mode_label);
    }
    if let Some(freq) = &cli.freq {
        config.tuner.base_frequency =
            Hertz::parse_human(freq).ok_or_else(|| anyhow!("bad frequency {freq:?}"))?;
    }
    if let Some(mode) = &cli.mode {
        config.tuner.mode = Mode::from_label(mode).ok_or_else(|| anyhow!("unknown mode {mode:?}"))?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(default_config_path)
        .context("no configuration directory, pass --config")?;
    let mut config = AppConfig::load(&config_path)?;
    apply_cli(&cli, &mut config, config_path.parent())?;

    let (cmd_tx, cmd_rx) = flume::unbounded();
    let (event_tx, event_rx) = flume::unbounded();
    let mailbox = SpectrumMailbox::new();

    let front_end = if config.receiver.device == "sim" {
        SimulatedFrontEnd::new()
    } else {
        warn!("No driver for device {:?}", config.receiver.device);
        SimulatedFrontEnd::absent()
    };

    // Spawn engine thread
    let engine_mailbox = mailbox.clone();
    let engine_handle = std::thread::spawn(move || {
        Engine::simulated(cmd_rx, event_tx, front_end, engine_mailbox).run()
    });

    cmd_tx.send(Command::Start {
        tuner: config.tuner.clone(),
        settings: config.receiver.clone(),
    })?;

    let mut waterfall = Waterfall::new(WATERFALL_LINES, &config.receiver);
    let mut meter = SignalMeter::default();
    let frame_period = Duration::from_secs_f64(1.0 / f64::from(config.receiver.frame_rate.max(1)));
    let deadline = Instant::now() + Duration::from_secs(cli.seconds);

    while Instant::now() < deadline {
        for event in event_rx.try_iter() {
            match event {
                Event::Status(status) => info!("{status}"),
                Event::Error { title, message } => warn!("{title}: {message}"),
                Event::StateSnapshot(_) => {}
            }
        }
        if let Some(frame) = mailbox.take() {
            waterfall.insert_spectrum_line(&frame);
            let level = meter.update(&frame);
            if let Some(row) = waterfall.text_row(WATERFALL_WIDTH) {
                println!("|{row}| {level}");
            }
        }
        std::thread::sleep(frame_period);
    }

    if mailbox.discarded() > 0 {
        info!("{} spectrum frames were not displayed", mailbox.discarded());
    }

    let _ = cmd_tx.send(Command::Shutdown);
    engine_handle
        .join()
        .map_err(|_| anyhow!("Engine thread panicked"))??;

    if !cli.no_save {
        config.save(&config_path)?;
        info!("Saved configuration to {}", config_path.display());
    }
    Ok(())
}
