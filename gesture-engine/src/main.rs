//! Gesture Engine - command-line front end
//!
//! Manages the gesture bank and classifiers stored under the data directory
//! and runs recordings and classifications from path files.

use gesture_engine::app::cli::{Cli, Commands, ConfigAction, GestureAction, NetAction};
use gesture_engine::app::config::Config;
use gesture_engine::time::timebase::Clock;
use gesture_engine::{Classification, EngineEvent, JsonStore, PathSample, RecognitionEngine};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    Clock::init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    match &cli.command {
        Commands::Init { force } => run_init(&cli, *force, &config),
        Commands::Gesture { action } => run_gesture(&cli, action, &config),
        Commands::Record { gesture, input } => run_record(&cli, gesture, input, &config),
        Commands::Net { action } => run_net(&cli, action, &config),
        Commands::Classify { net, input } => run_classify(&cli, net.as_deref(), input, &config),
        Commands::Config { action } => run_config(&cli, action, &config),
    }
}

fn open_engine(cli: &Cli, config: &Config) -> anyhow::Result<RecognitionEngine> {
    let data_dir = cli.data_dir(config);
    info!(data_dir = %data_dir.display(), "Opening gesture store");
    Ok(RecognitionEngine::open(config.clone(), JsonStore::new(data_dir))?)
}

/// Read a JSON array of path samples
fn load_path(path: &Path) -> anyhow::Result<Vec<PathSample>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let samples: Vec<PathSample> = serde_json::from_str(&content)?;
    Ok(samples)
}

fn run_init(cli: &Cli, force: bool, config: &Config) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    if config_path.exists() && !force {
        println!("Config already exists at {:?}", config_path);
        println!("Use --force to overwrite");
    } else {
        config.save(&config_path)?;
        println!("Created config at {:?}", config_path);
        println!("\nConfig content:\n{}", config.to_toml()?);
    }

    let data_dir = cli.data_dir(config);
    std::fs::create_dir_all(&data_dir)?;
    println!("\nData directory: {:?}", data_dir);

    Ok(())
}

fn run_gesture(cli: &Cli, action: &GestureAction, config: &Config) -> anyhow::Result<()> {
    let mut engine = open_engine(cli, config)?;

    match action {
        GestureAction::List { detailed } => {
            if engine.bank().is_empty() {
                println!("No gestures. Create one with `gesture-engine gesture create <name>`.");
            }
            for gesture in engine.bank().iter() {
                if *detailed {
                    let samples: usize = gesture.examples().iter().map(|e| e.len()).sum();
                    println!(
                        "{:<24} {:>4} examples {:>7} samples",
                        gesture.name(),
                        gesture.example_count(),
                        samples
                    );
                } else {
                    println!("{}", gesture.name());
                }
            }
            return Ok(());
        }
        GestureAction::Create { name } => {
            let name = engine.create_gesture(name.as_deref())?;
            println!("Created gesture '{}'", name);
        }
        GestureAction::Delete { name } => {
            engine.delete_gesture(name)?;
            println!("Deleted gesture '{}'", name);
        }
        GestureAction::Examples { name } => {
            for (index, example) in engine.examples(name)?.iter().enumerate() {
                println!(
                    "{:>3}: {:>4} samples, {:>6} ms, length {:.3}",
                    index,
                    example.len(),
                    example.duration().as_millis(),
                    example.path_length()
                );
            }
            return Ok(());
        }
        GestureAction::DeleteExample { name, index } => {
            engine.delete_example(name, *index)?;
            println!("Deleted example {} of '{}'", index, name);
        }
    }

    engine.shutdown()?;
    Ok(())
}

fn run_record(cli: &Cli, gesture: &str, input: &Path, config: &Config) -> anyhow::Result<()> {
    let samples = load_path(input)?;
    let mut engine = open_engine(cli, config)?;
    let events = engine.subscribe();

    // Replay the file through a normal capture
    engine.enter_recording_target(gesture)?;
    engine.contact_engaged()?;
    let mut dropped = 0;
    for sample in samples {
        if !engine.push_sample(sample) {
            dropped += 1;
        }
    }
    engine.contact_released()?;
    engine.leave_to_main_menu()?;

    if dropped > 0 {
        warn!(dropped, "Dropped out-of-order samples");
    }

    for event in events.drain() {
        match event {
            EngineEvent::ExampleRecorded { gesture, index, samples } => {
                println!("Recorded example {} of '{}' ({} samples)", index, gesture, samples);
            }
            EngineEvent::CaptureDiscarded { samples, min } => {
                anyhow::bail!("Path too short: {} samples, need {}", samples, min);
            }
            _ => {}
        }
    }

    engine.shutdown()?;
    Ok(())
}

fn run_net(cli: &Cli, action: &NetAction, config: &Config) -> anyhow::Result<()> {
    let mut engine = open_engine(cli, config)?;

    match action {
        NetAction::List => {
            for name in engine.list_classifiers() {
                let status = if engine.is_trained(&name)? { "trained" } else { "untrained" };
                println!("{:<24} {}", name, status);
            }
            return Ok(());
        }
        NetAction::Train { name, timeout } => {
            let events = engine.subscribe();
            engine.begin_training(name)?;
            println!("Training '{}'...", name);
            engine.wait_for_training(Duration::from_secs(*timeout))?;

            for event in events.drain() {
                match event {
                    EngineEvent::TrainingCompleted { classifier } => {
                        println!("Trained '{}'", classifier);
                    }
                    EngineEvent::TrainingFailed { classifier, reason } => {
                        anyhow::bail!("Training '{}' failed: {}", classifier, reason);
                    }
                    _ => {}
                }
            }
        }
        NetAction::Delete { name } => {
            engine.delete_classifier(name)?;
            println!("Deleted classifier '{}'", name);
        }
    }

    engine.shutdown()?;
    Ok(())
}

fn run_classify(cli: &Cli, net: Option<&str>, input: &Path, config: &Config) -> anyhow::Result<()> {
    let samples = load_path(input)?;
    let mut engine = open_engine(cli, config)?;

    let name = match net {
        Some(name) => name.to_string(),
        None => engine
            .list_classifiers()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No classifiers configured"))?,
    };
    engine.select_classifier(&name)?;

    match engine.classify(&samples)? {
        Classification::Match { label, confidence } => {
            println!("{} ({:.2})", label, confidence);
        }
        Classification::NoMatch { best, confidence } => match best {
            Some(best) => println!("No match (closest '{}' at {:.2})", best, confidence),
            None => println!("No match"),
        },
    }

    Ok(())
}

fn run_config(cli: &Cli, action: &ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("Configuration ({:?}):\n", cli.config_path());
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Get { key } => {
            let toml_str = config.to_toml()?;
            match find_toml_value(&toml_str, key) {
                Some(v) => println!("{} = {}", key, v),
                None => anyhow::bail!("Configuration key '{}' not found", key),
            }
        }
    }

    Ok(())
}

/// Simple TOML value lookup by dotted key
fn find_toml_value<'a>(toml_str: &'a str, key: &str) -> Option<&'a str> {
    let (section_name, leaf_key) = match key.split_once('.') {
        Some((section, leaf)) => (section, leaf),
        None => ("", key),
    };

    let mut in_section = section_name.is_empty();
    for line in toml_str.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_section = &trimmed[1..trimmed.len() - 1] == section_name;
            continue;
        }

        if in_section {
            if let Some((line_key, value)) = trimmed.split_once('=') {
                if line_key.trim() == leaf_key {
                    return Some(value.trim());
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_toml_value() {
        let toml = Config::default().to_toml().unwrap();
        assert_eq!(find_toml_value(&toml, "capture.min_samples"), Some("10"));
        assert_eq!(find_toml_value(&toml, "training.epochs"), Some("400"));
        assert_eq!(find_toml_value(&toml, "capture.missing"), None);
        assert_eq!(find_toml_value(&toml, "min_samples"), None);
    }

    #[test]
    fn test_load_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("path.json");
        std::fs::write(&file, r#"[{"position": [0.0, 1.0, 2.0], "t": 5}, {"position": [1.0, 1.0, 2.0], "t": 9}]"#)
            .unwrap();

        let samples = load_path(&file).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].t.as_nanos(), 9);
        assert!(load_path(&dir.path().join("missing.json")).is_err());
    }
}
