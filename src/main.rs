//! flappy-evolve CLI - Train bird policies from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use flappy_evolve::{
    animation::{RecorderConfig, ReplayPlayer, ReplayRecorder},
    compute::{
        HeadlessRenderer, Renderer,
        evolution::{EvolutionEngine, EvolutionError, FitnessEvaluator},
    },
    schema::{EvolutionConfig, EvolutionPhase, EvolutionResult},
};

fn print_usage(program: &str) {
    eprintln!("Usage: {} <config.json|--default> [replay.flpr]", program);
    eprintln!("       {} --replay <replay.flpr>", program);
    eprintln!("       {} --example", program);
    eprintln!();
    eprintln!("Evolve flappy bird policies with a genetic algorithm.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  config.json  Path to training configuration file");
    eprintln!("  --default    Train with the default configuration");
    eprintln!("  replay.flpr  Record every generation to a replay file");
    eprintln!();
    eprintln!("Example configuration is generated with --example flag.");
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--example" => {
            print_example_config();
            return;
        }
        "--replay" => {
            let Some(path) = args.get(2) else {
                print_usage(&args[0]);
                std::process::exit(1);
            };
            summarize_replay(Path::new(path));
            return;
        }
        _ => {}
    }

    let config = if args[1] == "--default" {
        EvolutionConfig::default()
    } else {
        load_config(Path::new(&args[1]))
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    let replay_path = args.get(2).map(PathBuf::from);

    println!("flappy-evolve");
    println!("=============");
    println!(
        "Population: {} birds, up to {} generations",
        config.population.size, config.population.max_generations
    );
    println!(
        "Network: {} inputs, hidden {:?}, {} outputs ({:?})",
        config.network.inputs, config.network.hidden, config.network.outputs, config.network.activation
    );
    if let Some(path) = &replay_path {
        println!("Recording to: {}", path.display());
    }
    match config.session.tick_rate {
        Some(rate) if replay_path.is_some() => {
            println!("Tick rate: {} ticks/s (replay playback only)", rate)
        }
        Some(rate) => println!("Tick rate: {} ticks/s ignored, nothing is drawn live", rate),
        None => {}
    }
    println!("Training runs unthrottled. Press Ctrl-C to stop and keep finished generations.");
    println!();

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = Arc::clone(&interrupt);
        if let Err(e) = ctrlc::set_handler(move || {
            interrupt.store(true, Ordering::SeqCst);
        }) {
            eprintln!("Warning: Ctrl-C handler unavailable: {}", e);
        }
    }

    let outcome = match &replay_path {
        Some(path) => {
            let recorder = ReplayRecorder::create(
                path,
                &config.game,
                config.session.tick_rate,
                RecorderConfig::default(),
            )
            .unwrap_or_else(|e| {
                eprintln!("Error creating replay file: {}", e);
                std::process::exit(1);
            });

            train(&config, recorder, Arc::clone(&interrupt)).map(|(result, recorder)| {
                match recorder.finalize() {
                    Ok(stats) => println!("Replay: {}", stats),
                    Err(e) => eprintln!("Error writing replay: {}", e),
                }
                result
            })
        }
        None => train(&config, HeadlessRenderer::new(), interrupt).map(|(result, _)| result),
    };

    let result = outcome.unwrap_or_else(|e| {
        eprintln!("Training failed: {}", e);
        std::process::exit(1);
    });

    print_result(&result);
}

/// Copy of `config` for training. Nothing is drawn live, so sessions never
/// sleep; the configured rate only ends up in the replay header.
fn training_config(config: &EvolutionConfig) -> EvolutionConfig {
    let mut training = config.clone();
    training.session.tick_rate = None;
    training
}

/// Run the genetic algorithm, letting every generation play one session.
/// Raising `interrupt` aborts the session in progress and ends the run with
/// the generations finished so far.
fn train<R: Renderer>(
    config: &EvolutionConfig,
    renderer: R,
    interrupt: Arc<AtomicBool>,
) -> Result<(EvolutionResult, R), EvolutionError> {
    let config = training_config(config);
    let mut engine = EvolutionEngine::new(config.clone()).with_cancel(interrupt);
    let mut evaluator =
        FitnessEvaluator::new(&config, renderer).with_cancel(engine.cancel_handle());

    let result = engine.run_with_callback(
        |generation, candidates| evaluator.evaluate(generation, candidates),
        config.population.max_generations,
        |progress| {
            if progress.phase == EvolutionPhase::Evaluating {
                println!(
                    "  Generation {}/{}: best={:.2}, avg={:.2}, score={}, ticks={}",
                    progress.generation + 1,
                    progress.total_generations,
                    progress.generation_best,
                    progress.avg_fitness,
                    progress.score,
                    progress.ticks
                );
            }
        },
    )?;

    Ok((result, evaluator.into_renderer()))
}

fn load_config(path: &Path) -> EvolutionConfig {
    let config_str = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    })
}

fn print_result(result: &EvolutionResult) {
    let stats = &result.stats;

    println!();
    println!("Stopped: {:?}", stats.stop_reason);
    println!("Generations: {}", stats.generations);
    println!("Evaluations: {}", stats.total_evaluations);
    println!("Best fitness: {:.2}", stats.best_fitness);
    println!("Best score: {}", stats.best_score);
    println!("Final average fitness: {:.2}", stats.final_avg_fitness);
    println!("Time: {:.2}s", stats.elapsed_seconds);

    if let Some(best) = &result.best {
        println!();
        println!(
            "Best genome (candidate {}, generation {}):",
            best.id, best.generation
        );
        match serde_json::to_string_pretty(&best.genome) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing genome: {}", e),
        }
    }
}

fn summarize_replay(path: &Path) {
    let mut player = ReplayPlayer::open(path).unwrap_or_else(|e| {
        eprintln!("Error opening replay: {}", e);
        std::process::exit(1);
    });

    let header = player.header().clone();
    let mut generations = 0u32;
    let mut best_score = 0u32;
    let mut peak_birds = 0usize;
    let mut longest_tick = 0u64;

    for frame in player.frames() {
        let frame = frame.unwrap_or_else(|e| {
            eprintln!("Error reading frame: {}", e);
            std::process::exit(1);
        });
        generations = generations.max(frame.generation + 1);
        best_score = best_score.max(frame.score);
        peak_birds = peak_birds.max(frame.birds.len());
        longest_tick = longest_tick.max(frame.tick + 1);
    }

    println!("Replay: {}", path.display());
    println!("  Playfield: {}x{}", header.width, header.height);
    println!("  Compression: {:?}", header.flags.compression);
    println!("  Frames: {}", header.frame_count);
    println!("  Generations: {}", generations);
    println!("  Longest generation: {} ticks", longest_tick);
    println!("  Best score: {}", best_score);
    println!("  Peak birds on screen: {}", peak_birds);
}

fn print_example_config() {
    let config = EvolutionConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flappy_evolve::schema::{PopulationConfig, StopReason};

    fn small_config() -> EvolutionConfig {
        let mut config = EvolutionConfig {
            population: PopulationConfig {
                size: 4,
                max_generations: 3,
                ..Default::default()
            },
            random_seed: Some(2),
            ..Default::default()
        };
        config.session.max_ticks = Some(200);
        config.session.random_seed = Some(8);
        config
    }

    #[test]
    fn test_training_never_throttles() {
        let mut config = small_config();
        config.session.tick_rate = Some(30.0);

        let training = training_config(&config);
        assert_eq!(training.session.tick_rate, None);
        assert_eq!(training.session.max_ticks, Some(200));
        assert_eq!(config.session.tick_rate, Some(30.0));
    }

    #[test]
    fn test_train_with_rate_runs_headless_frames() {
        let mut config = small_config();
        // At 1 tick/s a throttled run would take minutes.
        config.session.tick_rate = Some(1.0);

        let (result, renderer) =
            train(&config, HeadlessRenderer::new(), Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(result.stats.generations, 3);
        assert!(renderer.frames() > 0);
    }

    #[test]
    fn test_raised_interrupt_stops_before_first_generation() {
        let interrupt = Arc::new(AtomicBool::new(true));
        let (result, renderer) = train(&small_config(), HeadlessRenderer::new(), interrupt).unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 0);
        assert_eq!(renderer.frames(), 0);
    }
}
