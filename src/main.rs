#[cfg(not(all(feature = "simulator", feature = "dynamic-config")))]
fn main() {
    eprintln!(
        "The button-intercept CLI requires the \"simulator\" and \"dynamic-config\" features. Rebuild with default features to enable the simulation harness."
    );
}

#[cfg(all(feature = "simulator", feature = "dynamic-config"))]
mod cli {
    use std::env;
    use std::io::{self, BufRead};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use anyhow::{Context, Result};
    use parking_lot::Mutex;
    use tracing_subscriber::EnvFilter;

    use button_intercept::{
        apply_bindings, overlay, script, ChannelAliasConfig, ChannelAliases, InputScript,
        InputSnapshot, InterceptEngine, NoopRelayDriver, PatternsConfig, ProgramBank,
        NUM_INPUT_CHANNELS, NUM_OUTPUT_CHANNELS,
    };

    const DEFAULT_DURATION_MS: u32 = 7_000;
    const DEFAULT_TICK_MS: u64 = 10;

    struct Options {
        channels_file: Option<String>,
        patterns_file: Option<String>,
        script_name: String,
        script_channel: usize,
        duration_ms: u32,
        tick_ms: u64,
        follower_only: bool,
        interactive: bool,
    }

    impl Default for Options {
        fn default() -> Self {
            Self {
                channels_file: None,
                patterns_file: None,
                script_name: "new-press".to_string(),
                script_channel: 1,
                duration_ms: DEFAULT_DURATION_MS,
                tick_ms: DEFAULT_TICK_MS,
                follower_only: false,
                interactive: false,
            }
        }
    }

    fn usage() {
        eprintln!(
            "Usage:\n  button-intercept [flags]\n\nFlags:\n  --channels <file>   Channel alias document (JSON)\n  --patterns <file>   Patterns document (JSON): sequences, patterns, pattern_mappings\n  --script <name>     Input script: debounce-on | debounce-off | long-press | new-press\n  --channel <n>       Input channel the script drives (default 1)\n  --duration <ms>     Scripted run length (default 7000)\n  --tick <ms>         Polling cadence (default 10)\n  --follower-only     Force every channel into follower mode (bring-up/safety)\n  --interactive       Drive the box from stdin instead of a script\n  -h, --help          Show this help\n\nInteractive commands:\n  press <n> | release <n>     set a raw input level\n  program <n> <name|none>     assign a program to an input channel\n  select <n> <0-7>            assign by selector position (0 = follower)\n  follower <on|off>           toggle the global follower override\n  show                        dump inputs, outputs and assignments\n  quit\n"
        );
    }

    fn parse_args() -> Result<Option<Options>> {
        let mut opts = Options::default();
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--channels" => {
                    opts.channels_file = Some(args.next().context("--channels requires a file")?);
                }
                "--patterns" => {
                    opts.patterns_file = Some(args.next().context("--patterns requires a file")?);
                }
                "--script" => {
                    opts.script_name = args.next().context("--script requires a name")?;
                }
                "--channel" => {
                    opts.script_channel = args
                        .next()
                        .context("--channel requires an index")?
                        .parse()
                        .context("--channel must be a number")?;
                }
                "--duration" => {
                    opts.duration_ms = args
                        .next()
                        .context("--duration requires milliseconds")?
                        .parse()
                        .context("--duration must be a number")?;
                }
                "--tick" => {
                    opts.tick_ms = args
                        .next()
                        .context("--tick requires milliseconds")?
                        .parse()
                        .context("--tick must be a number")?;
                }
                "--follower-only" => opts.follower_only = true,
                "--interactive" => opts.interactive = true,
                "--help" | "-h" => {
                    usage();
                    return Ok(None);
                }
                _ => {
                    eprintln!("Unknown flag: {arg}");
                    usage();
                    return Ok(None);
                }
            }
        }
        if opts.script_channel >= NUM_INPUT_CHANNELS {
            eprintln!("--channel must be below {NUM_INPUT_CHANNELS}");
            return Ok(None);
        }
        Ok(Some(opts))
    }

    /// Builds the bank and aliases, applying any configuration documents.
    /// Configuration failures degrade to the built-in defaults.
    fn boot(opts: &Options) -> (ProgramBank, ChannelAliases, Option<PatternsConfig>) {
        let mut bank = ProgramBank::new();
        let mut aliases = ChannelAliases::new();

        if let Some(path) = &opts.channels_file {
            match ChannelAliasConfig::from_path(path) {
                Ok(config) => aliases.apply(&config),
                Err(e) => {
                    tracing::warn!(path = path.as_str(), error = %e, "channels document ignored; using default aliases");
                }
            }
        }

        let patterns = opts.patterns_file.as_ref().and_then(|path| {
            match PatternsConfig::from_path(path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(path = path.as_str(), error = %e, "patterns document ignored; using built-in programs");
                    None
                }
            }
        });

        if let Some(config) = &patterns {
            match overlay(&mut bank, &aliases, config) {
                Ok(report) => {
                    println!(
                        "Loaded {} dynamic sequences, built {} dynamic programs, skipped {} entries\n",
                        report.sequences_loaded, report.programs_built, report.entries_skipped
                    );
                }
                Err(e) => tracing::warn!(error = %e, "dynamic overlay failed; using built-in programs"),
            }
        }

        (bank, aliases, patterns)
    }

    fn render_outputs(outputs: &[bool; NUM_OUTPUT_CHANNELS]) -> String {
        outputs.iter().map(|&on| if on { '#' } else { '.' }).collect()
    }

    fn run_scripted(opts: &Options) -> Result<()> {
        let (bank, aliases, patterns) = boot(opts);

        let mut engine = InterceptEngine::new(NoopRelayDriver::new());
        engine.set_follower_override(opts.follower_only);
        if let Some(config) = &patterns {
            apply_bindings(&bank, config, &mut engine);
        }
        // Give the scripted channel something to play if nothing bound it.
        if engine.controller(opts.script_channel).program().is_none() && !opts.follower_only {
            engine.set_program(opts.script_channel, bank.program_by_name("Poof"));
        }

        let program = script::by_name(&opts.script_name)
            .with_context(|| format!("unknown input script '{}'", opts.script_name))?;
        let mut input = InputScript::new(program);

        println!(
            "Scripted run: '{}' on input channel {} for {}ms at {}ms ticks",
            opts.script_name, opts.script_channel, opts.duration_ms, opts.tick_ms
        );

        let start = Instant::now();
        input.start(0);
        let mut last_outputs = [false; NUM_OUTPUT_CHANNELS];
        loop {
            let now_ms = start.elapsed().as_millis() as u32;
            if now_ms > opts.duration_ms {
                break;
            }
            let snapshot = input.snapshot(opts.script_channel, now_ms);
            let outputs = engine.tick(snapshot, now_ms);
            if outputs != last_outputs {
                let on_names: Vec<&str> = (0..NUM_OUTPUT_CHANNELS)
                    .filter(|&i| outputs[i])
                    .map(|i| aliases.name(i))
                    .collect();
                println!(
                    "[{now_ms:>6}ms] outputs {}  {}",
                    render_outputs(&outputs),
                    on_names.join(", ")
                );
                last_outputs = outputs;
            }
            std::thread::sleep(Duration::from_millis(opts.tick_ms));
        }

        println!("\nRun complete after {}ms", start.elapsed().as_millis());
        Ok(())
    }

    struct Sim {
        engine: InterceptEngine<NoopRelayDriver>,
        levels: [bool; NUM_INPUT_CHANNELS],
    }

    fn run_interactive(opts: &Options) -> Result<()> {
        let (bank, aliases, patterns) = boot(opts);

        let mut engine = InterceptEngine::new(NoopRelayDriver::new());
        engine.set_follower_override(opts.follower_only);
        if let Some(config) = &patterns {
            apply_bindings(&bank, config, &mut engine);
        }

        let sim = Arc::new(Mutex::new(Sim {
            engine,
            levels: [false; NUM_INPUT_CHANNELS],
        }));
        let running = Arc::new(AtomicBool::new(true));

        // The tick thread owns the clock; every engine mutation goes through
        // the mutex, which serializes reconfiguration with tick processing.
        let tick_sim = Arc::clone(&sim);
        let tick_running = Arc::clone(&running);
        let tick_ms = opts.tick_ms;
        let ticker = std::thread::spawn(move || {
            let start = Instant::now();
            let mut last_outputs = [false; NUM_OUTPUT_CHANNELS];
            while tick_running.load(Ordering::Relaxed) {
                {
                    let mut sim = tick_sim.lock();
                    let now_ms = start.elapsed().as_millis() as u32;
                    let snapshot = InputSnapshot::from_levels(&sim.levels);
                    let outputs = sim.engine.tick(snapshot, now_ms);
                    if outputs != last_outputs {
                        println!("[{now_ms:>6}ms] outputs {}", render_outputs(&outputs));
                        last_outputs = outputs;
                    }
                }
                std::thread::sleep(Duration::from_millis(tick_ms));
            }
        });

        println!("Interactive mode - type 'help' for commands\n");
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line?;
            let mut words = line.split_whitespace();
            let Some(command) = words.next() else {
                continue;
            };
            match command {
                "press" | "release" => {
                    let Some(Ok(channel)) = words.next().map(str::parse::<usize>) else {
                        eprintln!("usage: {command} <channel>");
                        continue;
                    };
                    if channel >= NUM_INPUT_CHANNELS {
                        eprintln!("no such input channel: {channel}");
                        continue;
                    }
                    sim.lock().levels[channel] = command == "press";
                }
                "program" => {
                    let (Some(Ok(channel)), Some(name)) =
                        (words.next().map(str::parse::<usize>), words.next())
                    else {
                        eprintln!("usage: program <channel> <name|none>");
                        continue;
                    };
                    let program = if name == "none" || name == "follower" {
                        None
                    } else {
                        match bank.program_by_name(name) {
                            Some(p) => Some(p),
                            None => {
                                eprintln!("no such program: {name}");
                                continue;
                            }
                        }
                    };
                    sim.lock().engine.set_program(channel, program);
                }
                "select" => {
                    let (Some(Ok(channel)), Some(Ok(position))) = (
                        words.next().map(str::parse::<usize>),
                        words.next().map(str::parse::<u8>),
                    ) else {
                        eprintln!("usage: select <channel> <0-7>");
                        continue;
                    };
                    sim.lock().engine.set_program(channel, bank.by_selector(position));
                }
                "follower" => {
                    let on = matches!(words.next(), Some("on"));
                    sim.lock().engine.set_follower_override(on);
                }
                "show" => {
                    let sim = sim.lock();
                    println!(
                        "inputs  {}",
                        sim.levels
                            .iter()
                            .map(|&p| if p { '#' } else { '.' })
                            .collect::<String>()
                    );
                    println!("outputs {}", render_outputs(sim.engine.consolidated()));
                    for controller in sim.engine.controllers() {
                        let name = controller
                            .program()
                            .map_or(":follower", |p| p.name());
                        let output = controller
                            .default_output()
                            .map_or("-".to_string(), |o| aliases.name(o).to_string());
                        println!(
                            "  channel {:>2} -> {:<12} default output: {}",
                            controller.input_channel(),
                            name,
                            output
                        );
                    }
                }
                "help" => usage(),
                "quit" | "q" => break,
                _ => eprintln!("unknown command: {command} (try 'help')"),
            }
        }

        running.store(false, Ordering::Relaxed);
        ticker
            .join()
            .map_err(|_| anyhow::anyhow!("tick thread panicked during shutdown"))?;
        Ok(())
    }

    pub fn run() -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
            .init();

        println!("Button Intercept - relay sequencing simulator");
        println!("=============================================\n");

        let Some(opts) = parse_args()? else {
            return Ok(());
        };

        if opts.interactive {
            run_interactive(&opts)
        } else {
            run_scripted(&opts)
        }
    }
}

#[cfg(all(feature = "simulator", feature = "dynamic-config"))]
fn main() -> anyhow::Result<()> {
    cli::run()
}
