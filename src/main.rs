use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, process};

use ash::frontend::lexer::Lexer;
use ash::frontend::parse_source;
use ash::frontend::token_dumper::TokenDumper;
use ash::io::midi::{self, LogMidi};
use ash::io::storage::{FileStore, StoreError, TextStore};
use ash::io::voice::{self, LogVoices};
use ash::runtime::{Scheduler, SchedulerConfig, builtins};
use clap::{ArgMatches, Command, arg, command, value_parser};
use tracing::Level;

fn main() {
    let matches = command!()
        .subcommand_required(true)
        .arg(arg!(-v --verbose ... "Log more; repeat for more detail").global(true))
        .subcommand(
            Command::new("run")
                .about("Run an ash program in virtual time")
                .arg(arg!(<file> "The ash file to run").value_parser(value_parser!(PathBuf)))
                .arg(
                    arg!(--beats <BEATS> "How many beats of virtual time to run")
                        .value_parser(value_parser!(f64))
                        .default_value("16"),
                )
                .arg(
                    arg!(--bpm <BPM> "Tempo used to convert beats to time (positive)")
                        .value_parser(value_parser!(f64))
                        .default_value("120"),
                )
                .arg(
                    arg!(--"sample-rate" <HZ> "Audio sample rate")
                        .value_parser(value_parser!(f64))
                        .default_value("44100"),
                )
                .arg(
                    arg!(--block <SAMPLES> "Samples per scheduler step")
                        .value_parser(value_parser!(u64).range(1..))
                        .default_value("512"),
                ),
        )
        .subcommand(
            Command::new("tokens")
                .about("Print the tokens of an ash file")
                .arg(arg!(<file> "The ash file to lex").value_parser(value_parser!(PathBuf)))
                .arg(arg!(--"no-color" "Disable ANSI colors"))
                .arg(arg!(--pretty "Print surface syntax instead of token structure")),
        )
        .subcommand(
            Command::new("store")
                .about("Inspect or edit a text store")
                .arg(arg!(<path> "The store file").value_parser(value_parser!(PathBuf)))
                .subcommand_required(true)
                .subcommand(
                    Command::new("get")
                        .about("Print a stored text")
                        .arg(arg!(<name> "Name of the text")),
                )
                .subcommand(
                    Command::new("set")
                        .about("Store the contents of a file under a name")
                        .arg(arg!(<name> "Name of the text"))
                        .arg(
                            arg!(<file> "File to read the text from")
                                .value_parser(value_parser!(PathBuf)),
                        ),
                )
                .subcommand(Command::new("list").about("List stored names")),
        )
        .get_matches();

    init_logging(matches.get_count("verbose"));

    match matches.subcommand() {
        Some(("run", args)) => {
            let file = args.get_one::<PathBuf>("file").unwrap();
            let config = SchedulerConfig {
                bpm: *args.get_one::<f64>("bpm").unwrap(),
                sample_rate: *args.get_one::<f64>("sample-rate").unwrap(),
                ..SchedulerConfig::default()
            };
            let beats = *args.get_one::<f64>("beats").unwrap();
            let block = *args.get_one::<u64>("block").unwrap();
            run_file(file, config, beats, block);
        }
        Some(("tokens", args)) => {
            let file = args.get_one::<PathBuf>("file").unwrap();
            dump_tokens(
                &read_source(file),
                args.get_flag("no-color"),
                args.get_flag("pretty"),
            );
        }
        Some(("store", args)) => {
            let path = args.get_one::<PathBuf>("path").unwrap();
            if let Err(e) = edit_store(path, args) {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
        _ => unreachable!(),
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn read_source(file: &Path) -> String {
    match fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", file.display(), e);
            process::exit(1);
        }
    }
}

fn run_file(file: &Path, config: SchedulerConfig, beats: f64, block: u64) {
    let program = match parse_source(&read_source(file)) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let dispatch_budget = config.dispatch_budget;
    let mut scheduler = match Scheduler::with_config(config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    let tempo = scheduler.shared_tempo();
    scheduler.add_commands(builtins::core());
    scheduler.add_commands(voice::commands(Arc::new(LogVoices::new())));
    scheduler.add_commands(midi::commands(Arc::new(LogMidi::new()), tempo));

    scheduler.run(program);

    while scheduler.time() < beats {
        let step = scheduler.tempo().samples_to_beats(block as f64);
        let duration = step.min(beats - scheduler.time());
        match scheduler.resume(duration, dispatch_budget) {
            Ok(true) => {}
            Ok(false) => break,
            // The offending process is already retired; the rest play on.
            Err(e) => eprintln!("{}", e),
        }
    }

    scheduler.stop_all();
    for (name, d) in scheduler.take_diagnostics() {
        eprintln!(
            "warning: [{} beat {}] {} {}: {}",
            name, d.time, d.location, d.message, d.offending
        );
    }
}

fn dump_tokens(source: &str, no_color: bool, pretty: bool) {
    let mut lexer = Lexer::new(source);

    match lexer.tokenize() {
        Ok(tokens) => {
            let mut dumper = TokenDumper::new();

            if no_color {
                dumper = dumper.no_color();
            }
            if pretty {
                dumper = dumper.pretty();
            }

            dumper.dump(&tokens);
        }
        Err(e) => {
            eprintln!("lexer error: {}", e);
            process::exit(1);
        }
    }
}

fn edit_store(path: &Path, args: &ArgMatches) -> Result<(), StoreError> {
    let mut store = FileStore::open(path)?;
    match args.subcommand() {
        Some(("get", args)) => {
            let name = args.get_one::<String>("name").unwrap();
            match store.get(name) {
                Some(text) => print!("{}", text),
                None => {
                    eprintln!("no text named '{}'", name);
                    process::exit(1);
                }
            }
        }
        Some(("set", args)) => {
            let name = args.get_one::<String>("name").unwrap();
            let file = args.get_one::<PathBuf>("file").unwrap();
            store.set(name, &read_source(file))?;
        }
        Some(("list", _)) => {
            for name in store.names() {
                println!("{}", name);
            }
        }
        _ => unreachable!(),
    }
    Ok(())
}
