extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;
extern crate qes;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::path::Path;

use qes::frontend::config::{self, Config};
use qes::frontend::{Error, Frontend};

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    debug!("Arguments:\n\tVerbosity: {}\n\tTokens Only: {}\n\tLexicon: {}\n\tGrammar: {}\n\tInfile: {}",
        level_for(args.occurrences_of("verbose")),
        args.is_present("tokens"),
        args.value_of("lexicon").unwrap_or("default"),
        args.value_of("grammar").unwrap_or("default"),
        args.value_of("INPUT").unwrap_or("None")
    );

    if let Err(err) = run(&args) {
        error!("fatal: {}", err);
        std::process::exit(err.exit_code());
    }
}

fn run(args: &ArgMatches) -> Result<(), Error> {
    let ipath = match args.value_of("INPUT") {
        Some(ifile) => Path::new(ifile),
        None => return Err(Error::missing("INPUT", "no input file given")),
    };
    let source = config::read_resource(ipath)?;

    let config = Config::resolve(
        args.value_of("lexicon").map(Path::new),
        args.value_of("grammar").map(Path::new),
    );
    let frontend = Frontend::new(&config)?;

    if args.is_present("tokens") {
        let tokens = frontend.tokenize(&source)?;
        let mut grid = Grid::new(GridOptions {
            filling:     Filling::Spaces(1),
            direction:   Direction::LeftToRight,
        });

        for token in tokens.iter() {
            grid.add(Cell::from(format!("{}", token.position)));
            grid.add(Cell::from(token.kind.clone()));
            grid.add(Cell::from(format!("{:?}", token.lexeme)));
        }

        println!("{}", grid.fit_into_columns(3));
        return Ok(());
    }

    let program = frontend.read_program(&source)?;
    info!("read {} instructions from `{}`", program.len(), ipath.display());

    if args.is_present("print-debug") {
        let mut grid = Grid::new(GridOptions {
            filling:     Filling::Spaces(1),
            direction:   Direction::LeftToRight,
        });

        for (idx, ins) in program.iter().enumerate() {
            grid.add(Cell::from(format!("0x{:04X}:", idx)));
            grid.add(Cell::from(format!("{}", ins)));
        }

        println!("{}", grid.fit_into_columns(2));
    } else {
        for ins in program.iter() {
            println!("{}", ins);
        }
    }

    Ok(())
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(option_env!("CARGO_PKG_NAME").unwrap_or("qes"))
        .version(option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"))
        .author(option_env!("CARGO_PKG_AUTHORS").unwrap_or(""))
        .about(option_env!("CARGO_PKG_DESCRIPTION").unwrap_or(""))
        .arg(Arg::with_name("INPUT")
            .help("Sets the input file to use")
            .required(true)
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("lexicon")
            .short("l")
            .long("lexicon")
            .takes_value(true)
            .help("reads the lexicon from a file instead of QES_LEXER_FILE or the built-in one"))
        .arg(Arg::with_name("grammar")
            .short("g")
            .long("grammar")
            .takes_value(true)
            .help("reads the grammar from a file instead of QES_LL_GRAMMAR_FILE or the built-in one"))
        .arg(Arg::with_name("tokens")
            .short("e")
            .takes_value(false)
            .help("lex only, and print the tokens"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .alias("show")
            .alias("s")
            .takes_value(false)
            .help("prints the program with instruction addresses to STDOUT"))
        .get_matches()
}

fn level_for(verbosity: u64) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 | _ => log::LevelFilter::Debug,
    }
}

fn initialize_logging(verbosity: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level_for(verbosity))
        .chain(std::io::stderr())
        .apply().ok();
}
