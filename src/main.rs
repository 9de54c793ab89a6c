extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;

pub mod assembler;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use assembler::binary::{self, HeaderOptions, HEADER_WORDS};
use assembler::grammar::Grammar;

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    debug!("Arguments:\n\tVerbosity: {}\n\tGrammar: {}\n\tOutfile: {}\n\tInfile: {}",
        verbosity_filter(args.occurrences_of("verbose")),
        args.value_of("grammar").unwrap_or("builtin"),
        args.value_of("output").unwrap_or("None"),
        args.value_of("INPUT").unwrap_or("None")
    );

    let ipath = Path::new(args.value_of("INPUT").unwrap_or_default());
    let source = match fs::read_to_string(ipath) {
        Err(err) => fatal(format!("unable to read input file `{}`: {}", ipath.display(), err)),
        Ok(text) => text,
    };

    let grammar = match load_grammar(args.value_of("grammar")) {
        Err(err) => fatal(err),
        Ok(grammar) => grammar,
    };

    let options = match header_options(&args) {
        Err(err) => fatal(err),
        Ok(options) => options,
    };

    if args.is_present("print-debug") {
        print_listing(&source, &grammar, ipath);
    }

    let words = match assembler::assemble(&source, &grammar, &options) {
        Err(err) => fatal(format!("{}: {}", ipath.display(), err)),
        Ok(words) => words,
    };
    info!("assembled {} words", words.len());

    let opath = match args.value_of("output") {
        Some(filename) => PathBuf::from(filename),
        None => default_output(ipath),
    };
    if opath == ipath {
        fatal(format!("refusing to overwrite input file `{}`", ipath.display()));
    }

    let mut ofile = match File::create(&opath) {
        Err(err) => fatal(format!("unable to open output file `{}`: {}", opath.display(), err)),
        Ok(file) => file,
    };

    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    if let Err(err) = ofile.write_all(&bytes) {
        fatal(format!("unable to write to output file `{}`: {}", opath.display(), err));
    }
}

/// Prints each instruction with its word offset and encoding.
fn print_listing(source: &str, grammar: &Grammar, ipath: &Path) {
    let program = match assembler::compile(source, grammar) {
        Err(err) => fatal(format!("{}: {}", ipath.display(), err)),
        Ok(program) => program,
    };

    let mut grid = Grid::new(GridOptions {
        filling:     Filling::Spaces(1),
        direction:   Direction::LeftToRight,
    });

    let mut offset = HEADER_WORDS;
    for ins in program.instructions.iter() {
        let mut words = Vec::with_capacity(ins.word_count());
        binary::encode_instruction(ins, &mut words);
        let hex: Vec<String> = words.iter().map(|w| format!("0x{:08X}", w)).collect();

        grid.add(Cell::from(format!("0x{:04X}:", offset)));
        grid.add(Cell::from(format!("{}", ins)));
        grid.add(Cell::from("=>".to_string()));
        grid.add(Cell::from(hex.join(" ")));
        offset += words.len();
    }

    println!("{}", grid.fit_into_columns(4));
}

/// `foo.spvasm` becomes `foo.spv`. An input already named `*.spv` gets
/// `.spv` appended instead of being overwritten.
fn default_output(ipath: &Path) -> PathBuf {
    if ipath.extension().map_or(false, |ext| ext == "spv") {
        let mut name = ipath.as_os_str().to_owned();
        name.push(".spv");
        return PathBuf::from(name);
    }
    ipath.with_extension("spv")
}

fn fatal(message: String) -> ! {
    error!("fatal: {}", message);
    std::process::exit(1);
}

fn load_grammar(path: Option<&str>) -> Result<Grammar, String> {
    match path {
        None => Grammar::builtin(),
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| format!("unable to open grammar file `{}`: {}", path, err))?;
            Grammar::from_reader(std::io::BufReader::new(file))
        }
    }
}

fn header_options(args: &ArgMatches) -> Result<HeaderOptions, String> {
    let mut options = HeaderOptions::default();
    if let Some(version) = args.value_of("target-version") {
        options.version = HeaderOptions::parse_version(version)?;
    }
    if let Some(generator) = args.value_of("generator") {
        options.generator = generator
            .parse()
            .map_err(|_| format!("invalid generator id `{}`", generator))?;
    }
    Ok(options)
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
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
        .arg(Arg::with_name("output")
            .short("o")
            .takes_value(true)
            .help("write output to an outfile"))
        .arg(Arg::with_name("grammar")
            .short("g")
            .long("grammar")
            .takes_value(true)
            .help("load the instruction grammar from a JSON file"))
        .arg(Arg::with_name("target-version")
            .long("target-version")
            .takes_value(true)
            .help("version written to the module header, as MAJOR.MINOR"))
        .arg(Arg::with_name("generator")
            .long("generator")
            .takes_value(true)
            .help("generator id written to the module header"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .alias("show")
            .takes_value(false)
            .help("prints the debug information alongside the assembly to STDOUT"))
        .get_matches()
}

fn verbosity_filter(verbosity: u64) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
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
        .level(verbosity_filter(verbosity))
        .chain(std::io::stderr())
        .apply().ok();
}
