use anyhow::{Context, Result};
use clap::{Arg, Command};
use humtxt::errors::ParseMode;
use humtxt::parser::ParseOptions;
use humtxt::rhythm::RhythmOptions;
use humtxt::stream::HumdrumStream;
use humtxt::tempo::TempoMap;
use humtxt::transforms::{self, TransformDescriptor};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};

const AUTHOR: &str = "humtxt contributors <https://github.com/humtxt/humtxt>";

const EXAMPLE: &str = "\
**kern
*M4/4
*MM96
=1
4c
4d
4e
4f
=2
1g
==
*-
";

fn main() -> Result<()> {
    let matches = Command::new("humtxt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Humdrum file model tools")
        .arg(
            Arg::new("files")
                .help("Input Humdrum files (stdin when none given)")
                .value_name("FILE")
                .num_args(0..),
        )
        .arg(
            Arg::new("debug")
                .help("Enable debug output")
                .long("debug")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("author")
                .help("Print author information and exit")
                .long("author")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("example")
                .help("Print an example input and exit")
                .long("example")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("best-effort")
                .help("Report recoverable problems instead of failing")
                .long("best-effort")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("renumber")
                .help("Renumber controlling barlines sequentially")
                .long("renumber")
                .short('n')
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("start")
                .help("First measure number when renumbering")
                .long("start")
                .value_name("NUMBER")
                .value_parser(clap::value_parser!(i32)),
        )
        .arg(
            Arg::new("all")
                .help("Number every barline, ignoring the controlling check")
                .long("all")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("remove")
                .help("Remove barline numbers")
                .long("remove")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("scramble")
                .help("Scramble pitches within each kern spine, keeping rhythms")
                .long("scramble")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("seed")
                .help("Random seed for --scramble")
                .long("seed")
                .value_name("SEED")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("timebase")
                .help("Beat unit: 4 = quarter-note beats, 1 = whole-note beats")
                .long("timebase")
                .value_name("BASE")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("timing")
                .help("Print beat and elapsed-seconds analysis instead of the file")
                .long("timing")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("author") {
        println!("{}", AUTHOR);
        return Ok(());
    }
    if matches.get_flag("example") {
        print!("{}", EXAMPLE);
        return Ok(());
    }

    let debug = matches.get_flag("debug");
    env_logger::Builder::new()
        .filter_level(if debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let mode = if matches.get_flag("best-effort") {
        ParseMode::BestEffort
    } else {
        ParseMode::Strict
    };
    let timebase = matches.get_one::<i64>("timebase").copied().unwrap_or(4);
    let timing = matches.get_flag("timing");

    let descriptor = TransformDescriptor {
        renumber: matches.get_flag("renumber"),
        start_number: matches.get_one::<i32>("start").copied().unwrap_or(1),
        number_all: matches.get_flag("all"),
        remove_numbers: matches.get_flag("remove"),
        scramble: matches.get_flag("scramble"),
        seed: matches.get_one::<u64>("seed").copied(),
        timebase,
        mode,
    };

    let files: Vec<String> = matches
        .get_many::<String>("files")
        .unwrap_or_default()
        .cloned()
        .collect();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if files.is_empty() {
        let stdin = std::io::stdin();
        process_input(stdin.lock(), None, mode, &descriptor, timebase, timing, &mut out)?;
    } else {
        for path in &files {
            let reader = BufReader::new(
                File::open(path).with_context(|| format!("cannot open {}", path))?,
            );
            process_input(reader, Some(path), mode, &descriptor, timebase, timing, &mut out)?;
        }
    }

    Ok(())
}

fn process_input<R: BufRead>(
    reader: R,
    path: Option<&str>,
    mode: ParseMode,
    descriptor: &TransformDescriptor,
    timebase: i64,
    timing: bool,
    out: &mut impl Write,
) -> Result<()> {
    let options = ParseOptions { mode };
    let mut stream = HumdrumStream::with_options(reader, options);

    while let Some(mut file) = stream
        .read_next()
        .with_context(|| format!("in {}", path.unwrap_or("<stdin>")))?
    {
        if let Some(path) = path {
            file.set_filename(path);
        }
        transforms::apply_transforms(&mut file, descriptor)?;

        for issue in file.issues() {
            eprintln!("{}: {}", path.unwrap_or("<stdin>"), issue);
        }

        if timing {
            print_timing(&mut file, timebase, mode, out)?;
        } else {
            write!(out, "{}", file)?;
        }
    }
    Ok(())
}

/// Tab-separated report: absolute beat, elapsed seconds, line text.
fn print_timing(
    file: &mut humtxt::HumdrumFile,
    timebase: i64,
    mode: ParseMode,
    out: &mut impl Write,
) -> Result<()> {
    let opts = RhythmOptions {
        timebase,
        mode,
        ..Default::default()
    };
    file.analyze_rhythm(&opts)?;
    let map = TempoMap::from_lines(&file.lines);
    let seconds = map.timeline(&file.lines, timebase);
    for (line, at) in file.lines.iter().zip(seconds) {
        writeln!(out, "{}\t{:.3}\t{}", line.absolute_beat, at, line)?;
    }
    Ok(())
}
