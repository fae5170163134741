#[macro_use]
extern crate clap;

use clap::Arg;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum IOErrorContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Asm(sicasm::Error),
    Io(std::io::Error, IOErrorContext, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => writeln!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IOErrorContext::ReadInput => "Reading input",
                    IOErrorContext::WriteOutput => "Writing output",
                },
                path.display(),
                err
            ),
            Error::Asm(err) => {
                writeln!(f, "Assembly failed:")?;
                write!(f, "{}", err)
            }
        }
    }
}

fn main() {
    // Parse command line arguments
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input file to use")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the object program file to write to"),
        )
        .arg(
            Arg::with_name("listing")
                .short("l")
                .long("listing")
                .takes_value(true)
                .value_name("LISTING")
                .help("Sets the listing file to write to"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output");
    let listing = matches.value_of("listing");

    if let Err(err) = sicasm(input, output, listing) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn sicasm(input: &str, output: Option<&str>, listing: Option<&str>) -> Result<(), Error> {
    let input_path = Path::new(input);

    // Read input file
    let input_file = File::open(input_path)
        .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, input_path.to_owned()))?;
    let mut buf_reader = BufReader::new(input_file);
    let mut source = String::new();

    buf_reader
        .read_to_string(&mut source)
        .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, input_path.to_owned()))?;

    // Assemble; nothing is written unless this fully succeeds
    let assembly = sicasm::assemble(&source).map_err(Error::Asm)?;

    // Write object program
    let output_path: PathBuf = output
        .map(PathBuf::from)
        .unwrap_or_else(|| input_path.with_extension("obj"));
    sicobj::write_file(&output_path, &assembly.object)
        .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, output_path))?;

    // Write listing
    let listing_path: PathBuf = listing
        .map(PathBuf::from)
        .unwrap_or_else(|| input_path.with_extension("lst"));
    let listing_file = File::create(&listing_path)
        .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, listing_path.clone()))?;
    let mut writer = BufWriter::new(listing_file);
    assembly
        .listing
        .write(&mut writer)
        .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, listing_path))?;

    Ok(())
}
