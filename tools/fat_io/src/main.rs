mod image;
mod logger;

use std::env;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use fat_io::{BlockDev, Error, ShortName, Volume};

use crate::image::{ImageDisk, ReaderSource, WriterSink};

const USAGE: &str = "\
usage: fat_io <disk_image> read <output_file> <name>
       fat_io <disk_image> write <input_file> <name>
       fat_io <disk_image> delete <name>
       fat_io <disk_image> list

environment: FAT_IO_LOG=<off|error|warn|info|debug|trace>, NO_COLOR";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Read { output: String, name: ShortName },
    Write { input: String, name: ShortName },
    Delete { name: ShortName },
    List,
}

#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    image:   String,
    command: Command,
}

fn parse_args(args: &[String]) -> Option<Invocation> {
    let (image, rest) = args.split_first()?;
    let command = match rest {
        [op, output, name] if op == "read" => Command::Read {
            output: output.clone(),
            name:   ShortName::from_file_name(name),
        },
        [op, input, name] if op == "write" => Command::Write {
            input: input.clone(),
            name:  ShortName::from_file_name(name),
        },
        [op, name] if op == "delete" => Command::Delete { name: ShortName::from_file_name(name) },
        [op] if op == "list" => Command::List,
        _ => return None,
    };
    Some(Invocation { image: image.clone(), command })
}

fn main() -> ExitCode {
    if let Err(e) = logger::init(logger::Config::from_env()) {
        eprintln!("fat_io: {e}");
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(invocation) = parse_args(&args) else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    match run(invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(invocation: Invocation) -> Result<(), Error> {
    let disk = ImageDisk::open(Path::new(&invocation.image))?;
    let mut volume = Volume::mount(disk)?;
    for line in volume.geometry.to_string().lines() {
        log::info!("{line}");
    }

    match invocation.command {
        Command::Read { output, name } => {
            let file = File::create(&output).map_err(|e| {
                log::error!("read: cannot create {output}: {e}");
                Error::Sink
            })?;
            let mut sink = WriterSink(BufWriter::new(file));
            // chain faults were logged by the engine; what was read is kept
            let report = volume.read_file(&name, &mut sink)?;
            sink.finish()?;
            log::info!("read: {} bytes of {name} into {output}", report.bytes_read);
        }
        Command::Write { input, name } => {
            let file = File::open(&input).map_err(|e| {
                log::error!("write: cannot open {input}: {e}");
                Error::Source
            })?;
            let written = volume.write_file(&name, &mut ReaderSource(BufReader::new(file)))?;
            log::info!("write: {written} bytes of {input} stored as {name}");
        }
        Command::Delete { name } => {
            volume.delete_file(&name)?;
        }
        Command::List => {
            print_listing(&mut volume, &mut io::stdout().lock())?;
            let free = volume.free_clusters()?;
            log::info!("list: {free} clusters free ({} bytes)",
                       free as u64 * volume.geometry.cluster_bytes() as u64);
        }
    }
    Ok(())
}

/// One line per file: name, size, first cluster. Stops writing at the first
/// failure of `out`.
fn print_listing<D: BlockDev, W: Write>(volume: &mut Volume<D>, out: &mut W) -> Result<(), Error> {
    let mut failure = None;
    volume.list(|entry| {
        if failure.is_some() { return; }
        if let Err(e) = writeln!(out, "{:<12} {:>10}  {:#06X}",
                                 entry.name.to_string(), entry.size, entry.start_cluster) {
            failure = Some(e);
        }
    })?;
    let result = match failure {
        Some(e) => Err(e),
        None => out.flush(),
    };
    if let Err(e) = result {
        log::error!("list: cannot write listing: {e}");
        return Err(Error::Sink);
    }
    Ok(())
}
