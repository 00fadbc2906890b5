use std::path::PathBuf;

use at28cflash::{
    cli::{
        abort_on_ctrlc, config::Config, connect, parse_u32, succeeded, ConnectArgs,
        ProgrammerProgress,
    },
    logging::initialize_logger,
    Error, Programmer,
};
use clap::{Args, Parser, Subcommand};
use log::{debug, LevelFilter};
use miette::Result;

#[derive(Debug, Parser)]
#[command(about, version, propagate_version = true, arg_required_else_help = true)]
struct Cli {
    #[command(flatten)]
    connect_args: ConnectArgs,

    #[command(subcommand)]
    subcommand: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Clear the EEPROM by writing zeros to every address
    Clear,
    /// Read the byte stored at an address
    Read(ReadArgs),
    /// Read the EEPROM content into a file
    #[command(alias = "read_file")]
    ReadFile(FileArgs),
    /// Write a byte to an address
    Write(WriteArgs),
    /// Write a file's content into the EEPROM, starting at address 0
    #[command(alias = "write_file")]
    WriteFile(FileArgs),
}

#[derive(Debug, Args)]
struct ReadArgs {
    /// Address to read from, in decimal or 0x prefixed hexadecimal
    #[arg(value_parser = parse_u32)]
    address: u32,
}

#[derive(Debug, Args)]
struct WriteArgs {
    /// Address to write to, in decimal or 0x prefixed hexadecimal
    #[arg(value_parser = parse_u32)]
    address: u32,
    /// Byte to write
    data: u8,
}

#[derive(Debug, Args)]
struct FileArgs {
    /// Raw binary image, one byte per address
    file: PathBuf,
}

fn main() -> Result<()> {
    miette::set_panic_hook();
    initialize_logger(LevelFilter::Info);

    // Attempt to parse any provided command-line arguments, or print the help
    // message and terminate if the invocation is not correct.
    let args = Cli::parse();
    debug!("{:#?}", args);

    // Load any user configuration, if present.
    let config = Config::load()?;

    let mut programmer = connect(&args.connect_args, &config)?;
    abort_on_ctrlc(programmer.abort_handle())?;

    // Execute the correct action based on the provided subcommand and its
    // associated arguments.
    match args.subcommand {
        Commands::Clear => clear(&mut programmer),
        Commands::Read(args) => read(&mut programmer, args),
        Commands::ReadFile(args) => read_file(&mut programmer, args),
        Commands::Write(args) => write(&mut programmer, args),
        Commands::WriteFile(args) => write_file(&mut programmer, args),
    }
}

fn clear(programmer: &mut Programmer) -> Result<()> {
    succeeded(programmer.clear(&mut ProgrammerProgress::default())?)
}

fn read(programmer: &mut Programmer, args: ReadArgs) -> Result<()> {
    match programmer.read(args.address)? {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => Err(Error::CommandFailed.into()),
    }
}

fn read_file(programmer: &mut Programmer, args: FileArgs) -> Result<()> {
    succeeded(programmer.dump_to_file(&args.file, &mut ProgrammerProgress::default())?)
}

fn write(programmer: &mut Programmer, args: WriteArgs) -> Result<()> {
    succeeded(programmer.write(args.address, args.data)?)
}

fn write_file(programmer: &mut Programmer, args: FileArgs) -> Result<()> {
    succeeded(programmer.load_from_file(&args.file, &mut ProgrammerProgress::default())?)
}
