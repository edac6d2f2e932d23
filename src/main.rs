
extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;
extern crate bcasm;

use bcasm::assembler::{self, Assembler, JumpMode, SaveTarget};
use bcasm::assembler::bytecode::{BytecodeObject, StructureId, StructureType, SubroutineId};
use bcasm::assembler::diagnostics::{LogCrateListener, NullTranslator};
use bcasm::assembler::opcodes::InstructionTable;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

/// Writes a human-readable listing of every saved element.
struct Listing<'a> {
    table: &'a InstructionTable,
    out: Box<dyn Write>,
    print_debug: bool,
}

impl<'a> SaveTarget for Listing<'a> {
    fn save_subroutine(&mut self, id: SubroutineId, code: &BytecodeObject) -> assembler::Result<()> {
        writeln!(self.out, "{} {} (#{}): {}..{} args{}",
            if code.is_procedure() { "sub" } else { "function" },
            if code.name().is_empty() { "-" } else { code.name() },
            id.index(),
            code.min_args(),
            code.max_args(),
            if code.is_varargs() { ", varargs" } else { "" })?;
        if !code.file_name().is_empty() {
            writeln!(self.out, "  file:     {}", code.file_name())?;
        }
        writeln!(self.out, "  locals:   {}", code.local_names().join(", "))?;
        writeln!(self.out, "  names:    {}", code.names().join(", "))?;
        for (idx, lit) in code.literals().iter().enumerate() {
            writeln!(self.out, "  lit {:4}: {}", idx, lit)?;
        }
        for (idx, insn) in code.code().iter().enumerate() {
            writeln!(self.out, "  {:04}  {}", idx, self.table.disassemble(insn))?;
        }

        if self.print_debug {
            let mut grid = Grid::new(GridOptions {
                filling:     Filling::Spaces(1),
                direction:   Direction::LeftToRight,
            });

            for (idx, insn) in code.code().iter().enumerate() {
                grid.add(Cell::from(format!("0x{:04X}:", idx)));
                grid.add(Cell::from(self.table.disassemble(insn)));
                grid.add(Cell::from("=>".to_string()));
                grid.add(Cell::from(format!("{:02X} {:02X} {:04X}", insn.major, insn.minor, insn.arg)));
            }

            println!("{}", grid.fit_into_columns(4));
        }
        Ok(())
    }

    fn save_structure(&mut self, id: StructureId, ty: &StructureType) -> assembler::Result<()> {
        writeln!(self.out, "struct {} (#{}): {}", ty.name(), id.index(), ty.fields().join(", "))?;
        Ok(())
    }
}

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    debug!("Arguments:\n\tVerbosity: {}\n\tCheck Only: {}\n\tSymbolic Jumps: {}\n\tOutfile: {}\n\tInfile: {}",
        match args.occurrences_of("verbose") {
            0 => log::LevelFilter::Error.to_string(),
            1 => log::LevelFilter::Warn.to_string(),
            2 => log::LevelFilter::Info.to_string(),
            3 => log::LevelFilter::Debug.to_string(),
            _ => log::LevelFilter::Trace.to_string(),
        },
        args.is_present("check"),
        args.is_present("symbolic"),
        args.value_of("output").unwrap_or("None"),
        args.value_of("INPUT").unwrap()
    );

    let ifile = args.value_of("INPUT").unwrap();
    let ipath = Path::new(ifile);

    let ifile = match File::open(&ipath) {
        Err(err) => {
            error!("fatal: unable to open input file `{}`: {}", ipath.display(), err);
            std::process::exit(1);
        },
        Ok(file) => file,
    };

    let mut asm = Assembler::new(BufReader::new(ifile));
    if args.is_present("symbolic") {
        asm.set_jump_mode(JumpMode::Symbolic);
    }

    if let Err(err) = asm.compile() {
        error!("{}: {}", ipath.display(), err);
        std::process::exit(1);
    }

    if let Err(err) = asm.finish(&mut LogCrateListener, &NullTranslator) {
        error!("{}: {}", ipath.display(), err);
        std::process::exit(1);
    }

    if args.is_present("check") {
        info!("{}: ok", ipath.display());
        return;
    }

    let out: Box<dyn Write> = if let Some(filename) = args.value_of("output") {
        match File::create(filename) {
            Err(err) => {
                error!("fatal: unable to open output file `{}`: {}", filename, err);
                std::process::exit(1);
            },
            Ok(file) => Box::new(file),
        }
    } else {
        Box::new(io::stdout())
    };

    let mut listing = Listing {
        table: asm.instruction_table(),
        out,
        print_debug: args.is_present("print-debug"),
    };

    match asm.save_to(&mut listing) {
        Ok(handle) => info!("entry point is {}", asm.subroutine(handle).name()),
        Err(err) => {
            error!("{}: {}", ipath.display(), err);
            std::process::exit(1);
        }
    }
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(option_env!("CARGO_PKG_NAME").unwrap())
        .version(option_env!("CARGO_PKG_VERSION").unwrap())
        .author(option_env!("CARGO_PKG_AUTHORS").unwrap())
        .about(option_env!("CARGO_PKG_DESCRIPTION").unwrap())
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
            .help("write the listing to an outfile"))
        .arg(Arg::with_name("check")
            .short("c")
            .takes_value(false)
            .help("check only, do not write a listing"))
        .arg(Arg::with_name("symbolic")
            .short("j")
            .takes_value(false)
            .help("assemble jumps symbolically until a .jumps directive says otherwise"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .alias("show")
            .alias("s")
            .takes_value(false)
            .help("prints the raw encoding of every instruction to STDOUT"))
        .get_matches()
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
        .level(match verbosity {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .chain(std::io::stderr())
        .apply().ok();
}
