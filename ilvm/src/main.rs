use clap::{ArgAction, Parser as ClapParser, Subcommand};
use std::{error::Error, fs, path::PathBuf, process, sync::Arc};

use ilvm::{Interpreter, InterpreterSettings, MetadataImage, MethodBody, Program, Value, demo};
use ilvm_bytecode::BytecodeDecoder;

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Abort after executing this many instructions
    #[arg(long, global = true)]
    max_instructions: Option<u64>,

    /// Raise the log level (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the built-in primality test for a candidate
    Prime { candidate: u8 },
    /// Print a line through the console plug
    Hello {
        #[arg(default_value = "Hello, world!")]
        text: String,
    },
    /// Run a raw method body read from a file
    Run {
        file: PathBuf,
        #[arg(long, default_value_t = 8, help = "Maximum evaluation stack depth")]
        max_stack: u16,
        #[arg(long, default_value_t = 0, help = "Number of locals")]
        locals: u16,
    },
    /// Print the instructions of a raw method body
    Disasm { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = execute(&cli) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn execute(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let settings = InterpreterSettings {
        max_instructions: cli.max_instructions,
    };

    match &cli.command {
        Command::Prime { candidate } => {
            let program = Program::new(
                demo::primality_program(*candidate),
                Arc::new(MetadataImage::new()),
            );
            run_program(settings, program)
        }
        Command::Hello { text } => run_program(settings, demo::hello_program(text)?),
        Command::Run {
            file,
            max_stack,
            locals,
        } => {
            let code = fs::read(file)
                .map_err(|err| format!("reading {}: {err}", file.display()))?;
            let body = MethodBody::new(code, *max_stack, *locals);
            run_program(settings, Program::new(body, Arc::new(MetadataImage::new())))
        }
        Command::Disasm { file } => {
            let code = fs::read(file)
                .map_err(|err| format!("reading {}: {err}", file.display()))?;
            disassemble(&code)
        }
    }
}

fn run_program(settings: InterpreterSettings, program: Program) -> Result<(), Box<dyn Error>> {
    let mut interpreter = Interpreter::new(settings);
    interpreter.load(program);
    let result = interpreter.run()?;
    log::debug!(
        "executed {} instruction(s)",
        interpreter.executed_instructions()
    );

    match result {
        Some(value @ Value::String(_)) => match interpreter.resolve_string(value) {
            Some(text) => println!("{text:?}"),
            None => println!("{value}"),
        },
        Some(value) => println!("{value}"),
        None => println!("(void)"),
    }
    Ok(())
}

fn disassemble(code: &[u8]) -> Result<(), Box<dyn Error>> {
    let mut decoder = BytecodeDecoder::new(code);
    while !decoder.is_at_end() {
        let offset = decoder.offset();
        let listing = decoder.decode_listing()?;
        match listing.instruction.branch_offset() {
            Some(delta) => {
                let target = decoder.offset() as i64 + i64::from(delta);
                let text = listing.to_string();
                println!("{offset:04x}: {text:<16} ; -> {target:04x}");
            }
            None => println!("{offset:04x}: {listing}"),
        }
    }
    Ok(())
}
