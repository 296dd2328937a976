use clap::{ArgAction, Parser, ValueHint};
use log::{info, LevelFilter};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use wasm_interp::parser::module::Module;
use wasm_interp::runtime::Value;
use wasm_interp::{instantiate, invoke, wat};

/// Decode, instantiate and run a WebAssembly module
#[derive(Debug, clap::Parser)]
struct Options {
    /// A `.wasm` binary, or `.wat` text
    #[clap(value_hint = ValueHint::FilePath)]
    pub path: PathBuf,
    /// Export to invoke after instantiation
    #[clap(long, value_name = "NAME")]
    pub invoke: Option<String>,
    /// Arguments for the invoked export, as `type:value` (e.g. `i32:7`)
    #[clap(requires = "invoke", value_name = "ARGS")]
    pub args: Vec<String>,
    /// Print the module in text form instead of running it
    #[clap(long, conflicts_with = "invoke")]
    pub print: bool,
    /// Enables verbose logging
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let opts = Options::parse();

    let level = match opts.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    if let Err(e) = run(&opts) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(opts: &Options) -> Result<(), Box<dyn Error>> {
    let module = load(&opts.path)?;
    info!("loaded {}: {module}", opts.path.display());

    if opts.print {
        print!("{}", wat::module_to_text(&module));
        return Ok(());
    }

    let mut store = instantiate(&module)?;

    match &opts.invoke {
        Some(name) => {
            let args = opts.args.iter().map(|arg| parse_arg(arg)).collect::<Result<Vec<_>, _>>()?;
            for result in invoke(&module, &mut store, name, &args)? {
                println!("{result}");
            }
        }
        None => println!("{module}"),
    }
    Ok(())
}

fn load(path: &Path) -> Result<Module, Box<dyn Error>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("wat") => {
            let source = fs::read_to_string(path)?;
            Ok(wat::parse(&source)?)
        }
        _ => Ok(wasm_interp::parse_file(path)?),
    }
}

fn parse_arg(arg: &str) -> Result<Value, String> {
    let (typ, value) = arg
        .split_once(':')
        .ok_or_else(|| format!("argument must be written as type:value, got {arg}"))?;
    Value::from_strings(typ, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg("i32:7").unwrap(), Value::I32(7));
        assert_eq!(parse_arg("i64:-1").unwrap(), Value::I64(-1));
        assert_eq!(parse_arg("f64:1.5").unwrap(), Value::F64(1.5));
        assert!(parse_arg("7").is_err());
        assert!(parse_arg("v128:0").is_err());
    }

    #[test]
    fn test_options() {
        let opts = Options::try_parse_from(["wasm-interp", "-vv", "fact.wat", "--invoke", "fact", "i64:5"]).unwrap();
        assert_eq!(opts.verbose, 2);
        assert_eq!(opts.invoke.as_deref(), Some("fact"));
        assert_eq!(opts.args, vec!["i64:5"]);
        assert!(Options::try_parse_from(["wasm-interp", "m.wasm", "i32:1"]).is_err());
    }
}
