//! Z-Template CLI
//!
//! Usage:
//!   z-template [OPTIONS] <COMMAND>
//!
//! Commands:
//!   tokens   Print the token tree of an instruction list
//!   prepare  Print the normalised command of every instruction
//!   render   Render one element and print its markup
//!   diff     Print the edit plan between two key lists

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use z_template::{
    prepare_each, reconcile, tokenize, Callbacks, Context, Edit, Element, EngineConfig, Projector,
    Token, TokenKind, Value,
};

const SOURCE_NAME: &str = "<instructions>";

#[derive(Parser)]
#[command(name = "z-template")]
#[command(about = "Data-binding instruction engine")]
struct Cli {
    /// Engine configuration file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token tree of an instruction list
    Tokens {
        /// Instruction list, as written in the attribute
        source: String,
    },

    /// Print the normalised command of every instruction
    Prepare {
        source: String,

        /// Data context (JSON, or TOML with a .toml extension)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Render one element and print its markup
    Render {
        source: String,

        /// Element tag
        #[arg(long, default_value = "div")]
        tag: String,

        /// Initial text content
        #[arg(long)]
        text: Option<String>,

        /// Initial attribute as name=value (repeatable)
        #[arg(long = "attr", value_name = "NAME=VALUE")]
        attributes: Vec<String>,

        /// Data context (JSON, or TOML with a .toml extension)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Print the edit plan between two comma-separated key lists
    Diff {
        #[arg(long, default_value = "")]
        previous: String,

        #[arg(long, default_value = "")]
        current: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose && std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let config = match &cli.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let ok = match cli.command {
        Commands::Tokens { source } => print_tokens(&source),
        Commands::Prepare { source, data } => {
            let data = load_data_or_exit(data.as_deref());
            print_commands(&source, &Context::new(&data))
        }
        Commands::Render {
            source,
            tag,
            text,
            attributes,
            data,
        } => {
            let data = load_data_or_exit(data.as_deref());
            render_element(&config, &source, tag, text, &attributes, &Context::new(&data))
        }
        Commands::Diff { previous, current } => {
            print_plan(&split_keys(&previous), &split_keys(&current));
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
}

fn load_data(path: &Path) -> Result<Value, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str::<Value>(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str::<serde_json::Value>(&content)
            .map(Value::from)
            .map_err(|e| e.to_string())
    }
}

fn load_data_or_exit(path: Option<&Path>) -> Value {
    let Some(path) = path else {
        return Value::Null;
    };
    match load_data(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error reading data '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn print_token(token: &Token, depth: usize) {
    let indent = "  ".repeat(depth);
    match &token.kind {
        TokenKind::Block(block) => {
            println!(
                "{}block {} {}..{}",
                indent,
                block.delimiter.open(),
                token.span.start,
                token.span.end
            );
            for child in &block.tokens {
                print_token(child, depth + 1);
            }
        }
        _ => println!(
            "{}{} {}..{}",
            indent,
            token.describe(),
            token.span.start,
            token.span.end
        ),
    }
}

fn print_tokens(source: &str) -> bool {
    for instruction in tokenize(source) {
        println!("{}", instruction.source);
        for token in &instruction.tokens {
            print_token(token, 1);
        }
    }
    true
}

fn print_commands(source: &str, context: &Context) -> bool {
    let mut ok = true;
    for result in prepare_each(source, context) {
        match result {
            Ok(command) => println!("{}", command),
            Err(err) => {
                eprint!("{}", err.format(source, SOURCE_NAME));
                ok = false;
            }
        }
    }
    ok
}

fn render_element(
    config: &EngineConfig,
    source: &str,
    tag: String,
    text: Option<String>,
    attributes: &[String],
    context: &Context,
) -> bool {
    let mut element = Element::new(tag);
    for pair in attributes {
        match pair.split_once('=') {
            Some((name, value)) => element.set_attribute(name.trim(), value),
            None => element.set_attribute(pair.trim(), ""),
        }
    }
    if let Some(text) = text {
        element.set_text(text);
    }
    element.set_attribute(config.attributes.instruction.clone(), source);

    let mut callbacks = Callbacks::new();
    let report = Projector::new(config.clone()).render(&mut element, context, &mut callbacks);

    for err in &report.errors {
        eprint!("{}", err.format(source, SOURCE_NAME));
    }
    for err in &report.dispatch_errors {
        eprintln!("Error: {}", err);
    }
    println!("{}", element);
    for event in callbacks.take_events() {
        println!("event {} on <{}> value={}", event.name, event.target, event.value);
    }
    report.is_clean()
}

fn split_keys(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

fn print_plan(previous: &[String], current: &[String]) {
    let previous: Vec<(String, String)> = previous.iter().map(|k| (k.clone(), k.clone())).collect();
    let current: Vec<(String, String)> = current.iter().map(|k| (k.clone(), k.clone())).collect();
    for edit in reconcile(previous, current) {
        match edit {
            Edit::Reuse { item, .. } => println!("reuse  {}", item),
            Edit::Add(item) => println!("add    {}", item),
            Edit::Remove(instance) => println!("remove {}", instance),
        }
    }
}
