use std::fs;
use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::io::{stdout, Write};

use anyhow::{Context, bail};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use crossterm::{
    event::{read, Event, KeyCode, KeyEvent, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::Level;

use recfile::shell;
use recfile::shell::Command;
use recfile::OpenMode;
use recfile::Padding;
use recfile::StructuredFile;
use recfile::StructuredFileBuilder;

#[derive(Debug)]
struct Config {
    name: String,
    h: bool,
    v: bool,
    mode: OpenMode,
    padding: Padding,
    script: String,
    file: Option<PathBuf>,
    schema: Vec<String>,
}

fn main() {
    let result =
        parse_config(std::env::args())
        .and_then(run);

    if let Err(err) = result {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn parse_config(mut iter: impl Iterator<Item = String>) -> Result<Config, anyhow::Error> {
    let name =
        iter
        .next()
        .unwrap_or_else(|| "recfile".to_string());

    let mut result = Config {
        name,
        h: false,
        v: false,
        mode: OpenMode::Read,
        padding: Padding::Separator,
        script: String::new(),
        file: None,
        schema: vec![],
    };

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                result.h = true;
            },
            "-v" => {
                result.v = true;
            },
            "-w" => {
                result.mode = OpenMode::ReadWrite;
            },
            "-n" => {
                result.mode = OpenMode::Create;
            },
            "-p" => {
                result.padding = Padding::Packed;
            },
            "-f" => {
                if let Some(path) = iter.next() {
                    let s = fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path))?;

                    result.script.push_str(&s);
                    result.script.push('\n');
                } else {
                    bail!("expected command file after '-f'");
                }
            },
            "-s" => {
                if let Some(s) = iter.next() {
                    result.script.push_str(&s);
                    result.script.push('\n');
                } else {
                    bail!("expected commands after '-s'");
                }
            },
            other if other.starts_with('-') && other.len() > 1 => {
                bail!("unknown flag '{}'\n\n{}", other, help(&result.name));
            },
            positional if result.file.is_none() => {
                result.file = Some(PathBuf::from(positional));
            },
            positional => {
                result.schema.push(positional.to_string());
            },
        }
    }

    Ok(result)
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cfg: Config) -> Result<(), anyhow::Error> {
    if cfg.h {
        println!("{}", help(&cfg.name));
        return Ok(())
    }

    init_logging(cfg.v);

    let Some(path) = cfg.file.as_ref() else {
        bail!("expected a record file, see '-h'")
    };

    if cfg.schema.is_empty() {
        bail!("expected at least one field type after the file name")
    }

    let file =
        StructuredFileBuilder::new(cfg.schema.as_slice())
        .mode(cfg.mode)
        .padding(cfg.padding)
        .open(path)
        .with_context(|| format!("could not open {}", path.display()))?;

    if cfg.script.is_empty() {
        file.scoped(run_repl)
    } else {
        file.scoped(|file| run_batch(&cfg.script, file))
    }
}

fn run_batch(script: &str, file: &mut StructuredFile<File>) -> Result<(), anyhow::Error> {
    for (number, line) in script.lines().enumerate() {
        let command =
            Command::parse(line)
            .with_context(|| format!("line {}", number + 1))?;

        let Some(command) = command else {
            continue
        };

        let lines =
            shell::execute(file, &command)
            .with_context(|| format!("line {}: {}", number + 1, line.trim()))?;

        lines
        .into_iter()
        .for_each(|line| {
            println!("{}", line);
        });
    }

    Ok(())
}

fn run_repl(file: &mut StructuredFile<File>) -> Result<(), anyhow::Error> {
    let mut rl = DefaultEditor::new()?;

    println!("Welcome to the recfile repl");
    println!("{}: {}", file, file.layout());

    let history_path: PathBuf;

    if let Ok(xdg) = env::var("XDG_CACHE_HOME") {
        history_path = PathBuf::from(xdg).join("recfile").join("history");
    } else if let Ok(home) = env::var("HOME") {
        history_path = PathBuf::from(home)
            .join(".cache")
            .join("recfile")
            .join("history");

    } else {
        history_path = PathBuf::from("recfile_history");
    }

    if let Some(dir) = history_path.parent() {
        fs::create_dir_all(dir)?;
    }

    if rl.load_history(&history_path).is_err() {
        // no previous history
        println!("Starting new history file");
    }

    println!("Type in a command, e.g. 'len', 'get -1', 'get 0:10', 'dump'.");

    'toplevel: loop {
        let readline = rl.readline("recfile> ");
        match readline {
            Ok(line) => {
                rl.add_history_entry(&line)?;

                let command = match Command::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue 'toplevel,
                    Err(err) => {
                        eprintln!("{}", err);
                        continue 'toplevel
                    }
                };

                if command == Command::Dump {
                    if page_records(file)? {
                        break 'toplevel
                    }
                    continue 'toplevel
                }

                match shell::execute(file, &command) {
                    Ok(lines) => lines.iter().for_each(|line| println!("{}", line)),
                    Err(err) => eprintln!("{}", err),
                }
            },
            Err(ReadlineError::Interrupted) => {
                // cancels current line
                continue 'toplevel
            },
            Err(ReadlineError::Eof) => {
                break 'toplevel
            },
            Err(err) => {
                return Err(err.into())
            }
        }
    }

    rl
    .save_history(&history_path)
    .context("could not save history")?;

    Ok(())
}

/// Prints records from the cursor one key press at a time. Returns true when
/// the user asked to leave the repl altogether.
fn page_records(file: &mut StructuredFile<File>) -> Result<bool, anyhow::Error> {
    enable_raw_mode()?;
    let result = page_records_raw(file);
    disable_raw_mode()?;
    result
}

fn page_records_raw(file: &mut StructuredFile<File>) -> Result<bool, anyhow::Error> {
    let mut seen = false;
    let mut quit = false;

    for record in file.iter() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                print!("{}\r\n", err);
                break
            }
        };

        if !seen {
            print!("Press CTRL-C to stop, any other key will fetch the next record\r\n");
            seen = true;
        }
        print!("{}\r\n", record);
        stdout().flush()?;

        // wait for a single key press
        if let Event::Key(KeyEvent { code, modifiers, .. }) = read()? {
            match (code, modifiers) {
                (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                    break
                }
                (KeyCode::Char('d'), m) if m.contains(KeyModifiers::CONTROL) => {
                    quit = true;
                    break
                }
                _ => {}
            }
        }
    }

    Ok(quit)
}

fn help(program: &str) -> String {
    let mut result = String::new();
    result.push_str("program path: ");
    result.push_str(program);
    result.push('\n');
    result.push_str("usage: ");
    result.push_str("<program> [ options ] <file> <type>...\n");
    result.push('\n');
    result.push_str("Opens a file of fixed width records described by the field\n");
    result.push_str("types. Without '-s' or '-f' a repl is started on the file.\n");
    result.push('\n');
    result.push_str("Options:\n");
    result.push_str("-h:            help\n");
    result.push_str("-v:            verbose (debug info)\n");
    result.push_str("-w:            open for reading and writing\n");
    result.push_str("-n:            create the file, truncating an existing one\n");
    result.push_str("-p:            packed records (no separator byte between fields)\n");
    result.push_str("-f file:       run commands from file\n");
    result.push_str("-s '...':      run commands from string\n");
    result.push('\n');
    result.push_str("Types:\n");
    result.push_str("integer long float double real char boolean string\n");
    result.push('\n');
    result.push_str("Commands:\n");
    result.push_str("len | tell | eof | info | read | dump\n");
    result.push_str("seek N [abs|cur|end] | forward N | backward N | tail [N]\n");
    result.push_str("get N | get A:B[:S]\n");
    result.push_str("set N v... | set A:B[:S] v... | write v... | append v...\n");
    result.push_str("contains v...\n");
    result
}
