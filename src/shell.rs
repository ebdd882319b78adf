//! Line oriented commands over one open record file, shared by the REPL and
//! batch modes of the binary.

use std::io::Read;
use std::io::Seek;
use std::io::Write;

use crate::errors::RecfileError;
use crate::errors::Result;
use crate::storage::addressing::SeekMode;
use crate::storage::file::StructuredFile;
use crate::storage::layout::Layout;
use crate::storage::record::Value;
use crate::storage::slice::RecordSlice;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Position(i64),
    Slice(RecordSlice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Len,
    Tell,
    Eof,
    Info,
    Seek(i64, SeekMode),
    Forward(i64),
    Backward(i64),
    Tail(i64),
    Get(Target),
    Read,
    Set(Target, Vec<String>),
    Write(Vec<String>),
    Append(Vec<String>),
    Contains(Vec<String>),
    Dump,
}

impl Command {
    /// Parses one line. Blank lines and `#` comments give `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let tokens = tokenize(line)?;
        let (name, args) = match tokens.split_first() {
            Some((name, args)) => (name.as_str(), args),
            None => return Ok(None),
        };

        let command = match name {
            "len" => Command::Len,
            "tell" => Command::Tell,
            "eof" => Command::Eof,
            "info" => Command::Info,
            "read" => Command::Read,
            "dump" => Command::Dump,
            "seek" => {
                let position = parse_position(required(args, 0, "seek")?)?;
                let mode = match args.get(1) {
                    Some(mode) => mode.parse()?,
                    None => SeekMode::Absolute,
                };
                Command::Seek(position, mode)
            },
            "forward" => Command::Forward(parse_position(required(args, 0, "forward")?)?),
            "backward" => Command::Backward(parse_position(required(args, 0, "backward")?)?),
            "tail" => {
                let n = match args.first() {
                    Some(n) => parse_position(n)?,
                    None => 0,
                };
                Command::Tail(n)
            },
            "get" => Command::Get(parse_target(required(args, 0, "get")?)?),
            "set" => {
                let target = parse_target(required(args, 0, "set")?)?;
                Command::Set(target, args[1..].to_vec())
            },
            "write" => Command::Write(args.to_vec()),
            "append" => Command::Append(args.to_vec()),
            "contains" => Command::Contains(args.to_vec()),
            _ => return Err(RecfileError::CLIError(format!("unknown command: {}", name))),
        };

        Ok(Some(command))
    }
}

/// Runs a command and returns the lines it prints.
pub fn execute<S>(file: &mut StructuredFile<S>, command: &Command) -> Result<Vec<String>>
where
    S: Read + Write + Seek,
{
    let lines: Vec<String> = match command {
        Command::Len => vec![file.len()?.to_string()],
        Command::Tell => vec![file.tell()?.to_string()],
        Command::Eof => vec![file.eof()?.to_string()],
        Command::Info => {
            let len = file.len()?;
            vec![
                format!("file:    {}", file),
                format!("layout:  {}", file.layout()),
                format!("records: {}", len),
            ]
        },
        Command::Seek(position, mode) => vec![file.seek(*position, *mode)?.to_string()],
        Command::Forward(n) => vec![file.forward(*n)?.to_string()],
        Command::Backward(n) => vec![file.backward(*n)?.to_string()],
        Command::Tail(n) => vec![file.tail(*n)?.to_string()],
        Command::Get(Target::Position(position)) => vec![file.get(*position)?.to_string()],
        Command::Get(Target::Slice(slice)) => {
            file
            .get_slice(*slice)?
            .iter()
            .map(|record| record.to_string())
            .collect()
        },
        Command::Read => vec![file.read()?.to_string()],
        Command::Set(target, args) => {
            let values = parse_values(file.layout(), args)?;
            match target {
                Target::Position(position) => file.set(*position, &values)?,
                Target::Slice(slice) => file.set_slice(*slice, &values)?,
            }
            vec![]
        },
        Command::Write(args) => {
            let values = parse_values(file.layout(), args)?;
            file.write(&values)?;
            vec![]
        },
        Command::Append(args) => {
            let values = parse_values(file.layout(), args)?;
            vec![file.append(&values)?.to_string()]
        },
        Command::Contains(args) => {
            let values = parse_values(file.layout(), args)?;
            vec![file.contains(&values)?.to_string()]
        },
        Command::Dump => {
            file
            .iter()
            .map(|record| record.map(|r| r.to_string()))
            .collect::<Result<Vec<_>>>()?
        },
    };

    Ok(lines)
}

/// Parses one value per schema field.
pub fn parse_values(layout: &Layout, args: &[String]) -> Result<Vec<Value>> {
    if args.len() != layout.field_count() {
        return Err(RecfileError::EncodingError(
            format!("expected {} values, got {}", layout.field_count(), args.len())
        ));
    }

    layout
        .fields()
        .iter()
        .zip(args)
        .map(|(field, arg)| Value::parse(*field, arg))
        .collect()
}

fn required<'a>(args: &'a [String], index: usize, command: &str) -> Result<&'a str> {
    args
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| RecfileError::CLIError(format!("{}: missing argument", command)))
}

fn parse_position(token: &str) -> Result<i64> {
    token
        .parse::<i64>()
        .map_err(|_| RecfileError::TypeMismatch(format!("position '{}' is not an integer", token)))
}

fn parse_target(token: &str) -> Result<Target> {
    if token.contains(':') {
        Ok(Target::Slice(token.parse()?))
    } else {
        Ok(Target::Position(parse_position(token)?))
    }
}

/// Splits on whitespace; double quotes group a token and may hold spaces.
fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = vec![];
    let mut current = String::new();
    let mut quoted = false;
    let mut in_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            },
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            },
            c => {
                current.push(c);
                in_token = true;
            },
        }
    }

    if quoted {
        return Err(RecfileError::CLIError("unterminated quote".to_string()));
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::storage::file::StructuredFileBuilder;

    fn run(file: &mut StructuredFile<Cursor<Vec<u8>>>, line: &str) -> Result<Vec<String>> {
        let command = Command::parse(line)?.expect("command");
        execute(file, &command)
    }

    #[test]
    fn it_tokenizes_quoted_values() {
        let tokens = tokenize(r#"append "two words" 3 """#).unwrap();
        assert_eq!(tokens, vec!["append", "two words", "3", ""]);
        assert!(tokenize("append \"open").is_err());
    }

    #[test]
    fn it_parses_commands() {
        assert_eq!(Command::parse("  ").unwrap(), None);
        assert_eq!(Command::parse("# note").unwrap(), None);
        assert_eq!(
            Command::parse("seek -1 end").unwrap(),
            Some(Command::Seek(-1, SeekMode::FromEnd)),
        );
        assert_eq!(Command::parse("tail").unwrap(), Some(Command::Tail(0)));
        assert_eq!(
            Command::parse("get 1:3").unwrap(),
            Some(Command::Get(Target::Slice(RecordSlice::from(1i64..3)))),
        );
        assert!(matches!(Command::parse("jump 3"), Err(RecfileError::CLIError(_))));
    }

    #[test]
    fn it_rejects_non_integer_positions() {
        assert!(matches!(Command::parse("seek x"), Err(RecfileError::TypeMismatch(_))));
        assert!(matches!(Command::parse("get 1.5"), Err(RecfileError::TypeMismatch(_))));
    }

    #[test]
    fn it_runs_a_session() {
        let mut file =
            StructuredFileBuilder::new(&["char", "integer", "string"])
            .with_storage("mem", Cursor::new(Vec::new()))
            .unwrap();

        assert_eq!(run(&mut file, "append A 1 \"first turn\"").unwrap(), vec!["0"]);
        assert_eq!(run(&mut file, "append B 2 second").unwrap(), vec!["1"]);
        assert_eq!(run(&mut file, "append C 3 third").unwrap(), vec!["2"]);
        assert_eq!(run(&mut file, "len").unwrap(), vec!["3"]);

        assert_eq!(run(&mut file, "get -1").unwrap(), vec!["('C', 3, \"third\")"]);
        assert_eq!(run(&mut file, "set 0:2 Z 0 reset").unwrap(), Vec::<String>::new());
        assert_eq!(
            run(&mut file, "get ::2").unwrap(),
            vec!["('Z', 0, \"reset\")", "('C', 3, \"third\")"],
        );

        assert_eq!(run(&mut file, "seek 1").unwrap(), vec!["1"]);
        assert_eq!(run(&mut file, "contains C 3 third").unwrap(), vec!["true"]);
        assert_eq!(run(&mut file, "tell").unwrap(), vec!["1"]);
        assert_eq!(run(&mut file, "dump").unwrap().len(), 2);
        assert_eq!(run(&mut file, "eof").unwrap(), vec!["true"]);

        assert!(matches!(run(&mut file, "append A x y"), Err(RecfileError::EncodingError(_))));
        assert!(matches!(run(&mut file, "append A 1"), Err(RecfileError::EncodingError(_))));
        assert!(matches!(run(&mut file, "get 3"), Err(RecfileError::OutOfRange { .. })));
    }
}
