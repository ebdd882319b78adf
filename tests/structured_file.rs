use std::fs;
use std::path::Path;

use tempfile::tempdir;

use recfile::errors::RecfileError;
use recfile::OpenMode;
use recfile::Padding;
use recfile::Record;
use recfile::SeekMode;
use recfile::StructuredFile;
use recfile::StructuredFileBuilder;
use recfile::Value;

const TURNS: [&str; 2] = ["char", "integer"];

fn turn(c: u8, n: i32) -> Vec<Value> {
    vec![Value::Char(c), Value::Integer(n)]
}

fn create(path: &Path, records: &[Vec<Value>]) {
    let mut file = StructuredFile::open(path, &TURNS, OpenMode::Create).unwrap();
    for record in records {
        file.write(record).unwrap();
    }
    file.close().unwrap();
}

fn abcd(path: &Path) {
    create(path, &[turn(b'A', 1), turn(b'B', 2), turn(b'C', 3), turn(b'D', 4)]);
}

#[test]
fn it_writes_the_separated_layout_byte_for_byte() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("turns.dat");
    create(&path, &[turn(b'A', 7)]);

    let bytes = fs::read(&path).unwrap();
    let mut expected = vec![b'A', 0];
    expected.extend_from_slice(&7i32.to_ne_bytes());
    assert_eq!(bytes, expected);
}

#[test]
fn it_reads_files_written_by_other_tools() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("turns.dat");

    let mut bytes = vec![];
    for (c, n) in [(b'x', 10i32), (b'y', -20)] {
        bytes.push(c);
        bytes.push(0xff); // separator content is ignored
        bytes.extend_from_slice(&n.to_ne_bytes());
    }
    fs::write(&path, bytes).unwrap();

    let mut file = StructuredFile::open(&path, &TURNS, OpenMode::Read).unwrap();
    assert_eq!(file.len().unwrap(), 2);
    assert_eq!(file.get(1).unwrap(), turn(b'y', -20)[..]);
}

#[test]
fn it_packs_records_when_configured() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("packed.dat");

    let mut file =
        StructuredFileBuilder::new(&TURNS)
        .mode(OpenMode::Create)
        .padding(Padding::Packed)
        .open(&path)
        .unwrap();
    file.append(&turn(b'A', 1)).unwrap();
    file.append(&turn(b'B', 2)).unwrap();
    file.close().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 10);
}

#[test]
fn it_keeps_length_stable_across_cursor_restoring_calls() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("turns.dat");

    let mut file = StructuredFile::open(&path, &TURNS, OpenMode::Create).unwrap();
    for n in 0..5 {
        file.write(&turn(b'a', n)).unwrap();
        assert_eq!(file.len().unwrap(), n as u64 + 1);
    }

    file.get(2).unwrap();
    file.contains(&turn(b'a', 4)).unwrap();
    file.seek(-1, SeekMode::Absolute).unwrap();
    file.get_slice(1i64..4).unwrap();
    assert_eq!(file.len().unwrap(), 5);
}

#[test]
fn it_resolves_tail_redirection_like_from_end() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("turns.dat");
    abcd(&path);

    let mut file = StructuredFile::open(&path, &TURNS, OpenMode::Read).unwrap();
    let redirected = file.seek(-1, SeekMode::Absolute).unwrap();
    let from_end = file.tail(1).unwrap();
    assert_eq!(redirected, from_end);
    assert_eq!(redirected, 3);
}

#[test]
fn it_rejects_one_past_either_end() {
    let dir = tempdir().unwrap();

    for len in 0..4 {
        let path = dir.path().join(format!("len{}.dat", len));
        let records: Vec<Vec<Value>> = (0..len).map(|n| turn(b'r', n)).collect();
        create(&path, &records);

        let mut file = StructuredFile::open(&path, &TURNS, OpenMode::Read).unwrap();
        let len = len as i64;
        assert!(matches!(file.seek(len, SeekMode::Absolute), Err(RecfileError::OutOfRange { .. })));
        assert!(matches!(file.seek(-len - 1, SeekMode::Absolute), Err(RecfileError::OutOfRange { .. })));
    }
}

#[test]
fn it_broadcasts_one_record_over_a_slice() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("turns.dat");
    abcd(&path);

    let mut file = StructuredFile::open(&path, &TURNS, OpenMode::ReadWrite).unwrap();
    let middle = file.get_slice(1i64..3).unwrap();
    assert_eq!(middle, vec![Record::from(turn(b'B', 2)), Record::from(turn(b'C', 3))]);

    file.set_slice(0i64..2, &turn(b'V', 0)).unwrap();
    file.close().unwrap();

    let mut file = StructuredFile::open(&path, &TURNS, OpenMode::Read).unwrap();
    let all: Vec<Record> = file.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(all, vec![
        Record::from(turn(b'V', 0)),
        Record::from(turn(b'V', 0)),
        Record::from(turn(b'C', 3)),
        Record::from(turn(b'D', 4)),
    ]);
}

#[test]
fn it_stops_iterating_after_the_last_whole_record() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("turns.dat");
    abcd(&path);

    // a trailing partial record stops iteration without an error
    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(&[b'E', 0, 1]);
    fs::write(&path, bytes).unwrap();

    let mut file = StructuredFile::open(&path, &TURNS, OpenMode::Read).unwrap();
    let mut count = 0;
    for record in &mut file {
        record.unwrap();
        count += 1;
    }
    assert_eq!(count, 4);
    assert!(file.iter().next().is_none());
}

#[test]
fn it_restores_the_cursor_after_a_membership_test() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("turns.dat");
    abcd(&path);

    let mut file = StructuredFile::open(&path, &TURNS, OpenMode::Read).unwrap();
    file.seek(1, SeekMode::Absolute).unwrap();
    assert!(file.contains(&turn(b'D', 4)).unwrap());
    assert_eq!(file.tell().unwrap(), 1);
    assert!(!file.contains(&turn(b'E', 5)).unwrap());
    assert_eq!(file.tell().unwrap(), 1);
}

#[test]
fn it_passes_storage_errors_through() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("turns.dat");

    let err = StructuredFile::open(&path, &TURNS, OpenMode::Read).unwrap_err();
    assert!(matches!(err, RecfileError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));

    abcd(&path);
    let mut file = StructuredFile::open(&path, &TURNS, OpenMode::Read).unwrap();
    assert!(matches!(file.set(0, &turn(b'Z', 0)), Err(RecfileError::Io(_))));
}

#[test]
fn it_fails_to_open_with_an_unknown_field_type() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("turns.dat");
    abcd(&path);

    let err = StructuredFile::open(&path, &["char", "short"], OpenMode::Read).unwrap_err();
    assert!(matches!(err, RecfileError::UnknownFieldType(tag) if tag == "short"));
}

#[test]
fn it_rewinds_on_scope_entry_and_releases_on_exit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("turns.dat");

    let written = StructuredFileBuilder::new(&TURNS)
        .mode(OpenMode::Create)
        .scoped(&path, |file| {
            file.append(&turn(b'A', 1))?;
            file.append(&turn(b'B', 2))?;
            file.len()
        })
        .unwrap();
    assert_eq!(written, 2);

    let result: Result<Record, RecfileError> = StructuredFileBuilder::new(&TURNS)
        .scoped(&path, |file| {
            assert_eq!(file.tell()?, 0);
            file.get(5)
        });
    assert!(matches!(result, Err(RecfileError::OutOfRange { .. })));

    // empty files can be scoped too
    let empty = dir.path().join("empty.dat");
    let len = StructuredFileBuilder::new(&TURNS)
        .mode(OpenMode::Create)
        .scoped(&empty, |file| file.len())
        .unwrap();
    assert_eq!(len, 0);
}

#[test]
fn it_stores_every_field_type() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("all.dat");
    let tags = ["integer", "long", "float", "double", "real", "char", "boolean", "string"];
    let values = vec![
        Value::Integer(i32::MIN),
        Value::Long(-1),
        Value::Float(0.5),
        Value::Double(1e300),
        Value::Double(-2.0),
        Value::Char(0),
        Value::Boolean(false),
        Value::string("name"),
    ];

    let mut file = StructuredFile::open(&path, &tags, OpenMode::Create).unwrap();
    file.write(&values).unwrap();
    assert_eq!(file.get(0).unwrap(), values[..]);
    assert!(file.contains(&values).unwrap());
    assert!(file.contains(&[
        Value::Integer(i32::MIN),
        Value::Long(-1),
        Value::Float(0.5),
        Value::Double(1e300),
        Value::Double(-2.0),
        Value::Char(0),
        Value::Boolean(false),
        "name".into(),
    ]).unwrap());
}
