//! The persisted identifier database.
//!
//! One record per line, four fields separated by [`DELIMITER`]:
//!
//! ```text
//! identifier~^~check-coded~^~test-name~^~message
//! ```
//!
//! `check-coded` is `Y` or `N`, and `test-name` is either the name of a test
//! exercising the check or `None`. Lines starting with `#` and blank lines are
//! ignored.

use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use indexmap::IndexMap;

use crate::domain::{ErrorId, RequirementSet, Watermark};

/// The field separator.
pub const DELIMITER: &str = "~^~";

/// The test-name field of an entry without a test.
const NO_TEST: &str = "None";

/// Whether a check has been implemented for an identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckStatus {
    /// A check exists (`Y`).
    Coded,
    /// No check exists yet (`N`).
    #[default]
    NotCoded,
}

impl CheckStatus {
    const fn flag(self) -> &'static str {
        match self {
            Self::Coded => "Y",
            Self::NotCoded => "N",
        }
    }

    fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "Y" => Some(Self::Coded),
            "N" => Some(Self::NotCoded),
            _ => None,
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// Everything the database records about one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEntry {
    /// Whether a check has been written.
    pub check: CheckStatus,
    /// The test that exercises the check, if any.
    pub test: Option<String>,
    /// The message the identifier was assigned to.
    pub message: String,
}

impl DatabaseEntry {
    /// Creates an entry for a statement with no check and no test.
    #[must_use]
    pub const fn new(message: String) -> Self {
        Self {
            check: CheckStatus::NotCoded,
            test: None,
            message,
        }
    }
}

/// Errors that can occur when loading or saving a database.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// The database file was not found.
    #[error("database file not found")]
    NotFound,
    /// An I/O error occurred.
    #[error("failed to access database file")]
    Io(#[from] io::Error),
    /// A line could not be parsed.
    #[error("malformed database line {line}: {reason}")]
    Malformed {
        /// The 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },
}

/// An ordered collection of database entries, keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Database {
    entries: IndexMap<ErrorId, DatabaseEntry>,
}

impl Database {
    /// Loads a database from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NotFound`] if the file does not exist, and
    /// [`DatabaseError::Malformed`] for the first line that cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let file = File::open(path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => DatabaseError::NotFound,
            _ => DatabaseError::Io(io_error),
        })?;
        let database = Self::read(&mut BufReader::new(file))?;
        tracing::debug!(path = %path.display(), entries = database.len(), "loaded database");
        Ok(database)
    }

    /// Parses a database from `reader`.
    ///
    /// When an identifier appears more than once, the later line wins.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Malformed`] for the first line that cannot be
    /// parsed, or [`DatabaseError::Io`] if reading fails.
    pub fn read<R: BufRead>(reader: &mut R) -> Result<Self, DatabaseError> {
        let mut entries = IndexMap::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, entry) = parse_line(line).map_err(|reason| DatabaseError::Malformed {
                line: index + 1,
                reason,
            })?;

            if let Some(previous) = entries.insert(id.clone(), entry) {
                tracing::warn!(
                    %id,
                    line = index + 1,
                    previous = %previous.message,
                    "duplicate identifier in database; keeping the later entry"
                );
            }
        }

        Ok(Self { entries })
    }

    /// Writes the database to `writer`, preceded by a comment header.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "# Valid Usage identifier database")?;
        writeln!(
            writer,
            "# identifier{DELIMITER}check-coded{DELIMITER}test-name{DELIMITER}message"
        )?;
        writeln!(writer, "# fingerprint: {}", self.requirements().fingerprint())?;

        for (id, entry) in &self.entries {
            let test = entry.test.as_deref().unwrap_or(NO_TEST);
            writeln!(
                writer,
                "{id}{DELIMITER}{}{DELIMITER}{test}{DELIMITER}{}",
                entry.check, entry.message
            )?;
        }
        Ok(())
    }

    /// Writes the database to the file at `path`, replacing it.
    ///
    /// Parent directories are created automatically if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), entries = self.len(), "wrote database");
        Ok(())
    }

    /// Builds a database from a requirement set.
    ///
    /// Identifiers already present in `previous` keep their check status and
    /// test name. All other entries are marked as not coded, with no test.
    #[must_use]
    pub fn from_requirements(set: &RequirementSet, previous: Option<&Self>) -> Self {
        let entries = set
            .iter()
            .map(|(id, message)| {
                let mut entry = DatabaseEntry::new(message.to_string());
                if let Some(known) = previous.and_then(|db| db.get(id)) {
                    entry.check = known.check;
                    entry.test.clone_from(&known.test);
                }
                (id.clone(), entry)
            })
            .collect();
        Self { entries }
    }

    /// The identifiers and messages, in file order.
    #[must_use]
    pub fn requirements(&self) -> RequirementSet {
        RequirementSet::from_entries(
            self.entries
                .iter()
                .map(|(id, entry)| (id.clone(), entry.message.clone()))
                .collect(),
        )
    }

    /// The highest identifier suffix in the database.
    #[must_use]
    pub fn watermark(&self) -> Watermark {
        self.entries.keys().map(ErrorId::suffix).collect()
    }

    /// Returns the entry for `id`.
    #[must_use]
    pub fn get(&self, id: &ErrorId) -> Option<&DatabaseEntry> {
        self.entries.get(id)
    }

    /// Iterates over the entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&ErrorId, &DatabaseEntry)> + '_ {
        self.entries.iter()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the database holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str) -> Result<(ErrorId, DatabaseEntry), String> {
    let mut fields = line.splitn(4, DELIMITER);
    let (Some(id), Some(check), Some(test), Some(message)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(format!("expected 4 fields separated by '{DELIMITER}'"));
    };

    let id: ErrorId = id
        .parse()
        .map_err(|e| format!("invalid identifier '{id}': {e}"))?;
    let check = CheckStatus::from_flag(check)
        .ok_or_else(|| format!("invalid check-coded flag '{check}', expected 'Y' or 'N'"))?;
    let test = (test != NO_TEST).then(|| test.to_string());

    Ok((
        id,
        DatabaseEntry {
            check,
            test,
            message: message.to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::RequirementRecord;

    fn id(s: &str) -> ErrorId {
        s.parse().unwrap()
    }

    fn parse(text: &str) -> Result<Database, DatabaseError> {
        Database::read(&mut text.as_bytes())
    }

    fn set(records: &[(&str, &str)]) -> RequirementSet {
        let mut set = RequirementSet::new();
        for (id, message) in records {
            set.insert(RequirementRecord::new(id.parse().unwrap(), (*message).to_string()))
                .unwrap();
        }
        set
    }

    #[test]
    fn reads_entries_in_file_order() {
        let db = parse(
            "# header\n\
             VALIDATION_ERROR_3~^~Y~^~TestThree~^~three\n\
             \n\
             VALIDATION_ERROR_1~^~N~^~None~^~one\n",
        )
        .unwrap();

        assert_eq!(db.len(), 2);
        let ids: Vec<_> = db.iter().map(|(id, _)| id.suffix()).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(
            db.get(&id("VALIDATION_ERROR_3")),
            Some(&DatabaseEntry {
                check: CheckStatus::Coded,
                test: Some("TestThree".to_string()),
                message: "three".to_string(),
            })
        );
        assert_eq!(
            db.get(&id("VALIDATION_ERROR_1")),
            Some(&DatabaseEntry::new("one".to_string()))
        );
        assert_eq!(db.watermark().value(), 3);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let db = parse("   VALIDATION_ERROR_0~^~N~^~None~^~msg   \r\n").unwrap();
        assert_eq!(db.requirements().get(&id("VALIDATION_ERROR_0")), Some("msg"));
    }

    #[test]
    fn message_may_contain_delimiter() {
        let db = parse("VALIDATION_ERROR_0~^~N~^~None~^~a~^~b\n").unwrap();
        assert_eq!(db.requirements().get(&id("VALIDATION_ERROR_0")), Some("a~^~b"));
    }

    #[test_case("VALIDATION_ERROR_0~^~N~^~None" ; "too few fields")]
    #[test_case("VALIDATION_ERROR_x~^~N~^~None~^~m" ; "non numeric suffix")]
    #[test_case("VALIDATION_ERROR_0~^~maybe~^~None~^~m" ; "unknown flag")]
    #[test_case("VALIDATION_ERROR_007~^~Y~^~T~^~m" ; "zero padded suffix")]
    fn malformed_line_is_rejected(line: &str) {
        let text = format!("# comment\nVALIDATION_ERROR_9~^~N~^~None~^~ok\n{line}\n");
        let error = parse(&text).unwrap_err();
        assert!(matches!(error, DatabaseError::Malformed { line: 3, .. }));
    }

    #[test]
    fn zero_padded_identifier_does_not_alias_its_canonical_form() {
        let error = parse(
            "VALIDATION_ERROR_007~^~Y~^~T~^~m\n\
             VALIDATION_ERROR_7~^~N~^~None~^~other\n",
        )
        .unwrap_err();
        assert!(matches!(error, DatabaseError::Malformed { line: 1, .. }));
    }

    #[test]
    fn duplicate_identifier_keeps_later_line() {
        let db = parse(
            "VALIDATION_ERROR_0~^~N~^~None~^~first\n\
             VALIDATION_ERROR_1~^~N~^~None~^~other\n\
             VALIDATION_ERROR_0~^~Y~^~None~^~second\n",
        )
        .unwrap();

        assert_eq!(db.len(), 2);
        let entry = db.get(&id("VALIDATION_ERROR_0")).unwrap();
        assert_eq!(entry.message, "second");
        assert_eq!(entry.check, CheckStatus::Coded);
    }

    #[test]
    fn write_then_read_preserves_entries() {
        let db = parse(
            "VALIDATION_ERROR_2~^~Y~^~SomeTest~^~two\n\
             VALIDATION_ERROR_0~^~N~^~None~^~zero\n",
        )
        .unwrap();

        let mut buffer = Vec::new();
        db.write(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with('#'));
        assert!(text.contains(&db.requirements().fingerprint()));
        assert_eq!(parse(&text).unwrap(), db);
    }

    #[test]
    fn from_requirements_carries_previous_fields() {
        let previous = parse(
            "VALIDATION_ERROR_0~^~Y~^~CoveredTest~^~kept\n\
             VALIDATION_ERROR_1~^~Y~^~Gone~^~removed\n",
        )
        .unwrap();
        let reconciled = set(&[("VALIDATION_ERROR_0", "kept"), ("VALIDATION_ERROR_2", "new")]);

        let db = Database::from_requirements(&reconciled, Some(&previous));

        assert_eq!(
            db.get(&id("VALIDATION_ERROR_0")),
            Some(&DatabaseEntry {
                check: CheckStatus::Coded,
                test: Some("CoveredTest".to_string()),
                message: "kept".to_string(),
            })
        );
        assert_eq!(
            db.get(&id("VALIDATION_ERROR_2")),
            Some(&DatabaseEntry::new("new".to_string()))
        );
        assert!(db.get(&id("VALIDATION_ERROR_1")).is_none());
        assert_eq!(db.requirements(), reconciled);
    }

    #[test]
    fn save_and_load_round_trip_through_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("vk_validation_error_database.txt");
        let db = Database::from_requirements(&set(&[("VALIDATION_ERROR_0", "m")]), None);

        db.save(&path).unwrap();

        assert_eq!(Database::load(&path).unwrap(), db);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let error = Database::load(&tmp.path().join("missing.txt")).unwrap_err();
        assert!(matches!(error, DatabaseError::NotFound));
    }
}
