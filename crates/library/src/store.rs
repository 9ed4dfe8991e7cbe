use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use common::{FileInfo, Tags};
use redb::{Database, ReadableTable, TableDefinition, TableError, WriteTransaction};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LibraryError;

const INDEX_VERSION: u32 = 2;
const KEY_SEP: char = '\x1f';

const META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");
const FILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("files");
const TAGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tags");
const TAGS_BY_NAME_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tags_by_name");

const META_VERSION_KEY: &str = "version";
const EMPTY: &[u8] = &[];

/// Persisted mapping from file path to its modification time and tags.
///
/// `upsert` and `remove` must be atomic per path: a reader never observes a
/// partially written tag set.
pub trait TagStore {
    fn get_files(&self) -> Result<Vec<FileInfo>, LibraryError>;

    /// Creates the record for `file.path`, or replaces its mtime and its whole
    /// tag set.
    fn upsert(&self, file: &FileInfo, tags: &Tags) -> Result<(), LibraryError>;

    /// `None` when the path is not recorded; an empty map when it is recorded
    /// without tags.
    fn get_tags(&self, path: &Path) -> Result<Option<Tags>, LibraryError>;

    /// Removes the record and its tags. Absent paths are not an error.
    fn remove(&self, path: &Path) -> Result<(), LibraryError>;
}

impl<T: TagStore + ?Sized> TagStore for &T {
    fn get_files(&self) -> Result<Vec<FileInfo>, LibraryError> {
        (**self).get_files()
    }

    fn upsert(&self, file: &FileInfo, tags: &Tags) -> Result<(), LibraryError> {
        (**self).upsert(file, tags)
    }

    fn get_tags(&self, path: &Path) -> Result<Option<Tags>, LibraryError> {
        (**self).get_tags(path)
    }

    fn remove(&self, path: &Path) -> Result<(), LibraryError> {
        (**self).remove(path)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FileEntry {
    mtime: SystemTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TagRow {
    tag: String,
    value: String,
}

/// Tag store in a redb file.
///
/// `tags` holds one row per value keyed by `path ␟ position`, so a prefix range
/// yields a file's tags in insertion order. `tags_by_name` indexes the same rows
/// by `tag ␟ path ␟ position`.
#[derive(Clone)]
pub struct RedbTagStore {
    db: Arc<Database>,
}

impl RedbTagStore {
    pub fn open(path: &Path) -> Result<Self, LibraryError> {
        let db = open_or_create_db(path)?;
        Self::with_db(Arc::new(db))
    }

    pub fn with_db(db: Arc<Database>) -> Result<Self, LibraryError> {
        let store = Self { db };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<(), LibraryError> {
        let version = read_version(&self.db)?;
        let write_txn = self.db.begin_write()?;
        if let Some(version) = version.filter(|v| *v != INDEX_VERSION) {
            warn!("Index version mismatch ({}); clearing stored files", version);
            clear_table(&write_txn, FILES_TABLE)?;
            clear_table(&write_txn, TAGS_TABLE)?;
            clear_table(&write_txn, TAGS_BY_NAME_TABLE)?;
        }
        {
            let mut meta_table = write_txn.open_table(META_TABLE)?;
            let _ = write_txn.open_table(FILES_TABLE)?;
            let _ = write_txn.open_table(TAGS_TABLE)?;
            let _ = write_txn.open_table(TAGS_BY_NAME_TABLE)?;
            let version_bytes = encode_value(&INDEX_VERSION)?;
            meta_table.insert(META_VERSION_KEY, version_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Paths of all files carrying `tag`, in path order.
    pub fn files_with_tag(&self, tag: &str) -> Result<Vec<PathBuf>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(TAGS_BY_NAME_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let prefix = prefix_key(tag);
        let end = range_end(&prefix);
        let mut paths = BTreeSet::new();
        for entry in table.range(prefix.as_str()..end.as_str())? {
            let entry = entry?;
            let key = entry.0.value();
            let (file_key, _) = split_key_last(&key[prefix.len()..])?;
            paths.insert(path_from_key(file_key)?);
        }
        Ok(paths.into_iter().collect())
    }

    #[cfg(test)]
    fn db(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }
}

impl TagStore for RedbTagStore {
    fn get_files(&self) -> Result<Vec<FileInfo>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(FILES_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut files = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let file: FileEntry = decode_value(entry.1.value())?;
            files.push(FileInfo::new(path_from_key(entry.0.value())?, file.mtime));
        }
        Ok(files)
    }

    fn upsert(&self, file: &FileInfo, tags: &Tags) -> Result<(), LibraryError> {
        let file_key = path_key(&file.path);
        let write_txn = self.db.begin_write()?;
        delete_tag_rows(&write_txn, &file_key)?;
        {
            let mut files_table = write_txn.open_table(FILES_TABLE)?;
            let mut tags_table = write_txn.open_table(TAGS_TABLE)?;
            let mut tags_by_name_table = write_txn.open_table(TAGS_BY_NAME_TABLE)?;

            let entry_bytes = encode_value(&FileEntry { mtime: file.mtime })?;
            files_table.insert(file_key.as_str(), entry_bytes.as_slice())?;

            let mut position = 0usize;
            for (tag, values) in tags {
                for value in values {
                    let row_key = tag_row_key(&file_key, position);
                    let row = TagRow {
                        tag: tag.clone(),
                        value: value.clone(),
                    };
                    let row_bytes = encode_value(&row)?;
                    tags_table.insert(row_key.as_str(), row_bytes.as_slice())?;
                    let index_key = tag_index_key(tag, &row_key);
                    tags_by_name_table.insert(index_key.as_str(), EMPTY)?;
                    position += 1;
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_tags(&self, path: &Path) -> Result<Option<Tags>, LibraryError> {
        let file_key = path_key(path);
        let read_txn = self.db.begin_read()?;
        let files_table = match read_txn.open_table(FILES_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if files_table.get(file_key.as_str())?.is_none() {
            return Ok(None);
        }

        let mut tags = Tags::new();
        let tags_table = match read_txn.open_table(TAGS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Some(tags)),
            Err(err) => return Err(err.into()),
        };
        let prefix = prefix_key(&file_key);
        let end = range_end(&prefix);
        for entry in tags_table.range(prefix.as_str()..end.as_str())? {
            let entry = entry?;
            let row: TagRow = decode_value(entry.1.value())?;
            tags.entry(row.tag).or_default().push(row.value);
        }
        Ok(Some(tags))
    }

    fn remove(&self, path: &Path) -> Result<(), LibraryError> {
        let file_key = path_key(path);
        let write_txn = self.db.begin_write()?;
        delete_tag_rows(&write_txn, &file_key)?;
        {
            let mut files_table = write_txn.open_table(FILES_TABLE)?;
            let _ = files_table.remove(file_key.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

fn delete_tag_rows(txn: &WriteTransaction, file_key: &str) -> Result<(), LibraryError> {
    let mut tags_table = txn.open_table(TAGS_TABLE)?;
    let mut tags_by_name_table = txn.open_table(TAGS_BY_NAME_TABLE)?;

    let prefix = prefix_key(file_key);
    let end = range_end(&prefix);
    let mut doomed = Vec::new();
    for entry in tags_table.range(prefix.as_str()..end.as_str())? {
        let entry = entry?;
        let row: TagRow = decode_value(entry.1.value())?;
        doomed.push((entry.0.value().to_string(), row.tag));
    }

    for (row_key, tag) in doomed {
        let _ = tags_table.remove(row_key.as_str())?;
        let index_key = tag_index_key(&tag, &row_key);
        let _ = tags_by_name_table.remove(index_key.as_str())?;
    }
    Ok(())
}

pub(crate) fn open_or_create_db(path: &Path) -> Result<Database, LibraryError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if path.exists() {
        Ok(Database::open(path)?)
    } else {
        Ok(Database::create(path)?)
    }
}

fn read_version(db: &Database) -> Result<Option<u32>, LibraryError> {
    let read_txn = db.begin_read()?;
    let table = match read_txn.open_table(META_TABLE) {
        Ok(table) => table,
        Err(TableError::TableDoesNotExist(_)) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let version = match table.get(META_VERSION_KEY)? {
        Some(value) => Some(decode_value(value.value())?),
        None => None,
    };
    Ok(version)
}

fn clear_table(
    txn: &WriteTransaction,
    table: TableDefinition<&str, &[u8]>,
) -> Result<(), LibraryError> {
    match txn.delete_table(table) {
        Ok(_) => Ok(()),
        Err(TableError::TableDoesNotExist(_)) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, LibraryError> {
    Ok(bincode::serialize(value)?)
}

fn decode_value<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, LibraryError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Text key of a path. `%`, the key separator and bytes that are not UTF-8 are
/// written as `%XX`, so distinct paths never share a key and
/// `path_from_key(path_key(p)) == p`.
fn path_key(path: &Path) -> String {
    let bytes = path_bytes(path);
    let mut out = String::with_capacity(bytes.len());
    let mut rest: &[u8] = &bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(text) => {
                push_escaped(&mut out, text);
                break;
            }
            Err(err) => {
                let valid = err.valid_up_to();
                push_escaped(&mut out, std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                let invalid = err.error_len().unwrap_or(rest.len() - valid);
                for byte in &rest[valid..valid + invalid] {
                    push_hex(&mut out, *byte);
                }
                rest = &rest[valid + invalid..];
            }
        }
    }
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch == '%' || ch == KEY_SEP {
            push_hex(out, ch as u8);
        } else {
            out.push(ch);
        }
    }
}

fn push_hex(out: &mut String, byte: u8) {
    out.push_str(&format!("%{:02X}", byte));
}

fn path_from_key(key: &str) -> Result<PathBuf, LibraryError> {
    let raw = key.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut idx = 0;
    while idx < raw.len() {
        if raw[idx] == b'%' {
            let byte = key
                .get(idx + 1..idx + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| LibraryError::KeyParse(key.to_string()))?;
            bytes.push(byte);
            idx += 3;
        } else {
            bytes.push(raw[idx]);
            idx += 1;
        }
    }
    path_from_bytes(bytes)
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(text) => Cow::Borrowed(text.as_bytes()),
        Cow::Owned(text) => Cow::Owned(text.into_bytes()),
    }
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf, LibraryError> {
    use std::os::unix::ffi::OsStringExt;
    Ok(PathBuf::from(std::ffi::OsString::from_vec(bytes)))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf, LibraryError> {
    String::from_utf8(bytes)
        .map(PathBuf::from)
        .map_err(|err| LibraryError::KeyParse(err.to_string()))
}

fn prefix_key(prefix: &str) -> String {
    let mut out = String::new();
    out.push_str(prefix);
    out.push(KEY_SEP);
    out
}

fn range_end(prefix: &str) -> String {
    let mut end = prefix.to_string();
    end.push('\u{10ffff}');
    end
}

fn tag_row_key(file_key: &str, position: usize) -> String {
    let mut out = prefix_key(file_key);
    out.push_str(&format!("{:08}", position));
    out
}

fn tag_index_key(tag: &str, row_key: &str) -> String {
    let mut out = prefix_key(tag);
    out.push_str(row_key);
    out
}

fn split_key_last(value: &str) -> Result<(&str, &str), LibraryError> {
    let idx = value
        .rfind(KEY_SEP)
        .ok_or_else(|| LibraryError::KeyParse(value.to_string()))?;
    let next = idx + KEY_SEP.len_utf8();
    Ok((&value[..idx], &value[next..]))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use common::{FileInfo, Tags};
    use tempfile::TempDir;

    use super::{RedbTagStore, TagStore};

    fn temp_store() -> (RedbTagStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbTagStore::open(&dir.path().join("index.redb")).unwrap();
        (store, dir)
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn tags(items: &[(&str, &[&str])]) -> Tags {
        items
            .iter()
            .map(|(tag, values)| {
                (
                    tag.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn empty_initially() {
        let (store, _dir) = temp_store();
        assert!(store.get_files().unwrap().is_empty());
    }

    #[test]
    fn add_single_file() {
        let (store, _dir) = temp_store();
        let info = FileInfo::new("/a/test.mp3", at(1_695_658_740));
        let tags = tags(&[("title", &["some title"]), ("artist", &["some artist"])]);
        store.upsert(&info, &tags).unwrap();

        assert_eq!(store.get_files().unwrap(), vec![info.clone()]);
        assert_eq!(store.get_tags(&info.path).unwrap(), Some(tags));
    }

    #[test]
    fn file_without_tags_is_distinct_from_missing() {
        let (store, _dir) = temp_store();
        let info = FileInfo::new("/test.flac", at(10));
        store.upsert(&info, &Tags::new()).unwrap();
        assert_eq!(store.get_tags(&info.path).unwrap(), Some(Tags::new()));
        assert_eq!(store.get_tags(Path::new("/no.ogg")).unwrap(), None);
    }

    #[test]
    fn value_order_and_duplicates_survive() {
        let (store, _dir) = temp_store();
        let info = FileInfo::new("/multi.flac", at(10));
        let tags = tags(&[("ARTIST", &["b", "a", "b"]), ("GENRE", &["Pop"])]);
        store.upsert(&info, &tags).unwrap();
        let stored = store.get_tags(&info.path).unwrap().unwrap();
        assert_eq!(stored["ARTIST"], vec!["b", "a", "b"]);
    }

    #[test]
    fn update_replaces_whole_tag_set() {
        let (store, _dir) = temp_store();
        let info = FileInfo::new("/a/test.mp3", at(10));
        store
            .upsert(&info, &tags(&[("title", &["some title"]), ("artist", &["some artist"])]))
            .unwrap();

        let newer = FileInfo::new("/a/test.mp3", at(20));
        let replacement = tags(&[("title", &["another title"]), ("album", &["some album"])]);
        store.upsert(&newer, &replacement).unwrap();

        assert_eq!(store.get_files().unwrap(), vec![newer.clone()]);
        assert_eq!(store.get_tags(&newer.path).unwrap(), Some(replacement));
        assert!(store.files_with_tag("artist").unwrap().is_empty());
    }

    #[test]
    fn remove_cascades_to_tags() {
        let (store, _dir) = temp_store();
        let first = FileInfo::new("/file.flac", at(10));
        let second = FileInfo::new("/file_2.flac", at(10));
        store.upsert(&first, &tags(&[("artist", &["Bob Dylan"])])).unwrap();
        store
            .upsert(&second, &tags(&[("artist", &["John Coltrane"])]))
            .unwrap();

        store.remove(&first.path).unwrap();

        assert_eq!(store.get_tags(&first.path).unwrap(), None);
        assert_eq!(
            store.get_tags(&second.path).unwrap(),
            Some(tags(&[("artist", &["John Coltrane"])]))
        );
        assert_eq!(store.get_files().unwrap().len(), 1);
        assert_eq!(
            store.files_with_tag("artist").unwrap(),
            vec![PathBuf::from("/file_2.flac")]
        );
    }

    #[test]
    fn removing_unknown_path_is_a_no_op() {
        let (store, _dir) = temp_store();
        store.remove(Path::new("/never/seen.mp3")).unwrap();
        assert!(store.get_files().unwrap().is_empty());
    }

    #[test]
    fn tag_index_lists_each_file_once() {
        let (store, _dir) = temp_store();
        store
            .upsert(
                &FileInfo::new("/x/b.mp3", at(1)),
                &tags(&[("GENRE", &["Jazz", "Bop"])]),
            )
            .unwrap();
        store
            .upsert(&FileInfo::new("/x/a.mp3", at(1)), &tags(&[("GENRE", &["Pop"])]))
            .unwrap();
        store
            .upsert(&FileInfo::new("/x/c.mp3", at(1)), &tags(&[("GENREX", &["?"])]))
            .unwrap();

        assert_eq!(
            store.files_with_tag("GENRE").unwrap(),
            vec![PathBuf::from("/x/a.mp3"), PathBuf::from("/x/b.mp3")]
        );
    }

    #[test]
    fn reopening_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.redb");
        let info = FileInfo::new("/kept.ogg", at(42));
        {
            let store = RedbTagStore::open(&path).unwrap();
            store.upsert(&info, &tags(&[("TITLE", &["Kept"])])).unwrap();
        }
        let store = RedbTagStore::open(&path).unwrap();
        assert_eq!(store.get_files().unwrap(), vec![info]);
    }

    #[test]
    fn version_mismatch_clears_index() {
        let (store, _dir) = temp_store();
        store
            .upsert(&FileInfo::new("/old.mp3", at(1)), &tags(&[("TITLE", &["Old"])]))
            .unwrap();

        let db = store.db();
        let txn = db.begin_write().unwrap();
        {
            let mut meta = txn.open_table(super::META_TABLE).unwrap();
            let bytes = super::encode_value(&(super::INDEX_VERSION + 1)).unwrap();
            meta.insert(super::META_VERSION_KEY, bytes.as_slice()).unwrap();
        }
        txn.commit().unwrap();
        drop(store);

        let store = RedbTagStore::with_db(db).unwrap();
        assert!(store.get_files().unwrap().is_empty());
        assert!(store.files_with_tag("TITLE").unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_keep_their_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (store, _dir) = temp_store();
        let acute = PathBuf::from(OsStr::from_bytes(b"/music/caf\xe9.mp3"));
        let grave = PathBuf::from(OsStr::from_bytes(b"/music/caf\xe8.mp3"));
        store
            .upsert(&FileInfo::new(&acute, at(1)), &tags(&[("TITLE", &["acute"])]))
            .unwrap();
        store
            .upsert(&FileInfo::new(&grave, at(2)), &tags(&[("TITLE", &["grave"])]))
            .unwrap();

        let mut paths: Vec<PathBuf> = store
            .get_files()
            .unwrap()
            .into_iter()
            .map(|file| file.path)
            .collect();
        paths.sort();
        let mut expected = vec![acute.clone(), grave.clone()];
        expected.sort();
        assert_eq!(paths, expected);
        assert_eq!(
            store.get_tags(&acute).unwrap(),
            Some(tags(&[("TITLE", &["acute"])]))
        );

        let mut tagged = store.files_with_tag("TITLE").unwrap();
        tagged.sort();
        assert_eq!(tagged, expected);
    }

    #[test]
    fn percent_and_separator_in_paths_round_trip() {
        let (store, _dir) = temp_store();
        let odd = PathBuf::from("/music/100% \u{1f}live%41.mp3");
        let plain = PathBuf::from("/music/100% ");
        store.upsert(&FileInfo::new(&odd, at(3)), &Tags::new()).unwrap();
        store.upsert(&FileInfo::new(&plain, at(4)), &tags(&[("TITLE", &["x"])])).unwrap();

        assert_eq!(store.get_tags(&odd).unwrap(), Some(Tags::new()));
        let mut paths: Vec<PathBuf> = store
            .get_files()
            .unwrap()
            .into_iter()
            .map(|file| file.path)
            .collect();
        paths.sort();
        assert_eq!(paths, vec![plain, odd]);
    }
}
