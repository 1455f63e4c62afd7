//! JSON persistence of the in-memory ledger between CLI runs.
//!
//! A run holds an exclusive lock from [`open`] until its [`LedgerFile`] is
//! dropped, so overlapping runs on one ledger execute one after another and
//! each sees every transition the previous one saved. The lock lives on a
//! sidecar `<ledger>.lock` file because [`LedgerFile::save`] replaces the
//! ledger file itself.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use bikeshare_storage::{LedgerDump, MemoryLedger};
use fs4::fs_std::FileExt;

/// A ledger file locked for the current run.
#[derive(Debug)]
pub(crate) struct LedgerFile {
    path: PathBuf,
    // Released when the handle is closed.
    _lock: File,
}

/// Lock the ledger at `path` and load it. A missing file is an empty ledger.
///
/// Blocks while another run holds the lock.
pub(crate) fn open(path: &Path) -> Result<(LedgerFile, MemoryLedger), String> {
    let lock = acquire(path)?;
    let ledger = load(path)?;
    let file = LedgerFile {
        path: path.to_path_buf(),
        _lock: lock,
    };
    Ok((file, ledger))
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

fn acquire(path: &Path) -> Result<File, String> {
    let lock_path = lock_path(path);
    let lock_err =
        |e: std::io::Error| format!("error locking ledger '{}': {}", path.display(), e);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(lock_err)?;
    file.lock_exclusive().map_err(lock_err)?;
    tracing::debug!(lock = %lock_path.display(), "ledger locked");
    Ok(file)
}

fn load(path: &Path) -> Result<MemoryLedger, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(MemoryLedger::new()),
        Err(e) => return Err(format!("error reading ledger '{}': {}", path.display(), e)),
    };
    let dump: LedgerDump = serde_json::from_str(&content)
        .map_err(|e| format!("error parsing ledger '{}': {}", path.display(), e))?;
    MemoryLedger::from_dump(dump)
        .map_err(|e| format!("error loading ledger '{}': {}", path.display(), e))
}

impl LedgerFile {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Write `ledger` to the file, replacing the previous contents atomically.
    pub(crate) fn save(&self, ledger: &MemoryLedger) -> Result<(), String> {
        let path = self.path.as_path();
        let dump = ledger.dump().map_err(|e| e.to_string())?;
        let json = serde_json::to_string_pretty(&dump)
            .map_err(|e| format!("error serializing ledger: {}", e))?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let write_err =
            |e: std::io::Error| format!("error writing ledger '{}': {}", path.display(), e);
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;
    use bikeshare_storage::LedgerStore;
    use bikeshare_workflow::{
        Anonymous, Engine, EngineConfig, ErrorKind, ManualClock, WorkflowError,
    };

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    fn dev_engine(ledger: MemoryLedger) -> Engine<MemoryLedger> {
        Engine::new(ledger, EngineConfig::new(true), Arc::new(ManualClock::new(100))).unwrap()
    }

    #[test]
    fn missing_file_is_an_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let (_file, ledger) = open(&dir.path().join("absent.json")).unwrap();
        assert_eq!(ledger.height().unwrap(), 0);
        assert!(ledger.entries().unwrap().is_empty());
        assert!(!dir.path().join("absent.json").exists());
    }

    #[test]
    fn saved_ledger_reopens_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let rt = runtime();
        let ledger = {
            let (file, ledger) = open(&path).unwrap();
            rt.block_on(async {
                let mut snap = ledger.begin_snapshot().await.unwrap();
                ledger
                    .put_state(
                        &mut snap,
                        "\u{0}Bike\u{0}b1\u{0}",
                        br#"{"docType":"Bike","id":"b1","location":null,"status":"AVAILABLE"}"#
                            .to_vec(),
                    )
                    .await
                    .unwrap();
                ledger.commit_snapshot(snap).await.unwrap();
            });
            file.save(&ledger).unwrap();
            ledger
        };

        let (file, reopened) = open(&path).unwrap();
        assert_eq!(file.path(), path.as_path());
        assert_eq!(reopened.dump().unwrap(), ledger.dump().unwrap());
    }

    #[test]
    fn garbage_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "not json").unwrap();
        let err = open(&path).unwrap_err();
        assert!(err.contains("error parsing ledger"), "{err}");
    }

    #[test]
    fn garbage_file_does_not_keep_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(open(&path).is_err());
        std::fs::remove_file(&path).unwrap();
        assert!(open(&path).is_ok());
    }

    #[test]
    fn overlapping_runs_do_not_lose_commits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let rt = runtime();
        {
            let (file, ledger) = open(&path).unwrap();
            let engine = dev_engine(ledger);
            rt.block_on(async {
                engine.invoke(&Anonymous, "registerBike", &["b1"]).await.unwrap();
                for user in ["u1", "u2"] {
                    engine
                        .invoke(&Anonymous, "registerUser", &[user, "10"])
                        .await
                        .unwrap();
                }
            });
            file.save(engine.store()).unwrap();
        }

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = ["u1", "u2"]
            .into_iter()
            .map(|user| {
                let path = path.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || -> Result<String, WorkflowError> {
                    barrier.wait();
                    let (file, ledger) = open(&path).unwrap();
                    let engine = dev_engine(ledger);
                    let payload = runtime().block_on(engine.invoke(
                        &Anonymous,
                        "startRide",
                        &[user, "b1", "0", "0"],
                    ))?;
                    file.save(engine.store()).unwrap();
                    Ok(String::from_utf8(payload).unwrap())
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners: Vec<&String> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "{results:?}");
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(loser.kind(), ErrorKind::Conflict);
        assert_eq!(loser.to_string(), "Bike b1 not available.");

        let (_file, ledger) = open(&path).unwrap();
        let ride_key = format!("\u{0}Ride\u{0}{}\u{0}", winners[0]);
        let stored = rt.block_on(ledger.read_state(&ride_key)).unwrap();
        assert!(stored.is_some(), "ride {} was lost", winners[0]);
    }
}
