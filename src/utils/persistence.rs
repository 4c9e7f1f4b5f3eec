use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    cli::interpreter::SessionStore,
    config::tmp_path,
    errors::Result,
    ledger::{Account, Budget},
    storage::{BudgetSerialization, ReadsBudgetFromStream, WritesBudgetToStream},
};

/// Keeps a budget in a text file on disk.
#[derive(Debug, Clone)]
pub struct TextFileStore {
    path: PathBuf,
}

impl TextFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the budget atomically by staging to a temporary file.
    pub fn save_budget(&self, budget: &Budget) -> Result<()> {
        budget.save(&mut StagedFile { path: &self.path })?;
        info!(path = %self.path.display(), "saved budget");
        Ok(())
    }

    pub fn load_budget(&self, budget: &mut Budget) -> Result<()> {
        let file = File::open(&self.path)?;
        budget.load(&mut ReadsBudgetFromStream::new(BufReader::new(file)))?;
        info!(path = %self.path.display(), "loaded budget");
        Ok(())
    }
}

impl SessionStore for TextFileStore {
    fn save(&mut self, budget: &Budget) -> Result<()> {
        self.save_budget(budget)
    }

    fn load(&mut self, budget: &mut Budget) -> Result<()> {
        self.load_budget(budget)
    }
}

struct StagedFile<'a> {
    path: &'a Path,
}

impl BudgetSerialization for StagedFile<'_> {
    fn save(&mut self, primary: &Account, secondaries: &[&Account]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = tmp_path(self.path);
        if let Err(error) = write_synced(&tmp, primary, secondaries) {
            if fs::remove_file(&tmp).is_ok() {
                debug!(path = %tmp.display(), "removed partial staging file");
            }
            return Err(error);
        }
        fs::rename(&tmp, self.path)?;
        Ok(())
    }
}

/// The staged file is on disk before it replaces the ledger.
fn write_synced(path: &Path, primary: &Account, secondaries: &[&Account]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = WritesBudgetToStream::new(BufWriter::new(file));
    writer.save(primary, secondaries)?;
    let file = writer
        .into_inner()
        .into_inner()
        .map_err(|error| error.into_error())?;
    file.sync_all()?;
    Ok(())
}
