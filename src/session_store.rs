use super::*;

use std::collections::BTreeMap;
use std::sync::Mutex;

// JSON object keys are strings; serde turns them back into `u64` on load.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(super) struct SessionTable {
    #[serde(default)]
    pub(super) languages: BTreeMap<u64, String>,
    #[serde(default)]
    pub(super) dictionaries: BTreeMap<u64, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(super) struct Session {
    pub(super) language: Option<Language>,
    pub(super) dictionary: Option<String>,
}

pub(super) trait SessionBackend: Send + Sync {
    fn load(&self) -> Result<SessionTable>;
    fn save(&self, table: &SessionTable) -> Result<()>;
}

pub(super) struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub(super) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionBackend for JsonFileBackend {
    fn load(&self) -> Result<SessionTable> {
        if !self.path.exists() {
            return Ok(SessionTable::default());
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("read sessions {}", self.path.display()))?;
        let table = serde_json::from_str(&data).context("parse sessions")?;
        Ok(table)
    }

    fn save(&self, table: &SessionTable) -> Result<()> {
        let data = serde_json::to_vec_pretty(table).context("serialize sessions")?;
        atomic_write(&self.path, &data)
    }
}

pub(super) struct SessionStore {
    backend: Box<dyn SessionBackend>,
    table: Mutex<SessionTable>,
}

impl SessionStore {
    // A missing or broken backing document starts an empty table.
    pub(super) fn open(backend: Box<dyn SessionBackend>) -> Self {
        let table = match backend.load() {
            Ok(table) => table,
            Err(err) => {
                warn!("starting with empty sessions: {:#}", err);
                SessionTable::default()
            }
        };
        Self {
            backend,
            table: Mutex::new(table),
        }
    }

    pub(super) fn get(&self, user_id: u64) -> Session {
        let table = self.lock();
        Session {
            language: table
                .languages
                .get(&user_id)
                .and_then(|code| Language::from_code(code)),
            dictionary: table.dictionaries.get(&user_id).cloned(),
        }
    }

    pub(super) fn set_language(&self, user_id: u64, language: Language) -> Result<()> {
        self.update(|table| {
            table
                .languages
                .insert(user_id, language.code().to_string());
        })
    }

    pub(super) fn set_dictionary(&self, user_id: u64, name: &str) -> Result<()> {
        self.update(|table| {
            table.dictionaries.insert(user_id, name.to_string());
        })
    }

    // The live table only changes once the new one is on disk.
    fn update(&self, change: impl FnOnce(&mut SessionTable)) -> Result<()> {
        let mut table = self.lock();
        let mut next = table.clone();
        change(&mut next);
        self.backend.save(&next)?;
        *table = next;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionTable> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
