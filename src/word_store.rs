use super::*;

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom};

use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, PartialEq, Eq)]
pub(super) enum UploadOutcome {
    Stored { name: String, words: usize },
    InvalidName,
    NotUtf8,
}

pub(super) struct WordStore {
    dir: PathBuf,
}

impl WordStore {
    pub(super) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub(super) fn list_dictionaries(&self) -> Result<BTreeSet<String>> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create dictionaries dir {}", self.dir.display()))?;
        let mut names = BTreeSet::new();
        let entries =
            fs::read_dir(&self.dir).with_context(|| format!("read dir {}", self.dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("read dir entry {}", self.dir.display()))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .with_context(|| format!("read file type {}", path.display()))?;
            if !file_type.is_file() || !has_dictionary_ext(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                names.insert(name.to_string());
            }
        }
        Ok(names)
    }

    pub(super) fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.list_dictionaries()?.contains(name))
    }

    // Missing or unreadable files read as an empty dictionary.
    pub(super) fn read_words(&self, name: &str) -> Vec<String> {
        let Some(path) = self.path_for(name) else {
            return Vec::new();
        };
        match fs::read(&path) {
            Ok(bytes) => split_words(&String::from_utf8_lossy(&bytes)),
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("read dictionary {}: {}", path.display(), err);
                }
                Vec::new()
            }
        }
    }

    pub(super) fn sample_words(&self, name: &str, count: usize) -> Vec<String> {
        self.sample_words_with(name, count, &mut rand::thread_rng())
    }

    // `count == 0` returns the whole dictionary in file order. Otherwise
    // picks `min(count, len)` distinct lines in random order.
    pub(super) fn sample_words_with<R: Rng + ?Sized>(
        &self,
        name: &str,
        count: usize,
        rng: &mut R,
    ) -> Vec<String> {
        let mut words = self.read_words(name);
        if count == 0 || words.is_empty() {
            return words;
        }
        let amount = count.min(words.len());
        let (picked, _) = words.partial_shuffle(rng, amount);
        picked.to_vec()
    }

    pub(super) fn append_words(&self, name: &str, words: &[String]) -> Result<usize> {
        let path = self
            .path_for(name)
            .ok_or_else(|| anyhow!("invalid dictionary name {:?}", name))?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create dictionaries dir {}", self.dir.display()))?;

        let mut payload = String::new();
        let mut appended = 0;
        for word in words {
            let word = word.trim();
            if word.is_empty() || word.contains(|c: char| c == '\n' || c == '\r') {
                continue;
            }
            payload.push_str(word);
            payload.push('\n');
            appended += 1;
        }
        if appended == 0 {
            return Ok(0);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open dictionary {}", path.display()))?;
        if !ends_with_newline_or_empty(&mut file)
            .with_context(|| format!("inspect dictionary {}", path.display()))?
        {
            payload.insert(0, '\n');
        }
        file.write_all(payload.as_bytes())
            .with_context(|| format!("append to dictionary {}", path.display()))?;
        file.sync_all()
            .with_context(|| format!("sync dictionary {}", path.display()))?;
        Ok(appended)
    }

    pub(super) fn replace_dictionary(&self, file_name: &str, content: &[u8]) -> Result<UploadOutcome> {
        let Some(name) = sanitize_dictionary_name(file_name) else {
            return Ok(UploadOutcome::InvalidName);
        };
        let Ok(text) = std::str::from_utf8(content) else {
            return Ok(UploadOutcome::NotUtf8);
        };
        let path = self.dir.join(&name);
        atomic_write(&path, content)?;
        Ok(UploadOutcome::Stored {
            words: split_words(text).len(),
            name,
        })
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        sanitize_dictionary_name(name).map(|name| self.dir.join(name))
    }
}

fn ends_with_newline_or_empty(file: &mut fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n' || last[0] == b'\r')
}
