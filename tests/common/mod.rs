#![allow(dead_code)]

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use staffmatch::{
    Embedder,
    LanguageModel,
    Record,
    RecordKind,
    Repository,
    Result,
    Storage,
};

pub const DIMENSION: usize = 256;

/// Hashed bag-of-words embedder. Stateless, so any two instances agree.
#[derive(Debug, Default)]
pub struct HashEmbedder;

impl Embedder for HashEmbedder {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[slot(&word.to_lowercase())] += 1.0;
        }
        staffmatch::embedding::normalize(&mut vector);
        Ok(vector)
    }
}

/// FNV-1a over the word's bytes.
fn slot(word: &str) -> usize {
    let hash = word.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    (hash % DIMENSION as u64) as usize
}

/// Answers every prompt with the prompt itself.
#[derive(Debug, Default)]
pub struct EchoModel {
    pub prompts: RefCell<Vec<String>>,
}

impl LanguageModel for EchoModel {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(prompt.to_string())
    }
}

/// Strictly increasing ids shared by every test in the binary.
pub fn tick() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1_700_000_000_000);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

pub fn open(dir: &Path) -> Repository {
    Repository::open(Storage::new(dir))
        .expect("open repository")
        .with_clock(tick)
}

pub fn record(
    kind: RecordKind,
    name: &str,
    stack: &str,
    skills: &str,
    description: &str,
) -> Record {
    let mut record = Record::new(kind);
    record.name = name.to_string();
    record.stack = stack.to_string();
    record.skills = skills.to_string();
    record.description = description.to_string();
    record.normalize();
    record
}

pub fn staffmatch_bin() -> PathBuf {
    if let Some(bin) = option_env!("CARGO_BIN_EXE_staffmatch") {
        return PathBuf::from(bin);
    }

    let mut path = std::env::current_exe().expect("current exe");
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("staffmatch");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    path
}
