//! Object key naming shared by PUT and GET runs

use std::sync::Arc;

/// Key of the `sequence`-th object written by PUT worker `worker_id`
pub fn object_key(prefix: &str, worker_id: usize, sequence: u64) -> String {
    format!("{}w{:04}-{:010}", prefix, worker_id, sequence)
}

/// Per-worker source of GET keys
#[derive(Debug, Clone)]
pub enum KeyCursor {
    /// Cycle over keys found by listing: worker `w` of `W` reads `w, w+W, w+2W, ...`
    Discovered {
        keys: Arc<Vec<String>>,
        next: usize,
        stride: usize,
    },
    /// Re-derive the keys a PUT worker with the same id wrote
    Derived {
        prefix: String,
        worker_id: usize,
        objects_per_worker: u64,
        sequence: u64,
    },
}

impl KeyCursor {
    pub fn discovered(keys: Arc<Vec<String>>, worker_id: usize, workers: usize) -> Self {
        KeyCursor::Discovered {
            keys,
            next: worker_id,
            stride: workers.max(1),
        }
    }

    pub fn derived(prefix: impl Into<String>, worker_id: usize, objects_per_worker: u64) -> Self {
        KeyCursor::Derived {
            prefix: prefix.into(),
            worker_id,
            objects_per_worker: objects_per_worker.max(1),
            sequence: 0,
        }
    }

    /// Next key to read; `None` only for an empty discovered set
    pub fn next_key(&mut self) -> Option<String> {
        match self {
            KeyCursor::Discovered { keys, next, stride } => {
                if keys.is_empty() {
                    return None;
                }
                let key = keys[*next % keys.len()].clone();
                *next = (*next + *stride) % keys.len();
                Some(key)
            }
            KeyCursor::Derived {
                prefix,
                worker_id,
                objects_per_worker,
                sequence,
            } => {
                let key = object_key(prefix, *worker_id, *sequence % *objects_per_worker);
                *sequence += 1;
                Some(key)
            }
        }
    }
}
