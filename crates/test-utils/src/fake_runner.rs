use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use backup_sentinel::action::{ActionOutput, ActionRunner};
use backup_sentinel::errors::Result;

/// A fake action runner that:
/// - records every `(id, command)` it was asked to run
/// - succeeds, unless the id was registered with `fail_for`.
#[derive(Clone, Default)]
pub struct FakeActionRunner {
    executed: Arc<Mutex<Vec<(i64, String)>>>,
    failing: Arc<Mutex<HashSet<i64>>>,
}

impl FakeActionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every run for `id` exit with status 1 until `succeed_for` is called.
    pub fn fail_for(&self, id: i64) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn succeed_for(&self, id: i64) {
        self.failing.lock().unwrap().remove(&id);
    }

    pub fn executed(&self) -> Vec<(i64, String)> {
        self.executed.lock().unwrap().clone()
    }

    pub fn executed_ids(&self) -> Vec<i64> {
        self.executed().into_iter().map(|(id, _)| id).collect()
    }

    pub fn clear(&self) {
        self.executed.lock().unwrap().clear();
    }
}

impl ActionRunner for FakeActionRunner {
    fn run<'a>(
        &'a self,
        id: i64,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ActionOutput>> + Send + 'a>> {
        let executed = Arc::clone(&self.executed);
        let failing = Arc::clone(&self.failing);

        Box::pin(async move {
            executed.lock().unwrap().push((id, command.to_string()));

            let fail = failing.lock().unwrap().contains(&id);
            Ok(ActionOutput {
                exit_code: if fail { 1 } else { 0 },
                stdout: String::new(),
                stderr: if fail {
                    "simulated failure".to_string()
                } else {
                    String::new()
                },
            })
        })
    }
}
