//! Monotonic `<unix_millis>-<sequence>` id generation per stream.
//! Falls back to bumping the sequence on the previous
//! millisecond when the wall clock does not advance (or regresses)
//! between two appends to the same stream.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct IdGenerator {
    last: Mutex<HashMap<String, (i64, u32)>>,
}

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator::default()
    }

    /// Produces the next id for `stream`, given the current wall-clock
    /// time in milliseconds. Logs a warning and falls back to bumping the
    /// previous id's sequence if `now_millis` has not advanced.
    pub fn next(&self, stream: &str, now_millis: i64) -> String {
        let mut last = self.last.lock().unwrap();
        let entry = last.entry(stream.to_string()).or_insert((0, 0));

        if now_millis > entry.0 {
            entry.0 = now_millis;
            entry.1 = 0;
        } else {
            if now_millis < entry.0 {
                tracing::warn!(
                    stream,
                    now_millis,
                    last_millis = entry.0,
                    "clock regression observed while generating audit id, falling back to sequence bump"
                );
            }
            entry.1 += 1;
        }

        format!("{}-{}", entry.0, entry.1)
    }
}
