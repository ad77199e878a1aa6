use chrono::{DateTime, Utc};

use crate::world::driver::World;
use crate::world::record::LineRecord;

/// The external log-line parser collaborator. Receives each console
/// line together with the session's current logical timestamp.
pub trait LineParser: Send {
    fn parse_line(&mut self, text: &str, now: DateTime<Utc>) -> Option<LineRecord>;
}

impl<F> LineParser for F
where
    F: FnMut(&str, DateTime<Utc>) -> Option<LineRecord> + Send,
{
    fn parse_line(&mut self, text: &str, now: DateTime<Utc>) -> Option<LineRecord> {
        self(text, now)
    }
}

impl World {
    /// Feed a chunk of raw console output. The chunk is split on line
    /// feeds; a trailing fragment without a terminating line feed is
    /// discarded, matching how the log is appended to.
    pub fn add_console_chunk(&mut self, chunk: &str) {
        let mut lines = chunk.split('\n').peekable();
        while let Some(line) = lines.next() {
            if lines.peek().is_none() {
                break;
            }
            self.add_console_line(line);
        }
    }

    fn add_console_line(&mut self, line: &str) {
        let now = self.session().current_timestamp();
        match self.parse(line, now) {
            Some(record) => {
                self.emit_line_parsed(&record);
                self.apply_record(&record);
            }
            None => self.emit_line_unparsed(line),
        }
    }
}
