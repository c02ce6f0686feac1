use std::io::{self, Write};

/// Ordered, human-readable record of one run of the operation sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationLog {
    entries: Vec<String>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every entry, one per line, in order
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for entry in &self.entries {
            writeln!(writer, "{}", entry)?;
        }
        writer.flush()
    }

    /// Flush to the console
    pub fn print(&self) -> io::Result<()> {
        self.write_to(io::stdout().lock())
    }

    /// Hand the entries over for rendering, leaving the log empty
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_to_keeps_order() {
        let mut log = OperationLog::new();
        log.push("#1 Inserts");
        log.push(String::from("Inserted"));

        let mut out = Vec::new();
        log.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "#1 Inserts\nInserted\n");

        // Writing does not consume the entries
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_take_clears() {
        let mut log = OperationLog::new();
        log.push("a");
        log.push("b");

        assert_eq!(log.take(), vec!["a".to_string(), "b".to_string()]);
        assert!(log.is_empty());
        assert!(log.take().is_empty());
    }
}
