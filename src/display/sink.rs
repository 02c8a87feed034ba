use crate::{Error, Result};

/// Anything that can show a row of text.
pub trait TextDisplay {
    /// Characters per row.
    fn width(&self) -> usize;
    fn rows(&self) -> usize;
    fn write_row(&mut self, row: usize, text: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Headless display that keeps the last text written to each row.
#[derive(Debug, Clone)]
pub struct MemoryDisplay {
    width: usize,
    rows: Vec<String>,
    writes: usize,
}

impl MemoryDisplay {
    pub fn new(width: usize, rows: usize) -> Self {
        Self {
            width,
            rows: vec![String::new(); rows],
            writes: 0,
        }
    }

    pub fn row(&self, row: usize) -> Option<&str> {
        self.rows.get(row).map(String::as_str)
    }

    /// Total `write_row` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl TextDisplay for MemoryDisplay {
    fn width(&self) -> usize {
        self.width
    }

    fn rows(&self) -> usize {
        self.rows.len()
    }

    fn write_row(&mut self, row: usize, text: &str) -> Result<()> {
        let count = self.rows.len();
        let slot = self
            .rows
            .get_mut(row)
            .ok_or_else(|| Error::InvalidArgs(format!("row {row} out of bounds for display with {count} rows")))?;
        *slot = text.chars().take(self.width).collect();
        self.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        for row in &mut self.rows {
            row.clear();
        }
        Ok(())
    }
}

impl<T: TextDisplay + ?Sized> TextDisplay for Box<T> {
    fn width(&self) -> usize {
        (**self).width()
    }

    fn rows(&self) -> usize {
        (**self).rows()
    }

    fn write_row(&mut self, row: usize, text: &str) -> Result<()> {
        (**self).write_row(row, text)
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_display_keeps_rows() {
        let mut display = MemoryDisplay::new(4, 2);
        display.write_row(1, "hello").unwrap();
        assert_eq!(display.row(1), Some("hell"));
        assert_eq!(display.row(0), Some(""));
        assert_eq!(display.writes(), 1);
    }

    #[test]
    fn out_of_range_row_is_an_error() {
        let mut display = MemoryDisplay::new(4, 2);
        assert!(display.write_row(2, "x").is_err());
    }
}
