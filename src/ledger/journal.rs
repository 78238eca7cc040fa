//! Append-only audit journal, one JSON transaction per line.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::{Result, Transaction};

pub struct Journal {
    path: PathBuf,
    file: Mutex<File>,
}

impl Journal {
    /// Open (or create) the journal for appending
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, tx: &Transaction) -> Result<()> {
        let mut line = serde_json::to_vec(tx)?;
        line.push(b'\n');
        let mut file = self.file.lock();
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    /// Read every entry back, oldest first
    #[cfg(test)]
    pub fn read_all(path: &Path) -> Result<Vec<Transaction>> {
        use std::io::{BufRead, BufReader};

        let reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UserId;
    use rust_decimal::Decimal;

    #[test]
    fn test_record_and_read_back() {
        let path = std::env::temp_dir().join(format!("cryptosim-journal-{}.jsonl", uuid::Uuid::new_v4()));
        let journal = Journal::open(&path).unwrap();

        let user = UserId::new("bob").unwrap();
        let buy = Transaction::buy(
            user.clone(),
            "SOL/USD".parse().unwrap(),
            Decimal::from(2),
            Decimal::from(150),
            Decimal::from(300),
        );
        let sell = Transaction::sell(
            user,
            "SOL/USD".parse().unwrap(),
            Decimal::from(1),
            Decimal::from(160),
            Decimal::from(160),
            Decimal::from(10),
        );
        journal.record(&buy).unwrap();
        journal.record(&sell).unwrap();

        let entries = Journal::read_all(journal.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, buy.id);
        assert_eq!(entries[1].profit_loss, Decimal::from(10));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_high_precision_entry_reads_back_exactly() {
        let path = std::env::temp_dir().join(format!("cryptosim-journal-{}.jsonl", uuid::Uuid::new_v4()));
        let journal = Journal::open(&path).unwrap();

        let quantity: Decimal = "123456.12345678".parse().unwrap();
        let price: Decimal = "0.00001812345678".parse().unwrap();
        let tx = Transaction::buy(
            UserId::new("carol").unwrap(),
            "SHIB/USD".parse().unwrap(),
            quantity,
            price,
            quantity * price,
        );
        journal.record(&tx).unwrap();

        let entries = Journal::read_all(&path).unwrap();
        assert_eq!(entries, vec![tx]);
        assert_eq!(entries[0].total, entries[0].quantity * entries[0].price);

        std::fs::remove_file(&path).ok();
    }
}
