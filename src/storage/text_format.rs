//! Line-oriented ledger file format.
//!
//! ```text
//! master
//! credits
//! ^2134.35 btnrh 11/22/2019
//! debits
//! ^50 transfer to Groceries 6/3/2021
//!
//! Groceries
//! credits
//! ^50 transfer from master 6/3/2021
//! debits
//! 12.05 milk and eggs 6/4/2021
//! ```
//!
//! Each entry line is `[^]<amount> <description> <date>`. The amount ends at the
//! first space and the date starts after the last one, so descriptions keep their
//! inner spacing but may not contain a newline.

use std::io::{BufRead, Write};

use crate::currency::Money;
use crate::errors::{LedgerError, Result};
use crate::ledger::{is_valid_account_name, Account, Date, Transaction, TransactionRecord, VerifiableTransaction};

use super::{
    AccountDeserialization, AccountDeserializationObserver, AccountSerialization,
    BudgetDeserialization, BudgetDeserializationObserver, BudgetSerialization,
};

const CREDITS_HEADER: &str = "credits";
const DEBITS_HEADER: &str = "debits";
const VERIFIED_MARKER: char = '^';

pub struct WritesBudgetToStream<W: Write> {
    writer: W,
}

impl<W: Write> WritesBudgetToStream<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> BudgetSerialization for WritesBudgetToStream<W> {
    /// Nothing is written when any name or description would not read back.
    fn save(&mut self, primary: &Account, secondaries: &[&Account]) -> Result<()> {
        for account in std::iter::once(primary).chain(secondaries.iter().copied()) {
            check_storable(account)?;
        }
        primary.save(&mut WritesAccountToStream {
            writer: &mut self.writer,
        })?;
        for account in secondaries {
            writeln!(self.writer)?;
            account.save(&mut WritesAccountToStream {
                writer: &mut self.writer,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

struct WritesAccountToStream<'a, W: Write> {
    writer: &'a mut W,
}

impl<W: Write> AccountSerialization for WritesAccountToStream<'_, W> {
    fn save(
        &mut self,
        name: &str,
        credits: &[TransactionRecord],
        debits: &[TransactionRecord],
    ) -> Result<()> {
        writeln!(self.writer, "{name}")?;
        writeln!(self.writer, "{CREDITS_HEADER}")?;
        for record in credits {
            writeln!(self.writer, "{}", format_entry(record.entry()))?;
        }
        writeln!(self.writer, "{DEBITS_HEADER}")?;
        for record in debits {
            writeln!(self.writer, "{}", format_entry(record.entry()))?;
        }
        Ok(())
    }
}

pub struct ReadsBudgetFromStream<R: BufRead> {
    lines: LineReader<R>,
}

impl<R: BufRead> ReadsBudgetFromStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: LineReader { reader, number: 0 },
        }
    }
}

impl<R: BufRead> BudgetDeserialization for ReadsBudgetFromStream<R> {
    fn load(&mut self, observer: &mut dyn BudgetDeserializationObserver) -> Result<()> {
        let mut first = true;
        while let Some(name) = self.lines.next_non_blank()? {
            if first {
                observer.primary_account_ready(&mut self.lines, &name)?;
                first = false;
            } else {
                observer.secondary_account_ready(&mut self.lines, &name)?;
            }
        }
        Ok(())
    }
}

struct LineReader<R: BufRead> {
    reader: R,
    number: usize,
}

impl<R: BufRead> LineReader<R> {
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        self.number += 1;
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn next_non_blank(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.next_line()? {
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn malformed(&self, message: impl Into<String>) -> LedgerError {
        LedgerError::MalformedData {
            line: self.number,
            message: message.into(),
        }
    }

    fn expect_header(&mut self, header: &str) -> Result<()> {
        match self.next_line()? {
            Some(line) if line.trim() == header => Ok(()),
            Some(line) => Err(self.malformed(format!("expected `{header}`, found `{line}`"))),
            None => Err(self.malformed(format!("expected `{header}`, found end of file"))),
        }
    }
}

impl<R: BufRead> AccountDeserialization for LineReader<R> {
    fn load(&mut self, observer: &mut dyn AccountDeserializationObserver) -> Result<()> {
        self.expect_header(CREDITS_HEADER)?;
        loop {
            let Some(line) = self.next_line()? else {
                return Err(self.malformed(format!("expected `{DEBITS_HEADER}`, found end of file")));
            };
            if line.trim() == DEBITS_HEADER {
                break;
            }
            let entry = parse_entry(&line).map_err(|message| self.malformed(message))?;
            observer.credit_ready(entry);
        }
        while let Some(line) = self.next_line()? {
            if line.trim().is_empty() {
                break;
            }
            let entry = parse_entry(&line).map_err(|message| self.malformed(message))?;
            observer.debit_ready(entry);
        }
        Ok(())
    }
}

fn check_storable(account: &Account) -> Result<()> {
    if !is_valid_account_name(account.name()) {
        return Err(LedgerError::UnstorableText(account.name().to_string()));
    }
    let unstorable = account
        .credits()
        .iter()
        .chain(account.debits())
        .map(|record| &record.transaction().description)
        .find(|description| description.contains(['\n', '\r']));
    match unstorable {
        Some(description) => Err(LedgerError::UnstorableText(description.clone())),
        None => Ok(()),
    }
}

/// Renders one entry line without its trailing newline.
pub fn format_entry(entry: &VerifiableTransaction) -> String {
    let transaction = &entry.transaction;
    let marker = if entry.verified {
        VERIFIED_MARKER.to_string()
    } else {
        String::new()
    };
    format!(
        "{}{} {} {}",
        marker,
        transaction.amount.to_storage_string(),
        transaction.description,
        transaction.date.to_storage_string()
    )
}

/// Parses one entry line, returning a description of the problem on failure.
pub fn parse_entry(line: &str) -> std::result::Result<VerifiableTransaction, String> {
    let (verified, body) = match line.strip_prefix(VERIFIED_MARKER) {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let (amount, rest) = body
        .split_once(' ')
        .ok_or_else(|| format!("expected `amount description date`, found `{line}`"))?;
    let (description, date) = rest
        .rsplit_once(' ')
        .ok_or_else(|| format!("missing date in `{line}`"))?;
    let amount: Money = amount.parse().map_err(|error: LedgerError| error.to_string())?;
    let date: Date = date.parse().map_err(|error: LedgerError| error.to_string())?;
    let transaction = Transaction::new(amount, description, date);
    Ok(VerifiableTransaction {
        transaction,
        verified,
    })
}
