use colored::Colorize;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use crate::cli::interpreter::CommandLineInterface;
use crate::ledger::{Account, Budget, Transaction, VerifiableTransaction};

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OutputPreferences {
    /// Disables colour, e.g. when output is piped or scripted.
    pub plain: bool,
}

static PREFERENCES: OnceLock<RwLock<OutputPreferences>> = OnceLock::new();

pub fn set_preferences(prefs: OutputPreferences) {
    let lock = PREFERENCES.get_or_init(|| RwLock::new(OutputPreferences::default()));
    if let Ok(mut guard) = lock.write() {
        *guard = prefs;
    }
}

fn preferences() -> OutputPreferences {
    PREFERENCES
        .get_or_init(|| RwLock::new(OutputPreferences::default()))
        .read()
        .map(|guard| *guard)
        .unwrap_or_default()
}

fn apply_style(kind: MessageKind, message: impl fmt::Display, prefs: &OutputPreferences) -> String {
    let text = message.to_string();
    if prefs.plain {
        return text;
    }
    match kind {
        MessageKind::Info => text,
        MessageKind::Success => text.bright_green().to_string(),
        MessageKind::Warning => text.bright_yellow().to_string(),
        MessageKind::Error => text.bright_red().to_string(),
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    println!("{}", apply_style(kind, message, &preferences()));
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

/// Console implementation of the interpreter's output.
///
/// Prompts are held back so the line editor can show them in front of the cursor.
#[derive(Debug, Default)]
pub struct ConsoleView {
    pending_prompt: Option<String>,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_prompt(&mut self) -> Option<String> {
        self.pending_prompt.take()
    }
}

impl CommandLineInterface for ConsoleView {
    fn prompt(&mut self, message: &str) {
        self.pending_prompt = Some(format!("{message} "));
    }

    fn show_message(&mut self, message: &str) {
        warning(message);
    }

    fn show_error(&mut self, message: &str) {
        error(message);
    }

    fn show_transaction(&mut self, transaction: &Transaction, account: Option<&str>) {
        let line = format_transaction(transaction);
        match account {
            Some(account) => success(format!("{line} -> {account}")),
            None => info(line),
        }
    }

    fn enumerate(&mut self, transactions: &[Transaction]) {
        for (index, transaction) in transactions.iter().enumerate() {
            info(format!("[{}] {}", index + 1, format_transaction(transaction)));
        }
    }

    fn show_budget(&mut self, budget: &Budget) {
        info(render_budget(budget));
    }
}

pub fn format_transaction(transaction: &Transaction) -> String {
    format!(
        "{} {} {}",
        transaction.amount, transaction.date, transaction.description
    )
}

/// Every account, primary first, separated by blank lines.
pub fn render_budget(budget: &Budget) -> String {
    std::iter::once(budget.primary())
        .chain(budget.accounts())
        .map(render_account_summary)
        .collect::<Vec<_>>()
        .join("\n\n")
}

const DEBIT_HEADING: &str = "Debit ($)";
const CREDIT_HEADING: &str = "Credit ($)";
const HEADING_GAP: usize = 3;
const DATE_GAP: usize = 10;

pub fn render_account_summary(account: &Account) -> String {
    let mut rows: Vec<(bool, &VerifiableTransaction)> = account
        .credits()
        .iter()
        .map(|record| (true, record.entry()))
        .chain(account.debits().iter().map(|record| (false, record.entry())))
        .collect();
    rows.sort_by_key(|(_, entry)| entry.transaction.date);

    let date_column = DEBIT_HEADING.len() + CREDIT_HEADING.len() + 2 * HEADING_GAP;
    let gap = " ".repeat(HEADING_GAP);
    let mut lines = vec![
        "----".to_string(),
        account.name().to_string(),
        account.balance().to_string(),
        String::new(),
        format!("{DEBIT_HEADING}{gap}{CREDIT_HEADING}{gap}Date (mm/dd/yyyy){gap}Description"),
    ];
    for (is_credit, entry) in rows {
        let amount = format!(
            "{}{}",
            if entry.verified { "" } else { "*" },
            entry.transaction.amount.plain()
        );
        let (lead, width, trail) = if is_credit {
            let lead = date_column - CREDIT_HEADING.len() - HEADING_GAP;
            (lead, CREDIT_HEADING.len(), HEADING_GAP)
        } else {
            (0, DEBIT_HEADING.len(), date_column - DEBIT_HEADING.len())
        };
        lines.push(format!(
            "{:lead$}{:>width$}{:trail$}{}{:DATE_GAP$}{}",
            "",
            amount,
            "",
            entry.transaction.date,
            "",
            entry.transaction.description,
        ));
    }
    lines.push("----".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Money;
    use crate::ledger::{Date, Month};

    #[test]
    fn renders_rows_in_date_order_with_aligned_columns() {
        let mut budget = Budget::new();
        budget.debit(
            "Gifts",
            Transaction::new(Money::from_cents(2500), "Sam's 24th", Date::new(2020, Month::December, 27)),
        );
        budget.transfer_to("Gifts", Money::from_cents(5000), Date::new(2020, Month::December, 1));
        let gifts = budget.account("Gifts").expect("created");

        let expected = [
            "----",
            "Gifts",
            "$25.00",
            "",
            "Debit ($)   Credit ($)   Date (mm/dd/yyyy)   Description",
            "                 50.00   12/01/2020          transfer from master",
            "   *25.00                12/27/2020          Sam's 24th",
            "----",
        ]
        .join("\n");
        assert_eq!(render_account_summary(gifts), expected);
    }

    #[test]
    fn credits_precede_debits_on_the_same_date() {
        let mut budget = Budget::new();
        let when = Date::new(2021, Month::June, 3);
        budget.debit("Food", Transaction::new(Money::from_cents(100), "first", when));
        budget.transfer_to("Food", Money::from_cents(200), when);
        let text = render_account_summary(budget.account("Food").expect("created"));
        let credit = text.find("transfer from master").expect("credit row");
        let debit = text.find("first").expect("debit row");
        assert!(credit < debit);
    }

    #[test]
    fn budget_lists_primary_first() {
        let mut budget = Budget::new();
        budget.create_account("Alpha");
        let text = render_budget(&budget);
        let master = text.find("master").expect("primary");
        let alpha = text.find("Alpha").expect("secondary");
        assert!(master < alpha);
        assert!(text.contains("----\n\n----"));
    }

    #[test]
    fn console_view_holds_the_prompt_until_taken() {
        let mut view = ConsoleView::new();
        view.prompt("date [month day year]");
        assert_eq!(view.take_prompt().as_deref(), Some("date [month day year] "));
        assert_eq!(view.take_prompt(), None);
    }
}
