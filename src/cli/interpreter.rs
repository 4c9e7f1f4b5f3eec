//! Line-at-a-time command interpreter.
//!
//! Commands that need more input move the interpreter into a waiting state; each
//! later line answers exactly one prompt. For example `debit Gifts 25`, then
//! `12 27 20`, then `Sam's 24th` records a $25.00 debit against `Gifts`.

use std::mem;

use strsim::levenshtein;
use tracing::warn;

use crate::currency::Money;
use crate::errors::Result;
use crate::ledger::{Budget, Date, Month, Transaction, PRIMARY_ACCOUNT_NAME};

/// Output side of the interpreter.
pub trait CommandLineInterface {
    fn prompt(&mut self, message: &str);
    fn show_message(&mut self, message: &str);
    fn show_error(&mut self, message: &str);
    /// `account`, when given, names where the transaction was recorded.
    fn show_transaction(&mut self, transaction: &Transaction, account: Option<&str>);
    fn enumerate(&mut self, transactions: &[Transaction]);
    fn show_budget(&mut self, budget: &Budget);
}

/// Where `save` and `load` read and write the budget.
pub trait SessionStore {
    fn save(&mut self, budget: &Budget) -> Result<()>;
    fn load(&mut self, budget: &mut Budget) -> Result<()>;
}

pub const COMMANDS: &[&str] = &[
    "print",
    "save",
    "load",
    "credit",
    "debit",
    "transferto",
    "rename",
    "removecredit",
    "removedebit",
    "removetransfer",
    "verifycredit",
    "verifydebit",
    "close",
    "reduce",
    "create",
    "remove",
];

const DATE_PROMPT: &str = "date [month day year]";
const DESCRIPTION_PROMPT: &str = "description [anything]";
const NEW_NAME_PROMPT: &str = "new name [anything]";
const CONFIRM_PROMPT: &str = "is the above transaction correct? [y/n]";
const SELECT_PROMPT: &str = "multiple candidates found - which? [n]";
const RESELECT_PROMPT: &str = "try again - which? [n]";
const NO_MATCHES: &str = "no transactions matching amount found!";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Primary,
    Secondary(String),
}

impl Target {
    fn name(&self) -> &str {
        match self {
            Target::Primary => PRIMARY_ACCOUNT_NAME,
            Target::Secondary(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryAction {
    Add,
    Remove,
}

/// Commands waiting for their date line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Dated {
    Entry {
        action: EntryAction,
        target: Target,
        amount: Money,
    },
    Transfer {
        account: String,
        amount: Money,
    },
    RemoveTransfer {
        account: String,
        amount: Money,
    },
    Close {
        account: String,
    },
    Reduce,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum State {
    #[default]
    Normal,
    ReadyForDate(Dated),
    ReadyForDescription {
        action: EntryAction,
        target: Target,
        amount: Money,
        date: Date,
    },
    ReadyForNewName {
        account: String,
    },
    ReadyForSelection {
        target: Target,
        candidates: Vec<Transaction>,
    },
    ReadyForConfirmation {
        target: Target,
        transaction: Transaction,
    },
}

#[derive(Debug, Default)]
pub struct CommandLineInterpreter {
    state: State,
}

impl CommandLineInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when the next line is read as a command rather than an answer.
    pub fn is_idle(&self) -> bool {
        self.state == State::Normal
    }

    pub fn execute(
        &mut self,
        budget: &mut Budget,
        view: &mut dyn CommandLineInterface,
        store: &mut dyn SessionStore,
        input: &str,
    ) {
        let input = input.trim();
        self.state = match mem::take(&mut self.state) {
            State::Normal => execute_command(budget, view, store, input),
            State::ReadyForDate(command) => match parse_date(input) {
                Some(date) => execute_dated(budget, view, command, date),
                None => {
                    warn!(input, "unparsable date");
                    view.show_message(&format!("invalid date \"{input}\""));
                    view.prompt(DATE_PROMPT);
                    State::ReadyForDate(command)
                }
            },
            State::ReadyForDescription {
                action,
                target,
                amount,
                date,
            } => {
                let transaction = Transaction::new(amount, input, date);
                match (action, &target) {
                    (EntryAction::Add, Target::Primary) => budget.credit(transaction.clone()),
                    (EntryAction::Add, Target::Secondary(name)) => {
                        budget.debit(name, transaction.clone())
                    }
                    (EntryAction::Remove, Target::Primary) => budget.remove_credit(&transaction),
                    (EntryAction::Remove, Target::Secondary(name)) => {
                        budget.remove_debit(name, &transaction)
                    }
                }
                view.show_transaction(&transaction, Some(target.name()));
                State::Normal
            }
            State::ReadyForNewName { account } => {
                if let Err(refused) = budget.rename_account(&account, input) {
                    view.show_message(&format!("rename refused: {refused}"));
                }
                State::Normal
            }
            State::ReadyForSelection { target, candidates } => {
                let choice = input
                    .parse::<usize>()
                    .ok()
                    .filter(|n| (1..=candidates.len()).contains(n));
                match choice {
                    Some(n) => confirm(view, target, candidates[n - 1].clone()),
                    None => {
                        view.prompt(RESELECT_PROMPT);
                        State::ReadyForSelection { target, candidates }
                    }
                }
            }
            State::ReadyForConfirmation {
                target,
                transaction,
            } => {
                if input.eq_ignore_ascii_case("y") {
                    match &target {
                        Target::Primary => budget.verify_credit(&transaction),
                        Target::Secondary(name) => budget.verify_debit(name, &transaction),
                    }
                }
                State::Normal
            }
        };
    }
}

fn execute_command(
    budget: &mut Budget,
    view: &mut dyn CommandLineInterface,
    store: &mut dyn SessionStore,
    input: &str,
) -> State {
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };
    let command = command.to_ascii_lowercase();
    match command.as_str() {
        "" => State::Normal,
        "print" => {
            view.show_budget(budget);
            State::Normal
        }
        "save" => {
            if let Err(err) = store.save(budget) {
                view.show_error(&format!("save failed: {err}"));
            }
            State::Normal
        }
        "load" => {
            if let Err(err) = store.load(budget) {
                view.show_error(&format!("load failed: {err}"));
            }
            State::Normal
        }
        "credit" | "removecredit" => match parse_amount(view, rest) {
            Some(amount) => {
                let action = if command == "credit" {
                    EntryAction::Add
                } else {
                    EntryAction::Remove
                };
                await_date(
                    view,
                    Dated::Entry {
                        action,
                        target: Target::Primary,
                        amount,
                    },
                )
            }
            None => State::Normal,
        },
        "debit" | "removedebit" => match account_and_amount(view, &command, rest) {
            Some((account, amount)) => {
                let action = if command == "debit" {
                    EntryAction::Add
                } else {
                    EntryAction::Remove
                };
                await_date(
                    view,
                    Dated::Entry {
                        action,
                        target: Target::Secondary(account),
                        amount,
                    },
                )
            }
            None => State::Normal,
        },
        "transferto" => match account_and_amount(view, &command, rest) {
            Some((account, amount)) => await_date(view, Dated::Transfer { account, amount }),
            None => State::Normal,
        },
        "removetransfer" => match account_and_amount(view, &command, rest) {
            Some((account, amount)) => {
                await_date(view, Dated::RemoveTransfer { account, amount })
            }
            None => State::Normal,
        },
        "verifycredit" => match parse_amount(view, rest) {
            Some(amount) => {
                let candidates = budget.find_unverified_credits(amount);
                choose_candidate(view, Target::Primary, candidates)
            }
            None => State::Normal,
        },
        "verifydebit" => match account_and_amount(view, &command, rest) {
            Some((account, amount)) => {
                let candidates = budget.find_unverified_debits(&account, amount);
                choose_candidate(view, Target::Secondary(account), candidates)
            }
            None => State::Normal,
        },
        "rename" => match account_name(view, &command, rest) {
            Some(account) => {
                view.prompt(NEW_NAME_PROMPT);
                State::ReadyForNewName { account }
            }
            None => State::Normal,
        },
        "close" => match account_name(view, &command, rest) {
            Some(account) => await_date(view, Dated::Close { account }),
            None => State::Normal,
        },
        "reduce" => await_date(view, Dated::Reduce),
        "create" => {
            if let Some(account) = account_name(view, &command, rest) {
                budget.create_account(&account);
            }
            State::Normal
        }
        "remove" => {
            if let Some(account) = account_name(view, &command, rest) {
                budget.remove_account(&account);
            }
            State::Normal
        }
        _ => {
            let name = input.split_whitespace().next().unwrap_or_default();
            view.show_message(&format!("unknown command \"{name}\""));
            if let Some(best) = suggest_command(&command) {
                view.show_message(&format!("did you mean `{best}`?"));
            }
            State::Normal
        }
    }
}

fn execute_dated(
    budget: &mut Budget,
    view: &mut dyn CommandLineInterface,
    command: Dated,
    date: Date,
) -> State {
    match command {
        Dated::Entry {
            action,
            target,
            amount,
        } => {
            view.prompt(DESCRIPTION_PROMPT);
            return State::ReadyForDescription {
                action,
                target,
                amount,
                date,
            };
        }
        Dated::Transfer { account, amount } => budget.transfer_to(&account, amount, date),
        Dated::RemoveTransfer { account, amount } => {
            budget.remove_transfer(&account, amount, date)
        }
        Dated::Close { account } => budget.close_account(&account, date),
        Dated::Reduce => budget.reduce(date),
    }
    State::Normal
}

fn await_date(view: &mut dyn CommandLineInterface, command: Dated) -> State {
    view.prompt(DATE_PROMPT);
    State::ReadyForDate(command)
}

fn choose_candidate(
    view: &mut dyn CommandLineInterface,
    target: Target,
    mut candidates: Vec<Transaction>,
) -> State {
    match candidates.len() {
        0 => {
            view.show_message(NO_MATCHES);
            State::Normal
        }
        1 => confirm(view, target, candidates.remove(0)),
        _ => {
            view.enumerate(&candidates);
            view.prompt(SELECT_PROMPT);
            State::ReadyForSelection { target, candidates }
        }
    }
}

fn confirm(view: &mut dyn CommandLineInterface, target: Target, transaction: Transaction) -> State {
    view.show_transaction(&transaction, None);
    view.prompt(CONFIRM_PROMPT);
    State::ReadyForConfirmation {
        target,
        transaction,
    }
}

fn parse_amount(view: &mut dyn CommandLineInterface, text: &str) -> Option<Money> {
    match text.parse::<Money>() {
        Ok(amount) => Some(amount),
        Err(err) => {
            warn!(input = text, "unparsable amount");
            view.show_message(&err.to_string());
            None
        }
    }
}

/// Splits `<account words...> <amount>`; the last word is the amount.
fn account_and_amount(
    view: &mut dyn CommandLineInterface,
    command: &str,
    rest: &str,
) -> Option<(String, Money)> {
    let Some((account, amount)) = rest.rsplit_once(char::is_whitespace) else {
        view.show_message(&format!("usage: {command} <account> <amount>"));
        return None;
    };
    let account = account.trim();
    if account.is_empty() {
        view.show_message(&format!("usage: {command} <account> <amount>"));
        return None;
    }
    parse_amount(view, amount).map(|amount| (account.to_string(), amount))
}

fn account_name(view: &mut dyn CommandLineInterface, command: &str, rest: &str) -> Option<String> {
    if rest.is_empty() {
        view.show_message(&format!("usage: {command} <account>"));
        None
    } else {
        Some(rest.to_string())
    }
}

/// Reads `month day year`. Two-digit years are in the 2000s.
fn parse_date(text: &str) -> Option<Date> {
    let mut fields = text.split_whitespace();
    let month = fields.next()?.parse::<u32>().ok()?;
    let day = fields.next()?.parse::<u32>().ok()?;
    let year = fields.next()?.parse::<i32>().ok()?;
    if fields.next().is_some() || !(1..=31).contains(&day) || year < 0 {
        return None;
    }
    let year = if year < 100 { year + 2000 } else { year };
    Some(Date::new(year, Month::from_number(month)?, day))
}

fn suggest_command(input: &str) -> Option<&'static str> {
    COMMANDS
        .iter()
        .map(|name| (levenshtein(name, input), *name))
        .min_by_key(|(distance, _)| *distance)
        .filter(|(distance, _)| *distance <= 3)
        .map(|(_, name)| name)
}
