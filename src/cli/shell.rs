use std::{
    borrow::Cow,
    cell::Cell,
    io::{self, BufRead},
    path::PathBuf,
    rc::Rc,
};

use dialoguer::{theme::ColorfulTheme, Confirm};
use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::{ValidationContext, ValidationResult, Validator},
    Context as ReadlineContext, Editor, Helper,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::cli::interpreter::{CommandLineInterpreter, SessionStore, COMMANDS};
use crate::cli::output::{self, ConsoleView, OutputPreferences};
use crate::config::Config;
use crate::currency::Money;
use crate::errors::{LedgerError, Result as LedgerResult};
use crate::ledger::{Account, Budget, BudgetObserver};
use crate::utils::persistence::TextFileStore;

pub const SCRIPT_ENV: &str = "BUDGET_LEDGER_SCRIPT";

const EXIT_COMMANDS: &[&str] = &["exit", "quit"];
const IDLE_PROMPT: &str = "budget> ";

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Readline(#[from] ReadlineError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

impl CliMode {
    pub fn from_env() -> Self {
        if std::env::var_os(SCRIPT_ENV).is_some() {
            CliMode::Script
        } else {
            CliMode::Interactive
        }
    }
}

enum LoopControl {
    Continue,
    Exit,
}

/// Tracks whether the budget differs from what was last saved or loaded.
#[derive(Debug, Default)]
struct ChangeTracker {
    unsaved: Cell<bool>,
}

impl ChangeTracker {
    fn has_unsaved_changes(&self) -> bool {
        self.unsaved.get()
    }
}

impl BudgetObserver for ChangeTracker {
    fn new_account_created(&self, _account: &mut Account, name: &str) {
        debug!(account = name, "account created");
    }

    fn total_balance_changed(&self, total: Money) {
        debug!(total = %total, "total balance changed");
    }

    fn unsaved_changes(&self) {
        self.unsaved.set(true);
    }

    fn saved(&self) {
        self.unsaved.set(false);
    }
}

/// File store that also clears the unsaved flag once a load replaces the budget.
struct TrackedStore {
    inner: TextFileStore,
    tracker: Rc<ChangeTracker>,
}

impl SessionStore for TrackedStore {
    fn save(&mut self, budget: &Budget) -> LedgerResult<()> {
        self.inner.save_budget(budget)?;
        output::success(format!("saved to {}", self.inner.path().display()));
        Ok(())
    }

    fn load(&mut self, budget: &mut Budget) -> LedgerResult<()> {
        self.inner.load_budget(budget)?;
        self.tracker.unsaved.set(false);
        output::success(format!("loaded {}", self.inner.path().display()));
        Ok(())
    }
}

struct Session {
    mode: CliMode,
    budget: Budget,
    interpreter: CommandLineInterpreter,
    view: ConsoleView,
    store: TrackedStore,
    tracker: Rc<ChangeTracker>,
}

impl Session {
    fn open(mode: CliMode, data_file: PathBuf) -> Result<Self, CliError> {
        let tracker = Rc::new(ChangeTracker::default());
        let mut budget = Budget::new();
        budget.attach(tracker.clone());

        let store = TextFileStore::new(data_file);
        if store.path().exists() {
            store.load_budget(&mut budget)?;
        } else {
            info!(path = %store.path().display(), "no ledger file yet; starting empty");
        }

        Ok(Self {
            mode,
            budget,
            interpreter: CommandLineInterpreter::new(),
            view: ConsoleView::new(),
            store: TrackedStore {
                inner: store,
                tracker: tracker.clone(),
            },
            tracker,
        })
    }

    fn prompt(&mut self) -> String {
        self.view
            .take_prompt()
            .unwrap_or_else(|| IDLE_PROMPT.to_string())
    }

    fn handle_line(&mut self, line: &str) -> Result<LoopControl, CliError> {
        let trimmed = line.trim();
        if self.interpreter.is_idle() {
            if trimmed.is_empty() {
                return Ok(LoopControl::Continue);
            }
            if EXIT_COMMANDS.contains(&trimmed.to_ascii_lowercase().as_str()) {
                return self.request_exit();
            }
        }
        self.interpreter
            .execute(&mut self.budget, &mut self.view, &mut self.store, trimmed);
        Ok(LoopControl::Continue)
    }

    fn request_exit(&self) -> Result<LoopControl, CliError> {
        if !self.tracker.has_unsaved_changes() {
            return Ok(LoopControl::Exit);
        }
        match self.mode {
            CliMode::Script => {
                output::warning("exiting with unsaved changes");
                Ok(LoopControl::Exit)
            }
            CliMode::Interactive => {
                let leave = Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("There are unsaved changes. Exit anyway?")
                    .default(false)
                    .interact()?;
                Ok(if leave {
                    LoopControl::Exit
                } else {
                    LoopControl::Continue
                })
            }
        }
    }
}

/// Runs the command shell against the configured ledger file until `exit`.
pub fn run_cli(config: &Config) -> Result<(), CliError> {
    run_cli_with_mode(config, CliMode::from_env())
}

pub fn run_cli_with_mode(config: &Config, mode: CliMode) -> Result<(), CliError> {
    output::set_preferences(OutputPreferences {
        plain: mode == CliMode::Script,
    });
    let mut session = Session::open(mode, config.data_file.clone())?;

    match mode {
        CliMode::Interactive => run_interactive(&mut session, config.history_file.as_ref()),
        CliMode::Script => run_script(&mut session),
    }
}

fn run_interactive(session: &mut Session, history: Option<&PathBuf>) -> Result<(), CliError> {
    let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(CommandHelper::new()));
    if let Some(path) = history {
        if editor.load_history(path).is_err() {
            debug!(path = %path.display(), "no readline history yet");
        }
    }

    loop {
        let prompt = session.prompt();
        match editor.readline(&prompt) {
            Ok(line) => {
                if session.interpreter.is_idle() && !line.trim().is_empty() {
                    editor.add_history_entry(line.trim()).ok();
                }
                match session.handle_line(&line)? {
                    LoopControl::Continue => {}
                    LoopControl::Exit => break,
                }
            }
            Err(ReadlineError::Interrupted) => match session.request_exit()? {
                LoopControl::Continue => {}
                LoopControl::Exit => break,
            },
            Err(ReadlineError::Eof) => {
                if session.tracker.has_unsaved_changes() {
                    output::warning("exiting with unsaved changes");
                }
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(path) = history {
        if let Err(err) = editor.save_history(path) {
            output::warning(format!("could not save history: {err}"));
        }
    }
    Ok(())
}

fn run_script(session: &mut Session) -> Result<(), CliError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if let Some(prompt) = session.view.take_prompt() {
            output::info(prompt.trim_end());
        }
        match session.handle_line(&line)? {
            LoopControl::Continue => {}
            LoopControl::Exit => break,
        }
    }
    if let Some(prompt) = session.view.take_prompt() {
        output::info(prompt.trim_end());
    }
    Ok(())
}

struct CommandHelper {
    commands: Vec<String>,
}

impl CommandHelper {
    fn new() -> Self {
        let mut commands: Vec<String> = COMMANDS
            .iter()
            .chain(EXIT_COMMANDS)
            .map(|name| name.to_string())
            .collect();
        commands.sort();
        Self { commands }
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let trimmed = prefix.trim_start();
        // only the command word completes; account names are free text
        if trimmed.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let start = prefix.len() - trimmed.len();
        let needle = trimmed.to_ascii_lowercase();
        let candidates = self
            .commands
            .iter()
            .filter(|name| name.starts_with(&needle))
            .map(|name| Pair {
                display: name.clone(),
                replacement: name.clone(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }
}

impl Validator for CommandHelper {
    fn validate(&self, _ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}
