//! The command interpreter: one owned context holding the registry, the alias
//! table, and the live queues, plus every entry point a host needs.
//!
//! Hosts construct it once at startup, call [`Interpreter::tick`] from their
//! event loop at [`Interpreter::tick_interval`], and feed user input through
//! [`Interpreter::execute_chain`] / [`Interpreter::run_single`]. Everything
//! runs on the caller's thread; nothing here blocks.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::alias::{split_name_value, AliasTable};
use crate::error::CommandError;
use crate::executor::{Dispatch, Executor};
use crate::fuzzy;
use crate::keywords::{BuiltinKeywords, KeywordExpander, NoKeywords};
use crate::paths;
use crate::registry::catalog::{self, PaletteEntry};
use crate::registry::usage::load_usage;
use crate::registry::{ArgKind, CommandSpec, Registry};
use crate::scheduler::{
    ItemRunner, QueueId, QueueItem, Scheduler, MAX_EXPANSION_DEPTH, SLEEP_COMMAND,
};
use crate::settings::InterpreterSettings;
use crate::tokenizer::Tokenizer;

// ── Diagnostics ─────────────────────────────────────────────────

/// Observable record of things the interpreter otherwise handles silently.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A chain item matched no command and no alias, or matched an alias
    /// whose expansion is not a command chain.
    Dropped {
        queue: QueueId,
        name: String,
        argument: String,
    },
    /// A command was found but its argument was missing or malformed.
    Rejected { name: String, reason: String },
    /// An expansion nested deeper than the limit and was discarded.
    TooDeep { queue: QueueId, name: String },
    /// A `sleep` argument that is not a usable number of seconds.
    BadSleep { queue: QueueId, argument: String },
}

pub type DiagnosticHook = Box<dyn Fn(&Diagnostic) + Send + Sync>;

fn report(hook: Option<&DiagnosticHook>, diagnostic: Diagnostic) {
    tracing::debug!("{diagnostic:?}");
    if let Some(hook) = hook {
        hook(&diagnostic);
    }
}

// ── Deferred chains ─────────────────────────────────────────────

/// Handle that lets actions issue chains without re-entering the
/// interpreter. Text sent while a queued item runs is spliced in right after
/// that item; anything else becomes a new queue on the next tick.
#[derive(Debug, Clone, Default)]
pub struct ChainSender {
    pending: Arc<Mutex<Vec<String>>>,
}

impl ChainSender {
    pub fn send(&self, text: impl Into<String>) {
        self.pending.lock().push(text.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending.lock())
    }
}

// ── Interpreter ─────────────────────────────────────────────────

pub struct Interpreter {
    settings: InterpreterSettings,
    tokenizer: Tokenizer,
    registry: Registry,
    aliases: AliasTable,
    scheduler: Scheduler,
    keywords: Box<dyn KeywordExpander>,
    usage_path: Option<PathBuf>,
    sender: ChainSender,
    diagnostics: Option<DiagnosticHook>,
}

impl Interpreter {
    /// In-memory interpreter: nothing is read from or written to disk.
    pub fn new<I>(settings: InterpreterSettings, commands: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = CommandSpec>,
    {
        Self::build(settings, commands, AliasTable::in_memory(), None)
    }

    /// Interpreter backed by `config_dir`: loads aliases and usage metadata,
    /// and writes them back on every change.
    pub fn open<I>(
        settings: InterpreterSettings,
        config_dir: &Path,
        commands: I,
    ) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = CommandSpec>,
    {
        let aliases = AliasTable::open(paths::aliases_path(config_dir));
        let usage_path = paths::commands_path(config_dir);
        let mut interpreter = Self::build(settings, commands, aliases, Some(usage_path))?;

        if let Some(path) = &interpreter.usage_path {
            let usage = load_usage(path);
            interpreter.registry.apply_usage(&usage);
        }
        Ok(interpreter)
    }

    fn build<I>(
        settings: InterpreterSettings,
        commands: I,
        mut aliases: AliasTable,
        usage_path: Option<PathBuf>,
    ) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = CommandSpec>,
    {
        let sleep = CommandSpec::new(
            SLEEP_COMMAND,
            "Wait a number of seconds before running the rest of the chain",
            |_| {},
        )
        .optional(ArgKind::Float)
        .extra("Only pauses its own chain. Defaults to 1 second.")
        .skip_palette();

        let registry = Registry::with_commands(commands.into_iter().chain(std::iter::once(sleep)))?;
        aliases.seed(settings.aliases.iter().map(String::as_str));
        for name in aliases.remove_where(|name| registry.contains(name)) {
            tracing::warn!("Ignoring alias '{name}': a command has the same name");
        }

        let keywords: Box<dyn KeywordExpander> = if settings.replace_keywords {
            Box::new(BuiltinKeywords {
                prefix: settings.command_prefix,
            })
        } else {
            Box::new(NoKeywords)
        };

        Ok(Self {
            tokenizer: Tokenizer::new(settings.command_prefix, settings.chain_separator),
            settings,
            registry,
            aliases,
            scheduler: Scheduler::new(),
            keywords,
            usage_path,
            sender: ChainSender::default(),
            diagnostics: None,
        })
    }

    /// Replace the keyword pass applied to string arguments.
    pub fn with_keywords(mut self, keywords: Box<dyn KeywordExpander>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Use a sender the host created up front, so the actions it registers
    /// can capture a clone before the interpreter exists.
    pub fn with_sender(mut self, sender: ChainSender) -> Self {
        self.sender = sender;
        self
    }

    pub fn set_diagnostics(&mut self, hook: DiagnosticHook) {
        self.diagnostics = Some(hook);
    }

    pub fn settings(&self) -> &InterpreterSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn sender(&self) -> ChainSender {
        self.sender.clone()
    }

    pub fn tick_interval(&self) -> Duration {
        self.settings.tick_interval()
    }

    // ── Chains ──────────────────────────────────────────────────

    pub fn is_command_text(&self, text: &str) -> bool {
        self.tokenizer.is_command_text(text)
    }

    /// Tokenize `text` and queue it. With `queue` set and still live, the
    /// items go in front of that queue's remainder; otherwise a new queue is
    /// started. Returns false when `text` is not a command chain.
    pub fn execute_chain(&mut self, text: &str, queue: Option<QueueId>) -> bool {
        let items = self.tokenizer.tokenize(text);
        if items.is_empty() {
            return false;
        }
        let items = match queue {
            Some(id) => match self.scheduler.extend_front(id, items) {
                Ok(()) => return true,
                Err(items) => items,
            },
            None => items,
        };
        self.scheduler.enqueue(items).is_some()
    }

    /// Like [`Self::execute_chain`] without a queue, returning the new
    /// queue's id.
    pub fn submit(&mut self, text: &str) -> Option<QueueId> {
        let items = self.tokenizer.tokenize(text);
        self.scheduler.enqueue(items)
    }

    pub fn cancel(&mut self, queue: QueueId) -> bool {
        self.scheduler.cancel(queue)
    }

    pub fn cancel_all(&mut self) {
        self.scheduler.cancel_all();
    }

    pub fn queue_ids(&self) -> Vec<QueueId> {
        self.scheduler.ids()
    }

    /// No live queues and no chains waiting to be picked up.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_empty() && self.sender.pending.lock().is_empty()
    }

    /// Advance all queues by one step. Call at the configured cadence with
    /// the time elapsed since the previous call.
    pub fn tick(&mut self, elapsed: Duration) {
        for text in self.sender.take() {
            self.submit(&text);
        }

        let Self {
            settings,
            tokenizer,
            registry,
            aliases,
            scheduler,
            keywords,
            usage_path,
            sender,
            diagnostics,
        } = self;

        let mut runner = ChainRunner {
            executor: Executor {
                registry,
                keywords: keywords.as_ref(),
                fuzzy_threshold: settings.fuzzy_threshold,
                usage_path: usage_path.as_deref(),
            },
            aliases,
            tokenizer: *tokenizer,
            sender,
            diagnostics: diagnostics.as_ref(),
        };
        scheduler.tick(elapsed, &mut runner);
    }

    // ── Direct invocation ───────────────────────────────────────

    /// Dispatch one command immediately. Returns true when its action ran.
    pub fn execute(&mut self, name: &str, argument: &str, record_usage: bool) -> bool {
        let outcome = self.executor().dispatch(name, argument, record_usage);
        if let Dispatch::Rejected { name, error } = &outcome {
            report(
                self.diagnostics.as_ref(),
                Diagnostic::Rejected {
                    name: name.clone(),
                    reason: error.to_string(),
                },
            );
        }
        outcome.succeeded()
    }

    /// Non-chained invocation, e.g. from a menu selection.
    pub fn run_single(&mut self, name: &str, argument: Option<&str>, record_usage: bool) {
        self.execute(name, argument.unwrap_or_default(), record_usage);
    }

    fn executor(&mut self) -> Executor<'_> {
        Executor {
            registry: &mut self.registry,
            keywords: self.keywords.as_ref(),
            fuzzy_threshold: self.settings.fuzzy_threshold,
            usage_path: self.usage_path.as_deref(),
        }
    }

    // ── Aliases ─────────────────────────────────────────────────

    /// Define an alias from `"name expansion..."`.
    pub fn set_alias(&mut self, raw: &str) -> Result<(), CommandError> {
        let (name, expansion) = split_name_value(raw).ok_or_else(|| CommandError::InvalidAlias {
            message: "Format: [name] [value]".to_string(),
        })?;
        if self.registry.contains(name) {
            return Err(CommandError::AliasShadowsCommand {
                name: name.to_string(),
            });
        }
        self.aliases.set(name, expansion)?;
        tracing::info!(
            "Set alias: {}{name} is now {expansion}",
            self.settings.command_prefix
        );
        Ok(())
    }

    pub fn unset_alias(&mut self, name: &str) -> Result<(), CommandError> {
        self.aliases.unset(name.trim())?;
        tracing::info!("Unset alias: {name}");
        Ok(())
    }

    pub fn get_alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name)
    }

    // ── Documentation ───────────────────────────────────────────

    pub fn describe_all(&self, filter: Option<&str>) -> String {
        catalog::describe_all(
            &self.registry,
            self.settings.command_prefix,
            self.settings.chain_separator,
            filter,
        )
    }

    pub fn write_command_doc(&self, path: &Path) -> Result<(), CommandError> {
        catalog::write_command_doc(
            &self.registry,
            self.settings.command_prefix,
            self.settings.chain_separator,
            path,
        )
    }

    pub fn palette(&self) -> Vec<PaletteEntry> {
        catalog::palette(&self.registry, self.settings.alt_palette)
    }
}

// ── Tick-time item runner ───────────────────────────────────────

struct ChainRunner<'a> {
    executor: Executor<'a>,
    aliases: &'a AliasTable,
    tokenizer: Tokenizer,
    sender: &'a ChainSender,
    diagnostics: Option<&'a DiagnosticHook>,
}

impl ChainRunner<'_> {
    /// Tokenize `texts` as children of `parent`, or drop them when the
    /// nesting limit is reached.
    fn nested(&self, queue: QueueId, parent: &QueueItem, texts: &[&str]) -> Vec<QueueItem> {
        if texts.is_empty() {
            return Vec::new();
        }
        if parent.depth() >= MAX_EXPANSION_DEPTH {
            report(
                self.diagnostics,
                Diagnostic::TooDeep {
                    queue,
                    name: parent.name().to_string(),
                },
            );
            return Vec::new();
        }
        let depth = parent.depth() + 1;
        texts
            .iter()
            .flat_map(|text| self.tokenizer.tokenize(text))
            .map(|item| item.nested(depth))
            .collect()
    }

    fn expand_alias(&self, queue: QueueId, item: &QueueItem, alias: &str) -> Vec<QueueItem> {
        let Some(expansion) = self.aliases.get(alias) else {
            return Vec::new();
        };
        let items = self.nested(queue, item, &[expansion]);
        // Too-deep expansions were already reported by `nested`.
        if items.is_empty() && item.depth() < MAX_EXPANSION_DEPTH {
            report(
                self.diagnostics,
                Diagnostic::Dropped {
                    queue,
                    name: item.name().to_string(),
                    argument: item.argument().to_string(),
                },
            );
        }
        items
    }

    /// Chains the action just sent through the [`ChainSender`].
    fn sent_by_action(&self, queue: QueueId, item: &QueueItem) -> Vec<QueueItem> {
        let texts = self.sender.take();
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.nested(queue, item, &texts)
    }
}

impl ItemRunner for ChainRunner<'_> {
    fn run(&mut self, queue: QueueId, item: &QueueItem) -> Vec<QueueItem> {
        if self.aliases.contains(item.name()) {
            return self.expand_alias(queue, item, item.name());
        }

        match self.executor.dispatch(item.name(), item.argument(), false) {
            Dispatch::Ran { .. } => self.sent_by_action(queue, item),
            Dispatch::Rejected { name, error } => {
                report(
                    self.diagnostics,
                    Diagnostic::Rejected {
                        name,
                        reason: error.to_string(),
                    },
                );
                Vec::new()
            }
            Dispatch::NotFound => {
                let similar = fuzzy::most_similar(
                    item.name(),
                    self.aliases.names(),
                    self.executor.fuzzy_threshold,
                );
                match similar {
                    Some(alias) => self.expand_alias(queue, item, alias),
                    None => {
                        report(
                            self.diagnostics,
                            Diagnostic::Dropped {
                                queue,
                                name: item.name().to_string(),
                                argument: item.argument().to_string(),
                            },
                        );
                        Vec::new()
                    }
                }
            }
        }
    }

    fn bad_sleep(&mut self, queue: QueueId, item: &QueueItem) {
        report(
            self.diagnostics,
            Diagnostic::BadSleep {
                queue,
                argument: item.argument().to_string(),
            },
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    use std::time::UNIX_EPOCH;

    use crate::registry::Argument;

    const TICK: Duration = Duration::from_millis(25);

    type Calls = Arc<Mutex<Vec<(String, Argument)>>>;

    fn recording(name: &str, calls: &Calls) -> CommandSpec {
        let calls = Arc::clone(calls);
        let tag = name.to_string();
        CommandSpec::new(name, format!("Run {name}"), move |arg| {
            calls.lock().push((tag.clone(), arg));
        })
    }

    fn commands(calls: &Calls) -> Vec<CommandSpec> {
        vec![
            recording("alpha", calls),
            recording("beta", calls),
            recording("gamma", calls),
            recording("tokens", calls).required(ArgKind::Integer),
        ]
    }

    fn interpreter(calls: &Calls) -> Interpreter {
        Interpreter::new(InterpreterSettings::default(), commands(calls)).unwrap()
    }

    fn ran(calls: &Calls) -> Vec<String> {
        calls.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    fn collect_diagnostics(interp: &mut Interpreter) -> Arc<Mutex<Vec<Diagnostic>>> {
        let seen: Arc<Mutex<Vec<Diagnostic>>> = Arc::default();
        let sink = Arc::clone(&seen);
        interp.set_diagnostics(Box::new(move |d| sink.lock().push(d.clone())));
        seen
    }

    fn run_until_idle(interp: &mut Interpreter) {
        for _ in 0..1_000 {
            if interp.is_idle() {
                break;
            }
            interp.tick(TICK);
        }
        assert!(interp.is_idle(), "interpreter never went idle");
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("chainline_test_interp_{tag}"));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_chain_runs_in_order_one_item_per_tick() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        assert!(interp.execute_chain("/alpha & /tokens 3 & /beta", None));

        interp.tick(TICK);
        assert_eq!(ran(&calls), vec!["alpha"]);
        run_until_idle(&mut interp);
        assert_eq!(ran(&calls), vec!["alpha", "tokens", "beta"]);
        assert_eq!(calls.lock()[1].1, Argument::Integer(3));
    }

    #[test]
    fn test_non_command_text_is_not_queued() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        assert!(!interp.is_command_text("hello there"));
        assert!(!interp.execute_chain("hello there", None));
        assert!(!interp.execute_chain("/alpha\n/beta", None));
        assert!(interp.is_idle());
    }

    #[test]
    fn test_sleep_delays_only_its_own_chain() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        interp.execute_chain("/sleep 1 & /alpha", None);
        interp.tick(TICK);

        interp.execute_chain("/beta", None);
        interp.tick(TICK);
        assert_eq!(ran(&calls), vec!["beta"]);

        for _ in 0..39 {
            interp.tick(TICK);
        }
        assert_eq!(ran(&calls), vec!["beta"]);
        interp.tick(TICK);
        assert_eq!(ran(&calls), vec!["beta", "alpha"]);
        assert!(interp.is_idle());
    }

    #[test]
    fn test_unknown_item_is_dropped_and_rest_of_chain_runs() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        let seen = collect_diagnostics(&mut interp);

        interp.execute_chain("/alpha & /qqqqqq 7 & /beta", None);
        run_until_idle(&mut interp);

        assert_eq!(ran(&calls), vec!["alpha", "beta"]);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            &seen[0],
            Diagnostic::Dropped { name, argument, .. } if name == "qqqqqq" && argument == "7"
        ));
    }

    #[test]
    fn test_bad_argument_is_reported_not_run() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        let seen = collect_diagnostics(&mut interp);

        interp.execute_chain("/tokens lots & /alpha", None);
        run_until_idle(&mut interp);

        assert_eq!(ran(&calls), vec!["alpha"]);
        assert!(matches!(&seen.lock()[0], Diagnostic::Rejected { name, .. } if name == "tokens"));
    }

    #[test]
    fn test_typo_in_chain_resolves_to_command() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        interp.execute_chain("/alpa & /bta", None);
        run_until_idle(&mut interp);
        assert_eq!(ran(&calls), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_duplicate_description_is_a_configuration_error() {
        let specs = vec![
            CommandSpec::new("save", "Persist state", |_| {}),
            CommandSpec::new("store", "Persist state", |_| {}),
        ];
        let err = Interpreter::new(InterpreterSettings::default(), specs).err().unwrap();
        assert!(err.is_configuration());

        let clash = vec![CommandSpec::new("sleep", "My own sleep", |_| {})];
        let err = Interpreter::new(InterpreterSettings::default(), clash).err().unwrap();
        assert!(matches!(err, CommandError::DuplicateName { ref name } if name == "sleep"));
    }

    #[test]
    fn test_alias_expansion_runs_before_remainder() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        interp.set_alias("both /alpha & /beta").unwrap();

        interp.execute_chain("/both & /gamma", None);
        run_until_idle(&mut interp);
        assert_eq!(ran(&calls), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_alias_fuzzy_fallback() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        interp.set_alias("morning /gamma").unwrap();

        interp.execute_chain("/mornin", None);
        run_until_idle(&mut interp);
        assert_eq!(ran(&calls), vec!["gamma"]);
    }

    #[test]
    fn test_self_referential_alias_stops() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        let seen = collect_diagnostics(&mut interp);
        interp.set_alias("again /again").unwrap();

        interp.execute_chain("/again & /alpha", None);
        run_until_idle(&mut interp);

        assert_eq!(ran(&calls), vec!["alpha"]);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(matches!(&seen[0], Diagnostic::TooDeep { name, .. } if name == "again"));
    }

    #[test]
    fn test_alias_may_not_shadow_command() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        assert!(matches!(
            interp.set_alias("alpha /beta"),
            Err(CommandError::AliasShadowsCommand { .. })
        ));
        assert!(matches!(interp.set_alias("lonely"), Err(CommandError::InvalidAlias { .. })));
        assert!(interp.aliases().is_empty());
    }

    #[test]
    fn test_alias_round_trip_survives_reopen() {
        let dir = temp_dir("alias");
        let calls: Calls = Arc::default();
        {
            let mut interp =
                Interpreter::open(InterpreterSettings::default(), &dir, commands(&calls)).unwrap();
            interp.set_alias("foo bar 1").unwrap();
            assert_eq!(interp.get_alias("foo"), Some("bar 1"));
            interp.set_alias("keep /alpha").unwrap();
            interp.unset_alias("foo").unwrap();
            assert_eq!(interp.get_alias("foo"), None);
            assert!(interp.unset_alias("foo").is_err());
        }

        let reopened =
            Interpreter::open(InterpreterSettings::default(), &dir, commands(&calls)).unwrap();
        assert_eq!(reopened.get_alias("keep"), Some("/alpha"));
        assert_eq!(reopened.get_alias("foo"), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_startup_aliases_are_seeded() {
        let calls: Calls = Arc::default();
        let settings = InterpreterSettings {
            aliases: vec!["ab /alpha & /beta".to_string()],
            ..InterpreterSettings::default()
        };
        let mut interp = Interpreter::new(settings, commands(&calls)).unwrap();
        interp.execute_chain("/ab", None);
        run_until_idle(&mut interp);
        assert_eq!(ran(&calls), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_startup_alias_cannot_hide_command() {
        let calls: Calls = Arc::default();
        let settings = InterpreterSettings {
            aliases: vec!["alpha /beta".to_string(), "ab /alpha & /beta".to_string()],
            ..InterpreterSettings::default()
        };
        let mut interp = Interpreter::new(settings, commands(&calls)).unwrap();
        assert_eq!(interp.get_alias("alpha"), None);
        assert_eq!(interp.get_alias("ab"), Some("/alpha & /beta"));

        interp.execute_chain("/alpha", None);
        run_until_idle(&mut interp);
        assert_eq!(ran(&calls), vec!["alpha"]);
    }

    #[test]
    fn test_stored_alias_cannot_hide_command() {
        let dir = temp_dir("shadow");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            paths::aliases_path(&dir),
            r#"{ "alpha": "/beta", "both": "/alpha & /beta" }"#,
        )
        .unwrap();

        let calls: Calls = Arc::default();
        let mut interp =
            Interpreter::open(InterpreterSettings::default(), &dir, commands(&calls)).unwrap();
        assert_eq!(interp.aliases().names().collect::<Vec<_>>(), vec!["both"]);

        interp.execute_chain("/alpha", None);
        run_until_idle(&mut interp);
        assert_eq!(ran(&calls), vec!["alpha"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_alias_without_command_chain_is_reported() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        let seen = collect_diagnostics(&mut interp);
        interp.set_alias("foo bar 1").unwrap();

        interp.execute_chain("/foo 9 & /alpha", None);
        run_until_idle(&mut interp);

        assert_eq!(ran(&calls), vec!["alpha"]);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            &seen[0],
            Diagnostic::Dropped { name, argument, .. } if name == "foo" && argument == "9"
        ));
    }

    #[test]
    fn test_custom_keyword_pass() {
        struct Shout;
        impl KeywordExpander for Shout {
            fn expand(&self, text: &str) -> String {
                text.to_uppercase()
            }
        }

        let calls: Calls = Arc::default();
        let mut specs = commands(&calls);
        specs.push(recording("say", &calls).required(ArgKind::Text));
        let mut interp = Interpreter::new(InterpreterSettings::default(), specs)
            .unwrap()
            .with_keywords(Box::new(Shout));

        interp.run_single("say", Some("hello"), false);
        assert_eq!(calls.lock()[0].1, Argument::Text("HELLO".into()));
    }

    #[test]
    fn test_usage_recorded_and_reloaded() {
        let dir = temp_dir("usage");
        std::fs::create_dir_all(&dir).unwrap();
        let calls: Calls = Arc::default();
        {
            let mut interp =
                Interpreter::open(InterpreterSettings::default(), &dir, commands(&calls)).unwrap();
            interp.run_single("gamma", None, true);
            interp.run_single("beta", None, false);
            interp.execute_chain("/alpha", None);
            run_until_idle(&mut interp);
        }
        assert_eq!(ran(&calls), vec!["gamma", "beta", "alpha"]);

        let reopened =
            Interpreter::open(InterpreterSettings::default(), &dir, commands(&calls)).unwrap();
        assert!(reopened.registry().get("gamma").unwrap().last_used > UNIX_EPOCH);
        assert_eq!(reopened.registry().get("beta").unwrap().last_used, UNIX_EPOCH);
        assert_eq!(reopened.registry().get("alpha").unwrap().last_used, UNIX_EPOCH);
        assert_eq!(reopened.palette()[0].name, "gamma");
        assert!(reopened.palette().iter().all(|row| row.name != "sleep"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_run_single_reports_success() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        assert!(interp.execute("tokens", "12", false));
        assert!(!interp.execute("tokens", "", false));
        assert!(!interp.execute("qqqqqq", "", false));
        interp.run_single("tokens", Some("5"), false);
        assert_eq!(ran(&calls), vec!["tokens", "tokens"]);
    }

    #[test]
    fn test_action_can_issue_follow_up_chain() {
        let calls: Calls = Arc::default();
        let sender = ChainSender::default();
        let mut specs = commands(&calls);
        let inner = sender.clone();
        specs.push(CommandSpec::new("both", "Run alpha then beta", move |_| {
            inner.send("/alpha & /beta");
        }));

        let mut interp = Interpreter::new(InterpreterSettings::default(), specs)
            .unwrap()
            .with_sender(sender);

        interp.execute_chain("/both & /gamma", None);
        run_until_idle(&mut interp);
        assert_eq!(ran(&calls), vec!["alpha", "beta", "gamma"]);

        // Outside a tick the chain waits for the next one as its own queue.
        interp.run_single("both", None, false);
        assert!(!interp.is_idle());
        run_until_idle(&mut interp);
        assert_eq!(ran(&calls), vec!["alpha", "beta", "gamma", "alpha", "beta"]);
    }

    #[test]
    fn test_existing_queue_gets_new_items_first() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        let id = interp.submit("/alpha & /beta").unwrap();
        interp.tick(TICK);

        assert!(interp.execute_chain("/gamma", Some(id)));
        let queue = interp.scheduler().get(id).unwrap();
        let pending: Vec<&str> = queue.items().map(QueueItem::name).collect();
        assert_eq!(pending, vec!["gamma", "beta"]);
        run_until_idle(&mut interp);
        assert_eq!(ran(&calls), vec!["alpha", "gamma", "beta"]);

        // A finished queue falls back to a fresh one.
        assert!(interp.execute_chain("/gamma", Some(id)));
        assert_eq!(interp.queue_ids().len(), 1);
    }

    #[test]
    fn test_cancel_stops_further_items() {
        let calls: Calls = Arc::default();
        let mut interp = interpreter(&calls);
        let id = interp.submit("/alpha & /beta").unwrap();
        interp.submit("/gamma");
        interp.tick(TICK);
        assert!(interp.cancel(id));
        run_until_idle(&mut interp);
        assert_eq!(ran(&calls), vec!["alpha", "gamma"]);

        interp.submit("/alpha");
        interp.cancel_all();
        assert!(interp.is_idle());
    }

    #[test]
    fn test_help_lists_builtin_sleep() {
        let calls: Calls = Arc::default();
        let interp = interpreter(&calls);
        let help = interp.describe_all(None);
        assert!(help.starts_with("# Commands"));
        assert!(help.contains("### sleep"));
        assert!(interp.describe_all(Some("tokens")).contains("Argument: required (integer)"));
    }
}
