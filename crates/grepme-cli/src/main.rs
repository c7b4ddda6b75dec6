//! CLI interface for grepme - grep for GroupMe.

mod render;

use std::env;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Args, CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use env_logger::fmt::WriteStyle;
use grepme_core::search::{ConversationResolver, compile_alternation, compile_user_pattern};
use grepme_core::{
    APP_NAME, AppConfig, AppPaths, AuthManager, ContextWindow, CoreError, FavoriteFilter, GroupMeClient,
    HOMEPAGE, MatchConfig, ResponseCache, SearchRequest, Session, TokenStorage,
    generate_schema, search_all,
};
use log::{LevelFilter, debug, info};

use crate::render::{RenderOptions, TerminalRenderer};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // usage errors exit with 1, --help and --version with 0
            let code = u8::from(err.use_stderr());
            err.print().ok();
            return ExitCode::from(code);
        }
    };

    match try_main(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_broken_pipe(&err) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if err.chain().any(|cause| {
                matches!(
                    cause.downcast_ref::<CoreError>(),
                    Some(CoreError::Status { .. })
                )
            }) {
                eprintln!("This is probably a bug. Please report it at {HOMEPAGE}/issues/new");
            }
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: &Cli) -> Result<()> {
    if let Some(shell) = cli.common.completions {
        handle_completions(shell);
        return Ok(());
    }

    let ctx = RuntimeContext::new(cli.common.clone(), cli.color_option())?;
    ctx.init_logging()?;
    debug!("resolved paths: {}", ctx.paths);

    if cli.common.schema {
        println!("{}", generate_schema(APP_NAME, HOMEPAGE)?);
        return Ok(());
    }
    if cli.common.show_config {
        return handle_show_config(&ctx, cli.json);
    }
    if cli.common.show_paths {
        return handle_show_paths(&ctx, cli.json);
    }

    let auth = AuthManager::new(TokenStorage::new(ctx.paths.credentials_file()));
    if cli.delete_cached {
        auth.clear_token().context("deleting stored token")?;
    }
    if cli.clear_cache {
        let dir = ctx.paths.responses_dir();
        if ResponseCache::purge(&dir)? {
            info!("removed response cache at {}", dir.display());
        }
    }
    if cli.patterns.is_empty() && !cli.list {
        return Ok(());
    }

    let token = auth.get_token()?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    rt.block_on(async {
        tokio::select! {
            result = run(&ctx, cli, token) => result,
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for ctrl-c")?;
                // so the shell prompt does not end up after ^C
                writeln!(io::stdout()).ok();
                Ok(())
            }
        }
    })
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}

#[derive(Debug, Parser)]
#[command(
    name = "grepme",
    author,
    version,
    about = "grep for GroupMe",
    after_help = "Patterns are regular expressions in which '.' also matches newlines."
)]
struct Cli {
    /// Text to search for. Multiple patterns are joined with '|'.
    #[arg(
        value_name = "PATTERN",
        required_unless_present_any = [
            "list", "delete_cached", "clear_cache", "completions",
            "show_config", "show_paths", "schema",
        ]
    )]
    patterns: Vec<String>,

    /// Conversation to search. Can be given multiple times.
    #[arg(short, long = "group", value_name = "REGEX")]
    group: Vec<String>,

    /// Show all available conversations and exit.
    #[arg(short, long)]
    list: bool,

    /// Only show messages from matching users. Can be given multiple times.
    #[arg(short, long = "user", value_name = "REGEX")]
    user: Vec<String>,

    /// Ignore case in patterns, conversation names and user names.
    #[arg(short, long)]
    ignore_case: bool,

    /// Show N messages sent after each match.
    #[arg(short, short_alias = 'A', long, value_name = "N", default_value_t = 0)]
    after_context: usize,

    /// Show N messages sent before each match.
    #[arg(short, short_alias = 'B', long, value_name = "N", default_value_t = 0)]
    before_context: usize,

    /// Show N messages around each match. Overrides -a and -b.
    #[arg(short, short_alias = 'C', long, value_name = "N")]
    context: Option<usize>,

    /// Only show the matched text, not the whole message.
    #[arg(short, long)]
    only_matching: bool,

    /// Only show messages that do not match.
    #[arg(short = 'v', long)]
    reverse_matching: bool,

    /// Only show messages you liked.
    #[arg(short = 'f', long, alias = "liked", conflicts_with = "not_favorited")]
    favorited: bool,

    /// Never show messages you liked.
    #[arg(short = 'F', long, alias = "not-liked")]
    not_favorited: bool,

    /// Always color output.
    #[arg(long, conflicts_with = "no_color")]
    color: bool,

    /// Never color output.
    #[arg(long = "no-color")]
    no_color: bool,

    /// Print messages as JSON, one per line. Implies --no-color.
    #[arg(long)]
    json: bool,

    /// Show the date each message was sent.
    #[arg(short, long)]
    date: bool,

    /// Do not show who sent each message.
    #[arg(short, long)]
    quiet: bool,

    /// Delete the stored access token, e.g. after a typo at the login prompt.
    ///
    /// Takes effect only once the rest of the command line parses.
    #[arg(short = 'D', long)]
    delete_cached: bool,

    /// Delete cached API responses.
    #[arg(long)]
    clear_cache: bool,

    #[command(flatten)]
    common: CommonOpts,
}

impl Cli {
    const fn color_option(&self) -> ColorOption {
        if self.color {
            ColorOption::Always
        } else if self.no_color {
            ColorOption::Never
        } else {
            ColorOption::Auto
        }
    }

    fn render_options(&self, color: ColorOption) -> RenderOptions {
        let color = !self.json
            && match color {
                ColorOption::Always => true,
                ColorOption::Never => false,
                ColorOption::Auto => io::stdout().is_terminal() && env::var_os("NO_COLOR").is_none(),
            };
        RenderOptions {
            color,
            json: self.json,
            date: self.date,
            show_users: !self.quiet,
        }
    }
}

/// Options that configure the program rather than the search.
#[derive(Debug, Clone, Args)]
#[command(next_help_heading = "Program options")]
pub struct CommonOpts {
    /// Read settings from this file, or from `config.toml` in this directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Log more to stderr; repeat for info, debug, trace.
    #[arg(long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Log every API request.
    #[arg(long)]
    pub debug: bool,
    /// Log everything, including paginator cursors.
    #[arg(long)]
    pub trace: bool,
    /// Print shell completions and exit.
    #[arg(long, value_name = "SHELL", value_enum)]
    pub completions: Option<Shell>,
    /// Print the effective configuration and exit.
    #[arg(long)]
    pub show_config: bool,
    /// Print the config, data and cache locations and exit.
    #[arg(long)]
    pub show_paths: bool,
    /// Print the JSON schema of the config file and exit.
    #[arg(long)]
    pub schema: bool,
}

/// When to color output.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorOption {
    /// Color when writing to a terminal and `NO_COLOR` is unset.
    Auto,
    /// Color even when piped.
    Always,
    /// Plain text only.
    Never,
}

// ─── Runtime ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    color: ColorOption,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts, color: ColorOption) -> Result<Self> {
        let paths = AppPaths::discover(common.config.as_deref())?;
        let config = AppConfig::load(&paths)?;
        let paths = paths.apply_overrides(&config)?;
        paths.ensure_directories()?;
        Ok(Self {
            common,
            color,
            paths,
            config,
        })
    }

    /// Route `log` output to stderr, or to `logging.file` when configured.
    /// `RUST_LOG` still refines the level picked from flags and config.
    fn init_logging(&self) -> Result<()> {
        let mut builder = env_logger::Builder::new();
        builder
            .filter_level(self.effective_log_level())
            .parse_default_env();

        let log_file = match &self.config.logging.file {
            Some(path) => Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("cannot open log file {path}"))?,
            ),
            None => None,
        };
        let style = if log_file.is_some() {
            WriteStyle::Never
        } else {
            self.stderr_style()
        };
        if let Some(file) = log_file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        builder.write_style(style);

        if let Err(err) = builder.try_init() {
            debug!("keeping the existing logger: {err}");
        }
        Ok(())
    }

    fn stderr_style(&self) -> WriteStyle {
        match self.color {
            ColorOption::Never => WriteStyle::Never,
            ColorOption::Always => WriteStyle::Always,
            ColorOption::Auto => {
                let allowed = env::var_os("NO_COLOR").is_none();
                if allowed && env::var_os("FORCE_COLOR").is_some() {
                    WriteStyle::Always
                } else if allowed && io::stderr().is_terminal() {
                    WriteStyle::Auto
                } else {
                    WriteStyle::Never
                }
            }
        }
    }

    const fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => self.config.logging.level.filter(),
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    async fn open_cache(&self) -> Option<ResponseCache> {
        if !self.config.cache.enabled {
            return None;
        }
        match ResponseCache::open(&self.paths.responses_dir()).await {
            Ok(cache) => {
                if let Ok(entries) = cache.entry_count().await {
                    debug!("response cache holds {entries} pages");
                }
                Some(cache)
            }
            Err(e) => {
                log::warn!("response cache unavailable, fetching everything live: {e}");
                None
            }
        }
    }
}

// ─── Handlers ────────────────────────────────────────────────────────

async fn run(ctx: &RuntimeContext, cli: &Cli, token: String) -> Result<()> {
    let cache = ctx.open_cache().await;
    let client = GroupMeClient::new(&ctx.config.api, token, cache)?;
    let session = Session::new(client, ctx.config.api.page_size);

    let stdout = io::stdout();
    let mut renderer = TerminalRenderer::new(stdout.lock(), cli.render_options(ctx.color));

    if cli.list {
        handle_list(ctx, &session, &mut renderer).await?;
    } else {
        handle_search(ctx, cli, &session, &mut renderer).await?;
    }
    renderer.flush()?;
    Ok(())
}

async fn handle_list<W: io::Write>(
    ctx: &RuntimeContext,
    session: &Session<GroupMeClient>,
    renderer: &mut TerminalRenderer<W>,
) -> Result<()> {
    let include_dms = ctx.config.search.include_direct_messages;
    let mut resolver = ConversationResolver::new(session, None, include_dms);
    while let Some(conversation) = resolver.next().await? {
        renderer.list_conversation(&conversation)?;
    }
    Ok(())
}

async fn handle_search<W: io::Write>(
    ctx: &RuntimeContext,
    cli: &Cli,
    session: &Session<GroupMeClient>,
    renderer: &mut TerminalRenderer<W>,
) -> Result<()> {
    let request = build_request(ctx, cli, session).await?;
    let summary = search_all(session, &request, renderer).await?;
    info!(
        "searched {} conversation(s), {} match(es)",
        summary.conversations, summary.matches
    );
    Ok(())
}

async fn build_request(
    ctx: &RuntimeContext,
    cli: &Cli,
    session: &Session<GroupMeClient>,
) -> Result<SearchRequest> {
    let pattern = compile_alternation(&cli.patterns, cli.ignore_case).context("invalid PATTERN")?;
    let user_pattern = compile_user_pattern(&cli.user, cli.ignore_case).context("invalid --user")?;

    let groups = if cli.group.is_empty() {
        &ctx.config.search.default_groups
    } else {
        &cli.group
    };
    let conversations = groups
        .iter()
        .map(|group| {
            compile_alternation(std::slice::from_ref(group), cli.ignore_case)
                .with_context(|| format!("invalid --group '{group}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    // only look the user up when a like filter needs it
    let favorited = if cli.favorited {
        FavoriteFilter::RequireFavorited(session.logged_in_user().await?.to_string())
    } else if cli.not_favorited {
        FavoriteFilter::RequireNotFavorited(session.logged_in_user().await?.to_string())
    } else {
        FavoriteFilter::Any
    };

    let match_config = MatchConfig {
        pattern,
        reverse: cli.reverse_matching,
        only_matching: cli.only_matching,
        ignore_case: cli.ignore_case,
        user_pattern,
        favorited,
        context: ContextWindow::resolve(cli.before_context, cli.after_context, cli.context),
    };
    debug!("match config: {match_config:?}");

    let highlight = cli.render_options(ctx.color).color;
    Ok(SearchRequest {
        conversations,
        match_config,
        highlight,
        include_direct_messages: ctx.config.search.include_direct_messages,
    })
}

fn handle_show_config(ctx: &RuntimeContext, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ctx.config).context("serializing config to JSON")?
        );
    } else {
        println!("{:#?}", ctx.config);
    }
    Ok(())
}

fn handle_show_paths(ctx: &RuntimeContext, json: bool) -> Result<()> {
    if json {
        let paths = serde_json::json!({
            "config": ctx.paths.config_file,
            "data": ctx.paths.data_dir,
            "cache": ctx.paths.cache_dir,
            "credentials": ctx.paths.credentials_file(),
            "responses": ctx.paths.responses_dir(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&paths).context("serializing paths to JSON")?
        );
    } else {
        println!("config:      {}", ctx.paths.config_file.display());
        println!("data:        {}", ctx.paths.data_dir.display());
        println!("cache:       {}", ctx.paths.cache_dir.display());
        println!("credentials: {}", ctx.paths.credentials_file().display());
        println!("responses:   {}", ctx.paths.responses_dir().display());
    }
    Ok(())
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}
