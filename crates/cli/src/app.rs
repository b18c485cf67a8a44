//! CLI application entry point and configuration.
//!
//! This module provides the main CLI application logic, including argument parsing,
//! configuration loading, and command dispatch.

use crate::commands::{
    AccountCommand, AreasCommand, AskArgs, BlacklistCommand, Cli, Commands, CommentsCommand, ConfigCommand, FtpArgs,
    NotificationsCommand, OutputFormat, ReportsCommand, RoleArg, SharesCommand, StaffCommand,
    SuggestArgs, VehiclesCommand, WatchArgs,
};
use crate::error::{CliError, Result};
use crate::output;
use clap::Parser;
use parkwatch_client::api::NotificationFilters;
use parkwatch_client::{AiClient, AuthClient, FileSessionStore};
use parkwatch_core::config::default_config_path;
use parkwatch_core::types::{
    FtpServer, NewArea, NewReport, NewStaff, ProfileUpdate, Registration, Role, StaffUpdate,
};
use parkwatch_core::ParkwatchConfig;
use parkwatch_realtime::{ConnectionState, RealtimeClient, RealtimeError, RealtimeSettings};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn, Level};

/// Main CLI application.
#[derive(Debug)]
pub struct App {
    /// Effective configuration.
    pub config: ParkwatchConfig,
    /// Parsed CLI arguments.
    pub cli: Cli,
}

impl App {
    /// Create a new application instance from command line arguments.
    pub fn new() -> Result<Self> {
        let cli = Cli::parse();
        let config = Self::load_config(&cli)?;
        Ok(Self { config, cli })
    }

    /// Application over an already resolved configuration.
    pub fn with_config(cli: Cli, config: ParkwatchConfig) -> Self {
        Self { config, cli }
    }

    /// Load configuration from file and environment.
    fn load_config(cli: &Cli) -> Result<ParkwatchConfig> {
        // `config init` must work before any file exists.
        if let Commands::Config(args) = &cli.command {
            if matches!(args.command, ConfigCommand::Init { .. }) {
                return Ok(ParkwatchConfig::default());
            }
        }
        Ok(ParkwatchConfig::resolve(cli.config.as_deref())?)
    }

    /// Run the application.
    pub fn run(self) -> Result<()> {
        self.setup_logging();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let rendered = runtime.block_on(self.execute())?;
        if !rendered.is_empty() {
            println!("{}", rendered);
        }
        Ok(())
    }

    /// Set up logging based on verbosity level.
    fn setup_logging(&self) {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(log_level(self.cli.verbose))
            .with_target(false)
            .with_writer(std::io::stderr);
        if subscriber.try_init().is_err() {
            debug!("logging already initialized");
        }
    }

    /// Execute the command and return its rendered output.
    pub async fn execute(&self) -> Result<String> {
        match &self.cli.command {
            Commands::Login(args) => {
                let client = self.auth_client()?;
                let reply = client.login(&args.username, &args.password).await?;
                let message = reply
                    .message
                    .unwrap_or_else(|| format!("Logged in as {}", args.username));
                self.render(&json!({ "username": args.username, "message": message }), |_| {
                    message.clone()
                })
            }
            Commands::Register(args) => {
                let client = self.auth_client()?;
                let registration = Registration {
                    username: args.username.clone(),
                    email: args.email.clone(),
                    password: args.password.clone(),
                    business_id: args.business_id.clone(),
                    role: args.role.map(|role| match role {
                        RoleArg::User => Role::User,
                        RoleArg::Admin => Role::Admin,
                    }),
                };
                let reply = client.register(&registration).await?;
                let logged_in = reply.access_token.is_some();
                let message = reply
                    .message
                    .unwrap_or_else(|| format!("Registered {}", args.username));
                self.render(
                    &json!({ "username": args.username, "message": message, "loggedIn": logged_in }),
                    |_| message.clone(),
                )
            }
            Commands::Logout => {
                self.auth_client()?.logout().await;
                self.render(&json!({ "loggedIn": false }), |_| "Logged out".to_string())
            }
            Commands::Whoami => {
                let user = self.auth_client()?.me().await?;
                self.render(&user, output::user)
            }
            Commands::Account(args) => self.handle_account(&args.command).await,
            Commands::Areas(args) => self.handle_areas(&args.command).await,
            Commands::Vehicles(args) => self.handle_vehicles(&args.command).await,
            Commands::Staff(args) => self.handle_staff(&args.command).await,
            Commands::Reports(args) => self.handle_reports(&args.command).await,
            Commands::Comments(args) => self.handle_comments(&args.command).await,
            Commands::Shares(args) => self.handle_shares(&args.command).await,
            Commands::Notifications(args) => self.handle_notifications(&args.command).await,
            Commands::Blacklist(args) => self.handle_blacklist(&args.command).await,
            Commands::Ask(args) => self.handle_ask(args).await,
            Commands::Suggest(args) => self.handle_suggest(args).await,
            Commands::Watch(args) => self.handle_watch(args).await,
            Commands::Config(args) => self.handle_config(&args.command),
            Commands::Version => Ok(version_text()),
        }
    }

    fn render<T, F>(&self, value: &T, text: F) -> Result<String>
    where
        T: serde::Serialize + ?Sized,
        F: FnOnce(&T) -> String,
    {
        output::render(self.cli.format, value, text)
    }

    fn auth_client(&self) -> Result<AuthClient> {
        let store = Arc::new(FileSessionStore::new(self.config.session_path()?));
        Ok(AuthClient::from_config(&self.config.backend, store)?)
    }

    /// `explicit`, else the logged-in user's business.
    async fn business_id(&self, client: &AuthClient, explicit: Option<&str>) -> Result<String> {
        if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
            return Ok(id.to_string());
        }
        client
            .me()
            .await?
            .business_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                CliError::Argument(
                    "--business-id is required: the logged-in user has no business".to_string(),
                )
            })
    }

    async fn handle_areas(&self, command: &AreasCommand) -> Result<String> {
        let client = self.auth_client()?;
        let areas = client.areas();
        match command {
            AreasCommand::List => self.render(&areas.list().await?, |a| output::areas(a)),
            AreasCommand::Create { name } => self.render(&areas.create(name).await?, output::ack),
            AreasCommand::Input {
                name,
                capacity,
                location,
                policy,
            } => {
                let area = NewArea {
                    name: name.clone(),
                    capacity: *capacity,
                    location: location.clone(),
                    policy: policy.clone(),
                };
                self.render(&areas.input(&area).await?, output::ack)
            }
            AreasCommand::FtpSave { area, ftp } => self.render(
                &areas.save_ftp_server(area, &ftp_server(ftp)).await?,
                output::ack,
            ),
            AreasCommand::FtpStatus { area, ftp } => self.render(
                &areas.ftp_status(area, &ftp_server(ftp)).await?,
                output::value,
            ),
            AreasCommand::FtpUpdate { area, ftp } => self.render(
                &areas.update_ftp_server(area, &ftp_server(ftp)).await?,
                output::ack,
            ),
            AreasCommand::FtpTrigger { area } => {
                self.render(&areas.trigger_ftp(area).await?, output::ack)
            }
        }
    }

    async fn handle_vehicles(&self, command: &VehiclesCommand) -> Result<String> {
        let client = self.auth_client()?;
        let vehicles = client.vehicles();
        match command {
            VehiclesCommand::Existing { area, page } => self.render(
                &vehicles.existing(area, page.page, page.limit).await?,
                output::record_page,
            ),
            VehiclesCommand::Records { area, page } => self.render(
                &vehicles.all_records(area, page.page, page.limit).await?,
                output::record_page,
            ),
            VehiclesCommand::Recent { area } => {
                self.render(&vehicles.recent_records(area).await?, |r| output::records(r))
            }
        }
    }

    async fn handle_account(&self, command: &AccountCommand) -> Result<String> {
        let client = self.auth_client()?;
        match command {
            AccountCommand::Update {
                first_name,
                last_name,
                phone,
                address,
                company,
            } => {
                let update = ProfileUpdate {
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                    phone_number: phone.clone(),
                    address: address.clone(),
                    company: company.clone(),
                };
                self.render(&client.account().update_profile(&update).await?, output::ack)
            }
        }
    }

    async fn handle_staff(&self, command: &StaffCommand) -> Result<String> {
        let client = self.auth_client()?;
        match command {
            StaffCommand::List { business_id, page } => {
                let business_id = self.business_id(&client, business_id.as_deref()).await?;
                let staff = client.staff().list(&business_id, page.page, page.limit).await?;
                self.render(&staff, output::staff_page)
            }
            StaffCommand::Create {
                username,
                password,
                first_name,
                last_name,
                email,
                role,
                business_id,
            } => {
                let staff = NewStaff {
                    username: username.clone(),
                    password: password.clone(),
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                    email: email.clone(),
                    role: role.clone(),
                    business_id: business_id.clone(),
                };
                self.render(&client.staff().create(&staff).await?, output::ack)
            }
            StaffCommand::Update {
                user_id,
                username,
                first_name,
                last_name,
                email,
                business_id,
            } => {
                let update = StaffUpdate {
                    user_id: user_id.clone(),
                    username: username.clone(),
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                    email: email.clone(),
                    business_id: business_id.clone(),
                };
                let reply = client.staff().update(&update).await?;
                self.render(&reply, |r| {
                    r.message.clone().unwrap_or_else(|| "Staff updated".to_string())
                })
            }
            StaffCommand::Delete { user_id } => {
                self.render(&client.staff().delete(user_id).await?, output::ack)
            }
        }
    }

    async fn handle_reports(&self, command: &ReportsCommand) -> Result<String> {
        let client = self.auth_client()?;
        let reports = client.reports();
        match command {
            ReportsCommand::List => self.render(&reports.list().await?, |r| output::reports(r)),
            ReportsCommand::Show { id } => self.render(&reports.get(id).await?, output::report),
            ReportsCommand::Save {
                name,
                area,
                kind,
                description,
                filters,
                chart_data,
            } => {
                let filters: Value = serde_json::from_str(filters).map_err(|e| {
                    CliError::Argument(format!("--filters is not valid JSON: {}", e))
                })?;
                let chart_data: Vec<Value> = match chart_data {
                    Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
                    None => Vec::new(),
                };
                let report = NewReport {
                    name: name.clone(),
                    area_id: area.clone(),
                    kind: kind.clone(),
                    chart_data,
                    chart_image: None,
                    filters,
                    description: description.clone(),
                };
                self.render(&reports.save(&report).await?, output::report)
            }
            ReportsCommand::Delete { id } => self.render(&reports.delete(id).await?, output::ack),
            ReportsCommand::Analyze { id, question } => {
                self.render(&reports.analyze(id, question).await?, output::value)
            }
            ReportsCommand::Chat { id, question } => {
                let report = reports.get(id).await?;
                let context = serde_json::to_string(&report)?;
                let ai = AiClient::from_config(&self.config.backend)?;
                let answer = ai.rag_query(question, &context).await?;
                self.render(&json!({ "reportId": report.id, "response": answer }), |_| {
                    answer.clone()
                })
            }
            ReportsCommand::Predict { timestamps } => {
                let ai = AiClient::from_config(&self.config.backend)?;
                self.render(&ai.predict_entries(timestamps).await?, output::value)
            }
        }
    }

    async fn handle_comments(&self, command: &CommentsCommand) -> Result<String> {
        let client = self.auth_client()?;
        let comments = client.comments();
        match command {
            CommentsCommand::List { report } => {
                self.render(&comments.list(report).await?, |c| output::comments(c))
            }
            CommentsCommand::Add { report, content } => {
                self.render(&comments.add(report, content).await?, output::comment)
            }
            CommentsCommand::Edit { id, content } => {
                self.render(&comments.edit(id, content).await?, output::comment)
            }
            CommentsCommand::Delete { id } => self.render(&comments.delete(id).await?, output::ack),
        }
    }

    async fn handle_shares(&self, command: &SharesCommand) -> Result<String> {
        let client = self.auth_client()?;
        let shares = client.shares();
        match command {
            SharesCommand::Users => self.render(&shares.business_users().await?, |u| output::users(u)),
            SharesCommand::List { report } => {
                self.render(&shares.list(report).await?, |s| output::shares(s))
            }
            SharesCommand::Add { report, users } => {
                self.render(&shares.share(report, users).await?, |s| output::shares(s))
            }
            SharesCommand::Remove { share } => self.render(&shares.remove(share).await?, output::ack),
        }
    }

    async fn handle_notifications(&self, command: &NotificationsCommand) -> Result<String> {
        let client = self.auth_client()?;
        let notifications = client.notifications();
        match command {
            NotificationsCommand::Recent => {
                self.render(&notifications.recent().await?, output::notifications)
            }
            NotificationsCommand::All {
                unread,
                read,
                kind,
                user,
                from,
                to,
                page,
            } => {
                let filters = NotificationFilters {
                    is_read: read_filter(*unread, *read),
                    kind: kind.clone(),
                    user_id: user.clone(),
                    start_date: from.clone(),
                    end_date: to.clone(),
                    page: Some(page.page),
                    limit: Some(page.limit),
                };
                self.render(&notifications.all(&filters).await?, output::notifications)
            }
            NotificationsCommand::Unread => {
                let count = notifications.unread_count().await?;
                self.render(&json!({ "unreadCount": count }), |_| format!("{} unread", count))
            }
            NotificationsCommand::Read { id } => {
                self.render(&notifications.mark_read(id).await?, |_| "Marked read".to_string())
            }
            NotificationsCommand::ReadAll => {
                self.render(&notifications.mark_all_read().await?, output::ack)
            }
            NotificationsCommand::Delete { id } => {
                self.render(&notifications.delete(id).await?, output::ack)
            }
        }
    }

    async fn handle_blacklist(&self, command: &BlacklistCommand) -> Result<String> {
        let client = self.auth_client()?;
        match command {
            BlacklistCommand::Add {
                plate,
                reason,
                business_id,
            } => {
                let business_id = self.business_id(&client, business_id.as_deref()).await?;
                let entry = client.blacklist().add(&business_id, plate, reason).await?;
                self.render(&entry, |e| {
                    format!("{} blacklisted: {}", e.plate_number, e.reason)
                })
            }
            BlacklistCommand::List { business_id, page } => {
                let business_id = self.business_id(&client, business_id.as_deref()).await?;
                let entries = client
                    .blacklist()
                    .list(&business_id, page.page, page.limit)
                    .await?;
                self.render(&entries, output::blacklist_page)
            }
            BlacklistCommand::Search { plate } => {
                self.render(&client.blacklist().search(plate).await?, |e| output::blacklist(e))
            }
            BlacklistCommand::Check { plate } => {
                let status = client.blacklist().check(plate).await?;
                let plate = parkwatch_client::api::normalize_plate(plate)?;
                self.render(&status, |s| output::blacklist_status(&plate, s))
            }
        }
    }

    async fn handle_ask(&self, args: &AskArgs) -> Result<String> {
        let client = self.auth_client()?;
        let investigate = client.investigate();
        let result = if args.execute {
            investigate.query(&args.question).await?
        } else {
            investigate.generate(&args.question).await?
        };
        self.render(&result, output::investigation)
    }

    async fn handle_suggest(&self, args: &SuggestArgs) -> Result<String> {
        let client = self.auth_client()?;
        let qa = client.qa();
        if args.keywords {
            return self.render(&qa.keywords().await?, |k| output::keywords(k));
        }
        if let Some(keyword) = &args.keyword {
            return self.render(&qa.by_keyword(keyword).await?, |q| output::questions(q));
        }
        let input = args.input.as_deref().unwrap_or_default();
        let items = if args.follow_ups {
            qa.follow_ups(input).await?
        } else {
            qa.suggestions(input).await?
        };
        self.render(&items, |q| output::questions(q))
    }

    /// Follow an area's events until Ctrl-C, `q`, or the connection gives up.
    /// A line on stdin toggles live updates; `r` asks for a refresh.
    async fn handle_watch(&self, args: &WatchArgs) -> Result<String> {
        let mut settings = RealtimeSettings::from_config(&self.config.realtime);
        if args.paused {
            settings.live_updates = false;
        }
        let client = RealtimeClient::websocket(settings)?;

        let format = self.cli.format;
        let _events = client.on_any(move |event| match format {
            OutputFormat::Json => println!("{}", output::event_json(event)),
            OutputFormat::Text => println!("{}", output::event(event)),
        });

        client.join_room(&args.area)?;
        client.connect();
        eprintln!(
            "watching area {} (live updates {}); Enter toggles, r refreshes, q quits",
            args.area,
            on_off(client.live_updates())
        );

        let mut state = client.subscribe_state();
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        let outcome = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break Ok(()),
                changed = state.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    let current = *state.borrow_and_update();
                    match current {
                        ConnectionState::Connected => eprintln!("connected"),
                        ConnectionState::GaveUp => {
                            break Err(CliError::Realtime(RealtimeError::Network(
                                "gave up reconnecting".to_string(),
                            )))
                        }
                        other => debug!(?other, "realtime state"),
                    }
                }
                line = stdin.next_line(), if stdin_open => match line {
                    Ok(Some(line)) => match line.trim() {
                        "q" | "quit" => break Ok(()),
                        "r" | "refresh" => match client.refresh_area(&args.area).await {
                            Ok(()) => eprintln!("refresh requested"),
                            Err(e) => eprintln!("refresh failed: {}", e),
                        },
                        _ => eprintln!("live updates {}", on_off(client.toggle_live_updates())),
                    },
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!("stdin unreadable, keyboard controls off: {}", e);
                        stdin_open = false;
                    }
                },
            }
        };

        client.disconnect().await;
        info!(area = %args.area, "stopped watching");
        outcome.map(|()| String::new())
    }

    fn handle_config(&self, command: &ConfigCommand) -> Result<String> {
        match command {
            ConfigCommand::Show => match self.cli.format {
                OutputFormat::Json => Ok(serde_json::to_string_pretty(&self.config)?),
                OutputFormat::Text => toml::to_string_pretty(&self.config)
                    .map_err(|e| CliError::Parse(e.to_string())),
            },
            ConfigCommand::Init { path, force } => {
                let target = path
                    .clone()
                    .or_else(|| self.cli.config.clone())
                    .or_else(default_config_path)
                    .ok_or_else(|| CliError::Config("Cannot find config directory".to_string()))?;
                write_default_config(&target, *force)?;
                Ok(format!("Wrote {}", target.display()))
            }
        }
    }
}

/// Tracing level for a `-v` count.
pub fn log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn read_filter(unread: bool, read: bool) -> Option<bool> {
    match (unread, read) {
        (true, _) => Some(false),
        (false, true) => Some(true),
        (false, false) => None,
    }
}

fn ftp_server(args: &FtpArgs) -> FtpServer {
    FtpServer {
        host: args.host.clone(),
        port: args.port,
        user: args.user.clone(),
        password: args.password.clone(),
        secure: args.secure,
        secure_options: None,
        selected_folder: args.folder.clone(),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn write_default_config(target: &Path, force: bool) -> Result<()> {
    if target.exists() && !force {
        return Err(CliError::Argument(format!(
            "{} exists; pass --force to overwrite",
            target.display()
        )));
    }
    ParkwatchConfig::default().save(target)?;
    info!(path = %target.display(), "configuration written");
    Ok(())
}

fn version_text() -> String {
    format!(
        "parkwatch {}\ncommit: {}\nbuilt: {}\ntarget: {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("CLI_GIT_COMMIT").unwrap_or("unknown"),
        env!("CLI_BUILD_TIMESTAMP"),
        env!("CLI_TARGET"),
    )
}

/// Parse arguments, load configuration and run the command.
pub fn run() -> Result<()> {
    App::new()?.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(log_level(0), Level::WARN);
        assert_eq!(log_level(1), Level::INFO);
        assert_eq!(log_level(2), Level::DEBUG);
        assert_eq!(log_level(7), Level::TRACE);
    }

    #[test]
    fn read_flags_become_filter() {
        assert_eq!(read_filter(true, false), Some(false));
        assert_eq!(read_filter(false, true), Some(true));
        assert_eq!(read_filter(false, false), None);
    }

    #[test]
    fn config_init_skips_resolution() {
        let cli = Cli::try_parse_from([
            "parkwatch",
            "--config",
            "/nonexistent/parkwatch.toml",
            "config",
            "init",
        ])
        .unwrap();
        assert_eq!(App::load_config(&cli).unwrap(), ParkwatchConfig::default());

        let cli = Cli::try_parse_from([
            "parkwatch",
            "--config",
            "/nonexistent/parkwatch.toml",
            "whoami",
        ])
        .unwrap();
        assert!(matches!(App::load_config(&cli), Err(CliError::Config(_))));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = std::env::temp_dir().join(format!("parkwatch-cli-init-{}", std::process::id()));
        let target = dir.join("config.toml");
        write_default_config(&target, false).unwrap();
        assert!(matches!(
            write_default_config(&target, false),
            Err(CliError::Argument(_))
        ));
        write_default_config(&target, true).unwrap();
        let loaded = ParkwatchConfig::load(&target).unwrap();
        assert_eq!(loaded, ParkwatchConfig::default());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn version_names_the_binary() {
        assert!(version_text().starts_with("parkwatch "));
    }
}
