//! CLI command definitions for Parkwatch.
//!
//! Provides the command-line interface for the parking backend: session
//! management, resource commands, AI questions and the live event feed.

use clap::{Args, Parser, Subcommand, ValueEnum};
use parkwatch_core::constants::DEFAULT_PAGE_LIMIT;
use std::path::PathBuf;

/// Main CLI application.
#[derive(Parser, Debug)]
#[command(name = "parkwatch", author, version, about, long_about = None)]
pub struct Cli {
    /// Logging verbosity
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "PARKWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and keep the session for later commands
    Login(LoginArgs),

    /// Create an account
    Register(RegisterArgs),

    /// End the session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Change the logged-in user's own profile
    Account(AccountArgs),

    /// Manage parking areas and their FTP sources
    Areas(AreasArgs),

    /// Browse vehicle records of an area
    Vehicles(VehiclesArgs),

    /// Manage staff accounts
    Staff(StaffArgs),

    /// Manage saved reports
    Reports(ReportsArgs),

    /// Comment on reports
    Comments(CommentsArgs),

    /// Share reports with other users
    Shares(SharesArgs),

    /// Read and manage notifications
    Notifications(NotificationsArgs),

    /// Manage blacklisted plates
    Blacklist(BlacklistArgs),

    /// Ask a question about the parking data
    Ask(AskArgs),

    /// Suggest questions to ask
    Suggest(SuggestArgs),

    /// Follow live events of an area
    Watch(WatchArgs),

    /// Inspect or create the configuration file
    Config(ConfigArgs),

    /// Show build information
    Version,
}

/// Login arguments.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account name
    #[arg(short, long)]
    pub username: String,

    /// Account password
    #[arg(short, long, env = "PARKWATCH_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Registration arguments.
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Account name
    #[arg(short, long)]
    pub username: String,

    /// E-mail address
    #[arg(short, long)]
    pub email: String,

    /// Account password
    #[arg(short, long, env = "PARKWATCH_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Business the account belongs to
    #[arg(long)]
    pub business_id: String,

    /// Account role
    #[arg(long, value_enum)]
    pub role: Option<RoleArg>,
}

/// Parking area arguments.
#[derive(Args, Debug)]
pub struct AreasArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: AreasCommand,
}

/// Parking area subcommands.
#[derive(Subcommand, Debug)]
pub enum AreasCommand {
    /// List the areas of the business
    List,

    /// Create an area by name
    Create {
        /// Area name
        name: String,
    },

    /// Create an area with capacity and location
    Input {
        /// Area name
        name: String,

        /// Number of spaces
        #[arg(long)]
        capacity: u32,

        /// Address or description of the location
        #[arg(long)]
        location: String,

        /// Parking policy text
        #[arg(long)]
        policy: Option<String>,
    },

    /// Attach an FTP server to an area
    FtpSave {
        /// Area id
        #[arg(long)]
        area: String,

        /// FTP server settings
        #[command(flatten)]
        ftp: FtpArgs,
    },

    /// Check that an FTP server is reachable
    FtpStatus {
        /// Area id
        #[arg(long)]
        area: String,

        /// FTP server settings
        #[command(flatten)]
        ftp: FtpArgs,
    },

    /// Replace the FTP server of an area
    FtpUpdate {
        /// Area id
        #[arg(long)]
        area: String,

        /// FTP server settings
        #[command(flatten)]
        ftp: FtpArgs,
    },

    /// Pull new files from the area's FTP server now
    FtpTrigger {
        /// Area id
        #[arg(long)]
        area: String,
    },
}

/// FTP server connection settings.
#[derive(Args, Debug, Clone)]
pub struct FtpArgs {
    /// FTP host
    #[arg(long)]
    pub host: String,

    /// FTP port
    #[arg(long, default_value_t = 21)]
    pub port: u16,

    /// FTP user
    #[arg(long)]
    pub user: String,

    /// FTP password
    #[arg(long, env = "PARKWATCH_FTP_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Use FTPS
    #[arg(long, default_value_t = false)]
    pub secure: bool,

    /// Remote folder holding the camera files
    #[arg(long)]
    pub folder: Option<String>,
}

/// Vehicle record arguments.
#[derive(Args, Debug)]
pub struct VehiclesArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: VehiclesCommand,
}

/// Vehicle record subcommands.
#[derive(Subcommand, Debug)]
pub enum VehiclesCommand {
    /// Vehicles currently parked
    Existing {
        /// Area id
        #[arg(long)]
        area: String,

        /// Pagination
        #[command(flatten)]
        page: PageArgs,
    },

    /// Every entry and exit record
    Records {
        /// Area id
        #[arg(long)]
        area: String,

        /// Pagination
        #[command(flatten)]
        page: PageArgs,
    },

    /// Latest entries and exits
    Recent {
        /// Area id
        #[arg(long)]
        area: String,
    },
}

/// Pagination arguments.
#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Items per page
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
    pub limit: u32,
}

/// Account arguments.
#[derive(Args, Debug)]
pub struct AccountArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: AccountCommand,
}

/// Account subcommands.
#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Update name and contact details
    Update {
        /// First name
        #[arg(long)]
        first_name: String,

        /// Last name
        #[arg(long)]
        last_name: String,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Postal address
        #[arg(long)]
        address: Option<String>,

        /// Company name
        #[arg(long)]
        company: Option<String>,
    },
}

/// Staff arguments.
#[derive(Args, Debug)]
pub struct StaffArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: StaffCommand,
}

/// Staff subcommands.
#[derive(Subcommand, Debug)]
pub enum StaffCommand {
    /// List staff of a business
    List {
        /// Business id (defaults to the logged-in user's)
        #[arg(long)]
        business_id: Option<String>,

        /// Pagination
        #[command(flatten)]
        page: PageArgs,
    },

    /// Create a staff account
    Create {
        /// Account name
        #[arg(short, long)]
        username: String,

        /// Account password
        #[arg(short, long, env = "PARKWATCH_STAFF_PASSWORD", hide_env_values = true)]
        password: String,

        /// First name
        #[arg(long)]
        first_name: String,

        /// Last name
        #[arg(long)]
        last_name: String,

        /// E-mail address
        #[arg(short, long)]
        email: String,

        /// Account role
        #[arg(long)]
        role: Option<String>,

        /// Business id
        #[arg(long)]
        business_id: Option<String>,
    },

    /// Change fields of a staff account
    Update {
        /// Staff user id
        user_id: String,

        /// New account name
        #[arg(long)]
        username: Option<String>,

        /// New first name
        #[arg(long)]
        first_name: Option<String>,

        /// New last name
        #[arg(long)]
        last_name: Option<String>,

        /// New e-mail address
        #[arg(long)]
        email: Option<String>,

        /// New business id
        #[arg(long)]
        business_id: Option<String>,
    },

    /// Delete a staff account
    Delete {
        /// Staff user id
        user_id: String,
    },
}

/// Report arguments.
#[derive(Args, Debug)]
pub struct ReportsArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: ReportsCommand,
}

/// Report subcommands.
#[derive(Subcommand, Debug)]
pub enum ReportsCommand {
    /// List reports visible to the user
    List,

    /// Show one report
    Show {
        /// Report id
        id: String,
    },

    /// Save a report
    Save {
        /// Report name
        #[arg(long)]
        name: String,

        /// Area the report covers
        #[arg(long)]
        area: String,

        /// Chart type
        #[arg(long = "type", default_value = "line")]
        kind: String,

        /// Description
        #[arg(long, default_value = "")]
        description: String,

        /// Filters as a JSON object
        #[arg(long, default_value = "{}")]
        filters: String,

        /// JSON file holding the chart data array
        #[arg(long)]
        chart_data: Option<PathBuf>,
    },

    /// Delete a report
    Delete {
        /// Report id
        id: String,
    },

    /// Ask the backend to analyze a report
    Analyze {
        /// Report id
        id: String,

        /// Question about the report
        question: String,
    },

    /// Chat about a report with the AI service
    Chat {
        /// Report id
        id: String,

        /// Question about the report
        question: String,
    },

    /// Predict upcoming entries from past entry times
    Predict {
        /// Past entry timestamps
        #[arg(required = true)]
        timestamps: Vec<String>,
    },
}

/// Comment arguments.
#[derive(Args, Debug)]
pub struct CommentsArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: CommentsCommand,
}

/// Comment subcommands.
#[derive(Subcommand, Debug)]
pub enum CommentsCommand {
    /// Comments of a report
    List {
        /// Report id
        report: String,
    },

    /// Comment on a report
    Add {
        /// Report id
        report: String,

        /// Comment text
        content: String,
    },

    /// Change a comment
    Edit {
        /// Comment id
        id: String,

        /// New text
        content: String,
    },

    /// Delete a comment
    Delete {
        /// Comment id
        id: String,
    },
}

/// Share arguments.
#[derive(Args, Debug)]
pub struct SharesArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: SharesCommand,
}

/// Share subcommands.
#[derive(Subcommand, Debug)]
pub enum SharesCommand {
    /// Users a report can be shared with
    Users,

    /// Shares of a report
    List {
        /// Report id
        report: String,
    },

    /// Share a report with users
    Add {
        /// Report id
        report: String,

        /// User ids
        #[arg(required = true)]
        users: Vec<String>,
    },

    /// Withdraw a share
    Remove {
        /// Share id
        share: String,
    },
}

/// Notification arguments.
#[derive(Args, Debug)]
pub struct NotificationsArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

/// Notification subcommands.
#[derive(Subcommand, Debug)]
pub enum NotificationsCommand {
    /// Latest notifications
    Recent,

    /// Filtered notification listing
    All {
        /// Only unread notifications
        #[arg(long, conflicts_with = "read")]
        unread: bool,

        /// Only read notifications
        #[arg(long)]
        read: bool,

        /// Notification type
        #[arg(long = "type")]
        kind: Option<String>,

        /// Recipient user id
        #[arg(long)]
        user: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Pagination
        #[command(flatten)]
        page: PageArgs,
    },

    /// Number of unread notifications
    Unread,

    /// Mark a notification read
    Read {
        /// Notification id
        id: String,
    },

    /// Mark every notification read
    ReadAll,

    /// Delete a notification
    Delete {
        /// Notification id
        id: String,
    },
}

/// Blacklist arguments.
#[derive(Args, Debug)]
pub struct BlacklistArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: BlacklistCommand,
}

/// Blacklist subcommands.
#[derive(Subcommand, Debug)]
pub enum BlacklistCommand {
    /// Blacklist a plate
    Add {
        /// Plate number
        plate: String,

        /// Reason for the entry
        #[arg(long)]
        reason: String,

        /// Business id (defaults to the logged-in user's)
        #[arg(long)]
        business_id: Option<String>,
    },

    /// Blacklisted plates of a business
    List {
        /// Business id (defaults to the logged-in user's)
        #[arg(long)]
        business_id: Option<String>,

        /// Pagination
        #[command(flatten)]
        page: PageArgs,
    },

    /// Search entries by plate
    Search {
        /// Plate number or part of it
        plate: String,
    },

    /// Check whether a plate is blacklisted
    Check {
        /// Plate number
        plate: String,
    },
}

/// Investigation arguments.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question in plain language
    pub question: String,

    /// Run the generated query and show its result
    #[arg(long, default_value_t = false)]
    pub execute: bool,
}

/// Question suggestion arguments.
#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// Text typed so far
    #[arg(required_unless_present_any = ["keywords", "keyword"])]
    pub input: Option<String>,

    /// Treat the input as an asked question and suggest follow-ups
    #[arg(long, default_value_t = false)]
    pub follow_ups: bool,

    /// List the known keywords
    #[arg(long, default_value_t = false)]
    pub keywords: bool,

    /// Questions filed under a keyword
    #[arg(long)]
    pub keyword: Option<String>,
}

/// Live event arguments.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Area to follow
    #[arg(long)]
    pub area: String,

    /// Start with live updates paused
    #[arg(long, default_value_t = false)]
    pub paused: bool,
}

/// Configuration arguments.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with the defaults
    Init {
        /// Target path (defaults to the platform config dir)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Account role.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    /// Regular user
    User,
    /// Administrator
    Admin,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "parkwatch", "vehicles", "records", "--area", "a1", "--page", "3", "-vv", "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Vehicles(VehiclesArgs {
                command: VehiclesCommand::Records { area, page },
            }) => {
                assert_eq!(area, "a1");
                assert_eq!(page.page, 3);
                assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn suggest_needs_input_unless_listing_keywords() {
        assert!(Cli::try_parse_from(["parkwatch", "suggest"]).is_err());
        assert!(Cli::try_parse_from(["parkwatch", "suggest", "--keywords"]).is_ok());
        let cli = Cli::try_parse_from(["parkwatch", "suggest", "peak", "--follow-ups"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Suggest(SuggestArgs { follow_ups: true, .. })
        ));
    }

    #[test]
    fn notification_read_filters_conflict() {
        assert!(
            Cli::try_parse_from(["parkwatch", "notifications", "all", "--read", "--unread"]).is_err()
        );
    }
}
