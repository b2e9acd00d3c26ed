use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "graviteectl")]
#[command(version)]
#[command(about = "Declarative plans and subscriptions for Gravitee APIM", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest file (default: ./gravitee.toml)
    #[arg(short, long, global = true)]
    pub manifest: Option<String>,

    /// State file (default: ~/.local/state/graviteectl/state.toml)
    #[arg(long, global = true)]
    pub state: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Management API connection, overriding the manifest's `[provider]` table
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Management API base URL
    #[arg(long, env = "GRAVITEE_MANAGEMENT_URL", global = true)]
    pub management_url: Option<String>,

    /// Environment id (default: DEFAULT)
    #[arg(long, env = "GRAVITEE_ENVIRONMENT", global = true)]
    pub environment: Option<String>,

    /// Username for basic authentication
    #[arg(long, env = "GRAVITEE_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "GRAVITEE_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Bearer token, used instead of username and password
    #[arg(long, env = "GRAVITEE_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Per-request timeout in seconds (default: 300)
    #[arg(long, env = "GRAVITEE_TIMEOUT", global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Preview what apply would change
    Plan(TargetArgs),

    /// Make the remote plans and subscriptions match the manifest
    Apply(ApplyArgs),

    /// Show drift between the last applied and the remote records
    Status(TargetArgs),

    /// Bring an existing remote resource under management
    #[command(subcommand)]
    Import(ImportCommand),

    /// Show an API
    Api {
        /// API id
        api_id: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Only this target: plans, subscriptions, plans.<key> or subscriptions.<key>
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only this target: plans, subscriptions, plans.<key> or subscriptions.<key>
    pub target: Option<String>,

    /// Show what would change without calling the API
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum ImportCommand {
    /// Import a plan
    Plan {
        /// Manifest key to record it under
        key: String,
        /// API the plan belongs to
        api_id: String,
        /// Remote plan id
        id: String,
    },

    /// Import a subscription
    Subscription {
        /// Manifest key to record it under
        key: String,
        /// API the subscription belongs to
        api_id: String,
        /// Remote subscription id
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "graviteectl",
            "--manifest",
            "m.toml",
            "apply",
            "plans.gold",
            "--yes",
        ])
        .unwrap();

        assert_eq!(cli.manifest.as_deref(), Some("m.toml"));
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.target.as_deref(), Some("plans.gold"));
        assert!(args.yes);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_parse_import_subscription() {
        let cli = Cli::try_parse_from([
            "graviteectl",
            "import",
            "subscription",
            "acme",
            "api-1",
            "sub-1",
        ])
        .unwrap();

        let Command::Import(ImportCommand::Subscription { key, api_id, id }) = cli.command else {
            panic!("expected import subscription");
        };
        assert_eq!((key.as_str(), api_id.as_str(), id.as_str()), ("acme", "api-1", "sub-1"));
    }

    #[test]
    fn test_connection_flags_are_global() {
        let cli = Cli::try_parse_from([
            "graviteectl",
            "status",
            "--management-url",
            "https://apim.example.com",
            "--token",
            "tok",
            "--timeout",
            "45",
        ])
        .unwrap();

        assert_eq!(
            cli.connection.management_url.as_deref(),
            Some("https://apim.example.com")
        );
        assert_eq!(cli.connection.token.as_deref(), Some("tok"));
        assert_eq!(cli.connection.timeout, Some(45));
    }
}
