//! Command-line definitions.

use agent_engine_core::{
    EngineConfig,
    context::{DEFAULT_LOCATION, DEFAULT_PROJECT_ID, DEFAULT_STAGING_BUCKET},
};
use clap::{Args, Parser, Subcommand};

/// User the drivers act on when none is given.
pub const DEFAULT_USER_ID: &str = "123";

/// Message `run-flow` sends when none is given.
pub const DEFAULT_MESSAGE: &str = "Create a post for making coffee with oatmilk?";

/// Variables forwarded to a new deployment when no `--env` is given.
pub const DEFAULT_FORWARDED_ENV: &[&str] = &[
    "GOOGLE_API_KEY",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GOOGLE_GENAI_USE_VERTEXAI",
    "CLAUDE_MODEL",
    "OPENAI_MODEL",
    "GOOGLE_GENAI_MODEL",
];

#[derive(Parser, Debug)]
#[command(name = "agent-engine")]
#[command(about = "Deploy, drive and tear down managed agent deployments", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Cloud project the deployments live in
    #[arg(long, env = "PROJECT_ID", default_value = DEFAULT_PROJECT_ID, global = true)]
    pub project_id: String,

    /// Region of the agent engine
    #[arg(long, env = "LOCATION", default_value = DEFAULT_LOCATION, global = true)]
    pub location: String,

    /// Bucket agent packages are staged in
    #[arg(long, env = "STAGING_BUCKET", default_value = DEFAULT_STAGING_BUCKET, global = true)]
    pub staging_bucket: String,

    /// Override the service base URL
    #[arg(long, env = "AGENT_ENGINE_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub access_token: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Engine target from the global options.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::new(&self.project_id, &self.location, &self.staging_bucket);
        match &self.endpoint {
            Some(endpoint) => config.with_endpoint(endpoint),
            None => config,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a deployment from a staged agent package
    Deploy(DeployArgs),

    /// List deployments
    List,

    /// Use the first deployment: reuse or create a session, read it, send a message
    RunFlow(RunFlowArgs),

    /// Delete every session of a user on every deployment, then the deployments
    Cleanup {
        /// User whose sessions are deleted
        #[arg(long, default_value = DEFAULT_USER_ID)]
        user: String,
    },

    /// Manage sessions on one deployment
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Send a message into an existing session
    Send {
        /// Deployment resource name or id
        deployment: String,

        /// Session to send into
        #[arg(long)]
        session: String,

        /// User owning the session
        #[arg(long, default_value = DEFAULT_USER_ID)]
        user: String,

        /// Message text
        message: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// Display name of the deployment
    #[arg(long, default_value = "social-posts-agent")]
    pub display_name: String,

    /// Description of the deployment
    #[arg(long)]
    pub description: Option<String>,

    /// URI of the serialized agent app (default: under the staging bucket)
    #[arg(long)]
    pub package_uri: Option<String>,

    /// URI of the requirements file (default: under the staging bucket)
    #[arg(long)]
    pub requirements_uri: Option<String>,

    /// URI of the extra packages archive (default: under the staging bucket)
    #[arg(long)]
    pub dependencies_uri: Option<String>,

    /// Python version of the runtime
    #[arg(long)]
    pub python_version: Option<String>,

    /// Environment variable to forward (repeatable)
    #[arg(long = "env", value_name = "NAME")]
    pub env: Vec<String>,

    /// Disable tracing in the deployed app
    #[arg(long)]
    pub no_tracing: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunFlowArgs {
    /// User the session belongs to
    #[arg(long, default_value = DEFAULT_USER_ID)]
    pub user: String,

    /// Message to send
    #[arg(long, default_value = DEFAULT_MESSAGE)]
    pub message: String,

    /// Delete the session once the message has been answered
    #[arg(long)]
    pub delete_session: bool,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List a user's sessions
    List(SessionTarget),

    /// Create a session
    Create(SessionTarget),

    /// Show one session
    Get {
        #[command(flatten)]
        target: SessionTarget,
        /// Session id
        session: String,
    },

    /// Delete one session
    Delete {
        #[command(flatten)]
        target: SessionTarget,
        /// Session id
        session: String,
    },

    /// Delete all of a user's sessions
    DeleteAll(SessionTarget),
}

#[derive(Args, Debug, Clone)]
pub struct SessionTarget {
    /// Deployment resource name or id
    pub deployment: String,

    /// User owning the sessions
    #[arg(long, default_value = DEFAULT_USER_ID)]
    pub user: String,
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
    fn test_run_flow_defaults() {
        let cli = Cli::try_parse_from(["agent-engine", "run-flow"]).unwrap();
        match cli.command {
            Commands::RunFlow(args) => {
                assert_eq!(args.user, "123");
                assert_eq!(args.message, DEFAULT_MESSAGE);
                assert!(!args.delete_session);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "agent-engine",
            "list",
            "--project-id",
            "other",
            "--endpoint",
            "http://localhost:8080",
        ])
        .unwrap();
        let config = cli.engine_config();
        assert_eq!(config.project_id, "other");
        assert_eq!(config.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_sessions_get() {
        let cli = Cli::try_parse_from([
            "agent-engine",
            "sessions",
            "get",
            "projects/p/locations/l/reasoningEngines/1",
            "s1",
            "--user",
            "u9",
        ])
        .unwrap();
        match cli.command {
            Commands::Sessions {
                command: SessionCommands::Get { target, session },
            } => {
                assert_eq!(target.user, "u9");
                assert_eq!(session, "s1");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_deploy_env_repeatable() {
        let cli = Cli::try_parse_from([
            "agent-engine",
            "deploy",
            "--env",
            "OPENAI_MODEL",
            "--env",
            "CLAUDE_MODEL",
        ])
        .unwrap();
        match cli.command {
            Commands::Deploy(args) => assert_eq!(args.env, vec!["OPENAI_MODEL", "CLAUDE_MODEL"]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
