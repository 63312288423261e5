use clap::{ArgAction, Parser};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Args {
    /// Process the default client set
    #[arg(long)]
    pub default: bool,

    /// Process every community client set
    #[arg(long)]
    pub community: bool,

    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Set proxy
    #[arg(required = false, long, short = 'P')]
    pub proxy: Option<String>,

    /// Set user agent
    #[arg(required = false, long, short = 'A')]
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_no_flags() {
        let args = Args::parse_from(["clienthash"]);
        assert!(!args.default);
        assert!(!args.community);
        assert_eq!(args.verbose, 0);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from([
            "clienthash",
            "--community",
            "-vv",
            "-c",
            "custom.toml",
            "-A",
            "agent/1.0",
        ]);
        assert!(!args.default);
        assert!(args.community);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.config.as_deref(), Some("custom.toml"));
        assert_eq!(args.user_agent.as_deref(), Some("agent/1.0"));
    }
}
