use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wikistore::accounts::AuthMethod;
use wikistore::store::DEFAULT_HISTORY_LIMIT;

#[derive(Parser, Debug)]
#[command(name = "wiki", bin_name = "wiki", version)]
#[command(about = "Manage the pages and accounts of a wiki content directory", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Content directory holding the pages
    #[arg(
        short = 'C',
        long,
        global = true,
        env = "WIKI_CONTENT_DIR",
        default_value = "content"
    )]
    pub content_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a page
    Show {
        id: String,

        /// Print rendered HTML instead of the raw body
        #[arg(long)]
        html: bool,
    },

    /// List pages sorted by title
    #[command(alias = "ls")]
    List {
        /// Only pages carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// List tags with their page counts
    Tags,

    /// Find pages whose title, tags or body match a pattern
    Search {
        term: String,

        /// Match case exactly
        #[arg(short = 's', long)]
        case_sensitive: bool,

        /// Ignore case (the default unless configured otherwise)
        #[arg(short = 'i', long, conflicts_with = "case_sensitive")]
        ignore_case: bool,
    },

    /// Create or replace a page, reading its body from stdin
    Save {
        id: String,

        #[arg(long)]
        title: Option<String>,

        /// Comma separated tags
        #[arg(long)]
        tags: Option<String>,

        /// Recorded as the commit author on versioned wikis
        #[arg(long)]
        author: Option<String>,
    },

    /// Rename a page
    #[command(alias = "mv")]
    Move { id: String, new_id: String },

    /// Delete a page
    #[command(alias = "rm")]
    Delete { id: String },

    /// Show the commits touching a page (versioned wikis only)
    History {
        id: String,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// End of the window, exclusive
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },

    /// Show one commit with its patch (versioned wikis only)
    Diff { commit: String },

    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create an account
    Add {
        name: String,
        password: String,

        /// cleartext or hash; defaults to the configured method
        #[arg(long, value_parser = parse_method)]
        method: Option<AuthMethod>,

        /// Role to grant (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Create the account disabled
        #[arg(long)]
        inactive: bool,
    },

    /// Remove an account
    Delete { name: String },

    /// Verify a password
    Check { name: String, password: String },
}

fn parse_method(raw: &str) -> Result<AuthMethod, String> {
    raw.parse().map_err(|e: wikistore::WikiError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("wiki").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_history_defaults() {
        let cli = parse(&["history", "home"]);
        match cli.command {
            Commands::History { id, offset, limit } => {
                assert_eq!(id, "home");
                assert_eq!(offset, 0);
                assert_eq!(limit, 5);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_content_dir_flag() {
        let cli = parse(&["list", "--content-dir", "/srv/wiki"]);
        assert_eq!(cli.content_dir, PathBuf::from("/srv/wiki"));
    }

    #[test]
    fn test_user_add_with_roles_and_method() {
        let cli = parse(&[
            "user", "add", "alice", "pw", "--method", "hash", "--role", "admin", "--role",
            "editor",
        ]);
        match cli.command {
            Commands::User {
                action:
                    UserCommands::Add {
                        name,
                        method,
                        roles,
                        inactive,
                        ..
                    },
            } => {
                assert_eq!(name, "alice");
                assert_eq!(method, Some(AuthMethod::Hash));
                assert_eq!(roles, ["admin", "editor"]);
                assert!(!inactive);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let result = Cli::try_parse_from(["wiki", "user", "add", "a", "pw", "--method", "rot13"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_case_flags_conflict() {
        let result = Cli::try_parse_from(["wiki", "search", "x", "-s", "-i"]);
        assert!(result.is_err());
    }
}
