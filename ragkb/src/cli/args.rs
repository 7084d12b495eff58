//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use ragkb::api::PageQuery;
use ragkb::config::{DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS};

/// ragkb - manage knowledge bases and chat with them
#[derive(Parser, Debug)]
#[command(name = "ragkb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the API, including its version prefix
    #[arg(long, env = "RAGKB_API_BASE_URL", default_value = DEFAULT_API_BASE_URL, global = true)]
    pub api_base_url: String,

    /// File holding the stored credentials
    #[arg(long, env = "RAGKB_STORAGE", global = true)]
    pub storage: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, env = "RAGKB_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Send notices to the log instead of stderr
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the issued tokens
    Login {
        username: String,

        /// Password; read from stdin when omitted
        #[arg(long, env = "RAGKB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log out and forget stored credentials
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Trade the refresh token for a new token pair first
        #[arg(long)]
        refresh: bool,
    },

    /// Change your password
    Passwd {
        #[arg(long)]
        old: String,

        #[arg(long)]
        new: String,
    },

    /// Manage knowledge bases
    Kb {
        #[command(subcommand)]
        action: KbAction,
    },

    /// Manage the documents of a knowledge base
    Docs {
        /// Knowledge base ID
        kb: String,

        #[command(subcommand)]
        action: DocAction,
    },

    /// Chat sessions and messages
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },

    /// Administer users (admin only)
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
}

/// Pagination flags shared by list commands.
#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// Page number, starting at 1
    #[arg(long)]
    pub page: Option<u32>,

    /// Items per page
    #[arg(long)]
    pub page_size: Option<u32>,
}

impl From<PageArgs> for PageQuery {
    fn from(args: PageArgs) -> Self {
        Self {
            page: args.page,
            page_size: args.page_size,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum KbAction {
    /// List knowledge bases
    List {
        #[command(flatten)]
        page: PageArgs,

        /// Only show knowledge bases with this status
        #[arg(long)]
        status: Option<String>,
    },

    /// Show one knowledge base
    Show { id: String },

    /// Create a knowledge base
    Create {
        name: String,

        /// Unique identifier used for the vector collection
        #[arg(long)]
        english_name: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        embedding_model: Option<String>,
    },

    /// Update name, description or status
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        status: Option<String>,
    },

    /// Delete a knowledge base
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum DocAction {
    /// List documents
    List {
        #[command(flatten)]
        page: PageArgs,

        /// Only show documents with this parsing status
        #[arg(long)]
        status: Option<String>,
    },

    /// Show one document
    Show { id: String },

    /// Upload a file
    Upload {
        file: PathBuf,

        /// MIME type to declare for the file
        #[arg(long)]
        mime: Option<String>,
    },

    /// Delete a document
    Delete { id: String },

    /// Parse and embed a document again
    Reprocess { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ChatAction {
    /// List chat sessions
    Sessions {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Start a new session
    New {
        #[arg(long, default_value = "")]
        title: String,

        /// Knowledge base to search (repeatable)
        #[arg(long = "kb")]
        knowledge_base_ids: Vec<String>,

        /// Answer without retrieval
        #[arg(long)]
        no_rag: bool,

        #[arg(long)]
        top_k: Option<u32>,

        #[arg(long)]
        threshold: Option<f64>,

        #[arg(long)]
        weight: Option<f64>,
    },

    /// Show one session
    Show { id: String },

    /// Rename a session
    Rename { id: String, title: String },

    /// Delete a session
    Delete { id: String },

    /// Show a session's messages
    History {
        id: String,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Ask a question and wait for the full answer
    Ask {
        id: String,

        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },

    /// Ask a question and print the answer as it streams in
    Stream {
        id: String,

        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// List users
    List {
        #[command(flatten)]
        page: PageArgs,

        /// Match against username, email or real name
        #[arg(long)]
        keyword: Option<String>,
    },

    /// Show one user
    Show { id: i64 },

    /// Create a user
    Create {
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long, default_value = "")]
        real_name: String,

        #[arg(long, default_value = "")]
        phone: String,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },

    /// Update a user's profile or status
    Update {
        id: i64,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        real_name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        avatar: Option<String>,

        #[arg(long)]
        status: Option<String>,
    },

    /// Delete a user
    Delete { id: i64 },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_document_command() {
        let cli = Cli::try_parse_from(["ragkb", "docs", "kb-1", "delete", "doc-9"]).unwrap();
        match cli.command {
            Commands::Docs {
                kb,
                action: DocAction::Delete { id },
            } => {
                assert_eq!(kb, "kb-1");
                assert_eq!(id, "doc-9");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn chat_question_joins_words() {
        let cli = Cli::try_parse_from(["ragkb", "chat", "ask", "s-1", "what", "is", "rag"]).unwrap();
        let Commands::Chat {
            action: ChatAction::Ask { id, message },
        } = cli.command
        else {
            panic!("expected chat ask");
        };
        assert_eq!(id, "s-1");
        assert_eq!(message.join(" "), "what is rag");
    }

    #[test]
    fn repeated_kb_flags_collect() {
        let cli = Cli::try_parse_from([
            "ragkb", "chat", "new", "--kb", "a", "--kb", "b", "--no-rag",
        ])
        .unwrap();
        let Commands::Chat {
            action:
                ChatAction::New {
                    knowledge_base_ids,
                    no_rag,
                    ..
                },
        } = cli.command
        else {
            panic!("expected chat new");
        };
        assert_eq!(knowledge_base_ids, ["a", "b"]);
        assert!(no_rag);
    }
}
