//! CLI command definitions
//!
//! All CLI structs and subcommand enums are defined here.

use clap::{Parser, Subcommand};

/// Storefront - command line client for the book marketplace API
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.config/storefront/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// API base URL, overrides the config file
    #[arg(long, global = true, env = "STOREFRONT_API_URL")]
    pub api_url: Option<String>,

    /// Locale for localized content (en, ru, uz)
    #[arg(short, long, global = true)]
    pub locale: Option<String>,

    /// Output raw JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a default configuration file
    Init,

    /// Inspect the configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Sign in (prompts for the password)
    Login {
        /// Account email
        email: String,
    },

    /// Sign out and forget local session data
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Use the stored profile, no network call
        #[arg(long)]
        offline: bool,
    },

    /// Browse books
    #[command(subcommand)]
    Books(BookCommands),

    /// List categories
    Categories {
        #[arg(short, long)]
        page: Option<u32>,
    },

    /// Browse shops
    #[command(subcommand)]
    Shops(ShopCommands),

    /// Read blog posts
    #[command(subcommand)]
    Posts(PostCommands),

    /// Read or write book comments
    #[command(subcommand)]
    Comments(CommentCommands),

    /// Manage the shopping cart
    #[command(subcommand)]
    Cart(CartCommands),

    /// Order history and checkout
    #[command(subcommand)]
    Orders(OrderCommands),

    /// Send a message through the contact form
    Contact {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        subject: Option<String>,

        /// Message text
        message: String,
    },

    /// Delete stored tokens and cached user data
    ClearState,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Check the configuration for errors
    Validate,
}

#[derive(Subcommand, Debug)]
pub enum BookCommands {
    /// List books
    List {
        #[arg(short, long)]
        page: Option<u32>,

        #[arg(long)]
        page_size: Option<u32>,

        /// Category slug
        #[arg(long)]
        category: Option<String>,

        /// Shop slug
        #[arg(long)]
        shop: Option<String>,

        /// Full-text search
        #[arg(short, long)]
        search: Option<String>,

        /// Sort field, prefix with - for descending
        #[arg(short, long)]
        ordering: Option<String>,
    },

    /// Show one book
    Show { slug: String },

    /// Like or unlike a book
    Like { slug: String },

    /// List liked books
    Liked,
}

#[derive(Subcommand, Debug)]
pub enum ShopCommands {
    /// List shops
    List {
        #[arg(short, long)]
        page: Option<u32>,
    },

    /// Show a shop and its books
    Show { slug: String },
}

#[derive(Subcommand, Debug)]
pub enum PostCommands {
    /// List posts
    List {
        #[arg(short, long)]
        page: Option<u32>,
    },

    /// Show one post
    Show { slug: String },
}

#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// List comments on a book
    List {
        /// Book slug
        book: String,

        #[arg(short, long)]
        page: Option<u32>,
    },

    /// Comment on a book
    Add {
        /// Book slug
        book: String,

        /// Comment text
        text: String,

        /// Rating from 1 to 5
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: Option<u8>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CartCommands {
    /// Show the cart
    Show,

    /// Add a book to the cart
    Add {
        /// Book id
        book: u64,

        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },

    /// Change the quantity of a cart item
    Update { item: u64, quantity: u32 },

    /// Remove an item from the cart
    Remove { item: u64 },
}

#[derive(Subcommand, Debug)]
pub enum OrderCommands {
    /// List orders
    List {
        #[arg(short, long)]
        page: Option<u32>,
    },

    /// Show one order
    Show { id: u64 },

    /// Check out the current cart
    Create {
        #[arg(long)]
        address: String,

        #[arg(long)]
        phone: String,

        #[arg(long)]
        note: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_books_list() {
        let cli = Cli::try_parse_from([
            "storefront", "--locale", "ru", "books", "list", "--category", "poetry", "-p", "2",
        ])
        .unwrap();
        assert_eq!(cli.locale.as_deref(), Some("ru"));
        match cli.command {
            Commands::Books(BookCommands::List { category, page, .. }) => {
                assert_eq!(category.as_deref(), Some("poetry"));
                assert_eq!(page, Some(2));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rating_range() {
        assert!(Cli::try_parse_from(["storefront", "comments", "add", "dune", "ok", "-r", "9"]).is_err());
    }
}
