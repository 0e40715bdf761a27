//! Storefront CLI
//!
//! Main entry point for the `storefront` command line client.

mod commands;

use anyhow::Context;
use clap::Parser;
use commands::{
    BookCommands, CartCommands, Cli, CommentCommands, Commands, ConfigCommands, OrderCommands,
    PostCommands, ShopCommands,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use storefront::api::{
    BookQuery, ContactMessage, Credentials, NewComment, NewOrder, Page, PageParams,
};
use storefront::auth::SessionEvent;
use storefront::config::{validate_config, ClientConfig};
use storefront::{ApiClient, ApiError, StorefrontError};
use tokio::sync::broadcast;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        storefront::logging::VERBOSE_FILTER
    } else {
        storefront::logging::DEFAULT_FILTER
    };
    if let Err(e) = storefront::logging::init_with_default(filter) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        if needs_login(&e) {
            eprintln!();
            eprintln!("Sign in with:");
            eprintln!("  storefront login <email>");
        }
        process::exit(1);
    }
}

fn needs_login(err: &StorefrontError) -> bool {
    matches!(
        err,
        StorefrontError::Api(
            ApiError::Unauthenticated
                | ApiError::MissingRefreshToken
                | ApiError::RefreshFailed { .. }
        )
    )
}

async fn run(cli: Cli) -> storefront::Result<()> {
    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(ClientConfig::default_path);

    // Commands that only touch the config file
    match &cli.command {
        Commands::Init => return handle_init_command(&config_path, cli.api_url.clone()),
        Commands::Config(cmd) => return handle_config_command(cmd, &cli),
        _ => {}
    }

    let config = load_config(&cli)?;
    tracing::info!(base_url = %config.base_url, "Configuration loaded");

    let client = ApiClient::from_config(&config)?;
    if let Some(locale) = &cli.locale {
        let active = client.set_locale(locale);
        if !active.as_str().eq_ignore_ascii_case(locale) {
            tracing::warn!(requested = %locale, active = %active, "Unsupported locale, using default");
        }
    }

    let mut events = client.subscribe();
    let result = execute(&client, cli.command, cli.json).await;
    report_session_events(&mut events);
    result
}

fn load_config(cli: &Cli) -> storefront::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::load_default()?,
    };
    config.apply_env();
    config.apply_base_url_override(cli.api_url.clone());
    Ok(config)
}

/// Print a hint for every session expiry seen during the command
fn report_session_events(events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Expired { login_path } = event {
            eprintln!("Your session has expired, please log in again ({}).", login_path);
        }
    }
}

async fn execute(client: &ApiClient, command: Commands, json: bool) -> storefront::Result<()> {
    match command {
        Commands::Init | Commands::Config(_) => unreachable!("handled before the client is built"),

        Commands::Login { email } => {
            let password = dialoguer::Password::new()
                .with_prompt("Password")
                .interact()
                .context("Failed to read password")?;
            let user = client
                .auth()
                .login(&Credentials { email, password })
                .await?;
            println!("✓ Logged in as {}", user.display_name());
        }

        Commands::Logout => {
            client.auth().logout().await?;
            println!("✓ Logged out");
        }

        Commands::Whoami { offline } => {
            let user = if offline {
                client.auth().cached_profile()?
            } else {
                Some(client.auth().profile().await?)
            };
            match user {
                Some(user) => output(json, &user, |u| {
                    println!("{} <{}>", u.display_name(), u.email);
                    if let Some(phone) = &u.phone {
                        println!("  Phone: {}", phone);
                    }
                    if let Ok(Some(at)) = client.storage().login_at() {
                        println!("  Signed in: {}", at.format("%Y-%m-%d %H:%M"));
                    }
                })?,
                None => println!("Not logged in"),
            }
        }

        Commands::Books(cmd) => handle_books_command(client, cmd, json).await?,

        Commands::Categories { page } => {
            let categories = client
                .categories()
                .list(PageParams { page, page_size: None })
                .await?;
            output(json, &categories, |page| {
                print_page_header("categories", page);
                for category in &page.results {
                    match category.books_count {
                        Some(n) => println!("  {:<24} {} ({} books)", category.slug, category.name, n),
                        None => println!("  {:<24} {}", category.slug, category.name),
                    }
                }
            })?;
        }

        Commands::Shops(ShopCommands::List { page }) => {
            let shops = client
                .shops()
                .list(PageParams { page, page_size: None })
                .await?;
            output(json, &shops, |page| {
                print_page_header("shops", page);
                for shop in &page.results {
                    println!("  {:<24} {}", shop.slug, shop.name);
                }
            })?;
        }

        Commands::Shops(ShopCommands::Show { slug }) => {
            let shop = client.shops().get(&slug).await?;
            let books = client.shops().books(&slug, PageParams::default()).await?;
            if json {
                print_json(&serde_json::json!({ "shop": shop, "books": books }))?;
            } else {
                println!("{}", shop.name);
                if let Some(description) = &shop.description {
                    println!("  {}", description);
                }
                println!();
                print_page_header("books", &books);
                for book in &books.results {
                    print_book_summary(book);
                }
            }
        }

        Commands::Posts(PostCommands::List { page }) => {
            let posts = client
                .posts()
                .list(PageParams { page, page_size: None })
                .await?;
            output(json, &posts, |page| {
                print_page_header("posts", page);
                for post in &page.results {
                    let date = post
                        .published_at
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default();
                    println!("  {:<10} {:<28} {}", date, post.slug, post.title);
                }
            })?;
        }

        Commands::Posts(PostCommands::Show { slug }) => {
            let post = client.posts().get(&slug).await?;
            output(json, &post, |post| {
                println!("{}", post.title);
                println!();
                if let Some(content) = post.content.as_ref().or(post.excerpt.as_ref()) {
                    println!("{}", content);
                }
            })?;
        }

        Commands::Comments(CommentCommands::List { book, page }) => {
            let comments = client
                .comments()
                .list(&book, PageParams { page, page_size: None })
                .await?;
            output(json, &comments, |page| {
                print_page_header("comments", page);
                for comment in &page.results {
                    let author = comment.author.as_deref().unwrap_or("anonymous");
                    let rating = comment
                        .rating
                        .map(|r| format!(" [{}/5]", r))
                        .unwrap_or_default();
                    println!("  {}{}: {}", author, rating, comment.text);
                }
            })?;
        }

        Commands::Comments(CommentCommands::Add { book, text, rating }) => {
            let comment = client
                .comments()
                .add(&book, &NewComment { text, rating })
                .await?;
            println!("✓ Posted comment #{}", comment.id);
        }

        Commands::Cart(cmd) => handle_cart_command(client, cmd, json).await?,

        Commands::Orders(cmd) => handle_orders_command(client, cmd, json).await?,

        Commands::Contact {
            name,
            email,
            subject,
            message,
        } => {
            client
                .contact()
                .send(&ContactMessage {
                    name,
                    email,
                    subject,
                    message,
                })
                .await?;
            println!("✓ Message sent");
        }

        Commands::ClearState => {
            client.storage().clear_all()?;
            client.clear_cache();
            println!("✓ Cleared local session data");
        }
    }

    Ok(())
}

async fn handle_books_command(
    client: &ApiClient,
    cmd: BookCommands,
    json: bool,
) -> storefront::Result<()> {
    match cmd {
        BookCommands::List {
            page,
            page_size,
            category,
            shop,
            search,
            ordering,
        } => {
            let query = BookQuery {
                page,
                page_size,
                category,
                shop,
                search,
                ordering,
            };
            let books = client.books().list(&query).await?;
            output(json, &books, |page| {
                print_page_header("books", page);
                for book in &page.results {
                    print_book_summary(book);
                }
            })?;
        }

        BookCommands::Show { slug } => {
            let book = client.books().get(&slug).await?;
            output(json, &book, |book| {
                println!("{}", book.title);
                if let Some(author) = &book.author {
                    println!("  by {}", author);
                }
                if let Some(price) = &book.price {
                    println!("  Price: {}", price);
                }
                println!("  Likes: {}", book.likes_count);
                if let Some(description) = &book.description {
                    println!();
                    println!("{}", description);
                }
            })?;
        }

        BookCommands::Like { slug } => {
            let status = client.books().toggle_like(&slug).await?;
            let verb = if status.liked { "Liked" } else { "Unliked" };
            println!("✓ {} {} ({} likes)", verb, slug, status.likes_count);
        }

        BookCommands::Liked => {
            let books = client.books().liked().await?;
            output(json, &books, |page| {
                print_page_header("liked books", page);
                for book in &page.results {
                    print_book_summary(book);
                }
            })?;
        }
    }
    Ok(())
}

async fn handle_cart_command(
    client: &ApiClient,
    cmd: CartCommands,
    json: bool,
) -> storefront::Result<()> {
    match cmd {
        CartCommands::Show => {
            let cart = client.cart().get().await?;
            output(json, &cart, |cart| {
                if cart.items.is_empty() {
                    println!("Cart is empty");
                    return;
                }
                for item in &cart.items {
                    println!(
                        "  #{:<6} {:<32} x{} {}",
                        item.id,
                        item.title.as_deref().unwrap_or("-"),
                        item.quantity,
                        item.price.as_deref().unwrap_or("")
                    );
                }
                if let Some(total) = &cart.total {
                    println!();
                    println!("Total: {} ({} items)", total, cart.quantity());
                }
            })?;
        }
        CartCommands::Add { book, quantity } => {
            let item = client.cart().add(book, quantity).await?;
            println!("✓ Added to cart as item #{}", item.id);
        }
        CartCommands::Update { item, quantity } => {
            client.cart().update(item, quantity).await?;
            println!("✓ Updated item #{}", item);
        }
        CartCommands::Remove { item } => {
            client.cart().remove(item).await?;
            println!("✓ Removed item #{}", item);
        }
    }
    Ok(())
}

async fn handle_orders_command(
    client: &ApiClient,
    cmd: OrderCommands,
    json: bool,
) -> storefront::Result<()> {
    match cmd {
        OrderCommands::List { page } => {
            let orders = client
                .orders()
                .list(PageParams { page, page_size: None })
                .await?;
            output(json, &orders, |page| {
                print_page_header("orders", page);
                for order in &page.results {
                    println!(
                        "  #{:<6} {:<12} {}",
                        order.id,
                        order.status,
                        order.total.as_deref().unwrap_or("")
                    );
                }
            })?;
        }
        OrderCommands::Show { id } => {
            let order = client.orders().get(id).await?;
            output(json, &order, |order| {
                println!("Order #{} ({})", order.id, order.status);
                for line in &order.items {
                    println!(
                        "  {} x{} {}",
                        line.book.as_deref().unwrap_or("-"),
                        line.quantity,
                        line.price.as_deref().unwrap_or("")
                    );
                }
                if let Some(total) = &order.total {
                    println!("Total: {}", total);
                }
            })?;
        }
        OrderCommands::Create {
            address,
            phone,
            note,
        } => {
            let order = client
                .orders()
                .create(&NewOrder {
                    address,
                    phone,
                    note,
                })
                .await?;
            println!("✓ Placed order #{} ({})", order.id, order.status);
        }
    }
    Ok(())
}

fn handle_init_command(config_file: &Path, api_url: Option<String>) -> storefront::Result<()> {
    // Check if already initialized
    if config_file.exists() {
        println!("Configuration already exists at {}", config_file.display());
        return Ok(());
    }

    let mut config = ClientConfig::new();
    config.apply_base_url_override(api_url);
    config.save(config_file)?;

    println!("✓ Created configuration at {}", config_file.display());
    println!();
    println!("Next steps:");
    println!("  1. Point base_url at your API server (or set STOREFRONT_API_URL)");
    println!("  2. Sign in:");
    println!("     storefront login you@example.com");

    Ok(())
}

fn handle_config_command(cmd: &ConfigCommands, cli: &Cli) -> storefront::Result<()> {
    let config = load_config(cli)?;
    match cmd {
        ConfigCommands::Show => {
            print!("{}", serde_yaml::to_string(&config)?);
        }
        ConfigCommands::Validate => match validate_config(&config) {
            Ok(()) => println!("✓ Configuration is valid"),
            Err(errors) => {
                println!("Configuration has {} problem(s):", errors.len());
                for error in &errors {
                    println!("  - {}", error);
                }
                return Err(StorefrontError::Config("validation failed".to_string()));
            }
        },
    }
    Ok(())
}

fn output<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> storefront::Result<()> {
    if json {
        print_json(value)
    } else {
        human(value);
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> storefront::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_page_header<T>(what: &str, page: &Page<T>) {
    println!("Showing {} of {} {}:", page.results.len(), page.count, what);
    println!();
}

fn print_book_summary(book: &storefront::api::Book) {
    let liked = if book.is_liked { "♥" } else { " " };
    println!(
        "  {} {:<28} {:<40} {}",
        liked,
        book.slug,
        book.title,
        book.price.as_deref().unwrap_or("")
    );
}
