use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{load_settings, Dashboard, ResourceController};
use shared::{
    domain::{RecordId, ResourceKind},
    resource::Resource,
};
use tracing_subscriber::EnvFilter;

/// Runs `$body` with `$controller` bound to the dashboard's controller for `$kind`.
macro_rules! with_controller {
    ($dashboard:expr, $kind:expr, $controller:ident => $body:expr) => {
        match $kind {
            ResourceKind::Users => {
                let $controller = &*$dashboard.users;
                $body
            }
            ResourceKind::Products => {
                let $controller = &*$dashboard.products;
                $body
            }
            ResourceKind::Carts => {
                let $controller = &*$dashboard.carts;
                $body
            }
            ResourceKind::Posts => {
                let $controller = &*$dashboard.posts;
                $body
            }
            ResourceKind::Comments => {
                let $controller = &*$dashboard.comments;
                $body
            }
            ResourceKind::Todos => {
                let $controller = &*$dashboard.todos;
                $body
            }
        }
    };
}

mod commands;
mod render;
mod shell;

use commands::{merge_draft, parse_kind};

#[derive(Parser, Debug)]
#[command(about = "Paginated CRUD dashboard over a REST collections API")]
struct Cli {
    /// Base URL of the collections API (overrides dashboard.toml and env).
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    page_size: Option<u32>,
    /// Return to page 1 and reload after every successful mutation.
    #[arg(long)]
    refetch: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one page of a collection.
    List {
        #[arg(value_parser = parse_kind)]
        resource: ResourceKind,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Create a record from a JSON draft.
    Add {
        #[arg(value_parser = parse_kind)]
        resource: ResourceKind,
        json: String,
    },
    /// Patch a record found on the given page.
    Update {
        #[arg(value_parser = parse_kind)]
        resource: ResourceKind,
        id: i64,
        json: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Delete {
        #[arg(value_parser = parse_kind)]
        resource: ResourceKind,
        id: i64,
    },
    Login {
        username: String,
        password: String,
    },
    /// Interactive session.
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = cli.api_url {
        settings.api_base_url = url;
    }
    if let Some(page_size) = cli.page_size.filter(|size| *size > 0) {
        settings.page_size = page_size;
    }
    if cli.refetch {
        settings.refetch_after_mutation = true;
    }
    let dashboard = Dashboard::connect(&settings)?;

    match cli.command {
        Command::List { resource, page } => {
            with_controller!(dashboard, resource, c => list(c, page).await)
        }
        Command::Add { resource, json } => {
            with_controller!(dashboard, resource, c => add(c, &json).await)
        }
        Command::Update {
            resource,
            id,
            json,
            page,
        } => with_controller!(dashboard, resource, c => update(c, RecordId(id), &json, page).await),
        Command::Delete { resource, id } => {
            let removed = with_controller!(dashboard, resource, c => c.remove(RecordId(id)).await);
            removed?;
            println!("deleted {} #{id}", resource.label().to_ascii_lowercase());
            Ok(())
        }
        Command::Login { username, password } => {
            let session = dashboard.auth.login(&username, &password).await?;
            println!("{}", serde_json::to_string_pretty(&session)?);
            Ok(())
        }
        Command::Shell => shell::run(dashboard).await,
    }
}

async fn load_page<R: Resource>(controller: &ResourceController<R>, page: u32) -> Result<()> {
    controller.refresh().await?;
    if page != 1 && !controller.set_page(page).await? {
        bail!(
            "page {page} is out of range (1..={})",
            controller.total_pages().await
        );
    }
    Ok(())
}

async fn list<R: Resource>(controller: &ResourceController<R>, page: u32) -> Result<()> {
    load_page(controller, page).await?;
    print!("{}", render::snapshot(&controller.snapshot().await));
    Ok(())
}

async fn add<R: Resource>(controller: &ResourceController<R>, json: &str) -> Result<()> {
    let draft = merge_draft(&R::Draft::default(), json)?;
    if let Some(record) = controller.create(draft).await?.applied() {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

async fn update<R: Resource>(
    controller: &ResourceController<R>,
    id: RecordId,
    json: &str,
    page: u32,
) -> Result<()> {
    load_page(controller, page).await?;
    controller.begin_edit(id).await?;
    let draft = merge_draft(&controller.draft().await, json)?;
    if let Some(record) = controller.update(id, draft).await?.applied() {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}
