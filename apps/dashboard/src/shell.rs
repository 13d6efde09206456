use anyhow::Result;
use client_core::{ControllerEvent, Dashboard, ResourceController};
use shared::{domain::ResourceKind, resource::Resource};
use tokio::{
    io::{stdin, AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::TryRecvError},
};
use tracing::debug;

use crate::{
    commands::{merge_draft, ShellCommand, HELP},
    render,
};

/// Interactive session. Controllers live for the whole session, so locally
/// created records stay visible across page changes.
pub async fn run(dashboard: Dashboard) -> Result<()> {
    let mut events = subscribe_all(&dashboard);
    let mut current = ResourceKind::Users;

    for (kind, err) in dashboard.refresh_all().await {
        println!("warning: could not load {kind}: {err}");
    }
    drain_events(&mut events);
    println!("{HELP}");
    println!("{}", with_controller!(dashboard, current, c => render::snapshot(&c.snapshot().await)));

    let mut lines = BufReader::new(stdin()).lines();
    prompt(current);
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            prompt(current);
            continue;
        }
        match ShellCommand::parse(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => {
                if let Err(err) = execute(&dashboard, &mut current, command).await {
                    println!("error: {err}");
                }
            }
            Err(err) => println!("{err}"),
        }
        drain_events(&mut events);
        prompt(current);
    }
    Ok(())
}

fn prompt(current: ResourceKind) {
    println!("[{current}]>");
}

fn subscribe_all(dashboard: &Dashboard) -> Vec<broadcast::Receiver<ControllerEvent>> {
    vec![
        dashboard.users.subscribe_events(),
        dashboard.products.subscribe_events(),
        dashboard.carts.subscribe_events(),
        dashboard.posts.subscribe_events(),
        dashboard.comments.subscribe_events(),
        dashboard.todos.subscribe_events(),
    ]
}

/// Failures are printed from the command result; events only add notices.
fn drain_events(receivers: &mut [broadcast::Receiver<ControllerEvent>]) {
    for rx in receivers.iter_mut() {
        loop {
            match rx.try_recv() {
                Ok(ControllerEvent::Notice { kind, message }) => println!("[{kind}] {message}"),
                Ok(ControllerEvent::ViewUpdated { kind, len }) => {
                    debug!("shell: view updated kind={kind} len={len}");
                }
                Ok(ControllerEvent::Error { .. }) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!("shell: skipped {skipped} events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

async fn execute(
    dashboard: &Dashboard,
    current: &mut ResourceKind,
    command: ShellCommand,
) -> Result<()> {
    match command {
        ShellCommand::Use(kind) => {
            *current = kind;
            with_controller!(dashboard, kind, c => show_or_load(c).await)
        }
        ShellCommand::Stats => {
            if *current != ResourceKind::Users {
                println!("stats are only available for users");
                return Ok(());
            }
            println!("{}", render::stats(&dashboard.users.stats().await));
            Ok(())
        }
        ShellCommand::Login { username, password } => {
            let session = dashboard.auth.login(&username, &password).await?;
            println!(
                "signed in as {} (id {}){}",
                session.username,
                session.id,
                session
                    .email
                    .map(|email| format!(" <{email}>"))
                    .unwrap_or_default()
            );
            Ok(())
        }
        ShellCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ShellCommand::Quit => Ok(()),
        command => with_controller!(dashboard, *current, c => run_on(c, command).await),
    }
}

async fn show_or_load<R: Resource>(controller: &ResourceController<R>) -> Result<()> {
    if controller.total_pages().await == 0 {
        controller.refresh().await?;
    }
    println!("{}", render::snapshot(&controller.snapshot().await));
    Ok(())
}

async fn run_on<R: Resource>(controller: &ResourceController<R>, command: ShellCommand) -> Result<()> {
    match command {
        ShellCommand::Page(page) => {
            if !controller.set_page(page).await? {
                println!(
                    "page {page} is out of range (1..={})",
                    controller.total_pages().await
                );
                return Ok(());
            }
        }
        ShellCommand::Next => {
            if !controller.next_page().await? {
                println!("already on the last page");
                return Ok(());
            }
        }
        ShellCommand::Prev => {
            if !controller.previous_page().await? {
                println!("already on the first page");
                return Ok(());
            }
        }
        ShellCommand::Show => {}
        ShellCommand::Add(json) => {
            let draft = merge_draft(&R::Draft::default(), &json)?;
            controller.create(draft).await?;
        }
        ShellCommand::Edit(id) => controller.begin_edit(id).await?,
        ShellCommand::Save(patch) => {
            if let Some(patch) = patch {
                let draft = merge_draft(&controller.draft().await, &patch)?;
                controller.set_draft(draft).await;
            }
            if controller.submit().await?.is_superseded() {
                println!("a newer save for this record is pending");
            }
        }
        ShellCommand::Cancel => controller.cancel_edit().await,
        ShellCommand::Delete(id) => controller.remove(id).await?,
        other => debug!("shell: {other:?} is not a per-resource command"),
    }
    println!("{}", render::snapshot(&controller.snapshot().await));
    Ok(())
}
