//! # CLI Layer
//!
//! The only place that knows about stdout, stdin and exit codes. Handlers take
//! the initialized [`WikiContext`], call the store, and print plain text.

use super::setup::{Cli, Commands, UserCommands};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::io::{self, IsTerminal};
use tracing::debug;
use wikistore::init::{initialize, WikiContext};
use wikistore::page::Page;
use wikistore::path::normalize_identifier;
use wikistore::store::History;
use wikistore::WikiError;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    debug!(content_dir = %cli.content_dir.display(), "opening wiki");
    let ctx = initialize(&cli.content_dir)
        .with_context(|| format!("cannot open wiki at {}", cli.content_dir.display()))?;

    match cli.command {
        Commands::Show { id, html } => handle_show(&ctx, &id, html),
        Commands::List { tag } => handle_list(&ctx, tag.as_deref()),
        Commands::Tags => handle_tags(&ctx),
        Commands::Search {
            term,
            case_sensitive,
            ignore_case,
        } => {
            let ignore_case = if case_sensitive {
                false
            } else {
                ignore_case || ctx.config.default_search_ignore_case
            };
            handle_search(&ctx, &term, ignore_case)
        }
        Commands::Save {
            id,
            title,
            tags,
            author,
        } => handle_save(&ctx, &id, title, tags, author.as_deref()),
        Commands::Move { id, new_id } => handle_move(&ctx, &id, &new_id),
        Commands::Delete { id } => handle_delete(&ctx, &id),
        Commands::History { id, offset, limit } => handle_history(&ctx, &id, offset, limit),
        Commands::Diff { commit } => handle_diff(&ctx, &commit),
        Commands::User { action } => handle_user(&ctx, action),
    }
}

fn history(ctx: &WikiContext) -> Result<&dyn History> {
    ctx.history()
        .ok_or_else(|| anyhow!("history needs a versioned wiki (set use_git = true)"))
}

fn handle_show(ctx: &WikiContext, id: &str, html: bool) -> Result<()> {
    let id = normalize_identifier(id);
    let page = ctx.store().get_or_not_found(&id)?;
    println!("{}", page.title());
    if !page.tags().is_empty() {
        println!("tags: {}", page.tag_list().join(", "));
    }
    println!();
    if html {
        print!("{}", page.html);
    } else {
        println!("{}", page.body);
    }
    Ok(())
}

fn print_pages(pages: &[Page]) {
    if pages.is_empty() {
        println!("No pages found.");
        return;
    }
    for page in pages {
        println!("{}\t{}", page.id, page.title());
    }
}

fn handle_list(ctx: &WikiContext, tag: Option<&str>) -> Result<()> {
    let pages = match tag {
        Some(tag) => ctx.store().index_by_tag(tag)?,
        None => ctx.store().index()?,
    };
    print_pages(&pages);
    Ok(())
}

fn handle_tags(ctx: &WikiContext) -> Result<()> {
    let tags = ctx.store().tags_index()?;
    if tags.is_empty() {
        println!("No tags found.");
    }
    for (tag, pages) in &tags {
        println!("{}\t{}", tag, pages.len());
    }
    Ok(())
}

fn handle_search(ctx: &WikiContext, term: &str, ignore_case: bool) -> Result<()> {
    let pages = ctx.store().search(term, ignore_case)?;
    print_pages(&pages);
    Ok(())
}

fn read_body() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("pipe the page body on stdin, e.g. `echo Hello | wiki save home`");
    }
    io::read_to_string(stdin).context("failed to read stdin")
}

fn handle_save(
    ctx: &WikiContext,
    id: &str,
    title: Option<String>,
    tags: Option<String>,
    author: Option<&str>,
) -> Result<()> {
    let id = normalize_identifier(id);
    let store = ctx.store();
    let mut page = match store.get(&id)? {
        Some(page) => page,
        None => Page::new(id.as_str()),
    };
    if let Some(title) = title {
        page.set_title(title);
    }
    if let Some(tags) = tags {
        page.set_tags(tags);
    }
    page.set_body(read_body()?);

    store.save_page(&page, author)?;
    println!("Saved {}", page.id);
    Ok(())
}

fn handle_move(ctx: &WikiContext, id: &str, new_id: &str) -> Result<()> {
    let (id, new_id) = (normalize_identifier(id), normalize_identifier(new_id));
    ctx.store().move_page(&id, &new_id)?;
    println!("Moved {} to {}", id, new_id);
    Ok(())
}

fn handle_delete(ctx: &WikiContext, id: &str) -> Result<()> {
    let id = normalize_identifier(id);
    if !ctx.store().delete(&id)? {
        return Err(WikiError::NotFound(id).into());
    }
    println!("Deleted {}", id);
    Ok(())
}

fn handle_history(ctx: &WikiContext, id: &str, offset: usize, limit: usize) -> Result<()> {
    let id = normalize_identifier(id);
    let commits = history(ctx)?.history(&id, offset, limit);
    if commits.is_empty() {
        println!("No history for {}.", id);
    }
    for commit in &commits {
        println!(
            "{}\t{}\t{}",
            commit.hash,
            commit.timestamp.format("%Y-%m-%d %H:%M"),
            commit.author
        );
    }
    Ok(())
}

fn handle_diff(ctx: &WikiContext, commit: &str) -> Result<()> {
    let commit = history(ctx)?.diff(commit)?;
    println!("commit {}", commit.hash);
    println!("Author: {}", commit.author);
    println!("Date:   {}", commit.timestamp.to_rfc2822());
    if let Some(data) = &commit.data {
        println!();
        println!("{}", data);
    }
    Ok(())
}

fn handle_user(ctx: &WikiContext, action: UserCommands) -> Result<()> {
    let accounts = &ctx.accounts;
    match action {
        UserCommands::Add {
            name,
            password,
            method,
            roles,
            inactive,
        } => match accounts.add_account(&name, &password, !inactive, roles, method)? {
            Some(account) => {
                let method = account
                    .record
                    .authentication_method
                    .as_deref()
                    .unwrap_or_default();
                println!("Added user {} ({})", account.name, method);
                Ok(())
            }
            None => bail!("user {} already exists", name),
        },
        UserCommands::Delete { name } => {
            if !accounts.delete_account(&name)? {
                return Err(WikiError::NotFound(name).into());
            }
            println!("Deleted user {}", name);
            Ok(())
        }
        UserCommands::Check { name, password } => {
            let account = accounts
                .get_account(&name)?
                .ok_or_else(|| WikiError::NotFound(name.clone()))?;
            if !accounts.check_password(&account.record, &password)? {
                bail!("password does not match for {}", name);
            }
            if !account.is_active() {
                println!("Password ok, but {} is inactive", name);
            } else {
                println!("Password ok");
            }
            Ok(())
        }
    }
}
