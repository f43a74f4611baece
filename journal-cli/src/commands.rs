use std::io::{self, BufRead, IsTerminal, Read, Write};

use anyhow::{bail, Context, Result};
use spring_journal::entry::{parse_entry_date, EntryDraft, EntryId, EntryList, SortOrder};
use spring_journal::validation::{ValidationError, DELETE_CONFIRMATION};
use spring_journal::JournalClient;
use time::{OffsetDateTime, UtcOffset};

use crate::output;

pub async fn login(client: &JournalClient, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    let session = client.login(username.trim(), &password).await?;
    println!("Signed in as {}.", session.username);
    Ok(())
}

pub async fn signup(client: &JournalClient, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
    let confirmation =
        rpassword::prompt_password("Confirm password: ").context("Failed to read password")?;
    if password != confirmation {
        bail!(ValidationError::PasswordMismatch);
    }

    client.signup(username.trim(), &password).await?;
    println!("Account created. Sign in with `journal login`.");
    Ok(())
}

pub fn logout(client: &JournalClient) -> Result<()> {
    client.logout()?;
    println!("Signed out.");
    Ok(())
}

pub async fn dashboard(client: &JournalClient) -> Result<()> {
    let board = client.dashboard().await?;
    let username = client
        .lifecycle()
        .session()?
        .map(|session| session.username)
        .unwrap_or_default();

    print!("{}", output::dashboard(&board, &username, local_now()));
    Ok(())
}

pub async fn list(client: &JournalClient, search: Option<String>, oldest_first: bool) -> Result<()> {
    let mut list = EntryList::new(client.list_entries().await?);
    list.search = search.unwrap_or_default();
    if oldest_first {
        list.order = SortOrder::OldestFirst;
    }

    println!("{}", output::entry_list(&list.visible(), list.order));
    Ok(())
}

pub async fn show(client: &JournalClient, id: String) -> Result<()> {
    let entry = client.get_entry(&EntryId::new(id)).await?;
    println!("{}", output::entry_full(&entry));
    Ok(())
}

pub async fn new_entry(
    client: &JournalClient,
    title: String,
    content: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let content = match content {
        Some(content) => content,
        None => read_content()?,
    };
    let date = match date {
        Some(raw) => parse_date(&raw)?,
        None => OffsetDateTime::now_utc(),
    };

    let draft = EntryDraft::new(&title, &content, date);
    match client.create_entry(&draft).await? {
        Some(entry) => match entry.id {
            Some(id) => println!("Saved entry {} ({} words).", id, draft.word_count()),
            None => println!("Saved ({} words).", draft.word_count()),
        },
        None => println!("Saved ({} words).", draft.word_count()),
    }
    Ok(())
}

pub async fn edit_entry(
    client: &JournalClient,
    id: String,
    title: Option<String>,
    content: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let id = EntryId::new(id);
    let existing = client.get_entry(&id).await?;

    let date = match date {
        Some(raw) => parse_date(&raw)?,
        None => existing.date.unwrap_or_else(OffsetDateTime::now_utc),
    };
    let draft = EntryDraft::new(
        title.as_deref().unwrap_or(&existing.title),
        content.as_deref().unwrap_or(&existing.content),
        date,
    );

    client.update_entry(&id, &draft).await?;
    println!(
        "Updated entry {} ({} words, {} characters).",
        id,
        draft.word_count(),
        draft.char_count()
    );
    Ok(())
}

pub async fn delete_entry(client: &JournalClient, id: String, yes: bool) -> Result<()> {
    let id = EntryId::new(id);
    if !yes && !confirm(&format!("Delete entry {}? [y/N] ", id))? {
        println!("Cancelled.");
        return Ok(());
    }

    client.delete_entry(&id).await?;
    println!("Deleted entry {}.", id);
    Ok(())
}

pub async fn profile(client: &JournalClient) -> Result<()> {
    let profile = client.me().await?;
    println!("{}", output::profile(&profile));
    Ok(())
}

pub async fn set_password(client: &JournalClient, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username.trim().to_string(),
        None => client.me().await?.username,
    };
    let password =
        rpassword::prompt_password("New password: ").context("Failed to read password")?;
    let confirmation =
        rpassword::prompt_password("Confirm password: ").context("Failed to read password")?;

    client
        .update_credentials(&username, &password, &confirmation)
        .await?;
    println!("Password updated.");
    Ok(())
}

pub async fn email_settings(
    client: &JournalClient,
    email: Option<String>,
    sentiment_analysis: Option<bool>,
    journal_summarization: Option<bool>,
) -> Result<()> {
    let current = client.me().await?;
    if email.is_none() && sentiment_analysis.is_none() && journal_summarization.is_none() {
        println!("{}", output::profile(&current));
        return Ok(());
    }

    let email = email.map(|e| e.trim().to_string()).unwrap_or(current.email);
    client
        .update_email_settings(
            &email,
            sentiment_analysis.unwrap_or(current.sentiment_analysis),
            journal_summarization.unwrap_or(current.journal_summarization),
        )
        .await?;
    println!("Email settings saved.");
    Ok(())
}

pub async fn delete_account(client: &JournalClient) -> Result<()> {
    println!("This permanently deletes your account and every journal entry.");
    let typed = prompt(&format!("Type {} to confirm: ", DELETE_CONFIRMATION))?;

    client.delete_account(typed.trim()).await?;
    println!("Account deleted.");
    Ok(())
}

fn parse_date(raw: &str) -> Result<OffsetDateTime> {
    parse_entry_date(raw.trim())
        .with_context(|| format!("Invalid date '{}'. Use RFC 3339, e.g. 2024-05-01T09:30:00Z", raw))
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(label: &str) -> Result<bool> {
    Ok(matches!(prompt(label)?.trim(), "y" | "Y" | "yes"))
}

fn read_content() -> Result<String> {
    if io::stdin().is_terminal() {
        eprintln!("Write your entry, then press Ctrl-D to save:");
    }
    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read entry content from stdin")?;
    Ok(content)
}
