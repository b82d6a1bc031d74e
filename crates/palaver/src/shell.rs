// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `palaver shell` command implementation.
//!
//! The terminal stand-in for the browser layout: sign-in gate, user list
//! with live filtering, chat selection, and a message pane fed by the push
//! subscription. One readline loop plays the part of the event loop.

use std::sync::Arc;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::warn;

use palaver_app::{
    ChatResolver, Composer, GateOutcome, IdentityDirectory, MessageStore, SendOutcome, SessionGate,
};
use palaver_config::PalaverConfig;
use palaver_core::{AuthGateway, Identity, PalaverError, RealtimeGateway, SignUpStatus, TableGateway};
use palaver_supabase::SupabaseClient;

/// Runs the interactive chat shell.
pub async fn run_shell(config: PalaverConfig) -> Result<(), PalaverError> {
    let client = Arc::new(SupabaseClient::new(&config.backend)?);
    let auth: Arc<dyn AuthGateway> = client.clone();
    let tables: Arc<dyn TableGateway> = client.clone();
    let realtime: Arc<dyn RealtimeGateway> = client.clone();

    let mut rl = DefaultEditor::new()
        .map_err(|e| PalaverError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", config.app.name.bold().green());

    // Session gate: nothing renders until an identity is established.
    let gate = SessionGate::new(auth.clone());
    let current = match gate.check().await {
        GateOutcome::SignedIn(identity) => identity,
        GateOutcome::SignInRequired => sign_in_flow(&mut rl, auth.as_ref()).await?,
    };
    println!("signed in as {}\n", current.email.green());

    // Identity directory; a failed listing degrades to an empty directory.
    let directory = match IdentityDirectory::load(auth.as_ref()).await {
        Ok(directory) => Some(directory),
        Err(e) => {
            warn!(error = %e, "identity listing failed");
            eprintln!("{}: user list unavailable ({e})", "warning".yellow());
            None
        }
    };

    let resolver = ChatResolver::new(tables.clone());
    let store = Arc::new(MessageStore::new(auth.clone(), tables.clone(), realtime.clone()));
    let mut composer = Composer::new();

    // Print pushed messages as they enter the visible list.
    let printer = {
        let store = Arc::clone(&store);
        let me = current.id.clone();
        tokio::spawn(async move {
            while let Some(message) = store.next_appended().await {
                let sender = if message.sender_id == me {
                    "you".dimmed().to_string()
                } else {
                    message.sender_id.to_string().cyan().to_string()
                };
                let stamp = message.created_at.format("%H:%M").to_string();
                println!("{} {} {}", stamp.dimmed(), sender, message.content);
            }
        })
    };

    print_help();

    let prompt = format!("{}> ", config.app.name.green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match trimmed {
                    "/quit" | "/exit" => break,
                    "/help" => print_help(),
                    "/whoami" => println!("{} ({})", current.email, current.id),
                    "/logout" => {
                        auth.sign_out().await?;
                        println!("signed out");
                        break;
                    }
                    "/detach" => {
                        composer.remove_attachment();
                    }
                    _ if trimmed.starts_with("/users") => {
                        let query = trimmed.strip_prefix("/users").unwrap_or("").trim();
                        print_users(directory.as_ref(), query);
                    }
                    _ if trimmed.starts_with("/open ") => {
                        let email = trimmed.strip_prefix("/open ").unwrap_or("").trim();
                        open_chat(directory.as_ref(), &resolver, &store, &current, email).await;
                    }
                    _ if trimmed.starts_with("/attach ") => {
                        let name = trimmed.strip_prefix("/attach ").unwrap_or("").trim();
                        composer.attach(name);
                        println!("attached {} (shown locally, never uploaded)", name.cyan());
                    }
                    _ if trimmed.starts_with('/') => {
                        eprintln!("unknown command {trimmed}; try /help");
                    }
                    text => {
                        composer.set_draft(text);
                        match composer.submit(&store).await {
                            Ok(SendOutcome::Sent) => {}
                            Ok(SendOutcome::Skipped) => {
                                eprintln!("{}", "nothing sent: open a chat with /open first".dimmed());
                            }
                            Err(e) => {
                                // The draft is preserved; say so.
                                eprintln!("{}: {e} (draft kept)", "error".red());
                            }
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    // View teardown: release the live push subscription.
    store.clear().await;
    printer.abort();

    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Interactive sign-in, with `/signup` available at the email prompt.
async fn sign_in_flow(
    rl: &mut DefaultEditor,
    auth: &dyn AuthGateway,
) -> Result<Identity, PalaverError> {
    println!("sign in ({} to create an account)", "/signup".yellow());
    loop {
        let email = match rl.readline("email> ") {
            Ok(line) => line.trim().to_string(),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                return Err(PalaverError::Auth {
                    message: "sign-in aborted".to_string(),
                    source: None,
                });
            }
            Err(e) => return Err(PalaverError::Internal(format!("readline failed: {e}"))),
        };
        if email.is_empty() {
            continue;
        }

        let signing_up = email == "/signup";
        let email = if signing_up {
            match rl.readline("new account email> ") {
                Ok(line) => line.trim().to_string(),
                Err(_) => continue,
            }
        } else {
            email
        };

        let password = rpassword::prompt_password("password: ")
            .map_err(|e| PalaverError::Internal(format!("password prompt failed: {e}")))?;

        if signing_up {
            match auth.sign_up(&email, &password).await {
                Ok(SignUpStatus::Confirmed(identity)) => return Ok(identity),
                Ok(SignUpStatus::PendingVerification) => {
                    println!("check your email for verification, then sign in");
                }
                Err(e) => eprintln!("{}: {e}", "sign-up failed".red()),
            }
        } else {
            match auth.sign_in(&email, &password).await {
                Ok(identity) => return Ok(identity),
                Err(e) => eprintln!("{}: {e}", "sign-in failed".red()),
            }
        }
    }
}

fn print_users(directory: Option<&IdentityDirectory>, query: &str) {
    let Some(directory) = directory else {
        eprintln!("user list unavailable");
        return;
    };
    let matches = directory.filter(query);
    if matches.is_empty() {
        println!(
            "{}",
            if query.is_empty() {
                "no users available"
            } else {
                "no users match"
            }
        );
        return;
    }
    for identity in matches {
        println!("  {}", identity.email);
    }
}

async fn open_chat(
    directory: Option<&IdentityDirectory>,
    resolver: &ChatResolver,
    store: &MessageStore,
    current: &Identity,
    email: &str,
) {
    let Some(directory) = directory else {
        eprintln!("user list unavailable, cannot open chats");
        return;
    };
    let Some(counterparty) = directory.find_by_email(email) else {
        eprintln!("no such user: {email}");
        return;
    };

    let chat = match resolver.resolve(current, counterparty).await {
        Ok(chat) => chat,
        Err(e) => {
            // Selection is untouched on failure; the previous chat stays open.
            eprintln!("{}: {e}", "could not open chat".red());
            return;
        }
    };

    if let Err(e) = store.select(chat).await {
        eprintln!("{}: {e}", "could not load chat".red());
        return;
    }

    println!("--- {} ---", counterparty.email.bold());
    for message in store.messages().await {
        let sender = if message.sender_id == current.id {
            "you".to_string()
        } else {
            counterparty.email.clone()
        };
        let stamp = message.created_at.format("%H:%M").to_string();
        println!("{} {} {}", stamp.dimmed(), sender.cyan(), message.content);
    }
}

fn print_help() {
    println!("commands:");
    println!("  {}           list users, or filter with a query", "/users [q]".yellow());
    println!("  {}       open (or start) a chat by email", "/open <email>".yellow());
    println!("  {}      attach a file name to show locally", "/attach <name>".yellow());
    println!("  {}            drop the attachment", "/detach".yellow());
    println!("  {}            show the signed-in identity", "/whoami".yellow());
    println!("  {}            sign out and exit", "/logout".yellow());
    println!("  {}              exit", "/quit".yellow());
    println!("anything else is sent to the open chat\n");
}
