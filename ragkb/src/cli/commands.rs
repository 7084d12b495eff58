//! CLI command execution.
//!
//! Each command enters the screen it stands in for through the router. A
//! guard redirect ends the command before any API call is made.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use ragkb::api::auth::LoginForm;
use ragkb::api::chat::{self, SessionSettings};
use ragkb::api::document::{self, DocumentQuery};
use ragkb::api::knowledge::{self, CreateKnowledgeBaseRequest, KnowledgeBaseQuery};
use ragkb::api::stream::{ChatStream, StreamEvent};
use ragkb::api::user::{
    self as users, ChangePasswordRequest, CreateUserRequest, UpdateUserRequest, UserQuery,
};
use ragkb::api::PageQuery;
use ragkb::http::UploadForm;
use ragkb::models::{
    ChatMessage, ChatSession, KnowledgeBase, KnowledgeBasePatch, KnowledgeDocument, MessagePatch,
    MessageRole, RagSource, User,
};
use ragkb::notify::{ConsoleNotifier, LogNotifier, Notifier};
use ragkb::router::{History, Router, LOGIN_PATH};
use ragkb::storage::{ClientStorage, FileStorage};
use ragkb::store::{ChatStore, KnowledgeStore, UserStore};
use ragkb::{Config, HttpClient};
use tracing::debug;
use uuid::Uuid;

use super::args::{ChatAction, Cli, Commands, DocAction, KbAction, UserAction};

/// Placeholder id for a message the server has not echoed yet.
fn local_id() -> String {
    format!("local-{}", Uuid::now_v7())
}

/// Everything a command may touch, wired once per invocation.
struct App {
    client: Arc<HttpClient>,
    users: UserStore,
    knowledge: KnowledgeStore,
    chat: ChatStore,
    router: Router,
    history: Arc<History>,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let config = match cli.storage {
            Some(ref path) => Config::with_storage(&cli.api_base_url, path.clone()),
            None => Config::new(&cli.api_base_url),
        }
        .context("Invalid configuration")?
        .timeout(Duration::from_secs(cli.timeout_secs));

        let storage: Arc<dyn ClientStorage> = Arc::new(
            FileStorage::open(config.storage_path.clone()).with_context(|| {
                format!("Failed to open storage {}", config.storage_path.display())
            })?,
        );
        let notifier: Arc<dyn Notifier> = if cli.quiet {
            Arc::new(LogNotifier)
        } else {
            Arc::new(ConsoleNotifier)
        };
        let history = Arc::new(History::new());

        let client = Arc::new(
            HttpClient::new(&config, Arc::clone(&storage), history.clone(), notifier)
                .context("Failed to build HTTP client")?,
        );
        debug!(base_url = client.base_url(), "client ready");

        Ok(Self {
            users: UserStore::new(Arc::clone(&client), storage, history.clone()),
            knowledge: KnowledgeStore::new(Arc::clone(&client)),
            chat: ChatStore::new(Arc::clone(&client)),
            client,
            router: Router::new(),
            history,
        })
    }

    /// Navigate to `path`, failing if the guard turns us away.
    async fn enter(&mut self, path: &str) -> Result<()> {
        let auth = self.users.snapshot().await;
        let navigation = self.router.navigate(path, &auth);
        if navigation.guard_redirected {
            bail!("Cannot open {path}: redirected to {}", navigation.location);
        }
        debug!(location = %navigation.location, title = self.router.title(), "entered");
        Ok(())
    }
}

// === Formatting ===

/// First eight characters of an id, for tables.
fn short(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(i, _)| &id[..i])
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[allow(clippy::cast_precision_loss)]
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn print_sources(sources: &[RagSource]) {
    if sources.is_empty() {
        return;
    }
    println!("\nSources:");
    for (i, source) in sources.iter().enumerate() {
        println!("  [{}] {} (score {:.2})", i + 1, source.title, source.score);
    }
}

fn print_user(user: &User) {
    println!("ID:         {}", user.id);
    println!("Username:   {}", user.username);
    println!("Name:       {}", user.display_name());
    println!("Email:      {}", or_dash(&user.email));
    println!("Phone:      {}", or_dash(&user.phone));
    println!("Status:     {}", or_dash(&user.status));
    let roles: Vec<&str> = user.roles.iter().map(|r| r.name.as_str()).collect();
    println!(
        "Roles:      {}",
        if roles.is_empty() {
            "-".to_string()
        } else {
            roles.join(", ")
        }
    );
    println!("Last login: {}", timestamp(user.last_login_at));
}

fn print_knowledge_base(kb: &KnowledgeBase) {
    println!("ID:          {}", kb.id);
    println!("Name:        {}", kb.name);
    println!("English:     {}", or_dash(&kb.english_name));
    println!("Description: {}", or_dash(&kb.description));
    println!("Model:       {}", or_dash(&kb.embedding_model));
    println!("Documents:   {}", kb.document_count);
    println!("Size:        {}", human_size(kb.total_size));
    println!("Status:      {}", or_dash(&kb.status));
    println!("Created:     {}", timestamp(kb.created_at));
}

fn print_document(doc: &KnowledgeDocument) {
    println!("ID:      {}", doc.id);
    println!("Name:    {}", doc.name);
    println!("Type:    {}", or_dash(&doc.file_type));
    println!("Size:    {}", human_size(doc.file_size));
    println!("Status:  {}", or_dash(&doc.status));
    println!("Chunks:  {}", doc.chunk_count);
    if let Some(ref error) = doc.error_message {
        println!("Error:   {error}");
    }
    println!("Created: {}", timestamp(doc.created_at));
}

fn print_session(session: &ChatSession) {
    println!("ID:        {}", session.id);
    println!("Title:     {}", session.title);
    println!(
        "KBs:       {}",
        if session.knowledge_base_ids.is_empty() {
            "-".to_string()
        } else {
            session.knowledge_base_ids.join(", ")
        }
    );
    println!("RAG:       {}", if session.use_rag { "on" } else { "off" });
    println!(
        "Retrieval: top_k={} threshold={} weight={}",
        session.top_k, session.similarity_threshold, session.similarity_weight
    );
    println!("Messages:  {}", session.message_count);
    println!("Updated:   {}", timestamp(session.updated_at));
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password is required");
    }
    Ok(password)
}

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    let mut app = App::new(&cli)?;

    let result = match cli.command {
        Commands::Login { username, password } => login(&mut app, username, password).await,
        Commands::Logout => logout(&app).await,
        Commands::Whoami { refresh } => whoami(&mut app, refresh).await,
        Commands::Passwd { old, new } => change_password(&mut app, old, new).await,
        Commands::Kb { action } => knowledge_bases(&mut app, action).await,
        Commands::Docs { kb, action } => documents(&mut app, &kb, action).await,
        Commands::Chat { action } => chat_command(&mut app, action).await,
        Commands::Users { action } => user_admin(&mut app, action).await,
    };

    if result.is_err() && app.history.last().as_deref() == Some(LOGIN_PATH) {
        eprintln!("Credentials were cleared. Run `ragkb login <username>` to sign in again.");
    }
    result
}

async fn login(app: &mut App, username: String, password: Option<String>) -> Result<()> {
    app.enter(LOGIN_PATH).await?;
    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };

    let user = app
        .users
        .login(&LoginForm { username, password })
        .await
        .context("Login failed")?;
    println!("Logged in as {}", user.display_name());
    Ok(())
}

async fn logout(app: &App) -> Result<()> {
    if !app.users.is_logged_in().await {
        println!("Not logged in.");
        return Ok(());
    }
    app.users.logout().await;
    println!("Logged out.");
    Ok(())
}

async fn whoami(app: &mut App, refresh: bool) -> Result<()> {
    app.enter("/profile").await?;
    if refresh {
        app.users
            .refresh_session()
            .await
            .context("Failed to refresh session")?;
    }
    let user = app
        .users
        .fetch_current_user()
        .await
        .context("Failed to load profile")?;
    print_user(&user);
    Ok(())
}

async fn change_password(app: &mut App, old: String, new: String) -> Result<()> {
    app.enter("/profile").await?;
    app.client
        .call(users::update_password(&ChangePasswordRequest {
            old_password: old,
            new_password: new,
        }))
        .await
        .context("Failed to change password")?;
    println!("Password changed.");
    Ok(())
}

async fn knowledge_bases(app: &mut App, action: KbAction) -> Result<()> {
    app.enter("/knowledge").await?;

    match action {
        KbAction::List { page, status } => {
            let query = KnowledgeBaseQuery {
                page: page.into(),
                status,
            };
            let total = app
                .knowledge
                .fetch_knowledge_bases(&query)
                .await
                .context("Failed to list knowledge bases")?;

            let list = app.knowledge.knowledge_base_list().await;
            if list.is_empty() {
                println!("No knowledge bases found.");
                return Ok(());
            }
            println!(
                "{:<10} {:<28} {:<6} {:<10} {:<10}",
                "ID", "NAME", "DOCS", "SIZE", "STATUS"
            );
            println!("{}", "-".repeat(68));
            for kb in &list {
                println!(
                    "{:<10} {:<28} {:<6} {:<10} {:<10}",
                    short(&kb.id),
                    truncate(&kb.name, 26),
                    kb.document_count,
                    human_size(kb.total_size),
                    or_dash(&kb.status),
                );
            }
            println!("\n{} of {total} shown", list.len());
        }
        KbAction::Show { id } => {
            let kb = app
                .client
                .call(knowledge::get_knowledge_base(&id))
                .await
                .and_then(|r| r.require_data())
                .with_context(|| format!("Failed to load knowledge base {id}"))?;
            app.knowledge.set_current_knowledge_base(kb.clone()).await;
            print_knowledge_base(&kb);
        }
        KbAction::Create {
            name,
            english_name,
            description,
            embedding_model,
        } => {
            let kb = app
                .client
                .call(knowledge::create_knowledge_base(&CreateKnowledgeBaseRequest {
                    name,
                    english_name,
                    description,
                    embedding_model,
                }))
                .await
                .and_then(|r| r.require_data())
                .context("Failed to create knowledge base")?;
            println!("Created knowledge base {} ({})", kb.name, kb.id);
            app.knowledge.add_knowledge_base(kb).await;
        }
        KbAction::Update {
            id,
            name,
            description,
            status,
        } => {
            let patch = KnowledgeBasePatch {
                name,
                description,
                status,
            };
            if patch == KnowledgeBasePatch::default() {
                bail!("Nothing to update: pass --name, --description or --status");
            }
            app.client
                .call(knowledge::update_knowledge_base(&id, &patch))
                .await
                .with_context(|| format!("Failed to update knowledge base {id}"))?;
            app.knowledge.update_knowledge_base(&id, patch).await;
            println!("Updated knowledge base {id}");
        }
        KbAction::Delete { id } => {
            app.client
                .call(knowledge::delete_knowledge_base(&id))
                .await
                .with_context(|| format!("Failed to delete knowledge base {id}"))?;
            app.knowledge.remove_knowledge_base(&id).await;
            println!("Deleted knowledge base {id}");
        }
    }
    Ok(())
}

async fn upload_form(path: &Path, mime: Option<String>) -> Result<UploadForm> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Upload path has no file name")?;

    let form = UploadForm::new(file_name, bytes);
    Ok(match mime {
        Some(mime) => form.mime(mime),
        None => form,
    })
}

async fn documents(app: &mut App, kb: &str, action: DocAction) -> Result<()> {
    app.enter(&format!("/knowledge/{}/documents", urlencoding::encode(kb)))
        .await?;

    match action {
        DocAction::List { page, status } => {
            let query = DocumentQuery {
                page: page.into(),
                status,
            };
            let page = app
                .client
                .call(document::list_documents(kb, &query))
                .await
                .context("Failed to list documents")?
                .data
                .unwrap_or_default();

            let total = page.total;
            let docs = page.into_items();
            if docs.is_empty() {
                println!("No documents found.");
                return Ok(());
            }
            println!(
                "{:<10} {:<32} {:<10} {:<12} {:<7}",
                "ID", "NAME", "SIZE", "STATUS", "CHUNKS"
            );
            println!("{}", "-".repeat(75));
            for doc in &docs {
                println!(
                    "{:<10} {:<32} {:<10} {:<12} {:<7}",
                    short(&doc.id),
                    truncate(&doc.name, 30),
                    human_size(doc.file_size),
                    or_dash(&doc.status),
                    doc.chunk_count,
                );
            }
            println!("\n{} of {total} shown", docs.len());
        }
        DocAction::Show { id } => {
            let doc = app
                .client
                .call(document::get_document(kb, &id))
                .await
                .and_then(|r| r.require_data())
                .with_context(|| format!("Failed to load document {id}"))?;
            print_document(&doc);
        }
        DocAction::Upload { file, mime } => {
            let form = upload_form(&file, mime).await?;
            let doc = app
                .client
                .call(document::upload_document(kb, form))
                .await
                .and_then(|r| r.require_data())
                .with_context(|| format!("Failed to upload {}", file.display()))?;
            println!("Uploaded {} ({}), status {}", doc.name, doc.id, or_dash(&doc.status));
        }
        DocAction::Delete { id } => {
            app.client
                .call(document::delete_document(kb, &id))
                .await
                .with_context(|| format!("Failed to delete document {id}"))?;
            println!("Deleted document {id}");
        }
        DocAction::Reprocess { id } => {
            app.client
                .call(document::reprocess_document(kb, &id))
                .await
                .with_context(|| format!("Failed to reprocess document {id}"))?;
            println!("Reprocessing document {id}");
        }
    }
    Ok(())
}

async fn chat_command(app: &mut App, action: ChatAction) -> Result<()> {
    app.enter("/chat").await?;

    match action {
        ChatAction::Sessions { page } => list_sessions(app, page.into()).await?,
        ChatAction::New {
            title,
            knowledge_base_ids,
            no_rag,
            top_k,
            threshold,
            weight,
        } => {
            let settings = SessionSettings {
                title,
                knowledge_base_ids,
                use_rag: !no_rag,
                top_k,
                similarity_threshold: threshold,
                similarity_weight: weight,
            };
            let session = app
                .client
                .call(chat::create_session(&settings))
                .await
                .and_then(|r| r.require_data())
                .context("Failed to create session")?;
            println!("Created session {} ({})", session.title, session.id);
            app.chat.add_session(session).await;
        }
        ChatAction::Show { id } => {
            let session = get_session(app, &id).await?;
            print_session(&session);
        }
        ChatAction::Rename { id, title } => {
            let session = get_session(app, &id).await?;
            let settings = SessionSettings {
                title,
                ..SessionSettings::from(&session)
            };
            let updated = app
                .client
                .call(chat::update_session(&id, &settings))
                .await
                .and_then(|r| r.require_data())
                .with_context(|| format!("Failed to rename session {id}"))?;
            println!("Renamed session {id} to {}", updated.title);
            app.chat.replace_session(updated).await;
        }
        ChatAction::Delete { id } => {
            app.client
                .call(chat::delete_session(&id))
                .await
                .with_context(|| format!("Failed to delete session {id}"))?;
            app.chat.remove_session(&id).await;
            println!("Deleted session {id}");
        }
        ChatAction::History { id, page } => show_history(app, &id, page.into()).await?,
        ChatAction::Ask { id, message } => ask(app, &id, &message.join(" ")).await?,
        ChatAction::Stream { id, message } => stream(app, &id, &message.join(" ")).await?,
    }
    Ok(())
}

async fn get_session(app: &App, id: &str) -> Result<ChatSession> {
    app.client
        .call(chat::get_session(id))
        .await
        .and_then(|r| r.require_data())
        .with_context(|| format!("Failed to load session {id}"))
}

async fn list_sessions(app: &App, query: PageQuery) -> Result<()> {
    let total = app
        .chat
        .fetch_sessions(query)
        .await
        .context("Failed to list sessions")?;

    let sessions = app.chat.session_list().await;
    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }
    println!(
        "{:<10} {:<30} {:<6} {:<5} {:<16}",
        "ID", "TITLE", "MSGS", "RAG", "UPDATED"
    );
    println!("{}", "-".repeat(70));
    for session in &sessions {
        println!(
            "{:<10} {:<30} {:<6} {:<5} {:<16}",
            short(&session.id),
            truncate(&session.title, 28),
            session.message_count,
            if session.use_rag { "on" } else { "off" },
            timestamp(session.updated_at),
        );
    }
    println!("\n{} of {total} shown", sessions.len());
    Ok(())
}

async fn show_history(app: &App, id: &str, query: PageQuery) -> Result<()> {
    app.chat.set_current_session(id).await;
    app.chat
        .fetch_messages(id, query)
        .await
        .with_context(|| format!("Failed to load messages for session {id}"))?;

    let messages = app.chat.message_list().await;
    if messages.is_empty() {
        println!("No messages in session {id}.");
        return Ok(());
    }
    for message in &messages {
        println!("[{}]:", message.role.label());
        println!("{}", message.content);
        println!();
    }
    Ok(())
}

async fn ask(app: &App, id: &str, question: &str) -> Result<()> {
    app.chat.set_current_session(id).await;
    app.chat
        .add_message(ChatMessage::local(local_id(), id, MessageRole::User, question))
        .await;

    let reply = app
        .client
        .call(chat::send_message(id, question))
        .await
        .and_then(|r| r.require_data())
        .context("Failed to send message")?;

    println!("{}", reply.content);
    print_sources(&reply.rag_sources);

    let mut answer = ChatMessage::local(reply.message_id, id, MessageRole::Assistant, reply.content);
    answer.rag_sources = reply.rag_sources;
    answer.tokens_used = reply.tokens_used;
    app.chat.add_message(answer).await;
    Ok(())
}

async fn stream(app: &App, id: &str, question: &str) -> Result<()> {
    app.chat.set_current_session(id).await;
    app.chat
        .add_message(ChatMessage::local(local_id(), id, MessageRole::User, question))
        .await;
    let answer_id = local_id();
    app.chat
        .add_message(ChatMessage::local(&answer_id, id, MessageRole::Assistant, ""))
        .await;

    let mut stream = ChatStream::open(&app.client, id, question);
    let mut content = String::new();
    let mut sources = Vec::new();
    let mut stdout = io::stdout();

    while let Some(event) = stream.next_event().await {
        match event {
            StreamEvent::Sources(found) => {
                app.chat
                    .update_message(
                        &answer_id,
                        MessagePatch {
                            rag_sources: Some(found.clone()),
                            ..MessagePatch::default()
                        },
                    )
                    .await;
                sources = found;
            }
            StreamEvent::Content(fragment) => {
                print!("{fragment}");
                stdout.flush().ok();
                content.push_str(&fragment);
                app.chat
                    .update_message(&answer_id, MessagePatch::content(content.clone()))
                    .await;
            }
            StreamEvent::Done => break,
            StreamEvent::Error(message) => {
                println!();
                bail!("Stream failed: {message}");
            }
        }
    }
    println!();
    debug!(state = %stream.state(), "stream finished");
    stream.close();

    print_sources(&sources);
    Ok(())
}

async fn user_admin(app: &mut App, action: UserAction) -> Result<()> {
    app.enter("/users").await?;

    match action {
        UserAction::List { page, keyword } => {
            let query = UserQuery {
                page: page.into(),
                keyword,
            };
            let page = app
                .client
                .call(users::list_users(&query))
                .await
                .context("Failed to list users")?
                .data
                .unwrap_or_default();

            let total = page.total;
            let list = page.into_items();
            if list.is_empty() {
                println!("No users found.");
                return Ok(());
            }
            println!(
                "{:<6} {:<18} {:<28} {:<10} {:<6}",
                "ID", "USERNAME", "EMAIL", "STATUS", "ADMIN"
            );
            println!("{}", "-".repeat(72));
            for user in &list {
                println!(
                    "{:<6} {:<18} {:<28} {:<10} {:<6}",
                    user.id,
                    truncate(&user.username, 16),
                    truncate(&user.email, 26),
                    or_dash(&user.status),
                    if user.has_admin_role() { "yes" } else { "no" },
                );
            }
            println!("\n{} of {total} shown", list.len());
        }
        UserAction::Show { id } => {
            let user = app
                .client
                .call(users::get_user(id))
                .await
                .and_then(|r| r.require_data())
                .with_context(|| format!("Failed to load user {id}"))?;
            print_user(&user);
        }
        UserAction::Create {
            username,
            email,
            password,
            real_name,
            phone,
            admin,
        } => {
            let user = app
                .client
                .call(users::create_user(&CreateUserRequest {
                    username,
                    password,
                    email,
                    real_name,
                    phone,
                    is_admin: admin,
                }))
                .await
                .and_then(|r| r.require_data())
                .context("Failed to create user")?;
            println!("Created user {} ({})", user.username, user.id);
        }
        UserAction::Update {
            id,
            email,
            real_name,
            phone,
            avatar,
            status,
        } => {
            app.client
                .call(users::update_user(
                    id,
                    &UpdateUserRequest {
                        email,
                        real_name,
                        phone,
                        avatar,
                        status,
                    },
                ))
                .await
                .with_context(|| format!("Failed to update user {id}"))?;
            println!("Updated user {id}");
        }
        UserAction::Delete { id } => {
            app.client
                .call(users::delete_user(id))
                .await
                .with_context(|| format!("Failed to delete user {id}"))?;
            println!("Deleted user {id}");
        }
    }
    Ok(())
}
