use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use pod_sdk::{
    AccessModeList, CreateOutcome, GraphName, NotificationCallback, NotificationEvent, PodClient,
    ReadSuccess, Resource, WacRule,
};
use pod_store::{Dataset, RdfCodec};
use pod_types::resolve_uri;

use crate::cli::*;
use crate::config::CliConfig;

/// What a command produced, in both output formats.
#[derive(Debug, Default)]
pub struct Output {
    pub json: Value,
    pub text: Vec<String>,
}

impl Output {
    fn new(json: Value) -> Self {
        Self { json, text: Vec::new() }
    }

    fn line(mut self, line: impl Into<String>) -> Self {
        self.text.push(line.into());
        self
    }

    pub fn print(&self, format: OutputFormat) -> anyhow::Result<()> {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&self.json)?),
            OutputFormat::Text => {
                for line in &self.text {
                    println!("{line}");
                }
            }
        }
        Ok(())
    }
}

/// A client plus the base URI relative paths resolve against.
pub struct Session {
    pub client: PodClient,
    pub base: Option<String>,
}

impl Session {
    pub fn uri(&self, reference: &str) -> anyhow::Result<String> {
        match &self.base {
            Some(base) => Ok(resolve_uri(base, reference)?),
            None if reference.starts_with("http://") || reference.starts_with("https://") => {
                Ok(reference.to_string())
            }
            None => bail!("'{reference}' is relative and no --pod base was given"),
        }
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?.with_overrides(cli.pod, cli.token);
    let session = Session {
        client: PodClient::connect(config.client)?,
        base: config.pod,
    };
    let output = match cli.command {
        Command::Watch(args) => cmd_watch(&session, args, cli.format).await?,
        command => execute(&session, command).await?,
    };
    output.print(cli.format)
}

/// Run every command that finishes on its own.
pub async fn execute(session: &Session, command: Command) -> anyhow::Result<Output> {
    match command {
        Command::Read(args) => cmd_read(session, args).await,
        Command::Ls(args) => cmd_ls(session, args).await,
        Command::Mkdir(args) => cmd_mkdir(session, args).await,
        Command::Put(args) => cmd_put(session, args).await,
        Command::Rm(args) => cmd_rm(session, args).await,
        Command::Root(args) => cmd_root(session, args).await,
        Command::Acl(args) => match args.action {
            AclAction::Get { uri, fresh } => cmd_acl_get(session, &uri, fresh).await,
            AclAction::Set { uri, public, authenticated, agents } => {
                cmd_acl_set(session, &uri, public, authenticated, agents).await
            }
        },
        Command::Storage(args) => cmd_storage(session, args).await,
        Command::Watch(_) => bail!("watch runs until interrupted and is not a one-shot command"),
    }
}

async fn cmd_read(session: &Session, args: ReadArgs) -> anyhow::Result<Output> {
    let uri = session.uri(&args.uri)?;
    let read = session.client.resource(&uri).read().await?;
    let output = match &read {
        ReadSuccess::Absent { .. } => Output::new(json!({ "uri": uri, "kind": read.kind() }))
            .line(format!("{} {}", uri.bold(), "does not exist".yellow())),
        ReadSuccess::Binary { mime_type, blob, .. } => {
            let mut output = Output::new(json!({
                "uri": uri,
                "kind": "binaryReadSuccess",
                "mime_type": mime_type,
                "size": blob.len(),
            }));
            match &args.out {
                Some(path) => {
                    tokio::fs::write(path, blob)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    output = output.line(format!("{} Saved {} bytes to {}", "✓".green(), blob.len(), path.display()));
                }
                None => {
                    output = output.line(format!("{} ({}, {} bytes)", uri.bold(), mime_type.cyan(), blob.len()));
                }
            }
            output
        }
        ReadSuccess::Data { .. } | ReadSuccess::Container { .. } => {
            let context = session.client.context();
            let quads = context.dataset().graph_quads(&GraphName::named(&uri));
            let turtle = context.codec().serialize(&quads, &[]);
            Output::new(json!({
                "uri": uri,
                "kind": read.kind(),
                "triples": quads.len(),
                "turtle": turtle,
            }))
            .line(turtle)
        }
    };
    Ok(output)
}

async fn cmd_ls(session: &Session, args: UriArgs) -> anyhow::Result<Output> {
    let container = session.client.container(&session.uri(&args.uri)?)?;
    container.read().await?;
    let children = container.children()?;

    let mut output = Output::new(json!({
        "uri": container.uri(),
        "children": children
            .iter()
            .map(|c| json!({ "uri": c.uri(), "kind": c.kind() }))
            .collect::<Vec<_>>(),
    }));
    if children.is_empty() {
        output = output.line(format!("{} is empty", container.uri().bold()));
    }
    for child in &children {
        let line = match child {
            Resource::Container(c) => c.uri().blue().bold().to_string(),
            Resource::Leaf(l) => l.uri().to_string(),
        };
        output = output.line(line);
    }
    Ok(output)
}

async fn cmd_mkdir(session: &Session, args: UriArgs) -> anyhow::Result<Output> {
    let container = session.client.container(&session.uri(&args.uri)?)?;
    let outcome = container.create_if_absent().await?;
    Ok(created(container.uri(), &outcome))
}

fn created(uri: &str, outcome: &CreateOutcome) -> Output {
    let output = Output::new(json!({ "uri": uri, "kind": outcome.kind() }));
    match outcome {
        CreateOutcome::Created { did_overwrite, .. } => {
            let verb = if *did_overwrite { "Replaced" } else { "Created" };
            output.line(format!("{} {verb} {}", "✓".green().bold(), uri.bold()))
        }
        CreateOutcome::AlreadyExists(_) => output.line(format!("{} already exists", uri.bold())),
    }
}

/// Media type for an upload from its file extension.
pub fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("ttl") => "text/turtle",
        Some("jsonld") => "application/ld+json",
        Some("json") => "application/json",
        Some("txt") | Some("md") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

async fn cmd_put(session: &Session, args: PutArgs) -> anyhow::Result<Output> {
    let leaf = session.client.leaf(&session.uri(&args.uri)?)?;
    let blob = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let mime = args
        .mime
        .clone()
        .unwrap_or_else(|| guess_mime(&args.file).to_string());
    debug!(uri = %leaf.uri(), mime = %mime, size = blob.len(), "uploading");
    let outcome = if args.overwrite {
        leaf.upload_and_overwrite(blob, &mime).await?
    } else {
        leaf.upload_if_absent(blob, &mime).await?
    };
    Ok(created(leaf.uri(), &outcome))
}

async fn cmd_rm(session: &Session, args: UriArgs) -> anyhow::Result<Output> {
    let resource = session.client.resource(&session.uri(&args.uri)?);
    let deleted = resource.delete().await?;
    let output = Output::new(json!({ "uri": deleted.uri, "existed": deleted.resource_existed }));
    Ok(if deleted.resource_existed {
        output.line(format!("{} Deleted {}", "✓".green().bold(), resource.uri().bold()))
    } else {
        output.line(format!("{} did not exist", resource.uri().bold()))
    })
}

async fn cmd_root(session: &Session, args: UriArgs) -> anyhow::Result<Output> {
    let resource = session.client.resource(&session.uri(&args.uri)?);
    let root = resource.get_root_container().await?;
    Ok(Output::new(json!({ "uri": resource.uri(), "root": root.uri() })).line(root.uri().bold().to_string()))
}

fn modes_json(modes: &AccessModeList) -> Value {
    json!(modes.to_letters())
}

async fn cmd_acl_get(session: &Session, uri: &str, fresh: bool) -> anyhow::Result<Output> {
    let resource = session.client.resource(&session.uri(uri)?);
    let effective = resource.get_wac(fresh).await?;
    let rule = &effective.rule;

    let agents: serde_json::Map<String, Value> = rule
        .agent
        .iter()
        .map(|(webid, modes)| (webid.clone(), modes_json(modes)))
        .collect();
    let mut output = Output::new(json!({
        "uri": resource.uri(),
        "governed_by": effective.resource_uri,
        "acl": effective.acl_uri,
        "public": modes_json(&rule.public),
        "authenticated": modes_json(&rule.authenticated),
        "agents": agents,
    }));
    if effective.resource_uri != resource.uri() {
        output = output.line(format!("inherited from {}", effective.resource_uri.cyan()));
    }
    output = output
        .line(format!("{:<14} {}", "public", rule.public.to_letters().yellow()))
        .line(format!("{:<14} {}", "authenticated", rule.authenticated.to_letters().yellow()));
    for (webid, modes) in &rule.agent {
        output = output.line(format!("{:<14} {} {}", "agent", modes.to_letters().yellow(), webid));
    }
    Ok(output)
}

async fn cmd_acl_set(
    session: &Session,
    uri: &str,
    public: Option<String>,
    authenticated: Option<String>,
    agents: Vec<(String, String)>,
) -> anyhow::Result<Output> {
    let resource = session.client.resource(&session.uri(uri)?);
    let mut rule = WacRule::new();
    if let Some(letters) = public {
        rule = rule.with_public(AccessModeList::from_letters(&letters));
    }
    if let Some(letters) = authenticated {
        rule = rule.with_authenticated(AccessModeList::from_letters(&letters));
    }
    for (webid, letters) in agents {
        rule = rule.with_agent(webid, AccessModeList::from_letters(&letters));
    }
    resource.set_wac(&rule).await?;
    Ok(Output::new(json!({ "uri": resource.uri(), "rule": serde_json::to_value(&rule)? }))
        .line(format!("{} Updated access rules for {}", "✓".green().bold(), resource.uri().bold())))
}

async fn cmd_storage(session: &Session, args: StorageArgs) -> anyhow::Result<Output> {
    let storages = session.client.discover_storage(&args.webid).await?;
    let uris: Vec<&str> = storages.iter().map(|s| s.uri()).collect();
    let mut output = Output::new(json!({ "webid": args.webid, "storages": uris }));
    for uri in &uris {
        output = output.line(uri.bold().to_string());
    }
    Ok(output)
}

fn event_json(event: &NotificationEvent) -> Value {
    match event {
        NotificationEvent::Message(message) => json!({
            "type": message.kind.as_str(),
            "object": message.object,
            "published": message.published,
        }),
        NotificationEvent::Error(error) => json!({ "error": error.kind(), "message": error.to_string() }),
    }
}

fn event_text(event: &NotificationEvent) -> String {
    match event {
        NotificationEvent::Message(message) => {
            let at = message
                .published_at()
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "--:--:--".to_string());
            format!("{} {} {}", at.dimmed(), message.kind.as_str().green().bold(), message.object)
        }
        NotificationEvent::Error(error) => format!("{} {error}", "!".red().bold()),
    }
}

async fn cmd_watch(session: &Session, args: UriArgs, format: OutputFormat) -> anyhow::Result<Output> {
    let resource = session.client.resource(&session.uri(&args.uri)?);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let callback: NotificationCallback = Arc::new(move |event: NotificationEvent| {
        let _ = tx.send(event);
    });
    let id = resource.subscribe_to_notifications(callback).await?;
    if format == OutputFormat::Text {
        println!("Watching {} (Ctrl-C to stop)", resource.uri().bold());
    }

    let mut received = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Some(event) => {
                    received += 1;
                    match format {
                        OutputFormat::Json => println!("{}", event_json(&event)),
                        OutputFormat::Text => println!("{}", event_text(&event)),
                    }
                }
                // the subscription gave up and dropped our callback
                None => break,
            },
        }
    }
    resource.unsubscribe_from_notifications(id);
    Ok(Output::new(json!({ "uri": resource.uri(), "received": received }))
        .line(format!("Stopped after {received} notifications")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_protocol::{InMemoryPod, Method};
    use pod_sdk::ClientConfig;
    use std::io::Write;

    const ROOT: &str = "https://pod.example/";

    fn session() -> (Arc<InMemoryPod>, Session) {
        let pod = Arc::new(InMemoryPod::new(ROOT));
        pod.add_turtle("https://pod.example/notes/today.ttl", "<#it> <http://ex/says> \"hi\" .");
        let client = PodClient::with_transport(pod.clone(), ClientConfig::default().with_batch_millis(0));
        let session = Session {
            client,
            base: Some(ROOT.to_string()),
        };
        (pod, session)
    }

    fn uri_args(uri: &str) -> UriArgs {
        UriArgs { uri: uri.to_string() }
    }

    #[test]
    fn relative_paths_need_a_base() {
        let (_pod, mut session) = session();
        assert_eq!(session.uri("notes/").unwrap(), "https://pod.example/notes/");
        session.base = None;
        assert_eq!(session.uri("https://x.example/a").unwrap(), "https://x.example/a");
        assert!(session.uri("notes/").is_err());
    }

    #[test]
    fn mime_is_guessed_from_extension() {
        assert_eq!(guess_mime(Path::new("a/b.TTL")), "text/turtle");
        assert_eq!(guess_mime(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn read_prints_turtle() {
        let (_pod, session) = session();
        let output = execute(
            &session,
            Command::Read(ReadArgs { uri: "notes/today.ttl".into(), out: None }),
        )
        .await
        .unwrap();
        assert_eq!(output.json["kind"], "dataReadSuccess");
        assert_eq!(output.json["triples"], 1);
        assert!(output.text[0].contains("hi"));
    }

    #[tokio::test]
    async fn ls_lists_children() {
        let (_pod, session) = session();
        let output = execute(&session, Command::Ls(uri_args("/"))).await.unwrap();
        let children = output.json["children"].as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["uri"], "https://pod.example/notes/");
        assert_eq!(children[0]["kind"], "container");
    }

    #[tokio::test]
    async fn mkdir_then_put_then_rm() {
        let (pod, session) = session();
        let made = execute(&session, Command::Mkdir(uri_args("photos/"))).await.unwrap();
        assert_eq!(made.json["kind"], "createSuccess");
        assert!(pod.exists("https://pod.example/photos/"));

        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&[137, 80, 78, 71]).unwrap();
        let put = PutArgs {
            uri: "photos/cat.png".into(),
            file: file.path().to_path_buf(),
            mime: None,
            overwrite: false,
        };
        execute(&session, Command::Put(put)).await.unwrap();
        let (content_type, body) = pod.document("https://pod.example/photos/cat.png").unwrap();
        assert_eq!(content_type, "image/png");
        assert_eq!(body.len(), 4);

        let removed = execute(&session, Command::Rm(uri_args("photos/"))).await.unwrap();
        assert_eq!(removed.json["existed"], true);
        assert!(!pod.exists("https://pod.example/photos/cat.png"));
        assert!(!pod.exists("https://pod.example/photos/"));
    }

    #[tokio::test]
    async fn acl_set_then_get() {
        let (pod, session) = session();
        let set = AclAction::Set {
            uri: "notes/".into(),
            public: Some("r".into()),
            authenticated: None,
            agents: vec![("https://alice.example/card#me".into(), "r,w,c".into())],
        };
        execute(&session, Command::Acl(AclArgs { action: set })).await.unwrap();
        assert_eq!(pod.request_count(Method::Put, "https://pod.example/notes/.acl"), 1);

        let get = AclAction::Get { uri: "notes/today.ttl".into(), fresh: true };
        let output = execute(&session, Command::Acl(AclArgs { action: get })).await.unwrap();
        assert_eq!(output.json["governed_by"], "https://pod.example/notes/");
        assert_eq!(output.json["public"], "r");
        assert_eq!(output.json["agents"]["https://alice.example/card#me"], "rwc");
        assert!(output.text[0].contains("inherited from"));
    }

    #[tokio::test]
    async fn root_is_reported() {
        let (_pod, session) = session();
        let output = execute(&session, Command::Root(uri_args("notes/today.ttl"))).await.unwrap();
        assert_eq!(output.json["root"], ROOT);
    }

    #[test]
    fn events_render_in_both_formats() {
        let message = pod_protocol::NotificationMessage::new(
            pod_protocol::NotificationType::Update,
            "https://pod.example/notes/today.ttl",
        );
        let event = NotificationEvent::Message(message);
        assert_eq!(event_json(&event)["type"], "Update");
        assert!(event_text(&event).contains("https://pod.example/notes/today.ttl"));
    }
}
