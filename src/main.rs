use clap::{Args, Parser, Subcommand};
use futures::future::try_join_all;
use kf_client::crd::VirtualService;
use kf_client::options::DeleteOption;
use kf_client::{builds, routes, sources, ListOption, Predicate};
use kube::Client as K8sClient;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Parser, Debug)]
#[command(name = "kf", about = "Inspect and manage kf resources")]
struct Cli {
    /// Namespace (kf space) to operate in.
    #[arg(short, long, global = true, env = "KF_NAMESPACE", default_value = "default")]
    namespace: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Routes(RoutesCommand),
    #[command(subcommand)]
    Sources(SourcesCommand),
}

#[derive(Subcommand, Debug)]
enum RoutesCommand {
    /// List routes, optionally only those carrying the given labels.
    List {
        #[arg(short = 'l', long = "selector", value_parser = parse_label)]
        selector: Vec<(String, String)>,
    },
    Get { name: String },
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
struct DeleteArgs {
    #[arg(required = true)]
    names: Vec<String>,
    /// Wait for dependent objects to be deleted first.
    #[arg(long)]
    foreground: bool,
    /// Skip the grace period.
    #[arg(long)]
    now: bool,
}

#[derive(Subcommand, Debug)]
enum SourcesCommand {
    List,
    Get { name: String },
    /// Create or update the Build for a Source.
    Build { name: String },
}

fn parse_label(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got {:?}", s)),
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kf_client=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let kubernetes_client = K8sClient::try_default().await?;
    let namespace = cli.namespace.as_str();

    match cli.command {
        Command::Routes(command) => {
            let routes = routes::client(kubernetes_client);
            match command {
                RoutesCommand::List { selector } => {
                    let labels: BTreeMap<String, String> = selector.into_iter().collect();
                    // Checked again client side in case the server ignores the selector
                    let filters: Vec<Predicate<VirtualService>> = labels
                        .iter()
                        .map(|(key, value)| Predicate::label_equals(key.as_str(), value.as_str()))
                        .collect();
                    let mut options = vec![ListOption::Filters(filters)];
                    if !labels.is_empty() {
                        options.push(ListOption::LabelSelector(labels));
                    }
                    print(&routes.list(namespace, options).await?)?;
                }
                RoutesCommand::Get { name } => print(&routes.get(namespace, &name, []).await?)?,
                RoutesCommand::Delete(args) => {
                    let options = [
                        DeleteOption::ForegroundDeletion(args.foreground),
                        DeleteOption::DeleteImmediately(args.now),
                    ];
                    try_join_all(
                        args.names
                            .iter()
                            .map(|name| routes.delete(namespace, name, options)),
                    )
                    .await?;
                    tracing::info!(count = args.names.len(), %namespace, "deleted routes");
                }
            }
        }
        Command::Sources(command) => {
            let sources = sources::client(kubernetes_client.clone());
            match command {
                SourcesCommand::List => print(&sources.list(namespace, []).await?)?,
                SourcesCommand::Get { name } => print(&sources.get(namespace, &name, []).await?)?,
                SourcesCommand::Build { name } => {
                    let source = sources.get(namespace, &name, []).await?;
                    let builds = builds::client(kubernetes_client.clone());
                    let build = builds::sync_build(&builds, &source).await?;
                    sources::record_build(kubernetes_client, &source, &build).await?;
                    print(&build)?;
                }
            }
        }
    }

    Ok(())
}
