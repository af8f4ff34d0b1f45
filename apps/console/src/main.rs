use anyhow::{anyhow, Context, Result};
use clap::Parser;
use client_core::{load_settings, HttpWorkbenchService, WorkbenchService};
use shared::{
    domain::{ObjectId, ObjectRef, WorkspaceId},
    protocol::CopyObjectParams,
};

/// Headless workbench console: probes the release endpoint and optionally
/// drives a copy or a session shutdown against the configured service.
#[derive(Parser, Debug)]
struct Args {
    /// Copy this object ("<workspace>/<object>") into --copy-target.
    #[arg(long, requires = "copy_target")]
    copy_ref: Option<String>,
    #[arg(long)]
    copy_target: Option<String>,
    /// Terminate the session for this user after the version probe.
    #[arg(long)]
    shutdown_user: Option<String>,
}

fn parse_object_ref(raw: &str) -> Result<ObjectRef> {
    let (workspace, object) = raw
        .split_once('/')
        .ok_or_else(|| anyhow!("object ref must look like <workspace>/<object>"))?;
    Ok(ObjectRef::new(
        WorkspaceId(workspace.parse().context("workspace id")?),
        ObjectId(object.parse().context("object id")?),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let settings = load_settings();
    let service = HttpWorkbenchService::from_settings(&settings)?;

    let info = service.fetch_version().await?;
    if info.version == settings.version_tag {
        println!("Workbench {} is up to date.", settings.version_tag);
    } else {
        println!(
            "Workbench {} is running; version {} is available.",
            settings.version_tag, info.version
        );
    }

    if let (Some(raw_ref), Some(target)) = (&args.copy_ref, &args.copy_target) {
        let params = CopyObjectParams {
            source_ref: parse_object_ref(raw_ref)?,
            target_workspace: target.clone(),
        };
        println!(
            "Prepared copy_object payload: {}",
            serde_json::to_string(&params)?
        );
        match service.copy_object(&params).await {
            Ok(()) => println!("Copied {} into '{}'.", params.source_ref, target),
            Err(err) => println!("Copy failed: {err}"),
        }
    }

    if let Some(user) = &args.shutdown_user {
        service.shutdown_session(user).await?;
        println!("Session for {user} shut down.");
    }

    Ok(())
}
